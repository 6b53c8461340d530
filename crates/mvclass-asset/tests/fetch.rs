use mvclass_asset::fetch::ArtifactSource;
use std::{thread, time::Duration};
use tiny_http::{Response, Server};

/// Serve `statuses.len()` requests, answering each with the given status
/// code and `body`.
fn serve(statuses: Vec<u16>, body: &'static [u8]) -> (String, thread::JoinHandle<()>) {
    let server = Server::http("127.0.0.1:0").expect("bind");
    let addr = server.server_addr().to_ip().expect("tcp listener");

    let handle = thread::spawn(move || {
        for status in statuses {
            let request = server.recv().expect("request");
            let response = Response::from_data(body).with_status_code(status);
            request.respond(response).expect("respond");
        }
    });

    (format!("http://{}/model.mvca", addr), handle)
}

#[test]
fn test_fetch_downloads_missing_artifact() {
    let (url, handle) = serve(vec![200], b"MVCA-bytes");
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("model.mvca");

    let local = ArtifactSource::new(&path)
        .with_url(Some(url))
        .ensure_local()
        .expect("downloaded");

    handle.join().unwrap();
    assert_eq!(local, path);
    assert_eq!(std::fs::read(&path).unwrap(), b"MVCA-bytes");
}

#[test]
fn test_fetch_retries_server_errors() {
    let (url, handle) = serve(vec![503, 200], b"second time lucky");
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.mvca");

    ArtifactSource::new(&path)
        .with_url(Some(url))
        .with_backoff(Duration::from_millis(10))
        .ensure_local()
        .expect("downloaded on retry");

    handle.join().unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), b"second time lucky");
}

#[test]
fn test_fetch_does_not_leave_partial_files() {
    let (url, handle) = serve(vec![500, 500], b"");
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.mvca");

    let result = ArtifactSource::new(&path)
        .with_url(Some(url))
        .with_max_attempts(2)
        .with_backoff(Duration::ZERO)
        .ensure_local();

    handle.join().unwrap();
    assert!(result.is_err());
    assert!(!path.exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
