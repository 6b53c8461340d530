use super::{
    multipart::{self, AnalyzeForm},
    AnalysisArgs, ModelArgs,
};
use anyhow::{anyhow, Result};
use clap::Parser;
use mvclass::{
    core::Error,
    runtime::{analyze, AnalyzeRequest, AnalyzeResponse, AnalyzerConfig, ModelRuntime},
};
use serde::Serialize;
use std::{io::Read, sync::Arc};
use tiny_http::{Header, Method, Request, Response, Server};

const MAX_BODY_BYTES: u64 = 64 * 1024 * 1024;

/// Serve the analysis pipeline over HTTP.
#[derive(Parser, Debug)]
#[clap()]
pub(crate) struct Args {
    #[clap(short, long, default_value = "8000")]
    port: u16,

    #[clap(short, long, default_value = "8")]
    threads: u16,

    #[clap(long, default_value = "0.0.0.0")]
    host: String,

    #[clap(flatten)]
    model: ModelArgs,

    #[clap(flatten)]
    analysis: AnalysisArgs,
}

struct Service {
    runtime: ModelRuntime,
    config: AnalyzerConfig,
}

/// A finished response, before it is handed to tiny_http.
#[derive(Debug)]
struct Reply {
    status: u16,
    body: Vec<u8>,
    json: bool,
    allow: Option<&'static str>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    detail: String,
}

#[derive(Serialize)]
struct Health<'a> {
    status: &'a str,
    model_kind: String,
    classes: usize,
    device: String,
}

impl Reply {
    fn json(status: u16, body: &impl Serialize) -> Self {
        match serde_json::to_vec(body) {
            Ok(body) => Self {
                status,
                body,
                json: true,
                allow: None,
            },
            Err(e) => Self::error(500, "internal", e.to_string()),
        }
    }

    fn error(status: u16, error: &str, detail: String) -> Self {
        let body = serde_json::to_vec(&ErrorBody { error, detail }).unwrap_or_default();
        Self {
            status,
            body,
            json: true,
            allow: None,
        }
    }

    fn from_error(error: &Error) -> Self {
        let status = if error.is_client_error() { 400 } else { 500 };
        Self::error(status, error.kind(), error.to_string())
    }

    fn empty(status: u16, allow: Option<&'static str>) -> Self {
        Self {
            status,
            body: vec![],
            json: false,
            allow,
        }
    }
}

impl Service {
    fn route(
        &self,
        method: &Method,
        path: &str,
        content_type: Option<&str>,
        body: &[u8],
    ) -> Reply {
        let path = path.split('?').next().unwrap_or(path);
        let allowed = match path {
            "/analyze" => "POST, OPTIONS",
            "/health" => "GET, OPTIONS",
            _ => return Reply::error(404, "not_found", format!("no route for {}", path)),
        };

        match (method, path) {
            (Method::Options, _) => Reply::empty(204, Some(allowed)),
            (Method::Get, "/health") => Reply::json(
                200,
                &Health {
                    status: "ok",
                    model_kind: self.runtime.kind().to_string(),
                    classes: self.runtime.class_table().len(),
                    device: self.runtime.device().to_string(),
                },
            ),
            (Method::Post, "/analyze") => self.analyze(content_type, body),
            _ => {
                let mut reply = Reply::error(
                    405,
                    "method_not_allowed",
                    format!("{} is not supported on {}", method, path),
                );
                reply.allow = Some(allowed);
                reply
            }
        }
    }

    fn analyze(&self, content_type: Option<&str>, body: &[u8]) -> Reply {
        let Some(boundary) = content_type.and_then(multipart::boundary) else {
            return Reply::error(
                400,
                "bad_request",
                "expected a multipart/form-data body".to_owned(),
            );
        };

        let form = match multipart::parse(body, boundary).and_then(AnalyzeForm::from_parts) {
            Ok(form) => form,
            Err(e) => return Reply::error(400, "bad_request", format!("{:#}", e)),
        };

        let request = AnalyzeRequest::new(form.prompt, form.images);
        match analyze(&self.runtime, &request, &self.config) {
            Ok(result) => Reply::json(200, &AnalyzeResponse::from(result)),
            Err(e) => {
                log::warn!("analysis failed: {}", e);
                Reply::from_error(&e)
            }
        }
    }
}

fn header(name: &str, value: &str) -> Result<Header> {
    Header::from_bytes(name.as_bytes(), value.as_bytes())
        .map_err(|()| anyhow!("invalid header {}: {}", name, value))
}

fn handle(service: &Service, mut request: Request) -> Result<()> {
    let content_type = request
        .headers()
        .iter()
        .find(|h| h.field.equiv("Content-Type"))
        .map(|h| h.value.as_str().to_owned());

    let mut body = vec![];
    request
        .as_reader()
        .take(MAX_BODY_BYTES + 1)
        .read_to_end(&mut body)?;

    let reply = if body.len() as u64 > MAX_BODY_BYTES {
        Reply::error(413, "payload_too_large", format!("limit is {} bytes", MAX_BODY_BYTES))
    } else {
        service.route(request.method(), request.url(), content_type.as_deref(), &body)
    };

    log::debug!(
        "{} {} -> {}",
        request.method(),
        request.url(),
        reply.status
    );

    let mut response = Response::from_data(reply.body)
        .with_status_code(reply.status)
        .with_header(header("Access-Control-Allow-Origin", "*")?);

    if reply.json {
        response.add_header(header("Content-Type", "application/json")?);
    }

    if let Some(allow) = reply.allow {
        response.add_header(header("Allow", allow)?);
        response.add_header(header("Access-Control-Allow-Methods", allow)?);
        response.add_header(header("Access-Control-Allow-Headers", "Content-Type")?);
    }

    request.respond(response)?;
    Ok(())
}

fn run_server(server: Arc<Server>, service: Arc<Service>) -> Result<()> {
    loop {
        let request = server.recv()?;
        if let Err(e) = handle(&service, request) {
            log::error!("failed handling request: {:#}", e);
        }
    }
}

pub(super) fn serve(config: Args) -> Result<()> {
    let runtime = config.model.load_runtime(config.analysis.device())?;
    let service = Arc::new(Service {
        runtime,
        config: config.analysis.to_config(),
    });

    let addr = format!("{}:{}", config.host, config.port);
    let server = Server::http(&addr).map_err(|e| anyhow!("binding {}: {}", addr, e))?;
    let server = Arc::new(server);
    log::info!("listening on {} with {} threads", addr, config.threads);

    let handles: Vec<_> = (1..config.threads.max(1))
        .map(|_| {
            let server = server.clone();
            let service = service.clone();
            std::thread::spawn(move || run_server(server, service))
        })
        .collect();

    run_server(server, service)?;

    for handle in handles {
        handle
            .join()
            .map_err(|_| anyhow!("server thread panicked"))??;
    }

    Ok(())
}
