/*!
Just enough `multipart/form-data` to accept browser uploads.
*/

use anyhow::{bail, Result};

/// One part of a multipart body.
#[derive(Debug)]
pub(crate) struct Part<'a> {
    pub name: Option<String>,
    pub filename: Option<String>,
    pub data: &'a [u8],
}

/// The fields `/analyze` understands.
#[derive(Debug, Default)]
pub(crate) struct AnalyzeForm {
    pub prompt: String,
    pub images: Vec<Vec<u8>>,
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Extract the boundary from a `Content-Type` header value.
pub(crate) fn boundary(content_type: &str) -> Option<&str> {
    let mut params = content_type.split(';');
    let mime = params.next()?.trim();
    if !mime.eq_ignore_ascii_case("multipart/form-data") {
        return None;
    }

    params
        .filter_map(|param| param.trim().split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("boundary"))
        .map(|(_, value)| unquote(value.trim()))
        .filter(|value| !value.is_empty())
}

fn parse_disposition(value: &str) -> (Option<String>, Option<String>) {
    let mut name = None;
    let mut filename = None;
    for param in value.split(';').skip(1) {
        if let Some((key, value)) = param.trim().split_once('=') {
            match key.trim().to_ascii_lowercase().as_str() {
                "name" => name = Some(unquote(value.trim()).to_owned()),
                "filename" => filename = Some(unquote(value.trim()).to_owned()),
                _ => {}
            }
        }
    }

    (name, filename)
}

/// Split `body` into its parts.
pub(crate) fn parse<'a>(body: &'a [u8], boundary: &str) -> Result<Vec<Part<'a>>> {
    let delimiter = format!("--{}", boundary).into_bytes();
    let separator = format!("\r\n--{}", boundary).into_bytes();

    let Some(start) = find(body, &delimiter) else {
        bail!("missing multipart boundary");
    };

    let mut rest = &body[start + delimiter.len()..];
    let mut parts = vec![];
    loop {
        if rest.starts_with(b"--") {
            return Ok(parts);
        }

        let Some(after_line) = rest.strip_prefix(b"\r\n") else {
            bail!("malformed multipart delimiter line");
        };

        let Some(header_end) = find(after_line, b"\r\n\r\n") else {
            bail!("unterminated multipart headers");
        };

        let headers = std::str::from_utf8(&after_line[..header_end])?;
        let (mut name, mut filename) = (None, None);
        for line in headers.split("\r\n") {
            if let Some((key, value)) = line.split_once(':') {
                if key.trim().eq_ignore_ascii_case("content-disposition") {
                    (name, filename) = parse_disposition(value.trim());
                }
            }
        }

        let content = &after_line[header_end + 4..];
        let Some(end) = find(content, &separator) else {
            bail!("unterminated multipart part");
        };

        parts.push(Part {
            name,
            filename,
            data: &content[..end],
        });

        rest = &content[end + separator.len()..];
    }
}

impl AnalyzeForm {
    /// Collect the `prompt` field and every `files` part. Other fields
    /// are ignored.
    pub(crate) fn from_parts(parts: Vec<Part<'_>>) -> Result<Self> {
        let mut form = Self::default();
        for part in parts {
            match part.name.as_deref() {
                Some("prompt") => form.prompt = std::str::from_utf8(part.data)?.to_owned(),
                Some("files" | "files[]" | "file") => form.images.push(part.data.to_vec()),
                other => log::debug!("ignoring form field {:?} ({:?})", other, part.filename),
            }
        }

        Ok(form)
    }
}

#[cfg(test)]
pub(crate) fn encode(boundary: &str, prompt: &str, files: &[&[u8]]) -> Vec<u8> {
    let mut body = vec![];
    body.extend(format!("--{boundary}\r\n").as_bytes());
    body.extend(b"Content-Disposition: form-data; name=\"prompt\"\r\n\r\n");
    body.extend(prompt.as_bytes());
    body.extend(b"\r\n");

    for (idx, file) in files.iter().enumerate() {
        body.extend(format!("--{boundary}\r\n").as_bytes());
        body.extend(
            format!(
                "Content-Disposition: form-data; name=\"files\"; filename=\"{idx}.png\"\r\n\
                 Content-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend(*file);
        body.extend(b"\r\n");
    }

    body.extend(format!("--{boundary}--\r\n").as_bytes());
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_from_content_type() {
        assert_eq!(
            boundary("multipart/form-data; boundary=----WebKitFormBoundaryX3"),
            Some("----WebKitFormBoundaryX3")
        );
        assert_eq!(boundary("Multipart/Form-Data; boundary=\"abc\""), Some("abc"));
        assert_eq!(boundary("application/json"), None);
        assert_eq!(boundary("multipart/form-data"), None);
    }

    #[test]
    fn parses_fields_and_files() {
        let body = encode("xyz", "which fitting?", &[&b"\x89PNG-one"[..], &b"two\r\nlines"[..]]);
        let parts = parse(&body, "xyz").unwrap();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].name.as_deref(), Some("prompt"));
        assert_eq!(parts[1].filename.as_deref(), Some("0.png"));
        assert_eq!(parts[2].data, b"two\r\nlines");

        let form = AnalyzeForm::from_parts(parts).unwrap();
        assert_eq!(form.prompt, "which fitting?");
        assert_eq!(form.images, [b"\x89PNG-one".to_vec(), b"two\r\nlines".to_vec()]);
    }

    #[test]
    fn no_files() {
        let body = encode("b", "", &[]);
        let form = AnalyzeForm::from_parts(parse(&body, "b").unwrap()).unwrap();

        assert!(form.prompt.is_empty());
        assert!(form.images.is_empty());
    }

    #[test]
    fn rejects_truncated_bodies() {
        let body = encode("b", "hi", &[&b"data"[..]]);
        assert!(parse(&body[..body.len() - 12], "b").is_err());
        assert!(parse(b"no boundary here", "b").is_err());
    }
}
