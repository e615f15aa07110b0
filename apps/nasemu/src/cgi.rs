//! CGI/1.1 bridge to the vendor UI script

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::Response;
use nasemu_errors::LaunchError;
use nasemu_platform::EnvSet;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;

/// Request data handed to a CGI script
pub struct CgiRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub remote: Option<SocketAddr>,
    pub body: Vec<u8>,
}

/// Runs a CGI script once per request
#[derive(Debug, Clone)]
pub struct CgiBridge {
    script: PathBuf,
    work_dir: PathBuf,
    env: EnvSet,
}

impl CgiBridge {
    /// `env` is layered over the request meta-variables and wins on conflicts
    pub fn new(script: impl Into<PathBuf>, work_dir: impl Into<PathBuf>, env: EnvSet) -> Self {
        Self {
            script: script.into(),
            work_dir: work_dir.into(),
            env,
        }
    }

    /// Meta-variables for one request
    pub fn environment(&self, request: &CgiRequest) -> EnvSet {
        let host = request
            .headers
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        let port = host.rsplit_once(':').map_or("80", |(_, port)| port);
        let request_uri = request
            .uri
            .path_and_query()
            .map_or_else(|| request.uri.path().to_string(), ToString::to_string);
        let script = self.script.display().to_string();

        let mut env = EnvSet::new();
        env.sets([
            ("SERVER_SOFTWARE", "nasemu"),
            ("SERVER_PROTOCOL", "HTTP/1.1"),
            ("HTTP_HOST", host),
            ("GATEWAY_INTERFACE", "CGI/1.1"),
            ("REQUEST_METHOD", request.method.as_str()),
            ("QUERY_STRING", request.uri.query().unwrap_or_default()),
            ("REQUEST_URI", request_uri.as_str()),
            ("PATH_INFO", request.uri.path()),
            ("SCRIPT_NAME", "/"),
            ("SCRIPT_FILENAME", script.as_str()),
            ("SERVER_PORT", port),
        ]);

        if let Some(remote) = request.remote {
            env.set("REMOTE_ADDR", remote.ip().to_string())
                .set("REMOTE_HOST", remote.ip().to_string())
                .set("REMOTE_PORT", remote.port().to_string());
        }

        for (name, value) in &request.headers {
            // httpoxy
            if name == "proxy" || name == header::HOST {
                continue;
            }
            let Ok(value) = value.to_str() else {
                continue;
            };
            let key = format!(
                "HTTP_{}",
                name.as_str().to_ascii_uppercase().replace('-', "_")
            );
            env.set(key, value);
        }

        if !request.body.is_empty() {
            env.set("CONTENT_LENGTH", request.body.len().to_string());
        }
        if let Some(content_type) = request
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
        {
            env.set("CONTENT_TYPE", content_type);
        }

        env.sets(self.env.pairs());
        if env.get("PATH").is_none() {
            env.set("PATH", "/bin:/usr/bin:/usr/ucb:/usr/bsd:/usr/local/bin");
        }
        env
    }

    /// Run the script for `request` and translate its output
    ///
    /// # Errors
    ///
    /// Returns `LaunchError::Cgi` if the script cannot run or prints a
    /// malformed header block.
    pub async fn serve(&self, request: CgiRequest) -> Result<Response, LaunchError> {
        let env = self.environment(&request);
        let mut child = tokio::process::Command::new(&self.script)
            .current_dir(&self.work_dir)
            .env_clear()
            .envs(env.pairs())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| cgi_error(format!("start {}: {e}", self.script.display())))?;

        let stdin = child.stdin.take();
        let body = request.body;
        let feed = async move {
            if let Some(mut stdin) = stdin {
                // The script may exit without reading its input
                let _ = stdin.write_all(&body).await;
            }
        };
        let ((), output) = tokio::join!(feed, child.wait_with_output());
        let output = output.map_err(|e| cgi_error(e.to_string()))?;

        if !output.status.success() {
            tracing::debug!(status = %output.status, "CGI script exited with failure");
        }
        parse_response(&output.stdout)
    }
}

fn cgi_error(message: impl Into<String>) -> LaunchError {
    LaunchError::Cgi {
        message: message.into(),
    }
}

fn header_end(output: &[u8]) -> Option<(usize, usize)> {
    for (index, window) in output.windows(2).enumerate() {
        if window == b"\n\n" {
            return Some((index, index + 2));
        }
        if window == b"\r\n" && output[index + 2..].starts_with(b"\r\n") {
            return Some((index, index + 4));
        }
    }
    None
}

/// Split CGI output into status, headers and body
///
/// A `Status` header sets the response status; a `Location` header without
/// one turns the response into a `302 Found`.
///
/// # Errors
///
/// Returns `LaunchError::Cgi` when the header block is missing or malformed.
pub fn parse_response(output: &[u8]) -> Result<Response, LaunchError> {
    let (head_len, body_start) =
        header_end(output).ok_or_else(|| cgi_error("no header block in script output"))?;
    let head = std::str::from_utf8(&output[..head_len])
        .map_err(|_| cgi_error("header block is not valid UTF-8"))?;

    let mut status = None;
    let mut headers = HeaderMap::new();
    for line in head.lines().map(|line| line.trim_end_matches('\r')) {
        if line.is_empty() {
            continue;
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| cgi_error(format!("bad header line {line:?}")))?;
        let (name, value) = (name.trim(), value.trim());

        if name.eq_ignore_ascii_case("status") {
            let code = value
                .split_whitespace()
                .next()
                .and_then(|code| code.parse::<u16>().ok())
                .and_then(|code| StatusCode::from_u16(code).ok())
                .ok_or_else(|| cgi_error(format!("bad status {value:?}")))?;
            status = Some(code);
            continue;
        }

        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| cgi_error(format!("bad header name {name:?}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| cgi_error(format!("bad header value for {name}")))?;
        headers.append(name, value);
    }

    let status = status.unwrap_or(if headers.contains_key(header::LOCATION) {
        StatusCode::FOUND
    } else {
        StatusCode::OK
    });

    let mut response = Response::new(Body::from(output[body_start..].to_vec()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}
