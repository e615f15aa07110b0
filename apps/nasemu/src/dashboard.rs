//! Minimal DSM web front for the vendor UI

use crate::cgi::{CgiBridge, CgiRequest};
use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{any, get};
use axum::{Json, Router};
use nasemu_config::constants;
use nasemu_errors::{Error, LaunchError};
use nasemu_events::{AppEvent, DashboardEvent, EventEmitter, EventSender};
use nasemu_platform::EnvSet;
use rand::Rng;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const TOKEN_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz234567";
const TOKEN_LEN: usize = 13;

/// Shared dashboard state
pub struct Dashboard {
    cgi: CgiBridge,
    token: String,
}

impl Dashboard {
    /// Dashboard bridging to the packaged UI script with `env`
    pub fn new(env: EnvSet) -> Self {
        Self {
            cgi: CgiBridge::new(constants::PKG_UI_CGI, constants::PKG_BIN_DIR, env),
            token: random_token(TOKEN_LEN),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

/// Random lowercase base32 string of `len` characters
pub fn random_token(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| char::from(TOKEN_ALPHABET[rng.random_range(0..TOKEN_ALPHABET.len())]))
        .collect()
}

pub fn router(dashboard: Arc<Dashboard>) -> Router {
    let redirect = || async { Redirect::permanent(constants::CGI_PATH) };
    Router::new()
        .route("/", get(redirect))
        .route("/web", get(redirect))
        .route("/webman", get(redirect))
        .route(constants::LOGIN_PATH, any(login))
        .route(constants::CGI_PATH, any(cgi))
        .route(&format!("{}*rest", constants::CGI_PATH), any(cgi))
        .with_state(dashboard)
}

async fn login(State(dashboard): State<Arc<Dashboard>>) -> impl IntoResponse {
    Json(json!({
        "SynoToken": dashboard.token,
        "result": "success",
        "success": true,
    }))
}

async fn cgi(
    State(dashboard): State<Arc<Dashboard>>,
    remote: Option<ConnectInfo<SocketAddr>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = CgiRequest {
        method,
        uri,
        headers,
        remote: remote.map(|ConnectInfo(addr)| addr),
        body: body.to_vec(),
    };

    match dashboard.cgi.serve(request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "CGI request failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Serve the dashboard on `listen` until `cancel` fires
///
/// # Errors
///
/// Returns `LaunchError::Dashboard` if the address cannot be bound and
/// `LaunchError::ShutdownFailed` if the server stops with an error.
pub async fn serve(
    listen: SocketAddr,
    dashboard: Dashboard,
    cancel: CancellationToken,
    tx: Option<EventSender>,
) -> Result<(), Error> {
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| LaunchError::Dashboard {
            listen: listen.to_string(),
            message: e.to_string(),
        })?;
    let addr = listener.local_addr().map_or(listen, |addr| addr);
    tx.emit(AppEvent::Dashboard(DashboardEvent::Listening {
        addr: addr.to_string(),
    }));

    let app = router(Arc::new(dashboard));
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(cancel.cancelled_owned())
    .await
    .map_err(|e| LaunchError::ShutdownFailed {
        message: e.to_string(),
    })?;

    tx.emit(AppEvent::Dashboard(DashboardEvent::Stopped));
    Ok(())
}
