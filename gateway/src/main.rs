mod api;
mod stdio;

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

// Internal imports
use crate::api::{ErrorResponse, HealthResponse, InfoResponse, PoemRequest, PoemResponse};
use poem_core::auth::AuthContext;
use poem_core::prompt::{Arguments, PoemTool};
use poem_core::{Dispatcher, McpHandler, Registry, Settings, Transport};

// 1. Define Application State
// The handler owns the dispatcher, which owns the single upstream client.
#[derive(Clone)]
struct AppState {
    handler: Arc<McpHandler>,
    auth: AuthContext,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 2. Logging Setup
    // stdout is reserved for JSON-RPC in stdio mode
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    info!("Poem Gateway Initializing...");

    // 3. Load Settings
    let settings = Settings::from_env().context("Invalid configuration")?;
    info!(
        "Provider: {} ({}), mode: {}",
        settings.provider.kind, settings.provider.model, settings.mode
    );

    // 4. Load The Registry
    let registry = Arc::new(Registry::load().context("Failed to load tool registry")?);
    info!("Loaded {} tools.", registry.len());

    // 5. Initialize The Dispatcher (upstream client + fallback)
    let dispatcher = Dispatcher::from_settings(&settings, registry)
        .context("Failed to initialize upstream client")?;
    if !dispatcher.is_configured() {
        warn!("No upstream credential set; poem tools will report an error until POEM_API_KEY is provided");
    }

    // 6. Bundle State
    let auth = AuthContext::new(settings.auth_token.clone());
    if auth.is_enabled() {
        info!("Bearer authentication enabled");
    } else {
        warn!("MCP_AUTH_TOKEN not set; endpoints are unauthenticated");
    }
    let handler = Arc::new(McpHandler::new(Arc::new(dispatcher)));

    // 7. Pick Transport
    let transport = if std::env::args().skip(1).any(|arg| arg == "--stdio") {
        Transport::Stdio
    } else {
        settings.transport
    };
    if transport == Transport::Stdio {
        tokio::select! {
            result = stdio::run(&handler) => result?,
            _ = shutdown_signal() => {},
        }
        info!("Gateway stopped; upstream client released.");
        return Ok(());
    }

    let state = AppState { handler, auth };

    // 8. Start Server
    let listener = TcpListener::bind(settings.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", settings.bind_addr))?;
    info!("Gateway listening on {}...", settings.bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Gateway stopped; upstream client released.");
    Ok(())
}

// 9. Define Routes
fn app(state: AppState) -> Router {
    let protected = Router::new()
        .route("/mcp", post(mcp_endpoint))
        .route("/generate_poem", post(generate_poem))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received, draining connections...");
}

// --- MIDDLEWARE ---

async fn require_bearer(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let supplied = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    if state.auth.authorize(supplied) {
        next.run(request).await
    } else {
        warn!("Rejected unauthenticated request to {}", request.uri().path());
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "Invalid or missing bearer token".to_string(),
            }),
        )
            .into_response()
    }
}

// --- HANDLERS ---

async fn root() -> Json<InfoResponse> {
    Json(InfoResponse {
        message: "Poem MCP Server is running!",
        mcp_endpoint: "/mcp",
    })
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let dispatcher = state.handler.dispatcher();
    Json(HealthResponse {
        status: "ok",
        configured: dispatcher.is_configured(),
        tools: dispatcher.registry().len(),
    })
}

// JSON-RPC over HTTP. Notifications are acknowledged with 202 and no body.
async fn mcp_endpoint(State(state): State<AppState>, body: Bytes) -> Response {
    match state.handler.handle_bytes(&body).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

// The REST endpoint keeps its own default theme.
const REST_DEFAULT_THEME: &str = "nature";

async fn generate_poem(
    State(state): State<AppState>,
    Json(payload): Json<PoemRequest>,
) -> Response {
    let mut args = Arguments::new();
    for (key, value) in [
        ("theme", &payload.theme),
        ("style", &payload.style),
        ("length", &payload.length),
        ("mood", &payload.mood),
    ] {
        if let Some(value) = value {
            args.insert(key, value);
        }
    }
    if args.get("theme").is_none() {
        args.insert("theme", REST_DEFAULT_THEME);
    }
    info!("REST poem request: theme '{}'", args.theme());

    match state
        .handler
        .dispatcher()
        .compose(PoemTool::GeneratePoem, &args)
        .await
    {
        Ok(result) => Json(PoemResponse {
            poem: result.text,
            provenance: result.provenance.marker().to_string(),
        })
        .into_response(),
        Err(e) => {
            let status = if e.is_user_input() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::SERVICE_UNAVAILABLE
            };
            error!("Poem request failed: {}", e);
            (status, Json(ErrorResponse { error: e.to_string() })).into_response()
        }
    }
}
