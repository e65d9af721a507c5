//! Finsight Web Server
//!
//! Axum-based JSON API exposing the Finsight analytics engines.
//!
//! Transactions are posted inline with each request; nothing is stored
//! between requests.
//!
//! Security features:
//! - Restrictive CORS policy (same-origin unless origins are configured)
//! - Request body size limit
//! - Input validation (insight limits, forecast lengths)
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer, limit::RequestBodyLimitLayer, set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use finsight_core::{Engines, InsightsEngine, PipelineConfig};

mod handlers;

/// Upper bound on `limit` for /api/insights
pub const MAX_INSIGHTS_LIMIT: usize = 100;

/// Server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
    /// Largest accepted request body in bytes
    pub max_body_bytes: usize,
    /// Number of insights returned when a request has no `limit`
    pub max_insights: usize,
    /// Default forecast length when a request has no `days`
    pub forecast_days: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_pipeline(&PipelineConfig::default())
    }
}

impl ServerConfig {
    pub fn from_pipeline(config: &PipelineConfig) -> Self {
        Self {
            allowed_origins: config.server.allowed_origins.clone(),
            max_body_bytes: config.server.max_body_bytes,
            max_insights: config.max_insights,
            forecast_days: config.forecast_days,
        }
    }
}

/// Shared application state
pub struct AppState {
    pub config: ServerConfig,
    /// Engines shared by the single-engine endpoints and the insights engine
    pub engines: Arc<Engines>,
    pub insights: InsightsEngine,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let engines = Arc::new(Engines::default());
        let insights = InsightsEngine::with_engines(Arc::clone(&engines))
            .with_max_insights(config.max_insights)
            .with_forecast_days(config.forecast_days);
        Self {
            config,
            engines,
            insights,
        }
    }
}

/// Create the application router
pub fn create_router(config: ServerConfig) -> Router {
    let max_body_bytes = config.max_body_bytes;
    let cors = build_cors(&config.allowed_origins);
    let state = Arc::new(AppState::new(config));

    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/insights", post(handlers::generate_insights))
        .route("/patterns", post(handlers::detect_patterns))
        .route("/anomalies", post(handlers::detect_anomalies))
        .route("/forecast", post(handlers::forecast_spending))
        .route("/budget", post(handlers::optimize_budget));

    // Security headers
    let csp_value = HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'");

    Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            csp_value,
        ))
}

fn build_cors(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        return cors;
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(origins)
}

/// Start the server
pub async fn serve_with_config(host: &str, port: u16, config: ServerConfig) -> anyhow::Result<()> {
    if !config.allowed_origins.is_empty() {
        info!(origins = ?config.allowed_origins, "CORS origins configured");
    }

    let app = create_router(config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn unprocessable(msg: &str) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: msg.to_string(),
            internal: None,
        }
    }

    /// Map a core error onto a client-facing status
    ///
    /// Input problems are reported back verbatim; everything else is logged
    /// and replaced with a generic message.
    pub fn from_core(err: finsight_core::Error) -> Self {
        use finsight_core::Error;
        match err {
            Error::NotEnoughData(_) => Self::unprocessable(&err.to_string()),
            Error::InvalidData(_) | Error::Import(_) => Self::bad_request(&err.to_string()),
            other => other.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            // Keep full error for logging
            internal: Some(err),
        }
    }
}

#[cfg(test)]
mod tests;
