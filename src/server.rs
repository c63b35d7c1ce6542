//! HTTP interface
//!
//! Routes:
//! - `GET /flight?iata=<code>`: aggregated flight record, requires the shared
//!   secret header
//! - `GET /flight/sample`: fixed illustrative record for client integration
//! - `GET /health`: cache reachability
//! - `GET /`: service banner
//!
//! This is the only layer that turns [`FlightError`]s into responses.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::{debug, error, info, warn};

use crate::aggregator::Aggregator;
use crate::data::{Airline, AirportInfo, FlightRecord, FlightStatus, Geography, Leg, Speed};
use crate::error::FlightError;

/// Header carrying the shared secret
pub const SECRET_HEADER: &str = "x-flightbar-secret";

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    pub shared_secret: Arc<str>,
}

impl AppState {
    pub fn new(aggregator: Arc<Aggregator>, shared_secret: impl Into<Arc<str>>) -> Self {
        Self {
            aggregator,
            shared_secret: shared_secret.into(),
        }
    }
}

/// Builds the router with a request-level timeout, tracing and panic
/// recovery
pub fn router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/flight", get(flight))
        .route("/flight/sample", get(flight_sample))
        .route("/health", get(health))
        .layer(middleware::from_fn_with_state(request_timeout, enforce_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

/// Abandons requests that outlive `limit`; dropping the handler future
/// cancels its upstream calls
async fn enforce_timeout(State(limit): State<Duration>, request: Request, next: Next) -> Response {
    match tokio::time::timeout(limit, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            warn!(?limit, "request timed out");
            ApiError(FlightError::Unavailable(format!(
                "request timed out after {}s",
                limit.as_secs_f64()
            )))
            .into_response()
        }
    }
}

/// Turns a handler panic into an `unexpected` error response
fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "request handler panicked".to_string()
    };
    ApiError(FlightError::Unexpected(detail)).into_response()
}

/// Serves `router` until ctrl-c
pub async fn serve(listener: TcpListener, router: Router) -> std::io::Result<()> {
    info!(
        "starting FlightBar server: {}",
        listener.local_addr().map(|a| a.to_string()).unwrap_or_default()
    );
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("FlightBar server has been shut down.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("starting graceful shutdown...");
}

#[derive(Debug, Deserialize)]
struct FlightQuery {
    iata: Option<String>,
}

async fn flight(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<FlightQuery>,
) -> Result<Json<FlightRecord>, ApiError> {
    authorize(&headers, &state.shared_secret)?;
    let code = normalize_flight_code(query.iata.as_deref().unwrap_or_default())?;
    let record = state.aggregator.get_flight(&code).await?;
    Ok(Json(record))
}

async fn flight_sample() -> Json<FlightRecord> {
    Json(sample_flight())
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub cache: String,
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    match state.aggregator.cache().ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok".to_string(),
                cache: "reachable".to_string(),
            }),
        ),
        Err(e) => {
            warn!(error = %e, "cache ping failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded".to_string(),
                    cache: "unreachable".to_string(),
                }),
            )
        }
    }
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "FlightBar server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Checks the shared secret header
fn authorize(headers: &HeaderMap, shared_secret: &str) -> Result<(), FlightError> {
    let presented = headers
        .get(SECRET_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(FlightError::AuthFailure)?;

    if constant_time_eq(presented.as_bytes(), shared_secret.as_bytes()) {
        Ok(())
    } else {
        Err(FlightError::AuthFailure)
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Trims and uppercases a flight code, rejecting anything that is not 2-8
/// ASCII alphanumerics
pub fn normalize_flight_code(raw: &str) -> Result<String, FlightError> {
    let code = raw.trim().to_ascii_uppercase();
    let valid = (2..=8).contains(&code.len()) && code.chars().all(|c| c.is_ascii_alphanumeric());
    if valid {
        Ok(code)
    } else {
        Err(FlightError::InvalidFlightCode(raw.to_string()))
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    detail: String,
}

/// [`FlightError`] as an HTTP response
#[derive(Debug)]
pub struct ApiError(pub FlightError);

impl From<FlightError> for ApiError {
    fn from(err: FlightError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            FlightError::ScheduleNotFound(_) | FlightError::AirportNotFound(_) => StatusCode::NOT_FOUND,
            FlightError::Unavailable(_) | FlightError::Parse(_) => StatusCode::BAD_GATEWAY,
            FlightError::AuthFailure => StatusCode::UNAUTHORIZED,
            FlightError::InvalidFlightCode(_) => StatusCode::BAD_REQUEST,
            FlightError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        } else {
            debug!(error = %self.0, "request rejected");
        }

        let body = ErrorBody {
            error: self.0.kind(),
            detail: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Fixed record served by `/flight/sample`
pub fn sample_flight() -> FlightRecord {
    FlightRecord {
        flight_no: "AC39".to_string(),
        airline: Airline {
            iata: "AC".to_string(),
            name: "Air Canada".to_string(),
        },
        departure: Leg {
            iata: "YVR".to_string(),
            scheduled_time: "2025-01-15T23:45:00.000".to_string(),
            estimated_time: Some("2025-01-15T23:45:00.000".to_string()),
            actual_time: Some("2025-01-15T23:52:00.000".to_string()),
            delay: None,
            persistent: Some(AirportInfo {
                name: "Vancouver International Airport".to_string(),
                country: "CA".to_string(),
                timezone: "America/Vancouver".to_string(),
                latitude: 49.193901062,
                longitude: -123.1839981,
            }),
        },
        arrival: Leg {
            iata: "AKL".to_string(),
            scheduled_time: "2025-01-17T11:00:00.000".to_string(),
            estimated_time: Some("2025-01-17T10:41:00.000".to_string()),
            actual_time: Some("2025-01-17T10:38:00.000".to_string()),
            delay: None,
            persistent: Some(AirportInfo {
                name: "Auckland International Airport".to_string(),
                country: "NZ".to_string(),
                timezone: "Pacific/Auckland".to_string(),
                latitude: -37.00805664,
                longitude: 174.7920074,
            }),
        },
        status: FlightStatus::Landed,
        speed: Speed::default(),
        geography: Geography::default(),
        // 2025-01-17T09:00:00Z
        timestamp: DateTime::<Utc>::from_timestamp(1_737_104_400, 0).unwrap_or_default(),
        flight_mins: 855,
    }
}
