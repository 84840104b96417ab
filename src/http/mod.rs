//! HTTP/JSON surface over the same operations as the gRPC services.

use crate::app::Jwts;
use crate::error::TokenError;
use crate::jwks::Jwks;
use crate::metrics;
use crate::observability;
use axum::body::Bytes;
use axum::extract::{MatchedPath, Request, State};
use axum::http::header::{HeaderName, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

const CORS_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Clone)]
pub struct AppState {
    pub core: Arc<Jwts>,
}

/// Optional parts of the router.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouterOptions {
    pub cors: bool,
    pub metrics: bool,
}

pub fn build_router(state: AppState, options: RouterOptions) -> Router {
    let mut router = Router::new()
        .route("/jwk/set", get(jwk_set))
        .route("/jwt", post(create_jwt))
        .route("/jwt/validate", put(validate_jwt))
        .route("/healthcheck", get(healthcheck));

    if options.metrics {
        router = router.route("/metrics", get(metrics_text));
    }

    let router = router
        .route_layer(middleware::from_fn(track_request))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request| observability::request_span("http", request)),
        )
        .layer(CatchPanicLayer::new());

    let router = if options.cors {
        router.layer(cors_layer())
    } else {
        router
    };

    router.with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([Method::GET, Method::PUT, Method::POST, Method::DELETE])
        .allow_headers([
            ACCEPT,
            CONTENT_TYPE,
            HeaderName::from_static("x-requested-with"),
            AUTHORIZATION,
        ])
        .allow_credentials(true)
        .max_age(CORS_MAX_AGE)
}

async fn track_request(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());

    let response = next.run(request).await;
    metrics::record_request(
        "http",
        &path,
        response.status().as_str(),
        started.elapsed().as_secs_f64(),
    );
    response
}

/// Error envelope returned with status 400.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorRep {
    pub error_code: String,
    pub desc: String,
}

#[derive(Debug)]
pub struct ApiError(TokenError);

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let desc = match &self.0 {
            TokenError::Signing(_) | TokenError::Internal(_) => {
                warn!(error = %self.0, "HTTP handler error");
                "internal error".to_string()
            }
            err => {
                info!(error = %err, "HTTP handler error");
                err.to_string()
            }
        };
        let body = ErrorRep {
            error_code: self.0.error_code().to_string(),
            desc,
        };
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

async fn jwk_set(State(state): State<AppState>) -> Json<Jwks> {
    Json(state.core.jwk_set().cloned().unwrap_or_default())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtCreateRep {
    pub token: String,
}

/// The whole body becomes the payload; `sub` and `exp_seconds` are read from
/// it as well.
async fn create_jwt(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<JwtCreateRep>, ApiError> {
    let payload = match serde_json::from_slice::<Value>(&body) {
        Ok(Value::Object(payload)) => payload,
        Ok(_) => return Err(TokenError::invalid_request("body must be a JSON object").into()),
        Err(e) => {
            return Err(TokenError::invalid_request(format!("fail to parse body: {e}")).into())
        }
    };

    let subject = match payload.get("sub") {
        None => String::new(),
        Some(Value::String(sub)) => sub.clone(),
        Some(_) => return Err(TokenError::invalid_request("sub must be string").into()),
    };

    let exp_seconds = match payload.get("exp_seconds") {
        None => 0,
        Some(raw) => parse_exp_seconds(raw).ok_or_else(|| {
            warn!(exp_seconds = %raw, "fail to parse exp_seconds");
            TokenError::invalid_request("fail to parse exp_seconds")
        })?,
    };

    let token = state.core.create(&subject, exp_seconds, payload)?;
    Ok(Json(JwtCreateRep { token }))
}

/// Accepts a JSON number or a numeric string; fractions are truncated.
pub fn parse_exp_seconds(raw: &Value) -> Option<i64> {
    let seconds = match raw {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !seconds.is_finite() {
        return None;
    }
    Some(seconds.trunc() as i64)
}

#[derive(Debug, Default, Deserialize)]
struct JwtValidateReq {
    #[serde(default)]
    token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtValidateRep {
    pub valid: bool,
    pub claims: Value,
}

async fn validate_jwt(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<JwtValidateRep>, ApiError> {
    let req: JwtValidateReq = serde_json::from_slice(&body)
        .map_err(|e| TokenError::invalid_request(format!("fail to parse body: {e}")))?;

    let validation = state.core.validate(&req.token)?;
    Ok(Json(JwtValidateRep {
        valid: validation.valid,
        claims: Value::Object(validation.claims),
    }))
}

async fn healthcheck() -> StatusCode {
    StatusCode::OK
}

async fn metrics_text() -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::gather_text(),
    )
}
