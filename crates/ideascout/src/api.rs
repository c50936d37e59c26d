use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use ideascout_core::{DocumentStore, Error, ResearchRecord, ResearchReport};
use ideascout_local::research::ResearchPipeline;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};

pub const MISSING_QUERY: &str = "Missing query text";
pub const QUOTA_EXCEEDED: &str = "Provider quota exceeded. Check billing.";
pub const INTERNAL_ERROR: &str = "Internal server error. Try again later.";

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ResearchPipeline>,
    /// `None` disables persistence.
    pub store: Option<Arc<dyn DocumentStore>>,
}

impl AppState {
    pub fn new(pipeline: ResearchPipeline, store: Option<Arc<dyn DocumentStore>>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            store,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ResearchRequest {
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    version: &'static str,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/research", post(research))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

fn error_response(status: StatusCode, error: &'static str) -> Response {
    (status, Json(ErrorBody { error })).into_response()
}

/// Status and public message for a pipeline failure. Details stay in the logs.
pub fn status_for(e: &Error) -> (StatusCode, &'static str) {
    match e {
        Error::InvalidInput(_) => (StatusCode::BAD_REQUEST, MISSING_QUERY),
        e if e.is_quota() => (StatusCode::TOO_MANY_REQUESTS, QUOTA_EXCEEDED),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR),
    }
}

async fn research(
    State(state): State<AppState>,
    body: Result<Json<ResearchRequest>, JsonRejection>,
) -> Response {
    let query = match body {
        Ok(Json(req)) => req.query.unwrap_or_default(),
        Err(rejection) => {
            warn!(error = %rejection, "rejected research request body");
            return error_response(StatusCode::BAD_REQUEST, MISSING_QUERY);
        }
    };
    if query.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, MISSING_QUERY);
    }

    match state.pipeline.run(&query).await {
        Ok(report) => {
            if let Some(store) = &state.store {
                let record = ResearchRecord::new(
                    query.trim(),
                    &report,
                    chrono::Utc::now().timestamp_millis(),
                );
                crate::persist::spawn_save(store.clone(), record);
            }
            (StatusCode::OK, Json::<ResearchReport>(report)).into_response()
        }
        Err(e) => {
            let (status, message) = status_for(&e);
            if status.is_server_error() {
                error!(error = %e, "research failed");
            } else {
                warn!(error = %e, status = status.as_u16(), "research failed");
            }
            error_response(status, message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_taxonomy_maps_to_status_codes() {
        assert_eq!(
            status_for(&Error::InvalidInput("x".into())).0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&Error::RateLimited("x".into())).0,
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            status_for(&Error::RetriesExhausted { attempts: 3 }),
            (StatusCode::TOO_MANY_REQUESTS, QUOTA_EXCEEDED)
        );
        for e in [
            Error::Search("x".into()),
            Error::Llm("x".into()),
            Error::Scrape("x".into()),
            Error::Store("x".into()),
            Error::NotConfigured("x".into()),
        ] {
            assert_eq!(
                status_for(&e),
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR)
            );
        }
    }
}
