use crate::env_any;
use ideascout_core::{DocumentStore, Error, ResearchRecord, Result};
use serde::Deserialize;

const DEFAULT_MUTATION: &str = "saveResearch:saveResearch";

fn convex_url_from_env() -> Option<String> {
    env_any(&["IDEASCOUT_CONVEX_URL", "CONVEX_URL"])
}

fn convex_mutation_from_env() -> Option<String> {
    env_any(&["IDEASCOUT_CONVEX_MUTATION"])
}

/// Writes records through a Convex deployment's HTTP mutation API.
#[derive(Debug, Clone)]
pub struct ConvexStore {
    client: reqwest::Client,
    url: String,
    mutation: String,
}

impl ConvexStore {
    pub fn new(client: reqwest::Client, url: &str, mutation: impl Into<String>) -> Self {
        Self {
            client,
            url: url.trim().trim_end_matches('/').to_string(),
            mutation: mutation.into(),
        }
    }

    pub fn from_env(client: reqwest::Client) -> Result<Self> {
        let url = convex_url_from_env().ok_or_else(|| {
            Error::NotConfigured("missing IDEASCOUT_CONVEX_URL (or CONVEX_URL)".to_string())
        })?;
        let mutation = convex_mutation_from_env().unwrap_or_else(|| DEFAULT_MUTATION.to_string());
        Ok(Self::new(client, &url, mutation))
    }

    pub fn configured() -> bool {
        convex_url_from_env().is_some()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn endpoint_mutation(&self) -> String {
        format!("{}/api/mutation", self.url)
    }
}

#[async_trait::async_trait]
impl DocumentStore for ConvexStore {
    fn name(&self) -> &'static str {
        "convex"
    }

    async fn insert(&self, record: &ResearchRecord) -> Result<()> {
        let body = serde_json::json!({
            "path": self.mutation,
            "args": record,
            "format": "json"
        });
        let resp = self
            .client
            .post(self.endpoint_mutation())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Store(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Store(format!("convex mutation HTTP {status}")));
        }
        let parsed: MutationResponse = resp
            .json()
            .await
            .map_err(|e| Error::Store(e.to_string()))?;
        if parsed.status != "success" {
            return Err(Error::Store(format!(
                "convex mutation {}: {}",
                parsed.status,
                parsed.error_message.unwrap_or_default()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct MutationResponse {
    status: String,
    #[serde(default, rename = "errorMessage")]
    error_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Json, Router};
    use ideascout_core::ResearchReport;
    use serde_json::json;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};

    async fn serve(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn record() -> ResearchRecord {
        ResearchRecord::new(
            "notes app",
            &ResearchReport {
                keywords: "notes".to_string(),
                summary: "# Report".to_string(),
            },
            1_700_000_000_000,
        )
    }

    #[tokio::test]
    async fn insert_posts_mutation_path_and_args() {
        let seen: Arc<Mutex<Option<serde_json::Value>>> = Arc::new(Mutex::new(None));
        let seen2 = seen.clone();
        let app = Router::new().route(
            "/api/mutation",
            post(move |Json(body): Json<serde_json::Value>| {
                let seen = seen2.clone();
                async move {
                    *seen.lock().unwrap() = Some(body);
                    Json(json!({ "status": "success", "value": "id123" }))
                }
            }),
        );
        let addr = serve(app).await;
        let store = ConvexStore::new(reqwest::Client::new(), &format!("http://{addr}/"), DEFAULT_MUTATION);
        store.insert(&record()).await.unwrap();

        let body = seen.lock().unwrap().clone().unwrap();
        assert_eq!(body["path"], "saveResearch:saveResearch");
        assert_eq!(body["format"], "json");
        assert_eq!(body["args"]["idea"], "notes app");
        assert_eq!(body["args"]["createdAt"], 1_700_000_000_000i64);
    }

    #[tokio::test]
    async fn error_status_in_body_is_a_store_error() {
        let app = Router::new().route(
            "/api/mutation",
            post(|| async { Json(json!({ "status": "error", "errorMessage": "validator failed" })) }),
        );
        let addr = serve(app).await;
        let store = ConvexStore::new(reqwest::Client::new(), &format!("http://{addr}"), DEFAULT_MUTATION);
        let err = store.insert(&record()).await.unwrap_err();
        assert!(matches!(err, Error::Store(ref m) if m.contains("validator failed")), "got {err:?}");
    }
}
