use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

#[derive(Clone, Debug)]
pub struct HealthState {
    /// Engine id of the configured advisor, if any.
    pub advisor_engine: Option<String>,
    pub categorizer_enabled: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub advisor: HealthCheck,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let advisor = match &state.advisor_engine {
        Some(engine) => HealthCheck {
            status: "ready",
            detail: if state.categorizer_enabled {
                format!("{engine} advising reconciliation and categorization")
            } else {
                format!("{engine} advising reconciliation")
            },
        },
        None => HealthCheck {
            status: "disabled",
            detail: "no llm configured; reconciliation runs local-only".to_string(),
        },
    };

    let payload = HealthResponse {
        status: "ready",
        service: HealthCheck {
            status: "ready",
            detail: "eorbench-server runtime initialized".to_string(),
        },
        advisor,
        checked_at: Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(payload))
}

#[cfg(test)]
mod tests {
    use axum::{extract::State, http::StatusCode, Json};

    use crate::health::{health, HealthState};

    #[tokio::test]
    async fn health_is_ready_without_an_advisor() {
        let (status, Json(payload)) =
            health(State(HealthState { advisor_engine: None, categorizer_enabled: false })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.service.status, "ready");
        assert_eq!(payload.advisor.status, "disabled");
    }

    #[tokio::test]
    async fn health_reports_the_advisor_engine() {
        let (_, Json(payload)) = health(State(HealthState {
            advisor_engine: Some("ollama:llama3.1".to_string()),
            categorizer_enabled: true,
        }))
        .await;

        assert_eq!(payload.advisor.status, "ready");
        assert!(payload.advisor.detail.starts_with("ollama:llama3.1"));
    }
}
