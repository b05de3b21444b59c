use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use eorbench_core::config::{is_currency_code, ReconciliationConfig};
use eorbench_core::errors::{ApplicationError, DomainError, InterfaceError};
use eorbench_core::pricing::{compare_providers, ProviderComparison, ProviderQuoteInput};
use eorbench_core::reconciliation::{
    AdvisorError, CategorizationRequest, CategorizedCosts, CostCategorizer, ReconciliationRequest,
    ReconciliationResult, ReconciliationService,
};
use eorbench_core::{enrich_quote_with_local_office, CurrencyConverter, LocalOfficeOptions, Quote};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub settings: ReconciliationConfig,
    pub reconciliation: ReconciliationService,
    pub converter: Arc<dyn CurrencyConverter>,
    pub categorizer: Option<Arc<dyn CostCategorizer>>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareRequest {
    pub quotes: Vec<ProviderQuoteInput>,
    #[serde(default)]
    pub contract_months: Option<u32>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichRequest {
    pub quote: Quote,
    #[serde(flatten)]
    pub options: LocalOfficeOptions,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    correlation_id: String,
}

/// HTTP rendering of an [`InterfaceError`].
#[derive(Debug)]
pub struct ApiError(pub InterfaceError);

impl ApiError {
    fn from_application(error: impl Into<ApplicationError>, correlation_id: &str) -> Self {
        Self(error.into().into_interface(correlation_id))
    }

    fn bad_request(message: impl Into<String>, correlation_id: &str) -> Self {
        Self::from_application(DomainError::MalformedInput(message.into()), correlation_id)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match &self.0 {
            InterfaceError::BadRequest { .. } => (StatusCode::BAD_REQUEST, "bad_request"),
            InterfaceError::Upstream { .. } => (StatusCode::BAD_GATEWAY, "upstream_failure"),
            InterfaceError::ServiceUnavailable { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable")
            }
        };

        if status.is_server_error() {
            error!(
                event_name = "api.request.failed",
                correlation_id = %self.0.correlation_id(),
                status = status.as_u16(),
                error = %self.0,
                "request failed"
            );
        } else {
            warn!(
                event_name = "api.request.rejected",
                correlation_id = %self.0.correlation_id(),
                error = %self.0,
                "request rejected"
            );
        }

        let message = match &self.0 {
            InterfaceError::BadRequest { message, .. } => message.clone(),
            other => format!("{} ({})", other.user_message(), other.message()),
        };
        let body = ErrorBody {
            error,
            message,
            correlation_id: self.0.correlation_id().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/reconcile", post(reconcile))
        .route("/api/v1/quotes/compare", post(compare))
        .route("/api/v1/quotes/enrich", post(enrich))
        .route("/api/v1/quotes/categorize", post(categorize))
        .with_state(state)
}

fn correlation_id() -> String {
    Uuid::new_v4().to_string()
}

fn payload<T>(
    payload: Result<Json<T>, JsonRejection>,
    correlation_id: &str,
) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text(), correlation_id))
}

async fn reconcile(
    State(state): State<AppState>,
    request: Result<Json<ReconciliationRequest>, JsonRejection>,
) -> Result<Json<ReconciliationResult>, ApiError> {
    let correlation_id = correlation_id();
    let request = payload(request, &correlation_id)?;

    let result = state
        .reconciliation
        .run(&request, &state.settings, state.converter.as_ref())
        .await
        .map_err(|error| ApiError::from_application(error, &correlation_id))?;

    info!(
        event_name = "api.reconcile.completed",
        correlation_id = %correlation_id,
        quotes = request.enhancements.len(),
        discrepancies = result.discrepancies.len(),
        engine = %result.metadata.engine,
        "reconciliation request served"
    );
    Ok(Json(result))
}

async fn compare(
    State(state): State<AppState>,
    request: Result<Json<CompareRequest>, JsonRejection>,
) -> Result<Json<ProviderComparison>, ApiError> {
    let correlation_id = correlation_id();
    let request = payload(request, &correlation_id)?;

    if request.quotes.is_empty() {
        return Err(ApiError::bad_request("quotes must not be empty", &correlation_id));
    }
    let contract_months = request.contract_months.unwrap_or(state.settings.contract_months);
    if contract_months == 0 {
        return Err(ApiError::bad_request("contractMonths must be at least 1", &correlation_id));
    }

    let comparison = compare_providers(&request.quotes, i64::from(contract_months))
        .map_err(|error| ApiError::from_application(error, &correlation_id))?;
    info!(
        event_name = "api.compare.completed",
        correlation_id = %correlation_id,
        ranked = comparison.ranked.len(),
        excluded = comparison.excluded.len(),
        "provider comparison served"
    );
    Ok(Json(comparison))
}

async fn enrich(
    State(state): State<AppState>,
    request: Result<Json<EnrichRequest>, JsonRejection>,
) -> Result<Json<Quote>, ApiError> {
    let correlation_id = correlation_id();
    let EnrichRequest { quote, options } = payload(request, &correlation_id)?;

    if !is_currency_code(options.currency.trim()) {
        return Err(ApiError::bad_request(
            format!("currency `{}` is not an ISO 4217 code", options.currency),
            &correlation_id,
        ));
    }

    let enriched = enrich_quote_with_local_office(quote, &options, state.converter.as_ref())
        .await
        .map_err(|error| ApiError::from_application(error, &correlation_id))?;

    info!(
        event_name = "api.enrich.completed",
        correlation_id = %correlation_id,
        country = %enriched.country,
        items = enriched.costs.len(),
        "quote enrichment served"
    );
    Ok(Json(enriched))
}

async fn categorize(
    State(state): State<AppState>,
    request: Result<Json<CategorizationRequest>, JsonRejection>,
) -> Result<Json<CategorizedCosts>, ApiError> {
    let correlation_id = correlation_id();
    let request = payload(request, &correlation_id)?;

    let Some(categorizer) = state.categorizer.as_ref() else {
        return Err(ApiError::from_application(AdvisorError::NotConfigured, &correlation_id));
    };
    let costs = categorizer
        .categorize_cost_items(&request)
        .await
        .map_err(|error| ApiError::from_application(error, &correlation_id))?;

    info!(
        event_name = "api.categorize.completed",
        correlation_id = %correlation_id,
        provider = %costs.provider,
        items = costs.items.len(),
        engine = %costs.engine,
        "cost categorization served"
    );
    Ok(Json(costs))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use eorbench_core::config::ReconciliationConfig;
    use eorbench_core::reconciliation::{
        AdvisorError, CategorizationRequest, CategorizedCosts, CategorizedItem, CostCategorizer,
        CostCategory, ReconciliationAdvisor, ReconciliationInput, ReconciliationResult,
        ReconciliationService, Recommendation,
    };
    use eorbench_core::FixedRateConverter;
    use rust_decimal::Decimal;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::{router, AppState};

    struct EverythingIsAFee;

    #[async_trait]
    impl CostCategorizer for EverythingIsAFee {
        async fn categorize_cost_items(
            &self,
            request: &CategorizationRequest,
        ) -> Result<CategorizedCosts, AdvisorError> {
            Ok(CategorizedCosts {
                provider: request.provider.clone(),
                currency: request.currency.clone(),
                items: request
                    .cost_items
                    .iter()
                    .map(|item| CategorizedItem {
                        name: item.name.clone(),
                        amount: item.amount,
                        frequency: item.frequency,
                        category: CostCategory::ProviderFee,
                    })
                    .collect(),
                engine: "stub".to_string(),
            })
        }
    }

    struct UnreachableAdvisor;

    #[async_trait]
    impl ReconciliationAdvisor for UnreachableAdvisor {
        fn engine_id(&self) -> &str {
            "ollama:unreachable"
        }

        async fn recommend(
            &self,
            _input: &ReconciliationInput,
            _local: &ReconciliationResult,
        ) -> Result<Vec<Recommendation>, AdvisorError> {
            Err(AdvisorError::Transport("connection refused".to_string()))
        }
    }

    fn drifting_request(currency: &str, use_llm: bool) -> Value {
        json!({
            "enhancements": [{
                "provider": "deel",
                "currency": currency,
                "baseQuote": {"monthlyTotal": "2000"},
                "totalEnhancement": "150",
                "finalTotal": "2500"
            }],
            "targetCurrency": "USD",
            "useLLM": use_llm
        })
    }

    fn state(categorizer: Option<Arc<dyn CostCategorizer>>) -> AppState {
        let rates = BTreeMap::from([("EUR".to_string(), Decimal::new(9, 1))]);
        AppState {
            settings: ReconciliationConfig::default(),
            reconciliation: ReconciliationService::local_only(),
            converter: Arc::new(FixedRateConverter::new("USD", rates)),
            categorizer,
        }
    }

    async fn post(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request");
        let response = app.oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn reconcile_returns_a_local_result() {
        let (status, body) = post(
            router(state(None)),
            "/api/v1/reconcile",
            json!({
                "enhancements": [{
                    "provider": "deel",
                    "baseQuote": {"monthlyTotal": "2000"},
                    "monthlyCostBreakdown": {"baseCost": "2000", "enhancements": "150"},
                    "finalTotal": "2150"
                }],
                "targetCurrency": "USD"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["discrepancies"], json!([]));
        assert_eq!(body["metadata"]["engine"], "local-only");
        assert_eq!(body["metadata"]["currency"], "USD");
    }

    #[tokio::test]
    async fn reconcile_rejects_a_missing_currency_with_a_correlation_id() {
        let (status, body) = post(
            router(state(None)),
            "/api/v1/reconcile",
            json!({"enhancements": [], "targetCurrency": ""}),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "bad_request");
        assert!(!body["correlation_id"].as_str().unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn reconcile_with_a_failing_advisor_serves_the_local_result() {
        let mut state = state(None);
        state.reconciliation = ReconciliationService::with_advisor(Arc::new(UnreachableAdvisor));

        let (status, body) =
            post(router(state), "/api/v1/reconcile", drifting_request("USD", true)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["metadata"]["engine"], "local-only");
        assert_eq!(body["discrepancies"][0]["provider"], "deel");
        assert_eq!(body["recommendations"], json!([]));
    }

    #[tokio::test]
    async fn reconcile_maps_conversion_failures_to_bad_gateway() {
        let (status, body) =
            post(router(state(None)), "/api/v1/reconcile", drifting_request("JPY", false)).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "upstream_failure");
        assert!(body["message"].as_str().unwrap_or_default().contains("JPY->USD"));
        assert!(!body["correlation_id"].as_str().unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn oversized_amounts_are_bad_requests() {
        let huge = "70000000000000000000000000000";
        let (status, body) = post(
            router(state(None)),
            "/api/v1/reconcile",
            json!({
                "enhancements": [{
                    "provider": "deel",
                    "baseQuote": {"monthlyTotal": huge},
                    "totalEnhancement": huge
                }],
                "targetCurrency": "USD"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "bad_request");

        let (status, _) = post(
            router(state(None)),
            "/api/v1/quotes/compare",
            json!({"quotes": [{"provider": "remote", "raw": {"monthly_total": huge}}]}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/quotes/compare")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .expect("request");
        let response = router(state(None)).oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn compare_ranks_cheapest_first() {
        let (status, body) = post(
            router(state(None)),
            "/api/v1/quotes/compare",
            json!({
                "quotes": [
                    {"provider": "remote", "raw": {"monthly_total": 3100}},
                    {"provider": "deel", "raw": {"total_costs": 2900}},
                    {"provider": "acme", "raw": {"total": 10}}
                ]
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ranked"][0]["provider"], "deel");
        assert_eq!(body["ranked"][1]["provider"], "remote");
        assert_eq!(body["excluded"][0]["provider"], "acme");
    }

    #[tokio::test]
    async fn compare_requires_quotes() {
        let (status, body) =
            post(router(state(None)), "/api/v1/quotes/compare", json!({"quotes": []})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "quotes must not be empty");
    }

    #[tokio::test]
    async fn enrich_appends_local_office_costs() {
        let (status, body) = post(
            router(state(None)),
            "/api/v1/quotes/enrich",
            json!({
                "quote": {
                    "country": "Portugal",
                    "countryCode": "PT",
                    "currency": "EUR",
                    "salary": "2000",
                    "costs": [],
                    "totalCosts": "2000"
                },
                "currency": "EUR",
                "localOfficeInfo": {"mealVoucher": {"value": "150"}}
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let costs = body["costs"].as_array().cloned().unwrap_or_default();
        assert_eq!(costs.len(), 1);
        assert_eq!(costs[0]["name"], "Meal Voucher (Local Office)");
        assert_eq!(body["totalCosts"], "2150");
    }

    #[tokio::test]
    async fn enrich_rejects_invalid_currency() {
        let (status, _) = post(
            router(state(None)),
            "/api/v1/quotes/enrich",
            json!({
                "quote": {"currency": "EUR", "totalCosts": "0"},
                "currency": "euro"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn categorize_is_unavailable_without_a_model() {
        let request = json!({
            "provider": "oyster",
            "country": "Portugal",
            "currency": "EUR",
            "costItems": [{"name": "Oyster fee", "amount": "499", "frequency": "monthly"}]
        });

        let (status, body) =
            post(router(state(None)), "/api/v1/quotes/categorize", request.clone()).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "service_unavailable");

        let (status, body) = post(
            router(state(Some(Arc::new(EverythingIsAFee)))),
            "/api/v1/quotes/categorize",
            request,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"][0]["category"], "provider_fee");
        assert_eq!(body["engine"], "stub");
    }
}
