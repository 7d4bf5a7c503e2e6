//! REST API for the dashboard
//!
//! Each client works in its own session, named by the `x-session-id`
//! header. A submission without the header starts a new session and the
//! response carries its id. History and busy state never cross sessions.

use crate::analysis::AnalysisError;
use crate::history::HistoryEntry;
use crate::metrics::{self, Metric, MetricRow, MetricsError, MetricsSummary, Period};
use crate::session::{SessionStore, SESSION_HEADER};
use crate::templates::{AnalysisTemplate, TemplateInfo};
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// API state
pub struct ApiState {
    pub sessions: SessionStore,
}

/// Request to analyze a prompt
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub prompt: String,
}

/// Request to run a template
#[derive(Debug, Deserialize)]
pub struct TemplateRunRequest {
    /// Template id or display name
    pub template: String,
    /// Optional: replaces the template's default prompt
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// History slice, newest first
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    /// Entries in the session's whole ledger
    pub total: usize,
    pub entries: Vec<HistoryEntry>,
}

#[derive(Debug, Deserialize)]
pub struct MetricsQuery {
    #[serde(default)]
    pub period: Option<String>,
    /// Comma separated metric names (CSV export only)
    #[serde(default)]
    pub metrics: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    pub period: Period,
    pub days: u32,
    pub summary: MetricsSummary,
    pub rows: Vec<MetricRow>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub sessions: usize,
}

/// Error body: `{"error": "..."}`
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Errors surfaced by handlers
pub enum ApiError {
    Analysis(AnalysisError),
    Metrics(MetricsError),
    Body(JsonRejection),
    UnknownSession,
}

impl From<AnalysisError> for ApiError {
    fn from(e: AnalysisError) -> Self {
        ApiError::Analysis(e)
    }
}

impl From<MetricsError> for ApiError {
    fn from(e: MetricsError) -> Self {
        ApiError::Metrics(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::Body(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::Analysis(e) => {
                let status = match &e {
                    AnalysisError::EmptyPrompt | AnalysisError::UnknownTemplate(_) => StatusCode::BAD_REQUEST,
                    AnalysisError::Busy => StatusCode::CONFLICT,
                    AnalysisError::Flow(_) => StatusCode::BAD_GATEWAY,
                };
                (status, e.to_string())
            }
            ApiError::Metrics(e) => {
                let status = match &e {
                    MetricsError::UnknownMetric(_) => StatusCode::BAD_REQUEST,
                    MetricsError::Csv(_) | MetricsError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.to_string())
            }
            ApiError::Body(e) => (e.status(), e.body_text()),
            ApiError::UnknownSession => (StatusCode::NOT_FOUND, "Unknown session".to_string()),
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

/// A body plus the session id it belongs to
type SessionReply<T> = ([(&'static str, String); 1], Json<T>);

fn session_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
}

/// Create the API router
pub fn create_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/analyze", post(analyze))
        .route("/templates", get(list_templates))
        .route("/templates/run", post(run_template))
        .route("/history", get(history))
        .route("/session", delete(end_session))
        .route("/metrics", get(metrics_table))
        .route("/metrics.csv", get(metrics_csv))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        sessions: state.sessions.len(),
    })
}

async fn analyze(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<SessionReply<HistoryEntry>, ApiError> {
    let Json(request) = payload?;
    let (id, service) = state.sessions.resolve(session_id(&headers));
    let entry = service.analyze(&request.prompt).await?;
    Ok(([(SESSION_HEADER, id)], Json(entry)))
}

async fn list_templates() -> Json<Vec<TemplateInfo>> {
    Json(AnalysisTemplate::ALL.iter().map(|t| t.info()).collect())
}

async fn run_template(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    payload: Result<Json<TemplateRunRequest>, JsonRejection>,
) -> Result<SessionReply<HistoryEntry>, ApiError> {
    let Json(request) = payload?;
    let (id, service) = state.sessions.resolve(session_id(&headers));
    let entry = service
        .run_template_named(&request.template, request.prompt.as_deref())
        .await?;
    Ok(([(SESSION_HEADER, id)], Json(entry)))
}

/// Without a known session there is nothing to show
async fn history(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Query(query): Query<HistoryQuery>,
) -> Json<HistoryResponse> {
    let limit = query.limit.unwrap_or_else(|| state.sessions.display_limit());
    let response = match session_id(&headers).and_then(|id| state.sessions.get(id)) {
        Some(service) => HistoryResponse {
            total: service.ledger().len(),
            entries: service.ledger().recent(limit),
        },
        None => HistoryResponse {
            total: 0,
            entries: Vec::new(),
        },
    };
    Json(response)
}

async fn end_session(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    match session_id(&headers) {
        Some(id) if state.sessions.end(id) => Ok(StatusCode::NO_CONTENT),
        _ => Err(ApiError::UnknownSession),
    }
}

async fn metrics_table(Query(query): Query<MetricsQuery>) -> Json<MetricsResponse> {
    let period = query.period.as_deref().map(Period::from_name).unwrap_or_default();
    let rows = metrics::generate(period);
    Json(MetricsResponse {
        period,
        days: period.days(),
        summary: metrics::summarize(&rows),
        rows,
    })
}

async fn metrics_csv(Query(query): Query<MetricsQuery>) -> Result<Response, ApiError> {
    let period = query.period.as_deref().map(Period::from_name).unwrap_or_default();
    let (selected, filename) = match query.metrics.as_deref() {
        Some(list) => (Metric::parse_list(list)?, "selected_metrics.csv"),
        None => (Metric::ALL.to_vec(), "social_media_metrics.csv"),
    };

    let rows = metrics::generate(period);
    let body = metrics::to_csv_string(&rows, &selected)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalysisSettings;
    use crate::flow::testing::ScriptedRunner;
    use crate::flow::{FlowReply, FlowRunner, RunFlowRequest};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use tokio::sync::Notify;

    async fn serve(runner: Arc<dyn FlowRunner>) -> (String, Arc<ApiState>) {
        let state = Arc::new(ApiState {
            sessions: SessionStore::new(runner, AnalysisSettings::new("flow-1")).with_display_limit(2),
        });
        let app = create_router(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}", addr), state)
    }

    async fn spawn_api(replies: Vec<FlowReply>) -> (String, Arc<ApiState>) {
        serve(Arc::new(ScriptedRunner::new(replies))).await
    }

    async fn post_analyze(client: &reqwest::Client, base: &str, session: Option<&str>, prompt: &str) -> reqwest::Response {
        let mut request = client.post(format!("{}/analyze", base)).json(&json!({ "prompt": prompt }));
        if let Some(id) = session {
            request = request.header(SESSION_HEADER, id);
        }
        request.send().await.unwrap()
    }

    async fn get_history(client: &reqwest::Client, url: String, session: Option<&str>) -> Value {
        let mut request = client.get(url);
        if let Some(id) = session {
            request = request.header(SESSION_HEADER, id);
        }
        request.send().await.unwrap().json().await.unwrap()
    }

    #[tokio::test]
    async fn test_analyze_and_history() {
        let (base, state) = spawn_api(vec![
            ScriptedRunner::text("one"),
            ScriptedRunner::text("two"),
            ScriptedRunner::text("three"),
        ])
        .await;
        let client = reqwest::Client::new();

        for prompt in ["a", "b", "c"] {
            let response = post_analyze(&client, &base, Some("s1"), prompt).await;
            assert_eq!(response.status(), 200);
            assert_eq!(response.headers()[SESSION_HEADER], "s1");
        }

        let history = get_history(&client, format!("{}/history", base), Some("s1")).await;
        assert_eq!(history["total"], 3);
        let entries = history["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["prompt"], "c");
        assert_eq!(entries[0]["response"], "three");
        assert_eq!(entries[1]["prompt"], "b");

        let all = get_history(&client, format!("{}/history?limit=10", base), Some("s1")).await;
        assert_eq!(all["entries"].as_array().unwrap().len(), 3);
        assert_eq!(state.sessions.get("s1").unwrap().ledger().len(), 3);
    }

    #[tokio::test]
    async fn test_history_is_private_to_each_session() {
        let (base, state) = spawn_api(vec![ScriptedRunner::text("secret answer")]).await;
        let alice = reqwest::Client::new();
        let bob = reqwest::Client::new();

        let response = post_analyze(&alice, &base, None, "alice private prompt").await;
        assert_eq!(response.status(), 200);
        let alice_id = response.headers()[SESSION_HEADER].to_str().unwrap().to_string();

        let anonymous = get_history(&bob, format!("{}/history", base), None).await;
        assert_eq!(anonymous["total"], 0);
        assert!(anonymous["entries"].as_array().unwrap().is_empty());

        let other = get_history(&bob, format!("{}/history", base), Some("bob")).await;
        assert!(other["entries"].as_array().unwrap().is_empty());

        let own = get_history(&alice, format!("{}/history", base), Some(&alice_id)).await;
        assert_eq!(own["entries"][0]["prompt"], "alice private prompt");
        assert_eq!(state.sessions.len(), 1);
    }

    /// Holds "slow" prompts until released, answers everything else at once
    struct SlowPromptRunner {
        started: Notify,
        release: Notify,
    }

    #[async_trait]
    impl FlowRunner for SlowPromptRunner {
        fn name(&self) -> &str {
            "slow-prompt"
        }

        async fn run_flow(&self, request: &RunFlowRequest) -> FlowReply {
            if request.input_value == "slow" {
                self.started.notify_one();
                self.release.notified().await;
            }
            ScriptedRunner::text("done")
        }
    }

    #[tokio::test]
    async fn test_busy_session_does_not_block_others() {
        let runner = Arc::new(SlowPromptRunner {
            started: Notify::new(),
            release: Notify::new(),
        });
        let (base, _state) = serve(runner.clone()).await;
        let client = reqwest::Client::new();

        let pending = tokio::spawn({
            let client = client.clone();
            let base = base.clone();
            async move { post_analyze(&client, &base, Some("a"), "slow").await.status() }
        });
        runner.started.notified().await;

        let busy = post_analyze(&client, &base, Some("a"), "again").await;
        assert_eq!(busy.status(), 409);

        let other = post_analyze(&client, &base, Some("b"), "quick").await;
        assert_eq!(other.status(), 200);

        runner.release.notify_one();
        assert_eq!(pending.await.unwrap(), 200);

        let a = get_history(&client, format!("{}/history", base), Some("a")).await;
        assert_eq!(a["total"], 1);
        assert_eq!(a["entries"][0]["prompt"], "slow");
        let b = get_history(&client, format!("{}/history", base), Some("b")).await;
        assert_eq!(b["total"], 1);
        assert_eq!(b["entries"][0]["prompt"], "quick");
    }

    #[tokio::test]
    async fn test_end_session() {
        let (base, state) = spawn_api(vec![ScriptedRunner::text("one")]).await;
        let client = reqwest::Client::new();
        post_analyze(&client, &base, Some("s1"), "hello").await;

        let ended = client
            .delete(format!("{}/session", base))
            .header(SESSION_HEADER, "s1")
            .send()
            .await
            .unwrap();
        assert_eq!(ended.status(), 204);
        assert!(state.sessions.is_empty());

        let again = client
            .delete(format!("{}/session", base))
            .header(SESSION_HEADER, "s1")
            .send()
            .await
            .unwrap();
        assert_eq!(again.status(), 404);
        let body: Value = again.json().await.unwrap();
        assert_eq!(body["error"], "Unknown session");
    }

    #[tokio::test]
    async fn test_analyze_errors() {
        let (base, state) = spawn_api(vec![FlowReply::failed("upstream timeout")]).await;
        let client = reqwest::Client::new();

        let empty = post_analyze(&client, &base, Some("s1"), "").await;
        assert_eq!(empty.status(), 400);

        let failed = post_analyze(&client, &base, Some("s1"), "hello").await;
        assert_eq!(failed.status(), 502);
        let body: Value = failed.json().await.unwrap();
        assert_eq!(body["error"], "Analysis failed: upstream timeout");

        assert!(state.sessions.get("s1").unwrap().ledger().is_empty());
    }

    #[tokio::test]
    async fn test_bad_request_bodies_get_json_errors() {
        let (base, state) = spawn_api(vec![]).await;
        let client = reqwest::Client::new();

        let missing = client
            .post(format!("{}/analyze", base))
            .json(&json!({ "text": "hi" }))
            .send()
            .await
            .unwrap();
        assert!(missing.status().is_client_error());
        let body: Value = missing.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("prompt"), "body: {}", body);

        let malformed = client
            .post(format!("{}/templates/run", base))
            .header(header::CONTENT_TYPE, "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(malformed.status(), 400);
        let body: Value = malformed.json().await.unwrap();
        assert!(body["error"].is_string());

        assert!(state.sessions.is_empty());
    }

    #[tokio::test]
    async fn test_templates() {
        let (base, _state) = spawn_api(vec![ScriptedRunner::text("insight")]).await;
        let client = reqwest::Client::new();

        let list: Value = client
            .get(format!("{}/templates", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(list.as_array().unwrap().len(), 4);
        assert_eq!(list[0]["id"], "engagement_analysis");

        let run: Value = client
            .post(format!("{}/templates/run", base))
            .json(&json!({ "template": "Competitor Analysis" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(run["prompt"], "Template: Competitor Analysis");
        assert_eq!(run["response"], "insight");

        let unknown = client
            .post(format!("{}/templates/run", base))
            .json(&json!({ "template": "horoscope" }))
            .send()
            .await
            .unwrap();
        assert_eq!(unknown.status(), 400);
    }

    #[tokio::test]
    async fn test_metrics_endpoints() {
        let (base, _state) = spawn_api(vec![]).await;
        let client = reqwest::Client::new();

        let table: Value = client
            .get(format!("{}/metrics?period=last_30_days", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(table["period"], "last_30_days");
        assert_eq!(table["rows"].as_array().unwrap().len(), 90);
        assert_eq!(table["summary"]["rows"], 90);

        let csv = client
            .get(format!("{}/metrics.csv?metrics=Likes,Views", base))
            .send()
            .await
            .unwrap();
        assert_eq!(csv.status(), 200);
        assert_eq!(csv.headers()[header::CONTENT_TYPE], "text/csv");
        let text = csv.text().await.unwrap();
        assert_eq!(text.lines().next(), Some("Date,Post Type,Likes,Views"));
        assert_eq!(text.lines().count(), 1 + 21);

        let bad = client
            .get(format!("{}/metrics.csv?metrics=reach", base))
            .send()
            .await
            .unwrap();
        assert_eq!(bad.status(), 400);
    }
}
