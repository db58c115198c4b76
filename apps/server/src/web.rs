use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use hvac_controller::plan::{self, OptimizeRequest, Planner};
use hvac_controller::weather::WeatherSource;
use hvac_controller::tools::{ToolDefinition, ToolError, ToolOutput, ToolRegistry};
use hvac_controller::{Comparison, DayProfile, FallbackStats, FuzzyController, NaiveThermostat, Reading};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

// Shared, read-only state of every handler
#[derive(Clone)]
pub struct WebState {
    pub controller: &'static FuzzyController,
    pub baseline: NaiveThermostat,
    pub tools: Arc<ToolRegistry>,
    pub planner: Option<Arc<dyn Planner>>,
    pub started_at: i64,
}

impl WebState {
    pub fn new(
        baseline: NaiveThermostat,
        planner: Option<Arc<dyn Planner>>,
        weather: Option<Arc<dyn WeatherSource>>,
    ) -> Self {
        let tools = match weather {
            Some(source) => ToolRegistry::with_hvac_tools().with_weather(source),
            None => ToolRegistry::with_hvac_tools(),
        };
        Self {
            controller: FuzzyController::shared(),
            baseline,
            tools: Arc::new(tools),
            planner,
            started_at: Utc::now().timestamp(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PowerQuery {
    indoor: f64,
    occupancy: f64,
    outdoor: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchResponse {
    pub power: Vec<f64>,
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub service: String,
    pub version: String,
    pub uptime_secs: u64,
    pub fallbacks: FallbackStats,
}

/// Handler errors, rendered as `{"detail": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Controller(#[from] hvac_controller::Error),
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error("{}", .0.body_text())]
    Query(#[from] QueryRejection),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Controller(e) if e.is_validation() => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Controller(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Tool(ToolError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Tool(ToolError::InvalidArguments(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Tool(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Query(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

pub fn router(state: WebState, static_dir: Option<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    let app = Router::new()
        .route("/api/hvac-power", get(get_hvac_power))
        .route("/api/hvac-power/batch", post(post_hvac_power_batch))
        .route("/api/tools", get(list_tools))
        .route("/api/tools/:name", post(call_tool))
        .route("/api/health", get(get_health))
        .route("/agent/optimize", post(optimize));

    let app = match static_dir {
        Some(dir) => app.fallback_service(ServeDir::new(dir)),
        None => app,
    };

    app.layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn create_web_server(
    bind: SocketAddr,
    state: WebState,
    static_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let app = router(state, static_dir);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("Starting web server on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

async fn get_hvac_power(
    State(state): State<WebState>,
    query: Result<Query<PowerQuery>, QueryRejection>,
) -> Result<Json<Comparison>, ApiError> {
    let Query(query) = query?;
    let reading = Reading::new(query.indoor, query.occupancy, query.outdoor);
    reading.validate()?;
    Ok(Json(Comparison::compute(state.controller, &state.baseline, &reading)))
}

async fn post_hvac_power_batch(
    State(state): State<WebState>,
    Json(profile): Json<DayProfile>,
) -> Result<Json<BatchResponse>, ApiError> {
    let power = profile.evaluate_with(state.controller)?;
    Ok(Json(BatchResponse { power }))
}

async fn list_tools(State(state): State<WebState>) -> Json<Vec<ToolDefinition>> {
    Json(state.tools.definitions())
}

async fn call_tool(
    State(state): State<WebState>,
    Path(name): Path<String>,
    Json(args): Json<Value>,
) -> Result<Json<ToolOutput>, ApiError> {
    Ok(Json(state.tools.execute(&name, args).await?))
}

async fn get_health(State(state): State<WebState>) -> Json<HealthStatus> {
    let uptime = Utc::now().timestamp() - state.started_at;
    Json(HealthStatus {
        status: "ok".to_string(),
        service: "hvac-server".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: uptime.max(0) as u64,
        fallbacks: state.controller.fallback_stats(),
    })
}

async fn optimize(
    State(state): State<WebState>,
    Json(request): Json<OptimizeRequest>,
) -> Result<Json<Value>, ApiError> {
    let plan = plan::optimize(state.planner.as_deref(), &request).await?;
    let normalized = plan::normalize_plan(&plan);
    Ok(Json(json!({ "ok": true, "plan": plan, "normalized": normalized })))
}
