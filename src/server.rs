use crate::config::{ServerConfig, SolveConfig, TunerConfig};
use crate::data::SchedulingInput;
use crate::domain::Domain;
use crate::engine::SolvingEngine;
use crate::error::{EngineError, ScheduleError, ServerError};
use crate::extract::ScheduleTables;
use crate::pipeline::{SolveReport, solve_input};
use crate::tuner::{DiscardSink, PenaltyTuner, Trial, TuningSummary};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct SolveRequest {
    #[serde(flatten)]
    pub input: SchedulingInput,
    #[serde(default)]
    pub config: SolveConfig,
}

#[derive(Debug, Deserialize)]
pub struct TuneRequest {
    #[serde(flatten)]
    pub input: SchedulingInput,
    #[serde(default)]
    pub tuner: TunerConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TuneResponse {
    pub summary: TuningSummary,
    pub best: Option<Trial>,
    pub best_tables: Option<ScheduleTables>,
}

impl IntoResponse for ScheduleError {
    fn into_response(self) -> Response {
        let status = match self {
            ScheduleError::Integrity(_) | ScheduleError::Config(_) => StatusCode::BAD_REQUEST,
            ScheduleError::Structural(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ScheduleError::Engine(_) | ScheduleError::Records(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

/// Runs CPU-bound solver work off the async executor.
async fn blocking<T, F>(work: F) -> Result<T, ScheduleError>
where
    F: FnOnce() -> Result<T, ScheduleError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| EngineError(format!("solver task failed: {}", e)))?
}

async fn solve_handler<E>(
    State(engine): State<Arc<E>>,
    Json(request): Json<SolveRequest>,
) -> Result<Json<SolveReport>, ScheduleError>
where
    E: SolvingEngine + Send + 'static,
{
    let SolveRequest { input, config } = request;
    let report = blocking(move || solve_input(&input, &config, engine.as_ref())).await?;
    Ok(Json(report))
}

async fn tune_handler<E>(
    State(engine): State<Arc<E>>,
    Json(request): Json<TuneRequest>,
) -> Result<Json<TuneResponse>, ScheduleError>
where
    E: SolvingEngine + Send + 'static,
{
    let TuneRequest { input, tuner } = request;
    let outcome = blocking(move || {
        let domain = Domain::from_input(&input)?;
        PenaltyTuner::new(engine.as_ref(), tuner).tune(&domain, &mut DiscardSink)
    })
    .await?;

    let best_tables = outcome.best.as_ref().map(|trial| trial.tables.clone());
    Ok(Json(TuneResponse {
        summary: outcome.summary,
        best: outcome.best,
        best_tables,
    }))
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub fn router<E>(engine: Arc<E>) -> Router
where
    E: SolvingEngine + Send + 'static,
{
    Router::new()
        .route("/health", get(healthcheck))
        .route("/v1/schedule/solve", post(solve_handler::<E>))
        .route("/v1/schedule/tune", post(tune_handler::<E>))
        .with_state(engine)
}

pub async fn run_server<E>(config: ServerConfig, engine: E) -> Result<(), ServerError>
where
    E: SolvingEngine + Send + 'static,
{
    let app = router(Arc::new(engine));
    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server running at http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DataIntegrityError, StructuralInfeasibility};

    #[test]
    fn errors_map_to_status_codes() {
        let integrity: ScheduleError = DataIntegrityError::EmptyPeriodGrid.into();
        assert_eq!(integrity.into_response().status(), StatusCode::BAD_REQUEST);

        let structural: ScheduleError = StructuralInfeasibility { issues: vec![] }.into();
        assert_eq!(
            structural.into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );

        let engine: ScheduleError = EngineError("boom".into()).into();
        assert_eq!(
            engine.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn solve_request_reads_input_and_config_from_one_body() {
        let json = r#"{
            "sections": [{"id": "S1", "courseId": "Algebra", "teacherId": "T1", "capacity": 25}],
            "teachers": [{"id": "T1"}],
            "students": [{"id": "A", "requestedCourses": ["Algebra"]}],
            "config": {"timeLimitSecs": 5.0, "weights": {"section_overload": 150.0}}
        }"#;
        let request: SolveRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.input.sections.len(), 1);
        assert_eq!(request.config.time_limit_secs, 5.0);
        assert_eq!(request.config.weight(crate::catalog::Rule::SectionOverload), 150.0);
    }
}
