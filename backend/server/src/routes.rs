use std::sync::Arc;

use axum::{Json, body::Bytes, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use tracing::debug;

use crate::{
    abacus::{AbacusBox, DEFAULT_BASE, Snapshot},
    error::AppError,
    interpreter::{Interpreter, Reading},
    state::AppState,
    utils::{get_payload, lenient_int},
};

#[derive(Deserialize, Debug)]
#[serde(default)]
pub struct BasePayload {
    #[serde(deserialize_with = "lenient_int")]
    base: i64,
}

impl Default for BasePayload {
    fn default() -> Self {
        Self { base: DEFAULT_BASE }
    }
}

#[derive(Deserialize, Debug)]
#[serde(default)]
pub struct RowPayload {
    #[serde(deserialize_with = "lenient_int")]
    y: i64,
    #[serde(deserialize_with = "lenient_int")]
    k: i64,
}

impl Default for RowPayload {
    fn default() -> Self {
        Self { y: 0, k: 1 }
    }
}

#[derive(Deserialize, Debug)]
#[serde(default)]
pub struct StepsPayload {
    #[serde(deserialize_with = "lenient_int")]
    steps: i64,
}

impl Default for StepsPayload {
    fn default() -> Self {
        Self { steps: 1 }
    }
}

pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn state_handler(State(state): State<Arc<AppState>>) -> Json<Snapshot> {
    Json(state.with_abacus(|abacus| abacus.snapshot()).await)
}

pub async fn init_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Snapshot>, AppError> {
    let BasePayload { base } = get_payload(&body)?;
    debug!("init base={base}");

    let snapshot = state
        .with_abacus(|abacus| {
            *abacus = AbacusBox::init(base)?;
            Ok::<_, AppError>(abacus.snapshot())
        })
        .await?;

    Ok(Json(snapshot))
}

pub async fn add_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Snapshot>, AppError> {
    let RowPayload { y, k } = get_payload(&body)?;
    debug!("add y={y} k={k}");

    let snapshot = state
        .with_abacus(|abacus| {
            abacus.add(y, k);
            abacus.snapshot()
        })
        .await;

    Ok(Json(snapshot))
}

pub async fn sub_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Snapshot>, AppError> {
    let RowPayload { y, k } = get_payload(&body)?;
    debug!("sub y={y} k={k}");

    let snapshot = state
        .with_abacus(|abacus| {
            abacus.sub(y, k);
            abacus.snapshot()
        })
        .await;

    Ok(Json(snapshot))
}

pub async fn mul2_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Snapshot>, AppError> {
    let StepsPayload { steps } = get_payload(&body)?;

    let (applied, snapshot) = state
        .with_abacus(|abacus| (abacus.mul2(steps), abacus.snapshot()))
        .await;
    debug!("mul2 steps={steps} applied={applied}");

    Ok(Json(snapshot))
}

pub async fn div2_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Snapshot>, AppError> {
    let StepsPayload { steps } = get_payload(&body)?;

    let (applied, snapshot) = state
        .with_abacus(|abacus| (abacus.div2(steps), abacus.snapshot()))
        .await;
    debug!("div2 steps={steps} applied={applied}");

    Ok(Json(snapshot))
}

pub async fn convert_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Snapshot>, AppError> {
    let BasePayload { base } = get_payload(&body)?;
    debug!("convert base={base}");

    let snapshot = state
        .with_abacus(|abacus| {
            abacus.convert_base(base)?;
            Ok::<_, AppError>(abacus.snapshot())
        })
        .await?;

    Ok(Json(snapshot))
}

pub async fn interpret_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Reading>, AppError> {
    let interpreter: Interpreter = get_payload(&body)?;

    let reading = state
        .with_abacus(|abacus| interpreter.read(abacus))
        .await;

    Ok(Json(reading))
}
