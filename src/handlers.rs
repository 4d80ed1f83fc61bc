use crate::errors::AppError;
use crate::journey::Outcome;
use crate::membership::{get_membership_status, set_membership_status};
use crate::models::{ActionResponse, JourneySnapshot, MembershipStatus, Mood, NoteRequest, TaskKey, TriggerRequest};
use crate::state::AppState;
use crate::triggered::TriggeredStats;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::debug;

pub async fn get_journey(State(state): State<AppState>) -> Json<JourneySnapshot> {
    Json(state.journey.snapshot().await)
}

pub async fn complete_day(
    State(state): State<AppState>,
    Path(day): Path<u32>,
) -> Result<Json<ActionResponse>, AppError> {
    let outcome = state.journey.mark_day_complete(day).await;
    if !outcome.applied {
        debug!(day, "day completion ignored");
    }
    respond(&state, outcome).await
}

pub async fn log_trigger(
    State(state): State<AppState>,
    Json(payload): Json<TriggerRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    let outcome = state
        .journey
        .log_trigger(payload.intensity, payload.emotion.trim(), payload.situation.trim())
        .await;
    respond(&state, outcome).await
}

pub async fn log_crisis_win(State(state): State<AppState>) -> Result<Json<ActionResponse>, AppError> {
    let outcome = state.journey.log_crisis_win().await;
    respond(&state, outcome).await
}

pub async fn log_smoked(State(state): State<AppState>) -> Result<Json<ActionResponse>, AppError> {
    let outcome = state.journey.log_smoked().await;
    respond(&state, outcome).await
}

pub async fn add_note(
    State(state): State<AppState>,
    Json(payload): Json<NoteRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    let outcome = state.journey.add_note(&payload.text).await;
    respond(&state, outcome).await
}

pub async fn increment_breath(State(state): State<AppState>) -> Result<Json<ActionResponse>, AppError> {
    let outcome = state.journey.increment_breath().await;
    respond(&state, outcome).await
}

pub async fn set_mood(
    State(state): State<AppState>,
    Path(weekday): Path<String>,
    Json(mood): Json<Option<Mood>>,
) -> Result<Json<ActionResponse>, AppError> {
    let outcome = state.journey.set_mood_for_day(&weekday, mood).await;
    respond(&state, outcome).await
}

pub async fn cycle_mood(
    State(state): State<AppState>,
    Path(weekday): Path<String>,
) -> Result<Json<ActionResponse>, AppError> {
    let applied = state.journey.cycle_mood(&weekday).await.is_some();
    respond(
        &state,
        Outcome {
            applied,
            show_paywall: false,
        },
    )
    .await
}

pub async fn toggle_task(
    State(state): State<AppState>,
    Path(task): Path<String>,
) -> Result<Json<ActionResponse>, AppError> {
    let task: TaskKey = task.parse().map_err(AppError::bad_request)?;
    let outcome = state.journey.toggle_task(task).await;
    respond(&state, outcome).await
}

pub async fn reset_tasks(State(state): State<AppState>) -> Result<Json<ActionResponse>, AppError> {
    let outcome = state.journey.reset_daily_tasks().await;
    respond(&state, outcome).await
}

pub async fn restart(State(state): State<AppState>) -> Result<Json<ActionResponse>, AppError> {
    let outcome = state.journey.set_start_today().await;
    respond(&state, outcome).await
}

pub async fn get_triggered(State(state): State<AppState>) -> Json<TriggeredStats> {
    Json(state.triggered.snapshot().await)
}

pub async fn record_session(State(state): State<AppState>) -> Json<TriggeredStats> {
    Json(state.triggered.record_session().await)
}

pub async fn quick_win(State(state): State<AppState>) -> Json<TriggeredStats> {
    Json(state.triggered.quick_win().await)
}

pub async fn get_membership(State(state): State<AppState>) -> Result<Json<MembershipStatus>, AppError> {
    get_membership_status(&state.store)
        .await
        .map(Json)
        .ok_or_else(|| AppError::not_found("no membership recorded"))
}

pub async fn put_membership(
    State(state): State<AppState>,
    Json(status): Json<MembershipStatus>,
) -> Result<Json<MembershipStatus>, AppError> {
    set_membership_status(&state.store, status).await?;
    Ok(Json(status))
}

pub async fn reset_paywall(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.gate.reset().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn sign_out(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.sign_out().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn respond(state: &AppState, outcome: Outcome) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(ActionResponse {
        journey: state.journey.snapshot().await,
        show_paywall: outcome.show_paywall,
    }))
}
