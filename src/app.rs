use crate::handlers;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post, put},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/journey", get(handlers::get_journey))
        .route("/api/days/:day/complete", post(handlers::complete_day))
        .route("/api/triggers", post(handlers::log_trigger))
        .route("/api/crisis-wins", post(handlers::log_crisis_win))
        .route("/api/smoked", post(handlers::log_smoked))
        .route("/api/notes", post(handlers::add_note))
        .route("/api/breath", post(handlers::increment_breath))
        .route("/api/moods/:weekday", put(handlers::set_mood))
        .route("/api/moods/:weekday/cycle", post(handlers::cycle_mood))
        .route("/api/tasks/reset", post(handlers::reset_tasks))
        .route("/api/tasks/:task/toggle", post(handlers::toggle_task))
        .route("/api/restart", post(handlers::restart))
        .route("/api/triggered", get(handlers::get_triggered))
        .route("/api/triggered/session", post(handlers::record_session))
        .route("/api/triggered/quick-win", post(handlers::quick_win))
        .route(
            "/api/membership",
            get(handlers::get_membership).put(handlers::put_membership),
        )
        .route("/api/paywall/reset", post(handlers::reset_paywall))
        .route("/api/sign-out", post(handlers::sign_out))
        .with_state(state)
}
