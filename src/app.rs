use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/log", post(handlers::log_event))
        .route("/headaches/delete", post(handlers::delete_form))
        .route(
            "/api/headaches",
            get(handlers::list_entries).post(handlers::create_entry),
        )
        .route(
            "/api/headaches/:id",
            get(handlers::get_entry)
                .put(handlers::update_entry)
                .delete(handlers::delete_entry),
        )
        .route("/api/headaches/:id/report", get(handlers::entry_report))
        .route("/api/stats", get(handlers::get_stats))
        .route("/api/report/medical", get(handlers::medical_report))
        .route("/api/options", get(handlers::get_options))
        .route("/api/export", get(handlers::export_entries))
        .route("/api/import", post(handlers::import_entries))
        .route("/api/import/events", post(handlers::import_events))
        .route("/api/setup", get(handlers::setup_status))
        .route("/api/setup/datastore", post(handlers::save_datastore))
        .route(
            "/api/setup/patient",
            get(handlers::get_patient).post(handlers::save_patient),
        )
        .route(
            "/api/setup/pain-scale",
            get(handlers::get_pain_scale).post(handlers::save_pain_scale),
        )
        .with_state(state)
}
