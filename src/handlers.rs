use crate::config::{DatastoreConfig, PainScale, PainScaleRequest, PatientProfile, SetupStatus};
use crate::errors::{AppError, StoreError};
use crate::events::{apply_event, reassemble, HeadacheEvent};
use crate::models::{
    DashboardStats, DeleteResponse, EntryPatch, HeadacheEntry, ImportSummary, NewEntry, StatsQuery,
};
use crate::options::ReferenceData;
use crate::reports::{medical_summary, EntryReport, ListQuery, MedicalSummary};
use crate::state::AppState;
use crate::stats::build_stats;
use crate::ui::render_index;
use axum::{
    extract::{
        rejection::{FormRejection, JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect},
    Form, Json,
};
use chrono::Local;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

pub async fn index(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let entries = state.store.get_all().await?;
    let stats = build_stats(&entries, None);
    let setup = state.config.status().await;
    Ok(Html(render_index(&today_string(), &stats, &setup)))
}

pub async fn list_entries(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<HeadacheEntry>>, AppError> {
    let Query(query) = query?;
    let entries = state.store.get_all().await?;
    let options = state.reference_data().await;
    Ok(Json(query.apply(entries, &options)?))
}

pub async fn create_entry(
    State(state): State<AppState>,
    payload: Result<Json<NewEntry>, JsonRejection>,
) -> Result<(StatusCode, Json<HeadacheEntry>), AppError> {
    let Json(new) = payload?;
    let entry = state.store.create(new).await?;
    info!(id = %entry.id, kind = entry.kind.as_str(), "logged headache");
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn get_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<HeadacheEntry>, AppError> {
    let entry = state.store.get_by_id(&id).await?.ok_or_else(|| missing(&id))?;
    Ok(Json(entry))
}

pub async fn update_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<EntryPatch>, JsonRejection>,
) -> Result<Json<HeadacheEntry>, AppError> {
    let Json(patch) = payload?;
    let entry = state.store.update(&id, patch).await?.ok_or_else(|| missing(&id))?;
    info!(%id, "updated headache");
    Ok(Json(entry))
}

pub async fn delete_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    if !state.store.delete(&id).await? {
        return Err(missing(&id));
    }
    info!(%id, "deleted headache");
    Ok(Json(DeleteResponse { success: true }))
}

pub async fn entry_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EntryReport>, AppError> {
    let entry = state.store.get_by_id(&id).await?.ok_or_else(|| missing(&id))?;
    let settings = state.settings.read().await;
    let options = ReferenceData::for_patient(settings.patient.as_ref());
    Ok(Json(EntryReport::build(entry, &options, settings.pain_scale.as_ref())))
}

pub async fn get_stats(
    State(state): State<AppState>,
    query: Result<Query<StatsQuery>, QueryRejection>,
) -> Result<Json<DashboardStats>, AppError> {
    let Query(query) = query?;
    let entries = state.store.get_all().await?;
    Ok(Json(build_stats(&entries, query.months)))
}

pub async fn medical_report(State(state): State<AppState>) -> Result<Json<MedicalSummary>, AppError> {
    let entries = state.store.get_all().await?;
    let settings = state.settings.read().await;
    Ok(Json(medical_summary(
        entries,
        settings.patient.clone(),
        settings.pain_scale.as_ref(),
    )))
}

pub async fn get_options(State(state): State<AppState>) -> Json<ReferenceData> {
    Json(state.reference_data().await)
}

pub async fn export_entries(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let entries = state.store.get_all().await?;
    let disposition = format!(
        "attachment; filename=\"headache-data-backup-{}.json\"",
        today_string()
    );
    info!(count = entries.len(), "exported headaches");
    Ok(([(header::CONTENT_DISPOSITION, disposition)], Json(entries)))
}

/// Imports exported entries under fresh ids. Rows that fail validation are
/// counted and skipped.
pub async fn import_entries(
    State(state): State<AppState>,
    payload: Result<Json<Vec<Value>>, JsonRejection>,
) -> Result<Json<ImportSummary>, AppError> {
    let Json(rows) = payload?;
    let mut summary = ImportSummary::default();

    for row in rows {
        let new = match serde_json::from_value::<NewEntry>(row) {
            Ok(new) => new,
            Err(err) => {
                warn!("skipping unreadable import row: {err}");
                summary.failed += 1;
                continue;
            }
        };
        match state.store.create(new).await {
            Ok(_) => summary.imported += 1,
            Err(StoreError::Invalid(err)) => {
                warn!("skipping invalid import row: {err}");
                summary.failed += 1;
            }
            Err(err) => return Err(err.into()),
        }
    }

    info!(imported = summary.imported, failed = summary.failed, "imported headaches");
    Ok(Json(summary))
}

/// Rebuilds entries from a legacy event log, one per episode. Episodes that
/// never started or whose id is already stored count as failed.
pub async fn import_events(
    State(state): State<AppState>,
    payload: Result<Json<Vec<Value>>, JsonRejection>,
) -> Result<Json<ImportSummary>, AppError> {
    let Json(raw) = payload?;
    let mut summary = ImportSummary::default();

    let events: Vec<HeadacheEvent> = raw
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(event) => Some(event),
            Err(err) => {
                debug!("ignoring unreadable event: {err}");
                None
            }
        })
        .collect();

    for episode in reassemble(events, Local::now().naive_local()) {
        let Some(new) = episode.to_new_entry() else {
            warn!(id = %episode.headache_id, "episode has no start event");
            summary.failed += 1;
            continue;
        };
        match state.store.create_with_id(episode.headache_id.clone(), new).await {
            Ok(_) => summary.imported += 1,
            Err(err @ (StoreError::Invalid(_) | StoreError::Conflict(_))) => {
                warn!(id = %episode.headache_id, "skipping episode: {err}");
                summary.failed += 1;
            }
            Err(err) => return Err(err.into()),
        }
    }

    info!(imported = summary.imported, failed = summary.failed, "imported event log");
    Ok(Json(summary))
}

#[derive(Debug, Deserialize)]
pub struct LogForm {
    pub data: String,
}

/// Legacy logging clients read the plain-text outcome, always with a 200.
pub async fn log_event(
    State(state): State<AppState>,
    form: Result<Form<LogForm>, FormRejection>,
) -> &'static str {
    let Ok(Form(form)) = form else {
        warn!("log request without a data field");
        return "Failure";
    };
    let event: HeadacheEvent = match serde_json::from_str(&form.data) {
        Ok(event) => event,
        Err(err) => {
            warn!("unreadable event: {err}");
            return "Failure";
        }
    };

    match apply_event(&state.store, &event, Local::now().naive_local()).await {
        Ok(entry) => {
            info!(id = %entry.id, kind = ?event.kind, "logged event");
            "Success"
        }
        Err(err) => {
            warn!(kind = ?event.kind, "event rejected: {err}");
            "Failure"
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DeleteForm {
    #[serde(rename = "headacheId")]
    pub headache_id: String,
}

pub async fn delete_form(
    State(state): State<AppState>,
    Form(form): Form<DeleteForm>,
) -> Result<Redirect, AppError> {
    if state.store.delete(form.headache_id.trim()).await? {
        info!(id = %form.headache_id, "deleted headache");
    }
    Ok(Redirect::to("/"))
}

pub async fn setup_status(State(state): State<AppState>) -> Json<SetupStatus> {
    Json(state.config.status().await)
}

pub async fn save_datastore(
    State(state): State<AppState>,
    payload: Result<Json<DatastoreConfig>, JsonRejection>,
) -> Result<Json<SetupStatus>, AppError> {
    let Json(datastore) = payload?;
    state.config.save_datastore(&datastore).await?;
    state.settings.write().await.datastore = Some(datastore);
    info!("datastore saved, takes effect on restart");
    Ok(Json(state.config.status().await))
}

pub async fn get_patient(State(state): State<AppState>) -> Result<Json<PatientProfile>, AppError> {
    let settings = state.settings.read().await;
    settings
        .patient
        .clone()
        .map(Json)
        .ok_or_else(|| AppError::not_found("patient profile is not configured"))
}

pub async fn save_patient(
    State(state): State<AppState>,
    payload: Result<Json<PatientProfile>, JsonRejection>,
) -> Result<Json<PatientProfile>, AppError> {
    let Json(mut patient) = payload?;
    state.config.save_patient(&mut patient).await?;
    state.settings.write().await.patient = Some(patient.clone());
    Ok(Json(patient))
}

pub async fn get_pain_scale(State(state): State<AppState>) -> Result<Json<PainScale>, AppError> {
    let settings = state.settings.read().await;
    settings
        .pain_scale
        .clone()
        .map(Json)
        .ok_or_else(|| AppError::not_found("pain scale is not configured"))
}

pub async fn save_pain_scale(
    State(state): State<AppState>,
    payload: Result<Json<PainScaleRequest>, JsonRejection>,
) -> Result<Json<PainScale>, AppError> {
    let Json(request) = payload?;
    let scale = request.resolve()?;
    state.config.save_pain_scale(&scale).await?;
    state.settings.write().await.pain_scale = Some(scale.clone());
    Ok(Json(scale))
}

fn missing(id: &str) -> AppError {
    AppError::not_found(format!("headache '{id}' not found"))
}

fn today_string() -> String {
    Local::now().date_naive().to_string()
}
