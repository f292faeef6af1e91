use crate::config::{PainScale, PatientProfile};
use crate::errors::ValidationError;
use crate::models::{ActionRecord, DurationStats, HeadacheEntry, HeadacheType};
use crate::options::{display_name, display_names, ReferenceData};
use crate::stats::{average_pain, duration_stats, format_duration};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Query string of `GET /api/headaches`.
#[derive(Debug, Deserialize, Default)]
pub struct ListQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub q: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum SortKey {
    Date,
    PainLevel,
    Duration,
}

impl ListQuery {
    /// Filters and orders `entries`, which arrive newest first.
    pub fn apply(
        &self,
        mut entries: Vec<HeadacheEntry>,
        options: &ReferenceData,
    ) -> Result<Vec<HeadacheEntry>, ValidationError> {
        let kind = match non_blank(&self.kind) {
            Some(raw) => Some(
                HeadacheType::parse(raw)
                    .ok_or_else(|| ValidationError::Invalid(format!("unknown headache type '{raw}'")))?,
            ),
            None => None,
        };
        let sort = match non_blank(&self.sort) {
            None | Some("date") => SortKey::Date,
            Some("painLevel") => SortKey::PainLevel,
            Some("duration") => SortKey::Duration,
            Some(other) => {
                return Err(ValidationError::Invalid(format!(
                    "unknown sort '{other}', expected date, painLevel or duration"
                )))
            }
        };
        let ascending = match non_blank(&self.order) {
            None | Some("desc") => false,
            Some("asc") => true,
            Some(other) => {
                return Err(ValidationError::Invalid(format!(
                    "unknown order '{other}', expected asc or desc"
                )))
            }
        };

        if let Some(kind) = kind {
            entries.retain(|entry| entry.kind == kind);
        }
        if let Some(needle) = non_blank(&self.q) {
            let needle = needle.to_lowercase();
            entries.retain(|entry| matches_text(entry, &needle, options));
        }

        // Stable sorts keep the store's newest-first order among equal keys.
        match sort {
            SortKey::Date => {
                if ascending {
                    entries.reverse();
                }
            }
            SortKey::PainLevel => entries.sort_by(|a, b| directed(a.pain_level.cmp(&b.pain_level), ascending)),
            SortKey::Duration => entries.sort_by(|a, b| {
                match (a.duration, b.duration) {
                    (Some(x), Some(y)) => directed(x.cmp(&y), ascending),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                }
            }),
        }
        Ok(entries)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|value| !value.is_empty())
}

fn directed(ordering: Ordering, ascending: bool) -> Ordering {
    if ascending { ordering } else { ordering.reverse() }
}

fn matches_text(entry: &HeadacheEntry, needle: &str, options: &ReferenceData) -> bool {
    if entry
        .notes
        .as_deref()
        .is_some_and(|notes| notes.to_lowercase().contains(needle))
    {
        return true;
    }
    let hit = |ids: &[String], list: &[crate::options::ReferenceOption]| {
        ids.iter().any(|id| {
            id.to_lowercase().contains(needle) || display_name(list, id).to_lowercase().contains(needle)
        })
    };
    hit(&entry.triggers, &options.triggers) || hit(&entry.symptoms, &options.symptoms)
}

/// One entry with everything resolved for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryReport {
    pub entry: HeadacheEntry,
    pub duration_label: String,
    pub ongoing: bool,
    pub location_names: Vec<String>,
    pub symptom_names: Vec<String>,
    pub trigger_names: Vec<String>,
    pub medication_names: Vec<String>,
    pub relief_names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pain_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oxygen_minutes: Option<i64>,
    pub oxygen_label: String,
}

impl EntryReport {
    pub fn build(entry: HeadacheEntry, options: &ReferenceData, scale: Option<&PainScale>) -> Self {
        let oxygen_minutes = oxygen_minutes(&entry.actions);
        Self {
            oxygen_minutes,
            oxygen_label: format_duration(oxygen_minutes),
            duration_label: format_duration(entry.duration),
            ongoing: entry.is_ongoing(),
            location_names: display_names(&options.locations, &entry.location),
            symptom_names: display_names(&options.symptoms, &entry.symptoms),
            trigger_names: display_names(&options.triggers, &entry.triggers),
            medication_names: display_names(&options.medications, &entry.medications),
            relief_names: display_names(&options.relief, &entry.relief),
            pain_description: scale
                .and_then(|scale| scale.describe(entry.pain_level))
                .map(str::to_string),
            entry,
        }
    }
}

/// Minutes between the last "Oxygen On" and the last "Oxygen Off" action.
/// `None` unless both were logged and the off came after the on.
pub fn oxygen_minutes(actions: &[ActionRecord]) -> Option<i64> {
    let last = |label: &str| {
        actions
            .iter()
            .filter(|record| record.action.trim().eq_ignore_ascii_case(label))
            .map(|record| record.at)
            .max()
    };
    let on = last("oxygen on")?;
    let off = last("oxygen off")?;
    (off >= on).then(|| (off - on).num_minutes())
}

/// Printable history for a clinician.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient: Option<PatientProfile>,
    pub total_episodes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_episode: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_episode: Option<NaiveDate>,
    pub span_days: i64,
    pub average_pain_level: f64,
    pub duration_stats: DurationStats,
    pub episodes: Vec<EntryReport>,
}

pub fn medical_summary(
    entries: Vec<HeadacheEntry>,
    patient: Option<PatientProfile>,
    scale: Option<&PainScale>,
) -> MedicalSummary {
    let options = ReferenceData::for_patient(patient.as_ref());
    let first_episode = entries.iter().map(|entry| entry.date).min();
    let latest_episode = entries.iter().map(|entry| entry.date).max();
    let span_days = match (first_episode, latest_episode) {
        (Some(first), Some(latest)) => (latest - first).num_days(),
        _ => 0,
    };
    let average_pain_level = average_pain(&entries);
    let duration_stats = duration_stats(&entries);

    let mut entries = entries;
    entries.sort_by(|a, b| a.date.cmp(&b.date).then(a.start_time.cmp(&b.start_time)));

    MedicalSummary {
        total_episodes: entries.len() as u64,
        first_episode,
        latest_episode,
        span_days,
        average_pain_level,
        duration_stats,
        episodes: entries
            .into_iter()
            .map(|entry| EntryReport::build(entry, &options, scale))
            .collect(),
        patient,
    }
}
