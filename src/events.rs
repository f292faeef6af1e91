//! Legacy event-log input. Each user action arrives as one event tagged with
//! an episode id; events are folded into the matching `HeadacheEntry` row.

use crate::errors::{StoreError, ValidationError};
use crate::models::{check_pain_level, ActionRecord, HeadacheEntry, HeadacheType, NewEntry, PainReading};
use crate::storage::EntryStore;
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    HeadacheStart,
    PainLevel,
    Medication,
    Abortive,
    Symptom,
    HeadacheEnd,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadacheEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(default)]
    pub headache_id: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub timestamp: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("event has no headacheId")]
    MissingEpisode,
    #[error("{0:?} event needs a value")]
    MissingValue(EventKind),
    #[error("no episode '{0}' has been started")]
    UnknownEpisode(String),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl HeadacheEvent {
    /// Wall-clock time of the event in the sender's own offset, or `now`.
    fn local_time(&self, now: NaiveDateTime) -> NaiveDateTime {
        self.timestamp.map(|ts| ts.naive_local()).unwrap_or(now)
    }

    fn episode_id(&self) -> Result<&str, EventError> {
        self.headache_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(EventError::MissingEpisode)
    }

    fn text_value(&self) -> Result<String, EventError> {
        match &self.value {
            Some(Value::String(text)) if !text.trim().is_empty() => Ok(text.trim().to_string()),
            Some(Value::Number(number)) => Ok(number.to_string()),
            _ => Err(EventError::MissingValue(self.kind)),
        }
    }

    fn pain_value(&self) -> Result<u8, EventError> {
        let raw = match &self.value {
            Some(Value::Number(number)) => number.as_i64(),
            Some(Value::String(text)) => text.trim().parse::<i64>().ok(),
            _ => None,
        };
        let raw = raw.ok_or(EventError::MissingValue(self.kind))?;
        Ok(check_pain_level(raw)?)
    }
}

/// Applies one live event to the entry store.
pub async fn apply_event(
    store: &EntryStore,
    event: &HeadacheEvent,
    now: NaiveDateTime,
) -> Result<HeadacheEntry, EventError> {
    let id = event.episode_id()?.to_string();
    let at = event.local_time(now);
    debug!(%id, kind = ?event.kind, "applying headache event");

    let change: Box<dyn FnOnce(&mut HeadacheEntry) -> Result<(), ValidationError> + Send> = match event.kind {
        EventKind::HeadacheStart => {
            let (kind, pain_level) = start_details(event.value.as_ref());
            let new = blank_entry(at, kind, pain_level);
            return Ok(store.create_with_id(id, new).await?);
        }
        EventKind::PainLevel => {
            let level = event.pain_value()?;
            Box::new(move |entry: &mut HeadacheEntry| {
                entry.pain_level = entry.pain_level.max(level);
                entry.pain_readings.push(PainReading { at, level });
                Ok(())
            })
        }
        EventKind::Medication => {
            let value = event.text_value()?;
            Box::new(move |entry: &mut HeadacheEntry| {
                push_unique(&mut entry.medications, value);
                Ok(())
            })
        }
        EventKind::Abortive => {
            let value = event.text_value()?;
            Box::new(move |entry: &mut HeadacheEntry| {
                push_unique(&mut entry.relief, value.clone());
                entry.actions.push(ActionRecord { at, action: value });
                Ok(())
            })
        }
        EventKind::Symptom => {
            let value = event.text_value()?;
            Box::new(move |entry: &mut HeadacheEntry| {
                push_unique(&mut entry.symptoms, value);
                Ok(())
            })
        }
        EventKind::HeadacheEnd => {
            let end = at.time();
            Box::new(move |entry: &mut HeadacheEntry| {
                entry.end_time = Some(end);
                Ok(())
            })
        }
    };

    store
        .modify(&id, change)
        .await?
        .ok_or(EventError::UnknownEpisode(id))
}

/// The events of one episode, ordered by time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeTimeline {
    pub headache_id: String,
    pub kind: HeadacheType,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub pain_readings: Vec<PainReading>,
    pub medications: Vec<String>,
    pub actions: Vec<ActionRecord>,
    pub symptoms: Vec<String>,
}

impl EpisodeTimeline {
    fn new(headache_id: String) -> Self {
        Self {
            headache_id,
            kind: HeadacheType::Migraine,
            start: None,
            end: None,
            pain_readings: Vec::new(),
            medications: Vec::new(),
            actions: Vec::new(),
            symptoms: Vec::new(),
        }
    }

    pub fn peak_pain(&self) -> Option<u8> {
        self.pain_readings.iter().map(|reading| reading.level).max()
    }

    /// The row this episode becomes, or `None` when it never started.
    pub fn to_new_entry(&self) -> Option<NewEntry> {
        let start = self.start?;
        let mut new = blank_entry(start, self.kind, 1);
        new.pain_level = i64::from(self.peak_pain().unwrap_or(1));
        new.pain_readings = self.pain_readings.clone();
        new.end_time = self.end.map(|end| end.time());
        new.medications = self.medications.clone();
        for record in &self.actions {
            push_unique(&mut new.relief, record.action.clone());
        }
        new.actions = self.actions.clone();
        new.symptoms = self.symptoms.clone();
        Some(new)
    }
}

/// Groups an event log by episode id (first-seen order) and rebuilds each
/// episode's start, end, pain series and actions. Events without an id or
/// with unusable values are skipped.
pub fn reassemble(mut events: Vec<HeadacheEvent>, now: NaiveDateTime) -> Vec<EpisodeTimeline> {
    events.sort_by_key(|event| event.local_time(now));

    let mut order: Vec<String> = Vec::new();
    let mut episodes: HashMap<String, EpisodeTimeline> = HashMap::new();

    for event in &events {
        let Ok(id) = event.episode_id() else {
            continue;
        };
        let at = event.local_time(now);
        let episode = episodes.entry(id.to_string()).or_insert_with(|| {
            order.push(id.to_string());
            EpisodeTimeline::new(id.to_string())
        });

        match event.kind {
            EventKind::HeadacheStart => {
                if episode.start.is_none() {
                    let (kind, pain) = start_details(event.value.as_ref());
                    episode.start = Some(at);
                    episode.kind = kind;
                    if pain > 1 {
                        episode.pain_readings.push(PainReading { at, level: pain });
                    }
                }
            }
            EventKind::HeadacheEnd => episode.end = Some(at),
            EventKind::PainLevel => {
                if let Ok(level) = event.pain_value() {
                    episode.pain_readings.push(PainReading { at, level });
                }
            }
            EventKind::Medication => {
                if let Ok(value) = event.text_value() {
                    push_unique(&mut episode.medications, value);
                }
            }
            EventKind::Abortive => {
                if let Ok(value) = event.text_value() {
                    episode.actions.push(ActionRecord { at, action: value });
                }
            }
            EventKind::Symptom => {
                if let Ok(value) = event.text_value() {
                    push_unique(&mut episode.symptoms, value);
                }
            }
        }
    }

    order
        .into_iter()
        .filter_map(|id| episodes.remove(&id))
        .collect()
}

/// `headacheStart` values may name the headache type or carry a first pain
/// reading.
fn start_details(value: Option<&Value>) -> (HeadacheType, u8) {
    match value {
        Some(Value::String(text)) => match HeadacheType::parse(text) {
            Some(kind) => (kind, 1),
            None => (
                HeadacheType::Migraine,
                text.trim()
                    .parse::<i64>()
                    .ok()
                    .and_then(|raw| check_pain_level(raw).ok())
                    .unwrap_or(1),
            ),
        },
        Some(Value::Number(number)) => (
            HeadacheType::Migraine,
            number
                .as_i64()
                .and_then(|raw| check_pain_level(raw).ok())
                .unwrap_or(1),
        ),
        _ => (HeadacheType::Migraine, 1),
    }
}

/// A freshly started episode. A first reading above the floor is kept in
/// the pain series.
fn blank_entry(at: NaiveDateTime, kind: HeadacheType, pain_level: u8) -> NewEntry {
    let pain_readings = if pain_level > 1 {
        vec![PainReading { at, level: pain_level }]
    } else {
        Vec::new()
    };
    NewEntry {
        date: at.date(),
        kind,
        start_time: at.time(),
        end_time: None,
        pain_level: i64::from(pain_level),
        location: Vec::new(),
        symptoms: Vec::new(),
        triggers: Vec::new(),
        medications: Vec::new(),
        relief: Vec::new(),
        weather: None,
        notes: None,
        aura: None,
        prodrome: None,
        postdrome: None,
        cluster_period: None,
        eye_symptoms: Vec::new(),
        restlessness: None,
        pain_readings,
        actions: Vec::new(),
    }
}

fn push_unique(values: &mut Vec<String>, value: String) {
    if !values.contains(&value) {
        values.push(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use serde_json::json;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn event(value: serde_json::Value) -> HeadacheEvent {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn event_sequence_builds_one_entry() {
        let store = EntryStore::open_in_memory().await.unwrap();
        let events = [
            json!({ "type": "headacheStart", "headacheId": "h1", "value": "cluster", "timestamp": "2024-04-30T02:10:00+01:00" }),
            json!({ "type": "painLevel", "headacheId": "h1", "value": 4, "timestamp": "2024-04-30T02:15:00+01:00" }),
            json!({ "type": "painLevel", "headacheId": "h1", "value": "8", "timestamp": "2024-04-30T02:30:00+01:00" }),
            json!({ "type": "abortive", "headacheId": "h1", "value": "Oxygen On" }),
            json!({ "type": "symptom", "headacheId": "h1", "value": "tearing" }),
            json!({ "type": "painLevel", "headacheId": "h1", "value": 6, "timestamp": "2024-04-30T02:40:00+01:00" }),
            json!({ "type": "headacheEnd", "headacheId": "h1", "timestamp": "2024-04-30T03:05:00+01:00" }),
        ];
        for raw in events {
            apply_event(&store, &event(raw), now()).await.unwrap();
        }

        let entry = store.get_by_id("h1").await.unwrap().expect("entry");
        assert_eq!(entry.kind, HeadacheType::Cluster);
        assert_eq!(entry.pain_level, 8);
        assert_eq!(entry.date, NaiveDate::from_ymd_opt(2024, 4, 30).unwrap());
        assert_eq!(entry.start_time, NaiveTime::from_hms_opt(2, 10, 0).unwrap());
        assert_eq!(entry.duration, Some(55));
        assert_eq!(entry.relief, vec!["Oxygen On".to_string()]);
        assert_eq!(entry.symptoms, vec!["tearing".to_string()]);

        let levels: Vec<u8> = entry.pain_readings.iter().map(|reading| reading.level).collect();
        assert_eq!(levels, vec![4, 8, 6]);
        assert_eq!(
            entry.pain_readings[0].at,
            NaiveDate::from_ymd_opt(2024, 4, 30).unwrap().and_hms_opt(2, 15, 0).unwrap()
        );
        assert_eq!(entry.actions.len(), 1);
        assert_eq!(entry.actions[0].action, "Oxygen On");
        assert_eq!(entry.actions[0].at, now());
    }

    #[tokio::test]
    async fn events_for_unknown_episode_fail_without_writing() {
        let store = EntryStore::open_in_memory().await.unwrap();
        let err = apply_event(
            &store,
            &event(json!({ "type": "painLevel", "headacheId": "nope", "value": 5 })),
            now(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, EventError::UnknownEpisode(id) if id == "nope"));
        assert!(store.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn out_of_range_pain_event_is_rejected() {
        let store = EntryStore::open_in_memory().await.unwrap();
        apply_event(&store, &event(json!({ "type": "headacheStart", "headacheId": "h2" })), now())
            .await
            .unwrap();
        let err = apply_event(
            &store,
            &event(json!({ "type": "painLevel", "headacheId": "h2", "value": 12 })),
            now(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, EventError::Invalid(ValidationError::PainLevelOutOfRange(12))));
        assert_eq!(store.get_by_id("h2").await.unwrap().unwrap().pain_level, 1);
    }

    #[tokio::test]
    async fn missing_episode_id_is_rejected() {
        let store = EntryStore::open_in_memory().await.unwrap();
        let err = apply_event(&store, &event(json!({ "type": "headacheStart" })), now())
            .await
            .unwrap_err();
        assert!(matches!(err, EventError::MissingEpisode));
    }

    #[test]
    fn reassemble_groups_by_episode_and_skips_unstarted() {
        let log = vec![
            event(json!({ "type": "headacheStart", "headacheId": "a", "value": 0, "timestamp": "2024-01-02T08:00:00Z" })),
            event(json!({ "type": "painLevel", "headacheId": "a", "value": 3, "timestamp": "2024-01-02T08:10:00Z" })),
            event(json!({ "type": "painLevel", "headacheId": "b", "value": 9, "timestamp": "2024-01-03T09:00:00Z" })),
            event(json!({ "type": "painLevel", "headacheId": "a", "value": 7, "timestamp": "2024-01-02T08:20:00Z" })),
            event(json!({ "type": "headacheEnd", "headacheId": "a", "timestamp": "2024-01-02T09:30:00Z" })),
        ];

        let episodes = reassemble(log, now());
        assert_eq!(episodes.len(), 2);
        assert_eq!(episodes[0].headache_id, "a");
        assert_eq!(episodes[0].peak_pain(), Some(7));
        assert_eq!(episodes[0].pain_readings.len(), 2);

        let entry = episodes[0].to_new_entry().expect("started");
        assert_eq!(entry.pain_level, 7);
        assert_eq!(entry.end_time, NaiveTime::from_hms_opt(9, 30, 0));
        assert_eq!(entry.pain_readings.len(), 2);
        assert!(episodes[1].to_new_entry().is_none());
    }
}
