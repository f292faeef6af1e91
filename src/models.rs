use crate::errors::ValidationError;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

pub const MIN_PAIN_LEVEL: u8 = 1;
pub const MAX_PAIN_LEVEL: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadacheType {
    Migraine,
    Cluster,
}

impl HeadacheType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeadacheType::Migraine => "migraine",
            HeadacheType::Cluster => "cluster",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "migraine" => Some(HeadacheType::Migraine),
            "cluster" => Some(HeadacheType::Cluster),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Aura {
    pub present: bool,
    #[serde(rename = "type", default)]
    pub kinds: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

/// Prodrome and postdrome share one shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Phase {
    pub present: bool,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClusterPeriod {
    pub in_period: bool,
    #[serde(default, with = "opt_day", skip_serializing_if = "Option::is_none")]
    pub period_start: Option<NaiveDate>,
    #[serde(default, with = "opt_day", skip_serializing_if = "Option::is_none")]
    pub expected_end: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Weather {
    pub temperature: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub condition: String,
}

/// One pain reading taken during an episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PainReading {
    pub at: NaiveDateTime,
    pub level: u8,
}

/// A timestamped abortive action such as `Oxygen On`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRecord {
    pub at: NaiveDateTime,
    pub action: String,
}

/// A single logged episode as stored and returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadacheEntry {
    pub id: String,
    #[serde(with = "day")]
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: HeadacheType,
    #[serde(with = "clock")]
    pub start_time: NaiveTime,
    #[serde(default, with = "opt_clock", skip_serializing_if = "Option::is_none")]
    pub end_time: Option<NaiveTime>,
    /// Minutes between start and end, derived on every write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    pub pain_level: u8,
    #[serde(default)]
    pub location: Vec<String>,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub triggers: Vec<String>,
    #[serde(default)]
    pub medications: Vec<String>,
    #[serde(default)]
    pub relief: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather: Option<Weather>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aura: Option<Aura>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prodrome: Option<Phase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postdrome: Option<Phase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_period: Option<ClusterPeriod>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub eye_symptoms: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restlessness: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pain_readings: Vec<PainReading>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ActionRecord>,
}

/// Request body for creating an entry. Any `id` or `duration` sent by the
/// client is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEntry {
    #[serde(with = "day")]
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: HeadacheType,
    #[serde(with = "clock")]
    pub start_time: NaiveTime,
    #[serde(default, with = "opt_clock", skip_serializing_if = "Option::is_none")]
    pub end_time: Option<NaiveTime>,
    pub pain_level: i64,
    #[serde(default)]
    pub location: Vec<String>,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub triggers: Vec<String>,
    #[serde(default)]
    pub medications: Vec<String>,
    #[serde(default)]
    pub relief: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather: Option<Weather>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aura: Option<Aura>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prodrome: Option<Phase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postdrome: Option<Phase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_period: Option<ClusterPeriod>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub eye_symptoms: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restlessness: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pain_readings: Vec<PainReading>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ActionRecord>,
}

/// Partial update: absent fields keep their stored value. For the optional
/// fields below, an explicit `null` clears the stored value; `null` on the
/// required fields and the lists is the same as absent.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EntryPatch {
    #[serde(default, with = "opt_day")]
    pub date: Option<NaiveDate>,
    #[serde(rename = "type", default)]
    pub kind: Option<HeadacheType>,
    #[serde(default, with = "opt_clock")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, deserialize_with = "opt_clock::deserialize_nullable")]
    pub end_time: Option<Option<NaiveTime>>,
    pub pain_level: Option<i64>,
    pub location: Option<Vec<String>>,
    pub symptoms: Option<Vec<String>>,
    pub triggers: Option<Vec<String>>,
    pub medications: Option<Vec<String>>,
    pub relief: Option<Vec<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub weather: Option<Option<Weather>>,
    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub aura: Option<Option<Aura>>,
    #[serde(default, deserialize_with = "nullable")]
    pub prodrome: Option<Option<Phase>>,
    #[serde(default, deserialize_with = "nullable")]
    pub postdrome: Option<Option<Phase>>,
    #[serde(default, deserialize_with = "nullable")]
    pub cluster_period: Option<Option<ClusterPeriod>>,
    pub eye_symptoms: Option<Vec<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub restlessness: Option<Option<bool>>,
}

/// A present field, `null` included, becomes `Some`.
fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl HeadacheEntry {
    pub fn from_new(id: String, new: NewEntry) -> Result<Self, ValidationError> {
        let mut entry = Self {
            id,
            date: new.date,
            kind: new.kind,
            start_time: new.start_time,
            end_time: new.end_time,
            duration: None,
            pain_level: check_pain_level(new.pain_level)?,
            location: new.location,
            symptoms: new.symptoms,
            triggers: new.triggers,
            medications: new.medications,
            relief: new.relief,
            weather: new.weather,
            notes: new.notes,
            aura: new.aura,
            prodrome: new.prodrome,
            postdrome: new.postdrome,
            cluster_period: new.cluster_period,
            eye_symptoms: new.eye_symptoms,
            restlessness: new.restlessness,
            pain_readings: new.pain_readings,
            actions: new.actions,
        };
        entry.normalize();
        entry.validate()?;
        Ok(entry)
    }

    pub fn apply(&mut self, patch: EntryPatch) -> Result<(), ValidationError> {
        if let Some(pain) = patch.pain_level {
            self.pain_level = check_pain_level(pain)?;
        }
        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(start) = patch.start_time {
            self.start_time = start;
        }
        if let Some(end) = patch.end_time {
            self.end_time = end;
        }
        replace_if_some(&mut self.location, patch.location);
        replace_if_some(&mut self.symptoms, patch.symptoms);
        replace_if_some(&mut self.triggers, patch.triggers);
        replace_if_some(&mut self.medications, patch.medications);
        replace_if_some(&mut self.relief, patch.relief);
        replace_if_some(&mut self.eye_symptoms, patch.eye_symptoms);
        set_if_present(&mut self.weather, patch.weather);
        set_if_present(&mut self.notes, patch.notes);
        set_if_present(&mut self.aura, patch.aura);
        set_if_present(&mut self.prodrome, patch.prodrome);
        set_if_present(&mut self.postdrome, patch.postdrome);
        set_if_present(&mut self.cluster_period, patch.cluster_period);
        set_if_present(&mut self.restlessness, patch.restlessness);

        self.normalize();
        self.validate()
    }

    /// Drops duplicate identifiers, clears sub-structures that do not belong
    /// to the entry's type and recomputes the duration.
    pub fn normalize(&mut self) {
        for set in [
            &mut self.location,
            &mut self.symptoms,
            &mut self.triggers,
            &mut self.medications,
            &mut self.relief,
            &mut self.eye_symptoms,
        ] {
            dedup_in_place(set);
        }

        match self.kind {
            HeadacheType::Migraine => {
                self.cluster_period = None;
                self.eye_symptoms.clear();
                self.restlessness = None;
            }
            HeadacheType::Cluster => {
                self.aura = None;
                self.prodrome = None;
                self.postdrome = None;
            }
        }

        self.pain_readings.sort_by_key(|reading| reading.at);
        self.actions.sort_by_key(|action| action.at);

        if self.notes.as_deref().is_some_and(|notes| notes.trim().is_empty()) {
            self.notes = None;
        }

        self.start_time = truncate_to_minute(self.start_time);
        self.end_time = self.end_time.map(truncate_to_minute);
        self.duration = duration_minutes(self.start_time, self.end_time);
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_pain_level(i64::from(self.pain_level))?;
        for reading in &self.pain_readings {
            check_pain_level(i64::from(reading.level))?;
        }

        let phases = [
            ("aura.duration", self.aura.as_ref().and_then(|aura| aura.duration)),
            ("prodrome.duration", self.prodrome.as_ref().and_then(|p| p.duration)),
            ("postdrome.duration", self.postdrome.as_ref().and_then(|p| p.duration)),
        ];
        for (field, duration) in phases {
            if duration.is_some_and(|value| !(value >= 0.0)) {
                return Err(ValidationError::NegativeDuration { field });
            }
        }

        if let Some(weather) = &self.weather {
            if !(0.0..=100.0).contains(&weather.humidity) {
                return Err(ValidationError::HumidityOutOfRange(weather.humidity));
            }
        }

        Ok(())
    }

    pub fn is_ongoing(&self) -> bool {
        self.end_time.is_none()
    }
}

pub fn check_pain_level(value: i64) -> Result<u8, ValidationError> {
    if (i64::from(MIN_PAIN_LEVEL)..=i64::from(MAX_PAIN_LEVEL)).contains(&value) {
        Ok(value as u8)
    } else {
        Err(ValidationError::PainLevelOutOfRange(value))
    }
}

/// Minutes from `start` to `end`. An end before the start means the episode
/// ran past midnight.
pub fn duration_minutes(start: NaiveTime, end: Option<NaiveTime>) -> Option<i64> {
    let end = end?;
    let minutes = (end - start).num_minutes();
    Some(if minutes < 0 { minutes + 24 * 60 } else { minutes })
}

fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    time.with_second(0)
        .and_then(|time| time.with_nanosecond(0))
        .unwrap_or(time)
}

fn replace_if_some(target: &mut Vec<String>, value: Option<Vec<String>>) {
    if let Some(value) = value {
        *target = value;
    }
}

fn set_if_present<T>(target: &mut Option<T>, value: Option<Option<T>>) {
    if let Some(value) = value {
        *target = value;
    }
}

fn dedup_in_place(values: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    values.retain(|value| !value.trim().is_empty() && seen.insert(value.clone()));
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FrequencyCount {
    pub id: String,
    pub count: u64,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTrend {
    pub month: String,
    pub migraines: u64,
    pub clusters: u64,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PainLevelCount {
    pub level: u8,
    pub count: u64,
}

#[derive(Debug, Serialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DurationStats {
    pub average_minutes: f64,
    pub shortest_minutes: i64,
    pub longest_minutes: i64,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DayActivity {
    pub date: String,
    pub count: u64,
    pub max_pain: u8,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_entries: u64,
    pub migraine_count: u64,
    pub cluster_count: u64,
    pub this_month: u64,
    pub average_pain_level: f64,
    pub most_common_triggers: Vec<FrequencyCount>,
    pub most_common_symptoms: Vec<FrequencyCount>,
    pub monthly_trends: Vec<MonthlyTrend>,
    pub pain_level_distribution: Vec<PainLevelCount>,
    pub duration_stats: DurationStats,
    pub daily_activity: Vec<DayActivity>,
}

#[derive(Debug, Deserialize, Default)]
pub struct StatsQuery {
    pub months: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
}

#[derive(Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct ImportSummary {
    pub imported: u64,
    pub failed: u64,
}

/// `YYYY-MM-DD`; full ISO datetimes are accepted and cut to their date part.
pub(crate) mod day {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn parse(value: &str) -> Option<NaiveDate> {
        let value = value.trim();
        let head = value.get(..10).unwrap_or(value);
        NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
    }

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&date.format("%Y-%m-%d"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid date '{raw}', expected YYYY-MM-DD")))
    }
}

pub(crate) mod opt_day {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(date) => super::day::serialize(date, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => super::day::parse(&raw)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid date '{raw}', expected YYYY-MM-DD"))),
        }
    }
}

/// `HH:MM`; seconds are accepted on input.
pub(crate) mod clock {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn parse(value: &str) -> Option<NaiveTime> {
        let value = value.trim();
        NaiveTime::parse_from_str(value, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
            .ok()
    }

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format("%H:%M"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid time '{raw}', expected HH:MM")))
    }
}

pub(crate) mod opt_clock {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(time: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error> {
        match time {
            Some(time) => super::clock::serialize(time, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveTime>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => super::clock::parse(&raw)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid time '{raw}', expected HH:MM"))),
        }
    }

    /// Like `deserialize`, but a present `null` or blank value is `Some(None)`.
    pub fn deserialize_nullable<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Option<NaiveTime>>, D::Error> {
        deserialize(deserializer).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn migraine() -> NewEntry {
        serde_json::from_value(json!({
            "type": "migraine",
            "date": "2024-01-10",
            "startTime": "08:00",
            "endTime": "09:15",
            "painLevel": 7,
            "triggers": ["stress"],
            "symptoms": ["nausea"],
            "aura": { "present": true, "type": ["visual"], "duration": 20 },
            "eyeSymptoms": ["tearing"]
        }))
        .unwrap()
    }

    #[test]
    fn duration_spans_start_to_end() {
        let start = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let end = NaiveTime::from_hms_opt(10, 30, 0).unwrap();
        assert_eq!(duration_minutes(start, Some(end)), Some(90));
        assert_eq!(duration_minutes(start, None), None);
    }

    #[test]
    fn duration_wraps_past_midnight() {
        let start = NaiveTime::from_hms_opt(23, 30, 0).unwrap();
        let end = NaiveTime::from_hms_opt(0, 45, 0).unwrap();
        assert_eq!(duration_minutes(start, Some(end)), Some(75));
    }

    #[test]
    fn from_new_derives_duration_and_drops_cluster_fields() {
        let entry = HeadacheEntry::from_new("a".into(), migraine()).unwrap();
        assert_eq!(entry.duration, Some(75));
        assert!(entry.eye_symptoms.is_empty());
        assert!(entry.aura.is_some());
    }

    #[test]
    fn pain_level_outside_range_is_rejected() {
        let mut new = migraine();
        new.pain_level = 11;
        assert_eq!(
            HeadacheEntry::from_new("a".into(), new),
            Err(ValidationError::PainLevelOutOfRange(11))
        );
    }

    #[test]
    fn patch_only_touches_supplied_fields() {
        let mut entry = HeadacheEntry::from_new("a".into(), migraine()).unwrap();
        let patch: EntryPatch = serde_json::from_value(json!({ "notes": "slept badly" })).unwrap();
        entry.apply(patch).unwrap();
        assert_eq!(entry.notes.as_deref(), Some("slept badly"));
        assert_eq!(entry.pain_level, 7);
        assert_eq!(entry.triggers, vec!["stress".to_string()]);
        assert_eq!(entry.end_time, NaiveTime::from_hms_opt(9, 15, 0));
    }

    #[test]
    fn explicit_null_clears_optional_fields() {
        let mut new = migraine();
        new.notes = Some("aura first".into());
        let mut entry = HeadacheEntry::from_new("a".into(), new).unwrap();

        let patch: EntryPatch =
            serde_json::from_value(json!({ "endTime": null, "notes": null, "painLevel": null })).unwrap();
        entry.apply(patch).unwrap();
        assert!(entry.is_ongoing());
        assert_eq!(entry.duration, None);
        assert_eq!(entry.notes, None);
        assert_eq!(entry.pain_level, 7);
        assert!(entry.aura.is_some());
    }

    #[test]
    fn out_of_range_reading_is_rejected() {
        let mut new = migraine();
        new.pain_readings = vec![PainReading {
            at: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap().and_hms_opt(8, 30, 0).unwrap(),
            level: 0,
        }];
        assert_eq!(
            HeadacheEntry::from_new("a".into(), new),
            Err(ValidationError::PainLevelOutOfRange(0))
        );
    }

    #[test]
    fn switching_type_clears_migraine_phases() {
        let mut entry = HeadacheEntry::from_new("a".into(), migraine()).unwrap();
        let patch: EntryPatch =
            serde_json::from_value(json!({ "type": "cluster", "restlessness": true })).unwrap();
        entry.apply(patch).unwrap();
        assert_eq!(entry.kind, HeadacheType::Cluster);
        assert!(entry.aura.is_none());
        assert_eq!(entry.restlessness, Some(true));
    }

    #[test]
    fn iso_datetime_is_accepted_for_date() {
        let new: NewEntry = serde_json::from_value(json!({
            "type": "cluster",
            "date": "2024-03-02T00:00:00.000Z",
            "startTime": "02:10:30",
            "painLevel": 9
        }))
        .unwrap();
        assert_eq!(new.date, NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
        let entry = HeadacheEntry::from_new("b".into(), new).unwrap();
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["startTime"], "02:10");
        assert_eq!(value["date"], "2024-03-02");
        assert!(value.get("endTime").is_none());
        assert!(entry.is_ongoing());
    }

    #[test]
    fn duplicate_identifiers_are_dropped() {
        let mut new = migraine();
        new.triggers = vec!["stress".into(), "stress".into(), "caffeine".into()];
        let entry = HeadacheEntry::from_new("a".into(), new).unwrap();
        assert_eq!(entry.triggers, vec!["stress".to_string(), "caffeine".to_string()]);
    }
}
