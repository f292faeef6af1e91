use crate::models::{
    DashboardStats, DayActivity, DurationStats, FrequencyCount, HeadacheEntry, HeadacheType,
    MonthlyTrend, PainLevelCount, MAX_PAIN_LEVEL, MIN_PAIN_LEVEL,
};
use chrono::{Datelike, Duration, Local, NaiveDate};
use std::collections::{BTreeMap, HashMap};

pub const DEFAULT_TREND_MONTHS: u32 = 6;
pub const MAX_TREND_MONTHS: u32 = 24;
const TOP_FREQUENCIES: usize = 10;
const ACTIVITY_DAYS: i64 = 365;

pub fn build_stats(entries: &[HeadacheEntry], months: Option<u32>) -> DashboardStats {
    build_stats_at(Local::now().date_naive(), entries, months)
}

pub fn build_stats_at(today: NaiveDate, entries: &[HeadacheEntry], months: Option<u32>) -> DashboardStats {
    let months = months
        .unwrap_or(DEFAULT_TREND_MONTHS)
        .clamp(1, MAX_TREND_MONTHS);

    let count_kind = |kind: HeadacheType| entries.iter().filter(|entry| entry.kind == kind).count() as u64;
    let this_month = entries
        .iter()
        .filter(|entry| entry.date.year() == today.year() && entry.date.month() == today.month())
        .count() as u64;

    let mut most_common_triggers = frequency_table(entries.iter().map(|entry| entry.triggers.as_slice()));
    most_common_triggers.truncate(TOP_FREQUENCIES);
    let mut most_common_symptoms = frequency_table(entries.iter().map(|entry| entry.symptoms.as_slice()));
    most_common_symptoms.truncate(TOP_FREQUENCIES);

    DashboardStats {
        total_entries: entries.len() as u64,
        migraine_count: count_kind(HeadacheType::Migraine),
        cluster_count: count_kind(HeadacheType::Cluster),
        this_month,
        average_pain_level: average_pain(entries),
        most_common_triggers,
        most_common_symptoms,
        monthly_trends: monthly_trends(today, entries, months),
        pain_level_distribution: pain_histogram(entries),
        duration_stats: duration_stats(entries),
        daily_activity: daily_activity(today, entries),
    }
}

pub fn average_pain(entries: &[HeadacheEntry]) -> f64 {
    if entries.is_empty() {
        return 0.0;
    }
    let total: u64 = entries.iter().map(|entry| u64::from(entry.pain_level)).sum();
    total as f64 / entries.len() as f64
}

/// `1h 15m`, `2h`, `45m`, or `Not available` when the episode has no end.
pub fn format_duration(minutes: Option<i64>) -> String {
    let Some(minutes) = minutes else {
        return "Not available".to_string();
    };
    let (hours, mins) = (minutes / 60, minutes % 60);
    match (hours, mins) {
        (0, mins) => format!("{mins}m"),
        (hours, 0) => format!("{hours}h"),
        (hours, mins) => format!("{hours}h {mins}m"),
    }
}

/// Counts each id across all sets, most frequent first. Ties keep the order
/// in which the ids were first seen.
pub fn frequency_table<'a, I>(sets: I) -> Vec<FrequencyCount>
where
    I: IntoIterator<Item = &'a [String]>,
{
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for set in sets {
        for id in set {
            let count = counts.entry(id.as_str()).or_insert_with(|| {
                order.push(id.as_str());
                0
            });
            *count += 1;
        }
    }

    let mut table: Vec<FrequencyCount> = order
        .into_iter()
        .map(|id| FrequencyCount {
            id: id.to_string(),
            count: counts.get(id).copied().unwrap_or_default(),
        })
        .collect();
    table.sort_by(|a, b| b.count.cmp(&a.count));
    table
}

pub fn monthly_trends(today: NaiveDate, entries: &[HeadacheEntry], months: u32) -> Vec<MonthlyTrend> {
    let mut buckets: BTreeMap<(i32, u32), (u64, u64)> = BTreeMap::new();
    let current = month_index(today);
    for offset in 0..i64::from(months) {
        buckets.insert(month_from_index(current - offset), (0, 0));
    }

    for entry in entries {
        if let Some((migraines, clusters)) = buckets.get_mut(&(entry.date.year(), entry.date.month())) {
            match entry.kind {
                HeadacheType::Migraine => *migraines += 1,
                HeadacheType::Cluster => *clusters += 1,
            }
        }
    }

    buckets
        .into_iter()
        .map(|((year, month), (migraines, clusters))| MonthlyTrend {
            month: month_label(year, month),
            migraines,
            clusters,
        })
        .collect()
}

/// Always one bucket per pain level.
pub fn pain_histogram(entries: &[HeadacheEntry]) -> Vec<PainLevelCount> {
    (MIN_PAIN_LEVEL..=MAX_PAIN_LEVEL)
        .map(|level| PainLevelCount {
            level,
            count: entries.iter().filter(|entry| entry.pain_level == level).count() as u64,
        })
        .collect()
}

pub fn duration_stats(entries: &[HeadacheEntry]) -> DurationStats {
    let durations: Vec<i64> = entries.iter().filter_map(|entry| entry.duration).collect();
    if durations.is_empty() {
        return DurationStats::default();
    }

    let total: i64 = durations.iter().sum();
    DurationStats {
        average_minutes: total as f64 / durations.len() as f64,
        shortest_minutes: durations.iter().copied().min().unwrap_or_default(),
        longest_minutes: durations.iter().copied().max().unwrap_or_default(),
    }
}

/// Days within the trailing year that have at least one entry, oldest first.
pub fn daily_activity(today: NaiveDate, entries: &[HeadacheEntry]) -> Vec<DayActivity> {
    let since = today - Duration::days(ACTIVITY_DAYS - 1);
    let mut days: BTreeMap<NaiveDate, (u64, u8)> = BTreeMap::new();
    for entry in entries.iter().filter(|entry| entry.date >= since && entry.date <= today) {
        let (count, max_pain) = days.entry(entry.date).or_default();
        *count += 1;
        *max_pain = (*max_pain).max(entry.pain_level);
    }

    days.into_iter()
        .map(|(date, (count, max_pain))| DayActivity {
            date: date.to_string(),
            count,
            max_pain,
        })
        .collect()
}

fn month_index(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}

fn month_from_index(index: i64) -> (i32, u32) {
    (index.div_euclid(12) as i32, index.rem_euclid(12) as u32 + 1)
}

fn month_label(year: i32, month: u32) -> String {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|date| date.format("%b %Y").to_string())
        .unwrap_or_else(|| format!("{month:02}/{year}"))
}
