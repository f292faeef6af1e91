use crate::errors::{StoreError, ValidationError};
use crate::models::{EntryPatch, HeadacheEntry, HeadacheType, NewEntry};
use chrono::{NaiveDate, NaiveTime};
use serde::{de::DeserializeOwned, Serialize};
use sqlx::{
    query::Query,
    sqlite::{SqliteArguments, SqliteConnectOptions, SqliteConnection, SqlitePoolOptions},
    Sqlite, SqlitePool,
};
use std::{env, path::PathBuf, str::FromStr, time::Duration};
use tracing::{debug, info};
use uuid::Uuid;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:data/headache_tracker.db";

/// How long a writer waits for another connection's write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// `DATABASE_URL` wins over the datastore saved by the setup wizard.
pub fn resolve_database_url(configured: Option<&str>) -> String {
    if let Ok(url) = env::var("DATABASE_URL") {
        if !url.trim().is_empty() {
            return url;
        }
    }

    configured
        .filter(|url| !url.trim().is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string())
}

/// The on-disk file behind a SQLite URL, if there is one.
pub fn database_file(url: &str) -> Option<PathBuf> {
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url);
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() || path == ":memory:" || path.starts_with("file:") {
        return None;
    }
    Some(PathBuf::from(path))
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS headache_entries (
    id TEXT PRIMARY KEY,
    date TEXT NOT NULL,
    type TEXT NOT NULL,
    start_time TEXT NOT NULL,
    end_time TEXT,
    duration INTEGER,
    pain_level INTEGER NOT NULL CHECK (pain_level BETWEEN 1 AND 10),
    location TEXT NOT NULL DEFAULT '[]',
    symptoms TEXT NOT NULL DEFAULT '[]',
    triggers TEXT NOT NULL DEFAULT '[]',
    medications TEXT NOT NULL DEFAULT '[]',
    relief TEXT NOT NULL DEFAULT '[]',
    weather TEXT,
    notes TEXT,
    aura TEXT,
    prodrome TEXT,
    postdrome TEXT,
    cluster_period TEXT,
    eye_symptoms TEXT NOT NULL DEFAULT '[]',
    restlessness INTEGER,
    pain_readings TEXT NOT NULL DEFAULT '[]',
    actions TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

const SELECT_COLUMNS: &str = "SELECT id, date, type, start_time, end_time, duration, pain_level, \
     location, symptoms, triggers, medications, relief, weather, notes, aura, prodrome, \
     postdrome, cluster_period, eye_symptoms, restlessness, pain_readings, actions \
     FROM headache_entries";

/// Persists headache entries in a single SQLite table.
#[derive(Clone)]
pub struct EntryStore {
    pool: SqlitePool,
}

impl EntryStore {
    pub async fn open(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Self::with_pool(pool).await
    }

    /// A private database that lives as long as the store.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::query(SCHEMA).execute(&pool).await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_headache_entries_date \
             ON headache_entries(date DESC, start_time DESC)",
        )
        .execute(&pool)
        .await?;
        info!("headache entry schema ready");
        Ok(Self { pool })
    }

    pub async fn create(&self, new: NewEntry) -> Result<HeadacheEntry, StoreError> {
        self.create_with_id(Uuid::new_v4().to_string(), new).await
    }

    /// Inserts under a caller-chosen id; used when logging events that
    /// already carry an episode id.
    pub async fn create_with_id(&self, id: String, new: NewEntry) -> Result<HeadacheEntry, StoreError> {
        if id.trim().is_empty() {
            return Err(ValidationError::MissingField("id").into());
        }
        let entry = HeadacheEntry::from_new(id, new)?;
        self.insert(&entry).await?;
        debug!(id = %entry.id, "created headache entry");
        Ok(entry)
    }

    async fn insert(&self, entry: &HeadacheEntry) -> Result<(), StoreError> {
        let row = EntryRow::from_entry(entry)?;
        let query = sqlx::query(
            r#"
            INSERT INTO headache_entries (
                id, date, type, start_time, end_time, duration, pain_level, location, symptoms,
                triggers, medications, relief, weather, notes, aura, prodrome, postdrome,
                cluster_period, eye_symptoms, restlessness, pain_readings, actions
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(row.id.clone());

        match bind_columns(query, row).execute(&self.pool).await {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StoreError::Conflict(entry.id.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// All entries, newest first by date then start time.
    pub async fn get_all(&self) -> Result<Vec<HeadacheEntry>, StoreError> {
        let sql = format!("{SELECT_COLUMNS} ORDER BY date DESC, start_time DESC, rowid DESC");
        let rows = sqlx::query_as::<_, EntryRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(EntryRow::into_entry).collect()
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<HeadacheEntry>, StoreError> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = ?");
        let row = sqlx::query_as::<_, EntryRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(EntryRow::into_entry).transpose()
    }

    pub async fn update(&self, id: &str, patch: EntryPatch) -> Result<Option<HeadacheEntry>, StoreError> {
        self.modify(id, |entry| entry.apply(patch)).await
    }

    /// Read-modify-write of one entry inside a transaction. Returns `None`
    /// without writing when the id is unknown.
    ///
    /// The transaction writes before it reads, so it holds the database
    /// write lock for the whole cycle and concurrent edits of one entry
    /// queue up behind it; the last one wins.
    pub async fn modify<F>(&self, id: &str, change: F) -> Result<Option<HeadacheEntry>, StoreError>
    where
        F: FnOnce(&mut HeadacheEntry) -> Result<(), ValidationError>,
    {
        let mut tx = self.pool.begin().await?;

        let touched = sqlx::query("UPDATE headache_entries SET updated_at = CURRENT_TIMESTAMP WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if touched.rows_affected() == 0 {
            return Ok(None);
        }

        let Some(entry) = modify_locked(&mut tx, id, change).await? else {
            return Ok(None);
        };
        tx.commit().await?;

        debug!(%id, "updated headache entry");
        Ok(Some(entry))
    }

    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM headache_entries WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

async fn modify_locked<F>(
    conn: &mut SqliteConnection,
    id: &str,
    change: F,
) -> Result<Option<HeadacheEntry>, StoreError>
where
    F: FnOnce(&mut HeadacheEntry) -> Result<(), ValidationError>,
{
    let sql = format!("{SELECT_COLUMNS} WHERE id = ?");
    let Some(row) = sqlx::query_as::<_, EntryRow>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
    else {
        return Ok(None);
    };

    let mut entry = row.into_entry()?;
    change(&mut entry)?;
    entry.normalize();
    entry.validate()?;

    let row = EntryRow::from_entry(&entry)?;
    let query = sqlx::query(
        r#"
        UPDATE headache_entries SET
            date = ?, type = ?, start_time = ?, end_time = ?, duration = ?, pain_level = ?,
            location = ?, symptoms = ?, triggers = ?, medications = ?, relief = ?,
            weather = ?, notes = ?, aura = ?, prodrome = ?, postdrome = ?,
            cluster_period = ?, eye_symptoms = ?, restlessness = ?,
            pain_readings = ?, actions = ?
        WHERE id = ?
        "#,
    );
    bind_columns(query, row)
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;
    Ok(Some(entry))
}

/// Column-level shape of an entry; collections and nested records are JSON text.
#[derive(Debug, sqlx::FromRow)]
struct EntryRow {
    id: String,
    date: String,
    #[sqlx(rename = "type")]
    kind: String,
    start_time: String,
    end_time: Option<String>,
    duration: Option<i64>,
    pain_level: i64,
    location: String,
    symptoms: String,
    triggers: String,
    medications: String,
    relief: String,
    weather: Option<String>,
    notes: Option<String>,
    aura: Option<String>,
    prodrome: Option<String>,
    postdrome: Option<String>,
    cluster_period: Option<String>,
    eye_symptoms: String,
    restlessness: Option<bool>,
    pain_readings: String,
    actions: String,
}

impl EntryRow {
    fn from_entry(entry: &HeadacheEntry) -> Result<Self, StoreError> {
        let encode = |field: &str, err: serde_json::Error| StoreError::Corrupt {
            id: entry.id.clone(),
            reason: format!("cannot encode {field}: {err}"),
        };
        let list = |field: &str, values: &Vec<String>| to_json(values).map_err(|err| encode(field, err));

        Ok(Self {
            id: entry.id.clone(),
            date: entry.date.format("%Y-%m-%d").to_string(),
            kind: entry.kind.as_str().to_string(),
            start_time: entry.start_time.format("%H:%M").to_string(),
            end_time: entry.end_time.map(|time| time.format("%H:%M").to_string()),
            duration: entry.duration,
            pain_level: i64::from(entry.pain_level),
            location: list("location", &entry.location)?,
            symptoms: list("symptoms", &entry.symptoms)?,
            triggers: list("triggers", &entry.triggers)?,
            medications: list("medications", &entry.medications)?,
            relief: list("relief", &entry.relief)?,
            weather: to_json_opt(&entry.weather).map_err(|err| encode("weather", err))?,
            notes: entry.notes.clone(),
            aura: to_json_opt(&entry.aura).map_err(|err| encode("aura", err))?,
            prodrome: to_json_opt(&entry.prodrome).map_err(|err| encode("prodrome", err))?,
            postdrome: to_json_opt(&entry.postdrome).map_err(|err| encode("postdrome", err))?,
            cluster_period: to_json_opt(&entry.cluster_period)
                .map_err(|err| encode("cluster_period", err))?,
            eye_symptoms: list("eye_symptoms", &entry.eye_symptoms)?,
            restlessness: entry.restlessness,
            pain_readings: to_json(&entry.pain_readings).map_err(|err| encode("pain_readings", err))?,
            actions: to_json(&entry.actions).map_err(|err| encode("actions", err))?,
        })
    }

    fn into_entry(self) -> Result<HeadacheEntry, StoreError> {
        let id = self.id.as_str();

        let date = NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
            .map_err(|err| corrupt(id, format!("date '{}': {err}", self.date)))?;
        let kind = HeadacheType::parse(&self.kind)
            .ok_or_else(|| corrupt(id, format!("unknown type '{}'", self.kind)))?;
        let start_time = NaiveTime::parse_from_str(&self.start_time, "%H:%M")
            .map_err(|err| corrupt(id, format!("start_time '{}': {err}", self.start_time)))?;
        let end_time = self
            .end_time
            .as_deref()
            .map(|raw| NaiveTime::parse_from_str(raw, "%H:%M"))
            .transpose()
            .map_err(|err| corrupt(id, format!("end_time: {err}")))?;
        let pain_level = u8::try_from(self.pain_level)
            .map_err(|_| corrupt(id, format!("pain_level {}", self.pain_level)))?;

        Ok(HeadacheEntry {
            id: id.to_string(),
            date,
            kind,
            start_time,
            end_time,
            duration: self.duration,
            pain_level,
            location: column(id, "location", &self.location)?,
            symptoms: column(id, "symptoms", &self.symptoms)?,
            triggers: column(id, "triggers", &self.triggers)?,
            medications: column(id, "medications", &self.medications)?,
            relief: column(id, "relief", &self.relief)?,
            weather: nullable_column(id, "weather", self.weather.as_deref())?,
            notes: self.notes.clone(),
            aura: nullable_column(id, "aura", self.aura.as_deref())?,
            prodrome: nullable_column(id, "prodrome", self.prodrome.as_deref())?,
            postdrome: nullable_column(id, "postdrome", self.postdrome.as_deref())?,
            cluster_period: nullable_column(id, "cluster_period", self.cluster_period.as_deref())?,
            eye_symptoms: column(id, "eye_symptoms", &self.eye_symptoms)?,
            restlessness: self.restlessness,
            pain_readings: column(id, "pain_readings", &self.pain_readings)?,
            actions: column(id, "actions", &self.actions)?,
        })
    }
}

fn corrupt(id: &str, reason: String) -> StoreError {
    StoreError::Corrupt {
        id: id.to_string(),
        reason,
    }
}

fn column<T: DeserializeOwned>(id: &str, field: &str, raw: &str) -> Result<T, StoreError> {
    serde_json::from_str(raw).map_err(|err| corrupt(id, format!("{field}: {err}")))
}

fn nullable_column<T: DeserializeOwned>(
    id: &str,
    field: &str,
    raw: Option<&str>,
) -> Result<Option<T>, StoreError> {
    raw.map(|raw| column(id, field, raw)).transpose()
}

fn bind_columns<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    row: EntryRow,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    query
        .bind(row.date)
        .bind(row.kind)
        .bind(row.start_time)
        .bind(row.end_time)
        .bind(row.duration)
        .bind(row.pain_level)
        .bind(row.location)
        .bind(row.symptoms)
        .bind(row.triggers)
        .bind(row.medications)
        .bind(row.relief)
        .bind(row.weather)
        .bind(row.notes)
        .bind(row.aura)
        .bind(row.prodrome)
        .bind(row.postdrome)
        .bind(row.cluster_period)
        .bind(row.eye_symptoms)
        .bind(row.restlessness)
        .bind(row.pain_readings)
        .bind(row.actions)
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(value)
}

fn to_json_opt<T: Serialize>(value: &Option<T>) -> Result<Option<String>, serde_json::Error> {
    value.as_ref().map(|value| to_json(value)).transpose()
}
