//! Setup wizard persistence: datastore, patient profile and pain scale,
//! one JSON file each under the config directory.

use crate::errors::{ConfigError, ValidationError};
use crate::models::opt_day;
use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    collections::HashSet,
    env,
    path::{Path, PathBuf},
};
use tokio::fs;
use tracing::{error, info, warn};

pub const CONFIG_FILE: &str = "config.json";
pub const PATIENT_FILE: &str = "patient.json";
pub const PAIN_SCALE_FILE: &str = "pain.json";

pub fn resolve_config_dir() -> PathBuf {
    if let Ok(path) = env::var("APP_CONFIG_DIR") {
        return PathBuf::from(path);
    }

    PathBuf::from("conf")
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatastoreConfig {
    pub url: String,
}

impl DatastoreConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(ValidationError::MissingField("url"));
        }
        if !url.starts_with("sqlite:") {
            return Err(ValidationError::Invalid(format!(
                "unsupported datastore '{url}', expected a sqlite: URL"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    datastore: DatastoreConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PatientProfile {
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_name: Option<String>,
    #[serde(default, with = "opt_day", skip_serializing_if = "Option::is_none")]
    pub dob: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smoker: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_headache_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headache_type: Option<String>,
    #[serde(default)]
    pub prescribed_medications: Vec<String>,
    #[serde(default)]
    pub abortives: Vec<String>,
    #[serde(default)]
    pub symptoms: Vec<String>,
}

impl PatientProfile {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.first_name.trim().is_empty() {
            return Err(ValidationError::MissingField("firstName"));
        }
        if self.last_name.trim().is_empty() {
            return Err(ValidationError::MissingField("lastName"));
        }
        Ok(())
    }

    /// Drops blank vocabulary rows left over from empty form inputs.
    fn tidy(&mut self) {
        for list in [
            &mut self.prescribed_medications,
            &mut self.abortives,
            &mut self.symptoms,
        ] {
            list.retain(|value| !value.trim().is_empty());
        }
    }

    pub fn display_name(&self) -> String {
        match self.preferred_name.as_deref().map(str::trim) {
            Some(preferred) if !preferred.is_empty() => preferred.to_string(),
            _ => format!("{} {}", self.first_name.trim(), self.last_name.trim()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PainLevelDescription {
    pub value: u8,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PainScale {
    #[serde(default)]
    pub scale_type: String,
    pub levels: Vec<PainLevelDescription>,
}

impl PainScale {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.levels.is_empty() {
            return Err(ValidationError::Invalid("pain scale needs at least one level".into()));
        }
        let mut seen = HashSet::new();
        for level in &self.levels {
            if level.value > 10 {
                return Err(ValidationError::Invalid(format!(
                    "pain scale level {} is outside 0-10",
                    level.value
                )));
            }
            if !seen.insert(level.value) {
                return Err(ValidationError::Invalid(format!(
                    "pain scale level {} is defined twice",
                    level.value
                )));
            }
            if level.description.trim().is_empty() {
                return Err(ValidationError::Invalid(format!(
                    "pain scale level {} has no description",
                    level.value
                )));
            }
        }
        Ok(())
    }

    pub fn describe(&self, level: u8) -> Option<&str> {
        self.levels
            .iter()
            .find(|entry| entry.value == level)
            .map(|entry| entry.description.as_str())
    }
}

pub const BUILTIN_SCALES: [&str; 2] = ["uk_nhs", "us_med"];

pub fn builtin_scale(name: &str) -> Option<PainScale> {
    let table: &[&str; 11] = match name {
        "uk_nhs" => &UK_NHS_LEVELS,
        "us_med" => &US_MED_LEVELS,
        _ => return None,
    };

    Some(PainScale {
        scale_type: name.to_string(),
        levels: table
            .iter()
            .enumerate()
            .map(|(value, description)| PainLevelDescription {
                value: value as u8,
                description: description.to_string(),
            })
            .collect(),
    })
}

const UK_NHS_LEVELS: [&str; 11] = [
    "Pain free",
    "Very minor annoyance - occasional and of short duration",
    "Minor annoyance - occasional and of moderate duration",
    "Annoying enough to be distracting",
    "Can be ignored if you are really involved in your work, but still distracting",
    "Can't be ignored for more than 30 minutes",
    "Can't be ignored for any length of time, but you can still go to work and participate in social activities",
    "Makes it difficult to concentrate, interferes with sleep, you can still function with effort",
    "Physical activity severely limited, you can read and converse with effort, can't sleep",
    "Unable to speak, crying out or moaning uncontrollably - pain makes you pass out",
    "Unconscious",
];

const US_MED_LEVELS: [&str; 11] = [
    "No hurt",
    "Very mild - hardly noticeable",
    "Hurts a little bit",
    "Tolerable - noticeable and distracting",
    "Hurts a little more",
    "Distressing - cannot be ignored for more than a few minutes",
    "Hurts even more",
    "Very intense - interferes with sleep",
    "Hurts a whole lot",
    "Excruciating - unable to converse",
    "Hurts worst - unspeakable pain",
];

/// Pain scale choice from the wizard: a built-in scale name or `custom` with
/// the scale given either as a JSON object or as JSON text.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PainScaleRequest {
    pub scale: String,
    #[serde(default)]
    pub custom: Option<serde_json::Value>,
}

impl PainScaleRequest {
    pub fn resolve(self) -> Result<PainScale, ValidationError> {
        if self.scale != "custom" {
            return builtin_scale(&self.scale).ok_or_else(|| {
                ValidationError::Invalid(format!(
                    "unknown pain scale '{}', expected one of {} or custom",
                    self.scale,
                    BUILTIN_SCALES.join(", ")
                ))
            });
        }

        let value = match self.custom {
            Some(serde_json::Value::String(text)) => serde_json::from_str(&text)
                .map_err(|err| ValidationError::Invalid(format!("custom pain scale is not valid JSON: {err}")))?,
            Some(value) => value,
            None => return Err(ValidationError::MissingField("custom")),
        };

        let mut scale: PainScale = serde_json::from_value(value)
            .map_err(|err| ValidationError::Invalid(format!("custom pain scale: {err}")))?;
        scale.scale_type = "custom".to_string();
        scale.validate()?;
        Ok(scale)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SetupStatus {
    pub datastore: bool,
    pub patient: bool,
    pub pain_scale: bool,
    pub complete: bool,
}

/// Everything the wizard has written, as loaded at startup.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub datastore: Option<DatastoreConfig>,
    pub patient: Option<PatientProfile>,
    pub pain_scale: Option<PainScale>,
}

impl Settings {
    pub fn status(&self) -> SetupStatus {
        let datastore = self.datastore.is_some();
        let patient = self.patient.is_some();
        let pain_scale = self.pain_scale.is_some();
        SetupStatus {
            datastore,
            patient,
            pain_scale,
            complete: datastore && patient && pain_scale,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    /// Reads every setup file. A file that is missing, unparsable or fails
    /// validation loads as not configured.
    pub async fn load_settings(&self) -> Settings {
        let datastore = load_json::<ConfigFile>(&self.path(CONFIG_FILE))
            .await
            .map(|file| file.datastore)
            .filter(|datastore| accepted("datastore", datastore.validate()));
        let patient = load_json::<PatientProfile>(&self.path(PATIENT_FILE))
            .await
            .filter(|patient| accepted("patient profile", patient.validate()));
        let pain_scale = load_json::<PainScale>(&self.path(PAIN_SCALE_FILE))
            .await
            .filter(|scale| accepted("pain scale", scale.validate()));

        Settings {
            datastore,
            patient,
            pain_scale,
        }
    }

    pub async fn status(&self) -> SetupStatus {
        self.load_settings().await.status()
    }

    pub async fn save_datastore(&self, datastore: &DatastoreConfig) -> Result<(), ConfigError> {
        datastore.validate()?;
        let file = ConfigFile {
            datastore: DatastoreConfig {
                url: datastore.url.trim().to_string(),
            },
        };
        self.write_json(CONFIG_FILE, &file).await
    }

    pub async fn save_patient(&self, patient: &mut PatientProfile) -> Result<(), ConfigError> {
        patient.tidy();
        patient.validate()?;
        self.write_json(PATIENT_FILE, patient).await
    }

    pub async fn save_pain_scale(&self, scale: &PainScale) -> Result<(), ConfigError> {
        scale.validate()?;
        self.write_json(PAIN_SCALE_FILE, scale).await
    }

    async fn write_json<T: Serialize>(&self, file: &str, value: &T) -> Result<(), ConfigError> {
        let path = self.path(file);
        let payload = serde_json::to_vec_pretty(value)?;
        let write_err = |source| ConfigError::Write {
            path: path.display().to_string(),
            source,
        };

        fs::create_dir_all(&self.dir).await.map_err(write_err)?;
        fs::write(&path, payload).await.map_err(write_err)?;
        info!(path = %path.display(), "saved setup file");
        Ok(())
    }
}

fn accepted(what: &str, outcome: Result<(), ValidationError>) -> bool {
    match outcome {
        Ok(()) => true,
        Err(err) => {
            warn!("ignoring {what}: {err}");
            false
        }
    }
}

async fn load_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(err) => {
                error!("failed to parse {}: {err}", path.display());
                None
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
        Err(err) => {
            error!("failed to read {}: {err}", path.display());
            None
        }
    }
}
