//! Lag-run settings layered from defaults, a TOML file and the environment.
//!
//! ```toml
//! epsilon = 10.0
//!
//! [schedule]
//! mode = "parameterized"
//! start = 0.0
//! end = 3.0
//! step = 0.5
//! ```

use serde::{Deserialize, Serialize};
use spiral_lag::{CircularLagEnumerator, LagError, LagRun, ShiftPolicy, DEFAULT_EPSILON};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub const CONFIG_VAR: &str = "SPIRAL_LAG_CONFIG";
pub const EPSILON_VAR: &str = "SPIRAL_LAG_EPSILON";
pub const MODE_VAR: &str = "SPIRAL_LAG_MODE";
pub const START_VAR: &str = "SPIRAL_LAG_START";
pub const END_VAR: &str = "SPIRAL_LAG_END";
pub const STEP_VAR: &str = "SPIRAL_LAG_STEP";
pub const PERIOD_VAR: &str = "SPIRAL_LAG_PERIOD";

/// Threshold and shift schedule for a circular lag run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LagSettings {
    /// Inclusion threshold: lags with `|d| <= epsilon` are kept.
    pub epsilon: f64,
    pub schedule: ScheduleSettings,
}

impl Default for LagSettings {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            schedule: ScheduleSettings::Auto,
        }
    }
}

/// Serialised form of [`ShiftPolicy`], tagged by `mode`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ScheduleSettings {
    #[default]
    Auto,
    Parameterized {
        #[serde(default)]
        start: f64,
        end: f64,
        step: f64,
    },
    Uniform {
        period: f64,
        step: f64,
    },
}

impl ScheduleSettings {
    pub fn mode(&self) -> ScheduleMode {
        match self {
            ScheduleSettings::Auto => ScheduleMode::Auto,
            ScheduleSettings::Parameterized { .. } => ScheduleMode::Parameterized,
            ScheduleSettings::Uniform { .. } => ScheduleMode::Uniform,
        }
    }
}

impl From<ScheduleSettings> for ShiftPolicy {
    fn from(settings: ScheduleSettings) -> Self {
        match settings {
            ScheduleSettings::Auto => ShiftPolicy::AutoDerived,
            ScheduleSettings::Parameterized { start, end, step } => {
                ShiftPolicy::Parameterized { start, end, step }
            }
            ScheduleSettings::Uniform { period, step } => ShiftPolicy::Uniform { period, step },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScheduleMode {
    Auto,
    Parameterized,
    Uniform,
}

impl ScheduleMode {
    fn parse(raw: &str) -> Result<Self, SettingsError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "auto" | "integer" => Ok(ScheduleMode::Auto),
            "parameterized" | "continuous" => Ok(ScheduleMode::Parameterized),
            "uniform" => Ok(ScheduleMode::Uniform),
            other => Err(SettingsError::InvalidValue {
                field: MODE_VAR,
                message: format!("unknown schedule mode {other:?}"),
            }),
        }
    }
}

impl std::fmt::Display for ScheduleMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScheduleMode::Auto => write!(f, "auto"),
            ScheduleMode::Parameterized => write!(f, "parameterized"),
            ScheduleMode::Uniform => write!(f, "uniform"),
        }
    }
}

impl LagSettings {
    pub fn from_toml_str(text: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(text).map_err(|source| SettingsError::Toml {
            path: None,
            source,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reads settings from a TOML file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text).map_err(|err| match err {
            SettingsError::Toml { source, .. } => SettingsError::Toml {
                path: Some(path.to_path_buf()),
                source,
            },
            other => other,
        })
    }

    /// Defaults with `SPIRAL_LAG_*` overrides applied.
    pub fn from_env() -> Result<Self, SettingsError> {
        let mut settings = Self::default();
        settings.apply_env_overrides()?;
        Ok(settings)
    }

    /// Merges defaults, then the file named by `SPIRAL_LAG_CONFIG` when it
    /// exists, then environment overrides.
    pub fn discover() -> Result<Self, SettingsError> {
        let mut settings = match env_string(CONFIG_VAR)?.map(PathBuf::from) {
            Some(path) if path.exists() => {
                debug!(path = %path.display(), "loading lag settings");
                Self::load(&path)?
            }
            Some(path) => {
                debug!(path = %path.display(), "lag settings file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };
        settings.apply_env_overrides()?;
        Ok(settings)
    }

    /// Applies `SPIRAL_LAG_*` variables on top of the current values.
    ///
    /// Switching the mode through `SPIRAL_LAG_MODE` requires the new mode's
    /// bounds to come from the environment unless the current schedule
    /// already carries them.
    pub fn apply_env_overrides(&mut self) -> Result<(), SettingsError> {
        if let Some(epsilon) = env_f64(EPSILON_VAR)? {
            self.epsilon = epsilon;
        }
        let mode = match env_string(MODE_VAR)? {
            Some(raw) => ScheduleMode::parse(&raw)?,
            None => self.schedule.mode(),
        };
        let start = env_f64(START_VAR)?;
        let end = env_f64(END_VAR)?;
        let step = env_f64(STEP_VAR)?;
        let period = env_f64(PERIOD_VAR)?;

        self.schedule = match (mode, self.schedule) {
            (ScheduleMode::Auto, _) => ScheduleSettings::Auto,
            (
                ScheduleMode::Parameterized,
                ScheduleSettings::Parameterized {
                    start: s,
                    end: e,
                    step: d,
                },
            ) => ScheduleSettings::Parameterized {
                start: start.unwrap_or(s),
                end: end.unwrap_or(e),
                step: step.unwrap_or(d),
            },
            (ScheduleMode::Parameterized, _) => ScheduleSettings::Parameterized {
                start: start.unwrap_or(0.0),
                end: end.ok_or(SettingsError::MissingValue { var: END_VAR, mode })?,
                step: step.ok_or(SettingsError::MissingValue { var: STEP_VAR, mode })?,
            },
            (ScheduleMode::Uniform, ScheduleSettings::Uniform { period: p, step: d }) => {
                ScheduleSettings::Uniform {
                    period: period.unwrap_or(p),
                    step: step.unwrap_or(d),
                }
            }
            (ScheduleMode::Uniform, _) => ScheduleSettings::Uniform {
                period: period.ok_or(SettingsError::MissingValue { var: PERIOD_VAR, mode })?,
                step: step.ok_or(SettingsError::MissingValue { var: STEP_VAR, mode })?,
            },
        };
        self.validate()
    }

    /// Checks the threshold; schedule bounds are checked when a run resolves
    /// them.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.epsilon >= 0.0 {
            Ok(())
        } else {
            Err(SettingsError::InvalidValue {
                field: "epsilon",
                message: format!("{} is not a non-negative threshold", self.epsilon),
            })
        }
    }

    pub fn policy(&self) -> ShiftPolicy {
        self.schedule.into()
    }

    pub fn enumerator(&self) -> CircularLagEnumerator {
        CircularLagEnumerator::new(self.policy()).with_epsilon(self.epsilon)
    }

    /// Runs the configured enumeration of `u` against `v`.
    pub fn run(&self, u: &[f64], v: &[f64]) -> Result<LagRun, SettingsError> {
        Ok(self.enumerator().run(u, v)?)
    }
}

fn env_string(var: &'static str) -> Result<Option<String>, SettingsError> {
    match std::env::var(var) {
        Ok(raw) if !raw.trim().is_empty() => Ok(Some(raw)),
        Ok(_) => Ok(None),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(source) => Err(SettingsError::Env { var, source }),
    }
}

fn env_f64(var: &'static str) -> Result<Option<f64>, SettingsError> {
    env_string(var)?
        .map(|raw| {
            raw.trim()
                .parse::<f64>()
                .map_err(|err| SettingsError::InvalidValue {
                    field: var,
                    message: format!("{raw:?} is not a number ({err})"),
                })
        })
        .transpose()
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse TOML {path:?}: {source}")]
    Toml {
        path: Option<PathBuf>,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to read {var}: {source}")]
    Env {
        var: &'static str,
        #[source]
        source: std::env::VarError,
    },
    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: &'static str, message: String },
    #[error("{var} is required for {mode} schedules")]
    MissingValue {
        var: &'static str,
        mode: ScheduleMode,
    },
    #[error(transparent)]
    Lag(#[from] LagError),
}
