use crate::core::io::param::{self, ParamFileError, ParseError};
use crate::core::models::value::{Object, Value, ValueError, ValueKind};
use phf::{Map, phf_map};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Value(#[from] ValueError),
    #[error("Invalid parameter syntax: {0}")]
    Parse(#[from] ParseError),
    #[error(transparent)]
    File(#[from] ParamFileError),
    #[error("Parameter '{key}' must be {expected}, found {found}")]
    UnexpectedType {
        key: String,
        expected: &'static str,
        found: ValueKind,
    },
    #[error("Parameter '{key}' must be a list of {expected} values, found {found}")]
    ListSize {
        key: String,
        expected: usize,
        found: usize,
    },
    #[error("Invalid value for '{key}': {reason}")]
    Invalid { key: String, reason: String },
}

impl ConfigError {
    fn invalid(key: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Seed,
    NSteps,
    OutputFreq,
    PrintFreq,
    PressureFreq,
    UseNpt,
    VdwCutoff,
    Temperature,
    DeltaDisplacement,
    TargetPressure,
    DeltaVolume,
    Output,
    Coordinates,
    BoxLength,
}

static FIELDS: Map<&'static str, Field> = phf_map! {
    "seed" => Field::Seed,
    "n_steps" => Field::NSteps,
    "output_freq" => Field::OutputFreq,
    "print_freq" => Field::PrintFreq,
    "pressure_freq" => Field::PressureFreq,
    "use_NpT" => Field::UseNpt,
    "VdW_cutoff" => Field::VdwCutoff,
    "temperature" => Field::Temperature,
    "delta_displacement" => Field::DeltaDisplacement,
    "target_pressure" => Field::TargetPressure,
    "delta_volume" => Field::DeltaVolume,
    "output" => Field::Output,
    "coordinates" => Field::Coordinates,
    "box_length" => Field::BoxLength,
};

/// Returns `true` if `key` is a parameter the simulation understands.
pub fn is_known_key(key: &str) -> bool {
    FIELDS.contains_key(key)
}

/// Everything a simulation run reads from its parameter file.
///
/// Values are in reduced Lennard-Jones units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationParameters {
    /// Trajectory file; frames are written every `output_freq` steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    pub output_freq: u64,
    pub print_freq: u64,
    pub pressure_freq: u64,
    pub seed: i64,
    pub n_steps: u64,
    /// Starting geometry. When absent the particles start on a cubic lattice.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<PathBuf>,
    pub box_length: [f64; 3],
    #[serde(rename = "VdW_cutoff")]
    pub vdw_cutoff: f64,
    pub temperature: f64,
    pub delta_displacement: f64,
    #[serde(rename = "use_NpT")]
    pub use_npt: bool,
    pub target_pressure: f64,
    pub delta_volume: f64,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default();

        Self {
            output: None,
            output_freq: 5,
            print_freq: 1,
            pressure_freq: 1,
            seed,
            n_steps: 100,
            coordinates: None,
            box_length: [1.0, 1.0, 1.0],
            vdw_cutoff: 0.5,
            temperature: 1.0,
            delta_displacement: 0.1,
            use_npt: false,
            target_pressure: 1.0,
            delta_volume: 0.1,
        }
    }
}

impl SimulationParameters {
    /// Binds and validates a parsed parameter document on top of the defaults.
    pub fn from_value(document: &Value) -> Result<Self, ConfigError> {
        let mut params = Self::default();
        params.bind(document)?;
        params.validate()?;
        Ok(params)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::from_value(&param::load_path(path)?)
    }

    /// Copies every recognised entry of `document` into `self`.
    ///
    /// Unknown keys are logged and returned; they never fail the binding. No
    /// coercion happens between integers and reals. Does not validate.
    pub fn bind(&mut self, document: &Value) -> Result<Vec<String>, ConfigError> {
        let mut unknown = Vec::new();

        for (key, value) in document.as_object()?.iter() {
            match FIELDS.get(key) {
                Some(&field) => self.apply(field, key, value)?,
                None => {
                    warn!("Ignoring unknown parameter '{}'.", key);
                    unknown.push(key.to_string());
                }
            }
        }

        Ok(unknown)
    }

    fn apply(&mut self, field: Field, key: &str, value: &Value) -> Result<(), ConfigError> {
        match field {
            Field::Seed => self.seed = expect_integer(key, value)?,
            Field::NSteps => self.n_steps = expect_count(key, value)?,
            Field::OutputFreq => self.output_freq = expect_count(key, value)?,
            Field::PrintFreq => self.print_freq = expect_count(key, value)?,
            Field::PressureFreq => self.pressure_freq = expect_count(key, value)?,
            Field::UseNpt => self.use_npt = expect_boolean(key, value)?,
            Field::VdwCutoff => self.vdw_cutoff = expect_real(key, value)?,
            Field::Temperature => self.temperature = expect_real(key, value)?,
            Field::DeltaDisplacement => self.delta_displacement = expect_real(key, value)?,
            Field::TargetPressure => self.target_pressure = expect_real(key, value)?,
            Field::DeltaVolume => self.delta_volume = expect_real(key, value)?,
            Field::Output => self.output = Some(expect_path(key, value)?),
            Field::Coordinates => self.coordinates = Some(expect_path(key, value)?),
            Field::BoxLength => self.box_length = expect_real_triplet(key, value)?,
        }
        Ok(())
    }

    /// Checks the physical and scheduling constraints a run relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("n_steps", self.n_steps),
            ("output_freq", self.output_freq),
            ("print_freq", self.print_freq),
            ("pressure_freq", self.pressure_freq),
        ] {
            if value == 0 {
                return Err(ConfigError::invalid(key, "must be at least 1"));
            }
        }

        for (key, value) in [
            ("VdW_cutoff", self.vdw_cutoff),
            ("temperature", self.temperature),
            ("delta_displacement", self.delta_displacement),
            ("delta_volume", self.delta_volume),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::invalid(key, format!("must be positive, got {}", value)));
            }
        }

        if !self.target_pressure.is_finite() {
            return Err(ConfigError::invalid("target_pressure", "must be finite"));
        }

        if let Some(length) = self.box_length.iter().find(|l| !(l.is_finite() && **l > 0.0)) {
            return Err(ConfigError::invalid(
                "box_length",
                format!("every side must be positive, got {}", length),
            ));
        }

        let half_box = self.box_length.iter().copied().fold(f64::INFINITY, f64::min) / 2.0;
        if self.vdw_cutoff > half_box {
            return Err(ConfigError::invalid(
                "VdW_cutoff",
                format!(
                    "{} exceeds half the smallest box side ({})",
                    self.vdw_cutoff, half_box
                ),
            ));
        }

        Ok(())
    }

    /// The parameters as a parameter-language document, suitable for writing back
    /// to a file.
    pub fn to_value(&self) -> Value {
        let mut object = Object::new();
        if let Some(output) = &self.output {
            object.set("output", Value::from(output.display().to_string()));
        }
        object.set("output_freq", count_value(self.output_freq));
        object.set("print_freq", count_value(self.print_freq));
        object.set("pressure_freq", count_value(self.pressure_freq));
        object.set("seed", Value::Integer(self.seed));
        object.set("n_steps", count_value(self.n_steps));
        if let Some(coordinates) = &self.coordinates {
            object.set("coordinates", Value::from(coordinates.display().to_string()));
        }
        object.set(
            "box_length",
            Value::List(self.box_length.iter().map(|&l| Value::Real(l)).collect()),
        );
        object.set("VdW_cutoff", Value::Real(self.vdw_cutoff));
        object.set("temperature", Value::Real(self.temperature));
        object.set("delta_displacement", Value::Real(self.delta_displacement));
        object.set("use_NpT", Value::Boolean(self.use_npt));
        object.set("target_pressure", Value::Real(self.target_pressure));
        object.set("delta_volume", Value::Real(self.delta_volume));
        Value::Object(object)
    }

    #[inline]
    pub fn volume(&self) -> f64 {
        self.box_length.iter().product()
    }
}

impl FromStr for SimulationParameters {
    type Err = ConfigError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Self::from_value(&param::loads(input)?)
    }
}

fn count_value(count: u64) -> Value {
    Value::Integer(i64::try_from(count).unwrap_or(i64::MAX))
}

fn type_error(key: &str, expected: &'static str, value: &Value) -> ConfigError {
    ConfigError::UnexpectedType {
        key: key.to_string(),
        expected,
        found: value.kind(),
    }
}

fn expect_integer(key: &str, value: &Value) -> Result<i64, ConfigError> {
    value
        .as_integer()
        .map_err(|_| type_error(key, "an integer", value))
}

fn expect_count(key: &str, value: &Value) -> Result<u64, ConfigError> {
    let raw = expect_integer(key, value)?;
    u64::try_from(raw)
        .map_err(|_| ConfigError::invalid(key, format!("must not be negative, got {}", raw)))
}

fn expect_real(key: &str, value: &Value) -> Result<f64, ConfigError> {
    value.as_real().map_err(|_| type_error(key, "a real", value))
}

fn expect_boolean(key: &str, value: &Value) -> Result<bool, ConfigError> {
    value
        .as_boolean()
        .map_err(|_| type_error(key, "a boolean", value))
}

fn expect_path(key: &str, value: &Value) -> Result<PathBuf, ConfigError> {
    value
        .as_str()
        .map(PathBuf::from)
        .map_err(|_| type_error(key, "a string", value))
}

fn expect_real_triplet(key: &str, value: &Value) -> Result<[f64; 3], ConfigError> {
    let items = value
        .as_list()
        .map_err(|_| type_error(key, "a list", value))?;
    if items.len() != 3 {
        return Err(ConfigError::ListSize {
            key: key.to_string(),
            expected: 3,
            found: items.len(),
        });
    }

    let mut triplet = [0.0; 3];
    for (slot, item) in triplet.iter_mut().zip(items) {
        *slot = expect_real(key, item)?;
    }
    Ok(triplet)
}
