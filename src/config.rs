//! # Configuration loading
//!
//! The model is configured from hierarchical JSON files that allow R-style
//! `#` line comments. Several files compose into one root object (the usual
//! split is a simulation file plus one file per species), so species
//! parameters can be swapped without touching the rest.
//!
//! The root object carries a `Simulation` section, a `Prey` section and a
//! `Pred` section. Structured parts deserialize into the typed structs below;
//! action parameter objects stay dynamic (`serde_json::Value`) because their
//! fields depend on the action name, and are decoded by the action
//! constructors at build time. Unknown keys are ignored; missing required
//! keys are fatal at construction with the offending action or state named.

use crate::error::{Error, Result};
use crate::vector::Vec2;
use crate::world::World;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Strips `#` line comments. Line based, so it must not be fed conforming
/// JSON containing `#` inside string literals.
pub fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        match line.find('#') {
            Some(pos) => out.push_str(&line[..pos]),
            None => out.push_str(line),
        }
        out.push('\n');
    }
    out
}

/// Loads one commented-JSON file into a dynamic value.
pub fn load_file(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
    let v: Value = serde_json::from_str(&strip_comments(&text))?;
    Ok(v)
}

/// Composes several files into one root object by merging their top-level
/// members, later files extending earlier ones.
pub fn compose(paths: &[impl AsRef<Path>]) -> Result<Value> {
    let mut root = serde_json::Map::new();
    for path in paths {
        let v = load_file(path.as_ref())?;
        let obj = v.as_object().ok_or_else(|| {
            Error::Config(format!(
                "{}: top level must be an object",
                path.as_ref().display()
            ))
        })?;
        for (k, val) in obj {
            root.insert(k.clone(), val.clone());
        }
    }
    Ok(Value::Object(root))
}

/// Writes a composed configuration back to disk.
pub fn save(j: &Value, path: &Path) -> Result<()> {
    fs::write(path, serde_json::to_string_pretty(j)?)?;
    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AeroConfig {
    pub body_mass: f32,
    #[serde(default)]
    pub body_mass_sd: f32,
    /// Absent: derived from the wing load.
    #[serde(default)]
    pub cruise_speed: Option<f32>,
    #[serde(default)]
    pub cruise_speed_sd: f32,
    pub wing_area: f32,
    #[serde(default)]
    pub wing_span: Option<f32>,
    pub min_speed: f32,
    pub max_speed: f32,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FlockDetectionConfig {
    /// Seconds between clustering passes.
    pub interval: f32,
    /// Neighbor distance below which two prey share a flock [m].
    pub threshold: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObserverSpec {
    #[serde(rename = "type")]
    pub kind: String,
    pub output_name: String,
    /// Sampling period [s]; clamped to at least one tick.
    pub sample_freq: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub data_folder: String,
    #[serde(rename = "Observers", default)]
    pub observers: Vec<ObserverSpec>,
    #[serde(rename = "Externals", default)]
    pub externals: Value,
}

fn default_num_threads() -> i64 {
    -1
}

fn default_speedup() -> f64 {
    1.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    pub dt: f32,
    #[serde(rename = "WH")]
    pub wh: f32,
    /// Run length [s].
    #[serde(rename = "Tmax")]
    pub tmax: f64,
    /// −1 = let rayon decide.
    #[serde(rename = "numThreads", default = "default_num_threads")]
    pub num_threads: i64,
    /// Wall-clock pacing factor; meaningful to a viewer only.
    #[serde(default = "default_speedup")]
    pub speedup: f64,
    #[serde(rename = "flockDetection")]
    pub flock_detection: FlockDetectionConfig,
    #[serde(default)]
    pub terrain: Option<String>,
    #[serde(rename = "Analysis")]
    pub analysis: Option<AnalysisConfig>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct StateAeroConfig {
    #[serde(rename = "cruiseSpeed")]
    pub cruise_speed: f32,
    pub w: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StateConfig {
    pub name: String,
    /// Reaction time [s].
    pub tr: f32,
    /// Present: persistent state of this duration [s]. Absent: transient.
    #[serde(default)]
    pub duration: Option<f32>,
    #[serde(rename = "aeroState")]
    pub aero_state: StateAeroConfig,
    pub actions: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransitionsConfig {
    pub name: String,
    /// One transition matrix per interpolation pivot.
    #[serde(rename = "TM")]
    pub tm: Vec<Vec<Vec<f32>>>,
    /// Ascending pivot values.
    pub edges: Vec<f32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpeciesConfig {
    #[serde(rename = "N")]
    pub n: usize,
    /// Viewer hints, carried through untouched.
    #[serde(default)]
    pub scale: Option<f32>,
    #[serde(default)]
    pub shape: Option<Value>,
    pub aero: AeroConfig,
    #[serde(rename = "InitCondit")]
    pub init: Value,
    pub states: Vec<StateConfig>,
    #[serde(default)]
    pub transitions: Option<TransitionsConfig>,
}

/// The fully parsed configuration plus the raw composed object (kept for the
/// config-export observer).
#[derive(Debug, Clone)]
pub struct Config {
    pub simulation: SimulationConfig,
    pub prey: SpeciesConfig,
    pub pred: SpeciesConfig,
    pub raw: Value,
}

impl Config {
    pub fn parse(raw: Value) -> Result<Config> {
        let section = |key: &str| -> Result<Value> {
            raw.get(key)
                .cloned()
                .ok_or_else(|| Error::Config(format!("missing `{key}` section")))
        };
        let simulation: SimulationConfig = serde_json::from_value(section("Simulation")?)?;
        if simulation.dt <= 0.0 {
            return Err(Error::InvalidParameter("Simulation.dt must be positive".into()));
        }
        if simulation.wh <= 0.0 {
            return Err(Error::InvalidParameter("Simulation.WH must be positive".into()));
        }
        let prey: SpeciesConfig = serde_json::from_value(section("Prey")?)?;
        let pred: SpeciesConfig = serde_json::from_value(section("Pred")?)?;
        Ok(Config {
            simulation,
            prey,
            pred,
            raw,
        })
    }

    pub fn from_files(paths: &[impl AsRef<Path>]) -> Result<Config> {
        Config::parse(compose(paths)?)
    }

    pub fn world(&self) -> World {
        World::new(self.simulation.wh, self.simulation.dt)
    }
}

// ---- field helpers for the dynamic action parameter objects ----

fn field<'a>(j: &'a Value, key: &str, ctx: &str) -> Result<&'a Value> {
    j.get(key)
        .ok_or_else(|| Error::Config(format!("{ctx}: missing field `{key}`")))
}

pub fn num_f32(j: &Value, key: &str, ctx: &str) -> Result<f32> {
    field(j, key, ctx)?
        .as_f64()
        .map(|v| v as f32)
        .ok_or_else(|| Error::Config(format!("{ctx}: field `{key}` must be a number")))
}

pub fn opt_f32(j: &Value, key: &str, ctx: &str) -> Result<Option<f32>> {
    match j.get(key) {
        None => Ok(None),
        Some(v) => v
            .as_f64()
            .map(|v| Some(v as f32))
            .ok_or_else(|| Error::Config(format!("{ctx}: field `{key}` must be a number"))),
    }
}

pub fn num_usize(j: &Value, key: &str, ctx: &str) -> Result<usize> {
    field(j, key, ctx)?
        .as_u64()
        .map(|v| v as usize)
        .ok_or_else(|| Error::Config(format!("{ctx}: field `{key}` must be a non-negative integer")))
}

pub fn str_field<'a>(j: &'a Value, key: &str, ctx: &str) -> Result<&'a str> {
    field(j, key, ctx)?
        .as_str()
        .ok_or_else(|| Error::Config(format!("{ctx}: field `{key}` must be a string")))
}

/// Reads a `[x, y]` pair.
pub fn vec2_field(j: &Value, key: &str, ctx: &str) -> Result<Vec2> {
    let arr = field(j, key, ctx)?
        .as_array()
        .filter(|a| a.len() == 2)
        .ok_or_else(|| Error::Config(format!("{ctx}: field `{key}` must be a [x, y] pair")))?;
    let get = |i: usize| -> Result<f32> {
        arr[i]
            .as_f64()
            .map(|v| v as f32)
            .ok_or_else(|| Error::Config(format!("{ctx}: field `{key}` must hold numbers")))
    };
    Ok(Vec2::new(get(0)?, get(1)?))
}

/// Reads a flag encoded as 0/1 (or a bare bool).
pub fn flag_field(j: &Value, key: &str, ctx: &str) -> Result<bool> {
    let v = field(j, key, ctx)?;
    if let Some(b) = v.as_bool() {
        return Ok(b);
    }
    v.as_i64()
        .map(|i| i != 0)
        .ok_or_else(|| Error::Config(format!("{ctx}: field `{key}` must be 0/1 or a bool")))
}
