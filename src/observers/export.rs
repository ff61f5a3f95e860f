//! Run provenance: drops the composed configuration and a marker file named
//! after the configuration into the run's output folder, so every data
//! directory is self-describing.

use super::{Msg, Observer};
use crate::config;
use crate::error::Result;
use crate::simulation::Simulation;
use serde_json::Value;
use std::fs::File;
use std::path::Path;

pub struct ConfigExportObserver;

impl ConfigExportObserver {
    pub fn new(raw: &Value, out_dir: &Path, config_name: &str) -> Result<Self> {
        let marker = Path::new(config_name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| config_name.to_string());
        File::create(out_dir.join(format!("{marker}.txt")))?;
        config::save(raw, &out_dir.join("composed_config.json"))?;
        Ok(ConfigExportObserver)
    }
}

impl Observer for ConfigExportObserver {
    fn notify(&mut self, _msg: Msg, _sim: &Simulation) {}
}
