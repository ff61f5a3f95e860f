//! On-demand population snapshots: each `notify_once` writes one numbered
//! CSV with the alive prey's restartable state.

use super::{Msg, Observer};
use crate::config::ObserverSpec;
use crate::simulation::Simulation;
use log::{error, info};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const HEADER: &str = "id,posx,posy,dirx,diry,speed,accelx,accely";

pub struct SnapshotObserver {
    base_path: PathBuf,
    counter: usize,
}

impl SnapshotObserver {
    pub fn new(out_dir: &Path, spec: &ObserverSpec) -> Self {
        SnapshotObserver {
            base_path: out_dir.join(&spec.output_name),
            counter: 0,
        }
    }

    fn write(&mut self, sim: &Simulation) -> std::io::Result<()> {
        let path = PathBuf::from(format!(
            "{}_{}.csv",
            self.base_path.display(),
            self.counter
        ));
        let mut writer = BufWriter::new(File::create(&path)?);
        writeln!(writer, "{HEADER}")?;
        sim.with_view(|v| -> std::io::Result<()> {
            for (idx, p) in v.prey().iter().enumerate() {
                if v.is_prey_alive(idx) {
                    writeln!(writer, "{}", p.snapshot().to_csv_row(idx))?;
                }
            }
            Ok(())
        })?;
        writer.flush()?;
        info!("snapshot written to {}", path.display());
        self.counter += 1;
        Ok(())
    }
}

impl Observer for SnapshotObserver {
    fn notify(&mut self, _msg: Msg, _sim: &Simulation) {}

    fn notify_once(&mut self, sim: &Simulation) {
        if let Err(e) = self.write(sim) {
            error!("snapshot save failed: {e}");
        }
    }
}
