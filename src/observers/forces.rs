//! Coordination force angles per prey: the directions of the alignment,
//! cohesion and separation contributions relative to the heading.

use super::sink::{CsvSink, SampleClock, FLUSH_ROWS};
use super::{Msg, Observer};
use crate::config::ObserverSpec;
use crate::error::Result;
use crate::simulation::Simulation;
use crate::world::World;
use log::{error, info};
use std::path::Path;

const HEADER: &str = "time,id,ali_angl,coh_angl,sep_angl";

pub struct ForcesObserver {
    sink: CsvSink,
    clock: SampleClock,
}

impl ForcesObserver {
    pub fn new(out_dir: &Path, spec: &ObserverSpec, world: World) -> Result<Self> {
        Ok(ForcesObserver {
            sink: CsvSink::create(out_dir.join(format!("{}.csv", spec.output_name)), HEADER)?,
            clock: SampleClock::new(spec.sample_freq, world),
        })
    }

    fn collect(&mut self, sim: &Simulation) {
        sim.with_view(|v| {
            let tt = v.time() as f32;
            for (idx, p) in v.prey().iter().enumerate() {
                if v.is_prey_alive(idx) {
                    self.sink.push(vec![
                        tt,
                        idx as f32,
                        p.f_ali_ang,
                        p.f_coh_ang,
                        p.f_sep_ang,
                    ]);
                }
            }
        });
    }

    fn save(&mut self) {
        if self.sink.buffered() == 0 {
            return;
        }
        info!("saving forces data ({} rows)", self.sink.buffered());
        if let Err(e) = self.sink.flush() {
            error!("forces data save failed: {e}");
        }
    }
}

impl Observer for ForcesObserver {
    fn notify(&mut self, msg: Msg, sim: &Simulation) {
        match msg {
            Msg::Tick => {
                if self.clock.due(sim.tick()) {
                    self.collect(sim);
                }
                if self.sink.buffered() > FLUSH_ROWS {
                    self.save();
                }
            }
            Msg::Finished => self.save(),
            Msg::Initialized => {}
        }
    }
}
