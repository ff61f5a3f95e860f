//! Full sorted neighbor tables per prey: for each alive focal agent, all its
//! alive neighbors nearest-first with id, distance, bearing and direction.
//!
//! Rows are ragged: an agent with fewer alive neighbors than the population
//! maximum emits a shorter row.

use super::sink::{CsvSink, SampleClock, FLUSH_ROWS};
use super::{Msg, Observer};
use crate::config::ObserverSpec;
use crate::error::Result;
use crate::simulation::Simulation;
use crate::torus;
use crate::vector::Vec2;
use crate::world::World;
use log::{error, info};
use std::path::Path;

pub struct AllNeighborsObserver {
    sink: CsvSink,
    clock: SampleClock,
}

impl AllNeighborsObserver {
    pub fn new(out_dir: &Path, spec: &ObserverSpec, world: World, n: usize) -> Result<Self> {
        let mut header = String::from("time,id,flock_id");
        for i in 1..n {
            header.push_str(&format!(",idOfn{i},dist2n{i},bAngl2n{i},dirX2n{i},dirY2n{i}"));
        }
        Ok(AllNeighborsObserver {
            sink: CsvSink::create(out_dir.join(format!("{}.csv", spec.output_name)), &header)?,
            clock: SampleClock::new(spec.sample_freq, world),
        })
    }

    fn collect(&mut self, sim: &Simulation) {
        sim.with_view(|v| {
            let wh = v.world.wh;
            let tt = v.time() as f32;
            for (idx, p) in v.prey().iter().enumerate() {
                if !v.is_prey_alive(idx) {
                    continue;
                }
                let mut row = vec![tt, idx as f32, v.flock_of(idx) as f32];
                for ni in v.sorted_prey_prey(idx) {
                    let other = &v.prey()[ni.idx as usize];
                    let dir2 = torus::ofs(wh, p.body.pos, other.body.pos)
                        .safe_normalize(Vec2::zero());
                    row.extend_from_slice(&[
                        ni.idx as f32,
                        ni.dist2.sqrt(),
                        ni.bangl,
                        dir2.x,
                        dir2.y,
                    ]);
                }
                self.sink.push(row);
            }
        });
    }

    fn save(&mut self) {
        if self.sink.buffered() == 0 {
            return;
        }
        info!("saving neighbors data ({} rows)", self.sink.buffered());
        if let Err(e) = self.sink.flush() {
            error!("neighbors data save failed: {e}");
        }
    }
}

impl Observer for AllNeighborsObserver {
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
