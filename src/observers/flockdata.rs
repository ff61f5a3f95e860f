//! Per-flock aggregate rows: size, mean velocity, centroid and oriented
//! bounding box.

use super::sink::{CsvSink, SampleClock, FLUSH_ROWS};
use super::{Msg, Observer};
use crate::config::ObserverSpec;
use crate::error::Result;
use crate::simulation::Simulation;
use crate::world::World;
use log::{error, info};
use std::path::Path;

const HEADER: &str = "time,id,size,velx,vely,fcX,fcY,obbExtX,obbExtY,obbH0X,obbH0Y,obbH1X,obbH1Y";

pub struct FlockObserver {
    sink: CsvSink,
    clock: SampleClock,
}

impl FlockObserver {
    pub fn new(out_dir: &Path, spec: &ObserverSpec, world: World) -> Result<Self> {
        Ok(FlockObserver {
            sink: CsvSink::create(out_dir.join(format!("{}.csv", spec.output_name)), HEADER)?,
            clock: SampleClock::new(spec.sample_freq, world),
        })
    }

    fn collect(&mut self, sim: &Simulation) {
        sim.with_view(|v| {
            let tt = v.time() as f32;
            for (id, f) in v.flocks().iter().enumerate() {
                self.sink.push(vec![
                    tt,
                    id as f32,
                    f.size as f32,
                    f.vel.x,
                    f.vel.y,
                    f.gc.x,
                    f.gc.y,
                    f.ext.x,
                    f.ext.y,
                    f.h0.x,
                    f.h0.y,
                    f.h1.x,
                    f.h1.y,
                ]);
            }
        });
    }

    fn save(&mut self) {
        if self.sink.buffered() == 0 {
            return;
        }
        info!("saving flock data ({} rows)", self.sink.buffered());
        if let Err(e) = self.sink.flush() {
            error!("flock data save failed: {e}");
        }
    }
}

impl Observer for FlockObserver {
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
