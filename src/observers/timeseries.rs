//! Per-prey time series: kinematics, flock-relative and predator-relative
//! measures.

use super::sink::{CsvSink, SampleClock, FLUSH_ROWS};
use super::{Msg, Observer};
use crate::analysis;
use crate::config::ObserverSpec;
use crate::error::Result;
use crate::simulation::Simulation;
use crate::torus;
use crate::vector::Vec2;
use crate::world::World;
use log::{error, info};
use std::path::Path;

const HEADER: &str = "time,id,posx,posy,dirx,diry,speed,accelx,accely,ang_vel,centr,state,f_id,\
diff_head,dist2fcent,rad2fcent,dirX2fcent,dirY2fcent,radAwayPred,dist2pred,dirX2pred,dirY2pred,conflict";

pub struct TimeSeriesObserver {
    sink: CsvSink,
    clock: SampleClock,
}

impl TimeSeriesObserver {
    pub fn new(out_dir: &Path, spec: &ObserverSpec, world: World) -> Result<Self> {
        Ok(TimeSeriesObserver {
            sink: CsvSink::create(out_dir.join(format!("{}.csv", spec.output_name)), HEADER)?,
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
                let pos = p.body.pos;
                let dir = p.body.dir;

                let fl_id = v.flock_of(idx);
                let flock = v.flock_descr(fl_id);
                let dist2cent = torus::distance(wh, pos, flock.gc);
                let dir2fcent = torus::ofs(wh, pos, flock.gc).safe_normalize(Vec2::zero());
                let head_dev = analysis::head_dif(dir, flock.vel).to_degrees();
                let centr = analysis::centrality(v, idx);
                let rad2fcent = crate::vector::math::rad_between(&dir, &dir2fcent);

                // -1 columns when no predator is alive
                let mut conflict = -1.0f32;
                let mut dist2pred = -1.0f32;
                let mut rad_away_pred = -1.0f32;
                let mut dir2pred = Vec2::new(-1.0, -1.0);
                if let Some(ni) = v.sorted_prey_pred(idx).first() {
                    let predator = &v.preds()[ni.idx as usize];
                    dist2pred = torus::distance(wh, pos, predator.body.pos);
                    conflict = analysis::in_conflict_dir_ali(dir, predator.body.dir, flock.vel);
                    dir2pred = torus::ofs(wh, pos, predator.body.pos).safe_normalize(Vec2::zero());
                    rad_away_pred = crate::vector::math::rad_between(&predator.body.dir, &dir);
                }

                self.sink.push(vec![
                    tt,
                    idx as f32,
                    pos.x,
                    pos.y,
                    dir.x,
                    dir.y,
                    p.body.speed,
                    p.body.accel.x,
                    p.body.accel.y,
                    p.body.ang_vel,
                    centr,
                    v.prey_state(idx) as f32,
                    fl_id as f32,
                    head_dev,
                    dist2cent,
                    rad2fcent,
                    dir2fcent.x,
                    dir2fcent.y,
                    rad_away_pred,
                    dist2pred,
                    dir2pred.x,
                    dir2pred.y,
                    conflict,
                ]);
            }
        });
    }

    fn save(&mut self) {
        if self.sink.buffered() == 0 {
            return;
        }
        info!("saving timeseries data ({} rows)", self.sink.buffered());
        if let Err(e) = self.sink.flush() {
            error!("timeseries save failed: {e}");
        }
    }
}

impl Observer for TimeSeriesObserver {
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
