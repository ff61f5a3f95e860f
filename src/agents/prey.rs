//! The flocking prey agent.

use super::{Agent, PreyColorMap, PreySnapshot};
use crate::flight::{self, AeroInfo, Body};
use crate::flock::NO_FLOCK;

/// One prey individual: a flight body plus the per-update flags and
/// force-angle diagnostics the observers export.
///
/// The behavioral state machine is held by the kernel alongside the
/// population, so the agent itself stays a plain data record that actions can
/// mutate while they read the rest of the flock through the frame.
#[derive(Debug, Clone)]
pub struct Prey {
    pub body: Body,
    /// Set by the predator-avoidance actions when the nearest predator is
    /// locked on this individual.
    pub am_target: bool,
    /// Angle of the alignment force relative to the heading [rad].
    pub f_ali_ang: f32,
    /// Angle of the cohesion force relative to the heading [rad].
    pub f_coh_ang: f32,
    /// Angle of the separation force relative to the heading [rad].
    pub f_sep_ang: f32,
}

impl Prey {
    pub fn new(ai: AeroInfo) -> Self {
        Prey {
            body: Body::new(ai),
            am_target: false,
            f_ali_ang: 0.0,
            f_coh_ang: 0.0,
            f_sep_ang: 0.0,
        }
    }

    /// Per-update prologue: reset the steering accumulator and the
    /// lock-on flag before the state machine runs.
    pub fn begin_update(&mut self) {
        self.body.steering = crate::vector::Vec2::zero();
        self.am_target = false;
    }

    pub fn snapshot(&self) -> PreySnapshot {
        PreySnapshot {
            pos: self.body.pos,
            dir: self.body.dir,
            speed: self.body.speed,
            accel: self.body.accel,
        }
    }

    pub fn apply_snapshot(&mut self, se: &PreySnapshot) {
        self.body.pos = se.pos;
        self.body.dir = se.dir;
        self.body.speed = se.speed;
        self.body.accel = se.accel;
    }

    /// Scalar in [−1, 1] for the renderer's color map; −1 marks "no value".
    pub fn color_tex(
        &self,
        map: PreyColorMap,
        idx: usize,
        pop_size: usize,
        state: usize,
        n_states: usize,
        flock_id: u32,
        n_flocks: usize,
    ) -> f32 {
        let tex = match map {
            PreyColorMap::None => -1.0,
            PreyColorMap::Idx => idx as f32 / pop_size.max(1) as f32,
            PreyColorMap::Speed => (self.body.speed / self.body.ai.max_speed).clamp(0.0, 1.0),
            PreyColorMap::Banking => {
                0.5 + flight::bank(&self.body) / std::f32::consts::PI
            }
            PreyColorMap::State => state as f32 / n_states.max(1) as f32,
            PreyColorMap::Flock => {
                if flock_id == NO_FLOCK {
                    -1.0
                } else {
                    flock_id as f32 / n_flocks.max(1) as f32
                }
            }
            PreyColorMap::Targeted => self.am_target as u8 as f32,
        };
        tex.clamp(-1.0, 1.0)
    }
}

impl Agent for Prey {
    fn body(&self) -> &Body {
        &self.body
    }

    fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }
}
