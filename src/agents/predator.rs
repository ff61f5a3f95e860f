//! The hunting predator agent.

use super::{Agent, PredColorMap, PredSnapshot};
use crate::flight::{AeroInfo, Body};

/// One predator: a flight body plus the hunt bookkeeping the hunting actions
/// maintain.
#[derive(Debug, Clone)]
pub struct Pred {
    pub body: Body,
    /// Prey individual currently chased, if any. Cleared on every state exit.
    pub target_i: Option<u32>,
    /// Representative member of the flock selected for shadowing, if any.
    pub target_f: Option<u32>,
}

impl Pred {
    pub fn new(ai: AeroInfo) -> Self {
        Pred {
            body: Body::new(ai),
            target_i: None,
            target_f: None,
        }
    }

    /// Per-update prologue: reset the steering accumulator.
    pub fn begin_update(&mut self) {
        self.body.steering = crate::vector::Vec2::zero();
    }

    pub fn snapshot(&self, alive: bool) -> PredSnapshot {
        PredSnapshot {
            pos: self.body.pos,
            dir: self.body.dir,
            speed: self.body.speed,
            accel: self.body.accel,
            alive,
        }
    }

    /// Installs the physical part of a snapshot; the alive flag is applied by
    /// the kernel, which owns the schedule.
    pub fn apply_snapshot(&mut self, se: &PredSnapshot) {
        self.body.pos = se.pos;
        self.body.dir = se.dir;
        self.body.speed = se.speed;
        self.body.accel = se.accel;
    }

    /// Scalar in [−1, 1] for the renderer's color map.
    pub fn color_tex(&self, map: PredColorMap, state: usize, n_states: usize) -> f32 {
        let tex = match map {
            PredColorMap::None => -1.0,
            PredColorMap::Speed => self.body.speed / 30.0,
            PredColorMap::State => state as f32 / n_states.max(1) as f32,
        };
        tex.clamp(-1.0, 1.0)
    }
}

impl Agent for Pred {
    fn body(&self) -> &Body {
        &self.body
    }

    fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    fn on_state_exit(&mut self) {
        self.target_i = None;
    }
}
