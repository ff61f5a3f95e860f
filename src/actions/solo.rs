//! Behaviors without any interaction: random jitter and fixed turns.

use crate::config;
use crate::error::{Error, Result};
use crate::flight::Body;
use rand::Rng;
use serde_json::Value;

/// Uniform random lateral jitter in `[-w, +w]`.
pub struct Wiggle {
    w: f32,
}

impl Wiggle {
    pub fn from_config(j: &Value) -> Result<Self> {
        Ok(Wiggle {
            w: config::num_f32(j, "w", "action wiggle")?,
        })
    }

    pub fn step(&self, body: &mut Body) {
        if self.w == 0.0 {
            return;
        }
        let w = rand::rng().random_range(-self.w..=self.w);
        body.steering += body.dir.perp() * w;
    }
}

/// Constant-radius turn: centripetal force `m·s²/radius`.
pub struct RTurn {
    radius: f32,
}

impl RTurn {
    pub fn from_config(j: &Value) -> Result<Self> {
        let radius = config::num_f32(j, "radius", "action r_turn")?;
        if radius == 0.0 {
            return Err(Error::InvalidParameter(
                "r_turn: `radius` must be nonzero".into(),
            ));
        }
        Ok(RTurn { radius })
    }

    pub fn step(&self, body: &mut Body) {
        let fz = body.ai.body_mass * body.speed * body.speed / self.radius;
        body.steering += body.dir.perp() * fz;
    }
}

/// Turn `turn` radians in `time` seconds; the radius is fixed from the speed
/// at state entry.
pub struct TTurn {
    turn: f32,
    time: f32,
    r: f32,
}

impl TTurn {
    pub fn from_config(j: &Value) -> Result<Self> {
        let ctx = "action t_turn";
        let turn = config::num_f32(j, "turn", ctx)?.to_radians();
        let time = config::num_f32(j, "time", ctx)?;
        if time == 0.0 || turn == 0.0 {
            return Err(Error::InvalidParameter(
                "t_turn: `turn` and `time` must be nonzero".into(),
            ));
        }
        Ok(TTurn { turn, time, r: 0.0 })
    }

    pub fn on_entry(&mut self, body: &mut Body) {
        let w = self.turn / self.time;
        self.r = body.speed / w;
    }

    pub fn step(&self, body: &mut Body) {
        if self.r == 0.0 {
            return;
        }
        let fz = body.ai.body_mass * body.speed * body.speed / self.r;
        body.steering += body.dir.perp() * fz;
    }
}
