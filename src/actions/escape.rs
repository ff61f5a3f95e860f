//! Predator avoidance and evasive turns.
//!
//! The avoidance actions react to the nearest alive predator; the turn
//! actions translate a (possibly sampled) turn-angle/turn-time pair into a
//! centripetal force `m·s²/r` with `r = s/ω`, applied orthogonally to the
//! heading for the life of the state. Whether the field of view should also
//! gate these reactions is an open point in the model; it is left off here so
//! a predator can startle prey from behind.

use super::{nearest_pred, PreyCtx};
use crate::agents::{PredView, Prey};
use crate::config;
use crate::error::{Error, Result};
use crate::flight::Body;
use crate::random;
use crate::torus;
use crate::vector::{math, Vec2};
use crate::world::{Tick, World};
use rand::Rng;
use rand_distr::{Distribution, Gamma};
use serde_json::Value;

/// Steer directly away from the nearest predator when it is within `minsep`.
pub struct AvoidPPosition {
    minsep2: f32,
    w: f32,
}

impl AvoidPPosition {
    pub fn from_config(j: &Value) -> Result<Self> {
        let ctx = "action avoid_p_position";
        let minsep = config::num_f32(j, "minsep", ctx)?;
        Ok(AvoidPPosition {
            minsep2: minsep * minsep,
            w: config::num_f32(j, "w", ctx)?,
        })
    }

    pub fn step(&self, prey: &mut Prey, idx: usize, ctx: &PreyCtx<'_>) {
        let Some((ni, predator)) = nearest_pred(ctx) else {
            return;
        };
        if ni.dist2 < self.minsep2 {
            prey.am_target = predator.target == Some(idx as u32);
            let ofss = torus::ofs(ctx.world.wh, predator.pos, prey.body.pos);
            prey.body.steering += ofss.safe_normalize(Vec2::zero()) * self.w;
        }
    }
}

/// Turn away from the nearest predator's heading when it is within `minsep`:
/// a lateral force whose sign is the signed angle from the predator's heading
/// to ours.
pub struct AvoidPDirection {
    minsep2: f32,
    w: f32,
}

impl AvoidPDirection {
    pub fn from_config(j: &Value) -> Result<Self> {
        let ctx = "action avoid_p_direction";
        let minsep = config::num_f32(j, "minsep", ctx)?;
        Ok(AvoidPDirection {
            minsep2: minsep * minsep,
            w: config::num_f32(j, "w", ctx)?,
        })
    }

    pub fn step(&self, prey: &mut Prey, idx: usize, ctx: &PreyCtx<'_>) {
        let Some((ni, predator)) = nearest_pred(ctx) else {
            return;
        };
        if ni.dist2 < self.minsep2 {
            prey.am_target = predator.target == Some(idx as u32);
            let rad_away = math::rad_between(&predator.dir, &prey.body.dir);
            let w = self.w.copysign(rad_away);
            prey.body.steering += prey.body.dir.perp() * w;
        }
    }
}

/// Turn sign away from the predator's *position*: +1 when the escape
/// direction lies to the left of our heading.
fn sign_away_position(body: &Body, predator: &PredView, wh: f32) -> f32 {
    let dir_away = torus::ofs(wh, predator.pos, body.pos).safe_normalize(Vec2::zero());
    if body.dir.perp_dot(&dir_away) > 0.0 { 1.0 } else { -1.0 }
}

/// Turn sign away from the predator's *heading*.
fn sign_away_heading(body: &Body, predator: &PredView) -> f32 {
    1.0f32.copysign(math::rad_between(&predator.dir, &body.dir))
}

fn centripetal(body: &mut Body, sign: f32, r: f32) {
    if sign == 0.0 || r == 0.0 {
        return;
    }
    let turn_dir = body.dir.perp() * sign;
    let fz = body.ai.body_mass * body.speed * body.speed / r;
    body.steering += turn_dir * fz;
}

/// Turn `turn` radians in `time` seconds away from the nearest predator.
pub struct TTurnPred {
    turn: f32,
    time: f32,
    r: f32,
    sign: f32,
}

impl TTurnPred {
    pub fn from_config(j: &Value) -> Result<Self> {
        let ctx = "action t_turn_pred";
        let turn = config::num_f32(j, "turn", ctx)?.to_radians();
        let time = config::num_f32(j, "time", ctx)?;
        if time == 0.0 || turn == 0.0 {
            return Err(Error::InvalidParameter(
                "t_turn_pred: `turn` and `time` must be nonzero".into(),
            ));
        }
        Ok(TTurnPred {
            turn,
            time,
            r: 0.0,
            sign: 0.0,
        })
    }

    pub fn on_entry(&mut self, prey: &mut Prey, idx: usize, ctx: &PreyCtx<'_>) {
        let w = self.turn / self.time;
        self.r = prey.body.speed / w;
        match nearest_pred(ctx) {
            Some((_, predator)) => {
                prey.am_target = predator.target == Some(idx as u32);
                self.sign = sign_away_position(&prey.body, predator, ctx.world.wh);
            }
            None => self.sign = 0.0,
        }
    }

    pub fn step(&mut self, body: &mut Body) {
        centripetal(body, self.sign, self.r);
    }
}

/// Like [`TTurnPred`], but the turn angle and time are drawn uniformly per
/// state entry; the sampled time also shortens the state.
pub struct RandomTTurnPred {
    turn_min: f32,
    turn_max: f32,
    time_min: f32,
    time_max: f32,
    turn_dur: Tick,
    dt: f32,
    r: f32,
    sign: f32,
}

impl RandomTTurnPred {
    pub fn from_config(j: &Value, world: World) -> Result<Self> {
        let ctx = "action random_t_turn_pred";
        let turn_min = config::num_f32(j, "turn_min", ctx)?.to_radians();
        let turn_max = config::num_f32(j, "turn_max", ctx)?.to_radians();
        let time_min = config::num_f32(j, "time_min", ctx)?;
        let time_max = config::num_f32(j, "time_max", ctx)?;
        if time_min <= 0.0 || time_max <= 0.0 || turn_max == 0.0 {
            return Err(Error::InvalidParameter(
                "random_t_turn_pred: turn window and times must be nonzero".into(),
            ));
        }
        Ok(RandomTTurnPred {
            turn_min,
            turn_max,
            time_min,
            time_max,
            turn_dur: (time_min / world.dt) as Tick,
            dt: world.dt,
            r: 0.0,
            sign: 0.0,
        })
    }

    pub fn check_state_exit(&self, duration: Tick, exit_tick: &mut Tick) {
        if duration > self.turn_dur {
            *exit_tick -= duration - self.turn_dur;
        }
    }

    pub fn on_entry(&mut self, prey: &mut Prey, ctx: &PreyCtx<'_>) {
        let mut rng = rand::rng();
        let turn = rng.random_range(self.turn_min..=self.turn_max);
        let time = rng.random_range(self.time_min..=self.time_max);
        self.turn_dur = (time as f64 / self.dt as f64) as Tick;
        let w = turn / time;
        self.r = prey.body.speed / w;
        match nearest_pred(ctx) {
            Some((_, predator)) => {
                self.sign = sign_away_heading(&prey.body, predator);
            }
            None => self.sign = 0.0,
        }
    }

    pub fn step(&mut self, body: &mut Body) {
        centripetal(body, self.sign, self.r);
    }
}

/// Like [`RandomTTurnPred`] with gamma-distributed turn angle and time,
/// parameterized by mean/sd pairs.
pub struct RandomTTurnGammaPred {
    turn_distr: Gamma<f32>,
    time_distr: Gamma<f32>,
    turn_dur: Tick,
    dt: f32,
    r: f32,
    sign: f32,
}

impl RandomTTurnGammaPred {
    pub fn from_config(j: &Value, world: World) -> Result<Self> {
        let ctx = "action random_t_turn_gamma_pred";
        let turn_mean = config::num_f32(j, "turn_mean", ctx)?.to_radians();
        let turn_sd = config::num_f32(j, "turn_sd", ctx)?.to_radians();
        let time_mean = config::num_f32(j, "time_mean", ctx)?;
        let time_sd = config::num_f32(j, "time_sd", ctx)?;
        if turn_mean <= 0.0 || turn_sd <= 0.0 || time_mean <= 0.0 || time_sd <= 0.0 {
            return Err(Error::InvalidParameter(
                "random_t_turn_gamma_pred: means and sds must be positive".into(),
            ));
        }
        let bad = |e: rand_distr::GammaError| {
            Error::InvalidParameter(format!("random_t_turn_gamma_pred: {e}"))
        };
        Ok(RandomTTurnGammaPred {
            turn_distr: random::gamma_from_mean_sd(turn_mean, turn_sd).map_err(bad)?,
            time_distr: random::gamma_from_mean_sd(time_mean, time_sd).map_err(bad)?,
            turn_dur: (time_mean / world.dt) as Tick,
            dt: world.dt,
            r: 0.0,
            sign: 0.0,
        })
    }

    pub fn check_state_exit(&self, duration: Tick, exit_tick: &mut Tick) {
        if duration > self.turn_dur {
            *exit_tick -= duration - self.turn_dur;
        }
    }

    pub fn on_entry(&mut self, prey: &mut Prey, ctx: &PreyCtx<'_>) {
        let mut rng = rand::rng();
        let (mut time, mut turn);
        loop {
            time = self.time_distr.sample(&mut rng);
            turn = self.turn_distr.sample(&mut rng);
            if time * turn > 0.0 {
                break;
            }
        }
        self.turn_dur = (time as f64 / self.dt as f64) as Tick;
        let w = turn / time;
        self.r = prey.body.speed / w;
        match nearest_pred(ctx) {
            Some((_, predator)) => self.sign = sign_away_heading(&prey.body, predator),
            None => self.sign = 0.0,
        }
    }

    pub fn step(&mut self, body: &mut Body) {
        centripetal(body, self.sign, self.r);
    }
}

/// Evasive zig-zag: turn away from the predator, flipping the turn direction
/// every `time/2` seconds. With no predator at entry the whole state produces
/// zero force.
pub struct ZigZag {
    turn: f32,
    time: f32,
    /// Ticks per half-turn.
    zig_timer: Tick,
    entry_tick: Tick,
    r: f32,
    sign: f32,
}

impl ZigZag {
    pub fn from_config(j: &Value, world: World) -> Result<Self> {
        let ctx = "action zig_zag";
        let turn = config::num_f32(j, "turn", ctx)?.to_radians();
        let time = config::num_f32(j, "time", ctx)?;
        if time == 0.0 || turn == 0.0 {
            return Err(Error::InvalidParameter(
                "zig_zag: `turn` and `time` must be nonzero".into(),
            ));
        }
        Ok(ZigZag {
            turn,
            time,
            zig_timer: (time / (world.dt * 2.0)) as Tick,
            entry_tick: 0,
            r: 0.0,
            sign: 1.0,
        })
    }

    pub fn on_entry(&mut self, prey: &mut Prey, idx: usize, t: Tick, ctx: &PreyCtx<'_>) {
        self.entry_tick = t;
        let w = 2.0 * self.turn / self.time;
        self.r = prey.body.speed / w;
        match nearest_pred(ctx) {
            Some((_, predator)) => {
                prey.am_target = predator.target == Some(idx as u32);
                self.sign = sign_away_position(&prey.body, predator, ctx.world.wh);
            }
            None => self.sign = 0.0,
        }
    }

    pub fn step(&mut self, body: &mut Body, t: Tick) {
        centripetal(body, self.sign, self.r);
        if t - self.entry_tick > self.zig_timer {
            self.sign = -self.sign;
            self.entry_tick = t;
        }
    }
}
