//! Predator positioning: flock selection, shadowing, waypoints and the
//! direct position/velocity setters used to stage attacks.

use super::PredCtx;
use crate::agents::Pred;
use crate::config;
use crate::error::{Error, Result};
use crate::flight::Body;
use crate::torus;
use crate::vector::Vec2;
use crate::world::World;
use rand::Rng;
use serde_json::Value;

/// How [`SelectFlock`] picks its target among the detected flocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Nearest,
    Biggest,
    Smallest,
    Random,
}

impl Selection {
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "nearest" => Ok(Selection::Nearest),
            "biggest" => Ok(Selection::Biggest),
            "smallest" => Ok(Selection::Smallest),
            "random" => Ok(Selection::Random),
            other => Err(Error::UnknownSelection(other.to_string())),
        }
    }
}

/// Pick a target flock and remember one representative member in `target_f`.
/// Re-evaluated on entry and on every step, so the target follows the
/// clustering as flocks merge and split.
pub struct SelectFlock {
    selection: Selection,
}

impl SelectFlock {
    pub fn from_config(j: &Value) -> Result<Self> {
        let s = config::str_field(j, "selection", "action select_flock")?;
        Ok(SelectFlock {
            selection: Selection::from_str(s)?,
        })
    }

    pub fn on_entry(&mut self, pred: &mut Pred, ctx: &PredCtx<'_>) {
        self.select(pred, ctx);
    }

    pub fn step(&mut self, pred: &mut Pred, ctx: &PredCtx<'_>) {
        self.select(pred, ctx);
    }

    fn select(&self, pred: &mut Pred, ctx: &PredCtx<'_>) {
        let flocks = ctx.flocks.flocks();
        let wh = ctx.world.wh;
        let pos = pred.body.pos;
        let chosen: Option<usize> = match self.selection {
            Selection::Nearest => (0..flocks.len()).min_by(|&a, &b| {
                torus::distance2(wh, flocks[a].gc, pos)
                    .total_cmp(&torus::distance2(wh, flocks[b].gc, pos))
            }),
            Selection::Biggest => (0..flocks.len()).max_by_key(|&i| flocks[i].size),
            Selection::Smallest => (0..flocks.len()).min_by_key(|&i| flocks[i].size),
            Selection::Random => {
                if flocks.is_empty() {
                    None
                } else {
                    Some(rand::rng().random_range(0..flocks.len()))
                }
            }
        };
        pred.target_f = chosen
            .and_then(|id| ctx.flocks.members(id as u32).first().copied())
            .map(|m| m as u32);
    }
}

/// Shadow the target flock from a station at `bearing`/`distance` relative to
/// the representative member, matching a multiple of its speed. With
/// `placement` set the predator teleports onto the station when the state is
/// entered.
pub struct Shadowing {
    bearing: f32,
    dist: f32,
    placement: bool,
    w: f32,
    prey_speed_scale: f32,
}

impl Shadowing {
    pub fn from_config(j: &Value) -> Result<Self> {
        let ctx = "action shadowing";
        Ok(Shadowing {
            bearing: config::num_f32(j, "bearing", ctx)?.to_radians(),
            dist: config::num_f32(j, "distance", ctx)?,
            placement: config::flag_field(j, "placement", ctx)?,
            w: config::num_f32(j, "w", ctx)?,
            prey_speed_scale: config::num_f32(j, "prey_speed_scale", ctx)?,
        })
    }

    fn station(&self, target_pos: Vec2, target_dir: Vec2, wh: f32) -> Vec2 {
        torus::wrap(wh, target_pos + target_dir.rotate(self.bearing) * self.dist)
    }

    pub fn on_entry(&mut self, pred: &mut Pred, ctx: &PredCtx<'_>) {
        if !self.placement {
            return;
        }
        let Some(t) = pred.target_f else {
            return;
        };
        let target = &ctx.prey[t as usize];
        pred.body.pos = self.station(target.pos, target.dir, ctx.world.wh);
        pred.body.dir = target.dir;
    }

    pub fn step(&self, pred: &mut Pred, ctx: &PredCtx<'_>) {
        let Some(t) = pred.target_f else {
            return;
        };
        let target = &ctx.prey[t as usize];
        let station = self.station(target.pos, target.dir, ctx.world.wh);
        let ofs = torus::ofs(ctx.world.wh, pred.body.pos, station);
        let fdir = ofs.safe_normalize(pred.body.dir);
        pred.body.steering += fdir * self.w;
        pred.body.speed = self.prey_speed_scale * target.speed;
    }
}

/// Steer toward a fixed point and request a state exit once inside the outer
/// tolerance radius and either inside the inner radius or sufficiently
/// misaligned with the approach direction.
pub struct Waypoint {
    pos: Vec2,
    w: f32,
    /// `[outer_dist², inner_dist², cos(angle)]`.
    tolerance: [f32; 3],
}

impl Waypoint {
    pub fn from_config(j: &Value, world: World) -> Result<Self> {
        let ctx = "action waypoint";
        let tol = j
            .get("tolerance")
            .and_then(|v| v.as_array())
            .filter(|a| a.len() == 3)
            .ok_or_else(|| {
                Error::Config(format!("{ctx}: `tolerance` must be [dist, dist, degrees]"))
            })?;
        let t: Vec<f32> = tol
            .iter()
            .map(|v| v.as_f64().map(|x| x as f32))
            .collect::<Option<_>>()
            .ok_or_else(|| Error::Config(format!("{ctx}: `tolerance` must hold numbers")))?;
        Ok(Waypoint {
            pos: torus::wrap(world.wh, config::vec2_field(j, "pos", ctx)?),
            w: config::num_f32(j, "w", ctx)?,
            tolerance: [t[0] * t[0], t[1] * t[1], t[2].to_radians().cos()],
        })
    }

    /// Returns `true` when the waypoint is considered reached.
    pub fn step(&self, body: &mut Body, ctx: &PredCtx<'_>) -> bool {
        let ofs = torus::ofs(ctx.world.wh, body.pos, self.pos);
        let fdir = ofs.safe_normalize(body.dir);
        body.steering += fdir * self.w;
        let dd = ofs.norm2();
        let b = body.dir.dot(&fdir).abs();
        dd < self.tolerance[0] && (dd < self.tolerance[1] || b < self.tolerance[2])
    }
}

/// Pin position, heading and speed to configured values.
pub struct Set {
    pos: Vec2,
    dir: Vec2,
    speed: f32,
}

impl Set {
    pub fn from_config(j: &Value, world: World) -> Result<Self> {
        let ctx = "action set";
        Ok(Set {
            pos: torus::wrap(world.wh, config::vec2_field(j, "pos", ctx)?),
            dir: config::vec2_field(j, "dir", ctx)?.safe_normalize(Vec2::x_hat()),
            speed: config::num_f32(j, "speed", ctx)?,
        })
    }

    pub fn step(&self, body: &mut Body) {
        body.pos = self.pos;
        body.dir = self.dir;
        body.speed = self.speed;
    }
}

/// Pin the predator to a station relative to its target flock, matching the
/// flock's heading.
pub struct SetFromFlock {
    bearing: f32,
    dist: f32,
    prey_speed_scale: f32,
}

impl SetFromFlock {
    pub fn from_config(j: &Value) -> Result<Self> {
        let ctx = "action set_from_flock";
        Ok(SetFromFlock {
            bearing: config::num_f32(j, "bearing", ctx)?.to_radians(),
            dist: config::num_f32(j, "distance", ctx)?,
            prey_speed_scale: config::num_f32(j, "prey_speed_scale", ctx)?,
        })
    }

    pub fn step(&self, pred: &mut Pred, ctx: &PredCtx<'_>) {
        let Some(t) = pred.target_f else {
            return;
        };
        let target = &ctx.prey[t as usize];
        pred.body.pos = torus::wrap(
            ctx.world.wh,
            target.pos + target.dir.rotate(self.bearing) * self.dist,
        );
        pred.body.dir = target.dir;
        pred.body.speed = self.prey_speed_scale * target.speed;
    }
}

/// Teleport `dist_away` meters backwards and leave at the given speed; the
/// 180° retreat after an attack.
pub struct SetRetreat {
    dist_away: f32,
    speed: f32,
}

impl SetRetreat {
    pub fn from_config(j: &Value) -> Result<Self> {
        let ctx = "action set_retreat";
        Ok(SetRetreat {
            dist_away: config::num_f32(j, "distAway", ctx)?,
            speed: config::num_f32(j, "speed", ctx)?,
        })
    }

    pub fn step(&self, body: &mut Body, ctx: &PredCtx<'_>) {
        let back = body.dir.rotate(std::f32::consts::PI);
        body.pos = torus::wrap(ctx.world.wh, body.pos + back * self.dist_away);
        body.dir = back;
        body.speed = self.speed;
    }
}

/// Circle a fixed point.
pub struct Hold {
    pos: Vec2,
    w: f32,
}

impl Hold {
    pub fn from_config(j: &Value) -> Result<Self> {
        let ctx = "action hold";
        Ok(Hold {
            pos: config::vec2_field(j, "pos", ctx)?,
            w: config::num_f32(j, "w", ctx)?,
        })
    }

    pub fn step(&self, body: &mut Body, ctx: &PredCtx<'_>) {
        let ofs = torus::ofs(ctx.world.wh, body.pos, torus::wrap(ctx.world.wh, self.pos));
        body.steering += ofs.safe_normalize(body.dir) * self.w;
    }
}

/// Circle the position held when the state was entered.
pub struct HoldCurrent {
    pos: Vec2,
    w: f32,
}

impl HoldCurrent {
    pub fn from_config(j: &Value) -> Result<Self> {
        Ok(HoldCurrent {
            pos: Vec2::zero(),
            w: config::num_f32(j, "w", "action hold_current")?,
        })
    }

    pub fn on_entry(&mut self, body: &Body) {
        self.pos = body.pos;
    }

    pub fn step(&self, body: &mut Body, ctx: &PredCtx<'_>) {
        let ofs = torus::ofs(ctx.world.wh, body.pos, torus::wrap(ctx.world.wh, self.pos));
        body.steering += ofs.safe_normalize(body.dir) * self.w;
    }
}
