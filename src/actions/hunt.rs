//! Predator pursuit of individual prey.
//!
//! The hunting actions pick their victim from the predator's sorted prey
//! view and match the predator's speed to a multiple of the victim's, so the
//! attack outcome is governed by the speed scale rather than raw top speed.

use super::PredCtx;
use crate::agents::Pred;
use crate::config;
use crate::error::Result;
use crate::torus;
use crate::vector::Vec2;
use serde_json::Value;

/// Chase whichever prey is nearest right now, re-targeting every evaluation.
pub struct ChaseClosestPrey {
    w: f32,
    prey_speed_scale: f32,
}

impl ChaseClosestPrey {
    pub fn from_config(j: &Value) -> Result<Self> {
        let ctx = "action chase_closest_prey";
        Ok(ChaseClosestPrey {
            w: config::num_f32(j, "w", ctx)?,
            prey_speed_scale: config::num_f32(j, "prey_speed_scale", ctx)?,
        })
    }

    pub fn step(&self, pred: &mut Pred, ctx: &PredCtx<'_>) {
        let Some(ni) = ctx.prey_nbrs.first() else {
            return;
        };
        let target = &ctx.prey[ni.idx as usize];
        let ofss = torus::ofs(ctx.world.wh, pred.body.pos, target.pos);
        pred.body.steering += ofss.safe_normalize(Vec2::zero()) * self.w;
        pred.body.speed = self.prey_speed_scale * target.speed;
        pred.target_i = Some(ni.idx);
    }
}

/// Lock on the nearest prey at state entry and chase that individual for the
/// rest of the state, even if another one drifts closer.
pub struct LockOnClosestPrey {
    w: f32,
    prey_speed_scale: f32,
    target: Option<u32>,
}

impl LockOnClosestPrey {
    pub fn from_config(j: &Value) -> Result<Self> {
        let ctx = "action lock_on_closest_prey";
        Ok(LockOnClosestPrey {
            w: config::num_f32(j, "w", ctx)?,
            prey_speed_scale: config::num_f32(j, "prey_speed_scale", ctx)?,
            target: None,
        })
    }

    pub fn on_entry(&mut self, pred: &mut Pred, ctx: &PredCtx<'_>) {
        self.target = ctx.prey_nbrs.first().map(|ni| ni.idx);
        if self.target.is_some() {
            pred.target_i = self.target;
        }
    }

    pub fn step(&self, pred: &mut Pred, ctx: &PredCtx<'_>) {
        let Some(t) = self.target else {
            return;
        };
        let target = &ctx.prey[t as usize];
        let ofss = torus::ofs(ctx.world.wh, pred.body.pos, target.pos);
        pred.body.steering += ofss.safe_normalize(Vec2::zero()) * self.w;
        pred.body.speed = self.prey_speed_scale * target.speed;
    }
}

/// Keep clear of the nearest prey; used while the predator loiters between
/// attacks.
pub struct AvoidClosestPrey {
    w: f32,
}

impl AvoidClosestPrey {
    pub fn from_config(j: &Value) -> Result<Self> {
        Ok(AvoidClosestPrey {
            w: config::num_f32(j, "w", "action avoid_closest_prey")?,
        })
    }

    pub fn step(&self, pred: &mut Pred, ctx: &PredCtx<'_>) {
        let Some(ni) = ctx.prey_nbrs.first() else {
            return;
        };
        let nearest = &ctx.prey[ni.idx as usize];
        let ofss = torus::ofs(ctx.world.wh, nearest.pos, pred.body.pos);
        pred.body.steering += ofss.safe_normalize(Vec2::zero()) * self.w;
    }
}
