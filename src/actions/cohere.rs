//! Cohesion: turning toward neighbors, and speeding up after the ones ahead.

use super::{in_fov, while_topo, PreyCtx};
use crate::agents::Prey;
use crate::config;
use crate::error::Result;
use crate::torus;
use crate::vector::{math, Vec2};
use serde_json::Value;

/// Cohere by turning toward the summed offset of the first `topo` in-view
/// neighbors.
pub struct CohereTurnNAll {
    topo: usize,
    cfov: f32,
    maxdist2: f32,
    w: f32,
}

impl CohereTurnNAll {
    pub fn from_config(j: &Value) -> Result<Self> {
        let ctx = "action cohere_turn_n_all";
        let maxdist = config::num_f32(j, "maxdist", ctx)?;
        Ok(CohereTurnNAll {
            topo: config::num_usize(j, "topo", ctx)?,
            cfov: math::cos_half_fov(config::num_f32(j, "fov", ctx)?),
            maxdist2: maxdist * maxdist,
            w: config::num_f32(j, "w", ctx)?,
        })
    }

    pub fn step(&self, prey: &mut Prey, ctx: &PreyCtx<'_>) {
        let wh = ctx.world.wh;
        let pos = prey.body.pos;
        let dir = prey.body.dir;

        let mut ofss = Vec2::zero();
        while_topo(ctx.prey_nbrs, self.topo, |ni| {
            let other = &ctx.prey[ni.idx as usize];
            if in_fov(wh, pos, dir, ni, other.pos, self.maxdist2, self.cfov) {
                ofss += torus::ofs(wh, pos, other.pos);
                return true;
            }
            false
        });

        let fdir = ofss.safe_normalize(Vec2::zero()) * self.w;
        prey.f_coh_ang = math::rad_between(&dir, &fdir);
        prey.body.steering += fdir;
    }
}

/// Cohere by speed: accelerate toward neighbors ahead (inside the frontal
/// cone of `ffov` degrees), scaled by how far ahead they are; decelerate when
/// nobody is in front.
pub struct CohereAccelNFront {
    topo: usize,
    cfov: f32,
    ffov: f32,
    maxdist2: f32,
    /// Lower distance edge of the acceleration ramp [m].
    min_accel_dist: f32,
    /// Upper distance edge of the acceleration ramp [m].
    max_accel_dist: f32,
    w: f32,
    decel_w: f32,
}

impl CohereAccelNFront {
    pub fn from_config(j: &Value) -> Result<Self> {
        let ctx = "action cohere_accel_n_front";
        let maxdist = config::num_f32(j, "maxdist", ctx)?;
        Ok(CohereAccelNFront {
            topo: config::num_usize(j, "topo", ctx)?,
            cfov: math::cos_half_fov(config::num_f32(j, "fov", ctx)?),
            ffov: config::num_f32(j, "ffov", ctx)?,
            maxdist2: maxdist * maxdist,
            min_accel_dist: config::num_f32(j, "min_accel_dist", ctx)?,
            max_accel_dist: config::num_f32(j, "max_accel_dist", ctx)?,
            w: config::num_f32(j, "w", ctx)?,
            decel_w: config::num_f32(j, "decel_w", ctx)?,
        })
    }

    pub fn step(&self, prey: &mut Prey, ctx: &PreyCtx<'_>) {
        let wh = ctx.world.wh;
        let pos = prey.body.pos;
        let dir = prey.body.dir;

        let mut front_d2 = 0.0f32;
        let accepted = while_topo(ctx.prey_nbrs, self.topo, |ni| {
            let other = &ctx.prey[ni.idx as usize];
            if in_fov(wh, pos, dir, ni, other.pos, self.maxdist2, self.cfov)
                && !torus::is_atside(wh, pos, dir, other.pos, self.ffov)
            {
                front_d2 += ni.dist2;
                return true;
            }
            false
        });

        let w = if accepted > 0 {
            math::smootherstep(
                front_d2.sqrt() / accepted as f32,
                self.min_accel_dist,
                self.max_accel_dist,
            )
        } else {
            -self.decel_w
        };
        prey.body.steering += dir * (self.w * w);
    }
}
