//! Prey-prey separation.

use super::{in_fov, while_topo, PreyCtx};
use crate::agents::Prey;
use crate::config;
use crate::error::Result;
use crate::torus;
use crate::vector::{math, Vec2};
use serde_json::Value;

/// Steer away from the first `topo` in-view neighbors closer than `minsep`.
pub struct AvoidNPosition {
    topo: usize,
    cfov: f32,
    minsep2: f32,
    maxdist2: f32,
    w: f32,
}

impl AvoidNPosition {
    pub fn from_config(j: &Value) -> Result<Self> {
        let ctx = "action avoid_n_position";
        let minsep = config::num_f32(j, "minsep", ctx)?;
        let maxdist = config::num_f32(j, "maxdist", ctx)?;
        Ok(AvoidNPosition {
            topo: config::num_usize(j, "topo", ctx)?,
            cfov: math::cos_half_fov(config::num_f32(j, "fov", ctx)?),
            minsep2: minsep * minsep,
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
            if in_fov(wh, pos, dir, ni, other.pos, self.maxdist2, self.cfov)
                && ni.dist2 < self.minsep2
            {
                // offset neighbor -> self: push apart
                ofss += torus::ofs(wh, other.pos, pos);
                return true;
            }
            false
        });

        let fdir = ofss.safe_normalize(Vec2::zero()) * self.w;
        prey.f_sep_ang = math::rad_between(&dir, &fdir);
        prey.body.steering += fdir;
    }
}
