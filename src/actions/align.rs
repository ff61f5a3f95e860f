//! Heading alignment.

use super::{in_fov, while_topo, PreyCtx};
use crate::agents::Prey;
use crate::config;
use crate::error::Result;
use crate::vector::{math, Vec2};
use serde_json::Value;

/// Align by turning toward the mean heading of the first `topo` neighbors in
/// the field of view and within `maxdist`.
pub struct AlignN {
    topo: usize,
    cfov: f32,
    maxdist2: f32,
    w: f32,
}

impl AlignN {
    pub fn from_config(j: &Value) -> Result<Self> {
        let ctx = "action align_n";
        let maxdist = config::num_f32(j, "maxdist", ctx)?;
        Ok(AlignN {
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

        let mut adir = Vec2::zero();
        while_topo(ctx.prey_nbrs, self.topo, |ni| {
            let other = &ctx.prey[ni.idx as usize];
            if in_fov(wh, pos, dir, ni, other.pos, self.maxdist2, self.cfov) {
                adir += other.dir;
                return true;
            }
            false
        });

        let fdir = adir.safe_normalize(Vec2::zero()) * self.w;
        prey.f_ali_ang = math::rad_between(&dir, &fdir);
        prey.body.steering += fdir;
    }
}
