//! Derived per-agent measures exported by the observers.

use crate::simulation::SimView;
use crate::torus;
use crate::vector::{math, Vec2};

/// Signed deviation of an agent's heading from its flock's mean velocity
/// direction [rad].
pub fn head_dif(dir: Vec2, flock_vel: Vec2) -> f32 {
    math::rad_between(&dir, &flock_vel)
}

/// Directional conflict between escape and alignment: 1.0 when turning away
/// from the predator's heading and turning toward the flock's heading demand
/// opposite turn directions, else 0.0.
pub fn in_conflict_dir_ali(prey_dir: Vec2, pred_dir: Vec2, flock_vel: Vec2) -> f32 {
    let rad_away_pred = math::rad_between(&pred_dir, &prey_dir);
    let rad_to_flock = math::rad_between(&prey_dir, &flock_vel);
    if rad_away_pred * rad_to_flock < 0.0 { 1.0 } else { 0.0 }
}

/// Centrality of a prey within its flock: the length of the mean toroidal
/// offset to every other alive member. Near zero in the middle of the flock,
/// large at the edge; 0 for a singleton.
pub fn centrality(view: &SimView<'_>, idx: usize) -> f32 {
    let flock_id = view.flock_of(idx);
    let pos = view.prey()[idx].body.pos;
    let wh = view.world.wh;

    let mut adir = Vec2::zero();
    let mut n = 0.0f32;
    for (j, other) in view.prey().iter().enumerate() {
        if j != idx && view.is_prey_alive(j) && view.flock_of(j) == flock_id {
            adir += torus::ofs(wh, pos, other.body.pos);
            n += 1.0;
        }
    }
    if n > 0.0 { (adir / n).norm() } else { 0.0 }
}
