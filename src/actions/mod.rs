//! # Action Library
//!
//! Steering behaviors composed into states. Every action reads the world
//! through a per-update context (the population frames, the focal agent's
//! sorted neighbor views and the flock tracker) and writes a force into its
//! agent's steering accumulator; a few predator actions set position, heading
//! or speed directly.
//!
//! Both species dispatch through a closed enum ([`PreyAction`],
//! [`PredAction`]): the config `name` member selects the variant at
//! construction time and the hot path is an exhaustive match, never a lookup.
//!
//! ## Submodules
//!
//! - [`align`]: heading alignment with topological neighbors
//! - [`cohere`]: turning and speed-based cohesion
//! - [`avoid`]: prey-prey separation
//! - [`escape`]: predator avoidance and evasive turns
//! - [`hunt`]: predator pursuit of individual prey
//! - [`station`]: predator flock selection, shadowing, waypoints, teleports
//! - [`solo`]: behaviors without any interaction (wiggle, fixed turns)

pub mod align;
pub mod avoid;
pub mod cohere;
pub mod escape;
pub mod hunt;
pub mod solo;
pub mod station;

use crate::agents::{Pred, PredView, Prey, PreyView};
use crate::config;
use crate::error::{Error, Result};
use crate::flock::FlockTracker;
use crate::neighbors::NeighborInfo;
use crate::states::Action;
use crate::torus;
use crate::vector::Vec2;
use crate::world::{Tick, World};
use serde_json::Value;

use align::AlignN;
use avoid::AvoidNPosition;
use cohere::{CohereAccelNFront, CohereTurnNAll};
use escape::{
    AvoidPDirection, AvoidPPosition, RandomTTurnGammaPred, RandomTTurnPred, TTurnPred, ZigZag,
};
use hunt::{AvoidClosestPrey, ChaseClosestPrey, LockOnClosestPrey};
use solo::{RTurn, TTurn, Wiggle};
use station::{Hold, HoldCurrent, SelectFlock, Set, SetFromFlock, SetRetreat, Shadowing, Waypoint};

/// Everything a prey action may read during one update.
pub struct PreyCtx<'a> {
    pub world: World,
    /// Frame of the whole prey population, indexable by neighbor index.
    pub prey: &'a [PreyView],
    /// Frame of the predator population.
    pub preds: &'a [PredView],
    /// Sorted alive prey neighbors of the focal agent (self excluded).
    pub prey_nbrs: &'a [NeighborInfo],
    /// Sorted alive predators, nearest first.
    pub pred_nbrs: &'a [NeighborInfo],
}

/// Everything a predator action may read during one update.
pub struct PredCtx<'a> {
    pub world: World,
    /// Frame of the whole prey population.
    pub prey: &'a [PreyView],
    /// Sorted alive prey, nearest first.
    pub prey_nbrs: &'a [NeighborInfo],
    /// The prey flock partition of the last clustering pass.
    pub flocks: &'a FlockTracker,
}

/// Runs `fun` over the view until `topo` neighbors have been accepted (or the
/// view is exhausted); returns how many were accepted.
pub fn while_topo(
    view: &[NeighborInfo],
    topo: usize,
    mut fun: impl FnMut(&NeighborInfo) -> bool,
) -> usize {
    let mut left = topo;
    for ni in view {
        if left == 0 {
            break;
        }
        if fun(ni) {
            left -= 1;
        }
    }
    topo - left
}

/// Field-of-view test against a sorted-view record: within `maxdist`, not at
/// zero distance, and inside the cone given by the cosine threshold `cfov`.
pub fn in_fov(
    wh: f32,
    pos: Vec2,
    dir: Vec2,
    ni: &NeighborInfo,
    other_pos: Vec2,
    maxdist2: f32,
    cfov: f32,
) -> bool {
    if ni.dist2 != 0.0 && ni.dist2 < maxdist2 {
        let offs = torus::ofs(wh, pos, other_pos);
        return dir.dot(&offs) > ni.dist2.sqrt() * cfov;
    }
    false
}

/// The nearest alive predator of a prey's view, with its record.
pub(crate) fn nearest_pred<'a>(ctx: &'a PreyCtx) -> Option<(&'a NeighborInfo, &'a PredView)> {
    ctx.pred_nbrs
        .first()
        .map(|ni| (ni, &ctx.preds[ni.idx as usize]))
}

/// The prey-side action set.
pub enum PreyAction {
    AlignN(AlignN),
    CohereTurnNAll(CohereTurnNAll),
    CohereAccelNFront(CohereAccelNFront),
    AvoidNPosition(AvoidNPosition),
    AvoidPPosition(AvoidPPosition),
    AvoidPDirection(AvoidPDirection),
    TTurnPred(TTurnPred),
    RandomTTurnPred(RandomTTurnPred),
    RandomTTurnGammaPred(RandomTTurnGammaPred),
    ZigZag(ZigZag),
    Wiggle(Wiggle),
    RTurn(RTurn),
    TTurn(TTurn),
}

impl Action for PreyAction {
    type Agent = Prey;
    type Ctx<'a> = PreyCtx<'a>;

    fn from_config(j: &Value, world: World) -> Result<Self> {
        let name = config::str_field(j, "name", "action")?;
        match name {
            "align_n" => AlignN::from_config(j).map(Self::AlignN),
            "cohere_turn_n_all" => CohereTurnNAll::from_config(j).map(Self::CohereTurnNAll),
            "cohere_accel_n_front" => {
                CohereAccelNFront::from_config(j).map(Self::CohereAccelNFront)
            }
            "avoid_n_position" => AvoidNPosition::from_config(j).map(Self::AvoidNPosition),
            "avoid_p_position" => AvoidPPosition::from_config(j).map(Self::AvoidPPosition),
            "avoid_p_direction" => AvoidPDirection::from_config(j).map(Self::AvoidPDirection),
            "t_turn_pred" => TTurnPred::from_config(j).map(Self::TTurnPred),
            "random_t_turn_pred" => {
                RandomTTurnPred::from_config(j, world).map(Self::RandomTTurnPred)
            }
            "random_t_turn_gamma_pred" => {
                RandomTTurnGammaPred::from_config(j, world).map(Self::RandomTTurnGammaPred)
            }
            "zig_zag" => ZigZag::from_config(j, world).map(Self::ZigZag),
            "wiggle" => Wiggle::from_config(j).map(Self::Wiggle),
            "r_turn" => RTurn::from_config(j).map(Self::RTurn),
            "t_turn" => TTurn::from_config(j).map(Self::TTurn),
            other => Err(Error::UnknownAction(other.to_string())),
        }
    }

    fn on_entry(&mut self, agent: &mut Prey, idx: usize, t: Tick, ctx: &PreyCtx<'_>) {
        match self {
            Self::TTurnPred(a) => a.on_entry(agent, idx, ctx),
            Self::RandomTTurnPred(a) => a.on_entry(agent, ctx),
            Self::RandomTTurnGammaPred(a) => a.on_entry(agent, ctx),
            Self::ZigZag(a) => a.on_entry(agent, idx, t, ctx),
            Self::TTurn(a) => a.on_entry(&mut agent.body),
            _ => {}
        }
    }

    fn step(&mut self, agent: &mut Prey, idx: usize, t: Tick, ctx: &PreyCtx<'_>) -> bool {
        match self {
            Self::AlignN(a) => a.step(agent, ctx),
            Self::CohereTurnNAll(a) => a.step(agent, ctx),
            Self::CohereAccelNFront(a) => a.step(agent, ctx),
            Self::AvoidNPosition(a) => a.step(agent, ctx),
            Self::AvoidPPosition(a) => a.step(agent, idx, ctx),
            Self::AvoidPDirection(a) => a.step(agent, idx, ctx),
            Self::TTurnPred(a) => a.step(&mut agent.body),
            Self::RandomTTurnPred(a) => a.step(&mut agent.body),
            Self::RandomTTurnGammaPred(a) => a.step(&mut agent.body),
            Self::ZigZag(a) => a.step(&mut agent.body, t),
            Self::Wiggle(a) => a.step(&mut agent.body),
            Self::RTurn(a) => a.step(&mut agent.body),
            Self::TTurn(a) => a.step(&mut agent.body),
        }
        false
    }

    fn check_state_exit(&self, duration: Tick, exit_tick: &mut Tick) {
        match self {
            Self::RandomTTurnPred(a) => a.check_state_exit(duration, exit_tick),
            Self::RandomTTurnGammaPred(a) => a.check_state_exit(duration, exit_tick),
            _ => {}
        }
    }
}

/// The predator-side action set.
pub enum PredAction {
    Wiggle(Wiggle),
    RTurn(RTurn),
    TTurn(TTurn),
    ChaseClosestPrey(ChaseClosestPrey),
    LockOnClosestPrey(LockOnClosestPrey),
    AvoidClosestPrey(AvoidClosestPrey),
    SelectFlock(SelectFlock),
    Shadowing(Shadowing),
    Waypoint(Waypoint),
    Set(Set),
    SetFromFlock(SetFromFlock),
    SetRetreat(SetRetreat),
    Hold(Hold),
    HoldCurrent(HoldCurrent),
}

impl Action for PredAction {
    type Agent = Pred;
    type Ctx<'a> = PredCtx<'a>;

    fn from_config(j: &Value, world: World) -> Result<Self> {
        let name = config::str_field(j, "name", "action")?;
        match name {
            "wiggle" => Wiggle::from_config(j).map(Self::Wiggle),
            "r_turn" => RTurn::from_config(j).map(Self::RTurn),
            "t_turn" => TTurn::from_config(j).map(Self::TTurn),
            "chase_closest_prey" => ChaseClosestPrey::from_config(j).map(Self::ChaseClosestPrey),
            "lock_on_closest_prey" => {
                LockOnClosestPrey::from_config(j).map(Self::LockOnClosestPrey)
            }
            "avoid_closest_prey" => AvoidClosestPrey::from_config(j).map(Self::AvoidClosestPrey),
            "select_flock" => SelectFlock::from_config(j).map(Self::SelectFlock),
            "shadowing" => Shadowing::from_config(j).map(Self::Shadowing),
            "waypoint" => Waypoint::from_config(j, world).map(Self::Waypoint),
            "set" => Set::from_config(j, world).map(Self::Set),
            "set_from_flock" => SetFromFlock::from_config(j).map(Self::SetFromFlock),
            "set_retreat" => SetRetreat::from_config(j).map(Self::SetRetreat),
            "hold" => Hold::from_config(j).map(Self::Hold),
            "hold_current" => HoldCurrent::from_config(j).map(Self::HoldCurrent),
            other => Err(Error::UnknownAction(other.to_string())),
        }
    }

    fn on_entry(&mut self, agent: &mut Pred, _idx: usize, _t: Tick, ctx: &PredCtx<'_>) {
        match self {
            Self::TTurn(a) => a.on_entry(&mut agent.body),
            Self::LockOnClosestPrey(a) => a.on_entry(agent, ctx),
            Self::SelectFlock(a) => a.on_entry(agent, ctx),
            Self::Shadowing(a) => a.on_entry(agent, ctx),
            Self::HoldCurrent(a) => a.on_entry(&agent.body),
            _ => {}
        }
    }

    fn step(&mut self, agent: &mut Pred, _idx: usize, _t: Tick, ctx: &PredCtx<'_>) -> bool {
        match self {
            Self::Wiggle(a) => a.step(&mut agent.body),
            Self::RTurn(a) => a.step(&mut agent.body),
            Self::TTurn(a) => a.step(&mut agent.body),
            Self::ChaseClosestPrey(a) => a.step(agent, ctx),
            Self::LockOnClosestPrey(a) => a.step(agent, ctx),
            Self::AvoidClosestPrey(a) => a.step(agent, ctx),
            Self::SelectFlock(a) => a.step(agent, ctx),
            Self::Shadowing(a) => a.step(agent, ctx),
            Self::Waypoint(a) => return a.step(&mut agent.body, ctx),
            Self::Set(a) => a.step(&mut agent.body),
            Self::SetFromFlock(a) => a.step(agent, ctx),
            Self::SetRetreat(a) => a.step(&mut agent.body, ctx),
            Self::Hold(a) => a.step(&mut agent.body, ctx),
            Self::HoldCurrent(a) => a.step(&mut agent.body, ctx),
        }
        false
    }
}
