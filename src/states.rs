//! Hierarchical state machine.
//!
//! Each species runs a fixed, config-built sequence of states. A state owns a
//! tuple of steering actions plus the reaction time and flight target it
//! imposes while active. States come in two kinds:
//!
//! - *persistent*: active for a configured duration (which individual actions
//!   may shorten via [`Action::check_state_exit`]), then exited through the
//!   species transition matrix;
//! - *transient*: evaluated once and exited immediately.
//!
//! Exiting samples the next state from the transition row of the current
//! state with the mutable discrete distribution, so an all-zero row falls
//! back to a uniform choice. A species without a transition table (the prey's
//! single transient state) simply stays where it is.

use crate::agents::Agent;
use crate::config::{StateConfig, TransitionsConfig};
use crate::error::{Error, Result};
use crate::flight::StateAero;
use crate::random::MutableDiscrete;
use crate::world::{Tick, World};
use serde_json::Value;
use std::cell::RefCell;

/// A steering behavior: constructed from its config record, invoked on every
/// evaluation of its state, with optional entry and exit-shortening hooks.
///
/// `step` returns `true` to request an immediate state exit (used by the
/// waypoint action when the target is reached).
pub trait Action: Sized {
    type Agent: Agent;
    type Ctx<'a>;

    /// Builds the action from its config record; the record's `name` member
    /// has already selected the implementation.
    fn from_config(j: &Value, world: World) -> Result<Self>;

    fn on_entry(&mut self, _agent: &mut Self::Agent, _idx: usize, _t: Tick, _ctx: &Self::Ctx<'_>) {}

    fn step(&mut self, agent: &mut Self::Agent, idx: usize, t: Tick, ctx: &Self::Ctx<'_>) -> bool;

    /// Given the state's nominal duration, may pull the exit tick forward.
    fn check_state_exit(&self, _duration: Tick, _exit_tick: &mut Tick) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKind {
    Persistent { duration: Tick },
    Transient,
}

/// One state of a species package.
pub struct State<A> {
    pub name: String,
    pub kind: StateKind,
    /// Reaction time imposed on the agent while this state is active [ticks].
    pub tr: Tick,
    /// Flight target imposed on the agent while this state is active.
    pub aero: StateAero,
    pub actions: Vec<A>,
}

impl<A: Action> State<A> {
    pub fn from_config(cfg: &StateConfig, world: World) -> Result<Self> {
        let tr = (cfg.tr as f64 / world.dt as f64) as Tick;
        let tr = tr.max(1);
        let kind = match cfg.duration {
            Some(d) => StateKind::Persistent {
                duration: world.to_ticks(d as f64),
            },
            None => StateKind::Transient,
        };
        let actions = cfg
            .actions
            .iter()
            .map(|j| A::from_config(j, world))
            .collect::<Result<Vec<_>>>()?;
        Ok(State {
            name: cfg.name.clone(),
            kind,
            tr,
            aero: StateAero {
                cruise_speed: cfg.aero_state.cruise_speed,
                w: cfg.aero_state.w,
            },
            actions,
        })
    }
}

/// Piecewise-linear interpolation between transition matrices over one scalar
/// parameter. A single pivot makes the matrix constant, which is how the
/// model is normally configured.
#[derive(Debug, Clone)]
pub struct TransitionInterpolator {
    tms: Vec<Vec<Vec<f32>>>,
    edges: Vec<f32>,
}

impl TransitionInterpolator {
    pub fn from_config(cfg: &TransitionsConfig, n_states: usize) -> Result<Self> {
        if cfg.name != "piecewise_linear_interpolator" {
            return Err(Error::Config(format!(
                "unknown transition interpolator `{}`",
                cfg.name
            )));
        }
        if cfg.tm.is_empty() || cfg.tm.len() != cfg.edges.len() {
            return Err(Error::Config(
                "transitions: TM and edges must be non-empty and equally long".into(),
            ));
        }
        if !cfg.edges.is_sorted() {
            return Err(Error::Config("transitions: edges must be ascending".into()));
        }
        for tm in &cfg.tm {
            if tm.len() != n_states || tm.iter().any(|row| row.len() != n_states) {
                return Err(Error::Config(format!(
                    "transitions: matrix must be {n_states}x{n_states}"
                )));
            }
        }
        Ok(TransitionInterpolator {
            tms: cfg.tm.clone(),
            edges: cfg.edges.clone(),
        })
    }

    /// The transition row of `state` at parameter `x`.
    pub fn row(&self, x: f32, state: usize) -> Vec<f32> {
        let b = self.edges.partition_point(|&e| e < x);
        if b == 0 {
            return self.tms[0][state].clone();
        }
        if b >= self.tms.len() {
            return self.tms[self.tms.len() - 1][state].clone();
        }
        let a = b - 1;
        let mix = (x - self.edges[a]) / (self.edges[b] - self.edges[a]);
        self.tms[a][state]
            .iter()
            .zip(&self.tms[b][state])
            .map(|(&p, &q)| p + mix * (q - p))
            .collect()
    }
}

thread_local! {
    static TRANSITION_DIST: RefCell<MutableDiscrete> = RefCell::new(MutableDiscrete::new());
}

/// The per-agent state package: the states, the optional transition table and
/// the active state's bookkeeping.
pub struct StateMachine<A: Action> {
    states: Vec<State<A>>,
    transitions: Option<TransitionInterpolator>,
    current: usize,
    exit_tick: Tick,
}

impl<A: Action> StateMachine<A> {
    pub fn from_config(
        states: &[StateConfig],
        transitions: Option<&TransitionsConfig>,
        world: World,
    ) -> Result<Self> {
        if states.is_empty() {
            return Err(Error::Config("species needs at least one state".into()));
        }
        let built = states
            .iter()
            .map(|s| State::from_config(s, world))
            .collect::<Result<Vec<_>>>()?;
        let transitions = match transitions {
            Some(t) => Some(TransitionInterpolator::from_config(t, built.len())?),
            None if built.len() > 1 => {
                return Err(Error::Config(
                    "species with more than one state needs a transition table".into(),
                ));
            }
            None => None,
        };
        Ok(StateMachine {
            states: built,
            transitions,
            current: 0,
            exit_tick: 0,
        })
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn n_states(&self) -> usize {
        self.states.len()
    }

    pub fn state_name(&self, idx: usize) -> &str {
        &self.states[idx].name
    }

    /// Enters the current state: arm the exit tick, run the actions' entry
    /// hooks, then let each action shorten the exit.
    pub fn enter(&mut self, agent: &mut A::Agent, idx: usize, t: Tick, ctx: &A::Ctx<'_>) {
        let state = &mut self.states[self.current];
        if let StateKind::Persistent { duration } = state.kind {
            self.exit_tick = t + duration;
            for a in &mut state.actions {
                a.on_entry(agent, idx, t, ctx);
            }
            for a in &state.actions {
                a.check_state_exit(duration, &mut self.exit_tick);
            }
        } else {
            for a in &mut state.actions {
                a.on_entry(agent, idx, t, ctx);
            }
        }
    }

    /// One evaluation of the active state: imposes the state's reaction time
    /// and flight target, runs the action chain, then exits if the state is
    /// transient, timed out, or an action requested it.
    pub fn resume(&mut self, agent: &mut A::Agent, idx: usize, t: Tick, ctx: &A::Ctx<'_>) {
        let state = &mut self.states[self.current];
        {
            let body = agent.body_mut();
            body.reaction_time = state.tr;
            body.sa = state.aero;
            body.sa.cruise_speed += body.ai.cruise_speed_sd;
        }
        let mut exit_now = false;
        for a in &mut state.actions {
            exit_now |= a.step(agent, idx, t, ctx);
        }
        let done = match state.kind {
            StateKind::Transient => true,
            StateKind::Persistent { .. } => t >= self.exit_tick,
        };
        if exit_now || done {
            self.leave(agent, idx, t, ctx);
        }
    }

    /// State exit: notify the agent, sample the successor from the transition
    /// row (uniform on an all-zero row) and enter it. Without a transition
    /// table the machine stays in place.
    fn leave(&mut self, agent: &mut A::Agent, idx: usize, t: Tick, ctx: &A::Ctx<'_>) {
        agent.on_state_exit();
        let Some(transitions) = &self.transitions else {
            return;
        };
        let row = transitions.row(0.0, self.current);
        self.current = TRANSITION_DIST.with(|d| {
            let mut d = d.borrow_mut();
            d.mutate(&row);
            d.sample(&mut rand::rng())
        });
        self.enter(agent, idx, t, ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::Prey;
    use crate::flight::AeroInfo;

    /// A minimal action counting its invocations; exits early when told to.
    struct Probe {
        entries: usize,
        steps: usize,
        cut_exit_to: Option<Tick>,
    }

    impl Action for Probe {
        type Agent = Prey;
        type Ctx<'a> = ();

        fn from_config(j: &Value, _world: World) -> Result<Self> {
            Ok(Probe {
                entries: 0,
                steps: 0,
                cut_exit_to: j.get("cut").and_then(|v| v.as_u64()),
            })
        }

        fn on_entry(&mut self, _: &mut Prey, _: usize, _: Tick, _: &()) {
            self.entries += 1;
        }

        fn step(&mut self, _: &mut Prey, _: usize, _: Tick, _: &()) -> bool {
            self.steps += 1;
            false
        }

        fn check_state_exit(&self, duration: Tick, exit_tick: &mut Tick) {
            if let Some(cut) = self.cut_exit_to {
                if duration > cut {
                    *exit_tick -= duration - cut;
                }
            }
        }
    }

    fn world() -> World {
        World::new(1000.0, 0.1)
    }

    fn test_agent() -> Prey {
        Prey::new(AeroInfo {
            body_mass: 0.5,
            cruise_speed: 10.0,
            cruise_speed_sd: 0.5,
            min_speed: 5.0,
            max_speed: 20.0,
            wing_area: 0.06,
        })
    }

    fn state_cfg(name: &str, tr: f32, duration: Option<f32>, actions: Vec<Value>) -> StateConfig {
        serde_json::from_value(serde_json::json!({
            "name": name,
            "tr": tr,
            "duration": duration,
            "aeroState": { "cruiseSpeed": 15.0, "w": 1.0 },
            "actions": actions,
        }))
        .unwrap()
    }

    fn four_state_transitions(rows: [[f32; 4]; 4]) -> TransitionsConfig {
        serde_json::from_value(serde_json::json!({
            "name": "piecewise_linear_interpolator",
            "TM": [rows],
            "edges": [0.0],
        }))
        .unwrap()
    }

    #[test]
    fn resume_imposes_state_aero_and_reaction_time() {
        let cfg = [state_cfg("s", 0.3, None, vec![serde_json::json!({})])];
        let mut m: StateMachine<Probe> = StateMachine::from_config(&cfg, None, world()).unwrap();
        let mut agent = test_agent();
        m.enter(&mut agent, 0, 0, &());
        m.resume(&mut agent, 0, 0, &());
        assert_eq!(agent.body.reaction_time, 3);
        // state cruise target plus the per-agent deviation
        assert!((agent.body.sa.cruise_speed - 15.5).abs() < 1.0e-5);
        assert_eq!(agent.body.sa.w, 1.0);
    }

    #[test]
    fn reaction_time_is_at_least_one_tick() {
        let cfg = [state_cfg("s", 0.0, None, vec![serde_json::json!({})])];
        let mut m: StateMachine<Probe> = StateMachine::from_config(&cfg, None, world()).unwrap();
        let mut agent = test_agent();
        m.enter(&mut agent, 0, 0, &());
        m.resume(&mut agent, 0, 0, &());
        assert_eq!(agent.body.reaction_time, 1);
    }

    #[test]
    fn transient_state_without_transitions_stays_put() {
        let cfg = [state_cfg("s", 0.1, None, vec![serde_json::json!({})])];
        let mut m: StateMachine<Probe> = StateMachine::from_config(&cfg, None, world()).unwrap();
        let mut agent = test_agent();
        m.enter(&mut agent, 0, 0, &());
        for t in 0..5 {
            m.resume(&mut agent, 0, t, &());
        }
        assert_eq!(m.current(), 0);
        // a transient state exits every evaluation but is never re-entered
        assert_eq!(m.states[0].actions[0].entries, 1);
        assert_eq!(m.states[0].actions[0].steps, 5);
    }

    #[test]
    fn persistent_state_times_out_into_successor() {
        // state 0 lasts 0.5 s (5 ticks) then deterministically moves to 1
        let cfg = [
            state_cfg("a", 0.1, Some(0.5), vec![serde_json::json!({})]),
            state_cfg("b", 0.1, Some(0.5), vec![serde_json::json!({})]),
            state_cfg("c", 0.1, Some(0.5), vec![serde_json::json!({})]),
            state_cfg("d", 0.1, Some(0.5), vec![serde_json::json!({})]),
        ];
        let tm = four_state_transitions([
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
        ]);
        let mut m: StateMachine<Probe> =
            StateMachine::from_config(&cfg, Some(&tm), world()).unwrap();
        let mut agent = test_agent();
        m.enter(&mut agent, 0, 0, &());
        for t in 0..4 {
            m.resume(&mut agent, 0, t, &());
            assert_eq!(m.current(), 0, "still in state 0 at tick {t}");
        }
        m.resume(&mut agent, 0, 5, &());
        assert_eq!(m.current(), 1);
    }

    #[test]
    fn actions_can_shorten_a_persistent_state() {
        // nominal 10 s, the probe cuts the exit to 3 ticks
        let cfg = [state_cfg(
            "a",
            0.1,
            Some(10.0),
            vec![serde_json::json!({ "cut": 3 })],
        )];
        let tm: TransitionsConfig = serde_json::from_value(serde_json::json!({
            "name": "piecewise_linear_interpolator",
            "TM": [[[1.0]]],
            "edges": [0.0],
        }))
        .unwrap();
        let mut m: StateMachine<Probe> =
            StateMachine::from_config(&cfg, Some(&tm), world()).unwrap();
        let mut agent = test_agent();
        m.enter(&mut agent, 0, 0, &());
        assert_eq!(m.exit_tick, 3);
    }

    #[test]
    fn zero_weight_row_samples_uniformly() {
        let cfg = [
            state_cfg("a", 0.1, Some(0.0), vec![serde_json::json!({})]),
            state_cfg("b", 0.1, Some(1.0e6), vec![serde_json::json!({})]),
            state_cfg("c", 0.1, Some(1.0e6), vec![serde_json::json!({})]),
            state_cfg("d", 0.1, Some(1.0e6), vec![serde_json::json!({})]),
        ];
        let tm = four_state_transitions([
            [0.0, 0.0, 0.0, 0.0], // all-zero: uniform fallback
            [1.0, 0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0, 0.0],
        ]);
        let mut counts = [0usize; 4];
        let n = 10_000;
        for _ in 0..n {
            let mut m: StateMachine<Probe> =
                StateMachine::from_config(&cfg, Some(&tm), world()).unwrap();
            let mut agent = test_agent();
            m.enter(&mut agent, 0, 0, &());
            // duration 0: exits on the first resume
            m.resume(&mut agent, 0, 0, &());
            counts[m.current()] += 1;
        }
        let expect = n as f64 / 4.0;
        let sigma = (n as f64 * 0.25 * 0.75).sqrt();
        for (i, &c) in counts.iter().enumerate() {
            assert!(
                (c as f64 - expect).abs() < 3.0 * sigma,
                "state {i}: {c} exits, expected ~{expect}"
            );
        }
    }

    #[test]
    fn interpolator_blends_between_pivots() {
        let tm: TransitionsConfig = serde_json::from_value(serde_json::json!({
            "name": "piecewise_linear_interpolator",
            "TM": [
                [[1.0, 0.0], [1.0, 0.0]],
                [[0.0, 1.0], [0.0, 1.0]],
            ],
            "edges": [0.0, 1.0],
        }))
        .unwrap();
        let interp = TransitionInterpolator::from_config(&tm, 2).unwrap();
        assert_eq!(interp.row(-1.0, 0), vec![1.0, 0.0]);
        assert_eq!(interp.row(2.0, 0), vec![0.0, 1.0]);
        let mid = interp.row(0.5, 0);
        assert!((mid[0] - 0.5).abs() < 1.0e-6);
        assert!((mid[1] - 0.5).abs() < 1.0e-6);
    }

    #[test]
    fn transition_shape_errors_are_fatal() {
        let cfg = [
            state_cfg("a", 0.1, Some(1.0), vec![serde_json::json!({})]),
            state_cfg("b", 0.1, Some(1.0), vec![serde_json::json!({})]),
        ];
        // 1x1 matrix for a 2-state species
        let tm: TransitionsConfig = serde_json::from_value(serde_json::json!({
            "name": "piecewise_linear_interpolator",
            "TM": [[[1.0]]],
            "edges": [0.0],
        }))
        .unwrap();
        assert!(StateMachine::<Probe>::from_config(&cfg, Some(&tm), world()).is_err());
        // several states but no table at all
        assert!(StateMachine::<Probe>::from_config(&cfg, None, world()).is_err());
    }
}
