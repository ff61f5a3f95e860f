//! # Simulation Kernel
//!
//! The kernel owns the two populations, their state machines, the per-agent
//! update schedule, the neighbor matrices and the prey flock tracker, and
//! advances everything one tick at a time.
//!
//! ## Tick anatomy
//!
//! 1. Publish a read-only *frame* of both populations (position, heading,
//!    speed, aliveness, predator locks).
//! 2. *Update phase*, species by species, data-parallel over agents: every
//!    agent whose `next_update` has arrived refills its sorted neighbor rows
//!    from the frame and runs one state-machine evaluation, which accumulates
//!    steering and schedules the next update `reaction_time` ticks ahead.
//! 3. *Integrate phase*, data-parallel: every alive agent runs the flight
//!    integrator.
//! 4. Flock pass: recluster the prey every `flockDetection.interval`, advance
//!    the tracked centroids otherwise.
//!
//! All updates of all species complete before any integration; the frame
//! makes that barrier airtight, since actions only ever read start-of-tick
//! state while mutating their own agent.
//!
//! ## Cross-thread gates
//!
//! A viewer or observer thread reads and writes the kernel only through the
//! scoped [`Simulation::with_view`] lock (and the aliveness/snapshot
//! methods built on it). The tick loop takes the same lock once per tick and
//! notifies the observer chain *after* releasing it, so observer callbacks
//! are free to re-enter the gates.

pub mod tests;

use crate::actions::{PredAction, PredCtx, PreyAction, PreyCtx};
use crate::agents::init::{self, InitCondit};
use crate::agents::{Pred, PredView, Prey, PreyView, SpeciesSnapshots};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::flight::{self, AeroInfo};
use crate::flock::{FlockDescr, FlockTracker, NO_FLOCK};
use crate::neighbors::{self, NeighborInfo};
use crate::observers::{Msg, ObserverChain};
use crate::states::StateMachine;
use crate::world::{Tick, World, DEAD};
use rand::Rng;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Per-species kernel state: the population, its behavior machines, the
/// update schedule and the neighbor rows toward each target species.
struct SpeciesState<Ag, Act: crate::states::Action> {
    agents: Vec<Ag>,
    machines: Vec<StateMachine<Act>>,
    /// Next scheduled behavioral update per agent; [`DEAD`] for dead agents.
    update_times: Vec<Tick>,
    alive: usize,
    /// One sorted row per agent toward the prey population.
    rows_prey: Vec<Vec<NeighborInfo>>,
    /// One sorted row per agent toward the predator population.
    rows_pred: Vec<Vec<NeighborInfo>>,
    flock_tracker: FlockTracker,
}

impl<Ag, Act: crate::states::Action> SpeciesState<Ag, Act> {
    fn new(
        agents: Vec<Ag>,
        machines: Vec<StateMachine<Act>>,
        update_times: Vec<Tick>,
        n_prey: usize,
        n_pred: usize,
    ) -> Self {
        let n = agents.len();
        let alive = update_times.iter().filter(|&&ut| ut != DEAD).count();
        SpeciesState {
            agents,
            machines,
            update_times,
            alive,
            rows_prey: vec![vec![NeighborInfo::default(); n_prey]; n],
            rows_pred: vec![vec![NeighborInfo::default(); n_pred]; n],
            flock_tracker: FlockTracker::new(),
        }
    }
}

struct Inner {
    tick: Tick,
    flock_update: Tick,
    flock_interval: Tick,
    /// Squared clustering threshold [m²].
    flock_dd: f32,
    prey: SpeciesState<Prey, PreyAction>,
    preds: SpeciesState<Pred, PredAction>,
}

/// The simulation. Construct it from a [`Config`], then drive it with
/// [`update`](Simulation::update) until [`terminate`](Simulation::terminate)
/// or the configured run length.
pub struct Simulation {
    world: World,
    inner: Mutex<Inner>,
    terminate: AtomicBool,
}

fn stagger<R: Rng>(rng: &mut R, now: Tick, world: World) -> Tick {
    now + rng.random_range(0..=world.ticks_per_second())
}

impl Simulation {
    pub fn new(cfg: &Config) -> Result<Self> {
        let world = cfg.world();
        let mut rng = rand::rng();

        let n_prey = cfg.prey.n;
        let n_pred = cfg.pred.n;

        let prey_agents: Vec<Prey> = (0..n_prey)
            .map(|_| Prey::new(AeroInfo::sample(&cfg.prey.aero, &mut rng)))
            .collect();
        let prey_machines = (0..n_prey)
            .map(|_| {
                StateMachine::from_config(&cfg.prey.states, cfg.prey.transitions.as_ref(), world)
            })
            .collect::<Result<Vec<_>>>()?;
        let prey_times: Vec<Tick> = (0..n_prey).map(|_| stagger(&mut rng, 0, world)).collect();

        let pred_agents: Vec<Pred> = (0..n_pred)
            .map(|_| Pred::new(AeroInfo::sample(&cfg.pred.aero, &mut rng)))
            .collect();
        let pred_machines = (0..n_pred)
            .map(|_| {
                StateMachine::from_config(&cfg.pred.states, cfg.pred.transitions.as_ref(), world)
            })
            .collect::<Result<Vec<_>>>()?;
        let pred_times: Vec<Tick> = (0..n_pred).map(|_| stagger(&mut rng, 0, world)).collect();

        let mut inner = Inner {
            tick: 0,
            flock_update: 0,
            flock_interval: world
                .to_ticks(cfg.simulation.flock_detection.interval as f64)
                .max(1),
            flock_dd: cfg.simulation.flock_detection.threshold
                * cfg.simulation.flock_detection.threshold,
            prey: SpeciesState::new(prey_agents, prey_machines, prey_times, n_prey, n_pred),
            preds: SpeciesState::new(pred_agents, pred_machines, pred_times, n_prey, n_pred),
        };

        inner.enter_initial_states(world);

        // initial conditions from config
        let prey_ic = InitCondit::from_config(&cfg.prey.init, "Prey.InitCondit")?;
        let pred_ic = InitCondit::from_config(&cfg.pred.init, "Pred.InitCondit")?;
        let ss = SpeciesSnapshots {
            prey: init::prey_init(&prey_ic, n_prey, world)?.unwrap_or_default(),
            preds: init::pred_init(&pred_ic, n_pred, world)?.unwrap_or_default(),
        };
        inner.install_snapshots(&ss, world)?;

        Ok(Simulation {
            world,
            inner: Mutex::new(inner),
            terminate: AtomicBool::new(false),
        })
    }

    pub fn world(&self) -> World {
        self.world
    }

    pub fn tick(&self) -> Tick {
        self.inner.lock().unwrap().tick
    }

    /// Simulated time [s].
    pub fn time(&self) -> f64 {
        self.world.to_seconds(self.tick())
    }

    /// Installs an external snapshot (if any) and announces the simulation to
    /// the observer chain.
    pub fn initialize(&self, observers: &mut ObserverChain, ss: &SpeciesSnapshots) -> Result<()> {
        self.set_snapshots(ss)?;
        observers.notify(Msg::Initialized, self);
        Ok(())
    }

    /// Advances the simulation by one tick and notifies the observer chain.
    /// The kernel lock is held for the tick itself and released before the
    /// notification.
    pub fn update(&self, observers: &mut ObserverChain) {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.step(self.world);
        }
        observers.notify(Msg::Tick, self);
    }

    /// Requests cooperative termination; polled by the driver between ticks.
    /// Idempotent.
    pub fn terminate(&self) {
        self.terminate.store(true, Ordering::Release);
    }

    pub fn terminated(&self) -> bool {
        self.terminate.load(Ordering::Acquire)
    }

    /// Runs `f` with a consistent end-of-tick view of the whole simulation
    /// under the kernel lock. Everything an observer or viewer reads goes
    /// through here.
    pub fn with_view<R>(&self, f: impl FnOnce(&SimView<'_>) -> R) -> R {
        let inner = self.inner.lock().unwrap();
        let view = SimView {
            world: self.world,
            inner: &inner,
        };
        f(&view)
    }

    /// Calls `fun(agent, index, alive)` for every prey.
    pub fn visit_all_prey(&self, mut fun: impl FnMut(&Prey, usize, bool)) {
        self.with_view(|v| {
            for i in 0..v.prey().len() {
                fun(&v.prey()[i], i, v.is_prey_alive(i));
            }
        });
    }

    /// Calls `fun(agent, index, alive)` for every predator.
    pub fn visit_all_preds(&self, mut fun: impl FnMut(&Pred, usize, bool)) {
        self.with_view(|v| {
            for i in 0..v.preds().len() {
                fun(&v.preds()[i], i, v.is_pred_alive(i));
            }
        });
    }

    pub fn is_prey_alive(&self, idx: usize) -> bool {
        self.with_view(|v| v.is_prey_alive(idx))
    }

    pub fn is_pred_alive(&self, idx: usize) -> bool {
        self.with_view(|v| v.is_pred_alive(idx))
    }

    /// Sets one prey's aliveness. Reviving restaggers its next update across
    /// one second; setting the current value is a no-op.
    pub fn set_prey_alive(&self, idx: usize, alive: bool) {
        let mut inner = self.inner.lock().unwrap();
        inner.set_alive(SpeciesTag::Prey, idx, alive, self.world);
    }

    pub fn set_pred_alive(&self, idx: usize, alive: bool) {
        let mut inner = self.inner.lock().unwrap();
        inner.set_alive(SpeciesTag::Pred, idx, alive, self.world);
    }

    pub fn set_all_prey_alive(&self, alive: bool) {
        let mut inner = self.inner.lock().unwrap();
        for i in 0..inner.prey.agents.len() {
            inner.set_alive(SpeciesTag::Prey, i, alive, self.world);
        }
    }

    pub fn set_all_preds_alive(&self, alive: bool) {
        let mut inner = self.inner.lock().unwrap();
        for i in 0..inner.preds.agents.len() {
            inner.set_alive(SpeciesTag::Pred, i, alive, self.world);
        }
    }

    /// Copies the end-of-tick state of both populations.
    pub fn get_snapshots(&self) -> SpeciesSnapshots {
        let inner = self.inner.lock().unwrap();
        SpeciesSnapshots {
            prey: inner.prey.agents.iter().map(Prey::snapshot).collect(),
            preds: inner
                .preds
                .agents
                .iter()
                .enumerate()
                .map(|(i, a)| a.snapshot(inner.preds.update_times[i] != DEAD))
                .collect(),
        }
    }

    /// Installs a snapshot. An empty per-species vector leaves that species
    /// untouched; a non-empty one must match the population size.
    pub fn set_snapshots(&self, ss: &SpeciesSnapshots) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.install_snapshots(ss, self.world)
    }
}

#[derive(Clone, Copy)]
enum SpeciesTag {
    Prey,
    Pred,
}

impl Inner {
    /// Enters state 0 of every agent, with empty neighbor views (no row has
    /// been computed yet).
    fn enter_initial_states(&mut self, world: World) {
        let prey_frame = prey_frame(&self.prey);
        let pred_frame = pred_frame(&self.preds);

        for (i, (agent, machine)) in self
            .prey
            .agents
            .iter_mut()
            .zip(self.prey.machines.iter_mut())
            .enumerate()
        {
            let ctx = PreyCtx {
                world,
                prey: &prey_frame,
                preds: &pred_frame,
                prey_nbrs: &[],
                pred_nbrs: &[],
            };
            machine.enter(agent, i, 0, &ctx);
        }
        for (i, (agent, machine)) in self
            .preds
            .agents
            .iter_mut()
            .zip(self.preds.machines.iter_mut())
            .enumerate()
        {
            let ctx = PredCtx {
                world,
                prey: &prey_frame,
                prey_nbrs: &[],
                flocks: &self.prey.flock_tracker,
            };
            machine.enter(agent, i, 0, &ctx);
        }
    }

    fn set_alive(&mut self, tag: SpeciesTag, idx: usize, alive: bool, world: World) {
        let tick = self.tick;
        let (times, count) = match tag {
            SpeciesTag::Prey => (&mut self.prey.update_times, &mut self.prey.alive),
            SpeciesTag::Pred => (&mut self.preds.update_times, &mut self.preds.alive),
        };
        let currently = times[idx] != DEAD;
        if alive == currently {
            return;
        }
        if alive {
            times[idx] = stagger(&mut rand::rng(), tick, world);
            *count += 1;
        } else {
            times[idx] = DEAD;
            *count -= 1;
        }
    }

    fn install_snapshots(&mut self, ss: &SpeciesSnapshots, world: World) -> Result<()> {
        if !ss.prey.is_empty() {
            if ss.prey.len() != self.prey.agents.len() {
                return Err(Error::SnapshotMismatch {
                    expected: self.prey.agents.len(),
                    got: ss.prey.len(),
                });
            }
            for (agent, se) in self.prey.agents.iter_mut().zip(&ss.prey) {
                agent.apply_snapshot(se);
            }
        }
        if !ss.preds.is_empty() {
            if ss.preds.len() != self.preds.agents.len() {
                return Err(Error::SnapshotMismatch {
                    expected: self.preds.agents.len(),
                    got: ss.preds.len(),
                });
            }
            for (agent, se) in self.preds.agents.iter_mut().zip(&ss.preds) {
                agent.apply_snapshot(se);
            }
            for (i, se) in ss.preds.iter().enumerate() {
                self.set_alive(SpeciesTag::Pred, i, se.alive, world);
            }
        }
        Ok(())
    }

    fn step(&mut self, world: World) {
        let tick = self.tick;
        let prey_frame = prey_frame(&self.prey);
        let pred_frame = pred_frame(&self.preds);
        let prey_alive = self.prey.alive;
        let pred_alive = self.preds.alive;

        let Inner { prey, preds, .. } = self;

        // update phase: prey first, predators second; all behavioral updates
        // happen before any integration
        prey.agents
            .par_iter_mut()
            .zip(prey.machines.par_iter_mut())
            .zip(prey.update_times.par_iter_mut())
            .zip(prey.rows_prey.par_iter_mut())
            .zip(prey.rows_pred.par_iter_mut())
            .enumerate()
            .for_each(|(i, ((((agent, machine), ut), row_prey), row_pred))| {
                if *ut > tick {
                    return;
                }
                neighbors::fill_row(
                    world.wh,
                    row_prey,
                    agent.body.pos,
                    agent.body.dir,
                    Some(i),
                    |j| (prey_frame[j].pos, prey_frame[j].alive),
                );
                neighbors::fill_row(
                    world.wh,
                    row_pred,
                    agent.body.pos,
                    agent.body.dir,
                    None,
                    |j| (pred_frame[j].pos, pred_frame[j].alive),
                );
                let ctx = PreyCtx {
                    world,
                    prey: &prey_frame,
                    preds: &pred_frame,
                    prey_nbrs: neighbors::alive_view(row_prey, prey_alive, true),
                    pred_nbrs: neighbors::alive_view(row_pred, pred_alive, false),
                };
                agent.begin_update();
                machine.resume(agent, i, tick, &ctx);
                agent.body.last_update = tick;
                *ut = tick + agent.body.reaction_time;
            });

        let flocks = &prey.flock_tracker;
        preds
            .agents
            .par_iter_mut()
            .zip(preds.machines.par_iter_mut())
            .zip(preds.update_times.par_iter_mut())
            .zip(preds.rows_prey.par_iter_mut())
            .zip(preds.rows_pred.par_iter_mut())
            .enumerate()
            .for_each(|(i, ((((agent, machine), ut), row_prey), row_pred))| {
                if *ut > tick {
                    return;
                }
                neighbors::fill_row(
                    world.wh,
                    row_prey,
                    agent.body.pos,
                    agent.body.dir,
                    None,
                    |j| (prey_frame[j].pos, prey_frame[j].alive),
                );
                neighbors::fill_row(
                    world.wh,
                    row_pred,
                    agent.body.pos,
                    agent.body.dir,
                    Some(i),
                    |j| (pred_frame[j].pos, pred_frame[j].alive),
                );
                let ctx = PredCtx {
                    world,
                    prey: &prey_frame,
                    prey_nbrs: neighbors::alive_view(row_prey, prey_alive, false),
                    flocks,
                };
                agent.begin_update();
                machine.resume(agent, i, tick, &ctx);
                agent.body.last_update = tick;
                *ut = tick + agent.body.reaction_time;
            });

        // integrate phase
        prey.agents
            .par_iter_mut()
            .zip(prey.update_times.par_iter())
            .for_each(|(agent, &ut)| {
                if ut != DEAD {
                    flight::integrate(&mut agent.body, world);
                }
            });
        preds
            .agents
            .par_iter_mut()
            .zip(preds.update_times.par_iter())
            .for_each(|(agent, &ut)| {
                if ut != DEAD {
                    flight::integrate(&mut agent.body, world);
                }
            });

        // flock pass
        if self.flock_update == tick {
            let tracker = &mut self.prey.flock_tracker;
            tracker.prepare(self.prey.agents.len());
            for (i, (agent, &ut)) in self
                .prey
                .agents
                .iter()
                .zip(&self.prey.update_times)
                .enumerate()
            {
                if ut != DEAD {
                    tracker.feed(i, agent.body.pos, agent.body.vel());
                }
            }
            tracker.cluster(world.wh, self.flock_dd);
            self.flock_update += self.flock_interval;
        } else {
            self.prey.flock_tracker.track(world.wh, world.dt);
        }

        self.tick += 1;
    }
}

fn prey_frame(st: &SpeciesState<Prey, PreyAction>) -> Vec<PreyView> {
    st.agents
        .iter()
        .zip(&st.update_times)
        .map(|(a, &ut)| PreyView {
            pos: a.body.pos,
            dir: a.body.dir,
            speed: a.body.speed,
            alive: ut != DEAD,
        })
        .collect()
}

fn pred_frame(st: &SpeciesState<Pred, PredAction>) -> Vec<PredView> {
    st.agents
        .iter()
        .zip(&st.update_times)
        .map(|(a, &ut)| PredView {
            pos: a.body.pos,
            dir: a.body.dir,
            speed: a.body.speed,
            target: a.target_i,
            alive: ut != DEAD,
        })
        .collect()
}

/// A consistent, locked view of the simulation for observers and viewers.
pub struct SimView<'a> {
    pub world: World,
    inner: &'a Inner,
}

impl SimView<'_> {
    pub fn tick(&self) -> Tick {
        self.inner.tick
    }

    /// Simulated time [s].
    pub fn time(&self) -> f64 {
        self.world.to_seconds(self.inner.tick)
    }

    pub fn prey(&self) -> &[Prey] {
        &self.inner.prey.agents
    }

    pub fn preds(&self) -> &[Pred] {
        &self.inner.preds.agents
    }

    pub fn prey_alive_count(&self) -> usize {
        self.inner.prey.alive
    }

    pub fn pred_alive_count(&self) -> usize {
        self.inner.preds.alive
    }

    pub fn is_prey_alive(&self, idx: usize) -> bool {
        self.inner.prey.update_times[idx] != DEAD
    }

    pub fn is_pred_alive(&self, idx: usize) -> bool {
        self.inner.preds.update_times[idx] != DEAD
    }

    /// Current state index of a prey's machine.
    pub fn prey_state(&self, idx: usize) -> usize {
        self.inner.prey.machines[idx].current()
    }

    pub fn pred_state(&self, idx: usize) -> usize {
        self.inner.preds.machines[idx].current()
    }

    pub fn prey_n_states(&self) -> usize {
        self.inner.prey.machines.first().map_or(1, |m| m.n_states())
    }

    pub fn pred_n_states(&self) -> usize {
        self.inner.preds.machines.first().map_or(1, |m| m.n_states())
    }

    /// Sorted alive prey neighbors of a prey, nearest first, self excluded.
    /// The row reflects the focal agent's last behavioral update.
    pub fn sorted_prey_prey(&self, idx: usize) -> &[NeighborInfo] {
        neighbors::alive_view(&self.inner.prey.rows_prey[idx], self.inner.prey.alive, true)
    }

    /// Sorted alive predators of a prey, nearest first.
    pub fn sorted_prey_pred(&self, idx: usize) -> &[NeighborInfo] {
        neighbors::alive_view(&self.inner.prey.rows_pred[idx], self.inner.preds.alive, false)
    }

    /// Sorted alive prey of a predator, nearest first.
    pub fn sorted_pred_prey(&self, idx: usize) -> &[NeighborInfo] {
        neighbors::alive_view(&self.inner.preds.rows_prey[idx], self.inner.prey.alive, false)
    }

    pub fn flocks(&self) -> &[FlockDescr] {
        self.inner.prey.flock_tracker.flocks()
    }

    /// Descriptor of a flock; a default descriptor for [`NO_FLOCK`] or an
    /// out-of-range id.
    pub fn flock_descr(&self, id: u32) -> FlockDescr {
        if id == NO_FLOCK {
            return FlockDescr::default();
        }
        self.inner.prey.flock_tracker.descr(id)
    }

    /// Flock id of a prey, or [`NO_FLOCK`].
    pub fn flock_of(&self, idx: usize) -> u32 {
        self.inner.prey.flock_tracker.id_of(idx)
    }

    /// All member indices of a flock.
    pub fn flock_mates(&self, id: u32) -> Vec<usize> {
        self.inner.prey.flock_tracker.members(id)
    }
}
