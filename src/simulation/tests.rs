#[cfg(test)]
mod units {
    use crate::agents::{PredSnapshot, PreySnapshot, SpeciesSnapshots};
    use crate::config::Config;
    use crate::error::Error;
    use crate::observers::ObserverChain;
    use crate::simulation::Simulation;
    use crate::torus;
    use crate::vector::Vec2;
    use crate::world::Tick;
    use serde_json::{json, Value};

    /// A minimal configuration: `n_prey` prey running one transient state
    /// with the given actions, `n_pred` predators running theirs.
    fn test_config(
        n_prey: usize,
        prey_actions: Value,
        n_pred: usize,
        pred_states: Option<Value>,
        pred_transitions: Option<Value>,
    ) -> Config {
        let pred_states = pred_states.unwrap_or_else(|| {
            json!([{
                "name": "idle", "tr": 0.1,
                "aeroState": { "cruiseSpeed": 15.0, "w": 0.0 },
                "actions": [{ "name": "wiggle", "w": 0.0 }]
            }])
        });
        let mut root = json!({
            "Simulation": {
                "dt": 0.1,
                "WH": 1000.0,
                "Tmax": 10.0,
                "numThreads": -1,
                "flockDetection": { "interval": 0.5, "threshold": 5.0 }
            },
            "Prey": {
                "N": n_prey,
                "aero": {
                    "bodyMass": 0.5, "bodyMassSd": 0.0,
                    "cruiseSpeed": 10.0, "cruiseSpeedSd": 0.0,
                    "wingArea": 0.06, "wingSpan": 0.66,
                    "minSpeed": 5.0, "maxSpeed": 20.0
                },
                "InitCondit": { "type": "none" },
                "states": [{
                    "name": "flocking", "tr": 0.1,
                    "aeroState": { "cruiseSpeed": 10.0, "w": 0.0 },
                    "actions": prey_actions
                }]
            },
            "Pred": {
                "N": n_pred,
                "aero": {
                    "bodyMass": 0.8, "bodyMassSd": 0.0,
                    "cruiseSpeed": 15.0, "cruiseSpeedSd": 0.0,
                    "wingArea": 0.13, "wingSpan": 1.1,
                    "minSpeed": 5.0, "maxSpeed": 40.0
                },
                "InitCondit": { "type": "none" },
                "states": pred_states
            }
        });
        if let Some(t) = pred_transitions {
            root["Pred"]["transitions"] = t;
        }
        Config::parse(root).unwrap()
    }

    fn wiggle_only() -> Value {
        json!([{ "name": "wiggle", "w": 0.0 }])
    }

    fn run_ticks(sim: &Simulation, n: usize) {
        let mut chain = ObserverChain::new();
        for _ in 0..n {
            sim.update(&mut chain);
        }
    }

    #[test]
    fn undisturbed_prey_flies_straight_at_constant_speed() {
        let cfg = test_config(1, wiggle_only(), 0, None, None);
        let sim = Simulation::new(&cfg).unwrap();
        // constructor state: origin, heading east, cruise speed
        run_ticks(&sim, 100);

        sim.visit_all_prey(|p, _, alive| {
            assert!(alive);
            // 100 ticks * 0.1 s * 10 m/s along +x
            assert!((p.body.pos.x - 100.0).abs() < 1.0e-2, "x {}", p.body.pos.x);
            assert!(p.body.pos.y.abs() < 1.0e-2);
            assert!((p.body.speed - 10.0).abs() < 1.0e-4);
            assert!((p.body.dir.norm() - 1.0).abs() < 1.0e-5);
        });
        assert_eq!(sim.tick(), 100);
        assert!((sim.time() - 10.0).abs() < 1.0e-5);
    }

    #[test]
    fn close_pair_acquires_opposing_separation_forces() {
        let actions = json!([{
            "name": "avoid_n_position",
            "topo": 1, "fov": 360.0, "maxdist": 10.0, "minsep": 10.0, "w": 1.0
        }]);
        let cfg = test_config(2, actions, 0, None, None);
        let sim = Simulation::new(&cfg).unwrap();
        // both heading +y so neither sits exactly on the other's view boundary
        sim.set_snapshots(&SpeciesSnapshots {
            prey: vec![
                PreySnapshot {
                    pos: Vec2::new(500.0, 500.0),
                    dir: Vec2::y_hat(),
                    speed: 10.0,
                    accel: Vec2::zero(),
                },
                PreySnapshot {
                    pos: Vec2::new(505.0, 500.0),
                    dir: Vec2::y_hat(),
                    speed: 10.0,
                    accel: Vec2::zero(),
                },
            ],
            preds: vec![],
        })
        .unwrap();

        // one second covers every staggered first update
        run_ticks(&sim, 11);

        sim.with_view(|v| {
            let s0 = v.prey()[0].body.steering;
            let s1 = v.prey()[1].body.steering;
            assert!(s0.x < -0.99, "prey 0 pushed -x, got {s0:?}");
            assert!(s1.x > 0.99, "prey 1 pushed +x, got {s1:?}");
            assert!(s0.y.abs() < 1.0e-2);
            assert!(s1.y.abs() < 1.0e-2);
        });
    }

    #[test]
    fn clustering_partitions_by_distance_threshold() {
        let cfg = test_config(3, wiggle_only(), 0, None, None);
        let sim = Simulation::new(&cfg).unwrap();
        sim.set_snapshots(&SpeciesSnapshots {
            prey: vec![
                PreySnapshot {
                    pos: Vec2::new(0.0, 0.0),
                    dir: Vec2::x_hat(),
                    speed: 10.0,
                    accel: Vec2::zero(),
                },
                PreySnapshot {
                    pos: Vec2::new(3.0, 0.0),
                    dir: Vec2::x_hat(),
                    speed: 10.0,
                    accel: Vec2::zero(),
                },
                PreySnapshot {
                    pos: Vec2::new(100.0, 100.0),
                    dir: Vec2::x_hat(),
                    speed: 10.0,
                    accel: Vec2::zero(),
                },
            ],
            preds: vec![],
        })
        .unwrap();

        // the first tick runs the initial clustering pass
        run_ticks(&sim, 1);

        sim.with_view(|v| {
            assert_eq!(v.flocks().len(), 2);
            let mut sizes: Vec<usize> = v.flocks().iter().map(|f| f.size).collect();
            sizes.sort_unstable();
            assert_eq!(sizes, vec![1, 2]);
            assert_eq!(v.flock_of(0), v.flock_of(1));
            assert_ne!(v.flock_of(0), v.flock_of(2));
            assert_eq!(v.flock_mates(v.flock_of(2)), vec![2]);
        });
    }

    #[test]
    fn snapshot_round_trip_is_identity() {
        let cfg = test_config(5, wiggle_only(), 1, None, None);
        let sim = Simulation::new(&cfg).unwrap();
        run_ticks(&sim, 7);

        let s1 = sim.get_snapshots();
        sim.set_snapshots(&s1).unwrap();
        let s2 = sim.get_snapshots();
        assert_eq!(s1, s2);
        assert_eq!(s1.prey.len(), 5);
        assert_eq!(s1.preds.len(), 1);
    }

    #[test]
    fn restored_snapshot_restarts_from_the_same_state() {
        let cfg = test_config(4, wiggle_only(), 0, None, None);
        let sim = Simulation::new(&cfg).unwrap();
        run_ticks(&sim, 10);

        let saved = sim.get_snapshots();
        run_ticks(&sim, 10);
        let drifted = sim.get_snapshots();
        assert_ne!(saved, drifted);

        sim.set_snapshots(&saved).unwrap();
        assert_eq!(sim.get_snapshots().prey, saved.prey);
    }

    #[test]
    fn oversized_snapshot_is_rejected() {
        let cfg = test_config(2, wiggle_only(), 0, None, None);
        let sim = Simulation::new(&cfg).unwrap();
        let bad = SpeciesSnapshots {
            prey: vec![PreySnapshot::default(); 3],
            preds: vec![],
        };
        assert!(matches!(
            sim.set_snapshots(&bad),
            Err(Error::SnapshotMismatch {
                expected: 2,
                got: 3
            })
        ));

        let bad_pred = SpeciesSnapshots {
            prey: vec![],
            preds: vec![PredSnapshot::default(); 2],
        };
        assert!(sim.set_snapshots(&bad_pred).is_err());
    }

    #[test]
    fn dead_predator_disappears_from_every_view() {
        let actions = json!([{
            "name": "avoid_p_direction", "minsep": 1000.0, "w": 1.0
        }]);
        let cfg = test_config(3, actions, 1, None, None);
        let sim = Simulation::new(&cfg).unwrap();

        sim.set_pred_alive(0, false);
        run_ticks(&sim, 12);

        assert!(!sim.is_pred_alive(0));
        sim.with_view(|v| {
            assert_eq!(v.pred_alive_count(), 0);
            for i in 0..3 {
                assert!(v.sorted_prey_pred(i).is_empty());
                assert!(!v.prey()[i].am_target);
            }
        });
    }

    #[test]
    fn dead_prey_is_skipped_by_flockmates_and_clustering() {
        let cfg = test_config(3, wiggle_only(), 0, None, None);
        let sim = Simulation::new(&cfg).unwrap();

        sim.set_prey_alive(2, false);
        run_ticks(&sim, 12);

        sim.with_view(|v| {
            assert_eq!(v.prey_alive_count(), 2);
            for i in 0..2 {
                let view = v.sorted_prey_prey(i);
                assert_eq!(view.len(), 1);
                assert!(view.iter().all(|ni| ni.idx != 2));
            }
            assert_eq!(v.flock_of(2), crate::flock::NO_FLOCK);
        });
    }

    #[test]
    fn set_alive_is_idempotent() {
        let cfg = test_config(1, wiggle_only(), 1, None, None);
        let sim = Simulation::new(&cfg).unwrap();

        sim.set_pred_alive(0, false);
        sim.set_pred_alive(0, false);
        sim.with_view(|v| assert_eq!(v.pred_alive_count(), 0));

        sim.set_pred_alive(0, true);
        sim.set_pred_alive(0, true);
        sim.with_view(|v| assert_eq!(v.pred_alive_count(), 1));
    }

    #[test]
    fn terminate_is_idempotent_and_sticky() {
        let cfg = test_config(1, wiggle_only(), 0, None, None);
        let sim = Simulation::new(&cfg).unwrap();
        assert!(!sim.terminated());
        sim.terminate();
        sim.terminate();
        assert!(sim.terminated());
    }

    #[test]
    fn update_respects_the_state_reaction_time() {
        let actions = json!([{ "name": "wiggle", "w": 0.0 }]);
        let mut cfg = test_config(1, actions, 0, None, None);
        // slow the prey down to one evaluation every four ticks
        cfg.prey.states[0].tr = 0.4;
        let sim = Simulation::new(&cfg).unwrap();

        let mut updates: Vec<Tick> = Vec::new();
        let mut chain = ObserverChain::new();
        for _ in 0..40 {
            sim.update(&mut chain);
            sim.visit_all_prey(|p, _, _| {
                if updates.last() != Some(&p.body.last_update) {
                    updates.push(p.body.last_update);
                }
            });
        }
        assert!(updates.len() >= 3);
        for w in updates.windows(2).skip(1) {
            assert_eq!(w[1] - w[0], 4, "updates at {updates:?}");
        }
    }

    #[test]
    fn predator_transitions_walk_the_state_ring() {
        // four short states in a deterministic 0->1->2->3->0 ring
        let pred_states = json!([
            { "name": "a", "tr": 0.1, "duration": 0.3,
              "aeroState": { "cruiseSpeed": 15.0, "w": 0.0 },
              "actions": [{ "name": "wiggle", "w": 0.0 }] },
            { "name": "b", "tr": 0.1, "duration": 0.3,
              "aeroState": { "cruiseSpeed": 15.0, "w": 0.0 },
              "actions": [{ "name": "wiggle", "w": 0.0 }] },
            { "name": "c", "tr": 0.1, "duration": 0.3,
              "aeroState": { "cruiseSpeed": 15.0, "w": 0.0 },
              "actions": [{ "name": "wiggle", "w": 0.0 }] },
            { "name": "d", "tr": 0.1,
              "aeroState": { "cruiseSpeed": 15.0, "w": 0.0 },
              "actions": [{ "name": "set_retreat", "distAway": 10.0, "speed": 15.0 }] }
        ]);
        let transitions = json!({
            "name": "piecewise_linear_interpolator",
            "TM": [[
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
                [1.0, 0.0, 0.0, 0.0]
            ]],
            "edges": [0.0]
        });
        let cfg = test_config(1, wiggle_only(), 1, Some(pred_states), Some(transitions));
        let sim = Simulation::new(&cfg).unwrap();

        let mut seen = std::collections::BTreeSet::new();
        let mut chain = ObserverChain::new();
        for _ in 0..80 {
            sim.update(&mut chain);
            sim.with_view(|v| {
                seen.insert(v.pred_state(0));
            });
        }
        // every state of the ring is visited, including the transient retreat
        assert_eq!(seen.into_iter().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn predator_chase_locks_onto_a_prey() {
        let pred_states = json!([
            { "name": "attack", "tr": 0.1, "duration": 1000.0,
              "aeroState": { "cruiseSpeed": 20.0, "w": 0.0 },
              "actions": [{ "name": "chase_closest_prey", "w": 2.0, "prey_speed_scale": 1.2 }] }
        ]);
        let cfg = test_config(2, wiggle_only(), 1, Some(pred_states), None);
        let sim = Simulation::new(&cfg).unwrap();
        run_ticks(&sim, 12);

        sim.with_view(|v| {
            assert!(v.preds()[0].target_i.is_some());
        });
    }

    #[test]
    fn invariants_hold_across_a_noisy_run() {
        let actions = json!([
            { "name": "align_n", "topo": 7, "fov": 300.0, "maxdist": 100.0, "w": 0.5 },
            { "name": "cohere_turn_n_all", "topo": 7, "fov": 300.0, "maxdist": 200.0, "w": 1.0 },
            { "name": "avoid_n_position", "topo": 3, "fov": 240.0, "maxdist": 30.0,
              "minsep": 2.0, "w": 4.0 },
            { "name": "wiggle", "w": 0.5 }
        ]);
        let mut cfg = test_config(20, actions, 1, None, None);
        cfg.prey.init = json!({ "type": "random" });
        cfg.pred.init = json!({ "type": "random" });
        let sim = Simulation::new(&cfg).unwrap();
        run_ticks(&sim, 50);

        sim.with_view(|v| {
            for (i, p) in v.prey().iter().enumerate() {
                assert!(torus::is_wrapped(v.world.wh, p.body.pos.x));
                assert!(torus::is_wrapped(v.world.wh, p.body.pos.y));
                assert!((p.body.dir.norm() - 1.0).abs() < 1.0e-5);
                assert!(p.body.speed >= p.body.ai.min_speed - 1.0e-4);
                assert!(p.body.speed <= p.body.ai.max_speed + 1.0e-4);

                let view = v.sorted_prey_prey(i);
                assert_eq!(view.len(), v.prey_alive_count() - 1);
                for w in view.windows(2) {
                    assert!(w[0].dist2 <= w[1].dist2);
                }
            }
        });
    }
}
