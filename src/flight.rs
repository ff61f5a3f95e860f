//! Simplified flight model.
//!
//! Agents fly like banking birds, not point masses: a per-state cruise-speed
//! target pulls the speed back toward cruise, the accumulated steering force
//! turns the velocity, and a midpoint integrator advances the position on the
//! torus. The model is deliberately coarse; lift only appears in the
//! informational bank angle.

use crate::config::AeroConfig;
use crate::torus;
use crate::vector::{math, Vec2};
use crate::world::{Tick, World};
use rand::Rng;

/// Cruise speed predicted from wing load, after Alerstam et al. (PLOS Biol 5,
/// 2007): `4.8 · (m g / A)^0.28`.
pub fn cruise_speed(body_mass: f32, wing_area: f32) -> f32 {
    let wing_load = body_mass * 9.81 / wing_area;
    4.8 * wing_load.powf(0.28)
}

/// Per-agent aerodynamic constants, sampled once at construction.
#[derive(Debug, Clone, Copy)]
pub struct AeroInfo {
    pub body_mass: f32,    // [kg]
    pub cruise_speed: f32, // [m/s]
    /// Per-agent cruise-speed deviation, re-added to every state's cruise
    /// target on resume.
    pub cruise_speed_sd: f32,
    pub min_speed: f32, // [m/s]
    pub max_speed: f32, // [m/s]
    pub wing_area: f32, // [m²]
}

impl AeroInfo {
    /// Samples the per-agent deviations and derives the cruise speed from the
    /// wing load when the config does not pin it.
    pub fn sample<R: Rng>(cfg: &AeroConfig, rng: &mut R) -> Self {
        let mut body_mass = cfg.body_mass;
        if cfg.body_mass_sd != 0.0 {
            body_mass += rng.random_range(0.0..cfg.body_mass_sd);
        }
        let cruise_speed_sd = if cfg.cruise_speed_sd != 0.0 {
            rng.random_range(0.0..cfg.cruise_speed_sd)
        } else {
            0.0
        };
        let base = cfg
            .cruise_speed
            .unwrap_or_else(|| cruise_speed(body_mass, cfg.wing_area));
        AeroInfo {
            body_mass,
            cruise_speed: base + cruise_speed_sd,
            cruise_speed_sd,
            min_speed: cfg.min_speed,
            max_speed: cfg.max_speed,
            wing_area: cfg.wing_area,
        }
    }
}

/// Per-state flight target: the cruise speed the state flies at and the
/// weight of the restoring force pulling the speed toward it.
#[derive(Debug, Clone, Copy, Default)]
pub struct StateAero {
    pub cruise_speed: f32, // [m/s]
    pub w: f32,            // [1]
}

/// The physical state every agent carries, advanced by [`integrate`] once per
/// tick and steered by the actions in between.
#[derive(Debug, Clone)]
pub struct Body {
    /// Wrapped position [m].
    pub pos: Vec2,
    /// Unit heading.
    pub dir: Vec2,
    /// Speed [m/s], clamped to `[min_speed, max_speed]` after every step.
    pub speed: f32,
    /// Last integrator acceleration [m/s²].
    pub accel: Vec2,
    /// Realized angular velocity [rad/s]; diagnostics only.
    pub ang_vel: f32,
    /// Steering force accumulator [N], reset at each behavioral update.
    pub steering: Vec2,
    /// Ticks until the next state evaluation, set by the active state.
    pub reaction_time: Tick,
    /// Tick of the last behavioral update.
    pub last_update: Tick,
    /// Per-agent aerodynamic constants.
    pub ai: AeroInfo,
    /// Flight target of the active state.
    pub sa: StateAero,
}

impl Body {
    /// A body at the origin heading east at cruise speed. The state-aero
    /// weight starts at zero so the first integrate (before the first state
    /// resume) applies no restoring force.
    pub fn new(ai: AeroInfo) -> Self {
        Body {
            pos: Vec2::zero(),
            dir: Vec2::x_hat(),
            speed: ai.cruise_speed,
            accel: Vec2::zero(),
            ang_vel: 0.0,
            steering: Vec2::zero(),
            reaction_time: 0,
            last_update: 0,
            ai,
            sa: StateAero {
                cruise_speed: ai.cruise_speed,
                w: 0.0,
            },
        }
    }

    /// Current velocity vector.
    pub fn vel(&self) -> Vec2 {
        self.dir * self.speed
    }
}

/// Advances a body by one time step with the midpoint method.
///
/// 1. add the cruise-restoring force `w · (v_cs − s) · m` along the heading,
/// 2. `v(t+dt/2) = v(t) + a(t)·dt/2`, `p(t+dt) = p(t) + v(t+dt/2)·dt`,
/// 3. `a(t+dt) = F/m`, `v(t+dt) = v(t+dt/2) + a(t+dt)·dt/2`,
/// 4. clamp the speed, renormalize the heading (kept unchanged for a zero
///    velocity), wrap the position.
pub fn integrate(b: &mut Body, world: World) {
    let hdt = 0.5 * world.dt;

    let dv_c = b.sa.cruise_speed - b.speed;
    b.steering += b.dir * (b.sa.w * dv_c * b.ai.body_mass);

    let mut vel = b.vel();
    let force = b.steering;

    vel += b.accel * hdt;
    b.pos += vel * world.dt;
    b.accel = force / b.ai.body_mass;
    vel += b.accel * hdt;

    b.ang_vel = math::rad_between(&vel, &b.dir) / world.dt;

    b.speed = vel.norm();
    b.dir = vel.safe_normalize(b.dir);
    b.speed = b.speed.clamp(b.ai.min_speed, b.ai.max_speed);
    b.pos = torus::wrap(world.wh, b.pos);
}

/// Bank angle implied by the lateral steering force against the lift at the
/// current speed. Informational; the argument of `asin` is clamped so an
/// over-banked agent reports ±π/2 instead of NaN.
pub fn bank(b: &Body) -> f32 {
    let body_weight = 9.81 * b.ai.body_mass;
    let lift = body_weight * (b.speed * b.speed) / (b.sa.cruise_speed * b.sa.cruise_speed);
    let lat_force = b.steering.y;
    (lat_force / lift).clamp(-1.0, 1.0).asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_aero() -> AeroInfo {
        AeroInfo {
            body_mass: 0.5,
            cruise_speed: 10.0,
            cruise_speed_sd: 0.0,
            min_speed: 5.0,
            max_speed: 20.0,
            wing_area: 0.06,
        }
    }

    #[test]
    fn unforced_flight_is_straight_and_steady() {
        let world = World::new(1000.0, 0.1);
        let mut b = Body::new(test_aero());
        b.pos = Vec2::new(500.0, 500.0);

        for _ in 0..100 {
            b.steering = Vec2::zero();
            integrate(&mut b, world);
        }

        // 100 ticks * 0.1 s * 10 m/s = 100 m along +x
        assert!((b.pos.x - 600.0).abs() < 1.0e-2);
        assert!((b.pos.y - 500.0).abs() < 1.0e-2);
        assert!((b.speed - 10.0).abs() < 1.0e-4);
        assert!((b.dir.norm() - 1.0).abs() < 1.0e-5);
    }

    #[test]
    fn cruise_restore_pulls_speed_back() {
        let world = World::new(1000.0, 0.1);
        let mut b = Body::new(test_aero());
        b.sa = StateAero {
            cruise_speed: 10.0,
            w: 2.0,
        };
        b.speed = 6.0;

        for _ in 0..200 {
            b.steering = Vec2::zero();
            integrate(&mut b, world);
        }
        assert!((b.speed - 10.0).abs() < 0.1, "speed {}", b.speed);
    }

    #[test]
    fn speed_is_clamped() {
        let world = World::new(1000.0, 0.1);
        let mut b = Body::new(test_aero());
        // huge forward force
        b.steering = b.dir * 1000.0;
        integrate(&mut b, world);
        assert!(b.speed <= b.ai.max_speed);

        let mut b = Body::new(test_aero());
        b.steering = -b.dir * 1000.0;
        integrate(&mut b, world);
        assert!(b.speed >= b.ai.min_speed);
    }

    #[test]
    fn position_stays_wrapped() {
        let world = World::new(100.0, 0.1);
        let mut b = Body::new(test_aero());
        b.pos = Vec2::new(99.5, 99.5);
        b.dir = Vec2::new(1.0, 1.0).safe_normalize(Vec2::x_hat());
        for _ in 0..50 {
            b.steering = Vec2::zero();
            integrate(&mut b, world);
            assert!(crate::torus::is_wrapped(world.wh, b.pos.x));
            assert!(crate::torus::is_wrapped(world.wh, b.pos.y));
        }
    }

    #[test]
    fn lateral_force_rotates_heading() {
        let world = World::new(1000.0, 0.1);
        let mut b = Body::new(test_aero());
        let initial_dir = b.dir;
        // constant leftward force over a few ticks
        for _ in 0..5 {
            b.steering = b.dir.perp() * 2.0;
            integrate(&mut b, world);
        }
        assert!(math::rad_between(&initial_dir, &b.dir) > 0.0);
    }

    #[test]
    fn bank_angle_is_finite_under_extreme_force() {
        let mut b = Body::new(test_aero());
        b.steering = Vec2::new(0.0, 1.0e6);
        let alpha = bank(&b);
        assert!(alpha.is_finite());
        assert!((alpha - std::f32::consts::FRAC_PI_2).abs() < 1.0e-5);
    }

    #[test]
    fn wingload_cruise_speed_is_monotonic_in_mass() {
        assert!(cruise_speed(0.6, 0.06) > cruise_speed(0.4, 0.06));
    }
}
