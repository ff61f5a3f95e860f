#[cfg(test)]
mod units {
    use crate::vector::math::{cos_half_fov, rad_between, smootherstep};
    use crate::vector::Vec2;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn basic_arithmetic() {
        let a = Vec2::new(1.0, 2.0);
        let b = Vec2::new(3.0, -1.0);

        assert_eq!(a + b, Vec2::new(4.0, 1.0));
        assert_eq!(a - b, Vec2::new(-2.0, 3.0));
        assert_eq!(a * 2.0, Vec2::new(2.0, 4.0));
        assert_eq!(2.0 * a, a * 2.0);
        assert_eq!(a / 2.0, Vec2::new(0.5, 1.0));
        assert_eq!(-a, Vec2::new(-1.0, -2.0));
    }

    #[test]
    fn compound_assignment_matches_binary_ops() {
        let mut acc = Vec2::zero();
        acc += Vec2::new(1.0, 1.0);
        acc += Vec2::new(2.0, -1.0);
        assert_eq!(acc, Vec2::new(3.0, 0.0));

        acc -= Vec2::new(3.0, 0.0);
        assert_eq!(acc, Vec2::zero());

        let mut v = Vec2::new(1.0, -2.0);
        v *= 3.0;
        assert_eq!(v, Vec2::new(3.0, -6.0));
    }

    #[test]
    fn perp_rotates_left() {
        let east = Vec2::x_hat();
        assert_eq!(east.perp(), Vec2::y_hat());
        assert_eq!(east.perp().perp(), -east);
    }

    #[test]
    fn perp_dot_sign_tells_side() {
        let heading = Vec2::x_hat();
        let left = Vec2::new(0.0, 1.0);
        let right = Vec2::new(0.0, -1.0);
        assert!(heading.perp_dot(&left) > 0.0);
        assert!(heading.perp_dot(&right) < 0.0);
        assert_eq!(heading.perp_dot(&heading), 0.0);
    }

    #[test]
    fn norm_and_normalize() {
        let v = Vec2::new(3.0, 4.0);
        assert_eq!(v.norm2(), 25.0);
        assert_eq!(v.norm(), 5.0);

        let u = v.safe_normalize(Vec2::x_hat());
        assert!((u.norm() - 1.0).abs() < 1.0e-6);
        assert!((u.x - 0.6).abs() < 1.0e-6);
    }

    #[test]
    fn safe_normalize_falls_back_on_degenerate_input() {
        let fallback = Vec2::new(0.0, 1.0);
        assert_eq!(Vec2::zero().safe_normalize(fallback), fallback);
        assert_eq!(Vec2::new(f32::NAN, 0.0).safe_normalize(fallback), fallback);
    }

    #[test]
    fn rotate_quarter_turn() {
        let v = Vec2::x_hat().rotate(FRAC_PI_2);
        assert!((v.x - 0.0).abs() < 1.0e-6);
        assert!((v.y - 1.0).abs() < 1.0e-6);
    }

    #[test]
    fn rad_between_is_signed_and_antisymmetric() {
        let a = Vec2::x_hat();
        let b = Vec2::y_hat();
        assert!((rad_between(&a, &b) - FRAC_PI_2).abs() < 1.0e-6);
        assert!((rad_between(&b, &a) + FRAC_PI_2).abs() < 1.0e-6);
        assert!((rad_between(&a, &-a).abs() - PI).abs() < 1.0e-5);
    }

    #[test]
    fn smootherstep_saturates_and_interpolates() {
        assert_eq!(smootherstep(-1.0, 0.0, 1.0), 0.0);
        assert_eq!(smootherstep(2.0, 0.0, 1.0), 1.0);
        assert_eq!(smootherstep(0.5, 0.0, 1.0), 0.5);
        assert!(smootherstep(0.25, 0.0, 1.0) < 0.25);
        assert!(smootherstep(0.75, 0.0, 1.0) > 0.75);
    }

    #[test]
    fn fov_cosine_thresholds() {
        // 360 degrees sees everything: threshold -1.
        assert!((cos_half_fov(360.0) + 1.0).abs() < 1.0e-6);
        // 180 degrees sees the front half-plane: threshold 0.
        assert!(cos_half_fov(180.0).abs() < 1.0e-6);
    }
}
