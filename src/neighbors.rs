//! Neighborhood service primitives.
//!
//! The kernel keeps, per (focal species, target species) pair, a matrix of
//! neighbor records with one row per focal agent. Whenever an agent comes up
//! for a behavioral update its rows are refilled from the current frame and
//! sorted ascending by squared toroidal distance; dead targets are pushed to
//! the end with an infinite key and the focal agent itself sorts first with a
//! key of −∞. A sorted view is then just a slice over the leading alive
//! records.

use crate::torus;
use crate::vector::{math, Vec2};

/// One record of a neighbor row.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeighborInfo {
    /// Squared toroidal distance to the neighbor, or `f32::INFINITY` for a
    /// dead target (`f32::NEG_INFINITY` for the focal agent itself).
    pub dist2: f32,
    /// Index of the neighbor in its population.
    pub idx: u32,
    /// Signed bearing from the focal heading to the neighbor [rad].
    pub bangl: f32,
}

/// Refills and sorts one neighbor row.
///
/// `target` maps a population index to `(position, alive)`. Pass
/// `self_idx = Some(i)` when the target species is the focal agent's own so
/// the self record sorts to the front and can be skipped by the view.
pub fn fill_row(
    wh: f32,
    row: &mut [NeighborInfo],
    focal_pos: Vec2,
    focal_dir: Vec2,
    self_idx: Option<usize>,
    target: impl Fn(usize) -> (Vec2, bool),
) {
    for (j, ni) in row.iter_mut().enumerate() {
        let (pos, alive) = target(j);
        let dist2 = if self_idx == Some(j) {
            f32::NEG_INFINITY
        } else if alive {
            torus::distance2(wh, focal_pos, pos)
        } else {
            f32::INFINITY
        };
        *ni = NeighborInfo {
            dist2,
            idx: j as u32,
            bangl: math::rad_between(&focal_dir, &torus::ofs(wh, focal_pos, pos)),
        };
    }
    row.sort_unstable_by(|a, b| a.dist2.total_cmp(&b.dist2));
}

/// The alive prefix of a sorted row: `alive` records, minus the leading self
/// record for a same-species row.
pub fn alive_view(row: &[NeighborInfo], alive: usize, own_species: bool) -> &[NeighborInfo] {
    let alive = alive.min(row.len());
    if own_species {
        if alive == 0 { &[] } else { &row[1..alive] }
    } else {
        &row[..alive]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WH: f32 = 1000.0;

    fn row_for(positions: &[(f32, f32, bool)], focal: usize) -> Vec<NeighborInfo> {
        let mut row = vec![NeighborInfo::default(); positions.len()];
        let (fx, fy, _) = positions[focal];
        fill_row(
            WH,
            &mut row,
            Vec2::new(fx, fy),
            Vec2::x_hat(),
            Some(focal),
            |j| {
                let (x, y, alive) = positions[j];
                (Vec2::new(x, y), alive)
            },
        );
        row
    }

    #[test]
    fn rows_sort_ascending_with_self_first() {
        let pts = [
            (500.0, 500.0, true),
            (510.0, 500.0, true),
            (503.0, 500.0, true),
            (990.0, 500.0, true),
        ];
        let row = row_for(&pts, 0);
        assert_eq!(row[0].idx, 0); // self
        assert_eq!(row[1].idx, 2); // 3 m
        assert_eq!(row[2].idx, 1); // 10 m
        assert_eq!(row[3].idx, 3); // 510 m wrapped
        for w in row.windows(2) {
            assert!(w[0].dist2 <= w[1].dist2);
        }
    }

    #[test]
    fn dead_targets_sort_last() {
        let pts = [
            (500.0, 500.0, true),
            (501.0, 500.0, false),
            (520.0, 500.0, true),
        ];
        let row = row_for(&pts, 0);
        assert_eq!(row[2].idx, 1);
        assert!(row[2].dist2.is_infinite());

        // 2 alive (focal included): the view over the row is the lone alive
        // neighbor.
        let view = alive_view(&row, 2, true);
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].idx, 2);
    }

    #[test]
    fn cross_species_view_keeps_all_alive() {
        let mut row = vec![NeighborInfo::default(); 3];
        let targets = [
            (Vec2::new(510.0, 500.0), true),
            (Vec2::new(505.0, 500.0), true),
            (Vec2::new(502.0, 500.0), false),
        ];
        fill_row(
            WH,
            &mut row,
            Vec2::new(500.0, 500.0),
            Vec2::x_hat(),
            None,
            |j| targets[j],
        );
        let view = alive_view(&row, 2, false);
        assert_eq!(view.len(), 2);
        assert_eq!(view[0].idx, 1);
        assert_eq!(view[1].idx, 0);
    }

    #[test]
    fn bearing_is_signed() {
        let mut row = vec![NeighborInfo::default(); 2];
        let targets = [
            (Vec2::new(500.0, 510.0), true), // left of +x heading
            (Vec2::new(500.0, 490.0), true), // right
        ];
        fill_row(
            WH,
            &mut row,
            Vec2::new(500.0, 500.0),
            Vec2::x_hat(),
            None,
            |j| targets[j],
        );
        let left = row.iter().find(|ni| ni.idx == 0).unwrap();
        let right = row.iter().find(|ni| ni.idx == 1).unwrap();
        assert!(left.bangl > 0.0);
        assert!(right.bangl < 0.0);
    }

    #[test]
    fn empty_view_when_nothing_alive() {
        let row = [NeighborInfo {
            dist2: f32::INFINITY,
            idx: 0,
            bangl: 0.0,
        }];
        assert!(alive_view(&row, 0, false).is_empty());
        assert!(alive_view(&row, 0, true).is_empty());
    }
}
