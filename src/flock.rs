//! Flock detection and tracking.
//!
//! Every `flockDetection.interval` seconds the prey population is clustered
//! into flocks: connected components of the graph whose edges join pairs
//! closer than the detection threshold. Each component gets an oriented
//! bounding box (principal axes of the member positions), a centroid and a
//! mean velocity. Between clustering passes the centroids coast along the
//! mean velocity so observers see smooth flock motion.
//!
//! Member positions are unwrapped relative to the component's first member
//! before any box math, so a flock straddling the torus seam is measured in
//! plain Euclidean coordinates and only the final centroid is wrapped back.

use crate::torus;
use crate::vector::Vec2;

/// Flock id of prey that belong to no flock (dead, or not yet clustered).
pub const NO_FLOCK: u32 = u32::MAX;

/// Aggregate state of one detected flock.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlockDescr {
    /// Number of members.
    pub size: usize,
    /// Mean member velocity [m/s].
    pub vel: Vec2,
    /// First principal axis of the bounding box (unit).
    pub h0: Vec2,
    /// Second principal axis (unit, perpendicular to `h0`).
    pub h1: Vec2,
    /// Wrapped world position of the box center.
    pub gc: Vec2,
    /// Box extents along `h0` and `h1` [m].
    pub ext: Vec2,
}

#[derive(Debug, Clone, Copy)]
struct Proxy {
    idx: u32,
    pos: Vec2,
    vel: Vec2,
}

/// Clusters a population into flocks and tracks the result between passes.
///
/// The tracker holds indices only; it is fed a position/velocity proxy per
/// alive agent right before each clustering pass.
#[derive(Debug, Default)]
pub struct FlockTracker {
    proxies: Vec<Proxy>,
    descr: Vec<FlockDescr>,
    flock_id: Vec<u32>,
}

impl FlockTracker {
    pub fn new() -> Self {
        FlockTracker::default()
    }

    /// Population size seen by the last clustering pass.
    pub fn pop_size(&self) -> usize {
        self.flock_id.len()
    }

    /// The descriptors of the last clustering pass, indexed by flock id.
    pub fn flocks(&self) -> &[FlockDescr] {
        &self.descr
    }

    /// Descriptor by flock id; a default (empty) descriptor for an invalid id.
    pub fn descr(&self, id: u32) -> FlockDescr {
        self.descr.get(id as usize).copied().unwrap_or_default()
    }

    /// Flock id of an agent, or [`NO_FLOCK`].
    pub fn id_of(&self, idx: usize) -> u32 {
        self.flock_id.get(idx).copied().unwrap_or(NO_FLOCK)
    }

    /// Population indices of every member of a flock.
    pub fn members(&self, id: u32) -> Vec<usize> {
        self.flock_id
            .iter()
            .enumerate()
            .filter(|&(_, &f)| f == id)
            .map(|(i, _)| i)
            .collect()
    }

    /// Resets the proxy table for a population of `n` agents.
    pub fn prepare(&mut self, n: usize) {
        self.proxies.clear();
        self.proxies.reserve(n);
        self.flock_id.clear();
        self.flock_id.resize(n, NO_FLOCK);
    }

    /// Registers an alive agent for the next clustering pass.
    pub fn feed(&mut self, idx: usize, pos: Vec2, vel: Vec2) {
        self.proxies.push(Proxy {
            idx: idx as u32,
            pos,
            vel,
        });
    }

    /// Rebuilds the flock partition from the fed proxies. `dd` is the squared
    /// detection threshold. Flock ids are only stable until the next pass.
    pub fn cluster(&mut self, wh: f32, dd: f32) {
        let n = self.proxies.len();
        self.descr.clear();

        let mut visited = vec![false; n];
        let mut queue = Vec::new();
        let mut member_pos = Vec::new();

        for pivot in 0..n {
            if visited[pivot] {
                continue;
            }
            // BFS over the proximity graph; edges enumerated by brute scan
            visited[pivot] = true;
            queue.clear();
            queue.push(pivot);
            let mut head = 0;
            while head < queue.len() {
                let s = queue[head];
                head += 1;
                for j in 0..n {
                    if !visited[j] && torus::distance2(wh, self.proxies[s].pos, self.proxies[j].pos) < dd {
                        visited[j] = true;
                        queue.push(j);
                    }
                }
            }

            let flock_id = self.descr.len() as u32;
            let anchor = self.proxies[queue[0]].pos;
            member_pos.clear();
            let mut vel = Vec2::zero();
            for &m in &queue {
                let p = &self.proxies[m];
                self.flock_id[p.idx as usize] = flock_id;
                // unwrap relative to the anchor so box math is Euclidean
                member_pos.push(torus::ofs(wh, anchor, p.pos));
                vel += p.vel;
            }
            vel = vel / queue.len() as f32;

            let (h0, h1, center, ext) = oriented_bbox(&member_pos);
            self.descr.push(FlockDescr {
                size: queue.len(),
                vel,
                h0,
                h1,
                gc: torus::wrap(wh, anchor + center),
                ext,
            });
        }
    }

    /// Coasts every centroid along its mean velocity for one tick.
    pub fn track(&mut self, wh: f32, dt: f32) {
        for fd in &mut self.descr {
            fd.gc = torus::wrap(wh, fd.gc + fd.vel * dt);
        }
    }
}

/// Principal-axis bounding box of a point cloud (already unwrapped).
/// Returns `(axis0, axis1, center, extents)` with the center in the cloud's
/// own coordinates.
fn oriented_bbox(pts: &[Vec2]) -> (Vec2, Vec2, Vec2, Vec2) {
    let n = pts.len() as f32;
    let mut mean = Vec2::zero();
    for p in pts {
        mean += *p;
    }
    mean = mean / n;

    let (mut sxx, mut sxy, mut syy) = (0.0f32, 0.0f32, 0.0f32);
    for p in pts {
        let d = *p - mean;
        sxx += d.x * d.x;
        sxy += d.x * d.y;
        syy += d.y * d.y;
    }

    // principal direction of the 2x2 covariance
    let theta = 0.5 * (2.0 * sxy).atan2(sxx - syy);
    let h0 = Vec2::new(theta.cos(), theta.sin());
    let h1 = h0.perp();

    let (mut min0, mut max0) = (f32::INFINITY, f32::NEG_INFINITY);
    let (mut min1, mut max1) = (f32::INFINITY, f32::NEG_INFINITY);
    for p in pts {
        let a = p.dot(&h0);
        let b = p.dot(&h1);
        min0 = min0.min(a);
        max0 = max0.max(a);
        min1 = min1.min(b);
        max1 = max1.max(b);
    }

    let center = h0 * (0.5 * (min0 + max0)) + h1 * (0.5 * (min1 + max1));
    let ext = Vec2::new(max0 - min0, max1 - min1);
    (h0, h1, center, ext)
}
