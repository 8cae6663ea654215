//! Waypoint expansion into axis-aligned, obstacle-free legs
//!
//! A depth-first search over the path-so-far. Every branch owns its own
//! copy of the path, so a failed branch leaves nothing behind. The search
//! is bounded by an expansion budget and a path length cap, and a branch
//! that starts repeating a block of points is abandoned.

use std::collections::VecDeque;

use crate::error::RoutingError;
use crate::geometry::Coordinate;
use crate::utils::closest_multiple;

use super::zones::{Zone, ZoneMap};

/// Index from which the repeated-block check runs
const REPEAT_CHECK_FROM: usize = 5;

/// Shortest repeated block that counts as a cycle
const MIN_REPEAT_BLOCK: usize = 3;

/// Search limits
#[derive(Clone, Debug)]
pub struct PlannerConfig {
    /// Recursive steps before the search gives up
    pub max_expansions: usize,
    /// Longest path a branch may grow to
    pub max_path_len: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_expansions: 20_000,
            max_path_len: 64,
        }
    }
}

/// Which axes a detour may shift along
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShiftAxes {
    /// Shift in x only
    Horizontal,
    /// Shift in y only
    Vertical,
    Both,
}

impl ShiftAxes {
    /// Shift bits that are off-limits, pre-set in the used mask
    fn excluded(self) -> u8 {
        match self {
            ShiftAxes::Horizontal => 4 | 8 | 64 | 128,
            ShiftAxes::Vertical => 1 | 2 | 16 | 32,
            ShiftAxes::Both => 0,
        }
    }
}

/// Nearest grid intersection to `p`
pub fn closest_intersection(p: &Coordinate, tile: f64) -> Coordinate {
    Coordinate::new(closest_multiple(p.x, tile), closest_multiple(p.y, tile))
}

/// Pick the unused shift of `current` that lands closest to `next`
///
/// Bits 1, 2, 4, 8 are +x, -x, +y, -y by a tile; 16, 32, 64, 128 the same
/// by half a tile. Ties go to the lower bit. Returns the shifted point and
/// its bit, or `None` once all eight are used.
pub fn close_shift(
    current: &Coordinate,
    next: &Coordinate,
    used: u8,
    tile: f64,
) -> Option<(Coordinate, u8)> {
    let half = tile / 2.0;
    let offsets = [
        (1u8, tile, 0.0),
        (2, -tile, 0.0),
        (4, 0.0, tile),
        (8, 0.0, -tile),
        (16, half, 0.0),
        (32, -half, 0.0),
        (64, 0.0, half),
        (128, 0.0, -half),
    ];

    let mut best: Option<(Coordinate, u8, f64)> = None;
    for &(bit, dx, dy) in &offsets {
        if used & bit != 0 {
            continue;
        }
        let candidate = current.offset(dx, dy);
        let cost = candidate.manhattan(next);
        match best {
            Some((_, _, best_cost)) if best_cost <= cost => {}
            _ => best = Some((candidate, bit, cost)),
        }
    }
    best.map(|(point, bit, _)| (point, bit))
}

fn between(a: f64, b: f64, c: f64) -> bool {
    a.min(c) <= b && b <= a.max(c)
}

/// Drop interior points that share an x or a y with both neighbours
///
/// Only a point lying between its neighbours is dropped. A point where the
/// path doubles back on itself is kept, even though it is colinear with
/// both neighbours, so an out-and-back goal is still driven to.
pub fn remove_redundant_points(path: &mut Vec<Coordinate>) {
    let mut i = 1;
    while i + 1 < path.len() {
        let (a, b, c) = (path[i - 1], path[i], path[i + 1]);
        let redundant = b == a
            || b == c
            || (a.x == b.x && b.x == c.x && between(a.y, b.y, c.y))
            || (a.y == b.y && b.y == c.y && between(a.x, b.x, c.x));
        if redundant {
            path.remove(i);
            i = i.saturating_sub(1).max(1);
        } else {
            i += 1;
        }
    }
}

/// Trailing points of a branch, compared for repeated blocks
#[derive(Debug, Clone)]
pub struct RepeatWindow {
    points: VecDeque<Coordinate>,
    capacity: usize,
}

impl RepeatWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Window over the last `capacity` points of `path`
    pub fn from_path(path: &[Coordinate], capacity: usize) -> Self {
        let mut window = Self::new(capacity);
        for &p in path {
            window.push(p);
        }
        window
    }

    pub fn push(&mut self, point: Coordinate) {
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    /// Whether the last `k` points equal the `k` before them for some
    /// `k` in `3..=len/2`
    pub fn has_repeat(&self) -> bool {
        let len = self.points.len();
        (MIN_REPEAT_BLOCK..=len / 2).any(|k| {
            let recent = self.points.range(len - k..);
            let before = self.points.range(len - 2 * k..len - k);
            recent.eq(before)
        })
    }
}

#[derive(Debug)]
struct SearchBudget {
    expansions: usize,
    limit: usize,
}

/// Expands goal lists into legs the robot can drive
pub struct PathPlanner {
    zones: ZoneMap,
    config: PlannerConfig,
}

impl PathPlanner {
    pub fn new(zones: ZoneMap, config: PlannerConfig) -> Self {
        Self { zones, config }
    }

    pub fn zones(&self) -> &ZoneMap {
        &self.zones
    }

    /// Expand `waypoints` into axis-aligned legs starting from the grid
    /// intersection nearest `position`
    ///
    /// The returned path starts with that intersection and ends with the
    /// last waypoint.
    pub fn expand(
        &self,
        position: &Coordinate,
        waypoints: &[Coordinate],
    ) -> Result<Vec<Coordinate>, RoutingError> {
        let start = closest_intersection(position, self.zones.tile());
        if !self.zones.is_passable(&start) {
            return Err(RoutingError::StartUnreachable(start));
        }
        if let Some(bad) = waypoints.iter().find(|p| !self.zones.is_passable(p)) {
            return Err(RoutingError::WaypointUnreachable(*bad));
        }

        let mut path = Vec::with_capacity(waypoints.len() + 1);
        path.push(start);
        path.extend_from_slice(waypoints);
        path.dedup();

        let mut budget = SearchBudget {
            expansions: 0,
            limit: self.config.max_expansions,
        };
        let expanded = self.search(path, 0, &mut budget)?;
        match expanded {
            Some(path) => {
                tracing::debug!(
                    "Expanded {} waypoints into {} points ({} expansions)",
                    waypoints.len(),
                    path.len(),
                    budget.expansions
                );
                Ok(path)
            }
            None => Err(RoutingError::NoRoute),
        }
    }

    /// Make the leg at `index` valid, then the rest of the path
    fn search(
        &self,
        path: Vec<Coordinate>,
        index: usize,
        budget: &mut SearchBudget,
    ) -> Result<Option<Vec<Coordinate>>, RoutingError> {
        budget.expansions += 1;
        if budget.expansions > budget.limit {
            return Err(RoutingError::BudgetExhausted {
                expansions: budget.limit,
            });
        }
        if path.len() > self.config.max_path_len {
            return Ok(None);
        }
        if index >= REPEAT_CHECK_FROM
            && RepeatWindow::from_path(&path[..=index], self.config.max_path_len).has_repeat()
        {
            return Ok(None);
        }
        if index + 1 >= path.len() {
            let mut done = path;
            remove_redundant_points(&mut done);
            return Ok(Some(done));
        }

        let current = path[index];
        let next = path[index + 1];
        let current_zone = self.zones.map_point(&current);
        let next_zone = self.zones.map_point(&next);

        if !current_zone.compatible_with(next_zone) {
            let mut branch = path;
            branch.insert(index + 1, self.zones.bridge_mid());
            return self.search(branch, index, budget);
        }

        if current.is_aligned_with(&next) {
            if self.zones.leg_clear(&current, &next) {
                return self.search(path, index + 1, budget);
            }
            let axes = if current_zone == Zone::Bridge {
                ShiftAxes::Both
            } else if current.y == next.y {
                ShiftAxes::Vertical
            } else {
                ShiftAxes::Horizontal
            };
            return self.try_shifts(&path, index, axes, budget);
        }

        for corner in self.corners(&path, index, current_zone, next_zone) {
            let mut branch = path.clone();
            branch.insert(index + 1, corner);
            if let Some(done) = self.search(branch, index + 1, budget)? {
                return Ok(Some(done));
            }
        }
        self.try_shifts(&path, index, ShiftAxes::Both, budget)
    }

    /// Valid L-shaped corners for the diagonal leg at `index`, best first
    fn corners(
        &self,
        path: &[Coordinate],
        index: usize,
        current_zone: Zone,
        next_zone: Zone,
    ) -> Vec<Coordinate> {
        let current = path[index];
        let next = path[index + 1];
        let previous = index.checked_sub(1).map(|i| path[i]);

        // Horizontal-then-vertical first on equal crossings
        let mut corners: Vec<(usize, Coordinate)> = [
            Coordinate::new(next.x, current.y),
            Coordinate::new(current.x, next.y),
        ]
        .into_iter()
        .filter(|corner| Some(*corner) != previous)
        .filter(|corner| !self.zones.is_tower(corner))
        .filter_map(|corner| {
            let zone = self.zones.map_point(&corner);
            if zone == Zone::River || zone == Zone::Bridge {
                return None;
            }
            if current_zone == Zone::Bridge && zone != next_zone {
                return None;
            }
            if !self.zones.leg_clear(&current, &corner) || !self.zones.leg_clear(&corner, &next) {
                return None;
            }
            let crossings =
                usize::from(zone != current_zone) + usize::from(zone != next_zone);
            Some((crossings, corner))
        })
        .collect();

        corners.sort_by_key(|&(crossings, _)| crossings);
        corners.into_iter().map(|(_, corner)| corner).collect()
    }

    /// Detour through up to eight shifts of the point at `index`
    fn try_shifts(
        &self,
        path: &[Coordinate],
        index: usize,
        axes: ShiftAxes,
        budget: &mut SearchBudget,
    ) -> Result<Option<Vec<Coordinate>>, RoutingError> {
        let current = path[index];
        let next = path[index + 1];
        let previous = index.checked_sub(1).map(|i| path[i]);
        let tile = self.zones.tile();

        let mut used = axes.excluded();
        while let Some((option, bit)) = close_shift(&current, &next, used, tile) {
            used |= bit;
            if Some(option) == previous || !self.zones.is_passable(&option) {
                continue;
            }
            if !self.zones.leg_clear(&current, &option) {
                continue;
            }

            let mut branch = path.to_vec();
            branch.insert(index + 1, option);
            if let Some(done) = self.search(branch, index + 1, budget)? {
                return Ok(Some(done));
            }
        }

        tracing::trace!("No shift of {} reaches {}", current, next);
        Ok(None)
    }
}
