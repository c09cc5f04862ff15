//! A* over the [`OccupancyGrid`].
//!
//! 4-connected moves with uniform cost 1 and the Manhattan distance as the
//! heuristic, which is admissible and consistent on that move set.  Among
//! frontier cells with equal `f = g + h` the one pushed first is expanded
//! first.

use super::grid::OccupancyGrid;
use bevy::prelude::*;
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Frontier {
    f: u32,
    seq: u64,
    cell: IVec2,
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.f, self.seq).cmp(&(other.f, other.seq))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[inline]
pub fn manhattan(a: IVec2, b: IVec2) -> u32 {
    let d = (a - b).abs();
    (d.x + d.y) as u32
}

/// Shortest path from `start` to `goal`, both included.
///
/// Intermediate cells must be [`OccupancyGrid::is_path_passable`]; the goal
/// is always enterable since it is where the target sits.  Returns `None`
/// when the frontier runs out first, for example when the goal is walled in.
pub fn find_path(grid: &OccupancyGrid, start: IVec2, goal: IVec2) -> Option<Vec<IVec2>> {
    if !grid.contains(start) || !grid.contains(goal) {
        return None;
    }
    if start == goal {
        return Some(vec![start]);
    }

    let mut open = BinaryHeap::new();
    let mut came_from: HashMap<IVec2, IVec2> = HashMap::new();
    let mut best_g: HashMap<IVec2, u32> = HashMap::new();
    let mut seq = 0_u64;

    best_g.insert(start, 0);
    open.push(Reverse(Frontier {
        f: manhattan(start, goal),
        seq,
        cell: start,
    }));

    while let Some(Reverse(Frontier { f, cell, .. })) = open.pop() {
        if cell == goal {
            return Some(reconstruct(&came_from, start, goal));
        }
        let g = best_g.get(&cell).copied().unwrap_or(u32::MAX);
        // Stale entry left behind by a cheaper push of the same cell.
        if f > g.saturating_add(manhattan(cell, goal)) {
            continue;
        }
        for next in grid.neighbors(cell) {
            if next != goal && !grid.is_path_passable(next) {
                continue;
            }
            let tentative = g + 1;
            if best_g.get(&next).is_some_and(|&known| known <= tentative) {
                continue;
            }
            best_g.insert(next, tentative);
            came_from.insert(next, cell);
            seq += 1;
            open.push(Reverse(Frontier {
                f: tentative + manhattan(next, goal),
                seq,
                cell: next,
            }));
        }
    }
    None
}

fn reconstruct(came_from: &HashMap<IVec2, IVec2>, start: IVec2, goal: IVec2) -> Vec<IVec2> {
    let mut path = vec![goal];
    let mut cell = goal;
    while cell != start {
        match came_from.get(&cell) {
            Some(&previous) => {
                path.push(previous);
                cell = previous;
            }
            None => break,
        }
    }
    path.reverse();
    path
}
