//! Sparse occupancy grid over the level.
//!
//! Only non-`Void` cells are stored.  Obstacles are rasterised once when the
//! level is populated; Lumia and enemy tags move incrementally as bodies
//! move, so the grid never needs a full rebuild.
//!
//! ## Cell size
//!
//! `path_cell_size` (see [`crate::constants::PATH_CELL_SIZE`]) trades path
//! resolution for search cost.  A* cost grows with the number of cells inside
//! the level bounds, which is `area / cell_size²`.

use crate::constants::PATH_CELL_SIZE;
use bevy::prelude::*;
use std::collections::HashMap;

/// What currently occupies a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellState {
    #[default]
    Void,
    Obstacle,
    Lumia,
    Enemy,
}

/// Resource holding the occupancy grid for the active level.
#[derive(Resource, Debug, Clone)]
pub struct OccupancyGrid {
    cell_size: f32,
    /// Inclusive cell bounds; everything outside reads as `Obstacle`.
    min: IVec2,
    max: IVec2,
    cells: HashMap<IVec2, CellState>,
    /// Last cell and tag of each tracked body.
    occupants: HashMap<Entity, (IVec2, CellState)>,
}

impl Default for OccupancyGrid {
    fn default() -> Self {
        Self::new(PATH_CELL_SIZE, Vec2::splat(-1000.0), Vec2::splat(1000.0))
    }
}

impl OccupancyGrid {
    /// Empty grid covering the world rectangle `[world_min, world_max]`.
    pub fn new(cell_size: f32, world_min: Vec2, world_max: Vec2) -> Self {
        let cell_size = cell_size.max(f32::EPSILON);
        Self {
            cell_size,
            min: (world_min / cell_size).floor().as_ivec2(),
            max: (world_max / cell_size).floor().as_ivec2(),
            cells: HashMap::new(),
            occupants: HashMap::new(),
        }
    }

    /// Drop every tag and obstacle and re-bound the grid.
    pub fn reset(&mut self, cell_size: f32, world_min: Vec2, world_max: Vec2) {
        *self = Self::new(cell_size, world_min, world_max);
    }

    #[inline]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    #[inline]
    pub fn world_to_cell(&self, pos: Vec2) -> IVec2 {
        (pos / self.cell_size).floor().as_ivec2()
    }

    /// World-space centre of `cell`.
    #[inline]
    pub fn cell_center(&self, cell: IVec2) -> Vec2 {
        (cell.as_vec2() + Vec2::splat(0.5)) * self.cell_size
    }

    #[inline]
    pub fn contains(&self, cell: IVec2) -> bool {
        cell.cmpge(self.min).all() && cell.cmple(self.max).all()
    }

    pub fn state(&self, cell: IVec2) -> CellState {
        if !self.contains(cell) {
            return CellState::Obstacle;
        }
        self.cells.get(&cell).copied().unwrap_or_default()
    }

    /// Cells an enemy may path through: empty ones and the ones a Lumia is in.
    #[inline]
    pub fn is_path_passable(&self, cell: IVec2) -> bool {
        matches!(self.state(cell), CellState::Void | CellState::Lumia)
    }

    pub fn mark_obstacle(&mut self, cell: IVec2) {
        if self.contains(cell) {
            self.cells.insert(cell, CellState::Obstacle);
        }
    }

    /// Mark every cell overlapped by an axis-aligned rectangle.
    pub fn mark_obstacle_rect(&mut self, center: Vec2, half_extents: Vec2) {
        let low = self.world_to_cell(center - half_extents);
        let high = ((center + half_extents) / self.cell_size).ceil().as_ivec2() - IVec2::ONE;
        for x in low.x..=high.x.max(low.x) {
            for y in low.y..=high.y.max(low.y) {
                self.mark_obstacle(IVec2::new(x, y));
            }
        }
    }

    /// Move `entity`'s tag to the cell containing `pos`.  The cell it was in
    /// before keeps the tag of any body still inside it, otherwise it goes
    /// back to `Void`.  Obstacles are never overwritten.
    pub fn track(&mut self, entity: Entity, pos: Vec2, state: CellState) {
        let cell = self.world_to_cell(pos);
        if let Some((previous, _)) = self.occupants.insert(entity, (cell, state)) {
            if previous != cell {
                self.clear_tag(previous);
            }
        }
        if self.contains(cell) && self.state(cell) != CellState::Obstacle {
            self.cells.insert(cell, state);
        }
    }

    /// Stop tracking `entity` and clear the cell it was tagged in.
    pub fn forget(&mut self, entity: Entity) {
        if let Some((previous, _)) = self.occupants.remove(&entity) {
            self.clear_tag(previous);
        }
    }

    /// Re-tag `cell` from whichever tracked body is still in it.
    fn clear_tag(&mut self, cell: IVec2) {
        if !self.cells.get(&cell).is_some_and(|s| *s != CellState::Obstacle) {
            return;
        }
        let remaining = self
            .occupants
            .values()
            .find(|(occupied, _)| *occupied == cell)
            .map(|(_, state)| *state);
        match remaining {
            Some(state) => {
                self.cells.insert(cell, state);
            }
            None => {
                self.cells.remove(&cell);
            }
        }
    }

    /// 4-connected in-bounds neighbours of `cell`.
    pub fn neighbors(&self, cell: IVec2) -> impl Iterator<Item = IVec2> + '_ {
        [IVec2::X, IVec2::NEG_X, IVec2::Y, IVec2::NEG_Y]
            .into_iter()
            .map(move |step| cell + step)
            .filter(|n| self.contains(*n))
    }
}
