//! Enemy pathfinding: occupancy grid, A* search and the behaviour state
//! machine that consumes them.

pub mod astar;
pub mod behavior;
pub mod grid;

pub use astar::find_path;
pub use behavior::{enemy_behavior_system, occupancy_update_system, PathfindingClock};
pub use grid::{CellState, OccupancyGrid};
