//! Discrete size levels shared by Lumia and enemies.
//!
//! Every size change in the game is a move between entries of [`SIZE_LEVELS`]:
//! plants and spikes cost one level, energy grants one, merges add levels and
//! splits divide them.  Nothing ever holds an arbitrary radius.
//!
//! The helpers here never index outside `[0, MAX_SIZE_LEVEL]`; callers that
//! could push a level past either end get a clamped value or an explicit
//! `None` telling them the body has to die or stay as it is.

use crate::error::{LumiaError, LumiaResult};
use bevy::prelude::*;

/// One row of the size table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeLevel {
    /// Collider radius (u).
    pub radius: f32,
    /// Collider density handed to Rapier.
    pub density: f32,
}

impl SizeLevel {
    /// Mass of a disc of this radius and density.
    #[inline]
    pub fn mass(&self) -> f32 {
        self.density * std::f32::consts::PI * self.radius * self.radius
    }
}

/// The fixed size table, smallest first.  Radii are strictly increasing.
pub const SIZE_LEVELS: [SizeLevel; 6] = [
    SizeLevel { radius: 10.0, density: 1.00 },
    SizeLevel { radius: 14.0, density: 0.90 },
    SizeLevel { radius: 18.0, density: 0.80 },
    SizeLevel { radius: 23.0, density: 0.70 },
    SizeLevel { radius: 29.0, density: 0.60 },
    SizeLevel { radius: 36.0, density: 0.50 },
];

/// Smallest viable level; shrinking below it destroys the body.
pub const MIN_SIZE_LEVEL: usize = 0;

/// Largest level; anything bigger overflows into a second body.
pub const MAX_SIZE_LEVEL: usize = SIZE_LEVELS.len() - 1;

/// Table row for `level`, clamped to the largest entry.
#[inline]
pub fn size_level(level: usize) -> SizeLevel {
    SIZE_LEVELS[level.min(MAX_SIZE_LEVEL)]
}

/// Radius for `level`, clamped to the largest entry.
#[inline]
pub fn radius_of(level: usize) -> f32 {
    size_level(level).radius
}

/// Reject levels that would index past the table (used on level data).
pub fn checked_size_level(level: usize) -> LumiaResult<usize> {
    if level <= MAX_SIZE_LEVEL {
        Ok(level)
    } else {
        Err(LumiaError::SizeLevelOutOfRange {
            level,
            max: MAX_SIZE_LEVEL,
        })
    }
}

/// One level up, clamped at the table maximum.
#[inline]
pub fn bigger_size_level(level: usize) -> usize {
    (level + 1).min(MAX_SIZE_LEVEL)
}

/// One level down, clamped at the table minimum.
#[inline]
pub fn smaller_size_level(level: usize) -> usize {
    level.saturating_sub(1).min(MAX_SIZE_LEVEL)
}

/// One level down, or `None` when the body is already at the minimum and
/// must be destroyed instead.
#[inline]
pub fn shrunk_size_level(level: usize) -> Option<usize> {
    if level > MIN_SIZE_LEVEL {
        Some(smaller_size_level(level))
    } else {
        None
    }
}

/// Result of moving a body from one level to another.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resize {
    pub level: usize,
    /// New radius minus old radius; negative when shrinking.
    pub radius_delta: f32,
    /// Offset to add to the body centre so its lowest point stays put.
    pub position_offset: Vec2,
}

/// Size change from `from` to `to`, keeping the footprint on the ground.
pub fn resize(from: usize, to: usize) -> Resize {
    let to = to.min(MAX_SIZE_LEVEL);
    let radius_delta = radius_of(to) - radius_of(from);
    Resize {
        level: to,
        radius_delta,
        position_offset: Vec2::new(0.0, radius_delta),
    }
}

/// What a merge of two bodies turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// One body at the combined level.
    Single(usize),
    /// The combined level did not fit: one body at the maximum plus a
    /// remainder body.
    Overflow { primary: usize, overflow: usize },
}

/// Combined level of two merging bodies: `a + b + 1`.
///
/// Returns `None` when either input is already at the maximum; such pairs do
/// not merge at all.
pub fn merge_levels(a: usize, b: usize) -> Option<MergeOutcome> {
    if a >= MAX_SIZE_LEVEL || b >= MAX_SIZE_LEVEL {
        return None;
    }
    let combined = a + b + 1;
    if combined <= MAX_SIZE_LEVEL {
        Some(MergeOutcome::Single(combined))
    } else {
        Some(MergeOutcome::Overflow {
            primary: MAX_SIZE_LEVEL,
            overflow: combined - (MAX_SIZE_LEVEL + 1),
        })
    }
}

/// Levels of the two halves of a split, the inverse of a bounded merge.
///
/// The halves sum to `level - 1`; the first half takes the larger share.
/// Level 0 cannot split.
pub fn split_levels(level: usize) -> Option<(usize, usize)> {
    let level = level.min(MAX_SIZE_LEVEL);
    if level == MIN_SIZE_LEVEL {
        return None;
    }
    let total = level - 1;
    let first = total.div_ceil(2);
    Some((first, total - first))
}
