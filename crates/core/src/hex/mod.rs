//! This module holds basic types and data structures related to hexagon grids.
//!
//! ## Coordinate System
//!
//! Positions use the axial coordinate system described by
//! [Amit Patel](https://www.redblobgames.com/grids/hexagons/#coordinates-axial).
//! Each position has two components, `q` and `r`. A third component
//! `s = -q - r` is implied, which makes distance and rounding math easy.
//!
//! Each tile has 6 sides, indexed `0..6`. Side 0 faces 0° (towards `+q`), and
//! each following index is 60° further around the tile. Stepping across side
//! `i` applies the offset at index `i` of this table:
//!
//! ```text
//! (+1, 0), (+1, -1), (0, -1), (-1, 0), (-1, +1), (0, +1)
//! ```
//!
//! See [HexDirection] for the named directions.
//!
//! ## Disks and Rings
//!
//! A *disk* of radius `r` around a center is every position within `r` steps
//! of it (so radius 0 is just the center, radius 1 is 7 tiles, and so on). A
//! *ring* of radius `r` is only the positions at exactly `r` steps.

mod unit;

pub use self::unit::*;
use fnv::FnvBuildHasher;
use indexmap::{IndexMap, IndexSet};
use std::{
    cmp,
    collections::{HashMap, HashSet},
};

/// A set of hex positions
pub type HexCoordSet = HashSet<HexCoord, FnvBuildHasher>;
/// A map of hex positions to some `T`
pub type HexCoordMap<T> = HashMap<HexCoord, T, FnvBuildHasher>;
/// An ORDERED map of hex positions to some `T`. This has some extra memory
/// overhead, so we should only use it when we actually need the ordering.
pub type HexCoordIndexMap<T> = IndexMap<HexCoord, T, FnvBuildHasher>;
/// An ORDERED set of hex positions. Same caveat as [HexCoordIndexMap].
pub type HexCoordIndexSet = IndexSet<HexCoord, FnvBuildHasher>;

/// Calculate the number of tiles in a disk based on its radius. Radius 0 means
/// 1 tile, 1 is 7 tiles, 2 is 19, etc.
pub fn disk_len(radius: u32) -> usize {
    // We'll always have 3r^2+3r+1 tiles (a reduction of a geometric sum).
    // f(0) = 1, and we add 6r tiles for every step after that, so:
    // 1, (+6) 7, (+12) 19, (+18) 37, ...
    let r = radius as usize;
    3 * r * r + 3 * r + 1
}

/// Get every position within `radius` steps of `center`. Positions are
/// ordered by `q`, then `r`.
pub fn disk_coords(
    center: HexCoord,
    radius: u32,
) -> impl Iterator<Item = HexCoord> {
    let r = radius as i32;
    (-r..=r).flat_map(move |q| {
        // If we just do [-r,r] for the second component as well, then we end
        // up with a diamond pattern instead of a hexagon
        // https://www.redblobgames.com/grids/hexagons/#range
        let r_min = cmp::max(-r, -q - r);
        let r_max = cmp::min(r, -q + r);
        (r_min..=r_max).map(move |dr| center + HexCoord::new(q, dr))
    })
}

/// Get every position exactly `radius` steps from `center`, walking around the
/// ring in order. The walk starts at the south-west corner and heads east, so
/// consecutive positions are always adjacent, and the last position is
/// adjacent to the first. A radius of 0 gives just the center.
pub fn ring_coords(center: HexCoord, radius: u32) -> Vec<HexCoord> {
    if radius == 0 {
        return vec![center];
    }

    let r = radius as i32;
    let start = HexDirection::SouthWest.offset();
    let mut pos = center + HexCoord::new(start.q * r, start.r * r);
    let mut ring = Vec::with_capacity(6 * radius as usize);
    for dir in HexDirection::ALL {
        for _ in 0..radius {
            ring.push(pos);
            pos = pos.neighbor(dir);
        }
    }
    ring
}
