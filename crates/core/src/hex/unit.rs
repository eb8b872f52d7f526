//! Basic units of the axial hex coordinate system. See the parent module
//! documentation for a description of the coordinate system.

use derive_more::{Add, AddAssign, Display, Sub};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use strum::{EnumIter, IntoEnumIterator};

/// A single tile position in the axial coordinate system. The implicit third
/// cube component is `s = -q - r`, so only two components are stored.
///
/// The display form, `q,r`, doubles as the coordinate's key anywhere a textual
/// key is needed, e.g. when handing coordinates off to an external renderer.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Add,
    AddAssign,
    Sub,
    Display,
    Serialize,
    Deserialize,
)]
#[display(fmt = "{},{}", q, r)]
pub struct HexCoord {
    pub q: i32,
    pub r: i32,
}

impl HexCoord {
    pub const ORIGIN: Self = Self::new(0, 0);

    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// The derived third cube component
    pub fn s(self) -> i32 {
        -self.q - self.r
    }

    /// Get the position one step away in the given direction
    pub fn neighbor(self, direction: HexDirection) -> Self {
        self + direction.offset()
    }

    /// Get an iterator of all the positions directly adjacent to this one,
    /// in [HexDirection] order. Always yields exactly 6 values.
    pub fn neighbors(self) -> impl Iterator<Item = HexCoord> {
        HexDirection::iter().map(move |dir| self.neighbor(dir))
    }

    /// Number of single-tile hops between two positions. 0 if they are
    /// equal, 1 if adjacent, and so on.
    pub fn distance_to(self, other: HexCoord) -> u32 {
        // https://www.redblobgames.com/grids/hexagons/#distances
        let diff = self - other;
        ((diff.q.abs() + diff.r.abs() + diff.s().abs()) / 2) as u32
    }

    /// If `other` is directly adjacent to this position, get the direction
    /// that leads to it
    pub fn direction_to(self, other: HexCoord) -> Option<HexDirection> {
        HexDirection::iter().find(|dir| self.neighbor(*dir) == other)
    }

    /// Round a fractional axial position to the tile that contains it. Plain
    /// per-component rounding can land off the `q + r + s = 0` plane, so the
    /// component with the largest rounding error gets rederived from the
    /// other two.
    pub fn round(q: f64, r: f64) -> Self {
        // https://www.redblobgames.com/grids/hexagons/#rounding
        let s = -q - r;
        let (mut rq, mut rr, rs) = (q.round(), r.round(), s.round());
        let dq = (rq - q).abs();
        let dr = (rr - r).abs();
        let ds = (rs - s).abs();
        if dq > dr && dq > ds {
            rq = -rr - rs;
        } else if dr > ds {
            rr = -rq - rs;
        }
        Self::new(rq as i32, rr as i32)
    }
}

/// One of the 6 side-to-side directions between hex tiles. The discriminant is
/// the side index used by tile edge signatures: index 0 sits at 0°, and each
/// following index is 60° further around.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum HexDirection {
    East = 0,
    NorthEast = 1,
    NorthWest = 2,
    West = 3,
    SouthWest = 4,
    SouthEast = 5,
}

impl HexDirection {
    /// All directions in side-index order
    pub const ALL: [Self; 6] = [
        Self::East,
        Self::NorthEast,
        Self::NorthWest,
        Self::West,
        Self::SouthWest,
        Self::SouthEast,
    ];

    /// Get the direction for a side index. The index is taken modulo 6.
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 6]
    }

    /// Side index of this direction, in `0..6`
    pub fn index(self) -> usize {
        self as usize
    }

    /// The axial offset that moves a position one tile in this direction
    pub fn offset(self) -> HexCoord {
        match self {
            Self::East => HexCoord::new(1, 0),
            Self::NorthEast => HexCoord::new(1, -1),
            Self::NorthWest => HexCoord::new(0, -1),
            Self::West => HexCoord::new(-1, 0),
            Self::SouthWest => HexCoord::new(-1, 1),
            Self::SouthEast => HexCoord::new(0, 1),
        }
    }

    /// The direction pointing the other way, i.e. `(index + 3) mod 6`
    pub fn opposite(self) -> Self {
        Self::from_index(self.index() + 3)
    }

    /// Rotate this direction by `steps` sixths of a turn
    pub fn rotate(self, steps: usize) -> Self {
        Self::from_index(self.index() + steps)
    }
}
