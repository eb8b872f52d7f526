use crate::{
    hex::HexCoord,
    tile::{TileKind, VariantId},
};
use fnv::FnvBuildHasher;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// An ordered set of variant IDs. Order matters: weighted selection walks the
/// candidates in this order, which keeps seeded runs reproducible.
pub type VariantSet = IndexSet<VariantId, FnvBuildHasher>;

/// One position in the solver grid, along with every variant that could still
/// go there.
///
/// A cell's entropy is simply the number of remaining candidates (no Shannon
/// entropy here). A cell is collapsed exactly when one candidate remains. A
/// cell with zero candidates is a contradiction, and counts as uncollapsed.
#[derive(Clone, Debug)]
pub struct Cell {
    coord: HexCoord,
    possible: VariantSet,
}

impl Cell {
    pub(super) fn new(
        coord: HexCoord,
        variants: impl IntoIterator<Item = VariantId>,
    ) -> Self {
        Self {
            coord,
            possible: variants.into_iter().collect(),
        }
    }

    pub fn coord(&self) -> HexCoord {
        self.coord
    }

    /// Every variant this cell could still become
    pub fn possible_variants(&self) -> &VariantSet {
        &self.possible
    }

    pub fn entropy(&self) -> usize {
        self.possible.len()
    }

    pub fn is_collapsed(&self) -> bool {
        self.possible.len() == 1
    }

    /// The variant this cell resolved to, if it's collapsed
    pub fn resolved(&self) -> Option<VariantId> {
        if self.is_collapsed() {
            self.possible.get_index(0).copied()
        } else {
            None
        }
    }

    pub fn resolved_kind(&self) -> Option<TileKind> {
        self.resolved().map(|id| id.kind)
    }

    pub fn resolved_rotation(&self) -> Option<u8> {
        self.resolved().map(|id| id.rotation)
    }

    /// Package up the resolved variant as an output tile
    pub fn placed(&self) -> Option<PlacedTile> {
        self.resolved().map(|id| PlacedTile {
            kind: id.kind,
            rotation: id.rotation,
            position: self.coord,
        })
    }

    /// Commit this cell to a single variant
    pub(super) fn collapse_to(&mut self, variant: VariantId) {
        self.possible.clear();
        self.possible.insert(variant);
    }

    /// Drop every candidate that fails the predicate. Returns whether anything
    /// was removed.
    pub(super) fn retain(
        &mut self,
        mut keep: impl FnMut(&VariantId) -> bool,
    ) -> bool {
        let before = self.possible.len();
        self.possible.retain(|id| keep(id));
        self.possible.len() != before
    }

    pub(super) fn snapshot(&self) -> CellSnapshot {
        CellSnapshot {
            coord: self.coord,
            entropy: self.entropy(),
            variants: self.possible.iter().copied().collect(),
        }
    }
}

/// A final tile in the solved layout.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedTile {
    pub kind: TileKind,
    pub rotation: u8,
    pub position: HexCoord,
}

/// The state of one uncollapsed cell at a point in the trace.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellSnapshot {
    pub coord: HexCoord,
    pub entropy: usize,
    pub variants: Vec<VariantId>,
}

/// One entry in the solver's trace, for animated playback. Steps are only
/// ever appended; the solver never reads them back.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// The tile that was collapsed (or force-placed) in this step
    pub placed: Option<PlacedTile>,
    /// Cells that propagation narrowed down to a single variant as a side
    /// effect of this step
    pub propagated: Vec<PlacedTile>,
    /// Every cell still uncollapsed after this step
    pub cells: Vec<CellSnapshot>,
}
