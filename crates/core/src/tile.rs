//! Tile kinds, edge labels and the catalog of rotated tile variants. Every tile
//! is described by the label on each of its 6 sides; two tiles may sit next to
//! each other only if the labels on their shared side are equal.

use crate::hex::HexDirection;
use anyhow::{anyhow, bail};
use derive_more::Display;
use fnv::FnvBuildHasher;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString, IntoEnumIterator};

/// The label on one side of a tile.
#[derive(
    Copy,
    Clone,
    Debug,
    Display,
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
pub enum EdgeType {
    Grass,
    Road,
    River,
    Water,
    Coast,
    Wall,
    /// The side of a wall tile that faces into the settlement
    Inside,
    /// The side of a wall tile that faces away from the settlement
    Outside,
}

/// The 6 edge labels of a tile, in side-index order (see [HexDirection]).
pub type Edges = [EdgeType; 6];

/// Every kind of tile that can be placed. Ground kinds are laid down by the
/// WFC solver, wall kinds by the wall ring generator.
#[derive(
    Copy,
    Clone,
    Debug,
    Display,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TileKind {
    // Ground
    Grass,
    Water,
    Coast,
    CoastCorner,
    CoastInner,
    RoadStraight,
    RoadCorner,
    RoadEnd,
    RoadJunction,
    RiverStraight,
    RiverCorner,
    RiverSource,
    RoadRiverCrossing,

    // Walls
    WallStraight,
    WallCornerOuter,
    WallCornerInner,
    WallSharpOuter,
    WallSharpInner,
    WallGate,
}

impl TileKind {
    /// The wall kinds that make up a ring. Gates are excluded, since they are
    /// only ever substituted in after the ring is classified.
    pub const WALLS: [Self; 5] = [
        Self::WallStraight,
        Self::WallCornerOuter,
        Self::WallCornerInner,
        Self::WallSharpOuter,
        Self::WallSharpInner,
    ];

    /// Is this one of the wall kinds (including gates)?
    pub fn is_wall(self) -> bool {
        Self::WALLS.contains(&self) || self == Self::WallGate
    }

    /// Every kind that the WFC solver can place by default
    pub fn ground() -> impl Iterator<Item = TileKind> {
        Self::iter().filter(|kind| !kind.is_wall())
    }
}

/// Rotate a set of edges by `steps` sixths of a turn. The edge on side `i`
/// moves to side `i + steps`, so the edge that was at index `6 - steps` ends up
/// at index 0. `steps` is taken modulo 6.
pub fn rotate_edges(edges: Edges, steps: usize) -> Edges {
    let mut rotated = edges;
    rotated.rotate_right(steps % 6);
    rotated
}

/// The authored description of a tile kind, at its canonical (unrotated)
/// orientation.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileRule {
    pub kind: TileKind,
    pub edges: Edges,
    /// Relative likelihood of the solver picking this kind. 0 is allowed, and
    /// means "only when nothing else fits".
    pub weight: f64,
}

impl TileRule {
    pub const fn new(kind: TileKind, edges: Edges, weight: f64) -> Self {
        Self {
            kind,
            edges,
            weight,
        }
    }

    /// Build the variant of this rule rotated by `rotation` steps
    pub fn variant(&self, rotation: u8) -> TileVariant {
        let rotation = rotation % 6;
        TileVariant {
            kind: self.kind,
            rotation,
            edges: rotate_edges(self.edges, rotation as usize),
            weight: self.weight,
        }
    }

    /// All 6 rotations of this rule
    pub fn variants(&self) -> impl Iterator<Item = TileVariant> + '_ {
        (0..6).map(move |rotation| self.variant(rotation))
    }
}

/// Stable identifier of a variant: a kind plus a rotation in `0..6`. Cells
/// track their candidates by this ID rather than holding variants directly.
#[derive(
    Copy,
    Clone,
    Debug,
    Display,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
#[display(fmt = "{}@{}", kind, rotation)]
pub struct VariantId {
    pub kind: TileKind,
    pub rotation: u8,
}

impl VariantId {
    pub fn new(kind: TileKind, rotation: u8) -> Self {
        Self {
            kind,
            rotation: rotation % 6,
        }
    }
}

/// A [TileRule] rotated by one of the 6 discrete steps.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileVariant {
    pub kind: TileKind,
    pub rotation: u8,
    pub edges: Edges,
    pub weight: f64,
}

impl TileVariant {
    pub fn id(&self) -> VariantId {
        VariantId::new(self.kind, self.rotation)
    }

    /// The edge label this variant presents in the given direction
    pub fn edge(&self, direction: HexDirection) -> EdgeType {
        self.edges[direction.index()]
    }
}

/// An ordered lookup of variants by ID
pub type VariantMap = IndexMap<VariantId, TileVariant, FnvBuildHasher>;

/// The set of authored rules, one per tile kind.
#[derive(Clone, Debug)]
pub struct TileCatalog {
    rules: IndexMap<TileKind, TileRule, FnvBuildHasher>,
}

impl TileCatalog {
    /// Build a catalog from a list of rules. Returns an error if a kind is
    /// listed twice or a weight is negative/non-finite.
    pub fn new(
        rules: impl IntoIterator<Item = TileRule>,
    ) -> anyhow::Result<Self> {
        let mut map = IndexMap::default();
        for rule in rules {
            if !rule.weight.is_finite() || rule.weight < 0.0 {
                bail!("invalid weight {} for {}", rule.weight, rule.kind);
            }
            if map.insert(rule.kind, rule).is_some() {
                bail!("duplicate rule for {}", rule.kind);
            }
        }
        Ok(Self { rules: map })
    }

    pub fn rule(&self, kind: TileKind) -> anyhow::Result<&TileRule> {
        self.rules
            .get(&kind)
            .ok_or_else(|| anyhow!("no rule for tile kind {}", kind))
    }

    pub fn rules(&self) -> impl Iterator<Item = &TileRule> {
        self.rules.values()
    }

    /// Build every rotation of every given kind. Kinds are visited in the
    /// given order (duplicates ignored), rotations 0 through 5 within each.
    /// Returns an error if a kind has no rule in this catalog.
    pub fn variants(
        &self,
        kinds: impl IntoIterator<Item = TileKind>,
    ) -> anyhow::Result<VariantMap> {
        let mut variants = VariantMap::default();
        for kind in kinds {
            for variant in self.rule(kind)?.variants() {
                variants.insert(variant.id(), variant);
            }
        }
        Ok(variants)
    }
}

impl Default for TileCatalog {
    fn default() -> Self {
        use EdgeType::{
            Coast as C, Grass as G, Inside as I, Outside as O, River as V,
            Road as R, Wall as L, Water as W,
        };
        use TileKind::*;

        let rules = [
            TileRule::new(Grass, [G, G, G, G, G, G], 12.0),
            TileRule::new(Water, [W, W, W, W, W, W], 4.0),
            // A coast edge always has water on one side and land on the
            // other; walking the sides in index order, water follows the
            // first coast edge and land follows the second
            TileRule::new(Coast, [C, W, W, C, G, G], 2.0),
            TileRule::new(CoastCorner, [C, W, C, G, G, G], 1.0),
            TileRule::new(CoastInner, [C, W, W, W, C, G], 1.0),
            TileRule::new(RoadStraight, [R, G, G, R, G, G], 3.0),
            TileRule::new(RoadCorner, [R, G, R, G, G, G], 2.0),
            TileRule::new(RoadEnd, [R, G, G, G, G, G], 1.0),
            TileRule::new(RoadJunction, [R, G, R, G, R, G], 1.0),
            TileRule::new(RiverStraight, [V, G, G, V, G, G], 2.0),
            TileRule::new(RiverCorner, [V, G, V, G, G, G], 1.0),
            TileRule::new(RiverSource, [V, G, G, G, G, G], 0.5),
            TileRule::new(RoadRiverCrossing, [V, R, G, V, R, G], 0.5),
            TileRule::new(WallStraight, [L, O, O, L, I, I], 1.0),
            TileRule::new(WallCornerOuter, [L, I, L, O, O, O], 1.0),
            TileRule::new(WallCornerInner, [L, O, L, I, I, I], 1.0),
            TileRule::new(WallSharpOuter, [L, L, O, O, O, O], 1.0),
            TileRule::new(WallSharpInner, [L, L, I, I, I, I], 1.0),
            TileRule::new(WallGate, [L, O, O, L, I, I], 1.0),
        ];
        // Every kind has exactly one rule above, so this can't fail
        Self {
            rules: rules.iter().map(|rule| (rule.kind, *rule)).collect(),
        }
    }
}
