mod seed;

pub use self::seed::Seed;
use crate::{
    hex::HexCoord,
    tile::{TileKind, VariantId},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Configuration for a single WFC solver run. Two runs with the same config
/// (and the same tile catalog) always produce the same layout.
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct WfcConfig {
    /// RNG seed for collapse order and variant selection
    pub seed: Seed,

    /// Distance from the center of the grid to its edge, in tiles. 0 means a
    /// single cell.
    #[validate(range(min = 0, max = 1000))]
    pub radius: u32,

    /// The tile kinds the solver may place. Every kind contributes all 6 of
    /// its rotations to the variant catalog.
    #[validate(length(min = 1))]
    pub allowed_kinds: Vec<TileKind>,

    /// How many times the solver may select a cell with no remaining
    /// variants before it gives up. `None` retries forever, which only ends
    /// when the run is stopped externally.
    pub max_contradiction_retries: Option<u32>,

    /// Tiles that are fixed before solving starts. Each must fall within the
    /// grid and use one of the allowed kinds.
    // Tables go last so this can be written as TOML
    pub predefined_tiles: Vec<PredefinedTile>,
}

/// A tile that is placed before solving, rather than chosen by the solver.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredefinedTile {
    pub kind: TileKind,
    /// Taken modulo 6
    pub rotation: u8,
    pub coord: HexCoord,
}

impl PredefinedTile {
    pub fn variant_id(&self) -> VariantId {
        VariantId::new(self.kind, self.rotation)
    }
}

/// Configuration for the wall ring generator.
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct WallConfig {
    /// RNG seed for ring perturbation and gate placement
    pub seed: Seed,

    /// Distance from the center to the unperturbed ring, in tiles
    #[validate(range(min = 0, max = 1000))]
    pub radius: u32,

    /// The furthest any ring tile can be pushed in or out of the exact ring
    #[validate(range(min = 0, max = 100))]
    pub max_offset: u32,

    /// The ring is traced around this position, which always ends up inside
    /// the wall
    pub center: HexCoord,
}

/// A rule to swap some wall tiles for gates.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
pub struct GateRule {
    /// The kind to place
    pub kind: TileKind,
    /// The kind being swapped out. The rotation carries over.
    pub replaces: TileKind,
    /// Independent chance, per eligible tile, of substitution
    #[validate(range(min = 0.0, max = 1.0))]
    pub probability: f64,
}

/// Configuration for a full settlement: the ground layout, the wall around
/// it, and the buildable regions inside the wall.
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SettlementConfig {
    /// Islands whose center can't fit a fully available disk of this radius
    /// are discarded
    pub island_min_size: u32,

    /// How many times to run the ground solver before giving up on
    /// contradictions. Each attempt after the first bumps the seed by one.
    #[validate(range(min = 1, max = 1000))]
    pub ground_attempts: u32,

    #[validate]
    pub wfc: WfcConfig,

    #[validate]
    pub wall: WallConfig,

    /// Gate substitutions, applied in order
    pub gates: Vec<GateRule>,
}

impl Default for WfcConfig {
    fn default() -> Self {
        Self {
            seed: Seed::default(),
            radius: 8,
            allowed_kinds: TileKind::ground().collect(),
            predefined_tiles: Vec::new(),
            max_contradiction_retries: Some(64),
        }
    }
}

impl Default for WallConfig {
    fn default() -> Self {
        Self {
            seed: Seed::default(),
            center: HexCoord::ORIGIN,
            radius: 5,
            max_offset: 1,
        }
    }
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            island_min_size: 1,
            ground_attempts: 16,
            wfc: WfcConfig::default(),
            wall: WallConfig::default(),
            gates: vec![GateRule {
                kind: TileKind::WallGate,
                replaces: TileKind::WallStraight,
                probability: 0.1,
            }],
        }
    }
}
