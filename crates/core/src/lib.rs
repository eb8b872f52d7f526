//! Hexstead procedurally lays out hex tile-based settlements. This crate
//! contains all the generation logic; presentation is left to the consumer,
//! which gets back plain data: typed tiles with rotations and positions, plus a
//! step-by-step trace of the ground solver for animated playback.
//!
//! ```
//! use hexstead::{Settlement, SettlementConfig};
//!
//! let config = SettlementConfig::default();
//! let settlement = Settlement::generate(config).unwrap();
//! println!("{}", settlement.tiles().len());
//! // From here you can display/use the settlement however you like.
//! ```
//!
//! There are three generators, each usable on its own:
//! - [WfcSolver] fills a hex grid with ground tiles whose edges all match up
//! - [WallGenerator] traces a closed wall ring around a center point
//! - [find_islands] splits a set of free tiles into connected regions
//!
//! See [SettlementConfig] for details on how generation can be customized.

pub mod config;
pub mod hex;
mod island;
mod settlement;
pub mod tile;
mod util;
mod wall;
pub mod wfc;

pub use crate::{
    config::{
        GateRule, PredefinedTile, Seed, SettlementConfig, WallConfig, WfcConfig,
    },
    hex::{HexCoord, HexDirection},
    island::{find_islands, find_islands_with_min_size, Island},
    settlement::Settlement,
    tile::{EdgeType, TileCatalog, TileKind, TileRule, TileVariant, VariantId},
    wall::{WallGenerator, WallLayout, WallTile},
    wfc::{
        GenerateError, PlacedTile, Progress, SolverHandle, Step, WfcSolver,
    },
};
