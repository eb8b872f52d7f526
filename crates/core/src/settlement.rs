use crate::{
    config::{Seed, SettlementConfig},
    island::{self, Island},
    tile::TileCatalog,
    timed,
    wall::{WallGenerator, WallLayout},
    wfc::{GenerateError, PlacedTile, Step, WfcSolver},
};
use anyhow::Context;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A fully generated settlement: the ground layout, the wall around it, and
/// the open regions inside the wall. Also holds the config that produced it,
/// since generation is deterministic for a given config.
///
/// ## Serialization
/// Settlements can be round-tripped through JSON with [Settlement::to_json]
/// and [Settlement::from_json] (requires the `json` feature). Coordinates are
/// serialized as `{"q": .., "r": ..}` objects and all enum values are
/// snake_case.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Settlement {
    config: SettlementConfig,
    tiles: Vec<PlacedTile>,
    /// The solver's trace, for playback
    steps: Vec<Step>,
    wall: WallLayout,
    /// Islands inside the wall, largest first
    islands: Vec<Island>,
}

impl Settlement {
    /// Generate a settlement with the default tile catalog. Returns an error
    /// if the config is invalid or the ground solver fails.
    pub fn generate(config: SettlementConfig) -> anyhow::Result<Self> {
        Self::generate_with_catalog(config, TileCatalog::default())
    }

    /// Generate a settlement using a custom tile catalog. The catalog needs
    /// every kind the config refers to, plus all the wall kinds.
    pub fn generate_with_catalog(
        config: SettlementConfig,
        catalog: TileCatalog,
    ) -> anyhow::Result<Self> {
        info!("Generating settlement with config {:#?}", config);

        config.validate().context("invalid config")?;
        let wall_generator = WallGenerator::new(&catalog, config.gates.clone())
            .context("invalid wall config")?;

        let mut solver = WfcSolver::new(catalog);
        timed!(
            "Ground generation",
            log::Level::Info,
            generate_ground(&mut solver, &config)
        )?;
        let tiles = solver.result_tiles();
        let steps = solver.take_steps();

        let wall =
            timed!("Wall generation", wall_generator.generate(&config.wall));
        let islands = timed!(
            "Island search",
            island::find_islands_with_min_size(
                wall.inside_tiles.iter().copied(),
                config.island_min_size,
            )
        );

        info!(
            "Settlement has {} ground tiles, {} wall tiles and {} islands",
            tiles.len(),
            wall.wall_tiles.len(),
            islands.len()
        );
        Ok(Self {
            config,
            tiles,
            steps,
            wall,
            islands,
        })
    }

    pub fn config(&self) -> &SettlementConfig {
        &self.config
    }

    /// The solved ground layout, one tile per grid cell
    pub fn tiles(&self) -> &[PlacedTile] {
        &self.tiles
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn wall(&self) -> &WallLayout {
        &self.wall
    }

    pub fn islands(&self) -> &[Island] {
        &self.islands
    }

    /// Serialize this settlement into JSON. This can be loaded back with
    /// [Settlement::from_json].
    #[cfg(feature = "json")]
    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string(self).context("error serializing settlement")
    }

    /// Deserialize a settlement from JSON. Will fail if the input is
    /// malformed.
    #[cfg(feature = "json")]
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("error deserializing settlement")
    }
}

/// Run the ground solver, reseeding and retrying whenever it hits a
/// contradiction. Any other failure ends the run right away.
fn generate_ground(
    solver: &mut WfcSolver,
    config: &SettlementConfig,
) -> anyhow::Result<()> {
    let base_seed = config.wfc.seed.to_u64();
    let mut wfc_config = config.wfc.clone();
    for attempt in 0..config.ground_attempts {
        wfc_config.seed = Seed::Int(base_seed.wrapping_add(attempt.into()));
        solver.configure(&wfc_config)?;
        match solver.generate() {
            Ok(()) => {
                info!("Ground solved on attempt {}", attempt + 1);
                return Ok(());
            }
            Err(err @ GenerateError::Contradiction { .. }) => {
                warn!("Ground attempt {} failed: {}", attempt + 1, err);
            }
            Err(err) => {
                return Err(err).context("ground generation failed");
            }
        }
    }
    anyhow::bail!(
        "ground generation failed after {} attempts",
        config.ground_attempts
    )
}
