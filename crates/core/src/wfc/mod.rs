//! A Wave-Function-Collapse solver over a hexagonal grid.
//!
//! The solver is greedy: it repeatedly collapses the cell with the fewest
//! remaining candidates (ties broken at random), picks one of that cell's
//! variants by weight, and then propagates edge constraints outward to the
//! neighbors. There's no backtracking. A cell that runs out of candidates is a
//! contradiction, which the solver can't fix; see
//! [WfcConfig::max_contradiction_retries] for how that's handled.
//!
//! ```
//! use hexstead::{TileCatalog, TileKind, WfcConfig, WfcSolver};
//!
//! let mut solver = WfcSolver::new(TileCatalog::default());
//! solver
//!     .configure(&WfcConfig {
//!         seed: 42.into(),
//!         radius: 3,
//!         allowed_kinds: vec![TileKind::Grass, TileKind::Water],
//!         ..Default::default()
//!     })
//!     .unwrap();
//! solver.generate().unwrap();
//! assert_eq!(solver.result_tiles().len(), 37);
//! ```

mod cell;

pub use self::cell::{Cell, CellSnapshot, PlacedTile, Step, VariantSet};
use crate::{
    config::{PredefinedTile, WfcConfig},
    hex::{self, HexCoord, HexCoordIndexMap, HexDirection},
    tile::{EdgeType, TileCatalog, VariantId, VariantMap},
    timed,
    util::weighted_choice,
};
use anyhow::{bail, Context};
use derive_more::Display;
use fnv::FnvBuildHasher;
use log::{debug, info, trace, warn};
use rand::Rng;
use rand_pcg::Pcg64;
use std::{
    collections::{HashSet, VecDeque},
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    task::Poll,
};
use validator::Validate;

/// Why a solver run failed. Every failure is local to the run; build a new
/// solver (or reconfigure this one) to try again.
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq)]
pub enum GenerateError {
    #[display(fmt = "solver has not been configured")]
    NotConfigured,
    #[display(fmt = "solver is already generating")]
    AlreadyGenerating,
    #[display(fmt = "generation was cancelled")]
    Cancelled,
    /// A predefined tile couldn't be placed, or placing it emptied a
    /// neighboring cell
    #[display(fmt = "predefined tile at {} conflicts with its neighbors", coord)]
    PredefinedConflict { coord: HexCoord },
    /// A cell ran out of candidates and the retry limit was hit
    #[display(
        fmt = "contradiction at {} still unresolved after {} retries",
        coord,
        retries
    )]
    Contradiction { coord: HexCoord, retries: u32 },
}

impl std::error::Error for GenerateError {}

/// A snapshot of how far along a run is, handed to the progress callback of
/// [WfcSolver::generate_async].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Progress {
    pub collapsed: usize,
    pub total: usize,
    pub steps: usize,
}

/// A cheap, cloneable handle onto a solver's run flags. Use this to cancel or
/// observe a run while the solver itself is mutably borrowed.
#[derive(Clone, Debug, Default)]
pub struct SolverHandle {
    stop: Arc<AtomicBool>,
    generating: Arc<AtomicBool>,
}

impl SolverHandle {
    /// Ask the current run to stop. The flag is checked at the top of each
    /// iteration of the main loop, never mid-propagation. Collapses that have
    /// already happened are kept.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Is a `generate`/`generate_async` call currently in flight?
    pub fn is_generating(&self) -> bool {
        self.generating.load(Ordering::SeqCst)
    }

    fn begin(&self) -> Result<GeneratingGuard, GenerateError> {
        self.generating
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| GenerateError::AlreadyGenerating)?;
        Ok(GeneratingGuard(Arc::clone(&self.generating)))
    }
}

/// Clears the generating flag when a run ends, including when an async run is
/// dropped before completion
struct GeneratingGuard(Arc<AtomicBool>);

impl Drop for GeneratingGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Everything that only exists between `configure` and the next `configure`
struct SolverState {
    rng: Pcg64,
    variants: VariantMap,
    grid: HexCoordIndexMap<Cell>,
    predefined: Vec<PredefinedTile>,
    predefined_applied: bool,
    max_contradiction_retries: Option<u32>,
    contradiction_retries: u32,
}

/// The outcome of a single iteration of the main loop
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Tick {
    /// Every cell is collapsed
    Done,
    Collapsed,
    /// A cell is out of candidates
    Contradiction,
}

/// The WFC solver. Configure it with [Self::configure], then run it with
/// [Self::generate] or [Self::generate_async], then read the results.
pub struct WfcSolver {
    catalog: TileCatalog,
    state: Option<SolverState>,
    steps: Vec<Step>,
    handle: SolverHandle,
}

impl WfcSolver {
    pub fn new(catalog: TileCatalog) -> Self {
        Self {
            catalog,
            state: None,
            steps: Vec::new(),
            handle: SolverHandle::default(),
        }
    }

    /// Prepare a fresh grid for the given config: every cell in the disk of
    /// `config.radius` around the origin starts with every rotation of every
    /// allowed kind. Discards any previous grid and trace.
    ///
    /// Returns an error if the config is invalid, including a predefined tile
    /// outside the grid or using a kind that isn't allowed. The solver is left
    /// unconfigured in that case.
    pub fn configure(&mut self, config: &WfcConfig) -> anyhow::Result<()> {
        self.state = None;
        self.steps.clear();
        self.handle.stop.store(false, Ordering::SeqCst);

        config.validate().context("invalid config")?;
        let variants = self
            .catalog
            .variants(config.allowed_kinds.iter().copied())
            .context("error building variant catalog")?;

        let grid: HexCoordIndexMap<Cell> =
            hex::disk_coords(HexCoord::ORIGIN, config.radius)
                .map(|pos| (pos, Cell::new(pos, variants.keys().copied())))
                .collect();

        for tile in &config.predefined_tiles {
            if !grid.contains_key(&tile.coord) {
                bail!(
                    "predefined tile at {} is outside the grid of radius {}",
                    tile.coord,
                    config.radius
                );
            }
            if !variants.contains_key(&tile.variant_id()) {
                bail!(
                    "predefined tile {} at {} is not an allowed variant",
                    tile.variant_id(),
                    tile.coord
                );
            }
        }

        info!(
            "Configured solver with {} cells and {} variants",
            grid.len(),
            variants.len()
        );
        self.state = Some(SolverState {
            rng: config.seed.rng(),
            variants,
            grid,
            predefined: config.predefined_tiles.clone(),
            predefined_applied: false,
            max_contradiction_retries: config.max_contradiction_retries,
            contradiction_retries: 0,
        });
        Ok(())
    }

    /// Solve the grid synchronously, blocking until every cell is collapsed
    /// or the run fails. With unlimited contradiction retries, this only
    /// returns on a contradiction if someone calls [SolverHandle::stop] from
    /// another thread.
    pub fn generate(&mut self) -> Result<(), GenerateError> {
        let _guard = self.handle.begin()?;
        timed!("WFC generation", log::Level::Info, {
            self.apply_predefined()?;
            loop {
                if self.handle.is_stopped() {
                    info!("Generation cancelled");
                    return Err(GenerateError::Cancelled);
                }
                if self.tick()? == Tick::Done {
                    break;
                }
            }
        });
        info!("Generation finished with {} steps", self.steps.len());
        Ok(())
    }

    /// Same algorithm as [Self::generate], but yields back to the executor
    /// every `steps_per_yield` iterations so other tasks on the same thread
    /// get a turn. Contradiction retries count towards the yield interval too,
    /// so a stuck run can still be stopped from another task.
    ///
    /// `on_progress` is called right before each yield, and once more when
    /// the run finishes.
    pub async fn generate_async(
        &mut self,
        mut on_progress: Option<&mut dyn FnMut(&Progress)>,
        steps_per_yield: usize,
    ) -> Result<(), GenerateError> {
        let _guard = self.handle.begin()?;
        let steps_per_yield = steps_per_yield.max(1);
        self.apply_predefined()?;

        let mut since_yield = 0;
        loop {
            if self.handle.is_stopped() {
                info!("Generation cancelled");
                return Err(GenerateError::Cancelled);
            }
            if self.tick()? == Tick::Done {
                break;
            }

            since_yield += 1;
            if since_yield >= steps_per_yield {
                since_yield = 0;
                if let Some(on_progress) = on_progress.as_deref_mut() {
                    on_progress(&self.progress());
                }
                yield_now().await;
            }
        }

        if let Some(on_progress) = on_progress.as_deref_mut() {
            on_progress(&self.progress());
        }
        info!("Generation finished with {} steps", self.steps.len());
        Ok(())
    }

    /// Get a handle that can stop or observe runs on this solver
    pub fn handle(&self) -> SolverHandle {
        self.handle.clone()
    }

    pub fn stop(&self) {
        self.handle.stop();
    }

    pub fn is_generating(&self) -> bool {
        self.handle.is_generating()
    }

    /// The trace of every step taken since the last `configure`
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Move the trace out of the solver, leaving it empty
    pub fn take_steps(&mut self) -> Vec<Step> {
        std::mem::take(&mut self.steps)
    }

    /// Every collapsed cell, as an output tile. After a successful run, this
    /// holds one tile per cell in the grid.
    pub fn result_tiles(&self) -> Vec<PlacedTile> {
        self.all_cells().filter_map(Cell::placed).collect()
    }

    pub fn cell_at(&self, coord: HexCoord) -> Option<&Cell> {
        self.state.as_ref()?.grid.get(&coord)
    }

    /// Every cell in the grid. Empty if the solver isn't configured.
    pub fn all_cells(&self) -> impl Iterator<Item = &Cell> {
        self.state.iter().flat_map(|state| state.grid.values())
    }

    /// The variants in play for the current configuration
    pub fn variants(&self) -> Option<&VariantMap> {
        self.state.as_ref().map(|state| &state.variants)
    }

    pub fn progress(&self) -> Progress {
        Progress {
            collapsed: self
                .all_cells()
                .filter(|cell| cell.is_collapsed())
                .count(),
            total: self.all_cells().count(),
            steps: self.steps.len(),
        }
    }

    /// Force every predefined tile into place, propagating from each in turn.
    /// Only runs once per configuration.
    fn apply_predefined(&mut self) -> Result<(), GenerateError> {
        let state = self.state.as_mut().ok_or(GenerateError::NotConfigured)?;
        if state.predefined_applied {
            return Ok(());
        }

        for tile in &state.predefined {
            let coord = tile.coord;
            let variant = tile.variant_id();
            let cell = state
                .grid
                .get_mut(&coord)
                .ok_or(GenerateError::PredefinedConflict { coord })?;
            // An earlier predefined tile may have already ruled this out
            if !cell.possible_variants().contains(&variant) {
                warn!("Predefined tile {} at {} was ruled out", variant, coord);
                return Err(GenerateError::PredefinedConflict { coord });
            }
            cell.collapse_to(variant);
            trace!("Placed predefined {} at {}", variant, coord);

            let propagated = propagate(&mut state.grid, &state.variants, coord)
                .map_err(|failed| {
                    warn!(
                        "Predefined tile at {} emptied the cell at {}",
                        coord, failed
                    );
                    GenerateError::PredefinedConflict { coord }
                })?;
            self.steps.push(Step {
                placed: state.grid.get(&coord).and_then(Cell::placed),
                propagated,
                cells: snapshot(&state.grid),
            });
        }

        state.predefined_applied = true;
        debug!("Applied {} predefined tiles", state.predefined.len());
        Ok(())
    }

    /// Run one iteration of the main loop: pick the lowest-entropy cell and
    /// collapse it.
    fn tick(&mut self) -> Result<Tick, GenerateError> {
        let state = self.state.as_mut().ok_or(GenerateError::NotConfigured)?;

        // Gather every uncollapsed cell that shares the lowest entropy
        let mut min_entropy = usize::MAX;
        let mut candidates: Vec<HexCoord> = Vec::new();
        for cell in state.grid.values().filter(|cell| !cell.is_collapsed()) {
            let entropy = cell.entropy();
            if entropy < min_entropy {
                min_entropy = entropy;
                candidates.clear();
            }
            if entropy == min_entropy {
                candidates.push(cell.coord());
            }
        }
        if candidates.is_empty() {
            return Ok(Tick::Done);
        }
        // Random tie-break, so the layout isn't biased towards grid order
        let coord = candidates[state.rng.gen_range(0..candidates.len())];

        if min_entropy == 0 {
            state.contradiction_retries += 1;
            let retries = state.contradiction_retries;
            warn!("Contradiction at {} (retry {})", coord, retries);
            return match state.max_contradiction_retries {
                Some(max) if retries > max => {
                    Err(GenerateError::Contradiction { coord, retries })
                }
                _ => Ok(Tick::Contradiction),
            };
        }

        let (cell_variants, weights): (Vec<VariantId>, Vec<f64>) = state.grid
            [&coord]
            .possible_variants()
            .iter()
            .map(|id| (*id, state.variants[id].weight))
            .unzip();
        // Entropy is non-zero here, so the list isn't empty
        let chosen = match weighted_choice(&mut state.rng, &weights) {
            Some(index) => cell_variants[index],
            None => return Ok(Tick::Contradiction),
        };
        if let Some(cell) = state.grid.get_mut(&coord) {
            cell.collapse_to(chosen);
        }
        trace!("Collapsed {} to {}", coord, chosen);

        match propagate(&mut state.grid, &state.variants, coord) {
            Ok(propagated) => {
                self.steps.push(Step {
                    placed: state.grid.get(&coord).and_then(Cell::placed),
                    propagated,
                    cells: snapshot(&state.grid),
                });
                Ok(Tick::Collapsed)
            }
            Err(failed) => {
                // The emptied cell stays at entropy 0, and will be picked
                // up by the next tick
                warn!("Collapsing {} emptied the cell at {}", coord, failed);
                Ok(Tick::Contradiction)
            }
        }
    }
}

/// Breadth-first constraint propagation from a freshly collapsed cell. Each
/// uncollapsed neighbor keeps only the variants whose facing edge matches some
/// edge the current cell could still present on that side. Any neighbor that
/// shrinks gets queued to propagate further.
///
/// Returns every cell that got narrowed to a single variant along the way, or
/// the position of the first cell that got emptied.
fn propagate(
    grid: &mut HexCoordIndexMap<Cell>,
    variants: &VariantMap,
    start: HexCoord,
) -> Result<Vec<PlacedTile>, HexCoord> {
    let mut propagated = Vec::new();
    let mut queue = VecDeque::new();
    queue.push_back(start);

    while let Some(pos) = queue.pop_front() {
        for dir in HexDirection::ALL {
            let neighbor_pos = pos.neighbor(dir);
            match grid.get(&neighbor_pos) {
                Some(neighbor) if !neighbor.is_collapsed() => {}
                _ => continue,
            }

            let allowed: HashSet<EdgeType, FnvBuildHasher> = match grid.get(&pos)
            {
                Some(cell) => cell
                    .possible_variants()
                    .iter()
                    .map(|id| variants[id].edge(dir))
                    .collect(),
                None => continue,
            };

            let facing = dir.opposite();
            let neighbor = match grid.get_mut(&neighbor_pos) {
                Some(neighbor) => neighbor,
                None => continue,
            };
            let changed =
                neighbor
                    .retain(|id| allowed.contains(&variants[id].edge(facing)));
            if changed {
                if neighbor.entropy() == 0 {
                    return Err(neighbor_pos);
                }
                if let Some(tile) = neighbor.placed() {
                    propagated.push(tile);
                }
                queue.push_back(neighbor_pos);
            }
        }
    }

    Ok(propagated)
}

/// Capture every still-uncollapsed cell for the trace
fn snapshot(grid: &HexCoordIndexMap<Cell>) -> Vec<CellSnapshot> {
    grid.values()
        .filter(|cell| !cell.is_collapsed())
        .map(Cell::snapshot)
        .collect()
}

/// Hand control back to the executor once. The task wakes itself right away,
/// so it resumes on the executor's next turn.
fn yield_now() -> impl Future<Output = ()> {
    let mut yielded = false;
    std::future::poll_fn(move |cx| {
        if yielded {
            Poll::Ready(())
        } else {
            yielded = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::{TileKind, TileRule};

    fn config(radius: u32, allowed_kinds: Vec<TileKind>) -> WfcConfig {
        WfcConfig {
            seed: 1.into(),
            radius,
            allowed_kinds,
            predefined_tiles: Vec::new(),
            max_contradiction_retries: Some(0),
        }
    }

    #[test]
    fn test_propagate_narrows_neighbors() {
        let mut solver = WfcSolver::new(TileCatalog::default());
        solver
            .configure(&config(1, vec![TileKind::Grass, TileKind::Water]))
            .unwrap();
        let state = solver.state.as_mut().unwrap();
        state
            .grid
            .get_mut(&HexCoord::ORIGIN)
            .unwrap()
            .collapse_to(VariantId::new(TileKind::Water, 0));

        let propagated =
            propagate(&mut state.grid, &state.variants, HexCoord::ORIGIN)
                .unwrap();
        // Water's 6 rotations are identical, so nothing fully collapses
        assert!(propagated.is_empty());
        for pos in HexCoord::ORIGIN.neighbors() {
            let cell = &state.grid[&pos];
            assert_eq!(cell.entropy(), 6);
            assert!(cell
                .possible_variants()
                .iter()
                .all(|id| id.kind == TileKind::Water));
        }
    }

    #[test]
    fn test_propagate_reports_contradiction() {
        // Two kinds that can never touch
        let catalog = TileCatalog::new(vec![
            TileRule::new(TileKind::Grass, [EdgeType::Grass; 6], 1.0),
            TileRule::new(TileKind::Water, [EdgeType::Water; 6], 1.0),
        ])
        .unwrap();
        let mut solver = WfcSolver::new(catalog);
        solver
            .configure(&config(1, vec![TileKind::Grass, TileKind::Water]))
            .unwrap();
        let state = solver.state.as_mut().unwrap();
        let east = HexCoord::ORIGIN.neighbor(HexDirection::East);
        state
            .grid
            .get_mut(&east)
            .unwrap()
            .retain(|id| id.kind == TileKind::Water);
        state
            .grid
            .get_mut(&HexCoord::ORIGIN)
            .unwrap()
            .collapse_to(VariantId::new(TileKind::Grass, 0));

        assert_eq!(
            propagate(&mut state.grid, &state.variants, HexCoord::ORIGIN),
            Err(east)
        );
    }

    #[test]
    fn test_tick_picks_lowest_entropy() {
        let mut solver = WfcSolver::new(TileCatalog::default());
        solver
            .configure(&config(2, vec![TileKind::Grass, TileKind::RoadEnd]))
            .unwrap();
        let target = HexCoord::new(2, -1);
        solver
            .state
            .as_mut()
            .unwrap()
            .grid
            .get_mut(&target)
            .unwrap()
            .retain(|id| id.kind == TileKind::Grass && id.rotation < 2);

        assert_eq!(solver.tick(), Ok(Tick::Collapsed));
        assert!(solver.cell_at(target).unwrap().is_collapsed());
        assert_eq!(solver.steps().len(), 1);
        assert_eq!(solver.steps()[0].placed.unwrap().position, target);
    }

    #[test]
    fn test_already_generating() {
        let mut solver = WfcSolver::new(TileCatalog::default());
        solver.configure(&config(1, vec![TileKind::Grass])).unwrap();

        let guard = solver.handle.begin().unwrap();
        assert!(solver.is_generating());
        assert_eq!(solver.generate(), Err(GenerateError::AlreadyGenerating));
        // The rejected call must not clear the flag out from under the run
        assert!(solver.is_generating());
        assert!(solver.handle.begin().is_err());

        drop(guard);
        assert!(!solver.is_generating());
        assert_eq!(solver.generate(), Ok(()));
        assert_eq!(solver.result_tiles().len(), 7);
    }

    #[test]
    fn test_yield_now() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        runtime.block_on(async {
            yield_now().await;
            yield_now().await;
        });
    }
}
