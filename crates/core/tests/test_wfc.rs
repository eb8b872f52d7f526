use hexstead::{
    GenerateError, HexCoord, PlacedTile, PredefinedTile, Progress,
    TileCatalog, TileKind, TileRule, WfcConfig, WfcSolver,
};
use hexstead::{hex, tile::EdgeType};

fn config(seed: u64, radius: u32, allowed_kinds: Vec<TileKind>) -> WfcConfig {
    WfcConfig {
        seed: seed.into(),
        radius,
        allowed_kinds,
        ..Default::default()
    }
}

/// A catalog whose only tile can't tile a hex grid: every neighbor of an even
/// rotation has to be an odd rotation and vice versa, and hex grids are full
/// of triangles
fn impossible_catalog() -> TileCatalog {
    use EdgeType::{Grass as G, Road as R};
    TileCatalog::new(vec![TileRule::new(
        TileKind::RoadJunction,
        [R, G, R, G, R, G],
        1.0,
    )])
    .unwrap()
}

/// Solve with the full ground catalog, moving through seeds until one works.
/// Contradictions are a normal outcome for a greedy solver, so any single seed
/// might fail.
fn solve_ground(radius: u32) -> (WfcSolver, u64) {
    for seed in 0..100 {
        let mut solver = WfcSolver::new(TileCatalog::default());
        solver
            .configure(&config(seed, radius, TileKind::ground().collect()))
            .unwrap();
        if solver.generate().is_ok() {
            return (solver, seed);
        }
    }
    panic!("no seed in 0..100 solved radius {}", radius);
}

#[test]
fn test_single_cell() {
    for kind in TileKind::ground() {
        let mut solver = WfcSolver::new(TileCatalog::default());
        solver.configure(&config(0, 0, vec![kind])).unwrap();
        solver.generate().unwrap();

        let tiles = solver.result_tiles();
        assert_eq!(tiles.len(), 1);
        assert_eq!(tiles[0].kind, kind);
        assert_eq!(tiles[0].position, HexCoord::ORIGIN);
    }
}

#[test]
fn test_conflicting_predefined() {
    let mut solver = WfcSolver::new(TileCatalog::default());
    solver
        .configure(&WfcConfig {
            predefined_tiles: vec![
                PredefinedTile {
                    kind: TileKind::Grass,
                    rotation: 0,
                    coord: HexCoord::ORIGIN,
                },
                // Water can't touch grass
                PredefinedTile {
                    kind: TileKind::Water,
                    rotation: 0,
                    coord: HexCoord::new(1, 0),
                },
            ],
            ..config(0, 2, vec![TileKind::Grass, TileKind::Water])
        })
        .unwrap();
    assert_eq!(
        solver.generate(),
        Err(GenerateError::PredefinedConflict {
            coord: HexCoord::new(1, 0)
        })
    );
}

#[test]
fn test_predefined_tiles_kept() {
    let road = PredefinedTile {
        kind: TileKind::RoadStraight,
        rotation: 1,
        coord: HexCoord::new(-1, 1),
    };
    let mut solver = WfcSolver::new(TileCatalog::default());
    solver
        .configure(&WfcConfig {
            predefined_tiles: vec![road],
            max_contradiction_retries: Some(0),
            ..config(
                3,
                0,
                vec![TileKind::Grass, TileKind::RoadStraight],
            )
        })
        .unwrap_err();

    // Retry with a radius that actually contains the tile
    for seed in 0..50 {
        solver
            .configure(&WfcConfig {
                predefined_tiles: vec![road],
                ..config(
                    seed,
                    3,
                    vec![
                        TileKind::Grass,
                        TileKind::RoadStraight,
                        TileKind::RoadEnd,
                    ],
                )
            })
            .unwrap();
        if solver.generate().is_ok() {
            let cell = solver.cell_at(road.coord).unwrap();
            assert_eq!(cell.resolved_kind(), Some(TileKind::RoadStraight));
            assert_eq!(cell.resolved_rotation(), Some(1));
            // The first step is always the predefined placement
            assert_eq!(
                solver.steps()[0].placed,
                Some(PlacedTile {
                    kind: TileKind::RoadStraight,
                    rotation: 1,
                    position: road.coord,
                })
            );
            return;
        }
    }
    panic!("no seed solved the grid around the predefined road");
}

#[test]
fn test_edge_consistency() {
    let catalog = TileCatalog::default();
    let (solver, seed) = solve_ground(4);
    let tiles = solver.result_tiles();
    assert_eq!(tiles.len(), hex::disk_len(4));

    let by_position: hex::HexCoordMap<PlacedTile> =
        tiles.iter().map(|tile| (tile.position, *tile)).collect();
    for tile in &tiles {
        let variant = catalog.rule(tile.kind).unwrap().variant(tile.rotation);
        for dir in hex::HexDirection::ALL {
            let neighbor = by_position.get(&tile.position.neighbor(dir));
            if let Some(neighbor) = neighbor {
                let neighbor_variant = catalog
                    .rule(neighbor.kind)
                    .unwrap()
                    .variant(neighbor.rotation);
                assert_eq!(
                    variant.edge(dir),
                    neighbor_variant.edge(dir.opposite()),
                    "edge mismatch between {:?} and {:?} (seed {})",
                    tile,
                    neighbor,
                    seed
                );
            }
        }
    }
}

#[test]
fn test_entropy_after_solve() {
    let (solver, _) = solve_ground(3);
    for cell in solver.all_cells() {
        assert_eq!(cell.entropy(), 1);
        assert!(cell.is_collapsed());
    }
    let progress = solver.progress();
    assert_eq!(progress.collapsed, progress.total);
}

#[test]
fn test_deterministic() {
    let (first, seed) = solve_ground(3);
    let mut second = WfcSolver::new(TileCatalog::default());
    second
        .configure(&config(seed, 3, TileKind::ground().collect()))
        .unwrap();
    second.generate().unwrap();
    assert_eq!(first.result_tiles(), second.result_tiles());
    assert_eq!(first.steps(), second.steps());
}

#[test]
fn test_step_trace() {
    let mut solver = WfcSolver::new(TileCatalog::default());
    solver
        .configure(&config(9, 3, vec![TileKind::Grass, TileKind::Water]))
        .unwrap();
    solver.generate().unwrap();

    // Grass and water can't touch, so the first collapse fixes the kind of
    // every cell but leaves all 6 rotations open. Every cell after that gets
    // its own step.
    let steps = solver.steps();
    assert_eq!(steps.len(), hex::disk_len(3));
    let kind = steps[0].placed.unwrap().kind;
    assert!(steps[0].cells.iter().all(|cell| cell.entropy == 6
        && cell.variants.iter().all(|id| id.kind == kind)));
    for (i, step) in steps.iter().enumerate() {
        assert!(step.placed.is_some());
        assert!(step.propagated.is_empty());
        assert_eq!(step.cells.len(), steps.len() - i - 1);
        assert!(step.cells.iter().all(|cell| cell.entropy != 1));
    }
    assert!(steps.last().unwrap().cells.is_empty());
}

#[test]
fn test_not_configured() {
    let mut solver = WfcSolver::new(TileCatalog::default());
    assert_eq!(solver.generate(), Err(GenerateError::NotConfigured));
    assert!(!solver.is_generating());
}

#[test]
fn test_contradiction_retry_limit() {
    let mut solver = WfcSolver::new(impossible_catalog());
    solver
        .configure(&WfcConfig {
            max_contradiction_retries: Some(3),
            ..config(0, 1, vec![TileKind::RoadJunction])
        })
        .unwrap();
    match solver.generate() {
        Err(GenerateError::Contradiction { retries, .. }) => {
            assert_eq!(retries, 4)
        }
        other => panic!("expected a contradiction, got {:?}", other),
    }
    // Collapses from before the contradiction are kept
    assert!(!solver.result_tiles().is_empty());
    assert!(!solver.is_generating());
}

#[tokio::test]
async fn test_generate_async() {
    let mut sync_solver = WfcSolver::new(TileCatalog::default());
    sync_solver
        .configure(&config(4, 3, vec![TileKind::Grass, TileKind::Water]))
        .unwrap();
    sync_solver.generate().unwrap();

    let mut solver = WfcSolver::new(TileCatalog::default());
    solver
        .configure(&config(4, 3, vec![TileKind::Grass, TileKind::Water]))
        .unwrap();
    let handle = solver.handle();
    let mut reports: Vec<Progress> = Vec::new();
    let mut on_progress = |progress: &Progress| {
        assert!(handle.is_generating());
        reports.push(*progress);
    };
    solver
        .generate_async(Some(&mut on_progress), 4)
        .await
        .unwrap();
    assert!(!solver.is_generating());

    // One report every 4 collapses, plus a final one
    assert_eq!(reports.len(), 37 / 4 + 1);
    assert!(reports
        .windows(2)
        .all(|pair| pair[0].collapsed <= pair[1].collapsed));
    let last = reports.last().unwrap();
    assert_eq!(last.collapsed, 37);
    assert_eq!(last.total, 37);

    // Same seed, same layout, regardless of yielding
    assert_eq!(solver.result_tiles(), sync_solver.result_tiles());
}

#[tokio::test]
async fn test_generate_async_stop() {
    let mut solver = WfcSolver::new(impossible_catalog());
    // Unlimited retries: this run only ends when someone stops it
    solver
        .configure(&WfcConfig {
            max_contradiction_retries: None,
            ..config(0, 2, vec![TileKind::RoadJunction])
        })
        .unwrap();
    let handle = solver.handle();
    let mut calls = 0;
    let mut on_progress = |_: &Progress| {
        calls += 1;
        if calls == 3 {
            handle.stop();
        }
    };
    assert_eq!(
        solver.generate_async(Some(&mut on_progress), 2).await,
        Err(GenerateError::Cancelled)
    );
    assert_eq!(calls, 3);
    assert!(!solver.is_generating());

    // Reconfiguring clears the stop flag
    solver
        .configure(&config(0, 0, vec![TileKind::RoadJunction]))
        .unwrap();
    solver.generate_async(None, 1).await.unwrap();
    assert_eq!(solver.result_tiles().len(), 1);
}
