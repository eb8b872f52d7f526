use hexstead::{
    GateRule, HexCoord, PredefinedTile, Settlement, SettlementConfig,
    TileCatalog, TileKind, WallConfig, WfcConfig, WfcSolver,
};
use validator::ValidationErrors;

/// Pull the validation errors out of an error chain and list the offending
/// fields, sorted
fn error_fields(err: &anyhow::Error) -> Vec<String> {
    let validation_errors = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<ValidationErrors>())
        .unwrap_or_else(|| panic!("no validation errors in {:?}", err));
    let mut fields: Vec<String> = validation_errors
        .errors()
        .keys()
        .map(|key| key.to_string())
        .collect();
    fields.sort_unstable();
    fields
}

#[test]
fn test_settlement_config_validation() {
    let config = SettlementConfig {
        island_min_size: 0, // valid (but weird)
        ground_attempts: 0, // invalid
        wfc: WfcConfig {
            radius: 10001, // invalid (too big)
            ..Default::default()
        },
        wall: WallConfig {
            max_offset: 500, // invalid
            ..Default::default()
        },
        gates: Vec::new(),
    };

    let err = Settlement::generate(config).unwrap_err();
    assert_eq!(
        error_fields(&err),
        vec!["ground_attempts", "wall", "wfc"],
        "incorrect validation errors in {:#}",
        err
    );
}

#[test]
fn test_wfc_config_validation() {
    let mut solver = WfcSolver::new(TileCatalog::default());
    let err = solver
        .configure(&WfcConfig {
            radius: 2000,
            allowed_kinds: Vec::new(),
            ..Default::default()
        })
        .unwrap_err();
    assert_eq!(error_fields(&err), vec!["allowed_kinds", "radius"]);
    // A failed configure leaves nothing behind
    assert_eq!(solver.result_tiles(), vec![]);
    assert!(solver.variants().is_none());
}

#[test]
fn test_predefined_outside_grid() {
    let mut solver = WfcSolver::new(TileCatalog::default());
    let err = solver
        .configure(&WfcConfig {
            radius: 2,
            allowed_kinds: vec![TileKind::Grass],
            predefined_tiles: vec![PredefinedTile {
                kind: TileKind::Grass,
                rotation: 0,
                coord: HexCoord::new(3, 0),
            }],
            ..Default::default()
        })
        .unwrap_err();
    assert!(
        err.to_string().contains("outside the grid"),
        "unexpected error: {}",
        err
    );
}

#[test]
fn test_predefined_kind_not_allowed() {
    let mut solver = WfcSolver::new(TileCatalog::default());
    let err = solver
        .configure(&WfcConfig {
            radius: 2,
            allowed_kinds: vec![TileKind::Grass],
            predefined_tiles: vec![PredefinedTile {
                kind: TileKind::Water,
                rotation: 0,
                coord: HexCoord::ORIGIN,
            }],
            ..Default::default()
        })
        .unwrap_err();
    assert!(
        err.to_string().contains("not an allowed variant"),
        "unexpected error: {}",
        err
    );
}

#[test]
fn test_gate_rule_validation() {
    let config = SettlementConfig {
        gates: vec![GateRule {
            kind: TileKind::WallGate,
            replaces: TileKind::WallStraight,
            probability: 1.5, // invalid
        }],
        ..Default::default()
    };
    let err = Settlement::generate(config).unwrap_err();
    assert_eq!(error_fields(&err), vec!["probability"]);

    // Gates have to swap wall for wall
    let config = SettlementConfig {
        gates: vec![GateRule {
            kind: TileKind::Grass,
            replaces: TileKind::WallStraight,
            probability: 0.5,
        }],
        ..Default::default()
    };
    assert!(Settlement::generate(config).is_err());
}

#[test]
fn test_config_from_json() {
    let config: SettlementConfig = serde_json::from_str(
        r#"{
            "wfc": {"seed": "village", "radius": 3, "allowed_kinds": ["grass", "road_straight"]},
            "wall": {"seed": 12, "center": {"q": 1, "r": -1}}
        }"#,
    )
    .unwrap();
    assert_eq!(config.wfc.seed, "village".into());
    assert_eq!(config.wfc.radius, 3);
    assert_eq!(
        config.wfc.allowed_kinds,
        vec![TileKind::Grass, TileKind::RoadStraight]
    );
    // Unspecified fields fall back to defaults
    assert_eq!(config.wfc.max_contradiction_retries, Some(64));
    assert_eq!(config.wall.seed, 12.into());
    assert_eq!(config.wall.center, HexCoord::new(1, -1));
    assert_eq!(config.wall.radius, 5);
    assert_eq!(config.gates.len(), 1);
}
