//! Generation of a closed, typed wall ring around a settlement.
//!
//! The ring starts as an exact hex ring, gets pushed in and out at random,
//! has its gaps filled back in, and then each ring tile is matched against
//! the wall variants so that its wall edges line up with the previous and
//! next tiles in the ring, and its other edges face into or out of the
//! settlement correctly.
//!
//! The generator never fails. A tile whose surroundings don't match any wall
//! variant falls back to an unrotated straight wall: visually imperfect, but
//! the ring stays structurally complete.

use crate::{
    config::{GateRule, WallConfig},
    hex::{self, HexCoord, HexCoordIndexSet, HexCoordSet, HexDirection},
    tile::{EdgeType, TileCatalog, TileKind, TileVariant},
};
use anyhow::{bail, Context};
use log::{debug, info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp;
use validator::Validate;

/// How far past the ring's bounding box we look when collecting the tiles
/// just outside the wall
const OUTSIDE_MARGIN: i32 = 2;

/// Upper bounds for [WallConfig::radius] and [WallConfig::max_offset], the
/// same ones its validation enforces
const MAX_RADIUS: u32 = 1000;
const MAX_OFFSET: u32 = 100;

/// One tile of the finished wall ring.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WallTile {
    pub coord: HexCoord,
    pub kind: TileKind,
    pub rotation: u8,
}

/// Everything the generator produces for one ring.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WallLayout {
    /// The ring, in walking order
    pub wall_tiles: Vec<WallTile>,
    /// Every tile enclosed by the ring
    pub inside_tiles: Vec<HexCoord>,
    /// Tiles outside the ring that touch it
    pub outside_adjacent_tiles: Vec<HexCoord>,
}

/// The label each side of a ring tile must have. `None` means the side is
/// unconstrained.
type EdgeRequirements = [Option<EdgeType>; 6];

/// Builds wall rings. Holds the wall variant catalog, so build one and reuse
/// it across rings.
#[derive(Clone, Debug)]
pub struct WallGenerator {
    /// Every rotation of every wall kind, searched in order
    variants: Vec<TileVariant>,
    fallback: TileVariant,
    gates: Vec<GateRule>,
}

impl WallGenerator {
    /// Build a generator from the standard wall kinds in the catalog. Returns
    /// an error if the catalog is missing a wall kind or a gate rule is
    /// invalid.
    pub fn new(
        catalog: &TileCatalog,
        gates: Vec<GateRule>,
    ) -> anyhow::Result<Self> {
        Self::with_kinds(catalog, &TileKind::WALLS, gates)
    }

    /// Build a generator that only uses the given wall kinds. The catalog
    /// must have a rule for [TileKind::WallStraight], since that's the
    /// fallback.
    pub fn with_kinds(
        catalog: &TileCatalog,
        kinds: &[TileKind],
        gates: Vec<GateRule>,
    ) -> anyhow::Result<Self> {
        let variants = catalog
            .variants(kinds.iter().copied())
            .context("error building wall variants")?
            .into_iter()
            .map(|(_, variant)| variant)
            .collect();
        let fallback = catalog.rule(TileKind::WallStraight)?.variant(0);

        for gate in &gates {
            gate.validate()
                .with_context(|| format!("invalid gate rule {:?}", gate))?;
            if !gate.kind.is_wall() || !gate.replaces.is_wall() {
                bail!(
                    "gate rule {:?} must swap one wall kind for another",
                    gate
                );
            }
        }

        Ok(Self {
            variants,
            fallback,
            gates,
        })
    }

    /// Generate a wall ring for the given config. Never fails; a radius of 0
    /// gives an empty layout. The config isn't validated here, but a radius
    /// or offset past its validation bound is clamped to that bound.
    pub fn generate(&self, config: &WallConfig) -> WallLayout {
        let radius = cmp::min(config.radius, MAX_RADIUS);
        let max_offset = cmp::min(config.max_offset, MAX_OFFSET);
        if radius != config.radius || max_offset != config.max_offset {
            warn!(
                "Wall radius {} / offset {} clamped to {} / {}",
                config.radius, config.max_offset, radius, max_offset
            );
        }

        let mut rng = config.seed.rng();
        let ring = trace_ring(config.center, radius, max_offset, &mut rng);
        if ring.is_empty() {
            info!("Wall ring around {} is empty", config.center);
            return WallLayout::default();
        }

        let ring_set: HexCoordSet = ring.iter().copied().collect();
        let bounds = Bounds::around(&ring);
        let inside = flood_inside(config.center, &ring_set, bounds);
        let outside = collect_outside(
            &ring,
            &ring_set,
            &inside,
            bounds.expand(OUTSIDE_MARGIN),
        );

        let mut fallbacks = 0;
        let mut wall_tiles: Vec<WallTile> = ring
            .iter()
            .enumerate()
            .map(|(i, &coord)| {
                let prev = ring[(i + ring.len() - 1) % ring.len()];
                let next = ring[(i + 1) % ring.len()];
                let requirements =
                    edge_requirements(coord, prev, next, &inside, &outside);
                let variant =
                    self.match_variant(&requirements).unwrap_or_else(|| {
                        fallbacks += 1;
                        &self.fallback
                    });
                WallTile {
                    coord,
                    kind: variant.kind,
                    rotation: variant.rotation,
                }
            })
            .collect();
        if fallbacks > 0 {
            warn!("{} wall tiles had no matching variant", fallbacks);
        }

        self.place_gates(&mut wall_tiles, &mut rng);

        info!(
            "Generated wall ring of {} tiles enclosing {} tiles",
            wall_tiles.len(),
            inside.len()
        );
        WallLayout {
            wall_tiles,
            inside_tiles: inside.into_iter().collect(),
            outside_adjacent_tiles: outside.into_iter().collect(),
        }
    }

    /// Find the first wall variant whose edges satisfy every requirement
    fn match_variant(
        &self,
        requirements: &EdgeRequirements,
    ) -> Option<&TileVariant> {
        self.variants.iter().find(|variant| {
            requirements
                .iter()
                .zip(variant.edges.iter())
                .all(|(required, edge)| required.map_or(true, |r| r == *edge))
        })
    }

    /// Roll for gate substitutions. The first matching rule to succeed wins.
    fn place_gates(&self, wall_tiles: &mut [WallTile], rng: &mut impl Rng) {
        let mut gates = 0;
        for tile in wall_tiles.iter_mut() {
            let rules =
                self.gates.iter().filter(|rule| rule.replaces == tile.kind);
            for rule in rules {
                if rng.gen_bool(rule.probability) {
                    tile.kind = rule.kind;
                    gates += 1;
                    break;
                }
            }
        }
        debug!("Placed {} gates", gates);
    }
}

/// Build the ring itself: exact ring, then perturbed, connected and cleaned
/// up. Consecutive tiles in the output are adjacent (as are the last and
/// first), barring pathological perturbation.
fn trace_ring(
    center: HexCoord,
    radius: u32,
    max_offset: u32,
    rng: &mut impl Rng,
) -> Vec<HexCoord> {
    let exact = hex::ring_coords(center, radius);
    let perturbed = perturb(&exact, center, radius, max_offset, rng);
    let connected = connect(&perturbed);
    debug!(
        "Ring repair inserted {} tiles",
        connected.len().saturating_sub(perturbed.len())
    );
    remove_spurs(&connected)
}

/// Push each ring tile in or out along the line from the ring's centroid, by
/// a random whole number of steps in `[0, max_offset]`. Inward pushes stop
/// short of the center.
fn perturb(
    ring: &[HexCoord],
    center: HexCoord,
    radius: u32,
    max_offset: u32,
    rng: &mut impl Rng,
) -> Vec<HexCoord> {
    if max_offset == 0 || ring.is_empty() {
        return ring.to_vec();
    }

    let len = ring.len() as f64;
    let centroid_q = ring.iter().map(|pos| pos.q as f64).sum::<f64>() / len;
    let centroid_r = ring.iter().map(|pos| pos.r as f64).sum::<f64>() / len;

    ring.iter()
        .map(|&pos| {
            let dq = pos.q as f64 - centroid_q;
            let dr = pos.r as f64 - centroid_r;
            // Hex length of the (fractional) offset vector
            let length = (dq.abs() + dr.abs() + (dq + dr).abs()) / 2.0;
            let offset = rng.gen_range(0..=max_offset);
            if length == 0.0 || offset == 0 {
                return pos;
            }

            let offset = if rng.gen_bool(0.5) {
                offset as f64
            } else {
                -(cmp::min(offset, radius.saturating_sub(1)) as f64)
            };
            let scale = offset / length;
            let moved = HexCoord::round(
                pos.q as f64 + dq * scale,
                pos.r as f64 + dr * scale,
            );
            if moved == center {
                pos
            } else {
                moved
            }
        })
        .collect()
}

/// Fill the gaps between consecutive ring tiles (wrapping around from the
/// last to the first) with a greedy axial walk. Each step moves along
/// whichever of `q`/`r` has further to go.
fn connect(ring: &[HexCoord]) -> Vec<HexCoord> {
    let mut connected = Vec::with_capacity(ring.len());
    for (i, &pos) in ring.iter().enumerate() {
        let next = ring[(i + 1) % ring.len()];
        connected.push(pos);

        let mut current = pos;
        while current.distance_to(next) > 1 {
            let dq = next.q - current.q;
            let dr = next.r - current.r;
            current = if dq.abs() >= dr.abs() {
                HexCoord::new(current.q + dq.signum(), current.r)
            } else {
                HexCoord::new(current.q, current.r + dr.signum())
            };
            connected.push(current);
        }
    }
    connected
}

/// Drop tiles that touch fewer than 2 other ring tiles, until there are none
/// left, then drop duplicates (keeping the first occurrence).
fn remove_spurs(ring: &[HexCoord]) -> Vec<HexCoord> {
    let mut ring: Vec<HexCoord> = ring.to_vec();
    loop {
        let ring_set: HexCoordSet = ring.iter().copied().collect();
        let before = ring.len();
        ring.retain(|pos| {
            pos.neighbors()
                .filter(|neighbor| ring_set.contains(neighbor))
                .count()
                >= 2
        });
        if ring.len() == before {
            break;
        }
    }
    let deduped: HexCoordIndexSet = ring.into_iter().collect();
    deduped.into_iter().collect()
}

/// An axial bounding box, inclusive on both ends
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct Bounds {
    min_q: i32,
    max_q: i32,
    min_r: i32,
    max_r: i32,
}

impl Bounds {
    /// The ring must not be empty
    fn around(ring: &[HexCoord]) -> Self {
        let mut bounds = Self {
            min_q: i32::MAX,
            max_q: i32::MIN,
            min_r: i32::MAX,
            max_r: i32::MIN,
        };
        for pos in ring {
            bounds.min_q = bounds.min_q.min(pos.q);
            bounds.max_q = bounds.max_q.max(pos.q);
            bounds.min_r = bounds.min_r.min(pos.r);
            bounds.max_r = bounds.max_r.max(pos.r);
        }
        bounds
    }

    fn expand(self, margin: i32) -> Self {
        Self {
            min_q: self.min_q - margin,
            max_q: self.max_q + margin,
            min_r: self.min_r - margin,
            max_r: self.max_r + margin,
        }
    }

    fn contains(&self, pos: HexCoord) -> bool {
        (self.min_q..=self.max_q).contains(&pos.q)
            && (self.min_r..=self.max_r).contains(&pos.r)
    }
}

/// Flood out from the center over everything that isn't wall, without
/// leaving the bounding box. If the ring has a leak, the box keeps the flood
/// from running forever.
fn flood_inside(
    center: HexCoord,
    ring: &HexCoordSet,
    bounds: Bounds,
) -> HexCoordIndexSet {
    let mut inside = HexCoordIndexSet::default();
    if ring.contains(&center) || !bounds.contains(center) {
        return inside;
    }

    let mut stack = vec![center];
    inside.insert(center);
    while let Some(pos) = stack.pop() {
        for neighbor in pos.neighbors() {
            if bounds.contains(neighbor)
                && !ring.contains(&neighbor)
                && inside.insert(neighbor)
            {
                stack.push(neighbor);
            }
        }
    }
    inside
}

/// Every non-wall, non-inside neighbor of the ring
fn collect_outside(
    ring: &[HexCoord],
    ring_set: &HexCoordSet,
    inside: &HexCoordIndexSet,
    bounds: Bounds,
) -> HexCoordIndexSet {
    ring.iter()
        .flat_map(|pos| pos.neighbors())
        .filter(|neighbor| {
            bounds.contains(*neighbor)
                && !ring_set.contains(neighbor)
                && !inside.contains(neighbor)
        })
        .collect()
}

/// Work out what each side of a ring tile has to look like. The sides facing
/// the previous and next ring tiles are wall; any other side faces into or out
/// of the settlement, depending on its neighbor.
fn edge_requirements(
    pos: HexCoord,
    prev: HexCoord,
    next: HexCoord,
    inside: &HexCoordIndexSet,
    outside: &HexCoordIndexSet,
) -> EdgeRequirements {
    let mut requirements = [None; 6];
    for dir in HexDirection::ALL {
        let neighbor = pos.neighbor(dir);
        requirements[dir.index()] = if neighbor == prev || neighbor == next {
            Some(EdgeType::Wall)
        } else if inside.contains(&neighbor) {
            Some(EdgeType::Inside)
        } else if outside.contains(&neighbor) {
            Some(EdgeType::Outside)
        } else {
            None
        };
    }
    requirements
}
