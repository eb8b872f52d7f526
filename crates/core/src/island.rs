//! Splitting a set of free tiles into connected regions ("islands"), and
//! measuring each one so that callers can decide where to build.

use crate::hex::{self, HexCoord, HexCoordIndexSet};
use log::debug;
use serde::{Deserialize, Serialize};

/// A maximal set of mutually reachable tiles, where tiles are reachable if
/// they're adjacent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Island {
    /// Every tile in the island, in discovery order
    pub tiles: Vec<HexCoord>,
    /// The tile furthest from any unavailable tile. Ties go to whichever was
    /// discovered first.
    pub center: HexCoord,
    /// Distance from the center to the furthest tile of the island
    pub radius: u32,
    /// Number of tiles
    pub area: usize,
    /// Number of tile sides that face a tile outside the island
    pub perimeter: usize,
    /// The largest `k` such that every tile within `k` of the center is part
    /// of the island
    pub radius_available: u32,
}

impl Island {
    fn measure(tiles: Vec<HexCoord>, available: &HexCoordIndexSet) -> Self {
        let mut center = tiles[0];
        let mut radius_available = 0;
        for &pos in &tiles {
            let clearance = clearance(pos, available);
            if clearance > radius_available {
                center = pos;
                radius_available = clearance;
            }
        }

        let radius = tiles
            .iter()
            .map(|pos| center.distance_to(*pos))
            .max()
            .unwrap_or(0);
        let perimeter = tiles
            .iter()
            .flat_map(|pos| pos.neighbors())
            .filter(|n| !available.contains(n))
            .count();

        Self {
            area: tiles.len(),
            tiles,
            center,
            radius,
            perimeter,
            radius_available,
        }
    }
}

/// How far out from `pos` we can go before hitting an unavailable tile: the
/// largest `k` where the full disk of radius `k` is available. The position
/// itself must be available.
fn clearance(pos: HexCoord, available: &HexCoordIndexSet) -> u32 {
    let mut k = 0;
    // Each ring is only checked once, since the disk of radius k is the disk
    // of radius k-1 plus the ring at k
    while hex::ring_coords(pos, k + 1)
        .iter()
        .all(|p| available.contains(p))
    {
        k += 1;
    }
    k
}

/// Partition the available tiles into islands. Duplicates in the input are
/// ignored. Islands come out in the order their first tile appears in the
/// input, which keeps the output stable for a given input order.
pub fn find_islands(
    available: impl IntoIterator<Item = HexCoord>,
) -> Vec<Island> {
    let available: HexCoordIndexSet = available.into_iter().collect();
    let islands = flood_islands(&available);
    debug!(
        "Found {} islands among {} available tiles",
        islands.len(),
        available.len()
    );
    islands
}

/// Find islands, then keep only those that can fit a fully available disk of
/// radius `min_size` around their center, and have at least `min_size` tiles.
/// The survivors are sorted by `radius_available`, largest first; the sort is
/// stable, so ties stay in discovery order.
pub fn find_islands_with_min_size(
    available: impl IntoIterator<Item = HexCoord>,
    min_size: u32,
) -> Vec<Island> {
    let mut islands: Vec<Island> = find_islands(available)
        .into_iter()
        .filter(|island| {
            island.radius_available >= min_size
                && island.area >= min_size as usize
        })
        .collect();
    islands.sort_by(|a, b| b.radius_available.cmp(&a.radius_available));
    islands
}

fn flood_islands(available: &HexCoordIndexSet) -> Vec<Island> {
    let mut visited = HexCoordIndexSet::default();
    let mut islands = Vec::new();

    for &start in available {
        if !visited.insert(start) {
            continue;
        }

        let mut tiles = Vec::new();
        let mut stack = vec![start];
        while let Some(pos) = stack.pop() {
            tiles.push(pos);
            for neighbor in pos.neighbors() {
                if available.contains(&neighbor) && visited.insert(neighbor) {
                    stack.push(neighbor);
                }
            }
        }
        islands.push(Island::measure(tiles, available));
    }

    islands
}
