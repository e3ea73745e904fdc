//! Edge pattern assignment.
//!
//! Every internal grid edge is drawn exactly once and stored under both
//! of its faces: the piece on the left/top gets the primary pattern, the
//! piece on the right/bottom gets the complement. Outer border edges are
//! always flat.
//!
//! Tab profiles are produced by [`generate_shape_points`] in a canonical
//! edge frame: `x` runs along the edge from its start (left or top end)
//! to its end, `y` is the displacement along the side's outward normal.
//! Both faces of a shared edge replay the same seed, so the knob on one
//! piece and the hole on its neighbour trace the same curve.

use std::collections::BTreeMap;
use std::fmt;

use crate::random::{SeededRandom, mix_seed};
use crate::types::{EdgePattern, EdgePatterns, EdgeType, GridSize, Position, Side};

/// Probability that an internal edge gets a knob/hole pair rather than
/// a flat pair.
pub const KNOB_PROBABILITY: f64 = 0.7;

/// Lower bound for the intensity of a non-flat edge.
pub const MIN_INTENSITY: f64 = 0.3;

/// Upper bound for the intensity of a non-flat edge.
pub const MAX_INTENSITY: f64 = 0.7;

/// Default base intensity before the centre boost.
pub const DEFAULT_BASE_INTENSITY: f64 = 0.5;

/// Extra intensity granted to the centre of the grid, fading to zero at
/// the farthest cell.
pub const CENTER_INTENSITY_BOOST: f64 = 0.2;

/// Tab width as a fraction of the edge length, before jitter.
pub const TAB_WIDTH_FRACTION: f64 = 0.4;

/// Fraction of the available expansion depth a tab peak may use.
pub const TAB_ROOM_FRACTION: f64 = 0.9;

/// Lower bound of the per-edge width and height jitter.
pub const MIN_TAB_JITTER: f64 = 0.8;

/// Upper bound of the per-edge width and height jitter.
pub const MAX_TAB_JITTER: f64 = 1.2;

/// Salt offsets distinguishing the two edges drawn per cell.
const RIGHT_EDGE_SALT: u32 = 1;
const BOTTOM_EDGE_SALT: u32 = 2;

/// Draws consumed by [`generate_complementary_pair`] for a non-flat
/// pair. The shape jitter continues the stream after them.
const PAIR_DECISION_DRAWS: usize = 2;

/// Address of one face of an edge: the owning piece and the side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey {
    pub index: usize,
    pub side: Side,
}

impl EdgeKey {
    #[must_use]
    pub const fn new(index: usize, side: Side) -> Self {
        Self { index, side }
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.index, self.side)
    }
}

/// Edge descriptors for every face of every piece in a grid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgePatternMap {
    edges: BTreeMap<EdgeKey, EdgePattern>,
}

impl EdgePatternMap {
    /// Pattern stored under `key`, if any.
    #[must_use]
    pub fn get(&self, key: EdgeKey) -> Option<&EdgePattern> {
        self.edges.get(&key)
    }

    /// Number of stored faces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// `true` if no face has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Iterate stored faces in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&EdgeKey, &EdgePattern)> {
        self.edges.iter()
    }

    fn insert(&mut self, key: EdgeKey, pattern: EdgePattern) {
        self.edges.insert(key, pattern);
    }
}

/// Clamp an intensity into `[MIN_INTENSITY, MAX_INTENSITY]`.
#[must_use]
pub fn normalize_intensity(intensity: f64) -> f64 {
    intensity.clamp(MIN_INTENSITY, MAX_INTENSITY)
}

/// Draw the two faces of one edge from `seed`.
///
/// With probability [`KNOB_PROBABILITY`] the pair is knob/hole (a second
/// draw decides which face gets the knob); otherwise both faces are
/// flat. Both faces carry `seed` and the same normalised intensity.
#[must_use]
pub fn generate_complementary_pair(seed: u32, intensity: f64) -> (EdgePattern, EdgePattern) {
    let mut rng = SeededRandom::new(seed);

    if rng.next() >= KNOB_PROBABILITY {
        return (EdgePattern::flat(seed), EdgePattern::flat(seed));
    }

    let primary_is_knob = rng.next() < 0.5;
    let intensity = normalize_intensity(intensity);
    let make = |edge_type| EdgePattern {
        edge_type,
        intensity,
        seed_value: seed,
    };

    if primary_is_knob {
        (make(EdgeType::Knob), make(EdgeType::Hole))
    } else {
        (make(EdgeType::Hole), make(EdgeType::Knob))
    }
}

/// Seed for the edge owned by the cell at `(row, col)`.
///
/// The grid-position key keeps edges distinct within a puzzle; mixing
/// in `puzzle_seed` keeps puzzles of the same size distinct from each
/// other.
#[must_use]
pub const fn edge_seed(puzzle_seed: u32, row: u32, col: u32, side: Side) -> u32 {
    let salt = match side {
        Side::Bottom | Side::Top => BOTTOM_EDGE_SALT,
        Side::Right | Side::Left => RIGHT_EDGE_SALT,
    };
    let key = row
        .wrapping_mul(1000)
        .wrapping_add(col.wrapping_mul(100))
        .wrapping_add(salt);
    mix_seed(puzzle_seed, key)
}

/// Intensity for the edges owned by `(row, col)`: cells nearer the grid
/// centre get a stronger tab.
#[must_use]
pub fn calculate_dynamic_intensity(base: f64, row: u32, col: u32, grid: GridSize) -> f64 {
    let center_row = grid.rows / 2;
    let center_col = grid.cols / 2;
    let distance = f64::from(row.abs_diff(center_row) + col.abs_diff(center_col));
    let max_distance = f64::from(center_row + center_col).max(1.0);
    let ratio = 1.0 - distance / max_distance;
    normalize_intensity(ratio.mul_add(CENTER_INTENSITY_BOOST, base))
}

/// Assign a pattern to every face of every piece in `grid`.
#[must_use]
pub fn generate_puzzle_edges(grid: GridSize, base_intensity: f64, puzzle_seed: u32) -> EdgePatternMap {
    let mut map = EdgePatternMap::default();

    for row in 0..grid.rows {
        for col in 0..grid.cols {
            let index = grid.coord_to_index(row, col);
            let intensity = calculate_dynamic_intensity(base_intensity, row, col, grid);

            if col + 1 < grid.cols {
                let seed = edge_seed(puzzle_seed, row, col, Side::Right);
                let (primary, complement) = generate_complementary_pair(seed, intensity);
                map.insert(EdgeKey::new(index, Side::Right), primary);
                map.insert(EdgeKey::new(index + 1, Side::Left), complement);
            }

            if row + 1 < grid.rows {
                let seed = edge_seed(puzzle_seed, row, col, Side::Bottom);
                let (primary, complement) = generate_complementary_pair(seed, intensity);
                map.insert(EdgeKey::new(index, Side::Bottom), primary);
                map.insert(EdgeKey::new(index + grid.cols as usize, Side::Top), complement);
            }

            if row == 0 {
                map.insert(EdgeKey::new(index, Side::Top), EdgePattern::flat(0));
            }
            if col == 0 {
                map.insert(EdgeKey::new(index, Side::Left), EdgePattern::flat(0));
            }
            if row + 1 == grid.rows {
                map.insert(EdgeKey::new(index, Side::Bottom), EdgePattern::flat(0));
            }
            if col + 1 == grid.cols {
                map.insert(EdgeKey::new(index, Side::Right), EdgePattern::flat(0));
            }
        }
    }

    map
}

/// The four faces of the piece at `index`.
///
/// A face missing from the map falls back to flat. That only happens
/// when the map was built for a different grid.
#[must_use]
pub fn extract_piece_edges(index: usize, map: &EdgePatternMap) -> EdgePatterns {
    let lookup = |side| {
        let key = EdgeKey::new(index, side);
        let pattern = map.get(key).copied();
        debug_assert!(pattern.is_some(), "edge {key} missing from map");
        pattern.unwrap_or(EdgePattern::flat(0))
    };

    EdgePatterns {
        top: lookup(Side::Top),
        right: lookup(Side::Right),
        bottom: lookup(Side::Bottom),
        left: lookup(Side::Left),
    }
}

/// `true` if two faces can sit against each other: both flat, or a
/// knob and a hole sharing a seed.
#[must_use]
pub fn are_edges_compatible(a: &EdgePattern, b: &EdgePattern) -> bool {
    match (a.edge_type, b.edge_type) {
        (EdgeType::Flat, EdgeType::Flat) => true,
        (EdgeType::Knob, EdgeType::Hole) | (EdgeType::Hole, EdgeType::Knob) => {
            a.seed_value == b.seed_value
        }
        _ => false,
    }
}

/// Profile of one edge in its canonical frame.
///
/// `edge_length` is the length of the base-rectangle side. `room` is the
/// depth available past the base rectangle on the knob side of the edge.
/// The peak is `edge_length * intensity * height_jitter`, bounded by
/// [`TAB_ROOM_FRACTION`] of `room` scaled by intensity and jitter
/// relative to their maxima, so it never exceeds that fraction of the
/// room and still orders by intensity.
///
/// Flat edges give the two endpoints. Knobs and holes give seven points:
/// endpoints, tab shoulders, tab flanks, and peak. `y` is positive for a
/// knob and negative for a hole; callers multiply by the side's outward
/// sign.
#[must_use]
pub fn generate_shape_points(pattern: &EdgePattern, edge_length: f64, room: f64) -> Vec<Position> {
    let direction = match pattern.edge_type {
        EdgeType::Flat => {
            return vec![Position::new(0.0, 0.0), Position::new(edge_length, 0.0)];
        }
        EdgeType::Knob => 1.0,
        EdgeType::Hole => -1.0,
    };

    let mut rng = SeededRandom::new(pattern.seed_value);
    rng.skip(PAIR_DECISION_DRAWS);
    let height_jitter = rng.next_float(MIN_TAB_JITTER, MAX_TAB_JITTER);
    let width_jitter = rng.next_float(MIN_TAB_JITTER, MAX_TAB_JITTER);

    let tab_width = edge_length * TAB_WIDTH_FRACTION * width_jitter;
    let start = (edge_length - tab_width) / 2.0;
    let end = start + tab_width;
    let mid = edge_length / 2.0;
    let shoulder = tab_width * 0.2;

    // Both bounds grow with intensity and jitter, so deeper-requested
    // tabs stay deeper even when the room bound is the smaller one.
    let scale = (pattern.intensity / MAX_INTENSITY) * (height_jitter / MAX_TAB_JITTER);
    let room_peak = room.max(0.0) * TAB_ROOM_FRACTION * scale;
    let peak = (edge_length * pattern.intensity * height_jitter).min(room_peak);
    let height = peak * direction;

    vec![
        Position::new(0.0, 0.0),
        Position::new(start, 0.0),
        Position::new(start + shoulder, height * 0.7),
        Position::new(mid, height),
        Position::new(end - shoulder, height * 0.7),
        Position::new(end, 0.0),
        Position::new(edge_length, 0.0),
    ]
}
