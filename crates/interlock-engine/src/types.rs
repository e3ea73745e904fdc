//! Shared types for the interlock piece generation engine.
//!
//! Every type that crosses the engine boundary serializes with
//! `camelCase` field names so the JSON shape matches what the play-loop,
//! renderer, and save/load collaborators expect (`gridRow`, `clipPath`,
//! `imageData`, ...).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::slice::ResampleFilter;

/// Re-export `RgbaImage` so downstream crates can work with piece
/// bitmaps without depending on `image` directly.
pub use image::RgbaImage;

/// Smallest supported number of rows or columns.
pub const MIN_GRID_DIMENSION: u32 = 2;

/// Largest supported number of rows or columns.
pub const MAX_GRID_DIMENSION: u32 = 8;

/// A 2D point in board pixel space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal position (pixels from the left board edge).
    pub x: f64,
    /// Vertical position (pixels from the top board edge).
    pub y: f64,
}

impl Position {
    /// Create a new position.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another position.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another position.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Component-wise translation.
    #[must_use]
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// A width/height pair in board pixel space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
}

impl Size {
    /// Create a new size.
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Row/column address of a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridCoord {
    /// Zero-based row.
    pub row: u32,
    /// Zero-based column.
    pub col: u32,
}

/// The four sides of a piece, in clockwise walking order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

impl Side {
    /// All sides in clockwise order starting at the top.
    pub const ALL: [Self; 4] = [Self::Top, Self::Right, Self::Bottom, Self::Left];

    /// The side facing this one on the neighbouring piece.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Top => Self::Bottom,
            Self::Right => Self::Left,
            Self::Bottom => Self::Top,
            Self::Left => Self::Right,
        }
    }

    /// Sign of the outward normal along the side's perpendicular axis.
    ///
    /// Top and left face the negative axis direction, right and bottom
    /// the positive one.
    #[must_use]
    pub const fn outward_sign(self) -> f64 {
        match self {
            Self::Top | Self::Left => -1.0,
            Self::Right | Self::Bottom => 1.0,
        }
    }

    /// `true` for the sides that run horizontally (top and bottom).
    #[must_use]
    pub const fn is_horizontal(self) -> bool {
        matches!(self, Self::Top | Self::Bottom)
    }

    /// Lowercase name, as used in edge keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Right => "right",
            Self::Bottom => "bottom",
            Self::Left => "left",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Indices of the cells adjacent to a cell, one slot per side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Neighbors {
    pub top: Option<usize>,
    pub right: Option<usize>,
    pub bottom: Option<usize>,
    pub left: Option<usize>,
}

impl Neighbors {
    /// The neighbour on `side`, if any.
    #[must_use]
    pub const fn get(&self, side: Side) -> Option<usize> {
        match side {
            Side::Top => self.top,
            Side::Right => self.right,
            Side::Bottom => self.bottom,
            Side::Left => self.left,
        }
    }
}

/// Puzzle grid dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSize {
    /// Number of rows.
    pub rows: u32,
    /// Number of columns.
    pub cols: u32,
}

impl GridSize {
    /// Create a new grid size. No validation is performed; see
    /// [`is_supported`](Self::is_supported).
    #[must_use]
    pub const fn new(rows: u32, cols: u32) -> Self {
        Self { rows, cols }
    }

    /// `true` when both dimensions lie in
    /// `MIN_GRID_DIMENSION..=MAX_GRID_DIMENSION`.
    #[must_use]
    pub const fn is_supported(self) -> bool {
        self.rows >= MIN_GRID_DIMENSION
            && self.cols >= MIN_GRID_DIMENSION
            && self.rows <= MAX_GRID_DIMENSION
            && self.cols <= MAX_GRID_DIMENSION
    }

    /// Total number of cells.
    #[must_use]
    pub const fn piece_count(self) -> usize {
        self.rows as usize * self.cols as usize
    }

    /// Row-major index to grid coordinate.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn index_to_coord(self, index: usize) -> GridCoord {
        let cols = self.cols as usize;
        GridCoord {
            row: (index / cols) as u32,
            col: (index % cols) as u32,
        }
    }

    /// Grid coordinate to row-major index.
    #[must_use]
    pub const fn coord_to_index(self, row: u32, col: u32) -> usize {
        row as usize * self.cols as usize + col as usize
    }

    /// `true` if the cell touches the outer boundary.
    #[must_use]
    pub const fn is_border(self, row: u32, col: u32) -> bool {
        row == 0 || col == 0 || row + 1 == self.rows || col + 1 == self.cols
    }

    /// `true` if the cell sits in one of the four corners.
    #[must_use]
    pub const fn is_corner(self, row: u32, col: u32) -> bool {
        (row == 0 || row + 1 == self.rows) && (col == 0 || col + 1 == self.cols)
    }

    /// Index of the centre cell (rounded towards the top-left on even
    /// dimensions).
    #[must_use]
    pub const fn center_index(self) -> usize {
        self.coord_to_index(self.rows / 2, self.cols / 2)
    }

    /// Adjacent cell indices for the cell at `index`.
    #[must_use]
    pub const fn neighbors(self, index: usize) -> Neighbors {
        let GridCoord { row, col } = self.index_to_coord(index);
        Neighbors {
            top: if row > 0 {
                Some(self.coord_to_index(row - 1, col))
            } else {
                None
            },
            right: if col + 1 < self.cols {
                Some(self.coord_to_index(row, col + 1))
            } else {
                None
            },
            bottom: if row + 1 < self.rows {
                Some(self.coord_to_index(row + 1, col))
            } else {
                None
            },
            left: if col > 0 {
                Some(self.coord_to_index(row, col - 1))
            } else {
                None
            },
        }
    }
}

impl fmt::Display for GridSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

/// Shape of one piece edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeType {
    /// Straight edge. Always used on the grid border.
    Flat,
    /// Tab protruding out of the piece.
    Knob,
    /// Notch cut into the piece.
    Hole,
}

impl EdgeType {
    /// The type the facing edge of the neighbouring piece must have.
    #[must_use]
    pub const fn complement(self) -> Self {
        match self {
            Self::Flat => Self::Flat,
            Self::Knob => Self::Hole,
            Self::Hole => Self::Knob,
        }
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flat => f.write_str("flat"),
            Self::Knob => f.write_str("knob"),
            Self::Hole => f.write_str("hole"),
        }
    }
}

/// Descriptor of a single edge.
///
/// Two edges that share a `seed_value` are the two faces of the same
/// internal grid edge and produce congruent tab outlines.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgePattern {
    /// Flat, knob, or hole.
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
    /// Protrusion strength in `[0.3, 0.7]`; 0 for flat edges.
    pub intensity: f64,
    /// Seed shared by both faces of an internal edge.
    pub seed_value: u32,
}

impl EdgePattern {
    /// A flat edge carrying `seed_value`.
    #[must_use]
    pub const fn flat(seed_value: u32) -> Self {
        Self {
            edge_type: EdgeType::Flat,
            intensity: 0.0,
            seed_value,
        }
    }

    /// `true` for straight edges.
    #[must_use]
    pub const fn is_flat(&self) -> bool {
        matches!(self.edge_type, EdgeType::Flat)
    }
}

/// The four edge descriptors of one piece.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgePatterns {
    pub top: EdgePattern,
    pub right: EdgePattern,
    pub bottom: EdgePattern,
    pub left: EdgePattern,
}

impl EdgePatterns {
    /// The descriptor on `side`.
    #[must_use]
    pub const fn get(&self, side: Side) -> &EdgePattern {
        match side {
            Side::Top => &self.top,
            Side::Right => &self.right,
            Side::Bottom => &self.bottom,
            Side::Left => &self.left,
        }
    }

    /// Iterate `(side, pattern)` pairs in clockwise order.
    pub fn iter(&self) -> impl Iterator<Item = (Side, &EdgePattern)> {
        Side::ALL.into_iter().map(move |side| (side, self.get(side)))
    }

    /// Number of edges of the given type.
    #[must_use]
    pub fn count(&self, edge_type: EdgeType) -> usize {
        self.iter().filter(|(_, p)| p.edge_type == edge_type).count()
    }
}

/// Per-side expansion ratios of a piece's bitmap into its neighbours.
///
/// A side on the grid border never expands (ratio 0).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpansionInfo {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl ExpansionInfo {
    /// The ratio on `side`.
    #[must_use]
    pub const fn get(&self, side: Side) -> f64 {
        match side {
            Side::Top => self.top,
            Side::Right => self.right,
            Side::Bottom => self.bottom,
            Side::Left => self.left,
        }
    }
}

/// Position and tolerance within which a dragged piece counts as placed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapTarget {
    /// Board position the piece's base rectangle should reach.
    pub position: Position,
    /// Per-axis tolerance in pixels.
    pub tolerance: f64,
}

/// Pure grid descriptor shared by every piece of a puzzle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridLayout {
    /// Rows and columns.
    pub grid_size: GridSize,
    /// Size of one grid cell.
    pub base_size: Size,
    /// Fraction of a cell each piece bitmap grows into a neighbour.
    pub expansion_ratio: f64,
    /// Side length of the square board the source image is fitted to.
    pub target_size: f64,
}

/// Complete geometry of one grid cell and its expanded bitmap box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PieceGeometry {
    pub base_position: Position,
    pub base_size: Size,
    pub expansion: ExpansionInfo,
    pub expanded_position: Position,
    pub expanded_size: Size,
}

/// Difficulty classification derived from the piece count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Expert,
}

impl Difficulty {
    /// Classify: up to 9 pieces is easy, 16 medium, 25 hard, beyond
    /// that expert.
    #[must_use]
    pub const fn from_piece_count(count: usize) -> Self {
        match count {
            0..=9 => Self::Easy,
            10..=16 => Self::Medium,
            17..=25 => Self::Hard,
            _ => Self::Expert,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Easy => f.write_str("easy"),
            Self::Medium => f.write_str("medium"),
            Self::Hard => f.write_str("hard"),
            Self::Expert => f.write_str("expert"),
        }
    }
}

/// Piece silhouette family. The engine only emits irregular pieces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceShape {
    #[default]
    Irregular,
}

/// One generated puzzle piece.
///
/// Geometry fields are fixed at generation time. `x`, `y`, `rotation`
/// and `is_correct` belong to the play loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PuzzlePiece {
    /// Stable identifier (the row-major index as a string).
    pub id: String,
    pub grid_row: u32,
    pub grid_col: u32,
    /// Slot the piece belongs in: `grid_row * cols + grid_col`.
    pub correct_slot: usize,
    /// Top-left of the piece's exact grid cell.
    pub base_position: Position,
    pub base_size: Size,
    /// Top-left of the cell grown into its neighbours.
    pub expanded_position: Position,
    pub expanded_size: Size,
    pub expansion: ExpansionInfo,
    pub edges: EdgePatterns,
    /// `polygon(...)` silhouette in percent of the expanded box.
    pub clip_path: String,
    /// PNG data URL of the expanded box. Empty when bitmaps have been
    /// stripped for persistence.
    pub image_data: String,
    pub snap_targets: Vec<SnapTarget>,
    pub x: f64,
    pub y: f64,
    /// Clockwise rotation in degrees (multiples of 90).
    pub rotation: f64,
    pub correct_rotation: f64,
    pub is_correct: bool,
}

impl PuzzlePiece {
    /// Geometry fields bundled together.
    #[must_use]
    pub const fn geometry(&self) -> PieceGeometry {
        PieceGeometry {
            base_position: self.base_position,
            base_size: self.base_size,
            expansion: self.expansion,
            expanded_position: self.expanded_position,
            expanded_size: self.expanded_size,
        }
    }

    /// Current play-state position.
    #[must_use]
    pub const fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

/// A complete generated puzzle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PuzzleConfig {
    pub id: String,
    pub name: String,
    /// Reference to the source image (path, URL, or data URL).
    pub original_image: String,
    pub grid_size: GridSize,
    pub piece_shape: PieceShape,
    pub difficulty: Difficulty,
    /// Seed the edge map and scatter were drawn from.
    pub seed: u32,
    pub layout: GridLayout,
    /// Filter the board was resampled with; bitmaps are restored with it.
    pub resample_filter: ResampleFilter,
    /// Matte the board was composited over; bitmaps are restored with it.
    pub matte: [u8; 3],
    pub pieces: Vec<PuzzlePiece>,
    /// Milliseconds since the Unix epoch.
    pub created_at: u64,
    /// Milliseconds since the Unix epoch.
    pub updated_at: u64,
}

/// Errors that can occur while generating a puzzle.
///
/// Every variant is fatal to the call: no partial puzzle is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// A request parameter is outside its supported range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The source image could not be decoded.
    #[error("failed to load image: {0}")]
    ImageLoad(String),

    /// The raster backend could not provide a drawing surface.
    #[error("rendering context unavailable: {0}")]
    RenderingContext(String),

    /// A piece bitmap could not be encoded.
    #[error("failed to encode piece bitmap: {0}")]
    Encode(String),

    /// The worker pool could not be created.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
}

impl From<image::ImageError> for EngineError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageLoad(err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // --- Position ---

    #[test]
    fn position_distance() {
        let a = Position::new(0.0, 0.0);
        let b = Position::new(3.0, 4.0);
        assert!((a.distance(b) - 5.0).abs() < f64::EPSILON);
        assert!((a.distance_squared(b) - 25.0).abs() < f64::EPSILON);
    }

    // --- GridSize ---

    #[test]
    fn supported_grid_bounds() {
        assert!(GridSize::new(2, 2).is_supported());
        assert!(GridSize::new(8, 8).is_supported());
        assert!(GridSize::new(2, 8).is_supported());
        assert!(!GridSize::new(1, 1).is_supported());
        assert!(!GridSize::new(9, 9).is_supported());
        assert!(!GridSize::new(3, 9).is_supported());
    }

    #[test]
    fn index_coord_round_trip() {
        let grid = GridSize::new(3, 4);
        for index in 0..grid.piece_count() {
            let GridCoord { row, col } = grid.index_to_coord(index);
            assert_eq!(grid.coord_to_index(row, col), index);
        }
        assert_eq!(grid.index_to_coord(5), GridCoord { row: 1, col: 1 });
    }

    #[test]
    fn neighbors_of_corner_and_center() {
        let grid = GridSize::new(3, 3);
        assert_eq!(
            grid.neighbors(0),
            Neighbors {
                top: None,
                right: Some(1),
                bottom: Some(3),
                left: None,
            }
        );
        assert_eq!(
            grid.neighbors(4),
            Neighbors {
                top: Some(1),
                right: Some(5),
                bottom: Some(7),
                left: Some(3),
            }
        );
    }

    #[test]
    fn border_and_corner_classification() {
        let grid = GridSize::new(4, 4);
        assert!(grid.is_corner(0, 0));
        assert!(grid.is_corner(3, 0));
        assert!(!grid.is_corner(0, 1));
        assert!(grid.is_border(0, 1));
        assert!(!grid.is_border(1, 2));
        assert_eq!(grid.center_index(), 10);
    }

    // --- Side / EdgeType ---

    #[test]
    fn opposite_sides() {
        for side in Side::ALL {
            assert_eq!(side.opposite().opposite(), side);
            assert!((side.outward_sign() + side.opposite().outward_sign()).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn edge_type_complement() {
        assert_eq!(EdgeType::Knob.complement(), EdgeType::Hole);
        assert_eq!(EdgeType::Hole.complement(), EdgeType::Knob);
        assert_eq!(EdgeType::Flat.complement(), EdgeType::Flat);
    }

    // --- Difficulty ---

    #[test]
    fn difficulty_thresholds() {
        assert_eq!(Difficulty::from_piece_count(4), Difficulty::Easy);
        assert_eq!(Difficulty::from_piece_count(9), Difficulty::Easy);
        assert_eq!(Difficulty::from_piece_count(12), Difficulty::Medium);
        assert_eq!(Difficulty::from_piece_count(16), Difficulty::Medium);
        assert_eq!(Difficulty::from_piece_count(25), Difficulty::Hard);
        assert_eq!(Difficulty::from_piece_count(36), Difficulty::Expert);
    }

    // --- Serde shape ---

    #[test]
    fn edge_pattern_serializes_with_collaborator_field_names() {
        let pattern = EdgePattern {
            edge_type: EdgeType::Knob,
            intensity: 0.5,
            seed_value: 42,
        };
        let json = serde_json::to_string(&pattern).unwrap();
        assert_eq!(json, r#"{"type":"knob","intensity":0.5,"seedValue":42}"#);
    }

    #[test]
    fn engine_error_display() {
        let err = EngineError::InvalidParameter("grid size 1x1".to_string());
        assert_eq!(err.to_string(), "invalid parameter: grid size 1x1");
    }

    #[test]
    fn image_error_maps_to_image_load() {
        let err = image::load_from_memory(&[0xFF, 0x00]).unwrap_err();
        assert!(matches!(EngineError::from(err), EngineError::ImageLoad(_)));
    }
}
