//! Puzzle generation: the orchestrator that ties edges, layout, slicing
//! and clip paths together.
//!
//! The source is decoded once and fitted onto the board, the edge map
//! is built once, then every piece is assembled independently on a
//! rayon pool and collected back in row-major order, so the result does
//! not depend on scheduling.

use std::borrow::Cow;
use std::hash::Hasher;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use siphasher::sip::SipHasher13;

use crate::clip::generate_clip_path;
use crate::edge::{DEFAULT_BASE_INTENSITY, EdgePatternMap, extract_piece_edges, generate_puzzle_edges};
use crate::layout::{
    DEFAULT_SNAP_TOLERANCE, DEFAULT_TARGET_SIZE, calculate_piece_geometry, calculate_snap_targets,
    create_grid_layout,
};
use crate::play::scatter_position;
use crate::random::{SeededRandom, mix_seed};
use crate::slice::{
    DEFAULT_MIN_PIECE_SIZE, ImageSurface, ResampleFilter, data_url_bytes, encode_data_url, load_image,
    prepare_board, slice_piece, validate_image_for_slicing,
};
use crate::types::{
    Difficulty, EngineError, GridLayout, GridSize, PieceGeometry, PieceShape, PuzzleConfig, PuzzlePiece,
};

/// Default fraction of a cell each piece grows into a neighbour.
pub const DEFAULT_EXPANSION_RATIO: f64 = 0.4;

/// Smallest accepted expansion ratio.
pub const MIN_EXPANSION_RATIO: f64 = 0.2;

/// Largest accepted expansion ratio.
pub const MAX_EXPANSION_RATIO: f64 = 0.8;

/// Smallest accepted board size, in pixels.
pub const MIN_TARGET_SIZE: f64 = 64.0;

/// Largest accepted board size, in pixels.
pub const MAX_TARGET_SIZE: f64 = 4096.0;

/// Salt for the initial scatter stream, kept apart from edge salts.
const SCATTER_SALT: u32 = 0x5CA7_7E25;

/// Where the source image comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Encoded image bytes plus the reference recorded as
    /// `original_image` (a path or URL).
    Encoded { reference: String, bytes: Vec<u8> },
    /// A base64 `data:image/...` URL, recorded verbatim.
    DataUrl(String),
}

impl ImageSource {
    /// Value stored in [`PuzzleConfig::original_image`].
    #[must_use]
    pub fn reference(&self) -> &str {
        match self {
            Self::Encoded { reference, .. } => reference,
            Self::DataUrl(url) => url,
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Self::Encoded { bytes, .. } => bytes.is_empty(),
            Self::DataUrl(url) => url.trim().is_empty(),
        }
    }

    fn bytes(&self) -> Result<Cow<'_, [u8]>, EngineError> {
        match self {
            Self::Encoded { bytes, .. } => Ok(Cow::Borrowed(bytes)),
            Self::DataUrl(url) => data_url_bytes(url).map(Cow::Owned),
        }
    }
}

/// Tunables for [`generate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeneratorOptions {
    /// Seed for edges and scatter. Derived from the image and grid when
    /// absent.
    pub seed: Option<u32>,
    /// Side length of the square board, in pixels.
    pub target_size: f64,
    /// Base tab intensity before the centre boost.
    pub base_intensity: f64,
    /// Per-axis snap tolerance, in pixels.
    pub snap_tolerance: f64,
    /// Filter used to fit the source onto the board.
    pub resample_filter: ResampleFilter,
    /// Opaque colour translucent source pixels are composited over.
    pub matte: [u8; 3],
    /// Worker threads; `None` uses rayon's default.
    pub threads: Option<usize>,
    /// Timestamp to record, in ms since the Unix epoch. Defaults to now.
    pub now_ms: Option<u64>,
}

impl GeneratorOptions {
    pub const DEFAULT_TARGET_SIZE: f64 = DEFAULT_TARGET_SIZE;
    pub const DEFAULT_BASE_INTENSITY: f64 = DEFAULT_BASE_INTENSITY;
    pub const DEFAULT_SNAP_TOLERANCE: f64 = DEFAULT_SNAP_TOLERANCE;
    pub const DEFAULT_MATTE: [u8; 3] = [255, 255, 255];
    pub const DEFAULT_RESAMPLE_FILTER: ResampleFilter = ResampleFilter::Triangle;
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            seed: None,
            target_size: Self::DEFAULT_TARGET_SIZE,
            base_intensity: Self::DEFAULT_BASE_INTENSITY,
            snap_tolerance: Self::DEFAULT_SNAP_TOLERANCE,
            resample_filter: Self::DEFAULT_RESAMPLE_FILTER,
            matte: Self::DEFAULT_MATTE,
            threads: None,
            now_ms: None,
        }
    }
}

/// Everything needed to generate one puzzle.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub image: ImageSource,
    pub name: String,
    pub grid_size: GridSize,
    /// Defaults to [`DEFAULT_EXPANSION_RATIO`].
    pub expansion_ratio: Option<f64>,
    pub options: GeneratorOptions,
}

impl GenerateRequest {
    /// The expansion ratio that will be used.
    #[must_use]
    pub fn effective_expansion_ratio(&self) -> f64 {
        self.expansion_ratio.unwrap_or(DEFAULT_EXPANSION_RATIO)
    }
}

/// Reject requests outside the supported parameter ranges.
///
/// # Errors
///
/// Returns [`EngineError::InvalidParameter`] naming the first offending
/// parameter.
pub fn validate_params(request: &GenerateRequest) -> Result<(), EngineError> {
    let invalid = |msg: String| Err(EngineError::InvalidParameter(msg));

    if request.image.is_empty() {
        return invalid("image data must not be empty".to_string());
    }
    if request.name.trim().is_empty() {
        return invalid("puzzle name must not be empty".to_string());
    }
    if !request.grid_size.is_supported() {
        return invalid(format!(
            "grid size {} is outside the supported range 2x2 to 8x8",
            request.grid_size
        ));
    }

    let ratio = request.effective_expansion_ratio();
    if !(MIN_EXPANSION_RATIO..=MAX_EXPANSION_RATIO).contains(&ratio) {
        return invalid(format!(
            "expansion ratio {ratio} is outside {MIN_EXPANSION_RATIO}..={MAX_EXPANSION_RATIO}"
        ));
    }

    let options = &request.options;
    if !(MIN_TARGET_SIZE..=MAX_TARGET_SIZE).contains(&options.target_size) {
        return invalid(format!(
            "target size {} is outside {MIN_TARGET_SIZE}..={MAX_TARGET_SIZE}",
            options.target_size
        ));
    }
    if !options.base_intensity.is_finite() {
        return invalid("base intensity must be finite".to_string());
    }
    if !options.snap_tolerance.is_finite() || options.snap_tolerance < 0.0 {
        return invalid(format!(
            "snap tolerance {} must be finite and non-negative",
            options.snap_tolerance
        ));
    }
    Ok(())
}

/// Difficulty for a grid, from its piece count.
#[must_use]
pub const fn calculate_difficulty(grid: GridSize) -> Difficulty {
    Difficulty::from_piece_count(grid.piece_count())
}

/// Seed derived from the image bytes, grid, and expansion ratio.
#[must_use]
pub fn derive_seed(image_bytes: &[u8], grid: GridSize, expansion_ratio: f64) -> u32 {
    let mut hasher = SipHasher13::new();
    hasher.write(image_bytes);
    hasher.write_u32(grid.rows);
    hasher.write_u32(grid.cols);
    hasher.write_u64(expansion_ratio.to_bits());
    fold_hash(hasher.finish())
}

#[allow(clippy::cast_possible_truncation)]
const fn fold_hash(hash: u64) -> u32 {
    (hash ^ (hash >> 32)) as u32
}

fn puzzle_id(seed: u32, name: &str, created_at: u64) -> String {
    let mut hasher = SipHasher13::new();
    hasher.write_u32(seed);
    hasher.write(name.as_bytes());
    hasher.write_u64(created_at);
    format!("{:016x}", hasher.finish())
}

/// Milliseconds since the Unix epoch.
fn now_ms() -> u64 {
    web_time::SystemTime::now()
        .duration_since(web_time::UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

fn build_thread_pool(threads: Option<usize>) -> Result<rayon::ThreadPool, EngineError> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(EngineError::InvalidParameter(
            "'threads' must be >= 1 when set".to_string(),
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| EngineError::ThreadPool(format!("failed to build rayon thread pool: {e}")))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn board_pixels(target_size: f64) -> u32 {
    target_size.round().clamp(1.0, MAX_TARGET_SIZE) as u32
}

/// Cut and encode the bitmap for one piece.
fn piece_bitmap(board: &image::RgbaImage, geometry: &PieceGeometry) -> Result<String, EngineError> {
    let surface: ImageSurface = slice_piece(board, geometry.expanded_position, geometry.expanded_size)?;
    encode_data_url(&surface)
}

fn build_piece(
    index: usize,
    layout: &GridLayout,
    edge_map: &EdgePatternMap,
    board: &image::RgbaImage,
    snap_tolerance: f64,
) -> Result<PuzzlePiece, EngineError> {
    let coord = layout.grid_size.index_to_coord(index);
    let geometry = calculate_piece_geometry(index, layout);
    let edges = extract_piece_edges(index, edge_map);
    let image_data = piece_bitmap(board, &geometry)?;
    let clip_path = generate_clip_path(&edges, geometry.expanded_size, geometry.base_size, geometry.expansion);

    Ok(PuzzlePiece {
        id: index.to_string(),
        grid_row: coord.row,
        grid_col: coord.col,
        correct_slot: layout.grid_size.coord_to_index(coord.row, coord.col),
        base_position: geometry.base_position,
        base_size: geometry.base_size,
        expanded_position: geometry.expanded_position,
        expanded_size: geometry.expanded_size,
        expansion: geometry.expansion,
        edges,
        clip_path,
        image_data,
        snap_targets: calculate_snap_targets(&geometry, snap_tolerance),
        x: 0.0,
        y: 0.0,
        rotation: 0.0,
        correct_rotation: 0.0,
        is_correct: false,
    })
}

/// Generate a complete puzzle from `request`.
///
/// # Errors
///
/// - [`EngineError::InvalidParameter`] if the request is out of range.
/// - [`EngineError::ImageLoad`] if the source cannot be decoded.
/// - [`EngineError::RenderingContext`] or [`EngineError::Encode`] if a
///   piece bitmap cannot be produced.
/// - [`EngineError::ThreadPool`] if the worker pool cannot be built.
#[tracing::instrument(skip(request), fields(name = %request.name, grid = %request.grid_size))]
pub fn generate(request: &GenerateRequest) -> Result<PuzzleConfig, EngineError> {
    validate_params(request)?;
    let options = &request.options;
    let grid = request.grid_size;
    let ratio = request.effective_expansion_ratio();

    let bytes = request.image.bytes()?;
    let source = load_image(&bytes)?;
    tracing::debug!(width = source.width(), height = source.height(), "decoded source image");

    if let Err(warning) = validate_image_for_slicing(source.width(), source.height(), grid, DEFAULT_MIN_PIECE_SIZE) {
        tracing::warn!(%warning, "source image is small for this grid; continuing");
    }

    let seed = options.seed.unwrap_or_else(|| derive_seed(&bytes, grid, ratio));
    let layout = create_grid_layout(grid, options.target_size, ratio);
    let board = prepare_board(
        &source,
        board_pixels(options.target_size),
        options.resample_filter,
        options.matte,
    );
    drop(source);
    tracing::debug!(seed, board = board.width(), "prepared board");

    let edge_map = generate_puzzle_edges(grid, options.base_intensity, seed);
    tracing::debug!(faces = edge_map.len(), "generated edge map");

    let pool = build_thread_pool(options.threads)?;
    let mut pieces = pool.install(|| {
        (0..grid.piece_count())
            .into_par_iter()
            .map(|index| build_piece(index, &layout, &edge_map, &board, options.snap_tolerance))
            .collect::<Result<Vec<_>, _>>()
    })?;
    tracing::debug!(pieces = pieces.len(), "assembled pieces");

    let mut scatter = SeededRandom::new(mix_seed(seed, SCATTER_SALT));
    for piece in &mut pieces {
        let position = scatter_position(&mut scatter, layout.target_size);
        piece.x = position.x;
        piece.y = position.y;
    }

    let created_at = options.now_ms.unwrap_or_else(now_ms);
    let config = PuzzleConfig {
        id: puzzle_id(seed, &request.name, created_at),
        name: request.name.clone(),
        original_image: request.image.reference().to_string(),
        grid_size: grid,
        piece_shape: PieceShape::Irregular,
        difficulty: calculate_difficulty(grid),
        seed,
        layout,
        resample_filter: options.resample_filter,
        matte: options.matte,
        pieces,
        created_at,
        updated_at: created_at,
    };

    tracing::info!(id = %config.id, pieces = config.pieces.len(), "generated puzzle");
    Ok(config)
}

/// Drop every piece bitmap, leaving geometry and play state.
///
/// Use before persisting; [`restore_bitmaps`] rebuilds them.
pub fn strip_bitmaps(config: &mut PuzzleConfig) {
    for piece in &mut config.pieces {
        piece.image_data.clear();
    }
}

/// Rebuild piece bitmaps from the original image bytes and the stored
/// geometry.
///
/// The board is rebuilt with the filter and matte recorded in `config`,
/// so the bitmaps are identical to the originals whatever filter and
/// matte `options` carries. Only `options.threads` is used.
///
/// # Errors
///
/// Same as [`generate`], minus parameter validation of the grid.
#[tracing::instrument(skip(config, image_bytes, options), fields(id = %config.id))]
pub fn restore_bitmaps(
    config: &mut PuzzleConfig,
    image_bytes: &[u8],
    options: &GeneratorOptions,
) -> Result<(), EngineError> {
    let source = load_image(image_bytes)?;
    let board = prepare_board(
        &source,
        board_pixels(config.layout.target_size),
        config.resample_filter,
        config.matte,
    );
    drop(source);

    let pool = build_thread_pool(options.threads)?;
    let bitmaps = pool.install(|| {
        config
            .pieces
            .par_iter()
            .map(|piece| piece_bitmap(&board, &piece.geometry()))
            .collect::<Result<Vec<_>, _>>()
    })?;

    for (piece, image_data) in config.pieces.iter_mut().zip(bitmaps) {
        piece.image_data = image_data;
    }
    tracing::debug!(pieces = config.pieces.len(), "restored bitmaps");
    Ok(())
}
