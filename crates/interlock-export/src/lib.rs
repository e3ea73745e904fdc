//! interlock-export: Pure format serializers (sans-IO)
//!
//! Converts generated puzzles into output formats: an SVG of the board's
//! cut lines, per-piece SVG masks, and piece bitmaps with the jigsaw
//! silhouette baked into the alpha channel.

pub mod mask;
pub mod svg;

use interlock_engine::EngineError;

pub use mask::render_masked_piece;
pub use svg::{SvgMetadata, build_path_data, clip_polygon_pixels, to_board_svg, to_piece_mask_svg};

/// Errors from the export serializers.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The engine failed to decode a piece bitmap.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A piece's clip path is not a `polygon(...)` of percent pairs.
    #[error("invalid clip path: {0}")]
    InvalidClipPath(String),

    /// The rasterizer could not allocate or fill the mask.
    #[error("mask rasterization failed: {0}")]
    Raster(String),
}
