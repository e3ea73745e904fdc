//! interlock-engine: Pure jigsaw piece generation (sans-IO).
//!
//! Turns a source image plus a grid size into interlocking pieces:
//! decode -> square board -> edge map -> per-piece geometry ->
//! bitmap slice -> clip path -> snap targets.
//!
//! Each piece carries a PNG data URL of its expanded bounding box, a
//! knob/hole/flat descriptor per edge, and a `polygon(...)` clip path
//! that carves the jigsaw silhouette out of that bitmap.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! byte slices and returns structured data. Filesystem interaction
//! lives in `interlock-cli`; vector and masked-bitmap output lives in
//! `interlock-export`.

pub mod clip;
pub mod edge;
pub mod generator;
pub mod layout;
pub mod play;
pub mod random;
pub mod slice;
pub mod types;

pub use clip::{generate_clip_path, parse_clip_path, validate_clip_path};
pub use edge::{EdgeKey, EdgePatternMap};
pub use generator::{
    GenerateRequest, GeneratorOptions, ImageSource, generate, restore_bitmaps, strip_bitmaps,
};
pub use play::{CompletionStatus, PuzzleStats, get_puzzle_stats, reset_puzzle, validate_completion};
pub use random::SeededRandom;
pub use slice::{ImageSurface, RasterSurface, ResampleFilter};
pub use types::{
    Difficulty, EdgePattern, EdgePatterns, EdgeType, EngineError, ExpansionInfo, GridLayout, GridSize,
    PieceGeometry, PieceShape, Position, PuzzleConfig, PuzzlePiece, Side, Size, SnapTarget,
};

/// Decode a piece's bitmap back to RGBA pixels.
///
/// # Errors
///
/// Returns [`EngineError::ImageLoad`] if the piece has no bitmap (it was
/// stripped) or the data URL cannot be decoded.
pub fn decode_piece_image(piece: &PuzzlePiece) -> Result<types::RgbaImage, EngineError> {
    if piece.image_data.is_empty() {
        return Err(EngineError::ImageLoad(format!(
            "piece {} has no bitmap; restore bitmaps first",
            piece.id
        )));
    }
    slice::decode_data_url(&piece.image_data)
}
