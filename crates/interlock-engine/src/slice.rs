//! Slicing the board image into per-piece bitmaps.
//!
//! The source image is center-cropped to a square, resampled to the
//! board size, and flattened onto an opaque matte. Each piece then gets
//! a bitmap covering its expanded box. Wherever that box hangs off the
//! board, the missing pixels are filled by clamping to the nearest pixel
//! that did come from the board, so every bitmap is fully opaque.
//!
//! Drawing goes through the [`RasterSurface`] trait; [`ImageSurface`] is
//! the software backend over [`image::RgbaImage`].

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::{DynamicImage, ImageEncoder, Rgba, RgbaImage, imageops};
use serde::{Deserialize, Serialize};

use crate::types::{EngineError, GridSize, Position, Size};

/// Largest surface edge a backend is asked to allocate.
pub const MAX_SURFACE_DIMENSION: u32 = 16_384;

/// Default minimum estimated piece edge for [`validate_image_for_slicing`].
pub const DEFAULT_MIN_PIECE_SIZE: u32 = 50;

/// Shortest source edge below which [`validate_image_for_slicing`]
/// advises against slicing.
pub const MIN_SOURCE_DIMENSION: u32 = 200;

/// Prefix of every piece data URL.
pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Resampling filter used when fitting the source onto the board.
///
/// Ordered from fastest/lowest-quality to slowest/highest-quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResampleFilter {
    /// Nearest-neighbor: fastest, blocky artifacts.
    Nearest,
    /// Bilinear interpolation: fast, decent quality.
    Triangle,
    /// Bicubic (Catmull-Rom): moderate speed, good quality.
    CatmullRom,
    /// Gaussian: moderate speed, smooth output.
    Gaussian,
    /// Lanczos with 3 lobes: slowest, sharpest.
    Lanczos3,
}

impl Default for ResampleFilter {
    fn default() -> Self {
        Self::Triangle
    }
}

impl ResampleFilter {
    /// Convert to the `image` crate's `FilterType`.
    const fn to_image_filter(self) -> imageops::FilterType {
        match self {
            Self::Nearest => imageops::FilterType::Nearest,
            Self::Triangle => imageops::FilterType::Triangle,
            Self::CatmullRom => imageops::FilterType::CatmullRom,
            Self::Gaussian => imageops::FilterType::Gaussian,
            Self::Lanczos3 => imageops::FilterType::Lanczos3,
        }
    }
}

impl fmt::Display for ResampleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nearest => f.write_str("Nearest"),
            Self::Triangle => f.write_str("Triangle"),
            Self::CatmullRom => f.write_str("CatmullRom"),
            Self::Gaussian => f.write_str("Gaussian"),
            Self::Lanczos3 => f.write_str("Lanczos3"),
        }
    }
}

/// Integer pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Minimal drawing surface needed to cut piece bitmaps.
pub trait RasterSurface: Sized {
    /// Allocate a `width x height` surface.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::RenderingContext`] if the backend cannot
    /// provide a surface of that size.
    fn create(width: u32, height: u32) -> Result<Self, EngineError>;

    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Copy `region` of `source` onto the surface with its top-left at
    /// `(dest_x, dest_y)`.
    fn draw_region(&mut self, source: &RgbaImage, region: PixelRect, dest_x: u32, dest_y: u32);

    fn read_pixel(&self, x: u32, y: u32) -> Rgba<u8>;

    fn write_pixel(&mut self, x: u32, y: u32, pixel: Rgba<u8>);

    /// Encode the surface as PNG bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Encode`] if encoding fails.
    fn encode_png(&self) -> Result<Vec<u8>, EngineError>;
}

/// Software [`RasterSurface`] backed by an [`RgbaImage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSurface {
    image: RgbaImage,
}

impl ImageSurface {
    /// Borrow the underlying pixels.
    #[must_use]
    pub const fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    /// Take the underlying pixels.
    #[must_use]
    pub fn into_image(self) -> RgbaImage {
        self.image
    }
}

impl RasterSurface for ImageSurface {
    fn create(width: u32, height: u32) -> Result<Self, EngineError> {
        if width == 0 || height == 0 || width > MAX_SURFACE_DIMENSION || height > MAX_SURFACE_DIMENSION {
            return Err(EngineError::RenderingContext(format!(
                "cannot allocate a {width}x{height} surface"
            )));
        }
        Ok(Self {
            image: RgbaImage::new(width, height),
        })
    }

    fn width(&self) -> u32 {
        self.image.width()
    }

    fn height(&self) -> u32 {
        self.image.height()
    }

    fn draw_region(&mut self, source: &RgbaImage, region: PixelRect, dest_x: u32, dest_y: u32) {
        if region.is_empty() {
            return;
        }
        let view = imageops::crop_imm(source, region.x, region.y, region.width, region.height).to_image();
        imageops::replace(&mut self.image, &view, i64::from(dest_x), i64::from(dest_y));
    }

    fn read_pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        *self.image.get_pixel(x, y)
    }

    fn write_pixel(&mut self, x: u32, y: u32, pixel: Rgba<u8>) {
        self.image.put_pixel(x, y, pixel);
    }

    fn encode_png(&self) -> Result<Vec<u8>, EngineError> {
        let mut png_bytes = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
        encoder
            .write_image(
                self.image.as_raw(),
                self.image.width(),
                self.image.height(),
                image::ExtendedColorType::Rgba8,
            )
            .map_err(|e| EngineError::Encode(e.to_string()))?;
        Ok(png_bytes)
    }
}

/// Decode raw image bytes (PNG, JPEG, BMP, WebP).
///
/// # Errors
///
/// Returns [`EngineError::InvalidParameter`] if `bytes` is empty, or
/// [`EngineError::ImageLoad`] if decoding fails.
pub fn load_image(bytes: &[u8]) -> Result<DynamicImage, EngineError> {
    if bytes.is_empty() {
        return Err(EngineError::InvalidParameter("image is empty".to_string()));
    }
    Ok(image::load_from_memory(bytes)?)
}

/// Fit `image` onto an opaque `board_size x board_size` board.
///
/// Takes the centred square of side `min(width, height)`, resamples it
/// with `filter`, and composites any translucent pixel over `matte`.
#[must_use]
pub fn prepare_board(image: &DynamicImage, board_size: u32, filter: ResampleFilter, matte: [u8; 3]) -> RgbaImage {
    let side = image.width().min(image.height());
    let offset_x = (image.width() - side) / 2;
    let offset_y = (image.height() - side) / 2;

    let mut board = image
        .crop_imm(offset_x, offset_y, side, side)
        .resize_exact(board_size, board_size, filter.to_image_filter())
        .to_rgba8();

    for pixel in board.pixels_mut() {
        *pixel = flatten(*pixel, matte);
    }
    board
}

/// Composite a pixel over an opaque matte colour.
fn flatten(pixel: Rgba<u8>, matte: [u8; 3]) -> Rgba<u8> {
    let Rgba([r, g, b, a]) = pixel;
    if a == u8::MAX {
        return pixel;
    }
    let alpha = u16::from(a);
    let blend = |fg: u8, bg: u8| {
        let mixed = (u16::from(fg) * alpha + u16::from(bg) * (255 - alpha) + 127) / 255;
        // At most 255 by construction.
        u8::try_from(mixed).unwrap_or(u8::MAX)
    };
    Rgba([blend(r, matte[0]), blend(g, matte[1]), blend(b, matte[2]), u8::MAX])
}

/// Pixel dimensions of the bitmap for an expanded box.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn surface_dimensions(expanded_size: Size) -> (u32, u32) {
    let round = |v: f64| v.round().max(1.0).min(f64::from(u32::MAX)) as u32;
    (round(expanded_size.width), round(expanded_size.height))
}

/// Cut the bitmap for one piece's expanded box out of `board`.
///
/// The part of the box that lies on the board is copied directly; the
/// rest is extrapolated by clamping each pixel to the nearest copied
/// one.
///
/// # Errors
///
/// Returns [`EngineError::RenderingContext`] if the surface cannot be
/// allocated, or [`EngineError::InvalidParameter`] if the box does not
/// overlap the board at all.
#[allow(clippy::cast_possible_truncation)]
pub fn slice_piece<S: RasterSurface>(
    board: &RgbaImage,
    expanded_position: Position,
    expanded_size: Size,
) -> Result<S, EngineError> {
    let (width, height) = surface_dimensions(expanded_size);
    let mut surface = S::create(width, height)?;

    let origin_x = expanded_position.x.round() as i64;
    let origin_y = expanded_position.y.round() as i64;

    let Some((valid, dest_x, dest_y)) = visible_region(board, origin_x, origin_y, width, height) else {
        return Err(EngineError::InvalidParameter(format!(
            "piece box at ({origin_x}, {origin_y}) size {width}x{height} does not overlap the board"
        )));
    };

    surface.draw_region(board, valid, dest_x, dest_y);

    let max_x = dest_x + valid.width - 1;
    let max_y = dest_y + valid.height - 1;
    for y in 0..height {
        for x in 0..width {
            let inside = (dest_x..=max_x).contains(&x) && (dest_y..=max_y).contains(&y);
            if inside {
                continue;
            }
            let pixel = surface.read_pixel(x.clamp(dest_x, max_x), y.clamp(dest_y, max_y));
            surface.write_pixel(x, y, pixel);
        }
    }

    Ok(surface)
}

/// Intersection of the box `(origin, width, height)` with the board, as
/// a board region plus its offset inside the box.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn visible_region(
    board: &RgbaImage,
    origin_x: i64,
    origin_y: i64,
    width: u32,
    height: u32,
) -> Option<(PixelRect, u32, u32)> {
    let left = origin_x.max(0);
    let top = origin_y.max(0);
    let right = (origin_x + i64::from(width)).min(i64::from(board.width()));
    let bottom = (origin_y + i64::from(height)).min(i64::from(board.height()));

    if right <= left || bottom <= top {
        return None;
    }

    let region = PixelRect {
        x: left as u32,
        y: top as u32,
        width: (right - left) as u32,
        height: (bottom - top) as u32,
    };
    Some((region, (left - origin_x) as u32, (top - origin_y) as u32))
}

/// Encode a surface as a PNG data URL.
///
/// # Errors
///
/// Returns [`EngineError::Encode`] if PNG encoding fails.
pub fn encode_data_url<S: RasterSurface>(surface: &S) -> Result<String, EngineError> {
    let png = surface.encode_png()?;
    Ok(format!("{PNG_DATA_URL_PREFIX}{}", STANDARD.encode(png)))
}

/// Raw bytes carried by a base64 `data:image/...` URL.
///
/// # Errors
///
/// Returns [`EngineError::ImageLoad`] if the string is not a base64
/// image data URL.
pub fn data_url_bytes(data_url: &str) -> Result<Vec<u8>, EngineError> {
    let payload = data_url
        .strip_prefix("data:image/")
        .and_then(|rest| rest.split_once(";base64,"))
        .map(|(_, payload)| payload)
        .ok_or_else(|| EngineError::ImageLoad("not a base64 image data URL".to_string()))?;

    STANDARD
        .decode(payload.trim())
        .map_err(|e| EngineError::ImageLoad(format!("invalid base64 payload: {e}")))
}

/// Decode a base64 image data URL to RGBA pixels.
///
/// # Errors
///
/// Returns [`EngineError::ImageLoad`] if the URL or the image inside it
/// cannot be decoded.
pub fn decode_data_url(data_url: &str) -> Result<RgbaImage, EngineError> {
    let bytes = data_url_bytes(data_url)?;
    Ok(image::load_from_memory(&bytes)?.to_rgba8())
}

/// Reasons a source image is considered too small to slice well.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SliceWarning {
    /// Pieces would come out smaller than the requested minimum.
    #[error("pieces would be about {estimated}px, at least {minimum}px is recommended")]
    PieceTooSmall { estimated: u32, minimum: u32 },

    /// The source image's shorter edge is below [`MIN_SOURCE_DIMENSION`].
    #[error("image is {width}x{height}, at least 200x200 is recommended")]
    ImageTooSmall { width: u32, height: u32 },
}

/// Advisory check that a `width x height` source gives reasonable
/// pieces for `grid`.
///
/// # Errors
///
/// Returns the first [`SliceWarning`] that applies. Callers decide
/// whether it is fatal; the generator only logs it.
pub fn validate_image_for_slicing(
    width: u32,
    height: u32,
    grid: GridSize,
    min_piece_size: u32,
) -> Result<(), SliceWarning> {
    let min_dimension = width.min(height);
    let max_grid = grid.rows.max(grid.cols).max(1);
    let estimated = min_dimension / max_grid;

    if estimated < min_piece_size {
        return Err(SliceWarning::PieceTooSmall {
            estimated,
            minimum: min_piece_size,
        });
    }
    if min_dimension < MIN_SOURCE_DIMENSION {
        return Err(SliceWarning::ImageTooSmall { width, height });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
        })
    }

    // --- ImageSurface ---

    #[test]
    fn create_rejects_zero_and_huge() {
        assert!(matches!(
            ImageSurface::create(0, 10),
            Err(EngineError::RenderingContext(_))
        ));
        assert!(matches!(
            ImageSurface::create(10, MAX_SURFACE_DIMENSION + 1),
            Err(EngineError::RenderingContext(_))
        ));
        let surface = ImageSurface::create(3, 4).unwrap();
        assert_eq!((surface.width(), surface.height()), (3, 4));
    }

    #[test]
    fn draw_region_copies_pixels() {
        let source = gradient(10, 10);
        let mut surface = ImageSurface::create(4, 4).unwrap();
        let region = PixelRect {
            x: 5,
            y: 6,
            width: 2,
            height: 2,
        };
        surface.draw_region(&source, region, 1, 1);
        assert_eq!(surface.read_pixel(1, 1), *source.get_pixel(5, 6));
        assert_eq!(surface.read_pixel(2, 2), *source.get_pixel(6, 7));
        assert_eq!(surface.read_pixel(0, 0), Rgba([0, 0, 0, 0]));
    }

    // --- prepare_board ---

    #[test]
    fn board_is_square_and_opaque() {
        let wide = DynamicImage::ImageRgba8(RgbaImage::from_pixel(300, 100, Rgba([10, 20, 30, 0])));
        let board = prepare_board(&wide, 64, ResampleFilter::Nearest, [255, 255, 255]);
        assert_eq!(board.dimensions(), (64, 64));
        assert!(board.pixels().all(|p| p[3] == 255));
        assert_eq!(*board.get_pixel(0, 0), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn board_uses_center_crop() {
        // Left third red, middle third green, right third blue.
        let image = RgbaImage::from_fn(300, 100, |x, _| match x {
            0..100 => Rgba([255, 0, 0, 255]),
            100..200 => Rgba([0, 255, 0, 255]),
            _ => Rgba([0, 0, 255, 255]),
        });
        let board = prepare_board(&DynamicImage::ImageRgba8(image), 50, ResampleFilter::Nearest, [0, 0, 0]);
        assert!(board.pixels().all(|p| *p == Rgba([0, 255, 0, 255])));
    }

    #[test]
    fn flatten_blends_half_alpha() {
        let p = flatten(Rgba([0, 0, 0, 128]), [255, 255, 255]);
        assert_eq!(p[3], 255);
        assert!((126..=128).contains(&p[0]));
    }

    // --- slice_piece ---

    #[test]
    fn interior_box_copies_board() {
        let board = gradient(100, 100);
        let surface: ImageSurface =
            slice_piece(&board, Position::new(20.0, 30.0), Size::new(40.0, 50.0)).unwrap();
        assert_eq!((surface.width(), surface.height()), (40, 50));
        assert_eq!(surface.read_pixel(0, 0), *board.get_pixel(20, 30));
        assert_eq!(surface.read_pixel(39, 49), *board.get_pixel(59, 79));
    }

    #[test]
    fn overhang_is_edge_clamped_and_opaque() {
        let board = gradient(100, 100);
        let surface: ImageSurface =
            slice_piece(&board, Position::new(-10.0, 80.0), Size::new(30.0, 40.0)).unwrap();
        assert!(surface.as_image().pixels().all(|p| p[3] == 255));
        // Left overhang repeats board column 0.
        assert_eq!(surface.read_pixel(0, 5), *board.get_pixel(0, 85));
        // Bottom overhang repeats board row 99.
        assert_eq!(surface.read_pixel(15, 39), *board.get_pixel(5, 99));
        // Corner overhang repeats the board corner.
        assert_eq!(surface.read_pixel(0, 39), *board.get_pixel(0, 99));
    }

    #[test]
    fn disjoint_box_is_rejected() {
        let board = gradient(10, 10);
        let result = slice_piece::<ImageSurface>(&board, Position::new(50.0, 50.0), Size::new(5.0, 5.0));
        assert!(matches!(result, Err(EngineError::InvalidParameter(_))));
    }

    // --- data URLs ---

    #[test]
    fn data_url_preserves_pixels() {
        let board = gradient(16, 16);
        let surface: ImageSurface = slice_piece(&board, Position::new(0.0, 0.0), Size::new(16.0, 16.0)).unwrap();
        let url = encode_data_url(&surface).unwrap();
        assert!(url.starts_with(PNG_DATA_URL_PREFIX));
        assert_eq!(decode_data_url(&url).unwrap(), board);
    }

    #[test]
    fn bad_data_urls_fail_to_load() {
        assert!(matches!(decode_data_url("hello"), Err(EngineError::ImageLoad(_))));
        assert!(matches!(
            decode_data_url("data:image/png;base64,!!!"),
            Err(EngineError::ImageLoad(_))
        ));
        assert!(matches!(
            decode_data_url("data:image/png;base64,aGVsbG8="),
            Err(EngineError::ImageLoad(_))
        ));
    }

    #[test]
    fn load_image_rejects_empty() {
        assert!(matches!(load_image(&[]), Err(EngineError::InvalidParameter(_))));
        assert!(matches!(load_image(b"not an image"), Err(EngineError::ImageLoad(_))));
    }

    // --- validate_image_for_slicing ---

    #[test]
    fn slicing_advice() {
        let grid = GridSize::new(4, 4);
        assert_eq!(validate_image_for_slicing(400, 600, grid, DEFAULT_MIN_PIECE_SIZE), Ok(()));
        assert_eq!(
            validate_image_for_slicing(100, 100, grid, DEFAULT_MIN_PIECE_SIZE),
            Err(SliceWarning::PieceTooSmall {
                estimated: 25,
                minimum: 50
            })
        );
        assert_eq!(
            validate_image_for_slicing(150, 150, GridSize::new(2, 2), DEFAULT_MIN_PIECE_SIZE),
            Err(SliceWarning::ImageTooSmall {
                width: 150,
                height: 150
            })
        );
    }
}
