//! Bake a piece's clip path into its bitmap's alpha channel.
//!
//! Consumers that cannot apply CSS `clip-path` (image viewers, game
//! engines) get a PNG whose transparent pixels already trace the
//! jigsaw silhouette.

use image::RgbaImage;
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Transform};

use interlock_engine::{Position, PuzzlePiece, decode_piece_image};

use crate::ExportError;
use crate::svg::clip_polygon_pixels;

#[allow(clippy::cast_possible_truncation)]
fn scaled(p: Position, sx: f64, sy: f64) -> (f32, f32) {
    ((p.x * sx) as f32, (p.y * sy) as f32)
}

/// Decode `piece`'s bitmap and clear every pixel outside its silhouette.
///
/// The clip polygon is scaled from the expanded box to the bitmap's
/// actual pixel size and filled with anti-aliasing, so the silhouette
/// edge gets partial alpha.
///
/// # Errors
///
/// Returns [`ExportError::Engine`] if the piece has no decodable bitmap,
/// [`ExportError::InvalidClipPath`] if its clip path does not parse, or
/// [`ExportError::Raster`] if the mask cannot be built.
pub fn render_masked_piece(piece: &PuzzlePiece) -> Result<RgbaImage, ExportError> {
    let mut bitmap = decode_piece_image(piece)?;
    let (width, height) = bitmap.dimensions();
    let polygon = clip_polygon_pixels(piece)?;

    let sx = f64::from(width) / piece.expanded_size.width;
    let sy = f64::from(height) / piece.expanded_size.height;

    let mut pb = PathBuilder::new();
    let mut points = polygon.iter();
    let Some(first) = points.next() else {
        return Err(ExportError::InvalidClipPath(piece.clip_path.clone()));
    };
    let (x, y) = scaled(*first, sx, sy);
    pb.move_to(x, y);
    for p in points {
        let (x, y) = scaled(*p, sx, sy);
        pb.line_to(x, y);
    }
    pb.close();
    let Some(path) = pb.finish() else {
        return Err(ExportError::Raster(format!("piece {} outline is degenerate", piece.id)));
    };

    let mut paint = Paint::default();
    paint.set_color_rgba8(255, 255, 255, 255);
    paint.anti_alias = true;

    let Some(mut pixmap) = Pixmap::new(width, height) else {
        return Err(ExportError::Raster(format!("cannot allocate a {width}x{height} mask")));
    };
    pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);

    // Only the alpha channel of the mask is read, so premultiplication
    // does not matter here.
    let mask = pixmap.data();
    for (i, pixel) in bitmap.pixels_mut().enumerate() {
        let coverage = u16::from(mask[i * 4 + 3]);
        #[allow(clippy::cast_possible_truncation)]
        let alpha = (u16::from(pixel[3]) * coverage / 255) as u8;
        pixel[3] = alpha;
    }

    tracing::trace!(piece = %piece.id, width, height, "masked piece bitmap");
    Ok(bitmap)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::Rgba;
    use interlock_engine::slice::encode_data_url;
    use interlock_engine::{EdgePattern, EdgePatterns, ExpansionInfo, ImageSurface, RasterSurface, Size};

    fn opaque_piece(clip_path: &str) -> PuzzlePiece {
        let mut surface = ImageSurface::create(40, 20).unwrap();
        for y in 0..20 {
            for x in 0..40 {
                surface.write_pixel(x, y, Rgba([200, 100, 50, 255]));
            }
        }
        PuzzlePiece {
            id: "3".to_string(),
            grid_row: 0,
            grid_col: 0,
            correct_slot: 3,
            base_position: Position::new(0.0, 0.0),
            base_size: Size::new(20.0, 10.0),
            expanded_position: Position::new(0.0, 0.0),
            expanded_size: Size::new(40.0, 20.0),
            expansion: ExpansionInfo::default(),
            edges: EdgePatterns {
                top: EdgePattern::flat(0),
                right: EdgePattern::flat(0),
                bottom: EdgePattern::flat(0),
                left: EdgePattern::flat(0),
            },
            clip_path: clip_path.to_string(),
            image_data: encode_data_url(&surface).unwrap(),
            snap_targets: Vec::new(),
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            correct_rotation: 0.0,
            is_correct: false,
        }
    }

    #[test]
    fn outside_polygon_is_transparent() {
        let piece = opaque_piece("polygon(25% 25%, 75% 25%, 75% 75%, 25% 75%)");
        let masked = render_masked_piece(&piece).unwrap();

        assert_eq!(masked.dimensions(), (40, 20));
        assert_eq!(masked.get_pixel(0, 0)[3], 0);
        assert_eq!(masked.get_pixel(39, 19)[3], 0);
        assert_eq!(*masked.get_pixel(20, 10), Rgba([200, 100, 50, 255]));
    }

    #[test]
    fn full_polygon_keeps_everything() {
        let piece = opaque_piece("polygon(0% 0%, 100% 0%, 100% 100%, 0% 100%)");
        let masked = render_masked_piece(&piece).unwrap();
        for (x, y, p) in masked.enumerate_pixels() {
            if (1..39).contains(&x) && (1..19).contains(&y) {
                assert_eq!(p[3], 255, "({x}, {y})");
            }
        }
    }

    #[test]
    fn stripped_piece_is_an_engine_error() {
        let mut piece = opaque_piece("polygon(0% 0%, 100% 0%, 100% 100%, 0% 100%)");
        piece.image_data.clear();
        assert!(matches!(
            render_masked_piece(&piece),
            Err(ExportError::Engine(_))
        ));
    }

    #[test]
    fn bad_clip_path_is_rejected() {
        let piece = opaque_piece("inset(10%)");
        assert!(matches!(
            render_masked_piece(&piece),
            Err(ExportError::InvalidClipPath(_))
        ));
    }
}
