//! SVG export serializers.
//!
//! [`to_board_svg`] draws every piece's cut line on the assembled board,
//! using the exact outline geometry. [`to_piece_mask_svg`] draws one
//! piece's clip polygon as a white-on-black mask sized to its expanded
//! box, suitable for CSS `mask-image` or compositing tools.
//!
//! Documents are built with the [`svg`] crate, which handles XML
//! escaping and path data formatting. These are pure functions with no
//! I/O -- they return a `String`.

use svg::Document;
use svg::node::element::path::Data;
use svg::node::element::{Description, Element, Group, Path, Rectangle, Title};
use svg::node::{Node, Text, Value};

use interlock_engine::clip::{parse_clip_path, piece_outline};
use interlock_engine::{Position, PuzzleConfig, PuzzlePiece};

use crate::ExportError;

/// Stroke width of cut lines on the board, in board pixels.
const CUT_LINE_WIDTH: f64 = 1.0;

/// Metadata to embed in the SVG document.
///
/// All fields are optional. When present, `<title>`, `<desc>` and
/// `<metadata>` elements are emitted immediately after the opening
/// `<svg>` tag. Text values are XML-escaped by the `svg` crate.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title, typically the puzzle name.
    pub title: Option<&'a str>,

    /// Document description, typically grid size and seed.
    pub description: Option<&'a str>,

    /// Serialized puzzle configuration, embedded inside a namespaced
    /// `<interlock:puzzle>` element so exported files can be reloaded.
    pub config_json: Option<&'a str>,
}

/// Build a closed SVG path `d` attribute from polygon vertices.
///
/// Returns an empty string for fewer than 3 points.
///
/// # Examples
///
/// ```
/// use interlock_engine::Position;
/// use interlock_export::build_path_data;
///
/// let d = build_path_data(&[
///     Position::new(0.0, 0.0),
///     Position::new(10.0, 0.0),
///     Position::new(10.0, 5.0),
/// ]);
/// assert_eq!(d, "M0,0 L10,0 L10,5 z");
/// ```
#[must_use]
pub fn build_path_data(points: &[Position]) -> String {
    let [first, rest @ ..] = points else {
        return String::new();
    };
    if rest.len() < 2 {
        return String::new();
    }

    let mut data = Data::new().move_to((first.x, first.y));
    for p in rest {
        data = data.line_to((p.x, p.y));
    }
    String::from(Value::from(data.close()))
}

fn with_metadata(mut doc: Document, metadata: &SvgMetadata<'_>) -> Document {
    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }

    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }

    if let Some(config_json) = metadata.config_json {
        let mut puzzle_el = Element::new("interlock:puzzle");
        puzzle_el.assign("xmlns:interlock", "https://interlock.dev/ns/1");
        puzzle_el.append(Text::new(config_json));
        let mut metadata_el = Element::new("metadata");
        metadata_el.append(puzzle_el);
        doc = doc.add(metadata_el);
    }

    doc
}

/// The svg crate omits the XML declaration, so we prepend it.
fn finish(doc: &Document) -> String {
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}

/// Serialize the cut lines of a whole puzzle.
///
/// The document is `target_size` square in board pixels. Each piece
/// becomes a `<path>` (id `piece-{id}`, `data-slot` attribute) inside a
/// `<g id="pieces">` group, tracing its silhouette translated to its
/// place on the board.
#[must_use]
pub fn to_board_svg(config: &PuzzleConfig, metadata: &SvgMetadata<'_>) -> String {
    let size = config.layout.target_size;
    let doc = Document::new()
        .set("width", size)
        .set("height", size)
        .set("viewBox", (0, 0, size, size));
    let mut doc = with_metadata(doc, metadata);

    let mut group = Group::new().set("id", "pieces");
    for piece in &config.pieces {
        let origin = piece.expanded_position;
        let outline: Vec<Position> = piece_outline(&piece.edges, piece.base_size, piece.expansion)
            .into_iter()
            .map(|p| p.offset(origin.x, origin.y))
            .collect();
        let d = build_path_data(&outline);
        if d.is_empty() {
            continue;
        }

        group = group.add(
            Path::new()
                .set("id", format!("piece-{}", piece.id))
                .set("data-slot", piece.correct_slot)
                .set("d", d)
                .set("fill", "none")
                .set("stroke", "black")
                .set("stroke-width", CUT_LINE_WIDTH),
        );
    }
    doc = doc.add(group);

    tracing::debug!(pieces = config.pieces.len(), "serialized board svg");
    finish(&doc)
}

/// Clip polygon vertices converted from percent to pixels of the
/// piece's expanded box.
///
/// # Errors
///
/// Returns [`ExportError::InvalidClipPath`] if the clip path does not
/// parse.
pub fn clip_polygon_pixels(piece: &PuzzlePiece) -> Result<Vec<Position>, ExportError> {
    let percent = parse_clip_path(&piece.clip_path)
        .ok_or_else(|| ExportError::InvalidClipPath(piece.clip_path.clone()))?;
    let size = piece.expanded_size;
    Ok(percent
        .into_iter()
        .map(|p| Position::new(p.x / 100.0 * size.width, p.y / 100.0 * size.height))
        .collect())
}

/// Serialize one piece's silhouette as a white-on-black mask the size
/// of its expanded box.
///
/// # Errors
///
/// Returns [`ExportError::InvalidClipPath`] if the piece's clip path
/// does not parse.
pub fn to_piece_mask_svg(piece: &PuzzlePiece) -> Result<String, ExportError> {
    let polygon = clip_polygon_pixels(piece)?;
    let width = piece.expanded_size.width;
    let height = piece.expanded_size.height;

    let doc = Document::new()
        .set("width", width)
        .set("height", height)
        .set("viewBox", (0, 0, width, height))
        .add(
            Rectangle::new()
                .set("width", width)
                .set("height", height)
                .set("fill", "black"),
        )
        .add(
            Path::new()
                .set("id", format!("mask-{}", piece.id))
                .set("d", build_path_data(&polygon))
                .set("fill", "white"),
        );

    Ok(finish(&doc))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use interlock_engine::{EdgePattern, EdgePatterns, ExpansionInfo, Size};

    fn flat_piece(clip_path: &str) -> PuzzlePiece {
        PuzzlePiece {
            id: "7".to_string(),
            grid_row: 0,
            grid_col: 0,
            correct_slot: 7,
            base_position: Position::new(0.0, 0.0),
            base_size: Size::new(100.0, 50.0),
            expanded_position: Position::new(0.0, 0.0),
            expanded_size: Size::new(200.0, 100.0),
            expansion: ExpansionInfo::default(),
            edges: EdgePatterns {
                top: EdgePattern::flat(0),
                right: EdgePattern::flat(0),
                bottom: EdgePattern::flat(0),
                left: EdgePattern::flat(0),
            },
            clip_path: clip_path.to_string(),
            image_data: String::new(),
            snap_targets: Vec::new(),
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            correct_rotation: 0.0,
            is_correct: false,
        }
    }

    #[test]
    fn build_path_data_too_few_points() {
        assert_eq!(build_path_data(&[]), "");
        assert_eq!(
            build_path_data(&[Position::new(0.0, 0.0), Position::new(1.0, 1.0)]),
            ""
        );
    }

    #[test]
    fn build_path_data_closes_polygon() {
        let d = build_path_data(&[
            Position::new(1.0, 2.0),
            Position::new(3.0, 4.0),
            Position::new(5.5, 6.0),
        ]);
        assert_eq!(d, "M1,2 L3,4 L5.5,6 z");
    }

    #[test]
    fn clip_polygon_scales_to_box() {
        let piece = flat_piece("polygon(0% 0%, 50% 0%, 50% 50%, 0% 50%)");
        let pixels = clip_polygon_pixels(&piece).unwrap();
        assert_eq!(pixels[2], Position::new(100.0, 50.0));
    }

    #[test]
    fn mask_svg_structure() {
        let piece = flat_piece("polygon(0% 0%, 50% 0%, 50% 50%, 0% 50%)");
        let svg = to_piece_mask_svg(&piece).unwrap();
        assert!(svg.starts_with("<?xml"));
        assert!(svg.contains(r#"viewBox="0 0 200 100""#));
        assert!(svg.contains(r#"id="mask-7""#));
        assert!(svg.contains(r#"fill="white""#));
        assert!(svg.contains("M0,0 L100,0 L100,50 L0,50 z"));
    }

    #[test]
    fn mask_svg_rejects_bad_clip_path() {
        let piece = flat_piece("circle(50%)");
        assert!(matches!(
            to_piece_mask_svg(&piece),
            Err(ExportError::InvalidClipPath(_))
        ));
    }

    #[test]
    fn metadata_is_escaped() {
        let doc = with_metadata(
            Document::new(),
            &SvgMetadata {
                title: Some("a < b"),
                description: Some("x & y"),
                config_json: Some(r#"{"k":1}"#),
            },
        );
        let svg = finish(&doc);
        assert!(svg.contains("<title>a &lt; b</title>"));
        assert!(svg.contains("x &amp; y"));
        assert!(svg.contains("<interlock:puzzle"));
    }
}
