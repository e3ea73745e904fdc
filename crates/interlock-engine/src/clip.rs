//! Piece silhouettes as CSS-style `polygon(...)` clip paths.
//!
//! A silhouette is walked clockwise around the base rectangle, which
//! sits inside the expanded bitmap box at the canvas offset (not
//! necessarily centred: border sides do not expand). Each side
//! contributes the profile from [`generate_shape_points`] mapped into
//! box pixels, then every vertex is expressed in percent of the box.
//!
//! Profiles are mapped in the shared edge's canonical direction (left to
//! right for horizontal edges, top to bottom for vertical ones) and the
//! bottom and left sides are reversed afterwards. Mapping both faces of
//! a shared edge in the same direction is what makes a knob and its
//! partner hole congruent once translated to board coordinates.

use std::fmt::Write as _;

use crate::edge::generate_shape_points;
use crate::layout::calculate_canvas_offset;
use crate::types::{EdgePatterns, ExpansionInfo, Position, Side, Size};

/// Minimum number of vertices in a valid clip path.
pub const MIN_CLIP_POINTS: usize = 4;

/// Silhouette vertices in pixel coordinates of the expanded box,
/// clockwise from the top-left corner of the base rectangle, with
/// shared corners listed once.
#[must_use]
pub fn piece_outline(edges: &EdgePatterns, base_size: Size, expansion: ExpansionInfo) -> Vec<Position> {
    let offset = calculate_canvas_offset(expansion, base_size);
    let left = offset.x;
    let top = offset.y;
    let right = left + base_size.width;
    let bottom = top + base_size.height;

    let mut outline = Vec::with_capacity(28);
    for side in Side::ALL {
        let (start, end) = match side {
            Side::Top => (Position::new(left, top), Position::new(right, top)),
            Side::Right => (Position::new(right, top), Position::new(right, bottom)),
            Side::Bottom => (Position::new(left, bottom), Position::new(right, bottom)),
            Side::Left => (Position::new(left, top), Position::new(left, bottom)),
        };
        let mut points = side_points(edges, side, start, end, base_size, expansion);

        if matches!(side, Side::Bottom | Side::Left) {
            points.reverse();
        }

        let skip_last = usize::from(side == Side::Left);
        let take = points.len().saturating_sub(skip_last);
        let skip_first = usize::from(side != Side::Top);
        outline.extend(points.into_iter().take(take).skip(skip_first));
    }

    outline
}

/// Map one side's canonical profile onto the segment `start..end`.
fn side_points(
    edges: &EdgePatterns,
    side: Side,
    start: Position,
    end: Position,
    base_size: Size,
    expansion: ExpansionInfo,
) -> Vec<Position> {
    let (length, perpendicular) = if side.is_horizontal() {
        (base_size.width, base_size.height)
    } else {
        (base_size.height, base_size.width)
    };
    let room = perpendicular * expansion.get(side);
    let profile = generate_shape_points(edges.get(side), length, room);

    let sign = side.outward_sign();
    profile
        .into_iter()
        .map(|p| {
            let t = if length > 0.0 { p.x / length } else { 0.0 };
            let along = Position::new(
                (end.x - start.x).mul_add(t, start.x),
                (end.y - start.y).mul_add(t, start.y),
            );
            if side.is_horizontal() {
                along.offset(0.0, sign * p.y)
            } else {
                along.offset(sign * p.y, 0.0)
            }
        })
        .collect()
}

/// Silhouette of a piece as `polygon(x% y%, ...)` relative to its
/// expanded box.
#[must_use]
pub fn generate_clip_path(
    edges: &EdgePatterns,
    expanded_size: Size,
    base_size: Size,
    expansion: ExpansionInfo,
) -> String {
    let outline = piece_outline(edges, base_size, expansion);
    format_polygon(&outline, expanded_size)
}

/// Plain base-rectangle polygon, for debugging and fallback rendering.
#[must_use]
pub fn generate_rectangle_clip_path(expanded_size: Size, base_size: Size, expansion: ExpansionInfo) -> String {
    let offset = calculate_canvas_offset(expansion, base_size);
    let right = offset.x + base_size.width;
    let bottom = offset.y + base_size.height;
    let corners = [
        offset,
        Position::new(right, offset.y),
        Position::new(right, bottom),
        Position::new(offset.x, bottom),
    ];
    format_polygon(&corners, expanded_size)
}

fn format_polygon(points: &[Position], box_size: Size) -> String {
    let mut out = String::from("polygon(");
    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let x = to_percent(p.x, box_size.width);
        let y = to_percent(p.y, box_size.height);
        let _ = write!(out, "{x:.2}% {y:.2}%");
    }
    out.push(')');
    out
}

/// `value / extent` as a percentage clamped to `[0, 100]`, never
/// negative zero.
fn to_percent(value: f64, extent: f64) -> f64 {
    if extent <= 0.0 {
        return 0.0;
    }
    (value / extent * 100.0).clamp(0.0, 100.0) + 0.0
}

/// `true` for an unsigned decimal percentage such as `12.50%`.
fn is_percent_token(token: &str) -> bool {
    let Some(number) = token.strip_suffix('%') else {
        return false;
    };
    let mut parts = number.splitn(2, '.');
    let integer = parts.next().unwrap_or_default();
    let fraction = parts.next();

    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    digits(integer) && fraction.is_none_or(digits)
}

/// Vertices of a `polygon(...)` clip path, in percent of the box.
///
/// Returns `None` if the string is not a polygon of unsigned percentage
/// pairs.
#[must_use]
pub fn parse_clip_path(clip_path: &str) -> Option<Vec<Position>> {
    let inner = clip_path.trim().strip_prefix("polygon(")?.strip_suffix(')')?;

    inner
        .split(',')
        .map(|pair| {
            let mut tokens = pair.split_whitespace();
            let x = tokens.next()?;
            let y = tokens.next()?;
            if tokens.next().is_some() || !is_percent_token(x) || !is_percent_token(y) {
                return None;
            }
            let x = x.trim_end_matches('%').parse().ok()?;
            let y = y.trim_end_matches('%').parse().ok()?;
            Some(Position::new(x, y))
        })
        .collect()
}

/// `true` if `clip_path` is a polygon of at least [`MIN_CLIP_POINTS`]
/// percentage pairs.
#[must_use]
pub fn validate_clip_path(clip_path: &str) -> bool {
    parse_clip_path(clip_path).is_some_and(|points| points.len() >= MIN_CLIP_POINTS)
}
