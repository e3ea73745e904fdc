//! Grid geometry: base cells, expansion into neighbours, snap targets.
//!
//! The board is a `target_size x target_size` square with its origin at
//! the top-left corner. Cell `(row, col)` covers
//! `[col * w, (col + 1) * w) x [row * h, (row + 1) * h)`. A piece's
//! bitmap box grows past its cell by `expansion_ratio` of the cell size
//! on every side that has a neighbour, giving the clip path room to
//! carve knobs.

use crate::types::{ExpansionInfo, GridLayout, GridSize, PieceGeometry, Position, Size, SnapTarget};

/// Default side length of the square board, in pixels.
pub const DEFAULT_TARGET_SIZE: f64 = 400.0;

/// Default per-axis snap tolerance, in pixels.
pub const DEFAULT_SNAP_TOLERANCE: f64 = 20.0;

/// Expansion ratios for the cell at `(row, col)`: `ratio` on sides with
/// a neighbour, 0 on the grid border.
#[must_use]
pub fn calculate_expansions(row: u32, col: u32, grid: GridSize, ratio: f64) -> ExpansionInfo {
    let on = |has_neighbor: bool| if has_neighbor { ratio } else { 0.0 };
    ExpansionInfo {
        top: on(row > 0),
        right: on(col + 1 < grid.cols),
        bottom: on(row + 1 < grid.rows),
        left: on(col > 0),
    }
}

/// Size of the expanded bitmap box.
#[must_use]
pub fn calculate_expanded_size(base_size: Size, expansion: ExpansionInfo) -> Size {
    Size::new(
        base_size.width * (1.0 + expansion.left + expansion.right),
        base_size.height * (1.0 + expansion.top + expansion.bottom),
    )
}

/// Top-left of the expanded bitmap box.
#[must_use]
pub fn calculate_expanded_position(
    base_position: Position,
    base_size: Size,
    expansion: ExpansionInfo,
) -> Position {
    Position::new(
        base_size.width.mul_add(-expansion.left, base_position.x),
        base_size.height.mul_add(-expansion.top, base_position.y),
    )
}

/// Offset of the base rectangle inside the expanded box.
#[must_use]
pub fn calculate_canvas_offset(expansion: ExpansionInfo, base_size: Size) -> Position {
    Position::new(base_size.width * expansion.left, base_size.height * expansion.top)
}

/// Top-left of the cell at `index` on the board.
#[must_use]
pub fn calculate_base_position(index: usize, layout: &GridLayout) -> Position {
    let coord = layout.grid_size.index_to_coord(index);
    Position::new(
        f64::from(coord.col) * layout.base_size.width,
        f64::from(coord.row) * layout.base_size.height,
    )
}

/// Grid descriptor for a square board of side `target_size`.
#[must_use]
pub fn create_grid_layout(grid: GridSize, target_size: f64, expansion_ratio: f64) -> GridLayout {
    GridLayout {
        grid_size: grid,
        base_size: Size::new(
            target_size / f64::from(grid.cols),
            target_size / f64::from(grid.rows),
        ),
        expansion_ratio,
        target_size,
    }
}

/// Every geometric field of the piece at `index`.
#[must_use]
pub fn calculate_piece_geometry(index: usize, layout: &GridLayout) -> PieceGeometry {
    let coord = layout.grid_size.index_to_coord(index);
    let base_position = calculate_base_position(index, layout);
    let base_size = layout.base_size;
    let expansion = calculate_expansions(coord.row, coord.col, layout.grid_size, layout.expansion_ratio);

    PieceGeometry {
        base_position,
        base_size,
        expansion,
        expanded_position: calculate_expanded_position(base_position, base_size, expansion),
        expanded_size: calculate_expanded_size(base_size, expansion),
    }
}

/// Snap targets for a piece: its own cell, with `tolerance` per axis.
#[must_use]
pub fn calculate_snap_targets(geometry: &PieceGeometry, tolerance: f64) -> Vec<SnapTarget> {
    vec![SnapTarget {
        position: geometry.base_position,
        tolerance,
    }]
}

/// `true` if `a` and `b` differ by at most `tolerance` on each axis.
#[must_use]
pub fn is_within_tolerance(a: Position, b: Position, tolerance: f64) -> bool {
    (a.x - b.x).abs() <= tolerance && (a.y - b.y).abs() <= tolerance
}

/// Euclidean distance between two positions.
#[must_use]
pub fn distance(a: Position, b: Position) -> f64 {
    a.distance(b)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn corner_expands_only_inward() {
        let grid = GridSize::new(4, 4);
        let e = calculate_expansions(0, 0, grid, 0.4);
        assert_eq!(
            e,
            ExpansionInfo {
                top: 0.0,
                right: 0.4,
                bottom: 0.4,
                left: 0.0,
            }
        );
    }

    #[test]
    fn interior_expands_everywhere() {
        let grid = GridSize::new(3, 3);
        let e = calculate_expansions(1, 1, grid, 0.3);
        for side in crate::types::Side::ALL {
            assert!(approx(e.get(side), 0.3));
        }
    }

    #[test]
    fn expanded_box_contains_base() {
        let grid = GridSize::new(4, 5);
        let layout = create_grid_layout(grid, 400.0, 0.4);
        for index in 0..grid.piece_count() {
            let g = calculate_piece_geometry(index, &layout);
            assert!(g.expanded_position.x <= g.base_position.x);
            assert!(g.expanded_position.y <= g.base_position.y);
            assert!(g.expanded_size.width >= g.base_size.width);
            assert!(g.expanded_size.height >= g.base_size.height);
            let offset = calculate_canvas_offset(g.expansion, g.base_size);
            assert!(approx(g.expanded_position.x + offset.x, g.base_position.x));
            assert!(approx(g.expanded_position.y + offset.y, g.base_position.y));
        }
    }

    #[test]
    fn interior_geometry_values() {
        let layout = create_grid_layout(GridSize::new(3, 3), 300.0, 0.4);
        let g = calculate_piece_geometry(4, &layout);
        assert_eq!(g.base_position, Position::new(100.0, 100.0));
        assert!(approx(g.expanded_position.x, 60.0));
        assert!(approx(g.expanded_position.y, 60.0));
        assert!(approx(g.expanded_size.width, 180.0));
        assert!(approx(g.expanded_size.height, 180.0));
    }

    #[test]
    fn layout_divides_board() {
        let layout = create_grid_layout(GridSize::new(2, 4), 400.0, 0.4);
        assert!(approx(layout.base_size.width, 100.0));
        assert!(approx(layout.base_size.height, 200.0));
        assert_eq!(calculate_base_position(5, &layout), Position::new(100.0, 200.0));
    }

    #[test]
    fn snap_target_is_base_position() {
        let layout = create_grid_layout(GridSize::new(3, 3), 300.0, 0.4);
        let g = calculate_piece_geometry(2, &layout);
        let targets = calculate_snap_targets(&g, DEFAULT_SNAP_TOLERANCE);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].position, Position::new(200.0, 0.0));
        assert!(approx(targets[0].tolerance, 20.0));
    }

    #[test]
    fn tolerance_is_per_axis() {
        let a = Position::new(0.0, 0.0);
        assert!(is_within_tolerance(a, Position::new(20.0, 20.0), 20.0));
        assert!(!is_within_tolerance(a, Position::new(20.5, 0.0), 20.0));
        assert!(distance(a, Position::new(20.0, 20.0)) > 20.0);
    }
}
