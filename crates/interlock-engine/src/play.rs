//! Play-state helpers over generated pieces.
//!
//! These only touch the play-state fields (`x`, `y`, `rotation`,
//! `is_correct`); geometry fixed at generation time is never modified.

use serde::{Deserialize, Serialize};

use crate::layout::is_within_tolerance;
use crate::random::SeededRandom;
use crate::types::{Difficulty, EdgeType, Position, PuzzleConfig, PuzzlePiece};

/// Width and height of the staging area pieces are scattered into.
pub const SCATTER_SPREAD: f64 = 200.0;

/// Vertical start of the staging area as a fraction of the board size.
const SCATTER_TOP_FRACTION: f64 = 0.75;

/// Estimated solving time per piece.
pub const SECONDS_PER_PIECE: u64 = 30;

/// Progress of a puzzle towards completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionStatus {
    pub is_complete: bool,
    pub correct_pieces: usize,
    pub total_pieces: usize,
    /// Whole percent of pieces in place.
    pub completion_rate: u32,
}

/// Mark each piece correct if it sits within `tolerance` of its cell on
/// both axes at its correct rotation, and summarise.
///
/// An empty slice is never complete.
pub fn validate_completion(pieces: &mut [PuzzlePiece], tolerance: f64) -> CompletionStatus {
    let mut correct_pieces = 0;
    for piece in pieces.iter_mut() {
        let in_place = is_within_tolerance(piece.position(), piece.base_position, tolerance);
        let upright = (piece.rotation - piece.correct_rotation).rem_euclid(360.0).abs() < f64::EPSILON;
        piece.is_correct = in_place && upright;
        if piece.is_correct {
            correct_pieces += 1;
        }
    }

    let total_pieces = pieces.len();
    let completion_rate = if total_pieces == 0 {
        0
    } else {
        u32::try_from((correct_pieces * 100 + total_pieces / 2) / total_pieces).unwrap_or(100)
    };

    CompletionStatus {
        is_complete: total_pieces > 0 && correct_pieces == total_pieces,
        correct_pieces,
        total_pieces,
        completion_rate,
    }
}

/// A random spot in the staging area to the lower right of a board of
/// side `target_size`.
pub fn scatter_position(rng: &mut SeededRandom, target_size: f64) -> Position {
    Position::new(
        rng.next().mul_add(SCATTER_SPREAD, target_size),
        rng.next().mul_add(SCATTER_SPREAD, target_size * SCATTER_TOP_FRACTION),
    )
}

/// Scatter every piece into the staging area with a random quarter-turn
/// rotation and clear its correct flag.
pub fn reset_puzzle(pieces: &mut [PuzzlePiece], rng: &mut SeededRandom, target_size: f64) {
    for piece in pieces {
        let position = scatter_position(rng, target_size);
        piece.x = position.x;
        piece.y = position.y;
        #[allow(clippy::cast_precision_loss)]
        let quarter_turns = rng.next_int(0, 3) as f64;
        piece.rotation = quarter_turns * 90.0;
        piece.is_correct = false;
    }
}

/// Edge counts over every face of every piece.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeTypeCounts {
    pub flat: usize,
    pub knob: usize,
    pub hole: usize,
}

/// Summary of a generated puzzle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PuzzleStats {
    pub total_pieces: usize,
    /// Every piece is draggable; there is no fixed anchor piece.
    pub draggable_pieces: usize,
    pub edge_types: EdgeTypeCounts,
    pub difficulty: Difficulty,
    pub estimated_minutes: u64,
    /// `"N min"` below an hour, `"H h M min"` otherwise.
    pub estimated_time: String,
}

/// Summarise piece and edge counts and estimate solving time.
#[must_use]
pub fn get_puzzle_stats(config: &PuzzleConfig) -> PuzzleStats {
    let mut edge_types = EdgeTypeCounts::default();
    for piece in &config.pieces {
        for (_, edge) in piece.edges.iter() {
            match edge.edge_type {
                EdgeType::Flat => edge_types.flat += 1,
                EdgeType::Knob => edge_types.knob += 1,
                EdgeType::Hole => edge_types.hole += 1,
            }
        }
    }

    let total_pieces = config.pieces.len();
    let estimated_minutes = (total_pieces as u64 * SECONDS_PER_PIECE).div_ceil(60);

    PuzzleStats {
        total_pieces,
        draggable_pieces: total_pieces,
        edge_types,
        difficulty: config.difficulty,
        estimated_minutes,
        estimated_time: format_minutes(estimated_minutes),
    }
}

fn format_minutes(minutes: u64) -> String {
    if minutes < 60 {
        format!("{minutes} min")
    } else {
        format!("{} h {} min", minutes / 60, minutes % 60)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{EdgePattern, EdgePatterns, ExpansionInfo, Size};

    fn piece_at(base: Position) -> PuzzlePiece {
        PuzzlePiece {
            id: "0".to_string(),
            grid_row: 0,
            grid_col: 0,
            correct_slot: 0,
            base_position: base,
            base_size: Size::new(100.0, 100.0),
            expanded_position: base,
            expanded_size: Size::new(100.0, 100.0),
            expansion: ExpansionInfo::default(),
            edges: EdgePatterns {
                top: EdgePattern::flat(0),
                right: EdgePattern::flat(0),
                bottom: EdgePattern::flat(0),
                left: EdgePattern::flat(0),
            },
            clip_path: String::new(),
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
    fn completion_counts_pieces_in_tolerance() {
        let mut pieces = vec![
            piece_at(Position::new(0.0, 0.0)),
            piece_at(Position::new(100.0, 0.0)),
            piece_at(Position::new(200.0, 0.0)),
        ];
        pieces[0].x = 5.0;
        pieces[1].x = 110.0;
        pieces[1].y = -19.0;
        pieces[2].x = 260.0;

        let status = validate_completion(&mut pieces, 20.0);
        assert_eq!(status.correct_pieces, 2);
        assert_eq!(status.total_pieces, 3);
        assert_eq!(status.completion_rate, 67);
        assert!(!status.is_complete);
        assert!(pieces[0].is_correct);
        assert!(!pieces[2].is_correct);
    }

    #[test]
    fn rotated_piece_is_not_correct() {
        let mut pieces = vec![piece_at(Position::new(0.0, 0.0))];
        pieces[0].rotation = 90.0;
        assert!(!validate_completion(&mut pieces, 20.0).is_complete);
        pieces[0].rotation = 360.0;
        assert!(validate_completion(&mut pieces, 20.0).is_complete);
    }

    #[test]
    fn empty_puzzle_is_not_complete() {
        let status = validate_completion(&mut [], 20.0);
        assert!(!status.is_complete);
        assert_eq!(status.completion_rate, 0);
    }

    #[test]
    fn reset_scatters_off_board() {
        let mut pieces = vec![piece_at(Position::new(0.0, 0.0)); 20];
        for piece in &mut pieces {
            piece.is_correct = true;
        }
        let mut rng = SeededRandom::new(3);
        reset_puzzle(&mut pieces, &mut rng, 400.0);
        for piece in &pieces {
            assert!((400.0..600.0).contains(&piece.x));
            assert!((300.0..500.0).contains(&piece.y));
            assert!([0.0, 90.0, 180.0, 270.0].contains(&piece.rotation));
            assert!(!piece.is_correct);
            assert_eq!(piece.base_position, Position::new(0.0, 0.0));
        }
    }

    #[test]
    fn time_formatting() {
        assert_eq!(format_minutes(5), "5 min");
        assert_eq!(format_minutes(60), "1 h 0 min");
        assert_eq!(format_minutes(95), "1 h 35 min");
    }
}
