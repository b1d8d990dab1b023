//! Move ordering (spec.md §4.6 step 8): hash move, then MVV-LVA captures,
//! then killers, then the history heuristic.

use crate::board::{Board, Piece};
use crate::moves::types::Move;

const CAPTURE_BASE: i32 = 10_000;
const KILLER1_SCORE: i32 = 9_000;
const KILLER2_SCORE: i32 = 8_000;

/// Victim value * 10 minus attacker value — cheap captures of big pieces
/// sort first, expensive captures of small pieces sort last. A capturing
/// promotion folds into this same bucket: the promoted piece's value is
/// added to the victim side, since the pawn is effectively trading itself
/// for both the captured piece and the piece it becomes.
pub fn mvv_lva_score(mv: Move, board: &Board) -> i32 {
    if !mv.is_capture() {
        return 0;
    }

    let victim_value = if let Some((_, captured_piece)) = board.piece_at(mv.to()) {
        captured_piece.material_value()
    } else if mv.is_en_passant() {
        Piece::Pawn.material_value()
    } else {
        return 0;
    };

    let promo_bonus = mv.promotion_piece().map(|p| p.material_value()).unwrap_or(0);
    let attacker = board
        .piece_type_at(mv.from())
        .map(|p| p.material_value())
        .unwrap_or(0);

    (victim_value + promo_bonus) * 10 - attacker
}

pub fn order_moves(
    moves: &mut [Move],
    board: &Board,
    killer_moves: &[Option<Move>; 2],
    history: &[[i32; 64]; 64],
    hash_move: Option<Move>,
) {
    moves.sort_by_cached_key(|&mv| {
        if hash_move == Some(mv) {
            return -2_000_000_000;
        }

        let capture_score = mvv_lva_score(mv, board);
        if capture_score > 0 {
            return -(CAPTURE_BASE + capture_score);
        }

        if killer_moves[0] == Some(mv) {
            return -KILLER1_SCORE;
        }
        if killer_moves[1] == Some(mv) {
            return -KILLER2_SCORE;
        }

        -history[mv.from().index() as usize][mv.to().index() as usize]
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::moves::movegen::generate_pseudo_legal;
    use arrayvec::ArrayVec;

    #[test]
    fn hash_move_sorts_first() {
        let b = Board::new_initial();
        let mut moves: ArrayVec<Move, 256> = ArrayVec::new();
        generate_pseudo_legal(&b, &mut moves);
        let hash_move = moves[10];
        let history = [[0i32; 64]; 64];
        order_moves(&mut moves, &b, &[None, None], &history, Some(hash_move));
        assert_eq!(moves[0], hash_move);
    }
}
