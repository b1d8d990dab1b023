//! Property-based invariants (spec.md §8): make/unmake round-trips and
//! move-generator soundness, checked over randomly sampled move
//! sequences from the starting position.

use arrayvec::ArrayVec;
use proptest::prelude::*;
use vantage_core::board::Board;
use vantage_core::moves::execute::{generate_legal, make_move_basic, undo_move_basic};
use vantage_core::moves::square_control::in_check;
use vantage_core::moves::types::Move;

fn legal_moves(board: &mut Board) -> ArrayVec<Move, 256> {
    let mut moves: ArrayVec<Move, 256> = ArrayVec::new();
    let mut scratch: ArrayVec<Move, 256> = ArrayVec::new();
    generate_legal(board, &mut moves, &mut scratch);
    moves
}

proptest! {
    #[test]
    fn make_unmake_restores_board_exactly(choices in prop::collection::vec(0u32..64, 0..12)) {
        let mut board = Board::new_initial();
        let mut stack = Vec::new();

        for choice in choices {
            let moves = legal_moves(&mut board);
            if moves.is_empty() {
                break;
            }
            let mv = moves[(choice as usize) % moves.len()];
            let snapshot = board.clone();
            let undo = make_move_basic(&mut board, mv);
            undo_move_basic(&mut board, undo);
            prop_assert_eq!(&board, &snapshot);

            let moves_again = legal_moves(&mut board);
            let mv = moves_again[(choice as usize) % moves_again.len()];
            stack.push(make_move_basic(&mut board, mv));
        }

        for undo in stack.into_iter().rev() {
            undo_move_basic(&mut board, undo);
        }
        prop_assert_eq!(board, Board::new_initial());
    }

    #[test]
    fn zobrist_matches_canonical_recomputation(choices in prop::collection::vec(0u32..64, 0..10)) {
        let mut board = Board::new_initial();
        for choice in choices {
            let moves = legal_moves(&mut board);
            if moves.is_empty() {
                break;
            }
            let mv = moves[(choice as usize) % moves.len()];
            make_move_basic(&mut board, mv);
            prop_assert_eq!(board.zobrist, board.compute_zobrist_full());
        }
    }

    #[test]
    fn every_generated_move_is_legal_and_unique(choices in prop::collection::vec(0u32..64, 0..8)) {
        let mut board = Board::new_initial();
        for choice in choices {
            let moves = legal_moves(&mut board);
            if moves.is_empty() {
                break;
            }

            let mut seen = std::collections::HashSet::new();
            for &mv in moves.iter() {
                prop_assert!(seen.insert(mv), "duplicate move {}", mv.to_uci());

                let mover = board.side_to_move;
                let undo = make_move_basic(&mut board, mv);
                let mover_left_in_check = in_check(&mut board, mover);
                undo_move_basic(&mut board, undo);
                prop_assert!(!mover_left_in_check);
            }

            let mv = moves[(choice as usize) % moves.len()];
            make_move_basic(&mut board, mv);
        }
    }
}
