//! Concrete end-to-end scenarios (spec.md §8).

use arrayvec::ArrayVec;
use vantage_core::board::Board;
use vantage_core::config::{EngineConfig, SearchLimits};
use vantage_core::moves::execute::{generate_legal, make_move_basic, undo_move_basic};
use vantage_core::moves::types::Move;
use vantage_core::search::search;
use vantage_core::search::search::MATE_THRESHOLD;

fn legal_moves(board: &mut Board) -> Vec<Move> {
    let mut moves: ArrayVec<Move, 256> = ArrayVec::new();
    let mut scratch: ArrayVec<Move, 256> = ArrayVec::new();
    generate_legal(board, &mut moves, &mut scratch);
    moves.into_iter().collect()
}

#[test]
fn checkmate_detection() {
    let mut board = Board::from_fen("6k1/5ppp/8/8/8/8/5PPP/4R1K1 w - - 0 1").unwrap();
    let result = search(&mut board, &EngineConfig::default(), SearchLimits::depth(3));
    let mv = result.best_move.expect("a mating move should be found");
    assert_eq!(mv.to_uci(), "e1e8");
    assert!(result.score_cp >= MATE_THRESHOLD - 3);
}

#[test]
fn stalemate_as_draw() {
    let mut board = Board::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
    assert!(legal_moves(&mut board).is_empty());
    let result = search(&mut board, &EngineConfig::default(), SearchLimits::depth(2));
    assert_eq!(result.score_cp, 0);
    assert!(result.best_move.is_none());
}

#[test]
fn en_passant_regression() {
    let mut board = Board::new_initial();
    for uci in ["e2e4", "d7d5", "e4e5", "f7f5"] {
        let mv = legal_moves(&mut board)
            .into_iter()
            .find(|m| m.to_uci() == uci)
            .unwrap_or_else(|| panic!("{uci} should be legal"));
        make_move_basic(&mut board, mv);
    }

    let ep_move = legal_moves(&mut board)
        .into_iter()
        .find(|m| m.to_uci() == "e5f6")
        .expect("e5f6 en passant should be legal");
    assert!(ep_move.is_en_passant());

    let snapshot = board.clone();
    let undo = make_move_basic(&mut board, ep_move);

    assert!(board.piece_type_at("f5".parse().unwrap()).is_none());
    assert!(board.piece_type_at("f6".parse().unwrap()).is_some());
    assert!(board.en_passant.is_none());

    undo_move_basic(&mut board, undo);
    assert_eq!(board, snapshot);
    assert_eq!(board.en_passant.unwrap().to_string(), "e6");
}

#[test]
fn castling_through_check_is_forbidden() {
    let mut board = Board::from_fen("r3k2r/8/8/8/8/5q2/8/R3K2R w KQkq - 0 1").unwrap();
    let moves = legal_moves(&mut board);
    assert!(!moves.iter().any(|m| m.to_uci() == "e1g1"));
    assert!(moves.iter().any(|m| m.to_uci() == "e1c1"));
}

#[test]
fn promotion_generates_all_four_pieces() {
    let mut board = Board::from_fen("8/P7/8/8/8/8/8/4k2K w - - 0 1").unwrap();
    let moves = legal_moves(&mut board);
    for suffix in ["q", "r", "b", "n"] {
        let uci = format!("a7a8{suffix}");
        assert!(moves.iter().any(|m| m.to_uci() == uci), "missing {uci}");
    }
    assert_eq!(moves.len(), 4);
}

#[test]
fn perft_smoke_test_depth_four() {
    let mut board = Board::new_initial();
    let nodes = vantage_core::moves::perft::perft(&mut board, 4);
    assert_eq!(nodes, 197_281);
}

#[test]
fn fen_round_trips_through_legal_play() {
    let mut board = Board::new_initial();
    for uci in ["e2e4", "e7e5", "g1f3", "b8c6"] {
        let mv = legal_moves(&mut board)
            .into_iter()
            .find(|m| m.to_uci() == uci)
            .unwrap();
        make_move_basic(&mut board, mv);
    }
    let fen = board.to_fen();
    let reparsed = Board::from_fen(&fen).unwrap();
    assert_eq!(board, reparsed);
}
