//! Incremental make/unmake (spec.md §4.3): mutates a `Board` in place and
//! returns an `Undo` that can restore it exactly, including the Zobrist
//! hash, without a full recompute.

use crate::board::castle_bits::*;
use crate::board::{Board, Color, EMPTY_SQ, Piece};
use crate::hash::zobrist::zobrist_keys;
use crate::square::Square;

use super::movegen::generate_pseudo_legal;
use super::square_control::{in_check, is_legal_castling};
use super::types::{Move, MoveBuffer, NullMoveUndo, Undo};

#[inline(always)]
fn rook_castle_squares(king_to_idx: u8) -> Option<(Square, Square)> {
    match king_to_idx {
        6 => Some((Square::from_index(7), Square::from_index(5))),
        2 => Some((Square::from_index(0), Square::from_index(3))),
        62 => Some((Square::from_index(63), Square::from_index(61))),
        58 => Some((Square::from_index(56), Square::from_index(59))),
        _ => None,
    }
}

#[inline(always)]
fn rights_mask_to_clear_for_rook(color: Color, rook_sq: u8) -> u8 {
    match (color, rook_sq) {
        (Color::White, 0) => CASTLE_WQ,
        (Color::White, 7) => CASTLE_WK,
        (Color::Black, 56) => CASTLE_BQ,
        (Color::Black, 63) => CASTLE_BK,
        _ => 0,
    }
}

#[inline(always)]
fn remove_piece(board: &mut Board, color: Color, piece: Piece, idx: usize) {
    let new_bb = board.bb(color, piece) & !(1u64 << idx);
    board.set_bb(color, piece, new_bb);
}

#[inline(always)]
fn place_piece(board: &mut Board, color: Color, piece: Piece, idx: usize) {
    let new_bb = board.bb(color, piece) | (1u64 << idx);
    board.set_bb(color, piece, new_bb);
}

#[inline(always)]
fn xor_ep(board: &mut Board) {
    if let Some(sq) = board.en_passant {
        board.zobrist ^= zobrist_keys().ep_file[sq.file() as usize];
    }
}

#[inline(always)]
fn xor_castling(board: &mut Board, rights: u8) {
    board.zobrist ^= zobrist_keys().castling[rights as usize];
}

/// Makes `mv` on `board`, returning an `Undo` able to reverse it exactly.
pub fn make_move_basic(board: &mut Board, mv: Move) -> Undo {
    let prev_zobrist = board.zobrist;
    let prev_material_score = board.material_score;
    let prev_pst_mg = board.pst_mg;
    let prev_pst_eg = board.pst_eg;
    let prev_phase = board.phase;
    let color = board.side_to_move;
    let from_idx = mv.from().index() as usize;
    let to_idx = mv.to().index() as usize;
    let piece = board
        .piece_type_at(mv.from())
        .expect("make_move_basic called with no piece on the from-square");

    xor_ep(board);
    let prev_en_passant = board.en_passant;
    board.en_passant = None;
    let prev_halfmove_clock = board.halfmove_clock;
    let prev_fullmove_number = board.fullmove_number;

    let mut captured = None;
    if mv.is_en_passant() {
        let cap_idx = if color == Color::White { to_idx - 8 } else { to_idx + 8 };
        captured = Some((color.opposite(), Piece::Pawn, Square::from_index(cap_idx as u8)));
        remove_piece(board, color.opposite(), Piece::Pawn, cap_idx);
    } else {
        let occupant = board.piece_on_sq[to_idx];
        if occupant != EMPTY_SQ {
            let cap_color = Color::from_u8(occupant >> 3);
            let cap_piece = Piece::from_u8(occupant & 0b111);
            captured = Some((cap_color, cap_piece, mv.to()));
            remove_piece(board, cap_color, cap_piece, to_idx);
        }
    }

    let castling_rook = if mv.is_castling() {
        rook_castle_squares(to_idx as u8)
    } else {
        None
    };

    if piece == Piece::Pawn {
        let from_rank = from_idx / 8;
        let to_rank = to_idx / 8;
        if (color == Color::White && from_rank == 1 && to_rank == 3)
            || (color == Color::Black && from_rank == 6 && to_rank == 4)
        {
            let ep_idx = if color == Color::White { from_idx + 8 } else { from_idx - 8 };
            board.en_passant = Some(Square::from_index(ep_idx as u8));
        }
    }

    let old_rights = board.castling_rights;
    let mut mask_to_clear: u8 = 0;
    if piece == Piece::King {
        mask_to_clear |= match color {
            Color::White => CASTLE_WK | CASTLE_WQ,
            Color::Black => CASTLE_BK | CASTLE_BQ,
        };
    }
    if piece == Piece::Rook {
        mask_to_clear |= rights_mask_to_clear_for_rook(color, mv.from().index());
    }
    if let Some((cap_color, cap_piece, cap_sq)) = captured {
        if cap_piece == Piece::Rook {
            mask_to_clear |= rights_mask_to_clear_for_rook(cap_color, cap_sq.index());
        }
    }
    let new_rights = old_rights & !mask_to_clear;
    if new_rights != old_rights {
        xor_castling(board, old_rights);
        board.castling_rights = new_rights;
        xor_castling(board, new_rights);
    }

    remove_piece(board, color, piece, from_idx);
    let promotion = mv.promotion_piece();
    match promotion {
        Some(prom) => place_piece(board, color, prom, to_idx),
        None => place_piece(board, color, piece, to_idx),
    }

    if let Some((rook_from, rook_to)) = castling_rook {
        remove_piece(board, color, Piece::Rook, rook_from.index() as usize);
        place_piece(board, color, Piece::Rook, rook_to.index() as usize);
    }

    if captured.is_some() || piece == Piece::Pawn {
        board.halfmove_clock = 0;
    } else {
        board.halfmove_clock = prev_halfmove_clock + 1;
    }
    if color == Color::Black {
        board.fullmove_number = prev_fullmove_number + 1;
    }

    board.side_to_move = color.opposite();
    board.zobrist ^= zobrist_keys().side_to_move;
    xor_ep(board);

    let irreversible = captured.is_some() || piece == Piece::Pawn;
    let prev_history_tail = if irreversible {
        Some(std::mem::take(&mut board.history))
    } else {
        None
    };
    board.history.push(prev_zobrist);

    #[cfg(debug_assertions)]
    {
        board.assert_hash();
        board.assert_eval_state();
    }

    Undo {
        mv,
        moved_piece: piece,
        moved_color: color,
        captured,
        castling_rook,
        prev_castling_rights: old_rights,
        prev_en_passant,
        prev_halfmove_clock,
        prev_fullmove_number,
        prev_zobrist,
        prev_history_tail,
        prev_material_score,
        prev_pst_mg,
        prev_pst_eg,
        prev_phase,
    }
}

/// Reverses a `make_move_basic` call; `undo` must be the value it returned.
pub fn undo_move_basic(board: &mut Board, undo: Undo) {
    board.history.pop();
    if let Some(tail) = undo.prev_history_tail {
        board.history = tail;
    }

    board.zobrist = undo.prev_zobrist;
    board.material_score = undo.prev_material_score;
    board.pst_mg = undo.prev_pst_mg;
    board.pst_eg = undo.prev_pst_eg;
    board.phase = undo.prev_phase;
    board.side_to_move = undo.moved_color;
    board.castling_rights = undo.prev_castling_rights;
    board.halfmove_clock = undo.prev_halfmove_clock;
    board.fullmove_number = undo.prev_fullmove_number;
    board.en_passant = undo.prev_en_passant;

    let from_idx = undo.mv.from().index() as usize;
    let to_idx = undo.mv.to().index() as usize;

    if let Some(prom) = undo.mv.promotion_piece() {
        remove_piece_no_hash(board, undo.moved_color, prom, to_idx);
        place_piece_no_hash(board, undo.moved_color, Piece::Pawn, from_idx);
    } else {
        remove_piece_no_hash(board, undo.moved_color, undo.moved_piece, to_idx);
        place_piece_no_hash(board, undo.moved_color, undo.moved_piece, from_idx);
    }

    if let Some((cap_color, cap_piece, cap_sq)) = undo.captured {
        place_piece_no_hash(board, cap_color, cap_piece, cap_sq.index() as usize);
    }

    if let Some((rook_from, rook_to)) = undo.castling_rook {
        remove_piece_no_hash(board, undo.moved_color, Piece::Rook, rook_to.index() as usize);
        place_piece_no_hash(board, undo.moved_color, Piece::Rook, rook_from.index() as usize);
    }

    #[cfg(debug_assertions)]
    {
        board.assert_hash();
        board.assert_eval_state();
    }
}

/// Board-state mutation without the incremental Zobrist XOR — used only
/// by `undo_move_basic`, which restores the pre-move hash wholesale
/// instead of re-deriving it move by move.
#[inline(always)]
fn remove_piece_no_hash(board: &mut Board, color: Color, piece: Piece, idx: usize) {
    let bb = board.piece_bb[color as usize][piece as usize] & !(1u64 << idx);
    set_bb_no_hash(board, color, piece, bb);
    board.clear_square(Square::from_index(idx as u8));
}

#[inline(always)]
fn place_piece_no_hash(board: &mut Board, color: Color, piece: Piece, idx: usize) {
    let bb = board.piece_bb[color as usize][piece as usize] | (1u64 << idx);
    set_bb_no_hash(board, color, piece, bb);
    board.place_piece_at_sq(color, piece, Square::from_index(idx as u8));
}

#[inline(always)]
fn set_bb_no_hash(board: &mut Board, color: Color, piece: Piece, new_bb: u64) {
    board.piece_bb[color as usize][piece as usize] = new_bb;
    board.occ_white = 0;
    board.occ_black = 0;
    for p in 0..6 {
        board.occ_white |= board.piece_bb[0][p];
        board.occ_black |= board.piece_bb[1][p];
    }
    board.occ_all = board.occ_white | board.occ_black;
}

pub fn make_null_move(board: &mut Board) -> NullMoveUndo {
    let prev_zobrist = board.zobrist;
    board.history.push(board.zobrist);
    let prev_en_passant = board.en_passant;

    xor_ep(board);
    board.en_passant = None;

    board.side_to_move = board.side_to_move.opposite();
    board.zobrist ^= zobrist_keys().side_to_move;

    NullMoveUndo {
        prev_en_passant,
        prev_zobrist,
    }
}

pub fn undo_null_move(board: &mut Board, undo: NullMoveUndo) {
    board.history.pop();
    board.zobrist = undo.prev_zobrist;
    board.side_to_move = board.side_to_move.opposite();
    board.en_passant = undo.prev_en_passant;
}

/// All legal moves for the side to move, found by filtering pseudo-legal
/// moves through make/unmake + check detection.
pub fn generate_legal(board: &mut Board, moves: &mut impl MoveBuffer, scratch: &mut impl MoveBuffer) {
    scratch.clear();
    generate_pseudo_legal(board, scratch);
    moves.clear();

    for mv in scratch.iter().copied() {
        if mv.is_castling() && !is_legal_castling(board, mv) {
            continue;
        }
        let mover = board.side_to_move;
        let undo = make_move_basic(board, mv);
        let illegal = in_check(board, mover);
        undo_move_basic(board, undo);
        if !illegal {
            moves.push(mv);
        }
    }
}

#[inline]
pub fn is_legal_move(board: &mut Board, mv: Move) -> bool {
    if mv.is_castling() {
        return is_legal_castling(board, mv);
    }
    let mover = board.side_to_move;
    let undo = make_move_basic(board, mv);
    let illegal = in_check(board, mover);
    undo_move_basic(board, undo);
    !illegal
}

/// Legal captures and queen promotions — the quiescence search's
/// noisy-move set (spec.md §4.6: "generate captures and queen promotions").
/// Under- and knight-promotions are quiet from quiescence's point of view
/// and are left to the full search.
pub fn generate_captures(board: &mut Board, moves: &mut impl MoveBuffer, scratch: &mut impl MoveBuffer) {
    scratch.clear();
    generate_pseudo_legal(board, scratch);
    moves.clear();

    for &mv in scratch.iter() {
        let is_queen_promo = mv.promotion_piece() == Some(Piece::Queen);
        if !mv.is_capture() && !is_queen_promo {
            continue;
        }
        let mover = board.side_to_move;
        let undo = make_move_basic(board, mv);
        let legal = !in_check(board, mover);
        undo_move_basic(board, undo);
        if legal {
            moves.push(mv);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::movegen::generate_pseudo_legal;
    use arrayvec::ArrayVec;
    use std::str::FromStr;

    #[test]
    fn make_unmake_restores_hash_and_state() {
        let mut b = Board::new_initial();
        let before = b.clone();
        let e2 = Square::from_str("e2").unwrap();
        let e4 = Square::from_str("e4").unwrap();
        let mv = Move::new(e2, e4, super::super::types::DOUBLE_PUSH);
        let undo = make_move_basic(&mut b, mv);
        assert_ne!(b.zobrist, before.zobrist);
        undo_move_basic(&mut b, undo);
        assert_eq!(b, before);
    }

    #[test]
    fn incremental_eval_state_matches_full_recompute_after_capture() {
        let mut b = Board::from_fen("rnbqkbnr/pppp1ppp/8/4p3/3P4/8/PPP1PPPP/RNBQKBNR w KQkq e6 0 2")
            .unwrap();
        let d4 = Square::from_str("d4").unwrap();
        let e5 = Square::from_str("e5").unwrap();
        let mv = Move::new(d4, e5, super::super::types::CAPTURE);
        make_move_basic(&mut b, mv);
        assert_eq!(b.compute_eval_state_full(), (b.material_score, b.pst_mg, b.pst_eg, b.phase));
    }

    #[test]
    fn en_passant_capture_removes_correct_pawn() {
        let mut b = Board::from_fen("8/8/8/3pP3/8/8/8/4k2K w - d6 0 2").unwrap();
        let e5 = Square::from_str("e5").unwrap();
        let d6 = Square::from_str("d6").unwrap();
        let mv = Move::new(e5, d6, super::super::types::EP_CAPTURE);
        let before = b.clone();
        let undo = make_move_basic(&mut b, mv);
        assert!(b.piece_at(Square::from_str("d5").unwrap()).is_none());
        undo_move_basic(&mut b, undo);
        assert_eq!(b, before);
    }

    #[test]
    fn generate_legal_excludes_moves_leaving_king_in_check() {
        let mut b = Board::from_fen("4k3/8/8/8/8/8/4r3/4K3 w - - 0 1").unwrap();
        let mut moves: ArrayVec<Move, 256> = ArrayVec::new();
        let mut scratch: ArrayVec<Move, 256> = ArrayVec::new();
        generate_legal(&mut b, &mut moves, &mut scratch);
        for mv in &moves {
            assert_ne!(mv.to().index(), 4, "king cannot stay on the checked file");
        }
    }

    #[test]
    fn pseudo_legal_superset_of_legal() {
        let mut b = Board::new_initial();
        let mut pseudo: ArrayVec<Move, 256> = ArrayVec::new();
        generate_pseudo_legal(&b, &mut pseudo);
        let mut legal: ArrayVec<Move, 256> = ArrayVec::new();
        let mut scratch: ArrayVec<Move, 256> = ArrayVec::new();
        generate_legal(&mut b, &mut legal, &mut scratch);
        assert_eq!(pseudo.len(), legal.len());
        let _ = &mut b;
    }
}
