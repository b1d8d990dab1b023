//! Pseudo-legal move generation, piece by piece. Legality (does the move
//! leave our own king in check) is filtered afterward by make/unmake in
//! `execute.rs`, not here.

use super::attacks::{bishop_attacks, king_attacks, knight_attacks, pawn_attacks, rook_attacks};
use super::square_control::is_legal_castling;
use super::types::{
    CAPTURE, DOUBLE_PUSH, EP_CAPTURE, KING_CASTLE, Move, MoveBuffer, PROMO_B, PROMO_B_CAPTURE,
    PROMO_N, PROMO_N_CAPTURE, PROMO_Q, PROMO_Q_CAPTURE, PROMO_R, PROMO_R_CAPTURE, QUEEN_CASTLE,
    QUIET,
};
use crate::bitboard::{BitboardExt, RANK_1, RANK_2, RANK_7, RANK_8};
use crate::board::{Board, Color, Piece};
use crate::square::Square;

const WHITE_KINGSIDE_BETWEEN: u64 = 0x0000_0000_0000_0060;
const WHITE_QUEENSIDE_BETWEEN: u64 = 0x0000_0000_0000_000E;
const BLACK_KINGSIDE_BETWEEN: u64 = 0x6000_0000_0000_0000;
const BLACK_QUEENSIDE_BETWEEN: u64 = 0x0E00_0000_0000_0000;

const PROMO_FLAGS: [u8; 4] = [PROMO_Q, PROMO_R, PROMO_B, PROMO_N];
const PROMO_CAPTURE_FLAGS: [u8; 4] = [
    PROMO_Q_CAPTURE,
    PROMO_R_CAPTURE,
    PROMO_B_CAPTURE,
    PROMO_N_CAPTURE,
];

#[inline(always)]
fn kingside_between(color: Color) -> u64 {
    match color {
        Color::White => WHITE_KINGSIDE_BETWEEN,
        Color::Black => BLACK_KINGSIDE_BETWEEN,
    }
}

#[inline(always)]
fn queenside_between(color: Color) -> u64 {
    match color {
        Color::White => WHITE_QUEENSIDE_BETWEEN,
        Color::Black => BLACK_QUEENSIDE_BETWEEN,
    }
}

#[inline(always)]
fn push_targets(from: u8, mut targets: u64, enemy: u64, move_list: &mut impl MoveBuffer) {
    while targets != 0 {
        let to = targets.pop_lsb();
        let flags = if (enemy >> to) & 1 != 0 { CAPTURE } else { QUIET };
        move_list.push(Move::new(Square::from_index(from), Square::from_index(to), flags));
    }
}

#[inline(always)]
fn push_captures(from: u8, mut targets: u64, enemy: u64, move_list: &mut impl MoveBuffer) {
    targets &= enemy;
    while targets != 0 {
        let to = targets.pop_lsb();
        move_list.push(Move::new(Square::from_index(from), Square::from_index(to), CAPTURE));
    }
}

#[inline(always)]
fn push_quiets(from: u8, mut targets: u64, empty: u64, move_list: &mut impl MoveBuffer) {
    targets &= empty;
    while targets != 0 {
        let to = targets.pop_lsb();
        move_list.push(Move::new(Square::from_index(from), Square::from_index(to), QUIET));
    }
}

fn castle_moves(board: &Board, move_list: &mut impl MoveBuffer) {
    let color = board.side_to_move;
    let king_bb = board.pieces(Piece::King, color);
    if king_bb == 0 {
        return;
    }
    let from = king_bb.lsb();
    let occ = board.occupied();

    if board.has_kingside_castle(color) && (occ & kingside_between(color)) == 0 {
        let mv = Move::new(Square::from_index(from), Square::from_index(from + 2), KING_CASTLE);
        if is_legal_castling(board, mv) {
            move_list.push(mv);
        }
    }
    if board.has_queenside_castle(color) && (occ & queenside_between(color)) == 0 {
        let mv = Move::new(Square::from_index(from), Square::from_index(from - 2), QUEEN_CASTLE);
        if is_legal_castling(board, mv) {
            move_list.push(mv);
        }
    }
}

pub fn generate_knight_moves(board: &Board, move_list: &mut impl MoveBuffer) {
    let color = board.side_to_move;
    let enemy_king = board.pieces(Piece::King, color.opposite());
    let friendly = board.occupancy(color);
    let enemy_without_king = board.opponent_occupancy(color) & !enemy_king;

    let mut bb = board.pieces(Piece::Knight, color);
    while bb != 0 {
        let from = bb.pop_lsb();
        let targets = knight_attacks(from) & !friendly & !enemy_king;
        push_targets(from, targets, enemy_without_king, move_list);
    }
}

pub fn generate_bishop_moves(board: &Board, move_list: &mut impl MoveBuffer) {
    let color = board.side_to_move;
    let enemy_king = board.pieces(Piece::King, color.opposite());
    let friendly = board.occupancy(color);
    let enemy_without_king = board.opponent_occupancy(color) & !enemy_king;
    let occ = board.occupied();

    let mut bb = board.pieces(Piece::Bishop, color);
    while bb != 0 {
        let from = bb.pop_lsb();
        let targets = bishop_attacks(from, occ) & !friendly & !enemy_king;
        push_targets(from, targets, enemy_without_king, move_list);
    }
}

pub fn generate_rook_moves(board: &Board, move_list: &mut impl MoveBuffer) {
    let color = board.side_to_move;
    let enemy_king = board.pieces(Piece::King, color.opposite());
    let friendly = board.occupancy(color);
    let enemy_without_king = board.opponent_occupancy(color) & !enemy_king;
    let occ = board.occupied();

    let mut bb = board.pieces(Piece::Rook, color);
    while bb != 0 {
        let from = bb.pop_lsb();
        let targets = rook_attacks(from, occ) & !friendly & !enemy_king;
        push_targets(from, targets, enemy_without_king, move_list);
    }
}

pub fn generate_queen_moves(board: &Board, move_list: &mut impl MoveBuffer) {
    let color = board.side_to_move;
    let enemy_king = board.pieces(Piece::King, color.opposite());
    let friendly = board.occupancy(color);
    let enemy_without_king = board.opponent_occupancy(color) & !enemy_king;
    let occ = board.occupied();

    let mut bb = board.pieces(Piece::Queen, color);
    while bb != 0 {
        let from = bb.pop_lsb();
        let targets = (rook_attacks(from, occ) | bishop_attacks(from, occ)) & !friendly & !enemy_king;
        push_targets(from, targets, enemy_without_king, move_list);
    }
}

pub fn generate_king_moves(board: &Board, move_list: &mut impl MoveBuffer) {
    let color = board.side_to_move;
    let king_bb = board.pieces(Piece::King, color);
    if king_bb == 0 {
        return;
    }
    let from = king_bb.lsb();
    let friendly = board.occupancy(color);
    let enemy_king = board.pieces(Piece::King, color.opposite());
    let enemy = board.opponent_occupancy(color) & !enemy_king;

    let targets = king_attacks(from) & !friendly & !enemy_king;
    push_targets(from, targets, enemy, move_list);

    castle_moves(board, move_list);
}

fn generate_pawn_moves_split(board: &Board, move_list: &mut impl MoveBuffer, want_captures: bool, want_quiets: bool) {
    let color = board.side_to_move;
    let pawns = board.pieces(Piece::Pawn, color);
    let enemy_without_king = board.opponent_occupancy(color) & !board.pieces(Piece::King, color.opposite());
    let empty = !board.occupied();

    let (start_rank, promo_rank) = match color {
        Color::White => (RANK_7, RANK_8),
        Color::Black => (RANK_2, RANK_1),
    };

    if want_quiets {
        let single_pushes = match color {
            Color::White => ((pawns << 8) & empty) & !promo_rank,
            Color::Black => ((pawns >> 8) & empty) & !promo_rank,
        };
        let mut bb = single_pushes;
        while bb != 0 {
            let to = bb.pop_lsb();
            let from = match color {
                Color::White => to - 8,
                Color::Black => to + 8,
            };
            move_list.push(Move::new(Square::from_index(from), Square::from_index(to), QUIET));
        }

        let double_pushes = match color {
            Color::White => (((pawns & RANK_2) << 8) & empty) << 8 & empty,
            Color::Black => (((pawns & RANK_7) >> 8) & empty) >> 8 & empty,
        };
        let mut bb = double_pushes;
        while bb != 0 {
            let to = bb.pop_lsb();
            let from = match color {
                Color::White => to - 16,
                Color::Black => to + 16,
            };
            move_list.push(Move::new(Square::from_index(from), Square::from_index(to), DOUBLE_PUSH));
        }
    }

    if want_captures {
        let mut attackers = pawns & !start_rank;
        while attackers != 0 {
            let from = attackers.pop_lsb();
            let mut targets = pawn_attacks(color, from) & enemy_without_king & !promo_rank;
            while targets != 0 {
                let to = targets.pop_lsb();
                move_list.push(Move::new(Square::from_index(from), Square::from_index(to), CAPTURE));
            }
        }
    }

    // Promotions (push and capture) are generated alongside captures.
    // Quiescence calls (want_quiets == false) only want the noisy subset
    // queen promotions (spec.md §4.6: "generate captures and queen
    // promotions") — full pseudo-legal generation (want_quiets == true)
    // still needs all four underpromotion choices available to the search.
    if want_captures {
        let promo_flags: &[u8] = if want_quiets { &PROMO_FLAGS } else { &[PROMO_Q] };
        let promo_capture_flags: &[u8] = if want_quiets {
            &PROMO_CAPTURE_FLAGS
        } else {
            &[PROMO_Q_CAPTURE]
        };

        let shift: u8 = 8;
        let promo_pushes = match color {
            Color::White => (pawns & start_rank) << shift & empty,
            Color::Black => (pawns & start_rank) >> shift & empty,
        };
        let mut bb = promo_pushes;
        while bb != 0 {
            let to = bb.pop_lsb();
            let from = match color {
                Color::White => to - shift,
                Color::Black => to + shift,
            };
            for &flag in promo_flags {
                move_list.push(Move::new(Square::from_index(from), Square::from_index(to), flag));
            }
        }

        let mut promo_attackers = pawns & start_rank;
        while promo_attackers != 0 {
            let from = promo_attackers.pop_lsb();
            let mut targets = pawn_attacks(color, from) & enemy_without_king & promo_rank;
            while targets != 0 {
                let to = targets.pop_lsb();
                for &flag in promo_capture_flags {
                    move_list.push(Move::new(Square::from_index(from), Square::from_index(to), flag));
                }
            }
        }

        if let Some(ep_sq) = board.en_passant {
            let ep = ep_sq.index();
            if empty & (1u64 << ep) != 0 {
                let cap_sq = match color {
                    Color::White => ep - 8,
                    Color::Black => ep + 8,
                };
                let enemy_pawns = board.pieces(Piece::Pawn, color.opposite());
                if enemy_pawns & (1u64 << cap_sq) != 0 {
                    let mut atk = pawns;
                    while atk != 0 {
                        let from = atk.pop_lsb();
                        if pawn_attacks(color, from) & (1u64 << ep) != 0 {
                            move_list.push(Move::new(
                                Square::from_index(from),
                                Square::from_index(ep),
                                EP_CAPTURE,
                            ));
                        }
                    }
                }
            }
        }
    }
}

pub fn generate_pawn_moves(board: &Board, move_list: &mut impl MoveBuffer) {
    generate_pawn_moves_split(board, move_list, true, true);
}

/// All pseudo-legal moves for the side to move.
pub fn generate_pseudo_legal(board: &Board, moves: &mut impl MoveBuffer) {
    moves.clear();
    generate_pawn_moves(board, moves);
    generate_knight_moves(board, moves);
    generate_bishop_moves(board, moves);
    generate_rook_moves(board, moves);
    generate_queen_moves(board, moves);
    generate_king_moves(board, moves);
}

/// Captures and promotions only, for quiescence search (spec.md §4.6).
pub fn generate_pseudo_legal_captures(board: &Board, moves: &mut impl MoveBuffer) {
    generate_pawn_moves_split(board, moves, true, false);

    let color = board.side_to_move;
    let enemy_king = board.pieces(Piece::King, color.opposite());
    let enemy_without_king = board.opponent_occupancy(color) & !enemy_king;
    let friendly = board.occupancy(color);
    let occ = board.occupied();

    let mut bb = board.pieces(Piece::Knight, color);
    while bb != 0 {
        let from = bb.pop_lsb();
        push_captures(from, knight_attacks(from) & !friendly & !enemy_king, enemy_without_king, moves);
    }
    let mut bb = board.pieces(Piece::Bishop, color);
    while bb != 0 {
        let from = bb.pop_lsb();
        push_captures(from, bishop_attacks(from, occ) & !friendly & !enemy_king, enemy_without_king, moves);
    }
    let mut bb = board.pieces(Piece::Rook, color);
    while bb != 0 {
        let from = bb.pop_lsb();
        push_captures(from, rook_attacks(from, occ) & !friendly & !enemy_king, enemy_without_king, moves);
    }
    let mut bb = board.pieces(Piece::Queen, color);
    while bb != 0 {
        let from = bb.pop_lsb();
        let atk = rook_attacks(from, occ) | bishop_attacks(from, occ);
        push_captures(from, atk & !friendly & !enemy_king, enemy_without_king, moves);
    }

    let king_bb = board.pieces(Piece::King, color);
    if king_bb != 0 {
        let from = king_bb.lsb();
        push_captures(from, king_attacks(from) & !friendly & !enemy_king, enemy_without_king, moves);
    }
}

/// Quiet (non-capture, non-promotion) moves only.
pub fn generate_pseudo_legal_quiets(board: &Board, moves: &mut impl MoveBuffer) {
    generate_pawn_moves_split(board, moves, false, true);

    let color = board.side_to_move;
    let enemy_king = board.pieces(Piece::King, color.opposite());
    let friendly = board.occupancy(color);
    let empty = !board.occupied();
    let occ = board.occupied();

    let mut bb = board.pieces(Piece::Knight, color);
    while bb != 0 {
        let from = bb.pop_lsb();
        push_quiets(from, knight_attacks(from) & !friendly & !enemy_king, empty, moves);
    }
    let mut bb = board.pieces(Piece::Bishop, color);
    while bb != 0 {
        let from = bb.pop_lsb();
        push_quiets(from, bishop_attacks(from, occ) & !friendly & !enemy_king, empty, moves);
    }
    let mut bb = board.pieces(Piece::Rook, color);
    while bb != 0 {
        let from = bb.pop_lsb();
        push_quiets(from, rook_attacks(from, occ) & !friendly & !enemy_king, empty, moves);
    }
    let mut bb = board.pieces(Piece::Queen, color);
    while bb != 0 {
        let from = bb.pop_lsb();
        let atk = rook_attacks(from, occ) | bishop_attacks(from, occ);
        push_quiets(from, atk & !friendly & !enemy_king, empty, moves);
    }

    let king_bb = board.pieces(Piece::King, color);
    if king_bb != 0 {
        let from = king_bb.lsb();
        push_quiets(from, king_attacks(from) & !friendly & !enemy_king, empty, moves);
    }
    castle_moves(board, moves);
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrayvec::ArrayVec;

    #[test]
    fn startpos_has_twenty_moves() {
        let b = Board::new_initial();
        let mut moves: ArrayVec<Move, 256> = ArrayVec::new();
        generate_pseudo_legal(&b, &mut moves);
        assert_eq!(moves.len(), 20);
    }

    #[test]
    fn captures_and_quiets_partition_full_generation() {
        let b = Board::from_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1")
            .unwrap();
        let mut all: ArrayVec<Move, 256> = ArrayVec::new();
        generate_pseudo_legal(&b, &mut all);
        let mut captures: ArrayVec<Move, 256> = ArrayVec::new();
        generate_pseudo_legal_captures(&b, &mut captures);
        let mut quiets: ArrayVec<Move, 256> = ArrayVec::new();
        generate_pseudo_legal_quiets(&b, &mut quiets);
        assert_eq!(all.len(), captures.len() + quiets.len());
    }
}
