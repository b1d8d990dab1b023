//! Position state: piece bitboards, packed metadata, incremental Zobrist
//! hashing, and the undo stack consumed by make/unmake (spec.md §3, §4.2).

mod fen;

use crate::bitboard::BitboardExt;
use crate::hash::zobrist::zobrist_keys;
use crate::square::Square;
use std::fmt;
use std::str::FromStr;

pub mod castle_bits;
mod fen_tables;
pub use castle_bits::*;

const WHITE_PAWN_MASK: u64 = 0x0000_0000_0000_FF00;
const WHITE_ROOK_MASK: u64 = (1 << 0) | (1 << 7);
const WHITE_KNIGHT_MASK: u64 = (1 << 1) | (1 << 6);
const WHITE_BISHOP_MASK: u64 = (1 << 2) | (1 << 5);
const WHITE_QUEEN_MASK: u64 = 1 << 3;
const WHITE_KING_MASK: u64 = 1 << 4;

const BLACK_PAWN_MASK: u64 = 0x00FF_0000_0000_0000;
const BLACK_ROOK_MASK: u64 = (1 << 56) | (1 << 63);
const BLACK_KNIGHT_MASK: u64 = (1 << 57) | (1 << 62);
const BLACK_BISHOP_MASK: u64 = (1 << 58) | (1 << 61);
const BLACK_QUEEN_MASK: u64 = 1 << 59;
const BLACK_KING_MASK: u64 = 1 << 60;

/// Sentinel for an empty `piece_on_sq` slot; no valid `(color<<3)|piece`
/// encoding reaches 0xFF.
pub(crate) const EMPTY_SQ: u8 = 0xFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Color {
    White,
    Black,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Piece {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

/// Core bitboard board representation (spec.md §3 Board).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    /// `[color][piece_type]` bitboards.
    pub piece_bb: [[u64; 6]; 2],
    pub occ_white: u64,
    pub occ_black: u64,
    pub occ_all: u64,
    /// Per-square lookup: 0xFF = empty, else `(color << 3) | piece`.
    pub piece_on_sq: [u8; 64],
    pub side_to_move: Color,
    /// Bit 0=WK, 1=WQ, 2=BK, 3=BQ.
    pub castling_rights: u8,
    pub en_passant: Option<Square>,
    pub halfmove_clock: u32,
    pub fullmove_number: u32,
    pub zobrist: u64,
    /// Zobrist keys of ancestor positions since the last irreversible move
    /// (capture, pawn move, or promotion), used for repetition detection.
    pub history: Vec<u64>,
    /// White-perspective net material (spec.md §4.4), maintained
    /// incrementally by `set_bb` the same way `zobrist` is.
    pub material_score: i32,
    /// White-perspective net middlegame/endgame PST sums (table values
    /// only, material excluded), tapered by `phase` at eval time.
    pub pst_mg: i32,
    pub pst_eg: i32,
    /// Scaled non-pawn material count, 0..=24 in a normal game but not
    /// clamped here — clamp at the point of use, as `calculate_phase` did.
    pub phase: i32,
}

impl Board {
    #[inline]
    pub fn refresh_zobrist(&mut self) {
        self.zobrist = self.compute_zobrist_full();
    }

    #[inline(always)]
    pub(crate) fn bb(&self, color: Color, piece: Piece) -> u64 {
        self.piece_bb[color as usize][piece as usize]
    }

    #[inline(always)]
    pub(crate) fn set_bb(&mut self, color: Color, piece: Piece, new_bb: u64) {
        let ci = color as usize;
        let pi = piece as usize;

        let old_bb = self.piece_bb[ci][pi];
        let delta = old_bb ^ new_bb;
        if delta == 0 {
            return;
        }

        self.piece_bb[ci][pi] = new_bb;

        if color == Color::White {
            self.occ_white ^= delta;
        } else {
            self.occ_black ^= delta;
        }
        self.occ_all = self.occ_white | self.occ_black;

        let keys = zobrist_keys();
        let mut bits_to_update = delta;
        while bits_to_update != 0 {
            let sq_idx = bits_to_update.pop_lsb() as usize;
            let adding = new_bb & (1u64 << sq_idx) != 0;

            if adding {
                self.place_piece_at_sq(color, piece, Square::from_index(sq_idx as u8));
            } else {
                self.clear_square(Square::from_index(sq_idx as u8));
            }

            self.zobrist ^= keys.piece[ci][pi][sq_idx];
            self.apply_eval_delta(color, piece, sq_idx, adding);
        }
    }

    /// Updates the incremental material/PST/phase fields for one piece
    /// appearing (`adding`) or disappearing at `sq_idx`, mirroring the
    /// per-square Zobrist XOR above (spec.md §4.4/§9.91: full recomputation
    /// is only needed after FEN parsing, and even then `set_bb` does it
    /// piece by piece rather than a separate pass).
    #[inline(always)]
    fn apply_eval_delta(&mut self, color: Color, piece: Piece, sq_idx: usize, adding: bool) {
        let (material, _) = crate::search::pst::material_value(piece);
        let (mg_table, eg_table) = crate::search::pst::table_pair(piece);
        let table_idx = match color {
            Color::White => crate::search::pst::mirror(sq_idx as u8),
            Color::Black => sq_idx,
        };

        let sign: i32 = if adding { 1 } else { -1 };
        let side_sign: i32 = match color {
            Color::White => 1,
            Color::Black => -1,
        };

        self.material_score += sign * side_sign * material;
        self.pst_mg += sign * side_sign * mg_table[table_idx];
        self.pst_eg += sign * side_sign * eg_table[table_idx];

        let phase_weight = match piece {
            Piece::Knight | Piece::Bishop => 1,
            Piece::Rook => 2,
            Piece::Queen => 4,
            Piece::Pawn | Piece::King => 0,
        };
        self.phase += sign * phase_weight;
    }

    /// Full recompute of (material_score, pst_mg, pst_eg, phase); must
    /// always match the incrementally maintained fields, same parity
    /// contract as `compute_zobrist_full`.
    pub fn compute_eval_state_full(&self) -> (i32, i32, i32, i32) {
        let mut material_score = 0;
        let mut pst_mg = 0;
        let mut pst_eg = 0;
        let mut phase = 0;

        const COLORS: [Color; 2] = [Color::White, Color::Black];
        const PIECES: [Piece; 6] = [
            Piece::Pawn,
            Piece::Knight,
            Piece::Bishop,
            Piece::Rook,
            Piece::Queen,
            Piece::King,
        ];

        for &c in &COLORS {
            for &p in &PIECES {
                let mut bb = self.bb(c, p);
                while bb != 0 {
                    let sq = bb.pop_lsb() as usize;
                    let (material, _) = crate::search::pst::material_value(p);
                    let (mg_table, eg_table) = crate::search::pst::table_pair(p);
                    let table_idx = match c {
                        Color::White => crate::search::pst::mirror(sq as u8),
                        Color::Black => sq,
                    };
                    let side_sign: i32 = match c {
                        Color::White => 1,
                        Color::Black => -1,
                    };
                    material_score += side_sign * material;
                    pst_mg += side_sign * mg_table[table_idx];
                    pst_eg += side_sign * eg_table[table_idx];
                    phase += match p {
                        Piece::Knight | Piece::Bishop => 1,
                        Piece::Rook => 2,
                        Piece::Queen => 4,
                        Piece::Pawn | Piece::King => 0,
                    };
                }
            }
        }

        (material_score, pst_mg, pst_eg, phase)
    }

    #[cfg(debug_assertions)]
    pub fn assert_eval_state(&self) {
        let (material_score, pst_mg, pst_eg, phase) = self.compute_eval_state_full();
        debug_assert_eq!(self.material_score, material_score, "material_score parity mismatch");
        debug_assert_eq!(self.pst_mg, pst_mg, "pst_mg parity mismatch");
        debug_assert_eq!(self.pst_eg, pst_eg, "pst_eg parity mismatch");
        debug_assert_eq!(self.phase, phase, "phase parity mismatch");
    }

    #[inline(always)]
    pub(crate) fn clear_square(&mut self, sq: Square) {
        self.piece_on_sq[sq.index() as usize] = EMPTY_SQ;
    }

    #[inline(always)]
    pub(crate) fn place_piece_at_sq(&mut self, color: Color, piece: Piece, sq: Square) {
        self.piece_on_sq[sq.index() as usize] = (color as u8) << 3 | (piece as u8);
    }

    /// An empty board (no pieces), White to move, no castling rights.
    pub fn new_empty() -> Self {
        let mut b = Board {
            piece_bb: [[0u64; 6]; 2],
            occ_white: 0,
            occ_black: 0,
            occ_all: 0,
            piece_on_sq: [EMPTY_SQ; 64],
            side_to_move: Color::White,
            castling_rights: 0,
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
            zobrist: 0,
            history: Vec::new(),
            material_score: 0,
            pst_mg: 0,
            pst_eg: 0,
            phase: 0,
        };
        b.refresh_zobrist();
        b
    }

    /// The standard starting position.
    pub fn new_initial() -> Self {
        let mut b = Board::new_empty();
        b.set_bb(Color::White, Piece::Pawn, WHITE_PAWN_MASK);
        b.set_bb(Color::White, Piece::Bishop, WHITE_BISHOP_MASK);
        b.set_bb(Color::White, Piece::Knight, WHITE_KNIGHT_MASK);
        b.set_bb(Color::White, Piece::Rook, WHITE_ROOK_MASK);
        b.set_bb(Color::White, Piece::Queen, WHITE_QUEEN_MASK);
        b.set_bb(Color::White, Piece::King, WHITE_KING_MASK);

        b.set_bb(Color::Black, Piece::Pawn, BLACK_PAWN_MASK);
        b.set_bb(Color::Black, Piece::Bishop, BLACK_BISHOP_MASK);
        b.set_bb(Color::Black, Piece::Knight, BLACK_KNIGHT_MASK);
        b.set_bb(Color::Black, Piece::Rook, BLACK_ROOK_MASK);
        b.set_bb(Color::Black, Piece::Queen, BLACK_QUEEN_MASK);
        b.set_bb(Color::Black, Piece::King, BLACK_KING_MASK);

        b.side_to_move = Color::White;
        b.castling_rights = CASTLE_WK | CASTLE_WQ | CASTLE_BK | CASTLE_BQ;
        b.en_passant = None;
        b.halfmove_clock = 0;
        b.fullmove_number = 1;
        b.history.clear();
        b.refresh_zobrist();
        b
    }

    #[inline(always)]
    pub fn occupied(&self) -> u64 {
        self.occ_all
    }

    #[inline(always)]
    pub fn has_castling(&self, flag: u8) -> bool {
        self.castling_rights & flag != 0
    }

    /// Checks invariant I1: piece bitboards are pairwise disjoint (their
    /// union therefore equals `occ_all` by construction of `set_bb`).
    pub fn validate(&self) -> Result<(), String> {
        let bitboards = [
            ("white_pawns", self.bb(Color::White, Piece::Pawn)),
            ("white_knights", self.bb(Color::White, Piece::Knight)),
            ("white_bishops", self.bb(Color::White, Piece::Bishop)),
            ("white_rooks", self.bb(Color::White, Piece::Rook)),
            ("white_queens", self.bb(Color::White, Piece::Queen)),
            ("white_king", self.bb(Color::White, Piece::King)),
            ("black_pawns", self.bb(Color::Black, Piece::Pawn)),
            ("black_knights", self.bb(Color::Black, Piece::Knight)),
            ("black_bishops", self.bb(Color::Black, Piece::Bishop)),
            ("black_rooks", self.bb(Color::Black, Piece::Rook)),
            ("black_queens", self.bb(Color::Black, Piece::Queen)),
            ("black_king", self.bb(Color::Black, Piece::King)),
        ];

        let mut seen: u64 = 0;
        for (name, bb) in &bitboards {
            if (seen & bb) != 0 {
                return Err(format!("bitboard `{name}` overlaps with another piece"));
            }
            seen |= bb;
        }

        if self.bb(Color::White, Piece::King).pop_count() != 1 {
            return Err("white must have exactly one king".into());
        }
        if self.bb(Color::Black, Piece::King).pop_count() != 1 {
            return Err("black must have exactly one king".into());
        }
        if (self.bb(Color::White, Piece::Pawn) | self.bb(Color::Black, Piece::Pawn))
            & (RANK_1 | RANK_8)
            != 0
        {
            return Err("pawns cannot occupy the first or last rank".into());
        }

        Ok(())
    }

    #[inline(always)]
    pub fn occupancy(&self, color: Color) -> u64 {
        match color {
            Color::White => self.occ_white,
            Color::Black => self.occ_black,
        }
    }

    pub fn opponent_occupancy(&self, color: Color) -> u64 {
        self.occupancy(color.opposite())
    }

    #[inline(always)]
    pub fn pieces(&self, piece: Piece, color: Color) -> u64 {
        self.bb(color, piece)
    }

    #[inline(always)]
    pub fn piece_at(&self, sq: Square) -> Option<(Color, Piece)> {
        let val = self.piece_on_sq[sq.index() as usize];
        if val == EMPTY_SQ {
            None
        } else {
            Some((Color::from_u8((val >> 3) & 1), Piece::from_u8(val & 0b111)))
        }
    }

    #[inline(always)]
    pub fn piece_type_at(&self, sq: Square) -> Option<Piece> {
        self.piece_at(sq).map(|(_, piece)| piece)
    }

    #[inline(always)]
    pub fn color_at(&self, sq: Square) -> Option<Color> {
        self.piece_at(sq).map(|(color, _)| color)
    }

    #[inline(always)]
    pub fn en_passant_target(&self) -> Option<Square> {
        self.en_passant
    }

    #[inline(always)]
    pub fn has_kingside_castle(&self, color: Color) -> bool {
        match color {
            Color::White => self.castling_rights & CASTLE_WK != 0,
            Color::Black => self.castling_rights & CASTLE_BK != 0,
        }
    }

    #[inline(always)]
    pub fn has_queenside_castle(&self, color: Color) -> bool {
        match color {
            Color::White => self.castling_rights & CASTLE_WQ != 0,
            Color::Black => self.castling_rights & CASTLE_BQ != 0,
        }
    }

    /// Non-pawn material check used by null-move pruning to avoid
    /// zugzwang in pawn-only endgames (spec.md §4.6 step 6).
    #[inline(always)]
    pub fn has_major_pieces(&self, color: Color) -> bool {
        let knights = self.bb(color, Piece::Knight);
        let bishops = self.bb(color, Piece::Bishop);
        let rooks = self.bb(color, Piece::Rook);
        let queens = self.bb(color, Piece::Queen);
        (knights | bishops | rooks | queens) != 0
    }

    #[inline(always)]
    pub fn king_square(&self, color: Color) -> Square {
        let king_bb = self.pieces(Piece::King, color);
        assert_ne!(king_bb, 0, "king missing for {color:?}: I2 violated");
        Square::from_index(king_bb.lsb())
    }

    /// Full recompute from current state; must always match the
    /// incrementally maintained `zobrist` field (invariant I6).
    pub fn compute_zobrist_full(&self) -> u64 {
        let keys = zobrist_keys();
        let mut hash: u64 = 0;

        const COLORS: [Color; 2] = [Color::White, Color::Black];
        const PIECES: [Piece; 6] = [
            Piece::Pawn,
            Piece::Knight,
            Piece::Bishop,
            Piece::Rook,
            Piece::Queen,
            Piece::King,
        ];

        for &c in &COLORS {
            for &p in &PIECES {
                let mut bb = self.bb(c, p);
                while bb != 0 {
                    let sq = bb.pop_lsb() as usize;
                    hash ^= keys.piece[c as usize][p as usize][sq];
                }
            }
        }

        if self.side_to_move == Color::Black {
            hash ^= keys.side_to_move;
        }

        hash ^= keys.castling[self.castling_rights as usize];

        if let Some(sq) = self.en_passant {
            hash ^= keys.ep_file[sq.file() as usize];
        }

        hash
    }

    /// Count of occurrences of the current Zobrist hash among ancestor
    /// positions, including the current position itself.
    pub fn repetition_count(&self) -> u8 {
        let current = self.zobrist;
        let mut count: u8 = 1;
        for &k in &self.history {
            if k == current {
                count = count.saturating_add(1);
            }
        }
        count
    }

    pub fn is_repetition(&self) -> bool {
        let current = self.zobrist;
        self.history.iter().rev().any(|&k| k == current)
    }

    pub fn is_threefold(&self) -> bool {
        self.repetition_count() >= 3
    }

    #[cfg(debug_assertions)]
    pub fn assert_hash(&self) {
        let full = self.compute_zobrist_full();
        debug_assert_eq!(
            self.zobrist, full,
            "Zobrist parity mismatch: stored={:#018x}, full={:#018x}",
            self.zobrist, full
        );
    }
}

impl Color {
    pub fn opposite(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    #[inline(always)]
    pub(crate) fn from_u8(v: u8) -> Self {
        match v {
            0 => Color::White,
            1 => Color::Black,
            _ => panic!("invalid Color encoding: {v}"),
        }
    }
}

impl std::ops::Not for Color {
    type Output = Self;

    fn not(self) -> Self::Output {
        self.opposite()
    }
}

impl Piece {
    #[inline(always)]
    pub(crate) fn from_u8(v: u8) -> Self {
        match v {
            0 => Piece::Pawn,
            1 => Piece::Knight,
            2 => Piece::Bishop,
            3 => Piece::Rook,
            4 => Piece::Queen,
            5 => Piece::King,
            _ => panic!("invalid Piece encoding: {v}"),
        }
    }

    pub fn material_value(&self) -> i32 {
        match self {
            Piece::Pawn => 100,
            Piece::Knight => 320,
            Piece::Bishop => 330,
            Piece::Rook => 500,
            Piece::Queen => 900,
            Piece::King => 0,
        }
    }
}

use crate::bitboard::{RANK_1, RANK_8};

impl Default for Board {
    fn default() -> Self {
        Board::new_empty()
    }
}

impl FromStr for Board {
    type Err = crate::error::EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Board::from_fen(s)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_fen())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_position_satisfies_i1_i2() {
        let b = Board::new_initial();
        b.validate().unwrap();
    }

    #[test]
    fn occupancy_union_matches_occ_all() {
        let b = Board::new_initial();
        assert_eq!(b.occ_white | b.occ_black, b.occ_all);
        assert_eq!(b.occ_white & b.occ_black, 0);
    }

    #[test]
    fn zobrist_matches_full_recompute() {
        let b = Board::new_initial();
        assert_eq!(b.zobrist, b.compute_zobrist_full());
    }

    #[test]
    fn king_square_finds_both_kings() {
        let b = Board::new_initial();
        assert_eq!(b.king_square(Color::White).index(), 4);
        assert_eq!(b.king_square(Color::Black).index(), 60);
    }
}
