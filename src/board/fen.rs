//! FEN parsing and serialization (spec.md §4.2/§6). Parsing is strict:
//! any malformed field yields `EngineError::InvalidFen` rather than a
//! best-effort guess.

use super::fen_tables::{CHAR_TO_PC, PC_TO_CHAR};
use super::{castle_bits::*, Board, Color, Piece};
use crate::error::EngineError;
use crate::moves::square_control::in_check;
use crate::square::Square;

pub const STARTPOS_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

impl Board {
    /// Parses a FEN string into a validated `Board`.
    pub fn from_fen(fen: &str) -> Result<Board, EngineError> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() != 6 {
            return Err(EngineError::InvalidFen(format!(
                "expected 6 space-separated fields, found {}",
                fields.len()
            )));
        }

        let mut board = Board::new_empty();
        parse_piece_placement(&mut board, fields[0])?;
        board.side_to_move = parse_side_to_move(fields[1])?;
        board.castling_rights = parse_castling(fields[2])?;
        board.en_passant = parse_en_passant(fields[3])?;
        board.halfmove_clock = fields[4]
            .parse()
            .map_err(|_| EngineError::InvalidFen(format!("bad halfmove clock `{}`", fields[4])))?;
        board.fullmove_number = fields[5]
            .parse()
            .map_err(|_| EngineError::InvalidFen(format!("bad fullmove number `{}`", fields[5])))?;
        if board.fullmove_number == 0 {
            return Err(EngineError::InvalidFen("fullmove number must be >= 1".into()));
        }

        board.refresh_zobrist();
        board
            .validate()
            .map_err(EngineError::InvalidFen)?;

        // Invariant I5: the side not on move can't be left in check — that
        // position could only be reached by the side to move leaving its
        // own king in check on the previous move, which is illegal.
        if in_check(&board, board.side_to_move.opposite()) {
            return Err(EngineError::InvalidFen(
                "side not to move is in check".into(),
            ));
        }

        Ok(board)
    }

    /// Serializes the current position back to FEN.
    pub fn to_fen(&self) -> String {
        let mut s = String::with_capacity(64);

        for rank in (0..8u8).rev() {
            let mut empty_run = 0u8;
            for file in 0..8u8 {
                let sq = Square::from_file_rank(file, rank);
                match self.piece_at(sq) {
                    Some((color, piece)) => {
                        if empty_run > 0 {
                            s.push((b'0' + empty_run) as char);
                            empty_run = 0;
                        }
                        s.push(PC_TO_CHAR[(color as usize) * 6 + piece as usize]);
                    }
                    None => empty_run += 1,
                }
            }
            if empty_run > 0 {
                s.push((b'0' + empty_run) as char);
            }
            if rank > 0 {
                s.push('/');
            }
        }

        s.push(' ');
        s.push(if self.side_to_move == Color::White { 'w' } else { 'b' });

        s.push(' ');
        if self.castling_rights == 0 {
            s.push('-');
        } else {
            if self.has_castling(CASTLE_WK) {
                s.push('K');
            }
            if self.has_castling(CASTLE_WQ) {
                s.push('Q');
            }
            if self.has_castling(CASTLE_BK) {
                s.push('k');
            }
            if self.has_castling(CASTLE_BQ) {
                s.push('q');
            }
        }

        s.push(' ');
        match self.en_passant {
            Some(sq) => s.push_str(&sq.to_string()),
            None => s.push('-'),
        }

        s.push_str(&format!(" {} {}", self.halfmove_clock, self.fullmove_number));

        s
    }
}

fn parse_piece_placement(board: &mut Board, field: &str) -> Result<(), EngineError> {
    let ranks: Vec<&str> = field.split('/').collect();
    if ranks.len() != 8 {
        return Err(EngineError::InvalidFen(format!(
            "piece placement must have 8 ranks, found {}",
            ranks.len()
        )));
    }

    // FEN lists ranks from 8 down to 1.
    for (rank_from_top, rank_str) in ranks.iter().enumerate() {
        let rank = 7 - rank_from_top as u8;
        let mut file: u8 = 0;
        for c in rank_str.chars() {
            if file > 8 {
                return Err(EngineError::InvalidFen(format!(
                    "rank `{rank_str}` overflows 8 files"
                )));
            }
            if let Some(d) = c.to_digit(10) {
                if d == 0 || d > 8 {
                    return Err(EngineError::InvalidFen(format!(
                        "invalid empty-square count `{c}` in rank `{rank_str}`"
                    )));
                }
                file += d as u8;
                continue;
            }

            if file >= 8 {
                return Err(EngineError::InvalidFen(format!(
                    "rank `{rank_str}` overflows 8 files"
                )));
            }
            let (piece, color) = CHAR_TO_PC[c as usize].ok_or_else(|| {
                EngineError::InvalidFen(format!("invalid piece glyph `{c}`"))
            })?;
            let sq = Square::from_file_rank(file, rank);
            let bb = board.bb(color, piece) | (1u64 << sq.index());
            board.set_bb(color, piece, bb);
            file += 1;
        }
        if file != 8 {
            return Err(EngineError::InvalidFen(format!(
                "rank `{rank_str}` does not sum to 8 files"
            )));
        }
    }

    Ok(())
}

fn parse_side_to_move(field: &str) -> Result<Color, EngineError> {
    match field {
        "w" => Ok(Color::White),
        "b" => Ok(Color::Black),
        other => Err(EngineError::InvalidFen(format!(
            "side to move must be `w` or `b`, found `{other}`"
        ))),
    }
}

fn parse_castling(field: &str) -> Result<u8, EngineError> {
    if field == "-" {
        return Ok(0);
    }
    let mut rights = 0u8;
    for c in field.chars() {
        rights |= match c {
            'K' => CASTLE_WK,
            'Q' => CASTLE_WQ,
            'k' => CASTLE_BK,
            'q' => CASTLE_BQ,
            other => {
                return Err(EngineError::InvalidFen(format!(
                    "invalid castling character `{other}`"
                )))
            }
        };
    }
    Ok(rights)
}

fn parse_en_passant(field: &str) -> Result<Option<Square>, EngineError> {
    if field == "-" {
        return Ok(None);
    }
    let sq: Square = field
        .parse()
        .map_err(|_| EngineError::InvalidFen(format!("invalid en-passant square `{field}`")))?;
    if !(sq.rank() == 2 || sq.rank() == 5) {
        return Err(EngineError::InvalidFen(format!(
            "en-passant square `{field}` must be on rank 3 or rank 6"
        )));
    }
    Ok(Some(sq))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startpos_round_trips() {
        let b = Board::from_fen(STARTPOS_FEN).unwrap();
        assert_eq!(b.to_fen(), STARTPOS_FEN);
    }

    #[test]
    fn rejects_wrong_field_count() {
        assert!(Board::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -").is_err());
    }

    #[test]
    fn rejects_bad_rank_sum() {
        let bad = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPP/RNBQKBNR w KQkq - 0 1";
        assert!(Board::from_fen(bad).is_err());
    }

    #[test]
    fn rejects_missing_king() {
        let bad = "rnbq1bnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQ1BNR w KQkq - 0 1";
        assert!(Board::from_fen(bad).is_err());
    }

    #[test]
    fn kiwipete_round_trips() {
        let kiwipete =
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
        let b = Board::from_fen(kiwipete).unwrap();
        assert_eq!(b.to_fen(), kiwipete);
    }

    #[test]
    fn en_passant_square_must_be_rank_3_or_6() {
        let bad = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq e4 0 1";
        assert!(Board::from_fen(bad).is_err());
    }

    #[test]
    fn rejects_side_not_to_move_in_check() {
        // Black king on e8 is in check from the white rook on e1 down the
        // open e-file, but it's white to move — only reachable if black had
        // left its own king in check, which is illegal.
        let bad = "4k3/8/8/8/8/8/8/4R2K w - - 0 1";
        assert!(Board::from_fen(bad).is_err());
    }
}
