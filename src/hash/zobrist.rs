//! Zobrist keys: a fixed, deterministic table of 793 random 64-bit words
//! (spec.md §4.2) — 12 pieces x 64 squares (768) + 16 castling-rights
//! combinations + 8 en-passant files + 1 side-to-move toggle.

use crate::board::{Color, Piece};
use once_cell::sync::OnceCell;
use rand::{RngCore, SeedableRng, rngs::StdRng};

/// Fixed seed so keys (and therefore every hash derived from them) are
/// reproducible across runs and builds, as spec.md §4.2 requires when the
/// `deterministic_zobrist` feature is on (the default).
#[cfg(feature = "deterministic_zobrist")]
const ZOBRIST_SEED: u64 = 0x9E37_79B9_AAAC_5C87;

fn make_zobrist_rng() -> StdRng {
    #[cfg(feature = "deterministic_zobrist")]
    {
        StdRng::seed_from_u64(ZOBRIST_SEED)
    }
    #[cfg(not(feature = "deterministic_zobrist"))]
    {
        // Version-agnostic: fill a 32-byte seed from the OS RNG.
        let mut seed = [0u8; 32];
        rand::rng().fill_bytes(&mut seed);
        StdRng::from_seed(seed)
    }
}

pub struct ZobristKeys {
    /// `[color][piece][square]`, White=0/Black=1, {P,N,B,R,Q,K}=0..5.
    pub piece: [[[u64; 64]; 6]; 2],
    pub side_to_move: u64,
    /// Indexed by the raw 4-bit castling-rights value (0..16).
    pub castling: [u64; 16],
    /// a..h => 0..7.
    pub ep_file: [u64; 8],
}

fn non_zero(r: &mut StdRng) -> u64 {
    let mut v = r.next_u64();
    while v == 0 {
        v = r.next_u64();
    }
    v
}

fn generate_zobrist_keys(mut rng: StdRng) -> ZobristKeys {
    let mut keys = ZobristKeys {
        piece: [[[0u64; 64]; 6]; 2],
        side_to_move: 0,
        castling: [0u64; 16],
        ep_file: [0u64; 8],
    };

    for c in 0..2 {
        for p in 0..6 {
            for sq in 0..64 {
                keys.piece[c][p][sq] = non_zero(&mut rng);
            }
        }
    }
    for i in 0..16 {
        keys.castling[i] = non_zero(&mut rng);
    }
    for f in 0..8 {
        keys.ep_file[f] = non_zero(&mut rng);
    }
    keys.side_to_move = non_zero(&mut rng);
    keys
}

/// Process-wide immutable key table, initialized on first use.
pub fn zobrist_keys() -> &'static ZobristKeys {
    static KEYS: OnceCell<ZobristKeys> = OnceCell::new();
    KEYS.get_or_init(|| generate_zobrist_keys(make_zobrist_rng()))
}

#[inline]
pub fn piece_key(color: Color, piece: Piece, sq: usize) -> u64 {
    zobrist_keys().piece[color as usize][piece as usize][sq]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_stable_across_calls() {
        let a = zobrist_keys() as *const ZobristKeys;
        let b = zobrist_keys() as *const ZobristKeys;
        assert_eq!(a, b);
    }

    #[test]
    fn no_key_is_zero() {
        let keys = zobrist_keys();
        for c in 0..2 {
            for p in 0..6 {
                for sq in 0..64 {
                    assert_ne!(keys.piece[c][p][sq], 0);
                }
            }
        }
        assert_ne!(keys.side_to_move, 0);
        for k in keys.castling.iter() {
            assert_ne!(*k, 0);
        }
        for k in keys.ep_file.iter() {
            assert_ne!(*k, 0);
        }
    }

    #[test]
    fn key_count_matches_spec() {
        // 12 * 64 + 16 + 8 + 1 = 793
        let keys = zobrist_keys();
        let total = keys.piece.len() * keys.piece[0].len() * keys.piece[0][0].len()
            + keys.castling.len()
            + keys.ep_file.len()
            + 1;
        assert_eq!(total, 793);
    }
}
