//! Error kinds returned to callers. Internal invariant violations (I1-I6)
//! are programmer bugs and panic instead of being represented here.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Malformed FEN: wrong field count, bad piece placement, illegal
    /// side/castling/en-passant token, or a violated board invariant.
    InvalidFen(String),
    /// A caller-supplied move is not present in the current legal move set.
    IllegalMove(String),
    /// The search was cancelled via the stop flag before any iteration
    /// completed; the caller receives no best move.
    SearchAborted,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InvalidFen(msg) => write!(f, "invalid FEN: {msg}"),
            EngineError::IllegalMove(msg) => write!(f, "illegal move: {msg}"),
            EngineError::SearchAborted => write!(f, "search aborted before first iteration completed"),
        }
    }
}

impl std::error::Error for EngineError {}
