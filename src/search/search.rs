//! Negamax alpha-beta search (spec.md §4.6): iterative deepening with
//! aspiration windows, null-move/futility/reverse-futility pruning, late
//! move reductions, and a quiescence search resolving captures at the
//! horizon.

use crate::board::Board;
use crate::config::EngineConfig;
use crate::moves::execute::{generate_captures, generate_legal, make_move_basic, make_null_move, undo_move_basic, undo_null_move};
use crate::moves::square_control::in_check;
use crate::moves::types::{Move, MoveBuffer};
use crate::search::context::SearchContext;
use crate::search::eval::static_eval;
use crate::search::tt::{NodeType, TranspositionTable};
use arrayvec::ArrayVec;
use std::time::{Duration, Instant};
use tracing::info;

pub const MAX_PLY: usize = 128;

const INF: i32 = 32_000;
const MATE_SCORE: i32 = 31_000;
pub const MATE_THRESHOLD: i32 = 30_000;
const DRAW_SCORE: i32 = 0;
const ASPIRATION_WINDOW: i32 = 50;

const RFP_DEPTH_LIMIT: i32 = 3;
const RFP_MARGINS: [i32; 4] = [0, 200, 300, 500];

const FP_DEPTH_LIMIT: i32 = 2;
const FP_MARGINS: [i32; 3] = [0, 200, 400];

const LMR_MIN_MOVE_INDEX: usize = 4;
const LMR_MIN_DEPTH: i32 = 3;

/// Reported by `search()` (spec.md §4.6's public contract).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SearchResult {
    pub best_move: Option<Move>,
    pub score_cp: i32,
    pub depth_reached: i32,
    pub nodes: u64,
    pub time_ms: u128,
    pub pv: Vec<Move>,
}

pub struct TimeManager {
    start_time: Instant,
    allotted: Option<Duration>,
    stop_signal: bool,
}

impl TimeManager {
    pub fn new(limit: Option<Duration>) -> Self {
        Self {
            start_time: Instant::now(),
            allotted: limit,
            stop_signal: false,
        }
    }

    #[inline(always)]
    pub fn check_time(&mut self) {
        if self.stop_signal {
            return;
        }
        if let Some(limit) = self.allotted
            && self.start_time.elapsed() >= limit
        {
            self.stop_signal = true;
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

fn score_to_tt(score: i32, ply: i32) -> i32 {
    if score >= MATE_THRESHOLD {
        score + ply
    } else if score <= -MATE_THRESHOLD {
        score - ply
    } else {
        score
    }
}

fn score_from_tt(score: i32, ply: i32) -> i32 {
    if score >= MATE_THRESHOLD {
        score - ply
    } else if score <= -MATE_THRESHOLD {
        score + ply
    } else {
        score
    }
}

/// Resolves captures to a quiet position (spec.md §4.6's terminal case),
/// with delta pruning against hopeless captures.
#[allow(clippy::too_many_arguments)]
pub fn quiescence(
    board: &mut Board,
    ply: usize,
    mut alpha: i32,
    beta: i32,
    nodes: &mut u64,
    time: &mut TimeManager,
) -> i32 {
    if ply >= MAX_PLY {
        return static_eval(board);
    }

    let stand_pat = static_eval(board);
    if stand_pat >= beta {
        return beta;
    }
    if stand_pat > alpha {
        alpha = stand_pat;
    }

    let mut captures: ArrayVec<Move, 64> = ArrayVec::new();
    let mut scratch: ArrayVec<Move, 64> = ArrayVec::new();
    generate_captures(board, &mut captures, &mut scratch);

    captures.sort_by_cached_key(|mv| {
        let captured = board.piece_type_at(mv.to()).map(|p| p.material_value()).unwrap_or(100);
        let attacker = board.piece_type_at(mv.from()).map(|p| p.material_value()).unwrap_or(0);
        -(captured * 10 - attacker)
    });

    const DELTA_MARGIN: i32 = 200;

    for mv in captures {
        *nodes += 1;
        if *nodes & 1023 == 0 {
            time.check_time();
        }
        if time.stop_signal {
            return alpha;
        }

        if !mv.is_promotion() {
            let captured_value = board.piece_type_at(mv.to()).map(|p| p.material_value()).unwrap_or(0);
            if stand_pat + captured_value + DELTA_MARGIN < alpha {
                continue;
            }
        }

        let undo = make_move_basic(board, mv);
        let score = -quiescence(board, ply + 1, -beta, -alpha, nodes, time);
        undo_move_basic(board, undo);

        if score >= beta {
            return beta;
        }
        if score > alpha {
            alpha = score;
        }
    }

    alpha
}

/// Negamax with alpha-beta pruning (spec.md §4.6).
#[allow(clippy::too_many_arguments)]
pub fn alpha_beta(
    board: &mut Board,
    ctx: &mut SearchContext,
    tt: &mut TranspositionTable,
    depth: i32,
    ply: usize,
    mut alpha: i32,
    beta: i32,
    nodes: &mut u64,
    time: &mut TimeManager,
) -> (i32, Option<Move>) {
    if *nodes & 1023 == 0 {
        time.check_time();
    }
    if time.stop_signal {
        return (0, None);
    }
    *nodes += 1;

    if ply > 0 && (board.is_repetition() || board.halfmove_clock >= 100) {
        return (DRAW_SCORE, None);
    }

    let is_pv = beta - alpha > 1;
    let hash = board.zobrist;
    let mut hash_move = None;

    if let Some((tt_move, raw_score, tt_depth, tt_bound)) = tt.probe(hash) {
        hash_move = tt_move;
        if tt_depth as i32 >= depth {
            let tt_score = score_from_tt(raw_score, ply as i32);
            if ply > 0 {
                let usable = match tt_bound {
                    b if b == NodeType::Exact as u8 => true,
                    b if b == NodeType::LowerBound as u8 => tt_score >= beta,
                    b if b == NodeType::UpperBound as u8 => tt_score <= alpha,
                    _ => false,
                };
                if usable {
                    return (tt_score, tt_move);
                }
            }
        }
    }

    let in_check_now = in_check(board, board.side_to_move);
    let extension = if in_check_now { 1 } else { 0 };

    if depth <= 0 && !in_check_now {
        return (quiescence(board, ply, alpha, beta, nodes, time), None);
    }

    let static_eval_val = if in_check_now { 0 } else { static_eval(board) };

    if !in_check_now && !is_pv && depth >= 1 && depth <= RFP_DEPTH_LIMIT {
        let margin = RFP_MARGINS[depth as usize];
        if static_eval_val - margin >= beta && static_eval_val.abs() < MATE_THRESHOLD {
            return (static_eval_val, None);
        }
    }

    if !in_check_now
        && !is_pv
        && depth >= 3
        && ply > 0
        && board.has_major_pieces(board.side_to_move)
        && static_eval_val >= beta
    {
        const R: i32 = 2;
        let undo = make_null_move(board);
        let (val, _) = alpha_beta(board, ctx, tt, depth - R - 1, ply + 1, -beta, -beta + 1, nodes, time);
        undo_null_move(board, undo);
        let score = -val;
        if score >= beta && score.abs() < MATE_THRESHOLD {
            return (beta, None);
        }
    }

    let mut moves: ArrayVec<Move, 256> = ArrayVec::new();
    let mut scratch: ArrayVec<Move, 256> = ArrayVec::new();
    generate_legal(board, &mut moves, &mut scratch);

    if moves.is_empty() {
        if in_check_now {
            return (-MATE_SCORE + ply as i32, None);
        }
        return (0, None);
    }

    crate::search::ordering::order_moves(&mut moves, board, &ctx.killer_moves[ply], &ctx.history, hash_move);

    let mut best_move = None;
    let mut best_score = -INF;
    let original_alpha = alpha;

    for (move_index, &mv) in moves.iter().enumerate() {
        let is_quiet = !mv.is_capture() && !mv.is_promotion();
        let gives_check_extension = extension;

        if is_quiet
            && !in_check_now
            && depth >= 1
            && depth <= FP_DEPTH_LIMIT
            && move_index > 0
        {
            let margin = FP_MARGINS[depth as usize];
            if static_eval_val + margin <= alpha {
                continue;
            }
        }

        let undo = make_move_basic(board, mv);
        let score;

        if move_index == 0 {
            let (val, _) = alpha_beta(board, ctx, tt, depth - 1 + gives_check_extension, ply + 1, -beta, -alpha, nodes, time);
            score = -val;
        } else {
            let mut reduction = 0;
            if move_index >= LMR_MIN_MOVE_INDEX && depth >= LMR_MIN_DEPTH && is_quiet && !in_check_now {
                reduction = 1;
                if move_index > 10 && depth > 6 {
                    reduction += 1;
                }
                reduction = reduction.min(depth - 2).max(0);
            }

            let (val, _) = alpha_beta(board, ctx, tt, depth - 1 - reduction, ply + 1, -alpha - 1, -alpha, nodes, time);
            let mut s = -val;

            if s > alpha && reduction > 0 {
                let (val, _) = alpha_beta(board, ctx, tt, depth - 1, ply + 1, -alpha - 1, -alpha, nodes, time);
                s = -val;
            }

            if s > alpha && s < beta {
                let (val, _) = alpha_beta(board, ctx, tt, depth - 1 + gives_check_extension, ply + 1, -beta, -alpha, nodes, time);
                s = -val;
            }

            score = s;
        }

        undo_move_basic(board, undo);

        if time.stop_signal {
            return (0, None);
        }

        if score > best_score {
            best_score = score;
            if score > alpha {
                alpha = score;
                best_move = Some(mv);
            }
            if score >= beta {
                let tt_score = score_to_tt(beta, ply as i32);
                tt.save(hash, Some(mv), tt_score, depth as u8, NodeType::LowerBound as u8);

                if is_quiet {
                    ctx.update_killer(ply, mv);
                    ctx.update_history(mv, depth);
                }

                return (beta, Some(mv));
            }
        }
    }

    let node_type = if best_score >= beta {
        NodeType::LowerBound
    } else if best_score > original_alpha {
        NodeType::Exact
    } else {
        NodeType::UpperBound
    };

    let tt_score = score_to_tt(best_score, ply as i32);
    tt.save(hash, best_move, tt_score, depth as u8, node_type as u8);

    (best_score, best_move)
}

fn extract_pv(board: &mut Board, tt: &TranspositionTable, max_len: usize) -> Vec<Move> {
    let mut pv = Vec::new();
    let mut undone = Vec::new();
    let mut seen_keys = Vec::new();

    while pv.len() < max_len {
        let Some((Some(mv), _, _, bound)) = tt.probe(board.zobrist) else {
            break;
        };
        if bound != NodeType::Exact as u8 && bound != NodeType::LowerBound as u8 {
            break;
        }
        if !crate::moves::execute::is_legal_move(board, mv) {
            break;
        }
        if seen_keys.contains(&board.zobrist) {
            break;
        }
        seen_keys.push(board.zobrist);

        let undo = make_move_basic(board, mv);
        undone.push(undo);
        pv.push(mv);
    }

    for undo in undone.into_iter().rev() {
        undo_move_basic(board, undo);
    }

    pv
}

/// Iterative deepening driver (spec.md §4.6's top-level loop).
pub fn search(board: &mut Board, config: &EngineConfig, limit: crate::config::SearchLimits) -> SearchResult {
    let mut tt = TranspositionTable::new(config.tt_size_mb);
    let mut ctx = SearchContext::new();
    let mut time = TimeManager::new(limit.move_time);
    let mut nodes = 0u64;

    let max_depth = limit.effective_max_depth().min(MAX_PLY as i32);
    let mut best_move = None;
    let mut best_score = 0;
    let mut depth_reached = 0;

    for depth in 1..=max_depth {
        ctx.age_history();

        let (mut alpha, mut beta) = if depth > 3 && config.aspiration_enabled {
            (best_score - ASPIRATION_WINDOW, best_score + ASPIRATION_WINDOW)
        } else {
            (-INF, INF)
        };

        let (score, mv) = loop {
            let result = alpha_beta(board, &mut ctx, &mut tt, depth, 0, alpha, beta, &mut nodes, &mut time);
            if time.stop_signal {
                break result;
            }
            if result.0 <= alpha {
                alpha = -INF;
                continue;
            }
            if result.0 >= beta {
                beta = INF;
                continue;
            }
            break result;
        };

        if time.stop_signal {
            break;
        }

        best_score = score;
        best_move = mv.or(best_move);
        depth_reached = depth;

        let pv = extract_pv(board, &tt, depth as usize);
        info!(
            depth,
            score = best_score,
            nodes,
            time_ms = time.elapsed().as_millis() as u64,
            pv = ?pv.iter().map(|m| m.to_uci()).collect::<Vec<_>>(),
            "iteration complete"
        );

        if best_score.abs() >= MATE_THRESHOLD {
            break;
        }
    }

    let pv = best_move.map(|_| extract_pv(board, &tt, MAX_PLY)).unwrap_or_default();

    SearchResult {
        best_move,
        score_cp: best_score,
        depth_reached,
        nodes,
        time_ms: time.elapsed().as_millis(),
        pv,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::config::{EngineConfig, SearchLimits};

    #[test]
    fn finds_mate_in_one() {
        let mut board = Board::from_fen("6k1/5ppp/8/8/8/8/8/R6K w - - 0 1").unwrap();
        let result = search(&mut board, &EngineConfig::default(), SearchLimits::depth(4));
        assert!(result.score_cp >= MATE_THRESHOLD);
        assert!(result.best_move.is_some());
    }

    #[test]
    fn startpos_returns_some_move_at_shallow_depth() {
        let mut board = Board::new_initial();
        let result = search(&mut board, &EngineConfig::default(), SearchLimits::depth(3));
        assert!(result.best_move.is_some());
        assert_eq!(result.depth_reached, 3);
    }

    #[test]
    fn stalemate_scores_as_draw() {
        let mut board = Board::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        let result = search(&mut board, &EngineConfig::default(), SearchLimits::depth(2));
        assert!(result.best_move.is_none());
        assert_eq!(result.score_cp, 0);
    }
}
