//! Move-count regression testing (spec.md §8): count leaf nodes reachable
//! from a position at a fixed depth and compare against known-correct
//! totals for standard test positions.

use crate::board::Board;
use crate::moves::{
    execute::{generate_legal, make_move_basic, undo_move_basic},
    square_control::in_check,
    types::Move,
};
use tracing::{debug, instrument};

const MAX_LOG_DEPTH: u32 = 3;
const MAX_PERFT_DEPTH: usize = 20;

#[derive(Debug, Clone, Copy, Default)]
pub struct PerftCounters {
    pub nodes: u64,
    pub captures: u64,
    pub ep_captures: u64,
    pub castles: u64,
    pub promotions: u64,
    pub checks: u64,
    pub checkmates: u64,
}

impl PerftCounters {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn add(&mut self, o: &PerftCounters) {
        self.nodes += o.nodes;
        self.captures += o.captures;
        self.ep_captures += o.ep_captures;
        self.castles += o.castles;
        self.promotions += o.promotions;
        self.checks += o.checks;
        self.checkmates += o.checkmates;
    }
}

fn create_move_buffer_array() -> [Vec<Move>; MAX_PERFT_DEPTH] {
    std::array::from_fn(|_| Vec::with_capacity(64))
}

fn create_pseudo_buffer_array() -> [Vec<Move>; MAX_PERFT_DEPTH] {
    std::array::from_fn(|_| Vec::with_capacity(256))
}

fn perft_recursive(
    board: &mut Board,
    depth: u32,
    ply: usize,
    move_buffers: &mut [Vec<Move>],
    pseudo_buffers: &mut [Vec<Move>],
) -> u64 {
    if depth == 0 {
        return 1;
    }

    {
        let moves = &mut move_buffers[ply];
        let pseudo = &mut pseudo_buffers[ply];
        moves.clear();
        generate_legal(board, moves, pseudo);
    }

    let move_count = move_buffers[ply].len();
    let mut node_count = 0;

    for i in 0..move_count {
        let mv = move_buffers[ply][i];
        let undo = make_move_basic(board, mv);
        node_count += perft_recursive(board, depth - 1, ply + 1, move_buffers, pseudo_buffers);
        undo_move_basic(board, undo);
    }

    node_count
}

#[instrument(skip(board), fields(depth))]
pub fn perft(board: &mut Board, depth: u32) -> u64 {
    assert!(depth as usize <= MAX_PERFT_DEPTH, "depth {depth} exceeds MAX_PERFT_DEPTH");
    let mut move_buffers = create_move_buffer_array();
    let mut pseudo_buffers = create_pseudo_buffer_array();
    perft_recursive(board, depth, 0, &mut move_buffers, &mut pseudo_buffers)
}

#[instrument(skip(board), fields(depth))]
pub fn perft_divide(board: &mut Board, depth: u32) -> u64 {
    assert!(depth as usize <= MAX_PERFT_DEPTH, "depth {depth} exceeds MAX_PERFT_DEPTH");
    let mut move_buffers = create_move_buffer_array();
    let mut pseudo_buffers = create_pseudo_buffer_array();

    {
        let moves = &mut move_buffers[0];
        let pseudo = &mut pseudo_buffers[0];
        moves.clear();
        generate_legal(board, moves, pseudo);
        if depth <= MAX_LOG_DEPTH {
            debug!(depth, moves = moves.len(), "divide: root legal moves");
        }
    }

    let mut total = 0;
    let move_count = move_buffers[0].len();

    for i in 0..move_count {
        let mv = move_buffers[0][i];
        let undo = make_move_basic(board, mv);
        let count = if depth == 1 {
            1
        } else {
            perft_recursive(board, depth - 1, 1, &mut move_buffers, &mut pseudo_buffers)
        };
        undo_move_basic(board, undo);

        if depth <= MAX_LOG_DEPTH {
            debug!(%mv, nodes = count, "divide: root child total");
        }
        println!("{mv}: {count}");
        total += count;
    }

    debug!(depth, total, "divide: total");
    println!("Total: {total}");
    total
}

fn perft_count_recursive(
    board: &mut Board,
    depth: u32,
    ply: usize,
    out: &mut PerftCounters,
    move_buffers: &mut [Vec<Move>],
    pseudo_buffers: &mut [Vec<Move>],
) {
    if depth == 0 {
        out.nodes += 1;
        let side_in_check = in_check(board, board.side_to_move);
        if side_in_check {
            out.checks += 1;
        }
        {
            let tmp = &mut move_buffers[ply];
            let scratch = &mut pseudo_buffers[ply];
            tmp.clear();
            generate_legal(board, tmp, scratch);
        }
        if move_buffers[ply].is_empty() && side_in_check {
            out.checkmates += 1;
        }
        return;
    }

    {
        let moves = &mut move_buffers[ply];
        let pseudo = &mut pseudo_buffers[ply];
        moves.clear();
        generate_legal(board, moves, pseudo);
    }

    let move_count = move_buffers[ply].len();
    for i in 0..move_count {
        let mv = move_buffers[ply][i];

        if mv.is_capture() {
            out.captures += 1;
            if mv.is_en_passant() {
                out.ep_captures += 1;
            }
        }
        if mv.is_castling() {
            out.castles += 1;
        }
        if mv.is_promotion() {
            out.promotions += 1;
        }

        #[cfg(debug_assertions)]
        let z0 = board.zobrist;

        let undo = make_move_basic(board, mv);
        perft_count_recursive(board, depth - 1, ply + 1, out, move_buffers, pseudo_buffers);
        undo_move_basic(board, undo);

        #[cfg(debug_assertions)]
        {
            debug_assert_eq!(board.zobrist, z0, "zobrist changed across make/undo");
        }
    }
}

pub fn perft_count_with_breakdown(board: &mut Board, depth: u32, out: &mut PerftCounters) {
    assert!(depth as usize <= MAX_PERFT_DEPTH, "depth {depth} exceeds MAX_PERFT_DEPTH");
    let mut move_buffers = create_move_buffer_array();
    let mut pseudo_buffers = create_pseudo_buffer_array();
    perft_count_recursive(board, depth, 0, out, &mut move_buffers, &mut pseudo_buffers);
}

pub fn perft_divide_with_breakdown(board: &mut Board, depth: u32) -> Vec<(Move, PerftCounters)> {
    assert!(depth as usize <= MAX_PERFT_DEPTH, "depth {depth} exceeds MAX_PERFT_DEPTH");
    let mut move_buffers = create_move_buffer_array();
    let mut pseudo_buffers = create_pseudo_buffer_array();

    {
        let moves = &mut move_buffers[0];
        let pseudo = &mut pseudo_buffers[0];
        moves.clear();
        generate_legal(board, moves, pseudo);
    }

    let move_count = move_buffers[0].len();
    let mut out = Vec::with_capacity(move_count);

    for i in 0..move_count {
        let mv = move_buffers[0][i];
        let undo = make_move_basic(board, mv);
        let mut pc = PerftCounters::zero();

        if depth > 1 {
            perft_count_recursive(board, depth - 1, 1, &mut pc, &mut move_buffers, &mut pseudo_buffers);
        } else {
            pc.nodes = 1;
        }

        undo_move_basic(board, undo);
        out.push((mv, pc));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_startpos_depth(depth: u32) -> u64 {
        let mut b = Board::new_initial();
        perft(&mut b, depth)
    }

    #[test]
    fn startpos_depth_1() {
        assert_eq!(run_startpos_depth(1), 20);
    }

    #[test]
    fn startpos_depth_2() {
        assert_eq!(run_startpos_depth(2), 400);
    }

    #[test]
    fn startpos_depth_3() {
        assert_eq!(run_startpos_depth(3), 8_902);
    }

    #[test]
    fn startpos_depth_4() {
        assert_eq!(run_startpos_depth(4), 197_281);
    }

    #[test]
    #[ignore = "several seconds in debug builds; run with --ignored for full regression"]
    fn startpos_depth_5() {
        assert_eq!(run_startpos_depth(5), 4_865_609);
    }

    #[test]
    fn kiwipete_depth_1() {
        let mut b = Board::from_fen(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        )
        .unwrap();
        assert_eq!(perft(&mut b, 1), 48);
    }

    #[test]
    fn kiwipete_depth_2() {
        let mut b = Board::from_fen(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        )
        .unwrap();
        assert_eq!(perft(&mut b, 2), 2_039);
    }

    #[test]
    #[ignore = "expensive; run with --ignored for full regression"]
    fn kiwipete_depth_3() {
        let mut b = Board::from_fen(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        )
        .unwrap();
        assert_eq!(perft(&mut b, 3), 97_862);
    }

    #[test]
    fn position6_depth_1() {
        let mut b = Board::from_fen(
            "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
        )
        .unwrap();
        assert_eq!(perft(&mut b, 1), 46);
    }
}
