//! A line-oriented UCI driver (spec.md §6): reads commands from stdin,
//! drives one `Board` + search per position, writes `info`/`bestmove` to
//! stdout.

use std::io::{self, BufRead};
use std::str::FromStr;
use std::time::Duration;

use vantage_core::board::{Board, Color, Piece};
use vantage_core::config::{EngineConfig, SearchLimits};
use vantage_core::moves::execute::generate_legal;
use vantage_core::moves::types::Move;
use vantage_core::search::search;
use vantage_core::square::Square;

fn main() {
    #[cfg(feature = "cli")]
    vantage_core::logger::init_logging("logs/vantage.log", "info");

    let mut board = Board::new_initial();
    let config = EngineConfig::default();

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts[0] {
            "uci" => {
                println!("id name Vantage");
                println!("id author vantage-core contributors");
                println!("uciok");
            }
            "isready" => println!("readyok"),
            "ucinewgame" => board = Board::new_initial(),
            "position" => {
                if let Some(new_board) = handle_position(&parts) {
                    board = new_board;
                }
            }
            "go" => handle_go(&parts, &mut board, &config),
            "d" | "display" => println!("{}", board.to_fen()),
            "quit" => break,
            _ => {}
        }
    }
}

fn handle_position(parts: &[&str]) -> Option<Board> {
    let mut board = if parts.len() > 1 && parts[1] == "fen" {
        let fen_start = 2;
        let mut fen_end = parts.len();
        for (i, &part) in parts.iter().enumerate().skip(fen_start) {
            if part == "moves" {
                fen_end = i;
                break;
            }
        }
        Board::from_fen(&parts[fen_start..fen_end].join(" ")).ok()?
    } else {
        Board::new_initial()
    };

    if let Some(moves_idx) = parts.iter().position(|&p| p == "moves") {
        for token in &parts[moves_idx + 1..] {
            let mv = parse_uci_move(&mut board, token)?;
            vantage_core::moves::execute::make_move_basic(&mut board, mv);
        }
    }

    Some(board)
}

fn parse_uci_move(board: &mut Board, token: &str) -> Option<Move> {
    if token.len() < 4 {
        return None;
    }
    let chars: Vec<char> = token.chars().collect();
    let from = Square::from_str(&token[0..2]).ok()?;
    let to = Square::from_str(&token[2..4]).ok()?;

    let promo = if chars.len() >= 5 {
        match chars[4].to_ascii_lowercase() {
            'q' => Some(Piece::Queen),
            'r' => Some(Piece::Rook),
            'b' => Some(Piece::Bishop),
            'n' => Some(Piece::Knight),
            _ => None,
        }
    } else {
        None
    };

    let mut moves: Vec<Move> = Vec::with_capacity(256);
    let mut scratch: Vec<Move> = Vec::with_capacity(256);
    generate_legal(board, &mut moves, &mut scratch);

    moves
        .into_iter()
        .find(|mv| mv.from() == from && mv.to() == to && mv.promotion_piece() == promo)
}

fn handle_go(parts: &[&str], board: &mut Board, config: &EngineConfig) {
    let mut limit = SearchLimits::infinite();

    let mut wtime: Option<u64> = None;
    let mut btime: Option<u64> = None;
    let mut winc: u64 = 0;
    let mut binc: u64 = 0;
    let mut movetime: Option<u64> = None;
    let mut depth: Option<i32> = None;

    let mut i = 1;
    while i < parts.len() {
        match parts[i] {
            "depth" if i + 1 < parts.len() => {
                depth = parts[i + 1].parse().ok();
                i += 2;
            }
            "movetime" if i + 1 < parts.len() => {
                movetime = parts[i + 1].parse().ok();
                i += 2;
            }
            "wtime" if i + 1 < parts.len() => {
                wtime = parts[i + 1].parse().ok();
                i += 2;
            }
            "btime" if i + 1 < parts.len() => {
                btime = parts[i + 1].parse().ok();
                i += 2;
            }
            "winc" if i + 1 < parts.len() => {
                winc = parts[i + 1].parse().unwrap_or(0);
                i += 2;
            }
            "binc" if i + 1 < parts.len() => {
                binc = parts[i + 1].parse().unwrap_or(0);
                i += 2;
            }
            "infinite" => {
                i += 1;
            }
            _ => i += 1,
        }
    }

    if let Some(d) = depth {
        limit = SearchLimits::depth(d);
    } else if let Some(ms) = movetime {
        limit = SearchLimits::move_time(Duration::from_millis(ms));
    } else {
        let (my_time, my_inc) = if board.side_to_move == Color::White {
            (wtime, winc)
        } else {
            (btime, binc)
        };
        if let Some(t) = my_time {
            let alloc = (t / 30 + my_inc / 2).max(10).min(t.saturating_sub(50).max(10));
            limit = SearchLimits::move_time(Duration::from_millis(alloc));
        }
    }

    let result = search(board, config, limit);

    println!(
        "info depth {} score cp {} nodes {} time {} pv {}",
        result.depth_reached,
        result.score_cp,
        result.nodes,
        result.time_ms,
        result.pv.iter().map(|m| m.to_uci()).collect::<Vec<_>>().join(" "),
    );

    match result.best_move {
        Some(mv) => println!("bestmove {}", mv.to_uci()),
        None => println!("bestmove 0000"),
    }
}
