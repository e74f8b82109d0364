//! Zobrist keys for position hashing.
//!
//! The table is built once from a fixed seed, so hashes are stable across runs.

use crate::constants::{MAX_CELLS, Piece, Side};
use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

const ZOBRIST_SEED: u64 = 0x0d1a_9047_5eed_c0de;

pub struct ZobristKeys {
    pub pieces: [[u64; MAX_CELLS]; 4],
    pub dark_to_move: u64,
}

impl ZobristKeys {
    fn new() -> Self {
        let mut rng = StdRng::seed_from_u64(ZOBRIST_SEED);
        let mut pieces = [[0u64; MAX_CELLS]; 4];
        for table in pieces.iter_mut() {
            for key in table.iter_mut() {
                *key = rng.next_u64();
            }
        }
        Self {
            pieces,
            dark_to_move: rng.next_u64(),
        }
    }
}

pub static ZOBRIST_KEYS: Lazy<ZobristKeys> = Lazy::new(ZobristKeys::new);

#[inline]
pub fn piece_key(piece: Piece, cell_idx: usize) -> u64 {
    ZOBRIST_KEYS.pieces[piece.zobrist_idx()][cell_idx]
}

#[inline]
pub fn side_key(side: Side) -> u64 {
    match side {
        Side::Dark => ZOBRIST_KEYS.dark_to_move,
        Side::Light => 0,
    }
}
