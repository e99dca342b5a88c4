//! Seeded shuffling for the daily challenge.
//!
//! Every player must see the same daily set, so the generator is mulberry32 with its exact
//! 32-bit wrapping arithmetic, and the shuffle consumes exactly one draw per swap.

use chrono::{Datelike, NaiveDate};
use rand::{Error, RngCore, SeedableRng};

/// Default size of the daily question set.
pub const DAILY_COUNT: usize = 10;

const MULBERRY_INCREMENT: u32 = 0x6D2B_79F5;
const TWO_POW_32: f64 = 4_294_967_296.0;

/// The mulberry32 generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mulberry32 {
    state: u32,
}

impl Mulberry32 {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Next value in `[0, 1)`, the raw output divided by 2^32.
    pub fn next_f64(&mut self) -> f64 {
        self.next_u32() as f64 / TWO_POW_32
    }
}

impl RngCore for Mulberry32 {
    fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(MULBERRY_INCREMENT);
        let s = self.state;
        let mut t = (s ^ (s >> 15)).wrapping_mul(1 | s);
        t = t.wrapping_add((t ^ (t >> 7)).wrapping_mul(61 | t)) ^ t;
        t ^ (t >> 14)
    }

    fn next_u64(&mut self) -> u64 {
        let hi = self.next_u32() as u64;
        let lo = self.next_u32() as u64;
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_u32().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for Mulberry32 {
    type Seed = [u8; 4];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u32::from_le_bytes(seed))
    }
}

/// Fisher-Yates from the back, drawing `j = floor(r * (i + 1))`. The input is left untouched.
pub fn shuffle<T: Clone>(items: &[T], seed: u32) -> Vec<T> {
    let mut shuffled = items.to_vec();
    let mut rng = Mulberry32::new(seed);

    for i in (1..shuffled.len()).rev() {
        let j = (rng.next_f64() * (i + 1) as f64).floor() as usize;
        shuffled.swap(i, j);
    }

    shuffled
}

/// `yyyymmdd` as a number, e.g. 2024-01-15 -> 20240115.
pub fn daily_seed(date: NaiveDate) -> u32 {
    date.year() as u32 * 10_000 + date.month() * 100 + date.day()
}

/// The first `count` items of the pool shuffled with the seed for `date`.
pub fn select_daily<T: Clone>(pool: &[T], date: NaiveDate, count: usize) -> Vec<T> {
    let mut selected = shuffle(pool, daily_seed(date));
    selected.truncate(count);
    selected
}
