//! Chronologically ordered push keys.
//!
//! A key is 8 characters of millisecond timestamp followed by 12 random
//! characters, all drawn from an alphabet whose byte order matches its
//! character order. Keys therefore sort by creation time. Keys generated in
//! the same millisecond increment the random tail so they still sort in
//! creation order.

use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use rand::Rng;

const ALPHABET: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

const TIME_CHARS: usize = 8;
const RANDOM_CHARS: usize = 12;

#[derive(Debug, Default)]
struct State {
    last_time: i64,
    last_random: [u8; RANDOM_CHARS],
}

/// Generates push keys. Share one generator per store.
#[derive(Debug, Default)]
pub struct PushIdGenerator {
    state: Mutex<State>,
}

impl PushIdGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a key for the current time.
    pub fn generate(&self) -> String {
        self.generate_at(Utc::now().timestamp_millis())
    }

    /// Generate a key for the given millisecond timestamp.
    pub fn generate_at(&self, now_ms: i64) -> String {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if now_ms == state.last_time {
            increment(&mut state.last_random);
        } else {
            let mut rng = rand::rng();
            for digit in &mut state.last_random {
                *digit = rng.random_range(0..64);
            }
            state.last_time = now_ms;
        }

        let mut time = now_ms.max(0).unsigned_abs();
        let mut time_chars = ['-'; TIME_CHARS];
        for slot in time_chars.iter_mut().rev() {
            *slot = symbol(time % 64);
            time /= 64;
        }
        time_chars
            .into_iter()
            .chain(state.last_random.iter().map(|&digit| symbol(u64::from(digit))))
            .collect()
    }
}

fn symbol(digit: u64) -> char {
    usize::try_from(digit)
        .ok()
        .and_then(|index| ALPHABET.get(index))
        .map_or('-', |&b| char::from(b))
}

/// Add one to a base-64 number stored most significant digit first.
fn increment(digits: &mut [u8; RANDOM_CHARS]) {
    for digit in digits.iter_mut().rev() {
        if *digit == 63 {
            *digit = 0;
        } else {
            *digit += 1;
            return;
        }
    }
}
