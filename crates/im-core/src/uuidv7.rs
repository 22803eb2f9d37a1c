//! Time-ordered UUIDv7 generation.
//!
//! Layout (big-endian, RFC 9562):
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        unix_ts_ms (32)                        |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |       unix_ts_ms (16)         |  ver  |     rand_a (12)       |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |var|                      rand_b (62)                          |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! The generator keeps `rand_a` as a per-millisecond counter so that a run of
//! rows sharing one creation millisecond still receives strictly increasing
//! identifiers. `rand_b` is always fresh randomness.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use uuid::{Builder, Uuid};

/// Largest timestamp representable in the 48-bit field.
pub const MAX_TIMESTAMP_MS: u64 = (1 << 48) - 1;

const RAND_A_MAX: u16 = 0x0FFF;

/// Counter seeds leave the top bit clear so a millisecond has at least
/// 2048 increments before it overflows.
const RAND_A_SEED_MASK: u16 = 0x07FF;

/// Stateful UUIDv7 generator.
///
/// Identifiers generated from non-decreasing timestamps are strictly
/// increasing. A timestamp earlier than the previous one restarts the counter
/// at that timestamp instead of borrowing the previous millisecond.
pub struct UuidV7Generator<R = StdRng> {
    rng: R,
    /// Last input millisecond seen
    last_input_ms: Option<u64>,
    /// Last emitted (millisecond, rand_a)
    last_emitted: Option<(u64, u16)>,
}

impl UuidV7Generator<StdRng> {
    /// Create a generator seeded from the operating system's entropy source.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
}

impl Default for UuidV7Generator<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RngCore> UuidV7Generator<R> {
    /// Create a generator over an explicit random source.
    pub fn with_rng(rng: R) -> Self {
        Self {
            rng,
            last_input_ms: None,
            last_emitted: None,
        }
    }

    /// Generate an identifier for a row, using its creation time when known
    /// and the current wall-clock time otherwise.
    pub fn generate_for(&mut self, created_at: Option<DateTime<Utc>>) -> Uuid {
        let at = created_at.unwrap_or_else(Utc::now);
        self.generate_at(at)
    }

    /// Generate an identifier whose timestamp component encodes `at`.
    pub fn generate_at(&mut self, at: DateTime<Utc>) -> Uuid {
        self.generate_at_millis(clamp_millis(at.timestamp_millis()))
    }

    /// Generate an identifier for a raw millisecond timestamp.
    pub fn generate_at_millis(&mut self, ms: u64) -> Uuid {
        let ms = ms.min(MAX_TIMESTAMP_MS);
        let mut rand_b = [0u8; 8];
        self.rng.fill_bytes(&mut rand_b);

        let non_decreasing = self.last_input_ms.map_or(true, |last| ms >= last);
        let (emit_ms, rand_a) = match self.last_emitted {
            Some((last_ms, last_a)) if non_decreasing && ms <= last_ms => {
                if last_a < RAND_A_MAX {
                    (last_ms, last_a + 1)
                } else {
                    ((last_ms + 1).min(MAX_TIMESTAMP_MS), self.seed_rand_a())
                }
            }
            _ => (ms, self.seed_rand_a()),
        };

        self.last_input_ms = Some(ms);
        self.last_emitted = Some((emit_ms, rand_a));
        from_parts(emit_ms, rand_a, rand_b)
    }

    fn seed_rand_a(&mut self) -> u16 {
        (self.rng.next_u32() as u16) & RAND_A_SEED_MASK
    }
}

/// Convert signed epoch milliseconds into the 48-bit field range.
///
/// Pre-epoch timestamps clamp to zero.
pub fn clamp_millis(ms: i64) -> u64 {
    if ms <= 0 {
        0
    } else {
        (ms as u64).min(MAX_TIMESTAMP_MS)
    }
}

/// Assemble a UUIDv7 from its timestamp, 12-bit `rand_a` and 62-bit `rand_b`.
///
/// Version and variant bits are forced; the top two bits of `rand_b` are
/// overwritten by the variant.
pub fn from_parts(ms: u64, rand_a: u16, rand_b: [u8; 8]) -> Uuid {
    let mut random = [0u8; 10];
    random[0..2].copy_from_slice(&(rand_a & RAND_A_MAX).to_be_bytes());
    random[2..10].copy_from_slice(&rand_b);
    Builder::from_unix_timestamp_millis(ms & MAX_TIMESTAMP_MS, &random).into_uuid()
}

/// Extract the embedded millisecond timestamp; zero for non-time-based ids.
pub fn timestamp_millis(id: &Uuid) -> u64 {
    id.get_timestamp()
        .map(|ts| {
            let (secs, nanos) = ts.to_unix();
            secs * 1_000 + u64::from(nanos) / 1_000_000
        })
        .unwrap_or(0)
}

/// Whether the identifier carries the version-7 nibble and RFC variant.
pub fn is_v7(id: &Uuid) -> bool {
    id.get_version_num() == 7 && matches!(id.get_variant(), uuid::Variant::RFC4122)
}

#[cfg(test)]
#[path = "uuidv7_test.rs"]
mod tests;
