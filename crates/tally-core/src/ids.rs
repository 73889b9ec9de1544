//! Sortable ledger identifiers.
//!
//! Every entity in the ledger is keyed by a fixed-width 20-character
//! identifier: a 2-character prefix, 8 base-62 digits of millisecond
//! wall-clock time (most significant first), 4 base-62 digits of a
//! process-wide counter, and 6 base-62 characters of entropy. Because the
//! time and counter fields precede the random suffix, identifiers minted in
//! sequence by one process compare in mint order under plain byte-wise
//! string ordering, which is what makes them usable as pagination cursors.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Total length of an identifier, prefix included.
pub const ID_LENGTH: usize = 20;

const PREFIX: &[u8; 2] = b"c-";
const ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const TIME_DIGITS: usize = 8;
const COUNTER_DIGITS: usize = 4;
const RANDOM_DIGITS: usize = 6;
const RNG_POOL_CAPACITY: usize = 16;

/// A fixed-width, sortable, opaque entity key.
///
/// Identifiers are immutable once created and never reused. `Ord` is byte
/// order, which coincides with string order for the ASCII alphabet used.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier([u8; ID_LENGTH]);

impl Identifier {
    /// The all-zero placeholder identifier. Never valid.
    #[must_use]
    pub const fn nil() -> Self {
        Self([0; ID_LENGTH])
    }

    /// Parse an identifier from its string form.
    ///
    /// # Errors
    ///
    /// [`IdError::BadLength`] when the input is not exactly 20 bytes,
    /// [`IdError::BadFormat`] when it is not `c-` followed by 18
    /// alphanumeric characters.
    pub fn from_string(s: &str) -> Result<Self, IdError> {
        Self::from_bytes(s.as_bytes())
    }

    /// Parse an identifier from raw bytes.
    ///
    /// # Errors
    ///
    /// Same rejection rules as [`Identifier::from_string`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, IdError> {
        if bytes.len() != ID_LENGTH {
            return Err(IdError::BadLength);
        }
        if !matches_pattern(bytes) {
            return Err(IdError::BadFormat);
        }
        let mut buf = [0u8; ID_LENGTH];
        buf.copy_from_slice(bytes);
        Ok(Self(buf))
    }

    /// Whether this identifier satisfies the length and format predicates.
    ///
    /// Pure check, never errors. The length predicate is satisfied by the
    /// fixed-width representation; the format predicate is re-evaluated.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches_pattern(&self.0)
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        // Always ASCII for any identifier built through a validating
        // constructor or the generator; nil() is NUL bytes, also valid UTF-8.
        std::str::from_utf8(&self.0).unwrap_or("")
    }

    /// The identifier's raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; ID_LENGTH] {
        &self.0
    }
}

impl FromStr for Identifier {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_string(s)
    }
}

impl TryFrom<String> for Identifier {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_string(&value)
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.as_str().to_owned()
    }
}

impl AsRef<[u8]> for Identifier {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({})", self.as_str())
    }
}

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The input is not exactly 20 bytes long.
    #[error("invalid identifier: incorrect length")]
    BadLength,

    /// The input does not match the prefix + alphanumeric pattern.
    #[error("invalid identifier: incorrect format")]
    BadFormat,
}

/// Mints [`Identifier`]s.
///
/// Owns the process-wide counter and the entropy pool; create one at process
/// start and share it by handle (`Arc<IdGenerator>`) with everything that
/// mints identifiers. There is no module-level state.
///
/// Identifiers from one generator are strictly increasing in mint order as
/// long as fewer than 62⁴ (~14.8M) are minted within a single
/// millisecond-resolution window; past that the counter field repeats and
/// ordering can invert. The boundary is documented, not corrected for.
pub struct IdGenerator {
    counter: AtomicU64,
    rngs: RngPool,
}

impl IdGenerator {
    /// Create a generator with a fresh counter and entropy pool.
    #[must_use]
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
            rngs: RngPool::new(RNG_POOL_CAPACITY),
        }
    }

    /// Mint a new identifier.
    #[must_use]
    pub fn mint(&self) -> Identifier {
        let count = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let millis = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);

        let mut buf = [0u8; ID_LENGTH];
        buf[..PREFIX.len()].copy_from_slice(PREFIX);

        let time_end = PREFIX.len() + TIME_DIGITS;
        let counter_end = time_end + COUNTER_DIGITS;
        encode_base62(millis, &mut buf[PREFIX.len()..time_end]);
        encode_base62(count, &mut buf[time_end..counter_end]);

        let mut rng = self.rngs.checkout();
        for slot in &mut buf[counter_end..] {
            *slot = ALPHABET[rng.gen_range(0..ALPHABET.len())];
        }
        self.rngs.restore(rng);

        Identifier(buf)
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// A bounded pool of independently seeded random sources.
///
/// Generation checks a source out, fills the random suffix, and returns it,
/// so mints contend only on the pool's lock, never on a shared generator.
struct RngPool {
    slots: Mutex<Vec<StdRng>>,
    capacity: usize,
}

impl RngPool {
    fn new(capacity: usize) -> Self {
        Self {
            slots: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
        }
    }

    fn checkout(&self) -> StdRng {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.pop().unwrap_or_else(StdRng::from_entropy)
    }

    fn restore(&self, rng: StdRng) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if slots.len() < self.capacity {
            slots.push(rng);
        }
    }
}

/// Encode `value` into fixed-width base-62, most significant digit first.
///
/// Values larger than the width can hold wrap silently; the counter field
/// relies on exactly this truncation.
fn encode_base62(mut value: u64, buf: &mut [u8]) {
    for slot in buf.iter_mut().rev() {
        *slot = ALPHABET[(value % 62) as usize];
        value /= 62;
    }
}

fn matches_pattern(bytes: &[u8]) -> bool {
    bytes.len() == ID_LENGTH
        && bytes[..PREFIX.len()] == *PREFIX
        && bytes[PREFIX.len()..]
            .iter()
            .all(u8::is_ascii_alphanumeric)
}
