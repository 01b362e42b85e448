//! Candidate suffixes and their ordering
//!
//! A candidate is a fixed-length string over a 62-symbol alphabet. The
//! alphabet order below defines the scan order and therefore resumability:
//! changing it would make every existing output store unreadable as a
//! progress log.
//!
//! Candidates behave like numbers in base 62 with a fixed digit order, which
//! gives O(L) seeking via [`Candidate::from_index`] and an odometer style
//! [`Candidate::successor`].

mod sequence;

pub use sequence::CandidateSequence;

use crate::ScanError;
use std::cmp::Ordering;
use std::fmt;

/// The scan alphabet, lowest digit first
pub const ALPHABET: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Number of symbols in [`ALPHABET`]
pub const RADIX: u128 = 62;

/// Longest supported candidate; 62^21 still fits in a `u128`
pub const MAX_LENGTH: usize = 21;

/// Returns the digit value of an alphabet symbol
fn digit_of(symbol: u8) -> Option<u8> {
    match symbol {
        b'a'..=b'z' => Some(symbol - b'a'),
        b'A'..=b'Z' => Some(symbol - b'A' + 26),
        b'0'..=b'9' => Some(symbol - b'0' + 52),
        _ => None,
    }
}

/// Returns the alphabet symbol for a digit value (`digit < 62`)
fn symbol_of(digit: u8) -> u8 {
    ALPHABET.as_bytes()[digit as usize]
}

/// Total number of candidates of the given length
pub fn space_size(length: usize) -> u128 {
    RADIX.pow(length as u32)
}

/// A validated short-code suffix
///
/// The text is guaranteed to be non-empty, at most [`MAX_LENGTH`] long and
/// drawn only from [`ALPHABET`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Candidate {
    text: String,
}

impl Candidate {
    /// Parses a candidate and checks it against the session length
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::InvalidCandidate`] if the length differs from
    /// `length` or any symbol is outside the alphabet.
    pub fn parse(text: &str, length: usize) -> Result<Self, ScanError> {
        let invalid = |reason: String| ScanError::InvalidCandidate {
            candidate: text.to_string(),
            reason,
        };

        if length == 0 || length > MAX_LENGTH {
            return Err(invalid(format!(
                "length must be between 1 and {}, got {}",
                MAX_LENGTH, length
            )));
        }

        if text.len() != length {
            return Err(invalid(format!(
                "expected {} symbols, got {}",
                length,
                text.chars().count()
            )));
        }

        if let Some(bad) = text.chars().find(|c| !c.is_ascii_alphanumeric()) {
            return Err(invalid(format!("symbol '{}' is not in the alphabet", bad)));
        }

        Ok(Self {
            text: text.to_string(),
        })
    }

    /// The smallest candidate of a length (every symbol at digit 0)
    pub fn first(length: usize) -> Self {
        Self::repeat(symbol_of(0), length)
    }

    /// The greatest candidate of a length (every symbol at digit 61)
    pub fn last(length: usize) -> Self {
        Self::repeat(symbol_of((RADIX - 1) as u8), length)
    }

    fn repeat(symbol: u8, length: usize) -> Self {
        Self {
            text: (symbol as char).to_string().repeat(length),
        }
    }

    /// Builds the candidate at `index` in the scan order
    ///
    /// Returns `None` when the index is past the end of the space.
    pub fn from_index(index: u128, length: usize) -> Option<Self> {
        if length == 0 || length > MAX_LENGTH || index >= space_size(length) {
            return None;
        }

        let mut digits = vec![0u8; length];
        let mut rest = index;
        for slot in digits.iter_mut().rev() {
            *slot = symbol_of((rest % RADIX) as u8);
            rest /= RADIX;
        }

        // every byte comes from ALPHABET, which is ASCII
        let text = digits.into_iter().map(char::from).collect();
        Some(Self { text })
    }

    /// Position of this candidate in the scan order
    pub fn index(&self) -> u128 {
        self.text.bytes().fold(0u128, |acc, symbol| {
            acc * RADIX + u128::from(digit_of(symbol).unwrap_or(0))
        })
    }

    /// Odometer increment: the next candidate of the same length
    ///
    /// The rightmost symbol cycles through the alphabet and carries into
    /// its left neighbour on wraparound. Returns `None` when incrementing
    /// past the greatest candidate, which marks the end of the space.
    pub fn successor(&self) -> Option<Self> {
        let mut bytes = self.text.as_bytes().to_vec();

        for slot in bytes.iter_mut().rev() {
            let digit = digit_of(*slot)?;
            if u128::from(digit) + 1 < RADIX {
                *slot = symbol_of(digit + 1);
                let text = bytes.into_iter().map(char::from).collect();
                return Some(Self { text });
            }
            *slot = symbol_of(0);
        }

        None
    }

    /// Number of symbols
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Always false; candidates have at least one symbol
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Byte order would put digits before letters; compare digit values
        self.len().cmp(&other.len()).then_with(|| {
            let lhs = self.text.bytes().map(digit_of);
            let rhs = other.text.bytes().map(digit_of);
            lhs.cmp(rhs)
        })
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl AsRef<str> for Candidate {
    fn as_ref(&self) -> &str {
        &self.text
    }
}
