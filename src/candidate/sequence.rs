use super::{space_size, Candidate};

/// Lazy, finite, restartable stream of candidates in scan order
///
/// The stream runs from its starting candidate up to and including the
/// greatest candidate of the length, advancing with
/// [`Candidate::successor`]. Running off the end of the space is not an
/// error; the iterator simply ends.
#[derive(Debug, Clone)]
pub struct CandidateSequence {
    length: usize,
    next: Option<Candidate>,
}

impl CandidateSequence {
    /// Creates a sequence over every candidate of `length`
    pub fn new(length: usize) -> Self {
        Self {
            length,
            next: Some(Candidate::first(length)),
        }
    }

    /// Creates a sequence starting at `start` (inclusive)
    pub fn starting_at(start: Candidate) -> Self {
        Self {
            length: start.len(),
            next: Some(start),
        }
    }

    /// Creates an already exhausted sequence
    pub fn exhausted(length: usize) -> Self {
        Self { length, next: None }
    }

    /// Repositions the sequence so `start` is yielded next
    ///
    /// This does not walk the space; the cost is independent of how far
    /// `start` is from the current position.
    pub fn seek(&mut self, start: Candidate) {
        self.length = start.len();
        self.next = Some(start);
    }

    /// The candidate that will be yielded next, if any
    pub fn peek(&self) -> Option<&Candidate> {
        self.next.as_ref()
    }

    /// Candidate length of this sequence
    pub fn length(&self) -> usize {
        self.length
    }

    /// Number of candidates left to yield
    pub fn remaining(&self) -> u128 {
        match &self.next {
            Some(next) => space_size(self.length) - next.index(),
            None => 0,
        }
    }
}

impl Iterator for CandidateSequence {
    type Item = Candidate;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        self.next = current.successor();
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match usize::try_from(self.remaining()) {
            Ok(remaining) => (remaining, Some(remaining)),
            Err(_) => (usize::MAX, None),
        }
    }
}

impl std::iter::FusedIterator for CandidateSequence {}
