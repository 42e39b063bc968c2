//! Punch sequencing rules.
//!
//! A day's punches, read as a set of types, must always be a prefix of
//! `CHEGADA -> ALMOCO -> TERMINO_ALMOCO -> SAIDA`. Everything here is pure;
//! callers load the day from the ledger and feed the types in.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::PunchType;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequenceError {
    /// Recorded types skip a step of the canonical order. This is corrupt
    /// history and is reported as-is, never repaired here.
    #[error("out of order: {present:?} is not a prefix of the canonical punch order")]
    OutOfOrder { present: Vec<PunchType> },
}

/// What the next punch of the day should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextPunch {
    Next(PunchType),
    /// `SAIDA` is recorded; the journey is over for the day.
    Complete,
}

impl NextPunch {
    pub fn punch_type(self) -> Option<PunchType> {
        match self {
            NextPunch::Next(t) => Some(t),
            NextPunch::Complete => None,
        }
    }

    pub fn is_complete(self) -> bool {
        matches!(self, NextPunch::Complete)
    }
}

fn presence<I>(recorded: I) -> [bool; 4]
where
    I: IntoIterator<Item = PunchType>,
{
    let mut present = [false; 4];
    for t in recorded {
        present[t.index()] = true;
    }
    present
}

/// Highest recorded index, after checking the set is a canonical prefix.
fn highest_of_prefix(present: &[bool; 4]) -> Result<Option<usize>, SequenceError> {
    let highest = present.iter().rposition(|p| *p);

    if let Some(h) = highest {
        if !present[..=h].iter().all(|p| *p) {
            let present = PunchType::CANONICAL_ORDER
                .iter()
                .copied()
                .filter(|t| present[t.index()])
                .collect();
            return Err(SequenceError::OutOfOrder { present });
        }
    }

    Ok(highest)
}

/// Computes the next valid punch type from the types already recorded today.
pub fn next_type<I>(recorded: I) -> Result<NextPunch, SequenceError>
where
    I: IntoIterator<Item = PunchType>,
{
    let present = presence(recorded);

    match highest_of_prefix(&present)? {
        None => Ok(NextPunch::Next(PunchType::Chegada)),
        Some(idx) if idx + 1 < PunchType::CANONICAL_ORDER.len() => {
            Ok(NextPunch::Next(PunchType::CANONICAL_ORDER[idx + 1]))
        }
        Some(_) => Ok(NextPunch::Complete),
    }
}

/// Fails when the recorded types are not a canonical prefix.
pub fn check_prefix<I>(recorded: I) -> Result<(), SequenceError>
where
    I: IntoIterator<Item = PunchType>,
{
    highest_of_prefix(&presence(recorded)).map(|_| ())
}

/// true (reject) when `proposed` is already recorded.
pub fn is_duplicate<I>(recorded: I, proposed: PunchType) -> bool
where
    I: IntoIterator<Item = PunchType>,
{
    recorded.into_iter().any(|t| t == proposed)
}

/// true when `proposed` lies inside `[window_start, window_end]`.
pub fn is_within_window(
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    proposed: DateTime<Utc>,
) -> bool {
    window_start <= proposed && proposed <= window_end
}
