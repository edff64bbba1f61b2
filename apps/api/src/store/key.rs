use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use thiserror::Error;

/// Fixed-width, zero-padded stamp. Lexical order of stamps is chronological order.
pub const STAMP_FORMAT: &str = "%Y%m%dT%H%M";
const STAMP_LEN: usize = 13;
const REVISION_MARKER: &str = ".rev";
pub const MAX_QUALIFIER: u8 = 99;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("key '{0}' does not start with a YYYYMMDDTHHMM stamp")]
    BadStamp(String),

    #[error("key '{0}' has an invalid qualifier")]
    BadQualifier(String),
}

/// Identifies one stored record: `STAMP[-SEQ][.revREV]`.
///
/// `seq` separates records logged within the same minute, `revision`
/// separates corrections of the same record. Both are 0 when absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub at: NaiveDateTime,
    pub seq: u8,
    pub revision: u8,
}

/// The part of a key shared by an original and all of its revisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    pub at: NaiveDateTime,
    pub seq: u8,
}

impl RecordKey {
    pub fn new(at: NaiveDateTime) -> Self {
        use chrono::Timelike;
        // Minute precision: drop seconds so the key round-trips.
        let at = at
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(at);
        Self {
            at,
            seq: 0,
            revision: 0,
        }
    }

    pub fn id(&self) -> RecordId {
        RecordId {
            at: self.at,
            seq: self.seq,
        }
    }

    pub fn with_seq(self, seq: u8) -> Self {
        Self { seq, ..self }
    }

    pub fn with_revision(self, revision: u8) -> Self {
        Self { revision, ..self }
    }

    /// Parses only the leading stamp, ignoring any qualifier.
    pub fn parse_stamp(key: &str) -> Result<NaiveDateTime, KeyError> {
        let stamp = key
            .get(..STAMP_LEN)
            .filter(|s| s.bytes().all(|b| b.is_ascii_digit() || b == b'T'))
            .ok_or_else(|| KeyError::BadStamp(key.to_string()))?;
        NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT)
            .map_err(|_| KeyError::BadStamp(key.to_string()))
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.at.format(STAMP_FORMAT))?;
        if self.seq > 0 {
            write!(f, "-{:02}", self.seq)?;
        }
        if self.revision > 0 {
            write!(f, "{REVISION_MARKER}{:02}", self.revision)?;
        }
        Ok(())
    }
}

impl FromStr for RecordKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let at = Self::parse_stamp(s)?;
        let mut rest = &s[STAMP_LEN..];
        let bad = || KeyError::BadQualifier(s.to_string());

        let mut seq = 0;
        if let Some(after) = rest.strip_prefix('-') {
            seq = parse_qualifier(after.get(..2).ok_or_else(bad)?).ok_or_else(bad)?;
            rest = &after[2..];
        }

        let mut revision = 0;
        if let Some(after) = rest.strip_prefix(REVISION_MARKER) {
            if after.len() != 2 {
                return Err(bad());
            }
            revision = parse_qualifier(after).ok_or_else(bad)?;
            rest = "";
        }

        if !rest.is_empty() {
            return Err(bad());
        }

        Ok(Self { at, seq, revision })
    }
}

fn parse_qualifier(digits: &str) -> Option<u8> {
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u8>().ok().filter(|n| (1..=MAX_QUALIFIER).contains(n))
}
