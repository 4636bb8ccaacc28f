//! `H:M:S` duration parsing and aggregation.

use std::fmt;

use serde::{Serialize, Serializer};

const SECONDS_PER_DAY: i64 = 86_400;

/// Errors that can occur when parsing a duration string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DurationError {
    #[error("Duration '{input}' must have exactly 3 ':'-separated fields, found {found}")]
    FieldCount { input: String, found: usize },

    #[error("Duration '{input}' has a non-integer field '{field}'")]
    InvalidNumber { input: String, field: String },

    #[error("Duration '{input}' is out of range")]
    Overflow { input: String },
}

/// Total elapsed time in whole seconds.
///
/// Displays the way an elapsed-time value reads to a person: `1:30:00`,
/// `2 days, 3:04:05`. Templates receive the display form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Elapsed(i64);

impl Elapsed {
    /// Create from a number of seconds.
    pub fn from_seconds(seconds: i64) -> Self {
        Self(seconds)
    }

    /// Total number of seconds.
    pub fn seconds(self) -> i64 {
        self.0
    }

    /// Add two totals, `None` on overflow.
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Elapsed)
    }
}

impl fmt::Display for Elapsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The clock part is always positive; negative totals borrow whole days.
        let days = self.0.div_euclid(SECONDS_PER_DAY);
        let rest = self.0.rem_euclid(SECONDS_PER_DAY);

        if days != 0 {
            let unit = if days.abs() == 1 { "day" } else { "days" };
            write!(f, "{} {}, ", days, unit)?;
        }

        write!(
            f,
            "{}:{:02}:{:02}",
            rest / 3600,
            (rest % 3600) / 60,
            rest % 60
        )
    }
}

impl Serialize for Elapsed {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Parse an `hours:minutes:seconds` string into seconds.
///
/// Fields are not range checked: `0:90:00` is 90 minutes.
pub fn parse_duration(input: &str) -> Result<i64, DurationError> {
    let fields: Vec<&str> = input.split(':').collect();
    if fields.len() != 3 {
        return Err(DurationError::FieldCount {
            input: input.to_string(),
            found: fields.len(),
        });
    }

    let mut parsed = [0i64; 3];
    for (slot, field) in parsed.iter_mut().zip(&fields) {
        *slot = field
            .trim()
            .parse()
            .map_err(|_| DurationError::InvalidNumber {
                input: input.to_string(),
                field: field.to_string(),
            })?;
    }

    let [hours, minutes, seconds] = parsed;
    hours
        .checked_mul(3600)
        .and_then(|h| minutes.checked_mul(60).and_then(|m| h.checked_add(m)))
        .and_then(|hm| hm.checked_add(seconds))
        .ok_or_else(|| DurationError::Overflow {
            input: input.to_string(),
        })
}

/// Sum a sequence of duration strings.
pub fn total<I, S>(durations: I) -> Result<Elapsed, DurationError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    durations
        .into_iter()
        .try_fold(Elapsed::default(), |acc, d| {
            let d = d.as_ref();
            let seconds = parse_duration(d)?;
            acc.checked_add(Elapsed::from_seconds(seconds))
                .ok_or_else(|| DurationError::Overflow {
                    input: d.to_string(),
                })
        })
}
