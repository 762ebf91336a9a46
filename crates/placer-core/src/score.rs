//! # Score Arithmetic
//!
//! A bounded integer with two absorbing sentinels, `+INFINITY` ("always") and
//! `-INFINITY` ("never"). Every preference value in a pass is a [`Score`].
//!
//! ## Rules
//!
//! - Finite values are clamped into `[-INFINITY, INFINITY]`.
//! - `merge(x, -INF) == -INF` and `merge(x, +INF) == +INF` for finite `x`.
//! - `merge(+INF, -INF)` is a configuration conflict. [`Score::merge`] clamps
//!   it to `-INF` (the more restrictive side); [`Score::checked_merge`] reports
//!   it instead.
//! - Finite addition saturates, it never overflows.

use crate::primitives::{INFINITY, INFINITY_TOKENS, NEG_INFINITY_TOKEN};
use crate::types::PlacerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Saturating placement score.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(try_from = "ScoreRepr", into = "i64")]
pub struct Score(i64);

impl Score {
    pub const INFINITY: Self = Self(INFINITY);
    pub const NEG_INFINITY: Self = Self(-INFINITY);
    pub const ZERO: Self = Self(0);

    /// Create a score, clamping into the sentinel range.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        if value >= INFINITY {
            Self::INFINITY
        } else if value <= -INFINITY {
            Self::NEG_INFINITY
        } else {
            Self(value)
        }
    }

    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_infinite(self) -> bool {
        self.0 >= INFINITY
    }

    #[must_use]
    pub const fn is_neg_infinite(self) -> bool {
        self.0 <= -INFINITY
    }

    /// Combine two scores. `-INF` wins every conflict.
    #[must_use]
    pub const fn merge(self, other: Self) -> Self {
        if self.is_neg_infinite() || other.is_neg_infinite() {
            Self::NEG_INFINITY
        } else if self.is_infinite() || other.is_infinite() {
            Self::INFINITY
        } else {
            Self::new(self.0.saturating_add(other.0))
        }
    }

    /// Combine two scores, reporting `+INF` against `-INF`.
    pub fn checked_merge(self, other: Self) -> Result<Self, PlacerError> {
        let conflict = (self.is_infinite() && other.is_neg_infinite())
            || (self.is_neg_infinite() && other.is_infinite());
        if conflict {
            return Err(PlacerError::ScoreConflict);
        }
        Ok(self.merge(other))
    }
}

impl From<Score> for i64 {
    fn from(score: Score) -> Self {
        score.0
    }
}

impl FromStr for Score {
    type Err = PlacerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if INFINITY_TOKENS.contains(&trimmed) {
            return Ok(Self::INFINITY);
        }
        if trimmed == NEG_INFINITY_TOKEN {
            return Ok(Self::NEG_INFINITY);
        }
        trimmed
            .parse::<i64>()
            .map(Self::new)
            .map_err(|_| PlacerError::Config(format!("invalid score '{}'", s)))
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_infinite() {
            f.write_str("+INFINITY")
        } else if self.is_neg_infinite() {
            f.write_str(NEG_INFINITY_TOKEN)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Scores arrive either as integers or as strings such as `"-INFINITY"`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ScoreRepr {
    Int(i64),
    Text(String),
}

impl TryFrom<ScoreRepr> for Score {
    type Error = PlacerError;

    fn try_from(repr: ScoreRepr) -> Result<Self, Self::Error> {
        match repr {
            ScoreRepr::Int(v) => Ok(Self::new(v)),
            ScoreRepr::Text(s) => s.parse(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
