/// Registration budget of a [`super::Pool`].
///
/// A bounded budget is consumed by every registration attempt and never
/// restored. Once it goes negative it stays negative, so the pool keeps
/// rejecting registrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capacity {
    Unbounded,
    Bounded { remaining: i64 },
}

impl Capacity {
    /// Interpret a signed limit: negative means unbounded.
    pub fn from_limit(limit: i64) -> Self {
        if limit < 0 {
            Self::Unbounded
        } else {
            Self::Bounded { remaining: limit }
        }
    }

    /// Remaining budget, or `None` when unbounded.
    pub fn remaining(&self) -> Option<i64> {
        match self {
            Self::Unbounded => None,
            Self::Bounded { remaining } => Some(*remaining),
        }
    }

    pub fn is_bounded(&self) -> bool {
        matches!(self, Self::Bounded { .. })
    }

    /// Spend one unit of budget.
    ///
    /// Returns `Err(remaining)` with the now-negative budget if this
    /// registration went over the limit.
    pub(crate) fn consume(&mut self) -> Result<(), i64> {
        match self {
            Self::Unbounded => Ok(()),
            Self::Bounded { remaining } => {
                *remaining = remaining.saturating_sub(1);
                if *remaining < 0 {
                    Err(*remaining)
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Check whether `count` registrations fit without spending anything.
    ///
    /// Returns `Err(remaining)` with the budget that spending them would
    /// have left behind.
    pub(crate) fn check(&self, count: usize) -> Result<(), i64> {
        match self {
            Self::Unbounded => Ok(()),
            Self::Bounded { remaining } => {
                let count = i64::try_from(count).unwrap_or(i64::MAX);
                let after = remaining.saturating_sub(count);
                if after < 0 { Err(after) } else { Ok(()) }
            }
        }
    }
}
