use std::future::Future;

use tracing::warn;

/// Tracked
///
/// A value that is updated before the server agrees to the change. The UI
/// shows [`Tracked::current`]; the last server-confirmed value is kept until
/// the request settles so a failure can roll back without guessing.
///
/// Transitions consume the value and return the next state:
///
/// ```text
/// Confirmed --apply--> Pending --confirm--> Confirmed
///                         |
///                         +--reject--> RejectedPendingRefetch --refetched--> Confirmed
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tracked<T> {
    Confirmed(T),
    Pending { tentative: T, last_good: T },
    /// The change failed. Shows `last_good` until a fresh copy is loaded.
    RejectedPendingRefetch { last_good: T },
}

impl<T> Tracked<T> {
    pub fn new(value: T) -> Self {
        Self::Confirmed(value)
    }

    /// What should be displayed right now.
    pub fn current(&self) -> &T {
        match self {
            Self::Confirmed(value) => value,
            Self::Pending { tentative, .. } => tentative,
            Self::RejectedPendingRefetch { last_good } => last_good,
        }
    }

    pub fn last_good(&self) -> &T {
        match self {
            Self::Confirmed(value) => value,
            Self::Pending { last_good, .. } | Self::RejectedPendingRefetch { last_good } => {
                last_good
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    pub fn needs_refetch(&self) -> bool {
        matches!(self, Self::RejectedPendingRefetch { .. })
    }

    /// Shows `tentative` immediately. Stacked applies keep the oldest
    /// confirmed value as the rollback point.
    #[must_use]
    pub fn apply(self, tentative: T) -> Self {
        let last_good = match self {
            Self::Confirmed(value) => value,
            Self::Pending { last_good, .. } | Self::RejectedPendingRefetch { last_good } => {
                last_good
            }
        };
        Self::Pending {
            tentative,
            last_good,
        }
    }

    /// The server accepted the change; the tentative value becomes confirmed.
    #[must_use]
    pub fn confirm(self) -> Self {
        match self {
            Self::Pending { tentative, .. } => Self::Confirmed(tentative),
            other => other,
        }
    }

    /// The server refused the change; roll back to the last confirmed value.
    #[must_use]
    pub fn reject(self) -> Self {
        match self {
            Self::Pending { last_good, .. } => Self::RejectedPendingRefetch { last_good },
            other => other,
        }
    }

    /// A fresh copy was loaded from the server. Always wins.
    #[must_use]
    pub fn refetched(self, value: T) -> Self {
        Self::Confirmed(value)
    }

    pub fn into_current(self) -> T {
        match self {
            Self::Confirmed(value) => value,
            Self::Pending { tentative, .. } => tentative,
            Self::RejectedPendingRefetch { last_good } => last_good,
        }
    }
}

/// Applies `tentative`, awaits `request`, and settles the value.
///
/// On success the server's copy is taken as confirmed. On failure the value
/// rolls back to its last good state and is flagged for refetch; the error
/// is returned alongside so the caller can surface it.
pub async fn commit<T, E, Fut>(
    tracked: Tracked<T>,
    tentative: T,
    request: Fut,
) -> (Tracked<T>, Result<(), E>)
where
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let pending = tracked.apply(tentative);
    match request.await {
        Ok(server_value) => (pending.refetched(server_value), Ok(())),
        Err(err) => {
            warn!(error = %err, "optimistic update rejected, rolling back");
            (pending.reject(), Err(err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stacked_applies_roll_back_to_first_confirmed_value() {
        let tracked = Tracked::new(1).apply(2).apply(3);
        assert_eq!(*tracked.current(), 3);

        let tracked = tracked.reject();
        assert!(tracked.needs_refetch());
        assert_eq!(*tracked.current(), 1);
    }

    #[test]
    fn confirm_outside_pending_is_a_no_op() {
        assert_eq!(Tracked::new("a").confirm(), Tracked::Confirmed("a"));
    }
}
