//! Vote reconciliation state machine.
//!
//! The decision of what a vote request does to the ledger is pure: it only
//! depends on the user's existing direction for the quote and the requested
//! one. The endpoint applies the outcome inside a transaction that holds the
//! quote row lock, then refreshes the quote's like/dislike counters from the
//! ledger itself, so the counters can never drift from the votes that back
//! them.

use crate::errors::ApiError;
use crate::schema::db::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// First vote by this user on this quote: insert a ledger row.
    Created(Direction),
    /// The user held the opposite direction: flip the ledger row in place.
    Flipped { from: Direction, to: Direction },
}

/// Decide how `requested` reconciles against the user's `existing` vote.
/// A repeat of the same direction is rejected with `DuplicateVote` and must
/// leave both the ledger and the counters untouched.
pub fn reconcile(
    existing: Option<Direction>,
    requested: Direction,
) -> Result<VoteOutcome, ApiError> {
    match existing {
        None => Ok(VoteOutcome::Created(requested)),
        Some(current) if current == requested => Err(ApiError::DuplicateVote),
        Some(current) => Ok(VoteOutcome::Flipped {
            from: current,
            to: requested,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Direction::{Dislike, Like};

    /// Mirror of the ledger-backed counter refresh, for checking the
    /// counter identities without a database.
    fn apply(counts: (i32, i32), outcome: VoteOutcome) -> (i32, i32) {
        let (likes, dislikes) = counts;
        match outcome {
            VoteOutcome::Created(Like) => (likes + 1, dislikes),
            VoteOutcome::Created(Dislike) => (likes, dislikes + 1),
            VoteOutcome::Flipped { from: Like, .. } => (likes - 1, dislikes + 1),
            VoteOutcome::Flipped { from: Dislike, .. } => (likes + 1, dislikes - 1),
        }
    }

    #[test]
    fn first_vote_creates_a_ledger_row() {
        assert_eq!(reconcile(None, Like).unwrap(), VoteOutcome::Created(Like));
        assert_eq!(
            reconcile(None, Dislike).unwrap(),
            VoteOutcome::Created(Dislike)
        );
    }

    #[test]
    fn repeat_vote_is_rejected_without_mutation() {
        assert!(matches!(
            reconcile(Some(Like), Like),
            Err(ApiError::DuplicateVote)
        ));
        assert!(matches!(
            reconcile(Some(Dislike), Dislike),
            Err(ApiError::DuplicateVote)
        ));
    }

    #[test]
    fn opposite_vote_flips_in_place() {
        assert_eq!(
            reconcile(Some(Like), Dislike).unwrap(),
            VoteOutcome::Flipped {
                from: Like,
                to: Dislike
            }
        );
        assert_eq!(
            reconcile(Some(Dislike), Like).unwrap(),
            VoteOutcome::Flipped {
                from: Dislike,
                to: Like
            }
        );
    }

    #[test]
    fn like_then_flip_nets_one_dislike() {
        let start = (4, 7);
        let after_like = apply(start, reconcile(None, Like).unwrap());
        assert_eq!(after_like, (5, 7));
        let after_flip = apply(after_like, reconcile(Some(Like), Dislike).unwrap());
        assert_eq!(after_flip, (4, 8));
    }

    #[test]
    fn one_user_never_holds_more_than_one_vote() {
        // Walk every request sequence of length 4; the ledger state for the
        // user stays a single direction and counters stay non-negative.
        for seq in 0..16u32 {
            let mut held: Option<Direction> = None;
            let mut counts = (0, 0);
            for step in 0..4 {
                let requested = if seq & (1 << step) == 0 { Like } else { Dislike };
                if let Ok(outcome) = reconcile(held, requested) {
                    counts = apply(counts, outcome);
                    held = Some(requested);
                }
                assert!(counts.0 >= 0 && counts.1 >= 0);
                assert!(counts.0 + counts.1 <= 1);
            }
        }
    }
}
