//! Reviewer selection policy.
//!
//! This library holds the pure part of reviewer assignment. It never touches
//! storage; callers hand it a team roster and get back user IDs. Key concepts:
//!
//! - **Roster**: the members of one team, in the order the store returned them.
//! - **Candidate**: a roster member that is active and not excluded.
//! - **Initial selection**: the first `max_reviewers` candidates, deterministic.
//! - **Replacement**: one candidate drawn uniformly at random.
//!
//! # Invariants
//!
//! - The author (or the removed reviewer) is never selected
//! - Inactive members are never selected
//! - Selected IDs are distinct
//! - Randomness only enters through a [`RandomSource`]

use std::collections::HashSet;

use prr_id::UserId;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

/// Default cap on reviewers assigned to a new pull request.
pub const DEFAULT_MAX_REVIEWERS: usize = 2;

/// Selection errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssignError {
    /// No active, eligible replacement reviewer exists in the roster.
    #[error("no active replacement candidate in team of reviewer {removed}")]
    NoCandidateAvailable { removed: UserId },
}

/// A roster entry as seen by the selection policy.
pub trait RosterMember {
    fn user_id(&self) -> &UserId;
    fn is_active(&self) -> bool;
}

/// Source of uniform random indices.
///
/// Production code uses [`ThreadRandom`]; tests inject [`SeededRandom`] to get
/// reproducible picks.
pub trait RandomSource: Send {
    /// Returns an index in `0..len`. Callers never pass `len == 0`.
    fn pick_index(&mut self, len: usize) -> usize;
}

/// Random source backed by the thread-local generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn pick_index(&mut self, len: usize) -> usize {
        rand::rng().random_range(0..len)
    }
}

/// Deterministic random source for tests and reproducible runs.
#[derive(Debug, Clone)]
pub struct SeededRandom(StdRng);

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl RandomSource for SeededRandom {
    fn pick_index(&mut self, len: usize) -> usize {
        self.0.random_range(0..len)
    }
}

/// Members eligible for assignment: active and not in `excluded`.
///
/// Keeps roster order and drops repeated user IDs.
pub fn eligible_candidates<'a, M, I>(roster: I, excluded: &HashSet<&UserId>) -> Vec<&'a UserId>
where
    M: RosterMember + 'a,
    I: IntoIterator<Item = &'a M>,
{
    let mut seen = HashSet::new();
    roster
        .into_iter()
        .filter(|m| m.is_active() && !excluded.contains(m.user_id()))
        .map(|m| m.user_id())
        .filter(|id| seen.insert(*id))
        .collect()
}

/// Choose reviewers for a new pull request.
///
/// Takes the first `max_reviewers` active members other than the author, in
/// roster order. A short or empty result is not an error.
pub fn select_initial_reviewers<M: RosterMember>(
    roster: &[M],
    author_id: &UserId,
    max_reviewers: usize,
) -> Vec<UserId> {
    let excluded = HashSet::from([author_id]);
    eligible_candidates(roster, &excluded)
        .into_iter()
        .take(max_reviewers)
        .cloned()
        .collect()
}

/// Choose a replacement for a reviewer being removed from a pull request.
///
/// `roster` is the removed reviewer's team. `also_excluded` carries the IDs
/// that must not be picked besides the removed reviewer itself, typically the
/// pull request author and the reviewers that stay assigned.
pub fn select_replacement_reviewer<M: RosterMember>(
    roster: &[M],
    removed: &UserId,
    also_excluded: &[UserId],
    random: &mut dyn RandomSource,
) -> Result<UserId, AssignError> {
    let mut excluded: HashSet<&UserId> = also_excluded.iter().collect();
    excluded.insert(removed);

    let candidates = eligible_candidates(roster, &excluded);
    if candidates.is_empty() {
        return Err(AssignError::NoCandidateAvailable {
            removed: removed.clone(),
        });
    }

    let index = random.pick_index(candidates.len());
    Ok(candidates[index].clone())
}
