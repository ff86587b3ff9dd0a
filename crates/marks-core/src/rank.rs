//! Rank arithmetic
//!
//! Ranks are dense, zero-based positions inside a scope: the list of all
//! sections, or the favorites of one section. Everything that reorders goes
//! through here so the density invariant lives in one place.

use uuid::Uuid;

use crate::error::ValidationError;
use crate::models::{Favorite, Section};

/// A record with a rank inside a scope
pub trait Ranked {
    fn id(&self) -> Uuid;
    fn rank(&self) -> u32;
    fn set_rank(&mut self, rank: u32);
    /// Scope the rank is counted in
    fn scope(&self) -> Uuid;
}

impl Ranked for Section {
    fn id(&self) -> Uuid {
        self.id
    }

    fn rank(&self) -> u32 {
        self.rank
    }

    fn set_rank(&mut self, rank: u32) {
        self.rank = rank;
    }

    /// All sections share one scope
    fn scope(&self) -> Uuid {
        Uuid::nil()
    }
}

impl Ranked for Favorite {
    fn id(&self) -> Uuid {
        self.id
    }

    fn rank(&self) -> u32 {
        self.rank
    }

    fn set_rank(&mut self, rank: u32) {
        self.rank = rank;
    }

    fn scope(&self) -> Uuid {
        self.section_id
    }
}

/// Move one element from `from` to `to`, keeping everything else in order
///
/// Out-of-range indices leave the list untouched.
pub fn array_move<T>(mut items: Vec<T>, from: usize, to: usize) -> Vec<T> {
    if from >= items.len() || to >= items.len() || from == to {
        return items;
    }
    let item = items.remove(from);
    items.insert(to, item);
    items
}

/// Set each rank to its position; returns how many ranks changed
pub fn assign_ranks<T: Ranked>(items: &mut [T]) -> usize {
    let mut changed = 0;
    for (position, item) in items.iter_mut().enumerate() {
        let position = position as u32;
        if item.rank() != position {
            item.set_rank(position);
            changed += 1;
        }
    }
    changed
}

/// Sort by current rank, then close gaps and duplicates
///
/// Sorting is stable, so ties keep their incoming order.
pub fn densify<T: Ranked>(items: &mut [T]) -> usize {
    items.sort_by_key(|item| item.rank());
    assign_ranks(items)
}

/// Check that ranks are exactly `0..len` in order
pub fn is_dense<T: Ranked>(items: &[T]) -> bool {
    items
        .iter()
        .enumerate()
        .all(|(position, item)| item.rank() == position as u32)
}

/// Consecutive items that share a scope
#[derive(Debug, Clone, PartialEq)]
pub struct Run<T> {
    pub scope: Uuid,
    pub items: Vec<T>,
}

/// A reorder split into scope-homogeneous runs
///
/// Each run is ranked independently, so a sequence spanning two sections
/// (a cross-section move) never produces colliding ranks.
#[derive(Debug, Clone, PartialEq)]
pub struct ReorderTransaction<T> {
    runs: Vec<Run<T>>,
}

impl<T: Ranked> ReorderTransaction<T> {
    /// Split a sequence into runs of consecutive items with the same scope
    ///
    /// A scope that reappears after another scope's run, or an id listed
    /// twice, is rejected.
    pub fn from_sequence(sequence: Vec<T>) -> Result<Self, ValidationError> {
        let mut runs: Vec<Run<T>> = Vec::new();
        let mut seen_ids = std::collections::HashSet::new();

        for item in sequence {
            if !seen_ids.insert(item.id()) {
                return Err(ValidationError::DuplicateEntry(item.id()));
            }

            let scope = item.scope();
            match runs.last_mut() {
                Some(run) if run.scope == scope => run.items.push(item),
                _ => {
                    if runs.iter().any(|run| run.scope == scope) {
                        return Err(ValidationError::SplitScope(scope));
                    }
                    runs.push(Run {
                        scope,
                        items: vec![item],
                    });
                }
            }
        }

        Ok(Self { runs })
    }

    pub fn runs(&self) -> &[Run<T>] {
        &self.runs
    }

    pub fn scopes(&self) -> Vec<Uuid> {
        self.runs.iter().map(|run| run.scope).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Rank every run from zero and return the runs
    pub fn into_ranked_runs(mut self) -> Vec<Run<T>> {
        for run in &mut self.runs {
            assign_ranks(&mut run.items);
        }
        self.runs
    }
}
