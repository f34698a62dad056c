use std::cmp::Ordering;
use std::collections::HashMap;
use serde::{Serialize, Deserialize};
use crate::models::{Vote, VoteOption};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmitOutcome { Created, Updated }

impl SubmitOutcome {
    pub const fn message(self) -> &'static str {
        match self {
            SubmitOutcome::Created => "Vote submitted successfully",
            SubmitOutcome::Updated => "Vote updated successfully",
        }
    }
}

/// Counter adjustments for one submission: `retract` (if any) is a
/// decrement, `cast` an upsert-increment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteChange {
    pub outcome: SubmitOutcome,
    pub retract: Option<String>,
    pub cast: String,
}

impl VoteChange {
    /// Resubmitting the same option still retracts and re-casts it.
    pub fn plan(previous: Option<&str>, option: &str) -> Self {
        match previous {
            None => Self {
                outcome: SubmitOutcome::Created,
                retract: None,
                cast: option.to_string(),
            },
            Some(previous) => Self {
                outcome: SubmitOutcome::Updated,
                retract: Some(previous.to_string()),
                cast: option.to_string(),
            },
        }
    }

    /// `(option, delta)` pairs ordered by option name, so concurrent
    /// submissions touch counter rows in the same order. For a same-option
    /// resubmission the decrement stays ahead of the increment.
    pub fn adjustments(&self) -> Vec<(&str, i64)> {
        let mut steps: Vec<(&str, i64)> = self.retract.iter()
            .map(|name| (name.as_str(), -1))
            .collect();
        steps.push((self.cast.as_str(), 1));
        steps.sort_by(|a, b| a.0.cmp(b.0));
        steps
    }
}

pub fn compare_ranked(a: &VoteOption, b: &VoteOption) -> Ordering {
    b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name))
}

/// Sorts by count descending, then name ascending.
pub fn rank_options(mut options: Vec<VoteOption>) -> Vec<VoteOption> {
    options.sort_by(compare_ranked);
    options
}

/// Counts votes per option straight from the vote rows.
pub fn recount<'a>(votes: impl IntoIterator<Item = &'a Vote>) -> HashMap<String, i64> {
    votes.into_iter().fold(HashMap::new(), |mut counts, vote| {
        *counts.entry(vote.option.clone()).or_insert(0) += 1;
        counts
    })
}

/// Options whose cached count disagrees with a recount of `votes`,
/// as `(name, cached, actual)`.
pub fn count_drift<'a>(
    options: &[VoteOption],
    votes: impl IntoIterator<Item = &'a Vote>,
) -> Vec<(String, i64, i64)> {
    let actual = recount(votes);
    let mut drift: Vec<_> = options.iter()
        .filter_map(|option| {
            let expected = actual.get(&option.name).copied().unwrap_or(0);
            (expected != option.count).then(|| (option.name.clone(), option.count, expected))
        })
        .collect();

    drift.extend(actual.iter()
        .filter(|(name, _)| !options.iter().any(|o| &o.name == *name))
        .map(|(name, &count)| (name.clone(), 0, count)));
    drift.sort();
    drift
}
