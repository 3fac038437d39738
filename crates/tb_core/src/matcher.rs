use crate::assignment::{select_strategy, Candidate};
use crate::models::{ObsidianTask, Priority, RemindersTask};
use crate::text::{bag_len, dice_bag, normalize_tokens, tag_set, title_hash, TokenBag};
use crate::types::{ObsId, RemId};
use chrono::NaiveDate;
use std::collections::BTreeSet;

pub const WEIGHT_DESCRIPTION: f64 = 0.60;
pub const WEIGHT_DUE: f64 = 0.25;
pub const WEIGHT_TAGS: f64 = 0.10;
pub const WEIGHT_PRIORITY: f64 = 0.05;

/// Above this pair count, candidate pruning is mandatory.
pub const PRUNE_PAIR_LIMIT: usize = 10_000;
pub const DEFAULT_TOP_K: usize = 50;

#[derive(Debug, Clone)]
pub struct MatcherParams {
    pub min_score: f64,
    pub days_tolerance: i64,
    pub top_k: usize,
}

impl Default for MatcherParams {
    fn default() -> Self {
        Self {
            min_score: 0.75,
            days_tolerance: 1,
            top_k: DEFAULT_TOP_K,
        }
    }
}

/// Pre-computed similarity features for one task.
#[derive(Debug, Clone)]
pub struct TaskFeatures {
    pub tokens: TokenBag,
    pub raw_fold: String,
    pub title_hash: String,
    pub due: Option<NaiveDate>,
    pub tags: BTreeSet<String>,
    pub priority: Option<Priority>,
}

impl TaskFeatures {
    pub fn from_obs(task: &ObsidianTask) -> Self {
        Self {
            tokens: normalize_tokens(&task.description),
            raw_fold: task.description.trim().to_lowercase(),
            title_hash: title_hash(&task.description),
            due: task.due,
            tags: tag_set(&task.tags),
            priority: task.priority,
        }
    }

    pub fn from_rem(task: &RemindersTask) -> Self {
        Self {
            tokens: normalize_tokens(&task.title),
            raw_fold: task.title.trim().to_lowercase(),
            title_hash: title_hash(&task.title),
            due: task.due,
            tags: tag_set(&task.tags),
            priority: task.priority,
        }
    }
}

fn description_score(a: &TaskFeatures, b: &TaskFeatures) -> f64 {
    if bag_len(&a.tokens) == 0 && bag_len(&b.tokens) == 0 {
        // URL-only or markup-only descriptions tokenize to nothing; fall
        // back to the folded raw strings.
        return if a.raw_fold == b.raw_fold { 1.0 } else { 0.0 };
    }
    dice_bag(&a.tokens, &b.tokens)
}

fn due_score(a: Option<NaiveDate>, b: Option<NaiveDate>, days_tolerance: i64) -> f64 {
    match (a, b) {
        (None, None) => 1.0,
        (Some(left), Some(right)) => {
            let diff = (left - right).num_days().abs();
            if diff == 0 {
                1.0
            } else if diff <= days_tolerance {
                1.0 - (diff as f64 / (days_tolerance + 1) as f64)
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

fn tags_score(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let union = a.union(b).count();
    if union == 0 {
        return 1.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

fn priority_score(a: Option<Priority>, b: Option<Priority>) -> f64 {
    if a == b {
        1.0
    } else {
        0.0
    }
}

pub fn score_features(a: &TaskFeatures, b: &TaskFeatures, params: &MatcherParams) -> f64 {
    let score = WEIGHT_DESCRIPTION * description_score(a, b)
        + WEIGHT_DUE * due_score(a.due, b.due, params.days_tolerance)
        + WEIGHT_TAGS * tags_score(&a.tags, &b.tags)
        + WEIGHT_PRIORITY * priority_score(a.priority, b.priority);
    score.clamp(0.0, 1.0)
}

pub fn score_tasks(obs: &ObsidianTask, rem: &RemindersTask, params: &MatcherParams) -> f64 {
    score_features(
        &TaskFeatures::from_obs(obs),
        &TaskFeatures::from_rem(rem),
        params,
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchProposal {
    pub obs_id: ObsId,
    pub rem_id: RemId,
    pub score: f64,
}

fn same_due_bucket(a: Option<NaiveDate>, b: Option<NaiveDate>, days_tolerance: i64) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(left), Some(right)) => (left - right).num_days().abs() <= days_tolerance,
        _ => false,
    }
}

/// Candidate pairs per obsidian row. Pruning buckets on due date within
/// the tolerance window and keeps the top-K columns by description
/// similarity; it is mandatory once the full cross product exceeds
/// `PRUNE_PAIR_LIMIT`.
fn candidate_pairs(
    obs_features: &[TaskFeatures],
    rem_features: &[TaskFeatures],
    params: &MatcherParams,
) -> Vec<Candidate> {
    let prune = obs_features.len().saturating_mul(rem_features.len()) > PRUNE_PAIR_LIMIT;
    let mut candidates = Vec::new();
    for (row, obs) in obs_features.iter().enumerate() {
        let mut row_candidates: Vec<(usize, f64)> = Vec::new();
        for (col, rem) in rem_features.iter().enumerate() {
            if prune && !same_due_bucket(obs.due, rem.due, params.days_tolerance) {
                continue;
            }
            let desc = description_score(obs, rem);
            row_candidates.push((col, desc));
        }
        if prune && row_candidates.len() > params.top_k {
            row_candidates.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            row_candidates.truncate(params.top_k);
            row_candidates.sort_by(|a, b| a.0.cmp(&b.0));
        }
        for (col, _) in row_candidates {
            let score = score_features(obs, &rem_features[col], params);
            if score >= params.min_score {
                candidates.push(Candidate { row, col, score });
            }
        }
    }
    candidates
}

/// Match two residual sets one-to-one. Inputs must not share ids with any
/// existing link; both slices are re-sorted by id so the assignment
/// tie-break is lexicographic over `(obs_id, rem_id)`.
pub fn match_residuals(
    obs_tasks: &[&ObsidianTask],
    rem_tasks: &[&RemindersTask],
    params: &MatcherParams,
) -> Vec<MatchProposal> {
    if obs_tasks.is_empty() || rem_tasks.is_empty() {
        return Vec::new();
    }

    let mut obs_sorted: Vec<&ObsidianTask> = obs_tasks.to_vec();
    obs_sorted.sort_by(|a, b| a.id.cmp(&b.id));
    let mut rem_sorted: Vec<&RemindersTask> = rem_tasks.to_vec();
    rem_sorted.sort_by(|a, b| a.id.cmp(&b.id));

    let obs_features: Vec<TaskFeatures> =
        obs_sorted.iter().map(|t| TaskFeatures::from_obs(t)).collect();
    let rem_features: Vec<TaskFeatures> =
        rem_sorted.iter().map(|t| TaskFeatures::from_rem(t)).collect();

    let candidates = candidate_pairs(&obs_features, &rem_features, params);
    let strategy = select_strategy(obs_sorted.len(), rem_sorted.len());
    let chosen = strategy.assign(obs_sorted.len(), rem_sorted.len(), &candidates);

    let mut proposals: Vec<MatchProposal> = chosen
        .into_iter()
        .filter(|candidate| candidate.score >= params.min_score)
        .map(|candidate| MatchProposal {
            obs_id: obs_sorted[candidate.row].id.clone(),
            rem_id: rem_sorted[candidate.col].id.clone(),
            score: candidate.score,
        })
        .collect();
    proposals.sort_by(|a, b| (&a.obs_id, &a.rem_id).cmp(&(&b.obs_id, &b.rem_id)));
    proposals
}
