//! Rank-based score normalization and node selection.
//!
//! Raw scores are only compared with each other, never interpreted on an
//! absolute scale. Zero is "no signal" and is left untouched.

use crate::{constants::MAX_NODE_SCORE, node::NodeName, random::RandomSource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreEntry {
    pub node_name: NodeName,
    pub score: i64,
}

impl ScoreEntry {
    pub fn new(node_name: impl Into<NodeName>, score: i64) -> Self {
        Self {
            node_name: node_name.into(),
            score,
        }
    }
}

/// Sorts `scores` ascending and redistributes the non-zero ones onto
/// `1..=MAX_NODE_SCORE` by rank.
///
/// With `n` non-zero entries, an entry ranked `k` (the number of non-zero
/// entries scoring at most as much as itself) gets `k * MAX_NODE_SCORE / n`,
/// never less than 1. Equal raw scores share a rank and the best entry gets
/// `MAX_NODE_SCORE`.
pub fn normalize(scores: &mut [ScoreEntry]) {
    scores.sort_by_key(|entry| entry.score);

    let raw: Vec<i64> = scores
        .iter()
        .map(|entry| entry.score)
        .filter(|score| *score != 0)
        .collect();

    if raw.is_empty() {
        return;
    }

    let n = raw.len() as i64;

    for entry in scores.iter_mut().filter(|entry| entry.score != 0) {
        let rank = raw.iter().filter(|score| **score <= entry.score).count() as i64;
        entry.score = (rank * MAX_NODE_SCORE / n).max(1);
    }
}

/// Picks the entry with the highest score. Ties go to the first entry in
/// slice order.
///
/// When every score is zero, `filter_order` (the eligible node names in the
/// order the filter produced them) decides: its first node wins.
pub fn select<'a>(scores: &'a [ScoreEntry], filter_order: &'a [NodeName]) -> Option<&'a str> {
    let best = scores
        .iter()
        .fold(None::<&ScoreEntry>, |best, entry| match best {
            Some(current) if current.score >= entry.score => Some(current),
            _ => Some(entry),
        })?;

    if best.score == 0 {
        return filter_order
            .first()
            .map(String::as_str)
            .or(Some(best.node_name.as_str()));
    }

    Some(&best.node_name)
}

/// Picks a node uniformly at random.
pub fn select_uniform<'a>(nodes: &'a [NodeName], random: &RandomSource) -> Option<&'a str> {
    match nodes.len() {
        0 => None,
        1 => Some(&nodes[0]),
        len => Some(&nodes[random.index(len)]),
    }
}
