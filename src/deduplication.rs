// 🔍 Deduplication - reject records whose id is already taken
//
// Single filtering pass: candidates are split into two new sequences
// (accepted, duplicate ids). A candidate is a duplicate when its id is
// already stored OR appeared earlier in the same batch.

use crate::entities::Identified;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq)]
pub struct Partition<T> {
    /// Candidates with fresh ids, in input order
    pub accepted: Vec<T>,

    /// Ids that collided, in input order
    pub duplicates: Vec<i64>,
}

pub struct DeduplicationEngine {
    existing: HashSet<i64>,
}

impl DeduplicationEngine {
    /// Create engine from the ids currently in the store
    pub fn new(existing: impl IntoIterator<Item = i64>) -> Self {
        DeduplicationEngine {
            existing: existing.into_iter().collect(),
        }
    }

    pub fn partition<T: Identified>(&self, candidates: Vec<T>) -> Partition<T> {
        let mut seen = HashSet::with_capacity(candidates.len());
        let mut accepted = Vec::with_capacity(candidates.len());
        let mut duplicates = Vec::new();

        for candidate in candidates {
            let id = candidate.id();
            if self.existing.contains(&id) || !seen.insert(id) {
                duplicates.push(id);
            } else {
                accepted.push(candidate);
            }
        }

        Partition {
            accepted,
            duplicates,
        }
    }
}
