//! Data join
//!
//! Matches the keys of the elements currently drawn against the keys of a
//! new dataset and reports which elements to create, update and delete.
//! Knows nothing about how elements are rendered.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;

/// How existing elements are matched to new data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinBy {
    /// The i-th element takes the i-th datum
    #[default]
    Index,
    /// Elements keep the datum with the same key
    Key,
}

/// Result of a join, as indices into the previous and next collections
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinPlan {
    /// Next-data indices that need a new element
    pub enter: Vec<usize>,
    /// `(previous, next)` pairs that keep their element
    pub update: Vec<(usize, usize)>,
    /// Previous-element indices to remove
    pub exit: Vec<usize>,
}

impl JoinPlan {
    /// Number of elements after the plan is applied
    pub fn resulting_len(&self) -> usize {
        self.enter.len() + self.update.len()
    }
}

/// Compute the join between `previous` and `next`
///
/// With `JoinBy::Key`, a key repeated in `next` matches at most one old
/// element; the extra occurrences enter. A key repeated in `previous`
/// keeps only its first element.
pub fn reconcile<K: Eq + Hash>(previous: &[K], next: &[K], join_by: JoinBy) -> JoinPlan {
    match join_by {
        JoinBy::Index => {
            let shared = previous.len().min(next.len());
            JoinPlan {
                enter: (shared..next.len()).collect(),
                update: (0..shared).map(|i| (i, i)).collect(),
                exit: (shared..previous.len()).collect(),
            }
        }
        JoinBy::Key => {
            let mut unmatched: HashMap<&K, usize> = HashMap::with_capacity(previous.len());
            let mut exit = Vec::new();
            for (i, key) in previous.iter().enumerate() {
                if unmatched.contains_key(key) {
                    exit.push(i);
                } else {
                    unmatched.insert(key, i);
                }
            }

            let mut plan = JoinPlan::default();
            for (j, key) in next.iter().enumerate() {
                match unmatched.remove(key) {
                    Some(i) => plan.update.push((i, j)),
                    None => plan.enter.push(j),
                }
            }

            exit.extend(unmatched.into_values());
            exit.sort_unstable();
            plan.exit = exit;
            plan
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_join_grow() {
        let plan = reconcile(&[100, 200], &[100, 200, 300], JoinBy::Index);
        assert_eq!(plan.update, vec![(0, 0), (1, 1)]);
        assert_eq!(plan.enter, vec![2]);
        assert!(plan.exit.is_empty());
        assert_eq!(plan.resulting_len(), 3);
    }

    #[test]
    fn test_index_join_shrink() {
        let plan = reconcile(&[1, 2, 3], &[9], JoinBy::Index);
        assert_eq!(plan.update, vec![(0, 0)]);
        assert!(plan.enter.is_empty());
        assert_eq!(plan.exit, vec![1, 2]);
    }

    #[test]
    fn test_index_join_ignores_keys() {
        // A full window sliding by one: every element is updated in place
        let previous: Vec<i64> = (0..10).collect();
        let next: Vec<i64> = (1..11).collect();
        let plan = reconcile(&previous, &next, JoinBy::Index);
        assert_eq!(plan.update.len(), 10);
        assert!(plan.enter.is_empty() && plan.exit.is_empty());
    }

    #[test]
    fn test_key_join_sliding_window() {
        let previous: Vec<i64> = (0..10).collect();
        let next: Vec<i64> = (1..11).collect();
        let plan = reconcile(&previous, &next, JoinBy::Key);
        assert_eq!(plan.exit, vec![0]);
        assert_eq!(plan.enter, vec![9]);
        assert_eq!(plan.update.len(), 9);
        assert_eq!(plan.update[0], (1, 0));
    }

    #[test]
    fn test_key_join_duplicates() {
        let plan = reconcile(&[5, 5], &[5, 5, 5], JoinBy::Key);
        assert_eq!(plan.update, vec![(0, 0)]);
        assert_eq!(plan.enter, vec![1, 2]);
        assert_eq!(plan.exit, vec![1]);
    }

    #[test]
    fn test_empty_to_empty() {
        let empty: [i64; 0] = [];
        assert_eq!(reconcile(&empty, &empty, JoinBy::Key), JoinPlan::default());
        assert_eq!(reconcile(&empty, &empty, JoinBy::Index), JoinPlan::default());
    }
}
