//! Run-length compaction over ordered sequences.
//!
//! [`compact_adjacent`] folds an ordered sequence into runs of items whose
//! keys compare equal to their immediate predecessor. Non-adjacent repeats
//! start a new run, so the input order must already be meaningful (by date,
//! by timestamp, ...).

use serde::Serialize;

/// A maximal stretch of adjacent items sharing one key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Run<K, T> {
    pub key: K,
    pub first: T,
    pub last: T,
    pub count: usize,
}

/// Folds `items` into runs of equal adjacent keys.
///
/// ```
/// use schoolbase_core::compact_adjacent;
///
/// let runs = compact_adjacent(vec![1, 1, 2, 1], |n| *n);
/// let counts: Vec<_> = runs.iter().map(|r| (r.key, r.count)).collect();
/// assert_eq!(counts, vec![(1, 2), (2, 1), (1, 1)]);
/// ```
pub fn compact_adjacent<T, K, I, F>(items: I, key_of: F) -> Vec<Run<K, T>>
where
    I: IntoIterator<Item = T>,
    T: Clone,
    K: PartialEq,
    F: Fn(&T) -> K,
{
    items.into_iter().fold(Vec::new(), |mut runs, item| {
        let key = key_of(&item);
        match runs.last_mut() {
            Some(run) if run.key == key => {
                run.last = item;
                run.count += 1;
            }
            _ => runs.push(Run {
                key,
                first: item.clone(),
                last: item,
                count: 1,
            }),
        }
        runs
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        let runs = compact_adjacent(Vec::<u8>::new(), |n| *n);
        assert!(runs.is_empty());
    }

    #[test]
    fn test_single_run() {
        let runs = compact_adjacent(vec!["a", "a", "a"], |s| s.to_string());
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].count, 3);
    }

    #[test]
    fn test_non_adjacent_repeats_are_separate_runs() {
        let runs = compact_adjacent(vec!['x', 'y', 'x'], |c| *c);
        assert_eq!(runs.len(), 3);
        assert!(runs.iter().all(|r| r.count == 1));
    }

    #[test]
    fn test_first_and_last_track_run_bounds() {
        let rows = vec![(1, "PRESENT"), (2, "PRESENT"), (3, "ABSENT"), (4, "ABSENT"), (5, "ABSENT")];
        let runs = compact_adjacent(rows, |(_, status)| *status);

        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].first.0, 1);
        assert_eq!(runs[0].last.0, 2);
        assert_eq!(runs[1].key, "ABSENT");
        assert_eq!(runs[1].first.0, 3);
        assert_eq!(runs[1].last.0, 5);
        assert_eq!(runs[1].count, 3);
    }

    #[test]
    fn test_counts_sum_to_input_length() {
        let input = vec![3, 3, 1, 2, 2, 2, 3];
        let runs = compact_adjacent(input.clone(), |n| *n);
        let total: usize = runs.iter().map(|r| r.count).sum();
        assert_eq!(total, input.len());
    }
}
