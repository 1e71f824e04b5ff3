//! Scoped worker pool.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Apply `f` to every item on up to `workers` scoped threads.
///
/// Workers pull indices from a shared cursor and keep their results locally;
/// the merged results come back in input order.
pub fn map_ordered<T, R, F>(items: &[T], workers: usize, f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    let workers = workers.clamp(1, items.len().max(1));
    if workers == 1 {
        return items.iter().map(&f).collect();
    }

    let next = AtomicUsize::new(0);
    let (next, f) = (&next, &f);
    let mut indexed: Vec<(usize, R)> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                scope.spawn(move || {
                    let mut local = Vec::new();
                    loop {
                        let idx = next.fetch_add(1, Ordering::Relaxed);
                        let Some(item) = items.get(idx) else {
                            return local;
                        };
                        local.push((idx, f(item)));
                    }
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
            })
            .collect()
    });

    indexed.sort_by_key(|(idx, _)| *idx);
    indexed.into_iter().map(|(_, result)| result).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preserves_input_order() {
        let items: Vec<usize> = (0..200).collect();
        let doubled = map_ordered(&items, 8, |n| n * 2);
        assert_eq!(doubled, items.iter().map(|n| n * 2).collect::<Vec<_>>());
    }

    #[test]
    fn test_single_worker_and_empty_input() {
        assert_eq!(map_ordered(&[1, 2, 3], 1, |n| n + 1), vec![2, 3, 4]);
        assert!(map_ordered(&[] as &[u8], 4, |n| *n).is_empty());
    }

    #[test]
    fn test_more_workers_than_items() {
        assert_eq!(map_ordered(&["a"], 16, |s| s.len()), vec![1]);
    }
}
