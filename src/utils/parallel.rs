#[cfg(feature = "parallel")]
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::AdapterResult;

#[cfg(feature = "parallel")]
static PARALLEL_ENABLED: AtomicBool = AtomicBool::new(true);

const DEFAULT_CHUNK_SIZE: usize = 16;

pub fn preferred_chunk_size(total_items: usize) -> usize {
    if total_items == 0 {
        1
    } else {
        DEFAULT_CHUNK_SIZE.min(total_items.max(1))
    }
}

#[cfg(feature = "parallel")]
pub fn parallelism_enabled() -> bool {
    PARALLEL_ENABLED.load(Ordering::SeqCst)
}

#[cfg(not(feature = "parallel"))]
pub fn parallelism_enabled() -> bool {
    false
}

/// Toggles fan-out until the returned guard is dropped.
#[cfg(feature = "parallel")]
pub fn set_parallelism(enabled: bool) -> ParallelismGuard {
    let previous = PARALLEL_ENABLED.swap(enabled, Ordering::SeqCst);
    ParallelismGuard { previous }
}

#[cfg(not(feature = "parallel"))]
pub fn set_parallelism(_enabled: bool) -> ParallelismGuard {
    ParallelismGuard {}
}

pub struct ParallelismGuard {
    #[cfg(feature = "parallel")]
    previous: bool,
}

#[cfg(feature = "parallel")]
impl Drop for ParallelismGuard {
    fn drop(&mut self) {
        PARALLEL_ENABLED.store(self.previous, Ordering::SeqCst);
    }
}

#[cfg(not(feature = "parallel"))]
impl Drop for ParallelismGuard {
    fn drop(&mut self) {}
}

/// Maps `items` in order, fanning out over rayon when enabled.
pub(crate) fn ordered_map<T, R, F>(items: &[T], f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    #[cfg(feature = "parallel")]
    if parallelism_enabled() {
        use rayon::prelude::*;
        let chunk = preferred_chunk_size(items.len());
        return items.par_iter().with_min_len(chunk).map(f).collect();
    }
    items.iter().map(f).collect()
}

/// Fallible [`ordered_map`]; the error of the lowest failing item wins, so
/// the outcome does not depend on scheduling.
pub(crate) fn try_ordered_map<T, R, F>(items: &[T], f: F) -> AdapterResult<Vec<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> AdapterResult<R> + Sync + Send,
{
    ordered_map(items, f).into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AdapterError;

    #[test]
    fn map_preserves_order_either_way() {
        let items: Vec<u64> = (0..100).collect();
        let expected: Vec<u64> = items.iter().map(|x| x * 3).collect();
        {
            let _guard = set_parallelism(false);
            assert_eq!(ordered_map(&items, |x| x * 3), expected);
        }
        let _guard = set_parallelism(true);
        assert_eq!(ordered_map(&items, |x| x * 3), expected);
    }

    #[test]
    fn first_error_in_order_wins() {
        let items = [1u64, 2, 3, 4];
        let result = try_ordered_map(&items, |x| {
            if *x >= 2 {
                Err(AdapterError::InternalInvariantViolation(format!("item {x}")))
            } else {
                Ok(*x)
            }
        });
        assert_eq!(
            result,
            Err(AdapterError::InternalInvariantViolation("item 2".into()))
        );
    }
}
