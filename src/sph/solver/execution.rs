use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// How the per-particle loops of a phase are evaluated.
///
/// Every helper returns only after all items are processed, which is the barrier between two phases.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Sequential,
    Parallel,
}

impl Default for ExecutionMode {
    fn default() -> Self {
        ExecutionMode::Parallel
    }
}

impl ExecutionMode {
    /// Evaluates `f` for `0..n`, results land in `out` in index order.
    pub(crate) fn map_indexed<T: Send>(self, n: usize, out: &mut Vec<T>, f: impl Fn(usize) -> T + Sync + Send) {
        match self {
            ExecutionMode::Sequential => {
                out.clear();
                out.extend((0..n).map(f));
            }
            ExecutionMode::Parallel => (0..n).into_par_iter().map(f).collect_into_vec(out),
        }
    }

    pub(crate) fn for_each_mut<T: Send>(self, items: &mut [T], f: impl Fn(&mut T) + Sync + Send) {
        match self {
            ExecutionMode::Sequential => items.iter_mut().for_each(f),
            ExecutionMode::Parallel => items.par_iter_mut().for_each(f),
        }
    }

    pub(crate) fn for_each_zip_mut<T: Send, U: Sync>(self, items: &mut [T], values: &[U], f: impl Fn(&mut T, &U) + Sync + Send) {
        assert_eq!(items.len(), values.len());
        match self {
            ExecutionMode::Sequential => items.iter_mut().zip(values.iter()).for_each(|(item, value)| f(item, value)),
            ExecutionMode::Parallel => items
                .par_iter_mut()
                .zip(values.par_iter())
                .for_each(|(item, value)| f(item, value)),
        }
    }
}
