use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::config::LambdaRankConfig;
use crate::dataset::{Dataset, GainTable};
use crate::dcg::{compute_inverse_max_dcg, DiscountTable};
use crate::kernel::{compute_query, PerQueryScratch};
use crate::sigmoid::SigmoidTable;

/// Splits `slice` into one mutable chunk per query, using `boundaries`
/// (`Q+1` entries) the same way `Dataset::query_range` does -- queries own
/// disjoint, contiguous, variable-length ranges, so ordinary
/// `split_at_mut` recursion is enough; no raw pointers are needed to get
/// disjoint mutable access across threads (SPEC_FULL.md §9, "Unsafe
/// fixed-pointer block").
fn split_by_boundaries_mut<'a>(mut slice: &'a mut [f64], boundaries: &[usize]) -> Vec<&'a mut [f64]> {
    let mut out = Vec::with_capacity(boundaries.len().saturating_sub(1));
    let mut prev = 0;
    for &b in &boundaries[1..] {
        let len = b - prev;
        let (head, tail) = slice.split_at_mut(len);
        out.push(head);
        slice = tail;
        prev = b;
    }
    out
}

/// Fans the per-query kernel (`kernel::compute_query`) out across a
/// rayon thread pool and owns the aggregated per-iteration state
/// (SPEC_FULL.md §4.6). Reads are shared across workers; every write target
/// (`gradient`, `weights`, `inverse_max_dcg`, `top_labels`) is split into
/// disjoint per-query slices before the parallel fan-out, so no locking is
/// needed inside the hot loop -- only the per-thread scratch pool (rarely
/// contended; see `PerQueryScratch`) uses a `Mutex`.
pub struct LambdaRankObjective {
    dataset: Dataset,
    gains: GainTable,
    discount: DiscountTable,
    sigmoid: SigmoidTable,
    config: LambdaRankConfig,
    inverse_max_dcg: Vec<f64>,
    gradient: Vec<f64>,
    weights: Vec<f64>,
    top_labels: Vec<[u32; 3]>,
    scratch: Vec<Mutex<PerQueryScratch>>,
    iteration: AtomicU64,
}

impl LambdaRankObjective {
    pub fn new(dataset: Dataset, gains: GainTable, config: LambdaRankConfig) -> Self {
        let discount = match &config.position_discount_freeform {
            Some(values) => DiscountTable::from_freeform(values.clone()),
            None => DiscountTable::default_log(dataset.max_docs_per_query()),
        };
        let sigmoid = SigmoidTable::new(config.learning_rate);
        let inverse_max_dcg = compute_inverse_max_dcg(
            &dataset,
            &gains,
            &discount,
            config.ndcg_truncation_level,
            config.use_dcg,
        );
        let num_docs = dataset.num_docs();
        let num_queries = dataset.num_queries();
        let num_threads = rayon::current_num_threads().max(1);
        let max_docs_per_query = dataset.max_docs_per_query();

        LambdaRankObjective {
            dataset,
            gains,
            discount,
            sigmoid,
            config,
            inverse_max_dcg,
            gradient: vec![0.0; num_docs],
            weights: vec![0.0; num_docs],
            top_labels: vec![[0u32; 3]; num_queries],
            scratch: (0..num_threads)
                .map(|_| Mutex::new(PerQueryScratch::with_capacity(max_docs_per_query)))
                .collect(),
            iteration: AtomicU64::new(0),
        }
    }

    pub fn iteration(&self) -> u64 {
        self.iteration.load(Ordering::SeqCst)
    }

    /// Always zero in this core; preserved as a reserved hook per
    /// SPEC_FULL.md §9 ("`baseline_dcg_gap` is always zero ... do not
    /// synthesise non-zero values"). Never assigned from elsewhere.
    pub fn baseline_dcg_gap(&self) -> f64 {
        0.0
    }

    pub fn top_labels_per_query(&self) -> HashMap<usize, [u32; 3]> {
        self.top_labels
            .iter()
            .enumerate()
            .map(|(q, labels)| (q, *labels))
            .collect()
    }

    /// Produces per-document lambdas and weights for the given scores
    /// (SPEC_FULL.md §4.6). Advances the iteration counter exactly once,
    /// before dispatch.
    pub fn get_gradient(&mut self, scores: &[f64]) -> (&[f64], &[f64]) {
        assert_eq!(scores.len(), self.dataset.num_docs());
        self.iteration.fetch_add(1, Ordering::SeqCst);

        let boundaries: Vec<usize> = (0..=self.dataset.num_queries())
            .map(|q| {
                if q == self.dataset.num_queries() {
                    self.dataset.num_docs()
                } else {
                    self.dataset.query_range(q).start
                }
            })
            .collect();

        let gradient_chunks = split_by_boundaries_mut(&mut self.gradient, &boundaries);
        let weights_chunks = split_by_boundaries_mut(&mut self.weights, &boundaries);

        let dataset = &self.dataset;
        let gains = &self.gains;
        let discount = &self.discount;
        let sigmoid = &self.sigmoid;
        let config = &self.config;
        let scratch = &self.scratch;

        gradient_chunks
            .into_par_iter()
            .zip(weights_chunks.into_par_iter())
            .zip(self.inverse_max_dcg.par_iter_mut())
            .zip(self.top_labels.par_iter_mut())
            .enumerate()
            .for_each(|(q, (((grad_chunk, weight_chunk), inv_dcg), top_labels))| {
                let range = dataset.query_range(q);
                let thread = rayon::current_thread_index().unwrap_or(0) % scratch.len().max(1);
                let mut guard = scratch[thread].lock().expect("scratch mutex poisoned");

                let query_labels = &dataset.labels()[range.clone()];
                let query_dupe_ids = dataset.dupe_ids().map(|ids| &ids[range.clone()]);
                let query_scores = &scores[range];

                let result = compute_query(
                    query_labels,
                    query_dupe_ids,
                    gains,
                    discount,
                    sigmoid,
                    config,
                    inv_dcg,
                    query_scores,
                    grad_chunk,
                    weight_chunk,
                    &mut guard,
                );

                *top_labels = result.top_labels;
            });

        (&self.gradient, &self.weights)
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn config(&self) -> &LambdaRankConfig {
        &self.config
    }

    pub fn inverse_max_dcg(&self) -> &[f64] {
        &self.inverse_max_dcg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset_two_queries() -> (Dataset, GainTable) {
        let gains = GainTable::from_values(vec![0.0, 1.0, 3.0, 7.0]);
        let dataset =
            Dataset::try_new(vec![0, 2, 5], vec![2, 0, 1, 0, 3], None, &gains).unwrap();
        (dataset, gains)
    }

    #[test]
    fn gradient_sums_to_zero_per_query_without_normalisation() {
        let (dataset, gains) = dataset_two_queries();
        let config = LambdaRankConfig::default();
        let mut objective = LambdaRankObjective::new(dataset, gains, config);
        let scores = vec![1.0, 0.2, 0.9, 0.1, 0.5];
        let (gradient, weights) = objective.get_gradient(&scores);

        let q0: f64 = gradient[0..2].iter().sum();
        let q1: f64 = gradient[2..5].iter().sum();
        assert!(q0.abs() < 1e-9);
        assert!(q1.abs() < 1e-9);
        assert!(weights.iter().all(|&w| w >= 0.0));
    }

    #[test]
    fn iteration_counter_advances_once_per_call() {
        let (dataset, gains) = dataset_two_queries();
        let config = LambdaRankConfig::default();
        let mut objective = LambdaRankObjective::new(dataset, gains, config);
        let scores = vec![1.0, 0.2, 0.9, 0.1, 0.5];
        assert_eq!(objective.iteration(), 0);
        objective.get_gradient(&scores);
        assert_eq!(objective.iteration(), 1);
        objective.get_gradient(&scores);
        assert_eq!(objective.iteration(), 2);
    }

    #[test]
    fn top_labels_captured_per_query() {
        let (dataset, gains) = dataset_two_queries();
        let config = LambdaRankConfig::default();
        let mut objective = LambdaRankObjective::new(dataset, gains, config);
        let scores = vec![1.0, 0.2, 0.9, 0.1, 0.5];
        objective.get_gradient(&scores);
        let top = objective.top_labels_per_query();
        assert_eq!(top.len(), 2);
    }

    #[test]
    fn inverse_max_dcg_independent_of_scores_when_not_shifted() {
        let (dataset, gains) = dataset_two_queries();
        let config = LambdaRankConfig::default();
        let mut objective = LambdaRankObjective::new(dataset, gains, config);
        let before = objective.inverse_max_dcg().to_vec();
        let scores_a = vec![1.0, 0.2, 0.9, 0.1, 0.5];
        let scores_b = vec![0.1, 0.9, 0.0, 0.8, 0.3];
        objective.get_gradient(&scores_a);
        let after_a = objective.inverse_max_dcg().to_vec();
        objective.get_gradient(&scores_b);
        let after_b = objective.inverse_max_dcg().to_vec();
        assert_eq!(before, after_a);
        assert_eq!(after_a, after_b);
    }
}
