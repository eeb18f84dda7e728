use crate::config::LambdaRankConfig;
use crate::dataset::GainTable;
use crate::dcg::{ideal_dcg_for_query, DiscountTable};
use crate::dupes::suppress_duplicates;
use crate::sigmoid::SigmoidTable;
use crate::sort::permutation_sort;
use std::borrow::Cow;

/// Per-thread reusable scratch for the per-query kernel (SPEC_FULL.md §3,
/// "Per-thread scratch"). Each worker owns one, indexed by thread index, so
/// no allocation happens inside the hot per-query loop.
#[derive(Debug, Clone, Default)]
pub struct PerQueryScratch {
    permutation: Vec<usize>,
}

impl PerQueryScratch {
    pub fn with_capacity(max_docs_per_query: usize) -> Self {
        PerQueryScratch {
            permutation: Vec::with_capacity(max_docs_per_query),
        }
    }
}

/// Diagnostic output of one query's kernel invocation.
#[derive(Debug, Clone, Copy)]
pub struct QueryKernelResult {
    /// Top-3 labels after the first score-sort, padded with 0 if the query
    /// has fewer than 3 documents.
    pub top_labels: [u32; 3],
    /// Mirrors the source's `num_actual_results` bookkeeping in continuous-
    /// cost mode: documents neutralised by duplicate suppression no longer
    /// count. Not consumed further downstream (see SPEC_FULL.md §9 on
    /// reserved/diagnostic fields); kept for callers that want it.
    pub num_actual_results: usize,
}

/// Produces `gradient`/`weights` for one query (SPEC_FULL.md §4.5).
/// `inverse_max_dcg` is read, and rewritten in place when shifted-NDCG or
/// continuous-cost mutates the ranking inputs.
///
/// Every array here is already sliced down to this query's own documents
/// by the caller (`objective::LambdaRankObjective::get_gradient`, which
/// splits the dataset-wide `gradient`/`weights` arrays into disjoint
/// per-query chunks before dispatch) -- the kernel itself never needs to
/// know the document's absolute position in the dataset, which keeps it
/// independently testable and avoids passing dataset-sized buffers into
/// every worker.
pub fn compute_query(
    labels: &[u32],
    dupe_ids: Option<&[u32]>,
    gains: &GainTable,
    discount: &DiscountTable,
    sigmoid: &SigmoidTable,
    config: &LambdaRankConfig,
    inverse_max_dcg: &mut f64,
    scores: &[f64],
    gradient: &mut [f64],
    weights: &mut [f64],
    scratch: &mut PerQueryScratch,
) -> QueryKernelResult {
    let n = labels.len();
    gradient[..n].iter_mut().for_each(|g| *g = 0.0);
    weights[..n].iter_mut().for_each(|w| *w = 0.0);

    let mut top_labels = [0u32; 3];
    if n == 0 {
        return QueryKernelResult {
            top_labels,
            num_actual_results: 0,
        };
    }

    let shifted = config.use_shifted_ndcg && dupe_ids.is_some();
    let continuous = config.is_continuous_cost();

    // Copies when an input may be mutated; borrowed views otherwise
    // (SPEC_FULL.md §4.5 step 2).
    let mut labels_view: Cow<[u32]> = if shifted {
        Cow::Owned(labels.to_vec())
    } else {
        Cow::Borrowed(labels)
    };
    let mut scores_view: Cow<[f64]> = if shifted || continuous {
        Cow::Owned(scores.to_vec())
    } else {
        Cow::Borrowed(scores)
    };

    scratch.permutation.clear();
    scratch.permutation.extend(0..n);
    permutation_sort(&mut scratch.permutation, &scores_view, &labels_view, 0);

    for (slot, &rel) in scratch.permutation.iter().take(3).enumerate() {
        top_labels[slot] = labels_view[rel];
    }

    let mut num_actual_results = n;

    if shifted {
        suppress_duplicates(
            &scratch.permutation,
            dupe_ids.expect("checked above"),
            labels_view.to_mut(),
            scores_view.to_mut(),
            0,
        );
    }

    if continuous {
        let g = gains.len() as f64;
        let labels_mut = labels_view.to_mut();
        let scores_mut = scores_view.to_mut();
        for i in 0..n {
            if scores_mut[i] == f64::NEG_INFINITY {
                num_actual_results -= 1;
            } else {
                let label = labels_mut[i] as f64;
                scores_mut[i] *= 1.0 - label / (20.0 * g);
            }
        }
    }

    if shifted || continuous {
        permutation_sort(&mut scratch.permutation, &scores_view, &labels_view, 0);
        let dcg = ideal_dcg_for_query(&labels_view, gains, discount, config.ndcg_truncation_level);
        *inverse_max_dcg = if dcg > 0.0 { 1.0 / dcg } else { 0.0 };
    }

    let perm = &scratch.permutation;
    let inv_max_dcg = *inverse_max_dcg;
    let mut lambda_sum = 0.0f64;

    for i in 0..n {
        for j in (i + 1)..n {
            let (pi, pj) = (perm[i], perm[j]);
            let (high, low, rank_hi, rank_lo) = if labels_view[pi] > labels_view[pj] {
                (pi, pj, i, j)
            } else if labels_view[pj] > labels_view[pi] {
                (pj, pi, j, i)
            } else {
                continue;
            };

            let delta_score = scores_view[high] - scores_view[low];
            let abs_lambda = sigmoid.lookup(delta_score);
            let w = abs_lambda * (2.0 - abs_lambda);

            let gain_high = gains.gain(labels_view[high]);
            let gain_low = gains.gain(labels_view[low]);
            let mut delta_ndcg = (gain_high - gain_low)
                * (discount.get(rank_hi) - discount.get(rank_lo)).abs()
                * inv_max_dcg;
            if config.distance_weight_2 {
                delta_ndcg *= (rank_hi as f64 - rank_lo as f64).abs();
            }

            gradient[high] += abs_lambda * delta_ndcg;
            gradient[low] -= abs_lambda * delta_ndcg;
            weights[high] += w * delta_ndcg;
            weights[low] += w * delta_ndcg;
            lambda_sum += abs_lambda * delta_ndcg;
        }
    }

    if config.normalize_query_lambdas && lambda_sum > 0.0 {
        let scale = 10.0 * (1.0 + lambda_sum).ln() / lambda_sum;
        for i in 0..n {
            gradient[i] *= scale;
            weights[i] *= scale;
        }
    }

    QueryKernelResult {
        top_labels,
        num_actual_results,
    }
}
