/// Abstract accessor for a grown regression tree's leaf outputs. Tree
/// induction itself is out of scope (SPEC_FULL.md §1); the adjuster only
/// needs to read and rewrite leaf values by index.
pub trait TreeLeaves {
    fn num_leaves(&self) -> usize;
    fn leaf_output(&self, leaf: usize) -> f64;
    fn set_leaf_output(&mut self, leaf: usize, value: f64);
}

/// Abstract accessor for which documents a leaf's partition covers; the
/// outer boosting driver owns the actual partitioning data structure.
pub trait LeafPartitioning {
    fn documents_in_leaf(&self, leaf: usize) -> &[usize];
}

/// `global_mean(dataset, tree, partitioning, weights, filter_zero_lambdas)`
/// from SPEC_FULL.md §6.1: one mean per leaf, masking out zero-weight
/// documents when `filter_zero_lambdas` is set. A possibly-distributed
/// reducer is out of scope; this crate only depends on the trait.
pub trait GlobalMeanReducer {
    fn global_mean(
        &self,
        partitioning: &dyn LeafPartitioning,
        num_leaves: usize,
        weights: &[f64],
        filter_zero_lambdas: bool,
    ) -> Vec<f64>;
}

/// Default single-process reducer: the mean of `weights` over each leaf's
/// documents, skipping zero-weight documents when asked to.
pub struct LocalMeanReducer;

impl GlobalMeanReducer for LocalMeanReducer {
    fn global_mean(
        &self,
        partitioning: &dyn LeafPartitioning,
        num_leaves: usize,
        weights: &[f64],
        filter_zero_lambdas: bool,
    ) -> Vec<f64> {
        (0..num_leaves)
            .map(|leaf| {
                let docs = partitioning.documents_in_leaf(leaf);
                let mut sum = 0.0;
                let mut count = 0usize;
                for &doc in docs {
                    let w = weights[doc];
                    if filter_zero_lambdas && w == 0.0 {
                        continue;
                    }
                    sum += w;
                    count += 1;
                }
                if count > 0 {
                    sum / count as f64
                } else {
                    0.0
                }
            })
            .collect()
    }
}

/// `(output + eps) / (2*mean + eps)` floor used to avoid a literal
/// division-by-zero when a leaf's masked mean collapses to zero.
const LINE_SEARCH_EPS: f64 = 1.4e-45;

/// Rescales every leaf of `tree` along the Newton-step direction
/// (SPEC_FULL.md §4.7), after each tree is grown. When
/// `best_step_ranking_regression_trees` is set the tree's own outputs are
/// already Newton-optimal, so only the clamp runs.
pub fn adjust_tree_outputs(
    tree: &mut dyn TreeLeaves,
    partitioning: &dyn LeafPartitioning,
    weights: &[f64],
    reducer: &dyn GlobalMeanReducer,
    best_step_ranking_regression_trees: bool,
    filter_zero_lambdas: bool,
    max_tree_output: f64,
) {
    let num_leaves = tree.num_leaves();
    let means = if best_step_ranking_regression_trees {
        None
    } else {
        Some(reducer.global_mean(partitioning, num_leaves, weights, filter_zero_lambdas))
    };

    for leaf in 0..num_leaves {
        let raw = tree.leaf_output(leaf);
        let rescaled = match &means {
            Some(means) => (raw + LINE_SEARCH_EPS) / (2.0 * means[leaf] + LINE_SEARCH_EPS),
            None => raw,
        };
        let clamped = rescaled.max(-max_tree_output).min(max_tree_output);
        tree.set_leaf_output(leaf, clamped);
    }
}
