use crate::dataset::{Dataset, GainTable};

/// Per-position discount, `discount[d] = 1/log(2+d)` by default, or a
/// user-supplied override (`position_discount_freeform`).
#[derive(Debug, Clone)]
pub struct DiscountTable {
    values: Vec<f64>,
}

impl DiscountTable {
    pub fn default_log(max_docs_per_query: usize) -> Self {
        let values = (0..max_docs_per_query)
            .map(|d| 1.0 / ((2 + d) as f64).ln())
            .collect();
        DiscountTable { values }
    }

    pub fn from_freeform(values: Vec<f64>) -> Self {
        DiscountTable { values }
    }

    /// Position `d` is in `[0, max_docs_per_query)` by construction; any
    /// lookup past the table has no discounted position to return to, so
    /// this returns 0 rather than panicking deep in the pairwise loop.
    pub fn get(&self, d: usize) -> f64 {
        self.values.get(d).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

/// DCG@k over labels already in rank order (whatever that order is --
/// ideal-sorted for max-DCG, or an ensemble's actual ranking for the NDCG
/// evaluators in `ndcg.rs`).
pub fn dcg_over_ranked_labels(
    ranked_labels: &[u32],
    gains: &GainTable,
    discount: &DiscountTable,
    truncation: usize,
) -> f64 {
    ranked_labels
        .iter()
        .take(truncation)
        .enumerate()
        .map(|(rank, &label)| gains.gain(label) * discount.get(rank))
        .sum()
}

/// Ideal DCG@k for one query: sort its labels descending (stable, so equal
/// labels keep dataset order) and sum the discounted gain up to
/// `truncation`.
pub fn ideal_dcg_for_query(
    labels: &[u32],
    gains: &GainTable,
    discount: &DiscountTable,
    truncation: usize,
) -> f64 {
    let mut sorted: Vec<u32> = labels.to_vec();
    sorted.sort_by(|a, b| b.cmp(a));
    dcg_over_ranked_labels(&sorted, gains, discount, truncation)
}

/// `inverse_max_dcg[q]` for every query in the dataset (SPEC_FULL.md §4.1).
/// A query with no positive-gain label gets `inverse_max_dcg[q] = 0` (§7,
/// "Query with no positive-label documents") rather than dividing by zero.
/// If `use_dcg`, every entry is 1 so the objective optimises raw DCG.
pub fn compute_inverse_max_dcg(
    dataset: &Dataset,
    gains: &GainTable,
    discount: &DiscountTable,
    truncation: usize,
    use_dcg: bool,
) -> Vec<f64> {
    if use_dcg {
        return vec![1.0; dataset.num_queries()];
    }
    (0..dataset.num_queries())
        .map(|q| {
            let range = dataset.query_range(q);
            let labels = &dataset.labels()[range];
            let dcg = ideal_dcg_for_query(labels, gains, discount, truncation);
            if dcg > 0.0 {
                1.0 / dcg
            } else {
                0.0
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discount_matches_default_formula() {
        let d = DiscountTable::default_log(4);
        assert!((d.get(0) - 1.0 / 2f64.ln()).abs() < 1e-12);
        assert!((d.get(1) - 1.0 / 3f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn ideal_dcg_matches_scenario_a() {
        let gains = GainTable::from_values(vec![0.0, 1.0, 3.0]);
        let discount = DiscountTable::default_log(2);
        let dcg = ideal_dcg_for_query(&[2, 0], &gains, &discount, 10);
        let expected = 3.0 * (1.0 / 2f64.ln());
        assert!((dcg - expected).abs() < 1e-9);
    }

    #[test]
    fn empty_gain_query_has_zero_inverse_max_dcg() {
        let gains = GainTable::from_values(vec![0.0, 0.0, 0.0, 0.0, 0.0]);
        let discount = DiscountTable::default_log(2);
        use crate::dataset::Dataset;
        let ds = Dataset::try_new(vec![0, 2], vec![0, 0], None, &gains).unwrap();
        let inv = compute_inverse_max_dcg(&ds, &gains, &discount, 10, false);
        assert_eq!(inv, vec![0.0]);
    }

    #[test]
    fn use_dcg_forces_all_ones() {
        let gains = GainTable::exponential(5);
        let discount = DiscountTable::default_log(2);
        use crate::dataset::Dataset;
        let ds = Dataset::try_new(vec![0, 2, 4], vec![3, 1, 2, 0], None, &gains).unwrap();
        let inv = compute_inverse_max_dcg(&ds, &gains, &discount, 10, true);
        assert_eq!(inv, vec![1.0, 1.0]);
    }
}
