use ordered_float::NotNan;
use std::cmp::Ordering;

/// Total, deterministic order over one query's documents: score descending,
/// then label ascending (so a lower-label duplicate ranks first on ties --
/// conservative for NDCG), then raw index ascending for final stability.
///
/// Shaped after the teacher crate's own `RankedInstance` comparator
/// (`score` desc, `gain` asc, `identifier` asc); generalized here to index
/// rather than own the score/label values, since the permutation sorter
/// sorts indices into caller-owned `scores`/`labels` slices instead of a
/// freestanding struct per document.
fn compare_documents(scores: &[f64], labels: &[u32], offset: usize, a: usize, b: usize) -> Ordering {
    let sa = NotNan::new(scores[offset + a]).expect("scores must never be NaN");
    let sb = NotNan::new(scores[offset + b]).expect("scores must never be NaN");
    let cmp = sb.cmp(&sa);
    if cmp != Ordering::Equal {
        return cmp;
    }
    let cmp = labels[offset + a].cmp(&labels[offset + b]);
    if cmp != Ordering::Equal {
        return cmp;
    }
    a.cmp(&b)
}

/// Sorts `perm[0..n)` (indices relative to `offset`) into the order defined
/// by `compare_documents` over `scores`/`labels` (SPEC_FULL.md §4.3).
pub fn permutation_sort(perm: &mut [usize], scores: &[f64], labels: &[u32], offset: usize) {
    perm.sort_by(|&a, &b| compare_documents(scores, labels, offset, a, b));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_by_score_descending() {
        let scores = vec![0.1, 0.9, 0.5];
        let labels = vec![0, 0, 0];
        let mut perm: Vec<usize> = (0..3).collect();
        permutation_sort(&mut perm, &scores, &labels, 0);
        assert_eq!(perm, vec![1, 2, 0]);
    }

    #[test]
    fn ties_broken_by_label_ascending() {
        let scores = vec![1.0, 1.0];
        let labels = vec![3, 1];
        let mut perm: Vec<usize> = (0..2).collect();
        permutation_sort(&mut perm, &scores, &labels, 0);
        // index 1 has the lower label, so it sorts first on the score tie.
        assert_eq!(perm, vec![1, 0]);
    }

    #[test]
    fn final_tiebreak_is_raw_index() {
        let scores = vec![1.0, 1.0, 1.0];
        let labels = vec![2, 2, 2];
        let mut perm: Vec<usize> = (0..3).collect();
        permutation_sort(&mut perm, &scores, &labels, 0);
        assert_eq!(perm, vec![0, 1, 2]);
    }

    #[test]
    fn respects_offset_into_larger_arrays() {
        let scores = vec![9.0, 9.0, 0.2, 0.8, 0.5];
        let labels = vec![0, 0, 0, 0, 0];
        let mut perm: Vec<usize> = (0..3).collect();
        permutation_sort(&mut perm, &scores, &labels, 2);
        assert_eq!(perm, vec![1, 2, 0]);
    }

    #[test]
    fn total_order_is_antisymmetric_and_transitive() {
        let scores = vec![3.0, 1.0, 2.0, 2.0];
        let labels = vec![0, 0, 1, 0];
        for a in 0..4 {
            for b in 0..4 {
                let ab = compare_documents(&scores, &labels, 0, a, b);
                let ba = compare_documents(&scores, &labels, 0, b, a);
                assert_eq!(ab, ba.reverse());
            }
        }
    }
}
