use crate::error::DataError;

/// Reserved `dupe_ids` sentinel values (SPEC_FULL.md §4.4); anything else
/// `>= 2` is a duplicate-group id local to its query.
pub const DUPE_NO_INFO: u32 = 0;
pub const DUPE_UNIQUE: u32 = 1;
pub const DUPE_FORMAT_UNSUPPORTED: u32 = 1_000_000;
pub const DUPE_NOT_FOUND: u32 = 1_000_001;

pub fn is_dupe_sentinel(group: u32) -> bool {
    matches!(
        group,
        DUPE_NO_INFO | DUPE_UNIQUE | DUPE_FORMAT_UNSUPPORTED | DUPE_NOT_FOUND
    )
}

/// Per-label relevance gain, `gain[l] = 2^l - 1` by default. Owned and
/// threaded explicitly wherever gains are needed, rather than installed into
/// process-wide state the way the system this is adapted from does (see
/// SPEC_FULL.md §9, "Global mutable label-gain map").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GainTable {
    gains: Vec<f64>,
}

impl GainTable {
    pub fn exponential(num_grades: usize) -> Self {
        let gains = (0..num_grades).map(|l| 2f64.powi(l as i32) - 1.0).collect();
        GainTable { gains }
    }

    /// Caller is responsible for the `>= 5 entries` configuration check
    /// (`LambdaRankConfig::validate`); this constructor just stores them.
    pub fn from_values(gains: Vec<f64>) -> Self {
        GainTable { gains }
    }

    pub fn len(&self) -> usize {
        self.gains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gains.is_empty()
    }

    pub fn gain(&self, label: u32) -> f64 {
        self.gains[label as usize]
    }

    pub fn get(&self, label: u32) -> Option<f64> {
        self.gains.get(label as usize).copied()
    }
}

impl Default for GainTable {
    fn default() -> Self {
        GainTable::exponential(32)
    }
}

/// Read-only query-grouped feature label dataset (SPEC_FULL.md §3). Does not
/// hold feature vectors: the objective only ever needs labels, optional
/// duplicate-group ids, and the boundaries that group documents into
/// queries -- feature binning and tree induction are out of scope (§1).
#[derive(Debug, Clone)]
pub struct Dataset {
    boundaries: Vec<usize>,
    labels: Vec<u32>,
    dupe_ids: Option<Vec<u32>>,
    gain_labels: Vec<f64>,
}

impl Dataset {
    pub fn try_new(
        boundaries: Vec<usize>,
        labels: Vec<u32>,
        dupe_ids: Option<Vec<u32>>,
        gains: &GainTable,
    ) -> Result<Self, DataError> {
        if boundaries.is_empty() || boundaries[0] != 0 {
            return Err(DataError::BadBoundaries { query: 0 });
        }
        for q in 0..boundaries.len() - 1 {
            if boundaries[q + 1] < boundaries[q] {
                return Err(DataError::BadBoundaries { query: q });
            }
        }
        let n = *boundaries.last().unwrap();
        if labels.len() != n {
            return Err(DataError::LengthMismatch {
                field: "labels",
                expected: n,
                actual: labels.len(),
            });
        }
        if let Some(ids) = &dupe_ids {
            if ids.len() != n {
                return Err(DataError::LengthMismatch {
                    field: "dupe_ids",
                    expected: n,
                    actual: ids.len(),
                });
            }
        }

        let mut gain_labels = Vec::with_capacity(n);
        for (i, &label) in labels.iter().enumerate() {
            match gains.get(label) {
                Some(g) => gain_labels.push(g),
                None => {
                    return Err(DataError::LabelOutOfRange {
                        doc: i,
                        label,
                        gain_len: gains.len(),
                    })
                }
            }
        }

        if let Some(ids) = &dupe_ids {
            for q in 0..boundaries.len() - 1 {
                let (begin, end) = (boundaries[q], boundaries[q + 1]);
                let n_query = end - begin;
                for doc in begin..end {
                    let group = ids[doc];
                    if is_dupe_sentinel(group) {
                        continue;
                    }
                    let local = group.wrapping_sub(2) as usize;
                    if local >= n_query {
                        return Err(DataError::DupeGroupOutOfRange {
                            query: q,
                            doc,
                            group,
                        });
                    }
                }
            }
        }

        Ok(Dataset {
            boundaries,
            labels,
            dupe_ids,
            gain_labels,
        })
    }

    pub fn num_queries(&self) -> usize {
        self.boundaries.len() - 1
    }

    pub fn num_docs(&self) -> usize {
        *self.boundaries.last().unwrap()
    }

    pub fn max_docs_per_query(&self) -> usize {
        (0..self.num_queries())
            .map(|q| self.query_range(q).len())
            .max()
            .unwrap_or(0)
    }

    /// `[begin, end)` document index range owned by query `q`.
    pub fn query_range(&self, q: usize) -> std::ops::Range<usize> {
        self.boundaries[q]..self.boundaries[q + 1]
    }

    pub fn labels(&self) -> &[u32] {
        &self.labels
    }

    pub fn gain_labels(&self) -> &[f64] {
        &self.gain_labels
    }

    pub fn dupe_ids(&self) -> Option<&[u32]> {
        self.dupe_ids.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gains() -> GainTable {
        GainTable::exponential(8)
    }

    #[test]
    fn rejects_bad_boundaries() {
        let err = Dataset::try_new(vec![0, 3, 2], vec![0, 1, 2], None, &gains());
        assert!(err.is_err());
    }

    #[test]
    fn rejects_label_out_of_range() {
        let small_gains = GainTable::exponential(2);
        let err = Dataset::try_new(vec![0, 2], vec![0, 5], None, &small_gains);
        assert!(matches!(err, Err(DataError::LabelOutOfRange { .. })));
    }

    #[test]
    fn rejects_dupe_group_out_of_range() {
        let err = Dataset::try_new(vec![0, 2], vec![1, 1], Some(vec![5, 1]), &gains());
        assert!(matches!(err, Err(DataError::DupeGroupOutOfRange { .. })));
    }

    #[test]
    fn accepts_well_formed_dataset() {
        let ds = Dataset::try_new(vec![0, 2, 3], vec![2, 0, 1], Some(vec![2, 2, 1]), &gains())
            .unwrap();
        assert_eq!(ds.num_queries(), 2);
        assert_eq!(ds.num_docs(), 3);
        assert_eq!(ds.query_range(0), 0..2);
        assert_eq!(ds.query_range(1), 2..3);
    }
}
