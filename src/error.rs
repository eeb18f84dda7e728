use std::fmt;

/// Rejected before training starts; the dataset or options are malformed in a
/// way the caller needs to fix.
#[derive(Debug, Clone)]
pub enum ConfigError {
    GainMapTooShort { len: usize, min: usize },
    BadEarlyStoppingMetric { given: u32 },
    ZeroPruningWindow,
    BadTruncationLevel { given: usize },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::GainMapTooShort { len, min } => write!(
                f,
                "custom_gains has {} entries, need at least {}",
                len, min
            ),
            ConfigError::BadEarlyStoppingMetric { given } => write!(
                f,
                "early_stopping_metrics must be 1 or 3, got {}",
                given
            ),
            ConfigError::ZeroPruningWindow => write!(f, "pruning_window_size must be > 0"),
            ConfigError::BadTruncationLevel { given } => {
                write!(f, "ndcg_truncation_level must be > 0, got {}", given)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Found while building or indexing into a `Dataset`; indicates corrupt
/// input rather than a user-fixable option.
#[derive(Debug, Clone)]
pub enum DataError {
    BadBoundaries { query: usize },
    LabelOutOfRange { doc: usize, label: u32, gain_len: usize },
    LengthMismatch { field: &'static str, expected: usize, actual: usize },
    DupeGroupOutOfRange { query: usize, doc: usize, group: u32 },
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataError::BadBoundaries { query } => {
                write!(f, "boundaries are not non-decreasing at query {}", query)
            }
            DataError::LabelOutOfRange { doc, label, gain_len } => write!(
                f,
                "label {} at document {} is out of range for a gain map of length {}",
                label, doc, gain_len
            ),
            DataError::LengthMismatch { field, expected, actual } => write!(
                f,
                "{} has length {}, expected {}",
                field, actual, expected
            ),
            DataError::DupeGroupOutOfRange { query, doc, group } => write!(
                f,
                "query {}: document {} has dupe group {} outside [2, n_query+2)",
                query, doc, group
            ),
        }
    }
}

impl std::error::Error for DataError {}
