use crate::error::ConfigError;

/// Selects between `TestHistory` and `TestWindowWithTolerance` for early
/// stopping; see §6.2 `enable_pruning` / `use_tolerant_pruning`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PruningStrategy {
    None,
    History,
    ToleratedWindow,
}

/// Every knob from SPEC_FULL.md §6.2, aggregated into one value the outer
/// driver deserializes once, the way `TrainRequest` is the single JSON
/// options object consumed at fastrank's `train_model` boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LambdaRankConfig {
    /// Overrides the default `gain[l] = 2^l - 1` map; must have >= 5 entries.
    pub custom_gains: Option<Vec<f64>>,
    /// k for DCG@k used in max-DCG and pairwise weighting.
    pub ndcg_truncation_level: usize,
    /// If true, `inverse_max_dcg[q] = 1` for all q (optimise raw DCG).
    pub use_dcg: bool,
    /// Doubles as the sigmoid table's sigma parameter.
    pub learning_rate: f64,
    /// 'c' enables continuous-weighted RankNet score mutation; anything
    /// else (conventionally '0') leaves scores untouched.
    pub cost_function_param: char,
    /// Multiplies Δndcg by |i - j| (§4.5 step 8).
    pub distance_weight_2: bool,
    /// Applies per-query lambda normalisation (§4.5 step 9).
    pub normalize_query_lambdas: bool,
    /// Enables duplicate suppression (§4.4); requires `dupe_ids` on the
    /// dataset to have any effect.
    pub use_shifted_ndcg: bool,
    /// Excludes zero-lambda documents from tree fitting (honoured by the
    /// out-of-scope outer loop; surfaced here as a flag only).
    pub filter_zero_lambdas: bool,
    /// 1 or 3; which NDCG@k feeds early stopping. `None` disables pruning.
    pub early_stopping_metric: Option<u32>,
    pub pruning: PruningStrategy,
    pub pruning_window_size: usize,
    pub pruning_threshold: f64,
    /// Lasso-based ensemble compression; accepted for config round-trip
    /// fidelity (§9 open question) but not implemented by this crate, since
    /// it operates on the trained ensemble, not the per-iteration objective.
    pub compress_ensemble: bool,
    /// Disables global-mean normalisation in line-search, leaving only the
    /// clamp.
    pub best_step_ranking_regression_trees: bool,
    /// Clamp bound for `adjust_tree_outputs`.
    pub max_tree_output: f64,
    /// Optional override for `discount[d]`; if unset, `1/log(2+d)`.
    pub position_discount_freeform: Option<Vec<f64>>,
}

impl Default for LambdaRankConfig {
    fn default() -> Self {
        LambdaRankConfig {
            custom_gains: None,
            ndcg_truncation_level: 10,
            use_dcg: false,
            learning_rate: 0.2,
            cost_function_param: '0',
            distance_weight_2: false,
            normalize_query_lambdas: false,
            use_shifted_ndcg: false,
            filter_zero_lambdas: false,
            early_stopping_metric: None,
            pruning: PruningStrategy::None,
            pruning_window_size: 5,
            pruning_threshold: 0.01,
            compress_ensemble: false,
            best_step_ranking_regression_trees: false,
            max_tree_output: 100.0,
            position_discount_freeform: None,
        }
    }
}

impl LambdaRankConfig {
    /// Rejects configurations the objective cannot act on; run once before
    /// training, the way fastrank validates its `TrainRequest` up front
    /// rather than deep inside the training loop.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(gains) = &self.custom_gains {
            if gains.len() < 5 {
                return Err(ConfigError::GainMapTooShort {
                    len: gains.len(),
                    min: 5,
                });
            }
        }
        if self.ndcg_truncation_level == 0 {
            return Err(ConfigError::BadTruncationLevel {
                given: self.ndcg_truncation_level,
            });
        }
        if let Some(metric) = self.early_stopping_metric {
            if metric != 1 && metric != 3 {
                return Err(ConfigError::BadEarlyStoppingMetric { given: metric });
            }
        }
        if self.pruning == PruningStrategy::ToleratedWindow && self.pruning_window_size == 0 {
            return Err(ConfigError::ZeroPruningWindow);
        }
        Ok(())
    }

    pub fn is_continuous_cost(&self) -> bool {
        self.cost_function_param == 'c'
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(LambdaRankConfig::default().validate().is_ok());
    }

    #[test]
    fn short_gain_map_rejected() {
        let mut cfg = LambdaRankConfig::default();
        cfg.custom_gains = Some(vec![0.0, 1.0, 2.0]);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn bad_early_stopping_metric_rejected() {
        let mut cfg = LambdaRankConfig::default();
        cfg.early_stopping_metric = Some(2);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_pruning_window_rejected_only_when_tolerant() {
        let mut cfg = LambdaRankConfig::default();
        cfg.pruning_window_size = 0;
        assert!(cfg.validate().is_ok());
        cfg.pruning = PruningStrategy::ToleratedWindow;
        assert!(cfg.validate().is_err());
    }
}
