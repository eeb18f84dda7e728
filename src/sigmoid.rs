/// Precomputed lookup approximating `2/(1+exp(2*sigma*x))`, the RankNet
/// pairwise gradient magnitude `|lambda|`, over a bounded range
/// (SPEC_FULL.md §4.2). Built once per objective from the sigmoid
/// parameter (`learning_rate`) and reused across every iteration and query.
#[derive(Debug, Clone)]
pub struct SigmoidTable {
    table: Vec<f64>,
    min_score: f64,
    max_score: f64,
    score_to_index_factor: f64,
}

const SIGMOID_BINS: usize = 1_000_000;
/// Exponent below which `exp(x)` is treated as zero.
const SATURATION_EXPONENT: f64 = 50.0;

impl SigmoidTable {
    pub fn new(sigma: f64) -> Self {
        let min_score = -SATURATION_EXPONENT / (2.0 * sigma);
        let max_score = SATURATION_EXPONENT / (2.0 * sigma);
        let step = (max_score - min_score) / SIGMOID_BINS as f64;

        let mut table = Vec::with_capacity(SIGMOID_BINS);
        for i in 0..SIGMOID_BINS {
            let x = min_score + i as f64 * step;
            let value = if x > 0.0 {
                2.0 - 2.0 / (1.0 + (-2.0 * sigma * x).exp())
            } else {
                2.0 / (1.0 + (2.0 * sigma * x).exp())
            };
            table.push(value);
        }

        SigmoidTable {
            table,
            min_score,
            max_score,
            score_to_index_factor: SIGMOID_BINS as f64 / (max_score - min_score),
        }
    }

    pub fn min_sigmoid(&self) -> f64 {
        self.table[0]
    }

    pub fn max_sigmoid(&self) -> f64 {
        self.table[SIGMOID_BINS - 1]
    }

    /// Saturating lookup of `|lambda|` for a score difference `x`.
    pub fn lookup(&self, x: f64) -> f64 {
        if x <= self.min_score {
            return self.min_sigmoid();
        }
        if x >= self.max_score {
            return self.max_sigmoid();
        }
        let index = ((x - self.min_score) * self.score_to_index_factor) as usize;
        self.table[index.min(SIGMOID_BINS - 1)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saturates_below_min_score() {
        let table = SigmoidTable::new(0.5);
        assert_eq!(table.lookup(table.min_score - 1.0), table.min_sigmoid());
    }

    #[test]
    fn saturates_above_max_score() {
        let table = SigmoidTable::new(0.5);
        assert_eq!(table.lookup(table.max_score + 1.0), table.max_sigmoid());
    }

    #[test]
    fn symmetric_around_zero() {
        let table = SigmoidTable::new(0.3);
        let pos = table.lookup(2.0);
        let neg = table.lookup(-2.0);
        assert!((pos - (2.0 - neg)).abs() < 1e-6);
    }

    #[test]
    fn negative_score_diff_gives_larger_magnitude_than_positive() {
        // Scenario B: sigmoid evaluated at -1 should exceed +1's magnitude.
        let table = SigmoidTable::new(0.5);
        assert!(table.lookup(-1.0) > table.lookup(1.0));
    }

    #[test]
    fn monotonically_decreasing() {
        let table = SigmoidTable::new(0.2);
        let mut prev = f64::INFINITY;
        for x in [-10.0, -5.0, -1.0, 0.0, 1.0, 5.0, 10.0] {
            let v = table.lookup(x);
            assert!(v <= prev + 1e-12);
            prev = v;
        }
    }
}
