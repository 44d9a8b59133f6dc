//! Candidate split layout and missing-value injection.

use ndarray::Array2;

use super::dataset::DataError;

/// Caller-injected definition of "missing".
///
/// Continuous features use NaN; categorical features use a sentinel level
/// code that must not collide with a real level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingPolicy {
    /// Level code that marks a missing categorical value.
    pub cat_null: i32,
}

impl Default for MissingPolicy {
    fn default() -> Self {
        MissingPolicy { cat_null: -1 }
    }
}

impl MissingPolicy {
    #[inline]
    pub fn is_null_cat(&self, value: i32) -> bool {
        value == self.cat_null
    }

    #[inline]
    pub fn is_null_con(&self, value: f64) -> bool {
        value.is_nan()
    }
}

// =============================================================================
// CandidateSplits
// =============================================================================

/// Precomputed candidate-split layout for one training pass.
///
/// `con_splits` is an `n_con x n_bins` matrix of sorted bin boundaries;
/// `x <= con_splits[f, b]` defines continuous candidate `b` of feature `f`.
/// Categorical feature `f` contributes one candidate per level code in
/// `0..cat_levels[f]`, compared on the caller's canonical code order.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateSplits {
    con_splits: Array2<f64>,
    cat_levels: Vec<u32>,
    /// Exclusive prefix sum over `cat_levels`.
    cat_levels_cumsum: Vec<u32>,
    total_n_cat_levels: u32,
}

impl CandidateSplits {
    pub fn new(con_splits: Array2<f64>, cat_levels: Vec<u32>) -> Result<Self, DataError> {
        for (feature, row) in con_splits.rows().into_iter().enumerate() {
            let sorted = row.iter().zip(row.iter().skip(1)).all(|(a, b)| a <= b);
            if !sorted {
                return Err(DataError::UnsortedSplits { feature });
            }
        }
        let mut cumsum = Vec::with_capacity(cat_levels.len());
        let mut total = 0u32;
        for (feature, &levels) in cat_levels.iter().enumerate() {
            if levels == 0 {
                return Err(DataError::EmptyLevels { feature });
            }
            cumsum.push(total);
            total += levels;
        }
        Ok(CandidateSplits {
            con_splits,
            cat_levels,
            cat_levels_cumsum: cumsum,
            total_n_cat_levels: total,
        })
    }

    /// Layout with no continuous features.
    pub fn categorical_only(cat_levels: Vec<u32>) -> Result<Self, DataError> {
        Self::new(Array2::zeros((0, 0)), cat_levels)
    }

    /// Layout with no categorical features.
    pub fn continuous_only(con_splits: Array2<f64>) -> Result<Self, DataError> {
        Self::new(con_splits, Vec::new())
    }

    #[inline]
    pub fn n_con_features(&self) -> usize {
        self.con_splits.nrows()
    }

    #[inline]
    pub fn n_cat_features(&self) -> usize {
        self.cat_levels.len()
    }

    /// Candidate bins per continuous feature.
    #[inline]
    pub fn n_bins(&self) -> usize {
        self.con_splits.ncols()
    }

    #[inline]
    pub fn total_cat_levels(&self) -> u32 {
        self.total_n_cat_levels
    }

    /// Number of level codes of a categorical feature.
    #[inline]
    pub fn levels(&self, feature: usize) -> u32 {
        self.cat_levels[feature]
    }

    #[inline]
    pub fn cat_levels(&self) -> &[u32] {
        &self.cat_levels
    }

    /// Candidates of all categorical features preceding `feature`.
    #[inline]
    pub fn levels_before(&self, feature: usize) -> u32 {
        self.cat_levels_cumsum[feature]
    }

    #[inline]
    pub fn cat_levels_cumsum(&self) -> &[u32] {
        &self.cat_levels_cumsum
    }

    /// Bin boundary `bin` of continuous feature `feature`.
    #[inline]
    pub fn con_threshold(&self, feature: usize, bin: usize) -> f64 {
        self.con_splits[[feature, bin]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn missing_policy_defaults() {
        let policy = MissingPolicy::default();
        assert!(policy.is_null_cat(-1));
        assert!(!policy.is_null_cat(0));
        assert!(policy.is_null_con(f64::NAN));
        assert!(!policy.is_null_con(0.0));
    }

    #[test]
    fn cumsum_is_exclusive() {
        let splits = CandidateSplits::new(array![[1.0, 2.0]], vec![2, 3, 4]).unwrap();
        assert_eq!(splits.cat_levels_cumsum(), &[0, 2, 5]);
        assert_eq!(splits.total_cat_levels(), 9);
        assert_eq!(splits.levels_before(2), 5);
        assert_eq!(splits.n_bins(), 2);
        assert_eq!(splits.n_con_features(), 1);
    }

    #[test]
    fn rejects_unsorted_boundaries() {
        let err = CandidateSplits::continuous_only(array![[2.0, 1.0]]).unwrap_err();
        assert!(matches!(err, DataError::UnsortedSplits { feature: 0 }));
    }

    #[test]
    fn rejects_zero_level_feature() {
        let err = CandidateSplits::categorical_only(vec![2, 0]).unwrap_err();
        assert!(matches!(err, DataError::EmptyLevels { feature: 1 }));
    }
}
