//! Date-ordered cross-validation with a purge gap.

use std::collections::BTreeSet;

use ronda_traits::{Date, Result, RondaError};

/// One train/validation split over dates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    /// Training dates, all strictly before the validation dates.
    pub train: BTreeSet<Date>,
    /// Validation dates, one contiguous block.
    pub validation: BTreeSet<Date>,
}

/// Expanding-window splitter over unique dates.
///
/// The sorted dates are cut into `n_splits + 1` contiguous blocks. Fold `k`
/// trains on blocks `0..=k` and validates on block `k + 1`, after dropping
/// the last `gap` training dates so that no training label (a forward return
/// over `gap` periods) reaches into the validation period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateOrderedSplit {
    n_splits: usize,
    gap: usize,
}

impl DateOrderedSplit {
    /// Splitter with `n_splits` folds and a purge of `gap` dates.
    pub const fn new(n_splits: usize, gap: usize) -> Self {
        Self { n_splits, gap }
    }

    /// Number of folds requested.
    pub const fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// Purge length in dates.
    pub const fn gap(&self) -> usize {
        self.gap
    }

    /// Folds over `dates` (deduplicated and sorted first).
    ///
    /// Folds whose purged training set is empty are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::InsufficientData`] when there are fewer dates
    /// than blocks or no fold keeps any training date.
    pub fn split(&self, dates: &[Date]) -> Result<Vec<Fold>> {
        let unique: Vec<Date> = dates.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        let m = unique.len();
        let blocks = self.n_splits + 1;
        if self.n_splits == 0 || m < blocks {
            return Err(RondaError::InsufficientData(format!(
                "{m} dates cannot form {blocks} blocks"
            )));
        }

        let bound = |b: usize| b * m / blocks;
        let mut folds = Vec::with_capacity(self.n_splits);
        for k in 0..self.n_splits {
            let val_start = bound(k + 1);
            let val_end = bound(k + 2);
            let train_end = val_start.saturating_sub(self.gap);
            if train_end == 0 || val_end <= val_start {
                tracing::debug!(fold = k, gap = self.gap, "fold dropped, nothing left to train on");
                continue;
            }
            folds.push(Fold {
                train: unique[..train_end].iter().copied().collect(),
                validation: unique[val_start..val_end].iter().copied().collect(),
            });
        }

        if folds.is_empty() {
            return Err(RondaError::InsufficientData(format!(
                "gap of {} dates leaves no training data in any of {} folds",
                self.gap, self.n_splits
            )));
        }
        Ok(folds)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn dates(n: u64) -> Vec<Date> {
        let start = Date::from_ymd_opt(2023, 1, 1).unwrap();
        (0..n).map(|i| start + chrono::Days::new(i)).collect()
    }

    #[rstest]
    #[case(3, 0, 40)]
    #[case(5, 2, 60)]
    #[case(4, 5, 50)]
    fn test_no_overlap_and_gap(#[case] n_splits: usize, #[case] gap: usize, #[case] n: u64) {
        let all = dates(n);
        let folds = DateOrderedSplit::new(n_splits, gap).split(&all).unwrap();
        assert_eq!(folds.len(), n_splits);
        for fold in &folds {
            let last_train = *fold.train.iter().next_back().unwrap();
            let first_val = *fold.validation.iter().next().unwrap();
            assert!(last_train < first_val);

            let pos = all.iter().position(|d| *d == first_val).unwrap();
            for purged in &all[pos.saturating_sub(gap)..pos] {
                assert!(!fold.train.contains(purged));
            }
            assert_eq!(all.iter().position(|d| *d == last_train).unwrap() + gap + 1, pos);
        }
    }

    #[test]
    fn test_blocks_expand() {
        let folds = DateOrderedSplit::new(3, 0).split(&dates(8)).unwrap();
        let sizes: Vec<(usize, usize)> = folds.iter().map(|f| (f.train.len(), f.validation.len())).collect();
        assert_eq!(sizes, vec![(2, 2), (4, 2), (6, 2)]);
    }

    #[test]
    fn test_duplicates_ignored() {
        let mut all = dates(8);
        all.extend(dates(8));
        let folds = DateOrderedSplit::new(3, 0).split(&all).unwrap();
        assert_eq!(folds[0].train.len(), 2);
    }

    #[test]
    fn test_too_few_dates() {
        assert!(DateOrderedSplit::new(5, 0).split(&dates(3)).is_err());
        assert!(DateOrderedSplit::new(0, 0).split(&dates(3)).is_err());
    }

    #[test]
    fn test_gap_drops_early_folds() {
        // blocks of 2 dates; a gap of 3 empties the first fold only
        let folds = DateOrderedSplit::new(3, 3).split(&dates(8)).unwrap();
        assert_eq!(folds.len(), 2);
        assert_eq!(folds[0].train.len(), 1);
        assert!(DateOrderedSplit::new(3, 10).split(&dates(8)).is_err());
    }
}
