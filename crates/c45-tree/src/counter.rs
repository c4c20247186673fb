use std::collections::BTreeMap;

/// Frequency table of target labels.
///
/// Labels are kept in lexicographic order, which fixes the iteration order
/// used when breaking majority ties.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassCounter {
    counts: BTreeMap<String, usize>,
    total: usize,
}

impl ClassCounter {
    /// Create an empty counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one occurrence of `label`.
    pub fn add(&mut self, label: &str) {
        match self.counts.get_mut(label) {
            Some(count) => *count += 1,
            None => {
                self.counts.insert(label.to_owned(), 1);
            }
        }
        self.total += 1;
    }

    /// Shannon entropy of the label distribution, in bits.
    ///
    /// `-Σ p_i · log2(p_i)` over observed labels; 0 for an empty counter.
    #[must_use]
    pub fn entropy(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let n = self.total as f64;
        -self
            .counts
            .values()
            .map(|&c| {
                let p = c as f64 / n;
                p * p.log2()
            })
            .sum::<f64>()
    }

    /// Most frequent label.
    ///
    /// Ties go to the lexicographically smallest label. This is an
    /// implementation choice of the iteration order, not a guarantee callers
    /// should rely on. Returns `None` for an empty counter.
    #[must_use]
    pub fn majority_label(&self) -> Option<&str> {
        let mut best: Option<(&str, usize)> = None;
        for (label, &count) in &self.counts {
            if best.is_none_or(|(_, c)| count > c) {
                best = Some((label, count));
            }
        }
        best.map(|(label, _)| label)
    }

    /// Count recorded for `label`.
    #[must_use]
    pub fn count(&self, label: &str) -> usize {
        self.counts.get(label).copied().unwrap_or(0)
    }

    /// Total number of recorded occurrences.
    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of distinct labels.
    #[must_use]
    pub fn n_labels(&self) -> usize {
        self.counts.len()
    }

    /// Return `true` when nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Borrow the label → count table.
    #[must_use]
    pub fn counts(&self) -> &BTreeMap<String, usize> {
        &self.counts
    }

    /// Consume the counter and return the label → count table.
    #[must_use]
    pub fn into_counts(self) -> BTreeMap<String, usize> {
        self.counts
    }
}

impl<'a> FromIterator<&'a str> for ClassCounter {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut counter = Self::new();
        for label in iter {
            counter.add(label);
        }
        counter
    }
}

impl From<BTreeMap<String, usize>> for ClassCounter {
    fn from(counts: BTreeMap<String, usize>) -> Self {
        let total = counts.values().sum();
        Self { counts, total }
    }
}
