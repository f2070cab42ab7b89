//! Duplicate detection between freshly parsed and previously stored transactions
//!
//! Two transactions are the same real-world event when, checked in order:
//! 1. amounts differ by at most half a cent,
//! 2. they move money in the same direction,
//! 3. their dates are within `tolerance_days` (banks post a day or two late),
//! 4. one lowercased description equals or contains the other.
//!
//! Rule 4 is loose on purpose to catch `"Amazon.com"` vs `"AMAZON.COM*ABC123"`.
//! It also means a short generic description such as `"Payment"` swallows any
//! same-amount payment in the window.

use std::collections::BTreeMap;
use std::ops::Bound;

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::config::DEFAULT_TOLERANCE_DAYS;
use crate::models::ParsedTransaction;

/// Half a cent
pub const AMOUNT_TOLERANCE: Decimal = Decimal::from_parts(5, 0, 0, false, 3);

/// Beyond this the index stops narrowing by date and scans every bucket
const MAX_INDEXED_WINDOW_DAYS: i64 = 3_650_000;

/// Pairwise duplicate rule. Symmetric in `a` and `b`.
pub fn is_duplicate(a: &ParsedTransaction, b: &ParsedTransaction, tolerance_days: i64) -> bool {
    // Deserialized amounts skip normalization, so the difference can overflow
    let amounts_match = a
        .amount
        .checked_sub(b.amount)
        .is_some_and(|diff| diff.abs() <= AMOUNT_TOLERANCE);
    if !amounts_match {
        return false;
    }
    if a.transaction_type != b.transaction_type {
        return false;
    }
    if (a.date - b.date).num_days().abs() > tolerance_days {
        return false;
    }

    let desc_a = a.description.to_lowercase();
    let desc_b = b.description.to_lowercase();
    desc_a == desc_b || desc_a.contains(&desc_b) || desc_b.contains(&desc_a)
}

/// [`is_duplicate`] with the default one-day tolerance
pub fn is_duplicate_default(a: &ParsedTransaction, b: &ParsedTransaction) -> bool {
    is_duplicate(a, b, DEFAULT_TOLERANCE_DAYS)
}

/// Inclusive date range a batch covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Result of filtering a parsed batch against stored transactions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DuplicateReport {
    /// Parsed transactions with no stored match, in input order
    pub new: Vec<ParsedTransaction>,
    /// Parsed transactions that matched a stored one, in input order
    pub duplicates: Vec<ParsedTransaction>,
}

/// A flagged pair, by position in the two input lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DuplicatePair {
    pub left: usize,
    pub right: usize,
}

/// Batch duplicate detection with a fixed date tolerance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicateDetector {
    tolerance_days: i64,
}

impl Default for DuplicateDetector {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE_DAYS)
    }
}

impl DuplicateDetector {
    pub fn new(tolerance_days: i64) -> Self {
        Self { tolerance_days }
    }

    pub fn tolerance_days(&self) -> i64 {
        self.tolerance_days
    }

    pub fn is_duplicate(&self, a: &ParsedTransaction, b: &ParsedTransaction) -> bool {
        is_duplicate(a, b, self.tolerance_days)
    }

    /// Date range of a parsed batch: the span of stored transactions a caller
    /// should load before calling [`filter_new`](Self::filter_new).
    /// `None` for an empty batch.
    pub fn existing_window(&self, parsed: &[ParsedTransaction]) -> Option<DateWindow> {
        let start = parsed.iter().map(|t| t.date).min()?;
        let end = parsed.iter().map(|t| t.date).max()?;
        Some(DateWindow { start, end })
    }

    /// Split `parsed` into new and already-stored transactions
    pub fn filter_new(
        &self,
        parsed: Vec<ParsedTransaction>,
        existing: &[ParsedTransaction],
    ) -> DuplicateReport {
        let index = ExistingIndex::new(existing, self.tolerance_days);
        let mut report = DuplicateReport::default();

        for tx in parsed {
            if index.find_match(&tx).is_some() {
                report.duplicates.push(tx);
            } else {
                report.new.push(tx);
            }
        }

        debug!(
            new = report.new.len(),
            duplicates = report.duplicates.len(),
            existing = existing.len(),
            "Duplicate filter complete"
        );
        report
    }

    /// Every (left, right) pair the rule flags, ordered by left then right
    pub fn find_pairs(
        &self,
        left: &[ParsedTransaction],
        right: &[ParsedTransaction],
    ) -> Vec<DuplicatePair> {
        let index = ExistingIndex::new(right, self.tolerance_days);
        let mut pairs = Vec::new();
        for (i, tx) in left.iter().enumerate() {
            let mut matches: Vec<usize> = index.matches(tx).map(|(j, _)| j).collect();
            matches.sort_unstable();
            pairs.extend(matches.into_iter().map(|j| DuplicatePair { left: i, right: j }));
        }
        pairs
    }
}

/// Stored transactions bucketed by date, so a lookup only touches the
/// `date ± tolerance` buckets. Gives the same answers as a full scan.
struct ExistingIndex<'a> {
    by_date: BTreeMap<NaiveDate, Vec<(usize, &'a ParsedTransaction)>>,
    tolerance_days: i64,
}

impl<'a> ExistingIndex<'a> {
    fn new(existing: &'a [ParsedTransaction], tolerance_days: i64) -> Self {
        let mut by_date: BTreeMap<NaiveDate, Vec<(usize, &'a ParsedTransaction)>> =
            BTreeMap::new();
        for (i, tx) in existing.iter().enumerate() {
            by_date.entry(tx.date).or_default().push((i, tx));
        }
        Self {
            by_date,
            tolerance_days,
        }
    }

    fn bounds(&self, date: NaiveDate) -> (Bound<NaiveDate>, Bound<NaiveDate>) {
        if self.tolerance_days > MAX_INDEXED_WINDOW_DAYS {
            return (Bound::Unbounded, Bound::Unbounded);
        }
        let span = Duration::days(self.tolerance_days);
        let lo = date
            .checked_sub_signed(span)
            .map_or(Bound::Unbounded, Bound::Included);
        let hi = date
            .checked_add_signed(span)
            .map_or(Bound::Unbounded, Bound::Included);
        (lo, hi)
    }

    fn matches<'s>(
        &'s self,
        tx: &'s ParsedTransaction,
    ) -> impl Iterator<Item = (usize, &'a ParsedTransaction)> + 's {
        // Negative tolerance never matches; skip the range entirely
        let range = (self.tolerance_days >= 0).then(|| self.by_date.range(self.bounds(tx.date)));
        range
            .into_iter()
            .flatten()
            .flat_map(|(_, bucket)| bucket.iter().copied())
            .filter(move |(_, stored)| is_duplicate(tx, stored, self.tolerance_days))
    }

    fn find_match(&self, tx: &ParsedTransaction) -> Option<&'a ParsedTransaction> {
        self.matches(tx).next().map(|(_, stored)| stored)
    }
}
