//! # Credit buckets.
//!
//! Each category owns four counters, one per window, that start at their ceilings:
//!
//! ```text
//!   day ──top up──► hour ──top up──► min ──top up──► sec ──► admission
//! ```
//!
//! Every accepted record debits all four counters. On a boundary the finer counters are
//! topped up from the next coarser one, coarsest step first, so credits trickle down a level
//! per boundary. The coarser counter is already debited by admissions, so a top-up does not
//! debit it again.
//!
//! ## Rules
//! - A step never lifts a counter above its ceiling and never moves more than the coarser
//!   counter holds.
//! - Counters are clamped to `>= 0` before a step.
//! - `day` reaching zero sets the daily quota flag; only the day reset clears it.

use std::collections::BTreeMap;

use serde::Serialize;

use super::limits::RateLimits;
use crate::switch::LogRecord;
use crate::timer::Granularity;

/// Result of offering a record to a bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Admission {
    /// Written; all four counters debited.
    Accepted,
    /// Dropped: no credit left in the current second.
    Throttled,
    /// Dropped: the daily quota is exhausted.
    QuotaReached,
}

/// Counters of one category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CreditBucket {
    ceiling: [i64; 4],
    current: [i64; 4],
    quota_reached: bool,
}

impl CreditBucket {
    /// Full bucket with the given ceilings.
    pub fn new(ceiling: [u32; 4]) -> Self {
        let ceiling = ceiling.map(i64::from);
        Self {
            ceiling,
            current: ceiling,
            quota_reached: false,
        }
    }

    /// Ceiling of window `g`.
    pub fn ceiling(&self, g: Granularity) -> i64 {
        self.ceiling[g.index()]
    }

    /// Credits left in window `g`.
    pub fn current(&self, g: Granularity) -> i64 {
        self.current[g.index()]
    }

    /// True once the day counter hit zero, until the next day reset.
    pub fn quota_reached(&self) -> bool {
        self.quota_reached
    }

    /// Tops window `g` up from the next coarser window; returns the amount moved.
    ///
    /// Days have no coarser window: the call is a no-op.
    pub fn cascade(&mut self, g: Granularity) -> i64 {
        let Some(coarser) = g.coarser() else {
            return 0;
        };
        let (fine, coarse) = (g.index(), coarser.index());
        self.current[fine] = self.current[fine].max(0);
        self.current[coarse] = self.current[coarse].max(0);

        let mut moved = 0;
        if self.current[fine] < self.ceiling[fine] {
            let deficit = self.ceiling[fine] - self.current[fine];
            moved = deficit.min(self.current[coarse]);
            self.current[fine] += moved;
        }
        if self.current[Granularity::Day.index()] == 0 {
            self.quota_reached = true;
        }
        moved
    }

    /// Applies the boundary of `g`: top-ups for sec/min/hour, hard reset for day.
    pub fn on_boundary(&mut self, g: Granularity) {
        if g == Granularity::Day {
            self.reset();
            return;
        }
        for step in Granularity::ALL[..=g.index()].iter().rev() {
            self.cascade(*step);
        }
    }

    /// Restores every counter to its ceiling and clears the quota flag.
    pub fn reset(&mut self) {
        self.current = self.ceiling;
        self.quota_reached = false;
    }

    /// Offers one record to the bucket.
    pub fn try_admit(&mut self) -> Admission {
        if self.quota_reached {
            return Admission::QuotaReached;
        }
        if self.current[Granularity::Second.index()] <= 0 {
            return Admission::Throttled;
        }
        for credit in &mut self.current {
            *credit -= 1;
        }
        if self.current[Granularity::Day.index()] <= 0 {
            self.quota_reached = true;
        }
        Admission::Accepted
    }
}

/// Buckets of every configured category.
#[derive(Clone, Debug, Serialize)]
pub struct CreditLedger {
    fallback: String,
    buckets: BTreeMap<String, CreditBucket>,
}

impl CreditLedger {
    /// Full buckets for every category of a validated table.
    pub fn new(limits: &RateLimits) -> Self {
        let buckets = limits
            .categories
            .iter()
            .map(|(name, max)| (name.clone(), CreditBucket::new(*max)))
            .collect();
        Self {
            fallback: limits.fallback.clone(),
            buckets,
        }
    }

    /// Category governing `raw`: itself if configured, the fallback otherwise.
    pub fn resolve<'a>(&'a self, raw: &'a str) -> &'a str {
        if self.buckets.contains_key(raw) {
            raw
        } else {
            &self.fallback
        }
    }

    /// Bucket of `category` (exact name).
    pub fn bucket(&self, category: &str) -> Option<&CreditBucket> {
        self.buckets.get(category)
    }

    /// Applies a boundary to every bucket.
    pub fn on_boundary(&mut self, g: Granularity) {
        for bucket in self.buckets.values_mut() {
            bucket.on_boundary(g);
        }
    }

    /// Offers `record` to the bucket of its category; returns the governing category too.
    pub fn admit(&mut self, record: &LogRecord) -> (String, Admission) {
        let category = self.resolve(record.category()).to_string();
        let admission = match self.buckets.get_mut(&category) {
            Some(bucket) => bucket.try_admit(),
            // Only reachable with an unvalidated table.
            None => Admission::Throttled,
        };
        (category, admission)
    }

    /// JSON view of every bucket, keyed by category.
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(&self.buckets).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::switch::Level;

    fn drain(bucket: &mut CreditBucket, n: usize) -> Vec<Admission> {
        (0..n).map(|_| bucket.try_admit()).collect()
    }

    #[test]
    fn second_window_throttles_until_topped_up() {
        let mut b = CreditBucket::new([1, 2, 5, 10]);
        assert_eq!(drain(&mut b, 2), vec![Admission::Accepted, Admission::Throttled]);
        assert_eq!(b.current(Granularity::Minute), 1);

        b.on_boundary(Granularity::Second);
        assert_eq!(b.current(Granularity::Second), 1);
        assert_eq!(b.current(Granularity::Minute), 1);
        assert_eq!(b.try_admit(), Admission::Accepted);
    }

    #[test]
    fn cascade_never_exceeds_ceiling_or_coarser_credit() {
        let mut b = CreditBucket::new([4, 6, 100, 100]);
        drain(&mut b, 4);
        for _ in 0..3 {
            let before = b.current(Granularity::Minute);
            let moved = b.cascade(Granularity::Second);
            assert!(moved <= before);
            assert!(b.current(Granularity::Second) <= b.ceiling(Granularity::Second));
        }
        assert_eq!(b.current(Granularity::Second), 4);
        assert_eq!(b.current(Granularity::Minute), 2);
    }

    #[test]
    fn every_step_respects_ceiling_and_coarser_credit() {
        let mut b = CreditBucket::new([4, 6, 8, 5]);
        drain(&mut b, 4);
        assert_eq!(b.current, [0, 2, 4, 1]);

        for step in [Granularity::Hour, Granularity::Minute, Granularity::Second] {
            let coarser = step.coarser().unwrap();
            let (fine_before, coarse_before) = (b.current(step), b.current(coarser));
            let moved = b.cascade(step);
            assert!(moved <= coarse_before, "{step:?} moved {moved} from {coarse_before}");
            assert_eq!(b.current(step), fine_before + moved);
            assert!(b.current(step) <= b.ceiling(step));
        }
        assert_eq!(b.current, [4, 6, 5, 1]);
        assert!(!b.quota_reached());
    }

    #[test]
    fn full_bucket_is_not_topped_up() {
        let mut b = CreditBucket::new([2, 2, 2, 2]);
        assert_eq!(b.cascade(Granularity::Second), 0);
        assert_eq!(b.cascade(Granularity::Day), 0);
    }

    #[test]
    fn negative_counters_are_clamped_before_a_step() {
        let mut b = CreditBucket::new([1, 1, 1, 5]);
        b.current = [-3, -1, 4, 5];
        assert_eq!(b.cascade(Granularity::Second), 0);
        assert_eq!(b.current(Granularity::Second), 0);
        assert_eq!(b.current(Granularity::Minute), 0);

        b.on_boundary(Granularity::Minute);
        assert_eq!(b.current(Granularity::Minute), 1);
        assert_eq!(b.current(Granularity::Second), 1);
        assert_eq!(b.current(Granularity::Hour), 4);
    }

    #[test]
    fn daily_quota_locks_until_day_reset() {
        let mut b = CreditBucket::new([3, 3, 3, 2]);
        assert_eq!(
            drain(&mut b, 3),
            vec![Admission::Accepted, Admission::Accepted, Admission::QuotaReached]
        );
        assert!(b.quota_reached());

        b.on_boundary(Granularity::Hour);
        assert_eq!(b.try_admit(), Admission::QuotaReached);

        b.on_boundary(Granularity::Day);
        assert!(!b.quota_reached());
        assert_eq!(b.try_admit(), Admission::Accepted);
    }

    #[test]
    fn hour_step_flags_empty_day() {
        let mut b = CreditBucket::new([1, 1, 1, 3]);
        b.current = [0, 0, 0, 0];
        b.on_boundary(Granularity::Hour);
        assert!(b.quota_reached());
    }

    #[test]
    fn unknown_category_uses_fallback() {
        let mut ledger = CreditLedger::new(&RateLimits::default());
        let record = LogRecord::tagged("mystery/detail", Level::Error, "boom");

        let (category, admission) = ledger.admit(&record);
        assert_eq!(category, "error");
        assert_eq!(admission, Admission::Accepted);
        assert_eq!(ledger.bucket("error").unwrap().current(Granularity::Day), 63);
        assert_eq!(ledger.admit(&record).1, Admission::Throttled);
    }

    #[test]
    fn snapshot_lists_every_category() {
        let ledger = CreditLedger::new(&RateLimits::default());
        let snap = ledger.snapshot();
        assert_eq!(snap["fpath"]["current"], serde_json::json!([1, 2, 5, 10]));
        assert_eq!(snap["error"]["quota_reached"], serde_json::json!(false));
    }
}
