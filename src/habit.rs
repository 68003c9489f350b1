//! Weekly occupancy-habit model.
//!
//! A 7-day × 24-hour probability grid estimated from the history of
//! motion events. Each cell answers "in what fraction of recorded
//! weeks was the zone occupied during this weekday/hour?" — the
//! simplest model that captures weekly routine without overfitting to
//! a single day. Multiple events in the same bucket on the same
//! calendar date count once (distinct-date counting), and cells are
//! capped at 1.0.
//!
//! The grid is derived state: it is recomputed in full from the event
//! log by [`HabitSource::rebuild`] and replaced wholesale, never
//! patched incrementally. Rebuilds run on their own cadence since they
//! walk the entire log.

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use log::{info, warn};

use crate::app::ports::MotionRecord;

/// Wall-clock format used by persisted motion records.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a persisted record timestamp; `None` for malformed input.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT).ok()
}

// ───────────────────────────────────────────────────────────────
// Capability interface
// ───────────────────────────────────────────────────────────────

/// Habit capability consumed by the decision engine.
///
/// Two implementations exist, selected at construction time:
/// the learning [`HabitModel`] and [`NullHabitSource`], which reports
/// a constant "not habitual" when learning is disabled.
pub trait HabitSource {
    /// Append an occupancy event to the log. Does not touch the grid.
    fn record_event(&mut self, timestamp: NaiveDateTime);

    /// Recompute the grid from the full event log.
    fn rebuild(&mut self);

    /// Grid value for `now`'s weekday/hour; `0.0` before any rebuild.
    fn probability_now(&self, now: NaiveDateTime) -> f32;

    /// Whether `now` falls in a habitual-occupancy bucket.
    fn is_habitual(&self, now: NaiveDateTime) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Grid
// ───────────────────────────────────────────────────────────────

/// Occupancy probability per `(weekday, hour)`; weekday 0 = Monday.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HabitGrid([[f32; 24]; 7]);

impl HabitGrid {
    pub fn cell(&self, weekday: usize, hour: usize) -> f32 {
        self.0[weekday][hour]
    }

    /// Iterate every cell value (tests and diagnostics).
    pub fn cells(&self) -> impl Iterator<Item = f32> + '_ {
        self.0.iter().flat_map(|day| day.iter().copied())
    }
}

// ───────────────────────────────────────────────────────────────
// Learning model
// ───────────────────────────────────────────────────────────────

/// The learning habit model: an append-only event log plus the grid
/// derived from it.
pub struct HabitModel {
    threshold: f32,
    events: Vec<NaiveDateTime>,
    grid: Option<HabitGrid>,
}

impl HabitModel {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            events: Vec::new(),
            grid: None,
        }
    }

    /// Build a model from persisted records, skipping malformed
    /// timestamps. The grid is not built yet — call
    /// [`HabitSource::rebuild`] after loading.
    pub fn from_records(records: &[MotionRecord], threshold: f32) -> Self {
        let mut model = Self::new(threshold);
        let mut skipped = 0usize;
        for record in records {
            match parse_timestamp(&record.timestamp) {
                Some(ts) => model.events.push(ts),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!("habit history: skipped {skipped} malformed record(s)");
        }
        info!("habit history: {} event(s) loaded", model.events.len());
        model
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn grid(&self) -> Option<&HabitGrid> {
        self.grid.as_ref()
    }

    fn bucket(now: NaiveDateTime) -> (usize, usize) {
        (
            now.weekday().num_days_from_monday() as usize,
            now.hour() as usize,
        )
    }
}

impl HabitSource for HabitModel {
    fn record_event(&mut self, timestamp: NaiveDateTime) {
        self.events.push(timestamp);
    }

    fn rebuild(&mut self) {
        // Empty log: keep whatever the grid already knows rather than
        // regressing to zero knowledge.
        if self.events.is_empty() {
            return;
        }

        let mut buckets: Vec<HashSet<NaiveDate>> = vec![HashSet::new(); 7 * 24];
        let mut earliest = self.events[0];
        let mut latest = self.events[0];

        for &ts in &self.events {
            let (day, hour) = Self::bucket(ts);
            buckets[day * 24 + hour].insert(ts.date());
            if ts < earliest {
                earliest = ts;
            }
            if ts > latest {
                latest = ts;
            }
        }

        let span_days = (latest - earliest).num_days();
        let weeks = (span_days as f32 / 7.0).max(1.0);

        let mut grid = [[0.0f32; 24]; 7];
        for (day, row) in grid.iter_mut().enumerate() {
            for (hour, cell) in row.iter_mut().enumerate() {
                let unique_dates = buckets[day * 24 + hour].len();
                *cell = (unique_dates as f32 / weeks).min(1.0);
            }
        }

        self.grid = Some(HabitGrid(grid));
        info!(
            "habit grid rebuilt from {} event(s) spanning {:.1} week(s)",
            self.events.len(),
            weeks
        );
    }

    fn probability_now(&self, now: NaiveDateTime) -> f32 {
        let (day, hour) = Self::bucket(now);
        self.grid.as_ref().map_or(0.0, |g| g.cell(day, hour))
    }

    fn is_habitual(&self, now: NaiveDateTime) -> bool {
        self.probability_now(now) >= self.threshold
    }
}

// ───────────────────────────────────────────────────────────────
// Null object
// ───────────────────────────────────────────────────────────────

/// Habit source for deployments with learning disabled: never
/// habitual, remembers nothing.
pub struct NullHabitSource;

impl HabitSource for NullHabitSource {
    fn record_event(&mut self, _timestamp: NaiveDateTime) {}

    fn rebuild(&mut self) {}

    fn probability_now(&self, _now: NaiveDateTime) -> f32 {
        0.0
    }

    fn is_habitual(&self, _now: NaiveDateTime) -> bool {
        false
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn probability_is_zero_before_any_rebuild() {
        let model = HabitModel::new(0.4);
        assert_eq!(model.probability_now(ts(2026, 8, 3, 7, 0)), 0.0);
        assert!(!model.is_habitual(ts(2026, 8, 3, 7, 0)));
    }

    #[test]
    fn single_event_yields_full_probability_in_its_bucket() {
        // One event, zero span => one week; 1 date / 1 week = 1.0.
        let mut model = HabitModel::new(0.4);
        model.record_event(ts(2026, 8, 3, 7, 15)); // Monday 07h
        model.rebuild();
        assert_eq!(model.probability_now(ts(2026, 8, 10, 7, 0)), 1.0);
        assert_eq!(model.probability_now(ts(2026, 8, 10, 8, 0)), 0.0);
    }

    #[test]
    fn same_date_events_in_one_bucket_count_once() {
        let mut model = HabitModel::new(0.4);
        model.record_event(ts(2026, 8, 3, 7, 5));
        model.record_event(ts(2026, 8, 3, 7, 25));
        model.record_event(ts(2026, 8, 3, 7, 55));
        model.rebuild();
        // Distinct-date counting keeps the cell at 1.0 rather than 3.0.
        assert_eq!(model.probability_now(ts(2026, 8, 3, 7, 0)), 1.0);
    }

    #[test]
    fn probability_scales_with_weeks_observed() {
        // Mondays 07h on 2 of 4 recorded weeks. Span 21 days => 3 weeks.
        let mut model = HabitModel::new(0.4);
        model.record_event(ts(2026, 8, 3, 7, 0));
        model.record_event(ts(2026, 8, 10, 7, 0));
        model.record_event(ts(2026, 8, 24, 9, 0)); // stretches the span
        model.rebuild();
        let p = model.probability_now(ts(2026, 8, 31, 7, 30));
        assert!((p - 2.0 / 3.0).abs() < 1e-6, "got {p}");
    }

    #[test]
    fn rebuild_is_idempotent_on_unchanged_log() {
        let mut model = HabitModel::new(0.4);
        model.record_event(ts(2026, 8, 3, 7, 0));
        model.record_event(ts(2026, 8, 12, 19, 30));
        model.rebuild();
        let first = *model.grid().unwrap();
        model.rebuild();
        assert_eq!(first, *model.grid().unwrap());
    }

    #[test]
    fn empty_log_rebuild_keeps_previous_grid() {
        let mut model = HabitModel::new(0.4);
        model.record_event(ts(2026, 8, 3, 7, 0));
        model.rebuild();
        let before = *model.grid().unwrap();

        let mut empty = HabitModel::new(0.4);
        empty.rebuild();
        assert!(empty.grid().is_none(), "no knowledge to begin with");

        // A populated model never regresses: rebuild on the same log
        // (the empty case is only reachable when the log is empty).
        model.rebuild();
        assert_eq!(before, *model.grid().unwrap());
    }

    #[test]
    fn from_records_skips_malformed_timestamps() {
        let records = vec![
            MotionRecord {
                timestamp: "2026-08-03 07:15:00".into(),
                event: MotionRecord::MOTION_DETECTED.into(),
            },
            MotionRecord {
                timestamp: "not a timestamp".into(),
                event: MotionRecord::MOTION_DETECTED.into(),
            },
            MotionRecord {
                timestamp: "2026-08-04 20:00:00".into(),
                event: MotionRecord::MOTION_DETECTED.into(),
            },
        ];
        let model = HabitModel::from_records(&records, 0.4);
        assert_eq!(model.event_count(), 2);
    }

    #[test]
    fn threshold_splits_habitual_from_not() {
        // Monday 07h active on 1 of 2 weeks => 0.5.
        let mut model = HabitModel::new(0.4);
        model.record_event(ts(2026, 8, 3, 7, 0));
        model.record_event(ts(2026, 8, 16, 12, 0)); // span 13 days => ~1.86 weeks
        model.rebuild();
        let monday = ts(2026, 8, 17, 7, 0);
        assert!(model.probability_now(monday) > 0.4);
        assert!(model.is_habitual(monday));

        let strict = {
            let mut m = HabitModel::new(0.9);
            m.record_event(ts(2026, 8, 3, 7, 0));
            m.record_event(ts(2026, 8, 16, 12, 0));
            m.rebuild();
            m
        };
        assert!(!strict.is_habitual(monday));
    }

    #[test]
    fn null_source_is_never_habitual() {
        let mut null = NullHabitSource;
        null.record_event(ts(2026, 8, 3, 7, 0));
        null.rebuild();
        assert_eq!(null.probability_now(ts(2026, 8, 3, 7, 0)), 0.0);
        assert!(!null.is_habitual(ts(2026, 8, 3, 7, 0)));
    }
}
