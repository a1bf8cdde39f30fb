//! In-memory aggregation over ingested event records.
//!
//! Every query recomputes from the full record set, so results always reflect
//! everything absorbed so far.

use std::collections::{BTreeMap, HashMap};

use quake_core::models::{Distribution, EventRecord};
use serde::Serialize;

use crate::reader::{IngestOutcome, IngestStats};

/// Region groups at or below this count are left out of the region view.
pub const REGION_MIN_COUNT: u64 = 5;
/// Maximum number of groups in the region view.
pub const REGION_VIEW_LIMIT: usize = 15;

/// Magnitude bucket labels, in edge order.
pub const MAGNITUDE_BUCKETS: [&str; 6] = [
    "< 2.0",
    "2.0 - 2.9",
    "3.0 - 3.9",
    "4.0 - 4.9",
    "5.0 - 5.9",
    ">= 6.0",
];

/// Depth bucket labels, in edge order. Depth is stored in metres.
pub const DEPTH_BUCKETS: [&str; 5] = ["< 5 km", "5-10 km", "10-20 km", "20-50 km", ">= 50 km"];

// ── Statistics types ──────────────────────────────────────────────────────────

/// Whole-set summary. Absent values mean there was nothing to measure.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummaryStats {
    pub count: usize,
    pub avg_magnitude: Option<f64>,
    pub min_magnitude: Option<f64>,
    pub max_magnitude: Option<f64>,
    /// Depth figures cover records with depth > 0 only.
    pub avg_depth: Option<f64>,
    pub min_depth: Option<f64>,
    pub max_depth: Option<f64>,
    pub with_time: usize,
    pub without_time: usize,
    pub unique_regions: usize,
    pub most_frequent_region: Option<String>,
    pub min_year: Option<i32>,
    pub max_year: Option<i32>,
}

/// Count and magnitude figures for one group of records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub label: String,
    pub count: usize,
    pub avg_magnitude: f64,
    pub min_magnitude: f64,
    pub max_magnitude: f64,
}

impl GroupStats {
    fn new(label: String, magnitude: f64) -> Self {
        Self {
            label,
            count: 1,
            avg_magnitude: magnitude,
            min_magnitude: magnitude,
            max_magnitude: magnitude,
        }
    }

    /// Fold one more magnitude in. `avg_magnitude` holds the running sum
    /// until [`GroupStats::finish`].
    fn add(&mut self, magnitude: f64) {
        self.count += 1;
        self.avg_magnitude += magnitude;
        self.min_magnitude = self.min_magnitude.min(magnitude);
        self.max_magnitude = self.max_magnitude.max(magnitude);
    }

    fn finish(mut self) -> Self {
        self.avg_magnitude /= self.count as f64;
        self
    }
}

/// Running min/max/sum over a stream of values.
#[derive(Default)]
struct Accumulator {
    n: usize,
    sum: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl Accumulator {
    fn add(&mut self, v: f64) {
        self.n += 1;
        self.sum += v;
        self.min = Some(self.min.map_or(v, |m| m.min(v)));
        self.max = Some(self.max.map_or(v, |m| m.max(v)));
    }

    fn avg(&self) -> Option<f64> {
        (self.n > 0).then(|| self.sum / self.n as f64)
    }
}

// ── EventAggregator ───────────────────────────────────────────────────────────

/// Owns the accepted records and answers every statistical view over them.
#[derive(Debug, Clone, Default)]
pub struct EventAggregator {
    records: Vec<EventRecord>,
}

impl EventAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<EventRecord>) -> Self {
        Self { records }
    }

    /// Append the records of a finished ingestion call and hand back its
    /// counters.
    pub fn absorb(&mut self, outcome: IngestOutcome) -> IngestStats {
        self.records.extend(outcome.records);
        outcome.stats
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whole-set summary.
    pub fn summary(&self) -> SummaryStats {
        let mut magnitude = Accumulator::default();
        let mut depth = Accumulator::default();
        let mut with_time = 0;
        let mut min_year: Option<i32> = None;
        let mut max_year: Option<i32> = None;

        for r in &self.records {
            magnitude.add(r.magnitude());
            if r.has_depth() {
                depth.add(r.depth());
            }
            if let Some(year) = r.year() {
                with_time += 1;
                min_year = Some(min_year.map_or(year, |y| y.min(year)));
                max_year = Some(max_year.map_or(year, |y| y.max(year)));
            }
        }

        let regions = self.region_counts();
        let most_frequent_region = regions
            .iter()
            .fold(None::<&(String, u64)>, |best, entry| match best {
                Some(b) if b.1 >= entry.1 => Some(b),
                _ => Some(entry),
            })
            .map(|(label, _)| label.clone());

        SummaryStats {
            count: self.records.len(),
            avg_magnitude: magnitude.avg(),
            min_magnitude: magnitude.min,
            max_magnitude: magnitude.max,
            avg_depth: depth.avg(),
            min_depth: depth.min,
            max_depth: depth.max,
            with_time,
            without_time: self.records.len() - with_time,
            unique_regions: regions.len(),
            most_frequent_region,
            min_year,
            max_year,
        }
    }

    /// Regions with more than [`REGION_MIN_COUNT`] events, largest first,
    /// capped at [`REGION_VIEW_LIMIT`] groups.
    pub fn region_distribution(&self) -> Distribution {
        let mut groups = self.region_counts();
        groups.retain(|(_, count)| *count > REGION_MIN_COUNT);
        groups.sort_by(|a, b| b.1.cmp(&a.1));
        groups.into_iter().take(REGION_VIEW_LIMIT).collect()
    }

    /// Every region with its full count, largest first.
    pub fn region_statistics(&self) -> Distribution {
        let mut groups = self.region_counts();
        groups.sort_by(|a, b| b.1.cmp(&a.1));
        groups.into_iter().collect()
    }

    pub fn magnitude_distribution(&self, include_empty: bool) -> Distribution {
        let mut counts = [0u64; MAGNITUDE_BUCKETS.len()];
        for r in &self.records {
            counts[magnitude_bucket(r.magnitude())] += 1;
        }
        bucket_distribution(&MAGNITUDE_BUCKETS, &counts, include_empty)
    }

    /// Depth buckets over records with depth > 0.
    pub fn depth_distribution(&self, include_empty: bool) -> Distribution {
        let mut counts = [0u64; DEPTH_BUCKETS.len()];
        for r in self.records.iter().filter(|r| r.has_depth()) {
            counts[depth_bucket(r.depth())] += 1;
        }
        bucket_distribution(&DEPTH_BUCKETS, &counts, include_empty)
    }

    /// Event count per year, ascending. Records without a time are skipped.
    pub fn year_distribution(&self) -> Distribution {
        let mut by_year: BTreeMap<i32, u64> = BTreeMap::new();
        for year in self.records.iter().filter_map(|r| r.year()) {
            *by_year.entry(year).or_default() += 1;
        }
        by_year
            .into_iter()
            .map(|(year, count)| (year.to_string(), count))
            .collect()
    }

    /// Event count per month of `year`, keyed `"01"`..`"12"`, ascending.
    pub fn month_distribution(&self, year: i32) -> Distribution {
        use chrono::Datelike;

        let mut by_month: BTreeMap<u32, u64> = BTreeMap::new();
        for t in self.records.iter().filter_map(|r| r.time()) {
            if t.year() == year {
                *by_month.entry(t.month()).or_default() += 1;
            }
        }
        by_month
            .into_iter()
            .map(|(month, count)| (format!("{month:02}"), count))
            .collect()
    }

    /// The `n` strongest events, ties kept in source order.
    pub fn top_by_magnitude(&self, n: usize) -> Vec<&EventRecord> {
        let mut sorted: Vec<&EventRecord> = self.records.iter().collect();
        sorted.sort_by(|a, b| b.magnitude().total_cmp(&a.magnitude()));
        sorted.truncate(n);
        sorted
    }

    /// The `n` deepest events with depth > 0, ties kept in source order.
    pub fn top_by_depth(&self, n: usize) -> Vec<&EventRecord> {
        let mut sorted: Vec<&EventRecord> =
            self.records.iter().filter(|r| r.has_depth()).collect();
        sorted.sort_by(|a, b| b.depth().total_cmp(&a.depth()));
        sorted.truncate(n);
        sorted
    }

    /// Events with magnitude strictly above `threshold`, strongest first.
    pub fn strong_events(&self, threshold: f64) -> Vec<&EventRecord> {
        let mut strong: Vec<&EventRecord> = self
            .records
            .iter()
            .filter(|r| r.magnitude() > threshold)
            .collect();
        strong.sort_by(|a, b| b.magnitude().total_cmp(&a.magnitude()));
        strong
    }

    /// Per magnitude type, highest average magnitude first. A blank type is
    /// grouped as `unknown`.
    pub fn magnitude_type_statistics(&self) -> Vec<GroupStats> {
        let mut groups = group_magnitudes(self.records.iter().map(|r| {
            let kind = r.magnitude_type();
            let label = if kind.is_empty() { "unknown" } else { kind };
            (label.to_string(), r.magnitude())
        }));
        groups.sort_by(|a, b| b.avg_magnitude.total_cmp(&a.avg_magnitude));
        groups
    }

    /// Per year with a timestamp, ascending.
    pub fn yearly_statistics(&self) -> Vec<GroupStats> {
        let mut by_year: BTreeMap<i32, GroupStats> = BTreeMap::new();
        for r in &self.records {
            if let Some(year) = r.year() {
                by_year
                    .entry(year)
                    .and_modify(|g| g.add(r.magnitude()))
                    .or_insert_with(|| GroupStats::new(year.to_string(), r.magnitude()));
            }
        }
        by_year.into_values().map(GroupStats::finish).collect()
    }

    // ── Internal helpers ─────────────────────────────────────────────────────

    /// Normalized region counts in first-encountered order. Records without
    /// a region are not counted.
    fn region_counts(&self) -> Vec<(String, u64)> {
        let mut order: Vec<(String, u64)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for r in &self.records {
            let region = r.normalized_region();
            if region.is_empty() {
                continue;
            }
            match index.get(&region) {
                Some(&i) => order[i].1 += 1,
                None => {
                    index.insert(region.clone(), order.len());
                    order.push((region, 1));
                }
            }
        }
        order
    }
}

/// Index into [`MAGNITUDE_BUCKETS`]. Total over all finite values.
fn magnitude_bucket(magnitude: f64) -> usize {
    match magnitude {
        m if m < 2.0 => 0,
        m if m < 3.0 => 1,
        m if m < 4.0 => 2,
        m if m < 5.0 => 3,
        m if m < 6.0 => 4,
        _ => 5,
    }
}

/// Index into [`DEPTH_BUCKETS`] for a depth in metres.
fn depth_bucket(metres: f64) -> usize {
    match metres {
        d if d < 5_000.0 => 0,
        d if d < 10_000.0 => 1,
        d if d < 20_000.0 => 2,
        d if d < 50_000.0 => 3,
        _ => 4,
    }
}

fn bucket_distribution(labels: &[&str], counts: &[u64], include_empty: bool) -> Distribution {
    labels
        .iter()
        .zip(counts)
        .filter(|(_, count)| include_empty || **count > 0)
        .map(|(label, count)| (label.to_string(), *count))
        .collect()
}

/// Group `(label, magnitude)` pairs, keeping first-encountered label order.
fn group_magnitudes(pairs: impl Iterator<Item = (String, f64)>) -> Vec<GroupStats> {
    let mut groups: Vec<GroupStats> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for (label, magnitude) in pairs {
        match index.get(&label) {
            Some(&i) => groups[i].add(magnitude),
            None => {
                index.insert(label.clone(), groups.len());
                groups.push(GroupStats::new(label, magnitude));
            }
        }
    }
    groups.into_iter().map(GroupStats::finish).collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn rec(id: &str, depth: f64, magnitude: f64, region: &str) -> EventRecord {
        EventRecord::new(id, depth, "ml", magnitude, region, None).unwrap()
    }

    fn rec_at(id: &str, magnitude: f64, time: NaiveDateTime) -> EventRecord {
        EventRecord::new(id, 1_000.0, "ml", magnitude, "X", Some(time)).unwrap()
    }

    fn ids(records: &[&EventRecord]) -> Vec<String> {
        records.iter().map(|r| r.id().to_string()).collect()
    }

    // ── summary ───────────────────────────────────────────────────────────────

    #[test]
    fn test_summary_empty() {
        let s = EventAggregator::new().summary();
        assert_eq!(s.count, 0);
        assert!(s.avg_magnitude.is_none());
        assert!(s.avg_depth.is_none());
        assert!(s.most_frequent_region.is_none());
        assert!(s.min_year.is_none());
    }

    #[test]
    fn test_summary_figures() {
        let agg = EventAggregator::from_records(vec![
            rec("a", 0.0, 2.0, "alaska"),
            rec("b", 10_000.0, 4.0, "Nevada"),
            rec("c", 30_000.0, 6.0, "ALASKA, USA"),
            rec_at("d", 3.0, ts(2019, 5, 1)),
            rec_at("e", 3.0, ts(2023, 1, 1)),
        ]);
        let s = agg.summary();
        assert_eq!(s.count, 5);
        assert!((s.avg_magnitude.unwrap() - 3.6).abs() < 1e-9);
        assert_eq!(s.min_magnitude, Some(2.0));
        assert_eq!(s.max_magnitude, Some(6.0));
        // depth 0 is excluded
        assert_eq!(s.min_depth, Some(1_000.0));
        assert_eq!(s.max_depth, Some(30_000.0));
        assert!((s.avg_depth.unwrap() - 10_500.0).abs() < 1e-9);
        assert_eq!(s.with_time, 2);
        assert_eq!(s.without_time, 3);
        assert_eq!(s.unique_regions, 3);
        assert_eq!(s.most_frequent_region.as_deref(), Some("Alaska"));
        assert_eq!(s.min_year, Some(2019));
        assert_eq!(s.max_year, Some(2023));
    }

    #[test]
    fn test_summary_most_frequent_tie_keeps_first() {
        let agg = EventAggregator::from_records(vec![
            rec("a", 1.0, 1.0, "Nevada"),
            rec("b", 1.0, 1.0, "Alaska"),
            rec("c", 1.0, 1.0, "Alaska"),
            rec("d", 1.0, 1.0, "Nevada"),
        ]);
        assert_eq!(
            agg.summary().most_frequent_region.as_deref(),
            Some("Nevada")
        );
    }

    #[test]
    fn test_summary_ignores_blank_regions() {
        let agg =
            EventAggregator::from_records(vec![rec("a", 1.0, 1.0, ""), rec("b", 1.0, 1.0, " ")]);
        let s = agg.summary();
        assert_eq!(s.unique_regions, 0);
        assert!(s.most_frequent_region.is_none());
    }

    // ── region views ─────────────────────────────────────────────────────────

    fn region_set(groups: &[(&str, usize)]) -> EventAggregator {
        let mut records = Vec::new();
        for (region, n) in groups {
            for i in 0..*n {
                records.push(rec(&format!("{region}-{i}"), 1.0, 1.0, region));
            }
        }
        EventAggregator::from_records(records)
    }

    #[test]
    fn test_region_distribution_floor_and_order() {
        let agg = region_set(&[("Small", 5), ("Mid", 6), ("Big", 9), ("Also Mid", 6)]);
        let d = agg.region_distribution();
        assert_eq!(d.labels(), vec!["Big", "Mid", "Also Mid"]);
        assert_eq!(d.get("Small"), None);
        assert!(d.iter().all(|e| e.count > REGION_MIN_COUNT));
    }

    #[test]
    fn test_region_distribution_cap() {
        let names: Vec<String> = (0..20).map(|i| format!("Region{i:02}")).collect();
        let groups: Vec<(&str, usize)> = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.as_str(), 6 + i % 3))
            .collect();
        let d = region_set(&groups).region_distribution();
        assert_eq!(d.len(), REGION_VIEW_LIMIT);
        let counts: Vec<u64> = d.iter().map(|e| e.count).collect();
        assert!(counts.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_region_statistics_has_no_floor() {
        let agg = region_set(&[("Small", 1), ("Big", 7)]);
        let d = agg.region_statistics();
        assert_eq!(d.labels(), vec!["Big", "Small"]);
        assert_eq!(d.total(), 8);
    }

    // ── bucket views ─────────────────────────────────────────────────────────

    #[test]
    fn test_magnitude_distribution_is_exhaustive() {
        let mags = [-0.5, 0.0, 1.99, 2.0, 2.95, 3.0, 4.99, 5.0, 5.99, 6.0, 9.1];
        let agg = EventAggregator::from_records(
            mags.iter()
                .enumerate()
                .map(|(i, m)| rec(&i.to_string(), 1.0, *m, "X"))
                .collect(),
        );
        let d = agg.magnitude_distribution(true);
        assert_eq!(d.labels(), MAGNITUDE_BUCKETS.to_vec());
        assert_eq!(d.total(), mags.len() as u64);
        assert_eq!(d.get("< 2.0"), Some(3));
        assert_eq!(d.get("2.0 - 2.9"), Some(2));
        assert_eq!(d.get("3.0 - 3.9"), Some(1));
        assert_eq!(d.get("4.0 - 4.9"), Some(1));
        assert_eq!(d.get("5.0 - 5.9"), Some(2));
        assert_eq!(d.get(">= 6.0"), Some(2));
    }

    #[test]
    fn test_magnitude_distribution_omits_empty_in_edge_order() {
        let agg = EventAggregator::from_records(vec![
            rec("a", 1.0, 6.5, "X"),
            rec("b", 1.0, 1.0, "X"),
        ]);
        let d = agg.magnitude_distribution(false);
        assert_eq!(d.labels(), vec!["< 2.0", ">= 6.0"]);
    }

    #[test]
    fn test_depth_distribution_excludes_zero_depth() {
        let agg = EventAggregator::from_records(vec![
            rec("a", 0.0, 1.0, "X"),
            rec("b", 4_999.0, 1.0, "X"),
            rec("c", 5_000.0, 1.0, "X"),
            rec("d", 10_500.0, 1.0, "X"),
            rec("e", 20_000.0, 1.0, "X"),
            rec("f", 700_000.0, 1.0, "X"),
        ]);
        let d = agg.depth_distribution(true);
        assert_eq!(d.labels(), DEPTH_BUCKETS.to_vec());
        assert_eq!(d.total(), 5);
        assert_eq!(d.get("< 5 km"), Some(1));
        assert_eq!(d.get("5-10 km"), Some(1));
        assert_eq!(d.get("10-20 km"), Some(1));
        assert_eq!(d.get("20-50 km"), Some(1));
        assert_eq!(d.get(">= 50 km"), Some(1));

        let sparse = EventAggregator::from_records(vec![rec("a", 0.0, 1.0, "X")]);
        assert!(sparse.depth_distribution(false).is_empty());
    }

    // ── time views ───────────────────────────────────────────────────────────

    #[test]
    fn test_year_and_month_distribution() {
        let agg = EventAggregator::from_records(vec![
            rec_at("a", 1.0, ts(2023, 11, 2)),
            rec_at("b", 1.0, ts(2021, 1, 2)),
            rec_at("c", 1.0, ts(2023, 2, 2)),
            rec_at("d", 1.0, ts(2023, 11, 30)),
            rec("e", 1.0, 1.0, "X"),
        ]);
        let years = agg.year_distribution();
        assert_eq!(years.labels(), vec!["2021", "2023"]);
        assert_eq!(years.get("2023"), Some(3));

        let months = agg.month_distribution(2023);
        assert_eq!(months.labels(), vec!["02", "11"]);
        assert_eq!(months.get("11"), Some(2));
        assert!(agg.month_distribution(1999).is_empty());
    }

    #[test]
    fn test_yearly_statistics() {
        let agg = EventAggregator::from_records(vec![
            rec_at("a", 2.0, ts(2023, 1, 1)),
            rec_at("b", 4.0, ts(2023, 6, 1)),
            rec_at("c", 5.0, ts(2020, 1, 1)),
        ]);
        let stats = agg.yearly_statistics();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].label, "2020");
        assert_eq!(stats[1].label, "2023");
        assert_eq!(stats[1].count, 2);
        assert!((stats[1].avg_magnitude - 3.0).abs() < 1e-9);
        assert_eq!(stats[1].max_magnitude, 4.0);
    }

    // ── rankings ─────────────────────────────────────────────────────────────

    #[test]
    fn test_top_by_magnitude_stable_and_truncated() {
        let agg = EventAggregator::from_records(vec![
            rec("first", 1.0, 4.7, "X"),
            rec("mid", 1.0, 3.2, "X"),
            rec("second", 1.0, 4.7, "X"),
            rec("last", 1.0, 1.0, "X"),
        ]);
        let top = agg.top_by_magnitude(2);
        assert_eq!(ids(&top), vec!["first", "second"]);
        assert!(agg.top_by_magnitude(0).is_empty());
        assert_eq!(agg.top_by_magnitude(10).len(), 4);
    }

    #[test]
    fn test_top_by_depth_skips_zero() {
        let agg = EventAggregator::from_records(vec![
            rec("zero", 0.0, 1.0, "X"),
            rec("shallow", 100.0, 1.0, "X"),
            rec("deep", 90_000.0, 1.0, "X"),
        ]);
        assert_eq!(ids(&agg.top_by_depth(5)), vec!["deep", "shallow"]);
    }

    #[test]
    fn test_strong_events_strictly_above_threshold() {
        let agg = EventAggregator::from_records(vec![
            rec("a", 1.0, 4.0, "X"),
            rec("b", 1.0, 4.5, "X"),
            rec("c", 1.0, 6.1, "X"),
            rec("d", 1.0, 4.5, "X"),
        ]);
        assert_eq!(ids(&agg.strong_events(4.0)), vec!["c", "b", "d"]);
    }

    #[test]
    fn test_magnitude_type_statistics() {
        let agg = EventAggregator::from_records(vec![
            EventRecord::new("a", 1.0, "ml", 2.0, "X", None).unwrap(),
            EventRecord::new("b", 1.0, "mw", 5.0, "X", None).unwrap(),
            EventRecord::new("c", 1.0, "ml", 3.0, "X", None).unwrap(),
            EventRecord::new("d", 1.0, "", 1.0, "X", None).unwrap(),
        ]);
        let stats = agg.magnitude_type_statistics();
        let labels: Vec<&str> = stats.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["mw", "ml", "unknown"]);
        assert_eq!(stats[1].count, 2);
        assert!((stats[1].avg_magnitude - 2.5).abs() < 1e-9);
        assert_eq!(stats[1].min_magnitude, 2.0);
        assert_eq!(stats[1].max_magnitude, 3.0);
    }

    // ── absorb ───────────────────────────────────────────────────────────────

    #[test]
    fn test_absorb_appends_across_calls() {
        let mut agg = EventAggregator::new();
        let first = IngestOutcome {
            records: vec![rec("a", 1.0, 1.0, "X")],
            stats: IngestStats {
                total_lines: 2,
                accepted: 1,
                rejected: 1,
            },
            ..IngestOutcome::default()
        };
        let second = IngestOutcome {
            records: vec![rec("b", 1.0, 2.0, "X")],
            ..IngestOutcome::default()
        };
        let stats = agg.absorb(first);
        assert_eq!(stats.rejected, 1);
        agg.absorb(second);
        assert_eq!(agg.len(), 2);
        assert_eq!(agg.records()[1].id(), "b");
        assert_eq!(agg.summary().count, 2);
    }
}
