//! Aggregation engine: period buckets, per-type and per-site sums, daily series.
//!
//! Every function here returns an empty collection for empty input.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate};

use crate::domain::{BucketKey, DailyPoint, EnergyTotals, Granularity, PeriodBucket, Record};

/// Bucket key of `date` under `granularity`.
///
/// Weeks are keyed by ISO week number only, so dates from different years can
/// share a bucket (e.g. 2024-01-03 and 2025-01-01 both fall in week 1).
pub fn bucket_key(date: NaiveDate, granularity: Granularity) -> BucketKey {
    match granularity {
        Granularity::Day => BucketKey::Day(date),
        Granularity::Week => BucketKey::Week(date.iso_week().week()),
        Granularity::Month => BucketKey::Month {
            year: date.year(),
            month: date.month(),
        },
    }
}

/// Sum production and consumption per period bucket, ordered by key.
pub fn group_by_period(records: &[Record], granularity: Granularity) -> Vec<PeriodBucket> {
    let mut buckets: BTreeMap<BucketKey, EnergyTotals> = BTreeMap::new();
    for r in records {
        buckets.entry(bucket_key(r.date, granularity)).or_default().add(r);
    }
    buckets
        .into_iter()
        .map(|(key, totals)| PeriodBucket { key, totals })
        .collect()
}

/// Total consumption per energy type present in `records`.
pub fn group_by_type(records: &[Record]) -> BTreeMap<String, f64> {
    let mut out = BTreeMap::new();
    for r in records {
        *out.entry(r.energy_type.clone()).or_insert(0.0) += r.consumption_kwh;
    }
    out
}

/// Total consumption per selected site over the whole dataset.
///
/// Only the site selection applies here: the cross-site comparison ignores the
/// date and energy-type criteria of the main filter.
pub fn group_by_site(records: &[Record], sites: &BTreeSet<String>) -> BTreeMap<String, f64> {
    let mut out = BTreeMap::new();
    for r in records.iter().filter(|r| sites.contains(&r.site)) {
        *out.entry(r.site.clone()).or_insert(0.0) += r.consumption_kwh;
    }
    out
}

/// Daily totals from the first to the last date, with missing days as zero.
pub fn resample_daily(records: &[Record]) -> Vec<DailyPoint> {
    let mut by_day: BTreeMap<NaiveDate, EnergyTotals> = BTreeMap::new();
    for r in records {
        by_day.entry(r.date).or_default().add(r);
    }

    let (Some(&first), Some(&last)) = (by_day.keys().next(), by_day.keys().next_back()) else {
        return Vec::new();
    };

    first
        .iter_days()
        .take_while(|d| *d <= last)
        .map(|date| {
            let totals = by_day.get(&date).copied().unwrap_or_default();
            DailyPoint {
                date,
                production_kwh: totals.production_kwh,
                consumption_kwh: totals.consumption_kwh,
            }
        })
        .collect()
}

/// One point per record, in order (the un-resampled chart series).
pub fn raw_series(records: &[Record]) -> Vec<DailyPoint> {
    records
        .iter()
        .map(|r| DailyPoint {
            date: r.date,
            production_kwh: r.production_kwh,
            consumption_kwh: r.consumption_kwh,
        })
        .collect()
}

/// Daily consumption per energy type (dates without records for a type are
/// simply absent from that type's series).
pub fn consumption_series_by_type(records: &[Record]) -> BTreeMap<String, Vec<(NaiveDate, f64)>> {
    let mut sums: BTreeMap<String, BTreeMap<NaiveDate, f64>> = BTreeMap::new();
    for r in records {
        *sums
            .entry(r.energy_type.clone())
            .or_default()
            .entry(r.date)
            .or_insert(0.0) += r.consumption_kwh;
    }
    sums.into_iter()
        .map(|(kind, days)| (kind, days.into_iter().collect()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(y: i32, m: u32, d: u32, site: &str, kind: &str, prod: f64, cons: f64) -> Record {
        Record {
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            site: site.to_string(),
            energy_type: kind.to_string(),
            production_kwh: prod,
            consumption_kwh: cons,
        }
    }

    fn records() -> Vec<Record> {
        vec![
            rec(2024, 1, 30, "A", "Solaire", 10.0, 5.0),
            rec(2024, 1, 30, "A", "Batterie", 0.0, 3.0),
            rec(2024, 2, 1, "A", "Solaire", 20.0, 8.0),
            rec(2024, 2, 12, "B", "Solaire", 4.0, 2.5),
        ]
    }

    #[test]
    fn day_buckets_sum_same_day() {
        let buckets = group_by_period(&records(), Granularity::Day);
        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[0].key.to_string(), "2024-01-30");
        assert_eq!(buckets[0].totals.consumption_kwh, 8.0);
        assert_eq!(buckets[0].totals.production_kwh, 10.0);
    }

    #[test]
    fn month_buckets_are_ordered() {
        let buckets = group_by_period(&records(), Granularity::Month);
        let keys: Vec<String> = buckets.iter().map(|b| b.key.to_string()).collect();
        assert_eq!(keys, vec!["2024-01", "2024-02"]);
        assert_eq!(buckets[1].totals.production_kwh, 24.0);
    }

    #[test]
    fn week_buckets_ignore_year() {
        let rs = vec![
            rec(2024, 1, 3, "A", "Solaire", 1.0, 1.0),
            rec(2025, 1, 1, "A", "Solaire", 2.0, 2.0),
            rec(2024, 1, 10, "A", "Solaire", 4.0, 4.0),
        ];
        let buckets = group_by_period(&rs, Granularity::Week);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].key, BucketKey::Week(1));
        assert_eq!(buckets[0].totals.production_kwh, 3.0);
        assert_eq!(buckets[1].key, BucketKey::Week(2));
    }

    #[test]
    fn consumption_is_conserved_across_partitions() {
        let rs = records();
        let total: f64 = rs.iter().map(|r| r.consumption_kwh).sum();
        for g in Granularity::ALL {
            let sum: f64 = group_by_period(&rs, g).iter().map(|b| b.totals.consumption_kwh).sum();
            assert!((sum - total).abs() < 1e-9, "{g:?}");
        }
        let by_type: f64 = group_by_type(&rs).values().sum();
        assert!((by_type - total).abs() < 1e-9);
    }

    #[test]
    fn types_without_records_are_absent() {
        let by_type = group_by_type(&records()[..1]);
        assert_eq!(by_type.len(), 1);
        assert_eq!(by_type["Solaire"], 5.0);
    }

    #[test]
    fn site_comparison_uses_only_the_selection() {
        let rs = records();
        let sites: BTreeSet<String> = ["A".to_string(), "C".to_string()].into();
        let by_site = group_by_site(&rs, &sites);
        assert_eq!(by_site.len(), 1);
        assert_eq!(by_site["A"], 16.0);
    }

    #[test]
    fn daily_resample_fills_gaps_with_zero() {
        let daily = resample_daily(&records()[..3]);
        assert_eq!(daily.len(), 3);
        assert_eq!(daily[0].consumption_kwh, 8.0);
        assert_eq!(daily[1].date, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
        assert_eq!(daily[1].production_kwh, 0.0);
        assert_eq!(daily[2].production_kwh, 20.0);
    }

    #[test]
    fn per_type_series_sum_per_day() {
        let series = consumption_series_by_type(&records());
        assert_eq!(series["Solaire"].len(), 3);
        assert_eq!(series["Batterie"], vec![(NaiveDate::from_ymd_opt(2024, 1, 30).unwrap(), 3.0)]);
    }

    #[test]
    fn empty_input_gives_empty_outputs() {
        assert!(group_by_period(&[], Granularity::Week).is_empty());
        assert!(group_by_type(&[]).is_empty());
        assert!(group_by_site(&[], &BTreeSet::new()).is_empty());
        assert!(resample_daily(&[]).is_empty());
        assert!(consumption_series_by_type(&[]).is_empty());
    }
}
