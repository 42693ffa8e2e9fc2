//! Filter engine: site, inclusive date range and energy types.

use crate::domain::{Dataset, FilterCriteria, FilteredView, Record};

/// Select the records matching `criteria`, preserving input order.
///
/// Pure: the same records and criteria always produce the same view, so this
/// can be re-run on every UI interaction.
pub fn filter(records: &[Record], criteria: &FilterCriteria) -> FilteredView {
    FilteredView::new(records.iter().filter(|r| criteria.matches(r)).cloned().collect())
}

/// The selection the dashboards start from: first site (in date order), the
/// full date range of the file and every energy type.
///
/// Returns `None` for an empty dataset, where no site can be chosen.
pub fn default_criteria(dataset: &Dataset) -> Option<FilterCriteria> {
    let site = dataset.sites().into_iter().next()?;
    let (start, end) = dataset.date_range()?;
    FilterCriteria::new(site, start, end, dataset.energy_types()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, NaiveDate};

    fn ymd(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn rec(day: u32, site: &str, kind: &str, prod: f64, cons: f64) -> Record {
        Record {
            date: ymd(day),
            site: site.to_string(),
            energy_type: kind.to_string(),
            production_kwh: prod,
            consumption_kwh: cons,
        }
    }

    fn sample() -> Dataset {
        Dataset::from_records(vec![
            rec(1, "A", "Solaire", 10.0, 5.0),
            rec(2, "B", "Solaire", 7.0, 1.0),
            rec(3, "A", "Batterie", 0.0, 3.0),
            rec(4, "A", "Solaire", 20.0, 8.0),
            rec(6, "A", "Reseau", 0.0, 2.0),
        ])
    }

    #[test]
    fn date_bounds_are_inclusive() {
        let ds = sample();
        let c = FilterCriteria::new("A", ymd(3), ymd(4), ["Solaire", "Batterie"]).unwrap();
        let view = filter(ds.records(), &c);
        let days: Vec<u32> = view.records().iter().map(|r| r.date.day()).collect();
        assert_eq!(days, vec![3, 4]);
    }

    #[test]
    fn site_and_type_must_both_match() {
        let ds = sample();
        let c = FilterCriteria::new("A", ymd(1), ymd(6), ["Solaire"]).unwrap();
        let view = filter(ds.records(), &c);
        assert_eq!(view.len(), 2);
        assert!(view.records().iter().all(|r| r.site == "A" && r.energy_type == "Solaire"));
    }

    #[test]
    fn empty_type_selection_matches_nothing() {
        let ds = sample();
        let c = FilterCriteria::new("A", ymd(1), ymd(6), Vec::<String>::new()).unwrap();
        assert!(filter(ds.records(), &c).is_empty());
    }

    #[test]
    fn filtering_is_idempotent() {
        let ds = sample();
        let c = FilterCriteria::new("A", ymd(2), ymd(6), ["Solaire", "Reseau"]).unwrap();
        let once = filter(ds.records(), &c);
        let twice = filter(once.records(), &c);
        assert_eq!(once, twice);
    }

    #[test]
    fn defaults_cover_the_whole_file() {
        let ds = sample();
        let c = default_criteria(&ds).unwrap();
        assert_eq!(c.site(), "A");
        assert_eq!((c.date_start(), c.date_end()), (ymd(1), ymd(6)));
        assert_eq!(c.energy_types().len(), 3);
        assert_eq!(filter(ds.records(), &c).len(), 4);
    }

    #[test]
    fn defaults_need_data() {
        assert!(default_criteria(&Dataset::default()).is_none());
    }
}
