//! Session dataset store.
//!
//! Holds the current flat dataset and the current multi-year dataset. Each slot is
//! replaced wholesale on a successful load and never edited in place, so readers
//! always observe a fully committed upload.

use std::collections::HashSet;

use crate::domain::{FlatDataset, MultiYearDataset, Record, SkuOption};

#[derive(Debug, Default)]
pub struct DatasetStore {
    flat: FlatDataset,
    multi_year: MultiYearDataset,
}

impl DatasetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flat(&self) -> &[Record] {
        &self.flat
    }

    pub fn multi_year(&self) -> &MultiYearDataset {
        &self.multi_year
    }

    /// Replace the flat dataset with a new upload.
    pub fn replace_flat(&mut self, records: FlatDataset) {
        self.flat = records;
    }

    /// Replace every year at once; years missing from `datasets` are dropped.
    pub fn replace_multi_year(&mut self, datasets: MultiYearDataset) {
        self.multi_year = datasets;
    }

    /// Records of one SKU, in upload order.
    pub fn records_for(&self, sku: &str) -> Vec<&Record> {
        self.flat.iter().filter(|r| r.sku == sku).collect()
    }

    /// Distinct SKUs in first-seen order.
    pub fn skus(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.flat
            .iter()
            .map(|r| r.sku.as_str())
            .filter(|sku| seen.insert(*sku))
            .collect()
    }

    /// Picker options for the current dataset; a single placeholder when empty.
    pub fn sku_options(&self) -> Vec<SkuOption> {
        let skus = self.skus();
        if skus.is_empty() {
            return vec![SkuOption::placeholder()];
        }
        skus.into_iter().map(SkuOption::sku).collect()
    }

    /// Total quantity per SKU in first-seen order; non-finite quantities count as zero.
    pub fn sku_totals(&self) -> Vec<(String, f64)> {
        let mut totals: Vec<(String, f64)> = Vec::new();
        for record in &self.flat {
            let qty = if record.quantity.is_finite() {
                record.quantity
            } else {
                0.0
            };
            match totals.iter_mut().find(|(sku, _)| *sku == record.sku) {
                Some((_, total)) => *total += qty,
                None => totals.push((record.sku.clone(), qty)),
            }
        }
        totals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Price;

    fn rec(sku: &str, qty: f64) -> Record {
        Record {
            date: "2024-01-01".to_string(),
            sku: sku.to_string(),
            quantity: qty,
            price: Price::Missing,
            promotion: 0.0,
        }
    }

    #[test]
    fn sku_options_are_distinct_in_first_seen_order() {
        let mut store = DatasetStore::new();
        store.replace_flat(vec![rec("B", 1.0), rec("A", 2.0), rec("B", 3.0), rec("C", 4.0)]);

        let values: Vec<String> = store.sku_options().into_iter().map(|o| o.value).collect();
        assert_eq!(values, vec!["B", "A", "C"]);
    }

    #[test]
    fn empty_dataset_offers_single_placeholder() {
        let store = DatasetStore::new();
        let options = store.sku_options();
        assert_eq!(options.len(), 1);
        assert!(options[0].is_placeholder());
    }

    #[test]
    fn replace_flat_discards_previous_upload() {
        let mut store = DatasetStore::new();
        store.replace_flat(vec![rec("A", 1.0)]);
        store.replace_flat(vec![rec("Z", 1.0)]);
        assert_eq!(store.skus(), vec!["Z"]);
        assert!(store.records_for("A").is_empty());
    }

    #[test]
    fn replace_multi_year_drops_years_not_reuploaded() {
        let mut store = DatasetStore::new();
        let mut first = MultiYearDataset::new();
        first.insert("2021".to_string(), vec![rec("A", 1.0)]);
        first.insert("2022".to_string(), vec![rec("A", 1.0)]);
        store.replace_multi_year(first);

        let mut second = MultiYearDataset::new();
        second.insert("2023".to_string(), vec![rec("B", 2.0)]);
        store.replace_multi_year(second);

        assert_eq!(store.multi_year().keys().collect::<Vec<_>>(), vec!["2023"]);
    }

    #[test]
    fn sku_totals_ignore_nan_quantities() {
        let mut store = DatasetStore::new();
        store.replace_flat(vec![rec("A", 2.0), rec("B", f64::NAN), rec("A", 3.0)]);
        assert_eq!(
            store.sku_totals(),
            vec![("A".to_string(), 5.0), ("B".to_string(), 0.0)]
        );
    }
}
