//! Immutable, ordered collection of customer records.

use super::homeowner::{Homeowner, RawRecord};

/// One fully loaded snapshot of the homeowners table.
///
/// Never mutated after construction; the cache replaces it wholesale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    records: Vec<Homeowner>,
}

impl Dataset {
    /// Wraps already-typed records, preserving their order.
    #[must_use]
    pub fn new(records: Vec<Homeowner>) -> Self {
        Self { records }
    }

    /// A dataset with no rows.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Normalizes raw loader rows into a dataset.
    ///
    /// Returns the dataset together with the number of rows skipped for
    /// lacking a `customer_id`.
    #[must_use]
    pub fn from_raw(rows: Vec<RawRecord>) -> (Self, usize) {
        let total = rows.len();
        let records: Vec<Homeowner> = rows.into_iter().filter_map(Homeowner::from_raw).collect();
        let skipped = total - records.len();
        (Self { records }, skipped)
    }

    /// All records in load order.
    #[must_use]
    pub fn records(&self) -> &[Homeowner] {
        &self.records
    }

    /// Iterates records in load order.
    pub fn iter(&self) -> std::slice::Iter<'_, Homeowner> {
        self.records.iter()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the dataset has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Homeowner;
    type IntoIter = std::slice::Iter<'a, Homeowner>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<Homeowner> for Dataset {
    fn from_iter<I: IntoIterator<Item = Homeowner>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn rows(values: Vec<Value>) -> Vec<RawRecord> {
        values
            .into_iter()
            .map(|v| {
                let Value::Object(map) = v else {
                    panic!("expected object");
                };
                map
            })
            .collect()
    }

    #[test]
    fn from_raw_counts_skipped_rows_and_keeps_order() {
        let (dataset, skipped) = Dataset::from_raw(rows(vec![
            json!({"customer_id": "b"}),
            json!({"segment": "orphan"}),
            json!({"customer_id": "a"}),
        ]));
        assert_eq!(skipped, 1);
        assert_eq!(dataset.len(), 2);
        let ids: Vec<&str> = dataset.iter().map(|r| r.customer_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn empty_dataset() {
        let dataset = Dataset::empty();
        assert!(dataset.is_empty());
        assert_eq!(dataset.records().len(), 0);
    }
}
