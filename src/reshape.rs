//! Long <-> wide reshaping shared by derivation and table merges.

use std::borrow::Borrow;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateCell<K, C> {
    pub key: K,
    pub column: C,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pivot<K, C> {
    rows: BTreeMap<K, BTreeMap<C, f64>>,
}

impl<K, C> Default for Pivot<K, C> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Clone, C: Ord + Clone> Pivot<K, C> {
    pub fn from_long<I>(cells: I) -> Result<Self, DuplicateCell<K, C>>
    where
        I: IntoIterator<Item = (K, C, f64)>,
    {
        let mut rows: BTreeMap<K, BTreeMap<C, f64>> = BTreeMap::new();
        for (key, column, value) in cells {
            let row = rows.entry(key.clone()).or_default();
            if row.contains_key(&column) {
                return Err(DuplicateCell { key, column });
            }
            row.insert(column, value);
        }

        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = (&K, &BTreeMap<C, f64>)> {
        self.rows.iter()
    }

    pub fn get<Q>(&self, key: &K, column: &Q) -> Option<f64>
    where
        C: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.rows.get(key).and_then(|row| row.get(column)).copied()
    }

    pub fn to_long(&self) -> Vec<(K, C, f64)> {
        self.rows
            .iter()
            .flat_map(|(key, row)| {
                row.iter()
                    .map(move |(column, value)| (key.clone(), column.clone(), *value))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{DuplicateCell, Pivot};

    #[test]
    fn pivot_groups_cells_by_key_and_keeps_gaps_absent() {
        let pivot = Pivot::from_long(vec![
            (("M", 2030), "a", 1.0),
            (("M", 2030), "b", 2.0),
            (("M", 2040), "a", 3.0),
        ])
        .expect("no duplicate cells");

        assert_eq!(pivot.len(), 2);
        assert_eq!(pivot.get(&("M", 2030), &"b"), Some(2.0));
        assert_eq!(pivot.get(&("M", 2040), &"b"), None);
        assert_eq!(pivot.get(&("M", 2050), &"a"), None);
    }

    #[test]
    fn duplicate_cell_is_reported() {
        let err = Pivot::from_long(vec![(1, "a", 1.0), (1, "a", 2.0)])
            .expect_err("same cell twice");
        assert_eq!(err, DuplicateCell { key: 1, column: "a" });
    }

    #[test]
    fn unpivot_restores_long_rows_in_key_order() {
        let long = vec![(2, "b", 4.0), (1, "b", 2.0), (1, "a", 1.0)];
        let pivot = Pivot::from_long(long).expect("no duplicate cells");

        assert_eq!(
            pivot.to_long(),
            vec![(1, "a", 1.0), (1, "b", 2.0), (2, "b", 4.0)]
        );
    }
}
