//! Twelve-bucket monthly series.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::ops::{AddAssign, Index};

/// Portuguese month abbreviations, January first.
pub const MONTH_LABELS: [&str; 12] = [
    "JAN", "FEV", "MAR", "ABR", "MAI", "JUN", "JUL", "AGO", "SET", "OUT", "NOV", "DEZ",
];

/// Label for a 1-based month, `None` outside 1-12.
pub fn month_label(month: u32) -> Option<&'static str> {
    month
        .checked_sub(1)
        .and_then(|idx| MONTH_LABELS.get(idx as usize).copied())
}

/// One value per calendar month.
///
/// Serializes as a map keyed by [`MONTH_LABELS`], in calendar order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MonthlySeries<T> {
    values: [T; 12],
}

impl<T> MonthlySeries<T>
where
    T: Copy + Default + AddAssign,
{
    pub fn new() -> Self {
        Self {
            values: [T::default(); 12],
        }
    }

    /// Add `value` to the bucket of `month` (1-12). Other months are ignored.
    pub fn add(&mut self, month: u32, value: T) {
        if let Some(slot) = month
            .checked_sub(1)
            .and_then(|idx| self.values.get_mut(idx as usize))
        {
            *slot += value;
        }
    }

    /// Value for `month` (1-12); default outside that range.
    pub fn get(&self, month: u32) -> T {
        month
            .checked_sub(1)
            .and_then(|idx| self.values.get(idx as usize).copied())
            .unwrap_or_default()
    }

    /// Sum of the first `months` buckets. `0` gives the default value and
    /// anything above 12 sums the whole year.
    pub fn total_through(&self, months: u32) -> T {
        let mut total = T::default();
        for value in self.values.iter().take(months as usize) {
            total += *value;
        }
        total
    }

    /// Sum of all twelve buckets.
    pub fn total(&self) -> T {
        self.total_through(12)
    }

    /// `(label, value)` pairs in calendar order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, T)> + '_ {
        MONTH_LABELS.iter().copied().zip(self.values.iter().copied())
    }

    pub fn values(&self) -> &[T; 12] {
        &self.values
    }
}

impl<T> Index<usize> for MonthlySeries<T> {
    type Output = T;

    /// Zero-based index (0 = January).
    fn index(&self, idx: usize) -> &T {
        &self.values[idx]
    }
}

impl<T> Serialize for MonthlySeries<T>
where
    T: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(12))?;
        for (label, value) in MONTH_LABELS.iter().zip(self.values.iter()) {
            map.serialize_entry(label, value)?;
        }
        map.end()
    }
}
