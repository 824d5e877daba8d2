use chrono::{DateTime, NaiveDate, Utc};

use crate::error::{Error, Result};

/// A rental reservation as stored in the record store. Immutable input to a
/// price check; this crate only ever reads it.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Reservation {
    pub id: String,
    pub location: String,
    pub pickup_date: NaiveDate,
    pub dropoff_date: NaiveDate,
    /// Time-of-day as the site displays it, e.g. "10:00 AM".
    pub pickup_time: String,
    pub dropoff_time: String,
}

/// Category -> price mapping produced by one search execution.
///
/// Insertion order is preserved so that [`PriceQuote::lowest`] resolves ties
/// deterministically (first-encountered wins). Serializes as a JSON object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceQuote {
    entries: Vec<(String, f64)>,
}

impl PriceQuote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a category price, replacing any earlier entry for the same
    /// category without disturbing its position.
    pub fn insert(&mut self, category: impl Into<String>, price: f64) {
        let category = category.into();
        match self.entries.iter_mut().find(|(c, _)| *c == category) {
            Some(entry) => entry.1 = price,
            None => self.entries.push((category, price)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, category: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(c, _)| c == category)
            .map(|(_, p)| *p)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(c, p)| (c.as_str(), *p))
    }

    /// Category with the minimum price, linear scan. Ties keep the
    /// first-encountered entry.
    pub fn lowest(&self) -> Option<(&str, f64)> {
        let mut best: Option<(&str, f64)> = None;
        for (category, price) in self.iter() {
            match best {
                Some((_, lowest)) if price >= lowest => {}
                _ => best = Some((category, price)),
            }
        }
        best
    }
}

impl serde::Serialize for PriceQuote {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (category, price) in &self.entries {
            map.serialize_entry(category, price)?;
        }
        map.end()
    }
}

/// A persisted, timestamped summary of one quote. Field names match the
/// append-only `price_history` table.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PriceSnapshot {
    #[serde(rename = "booking_id")]
    pub reservation_id: String,
    pub prices: PriceQuote,
    #[serde(rename = "lowest_price_category")]
    pub lowest_category: String,
    pub lowest_price: f64,
    #[serde(rename = "created_at")]
    pub captured_at: DateTime<Utc>,
}

impl PriceSnapshot {
    /// Derive a snapshot from a quote. Fails on an empty quote: a snapshot
    /// is only ever recorded for a non-empty, validated quote.
    pub fn compute(reservation_id: impl Into<String>, quote: PriceQuote) -> Result<Self> {
        let (category, price) = match quote.lowest() {
            Some((category, price)) => (category.to_owned(), price),
            None => return Err(Error::EmptyQuote),
        };
        Ok(Self {
            reservation_id: reservation_id.into(),
            prices: quote,
            lowest_category: category,
            lowest_price: price,
            captured_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowest_scans_linearly() {
        let mut quote = PriceQuote::new();
        quote.insert("Economy", 45.0);
        quote.insert("SUV", 120.0);
        quote.insert("Compact", 52.5);
        assert_eq!(quote.lowest(), Some(("Economy", 45.0)));
    }

    #[test]
    fn lowest_tie_keeps_first_encountered() {
        let mut quote = PriceQuote::new();
        quote.insert("Standard", 60.0);
        quote.insert("Intermediate", 60.0);
        assert_eq!(quote.lowest(), Some(("Standard", 60.0)));
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut quote = PriceQuote::new();
        quote.insert("Economy", 45.0);
        quote.insert("SUV", 120.0);
        quote.insert("Economy", 44.0);
        assert_eq!(quote.len(), 2);
        assert_eq!(quote.get("Economy"), Some(44.0));
        assert_eq!(quote.iter().next(), Some(("Economy", 44.0)));
    }

    #[test]
    fn compute_fails_on_empty_quote() {
        let result = PriceSnapshot::compute("b-1", PriceQuote::new());
        assert!(matches!(result, Err(Error::EmptyQuote)));
    }

    #[test]
    fn compute_records_minimum() {
        let mut quote = PriceQuote::new();
        quote.insert("Economy", 45.0);
        quote.insert("SUV", 120.0);
        let snapshot = PriceSnapshot::compute("b-1", quote).unwrap();
        assert_eq!(snapshot.lowest_category, "Economy");
        assert_eq!(snapshot.lowest_price, 45.0);
        assert_eq!(snapshot.reservation_id, "b-1");
    }

    #[test]
    fn quote_serializes_as_object() {
        let mut quote = PriceQuote::new();
        quote.insert("Economy", 45.0);
        quote.insert("SUV", 120.0);
        let json = serde_json::to_value(&quote).unwrap();
        assert_eq!(json, serde_json::json!({"Economy": 45.0, "SUV": 120.0}));
    }
}
