//! Human-readable order numbers: `ORD-YYYYMMDD-####`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, ValueObject};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Build the number for the `sequence`-th order of `day` (1-based).
    ///
    /// The sequence must come from an atomic per-day counter; it is padded to
    /// four digits and simply grows wider past 9999.
    pub fn for_day(day: NaiveDate, sequence: u64) -> Result<Self, DomainError> {
        if sequence == 0 {
            return Err(DomainError::invariant("order sequence starts at 1"));
        }
        Ok(Self(format!("ORD-{}-{:04}", day.format("%Y%m%d"), sequence)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Accepts a previously issued number (e.g. loaded from storage).
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        let invalid = || DomainError::validation(format!("malformed order number '{s}'"));
        let rest = s.strip_prefix("ORD-").ok_or_else(invalid)?;
        let (date, seq) = rest.split_once('-').ok_or_else(invalid)?;
        NaiveDate::parse_from_str(date, "%Y%m%d").map_err(|_| invalid())?;
        if seq.len() < 4 || !seq.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        Ok(Self(s.to_string()))
    }
}

impl core::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl ValueObject for OrderNumber {}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 7).unwrap()
    }

    #[test]
    fn formats_with_date_and_padded_sequence() {
        assert_eq!(OrderNumber::for_day(day(), 1).unwrap().as_str(), "ORD-20260307-0001");
        assert_eq!(OrderNumber::for_day(day(), 12345).unwrap().as_str(), "ORD-20260307-12345");
    }

    #[test]
    fn zero_sequence_is_rejected() {
        assert!(OrderNumber::for_day(day(), 0).is_err());
    }

    #[test]
    fn parse_accepts_issued_numbers_only() {
        let issued = OrderNumber::for_day(day(), 42).unwrap();
        assert_eq!(OrderNumber::parse(issued.as_str()).unwrap(), issued);
        assert!(OrderNumber::parse("ORD-2026-0001").is_err());
        assert!(OrderNumber::parse("INV-20260307-0001").is_err());
        assert!(OrderNumber::parse("ORD-20260307-01").is_err());
    }
}
