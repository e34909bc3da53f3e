//! Calendar quarters used as time buckets

use crate::error::MatrixError;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A calendar quarter, written `2015Q3`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Quarter {
    year: i32,
    quarter: u8,
}

impl Quarter {
    pub fn new(year: i32, quarter: u8) -> Result<Self, MatrixError> {
        if !(1..=4).contains(&quarter) {
            return Err(MatrixError::InvalidQuarter(format!("{}Q{}", year, quarter)));
        }
        Ok(Self { year, quarter })
    }

    /// Quarter containing the given date
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            quarter: (date.month0() / 3 + 1) as u8,
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn quarter(&self) -> u8 {
        self.quarter
    }

    /// The following quarter
    pub fn succ(self) -> Self {
        self.offset(1)
    }

    /// Quarter `n` steps after this one
    pub fn offset(self, n: usize) -> Self {
        let ordinal = self.ordinal() + n as i64;
        Self {
            year: ordinal.div_euclid(4) as i32,
            quarter: (ordinal.rem_euclid(4) + 1) as u8,
        }
    }

    /// Number of quarters from `earlier` to `self` (negative if `self` is earlier)
    pub fn since(self, earlier: Quarter) -> i64 {
        self.ordinal() - earlier.ordinal()
    }

    fn ordinal(self) -> i64 {
        self.year as i64 * 4 + (self.quarter as i64 - 1)
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Q{}", self.year, self.quarter)
    }
}

impl FromStr for Quarter {
    type Err = MatrixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || MatrixError::InvalidQuarter(s.to_string());
        let (year, quarter) = trimmed
            .split_once(['Q', 'q'])
            .ok_or_else(invalid)?;
        let year: i32 = year.trim_end_matches('-').parse().map_err(|_| invalid())?;
        let quarter: u8 = quarter.parse().map_err(|_| invalid())?;
        Self::new(year, quarter).map_err(|_| invalid())
    }
}

impl TryFrom<String> for Quarter {
    type Error = MatrixError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Quarter> for String {
    fn from(q: Quarter) -> Self {
        q.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let q: Quarter = "2015Q3".parse().unwrap();
        assert_eq!(q.year(), 2015);
        assert_eq!(q.quarter(), 3);
        assert_eq!(q.to_string(), "2015Q3");
        assert_eq!("2015-q3".parse::<Quarter>().unwrap(), q);
    }

    #[test]
    fn test_invalid_quarters() {
        assert!("2015Q5".parse::<Quarter>().is_err());
        assert!("2015".parse::<Quarter>().is_err());
        assert!("Q1".parse::<Quarter>().is_err());
        assert!(Quarter::new(2015, 0).is_err());
    }

    #[test]
    fn test_succession_wraps_year() {
        let q = Quarter::new(2019, 4).unwrap();
        assert_eq!(q.succ(), Quarter::new(2020, 1).unwrap());
        assert_eq!(q.offset(5), Quarter::new(2021, 1).unwrap());
        assert_eq!(q.offset(5).since(q), 5);
    }

    #[test]
    fn test_from_date() {
        let date = NaiveDate::from_ymd_opt(2018, 8, 14).unwrap();
        assert_eq!(Quarter::from_date(date), Quarter::new(2018, 3).unwrap());
        let date = NaiveDate::from_ymd_opt(2018, 12, 31).unwrap();
        assert_eq!(Quarter::from_date(date), Quarter::new(2018, 4).unwrap());
    }

    #[test]
    fn test_serde_as_string() {
        let q = Quarter::new(2001, 2).unwrap();
        let json = serde_json::to_string(&q).unwrap();
        assert_eq!(json, "\"2001Q2\"");
        let back: Quarter = serde_json::from_str(&json).unwrap();
        assert_eq!(back, q);
    }
}
