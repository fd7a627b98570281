//! Domain primitives for seasonal partitioning.
//!
//! A unit of work throughout the crate is one broadcast season of one year.
//! [`Season`] and [`SeasonKey`] give those units a total chronological order so
//! the manifest and every derived dataset can be sorted without string tricks.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the four broadcast seasons.
///
/// Variants are declared in calendar order, so the derived `Ord` is
/// chronological within a year.
///
/// # Examples
///
/// ```rust
/// use season_tracker::domain::Season;
///
/// let season: Season = "Summer".parse().unwrap();
/// assert_eq!(season, Season::Summer);
/// assert_eq!(season.start_month(), 7);
/// assert!(Season::Winter < Season::Fall);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl Season {
    pub const ALL: [Self; 4] = [Self::Winter, Self::Spring, Self::Summer, Self::Fall];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Winter => "winter",
            Self::Spring => "spring",
            Self::Summer => "summer",
            Self::Fall => "fall",
        }
    }

    /// First calendar month of the season (1-based).
    #[must_use]
    pub const fn start_month(self) -> u32 {
        match self {
            Self::Winter => 1,
            Self::Spring => 4,
            Self::Summer => 7,
            Self::Fall => 10,
        }
    }

    /// The three calendar months covered by the season.
    #[must_use]
    pub const fn months(self) -> [u32; 3] {
        let start = self.start_month();
        [start, start + 1, start + 2]
    }

    /// Capitalized name used in labels such as `"Spring 2024"`.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Winter => "Winter",
            Self::Spring => "Spring",
            Self::Summer => "Summer",
            Self::Fall => "Fall",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSeasonError(String);

impl fmt::Display for ParseSeasonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid season '{}' (expected winter, spring, summer or fall)",
            self.0
        )
    }
}

impl std::error::Error for ParseSeasonError {}

impl FromStr for Season {
    type Err = ParseSeasonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "winter" => Ok(Self::Winter),
            "spring" => Ok(Self::Spring),
            "summer" => Ok(Self::Summer),
            "fall" | "autumn" => Ok(Self::Fall),
            _ => Err(ParseSeasonError(s.to_string())),
        }
    }
}

/// Identifies one (year, season) unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SeasonKey {
    pub year: i32,
    pub season: Season,
}

impl SeasonKey {
    #[must_use]
    pub const fn new(year: i32, season: Season) -> Self {
        Self { year, season }
    }

    /// First day of the season, used as the x-coordinate of trend charts.
    #[must_use]
    pub fn start_date(&self) -> Option<chrono::NaiveDate> {
        chrono::NaiveDate::from_ymd_opt(self.year, self.season.start_month(), 1)
    }
}

impl fmt::Display for SeasonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.year, self.season)
    }
}

/// Data provider a batch was fetched from.
///
/// Each provider keeps its own data directory, and the origin policy is
/// selected per provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Jikan,
    Bangumi,
}

impl Provider {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Jikan => "jikan",
            Self::Bangumi => "bangumi",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_season_order_is_chronological() {
        let mut keys = vec![
            SeasonKey::new(2024, Season::Spring),
            SeasonKey::new(2023, Season::Fall),
            SeasonKey::new(2024, Season::Winter),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                SeasonKey::new(2023, Season::Fall),
                SeasonKey::new(2024, Season::Winter),
                SeasonKey::new(2024, Season::Spring),
            ]
        );
    }

    #[test]
    fn test_season_parse() {
        assert_eq!("WINTER".parse::<Season>().unwrap(), Season::Winter);
        assert_eq!(" autumn ".parse::<Season>().unwrap(), Season::Fall);
        assert!("monsoon".parse::<Season>().is_err());
    }

    #[test]
    fn test_season_months() {
        assert_eq!(Season::Fall.months(), [10, 11, 12]);
        assert_eq!(Season::Winter.months(), [1, 2, 3]);
    }

    #[test]
    fn test_season_serde_lowercase() {
        let json = serde_json::to_string(&Season::Summer).unwrap();
        assert_eq!(json, "\"summer\"");
        let back: Season = serde_json::from_str("\"fall\"").unwrap();
        assert_eq!(back, Season::Fall);
    }

    #[test]
    fn test_start_date() {
        let date = SeasonKey::new(2020, Season::Summer).start_date().unwrap();
        assert_eq!(date.to_string(), "2020-07-01");
    }
}
