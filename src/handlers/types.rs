use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One aired episode as reported by a streaming service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub number: u32,
    pub name: Option<String>,
    pub link: String,
    pub date: Option<DateTime<Utc>>,
}

/// A show's presence on a streaming service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stream {
    pub service_key: String,
    /// Service-side identifier, usually a URL slug
    pub show_key: String,
    pub name: Option<String>,
    /// Added to the service's episode numbers to get the real ones
    #[serde(default)]
    pub remote_offset: i32,
}

/// A stream discovered by a seasonal listing, not yet matched to a show
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnprocessedStream {
    pub service_key: String,
    pub show_key: String,
    pub name: String,
    #[serde(default)]
    pub remote_offset: i32,
    #[serde(default)]
    pub display_offset: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShowType {
    #[default]
    Tv,
    Movie,
    Ova,
    Unknown,
}

/// A show as known to a metadata site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Show {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub more_names: Vec<String>,
    #[serde(default)]
    pub show_type: ShowType,
}

/// A show discovered by a seasonal listing, not yet stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnprocessedShow {
    pub site_key: String,
    pub show_key: String,
    pub name: String,
    #[serde(default)]
    pub more_names: Vec<String>,
    #[serde(default)]
    pub show_type: ShowType,
    pub episode_count: Option<u32>,
}

/// Where a show lives on a metadata site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub site_key: String,
    pub site_id: String,
}

/// Quarter of the broadcast year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeasonName {
    Winter,
    Spring,
    Summer,
    Fall,
}

#[derive(Debug, Clone, Error)]
#[error("Unknown season name: {0}")]
pub struct SeasonNameError(String);

impl SeasonName {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeasonName::Winter => "winter",
            SeasonName::Spring => "spring",
            SeasonName::Summer => "summer",
            SeasonName::Fall => "fall",
        }
    }

    /// Season containing a calendar month (1-12)
    pub fn from_month(month: u32) -> Self {
        match month {
            1..=3 => SeasonName::Winter,
            4..=6 => SeasonName::Spring,
            7..=9 => SeasonName::Summer,
            _ => SeasonName::Fall,
        }
    }
}

impl FromStr for SeasonName {
    type Err = SeasonNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "winter" => Ok(SeasonName::Winter),
            "spring" => Ok(SeasonName::Spring),
            "summer" => Ok(SeasonName::Summer),
            "fall" | "autumn" => Ok(SeasonName::Fall),
            other => Err(SeasonNameError(other.to_string())),
        }
    }
}

impl fmt::Display for SeasonName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A broadcast season: year plus quarter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Season {
    pub year: i32,
    pub name: SeasonName,
}

impl Season {
    pub fn new(year: i32, name: SeasonName) -> Self {
        Self { year, name }
    }

    pub fn containing(date: DateTime<Utc>) -> Self {
        Self::new(date.year(), SeasonName::from_month(date.month()))
    }

    pub fn current() -> Self {
        Self::containing(Utc::now())
    }

    /// Fill unset parts from the current season; both unset means "now"
    pub fn resolve(year: Option<i32>, name: Option<SeasonName>) -> Self {
        Self::resolve_at(year, name, Utc::now())
    }

    pub fn resolve_at(year: Option<i32>, name: Option<SeasonName>, now: DateTime<Utc>) -> Self {
        let current = Self::containing(now);
        Self::new(year.unwrap_or(current.year), name.unwrap_or(current.name))
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(year: i32, month: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_season_from_month() {
        assert_eq!(SeasonName::from_month(1), SeasonName::Winter);
        assert_eq!(SeasonName::from_month(4), SeasonName::Spring);
        assert_eq!(SeasonName::from_month(9), SeasonName::Summer);
        assert_eq!(SeasonName::from_month(12), SeasonName::Fall);
    }

    #[test]
    fn test_resolve_defaults_to_current() {
        let now = date(2026, 10);
        assert_eq!(
            Season::resolve_at(None, None, now),
            Season::new(2026, SeasonName::Fall)
        );
    }

    #[test]
    fn test_resolve_keeps_explicit_parts() {
        let now = date(2026, 10);
        assert_eq!(
            Season::resolve_at(Some(2008), Some(SeasonName::Winter), now),
            Season::new(2008, SeasonName::Winter)
        );
        assert_eq!(
            Season::resolve_at(Some(2008), None, now),
            Season::new(2008, SeasonName::Fall)
        );
        assert_eq!(
            Season::resolve_at(None, Some(SeasonName::Spring), now),
            Season::new(2026, SeasonName::Spring)
        );
    }

    #[test]
    fn test_season_name_parsing() {
        assert_eq!("Autumn".parse::<SeasonName>().unwrap(), SeasonName::Fall);
        assert_eq!(
            " summer ".parse::<SeasonName>().unwrap(),
            SeasonName::Summer
        );
        assert!("monsoon".parse::<SeasonName>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Season::new(2026, SeasonName::Fall).to_string(), "fall 2026");
    }
}
