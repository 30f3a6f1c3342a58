//! Human-readable duration parsing and formatting

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DurationParseError {
    #[error("Invalid duration format: {0}")]
    InvalidFormat(String),

    #[error("Invalid number: {0}")]
    InvalidNumber(#[from] std::num::ParseFloatError),

    #[error("Invalid unit: {0}")]
    InvalidUnit(String),

    #[error("Duration must not be negative: {0}")]
    Negative(String),
}

/// Duration wrapper accepting "500ms", "1s", "2m" or a plain number of seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct HumanDuration(pub Duration);

impl HumanDuration {
    pub fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    pub fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn to_human_readable(&self) -> String {
        let millis = self.0.as_millis();
        if millis == 0 {
            return "0s".to_string();
        }

        const UNITS: &[(&str, u128)] = &[("h", 3_600_000), ("m", 60_000), ("s", 1_000)];

        for &(unit, divisor) in UNITS {
            if millis >= divisor && millis % divisor == 0 {
                return format!("{}{}", millis / divisor, unit);
            }
        }

        format!("{}ms", millis)
    }
}

impl From<Duration> for HumanDuration {
    fn from(value: Duration) -> Self {
        Self(value)
    }
}

impl Serialize for HumanDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_human_readable())
    }
}

impl<'de> Deserialize<'de> for HumanDuration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct HumanDurationVisitor;

        impl<'de> serde::de::Visitor<'de> for HumanDurationVisitor {
            type Value = HumanDuration;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a duration as string (e.g., \"500ms\", \"1s\") or seconds")
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(HumanDuration::from_secs(v))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                u64::try_from(v).map(HumanDuration::from_secs).map_err(|_| {
                    serde::de::Error::custom(DurationParseError::Negative(v.to_string()))
                })
            }

            fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Duration::try_from_secs_f64(v).map(HumanDuration).map_err(|_| {
                    serde::de::Error::custom(DurationParseError::Negative(v.to_string()))
                })
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                v.parse::<HumanDuration>().map_err(serde::de::Error::custom)
            }
        }

        deserializer.deserialize_any(HumanDurationVisitor)
    }
}

impl FromStr for HumanDuration {
    type Err = DurationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();

        if s.starts_with('-') {
            return Err(DurationParseError::Negative(s));
        }

        // Plain number means seconds
        if let Ok(secs) = s.parse::<f64>() {
            return Duration::try_from_secs_f64(secs)
                .map(HumanDuration)
                .map_err(|_| DurationParseError::InvalidFormat(s.clone()));
        }

        let (num_str, unit) = match s.find(|c: char| !(c.is_ascii_digit() || c == '.')) {
            Some(0) | None => return Err(DurationParseError::InvalidFormat(s.clone())),
            Some(pos) => (&s[..pos], s[pos..].trim()),
        };

        let num: f64 = num_str.parse()?;

        let secs = match unit {
            "ms" => num / 1_000.0,
            "s" | "sec" | "secs" => num,
            "m" | "min" | "mins" => num * 60.0,
            "h" | "hr" | "hrs" => num * 3_600.0,
            _ => return Err(DurationParseError::InvalidUnit(unit.to_string())),
        };

        Duration::try_from_secs_f64(secs)
            .map(HumanDuration)
            .map_err(|_| DurationParseError::InvalidFormat(s.clone()))
    }
}

impl fmt::Display for HumanDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_human_readable())
    }
}
