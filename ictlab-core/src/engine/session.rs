//! Kill-zone session filter for new entries.
//!
//! Windows are wall-clock times in an IANA timezone, so daylight saving is
//! handled by `chrono-tz`. A window whose end precedes its start wraps past
//! midnight.

use super::config::ConfigError;
use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillZoneWindow {
    /// `HH:MM`, inclusive.
    pub start: String,
    /// `HH:MM`, exclusive.
    pub end: String,
}

impl KillZoneWindow {
    pub fn new(start: &str, end: &str) -> Self {
        Self {
            start: start.to_string(),
            end: end.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub timezone: String,
    pub windows: Vec<KillZoneWindow>,
}

impl Default for SessionConfig {
    /// New York open and afternoon kill zones.
    fn default() -> Self {
        Self {
            timezone: "America/New_York".to_string(),
            windows: vec![
                KillZoneWindow::new("07:00", "10:00"),
                KillZoneWindow::new("14:00", "16:00"),
            ],
        }
    }
}

/// Parsed, ready-to-query form of [`SessionConfig`].
#[derive(Debug, Clone)]
pub struct SessionFilter {
    tz: Tz,
    windows: Vec<(NaiveTime, NaiveTime)>,
}

impl SessionFilter {
    pub fn from_config(config: &SessionConfig) -> Result<Self, ConfigError> {
        let tz = config.timezone.parse::<Tz>().map_err(|e| ConfigError::Invalid {
            field: "session.timezone",
            reason: format!("{}: {e}", config.timezone),
        })?;

        if config.windows.is_empty() {
            return Err(ConfigError::Invalid {
                field: "session.windows",
                reason: "at least one window is required".into(),
            });
        }

        let windows = config
            .windows
            .iter()
            .map(|w| {
                let start = parse_time(&w.start)?;
                let end = parse_time(&w.end)?;
                if start == end {
                    return Err(ConfigError::Invalid {
                        field: "session.windows",
                        reason: format!("empty window {}-{}", w.start, w.end),
                    });
                }
                Ok((start, end))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { tz, windows })
    }

    /// True when `at`, converted to the session timezone, falls in a window.
    pub fn allows(&self, at: DateTime<Utc>) -> bool {
        let local = at.with_timezone(&self.tz).time();
        self.windows.iter().any(|&(start, end)| {
            if start < end {
                local >= start && local < end
            } else {
                local >= start || local < end
            }
        })
    }
}

fn parse_time(s: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(s, "%H:%M").map_err(|e| ConfigError::Invalid {
        field: "session.windows",
        reason: format!("{s}: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn new_york_kill_zones_follow_dst() {
        let filter = SessionFilter::from_config(&SessionConfig::default()).unwrap();

        // January (EST, UTC-5): 12:30 UTC = 07:30 NY.
        assert!(filter.allows(Utc.with_ymd_and_hms(2024, 1, 10, 12, 30, 0).unwrap()));
        // 11:30 UTC = 06:30 NY.
        assert!(!filter.allows(Utc.with_ymd_and_hms(2024, 1, 10, 11, 30, 0).unwrap()));
        // July (EDT, UTC-4): 11:30 UTC = 07:30 NY.
        assert!(filter.allows(Utc.with_ymd_and_hms(2024, 7, 10, 11, 30, 0).unwrap()));
        // 19:30 UTC in January = 14:30 NY, afternoon zone.
        assert!(filter.allows(Utc.with_ymd_and_hms(2024, 1, 10, 19, 30, 0).unwrap()));
        // 10:00 NY is the exclusive end.
        assert!(!filter.allows(Utc.with_ymd_and_hms(2024, 1, 10, 15, 0, 0).unwrap()));
    }

    #[test]
    fn window_wrapping_midnight() {
        let config = SessionConfig {
            timezone: "UTC".into(),
            windows: vec![KillZoneWindow::new("22:00", "02:00")],
        };
        let filter = SessionFilter::from_config(&config).unwrap();
        assert!(filter.allows(Utc.with_ymd_and_hms(2024, 1, 10, 23, 0, 0).unwrap()));
        assert!(filter.allows(Utc.with_ymd_and_hms(2024, 1, 10, 1, 0, 0).unwrap()));
        assert!(!filter.allows(Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap()));
    }

    #[test]
    fn rejects_bad_timezone_and_times() {
        let bad_tz = SessionConfig {
            timezone: "Mars/Olympus".into(),
            ..SessionConfig::default()
        };
        assert!(matches!(
            SessionFilter::from_config(&bad_tz),
            Err(ConfigError::Invalid {
                field: "session.timezone",
                ..
            })
        ));

        let bad_time = SessionConfig {
            windows: vec![KillZoneWindow::new("25:00", "26:00")],
            ..SessionConfig::default()
        };
        assert!(SessionFilter::from_config(&bad_time).is_err());

        let empty = SessionConfig {
            windows: vec![],
            ..SessionConfig::default()
        };
        assert!(SessionFilter::from_config(&empty).is_err());
    }
}
