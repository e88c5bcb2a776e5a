//! Scheduler settings.

use crate::error::{JobError, JobResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables read from the `[jobs]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobSettings {
    /// Delay between the end of one tick and the start of the next.
    pub sleep_seconds: u64,
    /// Compare source and destination checksums after each leg.
    pub verify_checksum: bool,
    /// Request encrypted node-to-node channels.
    pub secure_transfers: bool,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            sleep_seconds: 10,
            verify_checksum: true,
            secure_transfers: true,
        }
    }
}

impl JobSettings {
    /// Tick interval.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.sleep_seconds)
    }

    /// Reject values the scheduler cannot run with.
    pub fn validate(&self) -> JobResult<()> {
        if self.sleep_seconds == 0 {
            return Err(JobError::Settings {
                reason: "sleep_seconds must be at least 1".to_string(),
            });
        }
        if self.sleep_seconds > 24 * 3600 {
            return Err(JobError::Settings {
                reason: format!("sleep_seconds {} exceeds one day", self.sleep_seconds),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = JobSettings::default();
        assert_eq!(s.interval(), Duration::from_secs(10));
        assert!(s.verify_checksum);
        assert!(s.secure_transfers);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_zero_sleep_rejected() {
        let s = JobSettings {
            sleep_seconds: 0,
            ..JobSettings::default()
        };
        assert!(matches!(s.validate(), Err(JobError::Settings { .. })));
    }
}
