use serde::Serialize;

use waitingroom_core::config::QueueConfig;
use waitingroom_gateway::AdmissionOutcome;

/// Response body for `GET /queues/:domain[/:enable]` (spec §6).
#[derive(Debug, Clone, Serialize)]
pub struct AdmissionResponse {
    pub enabled: bool,
    pub permitted_client: bool,
    pub serial_no: Option<i64>,
    pub permitted_no: Option<i64>,
    pub remaining_wait_sec: Option<i64>,
    pub polling_interval_sec: Option<u64>,
}

impl AdmissionResponse {
    /// Build the response body for one [`AdmissionOutcome`]. `config` is
    /// consulted only to translate a `Waiting` outcome's position gap into
    /// an estimated number of seconds, using the controller's own cadence
    /// (`permit_unit_number` positions advanced every `permit_interval`).
    #[must_use]
    pub fn from_outcome(outcome: &AdmissionOutcome, config: &QueueConfig) -> Self {
        match outcome {
            AdmissionOutcome::InvalidCookie => Self {
                enabled: false,
                permitted_client: false,
                serial_no: None,
                permitted_no: None,
                remaining_wait_sec: None,
                polling_interval_sec: None,
            },
            AdmissionOutcome::AllowedByWhitelist | AdmissionOutcome::AllowedNoQueue => Self {
                enabled: false,
                permitted_client: true,
                serial_no: None,
                permitted_no: None,
                remaining_wait_sec: None,
                polling_interval_sec: None,
            },
            AdmissionOutcome::Enrolling {
                polling_interval_sec,
            } => Self {
                enabled: true,
                permitted_client: false,
                serial_no: None,
                permitted_no: None,
                remaining_wait_sec: None,
                polling_interval_sec: Some(*polling_interval_sec),
            },
            AdmissionOutcome::Waiting {
                serial_no,
                permitted_no,
                polling_interval_sec,
            } => Self {
                enabled: true,
                permitted_client: false,
                serial_no: Some(*serial_no),
                permitted_no: Some(*permitted_no),
                remaining_wait_sec: Some(estimate_remaining_wait_sec(
                    *serial_no,
                    *permitted_no,
                    config,
                )),
                polling_interval_sec: Some(*polling_interval_sec),
            },
            AdmissionOutcome::Permitted {
                serial_no,
                permitted_no,
            } => Self {
                enabled: true,
                permitted_client: true,
                serial_no: Some(*serial_no),
                permitted_no: Some(*permitted_no),
                remaining_wait_sec: Some(0),
                polling_interval_sec: None,
            },
        }
    }
}

fn estimate_remaining_wait_sec(serial_no: i64, permitted_no: i64, config: &QueueConfig) -> i64 {
    let gap = (serial_no - permitted_no).max(0);
    if config.permit_unit_number <= 0 {
        return 0;
    }
    let cycles = gap.div_euclid(config.permit_unit_number)
        + i64::from(gap.rem_euclid(config.permit_unit_number) > 0);
    cycles * i64::try_from(config.permit_interval.as_secs()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn config() -> QueueConfig {
        QueueConfig {
            permit_unit_number: 1000,
            permit_interval: Duration::from_secs(60),
            ..QueueConfig::default()
        }
    }

    #[test]
    fn waiting_estimates_whole_cycles() {
        let outcome = AdmissionOutcome::Waiting {
            serial_no: 2500,
            permitted_no: 1000,
            polling_interval_sec: 60,
        };
        let body = AdmissionResponse::from_outcome(&outcome, &config());
        assert_eq!(body.remaining_wait_sec, Some(120));
    }

    #[test]
    fn permitted_has_zero_remaining_wait() {
        let outcome = AdmissionOutcome::Permitted {
            serial_no: 5,
            permitted_no: 1000,
        };
        let body = AdmissionResponse::from_outcome(&outcome, &config());
        assert!(body.permitted_client);
        assert_eq!(body.remaining_wait_sec, Some(0));
    }

    #[test]
    fn enrolling_has_no_numbers() {
        let outcome = AdmissionOutcome::Enrolling {
            polling_interval_sec: 60,
        };
        let body = AdmissionResponse::from_outcome(&outcome, &config());
        assert!(!body.permitted_client);
        assert!(body.serial_no.is_none());
        assert_eq!(body.polling_interval_sec, Some(60));
    }
}
