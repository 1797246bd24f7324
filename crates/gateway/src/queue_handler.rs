//! The client-facing admission protocol (spec §4.4): combines cookie state,
//! queue state, and whitelist state into a per-request admission decision.

use std::sync::Arc;

use waitingroom_core::client::{Client, ClientCodec, ClientError};
use waitingroom_core::config::QueueConfig;
use waitingroom_core::site::Site;
use waitingroom_core::{Cache, time::unix_now};
use waitingroom_state::StateStore;

use crate::error::GatewayError;
use crate::whitelist::Whitelist;

/// The outcome of one admission decision, independent of how it's carried
/// over HTTP (spec §6 response body / §4.4 step outcomes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionOutcome {
    /// The cookie failed to decode; the caller must clear it and respond 400.
    InvalidCookie,
    /// Domain is whitelisted; admission never touched queue state.
    AllowedByWhitelist,
    /// Domain's queue is not enabled and the request didn't carry the
    /// enable token; traffic passes straight through.
    AllowedNoQueue,
    /// Client has been issued an identity and is waiting out its entry delay.
    Enrolling { polling_interval_sec: u64 },
    /// Client has a serial number but it exceeds the allowed-number watermark.
    Waiting {
        serial_no: i64,
        permitted_no: i64,
        polling_interval_sec: u64,
    },
    /// Client's serial number is at or below the allowed-number watermark.
    Permitted { serial_no: i64, permitted_no: i64 },
}

/// What the caller should do with the `waiting-room` cookie after this
/// admission decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieAction {
    /// Leave the existing cookie (or absence of one) untouched.
    None,
    /// Clear the cookie (invalid signature/decryption).
    Clear,
    /// Set the cookie to `value` with `MaxAge = PermittedAccessSec`.
    Set { value: String },
}

/// Result of one call to [`QueueHandler::handle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionResult {
    pub outcome: AdmissionOutcome,
    pub cookie: CookieAction,
}

/// Combines [`Client`], [`Site`], [`Cache`], and [`Whitelist`] into the
/// per-request admission decision described in spec §4.4.
pub struct QueueHandler {
    store: Arc<dyn StateStore>,
    cache: Arc<Cache>,
    config: QueueConfig,
    client_codec: Arc<ClientCodec>,
    whitelist: Whitelist,
}

impl QueueHandler {
    #[must_use]
    pub fn new(
        store: Arc<dyn StateStore>,
        cache: Arc<Cache>,
        config: QueueConfig,
        client_codec: Arc<ClientCodec>,
    ) -> Self {
        let whitelist = Whitelist::new(store.clone(), cache.clone(), config.clone());
        Self {
            store,
            cache,
            config,
            client_codec,
            whitelist,
        }
    }

    #[must_use]
    pub fn whitelist(&self) -> &Whitelist {
        &self.whitelist
    }

    /// Decide the admission outcome for one request against `domain`.
    ///
    /// `enable_segment` is the optional `:enable` path segment; when it
    /// matches the configured enable token, an otherwise-disabled domain is
    /// enabled as a side effect of this call (spec §4.4 step 3).
    ///
    /// # Errors
    ///
    /// Propagates a [`GatewayError`] if the shared store is unavailable.
    pub async fn handle(
        &self,
        domain: &str,
        enable_segment: Option<&str>,
        cookie_value: Option<&str>,
    ) -> Result<AdmissionResult, GatewayError> {
        let now = unix_now();

        // Step 1: decode the cookie, if any.
        let mut client = match self.client_codec.decode(cookie_value) {
            Ok(client) => client,
            Err(ClientError::MissingCookie) => Client::new(domain),
            Err(ClientError::InvalidCookie) => {
                tracing::warn!(domain = %domain, "invalid waiting-room cookie, clearing");
                return Ok(AdmissionResult {
                    outcome: AdmissionOutcome::InvalidCookie,
                    cookie: CookieAction::Clear,
                });
            }
        };

        // Step 2: whitelist dominance — never touches queue state.
        if self.whitelist.contains(domain).await? {
            return Ok(AdmissionResult {
                outcome: AdmissionOutcome::AllowedByWhitelist,
                cookie: CookieAction::None,
            });
        }

        let site = Site::new(
            self.store.clone(),
            self.cache.clone(),
            self.config.clone(),
            domain,
        );

        // Step 3: enable-on-demand, or pass straight through.
        if !site.is_enabled(true).await? {
            let enable_requested = enable_segment == Some(self.config.enable_token.as_str());
            if enable_requested {
                site.enable().await?;
            } else {
                return Ok(AdmissionResult {
                    outcome: AdmissionOutcome::AllowedNoQueue,
                    cookie: CookieAction::None,
                });
            }
        }

        let mut mutated = false;

        // Step 4: ensure the client has an identity.
        if client.id.is_empty() {
            client.enroll(now, self.config.entry_delay.as_secs() as i64);
            mutated = true;
        }

        // Step 5: claim a serial number once the entry delay has elapsed.
        if client.serial_number == 0 && client.can_take_serial_number(now) {
            client.serial_number = site.assign_serial_number().await?;
            mutated = true;
        }

        let cookie = if mutated {
            CookieAction::Set {
                value: self.client_codec.encode(&client),
            }
        } else {
            CookieAction::None
        };

        // Still no number: the client is enrolled but waiting out its entry
        // delay (or the queue has just been enabled mid-wait).
        if client.serial_number == 0 {
            return Ok(AdmissionResult {
                outcome: AdmissionOutcome::Enrolling {
                    polling_interval_sec: self.config.client_polling_interval.as_secs(),
                },
                cookie,
            });
        }

        // Steps 6/7: compare against the allowed-number watermark.
        let allowed_no = site.allowed_number().await?;
        if client.serial_number <= allowed_no {
            // Step 6 always refreshes the cookie's MaxAge on a permit,
            // regardless of whether anything else changed this request.
            let cookie = CookieAction::Set {
                value: self.client_codec.encode(&client),
            };
            Ok(AdmissionResult {
                outcome: AdmissionOutcome::Permitted {
                    serial_no: client.serial_number,
                    permitted_no: allowed_no,
                },
                cookie,
            })
        } else {
            Ok(AdmissionResult {
                outcome: AdmissionOutcome::Waiting {
                    serial_no: client.serial_number,
                    permitted_no: allowed_no,
                    polling_interval_sec: self.config.client_polling_interval.as_secs(),
                },
                cookie,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use waitingroom_core::client::ClientCodec;
    use waitingroom_crypto::CookieCodec;
    use waitingroom_state_memory::MemoryStateStore;

    use super::*;

    fn handler() -> QueueHandler {
        let config = QueueConfig {
            entry_delay: Duration::from_secs(10),
            permit_unit_number: 1000,
            ..QueueConfig::default()
        };
        QueueHandler::new(
            Arc::new(MemoryStateStore::new()),
            Arc::new(Cache::new()),
            config,
            Arc::new(ClientCodec::new(CookieCodec::new([0x11; 64], [0x22; 32]))),
        )
    }

    #[tokio::test]
    async fn cold_domain_is_allowed_no_queue() {
        let handler = handler();
        let result = handler.handle("shop.example", None, None).await.unwrap();
        assert_eq!(result.outcome, AdmissionOutcome::AllowedNoQueue);
        assert_eq!(result.cookie, CookieAction::None);
    }

    #[tokio::test]
    async fn enable_and_enroll_then_repeat_stays_enrolling() {
        let handler = handler();
        let result = handler
            .handle("shop.example", Some("enable"), None)
            .await
            .unwrap();
        let CookieAction::Set { value: cookie } = result.cookie else {
            panic!("expected a cookie to be set");
        };
        assert!(matches!(
            result.outcome,
            AdmissionOutcome::Enrolling { .. }
        ));

        let repeat = handler
            .handle("shop.example", None, Some(&cookie))
            .await
            .unwrap();
        assert!(matches!(
            repeat.outcome,
            AdmissionOutcome::Enrolling { .. }
        ));
        assert_eq!(repeat.cookie, CookieAction::None, "no new number allocated");
    }

    #[tokio::test]
    async fn invalid_cookie_is_cleared() {
        let handler = handler();
        let result = handler
            .handle("shop.example", None, Some("not-a-valid-cookie"))
            .await
            .unwrap();
        assert_eq!(result.outcome, AdmissionOutcome::InvalidCookie);
        assert_eq!(result.cookie, CookieAction::Clear);
    }

    #[tokio::test]
    async fn whitelist_bypasses_queue_entirely() {
        let handler = handler();
        handler.whitelist().add("shop.example").await.unwrap();

        let result = handler.handle("shop.example", None, None).await.unwrap();
        assert_eq!(result.outcome, AdmissionOutcome::AllowedByWhitelist);
        assert_eq!(result.cookie, CookieAction::None);
    }

    #[tokio::test]
    async fn full_lifecycle_enroll_wait_then_permit() {
        let handler = handler();

        // Enable + enroll.
        let enrolled = handler
            .handle("shop.example", Some("enable"), None)
            .await
            .unwrap();
        let CookieAction::Set { value: cookie } = enrolled.cookie else {
            panic!("expected a cookie");
        };

        // Manually advance the client's take_serial_number_time into the
        // past by re-encoding, simulating "wait 11 seconds".
        let codec = ClientCodec::new(CookieCodec::new([0x11; 64], [0x22; 32]));
        let mut client = codec.decode(Some(&cookie)).unwrap();
        client.take_serial_number_time -= 20;
        let cookie = codec.encode(&client);

        // Number assignment: serial=1, allowed=0 -> Waiting.
        let waiting = handler
            .handle("shop.example", None, Some(&cookie))
            .await
            .unwrap();
        assert_eq!(
            waiting.outcome,
            AdmissionOutcome::Waiting {
                serial_no: 1,
                permitted_no: 0,
                polling_interval_sec: 60,
            }
        );
        let CookieAction::Set { value: cookie } = waiting.cookie else {
            panic!("expected a cookie carrying the new serial number");
        };

        // Controller advances the watermark.
        let site = Site::new(
            handler_store(&handler),
            handler_cache(&handler),
            QueueConfig {
                entry_delay: Duration::from_secs(10),
                permit_unit_number: 1000,
                ..QueueConfig::default()
            },
            "shop.example",
        );
        site.advance_allowed_number_under_lock(1000).await.unwrap();

        let permitted = handler
            .handle("shop.example", None, Some(&cookie))
            .await
            .unwrap();
        assert_eq!(
            permitted.outcome,
            AdmissionOutcome::Permitted {
                serial_no: 1,
                permitted_no: 1000,
            }
        );
        assert!(matches!(permitted.cookie, CookieAction::Set { .. }));
    }

    fn handler_store(handler: &QueueHandler) -> Arc<dyn StateStore> {
        handler.store.clone()
    }

    fn handler_cache(handler: &QueueHandler) -> Arc<Cache> {
        handler.cache.clone()
    }
}
