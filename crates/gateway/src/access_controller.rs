//! The periodic admission control loop (spec §4.5): for every currently
//! enabled domain, flush its cache, reset it if its `enabled` key has
//! expired, otherwise advance its allowed-number watermark under lock.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::interval;

use waitingroom_core::config::QueueConfig;
use waitingroom_core::site::{ENABLED_DOMAINS_KEY, Site};
use waitingroom_core::Cache;
use waitingroom_state::{StateError, StateStore};

/// What happened to one domain during a single cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainOutcome {
    /// The domain's `enabled` key had expired; it was reset.
    Reset,
    /// The watermark was advanced to this new value.
    Advanced(i64),
    /// Another replica's controller holds the lock this cycle.
    LockContended,
}

/// Summary of one [`AccessController::run_cycle`] call.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub outcomes: Vec<(String, DomainOutcome)>,
}

impl CycleReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// A single persistent task per process (spec §4.5/§5): periodically
/// advances every enabled domain's allowed-number watermark.
pub struct AccessController {
    store: Arc<dyn StateStore>,
    cache: Arc<Cache>,
    config: QueueConfig,
}

impl AccessController {
    #[must_use]
    pub fn new(store: Arc<dyn StateStore>, cache: Arc<Cache>, config: QueueConfig) -> Self {
        Self {
            store,
            cache,
            config,
        }
    }

    /// Run exactly one cycle: read `EnabledDomains`, flush each domain's
    /// cache, reset disabled-but-still-listed domains, otherwise advance.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] if reading `EnabledDomains` fails. A failure
    /// for an individual domain does not abort the rest of the cycle; it is
    /// logged and that domain is skipped (spec §4.5 failure semantics).
    pub async fn run_cycle(&self) -> Result<CycleReport, StateError> {
        let domains = self.store.zrange(ENABLED_DOMAINS_KEY, 0, -1).await?;
        let mut report = CycleReport::default();

        for domain in &domains {
            let site = Site::new(
                self.store.clone(),
                self.cache.clone(),
                self.config.clone(),
                domain.clone(),
            );
            site.flush_cache();

            let outcome = match self.advance_one(&site).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!(domain = %domain, error = %e, "access controller cycle step failed");
                    continue;
                }
            };
            tracing::debug!(domain = %domain, outcome = ?outcome, "access controller domain cycle");
            report.outcomes.push((domain.clone(), outcome));
        }

        if !domains.is_empty() {
            self.store
                .expire(ENABLED_DOMAINS_KEY, self.config.queue_enable_ttl * 2)
                .await?;
        }

        Ok(report)
    }

    async fn advance_one(&self, site: &Site) -> Result<DomainOutcome, StateError> {
        if !site.is_enabled(false).await? {
            site.reset().await?;
            return Ok(DomainOutcome::Reset);
        }

        let (new_allowed, advanced) = site
            .advance_allowed_number_under_lock(self.config.permit_unit_number)
            .await?;
        Ok(if advanced {
            DomainOutcome::Advanced(new_allowed)
        } else {
            DomainOutcome::LockContended
        })
    }

    /// Run cycles on a fixed `PermitIntervalSec` period until `shutdown_rx`
    /// receives a signal. The in-flight cycle is always allowed to finish.
    pub async fn run(self: Arc<Self>, mut shutdown_rx: mpsc::Receiver<()>) {
        tracing::info!("access controller starting");
        let mut ticker = interval(self.config.permit_interval);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("access controller received shutdown signal");
                    break;
                }
                _ = ticker.tick() => {
                    tracing::debug!("access controller cycle starting");
                    match self.run_cycle().await {
                        Ok(report) if report.is_empty() => {
                            tracing::debug!("access controller cycle found no enabled domains");
                        }
                        Ok(report) => {
                            tracing::debug!(domains = report.outcomes.len(), "access controller cycle complete");
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "access controller cycle aborted");
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use waitingroom_state_memory::MemoryStateStore;

    use super::*;

    fn controller(store: Arc<dyn StateStore>) -> AccessController {
        AccessController::new(
            store,
            Arc::new(Cache::new()),
            QueueConfig {
                permit_unit_number: 1000,
                ..QueueConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn empty_enabled_domains_is_a_no_op() {
        let controller = controller(Arc::new(MemoryStateStore::new()));
        let report = controller.run_cycle().await.unwrap();
        assert!(report.is_empty());
    }

    #[tokio::test]
    async fn advances_every_enabled_domain() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStateStore::new());
        let config = QueueConfig {
            permit_unit_number: 1000,
            ..QueueConfig::default()
        };
        let cache = Arc::new(Cache::new());
        for domain in ["a.example", "b.example"] {
            Site::new(store.clone(), cache.clone(), config.clone(), domain)
                .enable()
                .await
                .unwrap();
        }

        let controller = AccessController::new(store.clone(), cache, config);
        let report = controller.run_cycle().await.unwrap();

        assert_eq!(report.outcomes.len(), 2);
        for (_, outcome) in &report.outcomes {
            assert_eq!(*outcome, DomainOutcome::Advanced(1000));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn expired_enabled_key_triggers_reset() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStateStore::new());
        let config = QueueConfig {
            queue_enable_ttl: Duration::from_secs(5),
            permit_unit_number: 1000,
            ..QueueConfig::default()
        };
        let cache = Arc::new(Cache::new());
        let site = Site::new(store.clone(), cache.clone(), config.clone(), "shop.example");
        site.enable().await.unwrap();

        tokio::time::advance(Duration::from_secs(6)).await;

        let controller = AccessController::new(store.clone(), cache, config);
        let report = controller.run_cycle().await.unwrap();

        assert_eq!(report.outcomes, vec![("shop.example".to_owned(), DomainOutcome::Reset)]);
        let members = store.zrange(ENABLED_DOMAINS_KEY, 0, -1).await.unwrap();
        assert!(members.is_empty());
    }
}
