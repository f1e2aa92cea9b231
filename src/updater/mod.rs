//! Periodic update check
//!
//! [`UpdateChecker::check_for_updates`] refreshes the tracked version and
//! requirements of every package whose last check is older than the
//! staleness window, so running it repeatedly does not spend API budget.
//! [`pending_updates`] then compares tracked versions with what is on disk.
//!
//! Nothing here runs on its own: the host's [`Scheduler`] decides when.

pub mod inject;
pub mod scan;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};

use crate::client::{GitHubApi, fetch_package_headers};
use crate::compat::no_valid_metadata_reason;
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::registry::{RegistryStore, TrackedPackage};

pub use inject::{UpdateDescriptor, pending_updates};
pub use scan::{installed_versions, scan_installed};

/// Upper bound on repositories checked at once
pub const MAX_CONCURRENT_CHECKS: usize = 4;

/// Host scheduler (cron or equivalent)
pub trait Scheduler: Send + Sync {
    /// Run the update check every `interval`
    fn schedule(&self, interval: Duration) -> Result<()>;

    /// Next planned run, `None` when not scheduled
    fn next_run(&self) -> Option<DateTime<Utc>>;

    fn unschedule(&self) -> Result<()>;
}

/// A package whose check failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckFailure {
    pub id: String,
    pub reason: String,
}

/// Outcome of one update check run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckSummary {
    /// Packages whose metadata was fetched
    pub checked: usize,
    /// Checked packages whose tracked version changed
    pub changed: usize,
    /// Packages skipped because they were checked within the window
    pub skipped_fresh: usize,
    /// Packages skipped because the API quota is exhausted
    pub skipped_rate_limited: usize,
    pub failures: Vec<CheckFailure>,
}

impl CheckSummary {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// Refreshes tracked package metadata from GitHub
pub struct UpdateChecker<A: GitHubApi + ?Sized> {
    api: Arc<A>,
    registry: Arc<RegistryStore>,
    staleness: Duration,
    interval: Duration,
    max_concurrent: usize,
}

impl<A: GitHubApi + ?Sized> UpdateChecker<A> {
    pub fn new(api: Arc<A>, registry: Arc<RegistryStore>) -> Self {
        let defaults = Settings::default();
        Self {
            api,
            registry,
            staleness: defaults.cache_ttl(),
            interval: defaults.update_interval(),
            max_concurrent: MAX_CONCURRENT_CHECKS,
        }
    }

    /// Staleness window from the cache duration, schedule from the update interval
    pub fn from_settings(api: Arc<A>, registry: Arc<RegistryStore>, settings: &Settings) -> Self {
        Self::new(api, registry)
            .with_staleness(settings.cache_ttl())
            .with_interval(settings.update_interval())
    }

    pub fn with_staleness(mut self, staleness: Duration) -> Self {
        self.staleness = staleness;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Ask the scheduler to run checks, unless it already does.
    pub fn register(&self, scheduler: &dyn Scheduler) -> Result<()> {
        if scheduler.next_run().is_some() {
            return Ok(());
        }
        scheduler.schedule(self.interval)?;
        log::info!("Scheduled update checks every {:?}", self.interval);
        Ok(())
    }

    pub fn deregister(&self, scheduler: &dyn Scheduler) -> Result<()> {
        scheduler.unschedule()?;
        log::info!("Unscheduled update checks");
        Ok(())
    }

    /// Check stale packages now. `force` ignores the staleness window and
    /// the rate-limit flag ("run now").
    pub async fn check_for_updates(&self, force: bool) -> Result<CheckSummary> {
        self.check_for_updates_at(Utc::now(), force).await
    }

    pub async fn check_for_updates_at(&self, now: DateTime<Utc>, force: bool) -> Result<CheckSummary> {
        let window = chrono::Duration::from_std(self.staleness)
            .unwrap_or_else(|_| chrono::Duration::weeks(52 * 100));
        let mut summary = CheckSummary::default();

        let (stale, fresh): (Vec<TrackedPackage>, Vec<TrackedPackage>) = self
            .registry
            .list(None)?
            .into_iter()
            .partition(|p| force || p.is_stale(now, window));
        summary.skipped_fresh = fresh.len();

        if !force && self.api.is_rate_limited() {
            log::warn!(
                "Rate limit reached; skipping update check for {} packages",
                stale.len()
            );
            summary.skipped_rate_limited = stale.len();
            return Ok(summary);
        }

        let results: Vec<(String, Result<bool>)> = stream::iter(stale)
            .map(|record| async move {
                let result = self.check_one(&record, now).await;
                (record.key(), result)
            })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        for (id, result) in results {
            match result {
                Ok(changed) => {
                    summary.checked += 1;
                    if changed {
                        summary.changed += 1;
                    }
                }
                Err(e) => {
                    log::warn!("Update check failed for {}: {}", id, e);
                    summary.failures.push(CheckFailure {
                        id,
                        reason: e.to_string(),
                    });
                }
            }
        }
        summary.failures.sort_by(|a, b| a.id.cmp(&b.id));

        log::info!(
            "Update check: {} checked, {} changed, {} fresh, {} failed",
            summary.checked,
            summary.changed,
            summary.skipped_fresh,
            summary.failed()
        );
        Ok(summary)
    }

    /// Refresh one record. Every attempt is stamped in `last_checked` so a
    /// failing repository is retried after the window, not on every run.
    async fn check_one(&self, record: &TrackedPackage, now: DateTime<Utc>) -> Result<bool> {
        let key = record.key();
        let fetched = fetch_package_headers(&*self.api, &record.owner, &record.repo, record.kind).await;

        let headers = match fetched {
            Ok(headers) if !headers.declared_version(record.kind).is_empty() => headers,
            other => {
                self.registry
                    .update(&key, |p| p.last_checked = Some(now))
                    .await?;
                return Err(match other {
                    Err(e) if !e.is_not_found() => e,
                    _ => Error::NoValidMetadata(no_valid_metadata_reason(record.kind).to_string()),
                });
            }
        };

        let download_url = self.api.download_url(&record.owner, &record.repo, None);
        let mut changed = false;
        self.registry
            .update(&key, |p| {
                let version = headers.declared_version(record.kind).to_string();
                changed = p.version != version;
                p.version = version;
                p.requires_host = headers.requires_at_least.clone();
                p.tested_host = headers.tested_up_to.clone();
                p.requires_runtime = headers.requires_php.clone();
                p.download_url = download_url;
                p.last_checked = Some(now);
            })
            .await?;

        if changed {
            log::info!("{} now at version {}", key, headers.declared_version(record.kind));
        }
        Ok(changed)
    }

    /// Updates available for the given installed versions (installed path →
    /// version).
    pub fn pending_updates(&self, installed: &HashMap<String, String>) -> Result<Vec<UpdateDescriptor>> {
        Ok(pending_updates(&self.registry.list(None)?, installed))
    }
}
