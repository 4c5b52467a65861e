//! The dispatch run.
//!
//! Users are processed concurrently, at most `concurrency` at a time, with
//! no shared mutable state between them. A failing user is logged and
//! counted; the others carry on. Devices of one user are delivered to in
//! parallel. Transient delivery failures are handed to detached retry tasks
//! so backoff sleeps never hold a worker slot.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use futures::future::{join_all, try_join_all};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use vplan_core::calendar::{clamp_lookahead, is_push_window, next_school_days, to_date_number};
use vplan_core::fingerprint::{DayFingerprint, DeltaAction};
use vplan_core::matching::find_relevant_substitutions;
use vplan_core::substitution::{process_rows, ProcessedSubstitution};
use vplan_core::types::{DateNumber, DbId};
use vplan_db::models::push_subscription::APPLE_PUSH_HOST;
use vplan_events::{PushDispatcher, PushPayload, PushTarget, RetryPolicy};
use vplan_provider::SubstitutionSource;

use super::payload::build_payload;
use super::store::{DispatchStore, StoreError};
use crate::config::DispatchConfig;

// ---------------------------------------------------------------------------
// Options and results
// ---------------------------------------------------------------------------

/// Which devices of a user receive pushes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceFilter {
    #[default]
    All,
    /// Only Apple push endpoints.
    Ios,
    /// Everything except Apple push endpoints.
    Desktop,
}

impl DeviceFilter {
    /// Unknown or missing values select all devices.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("ios") => DeviceFilter::Ios,
            Some("desktop") => DeviceFilter::Desktop,
            _ => DeviceFilter::All,
        }
    }

    pub fn accepts(self, endpoint: &str) -> bool {
        let apple = endpoint.contains(APPLE_PUSH_HOST);
        match self {
            DeviceFilter::All => true,
            DeviceFilter::Ios => apple,
            DeviceFilter::Desktop => !apple,
        }
    }
}

/// Per-run switches taken from the trigger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Ignore the push window and resend unchanged change-sets.
    pub force: bool,
    /// Resend unchanged change-sets.
    pub send_unchanged: bool,
    pub only_user: Option<DbId>,
    pub device: DeviceFilter,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchFilters {
    pub user_id: Option<DbId>,
    pub device: DeviceFilter,
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchSummary {
    pub ok: bool,
    pub forced: bool,
    pub send_unchanged: bool,
    pub include_payload: bool,
    pub filters: DispatchFilters,
    pub users: usize,
    pub users_touched: usize,
    pub notifications_sent: usize,
    /// (user, date) pairs left alone: unchanged change-sets and days with
    /// nothing to report and nothing sent before.
    pub skipped_unchanged: usize,
    pub skipped_no_eligible_device: usize,
    pub cleared: usize,
    pub retries_scheduled: usize,
    pub pruned_devices: usize,
    pub failed_users: usize,
}

impl DispatchSummary {
    fn new(options: &DispatchOptions, include_payload: bool, users: usize) -> Self {
        Self {
            ok: true,
            forced: options.force,
            send_unchanged: options.send_unchanged,
            include_payload,
            filters: DispatchFilters {
                user_id: options.only_user,
                device: options.device,
            },
            users,
            users_touched: 0,
            notifications_sent: 0,
            skipped_unchanged: 0,
            skipped_no_eligible_device: 0,
            cleared: 0,
            retries_scheduled: 0,
            pruned_devices: 0,
            failed_users: 0,
        }
    }

    fn absorb(&mut self, tally: &UserTally) {
        if tally.notifications_sent > 0 {
            self.users_touched += 1;
        }
        self.notifications_sent += tally.notifications_sent;
        self.skipped_unchanged += tally.skipped_unchanged;
        self.skipped_no_eligible_device += tally.skipped_no_eligible_device;
        self.cleared += tally.cleared;
        self.retries_scheduled += tally.retries_scheduled;
        self.pruned_devices += tally.pruned_devices;
    }
}

/// Outcome of [`DispatchEngine::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchRun {
    /// Not forced and outside the weekday push window; nothing was read.
    OutsideWindow,
    Completed(DispatchSummary),
}

/// Failures that abort a whole run.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Substitution rows for a date could not be loaded; nothing was sent.
    #[error("Substitution data for {date} unavailable: {reason}")]
    UpstreamUnavailable { date: DateNumber, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Counters for one user.
#[derive(Debug, Default)]
struct UserTally {
    notifications_sent: usize,
    skipped_unchanged: usize,
    skipped_no_eligible_device: usize,
    cleared: usize,
    retries_scheduled: usize,
    pruned_devices: usize,
}

/// Result of delivering one change-set to a user's devices.
#[derive(Debug, Default)]
struct DeviceDeliveries {
    delivered: usize,
    retries: usize,
    /// Endpoints the push service reported as gone.
    stale: Vec<String>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Runs dispatch triggers against injected persistence, provider and push
/// transport.
pub struct DispatchEngine {
    store: Arc<dyn DispatchStore>,
    source: Arc<dyn SubstitutionSource>,
    push: PushDispatcher,
    retry: RetryPolicy,
    config: DispatchConfig,
}

impl DispatchEngine {
    pub fn new(
        store: Arc<dyn DispatchStore>,
        source: Arc<dyn SubstitutionSource>,
        push: PushDispatcher,
        config: DispatchConfig,
    ) -> Self {
        Self {
            store,
            source,
            push,
            retry: RetryPolicy::with_max_attempts(config.retry_max_attempts),
            config,
        }
    }

    /// Replace the retry policy derived from the configuration.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn push_configured(&self) -> bool {
        self.push.is_configured()
    }

    /// Execute one run at local time `now`.
    pub async fn run(
        &self,
        now: NaiveDateTime,
        options: &DispatchOptions,
    ) -> Result<DispatchRun, DispatchError> {
        if !options.force && !is_push_window(now) {
            tracing::debug!(%now, "Dispatch skipped outside the push window");
            return Ok(DispatchRun::OutsideWindow);
        }

        if !self.push.is_configured() {
            tracing::warn!("Web Push is not configured; deliveries will fail without pruning");
        }

        let recipients = self.store.list_recipients(options.only_user).await?;
        let mut summary =
            DispatchSummary::new(options, self.config.include_payload, recipients.len());
        if recipients.is_empty() {
            return Ok(DispatchRun::Completed(summary));
        }

        let today = now.date();
        let plans: Vec<(DbId, Vec<NaiveDate>)> = recipients
            .into_iter()
            .map(|r| {
                let days = next_school_days(today, clamp_lookahead(r.lookahead_school_days));
                (r.user_id, days)
            })
            .collect();

        let dates: BTreeMap<DateNumber, NaiveDate> = plans
            .iter()
            .flat_map(|(_, days)| days.iter().map(|d| (to_date_number(*d), *d)))
            .collect();
        let substitutions = self.fetch_substitutions(dates.keys().copied()).await?;
        let substitutions = &substitutions;

        let results: Vec<(DbId, Result<UserTally, StoreError>)> = stream::iter(plans)
            .map(move |(user_id, days)| async move {
                let result = self.dispatch_user(user_id, &days, substitutions, options).await;
                (user_id, result)
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        for (user_id, result) in results {
            match result {
                Ok(tally) => summary.absorb(&tally),
                Err(e) => {
                    tracing::error!(user_id, error = %e, "Dispatch failed for user");
                    summary.failed_users += 1;
                }
            }
        }

        tracing::info!(
            users = summary.users,
            users_touched = summary.users_touched,
            notifications_sent = summary.notifications_sent,
            retries_scheduled = summary.retries_scheduled,
            failed_users = summary.failed_users,
            forced = options.force,
            "Dispatch run completed",
        );

        Ok(DispatchRun::Completed(summary))
    }

    /// Fetch and process rows once per distinct date, all dates concurrently.
    async fn fetch_substitutions(
        &self,
        dates: impl Iterator<Item = DateNumber>,
    ) -> Result<HashMap<DateNumber, Vec<ProcessedSubstitution>>, DispatchError> {
        let timeout = self.config.provider_timeout();

        let fetches = dates.map(|date| async move {
            let rows = tokio::time::timeout(timeout, self.source.fetch_rows(date))
                .await
                .map_err(|_| DispatchError::UpstreamUnavailable {
                    date,
                    reason: format!("timed out after {timeout:?}"),
                })?
                .map_err(|e| DispatchError::UpstreamUnavailable {
                    date,
                    reason: e.to_string(),
                })?;
            Ok::<_, DispatchError>((date, process_rows(&rows)))
        });

        match try_join_all(fetches).await {
            Ok(fetched) => Ok(fetched.into_iter().collect()),
            Err(e) => {
                tracing::error!(error = %e, "Dispatch aborted: substitution data unavailable");
                Err(e)
            }
        }
    }

    /// Match, fingerprint, decide and deliver for every lookahead day of one user.
    async fn dispatch_user(
        &self,
        user_id: DbId,
        days: &[NaiveDate],
        substitutions: &HashMap<DateNumber, Vec<ProcessedSubstitution>>,
        options: &DispatchOptions,
    ) -> Result<UserTally, StoreError> {
        let entries = self.store.load_timetable(user_id).await?;
        let mut devices = self.store.list_devices(user_id).await?;
        let mut tally = UserTally::default();

        for &day in days {
            let date = to_date_number(day);
            let rows = substitutions.get(&date).map(Vec::as_slice).unwrap_or_default();
            let matches = find_relevant_substitutions(day, &entries, rows);
            let fingerprint = DayFingerprint::compute(user_id, date, &matches);

            let previous = self.store.latest_fingerprint(user_id, date).await?;
            let action = fingerprint.action_against(previous.as_deref());
            tracing::debug!(
                user_id,
                target_date = date,
                matches = fingerprint.match_count,
                %action,
                "Resolved delta action",
            );

            match action {
                DeltaAction::Clear => {
                    let removed = self.store.clear_fingerprints(user_id, date).await?;
                    tracing::info!(user_id, target_date = date, removed, "Cleared notification history");
                    tally.cleared += 1;
                    continue;
                }
                DeltaAction::Skip => {
                    let resend =
                        (options.force || options.send_unchanged) && fingerprint.match_count > 0;
                    if !resend {
                        tally.skipped_unchanged += 1;
                        continue;
                    }
                }
                DeltaAction::Send => {}
            }

            let Some(hash) = fingerprint.hash.as_deref() else {
                continue;
            };

            let eligible: Vec<PushTarget> = devices
                .iter()
                .filter(|d| options.device.accepts(&d.endpoint))
                .cloned()
                .collect();
            if eligible.is_empty() {
                tally.skipped_no_eligible_device += 1;
                continue;
            }

            let payload = self
                .config
                .include_payload
                .then(|| build_payload(&self.config.app_name, day, &fingerprint));
            let delivery = self
                .deliver_to_devices(user_id, &eligible, payload.as_ref())
                .await;

            for endpoint in &delivery.stale {
                match self.store.prune_subscription(user_id, endpoint).await {
                    Ok(pruned) => {
                        if pruned.removed {
                            tally.pruned_devices += 1;
                        }
                        tracing::info!(
                            user_id,
                            endpoint = %endpoint,
                            notifications_disabled = pruned.notifications_disabled,
                            "Pruned gone push subscription",
                        );
                    }
                    Err(e) => {
                        tracing::warn!(user_id, endpoint = %endpoint, error = %e, "Failed to prune push subscription");
                    }
                }
                devices.retain(|d| &d.endpoint != endpoint);
            }

            tally.notifications_sent += delivery.delivered;
            tally.retries_scheduled += delivery.retries;

            if delivery.delivered > 0 || delivery.retries > 0 {
                self.store
                    .record_fingerprint(user_id, date, hash, fingerprint.match_count)
                    .await?;
            }
        }

        Ok(tally)
    }

    /// Deliver to all devices in parallel and classify the outcomes.
    async fn deliver_to_devices(
        &self,
        user_id: DbId,
        devices: &[PushTarget],
        payload: Option<&PushPayload>,
    ) -> DeviceDeliveries {
        let outcomes = join_all(devices.iter().map(|d| self.push.deliver(d, payload))).await;

        let mut result = DeviceDeliveries::default();
        for (device, outcome) in devices.iter().zip(outcomes) {
            if outcome.is_delivered() {
                result.delivered += 1;
            } else if outcome.should_remove() {
                result.stale.push(device.endpoint.clone());
            } else if outcome.is_retryable() && self.retry.allows_retry() {
                self.schedule_retry(user_id, device.clone(), payload.cloned());
                result.retries += 1;
            } else {
                tracing::warn!(user_id, endpoint = %device.endpoint, outcome = ?outcome, "Push delivery failed");
            }
        }
        result
    }

    /// Re-deliver in a detached task; prunes if the endpoint turns out gone.
    fn schedule_retry(&self, user_id: DbId, target: PushTarget, payload: Option<PushPayload>) {
        let push = self.push.clone();
        let retry = self.retry;
        let store = Arc::clone(&self.store);

        tokio::spawn(async move {
            let outcome = retry.redeliver(&push, &target, payload.as_ref()).await;
            if !outcome.should_remove() {
                return;
            }
            match store.prune_subscription(user_id, &target.endpoint).await {
                Ok(pruned) => tracing::info!(
                    user_id,
                    endpoint = %target.endpoint,
                    notifications_disabled = pruned.notifications_disabled,
                    "Pruned gone push subscription after retry",
                ),
                Err(e) => tracing::warn!(
                    user_id,
                    endpoint = %target.endpoint,
                    error = %e,
                    "Failed to prune push subscription after retry",
                ),
            }
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const APPLE: &str = "https://web.push.apple.com/QGx";
    const FCM: &str = "https://fcm.googleapis.com/fcm/send/abc";

    #[test]
    fn device_filter_parsing() {
        assert_eq!(DeviceFilter::parse(None), DeviceFilter::All);
        assert_eq!(DeviceFilter::parse(Some("ios")), DeviceFilter::Ios);
        assert_eq!(DeviceFilter::parse(Some(" Desktop ")), DeviceFilter::Desktop);
        assert_eq!(DeviceFilter::parse(Some("android")), DeviceFilter::All);
    }

    #[test]
    fn device_filter_matches_apple_endpoints() {
        assert!(DeviceFilter::All.accepts(APPLE));
        assert!(DeviceFilter::All.accepts(FCM));
        assert!(DeviceFilter::Ios.accepts(APPLE));
        assert!(!DeviceFilter::Ios.accepts(FCM));
        assert!(DeviceFilter::Desktop.accepts(FCM));
        assert!(!DeviceFilter::Desktop.accepts(APPLE));
    }

    #[test]
    fn summary_counts_touched_users_once() {
        let mut summary = DispatchSummary::new(&DispatchOptions::default(), false, 2);
        summary.absorb(&UserTally {
            notifications_sent: 3,
            skipped_unchanged: 1,
            ..Default::default()
        });
        summary.absorb(&UserTally {
            retries_scheduled: 1,
            ..Default::default()
        });

        assert_eq!(summary.users_touched, 1);
        assert_eq!(summary.notifications_sent, 3);
        assert_eq!(summary.skipped_unchanged, 1);
        assert_eq!(summary.retries_scheduled, 1);
    }

    #[test]
    fn summary_serializes_camel_case() {
        let options = DispatchOptions {
            force: true,
            device: DeviceFilter::Ios,
            ..Default::default()
        };
        let json = serde_json::to_value(DispatchSummary::new(&options, true, 0)).unwrap();
        assert_eq!(json["ok"], true);
        assert_eq!(json["forced"], true);
        assert_eq!(json["includePayload"], true);
        assert_eq!(json["usersTouched"], 0);
        assert_eq!(json["skippedNoEligibleDevice"], 0);
        assert_eq!(json["filters"]["device"], "ios");
        assert!(json["filters"]["userId"].is_null());
    }
}
