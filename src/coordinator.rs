//! Batch driver: runs the extraction chain for every target, keeps the
//! snapshot store current, delivers relevant news and reports failures.

use crate::analyzer::partition;
use crate::logging::log_with_border;
use crate::model::{ErrorMap, Reconciled, RunSummary, Target, TargetOutcome};
use crate::notifier::{Notifier, messages};
use crate::scraper::{ChainOutcome, Extractor, plan, run_chain};
use crate::storage::{ArtifactPaths, SnapshotStore, write_error_map, write_failure_list};

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tracing::{Instrument, debug, error, info, info_span, warn};

pub struct Channels {
    /// Deliveries and run summaries.
    pub scholarship: String,
    /// Failure digests.
    pub notice: String,
}

pub struct RunSettings {
    pub key: String,
    pub date: String,
    pub keywords: Vec<String>,
    pub channels: Channels,
    pub artifacts: ArtifactPaths,
    pub started_at: Instant,
}

#[derive(Debug)]
pub struct RunReport {
    pub summary: RunSummary,
    pub outcomes: Vec<(String, TargetOutcome)>,
    pub errors: ErrorMap,
    pub failures: Vec<String>,
}

pub struct Coordinator<'a, E: ?Sized, N: ?Sized> {
    settings: RunSettings,
    extractor: &'a mut E,
    store: SnapshotStore,
    notifier: &'a N,
    errors: ErrorMap,
    failures: Vec<String>,
    success_count: usize,
}

impl<'a, E, N> Coordinator<'a, E, N>
where
    E: Extractor + ?Sized,
    N: Notifier + ?Sized,
{
    pub fn new(settings: RunSettings, extractor: &'a mut E, store: SnapshotStore, notifier: &'a N) -> Self {
        Self {
            settings,
            extractor,
            store,
            notifier,
            errors: ErrorMap::new(),
            failures: Vec::new(),
            success_count: 0,
        }
    }

    /// Processes all targets in order, then always emits the summary and
    /// writes the run artifacts, even if the batch loop panicked.
    pub async fn run(mut self, targets: &[Target]) -> RunReport {
        let key = self.settings.key.clone();
        let opening = messages::opening(&key, &chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string());
        self.notify(&self.settings.channels.scholarship, &opening, "opening").await;

        info!("|| {} || crawling {} targets", key, targets.len());
        let mut outcomes = Vec::with_capacity(targets.len());
        let batch = async {
            for (i, target) in targets.iter().enumerate() {
                let index = i + 1;
                let span = info_span!("target", name = %target.name, index);
                let outcome = self.process_target(index, target).instrument(span).await;
                if outcome.is_success() {
                    self.success_count += 1;
                }
                outcomes.push((target.name.clone(), outcome));
            }
        };
        if AssertUnwindSafe(batch).catch_unwind().await.is_err() {
            error!("|| {} || batch aborted by a panic, finishing with partial results", key);
        }

        let summary = RunSummary {
            total_targets: targets.len(),
            success_count: self.success_count,
            failure_count: self.failures.len(),
            elapsed_seconds: self.settings.started_at.elapsed().as_secs_f64(),
        };
        self.finish(&summary).await;

        RunReport {
            summary,
            outcomes,
            errors: self.errors,
            failures: self.failures,
        }
    }

    /// Runs one target through extraction, reconciliation and delivery.
    pub async fn process_target(&mut self, index: usize, target: &Target) -> TargetOutcome {
        log_with_border(&format!("{}({})", target.name, index));

        if !target.is_valid() {
            let reason = "[DB] missing URL or crawling method";
            error!("[ERROR] general | {}", reason);
            self.errors.add(&target.name, "general", reason);
            self.record_failure(&target.name, index, reason);
            return TargetOutcome::ConfigInvalid;
        }

        let steps = plan(target);
        let extraction = match run_chain(&mut *self.extractor, &target.url, &steps).await {
            ChainOutcome::Extracted(extraction) => extraction,
            ChainOutcome::Exhausted(failed) => {
                error!("[FAILURE] {} | extraction failed", target.name);
                if failed.is_empty() {
                    self.errors.add(&target.name, "general", "[OTHER] unknown error");
                }
                for (kind, reason) in failed {
                    self.errors.add(&target.name, kind.name(), reason);
                }
                self.record_failure(&target.name, index, "all extraction strategies failed");
                return TargetOutcome::ExtractionFailed;
            }
        };

        let delta = match self.store.reconcile(&target.name, &extraction) {
            Ok(Reconciled::Unchanged) => {
                info!("[INFO] {}: no new data", target.name);
                return TargetOutcome::Unchanged;
            }
            Ok(Reconciled::Changed(delta)) => delta,
            Err(e) => {
                error!("[ERROR] snapshot | {}: {}", target.name, e);
                self.errors.add(&target.name, "snapshot", e.to_string());
                self.record_failure(&target.name, index, &format!("snapshot error: {}", e));
                return TargetOutcome::PersistenceFailed;
            }
        };

        let (matched, unmatched) = partition(&self.settings.keywords, &delta.data);
        if matched.is_empty() {
            info!("[INFO] {}: nothing passed the keyword filter", target.name);
        }
        if !unmatched.is_empty() {
            debug!("[DEBUG] {}: {} items without keywords", target.name, unmatched.len());
        }

        if !matched.is_empty() {
            let text = messages::delivery(&target.name, &target.url, &matched);
            self.notify(&self.settings.channels.scholarship, &text, "delivery").await;
        }

        TargetOutcome::Delivered {
            matched: matched.len(),
            unmatched: unmatched.len(),
        }
    }

    fn record_failure(&mut self, name: &str, index: usize, reason: &str) {
        self.failures.push(format!("{}({}) - {}", name, index, reason));
    }

    async fn notify(&self, channel: &str, text: &str, what: &str) {
        match self.notifier.send(channel, text).await {
            Ok(()) => info!("[SLACK] {} message sent", what),
            Err(e) => warn!("[SLACK] {} message failed: {}", what, e),
        }
    }

    async fn finish(&self, summary: &RunSummary) {
        let key = &self.settings.key;
        log_with_border("! FINISHED !");
        info!("elapsed: {:.2}s", summary.elapsed_seconds);
        if summary.total_targets > 0 {
            info!(
                "{} of {} targets updated, {} failed",
                summary.success_count, summary.total_targets, summary.failure_count
            );
        }

        let text = messages::summary(key, &self.settings.date, summary);
        self.notify(&self.settings.channels.scholarship, &text, "summary").await;

        let paths = &self.settings.artifacts;
        match write_error_map(&paths.error_map, &self.errors) {
            Ok(()) => info!("error map saved to {}", paths.error_map.display()),
            Err(e) => error!("failed to save error map: {}", e),
        }

        if self.errors.is_empty() {
            info!("no errors recorded, skipping failure digest");
        } else {
            let digest = messages::failure_digest(key, &self.errors);
            self.notify(&self.settings.channels.notice, &digest, "failure digest").await;
        }

        match write_failure_list(&paths.failure_list, &self.failures) {
            Ok(()) => info!("failure list saved to {}", paths.failure_list.display()),
            Err(e) => error!("failed to save failure list: {}", e),
        }
    }
}
