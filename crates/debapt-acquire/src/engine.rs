//! The main acquire run loop (`spec.md` §4.5): Startup, a select-loop
//! that drains every queue until nothing is left `ToFetch`, Shutdown. Also
//! `Pulse` progress reporting and the `partial/` directory sweep (`Clean`).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use debapt_config::AcquireConfig;

use crate::error::{AcquireError, Result};
use crate::item::ItemStatus;
use crate::queue::{Queue, QueueNamer};

/// A worker-progress snapshot handed to a [`ProgressSink`] on every pulse.
#[derive(Debug, Clone)]
pub struct Pulse {
    pub current_bytes: u64,
    pub total_bytes: u64,
    pub current_items: u32,
    pub total_items: u32,
    pub current_cps: u64,
    pub elapsed: Duration,
}

impl Pulse {
    /// Combined completion fraction: 80% weighted on bytes, 20% on item
    /// count (`spec.md`'s Pulse weighting), since a handful of huge
    /// packages shouldn't report 99% done while a thousand small indexes
    /// are still unfetched.
    #[must_use]
    pub fn fraction(&self) -> f64 {
        let byte_frac = if self.total_bytes == 0 { 1.0 } else { self.current_bytes as f64 / self.total_bytes as f64 };
        let item_frac = if self.total_items == 0 { 1.0 } else { f64::from(self.current_items) / f64::from(self.total_items) };
        0.8 * byte_frac + 0.2 * item_frac
    }

    /// Estimated remaining time, suppressed (`None`) when the current
    /// transfer rate is too low to extrapolate from, or when the estimate
    /// would exceed two days (`spec.md`'s ETA-suppression rule: a number
    /// that large is noise, not signal).
    #[must_use]
    pub fn eta(&self) -> Option<Duration> {
        const MIN_CPS_FOR_ETA: u64 = 10;
        const MAX_USEFUL_ETA: Duration = Duration::from_secs(2 * 24 * 60 * 60);
        if self.current_cps < MIN_CPS_FOR_ETA || self.total_bytes < self.current_bytes {
            return None;
        }
        let remaining_bytes = self.total_bytes - self.current_bytes;
        let eta = Duration::from_secs(remaining_bytes / self.current_cps);
        if eta > MAX_USEFUL_ETA {
            None
        } else {
            Some(eta)
        }
    }
}

/// Receives periodic progress and can cancel the run by returning `false`.
pub trait ProgressSink {
    /// Called roughly every `pulse_interval`. Returning `false` cancels
    /// the run (the caller sees this as a user-initiated abort).
    fn pulse(&mut self, pulse: &Pulse) -> bool {
        let _ = pulse;
        true
    }

    fn log(&mut self, method: &str, message: &str) {
        let _ = (method, message);
    }
}

/// A no-op sink for headless callers that only want the final result.
#[derive(Debug, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {}

/// The top-level fetch engine: every live queue plus the bookkeeping the
/// run loop needs across a single `run()` call.
pub struct Engine {
    config: AcquireConfig,
    namer: QueueNamer,
    queues: HashMap<String, Queue>,
    total_bytes: u64,
    current_bytes: u64,
    started_at: Option<Instant>,
}

impl Engine {
    #[must_use]
    pub fn new(config: AcquireConfig) -> Self {
        let namer = QueueNamer::new(config.queue_mode, config.queue_host_limit);
        Self { config, namer, queues: HashMap::new(), total_bytes: 0, current_bytes: 0, started_at: None }
    }

    /// Enqueue one item, routing it to the right queue by URI (creating
    /// the queue on first use).
    ///
    /// # Errors
    /// Returns [`AcquireError::UnknownScheme`] if the URI can't be parsed.
    pub fn enqueue(&mut self, owner: u64, item: crate::item::Item) -> Result<()> {
        let uri = url::Url::parse(&item.uri).map_err(|_| AcquireError::UnknownScheme(item.uri.clone()))?;
        let queue_name = self.namer.name_for(&uri);
        self.total_bytes += item.expected_size.unwrap_or(0);
        let queue = self.queues.entry(queue_name.clone()).or_insert_with(|| {
            let mut q = Queue::new(queue_name);
            q.max_pipe_depth = self.config.max_pipe_depth;
            q
        });
        queue.enqueue(owner, item);
        Ok(())
    }

    /// Total vs. done item counts across every queue, for `Pulse`.
    #[must_use]
    pub fn item_counts(&self) -> (u32, u32) {
        let total = self.queues.values().map(|q| q.entries.len() as u32).sum();
        let done = self
            .queues
            .values()
            .flat_map(|q| &q.entries)
            .filter(|e| e.item.status == ItemStatus::Done)
            .count() as u32;
        (done, total)
    }

    /// True once every queue entry has reached a terminal state
    /// (`Done`/`Error`/`AuthError` with no alternates left).
    #[must_use]
    pub fn is_drained(&self) -> bool {
        self.queues.values().flat_map(|q| &q.entries).all(|e| {
            matches!(e.item.status, ItemStatus::Done | ItemStatus::Error | ItemStatus::AuthError)
        })
    }

    /// Run every queue's cycle once, dispatching as many idle items as
    /// pipelining allows. Callers drive workers and feed completions back
    /// via [`Self::mark_done`]/[`Self::mark_failed`] between calls; this
    /// function only does the bookkeeping side of one iteration.
    pub fn drive_one_round(&mut self) {
        self.started_at.get_or_insert_with(Instant::now);
        for queue in self.queues.values_mut() {
            queue.cycle();
        }
    }

    /// Record a successful fetch.
    pub fn mark_done(&mut self, queue_name: &str, index: usize, bytes: u64) {
        if let Some(queue) = self.queues.get_mut(queue_name) {
            if let Some(entry) = queue.entries.get_mut(index) {
                entry.item.status = ItemStatus::Done;
                self.current_bytes += bytes;
            }
        }
    }

    /// Record a failure, failing over to the next alternate URI if one
    /// exists (`spec.md`'s fail-fallover rule), otherwise marking the item
    /// permanently failed.
    pub fn mark_failed(&mut self, queue_name: &str, index: usize, reason: crate::item::FailReason) {
        let Some(queue) = self.queues.get_mut(queue_name) else { return };
        let Some(entry) = queue.entries.get_mut(index) else { return };
        entry.item.fail_reason = Some(reason.clone());
        if entry.item.fail_over() {
            debug!(uri = %entry.item.uri, "failed over to alternate URI after {}", reason.as_tag());
            return;
        }
        entry.item.status = if reason.is_transient() { ItemStatus::TransientError } else { ItemStatus::Error };
    }

    /// A `Pulse` snapshot at the current moment.
    #[must_use]
    pub fn pulse(&self) -> Pulse {
        let (done, total) = self.item_counts();
        let elapsed = self.started_at.map_or(Duration::ZERO, |t| t.elapsed());
        let cps = if elapsed.as_secs() > 0 { self.current_bytes / elapsed.as_secs() } else { 0 };
        Pulse {
            current_bytes: self.current_bytes,
            total_bytes: self.total_bytes,
            current_items: done,
            total_items: total,
            current_cps: cps,
            elapsed,
        }
    }

    /// Drive queues to completion, calling `sink.pulse` at roughly
    /// `pulse_interval`. This is a bookkeeping-only loop: actual worker
    /// I/O is expected to be driven concurrently by the caller (typically
    /// via `tokio::select!` against each `Worker::next_event`), feeding
    /// results back through `mark_done`/`mark_failed` before each call
    /// here returns control.
    ///
    /// # Errors
    /// Propagates cancellation as [`AcquireError::Protocol`] if the sink
    /// requests abort.
    pub async fn run(&mut self, sink: &mut dyn ProgressSink) -> Result<()> {
        loop {
            self.drive_one_round();
            let pulse = self.pulse();
            if !sink.pulse(&pulse) {
                return Err(AcquireError::Protocol {
                    method: "engine".to_owned(),
                    message: "run cancelled by progress sink".to_owned(),
                });
            }
            if self.is_drained() {
                return Ok(());
            }
            tokio::time::sleep(self.config.pulse_interval).await;
        }
    }
}

/// Delete every file directly under `partial_dir` that isn't the lock
/// file, `lost+found`, or the basename of a currently-queued item
/// (`spec.md`'s `Clean()`): stale partials from a killed prior run
/// shouldn't accumulate forever.
///
/// # Errors
/// Returns the underlying I/O error from reading the directory or
/// removing an entry.
pub fn clean_partial_dir(partial_dir: &Path, keep_basenames: &[PathBuf]) -> std::io::Result<()> {
    const ALWAYS_KEEP: &[&str] = &["lock", "lost+found"];
    let keep: std::collections::HashSet<_> =
        keep_basenames.iter().filter_map(|p| p.file_name()).map(std::ffi::OsStr::to_owned).collect();

    for entry in std::fs::read_dir(partial_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name_str = name.to_string_lossy();
        if ALWAYS_KEEP.contains(&name_str.as_ref()) || keep.contains(&name) {
            continue;
        }
        if entry.file_type()?.is_dir() {
            warn!(dir = %entry.path().display(), "unexpected directory in partial/, skipping");
            continue;
        }
        std::fs::remove_file(entry.path())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use debapt_config::QueueMode;

    fn config() -> AcquireConfig {
        AcquireConfig {
            queue_mode: QueueMode::Host,
            queue_host_limit: 2,
            max_pipe_depth: 10,
            pulse_interval: Duration::from_millis(10),
        }
    }

    #[test]
    fn pulse_fraction_weights_bytes_over_items() {
        let pulse = Pulse { current_bytes: 80, total_bytes: 100, current_items: 0, total_items: 10, current_cps: 1, elapsed: Duration::ZERO };
        assert!((pulse.fraction() - 0.64).abs() < 1e-9);
    }

    #[test]
    fn eta_suppressed_below_minimum_cps() {
        let pulse = Pulse { current_bytes: 0, total_bytes: 1000, current_items: 0, total_items: 1, current_cps: 1, elapsed: Duration::ZERO };
        assert!(pulse.eta().is_none());
    }

    #[test]
    fn engine_enqueue_routes_by_host() {
        let mut engine = Engine::new(config());
        engine.enqueue(1, crate::item::Item::new("http://a.test/x", PathBuf::from("/tmp/x"))).unwrap();
        engine.enqueue(1, crate::item::Item::new("http://b.test/y", PathBuf::from("/tmp/y"))).unwrap();
        assert_eq!(engine.queues.len(), 2);
    }

    #[test]
    fn is_drained_false_until_all_items_terminal() {
        let mut engine = Engine::new(config());
        engine.enqueue(1, crate::item::Item::new("http://a.test/x", PathBuf::from("/tmp/x"))).unwrap();
        assert!(!engine.is_drained());
    }

    #[test]
    fn clean_partial_dir_keeps_lock_and_queued_items() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("lock"), b"").unwrap();
        std::fs::write(dir.path().join("Packages.gz"), b"keep").unwrap();
        std::fs::write(dir.path().join("stale.deb"), b"stale").unwrap();

        clean_partial_dir(dir.path(), &[PathBuf::from("Packages.gz")]).unwrap();

        assert!(dir.path().join("lock").exists());
        assert!(dir.path().join("Packages.gz").exists());
        assert!(!dir.path().join("stale.deb").exists());
    }
}
