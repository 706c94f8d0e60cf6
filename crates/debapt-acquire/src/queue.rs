//! `Queue`: an ordered list of queued items plus the workers fetching
//! them, named by a derivation of the URI (`spec.md` §4.5's queue-mode
//! rule), implementing the cycle/coalescing/hash-merge/symlink-farm rules.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::Path;

use debapt_config::QueueMode;

use crate::item::{Item, ItemStatus};
use crate::worker::Worker;

/// Opaque handle identifying who asked for an item, so a duplicate-URI
/// enqueue can attach a second owner rather than double-fetching.
pub type OwnerId = u64;

/// One queue slot: the item plus every owner who asked for it.
#[derive(Debug)]
pub struct QueueEntry {
    pub item: Item,
    pub owners: Vec<OwnerId>,
}

/// An ordered queue of items, named per `spec.md`'s queue-mode rule, and
/// the workers currently fetching from it.
pub struct Queue {
    pub name: String,
    pub entries: Vec<QueueEntry>,
    pub workers: Vec<Worker>,
    pub max_pipe_depth: usize,
}

impl std::fmt::Debug for Queue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queue")
            .field("name", &self.name)
            .field("entries", &self.entries.len())
            .field("workers", &self.workers.len())
            .finish()
    }
}

impl Queue {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), entries: Vec::new(), workers: Vec::new(), max_pipe_depth: 1 }
    }

    /// Enqueue `item` on behalf of `owner`. If an entry for the same URI
    /// already exists, `owner` is attached to it and the hash sets are
    /// merged (`spec.md`'s duplicate-coalescing and hash-merging rules)
    /// instead of creating a second fetch.
    pub fn enqueue(&mut self, owner: OwnerId, item: Item) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.item.uri == item.uri) {
            entry.item.merge_hashes(&item.expected_hashes);
            entry.item.expected_size = entry.item.expected_size.or(item.expected_size);
            if !entry.owners.contains(&owner) {
                entry.owners.push(owner);
            }
            return;
        }
        self.entries.push(QueueEntry { item, owners: vec![owner] });
    }

    /// The cycle algorithm (`spec.md`): find the highest priority among
    /// `Fetching` items, then the first `Idle` item at or above it, for as
    /// long as there's pipeline room.
    pub fn cycle(&mut self) -> Vec<usize> {
        let mut dispatched = Vec::new();
        let in_flight = self.entries.iter().filter(|e| e.item.status == ItemStatus::Fetching).count();
        let mut slots = self.max_pipe_depth.saturating_sub(in_flight);

        let floor_priority = self
            .entries
            .iter()
            .filter(|e| e.item.status == ItemStatus::Fetching)
            .map(priority_of)
            .max()
            .unwrap_or(0);

        while slots > 0 {
            let Some(idx) = self
                .entries
                .iter()
                .position(|e| e.item.status == ItemStatus::Idle && priority_of(e) >= floor_priority)
            else {
                break;
            };
            self.entries[idx].item.status = ItemStatus::Fetching;
            dispatched.push(idx);
            slots -= 1;
        }
        dispatched
    }

    /// Link every non-primary owner's destination path to the largest
    /// partial file, so progress reporters watching any of them see the
    /// same bytes (`spec.md`'s symlink-farm rule). `destinations` is every
    /// owner's requested path for one queue entry; the first (by file
    /// size on disk, ties broken by declaration order) is kept as the
    /// real file.
    ///
    /// # Errors
    /// Returns the underlying I/O error if a symlink can't be created.
    pub fn farm_symlinks(destinations: &[std::path::PathBuf]) -> std::io::Result<()> {
        let Some((primary_idx, _)) = destinations
            .iter()
            .enumerate()
            .max_by_key(|(_, path)| std::fs::metadata(path).map(|m| m.len()).unwrap_or(0))
        else {
            return Ok(());
        };
        let primary = &destinations[primary_idx];
        for (idx, path) in destinations.iter().enumerate() {
            if idx == primary_idx || path == primary {
                continue;
            }
            if path.exists() {
                std::fs::remove_file(path)?;
            }
            symlink(primary, path)?;
        }
        Ok(())
    }
}

#[cfg(unix)]
fn symlink(original: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(original, link)
}

#[cfg(not(unix))]
fn symlink(original: &Path, link: &Path) -> std::io::Result<()> {
    std::fs::copy(original, link).map(|_| ())
}

fn priority_of(entry: &QueueEntry) -> i32 {
    -(entry.item.expected_additional_items as i32)
}

/// Derives the queue name for one URI under the configured [`QueueMode`]
/// (`spec.md`'s queue-naming rule): `access` mode keys on scheme alone;
/// `host` mode keys on `(scheme, host)`, hashing hosts past
/// `queue_host_limit` into one of the existing slots rather than growing
/// without bound.
pub struct QueueNamer {
    mode: QueueMode,
    host_limit: usize,
    assigned_slots: HashMap<String, usize>,
}

impl QueueNamer {
    #[must_use]
    pub fn new(mode: QueueMode, host_limit: usize) -> Self {
        Self { mode, host_limit: host_limit.max(1), assigned_slots: HashMap::new() }
    }

    /// Name the queue a given URI belongs in.
    #[must_use]
    pub fn name_for(&mut self, uri: &url::Url) -> String {
        let scheme = uri.scheme().to_owned();
        match self.mode {
            QueueMode::Access => scheme,
            QueueMode::Host => {
                let Some(host) = uri.host_str() else {
                    return scheme;
                };
                let host_key = format!("{scheme}://{host}");
                if self.assigned_slots.len() < self.host_limit || self.assigned_slots.contains_key(&host_key) {
                    let next_slot = self.assigned_slots.len();
                    let slot = *self.assigned_slots.entry(host_key.clone()).or_insert(next_slot);
                    format!("{scheme}:{host}#{slot}")
                } else {
                    let mut hasher = DefaultHasher::new();
                    host_key.hash(&mut hasher);
                    let slot = (hasher.finish() as usize) % self.host_limit;
                    format!("{scheme}:slot{slot}")
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Item;

    fn item(uri: &str) -> Item {
        Item::new(uri, std::path::PathBuf::from("/tmp/x"))
    }

    #[test]
    fn duplicate_uri_attaches_second_owner_instead_of_refetching() {
        let mut queue = Queue::new("http:deb.debian.org");
        queue.enqueue(1, item("http://deb.debian.org/Packages.gz"));
        queue.enqueue(2, item("http://deb.debian.org/Packages.gz"));
        assert_eq!(queue.entries.len(), 1);
        assert_eq!(queue.entries[0].owners, vec![1, 2]);
    }

    #[test]
    fn cycle_dispatches_up_to_pipe_depth() {
        let mut queue = Queue::new("http:deb.debian.org");
        queue.max_pipe_depth = 2;
        queue.enqueue(1, item("http://deb.debian.org/a"));
        queue.enqueue(1, item("http://deb.debian.org/b"));
        queue.enqueue(1, item("http://deb.debian.org/c"));
        let dispatched = queue.cycle();
        assert_eq!(dispatched.len(), 2);
        assert_eq!(queue.entries[dispatched[0]].item.status, ItemStatus::Fetching);
    }

    #[test]
    fn access_mode_names_queue_by_scheme_only() {
        let mut namer = QueueNamer::new(QueueMode::Access, 4);
        let a = namer.name_for(&url::Url::parse("http://one.test/x").unwrap());
        let b = namer.name_for(&url::Url::parse("http://two.test/y").unwrap());
        assert_eq!(a, b);
        assert_eq!(a, "http");
    }

    #[test]
    fn host_mode_gives_distinct_hosts_distinct_queues_under_the_limit() {
        let mut namer = QueueNamer::new(QueueMode::Host, 4);
        let a = namer.name_for(&url::Url::parse("http://one.test/x").unwrap());
        let b = namer.name_for(&url::Url::parse("http://two.test/y").unwrap());
        assert_ne!(a, b);
    }

    #[test]
    fn host_mode_reuses_slot_for_repeated_host() {
        let mut namer = QueueNamer::new(QueueMode::Host, 4);
        let a = namer.name_for(&url::Url::parse("http://one.test/x").unwrap());
        let b = namer.name_for(&url::Url::parse("http://one.test/y").unwrap());
        assert_eq!(a, b);
    }
}
