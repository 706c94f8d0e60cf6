//! The acquire queue engine.
//!
//! This crate owns everything between "here is a list of URIs to fetch"
//! and "here are the files on disk, verified": method worker subprocesses
//! speaking the wire protocol in [`protocol`], the per-host/per-scheme
//! [`queue::Queue`]s that pipeline requests to them, and the [`engine::Engine`]
//! run loop that drives queues to completion while reporting [`engine::Pulse`]
//! progress.
//!
//! Actual network I/O (HTTP, FTP, ...) is out of scope here; that lives in
//! method binaries such as `debapt-method-file`, spoken to only through
//! the stanza protocol this crate frames.
//!
//! # Example
//!
//! ```no_run
//! use debapt_acquire::engine::{Engine, NullSink};
//! use debapt_acquire::item::Item;
//! use debapt_config::AcquireConfig;
//!
//! # async fn run() -> debapt_acquire::error::Result<()> {
//! let mut engine = Engine::new(AcquireConfig::default());
//! engine.enqueue(1, Item::new("file:///srv/repo/Packages.gz", "/tmp/Packages.gz".into()))?;
//! engine.run(&mut NullSink).await?;
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod item;
pub mod method;
pub mod protocol;
pub mod queue;
pub mod worker;

pub use engine::{Engine, NullSink, Pulse, ProgressSink};
pub use error::{AcquireError, Result};
pub use item::{ExpectedHashes, FailReason, Item, ItemStatus};
pub use method::MethodConfig;
pub use protocol::{code, Stanza, StanzaCodec};
pub use queue::{OwnerId, Queue, QueueEntry, QueueNamer};
pub use worker::Worker;
