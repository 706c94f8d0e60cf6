//! `Worker`: a method subprocess, framed over its stdin/stdout with
//! [`crate::protocol::StanzaCodec`] (`spec.md` §4.5/§9's redesign of the
//! original's fork/exec+`select()` loop into an owned async task with two
//! framed byte streams).

#![allow(unsafe_code)] // pre_exec privilege drop, mirroring Worker::Go's uid sequence

use std::path::Path;
use std::process::Stdio;

use futures::{SinkExt, StreamExt};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio_util::codec::{FramedRead, FramedWrite};

use debapt_platform::SandboxUser;

use crate::error::{AcquireError, Result};
use crate::method::MethodConfig;
use crate::protocol::{code, Stanza, StanzaCodec};

/// A running method subprocess and its framed stdio.
pub struct Worker {
    pub method_name: String,
    child: Child,
    reader: FramedRead<ChildStdout, StanzaCodec>,
    writer: FramedWrite<ChildStdin, StanzaCodec>,
    pub config: MethodConfig,
    /// Number of items dispatched to the wire but not yet confirmed Done
    /// or Failed -- bounded by `MaxPipeDepth` when `config.pipeline`.
    pub pipe_depth: usize,
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("method_name", &self.method_name)
            .field("config", &self.config)
            .field("pipe_depth", &self.pipe_depth)
            .finish()
    }
}

impl Worker {
    /// Spawn `binary_path` and perform the `100 Capabilities` handshake.
    /// If `sandbox` is set, the child drops privileges to that user
    /// immediately after fork, before exec (`spec.md`'s "workers drop to
    /// the sandbox user immediately after fd inheritance").
    ///
    /// # Errors
    /// Returns [`AcquireError::Spawn`] if the subprocess can't be started,
    /// or [`AcquireError::Protocol`] if its first stanza isn't a valid
    /// `100 Capabilities`.
    pub async fn spawn(method_name: &str, binary_path: &Path, sandbox: Option<&SandboxUser>) -> Result<Self> {
        let mut command = Command::new(binary_path);
        command.stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::inherit());

        if let Some(user) = sandbox {
            let user = user.clone();
            unsafe {
                std::os::unix::process::CommandExt::pre_exec(command.as_std_mut(), move || {
                    debapt_platform::drop_privileges(&user).map_err(std::io::Error::other)
                });
            }
        }

        let mut child = command
            .spawn()
            .map_err(|e| AcquireError::Spawn { method: method_name.to_owned(), message: e.to_string() })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| AcquireError::Spawn { method: method_name.to_owned(), message: "no stdin pipe".to_owned() })?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AcquireError::Spawn { method: method_name.to_owned(), message: "no stdout pipe".to_owned() })?;

        let mut reader = FramedRead::new(stdout, StanzaCodec);
        let writer = FramedWrite::new(stdin, StanzaCodec);

        let first = reader
            .next()
            .await
            .ok_or_else(|| AcquireError::WorkerDied { method: method_name.to_owned() })??;
        if first.code != code::CAPABILITIES {
            return Err(AcquireError::Protocol {
                method: method_name.to_owned(),
                message: format!("expected 100 Capabilities, got {}", first.code),
            });
        }
        let config = MethodConfig::from_stanza(&first);

        Ok(Self { method_name: method_name.to_owned(), child, reader, writer, config, pipe_depth: 0 })
    }

    /// Send a `600 URI Acquire` for one item.
    ///
    /// # Errors
    /// Returns [`AcquireError::Protocol`] if the framed write fails.
    pub async fn acquire(&mut self, stanza: Stanza) -> Result<()> {
        self.writer
            .send(stanza)
            .await
            .map_err(|e| AcquireError::Protocol { method: self.method_name.clone(), message: e.to_string() })?;
        self.pipe_depth += 1;
        Ok(())
    }

    /// Send a `601 Configuration` dump.
    ///
    /// # Errors
    /// Returns [`AcquireError::Protocol`] if the framed write fails.
    pub async fn send_configuration(&mut self, stanza: Stanza) -> Result<()> {
        self.writer
            .send(stanza)
            .await
            .map_err(|e| AcquireError::Protocol { method: self.method_name.clone(), message: e.to_string() })
    }

    /// Read the next stanza the worker sends, decrementing `pipe_depth` on
    /// a terminal (`201 URI Done`/`400 URI Failure`) response.
    ///
    /// # Errors
    /// Returns [`AcquireError::Protocol`] on a malformed frame.
    pub async fn next_event(&mut self) -> Result<Option<Stanza>> {
        let Some(stanza) = self.reader.next().await else {
            return Ok(None);
        };
        let stanza = stanza?;
        if matches!(stanza.code, code::URI_DONE | code::URI_FAILURE) {
            self.pipe_depth = self.pipe_depth.saturating_sub(1);
        }
        Ok(Some(stanza))
    }

    /// Close stdin, letting the worker observe EOF (`spec.md`'s
    /// cancellation design: "the engine sends no explicit cancel to
    /// workers; workers observe EOF on stdin").
    pub async fn shutdown(mut self) {
        drop(self.writer);
        let _ = self.child.wait().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spawn_fails_cleanly_on_missing_binary() {
        let result = Worker::spawn("file", Path::new("/no/such/method/binary"), None).await;
        assert!(result.is_err());
    }
}
