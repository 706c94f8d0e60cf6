//! A scriptable fake Method peer speaking `spec.md` §6's wire protocol
//! over an in-memory duplex pipe, standing in for a real method
//! subprocess (`debapt-method-file` et al.) in tests that want to drive
//! `debapt_acquire`'s engine/queue logic without spawning a child process
//! or touching the filesystem.
//!
//! Grounded in `debapt_acquire::worker::Worker`'s framing (the same
//! `StanzaCodec` over `FramedRead`/`FramedWrite`), but with the transport
//! swapped from a `Child`'s piped stdio for a `tokio::io::duplex` pair so
//! a test can hold both ends.

use debapt_acquire::protocol::{code, Stanza, StanzaCodec};
use futures::{SinkExt, StreamExt};
use tokio::io::{DuplexStream, ReadHalf, WriteHalf};
use tokio_util::codec::{FramedRead, FramedWrite};

const DUPLEX_BUFFER: usize = 64 * 1024;

/// One end of a fake-method duplex: what a test holds to act as the
/// engine side, sending `600 URI Acquire` stanzas and reading whatever
/// the scripted method emits back.
pub struct EngineSide {
    pub reader: FramedRead<ReadHalf<DuplexStream>, StanzaCodec>,
    pub writer: FramedWrite<WriteHalf<DuplexStream>, StanzaCodec>,
}

/// The other end: what [`ScriptedMethod::run`] drives.
pub struct MethodSide {
    reader: FramedRead<ReadHalf<DuplexStream>, StanzaCodec>,
    writer: FramedWrite<WriteHalf<DuplexStream>, StanzaCodec>,
}

/// Build a connected `(EngineSide, MethodSide)` pair.
#[must_use]
pub fn duplex_pair() -> (EngineSide, MethodSide) {
    let (engine_stream, method_stream) = tokio::io::duplex(DUPLEX_BUFFER);
    let (engine_read, engine_write) = tokio::io::split(engine_stream);
    let (method_read, method_write) = tokio::io::split(method_stream);
    (
        EngineSide { reader: FramedRead::new(engine_read, StanzaCodec), writer: FramedWrite::new(engine_write, StanzaCodec) },
        MethodSide { reader: FramedRead::new(method_read, StanzaCodec), writer: FramedWrite::new(method_write, StanzaCodec) },
    )
}

/// A canned reply to one `600 URI Acquire`, matched by the `URI` field.
#[derive(Debug, Clone)]
pub struct ScriptedResponse {
    pub uri: String,
    pub reply: Stanza,
}

impl ScriptedResponse {
    /// A `201 URI Done` reply carrying the given `SHA256-Hash`.
    #[must_use]
    pub fn done(uri: impl Into<String>, filename: &str, sha256: &str) -> Self {
        let uri = uri.into();
        Self {
            uri: uri.clone(),
            reply: Stanza::new(code::URI_DONE, "URI Done")
                .with_field("URI", uri)
                .with_field("Filename", filename)
                .with_field("SHA256-Hash", sha256),
        }
    }

    /// A `400 URI Failure` reply with the given `FailReason` tag.
    #[must_use]
    pub fn failure(uri: impl Into<String>, fail_reason: &str) -> Self {
        let uri = uri.into();
        Self {
            uri: uri.clone(),
            reply: Stanza::new(code::URI_FAILURE, "URI Failure").with_field("URI", uri).with_field("FailReason", fail_reason),
        }
    }
}

/// A fake method that announces `100 Capabilities` on startup, then
/// collects every `600 URI Acquire` it receives before replaying
/// `responses` in the *given* order -- deliberately not necessarily the
/// order requests arrived in, so a test can reproduce `spec.md` §8's
/// pipeline-mis-order scenario (S6).
pub struct ScriptedMethod {
    pub pipeline: bool,
    pub responses: Vec<ScriptedResponse>,
}

impl ScriptedMethod {
    #[must_use]
    pub fn new(pipeline: bool, responses: Vec<ScriptedResponse>) -> Self {
        Self { pipeline, responses }
    }

    /// Run the scripted session to completion: announce capabilities,
    /// read exactly `self.responses.len()` `600 URI Acquire` requests,
    /// then emit every scripted reply in script order and close.
    ///
    /// # Panics
    /// Panics if the engine side closes before sending the expected
    /// number of requests, or sends something other than a `600 URI
    /// Acquire`.
    pub async fn run(mut self, mut side: MethodSide) {
        let capabilities = Stanza::new(code::CAPABILITIES, "Capabilities")
            .with_field("Single-Instance", "false")
            .with_field("Pipeline", if self.pipeline { "true" } else { "false" })
            .with_field("Send-Config", "false")
            .with_field("Local-Only", "true")
            .with_field("Needs-Cleanup", "false")
            .with_field("Removable", "false");
        side.writer.send(capabilities).await.expect("send capabilities");

        let mut requested_uris = Vec::new();
        while requested_uris.len() < self.responses.len() {
            let Some(stanza) = side.reader.next().await else {
                panic!("engine closed after {} of {} expected requests", requested_uris.len(), self.responses.len());
            };
            let stanza = stanza.expect("valid stanza");
            assert_eq!(stanza.code, code::URI_ACQUIRE, "expected 600 URI Acquire, got {}", stanza.code);
            requested_uris.push(stanza.field("URI").unwrap_or_default().to_owned());
        }

        for response in std::mem::take(&mut self.responses) {
            side.writer.send(response.reply).await.expect("send scripted reply");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_responses_in_scripted_order_not_request_order() {
        let (mut engine, method) = duplex_pair();

        let responses = vec![
            ScriptedResponse::done("file:///a", "/tmp/a", "aaaa"),
            ScriptedResponse::done("file:///c", "/tmp/c", "cccc"),
            ScriptedResponse::done("file:///b", "/tmp/b", "bbbb"),
        ];
        let driver = tokio::spawn(ScriptedMethod::new(true, responses).run(method));

        let first = engine.reader.next().await.unwrap().unwrap();
        assert_eq!(first.code, code::CAPABILITIES);

        for uri in ["file:///a", "file:///b", "file:///c"] {
            engine.writer.send(Stanza::new(code::URI_ACQUIRE, "URI Acquire").with_field("URI", uri)).await.unwrap();
        }

        let mut order = Vec::new();
        for _ in 0..3 {
            let stanza = engine.reader.next().await.unwrap().unwrap();
            order.push(stanza.field("URI").unwrap().to_owned());
        }
        assert_eq!(order, vec!["file:///a", "file:///c", "file:///b"]);

        driver.await.unwrap();
    }
}
