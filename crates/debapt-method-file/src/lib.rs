//! The `file://` Method: the one concrete worker binary this crate
//! ships, serving local paths over the protocol `debapt_acquire::protocol`
//! frames (`spec.md` §6). Grounded in `methods/copy.cc`'s `CopyItem`: no
//! network, just a local-to-local copy with hashing and `Resume-Point`
//! support, since the acquire engine's "symlink to source instead of
//! copying" shortcut is a caller-side concern, not this binary's.

use std::path::Path;

use futures::{SinkExt, StreamExt};
use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt, AsyncWrite, SeekFrom};
use tokio_util::codec::{FramedRead, FramedWrite};

use debapt_acquire::protocol::code;
use debapt_acquire::Stanza;

/// Serve `600 URI Acquire` requests read from `input`, writing responses
/// to `output`, until EOF. This is the method's entire event loop; `main`
/// just wires stdin/stdout into it.
pub async fn serve<R, W>(input: R, mut output: W) -> anyhow::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let capabilities = Stanza::new(code::CAPABILITIES, "Capabilities")
        .with_field("Version", "1.0")
        .with_field("Single-Instance", "true")
        .with_field("Pipeline", "true")
        .with_field("Local-Only", "true");
    write_stanza(&mut output, capabilities).await?;

    let mut reader = FramedRead::new(input, debapt_acquire::StanzaCodec);
    while let Some(stanza) = reader.next().await {
        let stanza = stanza?;
        if stanza.code != code::URI_ACQUIRE {
            continue;
        }
        handle_acquire(&stanza, &mut output).await?;
    }
    Ok(())
}

async fn handle_acquire<W>(request: &Stanza, output: &mut W) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let Some(uri) = request.field("URI") else {
        return write_stanza(output, general_failure("no URI field in 600 URI Acquire")).await;
    };
    let Some(destination) = request.field("Filename") else {
        return write_stanza(output, general_failure("no Filename field in 600 URI Acquire")).await;
    };
    let Some(source_path) = uri.strip_prefix("file://") else {
        return write_stanza(output, uri_failure(uri, "Other", "file method given a non-file:// URI")).await;
    };
    let resume_point: u64 = request.field("Resume-Point").and_then(|v| v.parse().ok()).unwrap_or(0);

    match copy_with_hash(Path::new(source_path), Path::new(destination), resume_point).await {
        Ok(result) => {
            write_stanza(output, uri_start(uri, result.size)).await?;
            write_stanza(output, uri_done(uri, destination, &result)).await
        }
        Err(e) => write_stanza(output, uri_failure(uri, "Other", &e.to_string())).await,
    }
}

/// Result of copying one file: total size and its digests, so the caller
/// can send a `201 URI Done` with verification hashes attached.
pub struct CopyResult {
    pub size: u64,
    pub sha256: String,
}

/// Copy `source` to `destination`, optionally resuming from
/// `resume_point` bytes in (`spec.md`'s partial-file resume rule), hashing
/// the whole file as it's read so the engine can verify it without a
/// second pass.
///
/// # Errors
/// Returns an error if either file can't be opened, or the copy fails
/// partway through.
pub async fn copy_with_hash(source: &Path, destination: &Path, resume_point: u64) -> anyhow::Result<CopyResult> {
    let mut src = File::open(source).await?;
    let total_size = src.metadata().await?.len();

    if resume_point > 0 {
        src.seek(SeekFrom::Start(resume_point)).await?;
    }

    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut dst = tokio::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(resume_point == 0)
        .open(destination)
        .await?;
    if resume_point > 0 {
        dst.seek(SeekFrom::Start(resume_point)).await?;
    }

    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = src.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        tokio::io::AsyncWriteExt::write_all(&mut dst, &buf[..n]).await?;
    }

    Ok(CopyResult { size: total_size, sha256: hex::encode(hasher.finalize()) })
}

async fn write_stanza<W>(output: &mut W, stanza: Stanza) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut framed = FramedWrite::new(output, debapt_acquire::StanzaCodec);
    framed.send(stanza).await?;
    Ok(())
}

fn uri_start(uri: &str, size: u64) -> Stanza {
    Stanza::new(code::URI_START, "URI Start").with_field("URI", uri).with_field("Size", size.to_string())
}

fn uri_done(uri: &str, filename: &str, result: &CopyResult) -> Stanza {
    Stanza::new(code::URI_DONE, "URI Done")
        .with_field("URI", uri)
        .with_field("Filename", filename)
        .with_field("Size", result.size.to_string())
        .with_field("SHA256-Hash", result.sha256.clone())
}

fn uri_failure(uri: &str, fail_reason: &str, message: &str) -> Stanza {
    Stanza::new(code::URI_FAILURE, "URI Failure")
        .with_field("URI", uri)
        .with_field("Message", message)
        .with_field("FailReason", fail_reason)
}

fn general_failure(message: &str) -> Stanza {
    Stanza::new(code::GENERAL_FAILURE, "General Failure").with_field("Message", message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn copies_file_and_reports_matching_sha256() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.deb");
        tokio::fs::write(&source, b"package contents").await.unwrap();
        let destination = dir.path().join("dest/partial/source.deb");

        let result = copy_with_hash(&source, &destination, 0).await.unwrap();

        let expected = {
            let mut hasher = Sha256::new();
            hasher.update(b"package contents");
            hex::encode(hasher.finalize())
        };
        assert_eq!(result.sha256, expected);
        assert_eq!(result.size, 17);
        assert_eq!(tokio::fs::read(&destination).await.unwrap(), b"package contents");
    }

    #[tokio::test]
    async fn resume_point_appends_rather_than_overwriting() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.deb");
        tokio::fs::write(&source, b"0123456789").await.unwrap();
        let destination = dir.path().join("dest.deb");
        tokio::fs::write(&destination, b"01234").await.unwrap();

        copy_with_hash(&source, &destination, 5).await.unwrap();

        assert_eq!(tokio::fs::read(&destination).await.unwrap(), b"0123456789");
    }
}
