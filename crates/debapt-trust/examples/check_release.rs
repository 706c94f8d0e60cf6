//! Example: check an `InRelease` file against a local `trusted.gpg.d`-style
//! keyring directory and report whether it would be accepted into the
//! cache.

use std::env;
use std::path::Path;

use chrono::Utc;
use debapt_trust::{accept_release, parse_release_date, FreshnessPolicy, Keyring, ReleaseSource};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = env::args().skip(1);
    let release_path = args.next().unwrap_or_else(|| "InRelease".to_owned());
    let keyring_dir = args.next().unwrap_or_else(|| "/etc/apt/trusted.gpg.d".to_owned());

    let release_path = Path::new(&release_path);
    if !release_path.exists() {
        eprintln!("no such file: {}", release_path.display());
        eprintln!("usage: check_release <InRelease> <trusted.gpg.d dir>");
        return Ok(());
    }

    let data = std::fs::read(release_path)?;
    let keyring = Keyring::load_dir(&keyring_dir)?;
    println!("loaded {} trusted certificate(s) from {keyring_dir}", keyring.certs().len());

    let release = ReleaseSource::Inline(&data);
    let policy = FreshnessPolicy::default();
    let date = extract_field(&data, "Date").and_then(|v| parse_release_date(&v).ok());
    let valid_until = extract_field(&data, "Valid-Until").and_then(|v| parse_release_date(&v).ok());

    match accept_release(&release, &keyring, false, date, valid_until, Utc::now(), &policy) {
        Ok(verdict) => println!("accepted: trusted={}, {} bytes of verified content", verdict.trusted, verdict.content.len()),
        Err(e) => println!("rejected: {e}"),
    }

    Ok(())
}

fn extract_field(data: &[u8], field: &str) -> Option<String> {
    let text = std::str::from_utf8(data).ok()?;
    text.lines().find_map(|line| line.strip_prefix(&format!("{field}: ")).map(str::to_owned))
}
