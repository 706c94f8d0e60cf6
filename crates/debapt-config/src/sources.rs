//! Sources list parsing (`spec.md` §6): one-line entries of the form
//! `<type> [options] <uri> <suite> <components...>`.

use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};

/// `deb` fetches binary packages, `deb-src` fetches source packages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceType {
    Binary,
    Source,
}

impl SourceType {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "deb" => Some(Self::Binary),
            "deb-src" => Some(Self::Source),
            _ => None,
        }
    }
}

/// Per-repository options from the `[k=v, ...]` bracket, `spec.md` §6.
#[derive(Debug, Clone, Default)]
pub struct SourceOptions {
    pub signed_by: Option<String>,
    pub trusted: Option<bool>,
    pub check_valid_until: Option<bool>,
    pub date_max_future: Option<u64>,
    pub valid_until_min: Option<u64>,
    pub valid_until_max: Option<u64>,
    pub architectures: Vec<String>,
    pub languages: Vec<String>,
    pub targets: Vec<String>,
    pub pdiffs: Option<bool>,
    pub by_hash: Option<bool>,
}

impl SourceOptions {
    fn apply(&mut self, path: &Path, line_no: usize, key: &str, value: &str) -> Result<()> {
        match key {
            "signed-by" => self.signed_by = Some(value.to_owned()),
            "trusted" => self.trusted = Some(parse_bool(value)),
            "check-valid-until" => self.check_valid_until = Some(parse_bool(value)),
            "date-max-future" => self.date_max_future = value.parse().ok(),
            "valid-until-min" => self.valid_until_min = value.parse().ok(),
            "valid-until-max" => self.valid_until_max = value.parse().ok(),
            "architectures" => self.architectures = split_list(value),
            "languages" => self.languages = split_list(value),
            "targets" => self.targets = split_list(value),
            "pdiffs" => self.pdiffs = Some(parse_bool(value)),
            "by-hash" => self.by_hash = Some(parse_bool(value)),
            other => {
                return Err(ConfigError::UnknownOption {
                    path: path.to_path_buf(),
                    line: line_no,
                    key: other.to_owned(),
                });
            }
        }
        Ok(())
    }
}

fn parse_bool(v: &str) -> bool {
    matches!(v, "yes" | "true" | "1" | "on")
}

fn split_list(v: &str) -> Vec<String> {
    v.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned).collect()
}

/// One parsed `deb`/`deb-src` entry.
#[derive(Debug, Clone)]
pub struct SourceEntry {
    pub source_type: SourceType,
    pub options: SourceOptions,
    pub uri: String,
    pub suite: String,
    pub components: Vec<String>,
}

impl SourceEntry {
    /// True when `suite` names a flat repository (`/`-suffixed path, no
    /// components) rather than a distribution with component lists.
    #[must_use]
    pub fn is_flat_repository(&self) -> bool {
        self.suite.ends_with('/') && self.components.is_empty()
    }
}

/// Parse the content of a sources.list(.d) file. Blank lines and lines
/// starting with `#` are ignored.
pub fn parse(path: &Path, content: &str) -> Result<Vec<SourceEntry>> {
    let mut entries = Vec::new();
    for (idx, raw_line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        entries.push(parse_line(path, line_no, line)?);
    }
    Ok(entries)
}

fn parse_line(path: &Path, line_no: usize, line: &str) -> Result<SourceEntry> {
    let mut rest = line;
    let (type_tok, after_type) = split_first_token(rest).ok_or_else(|| malformed(path, line_no, "empty entry"))?;
    let source_type = SourceType::parse(type_tok)
        .ok_or_else(|| malformed(path, line_no, format!("unknown source type '{type_tok}'")))?;
    rest = after_type.trim_start();

    let mut options = SourceOptions::default();
    if let Some(stripped) = rest.strip_prefix('[') {
        let end = stripped
            .find(']')
            .ok_or_else(|| malformed(path, line_no, "unterminated '[' option block"))?;
        let body = &stripped[..end];
        for kv in body.split_whitespace() {
            let (key, value) = kv
                .split_once('=')
                .ok_or_else(|| malformed(path, line_no, format!("option '{kv}' missing '='")))?;
            options.apply(path, line_no, key, value)?;
        }
        rest = stripped[end + 1..].trim_start();
    }

    let mut tokens = rest.split_whitespace();
    let uri = tokens
        .next()
        .ok_or_else(|| malformed(path, line_no, "missing URI"))?
        .to_owned();
    let suite = tokens
        .next()
        .ok_or_else(|| malformed(path, line_no, "missing suite"))?
        .to_owned();
    let components: Vec<String> = tokens.map(str::to_owned).collect();

    Ok(SourceEntry { source_type, options, uri, suite, components })
}

fn split_first_token(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    let end = s.find(char::is_whitespace).unwrap_or(s.len());
    if end == 0 {
        return None;
    }
    Some((&s[..end], &s[end..]))
}

fn malformed(path: &Path, line: usize, message: impl Into<String>) -> ConfigError {
    ConfigError::MalformedEntry { path: path.to_path_buf(), line, message: message.into() }
}

/// Load and parse a single sources.list file from disk.
pub fn load_file(path: &Path) -> Result<Vec<SourceEntry>> {
    let content = std::fs::read_to_string(path)
        .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
    parse(path, &content)
}

/// Load `sources.list` plus every `*.list` fragment under `sources.list.d/`,
/// in directory order, the way apt's `pkgSourceList::ReadMainList` walks the
/// `Dir::Etc::sourceparts` directory.
pub fn load_tree(main_list: &Path, list_d: &Path) -> Result<Vec<SourceEntry>> {
    let mut entries = Vec::new();
    if main_list.is_file() {
        entries.extend(load_file(main_list)?);
    }
    if list_d.is_dir() {
        let mut fragments: Vec<PathBuf> = std::fs::read_dir(list_d)
            .map_err(|source| ConfigError::Read { path: list_d.to_path_buf(), source })?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "list"))
            .collect();
        fragments.sort();
        for fragment in fragments {
            entries.extend(load_file(&fragment)?);
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_entry() {
        let entries = parse(Path::new("sources.list"), "deb http://deb.debian.org/debian bookworm main contrib\n").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].source_type, SourceType::Binary);
        assert_eq!(entries[0].suite, "bookworm");
        assert_eq!(entries[0].components, vec!["main", "contrib"]);
    }

    #[test]
    fn parses_options_block() {
        let entries = parse(
            Path::new("sources.list"),
            "deb [trusted=yes arch=amd64,arm64] http://example.test stable main\n",
        );
        // `arch` isn't a recognized key on purpose; this checks the error path.
        assert!(entries.is_err());
    }

    #[test]
    fn recognizes_flat_repository() {
        let entries = parse(Path::new("sources.list"), "deb http://example.test/debs/ /\n").unwrap();
        assert!(entries[0].is_flat_repository());
    }

    #[test]
    fn ignores_comments_and_blank_lines() {
        let entries = parse(Path::new("sources.list"), "# comment\n\ndeb http://example.test stable main\n").unwrap();
        assert_eq!(entries.len(), 1);
    }
}
