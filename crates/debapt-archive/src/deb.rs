//! Reading a local `.deb`: an `ar` archive containing `debian-binary`,
//! `control.tar.*`, and `data.tar.*` members, in that order. Only the
//! control member is needed to register the package with the cache
//! generator without fetching it from a repository (`dpkg -i` and
//! `apt-get install ./foo.deb` both start here).

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::compress::{decompress_reader, Compression};
use crate::ArchiveError;

/// The decompressed `control` file's bytes (the RFC822 `Package:`/
/// `Version:`/`Depends:`/... stanza) from a `.deb`'s `control.tar.*`
/// member.
///
/// # Errors
/// Returns [`ArchiveError::Malformed`] if the file isn't a valid `ar`
/// archive, has no `control.tar.*` member, or that member has no
/// top-level `control` or `./control` entry.
pub fn read_control(path: &Path) -> Result<Vec<u8>, ArchiveError> {
    let file = File::open(path).map_err(ArchiveError::Io)?;
    let mut archive = ar::Archive::new(file);

    while let Some(entry) = archive.next_entry() {
        let mut entry = entry.map_err(|e| ArchiveError::Malformed(e.to_string()))?;
        let name = String::from_utf8_lossy(entry.header().identifier()).into_owned();
        if !name.starts_with("control.tar") {
            continue;
        }

        let compression = Compression::from_filename(&name);
        let mut raw = Vec::new();
        entry.read_to_end(&mut raw).map_err(ArchiveError::Io)?;
        let tar_bytes = decompress_reader(&raw[..], compression)?;

        let mut tar = tar::Archive::new(&tar_bytes[..]);
        for tar_entry in tar.entries().map_err(ArchiveError::Io)? {
            let mut tar_entry = tar_entry.map_err(ArchiveError::Io)?;
            let entry_path = tar_entry.path().map_err(ArchiveError::Io)?.into_owned();
            if entry_path == Path::new("./control") || entry_path == Path::new("control") {
                let mut control = Vec::new();
                tar_entry.read_to_end(&mut control).map_err(ArchiveError::Io)?;
                return Ok(control);
            }
        }
        return Err(ArchiveError::Malformed(format!("{}: control.tar has no control member", path.display())));
    }

    Err(ArchiveError::Malformed(format!("{}: no control.tar member", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_fixture_deb(path: &Path) {
        let mut control_tar = Vec::new();
        {
            let mut builder = tar::Builder::new(&mut control_tar);
            let control_contents = b"Package: fixture\nVersion: 1.0-1\n\n";
            let mut header = tar::Header::new_gnu();
            header.set_path("./control").unwrap();
            header.set_size(control_contents.len() as u64);
            header.set_cksum();
            builder.append(&header, &control_contents[..]).unwrap();
            builder.finish().unwrap();
        }

        let file = File::create(path).unwrap();
        let mut builder = ar::Builder::new(file);
        let header = ar::Header::new(b"control.tar".to_vec(), control_tar.len() as u64);
        builder.append(&header, &control_tar[..]).unwrap();
    }

    #[test]
    fn reads_control_file_out_of_a_deb() {
        let dir = tempfile::tempdir().unwrap();
        let deb_path = dir.path().join("fixture.deb");
        build_fixture_deb(&deb_path);

        let control = read_control(&deb_path).unwrap();
        let text = String::from_utf8(control).unwrap();
        assert!(text.contains("Package: fixture"));
    }
}
