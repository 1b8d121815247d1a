//! Tar packing for copy-in.
//!
//! Container CLIs accept a tar stream for `cp`, which is the only way to set
//! the permission bits of the copied file in the same step.

use testbed_common::error::{Result, TestbedError};

/// Splits an absolute in-environment path into its directory and file name.
///
/// # Errors
///
/// Returns [`TestbedError::Config`] if `path` has no file name component.
pub fn split_destination(path: &str) -> Result<(&str, &str)> {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some((_, name)) if name.is_empty() || name == "." || name == ".." => {
            Err(invalid_destination(path))
        }
        Some(("", name)) => Ok(("/", name)),
        Some((dir, name)) => Ok((dir, name)),
        None => Err(invalid_destination(path)),
    }
}

/// Packs `content` as a single tar entry named `name` with mode `mode`.
///
/// # Errors
///
/// Returns an error if the archive cannot be written.
pub fn pack_file(name: &str, content: &[u8], mode: u32) -> Result<Vec<u8>> {
    let mut header = tar::Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(mode);
    header.set_entry_type(tar::EntryType::Regular);
    header.set_mtime(unix_now());
    header.set_cksum();

    let mut builder = tar::Builder::new(Vec::new());
    builder
        .append_data(&mut header, name, content)
        .map_err(|e| TestbedError::Io {
            path: name.into(),
            source: e,
        })?;
    builder.into_inner().map_err(|e| TestbedError::Io {
        path: name.into(),
        source: e,
    })
}

fn invalid_destination(path: &str) -> TestbedError {
    TestbedError::Config {
        message: format!("copy destination {path:?} must be an absolute file path"),
    }
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;

    #[test]
    fn split_destination_handles_nested_paths() {
        assert_eq!(
            split_destination("/home/test/dir/a.txt").unwrap(),
            ("/home/test/dir", "a.txt")
        );
        assert_eq!(split_destination("/a.txt").unwrap(), ("/", "a.txt"));
    }

    #[test]
    fn split_destination_rejects_relative_and_empty() {
        assert!(split_destination("a.txt").is_err());
        assert!(split_destination("/").is_err());
        assert!(split_destination("/home/..").is_err());
    }

    #[test]
    fn packed_entry_keeps_mode_and_content() {
        let bytes = pack_file("hello.txt", b"abc", 0o777).expect("pack");
        let mut archive = tar::Archive::new(bytes.as_slice());
        let mut entries = archive.entries().expect("entries");
        let mut entry = entries.next().expect("one entry").expect("valid entry");

        assert_eq!(entry.header().mode().expect("mode"), 0o777);
        assert_eq!(
            entry.path().expect("path").to_str(),
            Some("hello.txt")
        );
        let mut content = String::new();
        let _ = entry.read_to_string(&mut content).expect("read");
        assert_eq!(content, "abc");
        assert!(entries.next().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn extracted_file_keeps_permission_bits() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let bytes = pack_file("shared.txt", b"data", 0o777).expect("pack");
        let mut archive = tar::Archive::new(bytes.as_slice());
        archive.set_preserve_permissions(true);
        archive.unpack(dir.path()).expect("unpack");

        let path = dir.path().join("shared.txt");
        assert_eq!(std::fs::read(&path).expect("read"), b"data");
        let mode = std::fs::metadata(&path).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o777);
    }

    #[test]
    fn empty_payload_packs() {
        let bytes = pack_file("empty", b"", 0o644).expect("pack");
        let mut archive = tar::Archive::new(bytes.as_slice());
        let entry = archive.entries().expect("entries").next().expect("entry").expect("ok");
        assert_eq!(entry.header().size().expect("size"), 0);
    }
}
