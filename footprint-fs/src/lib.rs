//! Capability-based file helpers for the footprint store, built on `cap-std`
//! and `camino`.
#![forbid(unsafe_code)]

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};
use std::io::{self, Write};
use std::path::Component;

/// Suffix appended to the staging file used by [`replace_file`].
pub const STAGING_SUFFIX: &str = ".staging";

/// Resolve the directory containing `path` and return it with the file name.
pub fn open_dir_and_file(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, String)> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::other("target should include a file name"))?
        .to_owned();
    let dir = fs_utf8::Dir::open_ambient_dir(parent, ambient_authority())?;
    Ok((dir, file_name))
}

/// Read the whole file at `path`, returning `None` when it does not exist.
///
/// A missing parent directory also counts as "does not exist".
pub fn read_if_exists(path: &Utf8Path) -> io::Result<Option<Vec<u8>>> {
    let (dir, name) = match open_dir_and_file(path) {
        Ok(found) => found,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err),
    };
    match dir.read(name.as_str()) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

/// Replace the file at `path` with `contents` in one step.
///
/// The bytes are written and synced to a sibling staging file which is then
/// renamed over the target, so readers observe either the old or the new
/// contents and never a partial write.
pub fn replace_file(path: &Utf8Path, contents: &[u8]) -> io::Result<()> {
    ensure_parent_dir(path)?;
    let (dir, name) = open_dir_and_file(path)?;
    let staging = format!(".{name}{STAGING_SUFFIX}");

    let written = dir.create(staging.as_str()).and_then(|mut file| {
        file.write_all(contents)?;
        file.sync_all()
    });
    let renamed = written.and_then(|()| dir.rename(staging.as_str(), &dir, name.as_str()));
    if let Err(err) = renamed {
        // Best effort: the staging file may not exist if `create` failed.
        dir.remove_file(staging.as_str()).ok();
        return Err(err);
    }
    Ok(())
}

/// Ensure the parent directory for `path` exists, handling absolute paths safely for cap-std.
pub fn ensure_parent_dir(path: &Utf8Path) -> io::Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() || parent == Utf8Path::new("/") {
        return Ok(());
    }

    let (base_dir, relative) = base_dir_and_relative(parent)?;
    if relative.as_os_str().is_empty() {
        return Ok(());
    }
    base_dir.create_dir_all(&relative)?;
    Ok(())
}

/// Split an absolute or relative parent path into an ambient base directory and a relative suffix.
pub fn base_dir_and_relative(parent: &Utf8Path) -> io::Result<(fs_utf8::Dir, Utf8PathBuf)> {
    let std_parent = parent.as_std_path();

    let (base, relative) = match std_parent.components().next() {
        // Windows drive or UNC prefix.
        Some(Component::Prefix(prefix)) => {
            let prefix_str = prefix
                .as_os_str()
                .to_str()
                .ok_or_else(|| io::Error::other("non-UTF-8 path prefix"))?;

            let base = Utf8PathBuf::from(prefix_str).join(std::path::MAIN_SEPARATOR.to_string());
            let relative = std_parent
                .strip_prefix(base.as_std_path())
                .or_else(|_| std_parent.strip_prefix(prefix.as_os_str()))
                .map_err(|_| io::Error::other("failed to strip prefix from parent path"))?
                .to_path_buf();
            (base, relative)
        }
        Some(Component::RootDir) => {
            let base = Utf8PathBuf::from(std::path::MAIN_SEPARATOR.to_string());
            let relative = std_parent
                .strip_prefix(base.as_std_path())
                .map_err(|_| io::Error::other("failed to strip root from absolute path"))?
                .to_path_buf();
            (base, relative)
        }
        _ => (Utf8PathBuf::from("."), std_parent.to_path_buf()),
    };

    let dir = fs_utf8::Dir::open_ambient_dir(&base, ambient_authority())?;
    let relative = Utf8PathBuf::from_path_buf(relative)
        .map_err(|_| io::Error::other("non-UTF-8 parent path"))?;

    Ok((dir, relative))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    fn utf8_path(dir: &TempDir, name: &str) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().join(name)).expect("temp paths are UTF-8")
    }

    #[rstest]
    fn missing_file_reads_as_none() {
        let dir = TempDir::new().expect("tempdir");
        let path = utf8_path(&dir, "absent.json");
        assert_eq!(read_if_exists(&path).expect("read"), None);
    }

    #[rstest]
    fn missing_parent_reads_as_none() {
        let dir = TempDir::new().expect("tempdir");
        let path = utf8_path(&dir, "nested/absent.json");
        assert_eq!(read_if_exists(&path).expect("read"), None);
    }

    #[rstest]
    fn replace_creates_parents_and_overwrites() {
        let dir = TempDir::new().expect("tempdir");
        let path = utf8_path(&dir, "nested/deeper/unit.json");

        replace_file(&path, b"[1]").expect("first write");
        replace_file(&path, b"[2]").expect("second write");

        assert_eq!(read_if_exists(&path).expect("read"), Some(b"[2]".to_vec()));
    }

    #[rstest]
    fn replace_leaves_no_staging_file() {
        let dir = TempDir::new().expect("tempdir");
        let path = utf8_path(&dir, "unit.json");
        replace_file(&path, b"[]").expect("write");

        let staging = utf8_path(&dir, &format!(".unit.json{STAGING_SUFFIX}"));
        assert_eq!(read_if_exists(&staging).expect("read"), None);
    }
}
