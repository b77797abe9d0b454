use std::collections::BTreeSet;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use log::{debug, warn};

use crate::error::InstallError;

/// Extract every safe entry of `zip_path` into `dest`.
///
/// Returns the wrapper directory when all entries live under one top-level
/// directory, which is how release archives are laid out.
///
/// # Errors
/// Returns an error when the archive cannot be read or an entry cannot be
/// written.
pub fn extract_zip(zip_path: &Path, dest: &Path) -> Result<Option<PathBuf>, InstallError> {
    let file = std::fs::File::open(zip_path)
        .map_err(|error| InstallError::io_with_path("failed to open zip file", zip_path, &error))?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|error| InstallError::zip("failed to read zip archive", error))?;

    let mut top_level: BTreeSet<OsString> = BTreeSet::new();
    let mut loose_files = false;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|error| InstallError::zip("failed to read zip entry", error))?;
        let Some(name) = entry.enclosed_name() else {
            warn!("Skipping zip entry with unsafe path: {}", entry.name());
            continue;
        };

        let mut components = name.components().filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_os_string()),
            _ => None,
        });
        let Some(first) = components.next() else {
            continue;
        };
        if components.next().is_none() && !entry.is_dir() {
            loose_files = true;
        }
        top_level.insert(first);

        let out_path = dest.join(&name);

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|error| {
                InstallError::io_with_path("failed to create extraction directory", &out_path, &error)
            })?;
        } else {
            if let Some(parent) = out_path.parent() {
                std::fs::create_dir_all(parent).map_err(|error| {
                    InstallError::io_with_path(
                        "failed to create extraction parent directory",
                        parent,
                        &error,
                    )
                })?;
            }
            let mut outfile = std::fs::File::create(&out_path).map_err(|error| {
                InstallError::io_with_path("failed to create extracted file", &out_path, &error)
            })?;
            std::io::copy(&mut entry, &mut outfile).map_err(|error| {
                InstallError::io_with_path("failed to extract archive entry", &out_path, &error)
            })?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Some(mode) = entry.unix_mode() {
                    let _ =
                        std::fs::set_permissions(&out_path, std::fs::Permissions::from_mode(mode));
                }
            }
        }
    }

    debug!("Extraction complete to {}", dest.display());

    if loose_files || top_level.len() != 1 {
        return Ok(None);
    }
    Ok(top_level.pop_first().map(|wrapper| dest.join(wrapper)))
}

/// Move everything inside `wrapper` up into `target`, replacing same-named
/// entries, then remove the emptied wrapper.
///
/// # Errors
/// Returns an error when an entry cannot be moved or replaced.
pub fn flatten_wrapper(target: &Path, wrapper: &Path) -> Result<(), InstallError> {
    // Park the wrapper under a private name first: it may share its name with
    // one of its own children (a `node` directory holding a `node` binary).
    let staging = target.join(format!(".nodeswitch-wrapper-{}", std::process::id()));
    if staging.exists() {
        remove_entry(&staging)?;
    }
    std::fs::rename(wrapper, &staging).map_err(|error| {
        InstallError::io_with_path("failed to stage wrapper directory", wrapper, &error)
    })?;

    let entries = std::fs::read_dir(&staging).map_err(|error| {
        InstallError::io_with_path("failed to read wrapper directory", &staging, &error)
    })?;
    for entry in entries {
        let entry =
            entry.map_err(|error| InstallError::io("failed to read wrapper entry", error))?;
        let dest = target.join(entry.file_name());
        if std::fs::symlink_metadata(&dest).is_ok() {
            remove_entry(&dest)?;
        }
        std::fs::rename(entry.path(), &dest).map_err(|error| {
            InstallError::io_with_path("failed to move extracted entry", &dest, &error)
        })?;
    }

    std::fs::remove_dir(&staging).map_err(|error| {
        InstallError::io_with_path("failed to remove wrapper directory", &staging, &error)
    })?;
    debug!("Flattened {} into {}", wrapper.display(), target.display());
    Ok(())
}

fn remove_entry(path: &Path) -> Result<(), InstallError> {
    let metadata = std::fs::symlink_metadata(path)
        .map_err(|error| InstallError::io_with_path("failed to inspect entry", path, &error))?;
    let result = if metadata.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    result.map_err(|error| InstallError::io_with_path("failed to replace entry", path, &error))
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Write as _;
    use std::path::Path;

    use super::{extract_zip, flatten_wrapper};

    /// Build a zip from `(name, contents)` pairs; a `None` body adds a directory.
    pub(crate) fn write_zip(path: &Path, entries: &[(&str, Option<&[u8]>)]) {
        let zip_file = std::fs::File::create(path).expect("zip file should be created");
        let mut writer = zip::ZipWriter::new(zip_file);
        let options = zip::write::SimpleFileOptions::default().unix_permissions(0o755);
        for (name, body) in entries {
            match body {
                Some(body) => {
                    writer
                        .start_file(*name, options)
                        .expect("file entry should be started");
                    writer.write_all(body).expect("file entry should be written");
                }
                None => writer
                    .add_directory(*name, options)
                    .expect("directory entry should be written"),
            }
        }
        writer.finish().expect("zip archive should be finalized");
    }

    pub(crate) fn release_zip_bytes(wrapper: &str) -> Vec<u8> {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let zip_path = temp.path().join("release.zip");
        write_zip(
            &zip_path,
            &[
                (&format!("{wrapper}/"), None),
                (&format!("{wrapper}/node.exe"), Some(b"node-binary")),
                (&format!("{wrapper}/node_modules/"), None),
                (&format!("{wrapper}/node_modules/npm/package.json"), Some(b"{}")),
            ],
        );
        std::fs::read(zip_path).expect("zip should be readable")
    }

    #[test]
    fn extract_zip_expands_files_and_reports_wrapper() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let zip_path = temp.path().join("release.zip");
        let extract_dir = temp.path().join("extract");
        write_zip(
            &zip_path,
            &[
                ("node-v20.11.1-win-x64/", None),
                ("node-v20.11.1-win-x64/node.exe", Some(b"binary-content")),
            ],
        );

        let wrapper = extract_zip(&zip_path, &extract_dir).expect("zip should extract");

        assert_eq!(wrapper, Some(extract_dir.join("node-v20.11.1-win-x64")));
        let extracted = std::fs::read(extract_dir.join("node-v20.11.1-win-x64/node.exe"))
            .expect("extracted file should exist and be readable");
        assert_eq!(extracted, b"binary-content");
    }

    #[test]
    fn extract_zip_without_directory_entries_still_finds_wrapper() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let zip_path = temp.path().join("release.zip");
        let extract_dir = temp.path().join("extract");
        write_zip(&zip_path, &[("wrap/lib/file.txt", Some(b"x"))]);

        let wrapper = extract_zip(&zip_path, &extract_dir).expect("zip should extract");

        assert_eq!(wrapper, Some(extract_dir.join("wrap")));
        assert!(extract_dir.join("wrap/lib/file.txt").is_file());
    }

    #[test]
    fn extract_zip_reports_no_wrapper_for_flat_archives() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let zip_path = temp.path().join("flat.zip");
        let extract_dir = temp.path().join("extract");
        write_zip(
            &zip_path,
            &[("node.exe", Some(b"a")), ("lib/", None), ("lib/x", Some(b"b"))],
        );

        let wrapper = extract_zip(&zip_path, &extract_dir).expect("zip should extract");

        assert!(wrapper.is_none());
        assert!(extract_dir.join("node.exe").is_file());
    }

    #[test]
    fn extract_zip_skips_unsafe_paths() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let zip_path = temp.path().join("unsafe.zip");
        let extract_dir = temp.path().join("extract");
        write_zip(&zip_path, &[("../outside.txt", Some(b"should not be extracted"))]);

        extract_zip(&zip_path, &extract_dir).expect("zip extraction should not fail");

        assert!(
            !temp.path().join("outside.txt").exists(),
            "unsafe path should not be extracted outside destination"
        );
    }

    #[test]
    fn extract_zip_rejects_corrupt_archive() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let zip_path = temp.path().join("corrupt.zip");
        std::fs::write(&zip_path, b"PK\x03\x04 definitely not a zip").expect("write corrupt zip");

        let result = extract_zip(&zip_path, &temp.path().join("extract"));

        assert!(matches!(result, Err(crate::InstallError::Zip { .. })));
    }

    #[test]
    fn flatten_wrapper_moves_children_up_and_removes_wrapper() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let target = temp.path().join("v20.11.1");
        let wrapper = target.join("node-v20.11.1-win-x64");
        std::fs::create_dir_all(wrapper.join("node_modules/npm")).expect("create tree");
        std::fs::write(wrapper.join("node.exe"), b"new").expect("write file");
        std::fs::write(wrapper.join("node_modules/npm/package.json"), b"{}")
            .expect("write nested file");

        flatten_wrapper(&target, &wrapper).expect("flatten should succeed");

        assert_eq!(std::fs::read(target.join("node.exe")).expect("read"), b"new");
        assert!(target.join("node_modules/npm/package.json").is_file());
        assert!(!wrapper.exists());
    }

    #[test]
    fn flatten_wrapper_overwrites_existing_entries() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let target = temp.path().join("v20.11.1");
        let wrapper = target.join("wrap");
        std::fs::create_dir_all(wrapper.join("lib")).expect("create wrapper");
        std::fs::create_dir_all(target.join("lib")).expect("create stale dir");
        std::fs::write(target.join("lib/stale.txt"), b"old").expect("write stale file");
        std::fs::write(target.join("node.exe"), b"old").expect("write stale binary");
        std::fs::write(wrapper.join("node.exe"), b"new").expect("write binary");
        std::fs::write(wrapper.join("lib/fresh.txt"), b"new").expect("write fresh file");

        flatten_wrapper(&target, &wrapper).expect("flatten should succeed");

        assert_eq!(std::fs::read(target.join("node.exe")).expect("read"), b"new");
        assert!(target.join("lib/fresh.txt").is_file());
        assert!(!target.join("lib/stale.txt").exists());
    }

    #[test]
    fn flatten_wrapper_handles_child_named_like_wrapper() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let target = temp.path().join("v1.0.0");
        let wrapper = target.join("node");
        std::fs::create_dir_all(&wrapper).expect("create wrapper");
        std::fs::write(wrapper.join("node"), b"binary").expect("write binary");

        flatten_wrapper(&target, &wrapper).expect("flatten should succeed");

        assert_eq!(std::fs::read(target.join("node")).expect("read"), b"binary");
        assert!(target.join("node").is_file());
    }
}
