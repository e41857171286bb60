//! Extract a bundle into a working directory and zip one back up.

use std::fs;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::container::{write_bundle, BundleContainer, ContainerError};

/// Extract every part of the bundle at `archive_path` under `out_dir`,
/// returning the written file paths in archive order.
pub fn unpack(
    archive_path: impl AsRef<Path>,
    out_dir: impl AsRef<Path>,
) -> Result<Vec<PathBuf>, ContainerError> {
    let out_dir = out_dir.as_ref();
    let mut container = BundleContainer::open_from_path(archive_path)?;
    let mut written = Vec::new();
    for (name, bytes) in container.read_all()? {
        let target = out_dir.join(safe_relative_path(&name)?);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, bytes)?;
        written.push(target);
    }
    log::debug!("unpacked {} parts into {}", written.len(), out_dir.display());
    Ok(written)
}

/// Zip every file under `dir` into `archive_path`, naming entries by their
/// path relative to `dir` with `/` separators.
pub fn pack(dir: impl AsRef<Path>, archive_path: impl AsRef<Path>) -> Result<(), ContainerError> {
    let dir = dir.as_ref();
    let mut entries = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| ContainerError::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(dir) else {
            continue;
        };
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        entries.push((name, fs::read(entry.path())?));
    }

    let file = fs::File::create(archive_path.as_ref())?;
    write_bundle(file, entries.as_slice())?;
    log::debug!("packed {} files from {}", entries.len(), dir.display());
    Ok(())
}

fn safe_relative_path(name: &str) -> Result<PathBuf, ContainerError> {
    let path = Path::new(name);
    let safe = path
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if safe {
        Ok(path.to_path_buf())
    } else {
        Err(ContainerError::ZipRead {
            path: name.to_string(),
            reason: "entry escapes the output directory".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_then_unpack_restores_files() {
        let work = tempfile::tempdir().expect("tempdir");
        let src = work.path().join("src");
        fs::create_dir_all(src.join("Report")).expect("mkdir");
        fs::write(src.join("DataModelSchema"), b"{}").expect("write schema");
        fs::write(src.join("Report").join("Layout"), b"[]").expect("write layout");

        let archive = work.path().join("out.pbit");
        pack(&src, &archive).expect("pack");

        let dest = work.path().join("dest");
        let written = unpack(&archive, &dest).expect("unpack");
        assert_eq!(written.len(), 2);
        assert_eq!(fs::read(dest.join("DataModelSchema")).expect("schema"), b"{}");
        assert_eq!(
            fs::read(dest.join("Report").join("Layout")).expect("layout"),
            b"[]"
        );
    }

    #[test]
    fn rejects_parent_components() {
        assert!(safe_relative_path("../evil").is_err());
        assert!(safe_relative_path("/abs").is_err());
        assert!(safe_relative_path("Report/Layout").is_ok());
    }
}
