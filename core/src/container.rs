//! Zip container handling for template bundles.
//!
//! A bundle is a plain zip archive. Opening one checks that the
//! `DataModelSchema` part is present; reads are bounded by
//! [`ContainerLimits`] so a hostile archive cannot exhaust memory.

use std::io::{Read, Seek, Write};
use thiserror::Error;
use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error_codes;

pub const SCHEMA_PART: &str = "DataModelSchema";
pub const LAYOUT_PART: &str = "Report/Layout";

/// Bounds applied while reading a bundle.
#[derive(Debug, Clone, Copy)]
pub struct ContainerLimits {
    /// Entries the archive may list, directories included.
    pub max_parts: usize,
    /// Uncompressed size of any single part.
    pub max_part_bytes: u64,
    /// Uncompressed bytes read across the container's lifetime.
    pub max_total_bytes: u64,
}

impl Default for ContainerLimits {
    fn default() -> Self {
        const MIB: u64 = 1024 * 1024;
        Self {
            max_parts: 4_096,
            max_part_bytes: 256 * MIB,
            max_total_bytes: 1024 * MIB,
        }
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContainerError {
    #[error("[PBIT_CONTAINER_001] I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("[PBIT_CONTAINER_002] ZIP error: {0}")]
    Zip(String),
    #[error("[PBIT_CONTAINER_003] not a ZIP container")]
    NotZipContainer,
    #[error("[PBIT_CONTAINER_004] required part '{path}' is missing")]
    MissingPart { path: String },
    #[error("[PBIT_CONTAINER_005] bundle lists {entries} entries, more than the {limit} allowed")]
    TooManyEntries { entries: usize, limit: usize },
    #[error("[PBIT_CONTAINER_006] part '{path}' holds {size} bytes, more than the {limit} allowed")]
    PartTooLarge { path: String, size: u64, limit: u64 },
    #[error("[PBIT_CONTAINER_007] reading the bundle would exceed {limit} uncompressed bytes")]
    TotalTooLarge { limit: u64 },
    #[error("[PBIT_CONTAINER_002] failed to read ZIP entry '{path}': {reason}")]
    ZipRead { path: String, reason: String },
}

impl ContainerError {
    pub fn code(&self) -> &'static str {
        match self {
            ContainerError::Io(_) => error_codes::CONTAINER_IO,
            ContainerError::Zip(_) => error_codes::CONTAINER_ZIP,
            ContainerError::NotZipContainer => error_codes::CONTAINER_NOT_ZIP,
            ContainerError::MissingPart { .. } => error_codes::CONTAINER_MISSING_PART,
            ContainerError::TooManyEntries { .. } => error_codes::CONTAINER_TOO_MANY_ENTRIES,
            ContainerError::PartTooLarge { .. } => error_codes::CONTAINER_PART_TOO_LARGE,
            ContainerError::TotalTooLarge { .. } => error_codes::CONTAINER_TOTAL_TOO_LARGE,
            ContainerError::ZipRead { .. } => error_codes::CONTAINER_ZIP,
        }
    }
}

impl From<ZipError> for ContainerError {
    fn from(err: ZipError) -> Self {
        match err {
            ZipError::Io(e) => ContainerError::Io(e),
            other => ContainerError::Zip(other.to_string()),
        }
    }
}

pub(crate) trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}

pub struct BundleContainer {
    archive: ZipArchive<Box<dyn ReadSeek>>,
    limits: ContainerLimits,
    bytes_read: u64,
}

impl BundleContainer {
    pub fn open_from_reader<R: Read + Seek + 'static>(
        reader: R,
    ) -> Result<BundleContainer, ContainerError> {
        Self::open_from_reader_with_limits(reader, ContainerLimits::default())
    }

    pub fn open_from_reader_with_limits<R: Read + Seek + 'static>(
        reader: R,
        limits: ContainerLimits,
    ) -> Result<BundleContainer, ContainerError> {
        let reader: Box<dyn ReadSeek> = Box::new(reader);
        let archive = ZipArchive::new(reader).map_err(|err| match err {
            ZipError::InvalidArchive(_) | ZipError::UnsupportedArchive(_) => {
                ContainerError::NotZipContainer
            }
            ZipError::Io(e) => ContainerError::Io(e),
            other => ContainerError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                other.to_string(),
            )),
        })?;

        if archive.len() > limits.max_parts {
            return Err(ContainerError::TooManyEntries {
                entries: archive.len(),
                limit: limits.max_parts,
            });
        }

        let mut container = BundleContainer {
            archive,
            limits,
            bytes_read: 0,
        };

        if container.archive.by_name(SCHEMA_PART).is_err() {
            return Err(ContainerError::MissingPart {
                path: SCHEMA_PART.to_string(),
            });
        }

        log::debug!("opened bundle with {} entries", container.len());
        Ok(container)
    }

    #[cfg(feature = "std-fs")]
    pub fn open_from_path(
        path: impl AsRef<std::path::Path>,
    ) -> Result<BundleContainer, ContainerError> {
        Self::open_from_path_with_limits(path, ContainerLimits::default())
    }

    #[cfg(feature = "std-fs")]
    pub fn open_from_path_with_limits(
        path: impl AsRef<std::path::Path>,
        limits: ContainerLimits,
    ) -> Result<BundleContainer, ContainerError> {
        let file = std::fs::File::open(path)?;
        Self::open_from_reader_with_limits(file, limits)
    }

    /// Read one part, enforcing the per-part and cumulative size limits.
    pub fn read_file_checked(&mut self, name: &str) -> Result<Vec<u8>, ContainerError> {
        let read_error = |reason: String| ContainerError::ZipRead {
            path: name.to_string(),
            reason,
        };
        let mut part = match self.archive.by_name(name) {
            Ok(part) => part,
            Err(ZipError::FileNotFound) => {
                return Err(ContainerError::MissingPart {
                    path: name.to_string(),
                })
            }
            Err(err) => return Err(read_error(err.to_string())),
        };

        let size = part.size();
        let limits = self.limits;
        if size > limits.max_part_bytes {
            return Err(ContainerError::PartTooLarge {
                path: name.to_string(),
                size,
                limit: limits.max_part_bytes,
            });
        }
        let after = self.bytes_read.saturating_add(size);
        if after > limits.max_total_bytes {
            return Err(ContainerError::TotalTooLarge {
                limit: limits.max_total_bytes,
            });
        }

        let mut bytes = Vec::with_capacity(usize::try_from(size).unwrap_or(0));
        part.read_to_end(&mut bytes)
            .map_err(|err| read_error(err.to_string()))?;
        drop(part);
        self.bytes_read = after;
        log::trace!("read part '{name}' ({size} bytes)");
        Ok(bytes)
    }

    /// Like [`read_file_checked`](Self::read_file_checked), with an absent
    /// part reported as `None`.
    pub fn read_file_optional_checked(
        &mut self,
        name: &str,
    ) -> Result<Option<Vec<u8>>, ContainerError> {
        self.read_file_checked(name).map(Some).or_else(|err| match err {
            ContainerError::MissingPart { .. } => Ok(None),
            other => Err(other),
        })
    }

    /// Entry names in no particular order.
    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.archive.file_names()
    }

    /// File entry names in archive order, directories skipped.
    pub fn entry_names(&mut self) -> Result<Vec<String>, ContainerError> {
        let mut names = Vec::with_capacity(self.archive.len());
        for idx in 0..self.archive.len() {
            let entry = self.archive.by_index(idx)?;
            if !entry.is_dir() {
                names.push(entry.name().to_string());
            }
        }
        Ok(names)
    }

    /// Every file entry with its bytes, in archive order.
    pub fn read_all(&mut self) -> Result<Vec<(String, Vec<u8>)>, ContainerError> {
        let names = self.entry_names()?;
        let mut parts = Vec::with_capacity(names.len());
        for name in names {
            let bytes = self.read_file_checked(&name)?;
            parts.push((name, bytes));
        }
        Ok(parts)
    }

    pub fn len(&self) -> usize {
        self.archive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn limits(&self) -> &ContainerLimits {
        &self.limits
    }
}

/// Write `entries` as deflated parts of a new archive, in order.
pub fn write_bundle<W, N, B>(writer: W, entries: &[(N, B)]) -> Result<W, ContainerError>
where
    W: Write + Seek,
    N: AsRef<str>,
    B: AsRef<[u8]>,
{
    let mut zip = ZipWriter::new(writer);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, bytes) in entries {
        zip.start_file(name.as_ref(), options)?;
        zip.write_all(bytes.as_ref())?;
    }
    let writer = zip.finish()?;
    log::debug!("wrote bundle with {} entries", entries.len());
    Ok(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn bundle_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
        write_bundle(Cursor::new(Vec::new()), entries)
            .expect("write bundle")
            .into_inner()
    }

    #[test]
    fn rejects_non_zip_bytes() {
        let err = BundleContainer::open_from_reader(Cursor::new(b"not a zip".to_vec()))
            .err()
            .expect("garbage is not a zip");
        assert!(matches!(err, ContainerError::NotZipContainer));
        assert_eq!(err.code(), "PBIT_CONTAINER_003");
    }

    #[test]
    fn requires_schema_part() {
        let bytes = bundle_bytes(&[("Report/Layout", b"{}")]);
        let err = BundleContainer::open_from_reader(Cursor::new(bytes))
            .err()
            .expect("no schema part");
        assert!(matches!(err, ContainerError::MissingPart { ref path } if path == SCHEMA_PART));
    }

    #[test]
    fn read_all_keeps_archive_order() {
        let bytes = bundle_bytes(&[
            ("Version", b"1.28"),
            ("DataModelSchema", b"{}"),
            ("Report/Layout", b"[]"),
        ]);
        let mut container = BundleContainer::open_from_reader(Cursor::new(bytes)).expect("open");
        let parts = container.read_all().expect("read all");
        let names: Vec<&str> = parts.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["Version", "DataModelSchema", "Report/Layout"]);
        assert_eq!(parts[0].1, b"1.28");
    }

    #[test]
    fn enforces_part_size_limit() {
        let bytes = bundle_bytes(&[("DataModelSchema", &[0u8; 64])]);
        let limits = ContainerLimits {
            max_part_bytes: 16,
            ..ContainerLimits::default()
        };
        let mut container =
            BundleContainer::open_from_reader_with_limits(Cursor::new(bytes), limits).expect("open");
        let err = container
            .read_file_checked(SCHEMA_PART)
            .expect_err("part over limit");
        assert!(matches!(err, ContainerError::PartTooLarge { size: 64, limit: 16, .. }));
    }

    #[test]
    fn enforces_entry_limit() {
        let bytes = bundle_bytes(&[("DataModelSchema", b"{}"), ("a", b"1"), ("b", b"2")]);
        let limits = ContainerLimits {
            max_parts: 2,
            ..ContainerLimits::default()
        };
        let err = BundleContainer::open_from_reader_with_limits(Cursor::new(bytes), limits)
            .err()
            .expect("too many entries");
        assert!(matches!(err, ContainerError::TooManyEntries { entries: 3, limit: 2 }));
    }

    #[test]
    fn optional_read_returns_none_for_missing_part() {
        let bytes = bundle_bytes(&[("DataModelSchema", b"{}")]);
        let mut container = BundleContainer::open_from_reader(Cursor::new(bytes)).expect("open");
        assert_eq!(
            container
                .read_file_optional_checked(LAYOUT_PART)
                .expect("missing is fine"),
            None
        );
    }

    #[test]
    fn enforces_cumulative_size_limit() {
        let bytes = bundle_bytes(&[("DataModelSchema", &[1u8; 10]), ("Report/Layout", &[2u8; 10])]);
        let limits = ContainerLimits {
            max_total_bytes: 15,
            ..ContainerLimits::default()
        };
        let mut container =
            BundleContainer::open_from_reader_with_limits(Cursor::new(bytes), limits).expect("open");
        container.read_file_checked(SCHEMA_PART).expect("first part fits");
        let err = container
            .read_file_checked(LAYOUT_PART)
            .expect_err("second part exceeds the total");
        assert!(matches!(err, ContainerError::TotalTooLarge { limit: 15 }));
        assert_eq!(err.code(), "PBIT_CONTAINER_007");
    }
}
