//! Input file reading with memory mapping support.
//!
//! Documents handed to the segmenter are read whole. Small files are read
//! directly and their buffer becomes the string without another copy. Files
//! above [`MMAP_THRESHOLD`] go through a read-only memory map that is
//! validated as UTF-8 in place and copied once into the returned string.

// Memory mapping requires unsafe; the map is read-only and dropped before return.
#![allow(unsafe_code)]

use crate::error::{IoError, Result};
use crate::io::unicode::validate_utf8;
use memmap2::Mmap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Threshold for using memory mapping (1MB).
pub const MMAP_THRESHOLD: u64 = 1024 * 1024;

/// Maximum input size accepted for ingestion (512MB).
const MAX_FILE_SIZE: u64 = 512 * 1024 * 1024;

/// Input document reader.
///
/// # Examples
///
/// ```no_run
/// use ragline::io::FileReader;
///
/// let reader = FileReader::open("notes.md").unwrap();
/// let content = reader.read_to_string().unwrap();
/// ```
pub struct FileReader {
    file: File,
    size: u64,
    path: String,
}

impl FileReader {
    /// Opens a file for reading.
    ///
    /// # Errors
    ///
    /// Returns an error if the file doesn't exist, can't be opened or is
    /// larger than the ingestion limit.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let path_str = path_ref.to_string_lossy().to_string();

        if !path_ref.exists() {
            return Err(IoError::FileNotFound { path: path_str }.into());
        }

        let file = File::open(path_ref).map_err(|e| IoError::ReadFailed {
            path: path_str.clone(),
            reason: e.to_string(),
        })?;

        let size = file
            .metadata()
            .map_err(|e| IoError::ReadFailed {
                path: path_str.clone(),
                reason: e.to_string(),
            })?
            .len();

        if size > MAX_FILE_SIZE {
            return Err(IoError::ReadFailed {
                path: path_str,
                reason: format!("file too large: {size} bytes (max: {MAX_FILE_SIZE} bytes)"),
            }
            .into());
        }

        Ok(Self {
            file,
            size,
            path: path_str,
        })
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Returns the file path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Reads the file content as a UTF-8 string.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or content is not valid UTF-8.
    pub fn read_to_string(&self) -> Result<String> {
        if self.size >= MMAP_THRESHOLD {
            let mmap = self.map()?;
            let text = validate_utf8(&mmap).map_err(|at| self.invalid_utf8(at))?;
            Ok(text.to_owned())
        } else {
            String::from_utf8(self.read_direct_bytes()?)
                .map_err(|e| self.invalid_utf8(e.utf8_error().valid_up_to()))
        }
    }

    /// Reads the file content as bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails.
    pub fn read_to_bytes(&self) -> Result<Vec<u8>> {
        if self.size >= MMAP_THRESHOLD {
            self.read_mmap_bytes()
        } else {
            self.read_direct_bytes()
        }
    }

    fn read_mmap_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.map()?.to_vec())
    }

    fn map(&self) -> Result<Mmap> {
        // Safety: read-only mapping of a file we hold open
        let mmap = unsafe {
            Mmap::map(&self.file).map_err(|e| IoError::MmapFailed {
                path: self.path.clone(),
                reason: e.to_string(),
            })?
        };
        Ok(mmap)
    }

    fn invalid_utf8(&self, at: usize) -> crate::Error {
        IoError::ReadFailed {
            path: self.path.clone(),
            reason: format!("invalid UTF-8 at byte {at}"),
        }
        .into()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn read_direct_bytes(&self) -> Result<Vec<u8>> {
        let mut file = &self.file;
        let mut buffer = Vec::with_capacity(self.size as usize);
        file.read_to_end(&mut buffer)
            .map_err(|e| IoError::ReadFailed {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
        Ok(buffer)
    }
}

/// Reads a file to string, choosing direct or mapped reading by size.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid UTF-8.
pub fn read_file<P: AsRef<Path>>(path: P) -> Result<String> {
    FileReader::open(path)?.read_to_string()
}
