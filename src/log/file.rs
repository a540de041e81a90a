//! On-disk capture log for continuity across process restarts.
//!
//! Layout: a 5 byte header (magic + version) followed by one frame per
//! entry: `u32 LE length | MessagePack entry | u32 LE crc32`.

use crate::error::{RecycleError, Result};
use crate::types::LogEntry;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use super::capture::Log;

/// Magic bytes for a log file.
const LOG_MAGIC: &[u8; 4] = b"RCY\0";

/// Current log file format version.
const LOG_VERSION: u8 = 1;

/// Frames larger than this are treated as corruption.
const MAX_FRAME_BYTES: usize = 64 * 1024 * 1024;

/// A capture log stored at a path.
#[derive(Clone, Debug)]
pub struct LogFile {
    path: PathBuf,
}

impl LogFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Replace the file's contents with `log`.
    pub fn write(&self, log: &Log) -> Result<()> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)?;
        let mut writer = BufWriter::new(file);

        writer.write_all(LOG_MAGIC)?;
        writer.write_all(&[LOG_VERSION])?;
        for entry in log {
            Self::write_entry(&mut writer, entry)?;
        }

        writer.flush()?;
        writer.get_ref().sync_all()?;

        tracing::debug!(path = %self.path.display(), entries = log.len(), "wrote capture log");
        Ok(())
    }

    /// Read every entry, verifying header and checksums.
    pub fn read(&self) -> Result<Log> {
        let mut reader = BufReader::new(File::open(&self.path)?);

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != LOG_MAGIC {
            return Err(RecycleError::InvalidFormat("Invalid log magic".into()));
        }

        let mut version = [0u8; 1];
        reader.read_exact(&mut version)?;
        if version[0] != LOG_VERSION {
            return Err(RecycleError::InvalidFormat(format!(
                "Unsupported log version: {}",
                version[0]
            )));
        }

        let mut log = Log::new();
        while let Some(entry) = Self::read_entry(&mut reader)? {
            log.push(entry);
        }
        Ok(log)
    }

    fn write_entry(writer: &mut impl Write, entry: &LogEntry) -> Result<()> {
        let encoded = rmp_serde::to_vec(entry)?;

        let len = encoded.len() as u32;
        writer.write_all(&len.to_le_bytes())?;
        writer.write_all(&encoded)?;

        let checksum = crc32fast::hash(&encoded);
        writer.write_all(&checksum.to_le_bytes())?;

        Ok(())
    }

    /// Next entry, or `None` at a clean end of file.
    fn read_entry(reader: &mut impl Read) -> Result<Option<LogEntry>> {
        let mut len_bytes = [0u8; 4];
        let mut filled = 0;
        while filled < len_bytes.len() {
            match reader.read(&mut len_bytes[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        match filled {
            0 => return Ok(None),
            4 => {}
            _ => return Err(RecycleError::Corruption("Truncated log frame".into())),
        }
        let len = u32::from_le_bytes(len_bytes) as usize;

        if len > MAX_FRAME_BYTES {
            return Err(RecycleError::Corruption("Log frame too large".into()));
        }

        let mut encoded = vec![0u8; len];
        let mut checksum_bytes = [0u8; 4];
        reader
            .read_exact(&mut encoded)
            .and_then(|_| reader.read_exact(&mut checksum_bytes))
            .map_err(|e| match e.kind() {
                ErrorKind::UnexpectedEof => RecycleError::Corruption("Truncated log frame".into()),
                _ => RecycleError::Io(e),
            })?;

        let stored = u32::from_le_bytes(checksum_bytes);
        let computed = crc32fast::hash(&encoded);
        if stored != computed {
            return Err(RecycleError::ChecksumMismatch {
                expected: stored,
                got: computed,
            });
        }

        Ok(Some(rmp_serde::from_slice(&encoded)?))
    }
}
