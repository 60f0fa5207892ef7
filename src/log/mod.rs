//! # Persistent Log Module
//!
//! Flash-style circular record store backed by a single file.
//!
//! This module handles:
//! - The on-disk header (magic + write offset) and its validation
//! - Sequential fixed-size record appends with wraparound
//! - Full reinitialization when the header is corrupt or missing
//!
//! ## On-disk layout (little-endian)
//!
//! ```text
//! offset 0:  magic (4 bytes) = 0x53454E31 ("SEN1")
//! offset 4:  write_offset (4 bytes, unsigned)
//! offset 8:  payload region, payload_capacity bytes,
//!            sequential fixed-size Snapshot records
//! ```
//!
//! ## Durability model
//!
//! A record write and the following header write are two separate storage
//! operations. Power loss between them can leave the header pointing at a
//! slot that was never filled, or an old header pointing short of a record
//! that was written. This narrow window is accepted; there is no
//! transactional dual-header scheme.
//!
//! ## Wraparound semantics
//!
//! Superseded record bytes beyond the current write pointer are never
//! invalidated. A reader scanning the raw payload cannot tell live-but-
//! superseded bytes from never-written sentinel bytes without the header;
//! consumers must treat the header's write offset as the only source of
//! truth for where the newest data ends.

use bytes::{Buf, BufMut};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::{info, warn};

use crate::error::LogError;
use crate::snapshot::{Snapshot, RECORD_SIZE};

/// Magic constant identifying a valid log header ("SEN1")
pub const LOG_MAGIC: u32 = 0x53454E31;

/// Size of the on-disk header in bytes (magic + write_offset)
pub const HEADER_SIZE: usize = 8;

/// Byte used to fill the payload region at initialization
pub const FILL_BYTE: u8 = 0xFF;

/// The on-disk header: magic constant plus the next write offset
///
/// `write_offset` is relative to the start of the payload region. Invariant:
/// it is always less than the payload capacity and a multiple of
/// [`RECORD_SIZE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogHeader {
    /// Magic constant, always [`LOG_MAGIC`] on disk
    pub magic: u32,

    /// Payload-relative offset of the next record write
    pub write_offset: u32,
}

impl LogHeader {
    /// Encode the header into its fixed little-endian layout
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        let mut cursor = &mut buf[..];
        cursor.put_u32_le(self.magic);
        cursor.put_u32_le(self.write_offset);
        buf
    }

    /// Decode a header from its wire layout
    pub fn from_bytes(bytes: &[u8; HEADER_SIZE]) -> Self {
        let mut cursor = &bytes[..];
        Self {
            magic: cursor.get_u32_le(),
            write_offset: cursor.get_u32_le(),
        }
    }
}

/// Durable, crash-recoverable, fixed-capacity circular record store
///
/// Exactly one task (the log writer) owns a `FlashLog`; the single-owner
/// rule is what makes the read-modify-write append sequence safe without
/// file locking.
#[derive(Debug)]
pub struct FlashLog {
    file: File,
    payload_capacity: u32,
}

impl FlashLog {
    /// Open the backing file, creating and initializing it if needed
    ///
    /// Reads and validates the header. If the magic does not match, or the
    /// stored write offset is out of range or misaligned, the log is treated
    /// as corrupt: the entire payload region is overwritten with
    /// [`FILL_BYTE`] and a fresh header with offset 0 is written. Prior data
    /// is unrecoverable on that path; that loss is the accepted policy for
    /// corruption.
    ///
    /// # Arguments
    ///
    /// * `path` - Backing file within the storage partition
    /// * `payload_capacity` - Payload region size in bytes; must be a
    ///   nonzero multiple of [`RECORD_SIZE`] (config-validated)
    ///
    /// # Errors
    ///
    /// Returns `LogError::Io` if the file cannot be created, read, or
    /// written.
    pub fn open_or_init(path: &Path, payload_capacity: u32) -> Result<Self, LogError> {
        assert!(
            payload_capacity > 0 && payload_capacity as usize % RECORD_SIZE == 0,
            "payload capacity must be a nonzero multiple of the record size"
        );

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;

        let mut log = Self {
            file,
            payload_capacity,
        };

        match log.read_header() {
            Ok(header) => {
                info!(
                    "opened log at {} (write_offset={})",
                    path.display(),
                    header.write_offset
                );
            }
            Err(LogError::HeaderInvalid(reason)) => {
                warn!(
                    "log at {} is corrupt or uninitialized ({}), reinitializing",
                    path.display(),
                    reason
                );
                log.reinitialize()?;
            }
            // An I/O failure says nothing about the data; surface it as a
            // fatal open error instead of wiping the log
            Err(e) => return Err(e),
        }

        Ok(log)
    }

    /// Payload region size in bytes
    pub fn payload_capacity(&self) -> u32 {
        self.payload_capacity
    }

    /// Number of record slots in the payload region
    pub fn slot_count(&self) -> u32 {
        self.payload_capacity / RECORD_SIZE as u32
    }

    /// Read and validate the on-disk header
    ///
    /// # Errors
    ///
    /// * `LogError::HeaderInvalid` - short read, magic mismatch, offset out
    ///   of range, or offset not record-aligned
    /// * `LogError::Io` - seek/read failure
    pub fn read_header(&mut self) -> Result<LogHeader, LogError> {
        self.file.seek(SeekFrom::Start(0))?;

        let mut bytes = [0u8; HEADER_SIZE];
        let mut filled = 0;
        while filled < HEADER_SIZE {
            match self.file.read(&mut bytes[filled..]) {
                Ok(0) => {
                    return Err(LogError::HeaderInvalid(format!(
                        "short header: {} of {} bytes",
                        filled, HEADER_SIZE
                    )))
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(LogError::Io(e)),
            }
        }

        let header = LogHeader::from_bytes(&bytes);
        if header.magic != LOG_MAGIC {
            return Err(LogError::HeaderInvalid(format!(
                "bad magic 0x{:08x}",
                header.magic
            )));
        }
        if header.write_offset >= self.payload_capacity {
            return Err(LogError::HeaderInvalid(format!(
                "write_offset {} out of range (capacity {})",
                header.write_offset, self.payload_capacity
            )));
        }
        if header.write_offset as usize % RECORD_SIZE != 0 {
            return Err(LogError::HeaderInvalid(format!(
                "write_offset {} not record-aligned",
                header.write_offset
            )));
        }

        Ok(header)
    }

    /// Append one record at the current write offset and advance the header
    ///
    /// The target position is `HEADER_SIZE + write_offset`. After the record
    /// write, the offset advances by one record size, or wraps to 0 when the
    /// record just written plus one more would not fit in the payload
    /// region. The updated header is written and persisted before returning.
    ///
    /// # Errors
    ///
    /// Returns `LogError` on any seek/read/write failure or if the header
    /// has become invalid. The writer task treats every append error as
    /// retryable.
    pub fn append(&mut self, record: &Snapshot) -> Result<(), LogError> {
        let header = self.read_header()?;

        let position = HEADER_SIZE as u64 + header.write_offset as u64;
        self.file.seek(SeekFrom::Start(position))?;
        self.file.write_all(&record.to_bytes())?;

        // Wrap when the slot just used plus one more slot would overrun the
        // payload region; otherwise advance one slot.
        let next_offset =
            if header.write_offset + 2 * RECORD_SIZE as u32 > self.payload_capacity {
                0
            } else {
                header.write_offset + RECORD_SIZE as u32
            };

        self.write_header(LogHeader {
            magic: LOG_MAGIC,
            write_offset: next_offset,
        })?;

        Ok(())
    }

    /// Reinitialize the log in place: sentinel-fill the payload, offset 0
    ///
    /// Used both for corruption recovery at open and for the operator's
    /// clear command. All previously logged data is lost.
    ///
    /// # Errors
    ///
    /// Returns `LogError::Io` on seek/write failure.
    pub fn reset(&mut self) -> Result<(), LogError> {
        self.reinitialize()
    }

    fn reinitialize(&mut self) -> Result<(), LogError> {
        self.file.seek(SeekFrom::Start(HEADER_SIZE as u64))?;
        let fill = vec![FILL_BYTE; self.payload_capacity as usize];
        self.file.write_all(&fill)?;
        self.file.set_len((HEADER_SIZE + fill.len()) as u64)?;

        self.write_header(LogHeader {
            magic: LOG_MAGIC,
            write_offset: 0,
        })?;

        info!(
            "log initialized: {} payload bytes, {} record slots",
            self.payload_capacity,
            self.slot_count()
        );
        Ok(())
    }

    fn write_header(&mut self, header: LogHeader) -> Result<(), LogError> {
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&header.to_bytes())?;
        self.file.sync_data()?;
        Ok(())
    }
}
