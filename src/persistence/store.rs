//! On-disk sector records.
//!
//! One file per sector, named `sector{X}-{Y}.svx` under the save
//! directory. A file is a bincode header (magic, version, coordinate,
//! entry count, crc32 of the uncompressed body) followed by a gzip stream
//! of the bincode-encoded [`SectorRecord`]. Writes go through a temp file
//! and a rename so a crash never leaves a half-written record behind.

use crate::persistence::{rle, PersistenceError, PersistenceResult};
use crate::world::position::{LocalPos, SectorPos};
use crate::world::voxel::VoxelVolume;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Version of the sector record format
pub const RECORD_VERSION: u32 = 1;

/// Magic bytes identifying sector record files
const RECORD_MAGIC: &[u8; 4] = b"SVXS";

/// Upper bound on slots per sector accepted from disk
const MAX_SECTOR_SLOTS: u32 = 64 * 64;

/// Header for persisted sector records
#[derive(Debug, Serialize, Deserialize)]
struct RecordHeader {
    magic: [u8; 4],
    version: u32,
    sector_pos: SectorPos,
    entry_count: u32,
    checksum: u32,
}

/// The persisted body of one sector: its coordinate plus one optional
/// run-length entry per chunk slot, row-major by local coordinate.
/// An absent entry means that slot was never generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorRecord {
    pub sector_pos: SectorPos,
    pub entries: Vec<Option<String>>,
}

impl SectorRecord {
    /// Build a record by run-length encoding every populated slot.
    pub fn from_volumes(sector_pos: SectorPos, slots: &[Option<VoxelVolume>]) -> Self {
        Self {
            sector_pos,
            entries: slots
                .iter()
                .map(|slot| slot.as_ref().map(rle::encode))
                .collect(),
        }
    }

    /// Decode every entry back into a volume of the given chunk dimensions.
    /// Any malformed entry fails the whole record.
    pub fn decode_volumes(
        &self,
        chunk_width: i32,
        chunk_height: i32,
    ) -> PersistenceResult<Vec<Option<VoxelVolume>>> {
        self.entries
            .iter()
            .map(|entry| {
                entry
                    .as_ref()
                    .map(|text| rle::decode(text, chunk_width, chunk_height, chunk_width))
                    .transpose()
            })
            .collect()
    }

    /// Entry for a slot coordinate, if present.
    pub fn entry(&self, local: LocalPos, sector_size: i32) -> Option<&str> {
        self.entries
            .get(local.slot_index(sector_size))
            .and_then(|e| e.as_deref())
    }
}

/// Reads and writes sector records under one save directory.
#[derive(Debug, Clone)]
pub struct SectorStore {
    save_dir: PathBuf,
}

impl SectorStore {
    /// Open a store, creating the save directory if needed.
    pub fn new(save_dir: impl Into<PathBuf>) -> PersistenceResult<Self> {
        let save_dir = save_dir.into();
        fs::create_dir_all(&save_dir)?;
        Ok(Self { save_dir })
    }

    /// File path backing a sector coordinate.
    pub fn record_path(&self, pos: SectorPos) -> PathBuf {
        self.save_dir.join(format!("sector{}-{}.svx", pos.x, pos.y))
    }

    /// Whether a persisted record exists for the coordinate.
    pub fn exists(&self, pos: SectorPos) -> bool {
        self.record_path(pos).exists()
    }

    /// Serialize, compress and atomically write a record.
    pub fn save(&self, record: &SectorRecord) -> PersistenceResult<()> {
        let body = bincode::serialize(record)?;
        let checksum = calculate_checksum(&body);

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&body)?;
        let compressed = encoder.finish()?;

        let header = RecordHeader {
            magic: *RECORD_MAGIC,
            version: RECORD_VERSION,
            sector_pos: record.sector_pos,
            entry_count: record.entries.len() as u32,
            checksum,
        };
        let mut data = bincode::serialize(&header)?;
        data.extend_from_slice(&compressed);

        atomic_write(&self.record_path(record.sector_pos), &data)
    }

    /// Load and validate the record for a coordinate.
    ///
    /// Validation order: file size, magic, version, entry-count sanity,
    /// decompression, checksum, body decode. Every failure after the read
    /// surfaces as a corruption-class error so callers can fall back to
    /// regenerating the sector.
    pub fn load(&self, pos: SectorPos) -> PersistenceResult<SectorRecord> {
        let data = fs::read(self.record_path(pos))?;
        if data.len() < 24 {
            return Err(PersistenceError::CorruptedData(
                "Data too small to contain a record header".to_string(),
            ));
        }

        let header: RecordHeader = bincode::deserialize(&data)?;
        if header.magic != *RECORD_MAGIC {
            return Err(PersistenceError::CorruptedData(
                "Invalid record magic".to_string(),
            ));
        }
        if header.version != RECORD_VERSION {
            return Err(PersistenceError::VersionMismatch {
                expected: RECORD_VERSION,
                found: header.version,
            });
        }
        if header.entry_count > MAX_SECTOR_SLOTS {
            return Err(PersistenceError::CorruptedData(format!(
                "Entry count {} exceeds maximum {}",
                header.entry_count, MAX_SECTOR_SLOTS
            )));
        }

        let header_size = bincode::serialized_size(&header)? as usize;
        let mut body = Vec::new();
        GzDecoder::new(&data[header_size..])
            .read_to_end(&mut body)
            .map_err(|e| PersistenceError::CorruptedData(format!("Decompression failed: {}", e)))?;

        if calculate_checksum(&body) != header.checksum {
            return Err(PersistenceError::CorruptedData(
                "Checksum mismatch".to_string(),
            ));
        }

        let record: SectorRecord = bincode::deserialize(&body)
            .map_err(|e| PersistenceError::DeserializationError(e.to_string()))?;
        if record.sector_pos != pos {
            return Err(PersistenceError::CorruptedData(format!(
                "Record is for sector ({}, {}), expected ({}, {})",
                record.sector_pos.x, record.sector_pos.y, pos.x, pos.y
            )));
        }
        if record.entries.len() != header.entry_count as usize {
            return Err(PersistenceError::CorruptedData(format!(
                "Header lists {} entries but the body holds {}",
                header.entry_count,
                record.entries.len()
            )));
        }

        Ok(record)
    }
}

fn calculate_checksum(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Write via a sibling temp file and rename, so readers only ever observe
/// complete records.
fn atomic_write(path: &Path, data: &[u8]) -> PersistenceResult<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, data)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
