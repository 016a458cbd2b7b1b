//! Region header: the offset table followed by the timestamp table.
//!
//! Both tables hold one 4 byte big endian entry per chunk slot, ordered by
//! `z * 32 + x`. An offset entry packs the start sector into its high 3 bytes
//! and the sector count into the low byte. Start sector 0 means the slot is empty.

use crate::error::RegionLoadError;
use crate::position::RegionChunkPosition;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io;
use std::io::{Cursor, Read, Write};

/// Amount of chunks in region.
pub const REGION_CHUNKS: usize = 1024;
/// Region sector length in bytes.
pub const REGION_SECTOR_BYTES_LENGTH: u64 = 4096;
/// Region header length in bytes.
pub const REGION_HEADER_BYTES_LENGTH: u64 = 2 * REGION_SECTOR_BYTES_LENGTH;
/// Length field and compression scheme preceding every chunk payload.
pub const CHUNK_HEADER_BYTES_LENGTH: u64 = 5;
/// Sector count is stored in one byte.
pub const MAXIMUM_CHUNK_SECTORS: u64 = 255;
/// Timestamps are kept positive when written as signed 32 bit.
pub const TIMESTAMP_MASK: i64 = 0x7FFF_FFFF;

/// Chunk metadata are stored in header.
#[derive(Copy, Clone, Default, Debug, Eq, PartialEq)]
pub struct ChunkMetadata {
    /// Sector index from which starts chunk data.
    pub start_sector_index: u32,
    /// Amount of sectors used to store chunk.
    pub sectors: u8,
    /// Last time in seconds when chunk was modified.
    pub last_modified_timestamp: i32,
}

impl ChunkMetadata {
    pub fn new(start_sector_index: u32, sectors: u8, last_modified_timestamp: i32) -> Self {
        ChunkMetadata {
            start_sector_index,
            sectors,
            last_modified_timestamp,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start_sector_index == 0
    }

    /// Position offset from source start at which starts chunk data.
    pub fn seek_offset(&self) -> u64 {
        self.start_sector_index as u64 * REGION_SECTOR_BYTES_LENGTH
    }

    pub fn byte_length(&self) -> u64 {
        self.sectors as u64 * REGION_SECTOR_BYTES_LENGTH
    }
}

/// First 8KB of region: 1024 offsets and 1024 timestamps.
pub struct RegionHeader {
    chunks_metadata: [ChunkMetadata; REGION_CHUNKS],
}

impl RegionHeader {
    pub fn new() -> Self {
        RegionHeader {
            chunks_metadata: [Default::default(); REGION_CHUNKS],
        }
    }

    pub fn get(&self, position: RegionChunkPosition) -> ChunkMetadata {
        self.chunks_metadata[position.index()]
    }

    pub fn set(&mut self, position: RegionChunkPosition, metadata: ChunkMetadata) {
        self.chunks_metadata[position.index()] = metadata;
    }

    /// Non empty slots with their metadata in slot order.
    pub fn present(&self) -> impl Iterator<Item = (RegionChunkPosition, ChunkMetadata)> + '_ {
        self.chunks_metadata
            .iter()
            .enumerate()
            .filter(|(_, metadata)| !metadata.is_empty())
            .map(|(index, metadata)| (RegionChunkPosition::from_index(index), *metadata))
    }

    /// Reads both tables as one fixed block.
    ///
    /// Timestamps of empty slots are dropped.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, RegionLoadError> {
        let mut buffer = vec![0u8; REGION_HEADER_BYTES_LENGTH as usize];
        let actual = read_fully(reader, &mut buffer)?;

        if actual < buffer.len() {
            return Err(RegionLoadError::Truncated {
                position: None,
                offset: 0,
                expected: buffer.len() as u64,
                actual: actual as u64,
            });
        }

        let (offsets, timestamps) = buffer.split_at(REGION_SECTOR_BYTES_LENGTH as usize);
        let mut offsets = Cursor::new(offsets);
        let mut timestamps = Cursor::new(timestamps);
        let mut header = RegionHeader::new();

        for index in 0..REGION_CHUNKS {
            let high = offsets.read_u16::<BigEndian>()? as u32;
            let low = offsets.read_u8()? as u32;
            let sectors = offsets.read_u8()?;
            let last_modified_timestamp = timestamps.read_i32::<BigEndian>()?;

            let start_sector_index = (high << 8) | low;

            if start_sector_index == 0 {
                continue;
            }

            header.chunks_metadata[index] =
                ChunkMetadata::new(start_sector_index, sectors, last_modified_timestamp);
        }

        Ok(header)
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), io::Error> {
        let mut buffer = Vec::with_capacity(REGION_HEADER_BYTES_LENGTH as usize);

        for metadata in self.chunks_metadata.iter() {
            if metadata.is_empty() {
                buffer.write_u32::<BigEndian>(0)?;
            } else {
                let offset = (metadata.start_sector_index << 8) | metadata.sectors as u32;
                buffer.write_u32::<BigEndian>(offset)?;
            }
        }

        for metadata in self.chunks_metadata.iter() {
            if metadata.is_empty() {
                buffer.write_i32::<BigEndian>(0)?;
            } else {
                buffer.write_i32::<BigEndian>(metadata.last_modified_timestamp)?;
            }
        }

        writer.write_all(&buffer)
    }
}

/// Amount of whole sectors needed to hold given amount of bytes.
pub fn sectors_required(bytes_length: u64) -> u64 {
    (bytes_length + REGION_SECTOR_BYTES_LENGTH - 1) / REGION_SECTOR_BYTES_LENGTH
}

/// Truncates seconds since epoch to 31 bits.
///
/// Wraps for dates past January 2038. Kept for compatibility with
/// existing region files which treat the field as signed.
pub fn masked_timestamp(seconds: i64) -> i32 {
    (seconds & TIMESTAMP_MASK) as i32
}

/// Reads until buffer is full or source is exhausted, returns amount of bytes read.
pub(crate) fn read_fully<R: Read>(reader: &mut R, buffer: &mut [u8]) -> Result<usize, io::Error> {
    let mut total = 0;

    while total < buffer.len() {
        match reader.read(&mut buffer[total..]) {
            Ok(0) => break,
            Ok(read) => total += read,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use crate::error::RegionLoadError;
    use crate::header::{
        masked_timestamp, sectors_required, ChunkMetadata, RegionHeader,
        REGION_HEADER_BYTES_LENGTH,
    };
    use crate::position::RegionChunkPosition;
    use std::io::Cursor;

    #[test]
    fn test_header_round_trip() {
        let mut header = RegionHeader::new();
        header.set(RegionChunkPosition::new(0, 0), ChunkMetadata::new(2, 1, 1570215508));
        header.set(RegionChunkPosition::new(15, 3), ChunkMetadata::new(0x01_02_03, 255, 7));

        let mut buffer = Vec::new();
        header.write(&mut buffer).unwrap();

        assert_eq!(buffer.len() as u64, REGION_HEADER_BYTES_LENGTH);

        let read_header = RegionHeader::read(&mut Cursor::new(buffer)).unwrap();
        let present: Vec<_> = read_header.present().collect();

        assert_eq!(
            present,
            vec![
                (RegionChunkPosition::new(0, 0), ChunkMetadata::new(2, 1, 1570215508)),
                (RegionChunkPosition::new(15, 3), ChunkMetadata::new(0x01_02_03, 255, 7)),
            ]
        );
    }

    #[test]
    fn test_offset_entry_layout() {
        let mut header = RegionHeader::new();
        header.set(RegionChunkPosition::new(1, 0), ChunkMetadata::new(0x0A_0B_0C, 3, -1));

        let mut buffer = Vec::new();
        header.write(&mut buffer).unwrap();

        assert_eq!(&buffer[0..4], &[0, 0, 0, 0]);
        assert_eq!(&buffer[4..8], &[0x0A, 0x0B, 0x0C, 3]);
        assert_eq!(&buffer[4096 + 4..4096 + 8], &[0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_empty_slot_timestamp_dropped() {
        let mut buffer = vec![0u8; REGION_HEADER_BYTES_LENGTH as usize];
        // Timestamp without offset for slot 5.
        buffer[4096 + 5 * 4 + 3] = 42;
        // Zero start sector but nonzero sector count.
        buffer[6 * 4 + 3] = 1;

        let header = RegionHeader::read(&mut Cursor::new(buffer)).unwrap();

        assert_eq!(header.present().count(), 0);
        assert_eq!(header.get(RegionChunkPosition::new(5, 0)), ChunkMetadata::default());
    }

    #[test]
    fn test_truncated_header() {
        let buffer = vec![0u8; 100];
        let error = RegionHeader::read(&mut Cursor::new(buffer)).err().unwrap();

        match error {
            RegionLoadError::Truncated {
                position,
                offset,
                expected,
                actual,
            } => {
                assert_eq!(position, None);
                assert_eq!(offset, 0);
                assert_eq!(expected, REGION_HEADER_BYTES_LENGTH);
                assert_eq!(actual, 100);
            }
            _ => panic!("Expected `Truncated` but got `{:?}`", error),
        }
    }

    #[test]
    fn test_sectors_required_exact_multiple() {
        assert_eq!(sectors_required(1), 1);
        assert_eq!(sectors_required(4096), 1);
        assert_eq!(sectors_required(4097), 2);
        assert_eq!(sectors_required(3 * 4096), 3);
        assert_eq!(sectors_required(0), 0);
    }

    #[test]
    fn test_masked_timestamp() {
        assert_eq!(masked_timestamp(1570215508), 1570215508);
        // First second past signed 32 bit range wraps to zero.
        assert_eq!(masked_timestamp(1 << 31), 0);
        assert!(masked_timestamp(4_000_000_000) >= 0);
    }
}
