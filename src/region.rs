use crate::codec::{ChunkCodec, NoTileEntities, TileEntityHooks};
use crate::compression::CompressionScheme;
use crate::error::{ChunkNotFound, RegionLoadError, RegionSaveError};
use crate::header::{
    masked_timestamp, read_fully, sectors_required, ChunkMetadata, RegionHeader,
    CHUNK_HEADER_BYTES_LENGTH, MAXIMUM_CHUNK_SECTORS, REGION_CHUNKS, REGION_HEADER_BYTES_LENGTH,
    REGION_SECTOR_BYTES_LENGTH,
};
use crate::position::{RegionChunkPosition, RegionPosition};
use bitvec::prelude::*;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use flate2::Compression;
use log::{debug, trace};
use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::time::{SystemTime, UNIX_EPOCH};

/// Region represents a 32x32 group of chunks held in memory.
///
/// Chunks are decoded on load and the whole file layout is rebuilt on save,
/// so chunks are always stored compacted in slot order.
pub struct RegionStore<K: ChunkCodec, H = NoTileEntities> {
    /// Region coordinates.
    position: RegionPosition,
    codec: K,
    hooks: H,
    compression_scheme: CompressionScheme,
    compression_level: Compression,
    /// Chunks indexed by slot.
    chunks: Vec<Option<K::Chunk>>,
    /// Last modified timestamps indexed by slot, valid where `timestamped` is set.
    timestamps: [i32; REGION_CHUNKS],
    timestamped: BitVec,
}

impl<K: ChunkCodec> RegionStore<K, NoTileEntities> {
    pub fn new(position: RegionPosition, codec: K) -> Self {
        RegionStore::with_hooks(position, codec, NoTileEntities)
    }
}

impl<K: ChunkCodec, H> RegionStore<K, H> {
    pub fn with_hooks(position: RegionPosition, codec: K, hooks: H) -> Self {
        RegionStore {
            position,
            codec,
            hooks,
            compression_scheme: CompressionScheme::default(),
            compression_level: Compression::default(),
            chunks: (0..REGION_CHUNKS).map(|_| None).collect(),
            timestamps: [0; REGION_CHUNKS],
            timestamped: bitvec![0; REGION_CHUNKS],
        }
    }

    pub fn position(&self) -> RegionPosition {
        self.position
    }

    pub fn codec(&self) -> &K {
        &self.codec
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    pub fn compression_level(&self) -> Compression {
        self.compression_level
    }

    /// Level used for chunks compressed by next save.
    pub fn set_compression_level(&mut self, compression_level: Compression) {
        self.compression_level = compression_level;
    }

    pub fn get<P: Into<RegionChunkPosition>>(&self, position: P) -> Result<&K::Chunk, ChunkNotFound> {
        let position = position.into();

        self.chunks[position.index()]
            .as_ref()
            .ok_or(ChunkNotFound { position })
    }

    pub fn get_mut<P: Into<RegionChunkPosition>>(
        &mut self,
        position: P,
    ) -> Result<&mut K::Chunk, ChunkNotFound> {
        let position = position.into();

        self.chunks[position.index()]
            .as_mut()
            .ok_or(ChunkNotFound { position })
    }

    /// Stores chunk, returning the one previously held by slot.
    ///
    /// Slot timestamp stays as is; slots without one get it on save.
    pub fn insert<P: Into<RegionChunkPosition>>(
        &mut self,
        position: P,
        chunk: K::Chunk,
    ) -> Option<K::Chunk> {
        let position = position.into();

        self.chunks[position.index()].replace(chunk)
    }

    /// Removes chunk along with its timestamp.
    pub fn remove<P: Into<RegionChunkPosition>>(
        &mut self,
        position: P,
    ) -> Result<K::Chunk, ChunkNotFound> {
        let position = position.into();
        let index = position.index();
        let chunk = self.chunks[index].take().ok_or(ChunkNotFound { position })?;

        self.timestamps[index] = 0;
        self.timestamped.set(index, false);

        Ok(chunk)
    }

    pub fn contains<P: Into<RegionChunkPosition>>(&self, position: P) -> bool {
        self.chunks[position.into().index()].is_some()
    }

    /// Last modified timestamp in seconds, if slot has one.
    pub fn timestamp<P: Into<RegionChunkPosition>>(&self, position: P) -> Option<i32> {
        let index = position.into().index();

        if self.timestamped[index] {
            Some(self.timestamps[index])
        } else {
            None
        }
    }

    /// Positions of stored chunks in slot order.
    pub fn positions(&self) -> impl Iterator<Item = RegionChunkPosition> + '_ {
        self.iter().map(|(position, _)| position)
    }

    pub fn iter(&self) -> impl Iterator<Item = (RegionChunkPosition, &K::Chunk)> + '_ {
        self.chunks.iter().enumerate().filter_map(|(index, chunk)| {
            chunk
                .as_ref()
                .map(|chunk| (RegionChunkPosition::from_index(index), chunk))
        })
    }

    pub fn len(&self) -> usize {
        self.chunks.iter().filter(|chunk| chunk.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.iter().all(|chunk| chunk.is_none())
    }

    /// Removes all chunks and timestamps.
    pub fn clear(&mut self) {
        for chunk in self.chunks.iter_mut() {
            *chunk = None;
        }

        self.timestamps = [0; REGION_CHUNKS];
        self.timestamped = bitvec![0; REGION_CHUNKS];
    }

    fn read_chunk<S: Read + Seek>(
        &self,
        source: &mut S,
        position: RegionChunkPosition,
        metadata: ChunkMetadata,
    ) -> Result<K::Chunk, RegionLoadError> {
        let offset = metadata.seek_offset();
        source.seek(SeekFrom::Start(offset))?;

        let mut chunk_header = [0u8; CHUNK_HEADER_BYTES_LENGTH as usize];
        let actual = read_fully(source, &mut chunk_header)?;

        if actual < chunk_header.len() {
            return Err(RegionLoadError::Truncated {
                position: Some(position),
                offset,
                expected: CHUNK_HEADER_BYTES_LENGTH,
                actual: actual as u64,
            });
        }

        let mut cursor = Cursor::new(&chunk_header[..]);
        let length = cursor.read_u32::<BigEndian>()?;
        let compression_scheme = cursor.read_u8()?;

        let scheme = CompressionScheme::from_id(compression_scheme).ok_or(
            RegionLoadError::UnsupportedCompressionScheme {
                position,
                offset,
                compression_scheme,
            },
        )?;

        // Length field itself is not counted in length.
        if length == 0 || length as u64 + 4 > metadata.byte_length() {
            return Err(RegionLoadError::InvalidLength {
                position,
                offset,
                length,
            });
        }

        // Length counts compression scheme byte which is already read.
        let expected = length as u64 - 1;
        let mut compressed = Vec::new();
        source.by_ref().take(expected).read_to_end(&mut compressed)?;

        if (compressed.len() as u64) < expected {
            return Err(RegionLoadError::Truncated {
                position: Some(position),
                offset: offset + CHUNK_HEADER_BYTES_LENGTH,
                expected,
                actual: compressed.len() as u64,
            });
        }

        trace!(
            target: "region-store",
            "Region {} chunk {} read {} compressed bytes from offset {}",
            self.position, position, expected, offset
        );

        let raw = scheme
            .decompress(&compressed)
            .map_err(|io_error| RegionLoadError::DecompressError {
                position,
                offset,
                io_error,
            })?;

        self.codec
            .decode(&raw)
            .map_err(|error| RegionLoadError::ChunkDecodeError {
                position,
                offset,
                error: Box::new(error),
            })
    }

    /// Writes chunk at current destination position and returns amount of sectors used.
    fn write_chunk<S: Write>(
        &self,
        destination: &mut S,
        position: RegionChunkPosition,
        chunk: &K::Chunk,
    ) -> Result<u64, RegionSaveError> {
        let raw = self
            .codec
            .encode(chunk)
            .map_err(|error| RegionSaveError::ChunkEncodeError {
                position,
                error: Box::new(error),
            })?;

        let compressed = self
            .compression_scheme
            .compress(&raw, self.compression_level)?;

        let length = CHUNK_HEADER_BYTES_LENGTH + compressed.len() as u64;
        let sectors = sectors_required(length);

        if sectors > MAXIMUM_CHUNK_SECTORS {
            return Err(RegionSaveError::LengthExceedsMaximum { position, length });
        }

        let mut buffer = Vec::with_capacity((sectors * REGION_SECTOR_BYTES_LENGTH) as usize);
        buffer.write_u32::<BigEndian>(compressed.len() as u32 + 1)?;
        buffer.write_u8(self.compression_scheme.id())?;
        buffer.extend_from_slice(&compressed);

        // Padding to align sector.
        buffer.resize((sectors * REGION_SECTOR_BYTES_LENGTH) as usize, 0);
        destination.write_all(&buffer)?;

        Ok(sectors)
    }
}

impl<K: ChunkCodec, H: TileEntityHooks<K::Chunk>> RegionStore<K, H> {
    /// Reads all chunks of region from source.
    ///
    /// Any corrupted chunk fails the whole load.
    pub fn load<S: Read + Seek>(
        position: RegionPosition,
        codec: K,
        hooks: H,
        mut source: S,
    ) -> Result<Self, RegionLoadError> {
        source
            .seek(SeekFrom::Current(0))
            .map_err(|io_error| RegionLoadError::NotSeekable { io_error })?;
        source.seek(SeekFrom::Start(0))?;

        let header = RegionHeader::read(&mut source)?;
        let mut region = RegionStore::with_hooks(position, codec, hooks);

        for (chunk_position, metadata) in header.present() {
            let chunk = region.read_chunk(&mut source, chunk_position, metadata)?;
            let index = chunk_position.index();

            region.chunks[index] = Some(chunk);
            region.timestamps[index] = metadata.last_modified_timestamp;
            region.timestamped.set(index, true);
        }

        for (index, chunk) in region.chunks.iter_mut().enumerate() {
            if let Some(chunk) = chunk {
                let origin = position.block_origin(RegionChunkPosition::from_index(index));
                region.hooks.insert_tiles(chunk, origin);
            }
        }

        debug!(
            target: "region-store",
            "Loaded region {} with {} chunks",
            position,
            region.len()
        );

        Ok(region)
    }

    /// Writes whole region to destination starting from its beginning.
    ///
    /// Destination is not truncated, so bytes past the new layout are left as is.
    /// Failed save leaves destination inconsistent.
    pub fn save<S: Write + Seek>(&mut self, mut destination: S) -> Result<(), RegionSaveError> {
        destination
            .seek(SeekFrom::Current(0))
            .map_err(|io_error| RegionSaveError::NotSeekable { io_error })?;

        for chunk in self.chunks.iter_mut() {
            if let Some(chunk) = chunk {
                self.hooks.extract_tiles(chunk);
            }
        }

        let now = current_timestamp();
        let mut header = RegionHeader::new();
        let mut sector_index = REGION_HEADER_BYTES_LENGTH / REGION_SECTOR_BYTES_LENGTH;

        for index in 0..REGION_CHUNKS {
            let chunk = match &self.chunks[index] {
                Some(chunk) => chunk,
                None => continue,
            };

            let position = RegionChunkPosition::from_index(index);

            destination.seek(SeekFrom::Start(sector_index * REGION_SECTOR_BYTES_LENGTH))?;
            let sectors = self.write_chunk(&mut destination, position, chunk)?;

            if !self.timestamped[index] {
                self.timestamps[index] = masked_timestamp(now);
                self.timestamped.set(index, true);
            }

            let last_modified_timestamp = masked_timestamp(self.timestamps[index] as i64);
            let metadata =
                ChunkMetadata::new(sector_index as u32, sectors as u8, last_modified_timestamp);
            header.set(position, metadata);

            trace!(
                target: "region-store",
                "Region {} chunk {} placed at sector {} using {} sectors",
                self.position, position, sector_index, sectors
            );

            sector_index += sectors;
        }

        destination.seek(SeekFrom::Start(0))?;
        header.write(&mut destination)?;
        destination.flush()?;

        debug!(
            target: "region-store",
            "Saved region {} with {} chunks in {} sectors",
            self.position,
            self.len(),
            sector_index
        );

        Ok(())
    }
}

/// Seconds since epoch, 31 bit masking is applied by caller.
fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|time| time.as_secs() as i64)
        .unwrap_or(0)
}
