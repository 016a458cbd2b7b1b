//! Seams between region storage and chunk contents.
//!
//! Region storage only moves opaque byte payloads around. A [`ChunkCodec`]
//! turns those payloads into chunks and back, and [`TileEntityHooks`] let
//! the owner flatten and restore tile entities around save and load.

use crate::position::BlockPosition;
use nbt::decode::{read_compound_tag, TagDecodeError};
use nbt::encode::write_compound_tag;
use nbt::CompoundTag;
use std::convert::Infallible;
use std::error::Error;
use std::fmt::Display;
use std::io;
use std::io::Cursor;

pub trait ChunkCodec {
    type Chunk;
    type Error: Error + Send + Sync + 'static;

    fn decode(&self, raw: &[u8]) -> Result<Self::Chunk, Self::Error>;

    fn encode(&self, chunk: &Self::Chunk) -> Result<Vec<u8>, Self::Error>;
}

/// Keeps chunk payloads as plain bytes.
#[derive(Copy, Clone, Debug, Default)]
pub struct RawCodec;

impl ChunkCodec for RawCodec {
    type Chunk = Vec<u8>;
    type Error = Infallible;

    fn decode(&self, raw: &[u8]) -> Result<Vec<u8>, Infallible> {
        Ok(raw.to_vec())
    }

    fn encode(&self, chunk: &Vec<u8>) -> Result<Vec<u8>, Infallible> {
        Ok(chunk.clone())
    }
}

/// Chunks as uncompressed NBT compound tags.
#[derive(Copy, Clone, Debug, Default)]
pub struct NbtCodec;

#[derive(Debug)]
pub enum NbtCodecError {
    TagDecodeError { tag_decode_error: TagDecodeError },
    IOError { io_error: io::Error },
}

impl From<TagDecodeError> for NbtCodecError {
    fn from(tag_decode_error: TagDecodeError) -> Self {
        NbtCodecError::TagDecodeError { tag_decode_error }
    }
}

impl From<io::Error> for NbtCodecError {
    fn from(io_error: io::Error) -> Self {
        NbtCodecError::IOError { io_error }
    }
}

impl Error for NbtCodecError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            NbtCodecError::TagDecodeError { tag_decode_error } => Some(tag_decode_error),
            NbtCodecError::IOError { io_error } => Some(io_error),
        }
    }
}

impl Display for NbtCodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NbtCodecError::TagDecodeError { .. } => write!(f, "Failed to decode nbt"),
            NbtCodecError::IOError { .. } => write!(f, "Failed to encode nbt"),
        }
    }
}

impl ChunkCodec for NbtCodec {
    type Chunk = CompoundTag;
    type Error = NbtCodecError;

    fn decode(&self, raw: &[u8]) -> Result<CompoundTag, NbtCodecError> {
        let mut cursor = Cursor::new(raw);

        Ok(read_compound_tag(&mut cursor)?)
    }

    fn encode(&self, chunk: &CompoundTag) -> Result<Vec<u8>, NbtCodecError> {
        let mut buffer = Vec::new();
        write_compound_tag(&mut buffer, chunk)?;

        Ok(buffer)
    }
}

/// Called around save and load to keep tile entities in sync with chunk data.
pub trait TileEntityHooks<C> {
    /// Flattens tile entities into the serializable part of chunk before save.
    fn extract_tiles(&mut self, chunk: &mut C);

    /// Restores tile entities after load, `origin` is the chunk origin in block space.
    fn insert_tiles(&mut self, chunk: &mut C, origin: BlockPosition);
}

/// Hooks for chunks without tile entities.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoTileEntities;

impl<C> TileEntityHooks<C> for NoTileEntities {
    fn extract_tiles(&mut self, _chunk: &mut C) {}

    fn insert_tiles(&mut self, _chunk: &mut C, _origin: BlockPosition) {}
}

#[cfg(test)]
mod tests {
    use crate::codec::{ChunkCodec, NbtCodec, RawCodec};
    use nbt::CompoundTag;

    #[test]
    fn test_raw_codec_keeps_bytes() {
        let raw = b"AAAAAAAAAA".to_vec();
        let chunk = RawCodec.decode(&raw).unwrap();

        assert_eq!(chunk, raw);
        assert_eq!(RawCodec.encode(&chunk).unwrap(), raw);
    }

    #[test]
    fn test_nbt_codec() {
        let mut compound_tag = CompoundTag::new();
        compound_tag.insert_i32("xPos", 15);
        compound_tag.insert_i32("zPos", 3);
        compound_tag.insert_str("Status", "full");

        let raw = NbtCodec.encode(&compound_tag).unwrap();
        let decoded = NbtCodec.decode(&raw).unwrap();

        assert_eq!(decoded.get_i32("xPos").unwrap(), 15);
        assert_eq!(decoded.get_i32("zPos").unwrap(), 3);
        assert_eq!(decoded.get_str("Status").unwrap(), "full");
    }

    #[test]
    fn test_nbt_codec_rejects_garbage() {
        assert!(NbtCodec.decode(&[0xFF, 0x00, 0x01]).is_err());
    }
}
