use crate::position::RegionChunkPosition;
use std::{error::Error, fmt::Display, io};

/// Possible errors while loading the region.
#[derive(Debug)]
pub enum RegionLoadError {
    /// Source must support seeking in both directions.
    NotSeekable { io_error: io::Error },
    /// Source ended before a fixed length read was satisfied.
    ///
    /// Position is `None` when the header itself is incomplete.
    Truncated {
        position: Option<RegionChunkPosition>,
        /// Offset from source start where the read began.
        offset: u64,
        expected: u64,
        actual: u64,
    },
    /// Chunk length field is zero or runs past sectors allocated in header.
    ///
    /// Region file are corrupted.
    InvalidLength {
        position: RegionChunkPosition,
        offset: u64,
        length: u32,
    },
    /// Only zlib compressed chunks are supported.
    ///
    /// Region file are corrupted or was introduced new compression type.
    UnsupportedCompressionScheme {
        position: RegionChunkPosition,
        offset: u64,
        /// Compression scheme type id.
        compression_scheme: u8,
    },
    /// Chunk payload is not a valid compressed stream.
    DecompressError {
        position: RegionChunkPosition,
        offset: u64,
        io_error: io::Error,
    },
    /// Decompressed payload was rejected by chunk codec.
    ChunkDecodeError {
        position: RegionChunkPosition,
        offset: u64,
        error: Box<dyn Error + Send + Sync>,
    },
    /// I/O Error which happened while were reading region data.
    IOError { io_error: io::Error },
}

impl From<io::Error> for RegionLoadError {
    fn from(io_error: io::Error) -> Self {
        RegionLoadError::IOError { io_error }
    }
}

impl Error for RegionLoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        use RegionLoadError::*;
        match self {
            NotSeekable { io_error } => Some(io_error),
            DecompressError { io_error, .. } => Some(io_error),
            ChunkDecodeError { error, .. } => Some(&**error),
            IOError { io_error } => Some(io_error),
            _ => None,
        }
    }
}

impl Display for RegionLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use RegionLoadError::*;
        match self {
            NotSeekable { .. } => write!(f, "Region source is not seekable"),
            Truncated {
                position: None,
                expected,
                actual,
                ..
            } => write!(
                f,
                "Region header truncated: expected {} bytes but got {}",
                expected, actual
            ),
            Truncated {
                position: Some(position),
                offset,
                expected,
                actual,
            } => write!(
                f,
                "Chunk {} incomplete at offset {}: expected {} bytes but got {}",
                position, offset, expected, actual
            ),
            InvalidLength {
                position,
                offset,
                length,
            } => write!(
                f,
                "Chunk {} at offset {} has invalid length {}",
                position, offset, length
            ),
            UnsupportedCompressionScheme {
                position,
                offset,
                compression_scheme,
            } => write!(
                f,
                "Chunk {} at offset {} has unsupported compression scheme: {}",
                position, offset, compression_scheme
            ),
            DecompressError {
                position, offset, ..
            } => write!(
                f,
                "Chunk {} at offset {} failed to decompress",
                position, offset
            ),
            ChunkDecodeError {
                position, offset, ..
            } => write!(
                f,
                "Chunk {} at offset {} failed to decode",
                position, offset
            ),
            IOError { .. } => write!(f, "IO Error"),
        }
    }
}

/// Possible errors while saving the region.
#[derive(Debug)]
pub enum RegionSaveError {
    /// Destination must support seeking in both directions.
    NotSeekable { io_error: io::Error },
    /// Chunk doesn't fit in 255 sectors.
    LengthExceedsMaximum {
        position: RegionChunkPosition,
        /// Chunk length including length field and compression scheme.
        length: u64,
    },
    /// Chunk was rejected by chunk codec.
    ChunkEncodeError {
        position: RegionChunkPosition,
        error: Box<dyn Error + Send + Sync>,
    },
    /// I/O Error which happened while were writing region data.
    IOError { io_error: io::Error },
}

impl From<io::Error> for RegionSaveError {
    fn from(io_error: io::Error) -> Self {
        RegionSaveError::IOError { io_error }
    }
}

impl Error for RegionSaveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        use RegionSaveError::*;
        match self {
            NotSeekable { io_error } => Some(io_error),
            ChunkEncodeError { error, .. } => Some(&**error),
            IOError { io_error } => Some(io_error),
            _ => None,
        }
    }
}

impl Display for RegionSaveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use RegionSaveError::*;
        match self {
            NotSeekable { .. } => write!(f, "Region destination is not seekable"),
            LengthExceedsMaximum { position, length } => write!(
                f,
                "Chunk {} length of {} exceeds maximum (255 sectors)",
                position, length
            ),
            ChunkEncodeError { position, .. } => write!(f, "Chunk {} failed to encode", position),
            IOError { .. } => write!(f, "IO Error"),
        }
    }
}

/// Chunk at specified coordinates inside region not found.
#[derive(Debug, Eq, PartialEq)]
pub struct ChunkNotFound {
    pub position: RegionChunkPosition,
}

impl Error for ChunkNotFound {}

impl Display for ChunkNotFound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Chunk {} not found", self.position)
    }
}
