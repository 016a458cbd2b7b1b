//! Region file storage for chunks.
//!
//! A region file holds up to 1024 chunks of a 32x32 area. Its first two
//! 4KB sectors are the header: chunk offsets and last modified timestamps.
//! Every chunk follows on a sector boundary as a length prefixed, zlib
//! compressed payload.
//!
//! [`RegionStore`] keeps all chunks of one region in memory, loads them from
//! any seekable source and rewrites the whole layout on save.

pub mod codec;
pub mod compression;
pub mod error;
pub mod header;
pub mod position;
pub mod provider;
pub mod region;

pub use crate::codec::{ChunkCodec, NbtCodec, NoTileEntities, RawCodec, TileEntityHooks};
pub use crate::compression::CompressionScheme;
pub use crate::error::{ChunkNotFound, RegionLoadError, RegionSaveError};
pub use crate::position::{BlockPosition, RegionChunkPosition, RegionPosition};
pub use crate::provider::FolderRegionProvider;
pub use crate::region::RegionStore;
