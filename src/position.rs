use crate::header::REGION_CHUNKS;
use std::fmt;

/// Amount of chunks along one side of region.
pub const REGION_CHUNKS_SIDE: u8 = 32;
/// Amount of blocks along one side of chunk.
pub const CHUNK_BLOCKS_SIDE: i64 = 16;

#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Hash, Copy, Clone)]
pub struct RegionPosition {
    pub x: i32,
    pub z: i32,
}

impl RegionPosition {
    pub fn new(x: i32, z: i32) -> RegionPosition {
        RegionPosition { x, z }
    }

    pub fn from_chunk_position(chunk_x: i32, chunk_z: i32) -> RegionPosition {
        let x = chunk_x >> 5;
        let z = chunk_z >> 5;

        RegionPosition::new(x, z)
    }

    /// Absolute block coordinates of the chunk origin at given slot of this region.
    pub fn block_origin(&self, position: RegionChunkPosition) -> BlockPosition {
        let region_blocks = REGION_CHUNKS_SIDE as i64 * CHUNK_BLOCKS_SIDE;

        BlockPosition {
            x: self.x as i64 * region_blocks + position.x() as i64 * CHUNK_BLOCKS_SIDE,
            z: self.z as i64 * region_blocks + position.z() as i64 * CHUNK_BLOCKS_SIDE,
        }
    }
}

impl fmt::Display for RegionPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r.{}.{}", self.x, self.z)
    }
}

/// Chunk slot inside a region, both coordinates in `0..32`.
///
/// Fields are private so every position is wrapped on construction.
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Hash, Copy, Clone)]
pub struct RegionChunkPosition {
    x: u8,
    z: u8,
}

impl RegionChunkPosition {
    /// Out of range coordinates wrap, so `33` becomes `1`.
    pub fn new(x: u8, z: u8) -> RegionChunkPosition {
        RegionChunkPosition {
            x: x & 31,
            z: z & 31,
        }
    }

    pub fn x(&self) -> u8 {
        self.x
    }

    pub fn z(&self) -> u8 {
        self.z
    }

    /// Wraps any absolute or region relative chunk coordinates into `0..32`.
    ///
    /// Negative values wrap as well, so `-1` becomes `31`.
    pub fn normalize<T: Into<i64>>(x: T, z: T) -> RegionChunkPosition {
        let x = (x.into() & 31) as u8;
        let z = (z.into() & 31) as u8;

        RegionChunkPosition::new(x, z)
    }

    pub fn from_index(index: usize) -> RegionChunkPosition {
        let index = index % REGION_CHUNKS;

        RegionChunkPosition::new(
            (index % REGION_CHUNKS_SIDE as usize) as u8,
            (index / REGION_CHUNKS_SIDE as usize) as u8,
        )
    }

    /// Slot index in header tables, `z` major.
    pub fn index(&self) -> usize {
        self.x as usize + self.z as usize * REGION_CHUNKS_SIDE as usize
    }
}

impl From<(i32, i32)> for RegionChunkPosition {
    fn from((x, z): (i32, i32)) -> Self {
        RegionChunkPosition::normalize(x, z)
    }
}

impl From<(i64, i64)> for RegionChunkPosition {
    fn from((x, z): (i64, i64)) -> Self {
        RegionChunkPosition::normalize(x, z)
    }
}

impl From<(u8, u8)> for RegionChunkPosition {
    fn from((x, z): (u8, u8)) -> Self {
        RegionChunkPosition::normalize(x, z)
    }
}

impl fmt::Display for RegionChunkPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Absolute position in block space, only horizontal axes.
#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone)]
pub struct BlockPosition {
    pub x: i64,
    pub z: i64,
}

#[cfg(test)]
mod tests {
    use crate::position::{BlockPosition, RegionChunkPosition, RegionPosition};

    #[test]
    fn test_normalize_wraps_negative() {
        assert_eq!(
            RegionChunkPosition::normalize(-1, -32),
            RegionChunkPosition::new(31, 0)
        );
        assert_eq!(
            RegionChunkPosition::normalize(33, 64),
            RegionChunkPosition::new(1, 0)
        );
    }

    #[test]
    fn test_normalize_idempotent() {
        for &(x, z) in &[(0i64, 0i64), (5, 31), (-7, 100), (1 << 40, -(1 << 33) - 3)] {
            let position = RegionChunkPosition::normalize(x, z);

            for &k1 in &[-3i64, 0, 1, 1000] {
                for &k2 in &[-1000i64, -1, 0, 7] {
                    let shifted = RegionChunkPosition::normalize(
                        position.x() as i64 + 32 * k1,
                        position.z() as i64 + 32 * k2,
                    );

                    assert_eq!(shifted, position);
                }
            }
        }
    }

    #[test]
    fn test_index_round_trip() {
        let position = RegionChunkPosition::new(15, 3);

        assert_eq!(position.index(), 15 + 3 * 32);
        assert_eq!(RegionChunkPosition::from_index(position.index()), position);
        assert_eq!(RegionChunkPosition::from_index(1023), RegionChunkPosition::new(31, 31));
    }

    #[test]
    fn test_new_wraps_out_of_range() {
        let position = RegionChunkPosition::new(33, 40);

        assert_eq!((position.x(), position.z()), (1, 8));
        assert_eq!(position, RegionChunkPosition::normalize(33, 40));
        assert_eq!(position.index(), 1 + 8 * 32);
        assert_eq!(RegionChunkPosition::new(255, 32), RegionChunkPosition::new(31, 0));
        assert_eq!(RegionChunkPosition::from_index(1024 + 5), RegionChunkPosition::new(5, 0));
    }

    #[test]
    fn test_region_from_chunk_position() {
        assert_eq!(RegionPosition::from_chunk_position(-1, 32), RegionPosition::new(-1, 1));
        assert_eq!(RegionPosition::from_chunk_position(31, 0), RegionPosition::new(0, 0));
    }

    #[test]
    fn test_block_origin() {
        let region = RegionPosition::new(-1, 2);
        let origin = region.block_origin(RegionChunkPosition::new(3, 31));

        assert_eq!(origin, BlockPosition { x: -512 + 48, z: 1024 + 496 });
    }
}
