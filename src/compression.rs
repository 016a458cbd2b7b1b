use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io;
use std::io::{Read, Write};

/// Compression scheme used for chunk.
///
/// Id 1 is reserved for gzip by the format but is not accepted here.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CompressionScheme {
    /// In practice, you will only ever encounter chunks compressed using zlib.
    Zlib = 2,
}

impl CompressionScheme {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            2 => Some(CompressionScheme::Zlib),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn compress(self, raw: &[u8], level: Compression) -> Result<Vec<u8>, io::Error> {
        match self {
            CompressionScheme::Zlib => {
                let mut encoder = ZlibEncoder::new(Vec::new(), level);
                encoder.write_all(raw)?;
                encoder.finish()
            }
        }
    }

    pub fn decompress(self, compressed: &[u8]) -> Result<Vec<u8>, io::Error> {
        match self {
            CompressionScheme::Zlib => {
                let mut decoder = ZlibDecoder::new(compressed);
                let mut raw = Vec::new();
                decoder.read_to_end(&mut raw)?;

                Ok(raw)
            }
        }
    }
}

impl Default for CompressionScheme {
    fn default() -> Self {
        CompressionScheme::Zlib
    }
}

#[cfg(test)]
mod tests {
    use crate::compression::CompressionScheme;
    use flate2::Compression;

    #[test]
    fn test_scheme_ids() {
        assert_eq!(CompressionScheme::from_id(2), Some(CompressionScheme::Zlib));
        assert_eq!(CompressionScheme::Zlib.id(), 2);
        assert_eq!(CompressionScheme::from_id(1), None);
        assert_eq!(CompressionScheme::from_id(0), None);
        assert_eq!(CompressionScheme::from_id(3), None);
    }

    #[test]
    fn test_zlib_restores_payload() {
        let raw: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let compressed = CompressionScheme::Zlib
            .compress(&raw, Compression::best())
            .unwrap();

        assert!(compressed.len() < raw.len());
        // zlib stream header, deflate with 32K window.
        assert_eq!(compressed[0], 0x78);

        let decompressed = CompressionScheme::Zlib.decompress(&compressed).unwrap();
        assert_eq!(decompressed, raw);
    }

    #[test]
    fn test_zlib_rejects_garbage() {
        assert!(CompressionScheme::Zlib.decompress(b"not zlib at all").is_err());
    }
}
