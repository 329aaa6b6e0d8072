//! Lazy decoding of tile layer `<data>` payloads.
//!
//! All three on-disk encodings are exposed through one forward-only
//! iterator of `Result<GridCell>`. Malformed input is reported by the
//! `next()` call that reaches it, so callers can consume a prefix before
//! seeing the error. The iterator is fused after an error.

use crate::error::{MapError, Result};
use crate::gid::TileInstance;
use crate::map::TileData;
use base64::engine::general_purpose::STANDARD;
use base64::read::DecoderReader;
use flate2::read::{GzDecoder, ZlibDecoder};
use std::io::{self, Read};
use std::iter::FusedIterator;

/// One decoded cell: the packed tile reference and its row-major index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCell {
    /// Packed reference, possibly empty
    pub tile: TileInstance,
    /// Row-major position in the layer grid
    pub index: u32,
}

enum Source<'a> {
    Records(std::slice::Iter<'a, u32>),
    Csv { text: &'a str, pos: usize },
    Binary(Box<dyn Read + 'a>),
    Done,
}

/// Iterator over the cells of one layer payload.
pub struct TileIter<'a> {
    layer: String,
    index: u32,
    source: Source<'a>,
}

impl TileData {
    /// Starts decoding this payload. Only the encoding/compression tags are
    /// validated here; the payload itself is read on demand.
    pub fn tiles(&self, layer: &str) -> Result<TileIter<'_>> {
        let invalid = |reason: String| MapError::InvalidLayerData {
            layer: layer.to_owned(),
            reason,
        };
        let compression = self.compression.as_deref().filter(|c| !c.is_empty());

        let source = match (self.encoding.as_deref(), compression) {
            (None, Some(c)) => {
                return Err(invalid(format!("compression '{c}' without an encoding")));
            }
            (None, None) => Source::Records(self.records.iter()),
            (Some("csv"), None) => Source::Csv {
                text: &self.payload,
                pos: 0,
            },
            (Some("base64"), compression) => {
                let b64 = DecoderReader::new(self.payload.trim().as_bytes(), &STANDARD);
                let reader: Box<dyn Read + '_> = match compression {
                    None => Box::new(b64),
                    Some("gzip") => Box::new(GzDecoder::new(b64)),
                    Some("zlib") => Box::new(ZlibDecoder::new(b64)),
                    Some(other) => return Err(invalid(format!("unknown compression '{other}'"))),
                };
                Source::Binary(reader)
            }
            (Some("csv"), Some(c)) => {
                return Err(invalid(format!("compression '{c}' requires base64 encoding")));
            }
            (Some(other), _) => return Err(invalid(format!("unknown encoding '{other}'"))),
        };

        Ok(TileIter {
            layer: layer.to_owned(),
            index: 0,
            source,
        })
    }

    /// Decodes the whole payload eagerly.
    pub fn decode_all(&self, layer: &str) -> Result<Vec<TileInstance>> {
        self.tiles(layer)?
            .map(|cell| cell.map(|c| c.tile))
            .collect()
    }
}

/// Reads one little-endian `u32`. `Ok(None)` on a clean end of stream.
fn read_u32(r: &mut dyn Read) -> io::Result<Option<u32>> {
    let mut buf = [0u8; 4];
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    match filled {
        0 => Ok(None),
        4 => Ok(Some(u32::from_le_bytes(buf))),
        n => Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("truncated tile stream ({n} trailing bytes)"),
        )),
    }
}

impl TileIter<'_> {
    /// Index the next yielded cell will have
    pub fn position(&self) -> u32 {
        self.index
    }

    fn fail(&mut self, reason: String) -> Option<Result<GridCell>> {
        self.source = Source::Done;
        Some(Err(MapError::InvalidLayerData {
            layer: self.layer.clone(),
            reason,
        }))
    }

    fn emit(&mut self, raw: u32) -> Option<Result<GridCell>> {
        let cell = GridCell {
            tile: TileInstance(raw),
            index: self.index,
        };
        self.index += 1;
        Some(Ok(cell))
    }
}

impl Iterator for TileIter<'_> {
    type Item = Result<GridCell>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.source {
            Source::Done => None,
            Source::Records(it) => match it.next() {
                Some(&raw) => self.emit(raw),
                None => {
                    self.source = Source::Done;
                    None
                }
            },
            Source::Csv { text, pos } => {
                let rest = &text[*pos..];
                if rest.trim().is_empty() {
                    self.source = Source::Done;
                    return None;
                }
                let token = match rest.find(',') {
                    Some(i) => {
                        *pos += i + 1;
                        &rest[..i]
                    }
                    None => {
                        *pos = text.len();
                        rest
                    }
                };
                let token = token.trim();
                match token.parse::<u32>() {
                    Ok(raw) => self.emit(raw),
                    Err(e) => {
                        let reason = format!("invalid gid '{token}' at cell {}: {e}", self.index);
                        self.fail(reason)
                    }
                }
            }
            Source::Binary(reader) => match read_u32(reader.as_mut()) {
                Ok(Some(raw)) => self.emit(raw),
                Ok(None) => {
                    self.source = Source::Done;
                    None
                }
                Err(e) => {
                    let reason = format!("at cell {}: {e}", self.index);
                    self.fail(reason)
                }
            },
        }
    }
}

impl FusedIterator for TileIter<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use flate2::write::{GzEncoder, ZlibEncoder};
    use flate2::Compression;
    use std::io::Write;

    const GRID: [u32; 6] = [0, 5, 0x8000_0005, 12, 0, 0x2000_0001];

    fn le_bytes(gids: &[u32]) -> Vec<u8> {
        gids.iter().flat_map(|g| g.to_le_bytes()).collect()
    }

    fn cells(data: &TileData) -> Vec<GridCell> {
        data.tiles("test")
            .expect("iterator")
            .collect::<Result<Vec<_>>>()
            .expect("decode")
    }

    fn expected() -> Vec<GridCell> {
        GRID.iter()
            .enumerate()
            .map(|(i, &g)| GridCell {
                tile: TileInstance(g),
                index: i as u32,
            })
            .collect()
    }

    #[test]
    fn csv_and_base64_decode_identically() {
        let csv = TileData::csv("\n0,5,2147483653,\n12,0,536870913\n");
        let b64 = TileData::base64(
            format!("\n   {}\n  ", STANDARD.encode(le_bytes(&GRID))),
            None,
        );
        assert_eq!(cells(&csv), expected());
        assert_eq!(cells(&b64), expected());
    }

    #[test]
    fn compressed_streams_match_uncompressed() {
        let raw = le_bytes(&GRID);

        let mut gz = GzEncoder::new(Vec::new(), Compression::default());
        gz.write_all(&raw).unwrap();
        let gz = gz.finish().unwrap();

        let mut zl = ZlibEncoder::new(Vec::new(), Compression::default());
        zl.write_all(&raw).unwrap();
        let zl = zl.finish().unwrap();

        let plain = cells(&TileData::base64(STANDARD.encode(&raw), None));
        assert_eq!(cells(&TileData::base64(STANDARD.encode(gz), Some("gzip"))), plain);
        assert_eq!(cells(&TileData::base64(STANDARD.encode(zl), Some("zlib"))), plain);
    }

    #[test]
    fn structured_records_iterate_in_order() {
        let data = TileData::from_records(GRID.to_vec());
        assert_eq!(cells(&data), expected());
    }

    #[test]
    fn bad_csv_token_surfaces_on_the_iteration_that_reaches_it() {
        let data = TileData::csv("1,2,x,4");
        let mut it = data.tiles("ground").unwrap();
        assert_eq!(it.next().unwrap().unwrap().tile, TileInstance(1));
        assert_eq!(it.next().unwrap().unwrap().index, 1);
        assert_eq!(it.position(), 2);
        assert!(matches!(
            it.next(),
            Some(Err(MapError::InvalidLayerData { ref layer, .. })) if layer == "ground"
        ));
        assert!(it.next().is_none());
    }

    #[test]
    fn truncated_binary_stream_fails_after_complete_values() {
        let mut raw = le_bytes(&[7]);
        raw.extend_from_slice(&[1, 2]);
        let data = TileData::base64(STANDARD.encode(raw), None);
        let mut it = data.tiles("l").unwrap();
        assert_eq!(it.next().unwrap().unwrap().tile, TileInstance(7));
        assert!(matches!(it.next(), Some(Err(MapError::InvalidLayerData { .. }))));
        assert!(it.next().is_none());
    }

    #[test]
    fn invalid_base64_is_a_lazy_error() {
        let data = TileData::base64("!!!!", None);
        let mut it = data.tiles("l").expect("construction does not read the payload");
        assert!(matches!(it.next(), Some(Err(MapError::InvalidLayerData { .. }))));
    }

    #[test]
    fn rejects_bad_tag_combinations_eagerly() {
        let mut no_encoding = TileData::from_records(vec![1]);
        no_encoding.compression = Some("gzip".into());
        assert!(matches!(no_encoding.tiles("l"), Err(MapError::InvalidLayerData { .. })));

        let mut csv_gzip = TileData::csv("1");
        csv_gzip.compression = Some("gzip".into());
        assert!(csv_gzip.tiles("l").is_err());

        assert!(TileData::base64("AAAA", Some("zstd")).tiles("l").is_err());

        let mut xml = TileData::csv("1");
        xml.encoding = Some("xml".into());
        assert!(xml.tiles("l").is_err());
    }

    #[test]
    fn trailing_comma_and_empty_payload_end_cleanly() {
        assert_eq!(TileData::csv("3,4,").decode_all("l").unwrap().len(), 2);
        assert!(TileData::csv("  \n ").decode_all("l").unwrap().is_empty());
        assert!(TileData::base64("", None).decode_all("l").unwrap().is_empty());
    }
}
