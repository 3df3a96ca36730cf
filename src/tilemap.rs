use crate::reader::AseReader;
use crate::Result;
use std::fmt;
use std::io::Cursor;

/// The payload of a compressed-tilemap cel.
///
/// Only the static header is decoded; the tile stream is kept as the raw
/// zlib payload. Decoding individual tile references (id + flip bits per
/// tile) is left open.
#[derive(Clone, PartialEq, Eq)]
pub struct TilemapData {
    width: u16,
    height: u16,
    bits_per_tile: u16,
    tile_id_mask: u32,
    x_flip_mask: u32,
    y_flip_mask: u32,
    diagonal_flip_mask: u32,
    compressed: Vec<u8>,
}

impl TilemapData {
    /// Width in number of tiles.
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Height in number of tiles.
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Bits per tile reference. Currently always 32 in files written by
    /// Aseprite.
    pub fn bits_per_tile(&self) -> u16 {
        self.bits_per_tile
    }

    /// Bitmask selecting the tile id within a tile reference.
    pub fn tile_id_mask(&self) -> u32 {
        self.tile_id_mask
    }

    /// Bitmask of the X-flip bit.
    pub fn x_flip_mask(&self) -> u32 {
        self.x_flip_mask
    }

    /// Bitmask of the Y-flip bit.
    pub fn y_flip_mask(&self) -> u32 {
        self.y_flip_mask
    }

    /// Bitmask of the diagonal-flip bit.
    pub fn diagonal_flip_mask(&self) -> u32 {
        self.diagonal_flip_mask
    }

    /// The undecoded zlib stream of tile references.
    pub fn compressed_tiles(&self) -> &[u8] {
        &self.compressed
    }

    pub(crate) fn parse(
        mut reader: AseReader<Cursor<&[u8]>>,
        width: u16,
        height: u16,
    ) -> Result<Self> {
        let bits_per_tile = reader.word()?;
        let tile_id_mask = reader.dword()?;
        let x_flip_mask = reader.dword()?;
        let y_flip_mask = reader.dword()?;
        let diagonal_flip_mask = reader.dword()?;
        reader.skip_reserved(10)?;
        let compressed = reader.rest()?;
        Ok(TilemapData {
            width,
            height,
            bits_per_tile,
            tile_id_mask,
            x_flip_mask,
            y_flip_mask,
            diagonal_flip_mask,
            compressed,
        })
    }
}

impl fmt::Debug for TilemapData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TilemapData({}x{} tiles, <{} compressed bytes>)",
            self.width,
            self.height,
            self.compressed.len()
        )
    }
}
