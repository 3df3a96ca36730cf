use crate::external_file::ExternalFileId;
use crate::pixel::{PixelFormat, Pixels};
use crate::reader::AseReader;
use crate::Result;
use bitflags::bitflags;
use std::{collections::HashMap, ops::Index};

/// Id of a tileset within the document.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct TilesetId(u32);

impl TilesetId {
    pub(crate) fn new(value: u32) -> Self {
        Self(value)
    }

    /// The raw id value.
    pub fn value(&self) -> u32 {
        self.0
    }
}

bitflags! {
    struct TilesetFlags: u32 {
        /// Includes a link to an external file.
        const LINKS_EXTERNAL_FILE = 0x0001;
        /// Tile pixels are stored inside this chunk.
        const FILE_INCLUDES_TILES = 0x0002;
        /// Tilemaps using this tileset use tile id 0 as the empty tile.
        /// In rare cases this bit is off and the empty tile is
        /// 0xffffffff (internal versions of Aseprite).
        const EMPTY_TILE_IS_ID_ZERO = 0x0004;
        /// Try to match X-flipped versions of tiles automatically.
        const AUTO_FLIP_X = 0x0008;
        /// Try to match Y-flipped versions of tiles automatically.
        const AUTO_FLIP_Y = 0x0010;
        /// Try to match diagonally-flipped versions of tiles automatically.
        const AUTO_FLIP_DIAGONAL = 0x0020;
    }
}

/// Link from a tileset to a tileset stored in an external file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExternalTilesetRef {
    external_file_id: ExternalFileId,
    tileset_id: TilesetId,
}

impl ExternalTilesetRef {
    /// Id of the entry in the external files chunk.
    pub fn external_file_id(&self) -> ExternalFileId {
        self.external_file_id
    }

    /// Id of the tileset inside the external file.
    pub fn tileset_id(&self) -> TilesetId {
        self.tileset_id
    }
}

/// A set of fixed-size tiles referenced by tilemap layers.
#[derive(Debug, PartialEq)]
pub struct Tileset {
    id: TilesetId,
    flags: TilesetFlags,
    tile_count: u32,
    tile_width: u16,
    tile_height: u16,
    base_index: i16,
    name: String,
    external: Option<ExternalTilesetRef>,
    tiles: Option<Pixels>,
}

impl Tileset {
    /// Tileset id.
    pub fn id(&self) -> TilesetId {
        self.id
    }

    /// When true, tilemaps using this tileset use tile id 0 as the empty
    /// tile; otherwise the empty tile is 0xffffffff.
    pub fn empty_tile_is_id_zero(&self) -> bool {
        self.flags.contains(TilesetFlags::EMPTY_TILE_IS_ID_ZERO)
    }

    /// Which flip transforms Aseprite matches automatically, as
    /// (x, y, diagonal).
    pub fn auto_flips(&self) -> (bool, bool, bool) {
        (
            self.flags.contains(TilesetFlags::AUTO_FLIP_X),
            self.flags.contains(TilesetFlags::AUTO_FLIP_Y),
            self.flags.contains(TilesetFlags::AUTO_FLIP_DIAGONAL),
        )
    }

    /// Number of tiles.
    pub fn tile_count(&self) -> u32 {
        self.tile_count
    }

    /// Width and height of one tile in pixels.
    pub fn tile_size(&self) -> (u16, u16) {
        (self.tile_width, self.tile_height)
    }

    /// Number shown in the UI for the tile with index 0. Presentation
    /// only.
    pub fn base_index(&self) -> i16 {
        self.base_index
    }

    /// Tileset name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Link to an external file, when the tiles live elsewhere.
    pub fn external_file(&self) -> Option<&ExternalTilesetRef> {
        self.external.as_ref()
    }

    /// Whether tile pixels are stored inline in this document.
    pub fn has_inline_tiles(&self) -> bool {
        self.tiles.is_some()
    }

    /// Parse a tileset chunk (0x2023).
    pub(crate) fn parse_chunk(data: &[u8], pixel_format: PixelFormat) -> Result<Tileset> {
        let mut reader = AseReader::new(data);
        let id = TilesetId::new(reader.dword()?);
        let flags = TilesetFlags::from_bits_truncate(reader.dword()?);
        let tile_count = reader.dword()?;
        let tile_width = reader.word()?;
        let tile_height = reader.word()?;
        let base_index = reader.short()?;
        reader.skip_reserved(14)?;
        let name = reader.string()?;

        let external = if flags.contains(TilesetFlags::LINKS_EXTERNAL_FILE) {
            let external_file_id = ExternalFileId::new(reader.dword()?);
            let tileset_id = TilesetId::new(reader.dword()?);
            Some(ExternalTilesetRef {
                external_file_id,
                tileset_id,
            })
        } else {
            None
        };

        let tiles = if flags.contains(TilesetFlags::FILE_INCLUDES_TILES) {
            let compressed_size = reader.dword()?;
            let compressed = reader.take_bytes(compressed_size as usize)?;
            let pixel_count =
                tile_count as usize * tile_width as usize * tile_height as usize;
            Some(Pixels::from_compressed(
                AseReader::new(&compressed),
                pixel_format,
                pixel_count,
            )?)
        } else {
            None
        };

        Ok(Tileset {
            id,
            flags,
            tile_count,
            tile_width,
            tile_height,
            base_index,
            name,
            external,
            tiles,
        })
    }
}

/// All tilesets of a document, indexed by id.
#[derive(Debug, PartialEq)]
pub struct TilesetsById(HashMap<TilesetId, Tileset>);

impl TilesetsById {
    pub(crate) fn new() -> Self {
        Self(HashMap::new())
    }

    pub(crate) fn add(&mut self, tileset: Tileset) {
        self.0.insert(tileset.id(), tileset);
    }

    /// Number of tilesets.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the document has no tilesets.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Look up a tileset by id.
    pub fn get(&self, id: TilesetId) -> Option<&Tileset> {
        self.0.get(&id)
    }

    /// The underlying map.
    pub fn map(&self) -> &HashMap<TilesetId, Tileset> {
        &self.0
    }
}

impl Index<TilesetId> for TilesetsById {
    type Output = Tileset;

    fn index(&self, id: TilesetId) -> &Self::Output {
        self.get(id).expect("no tileset found for id")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn tileset_body(flags: u32, tile_count: u32, name: &str) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&5_u32.to_le_bytes()); // id
        body.extend_from_slice(&flags.to_le_bytes());
        body.extend_from_slice(&tile_count.to_le_bytes());
        body.extend_from_slice(&2_u16.to_le_bytes()); // tile width
        body.extend_from_slice(&2_u16.to_le_bytes()); // tile height
        body.extend_from_slice(&1_i16.to_le_bytes()); // base index
        body.extend_from_slice(&[0; 14]);
        body.extend_from_slice(&(name.len() as u16).to_le_bytes());
        body.extend_from_slice(name.as_bytes());
        body
    }

    #[test]
    fn external_reference() {
        let mut body = tileset_body(0x0001 | 0x0004, 8, "terrain");
        body.extend_from_slice(&3_u32.to_le_bytes());
        body.extend_from_slice(&11_u32.to_le_bytes());
        let tileset = Tileset::parse_chunk(&body, PixelFormat::Rgba).unwrap();
        assert_eq!(tileset.name(), "terrain");
        assert!(tileset.empty_tile_is_id_zero());
        let external = tileset.external_file().unwrap();
        assert_eq!(external.external_file_id().value(), 3);
        assert_eq!(external.tileset_id().value(), 11);
        assert!(!tileset.has_inline_tiles());
    }

    #[test]
    fn inline_tiles_decompress() {
        // One 2x2 indexed tile.
        let raw = [1_u8, 2, 3, 4];
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&raw).unwrap();
        let compressed = encoder.finish().unwrap();

        let mut body = tileset_body(0x0002, 1, "t");
        body.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
        body.extend_from_slice(&compressed);
        let tileset = Tileset::parse_chunk(
            &body,
            PixelFormat::Indexed {
                transparent_index: 0,
            },
        )
        .unwrap();
        assert!(tileset.has_inline_tiles());
        assert_eq!(tileset.tiles.as_ref().unwrap().len(), 4);
    }
}
