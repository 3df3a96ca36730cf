use crate::cel::{self, CelContent, CelData, CelExtra};
use crate::color_profile::{self, ColorProfile};
use crate::document::{Document, FrameData, Grid};
use crate::external_file::{self, ExternalFiles};
use crate::layer::{self, LayerData};
use crate::palette::{self, Palette};
use crate::pixel::{PixelFormat, Pixels};
use crate::reader::{AseReader, Staging};
use crate::slice::{self, SliceData};
use crate::tags::{self, TagData};
use crate::tileset::{Tileset, TilesetsById};
use crate::user_data::{self, UserData};
use crate::{ParseError, Result};
use log::{debug, warn};
use std::io::Read;

// file format docs: https://github.com/aseprite/aseprite/blob/master/docs/ase-file-specs.md
// v1.3 spec diff doc: https://gist.github.com/dacap/35f3b54fbcd021d099e0166a4f295bab

const DOCUMENT_MAGIC: u16 = 0xA5E0;
const FRAME_MAGIC: u16 = 0xF1FA;
const FRAME_HEADER_SIZE: i64 = 16;
const CHUNK_HEADER_SIZE: usize = 6;
/// Old writers pad a frame with a few bytes past its last chunk.
const FRAME_SLACK_BYTES: i64 = 16;

/// Parse an Aseprite document from any byte source.
///
/// The source is consumed strictly sequentially; no seeking is needed.
/// On any error the parse is aborted and no partial document is
/// returned.
pub fn parse<R: Read>(input: R) -> Result<Document> {
    let mut reader = AseReader::with(Staging::new(input));

    let _file_size = reader.dword()?;
    let magic = reader.word()?;
    if magic != DOCUMENT_MAGIC {
        return Err(ParseError::BadMagic {
            context: "document header",
            expected: DOCUMENT_MAGIC,
            found: magic,
        });
    }
    let num_frames = reader.word()?;
    let width = reader.word()?;
    let height = reader.word()?;
    let color_depth = reader.word()?;
    let flags = reader.dword()?;
    let _deprecated_frame_speed = reader.word()?;
    reader.skip_reserved(8)?;
    let transparent_index = reader.byte()?;
    reader.skip_reserved(3)?;
    let _num_colors = reader.word()?;
    let pixel_width = reader.byte()?;
    let pixel_height = reader.byte()?;
    let grid_x = reader.short()?;
    let grid_y = reader.short()?;
    let grid_width = reader.word()?;
    let grid_height = reader.word()?;
    reader.skip_reserved(84)?;

    let pixel_format = parse_pixel_format(color_depth, transparent_index)?;

    let mut assembler = Assembler::new(pixel_format);
    for frame_index in 0..num_frames {
        parse_frame(&mut reader, frame_index, &mut assembler)?;
        reader.recycle();
    }

    assembler.validate()?;

    let groups = layer::build_groups(&assembler.layers);
    Ok(Document {
        width,
        height,
        num_frames,
        pixel_format,
        flags,
        pixel_aspect: (pixel_width, pixel_height),
        grid: Grid {
            x: grid_x,
            y: grid_y,
            width: grid_width,
            height: grid_height,
        },
        palette: assembler.palette,
        color_profile: assembler.color_profile,
        external_files: assembler.external_files,
        layers: assembler.layers,
        groups,
        frames: assembler.frames,
        tags: assembler.tags,
        slices: assembler.slices,
        tilesets: assembler.tilesets,
    })
}

fn parse_pixel_format(color_depth: u16, transparent_index: u8) -> Result<PixelFormat> {
    match color_depth {
        8 => Ok(PixelFormat::Indexed { transparent_index }),
        16 => Ok(PixelFormat::Grayscale),
        32 => Ok(PixelFormat::Rgba),
        _ => Err(ParseError::UnsupportedColorDepth(color_depth)),
    }
}

fn parse_frame<R: Read>(
    reader: &mut AseReader<Staging<R>>,
    frame_index: u16,
    assembler: &mut Assembler,
) -> Result<()> {
    let declared_size = reader.dword()?;
    let magic = reader.word()?;
    if magic != FRAME_MAGIC {
        return Err(ParseError::BadMagic {
            context: "frame header",
            expected: FRAME_MAGIC,
            found: magic,
        });
    }
    let old_num_chunks = reader.word()?;
    let duration_ms = reader.word()?;
    reader.skip_reserved(2)?;
    let new_num_chunks = reader.dword()?;

    // The u32 count wins whenever it is nonzero; the old u16 count only
    // matters for files from before the u32 field existed.
    let num_chunks = if new_num_chunks == 0 {
        old_num_chunks as u32
    } else {
        new_num_chunks
    };

    assembler.frames.push(FrameData {
        duration_ms,
        cels: Vec::new(),
    });

    let mut anchor = Anchor::None;
    let mut bytes_available = declared_size as i64 - FRAME_HEADER_SIZE;
    for _ in 0..num_chunks {
        let chunk_size = reader.dword()?;
        let chunk_type_code = reader.word()?;
        check_chunk_bytes(chunk_size, bytes_available)?;
        let mut chunk_data = vec![0_u8; chunk_size as usize - CHUNK_HEADER_SIZE];
        reader.read_exact(&mut chunk_data)?;
        bytes_available -= chunk_size as i64;
        let chunk = parse_chunk(chunk_type_code, &chunk_data, assembler.pixel_format)?;
        anchor = assembler.apply(frame_index, chunk, anchor)?;
    }

    // Historical writers leave a little slack between the last chunk and
    // the declared frame size.
    if bytes_available > FRAME_SLACK_BYTES {
        return Err(ParseError::InvariantViolation(format!(
            "Frame {} declares {} bytes beyond its chunks",
            frame_index, bytes_available
        )));
    }
    if bytes_available > 0 {
        reader.skip_reserved(bytes_available as usize)?;
    }

    Ok(())
}

fn check_chunk_bytes(chunk_size: u32, bytes_available: i64) -> Result<()> {
    if (chunk_size as usize) < CHUNK_HEADER_SIZE {
        return Err(ParseError::InvariantViolation(format!(
            "Chunk size is too small: {}, minimum size: {}",
            chunk_size, CHUNK_HEADER_SIZE
        )));
    }
    if chunk_size as i64 > bytes_available {
        return Err(ParseError::InvariantViolation(format!(
            "Trying to read chunk of size {}, but there are only {} bytes available in the frame",
            chunk_size, bytes_available
        )));
    }
    Ok(())
}

/// A parsed chunk. Interpretation of some chunk bodies depends on state
/// from earlier chunks (the pixel format); ownership of trailing chunks
/// depends on chunk order, which [`Assembler::apply`] resolves.
enum Chunk {
    Palette(Palette),
    Layer(LayerData),
    Cel(CelData),
    CelExtra(CelExtra),
    ColorProfile(ColorProfile),
    ExternalFiles(ExternalFiles),
    Tags(Vec<TagData>),
    UserData(UserData),
    Slice(SliceData),
    Tileset(Tileset),
    /// Mask (0x2016) or path (0x2017); consumed and dropped.
    Deprecated,
}

fn parse_chunk(chunk_type: u16, data: &[u8], pixel_format: PixelFormat) -> Result<Chunk> {
    match chunk_type {
        0x0004 => palette::parse_old_palette_chunk(data, false).map(Chunk::Palette),
        0x0011 => palette::parse_old_palette_chunk(data, true).map(Chunk::Palette),
        0x2004 => layer::parse_layer_chunk(data).map(Chunk::Layer),
        0x2005 => cel::parse_cel_chunk(data, pixel_format).map(Chunk::Cel),
        0x2006 => cel::parse_cel_extra_chunk(data).map(Chunk::CelExtra),
        0x2007 => color_profile::parse_color_profile_chunk(data).map(Chunk::ColorProfile),
        0x2008 => external_file::parse_external_files_chunk(data).map(Chunk::ExternalFiles),
        0x2016 | 0x2017 => {
            debug!("Skipping deprecated chunk type: {:#06x}", chunk_type);
            Ok(Chunk::Deprecated)
        }
        0x2018 => tags::parse_tags_chunk(data).map(Chunk::Tags),
        0x2019 => palette::parse_palette_chunk(data).map(Chunk::Palette),
        0x2020 => user_data::parse_user_data_chunk(data).map(Chunk::UserData),
        0x2022 => slice::parse_slice_chunk(data).map(Chunk::Slice),
        0x2023 => Tileset::parse_chunk(data, pixel_format).map(Chunk::Tileset),
        _ => Err(ParseError::InvalidChunkType(chunk_type)),
    }
}

/// What the previous chunk was, for deciding who owns a trailing
/// user-data or cel-extra chunk. User-data chunks have no back pointer;
/// ownership is implied entirely by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anchor {
    None,
    Cel,
    CelExtra,
    Layer,
    Tag,
    Palette,
    ColorProfile,
    ExternalFiles,
    Slice,
    Tileset,
    UserData,
    Deprecated,
}

struct Assembler {
    pixel_format: PixelFormat,
    palette: Option<Palette>,
    color_profile: Option<ColorProfile>,
    external_files: ExternalFiles,
    layers: Vec<LayerData>,
    frames: Vec<FrameData>,
    tags: Vec<TagData>,
    slices: Vec<SliceData>,
    tilesets: TilesetsById,
}

impl Assembler {
    fn new(pixel_format: PixelFormat) -> Self {
        Assembler {
            pixel_format,
            palette: None,
            color_profile: None,
            external_files: ExternalFiles::default(),
            layers: Vec::new(),
            frames: Vec::new(),
            tags: Vec::new(),
            slices: Vec::new(),
            tilesets: TilesetsById::new(),
        }
    }

    /// Apply one chunk's side effect and return the next anchor state.
    ///
    /// Document-global chunks are legal in the first frame; when they show
    /// up later they are still associated to the document.
    fn apply(&mut self, frame_index: u16, chunk: Chunk, last_anchor: Anchor) -> Result<Anchor> {
        let next = match chunk {
            Chunk::Cel(cel) => {
                self.current_frame().cels.push(cel);
                Anchor::Cel
            }
            Chunk::CelExtra(extra) => {
                if last_anchor != Anchor::Cel {
                    return Err(ParseError::BadAssociation(format!(
                        "Cel-extra chunk in frame {} without a preceding cel",
                        frame_index
                    )));
                }
                // last_anchor == Cel implies the current frame has a cel.
                let cel = self
                    .current_frame()
                    .cels
                    .last_mut()
                    .expect("anchor is Cel but frame has no cels");
                cel.extra = Some(extra);
                Anchor::CelExtra
            }
            Chunk::Layer(layer) => {
                if frame_index != 0 {
                    debug!("Layer chunk outside of frame 0");
                }
                self.layers.push(layer);
                Anchor::Layer
            }
            Chunk::Tags(entries) => {
                self.tags.extend(entries);
                Anchor::Tag
            }
            Chunk::Palette(palette) => {
                self.palette = Some(palette);
                Anchor::Palette
            }
            Chunk::ColorProfile(profile) => {
                self.color_profile = Some(profile);
                Anchor::ColorProfile
            }
            Chunk::ExternalFiles(files) => {
                self.external_files = files;
                Anchor::ExternalFiles
            }
            Chunk::Slice(slice) => {
                self.slices.push(slice);
                Anchor::Slice
            }
            Chunk::Tileset(tileset) => {
                self.tilesets.add(tileset);
                Anchor::Tileset
            }
            Chunk::UserData(user_data) => self.attach_user_data(user_data, last_anchor),
            Chunk::Deprecated => Anchor::Deprecated,
        };
        Ok(next)
    }

    fn current_frame(&mut self) -> &mut FrameData {
        self.frames.last_mut().expect("no frame is being parsed")
    }

    fn attach_user_data(&mut self, user_data: UserData, last_anchor: Anchor) -> Anchor {
        match last_anchor {
            Anchor::Cel | Anchor::CelExtra => {
                let cel = self
                    .current_frame()
                    .cels
                    .last_mut()
                    .expect("anchor is Cel but frame has no cels");
                cel.user_data = Some(user_data);
            }
            Anchor::Layer => {
                let layer = self.layers.last_mut().expect("anchor is Layer");
                layer.user_data = Some(user_data);
            }
            Anchor::Tag => {
                // The tags chunk emits all entries at once, followed by one
                // user-data chunk per tag in the same order; each claims
                // the first tag still missing one.
                match self.tags.iter_mut().find(|tag| tag.user_data.is_none()) {
                    Some(tag) => tag.user_data = Some(user_data),
                    None => warn!("User data chunk with no unclaimed tag left"),
                }
                // Stay on Tag so the next user-data chunk claims the next
                // unclaimed tag.
                return Anchor::Tag;
            }
            Anchor::Palette => {
                let palette = self.palette.as_mut().expect("anchor is Palette");
                palette.user_data = Some(user_data);
            }
            Anchor::ColorProfile => {
                let profile = self.color_profile.as_mut().expect("anchor is ColorProfile");
                profile.user_data = Some(user_data);
            }
            Anchor::Slice => {
                let slice = self.slices.last_mut().expect("anchor is Slice");
                slice.user_data = Some(user_data);
            }
            _ => {
                debug!("Ignoring user data chunk with no owner");
            }
        }
        Anchor::UserData
    }

    /// Check the cross-entity invariants that only hold once every frame
    /// has been parsed. Keeping composition infallible depends on these.
    fn validate(&self) -> Result<()> {
        for tag in &self.tags {
            if tag.from_frame > tag.to_frame || (tag.to_frame as usize) >= self.frames.len() {
                return Err(ParseError::InvariantViolation(format!(
                    "Tag '{}' has frame range {}-{} outside of {} frames",
                    tag.name,
                    tag.from_frame,
                    tag.to_frame,
                    self.frames.len()
                )));
            }
        }

        for (frame_index, frame) in self.frames.iter().enumerate() {
            for cel in &frame.cels {
                if (cel.layer_index as usize) >= self.layers.len() {
                    return Err(ParseError::InvariantViolation(format!(
                        "Cel in frame {} references layer {}, but there are only {} layers",
                        frame_index,
                        cel.layer_index,
                        self.layers.len()
                    )));
                }
                match &cel.content {
                    CelContent::Linked(source_frame) => {
                        self.validate_link(frame_index, cel, *source_frame)?
                    }
                    CelContent::Image(content) => {
                        if let Pixels::Indexed(pixels) = &content.pixels {
                            self.validate_indexed(frame_index, pixels)?;
                        }
                    }
                    CelContent::Tilemap(_) => {}
                }
            }
        }

        Ok(())
    }

    fn validate_link(&self, frame_index: usize, cel: &CelData, source_frame: u16) -> Result<()> {
        if source_frame as usize >= frame_index {
            return Err(ParseError::BadLink(format!(
                "Cel (frame {}, layer {}) links to frame {}, which is not earlier",
                frame_index, cel.layer_index, source_frame
            )));
        }
        let source = self.frames[source_frame as usize]
            .cels
            .iter()
            .find(|c| c.layer_index == cel.layer_index);
        match source {
            Some(source_cel) => {
                if let CelContent::Linked(_) = source_cel.content {
                    return Err(ParseError::BadLink(format!(
                        "Cel (frame {}, layer {}) links to another linked cel",
                        frame_index, cel.layer_index
                    )));
                }
            }
            None => {
                return Err(ParseError::BadLink(format!(
                    "Cel (frame {}, layer {}) links to frame {}, which has no cel on that layer",
                    frame_index, cel.layer_index, source_frame
                )));
            }
        }
        Ok(())
    }

    fn validate_indexed(&self, frame_index: usize, pixels: &[crate::pixel::Indexed]) -> Result<()> {
        let transparent_index = match self.pixel_format {
            PixelFormat::Indexed { transparent_index } => transparent_index,
            _ => {
                return Err(ParseError::InvariantViolation(
                    "Indexed pixel data in a non-indexed document".to_string(),
                ))
            }
        };
        let palette = self.palette.as_ref().ok_or_else(|| {
            ParseError::InvariantViolation(
                "Document uses indexed color mode but contains no palette".to_string(),
            )
        })?;
        for pixel in pixels {
            let index = pixel.value();
            if index != transparent_index && palette.color(index as u32).is_none() {
                return Err(ParseError::InvariantViolation(format!(
                    "Palette index out of range in frame {}: {} (max: {})",
                    frame_index,
                    index,
                    palette.num_colors()
                )));
            }
        }
        Ok(())
    }
}
