use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use crate::blend;
use crate::cel::{Cel, CelContent, CelData, ImageContent};
use crate::color_profile::ColorProfile;
use crate::external_file::ExternalFiles;
use crate::layer::{GroupData, Layer, LayerData, LayerGroup};
use crate::palette::Palette;
use crate::parse;
use crate::pixel::{PixelFormat, Pixels};
use crate::slice::{Slice, SliceData};
use crate::tags::{Tag, TagData};
use crate::tileset::TilesetsById;
use crate::Result;
use image::{Rgba, RgbaImage};

/// A parsed Aseprite document.
///
/// Everything is immutable once parsing finishes; images are composed on
/// demand from the decoded cels.
#[derive(Debug, PartialEq)]
pub struct Document {
    pub(crate) width: u16,
    pub(crate) height: u16,
    pub(crate) num_frames: u16,
    pub(crate) pixel_format: PixelFormat,
    pub(crate) flags: u32,
    pub(crate) pixel_aspect: (u8, u8),
    pub(crate) grid: Grid,
    pub(crate) palette: Option<Palette>,
    pub(crate) color_profile: Option<ColorProfile>,
    pub(crate) external_files: ExternalFiles,
    pub(crate) layers: Vec<LayerData>,
    pub(crate) groups: Vec<GroupData>,
    pub(crate) frames: Vec<FrameData>,
    pub(crate) tags: Vec<TagData>,
    pub(crate) slices: Vec<SliceData>,
    pub(crate) tilesets: TilesetsById,
}

#[derive(Debug, PartialEq)]
pub(crate) struct FrameData {
    pub(crate) duration_ms: u16,
    /// Cels in file order; composition sorts by layer index.
    pub(crate) cels: Vec<CelData>,
}

/// The grid settings of the document, as shown in the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct Grid {
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
}

impl Document {
    /// Load an Aseprite file. Reads the full file into the document.
    pub fn read_file(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        parse::parse(reader)
    }

    /// Load an Aseprite document from any input that implements
    /// `std::io::Read`, e.g. an in-memory buffer.
    pub fn read<R: Read>(input: R) -> Result<Self> {
        parse::parse(input)
    }

    /// Canvas width in pixels.
    pub fn width(&self) -> usize {
        self.width as usize
    }

    /// Canvas height in pixels.
    pub fn height(&self) -> usize {
        self.height as usize
    }

    /// Canvas width and height in pixels.
    pub fn size(&self) -> (usize, usize) {
        (self.width(), self.height())
    }

    /// Number of animation frames.
    pub fn num_frames(&self) -> u32 {
        self.num_frames as u32
    }

    /// Number of layers, including groups.
    pub fn num_layers(&self) -> u32 {
        self.layers.len() as u32
    }

    /// The pixel format of the source file. Composed images are always
    /// RGBA.
    pub fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    /// The header flag bitmap (bit 0: layer opacity is valid).
    pub fn header_flags(&self) -> u32 {
        self.flags
    }

    /// Pixel aspect ratio as (width, height). (1, 1) — or the legacy
    /// (0, 0) — means square pixels.
    pub fn pixel_aspect(&self) -> (u8, u8) {
        self.pixel_aspect
    }

    /// The editor grid settings.
    pub fn grid(&self) -> Grid {
        self.grid
    }

    /// The color palette, if the document carries one.
    ///
    /// For indexed-color documents this includes every color used by
    /// individual cels.
    pub fn palette(&self) -> Option<&Palette> {
        self.palette.as_ref()
    }

    /// The color profile, if the document declares one.
    pub fn color_profile(&self) -> Option<&ColorProfile> {
        self.color_profile.as_ref()
    }

    /// External files referenced by the document. Empty if the file
    /// carries no external files chunk.
    pub fn external_files(&self) -> &ExternalFiles {
        &self.external_files
    }

    /// The document's tilesets.
    pub fn tilesets(&self) -> &TilesetsById {
        &self.tilesets
    }

    /// A reference to a single frame.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not less than `num_frames`.
    pub fn frame(&self, index: u32) -> Frame {
        assert!(index < self.num_frames());
        Frame {
            document: self,
            index,
        }
    }

    /// An iterator over all frames.
    pub fn frames(&self) -> impl Iterator<Item = Frame> + '_ {
        (0..self.num_frames()).map(move |index| Frame {
            document: self,
            index,
        })
    }

    /// Access a layer by id.
    ///
    /// # Panics
    ///
    /// Panics if the id is not less than the number of layers.
    pub fn layer(&self, id: u32) -> Layer {
        assert!(id < self.num_layers());
        Layer {
            document: self,
            layer_id: id,
        }
    }

    /// Access a layer by name. If multiple layers share the name, the one
    /// with the lowest id wins.
    pub fn layer_by_name(&self, name: &str) -> Option<Layer> {
        (0..self.num_layers())
            .map(|id| self.layer(id))
            .find(|layer| layer.name() == name)
    }

    /// An iterator over all layers, back to front.
    pub fn layers(&self) -> impl Iterator<Item = Layer> + '_ {
        (0..self.num_layers()).map(move |id| self.layer(id))
    }

    /// The layer groups, in declared order.
    pub fn groups(&self) -> impl Iterator<Item = LayerGroup> + '_ {
        (0..self.groups.len()).map(move |group_id| LayerGroup {
            document: self,
            group_id,
        })
    }

    /// Total number of tags.
    pub fn num_tags(&self) -> u32 {
        self.tags.len() as u32
    }

    /// Access a tag by id.
    ///
    /// # Panics
    ///
    /// Panics if `tag_id` is not less than `num_tags`.
    pub fn tag(&self, tag_id: u32) -> Tag {
        assert!(tag_id < self.num_tags());
        Tag {
            document: self,
            tag_id,
        }
    }

    /// An iterator over all tags, in file order.
    pub fn tags(&self) -> impl Iterator<Item = Tag> + '_ {
        (0..self.num_tags()).map(move |tag_id| self.tag(tag_id))
    }

    /// Look up a tag by name. If multiple tags share the name, the one
    /// with the lowest id wins.
    pub fn tag_by_name(&self, name: &str) -> Option<Tag> {
        self.tags().find(|tag| tag.name() == name)
    }

    /// The document's slices, in file order.
    pub fn slices(&self) -> impl Iterator<Item = Slice> + '_ {
        (0..self.slices.len() as u32).map(move |slice_id| Slice {
            document: self,
            slice_id,
        })
    }

    /// All frames concatenated horizontally into one image, in frame
    /// order: width is `num_frames * width()`, height is `height()`.
    pub fn sprite_sheet(&self) -> RgbaImage {
        let total_width = self.num_frames() * self.width as u32;
        let mut sheet = RgbaImage::new(total_width, self.height as u32);
        for frame in 0..self.num_frames() {
            let image = self.frame_image(frame as usize);
            let x_offset = frame * self.width as u32;
            for (x, y, pixel) in image.enumerate_pixels() {
                sheet.put_pixel(x + x_offset, y, *pixel);
            }
        }
        sheet
    }

    fn blank_canvas(&self) -> RgbaImage {
        RgbaImage::new(self.width as u32, self.height as u32)
    }

    /// Compose one frame: all its cels, bottom layer first, source-over.
    pub(crate) fn frame_image(&self, frame: usize) -> RgbaImage {
        let mut image = self.blank_canvas();
        let mut cels: Vec<&CelData> = self.frames[frame].cels.iter().collect();
        // Stable, so cels on the same layer keep file order.
        cels.sort_by_key(|cel| cel.layer_index);
        for cel in cels {
            self.write_cel(&mut image, cel);
        }
        image
    }

    /// Compose one layer's contribution to one frame.
    pub(crate) fn layer_image(&self, frame: usize, layer_id: usize) -> RgbaImage {
        let mut image = self.blank_canvas();
        for cel in &self.frames[frame].cels {
            if cel.layer_index as usize == layer_id {
                self.write_cel(&mut image, cel);
            }
        }
        image
    }

    /// Compose a single cel onto a blank canvas.
    pub(crate) fn cel_image(&self, frame: usize, cel_index: usize) -> RgbaImage {
        let mut image = self.blank_canvas();
        self.write_cel(&mut image, &self.frames[frame].cels[cel_index]);
        image
    }

    fn write_cel(&self, image: &mut RgbaImage, cel: &CelData) {
        match &cel.content {
            CelContent::Image(content) => {
                self.write_image_content(image, cel, content);
            }
            CelContent::Linked(source_frame) => {
                // Validation guarantees the source exists and is not
                // itself linked; the source cel's own origin and opacity
                // apply.
                let source = self.frames[*source_frame as usize]
                    .cels
                    .iter()
                    .find(|c| c.layer_index == cel.layer_index)
                    .expect("linked cel source vanished after validation");
                self.write_cel(image, source);
            }
            CelContent::Tilemap(_) => {
                // Tile streams are kept opaque; nothing to draw.
            }
        }
    }

    fn write_image_content(&self, image: &mut RgbaImage, cel: &CelData, content: &ImageContent) {
        debug_assert_eq!(
            content.pixels.len(),
            content.width as usize * content.height as usize
        );
        let x0 = cel.x as i32;
        let y0 = cel.y as i32;
        let x_end = x0 + content.width as i32;
        let y_end = y0 + content.height as i32;
        let (canvas_width, canvas_height) = image.dimensions();

        for y in y0.max(0)..y_end.min(canvas_height as i32) {
            for x in x0.max(0)..x_end.min(canvas_width as i32) {
                let index = (y - y0) as usize * content.width as usize + (x - x0) as usize;
                let source = self.resolve_pixel(&content.pixels, index);
                let backdrop = *image.get_pixel(x as u32, y as u32);
                let blended = blend::normal(backdrop, source, cel.opacity);
                image.put_pixel(x as u32, y as u32, blended);
            }
        }
    }

    fn resolve_pixel(&self, pixels: &Pixels, index: usize) -> Rgba<u8> {
        let pixel = match pixels {
            Pixels::Rgba(pixels) => pixels[index],
            Pixels::Grayscale(pixels) => pixels[index].as_rgba(),
            Pixels::Indexed(pixels) => {
                let transparent_index = match self.pixel_format {
                    PixelFormat::Indexed { transparent_index } => transparent_index,
                    _ => unreachable!("indexed pixels in a non-indexed document"),
                };
                let palette = self
                    .palette
                    .as_ref()
                    .expect("indexed document without palette passed validation");
                pixels[index]
                    .as_rgba(palette, transparent_index)
                    .expect("palette index out of range passed validation")
            }
        };
        Rgba([pixel.red, pixel.green, pixel.blue, pixel.alpha])
    }
}

/// A reference to a single frame.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    document: &'a Document,
    index: u32,
}

impl<'a> Frame<'a> {
    /// The frame's index in the document.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Frame duration in milliseconds.
    pub fn duration(&self) -> u32 {
        self.document.frames[self.index as usize].duration_ms as u32
    }

    /// Number of cels in this frame.
    pub fn num_cels(&self) -> u32 {
        self.document.frames[self.index as usize].cels.len() as u32
    }

    /// The frame's cels, in file order.
    pub fn cels(&self) -> impl Iterator<Item = Cel<'a>> + '_ {
        let document = self.document;
        let frame = self.index;
        (0..self.num_cels()).map(move |cel| Cel {
            document,
            frame,
            cel,
        })
    }

    /// The cel on the given layer, if the frame has one.
    pub fn cel_on_layer(&self, layer_id: u32) -> Option<Cel<'a>> {
        self.cels().find(|cel| cel.layer_index() == layer_id)
    }

    /// Compose this frame: all cels blended bottom layer first with
    /// source-over alpha.
    pub fn image(&self) -> RgbaImage {
        self.document.frame_image(self.index as usize)
    }
}
