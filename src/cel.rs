use crate::document::Document;
use crate::fixed::Fixed;
use crate::layer::Layer;
use crate::pixel::{PixelFormat, Pixels};
use crate::reader::AseReader;
use crate::tilemap::TilemapData;
use crate::user_data::UserData;
use crate::{ParseError, Result};
use image::RgbaImage;
use std::fmt;

#[derive(PartialEq)]
pub(crate) struct CelData {
    pub(crate) layer_index: u16,
    pub(crate) x: i16,
    pub(crate) y: i16,
    pub(crate) opacity: u8,
    pub(crate) z_index: i16,
    pub(crate) content: CelContent,
    pub(crate) extra: Option<CelExtra>,
    pub(crate) user_data: Option<UserData>,
}

impl fmt::Debug for CelData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CelData")
            .field("layer_index", &self.layer_index)
            .field("x", &self.x)
            .field("y", &self.y)
            .field("content", &self.content)
            .finish()
    }
}

#[derive(Debug, PartialEq)]
pub(crate) enum CelContent {
    Image(ImageContent),
    /// Index of the earlier frame whose cel on the same layer carries the
    /// pixels.
    Linked(u16),
    Tilemap(TilemapData),
}

#[derive(PartialEq)]
pub(crate) struct ImageContent {
    pub(crate) width: u16,
    pub(crate) height: u16,
    pub(crate) pixels: Pixels,
}

impl fmt::Debug for ImageContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}x{} pixels>", self.width, self.height)
    }
}

/// Precise sub-pixel bounds of a cel, from a cel-extra chunk (0x2006).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CelExtra {
    /// Bit 0: the precise bounds are set.
    pub flags: u32,
    /// Precise X position.
    pub x: Fixed,
    /// Precise Y position.
    pub y: Fixed,
    /// Width of the cel in the sprite.
    pub width: Fixed,
    /// Height of the cel in the sprite.
    pub height: Fixed,
}

/// Parse a cel chunk (0x2005).
pub(crate) fn parse_cel_chunk(data: &[u8], pixel_format: PixelFormat) -> Result<CelData> {
    let mut reader = AseReader::new(data);

    let layer_index = reader.word()?;
    let x = reader.short()?;
    let y = reader.short()?;
    let opacity = reader.byte()?;
    let cel_type = reader.word()?;
    let z_index = reader.short()?;
    reader.skip_reserved(5)?;

    let content = match cel_type {
        0 => {
            let width = reader.word()?;
            let height = reader.word()?;
            let pixels = Pixels::from_raw(
                &mut reader,
                pixel_format,
                width as usize * height as usize,
            )?;
            CelContent::Image(ImageContent {
                width,
                height,
                pixels,
            })
        }
        1 => {
            let frame_position = reader.word()?;
            CelContent::Linked(frame_position)
        }
        2 => {
            let width = reader.word()?;
            let height = reader.word()?;
            let pixels = Pixels::from_compressed(
                reader,
                pixel_format,
                width as usize * height as usize,
            )?;
            CelContent::Image(ImageContent {
                width,
                height,
                pixels,
            })
        }
        3 => {
            let width = reader.word()?;
            let height = reader.word()?;
            CelContent::Tilemap(TilemapData::parse(reader, width, height)?)
        }
        _ => {
            return Err(ParseError::InvariantViolation(format!(
                "Invalid cel type: {}",
                cel_type
            )))
        }
    };

    Ok(CelData {
        layer_index,
        x,
        y,
        opacity,
        z_index,
        content,
        extra: None,
        user_data: None,
    })
}

/// Parse a cel extra chunk (0x2006).
pub(crate) fn parse_cel_extra_chunk(data: &[u8]) -> Result<CelExtra> {
    let mut reader = AseReader::new(data);

    let flags = reader.dword()?;
    let x = reader.fixed()?;
    let y = reader.fixed()?;
    let width = reader.fixed()?;
    let height = reader.fixed()?;

    Ok(CelExtra {
        flags,
        x,
        y,
        width,
        height,
    })
}

/// A reference to a single cel: one layer's pixel contribution to one
/// frame. In the timeline view these are the dots.
#[derive(Debug, Clone, Copy)]
pub struct Cel<'a> {
    pub(crate) document: &'a Document,
    pub(crate) frame: u32,
    pub(crate) cel: u32,
}

impl<'a> Cel<'a> {
    fn data(&self) -> &'a CelData {
        &self.document.frames[self.frame as usize].cels[self.cel as usize]
    }

    /// Index of the frame this cel belongs to.
    pub fn frame_index(&self) -> u32 {
        self.frame
    }

    /// The layer this cel sits on.
    pub fn layer(&self) -> Layer<'a> {
        Layer {
            document: self.document,
            layer_id: self.data().layer_index as u32,
        }
    }

    /// Index of the layer this cel sits on.
    pub fn layer_index(&self) -> u32 {
        self.data().layer_index as u32
    }

    /// Top-left corner of the cel rectangle on the canvas. May be
    /// negative or extend beyond the canvas; composition clips.
    pub fn origin(&self) -> (i16, i16) {
        let data = self.data();
        (data.x, data.y)
    }

    /// Cel opacity, 0-255.
    pub fn opacity(&self) -> u8 {
        self.data().opacity
    }

    /// Z-index offset within the frame, as stored in the file.
    pub fn z_index(&self) -> i16 {
        self.data().z_index
    }

    /// Whether this cel links to an earlier frame's cel instead of
    /// carrying pixels.
    pub fn is_linked(&self) -> bool {
        matches!(self.data().content, CelContent::Linked(_))
    }

    /// Precise bounds from the cel-extra chunk, if present.
    pub fn extra(&self) -> Option<&CelExtra> {
        self.data().extra.as_ref()
    }

    /// User data attached to this cel, if any.
    pub fn user_data(&self) -> Option<&UserData> {
        self.data().user_data.as_ref()
    }

    /// This cel alone, drawn onto a transparent canvas-sized image.
    /// Linked cels resolve to their source cel's pixels.
    pub fn image(&self) -> RgbaImage {
        self.document.cel_image(self.frame as usize, self.cel as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cel_header(layer: u16, x: i16, y: i16, cel_type: u16, z: i16) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&layer.to_le_bytes());
        body.extend_from_slice(&x.to_le_bytes());
        body.extend_from_slice(&y.to_le_bytes());
        body.push(255);
        body.extend_from_slice(&cel_type.to_le_bytes());
        body.extend_from_slice(&z.to_le_bytes());
        body.extend_from_slice(&[0; 5]);
        body
    }

    #[test]
    fn raw_cel_keeps_dimensions_and_pixels() {
        let mut body = cel_header(1, -3, 4, 0, -2);
        body.extend_from_slice(&2_u16.to_le_bytes());
        body.extend_from_slice(&1_u16.to_le_bytes());
        body.extend_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        let cel = parse_cel_chunk(&body, PixelFormat::Rgba).unwrap();
        assert_eq!((cel.layer_index, cel.x, cel.y, cel.z_index), (1, -3, 4, -2));
        match cel.content {
            CelContent::Image(content) => {
                assert_eq!((content.width, content.height), (2, 1));
                assert_eq!(content.pixels.len(), 2);
            }
            other => panic!("expected image content, got {:?}", other),
        }
    }

    #[test]
    fn linked_cel_keeps_frame_position() {
        let mut body = cel_header(0, 0, 0, 1, 0);
        body.extend_from_slice(&7_u16.to_le_bytes());
        let cel = parse_cel_chunk(&body, PixelFormat::Rgba).unwrap();
        assert_eq!(cel.content, CelContent::Linked(7));
    }

    #[test]
    fn truncated_raw_cel_is_short_read() {
        let mut body = cel_header(0, 0, 0, 0, 0);
        body.extend_from_slice(&1_u16.to_le_bytes());
        body.extend_from_slice(&1_u16.to_le_bytes());
        body.extend_from_slice(&[1, 2]); // 2 of 4 bytes
        let err = parse_cel_chunk(&body, PixelFormat::Rgba).unwrap_err();
        assert!(matches!(err, ParseError::ShortRead));
    }

    #[test]
    fn cel_extra_fixed_point_bounds() {
        let mut body = 1_u32.to_le_bytes().to_vec();
        for value in [1.5, 2.25, 32.0, 32.0] {
            body.extend_from_slice(&Fixed::from_f64(value).raw().to_le_bytes());
        }
        body.extend_from_slice(&[0; 16]);
        let extra = parse_cel_extra_chunk(&body).unwrap();
        assert_eq!(extra.x.to_f64(), 1.5);
        assert_eq!(extra.y.to_f64(), 2.25);
        assert_eq!(extra.width.to_f64(), 32.0);
        assert_eq!(extra.height.to_f64(), 32.0);
    }
}
