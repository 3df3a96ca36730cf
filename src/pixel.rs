use crate::palette::Palette;
use crate::reader::AseReader;
use crate::{ParseError, Result};
use std::io::Read;

/// Pixel format of the source Aseprite file.
///
/// All composed images are RGBA regardless of the source format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Red, green, blue, and alpha with 8 bits each.
    Rgba,
    /// 8 bit gray value and 8 bit alpha.
    Grayscale,
    /// Indexed color; colors resolve through the palette. Pixels equal to
    /// `transparent_index` compose as fully transparent.
    #[allow(missing_docs)]
    Indexed { transparent_index: u8 },
}

impl PixelFormat {
    /// Number of bytes to store one pixel.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgba => 4,
            PixelFormat::Grayscale => 2,
            PixelFormat::Indexed { .. } => 1,
        }
    }
}

// From the file format notes:
// PIXEL: One pixel, depending on the image pixel format:
// RGBA: BYTE[4], each pixel have 4 bytes in this order Red, Green, Blue, Alpha.
// Grayscale: BYTE[2], each pixel have 2 bytes in the order Value, Alpha.
// Indexed: BYTE, each pixel uses 1 byte (the index).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Rgba {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

impl Rgba {
    fn new(chunk: &[u8]) -> Self {
        Rgba {
            red: chunk[0],
            green: chunk[1],
            blue: chunk[2],
            alpha: chunk[3],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Grayscale {
    pub value: u8,
    pub alpha: u8,
}

impl Grayscale {
    fn new(chunk: &[u8]) -> Self {
        Grayscale {
            value: chunk[0],
            alpha: chunk[1],
        }
    }

    pub(crate) fn as_rgba(&self) -> Rgba {
        Rgba {
            red: self.value,
            green: self.value,
            blue: self.value,
            alpha: self.alpha,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Indexed(pub u8);

impl Indexed {
    pub(crate) fn value(&self) -> u8 {
        self.0
    }

    pub(crate) fn as_rgba(&self, palette: &Palette, transparent_index: u8) -> Option<Rgba> {
        if self.0 == transparent_index {
            return Some(Rgba {
                red: 0,
                green: 0,
                blue: 0,
                alpha: 0,
            });
        }
        palette.color(self.0 as u32).map(|c| Rgba {
            red: c.red(),
            green: c.green(),
            blue: c.blue(),
            alpha: c.alpha(),
        })
    }
}

/// Decoded pixel data of one cel, kept in the source format. Canvas
/// rasterization is deferred until the consumer asks for an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Pixels {
    Rgba(Vec<Rgba>),
    Grayscale(Vec<Grayscale>),
    Indexed(Vec<Indexed>),
}

impl Pixels {
    fn from_bytes(bytes: Vec<u8>, pixel_format: PixelFormat) -> Result<Self> {
        match pixel_format {
            PixelFormat::Indexed { .. } => {
                let pixels = bytes.iter().map(|byte| Indexed(*byte)).collect();
                Ok(Self::Indexed(pixels))
            }
            PixelFormat::Grayscale => {
                if bytes.len() % 2 != 0 {
                    return Err(ParseError::InvariantViolation(
                        "Incorrect length of bytes for grayscale image data".to_string(),
                    ));
                }
                let pixels = bytes.chunks_exact(2).map(Grayscale::new).collect();
                Ok(Self::Grayscale(pixels))
            }
            PixelFormat::Rgba => {
                if bytes.len() % 4 != 0 {
                    return Err(ParseError::InvariantViolation(
                        "Incorrect length of bytes for RGBA image data".to_string(),
                    ));
                }
                let pixels = bytes.chunks_exact(4).map(Rgba::new).collect();
                Ok(Self::Rgba(pixels))
            }
        }
    }

    pub(crate) fn from_raw<T: Read>(
        reader: &mut AseReader<T>,
        pixel_format: PixelFormat,
        expected_pixel_count: usize,
    ) -> Result<Self> {
        let expected_size = pixel_format.bytes_per_pixel() * expected_pixel_count;
        reader
            .take_bytes(expected_size)
            .and_then(|bytes| Self::from_bytes(bytes, pixel_format))
    }

    pub(crate) fn from_compressed<T: Read>(
        reader: AseReader<T>,
        pixel_format: PixelFormat,
        expected_pixel_count: usize,
    ) -> Result<Self> {
        let expected_size = pixel_format.bytes_per_pixel() * expected_pixel_count;
        let bytes = reader.unzip(expected_size)?;
        if bytes.len() != expected_size {
            return Err(ParseError::InvariantViolation(format!(
                "Invalid pixel data size. Expected: {}, Actual: {}",
                expected_size,
                bytes.len()
            )));
        }
        Self::from_bytes(bytes, pixel_format)
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            Pixels::Rgba(v) => v.len(),
            Pixels::Grayscale(v) => v.len(),
            Pixels::Indexed(v) => v.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgba_from_bytes() {
        let bytes = vec![255, 0, 0, 255, 0, 255, 0, 128];
        let pixels = Pixels::from_bytes(bytes, PixelFormat::Rgba).unwrap();
        match pixels {
            Pixels::Rgba(v) => {
                assert_eq!(v.len(), 2);
                assert_eq!(v[1].green, 255);
                assert_eq!(v[1].alpha, 128);
            }
            _ => panic!("expected RGBA pixels"),
        }
    }

    #[test]
    fn rgba_length_must_divide() {
        let err = Pixels::from_bytes(vec![1, 2, 3], PixelFormat::Rgba).unwrap_err();
        assert!(matches!(err, ParseError::InvariantViolation(_)));
    }

    #[test]
    fn grayscale_resolves_to_gray_rgba() {
        let gray = Grayscale {
            value: 70,
            alpha: 200,
        };
        let rgba = gray.as_rgba();
        assert_eq!((rgba.red, rgba.green, rgba.blue, rgba.alpha), (70, 70, 70, 200));
    }
}
