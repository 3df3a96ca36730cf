use crate::reader::AseReader;
use crate::user_data::UserData;
use crate::{ParseError, Result};

/// The color palette of the document.
///
/// Entries use absolute palette indices: `color(i)` returns the entry for
/// palette index `i`. For indexed-color documents this includes every
/// color a cel may reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    pub(crate) entries: Vec<PaletteEntry>,
    pub(crate) user_data: Option<UserData>,
}

/// A single palette entry.
#[derive(Debug, Clone, PartialEq)]
pub struct PaletteEntry {
    pub(crate) red: u8,
    pub(crate) green: u8,
    pub(crate) blue: u8,
    pub(crate) alpha: u8,
    pub(crate) name: Option<String>,
}

impl PaletteEntry {
    /// Red channel, 0-255.
    pub fn red(&self) -> u8 {
        self.red
    }

    /// Green channel, 0-255.
    pub fn green(&self) -> u8 {
        self.green
    }

    /// Blue channel, 0-255.
    pub fn blue(&self) -> u8 {
        self.blue
    }

    /// Alpha channel, 0-255. Legacy palette forms carry no alpha and
    /// report 255.
    pub fn alpha(&self) -> u8 {
        self.alpha
    }

    /// Entry name, if the file carries one. May be empty.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The entry as `[red, green, blue, alpha]`.
    pub fn raw_rgba8(&self) -> [u8; 4] {
        [self.red, self.green, self.blue, self.alpha]
    }
}

impl Palette {
    /// Number of palette slots, i.e. one past the highest stored index.
    pub fn num_colors(&self) -> u32 {
        self.entries.len() as u32
    }

    /// Look up an entry by absolute palette index.
    pub fn color(&self, index: u32) -> Option<&PaletteEntry> {
        self.entries.get(index as usize)
    }

    /// User data attached to the palette, if any.
    pub fn user_data(&self) -> Option<&UserData> {
        self.user_data.as_ref()
    }

    fn with_entries(entries: Vec<PaletteEntry>) -> Self {
        Palette {
            entries,
            user_data: None,
        }
    }
}

fn transparent_black() -> PaletteEntry {
    PaletteEntry {
        red: 0,
        green: 0,
        blue: 0,
        alpha: 0,
        name: None,
    }
}

/// Parse a palette chunk (0x2019).
pub(crate) fn parse_palette_chunk(data: &[u8]) -> Result<Palette> {
    let mut reader = AseReader::new(data);

    let _num_total_entries = reader.dword()?;
    let from = reader.dword()?;
    let to = reader.dword()?;
    reader.skip_reserved(8)?;

    if to < from {
        return Err(ParseError::InvariantViolation(format!(
            "Bad palette color indices: first={} last={}",
            from, to
        )));
    }

    // Dense storage; slots below `from` stay transparent so absolute
    // indexing holds even for partial palettes.
    let mut entries = vec![transparent_black(); from as usize];
    for _ in from..=to {
        let flags = reader.word()?;
        let red = reader.byte()?;
        let green = reader.byte()?;
        let blue = reader.byte()?;
        let alpha = reader.byte()?;
        let name = if flags & 1 != 0 {
            Some(reader.string()?)
        } else {
            None
        };
        entries.push(PaletteEntry {
            red,
            green,
            blue,
            alpha,
            name,
        });
    }

    Ok(Palette::with_entries(entries))
}

/// Expand a 6-bit VGA channel value (0-63) to 8 bits.
fn scale_6bit(value: u8) -> u8 {
    (value << 2) | (value >> 4)
}

/// Parse an old palette chunk (0x0004 full-range, 0x0011 6-bit).
///
/// Packets advance a running index by their skip count and then fill
/// colors sequentially; the result is always a 256-entry palette.
pub(crate) fn parse_old_palette_chunk(data: &[u8], six_bit: bool) -> Result<Palette> {
    let mut reader = AseReader::new(data);

    let num_packets = reader.word()?;
    let mut entries = vec![transparent_black(); 256];
    let mut index: usize = 0;
    for _ in 0..num_packets {
        let skip = reader.byte()?;
        let num_colors = reader.byte()?;
        index += skip as usize;
        for _ in 0..num_colors {
            let mut channels = [reader.byte()?, reader.byte()?, reader.byte()?];
            if six_bit {
                for c in channels.iter_mut() {
                    *c = scale_6bit(*c);
                }
            }
            if index >= 256 {
                return Err(ParseError::InvariantViolation(
                    "Old palette packet overflows 256 entries".to_string(),
                ));
            }
            entries[index] = PaletteEntry {
                red: channels[0],
                green: channels[1],
                blue: channels[2],
                alpha: 255,
                name: None,
            };
            index += 1;
        }
    }

    Ok(Palette::with_entries(entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn palette_body(from: u32, colors: &[(u8, u8, u8, u8)]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&(colors.len() as u32).to_le_bytes());
        body.extend_from_slice(&from.to_le_bytes());
        body.extend_from_slice(&(from + colors.len() as u32 - 1).to_le_bytes());
        body.extend_from_slice(&[0; 8]);
        for (r, g, b, a) in colors {
            body.extend_from_slice(&0_u16.to_le_bytes());
            body.extend_from_slice(&[*r, *g, *b, *a]);
        }
        body
    }

    #[test]
    fn parses_entries_with_absolute_indices() {
        let body = palette_body(2, &[(10, 20, 30, 255), (40, 50, 60, 128)]);
        let palette = parse_palette_chunk(&body).unwrap();
        assert_eq!(palette.num_colors(), 4);
        assert_eq!(palette.color(0).unwrap().alpha(), 0);
        assert_eq!(palette.color(2).unwrap().raw_rgba8(), [10, 20, 30, 255]);
        assert_eq!(palette.color(3).unwrap().raw_rgba8(), [40, 50, 60, 128]);
    }

    #[test]
    fn named_entry_with_empty_name() {
        let mut body = Vec::new();
        body.extend_from_slice(&1_u32.to_le_bytes());
        body.extend_from_slice(&0_u32.to_le_bytes());
        body.extend_from_slice(&0_u32.to_le_bytes());
        body.extend_from_slice(&[0; 8]);
        body.extend_from_slice(&1_u16.to_le_bytes()); // has-name flag
        body.extend_from_slice(&[1, 2, 3, 4]);
        body.extend_from_slice(&0_u16.to_le_bytes()); // zero-length name
        let palette = parse_palette_chunk(&body).unwrap();
        assert_eq!(palette.color(0).unwrap().name(), Some(""));
    }

    #[test]
    fn old_palette_six_bit_scaling() {
        let mut body = Vec::new();
        body.extend_from_slice(&1_u16.to_le_bytes()); // one packet
        body.push(0); // skip
        body.push(2); // two colors
        body.extend_from_slice(&[63, 0, 0, 0, 63, 0]);
        let palette = parse_old_palette_chunk(&body, true).unwrap();
        assert_eq!(palette.color(0).unwrap().raw_rgba8(), [255, 0, 0, 255]);
        assert_eq!(palette.color(1).unwrap().raw_rgba8(), [0, 255, 0, 255]);
    }

    #[test]
    fn old_palette_skip_advances_index() {
        let mut body = Vec::new();
        body.extend_from_slice(&1_u16.to_le_bytes());
        body.push(5);
        body.push(1);
        body.extend_from_slice(&[9, 8, 7]);
        let palette = parse_old_palette_chunk(&body, false).unwrap();
        assert_eq!(palette.color(5).unwrap().raw_rgba8(), [9, 8, 7, 255]);
        assert_eq!(palette.color(4).unwrap().alpha(), 0);
    }
}
