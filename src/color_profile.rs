use crate::fixed::Fixed;
use crate::reader::AseReader;
use crate::user_data::UserData;
use crate::{ParseError, Result};

/// The document's color profile chunk (0x2007).
#[derive(Debug, Clone, PartialEq)]
pub struct ColorProfile {
    pub(crate) kind: ColorProfileKind,
    pub(crate) flags: u16,
    pub(crate) gamma: Fixed,
    pub(crate) icc: Option<Vec<u8>>,
    pub(crate) user_data: Option<UserData>,
}

/// Which kind of color profile the document declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorProfileKind {
    /// No profile; colors are used as-is.
    None,
    /// Standard sRGB.
    Srgb,
    /// An embedded ICC profile.
    Icc,
}

impl ColorProfile {
    /// The declared profile kind.
    pub fn kind(&self) -> ColorProfileKind {
        self.kind
    }

    /// Bit 0: use the fixed gamma below.
    pub fn flags(&self) -> u16 {
        self.flags
    }

    /// The fixed gamma (1.0 means linear). Only meaningful when flag
    /// bit 0 is set.
    pub fn gamma(&self) -> Fixed {
        self.gamma
    }

    /// The embedded ICC profile bytes, for [`ColorProfileKind::Icc`].
    pub fn icc_profile(&self) -> Option<&[u8]> {
        self.icc.as_deref()
    }

    /// User data attached to the color profile, if any.
    pub fn user_data(&self) -> Option<&UserData> {
        self.user_data.as_ref()
    }
}

/// Parse a color profile chunk (0x2007).
pub(crate) fn parse_color_profile_chunk(data: &[u8]) -> Result<ColorProfile> {
    let mut reader = AseReader::new(data);

    let kind = match reader.word()? {
        0x0000 => ColorProfileKind::None,
        0x0001 => ColorProfileKind::Srgb,
        0x0002 => ColorProfileKind::Icc,
        other => {
            return Err(ParseError::InvariantViolation(format!(
                "Unknown color profile type: {}",
                other
            )))
        }
    };
    let flags = reader.word()?;
    let gamma = reader.fixed()?;
    reader.skip_reserved(8)?;

    let icc = if kind == ColorProfileKind::Icc {
        let icc_size = reader.dword()?;
        Some(reader.take_bytes(icc_size as usize)?)
    } else {
        None
    };

    Ok(ColorProfile {
        kind,
        flags,
        gamma,
        icc,
        user_data: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn srgb_profile() {
        let mut body = Vec::new();
        body.extend_from_slice(&1_u16.to_le_bytes());
        body.extend_from_slice(&0_u16.to_le_bytes());
        body.extend_from_slice(&0_i32.to_le_bytes());
        body.extend_from_slice(&[0; 8]);
        let profile = parse_color_profile_chunk(&body).unwrap();
        assert_eq!(profile.kind(), ColorProfileKind::Srgb);
        assert_eq!(profile.icc_profile(), None);
    }

    #[test]
    fn icc_profile_carries_payload() {
        let payload = [0xde, 0xad, 0xbe, 0xef];
        let mut body = Vec::new();
        body.extend_from_slice(&2_u16.to_le_bytes());
        body.extend_from_slice(&1_u16.to_le_bytes());
        body.extend_from_slice(&Fixed::from_f64(2.2).raw().to_le_bytes());
        body.extend_from_slice(&[0; 8]);
        body.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        body.extend_from_slice(&payload);
        let profile = parse_color_profile_chunk(&body).unwrap();
        assert_eq!(profile.kind(), ColorProfileKind::Icc);
        assert!((profile.gamma().to_f64() - 2.2).abs() < 1.0 / 65536.0);
        assert_eq!(profile.icc_profile(), Some(&payload[..]));
    }
}
