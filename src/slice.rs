use crate::document::Document;
use crate::reader::AseReader;
use crate::user_data::UserData;
use crate::Result;

const FLAG_NINE_PATCH: u32 = 1;
const FLAG_PIVOT: u32 = 2;

#[derive(Debug, PartialEq)]
pub(crate) struct SliceData {
    pub(crate) name: String,
    pub(crate) flags: u32,
    pub(crate) keys: Vec<SliceKey>,
    pub(crate) user_data: Option<UserData>,
}

/// One key of a slice: the slice's geometry from a given frame onward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceKey {
    /// The frame this key takes effect on.
    pub from_frame: u32,
    /// Top-left corner relative to the canvas.
    pub origin: (i32, i32),
    /// Size in pixels. A width of 0 marks the slice hidden from
    /// `from_frame` on.
    pub size: (u32, u32),
    /// The 9-patch center box, relative to the slice origin.
    pub nine_patch: Option<NinePatch>,
    /// Pivot point relative to the slice origin.
    pub pivot: Option<(i32, i32)>,
}

impl SliceKey {
    /// Whether this key hides the slice for its frame range.
    pub fn is_hidden(&self) -> bool {
        self.size.0 == 0
    }
}

/// Center box of a 9-patch slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct NinePatch {
    pub center_x: i32,
    pub center_y: i32,
    pub width: u32,
    pub height: u32,
}

/// Parse a slice chunk (0x2022).
pub(crate) fn parse_slice_chunk(data: &[u8]) -> Result<SliceData> {
    let mut reader = AseReader::new(data);

    let num_keys = reader.dword()?;
    let flags = reader.dword()?;
    reader.skip_reserved(4)?;
    let name = reader.string()?;

    let mut keys = Vec::with_capacity(num_keys as usize);
    for _ in 0..num_keys {
        let from_frame = reader.dword()?;
        let origin_x = reader.long()?;
        let origin_y = reader.long()?;
        let width = reader.dword()?;
        let height = reader.dword()?;
        let nine_patch = if flags & FLAG_NINE_PATCH != 0 {
            Some(NinePatch {
                center_x: reader.long()?,
                center_y: reader.long()?,
                width: reader.dword()?,
                height: reader.dword()?,
            })
        } else {
            None
        };
        let pivot = if flags & FLAG_PIVOT != 0 {
            let pivot_x = reader.long()?;
            let pivot_y = reader.long()?;
            Some((pivot_x, pivot_y))
        } else {
            None
        };
        keys.push(SliceKey {
            from_frame,
            origin: (origin_x, origin_y),
            size: (width, height),
            nine_patch,
            pivot,
        });
    }

    Ok(SliceData {
        name,
        flags,
        keys,
        user_data: None,
    })
}

/// A named slice: a rectangular region of the canvas, possibly animated
/// through per-frame keys.
#[derive(Debug, Clone, Copy)]
pub struct Slice<'a> {
    pub(crate) document: &'a Document,
    pub(crate) slice_id: u32,
}

impl<'a> Slice<'a> {
    fn data(&self) -> &'a SliceData {
        &self.document.slices[self.slice_id as usize]
    }

    /// Slice name.
    pub fn name(&self) -> &str {
        &self.data().name
    }

    /// The slice's keys, in file order.
    pub fn keys(&self) -> &'a [SliceKey] {
        &self.data().keys
    }

    /// The key in effect for the given frame: the last key whose
    /// `from_frame` is not past it.
    pub fn key_for_frame(&self, frame: u32) -> Option<&'a SliceKey> {
        self.keys()
            .iter()
            .rev()
            .find(|key| key.from_frame <= frame)
    }

    /// User data attached to the slice, if any.
    pub fn user_data(&self) -> Option<&UserData> {
        self.data().user_data.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slice_body(flags: u32, name: &str, keys: &[(u32, i32, i32, u32, u32)]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&(keys.len() as u32).to_le_bytes());
        body.extend_from_slice(&flags.to_le_bytes());
        body.extend_from_slice(&[0; 4]);
        body.extend_from_slice(&(name.len() as u16).to_le_bytes());
        body.extend_from_slice(name.as_bytes());
        for (frame, x, y, w, h) in keys {
            body.extend_from_slice(&frame.to_le_bytes());
            body.extend_from_slice(&x.to_le_bytes());
            body.extend_from_slice(&y.to_le_bytes());
            body.extend_from_slice(&w.to_le_bytes());
            body.extend_from_slice(&h.to_le_bytes());
        }
        body
    }

    #[test]
    fn plain_keys() {
        let body = slice_body(0, "hud", &[(0, 1, 2, 10, 12), (3, 0, 0, 0, 0)]);
        let slice = parse_slice_chunk(&body).unwrap();
        assert_eq!(slice.name, "hud");
        assert_eq!(slice.keys.len(), 2);
        assert_eq!(slice.keys[0].origin, (1, 2));
        assert!(!slice.keys[0].is_hidden());
        assert!(slice.keys[1].is_hidden());
    }

    #[test]
    fn nine_patch_and_pivot() {
        let mut body = Vec::new();
        body.extend_from_slice(&1_u32.to_le_bytes());
        body.extend_from_slice(&3_u32.to_le_bytes()); // 9-patch + pivot
        body.extend_from_slice(&[0; 4]);
        body.extend_from_slice(&1_u16.to_le_bytes());
        body.push(b's');
        body.extend_from_slice(&0_u32.to_le_bytes());
        body.extend_from_slice(&0_i32.to_le_bytes());
        body.extend_from_slice(&0_i32.to_le_bytes());
        body.extend_from_slice(&32_u32.to_le_bytes());
        body.extend_from_slice(&32_u32.to_le_bytes());
        body.extend_from_slice(&8_i32.to_le_bytes());
        body.extend_from_slice(&8_i32.to_le_bytes());
        body.extend_from_slice(&16_u32.to_le_bytes());
        body.extend_from_slice(&16_u32.to_le_bytes());
        body.extend_from_slice(&4_i32.to_le_bytes());
        body.extend_from_slice(&5_i32.to_le_bytes());
        let slice = parse_slice_chunk(&body).unwrap();
        let key = &slice.keys[0];
        assert_eq!(
            key.nine_patch,
            Some(NinePatch {
                center_x: 8,
                center_y: 8,
                width: 16,
                height: 16,
            })
        );
        assert_eq!(key.pivot, Some((4, 5)));
    }
}
