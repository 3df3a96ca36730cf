use crate::document::{Document, Frame};
use crate::reader::AseReader;
use crate::user_data::UserData;
use crate::{ParseError, Result};

/// How a tag's frame range should be played back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopMode {
    /// Count up from the first frame to the last.
    Forward,
    /// Count down from the last frame to the first.
    Reverse,
    /// Up, then back down.
    PingPong,
    /// Down, then back up.
    PingPongReverse,
}

#[derive(Debug, PartialEq)]
pub(crate) struct TagData {
    pub(crate) name: String,
    pub(crate) from_frame: u16,
    pub(crate) to_frame: u16,
    pub(crate) loop_mode: LoopMode,
    pub(crate) repeat: u16,
    pub(crate) color: [u8; 3],
    pub(crate) user_data: Option<UserData>,
}

/// Parse a tags chunk (0x2018) into its entries.
pub(crate) fn parse_tags_chunk(data: &[u8]) -> Result<Vec<TagData>> {
    let mut reader = AseReader::new(data);

    let num_tags = reader.word()?;
    reader.skip_reserved(8)?;

    let mut result = Vec::with_capacity(num_tags as usize);
    for _ in 0..num_tags {
        let from_frame = reader.word()?;
        let to_frame = reader.word()?;
        let loop_mode = parse_loop_mode(reader.byte()?)?;
        let repeat = reader.word()?;
        reader.skip_reserved(6)?;
        let mut color = [0_u8; 3];
        reader.read_exact(&mut color)?;
        reader.skip_reserved(1)?;
        let name = reader.string()?;
        result.push(TagData {
            name,
            from_frame,
            to_frame,
            loop_mode,
            repeat,
            color,
            user_data: None,
        });
    }

    Ok(result)
}

fn parse_loop_mode(id: u8) -> Result<LoopMode> {
    match id {
        0 => Ok(LoopMode::Forward),
        1 => Ok(LoopMode::Reverse),
        2 => Ok(LoopMode::PingPong),
        3 => Ok(LoopMode::PingPongReverse),
        _ => Err(ParseError::InvariantViolation(format!(
            "Unknown loop mode: {}",
            id
        ))),
    }
}

/// A tag: a named range of frames with a playback mode.
///
/// Tag ranges may overlap each other and tag names are not guaranteed to
/// be unique.
#[derive(Debug, Clone, Copy)]
pub struct Tag<'a> {
    pub(crate) document: &'a Document,
    pub(crate) tag_id: u32,
}

impl<'a> Tag<'a> {
    fn data(&self) -> &'a TagData {
        &self.document.tags[self.tag_id as usize]
    }

    /// Tag name.
    pub fn name(&self) -> &str {
        &self.data().name
    }

    /// First frame of the range, inclusive.
    pub fn from_frame(&self) -> u32 {
        self.data().from_frame as u32
    }

    /// Last frame of the range, inclusive.
    pub fn to_frame(&self) -> u32 {
        self.data().to_frame as u32
    }

    /// Playback mode of the range.
    pub fn loop_mode(&self) -> LoopMode {
        self.data().loop_mode
    }

    /// How often the range plays; 0 means forever.
    pub fn repeat(&self) -> u16 {
        self.data().repeat
    }

    /// The tag's display color in the timeline.
    pub fn color(&self) -> [u8; 3] {
        self.data().color
    }

    /// User data attached to the tag, if any.
    pub fn user_data(&self) -> Option<&UserData> {
        self.data().user_data.as_ref()
    }

    /// The frames of the tag's range, in range order.
    pub fn frames(&self) -> impl Iterator<Item = Frame<'a>> + '_ {
        let document = self.document;
        (self.from_frame()..=self.to_frame()).map(move |index| document.frame(index))
    }
}
