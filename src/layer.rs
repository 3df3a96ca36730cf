use crate::document::Document;
use crate::reader::AseReader;
use crate::tileset::TilesetId;
use crate::user_data::UserData;
use crate::{ParseError, Result};
use bitflags::bitflags;
use image::RgbaImage;

bitflags! {
    /// Flag bitmap of a layer.
    pub struct LayerFlags: u16 {
        /// The layer's eye icon is on.
        const VISIBLE = 1;
        /// The layer accepts edits.
        const EDITABLE = 2;
        /// Movement is locked. Layers with this flag carry a UUID.
        const LOCK_MOVEMENT = 4;
        /// The layer is the background layer.
        const BACKGROUND = 8;
        /// Prefer linked cels when copying frames.
        const PREFER_LINKED_CELS = 16;
        /// The group is shown collapsed in the timeline.
        const COLLAPSED = 32;
        /// The layer is a reference layer.
        const REFERENCE = 64;
    }
}

/// What a layer contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    /// An image layer; its cels carry pixels.
    Normal,
    /// A grouping node for the layers below it in the timeline.
    Group,
    /// A tilemap layer; its cels reference the given tileset.
    Tilemap(TilesetId),
}

/// How a layer is blended onto the layers below it.
///
/// Parsed and exposed as data; composition in this crate is source-over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum BlendMode {
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
    Addition,
    Subtract,
    Divide,
}

#[derive(Debug, PartialEq)]
pub(crate) struct LayerData {
    pub(crate) name: String,
    pub(crate) flags: LayerFlags,
    pub(crate) kind: LayerKind,
    pub(crate) child_level: u16,
    pub(crate) blend_mode: BlendMode,
    pub(crate) opacity: u8,
    pub(crate) uuid: Option<[u8; 16]>,
    pub(crate) user_data: Option<UserData>,
}

/// Parse a layer chunk (0x2004).
pub(crate) fn parse_layer_chunk(data: &[u8]) -> Result<LayerData> {
    let mut reader = AseReader::new(data);

    let flag_bits = reader.word()?;
    let layer_type = reader.word()?;
    let child_level = reader.word()?;
    let _default_width = reader.word()?;
    let _default_height = reader.word()?;
    let blend_mode = parse_blend_mode(reader.word()?)?;
    let opacity = reader.byte()?;
    reader.skip_reserved(3)?;
    let name = reader.string()?;

    let flags = LayerFlags::from_bits_truncate(flag_bits);

    let kind = match layer_type {
        0 => LayerKind::Normal,
        1 => LayerKind::Group,
        2 => LayerKind::Tilemap(TilesetId::new(reader.dword()?)),
        _ => {
            return Err(ParseError::InvariantViolation(format!(
                "Invalid layer type: {}",
                layer_type
            )))
        }
    };

    let uuid = if flags.contains(LayerFlags::LOCK_MOVEMENT) {
        let mut bytes = [0_u8; 16];
        reader.read_exact(&mut bytes)?;
        Some(bytes)
    } else {
        None
    };

    Ok(LayerData {
        name,
        flags,
        kind,
        child_level,
        blend_mode,
        opacity,
        uuid,
        user_data: None,
    })
}

fn parse_blend_mode(id: u16) -> Result<BlendMode> {
    match id {
        0 => Ok(BlendMode::Normal),
        1 => Ok(BlendMode::Multiply),
        2 => Ok(BlendMode::Screen),
        3 => Ok(BlendMode::Overlay),
        4 => Ok(BlendMode::Darken),
        5 => Ok(BlendMode::Lighten),
        6 => Ok(BlendMode::ColorDodge),
        7 => Ok(BlendMode::ColorBurn),
        8 => Ok(BlendMode::HardLight),
        9 => Ok(BlendMode::SoftLight),
        10 => Ok(BlendMode::Difference),
        11 => Ok(BlendMode::Exclusion),
        12 => Ok(BlendMode::Hue),
        13 => Ok(BlendMode::Saturation),
        14 => Ok(BlendMode::Color),
        15 => Ok(BlendMode::Luminosity),
        16 => Ok(BlendMode::Addition),
        17 => Ok(BlendMode::Subtract),
        18 => Ok(BlendMode::Divide),
        _ => Err(ParseError::InvariantViolation(format!(
            "Invalid blend mode: {}",
            id
        ))),
    }
}

#[derive(Debug, PartialEq)]
pub(crate) struct GroupData {
    /// Index of the group's own layer in the flat layer list.
    pub(crate) layer_id: u32,
    /// Direct non-group members, in declared order.
    pub(crate) members: Vec<u32>,
}

/// Rebuild the group forest from the flat layer list.
///
/// Layers arrive back-to-front with groups preceding their children; a
/// group at child level L owns the run of layers at level L+1 that
/// follows it. The stack is unwound whenever the declared level drops.
pub(crate) fn build_groups(layers: &[LayerData]) -> Vec<GroupData> {
    let mut groups: Vec<GroupData> = Vec::new();
    // (group index, child level of the group's own layer)
    let mut stack: Vec<(usize, u16)> = Vec::new();

    for (id, layer) in layers.iter().enumerate() {
        while let Some(&(_, level)) = stack.last() {
            if level >= layer.child_level {
                stack.pop();
            } else {
                break;
            }
        }
        if layer.kind == LayerKind::Group {
            groups.push(GroupData {
                layer_id: id as u32,
                members: Vec::new(),
            });
            stack.push((groups.len() - 1, layer.child_level));
        } else if let Some(&(group, _)) = stack.last() {
            groups[group].members.push(id as u32);
        }
    }

    groups
}

/// A reference to a single layer.
#[derive(Debug, Clone, Copy)]
pub struct Layer<'a> {
    pub(crate) document: &'a Document,
    pub(crate) layer_id: u32,
}

impl<'a> Layer<'a> {
    fn data(&self) -> &'a LayerData {
        &self.document.layers[self.layer_id as usize]
    }

    /// This layer's index in the document's layer list.
    pub fn id(&self) -> u32 {
        self.layer_id
    }

    /// Layer name. Not guaranteed to be unique.
    pub fn name(&self) -> &str {
        &self.data().name
    }

    /// The layer's flag set.
    pub fn flags(&self) -> LayerFlags {
        self.data().flags
    }

    /// Whether the layer's own visibility flag is on. Does not consider
    /// the visibility of enclosing groups.
    pub fn is_visible(&self) -> bool {
        self.flags().contains(LayerFlags::VISIBLE)
    }

    /// Whether this is the background layer.
    pub fn is_background(&self) -> bool {
        self.flags().contains(LayerFlags::BACKGROUND)
    }

    /// Whether this layer is a group.
    pub fn is_group(&self) -> bool {
        self.data().kind == LayerKind::Group
    }

    /// What the layer contains.
    pub fn kind(&self) -> LayerKind {
        self.data().kind
    }

    /// Nesting depth; 0 for top-level layers.
    pub fn child_level(&self) -> u16 {
        self.data().child_level
    }

    /// The layer's blend mode as stored in the file.
    pub fn blend_mode(&self) -> BlendMode {
        self.data().blend_mode
    }

    /// Layer opacity, 0-255. Only meaningful when the document header
    /// declares valid layer opacity.
    pub fn opacity(&self) -> u8 {
        self.data().opacity
    }

    /// The layer's UUID, present when movement is locked.
    pub fn uuid(&self) -> Option<&[u8; 16]> {
        self.data().uuid.as_ref()
    }

    /// User data attached to the layer, if any.
    pub fn user_data(&self) -> Option<&UserData> {
        self.data().user_data.as_ref()
    }

    /// Compose this layer's contribution to the given frame as a
    /// canvas-sized image.
    ///
    /// # Panics
    ///
    /// Panics if `frame` is not less than the number of frames.
    pub fn frame_image(&self, frame: u32) -> RgbaImage {
        assert!(frame < self.document.num_frames());
        self.document
            .layer_image(frame as usize, self.layer_id as usize)
    }
}

/// A reference to a layer group and its direct members.
#[derive(Debug, Clone, Copy)]
pub struct LayerGroup<'a> {
    pub(crate) document: &'a Document,
    pub(crate) group_id: usize,
}

impl<'a> LayerGroup<'a> {
    fn data(&self) -> &'a GroupData {
        &self.document.groups[self.group_id]
    }

    /// The group's name (the name of its layer).
    pub fn name(&self) -> &str {
        &self.document.layers[self.data().layer_id as usize].name
    }

    /// The group's own entry in the layer list.
    pub fn layer(&self) -> Layer<'a> {
        Layer {
            document: self.document,
            layer_id: self.data().layer_id,
        }
    }

    /// The group's direct non-group members, in declared order.
    pub fn layers(&self) -> impl Iterator<Item = Layer<'a>> + '_ {
        let document = self.document;
        self.data()
            .members
            .iter()
            .map(move |&layer_id| Layer { document, layer_id })
    }

    /// Number of direct members.
    pub fn num_layers(&self) -> usize {
        self.data().members.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer_body(flags: u16, layer_type: u16, child_level: u16, name: &str) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&flags.to_le_bytes());
        body.extend_from_slice(&layer_type.to_le_bytes());
        body.extend_from_slice(&child_level.to_le_bytes());
        body.extend_from_slice(&[0; 4]); // default width/height
        body.extend_from_slice(&0_u16.to_le_bytes()); // blend mode
        body.push(255); // opacity
        body.extend_from_slice(&[0; 3]);
        body.extend_from_slice(&(name.len() as u16).to_le_bytes());
        body.extend_from_slice(name.as_bytes());
        body
    }

    fn data(flags: u16, layer_type: u16, child_level: u16, name: &str) -> LayerData {
        parse_layer_chunk(&layer_body(flags, layer_type, child_level, name)).unwrap()
    }

    #[test]
    fn parses_flags_and_name() {
        let layer = data(3, 0, 0, "Background");
        assert_eq!(layer.name, "Background");
        assert!(layer.flags.contains(LayerFlags::VISIBLE));
        assert!(layer.flags.contains(LayerFlags::EDITABLE));
        assert_eq!(layer.kind, LayerKind::Normal);
        assert_eq!(layer.uuid, None);
    }

    #[test]
    fn tilemap_layer_reads_tileset_index() {
        let mut body = layer_body(1, 2, 0, "tiles");
        body.extend_from_slice(&9_u32.to_le_bytes());
        let layer = parse_layer_chunk(&body).unwrap();
        assert_eq!(layer.kind, LayerKind::Tilemap(TilesetId::new(9)));
    }

    #[test]
    fn movement_locked_layer_reads_uuid() {
        let mut body = layer_body(1 | 4, 0, 0, "locked");
        body.extend_from_slice(&[0xab; 16]);
        let layer = parse_layer_chunk(&body).unwrap();
        assert_eq!(layer.uuid, Some([0xab; 16]));
    }

    #[test]
    fn groups_adopt_following_deeper_layers() {
        let layers = vec![
            data(1, 1, 0, "g0"),
            data(1, 0, 1, "a"),
            data(1, 1, 1, "g1"),
            data(1, 0, 2, "b"),
            data(1, 0, 1, "c"),
            data(1, 0, 0, "top"),
        ];
        let groups = build_groups(&layers);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].layer_id, 0);
        assert_eq!(groups[0].members, vec![1, 4]);
        assert_eq!(groups[1].layer_id, 2);
        assert_eq!(groups[1].members, vec![3]);
    }

    #[test]
    fn sibling_groups_do_not_nest() {
        let layers = vec![
            data(1, 1, 0, "g0"),
            data(1, 0, 1, "a"),
            data(1, 1, 0, "g1"),
            data(1, 0, 1, "b"),
        ];
        let groups = build_groups(&layers);
        assert_eq!(groups[0].members, vec![1]);
        assert_eq!(groups[1].members, vec![3]);
    }
}
