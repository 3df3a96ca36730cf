use crate::fixed::Fixed;
use crate::reader::AseReader;
use crate::{ParseError, Result};
use std::collections::HashMap;
use std::io::Read;

const FLAG_HAS_TEXT: u32 = 1;
const FLAG_HAS_COLOR: u32 = 2;
const FLAG_HAS_PROPERTIES: u32 = 4;

/// Free-form annotation attached to a document entity.
///
/// Cels, layers, tags, slices, the palette and the color profile can all
/// carry one. Which entity owns a user-data chunk is decided by its
/// position in the file, see the frame parser.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserData {
    /// Free text, if present.
    pub text: Option<String>,
    /// An RGBA color, if present.
    pub color: Option<[u8; 4]>,
    /// Property maps, in file order. Usually at most one document-local
    /// map plus one per extension that stored data on the entity.
    pub properties: Vec<PropertyMap>,
}

/// One key/value map inside a user-data annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyMap {
    /// 0 for the document-local map; otherwise the id of the extension
    /// entry in the external files chunk that owns this map.
    pub external_id: u32,
    /// The typed key/value pairs.
    pub properties: HashMap<String, PropertyValue>,
}

impl PropertyMap {
    /// Whether this map belongs to an extension rather than the document.
    pub fn is_external(&self) -> bool {
        self.external_id != 0
    }
}

/// A typed user-data property value.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum PropertyValue {
    Bool(bool),
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    Fixed(Fixed),
    F32(f32),
    F64(f64),
    String(String),
    Point { x: i32, y: i32 },
    Size { width: i32, height: i32 },
    Rect { x: i32, y: i32, width: i32, height: i32 },
    Vector(Vec<PropertyValue>),
    Properties(HashMap<String, PropertyValue>),
    Uuid([u8; 16]),
}

/// Parse a user data chunk (0x2020).
pub(crate) fn parse_user_data_chunk(data: &[u8]) -> Result<UserData> {
    let mut reader = AseReader::new(data);

    let flags = reader.dword()?;
    let text = if flags & FLAG_HAS_TEXT != 0 {
        Some(reader.string()?)
    } else {
        None
    };
    let color = if flags & FLAG_HAS_COLOR != 0 {
        let red = reader.byte()?;
        let green = reader.byte()?;
        let blue = reader.byte()?;
        let alpha = reader.byte()?;
        Some([red, green, blue, alpha])
    } else {
        None
    };
    let properties = if flags & FLAG_HAS_PROPERTIES != 0 {
        let _total_size = reader.dword()?;
        let map_count = reader.dword()?;
        let mut maps = Vec::with_capacity(map_count as usize);
        for _ in 0..map_count {
            maps.push(parse_property_map(&mut reader)?);
        }
        maps
    } else {
        Vec::new()
    };

    Ok(UserData {
        text,
        color,
        properties,
    })
}

fn parse_property_map<T: Read>(reader: &mut AseReader<T>) -> Result<PropertyMap> {
    let external_id = reader.dword()?;
    let prop_count = reader.dword()?;
    let properties = parse_properties(reader, prop_count)?;
    Ok(PropertyMap {
        external_id,
        properties,
    })
}

fn parse_properties<T: Read>(
    reader: &mut AseReader<T>,
    count: u32,
) -> Result<HashMap<String, PropertyValue>> {
    let mut properties = HashMap::with_capacity(count as usize);
    for _ in 0..count {
        let key = reader.string()?;
        let type_tag = reader.word()?;
        let value = parse_value(reader, type_tag)?;
        properties.insert(key, value);
    }
    Ok(properties)
}

fn parse_value<T: Read>(reader: &mut AseReader<T>, type_tag: u16) -> Result<PropertyValue> {
    let value = match type_tag {
        1 => PropertyValue::Bool(reader.byte()? != 0),
        2 => PropertyValue::I8(reader.byte()? as i8),
        3 => PropertyValue::U8(reader.byte()?),
        4 => PropertyValue::I16(reader.short()?),
        5 => PropertyValue::U16(reader.word()?),
        6 => PropertyValue::I32(reader.long()?),
        7 => PropertyValue::U32(reader.dword()?),
        8 => PropertyValue::I64(reader.long64()?),
        9 => PropertyValue::U64(reader.qword()?),
        10 => PropertyValue::Fixed(reader.fixed()?),
        11 => PropertyValue::F32(reader.float()?),
        12 => PropertyValue::F64(reader.double()?),
        13 => PropertyValue::String(reader.string()?),
        14 => PropertyValue::Point {
            x: reader.long()?,
            y: reader.long()?,
        },
        15 => PropertyValue::Size {
            width: reader.long()?,
            height: reader.long()?,
        },
        16 => PropertyValue::Rect {
            x: reader.long()?,
            y: reader.long()?,
            width: reader.long()?,
            height: reader.long()?,
        },
        17 => {
            let count = reader.dword()?;
            let elem_type = reader.word()?;
            let mut elements = Vec::with_capacity(count as usize);
            if elem_type == 0 {
                // Heterogeneous: each element carries its own type tag.
                for _ in 0..count {
                    let tag = reader.word()?;
                    elements.push(parse_value(reader, tag)?);
                }
            } else {
                for _ in 0..count {
                    elements.push(parse_value(reader, elem_type)?);
                }
            }
            PropertyValue::Vector(elements)
        }
        18 => {
            let prop_count = reader.dword()?;
            PropertyValue::Properties(parse_properties(reader, prop_count)?)
        }
        19 => {
            let mut uuid = [0_u8; 16];
            reader.read_exact(&mut uuid)?;
            PropertyValue::Uuid(uuid)
        }
        // The format reserves no skip mechanism, so an unknown tag makes
        // the rest of the chunk undecodable.
        _ => {
            return Err(ParseError::InvariantViolation(format!(
                "Unknown user data property type: {}",
                type_tag
            )))
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string_bytes(s: &str) -> Vec<u8> {
        let mut out = (s.len() as u16).to_le_bytes().to_vec();
        out.extend_from_slice(s.as_bytes());
        out
    }

    #[test]
    fn text_and_color() {
        let mut body = 3_u32.to_le_bytes().to_vec();
        body.extend_from_slice(&string_bytes("note"));
        body.extend_from_slice(&[1, 2, 3, 4]);
        let ud = parse_user_data_chunk(&body).unwrap();
        assert_eq!(ud.text.as_deref(), Some("note"));
        assert_eq!(ud.color, Some([1, 2, 3, 4]));
        assert!(ud.properties.is_empty());
    }

    #[test]
    fn scalar_properties() {
        let mut props = Vec::new();
        props.extend_from_slice(&string_bytes("flag"));
        props.extend_from_slice(&1_u16.to_le_bytes());
        props.push(1);
        props.extend_from_slice(&string_bytes("count"));
        props.extend_from_slice(&6_u16.to_le_bytes());
        props.extend_from_slice(&(-7_i32).to_le_bytes());

        let mut body = 4_u32.to_le_bytes().to_vec();
        body.extend_from_slice(&0_u32.to_le_bytes()); // total size, unused
        body.extend_from_slice(&1_u32.to_le_bytes()); // one map
        body.extend_from_slice(&0_u32.to_le_bytes()); // document-local
        body.extend_from_slice(&2_u32.to_le_bytes()); // two properties
        body.extend_from_slice(&props);

        let ud = parse_user_data_chunk(&body).unwrap();
        assert_eq!(ud.properties.len(), 1);
        let map = &ud.properties[0];
        assert!(!map.is_external());
        assert_eq!(map.properties["flag"], PropertyValue::Bool(true));
        assert_eq!(map.properties["count"], PropertyValue::I32(-7));
    }

    #[test]
    fn heterogeneous_vector() {
        let mut body = 4_u32.to_le_bytes().to_vec();
        body.extend_from_slice(&0_u32.to_le_bytes());
        body.extend_from_slice(&1_u32.to_le_bytes());
        body.extend_from_slice(&0_u32.to_le_bytes());
        body.extend_from_slice(&1_u32.to_le_bytes());
        body.extend_from_slice(&string_bytes("v"));
        body.extend_from_slice(&17_u16.to_le_bytes());
        body.extend_from_slice(&2_u32.to_le_bytes()); // two elements
        body.extend_from_slice(&0_u16.to_le_bytes()); // heterogeneous
        body.extend_from_slice(&5_u16.to_le_bytes());
        body.extend_from_slice(&9_u16.to_le_bytes());
        body.extend_from_slice(&13_u16.to_le_bytes());
        body.extend_from_slice(&string_bytes("x"));

        let ud = parse_user_data_chunk(&body).unwrap();
        let value = &ud.properties[0].properties["v"];
        assert_eq!(
            *value,
            PropertyValue::Vector(vec![
                PropertyValue::U16(9),
                PropertyValue::String("x".to_string()),
            ])
        );
    }

    #[test]
    fn homogeneous_vector_and_nested_properties() {
        let mut body = 4_u32.to_le_bytes().to_vec();
        body.extend_from_slice(&0_u32.to_le_bytes());
        body.extend_from_slice(&1_u32.to_le_bytes());
        body.extend_from_slice(&7_u32.to_le_bytes()); // extension map
        body.extend_from_slice(&2_u32.to_le_bytes());
        body.extend_from_slice(&string_bytes("ids"));
        body.extend_from_slice(&17_u16.to_le_bytes());
        body.extend_from_slice(&3_u32.to_le_bytes());
        body.extend_from_slice(&3_u16.to_le_bytes()); // all u8
        body.extend_from_slice(&[7, 8, 9]);
        body.extend_from_slice(&string_bytes("inner"));
        body.extend_from_slice(&18_u16.to_le_bytes());
        body.extend_from_slice(&1_u32.to_le_bytes());
        body.extend_from_slice(&string_bytes("pos"));
        body.extend_from_slice(&14_u16.to_le_bytes());
        body.extend_from_slice(&3_i32.to_le_bytes());
        body.extend_from_slice(&(-4_i32).to_le_bytes());

        let ud = parse_user_data_chunk(&body).unwrap();
        let map = &ud.properties[0];
        assert!(map.is_external());
        assert_eq!(
            map.properties["ids"],
            PropertyValue::Vector(vec![
                PropertyValue::U8(7),
                PropertyValue::U8(8),
                PropertyValue::U8(9),
            ])
        );
        match &map.properties["inner"] {
            PropertyValue::Properties(inner) => {
                assert_eq!(inner["pos"], PropertyValue::Point { x: 3, y: -4 });
            }
            other => panic!("expected nested properties, got {:?}", other),
        }
    }

    #[test]
    fn unknown_type_tag_is_an_error() {
        let mut body = 4_u32.to_le_bytes().to_vec();
        body.extend_from_slice(&0_u32.to_le_bytes());
        body.extend_from_slice(&1_u32.to_le_bytes());
        body.extend_from_slice(&0_u32.to_le_bytes());
        body.extend_from_slice(&1_u32.to_le_bytes());
        body.extend_from_slice(&string_bytes("k"));
        body.extend_from_slice(&20_u16.to_le_bytes());
        let err = parse_user_data_chunk(&body).unwrap_err();
        assert!(matches!(err, ParseError::InvariantViolation(_)));
    }
}
