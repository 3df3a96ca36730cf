use crate::reader::AseReader;
use crate::Result;

/// Id of an entry in the external files chunk.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct ExternalFileId(u32);

impl ExternalFileId {
    pub(crate) fn new(id: u32) -> Self {
        Self(id)
    }

    /// The raw id value.
    pub fn value(&self) -> u32 {
        self.0
    }
}

/// One entry of the external files chunk: a file the document references
/// by id (external palettes, tilesets, or extensions that store
/// properties).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalFileEntry {
    id: ExternalFileId,
    kind: u8,
    name: String,
}

impl ExternalFileEntry {
    /// The id other chunks use to reference this entry.
    pub fn id(&self) -> ExternalFileId {
        self.id
    }

    /// Entry kind as stored in the file (0 palette, 1 tileset, 2
    /// extension properties, 3 extension tile management).
    pub fn kind(&self) -> u8 {
        self.kind
    }

    /// File name or extension id.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// The ordered entries of the external files chunk (0x2008).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalFiles {
    entries: Vec<ExternalFileEntry>,
}

impl ExternalFiles {
    /// The entries in file order.
    pub fn entries(&self) -> &[ExternalFileEntry] {
        &self.entries
    }

    /// Whether the document references no external files.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by id.
    pub fn get(&self, id: ExternalFileId) -> Option<&ExternalFileEntry> {
        self.entries.iter().find(|e| e.id == id)
    }
}

/// Parse an external files chunk (0x2008).
pub(crate) fn parse_external_files_chunk(data: &[u8]) -> Result<ExternalFiles> {
    let mut reader = AseReader::new(data);
    let entry_count = reader.dword()?;
    reader.skip_reserved(8)?;
    let mut entries = Vec::with_capacity(entry_count as usize);
    for _ in 0..entry_count {
        let id = ExternalFileId::new(reader.dword()?);
        let kind = reader.byte()?;
        reader.skip_reserved(7)?;
        let name = reader.string()?;
        entries.push(ExternalFileEntry { id, kind, name });
    }
    Ok(ExternalFiles { entries })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ordered_entries() {
        let mut body = Vec::new();
        body.extend_from_slice(&2_u32.to_le_bytes());
        body.extend_from_slice(&[0; 8]);
        for (id, kind, name) in [(4_u32, 1_u8, "tiles.aseprite"), (9, 2, "ext/id")] {
            body.extend_from_slice(&id.to_le_bytes());
            body.push(kind);
            body.extend_from_slice(&[0; 7]);
            body.extend_from_slice(&(name.len() as u16).to_le_bytes());
            body.extend_from_slice(name.as_bytes());
        }
        let files = parse_external_files_chunk(&body).unwrap();
        assert_eq!(files.entries().len(), 2);
        assert_eq!(files.entries()[0].name(), "tiles.aseprite");
        let entry = files.get(ExternalFileId::new(9)).unwrap();
        assert_eq!(entry.kind(), 2);
    }
}
