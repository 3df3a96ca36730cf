#![warn(clippy::all)]
#![warn(missing_docs)]
/*!

Utilities for loading [Aseprite](https://www.aseprite.org/) files. This
library directly reads the binary Aseprite files ([file format
specification][spec]) into a document model and does not require you to
export files to JSON first.

[spec]: https://github.com/aseprite/aseprite/blob/master/docs/ase-file-specs.md

# Basic Usage

## Load a file

The easiest way is to use [Document::read_file] to load a file.

```no_run
use asedoc::Document;
# use std::path::Path;
let doc = Document::read_file(Path::new("player.aseprite")).unwrap();

println!("Size: {}x{}", doc.width(), doc.height());
println!("Frames: {}", doc.num_frames());
println!("Layers: {}", doc.num_layers());
```

To parse bytes you already have in memory, use [parse] or
[Document::read] with anything that implements `std::io::Read`.

## Compose images

Aseprite files consist of layers of cels. Usually you just want the
final image of a frame. [Frame::image] blends all cels of the frame,
bottom layer first, and returns an `image::RgbaImage` from the
[image](https://docs.rs/image) library.

```no_run
# use asedoc::Document;
# use std::path::Path;
# let doc = Document::read_file(Path::new("player.aseprite")).unwrap();
let frame = doc.frame(0).image();
let sheet = doc.sprite_sheet();
let layer = doc.layer_by_name("outline").unwrap().frame_image(0);
```

## Tags, slices, user data

Animation tags, slices and the palette are exposed on [Document];
free-form user data sits on the entity it annotates:

```no_run
# use asedoc::Document;
# use std::path::Path;
# let doc = Document::read_file(Path::new("player.aseprite")).unwrap();
for tag in doc.tags() {
    println!(
        "{}: frames {}-{} {:?}",
        tag.name(),
        tag.from_frame(),
        tag.to_frame(),
        tag.user_data().and_then(|d| d.text.as_deref()),
    );
}
```

*/

pub(crate) mod blend;
pub(crate) mod cel;
pub(crate) mod color_profile;
pub(crate) mod document;
pub(crate) mod error;
pub(crate) mod external_file;
pub(crate) mod fixed;
pub(crate) mod layer;
pub(crate) mod palette;
pub(crate) mod parse;
pub(crate) mod pixel;
pub(crate) mod reader;
pub(crate) mod slice;
pub(crate) mod tags;
pub(crate) mod tilemap;
pub(crate) mod tileset;
pub(crate) mod user_data;

/// A specialized `Result` type for Aseprite parsing functions.
pub type Result<T> = std::result::Result<T, ParseError>;

pub use cel::{Cel, CelExtra};
pub use color_profile::{ColorProfile, ColorProfileKind};
pub use document::{Document, Frame, Grid};
pub use error::ParseError;
pub use external_file::{ExternalFileEntry, ExternalFileId, ExternalFiles};
pub use fixed::Fixed;
pub use layer::{BlendMode, Layer, LayerFlags, LayerGroup, LayerKind};
pub use palette::{Palette, PaletteEntry};
pub use parse::parse;
pub use pixel::PixelFormat;
pub use slice::{NinePatch, Slice, SliceKey};
pub use tags::{LoopMode, Tag};
pub use tilemap::TilemapData;
pub use tileset::{ExternalTilesetRef, Tileset, TilesetId, TilesetsById};
pub use user_data::{PropertyMap, PropertyValue, UserData};
