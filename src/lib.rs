#![forbid(unsafe_code)]

pub mod blur;
pub mod compose;
pub mod composite;
pub mod error;
pub mod filter;
pub mod model;
pub mod palette;
pub mod sticker;
pub mod template;
pub mod text;

pub use compose::{compose, encode_png, render_canvas};
pub use error::{MoodpaperError, MoodpaperResult};
pub use filter::FilterKind;
pub use model::{ComposeRequest, Rgb, SourceImage, StickerOptions, TitleOptions};
pub use palette::{Palette, extract_palette};
pub use sticker::{OccupancyGrid, Placement};
pub use template::{CANVAS_HEIGHT, CANVAS_WIDTH, Slot, Template, TemplateKind};
