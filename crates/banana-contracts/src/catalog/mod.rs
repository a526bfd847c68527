mod aspect_ratio;
mod styles;

pub use aspect_ratio::AspectRatio;
pub use styles::{StyleCatalog, StyleOption, StyleSelection, NO_STYLE_ID};
