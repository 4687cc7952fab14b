//! Glyph outline handling: the WOFF2 glyf transform in both directions and
//! canonical sfnt glyf/loca serialization.

mod decode;
mod encode;
mod glyph;
mod sfnt;
mod triplet;

pub use decode::{TransformedGlyf, decode_glyf};
pub use encode::encode_glyf;
pub use glyph::{BoundingBox, CompositeGlyph, Glyph, Point, SimpleGlyph};
pub use sfnt::{GlyfLoca, LocaFormat, read_glyf, read_loca, write_glyf};
pub use triplet::{decode_points, encode_points};
