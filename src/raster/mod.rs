pub mod load;
pub mod mask;
pub mod opaque;

pub use load::{Raster, load_raster};
pub use mask::Mask;
