//! Individual normalization stages

pub mod contrast;
pub mod deskew;
pub mod grayscale;
pub mod resize;
pub mod skew;
pub mod threshold;
