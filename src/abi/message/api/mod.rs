mod data;
mod params;

pub use data::*;
pub use params::*;
