pub mod address;
pub mod config;
pub mod geometry;

pub use address::*;
pub use config::*;
pub use geometry::*;
