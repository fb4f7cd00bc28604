pub mod headless;
pub mod surface;

pub use headless::*;
pub use surface::*;
