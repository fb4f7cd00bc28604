pub mod registry;
pub mod transport;

pub use registry::*;
pub use transport::*;
