pub mod animator;
pub mod events;
pub mod resolver;
pub mod session;
pub mod state;

pub use animator::*;
pub use events::*;
pub use resolver::*;
pub use session::*;
pub use state::*;
