//! Request handlers.

pub mod health;
pub mod notifications;
pub mod status;
pub mod upload;

pub use health::*;
pub use notifications::*;
pub use status::*;
pub use upload::*;
