pub mod config;
pub mod errors;
pub mod messages;
pub mod types;

pub use config::ShowcaseConfig;
pub use errors::{MotionError, ShowcaseError, TransportError};
pub use messages::*;
pub use types::*;
