pub mod achievement;
pub mod behavior;
pub mod config;
pub mod error;

pub use achievement::*;
pub use behavior::*;
pub use config::Config;
pub use error::*;
