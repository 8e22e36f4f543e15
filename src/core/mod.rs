pub mod config;
pub mod error;
pub mod types;
pub mod value;

pub use config::{KernelConfig, ReverseIndexPolicy};
pub use error::{ErrorCategory, ErrorKind, KernelError, Result};
pub use types::*;
pub use value::{PropertyValue, ValueType};
