// Model endpoint abstraction

pub mod provider;
pub mod openai;

pub use provider::*;
pub use crate::types::*;
