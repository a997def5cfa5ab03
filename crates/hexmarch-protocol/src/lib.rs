mod hex;
mod ids;
mod types;

pub use crate::hex::*;
pub use crate::ids::*;
pub use crate::types::*;
