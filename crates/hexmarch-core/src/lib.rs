mod cache;
mod context;
mod cost;
mod executor;
mod map;
mod pathfinder;
mod rules;
mod unit;
mod world;

pub use crate::cache::*;
pub use crate::context::*;
pub use crate::cost::*;
pub use crate::executor::*;
pub use crate::map::*;
pub use crate::pathfinder::*;
pub use crate::rules::*;
pub use crate::unit::*;
pub use crate::world::*;
