mod anno;
mod checker;
mod context;
mod pattern;
mod result;
pub mod rules;
mod verify;

pub use anno::*;
pub use checker::*;
pub use context::*;
pub use pattern::*;
pub use result::*;
pub use verify::*;
