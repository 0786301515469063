pub use pretty::DocAllocator;
pub use pretty::termcolor;
pub use pretty::termcolor::ColorSpec;

pub mod tokens;
mod types;

pub use types::*;

pub const DEFAULT_WIDTH: usize = 100;
