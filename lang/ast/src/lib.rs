mod ident;
mod node;
mod print;
mod span;

pub use ident::*;
pub use node::*;
pub use span::*;
