mod exp;
mod fresh;
mod print;
mod subst;
mod typ;
mod unify;

pub use exp::*;
pub use fresh::*;
pub use subst::*;
pub use typ::*;
pub use unify::*;
