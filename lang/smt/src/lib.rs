//! The constraint oracle.
//!
//! The checker talks to the oracle exclusively through [`Solver`]: it asserts
//! one quantified [`Term`] and asks for satisfiability. The bundled
//! [`LinearSolver`] decides the fragment the checker actually emits (prenex
//! `forall`/`exists` over disjunctions of conjunctions of linear integer
//! equalities and boolean constraints) and answers [`SmtResult::Unknown`] for
//! everything else.

mod linear;
mod solver;
mod term;

pub use linear::LinearSolver;
pub use solver::*;
pub use term::*;

/// Builds the default oracle.
pub fn make_solver() -> LinearSolver {
    LinearSolver::new()
}
