mod branch;
mod problem;
mod simplex;
mod solution;

pub use problem::{Bounds, Category, Constraint, ConstraintOp, LpProblem, Objective, UnknownCategory, Variable};
pub use simplex::Solver;
pub use solution::{Solution, SolutionStatus};

/// A linear/integer programming backend.
///
/// Implementations must honour variable bounds and categories, and return a
/// terminal status. Values are only meaningful when the status is
/// [`SolutionStatus::Optimal`].
pub trait LpSolver {
    fn solve(&self, problem: &LpProblem) -> Solution;
}

impl<T: LpSolver + ?Sized> LpSolver for &T {
    fn solve(&self, problem: &LpProblem) -> Solution {
        (**self).solve(problem)
    }
}
