use tracing::{Level, event};

use crate::problem::{Bounds, Category, LpProblem};
use crate::simplex::Solver;
use crate::solution::{Solution, SolutionStatus};

/// Distance from the nearest integer under which a value counts as integral
const INTEGRALITY_TOLERANCE: f64 = 1e-6;

impl Solver {
    /// Depth-first branch and bound over the integer variables.
    ///
    /// Each node is the continuous relaxation with tightened variable bounds.
    /// Nodes whose relaxation cannot beat the incumbent are pruned.
    ///
    /// A search cut short by the node limit, or by a node relaxation that
    /// stopped without a terminal status, is `NotSolved`. Its `values` hold
    /// the best integer point found, if any.
    pub(crate) fn branch_and_bound(&self, problem: &LpProblem) -> Solution {
        let minimize = problem.objective.minimize;
        let mut node_problem = problem.clone();
        let mut stack: Vec<Vec<Bounds>> = vec![problem.variables.iter().map(|v| v.bounds).collect()];
        let mut incumbent: Option<Solution> = None;
        let mut nodes = 0;
        let mut truncated = false;

        while let Some(bounds) = stack.pop() {
            if nodes == self.max_nodes() {
                event!(Level::WARN, max_nodes = self.max_nodes(), "branch and bound hit the node limit");
                truncated = true;
                break;
            }
            nodes += 1;

            for (variable, b) in node_problem.variables.iter_mut().zip(&bounds) {
                variable.bounds = *b;
            }

            let relaxed = self.solve_continuous(&node_problem);
            match relaxed.status {
                SolutionStatus::Optimal => {}
                SolutionStatus::Infeasible => continue,
                // An unbounded root relaxation leaves nothing to branch on
                SolutionStatus::Unbounded if nodes == 1 => return relaxed,
                SolutionStatus::Unbounded | SolutionStatus::NotSolved => {
                    event!(Level::WARN, node = nodes, status = %relaxed.status, "node relaxation left unsolved");
                    truncated = true;
                    continue;
                }
            }

            if let Some(best) = &incumbent {
                if !self.improves(minimize, relaxed.objective_value, best.objective_value) {
                    continue;
                }
            }

            match self.branching_variable(problem, &relaxed.values) {
                None => incumbent = Some(relaxed),
                Some(j) => {
                    let value = relaxed.values[j];

                    let mut down = bounds.clone();
                    down[j].upper = Some(value.floor());
                    let mut up = bounds;
                    up[j].lower = value.ceil();

                    // Explore the rounded-down branch first
                    stack.push(up);
                    stack.push(down);
                }
            }
        }

        event!(Level::DEBUG, nodes, found = incumbent.is_some(), truncated, "branch and bound finished");

        match incumbent {
            Some(mut solution) => {
                for (value, variable) in solution.values.iter_mut().zip(&problem.variables) {
                    if variable.category == Category::Integer {
                        *value = value.round();
                    }
                }
                solution.objective_value = problem.objective_value(&solution.values);
                if truncated {
                    solution.status = SolutionStatus::NotSolved;
                }
                solution
            }
            None if truncated => Solution::not_solved(),
            None => Solution::infeasible(),
        }
    }

    fn improves(&self, minimize: bool, candidate: f64, best: f64) -> bool {
        let margin = self.tolerance().max(INTEGRALITY_TOLERANCE) * (1.0 + best.abs());
        if minimize {
            candidate < best - margin
        } else {
            candidate > best + margin
        }
    }

    /// The integer variable whose value is furthest from an integer, if any
    fn branching_variable(&self, problem: &LpProblem, values: &[f64]) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (j, (variable, &value)) in problem.variables.iter().zip(values).enumerate() {
            if variable.category != Category::Integer {
                continue;
            }
            let fraction = value - value.floor();
            let distance = fraction.min(1.0 - fraction);
            if distance > INTEGRALITY_TOLERANCE && best.is_none_or(|(_, d)| distance > d) {
                best = Some((j, distance));
            }
        }
        best.map(|(j, _)| j)
    }
}

#[cfg(test)]
mod tests {
    use crate::problem::{Category, ConstraintOp, LpProblem, Variable};
    use crate::simplex::Solver;
    use crate::solution::SolutionStatus;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_integer_knapsack() {
        // Maximize 5x + 4y
        // Subject to:
        //   6x + 4y <= 24
        //   x + 2y <= 6
        // LP optimum is x=3, y=1.5 (21); integer optimum is x=4, y=0 (20)
        let solution = Solver::new().solve(&knapsack());

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert_abs_diff_eq!(solution.objective_value, 20.0, epsilon = 1e-6);
        assert_abs_diff_eq!(solution.values[0], 4.0, epsilon = 1e-9);
        assert_abs_diff_eq!(solution.values[1], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_mixed_integer_minimization() {
        // Minimize 3x + 2y with x integer, y continuous
        //   x + y >= 2.5
        //   y <= 1
        // Optimal: x=2, y=0.5 (7)
        let mut problem = LpProblem::new(vec![
            Variable::new("x").with_category(Category::Integer),
            Variable::new("y"),
        ]);
        problem.set_objective(vec![3.0, 2.0], true);
        problem.add_constraint("cover", vec![1.0, 1.0], ConstraintOp::Ge, 2.5);
        problem.add_constraint("y_max", vec![0.0, 1.0], ConstraintOp::Le, 1.0);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert_abs_diff_eq!(solution.values[0], 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(solution.values[1], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(solution.objective_value, 7.0, epsilon = 1e-6);
    }

    #[test]
    fn test_integer_infeasible() {
        // 2x = 1 has no integer solution
        let mut problem = LpProblem::new(vec![Variable::new("x").with_category(Category::Integer)]);
        problem.set_objective(vec![1.0], true);
        problem.add_constraint("half", vec![2.0], ConstraintOp::Eq, 1.0);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Infeasible);
    }

    fn knapsack() -> LpProblem {
        let mut problem = LpProblem::new(vec![
            Variable::new("x").with_category(Category::Integer),
            Variable::new("y").with_category(Category::Integer),
        ]);
        problem.set_objective(vec![5.0, 4.0], false);
        problem.add_constraint("c1", vec![6.0, 4.0], ConstraintOp::Le, 24.0);
        problem.add_constraint("c2", vec![1.0, 2.0], ConstraintOp::Le, 6.0);
        problem
    }

    #[test]
    fn test_node_limit_is_not_optimal() {
        // the third node finds (3, 1) worth 19, short of the optimum 20
        let solution = Solver::new().with_max_nodes(3).solve(&knapsack());

        assert_eq!(solution.status, SolutionStatus::NotSolved);
        assert_eq!(solution.values, vec![3.0, 1.0]);
        assert_abs_diff_eq!(solution.objective_value, 19.0, epsilon = 1e-6);

        let solution = Solver::new().with_max_nodes(0).solve(&knapsack());
        assert_eq!(solution.status, SolutionStatus::NotSolved);
        assert!(solution.values.is_empty());
    }

    #[test]
    fn test_unsolved_child_is_not_infeasible() {
        // maximize x + y, x integer, x + y <= 2.5
        // the root takes two simplex iterations, the x <= 2 child three
        let mut problem = LpProblem::new(vec![Variable::new("x").with_category(Category::Integer), Variable::new("y")]);
        problem.set_objective(vec![1.0, 1.0], false);
        problem.add_constraint("cap", vec![1.0, 1.0], ConstraintOp::Le, 2.5);

        let solution = Solver::new().with_max_iterations(2).solve(&problem);
        assert_eq!(solution.status, SolutionStatus::NotSolved);

        let solution = Solver::new().solve(&problem);
        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert_abs_diff_eq!(solution.objective_value, 2.5, epsilon = 1e-6);
        assert_abs_diff_eq!(solution.values[0], 2.0, epsilon = 1e-9);
    }
}
