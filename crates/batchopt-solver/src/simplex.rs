use tracing::{Level, event};

use crate::LpSolver;
use crate::problem::{ConstraintOp, LpProblem};
use crate::solution::Solution;

/// Consecutive degenerate pivots tolerated before switching to Bland's rule
const DEGENERATE_PIVOT_LIMIT: usize = 50;

/// Relative tolerance used to decide whether phase 1 reached a feasible point
const FEASIBILITY_TOLERANCE: f64 = 1e-7;

/// Simplex solver for linear programming problems.
///
/// Integer variables are handled by branch and bound on top of the
/// continuous relaxation (see `branch.rs`).
#[derive(Debug, Clone)]
pub struct Solver {
    /// Maximum simplex iterations per phase before giving up
    max_iterations: usize,
    /// Tolerance for floating point comparisons
    tolerance: f64,
    /// Maximum branch-and-bound nodes explored for integer problems
    max_nodes: usize,
}

impl Default for Solver {
    fn default() -> Self {
        Self {
            max_iterations: 10000,
            tolerance: 1e-9,
            max_nodes: 10000,
        }
    }
}

impl LpSolver for Solver {
    fn solve(&self, problem: &LpProblem) -> Solution {
        Solver::solve(self, problem)
    }
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    pub fn with_max_nodes(mut self, max: usize) -> Self {
        self.max_nodes = max;
        self
    }

    pub(crate) fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub(crate) fn max_nodes(&self) -> usize {
        self.max_nodes
    }

    /// Solve the problem, branching on integer variables if there are any
    pub fn solve(&self, problem: &LpProblem) -> Solution {
        if problem.has_integer_variables() {
            self.branch_and_bound(problem)
        } else {
            self.solve_continuous(problem)
        }
    }

    /// Solve the continuous relaxation using the two-phase simplex method
    pub(crate) fn solve_continuous(&self, problem: &LpProblem) -> Solution {
        let Some(rows) = self.standard_rows(problem) else {
            return Solution::infeasible();
        };

        let mut tableau = self.build_tableau(problem, &rows);

        // Phase 1: Find initial basic feasible solution
        if tableau.n_artificial > 0 {
            let rhs_scale = rows.iter().fold(0.0_f64, |acc, r| acc.max(r.rhs.abs()));
            match self.phase1(&mut tableau, rhs_scale) {
                Phase1Result::Feasible => {}
                Phase1Result::Infeasible => return Solution::infeasible(),
                Phase1Result::IterationLimit => {
                    event!(Level::WARN, iterations = self.max_iterations, "simplex phase 1 hit the iteration limit");
                    return Solution::not_solved();
                }
            }
        }

        // Phase 2: Optimize
        let exclude_from = tableau.n_vars + tableau.n_slack;
        match self.optimize(&mut tableau, exclude_from) {
            SimplexResult::Optimal => {}
            SimplexResult::Unbounded => return Solution::unbounded(),
            SimplexResult::IterationLimit => {
                event!(Level::WARN, iterations = self.max_iterations, "simplex phase 2 hit the iteration limit");
                return Solution::not_solved();
            }
        }

        self.extract_solution(&tableau, problem)
    }

    /// Rewrite the constraints for variables shifted to `y = x - lower >= 0`.
    ///
    /// Finite upper bounds become `<=` rows and every row ends up with a
    /// non-negative right-hand side. Returns `None` when some variable has
    /// an empty bound interval.
    fn standard_rows(&self, problem: &LpProblem) -> Option<Vec<Row>> {
        let n_vars = problem.num_variables();
        let lowers: Vec<f64> = problem.variables.iter().map(|v| v.bounds.lower).collect();

        let mut rows = Vec::with_capacity(problem.num_constraints() + n_vars);

        for c in &problem.constraints {
            let shift: f64 = c.coefficients.iter().zip(&lowers).map(|(a, l)| a * l).sum();
            let mut coefficients = vec![0.0; n_vars];
            for (j, &coef) in c.coefficients.iter().enumerate().take(n_vars) {
                coefficients[j] = coef;
            }
            rows.push(Row {
                coefficients,
                op: c.op,
                rhs: c.rhs - shift,
            });
        }

        for (j, v) in problem.variables.iter().enumerate() {
            if let Some(upper) = v.bounds.upper {
                let width = upper - v.bounds.lower;
                if width < -self.tolerance {
                    return None;
                }
                let mut coefficients = vec![0.0; n_vars];
                coefficients[j] = 1.0;
                rows.push(Row {
                    coefficients,
                    op: ConstraintOp::Le,
                    rhs: width.max(0.0),
                });
            }
        }

        for row in &mut rows {
            if row.rhs < 0.0 {
                row.rhs = -row.rhs;
                row.op = row.op.flipped();
                for coef in &mut row.coefficients {
                    *coef = -*coef;
                }
            }
        }

        Some(rows)
    }

    fn build_tableau(&self, problem: &LpProblem, rows: &[Row]) -> Tableau {
        let n_vars = problem.num_variables();
        let n_constraints = rows.len();

        // Count slack and artificial variables needed
        let mut n_slack = 0;
        let mut n_artificial = 0;

        for r in rows {
            match r.op {
                ConstraintOp::Le => n_slack += 1,
                ConstraintOp::Ge => {
                    n_slack += 1; // surplus
                    n_artificial += 1;
                }
                ConstraintOp::Eq => n_artificial += 1,
            }
        }

        let total_cols = n_vars + n_slack + n_artificial + 1; // +1 for RHS
        let total_rows = n_constraints + 1; // +1 for objective

        let mut tableau = Tableau {
            data: vec![vec![0.0; total_cols]; total_rows],
            basic_vars: vec![0; n_constraints],
            n_vars,
            n_slack,
            n_artificial,
        };

        let mut slack_idx = n_vars;
        let mut artificial_idx = n_vars + n_slack;

        for (i, r) in rows.iter().enumerate() {
            tableau.data[i][..n_vars].copy_from_slice(&r.coefficients);
            tableau.data[i][total_cols - 1] = r.rhs;

            match r.op {
                ConstraintOp::Le => {
                    tableau.data[i][slack_idx] = 1.0;
                    tableau.basic_vars[i] = slack_idx;
                    slack_idx += 1;
                }
                ConstraintOp::Ge => {
                    tableau.data[i][slack_idx] = -1.0; // surplus
                    slack_idx += 1;
                    tableau.data[i][artificial_idx] = 1.0;
                    tableau.basic_vars[i] = artificial_idx;
                    artificial_idx += 1;
                }
                ConstraintOp::Eq => {
                    tableau.data[i][artificial_idx] = 1.0;
                    tableau.basic_vars[i] = artificial_idx;
                    artificial_idx += 1;
                }
            }
        }

        // The simplex maximizes, so minimization objectives are negated
        let obj_row = n_constraints;
        for (j, &coef) in problem.objective.coefficients.iter().enumerate().take(n_vars) {
            tableau.data[obj_row][j] = if problem.objective.minimize { -coef } else { coef };
        }

        tableau
    }

    fn phase1(&self, tableau: &mut Tableau, rhs_scale: f64) -> Phase1Result {
        let n_constraints = tableau.data.len() - 1;
        let n_cols = tableau.data[0].len();
        let art_start = tableau.n_vars + tableau.n_slack;

        let orig_obj = tableau.data[n_constraints].clone();

        // Maximize -sum(artificials)
        tableau.data[n_constraints].iter_mut().for_each(|v| *v = 0.0);
        for j in art_start..(art_start + tableau.n_artificial) {
            tableau.data[n_constraints][j] = -1.0;
        }

        // Price out the basic artificials
        for i in 0..n_constraints {
            if tableau.basic_vars[i] >= art_start {
                for j in 0..n_cols {
                    tableau.data[n_constraints][j] += tableau.data[i][j];
                }
            }
        }

        match self.optimize(tableau, n_cols - 1) {
            SimplexResult::Optimal => {}
            // Phase 1 is bounded by zero, an unbounded ray means the tableau degenerated
            SimplexResult::Unbounded => return Phase1Result::Infeasible,
            SimplexResult::IterationLimit => return Phase1Result::IterationLimit,
        }

        let rhs_col = n_cols - 1;
        let threshold = FEASIBILITY_TOLERANCE * (1.0 + rhs_scale);
        for i in 0..n_constraints {
            if tableau.basic_vars[i] >= art_start && tableau.data[i][rhs_col].abs() > threshold {
                return Phase1Result::Infeasible;
            }
        }

        self.drive_out_artificials(tableau);

        // Restore original objective and price out the basic variables
        tableau.data[n_constraints] = orig_obj;
        for i in 0..n_constraints {
            let basic = tableau.basic_vars[i];
            let ratio = tableau.data[n_constraints][basic];
            if ratio.abs() > self.tolerance {
                for j in 0..n_cols {
                    tableau.data[n_constraints][j] -= ratio * tableau.data[i][j];
                }
            }
        }

        Phase1Result::Feasible
    }

    /// Pivot zero-level artificials out of the basis so phase 2 never moves them.
    /// Rows with no eligible column are redundant and keep their artificial.
    fn drive_out_artificials(&self, tableau: &mut Tableau) {
        let n_constraints = tableau.data.len() - 1;
        let art_start = tableau.n_vars + tableau.n_slack;

        for i in 0..n_constraints {
            if tableau.basic_vars[i] < art_start {
                continue;
            }
            let col = (0..art_start).find(|&j| tableau.data[i][j].abs() > self.tolerance.sqrt());
            if let Some(col) = col {
                self.pivot(tableau, i, col);
            }
        }
    }

    /// Run simplex iterations over the columns `0..n_cols`
    fn optimize(&self, tableau: &mut Tableau, n_cols: usize) -> SimplexResult {
        let rhs_col = tableau.data[0].len() - 1;
        let mut degenerate_streak = 0;

        for _ in 0..self.max_iterations {
            let bland = degenerate_streak > DEGENERATE_PIVOT_LIMIT;
            let Some(pivot_col) = self.find_pivot_column(tableau, n_cols, bland) else {
                return SimplexResult::Optimal;
            };
            let Some(pivot_row) = self.find_pivot_row(tableau, pivot_col, bland) else {
                return SimplexResult::Unbounded;
            };
            if tableau.data[pivot_row][rhs_col].abs() <= self.tolerance {
                degenerate_streak += 1;
            } else {
                degenerate_streak = 0;
            }
            self.pivot(tableau, pivot_row, pivot_col);
        }
        SimplexResult::IterationLimit
    }

    fn find_pivot_column(&self, tableau: &Tableau, n_cols: usize, bland: bool) -> Option<usize> {
        let obj = &tableau.data[tableau.data.len() - 1];

        if bland {
            return (0..n_cols).find(|&j| obj[j] > self.tolerance);
        }

        // Most positive reduced cost
        let mut max_val = self.tolerance;
        let mut max_col = None;
        for (j, &val) in obj.iter().enumerate().take(n_cols) {
            if val > max_val {
                max_val = val;
                max_col = Some(j);
            }
        }
        max_col
    }

    fn find_pivot_row(&self, tableau: &Tableau, col: usize, bland: bool) -> Option<usize> {
        let n_constraints = tableau.data.len() - 1;
        let rhs_col = tableau.data[0].len() - 1;

        let mut min_ratio = f64::INFINITY;
        let mut min_row: Option<usize> = None;

        for i in 0..n_constraints {
            let val = tableau.data[i][col];
            if val <= self.tolerance {
                continue;
            }
            let ratio = (tableau.data[i][rhs_col] / val).max(0.0);
            let better = match min_row {
                None => true,
                Some(current) if bland && (ratio - min_ratio).abs() <= self.tolerance => {
                    tableau.basic_vars[i] < tableau.basic_vars[current]
                }
                Some(_) => ratio < min_ratio - self.tolerance,
            };
            if better {
                min_ratio = ratio;
                min_row = Some(i);
            }
        }

        min_row
    }

    fn pivot(&self, tableau: &mut Tableau, row: usize, col: usize) {
        let n_rows = tableau.data.len();
        let n_cols = tableau.data[0].len();

        tableau.basic_vars[row] = col;

        let pivot_val = tableau.data[row][col];
        for j in 0..n_cols {
            tableau.data[row][j] /= pivot_val;
        }

        let pivot_row = tableau.data[row].clone();
        for (i, data_row) in tableau.data.iter_mut().enumerate().take(n_rows) {
            if i == row {
                continue;
            }
            let factor = data_row[col];
            if factor != 0.0 {
                for (cell, p) in data_row.iter_mut().zip(&pivot_row) {
                    *cell -= factor * p;
                }
            }
        }
    }

    fn extract_solution(&self, tableau: &Tableau, problem: &LpProblem) -> Solution {
        let n_vars = problem.num_variables();
        let rhs_col = tableau.data[0].len() - 1;

        let mut shifted = vec![0.0; n_vars];
        for (i, &basic) in tableau.basic_vars.iter().enumerate() {
            if basic < n_vars {
                shifted[basic] = tableau.data[i][rhs_col];
            }
        }

        let values: Vec<f64> = problem
            .variables
            .iter()
            .zip(shifted)
            .map(|(v, y)| {
                let y = if y <= self.tolerance { 0.0 } else { y };
                v.bounds.lower + y
            })
            .collect();

        let objective_value = problem.objective_value(&values);
        Solution::optimal(values, objective_value)
    }
}

/// A constraint row in standard form over the shifted variables
struct Row {
    coefficients: Vec<f64>,
    op: ConstraintOp,
    rhs: f64,
}

struct Tableau {
    data: Vec<Vec<f64>>,
    basic_vars: Vec<usize>,
    n_vars: usize,
    n_slack: usize,
    n_artificial: usize,
}

enum SimplexResult {
    Optimal,
    Unbounded,
    IterationLimit,
}

enum Phase1Result {
    Feasible,
    Infeasible,
    IterationLimit,
}
