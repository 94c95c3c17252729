use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Represents a linear (or mixed-integer) programming problem
#[derive(Debug, Clone, Default)]
pub struct LpProblem {
    /// Decision variables, in column order
    pub variables: Vec<Variable>,
    /// Objective function coefficients
    pub objective: Objective,
    /// Constraints
    pub constraints: Vec<Constraint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub bounds: Bounds,
    pub category: Category,
}

/// Lower and upper bound of a variable. `upper: None` means unbounded above.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub lower: f64,
    pub upper: Option<f64>,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            lower: 0.0,
            upper: None,
        }
    }
}

impl Bounds {
    pub fn new(lower: f64, upper: Option<f64>) -> Self {
        Self { lower, upper }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Category {
    #[default]
    Continuous,
    Integer,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown variable category '{0}', expected 'Continuous' or 'Integer'")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continuous" => Ok(Category::Continuous),
            "integer" => Ok(Category::Integer),
            _ => Err(UnknownCategory(s.to_string())),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Continuous => write!(f, "Continuous"),
            Category::Integer => write!(f, "Integer"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Objective {
    /// Coefficients for each variable
    pub coefficients: Vec<f64>,
    /// Whether to minimize or maximize
    pub minimize: bool,
}

#[derive(Debug, Clone)]
pub struct Constraint {
    /// Name/label for the constraint (for diagnostics)
    pub name: String,
    /// Coefficients for each variable
    pub coefficients: Vec<f64>,
    /// Comparison operator
    pub op: ConstraintOp,
    /// Right-hand side value
    pub rhs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintOp {
    /// Less than or equal (<=)
    Le,
    /// Greater than or equal (>=)
    Ge,
    /// Equal (=)
    Eq,
}

impl ConstraintOp {
    /// The operator obtained by multiplying both sides by -1
    pub fn flipped(self) -> Self {
        match self {
            ConstraintOp::Le => ConstraintOp::Ge,
            ConstraintOp::Ge => ConstraintOp::Le,
            ConstraintOp::Eq => ConstraintOp::Eq,
        }
    }
}

impl Variable {
    /// A continuous variable bounded to `[0, inf)`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bounds: Bounds::default(),
            category: Category::Continuous,
        }
    }

    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }
}

impl LpProblem {
    pub fn new(variables: Vec<Variable>) -> Self {
        let n = variables.len();
        Self {
            variables,
            objective: Objective {
                coefficients: vec![0.0; n],
                minimize: true,
            },
            constraints: Vec::new(),
        }
    }

    /// Append a variable and return its column index.
    ///
    /// The objective and every existing constraint get a zero coefficient
    /// for the new column.
    pub fn add_variable(&mut self, variable: Variable) -> usize {
        self.variables.push(variable);
        self.objective.coefficients.push(0.0);
        for c in &mut self.constraints {
            c.coefficients.push(0.0);
        }
        self.variables.len() - 1
    }

    pub fn set_objective(&mut self, coefficients: Vec<f64>, minimize: bool) {
        self.objective = Objective { coefficients, minimize };
    }

    pub fn add_constraint(&mut self, name: impl Into<String>, coefficients: Vec<f64>, op: ConstraintOp, rhs: f64) {
        self.constraints.push(Constraint {
            name: name.into(),
            coefficients,
            op,
            rhs,
        });
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn has_integer_variables(&self) -> bool {
        self.variables.iter().any(|v| v.category == Category::Integer)
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(|v| v.name.as_str())
    }

    /// Evaluate the objective at the given point
    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.objective
            .coefficients
            .iter()
            .zip(values)
            .map(|(c, x)| c * x)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_variable_pads_existing_rows() {
        let mut problem = LpProblem::new(vec![Variable::new("x")]);
        problem.set_objective(vec![2.0], true);
        problem.add_constraint("c", vec![1.0], ConstraintOp::Ge, 1.0);

        let idx = problem.add_variable(Variable::new("y").with_category(Category::Integer));

        assert_eq!(idx, 1);
        assert_eq!(problem.objective.coefficients, vec![2.0, 0.0]);
        assert_eq!(problem.constraints[0].coefficients, vec![1.0, 0.0]);
        assert!(problem.has_integer_variables());
        assert_eq!(problem.variable_names().collect::<Vec<_>>(), vec!["x", "y"]);
    }

    #[test]
    fn test_category_from_str() {
        assert_eq!("Continuous".parse::<Category>(), Ok(Category::Continuous));
        assert_eq!("integer".parse::<Category>(), Ok(Category::Integer));
        assert!("binary".parse::<Category>().is_err());
    }
}
