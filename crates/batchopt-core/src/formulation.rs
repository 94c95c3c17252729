//! Pieces shared by the expense and earnings formulations.

use batchopt_solver::{Bounds, Category, ConstraintOp, LpProblem, Variable};
use indexmap::IndexMap;
use tracing::{Level, event};

use crate::error::OptimizeError;

/// Variable categories: one for every variable, or one per variable name.
/// Names missing from the map are continuous.
#[derive(Debug, Clone, PartialEq)]
pub enum Categories {
    Uniform(Category),
    ByName(IndexMap<String, Category>),
}

impl Default for Categories {
    fn default() -> Self {
        Categories::Uniform(Category::Continuous)
    }
}

impl From<Category> for Categories {
    fn from(category: Category) -> Self {
        Categories::Uniform(category)
    }
}

impl From<IndexMap<String, Category>> for Categories {
    fn from(categories: IndexMap<String, Category>) -> Self {
        Categories::ByName(categories)
    }
}

impl Categories {
    pub fn category_of(&self, name: &str) -> Category {
        match self {
            Categories::Uniform(category) => *category,
            Categories::ByName(map) => map.get(name).copied().unwrap_or_default(),
        }
    }
}

/// Optional lower and upper limits on the objective total
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TotalBounds {
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
}

impl TotalBounds {
    pub fn new(minimum: Option<f64>, maximum: Option<f64>) -> Self {
        Self { minimum, maximum }
    }

    /// Reject `maximum < minimum`; `quantity` names the total in the error
    pub fn check(&self, quantity: &'static str) -> Result<(), OptimizeError> {
        if let (Some(minimum), Some(maximum)) = (self.minimum, self.maximum) {
            if maximum < minimum {
                return Err(OptimizeError::ContradictoryBounds {
                    quantity,
                    minimum,
                    maximum,
                });
            }
        }
        Ok(())
    }

    /// Add `coefficients · x >= minimum` and `<= maximum` rows for the set limits
    pub(crate) fn add_to(&self, lp: &mut LpProblem, quantity: &str, coefficients: &[f64]) {
        if let Some(minimum) = self.minimum {
            lp.add_constraint(format!("{quantity}_min"), coefficients.to_vec(), ConstraintOp::Ge, minimum);
        }
        if let Some(maximum) = self.maximum {
            lp.add_constraint(format!("{quantity}_max"), coefficients.to_vec(), ConstraintOp::Le, maximum);
        }
    }
}

/// Build one decision variable per name, with bounds and category overrides
pub(crate) fn variables<'a>(
    names: impl IntoIterator<Item = &'a str>,
    categories: &Categories,
    bounds: &IndexMap<String, Bounds>,
) -> Vec<Variable> {
    let variables: Vec<Variable> = names
        .into_iter()
        .map(|name| {
            Variable::new(name)
                .with_bounds(bounds.get(name).copied().unwrap_or_default())
                .with_category(categories.category_of(name))
        })
        .collect();

    for name in bounds.keys() {
        if !variables.iter().any(|v| &v.name == name) {
            event!(Level::WARN, name = name.as_str(), "ignoring bounds for unknown variable");
        }
    }
    if let Categories::ByName(map) = categories {
        for name in map.keys() {
            if !variables.iter().any(|v| &v.name == name) {
                event!(Level::WARN, name = name.as_str(), "ignoring category for unknown variable");
            }
        }
    }

    variables
}
