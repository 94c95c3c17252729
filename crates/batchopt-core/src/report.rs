//! Turning solver output into expense and earnings outcomes.

use batchopt_solver::{LpProblem, Solution, SolutionStatus};
use indexmap::IndexMap;

/// Result of an expense minimization
#[derive(Debug, Clone, PartialEq)]
pub enum ExpenseOutcome {
    Optimal {
        total_cost: f64,
        batch_quantities: IndexMap<String, f64>,
    },
    /// Optimal purchase from several sellers, with what is spent at each
    OptimalBySeller {
        total_cost: f64,
        batch_quantities: IndexMap<String, f64>,
        expense_per_seller: IndexMap<String, f64>,
    },
    Infeasible,
    /// The solver stopped on a status carrying no usable solution
    Unsolved(SolutionStatus),
}

/// Result of an earnings maximization
#[derive(Debug, Clone, PartialEq)]
pub enum EarningsOutcome {
    Optimal {
        total_benefit: f64,
        item_prices: IndexMap<String, f64>,
    },
    Infeasible,
    Unsolved(SolutionStatus),
}

fn terminal_status(solution: &Solution) -> Option<SolutionStatus> {
    match solution.status {
        SolutionStatus::Optimal => None,
        status => Some(status),
    }
}

fn named_values(problem: &LpProblem, solution: &Solution) -> IndexMap<String, f64> {
    problem
        .variable_names()
        .zip(&solution.values)
        .map(|(name, value)| (name.to_string(), *value))
        .collect()
}

impl ExpenseOutcome {
    /// Read an expense outcome from the solution of `problem`.
    ///
    /// Batch prices are the objective coefficients. When `sellers` is given
    /// (one entry per batch, in column order) the expense is also broken
    /// down by seller.
    pub fn from_solution(problem: &LpProblem, solution: &Solution, sellers: Option<&[String]>) -> Self {
        match terminal_status(solution) {
            Some(SolutionStatus::Infeasible) => return ExpenseOutcome::Infeasible,
            Some(status) => return ExpenseOutcome::Unsolved(status),
            None => {}
        }

        let total_cost = solution.objective_value;
        let batch_quantities = named_values(problem, solution);

        let Some(sellers) = sellers else {
            return ExpenseOutcome::Optimal {
                total_cost,
                batch_quantities,
            };
        };

        let mut expense_per_seller: IndexMap<String, f64> = IndexMap::new();
        for ((seller, price), quantity) in sellers
            .iter()
            .zip(&problem.objective.coefficients)
            .zip(&solution.values)
        {
            *expense_per_seller.entry(seller.clone()).or_default() += price * quantity;
        }

        ExpenseOutcome::OptimalBySeller {
            total_cost,
            batch_quantities,
            expense_per_seller,
        }
    }

    pub fn status(&self) -> SolutionStatus {
        match self {
            ExpenseOutcome::Optimal { .. } | ExpenseOutcome::OptimalBySeller { .. } => SolutionStatus::Optimal,
            ExpenseOutcome::Infeasible => SolutionStatus::Infeasible,
            ExpenseOutcome::Unsolved(status) => *status,
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.status() == SolutionStatus::Optimal
    }

    pub fn total_cost(&self) -> Option<f64> {
        match self {
            ExpenseOutcome::Optimal { total_cost, .. } | ExpenseOutcome::OptimalBySeller { total_cost, .. } => {
                Some(*total_cost)
            }
            _ => None,
        }
    }

    pub fn batch_quantities(&self) -> Option<&IndexMap<String, f64>> {
        match self {
            ExpenseOutcome::Optimal { batch_quantities, .. }
            | ExpenseOutcome::OptimalBySeller { batch_quantities, .. } => Some(batch_quantities),
            _ => None,
        }
    }

    pub fn expense_per_seller(&self) -> Option<&IndexMap<String, f64>> {
        match self {
            ExpenseOutcome::OptimalBySeller { expense_per_seller, .. } => Some(expense_per_seller),
            _ => None,
        }
    }
}

impl EarningsOutcome {
    pub fn from_solution(problem: &LpProblem, solution: &Solution) -> Self {
        match terminal_status(solution) {
            Some(SolutionStatus::Infeasible) => EarningsOutcome::Infeasible,
            Some(status) => EarningsOutcome::Unsolved(status),
            None => EarningsOutcome::Optimal {
                total_benefit: solution.objective_value,
                item_prices: named_values(problem, solution),
            },
        }
    }

    pub fn status(&self) -> SolutionStatus {
        match self {
            EarningsOutcome::Optimal { .. } => SolutionStatus::Optimal,
            EarningsOutcome::Infeasible => SolutionStatus::Infeasible,
            EarningsOutcome::Unsolved(status) => *status,
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.status() == SolutionStatus::Optimal
    }

    pub fn total_benefit(&self) -> Option<f64> {
        match self {
            EarningsOutcome::Optimal { total_benefit, .. } => Some(*total_benefit),
            _ => None,
        }
    }

    pub fn item_prices(&self) -> Option<&IndexMap<String, f64>> {
        match self {
            EarningsOutcome::Optimal { item_prices, .. } => Some(item_prices),
            _ => None,
        }
    }
}

#[cfg(feature = "serde")]
mod ser {
    use serde::ser::{Serialize, SerializeMap, Serializer};

    use super::{EarningsOutcome, ExpenseOutcome};

    impl Serialize for ExpenseOutcome {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut map = serializer.serialize_map(None)?;
            map.serialize_entry("Status", self.status().as_str())?;
            if let Some(total_cost) = self.total_cost() {
                map.serialize_entry("Total cost", &total_cost)?;
            }
            if let Some(quantities) = self.batch_quantities() {
                map.serialize_entry("Batch quantities", quantities)?;
            }
            if let Some(per_seller) = self.expense_per_seller() {
                map.serialize_entry("Expense per seller", per_seller)?;
            }
            map.end()
        }
    }

    impl Serialize for EarningsOutcome {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut map = serializer.serialize_map(None)?;
            map.serialize_entry("Status", self.status().as_str())?;
            if let Some(total_benefit) = self.total_benefit() {
                map.serialize_entry("Total benefit", &total_benefit)?;
            }
            if let Some(prices) = self.item_prices() {
                map.serialize_entry("Item prices", prices)?;
            }
            map.end()
        }
    }
}
