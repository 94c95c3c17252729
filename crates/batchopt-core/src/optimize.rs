//! Entry points: copy the inputs, prepare them, solve, and interpret.

use batchopt_solver::{Bounds, LpSolver, Solver};
use indexmap::IndexMap;
use tracing::{Level, event};

use crate::demand::reconcile;
use crate::error::OptimizeError;
use crate::formulation::{Categories, TotalBounds};
use crate::model::{BatchCollection, BatchLists, DemandList};
use crate::rates::{Rates, apply_rates};
use crate::report::{EarningsOutcome, ExpenseOutcome};
use crate::{dual, primal};

/// Batches from one seller, or grouped by seller
#[derive(Debug, Clone, Copy)]
pub enum BatchInput<'a> {
    Single(&'a BatchCollection),
    BySeller(&'a BatchLists),
}

impl<'a> From<&'a BatchCollection> for BatchInput<'a> {
    fn from(batches: &'a BatchCollection) -> Self {
        BatchInput::Single(batches)
    }
}

impl<'a> From<&'a BatchLists> for BatchInput<'a> {
    fn from(batches: &'a BatchLists) -> Self {
        BatchInput::BySeller(batches)
    }
}

/// A working copy of the batches. `sellers` is set for multi-seller input.
struct Prepared {
    batches: BatchCollection,
    demand: DemandList,
    sellers: Option<Vec<String>>,
}

fn prepare(batches: BatchInput<'_>, demand: &DemandList, rates: &Rates) -> Result<Prepared, OptimizeError> {
    let (batches, sellers) = match batches {
        BatchInput::Single(collection) => (collection.clone(), None),
        BatchInput::BySeller(lists) => {
            let flat = lists.flatten()?;
            (flat.collection, Some(flat.sellers))
        }
    };
    let mut prepared = Prepared {
        batches,
        demand: demand.clone(),
        sellers,
    };

    reconcile(&prepared.batches, &mut prepared.demand)?;
    apply_rates(&mut prepared.batches, rates)?;
    event!(
        Level::DEBUG,
        batches = prepared.batches.len(),
        items = prepared.demand.len(),
        prices = ?prepared.batches.iter().map(|b| b.price).collect::<Vec<_>>(),
        "prepared batches"
    );
    Ok(prepared)
}

/// Options of [`min_batch_expense`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpenseOptions {
    pub categories: Categories,
    pub rates: Rates,
    pub minimum_expense: Option<f64>,
    pub maximum_expense: Option<f64>,
    /// Bounds on purchased quantities, by batch name. Multi-seller batches
    /// are named `"{seller}_{batch}"`.
    pub batch_bounds: IndexMap<String, Bounds>,
}

impl ExpenseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_categories(mut self, categories: impl Into<Categories>) -> Self {
        self.categories = categories.into();
        self
    }

    pub fn with_rates(mut self, rates: Rates) -> Self {
        self.rates = rates;
        self
    }

    pub fn with_minimum_expense(mut self, minimum: f64) -> Self {
        self.minimum_expense = Some(minimum);
        self
    }

    pub fn with_maximum_expense(mut self, maximum: f64) -> Self {
        self.maximum_expense = Some(maximum);
        self
    }

    pub fn with_batch_bounds(mut self, batch: impl Into<String>, bounds: Bounds) -> Self {
        self.batch_bounds.insert(batch.into(), bounds);
        self
    }

    fn expense(&self) -> TotalBounds {
        TotalBounds::new(self.minimum_expense, self.maximum_expense)
    }
}

/// Options of [`max_earnings`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EarningsOptions {
    pub categories: Categories,
    pub rates: Rates,
    pub minimum_benefit: Option<f64>,
    pub maximum_benefit: Option<f64>,
    /// Bounds on unit prices, by item name
    pub price_bounds: IndexMap<String, Bounds>,
}

impl EarningsOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_categories(mut self, categories: impl Into<Categories>) -> Self {
        self.categories = categories.into();
        self
    }

    pub fn with_rates(mut self, rates: Rates) -> Self {
        self.rates = rates;
        self
    }

    pub fn with_minimum_benefit(mut self, minimum: f64) -> Self {
        self.minimum_benefit = Some(minimum);
        self
    }

    pub fn with_maximum_benefit(mut self, maximum: f64) -> Self {
        self.maximum_benefit = Some(maximum);
        self
    }

    pub fn with_price_bounds(mut self, item: impl Into<String>, bounds: Bounds) -> Self {
        self.price_bounds.insert(item.into(), bounds);
        self
    }

    fn benefit(&self) -> TotalBounds {
        TotalBounds::new(self.minimum_benefit, self.maximum_benefit)
    }
}

/// Runs both optimizations on a chosen solver
#[derive(Debug, Clone, Default)]
pub struct Optimizer<S = Solver> {
    solver: S,
}

impl Optimizer<Solver> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: LpSolver> Optimizer<S> {
    pub fn with_solver(solver: S) -> Self {
        Self { solver }
    }

    /// Cheapest purchase of batches meeting every item's requested range.
    ///
    /// The inputs are not modified. Contradictory expense bounds, requests
    /// for items no batch contains, and rate arrays of the wrong length are
    /// errors; infeasibility is an [`ExpenseOutcome`].
    pub fn min_batch_expense<'a>(
        &self,
        batches: impl Into<BatchInput<'a>>,
        demand: &DemandList,
        options: &ExpenseOptions,
    ) -> Result<ExpenseOutcome, OptimizeError> {
        options.expense().check("expense")?;
        let prepared = prepare(batches.into(), demand, &options.rates)?;

        let problem = primal::formulate(
            &prepared.batches,
            &prepared.demand,
            &options.categories,
            &options.batch_bounds,
            options.expense(),
        )?;
        let solution = self.solver.solve(&problem);

        let outcome = ExpenseOutcome::from_solution(&problem, &solution, prepared.sellers.as_deref());
        event!(Level::DEBUG, status = %outcome.status(), total_cost = ?outcome.total_cost(), "expense minimized");
        Ok(outcome)
    }

    /// Highest total value of the requested minimum quantities, over unit
    /// item prices that keep every batch's content worth at most its price.
    pub fn max_earnings<'a>(
        &self,
        batches: impl Into<BatchInput<'a>>,
        demand: &DemandList,
        options: &EarningsOptions,
    ) -> Result<EarningsOutcome, OptimizeError> {
        options.benefit().check("benefit")?;
        let prepared = prepare(batches.into(), demand, &options.rates)?;

        let problem = dual::formulate(
            &prepared.batches,
            &prepared.demand,
            &options.categories,
            &options.price_bounds,
            options.benefit(),
        )?;
        let solution = self.solver.solve(&problem);

        let outcome = EarningsOutcome::from_solution(&problem, &solution);
        event!(Level::DEBUG, status = %outcome.status(), total_benefit = ?outcome.total_benefit(), "earnings maximized");
        Ok(outcome)
    }
}

/// [`Optimizer::min_batch_expense`] with the default solver
pub fn min_batch_expense<'a>(
    batches: impl Into<BatchInput<'a>>,
    demand: &DemandList,
    options: &ExpenseOptions,
) -> Result<ExpenseOutcome, OptimizeError> {
    Optimizer::new().min_batch_expense(batches, demand, options)
}

/// [`Optimizer::max_earnings`] with the default solver
pub fn max_earnings<'a>(
    batches: impl Into<BatchInput<'a>>,
    demand: &DemandList,
    options: &EarningsOptions,
) -> Result<EarningsOutcome, OptimizeError> {
    Optimizer::new().max_earnings(batches, demand, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    use batchopt_solver::{LpProblem, Solution};

    /// Counts solver calls and reports every problem as infeasible
    #[derive(Default)]
    struct CountingSolver {
        calls: Cell<usize>,
    }

    impl LpSolver for CountingSolver {
        fn solve(&self, _problem: &LpProblem) -> Solution {
            self.calls.set(self.calls.get() + 1);
            Solution::infeasible()
        }
    }

    fn batches() -> BatchCollection {
        BatchCollection::parse("seller", &["b1: 10; 3xapple, 2xbanana", "b2: 15; 5xapple, 5xbanana"]).unwrap()
    }

    #[test]
    fn test_preconditions_are_checked_before_solving() {
        let solver = CountingSolver::default();
        let optimizer = Optimizer::with_solver(&solver);
        let demand = DemandList::parse(&["1 of apple"]).unwrap();

        let options = ExpenseOptions::new().with_minimum_expense(1000.0).with_maximum_expense(500.0);
        assert!(optimizer.min_batch_expense(&batches(), &demand, &options).is_err());

        let unknown = DemandList::parse(&["1 of date"]).unwrap();
        assert!(optimizer.max_earnings(&batches(), &unknown, &EarningsOptions::new()).is_err());

        let options = ExpenseOptions::new().with_rates(Rates::new().with_tax_rate(vec![0.1, 0.2, 0.3]));
        assert!(optimizer.min_batch_expense(&batches(), &demand, &options).is_err());

        assert_eq!(solver.calls.get(), 0);

        let outcome = optimizer.min_batch_expense(&batches(), &demand, &ExpenseOptions::new()).unwrap();
        assert_eq!(outcome, ExpenseOutcome::Infeasible);
        assert_eq!(solver.calls.get(), 1);
    }

    #[test]
    fn test_inputs_are_not_modified() {
        let batches = batches();
        let demand = DemandList::parse(&["1 of apple"]).unwrap();
        let (batches_before, demand_before) = (batches.clone(), demand.clone());
        let options = ExpenseOptions::new().with_rates(Rates::new().with_exchange_rate(2.0));

        min_batch_expense(&batches, &demand, &options).unwrap();
        max_earnings(&batches, &demand, &EarningsOptions::new().with_rates(options.rates.clone())).unwrap();

        assert_eq!(batches, batches_before);
        assert_eq!(demand, demand_before);
    }
}
