//! Earnings maximization: the unit price a seller can put on each item so
//! that no batch is worth more than its price.

use batchopt_solver::{Bounds, ConstraintOp, LpProblem};
use indexmap::IndexMap;

use crate::error::OptimizeError;
use crate::formulation::{self, Categories, TotalBounds};
use crate::model::{BatchCollection, DemandList};

/// Build the earnings maximization problem: one price variable per
/// requested item, weighted by its minimum quantity, and one row per batch.
pub fn formulate(
    batches: &BatchCollection,
    demand: &DemandList,
    categories: &Categories,
    price_bounds: &IndexMap<String, Bounds>,
    benefit: TotalBounds,
) -> Result<LpProblem, OptimizeError> {
    benefit.check("benefit")?;

    let variables = formulation::variables(demand.iter().map(|r| r.name.as_str()), categories, price_bounds);
    let mut lp = LpProblem::new(variables);

    let weights: Vec<f64> = demand.iter().map(|r| r.minimum_quantity).collect();
    lp.set_objective(weights.clone(), false);

    for batch in batches {
        let quantities: Vec<f64> = demand
            .iter()
            .map(|r| batch.quantity_of(&r.name).unwrap_or(0.0))
            .collect();
        lp.add_constraint(format!("{}_price", batch.name), quantities, ConstraintOp::Le, batch.price);
    }

    benefit.add_to(&mut lp, "benefit", &weights);
    Ok(lp)
}
