//! Expense minimization: how many of each batch to buy.

use batchopt_solver::{Bounds, ConstraintOp, LpProblem};
use indexmap::IndexMap;

use crate::error::OptimizeError;
use crate::formulation::{self, Categories, TotalBounds};
use crate::model::{BatchCollection, DemandList};

/// Build the expense minimization problem.
///
/// One variable per batch (its purchased quantity) and, for each requested
/// item, a row bounding the delivered quantity from below and, when a
/// maximum is set, from above. `demand` must already be reconciled with
/// `batches`.
pub fn formulate(
    batches: &BatchCollection,
    demand: &DemandList,
    categories: &Categories,
    batch_bounds: &IndexMap<String, Bounds>,
    expense: TotalBounds,
) -> Result<LpProblem, OptimizeError> {
    expense.check("expense")?;

    let variables = formulation::variables(batches.iter().map(|b| b.name.as_str()), categories, batch_bounds);
    let mut lp = LpProblem::new(variables);

    let prices: Vec<f64> = batches.iter().map(|b| b.price).collect();
    lp.set_objective(prices.clone(), true);

    for request in demand {
        let quantities: Vec<f64> = batches
            .iter()
            .map(|b| b.quantity_of(&request.name).unwrap_or(0.0))
            .collect();

        lp.add_constraint(
            format!("{}_min", request.name),
            quantities.clone(),
            ConstraintOp::Ge,
            request.minimum_quantity,
        );
        if let Some(maximum) = request.maximum_quantity {
            lp.add_constraint(format!("{}_max", request.name), quantities, ConstraintOp::Le, maximum);
        }
    }

    expense.add_to(&mut lp, "expense", &prices);
    Ok(lp)
}
