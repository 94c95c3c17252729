use tracing::{Level, event};

use crate::error::OptimizeError;
use crate::model::{BatchCollection, DemandList};

/// Make the demand list cover exactly the items found in `batches`.
///
/// Items offered but not requested get an unconstrained request (minimum 0,
/// no maximum). A requested item that no batch contains is an error.
pub fn reconcile(batches: &BatchCollection, demand: &mut DemandList) -> Result<(), OptimizeError> {
    let mut added = 0;
    for name in batches.item_names() {
        if demand.request_if_absent(name) {
            added += 1;
        }
    }
    if added > 0 {
        event!(Level::DEBUG, added, "added zero demand for unrequested items");
    }

    if let Some(missing) = demand.iter().find(|r| !batches.contains_item(&r.name)) {
        return Err(OptimizeError::UnknownItem(missing.name.clone()));
    }
    Ok(())
}
