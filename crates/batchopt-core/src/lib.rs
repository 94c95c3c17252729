pub mod demand;
pub mod dual;
pub mod error;
pub mod formulation;
pub mod model;
pub mod optimize;
pub mod parser;
pub mod primal;
pub mod rates;
pub mod report;

pub use batchopt_solver::{Bounds, Category, LpSolver, SolutionStatus, Solver};
pub use demand::reconcile;
pub use error::OptimizeError;
pub use formulation::{Categories, TotalBounds};
pub use model::{Batch, BatchCollection, BatchLists, DEFAULT_SELLER, DemandList, FlatBatches, ItemInBatch, ItemRequest, ModelError};
pub use optimize::{BatchInput, EarningsOptions, ExpenseOptions, Optimizer, max_earnings, min_batch_expense};
pub use parser::ParseError;
pub use rates::{Rate, RateChannel, RateKind, RateMode, Rates, apply_rates};
pub use report::{EarningsOutcome, ExpenseOutcome};
