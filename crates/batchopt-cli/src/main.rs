use std::path::{Path, PathBuf};

use batchopt_core::{
    BatchCollection, BatchInput, BatchLists, Bounds, Categories, Category, DemandList, EarningsOptions,
    EarningsOutcome, ExpenseOptions, ExpenseOutcome, Optimizer, Rate, Rates, Solver,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use tracing::{Level, event};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "batchopt")]
#[command(about = "Cheapest batch purchases and fair item prices", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find the cheapest purchase of batches covering the demand
    Expense {
        #[command(flatten)]
        input: Input,
        /// Minimum total expense
        #[arg(long)]
        min: Option<f64>,
        /// Maximum total expense
        #[arg(long)]
        max: Option<f64>,
    },
    /// Find the item prices maximizing the value of the demand
    Earnings {
        #[command(flatten)]
        input: Input,
        /// Minimum total benefit
        #[arg(long)]
        min: Option<f64>,
        /// Maximum total benefit
        #[arg(long)]
        max: Option<f64>,
    },
    /// Validate the batch and demand files
    Check {
        /// JSON batch file (one seller, or several under "batchlists")
        batches: PathBuf,
        /// JSON demand file
        demand: PathBuf,
    },
}

#[derive(Args)]
struct Input {
    /// JSON batch file (one seller, or several under "batchlists")
    batches: PathBuf,
    /// JSON demand file
    demand: PathBuf,
    /// Category of every variable
    #[arg(long, default_value = "continuous")]
    category: Category,
    /// Variables that must take integer values, overriding --category
    #[arg(long, value_name = "NAME")]
    integer: Vec<String>,
    /// Bounds on a batch quantity (expense) or an item price (earnings)
    #[arg(long = "bound", value_name = "NAME=MIN[:MAX]", value_parser = parse_bound)]
    bounds: Vec<(String, Bounds)>,
    /// Transport fee, one value or one per batch
    #[arg(long, value_delimiter = ',', default_value = "0")]
    transport_fee: Vec<f64>,
    /// Exchange rate, one value or one per batch
    #[arg(long, value_delimiter = ',', default_value = "1")]
    exchange_rate: Vec<f64>,
    /// Tax rate, one value or one per batch
    #[arg(long, value_delimiter = ',', default_value = "0")]
    tax_rate: Vec<f64>,
    /// Customs duty, one value or one per batch
    #[arg(long, value_delimiter = ',', default_value = "0")]
    customs_duty: Vec<f64>,
    /// Branch-and-bound node limit for integer problems
    #[arg(long, default_value_t = 10000)]
    max_nodes: usize,
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

enum BatchFile {
    BySeller(BatchLists),
    Single(BatchCollection),
}

impl BatchFile {
    /// Multi-seller files keep their collections under "batchlists"
    fn from_value(value: serde_json::Value) -> serde_json::Result<Self> {
        if value.get("batchlists").is_some() {
            serde_json::from_value(value).map(BatchFile::BySeller)
        } else {
            serde_json::from_value(value).map(BatchFile::Single)
        }
    }

    fn as_input(&self) -> BatchInput<'_> {
        match self {
            BatchFile::BySeller(lists) => lists.into(),
            BatchFile::Single(collection) => collection.into(),
        }
    }
}

/// Parses `NAME=MIN[:MAX]`. A missing or infinite MAX leaves the name unbounded above.
fn parse_bound(s: &str) -> Result<(String, Bounds), String> {
    let (name, range) = s
        .rsplit_once('=')
        .filter(|(name, _)| !name.is_empty())
        .ok_or_else(|| format!("expected NAME=MIN[:MAX], got '{s}'"))?;
    let (lower, upper) = match range.split_once(':') {
        Some((lower, upper)) => (lower, Some(upper)),
        None => (range, None),
    };

    let lower: f64 = lower.trim().parse().map_err(|_| format!("invalid minimum '{lower}' for '{name}'"))?;
    let upper = match upper {
        Some(upper) => {
            let upper: f64 = upper.trim().parse().map_err(|_| format!("invalid maximum '{upper}' for '{name}'"))?;
            Some(upper).filter(|u| u.is_finite())
        }
        None => None,
    };
    if upper.is_some_and(|u| u < lower) {
        return Err(format!("the maximum of '{name}' is below its minimum {lower}"));
    }
    Ok((name.to_string(), Bounds::new(lower, upper)))
}

fn rate(values: Vec<f64>) -> Rate {
    match values.as_slice() {
        [value] => Rate::Scalar(*value),
        _ => Rate::PerBatch(values),
    }
}

impl Input {
    fn categories(&self) -> Categories {
        if self.integer.is_empty() || self.category == Category::Integer {
            return self.category.into();
        }
        Categories::ByName(self.integer.iter().map(|name| (name.clone(), Category::Integer)).collect())
    }

    fn rates(&self) -> Rates {
        Rates::new()
            .with_transport_fee(rate(self.transport_fee.clone()))
            .with_exchange_rate(rate(self.exchange_rate.clone()))
            .with_tax_rate(rate(self.tax_rate.clone()))
            .with_customs_duty(rate(self.customs_duty.clone()))
    }

    fn optimizer(&self) -> Optimizer {
        Optimizer::with_solver(Solver::new().with_max_nodes(self.max_nodes))
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> T {
    event!(Level::DEBUG, path = %path.display(), "reading input");
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading {}: {}", path.display(), e);
            std::process::exit(1);
        }
    };
    match serde_json::from_str(&source) {
        Ok(value) => value,
        Err(e) => {
            eprintln!("Invalid file {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

fn read_batches(path: &Path) -> BatchFile {
    match BatchFile::from_value(read_json(path)) {
        Ok(batches) => batches,
        Err(e) => {
            eprintln!("Invalid file {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error writing JSON: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_expense(outcome: &ExpenseOutcome) {
    println!("Status: {}", outcome.status());
    let Some(total_cost) = outcome.total_cost() else {
        return;
    };
    println!("Total cost: {:.2}", total_cost);
    println!();
    println!("Batch quantities:");
    for (batch, quantity) in outcome.batch_quantities().into_iter().flatten() {
        if *quantity > 0.001 {
            println!("  {:30} {:10.4}", batch, quantity);
        }
    }
    if let Some(per_seller) = outcome.expense_per_seller() {
        println!();
        println!("Expense per seller:");
        for (seller, expense) in per_seller {
            println!("  {:30} {:10.2}", seller, expense);
        }
    }
}

fn print_earnings(outcome: &EarningsOutcome) {
    println!("Status: {}", outcome.status());
    let Some(total_benefit) = outcome.total_benefit() else {
        return;
    };
    println!("Total benefit: {:.2}", total_benefit);
    println!();
    println!("Item prices:");
    for (item, price) in outcome.item_prices().into_iter().flatten() {
        println!("  {:30} {:10.4}", item, price);
    }
}

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Expense { input, min, max } => {
            let batches = read_batches(&input.batches);
            let demand: DemandList = read_json(&input.demand);

            let mut options = ExpenseOptions::new()
                .with_categories(input.categories())
                .with_rates(input.rates());
            options.minimum_expense = min;
            options.maximum_expense = max;
            options.batch_bounds = input.bounds.iter().cloned().collect();

            let outcome = match input.optimizer().min_batch_expense(batches.as_input(), &demand, &options) {
                Ok(outcome) => outcome,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };

            match input.format {
                Format::Json => print_json(&outcome),
                Format::Text => print_expense(&outcome),
            }
            if !outcome.is_optimal() {
                std::process::exit(1);
            }
        }
        Commands::Earnings { input, min, max } => {
            let batches = read_batches(&input.batches);
            let demand: DemandList = read_json(&input.demand);

            let mut options = EarningsOptions::new()
                .with_categories(input.categories())
                .with_rates(input.rates());
            options.minimum_benefit = min;
            options.maximum_benefit = max;
            options.price_bounds = input.bounds.iter().cloned().collect();

            let outcome = match input.optimizer().max_earnings(batches.as_input(), &demand, &options) {
                Ok(outcome) => outcome,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };

            match input.format {
                Format::Json => print_json(&outcome),
                Format::Text => print_earnings(&outcome),
            }
            if !outcome.is_optimal() {
                std::process::exit(1);
            }
        }
        Commands::Check { batches, demand } => {
            let batches = read_batches(&batches);
            let mut demand: DemandList = read_json(&demand);

            let collection = match &batches {
                BatchFile::BySeller(lists) => {
                    println!("Sellers: {}", lists.len());
                    match lists.flatten() {
                        Ok(flat) => flat.collection,
                        Err(e) => {
                            eprintln!("Error: {}", e);
                            std::process::exit(1);
                        }
                    }
                }
                BatchFile::Single(collection) => {
                    println!("Seller: {}", collection.seller());
                    collection.clone()
                }
            };
            println!("Batches: {}", collection.len());
            println!("Items: {}", collection.item_names().len());
            println!("Requests: {}", demand.len());

            if let Err(e) = batchopt_core::reconcile(&collection, &mut demand) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
            println!();
            println!("No errors found.");
        }
    }
}
