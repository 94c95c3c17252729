use approx::assert_abs_diff_eq;
use batchopt_core::{
    BatchCollection, BatchLists, Bounds, Categories, Category, DemandList, EarningsOptions, EarningsOutcome,
    ExpenseOptions, ExpenseOutcome, OptimizeError, Rates, SolutionStatus, max_earnings, min_batch_expense,
};
use indexmap::IndexMap;
use rstest::*;

const BATCHES: [&str; 3] = [
    "batch 1: 10; 3xapple, 2xbanana, 4xorange",
    "batch 2: 15; 5xapple, 5xbanana, 5xorange",
    "batch 3: 20; 6xapple, 7xbanana, 7xorange",
];

#[fixture]
fn batches() -> BatchCollection {
    BatchCollection::parse("seller1", &BATCHES).unwrap()
}

#[fixture]
fn demand() -> DemandList {
    DemandList::parse(&["10 of apple", "10 of banana", "10 of orange"]).unwrap()
}

#[fixture]
fn multi_seller() -> BatchLists {
    BatchLists::parse(&[
        format!("MALANDRIN_{}", BATCHES[0]),
        format!("MALANDRIN_{}", BATCHES[1]),
        format!("DETAILIN_{}", BATCHES[2]),
    ])
    .unwrap()
}

#[rstest]
#[case::continuous(Category::Continuous)]
#[case::integer(Category::Integer)]
fn test_expense_of_worked_example(batches: BatchCollection, demand: DemandList, #[case] category: Category) {
    let options = ExpenseOptions::new().with_categories(category);

    let outcome = min_batch_expense(&batches, &demand, &options).unwrap();

    assert_eq!(outcome.status(), SolutionStatus::Optimal);
    assert_abs_diff_eq!(outcome.total_cost().unwrap(), 30.0, epsilon = 1e-6);
    let quantities = outcome.batch_quantities().unwrap();
    assert_abs_diff_eq!(quantities["batch 1"], 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(quantities["batch 2"], 2.0, epsilon = 1e-6);
    assert_abs_diff_eq!(quantities["batch 3"], 0.0, epsilon = 1e-6);
}

#[rstest]
#[case::continuous(Category::Continuous)]
#[case::integer(Category::Integer)]
fn test_earnings_match_expense(batches: BatchCollection, demand: DemandList, #[case] category: Category) {
    let outcome = max_earnings(&batches, &demand, &EarningsOptions::new().with_categories(category)).unwrap();

    assert!(outcome.is_optimal());
    assert_abs_diff_eq!(outcome.total_benefit().unwrap(), 30.0, epsilon = 1e-6);

    // every batch is worth at most its price
    let prices = outcome.item_prices().unwrap();
    for batch in &batches {
        let worth: f64 = batch.items.iter().map(|i| i.quantity_in_batch * prices[&i.name]).sum();
        assert!(worth <= batch.price + 1e-6, "{} is worth {worth}", batch.name);
    }
    if category == Category::Integer {
        assert!(prices.values().all(|p| (p - p.round()).abs() < 1e-6));
    }
}

#[rstest]
fn test_identity_rates_change_nothing(batches: BatchCollection, demand: DemandList) {
    let plain = min_batch_expense(&batches, &demand, &ExpenseOptions::new()).unwrap();
    let rates = Rates::new()
        .with_exchange_rate(1.0)
        .with_tax_rate(0.0)
        .with_customs_duty(vec![0.0])
        .with_transport_fee(vec![0.0, 0.0, 0.0]);

    let rated = min_batch_expense(&batches, &demand, &ExpenseOptions::new().with_rates(rates)).unwrap();

    assert_eq!(plain, rated);
}

#[test]
fn test_expense_with_rates_and_bounds() {
    let batches = BatchCollection::parse("seller", &["batch1: 10; 3xapple, 2xbanana", "batch2: 15; 5xapple, 5xbanana"])
        .unwrap();
    let demand = DemandList::parse(&["3-6 of apple", "6-9 of banana"]).unwrap();
    let rates = Rates::new()
        .with_exchange_rate(0.9)
        .with_customs_duty(0.2)
        .with_transport_fee(vec![0.3, 0.1])
        .with_tax_rate(vec![0.2, 0.1]);
    let options = ExpenseOptions::new()
        .with_rates(rates)
        .with_minimum_expense(20.0)
        .with_maximum_expense(100.0);

    let outcome = min_batch_expense(&batches, &demand, &options).unwrap();

    assert_abs_diff_eq!(outcome.total_cost().unwrap(), 23.5224, epsilon = 1e-6);
    let quantities = outcome.batch_quantities().unwrap();
    assert_abs_diff_eq!(quantities["batch1"], 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(quantities["batch2"], 1.2, epsilon = 1e-6);
}

#[test]
fn test_batch_bounds_force_a_purchase() {
    let batches = BatchCollection::parse("seller", &["batch1: 10; 3xapple", "batch2: 15; 6xapple"]).unwrap();
    let demand = DemandList::parse(&["6 of apple"]).unwrap();
    let options = ExpenseOptions::new().with_batch_bounds("batch1", Bounds::new(1.0, None));

    let outcome = min_batch_expense(&batches, &demand, &options).unwrap();

    // one forced batch1 covers 3 apples, half a batch2 covers the rest
    assert_abs_diff_eq!(outcome.total_cost().unwrap(), 17.5, epsilon = 1e-6);
}

#[rstest]
fn test_infeasible_expense_has_only_a_status(batches: BatchCollection) {
    let demand = DemandList::parse(&["1000000 of apple", "2000000 of banana"]).unwrap();
    let options = ExpenseOptions::new().with_maximum_expense(1000.0);

    let outcome = min_batch_expense(&batches, &demand, &options).unwrap();

    assert_eq!(outcome, ExpenseOutcome::Infeasible);
    assert_eq!(serde_json::to_string(&outcome).unwrap(), r#"{"Status":"Infeasible"}"#);
}

#[rstest]
fn test_infeasible_earnings(batches: BatchCollection, demand: DemandList) {
    let options = EarningsOptions::new()
        .with_maximum_benefit(1.0)
        .with_price_bounds("apple", Bounds::new(10.0, None))
        .with_price_bounds("banana", Bounds::new(5.0, Some(10.0)))
        .with_price_bounds("orange", Bounds::new(14.0, Some(15.0)));

    let outcome = max_earnings(&batches, &demand, &options).unwrap();

    assert_eq!(outcome, EarningsOutcome::Infeasible);
    assert_eq!(serde_json::to_string(&outcome).unwrap(), r#"{"Status":"Infeasible"}"#);
}

#[rstest]
fn test_contradictory_bounds_are_rejected(batches: BatchCollection, demand: DemandList) {
    let options = ExpenseOptions::new().with_minimum_expense(1000.0).with_maximum_expense(500.0);
    let err = min_batch_expense(&batches, &demand, &options).unwrap_err();
    assert_eq!(err.to_string(), "maximum_expense (500) cannot be less than minimum_expense (1000)");

    let options = EarningsOptions::new().with_minimum_benefit(2.0).with_maximum_benefit(1.0);
    let err = max_earnings(&batches, &demand, &options).unwrap_err();
    assert!(matches!(err, OptimizeError::ContradictoryBounds { quantity: "benefit", .. }));
}

#[rstest]
fn test_unknown_item_is_rejected(batches: BatchCollection) {
    let demand = DemandList::parse(&["10 of apple", "3 of date"]).unwrap();

    let err = min_batch_expense(&batches, &demand, &ExpenseOptions::new()).unwrap_err();
    assert_eq!(err, OptimizeError::UnknownItem("date".to_string()));

    let err = max_earnings(&batches, &demand, &EarningsOptions::new()).unwrap_err();
    assert_eq!(err, OptimizeError::UnknownItem("date".to_string()));
}

#[rstest]
fn test_rate_length_is_checked(batches: BatchCollection, demand: DemandList) {
    let options = ExpenseOptions::new().with_rates(Rates::new().with_transport_fee(vec![0.1, 0.2]));

    let err = min_batch_expense(&batches, &demand, &options).unwrap_err();

    assert!(matches!(err, OptimizeError::RateLength { expected: 3, actual: 2, .. }));
}

#[rstest]
fn test_expense_per_seller(multi_seller: BatchLists, demand: DemandList) {
    let outcome = min_batch_expense(&multi_seller, &demand, &ExpenseOptions::new()).unwrap();

    let total = outcome.total_cost().unwrap();
    assert_abs_diff_eq!(total, 30.0, epsilon = 1e-6);
    assert_abs_diff_eq!(outcome.batch_quantities().unwrap()["MALANDRIN_batch 2"], 2.0, epsilon = 1e-6);

    let per_seller = outcome.expense_per_seller().unwrap();
    let sellers: Vec<&str> = per_seller.keys().map(String::as_str).collect();
    assert_eq!(sellers, vec!["MALANDRIN", "DETAILIN"]);
    assert_abs_diff_eq!(per_seller["MALANDRIN"], 30.0, epsilon = 1e-6);
    assert_abs_diff_eq!(per_seller["DETAILIN"], 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(per_seller.values().sum::<f64>(), total, epsilon = 1e-9);
}

#[rstest]
fn test_earnings_from_several_sellers(multi_seller: BatchLists, demand: DemandList) {
    let categories = Categories::ByName(IndexMap::from([("apple".to_string(), Category::Integer)]));

    let outcome = max_earnings(&multi_seller, &demand, &EarningsOptions::new().with_categories(categories)).unwrap();

    assert_abs_diff_eq!(outcome.total_benefit().unwrap(), 30.0, epsilon = 1e-6);
}

#[rstest]
fn test_optimal_report_shape(batches: BatchCollection, demand: DemandList) {
    let outcome = min_batch_expense(&batches, &demand, &ExpenseOptions::new()).unwrap();

    let json = serde_json::to_value(&outcome).unwrap();

    assert_eq!(json["Status"], "Optimal");
    assert_abs_diff_eq!(json["Total cost"].as_f64().unwrap(), 30.0, epsilon = 1e-6);
    assert_eq!(json["Batch quantities"].as_object().unwrap().len(), 3);
    assert!(json.get("Expense per seller").is_none());
}

#[test]
fn test_json_inputs() {
    let batches: BatchCollection = serde_json::from_str(
        r#"{
            "seller": "market",
            "batch_list": [
                {"name": "b1", "price": 4, "items": [{"name": "apple", "quantity_in_batch": 2}]},
                {"name": "b2", "price": 3, "items": [{"name": "pear", "quantity_in_batch": 1}]}
            ]
        }"#,
    )
    .unwrap();
    let demand: DemandList = serde_json::from_str(
        r#"{"items": [{"name": "apple", "minimum_quantity": 4, "maximum_quantity": null}]}"#,
    )
    .unwrap();

    assert_eq!(batches.get("b1").unwrap().quantity_of("pear"), Some(0.0));

    let outcome = min_batch_expense(&batches, &demand, &ExpenseOptions::new()).unwrap();

    assert_abs_diff_eq!(outcome.total_cost().unwrap(), 8.0, epsilon = 1e-6);
    assert_abs_diff_eq!(outcome.batch_quantities().unwrap()["b2"], 0.0, epsilon = 1e-6);
}

#[test]
fn test_invalid_json_batch_is_rejected() {
    let result = serde_json::from_str::<BatchCollection>(
        r#"{"batch_list": [{"name": "b1", "price": -4, "items": []}]}"#,
    );
    assert!(result.is_err());
}
