use std::path::Path;

use super::*;

fn plan(id: &str, limit: u32, default: bool) -> PlanConfig {
    PlanConfig {
        id: id.to_string(),
        name: id.to_uppercase(),
        price: Decimal::new(100, 0),
        limit,
        features: vec![],
        default,
        popular: false,
    }
}

#[test]
fn shipped_plans_file_is_valid() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("config")
        .join("plans.yaml");
    let catalog = load_plans(&path).expect("config/plans.yaml should load");

    let ids: Vec<&str> = catalog.plans.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, ["free", "pro", "pro_max", "ultra_pro_max"]);

    let free = catalog.default_plan().expect("default plan");
    assert_eq!(free.id, "free");
    assert_eq!(free.limit, 10);
    assert_eq!(free.price, Decimal::ZERO);

    let pro = catalog.find("pro").expect("pro plan");
    assert_eq!(pro.limit, 50);
    assert!(pro.popular);
    assert_eq!(catalog.find("ultra_pro_max").map(|p| p.limit), Some(150));
}

#[test]
fn find_unknown_plan_is_none() {
    let catalog = PlanCatalog {
        plans: vec![plan("free", 10, true)],
    };
    assert!(catalog.find("enterprise").is_none());
}

#[test]
fn parse_plans_reads_decimal_prices() {
    let yaml = "plans:\n  - id: free\n    name: Free\n    price: \"0\"\n    limit: 10\n    default: true\n  - id: pro\n    name: Pro\n    price: \"100.50\"\n    limit: 50\n";
    let catalog = parse_plans(yaml).expect("valid yaml");
    assert_eq!(catalog.plans[1].price, Decimal::new(10050, 2));
    assert!(catalog.plans[1].features.is_empty());
}

#[test]
fn validate_rejects_empty_catalog() {
    let err = validate_plans(&PlanCatalog { plans: vec![] }).unwrap_err();
    assert!(err.to_string().contains("at least one plan"));
}

#[test]
fn validate_rejects_duplicate_ids() {
    let catalog = PlanCatalog {
        plans: vec![plan("pro", 50, true), plan("pro", 60, false)],
    };
    let err = validate_plans(&catalog).unwrap_err();
    assert!(err.to_string().contains("duplicate plan id"));
}

#[test]
fn validate_rejects_zero_limit() {
    let catalog = PlanCatalog {
        plans: vec![plan("free", 0, true)],
    };
    let err = validate_plans(&catalog).unwrap_err();
    assert!(err.to_string().contains("at least one lead"));
}

#[test]
fn validate_requires_exactly_one_default() {
    let none = PlanCatalog {
        plans: vec![plan("free", 10, false)],
    };
    assert!(validate_plans(&none)
        .unwrap_err()
        .to_string()
        .contains("found 0"));

    let two = PlanCatalog {
        plans: vec![plan("free", 10, true), plan("pro", 50, true)],
    };
    assert!(validate_plans(&two)
        .unwrap_err()
        .to_string()
        .contains("found 2"));
}

#[test]
fn parse_plans_rejects_malformed_yaml() {
    let result = parse_plans("plans: [not: valid");
    assert!(matches!(result, Err(ConfigError::PlansFileParse(_))));
}
