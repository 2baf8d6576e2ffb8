use anyhow::Result;
use serde_json::{json, Value};

use salesvault::error::{FailureKind, VaultError};
use salesvault::integrity::{
    audit, is_consistent, plan, repair, Defect, RepairPolicy, Strategy,
};
use salesvault::store::row_id;
use salesvault::{LiveStore, RefField, Row, SqliteStore, StoreOptions, Table};

fn row(v: Value) -> Row {
    v.as_object().cloned().expect("object literal")
}

/// One representative, one client, two packs; no sales.
fn base() -> Result<SqliteStore> {
    let mut s = SqliteStore::open_in_memory(StoreOptions::default())?;
    s.init_schema()?;
    s.insert(
        Table::Representatives,
        &row(json!({"code": "R01", "full_name": "Nadia K.", "username": "nadia", "wilaya": "Blida"})),
    )?;
    s.insert(
        Table::Clients,
        &row(json!({"client_id": "C-001", "full_name": "Superette El Amel", "wilaya": "Blida"})),
    )?;
    s.insert(Table::Packs, &row(json!({"name": "Starter", "total_price": 890.5})))?;
    s.insert(Table::Packs, &row(json!({"name": "Family", "total_price": 1951.5})))?;
    Ok(s)
}

fn add_sale(s: &mut SqliteStore, id: i64, client: Value, rep: Value, pack: Value) -> Result<()> {
    s.insert(
        Table::Sales,
        &row(json!({"id": id, "client_id": client, "representative_id": rep, "pack_id": pack, "total_price": 890.5, "sale_date": "2024-05-02T09:30:00Z"})),
    )?;
    Ok(())
}

fn sale_ref(s: &SqliteStore, id: i64, field: RefField) -> Result<Value> {
    let sale = s.read_by_id(Table::Sales, id)?.expect("sale exists");
    Ok(sale.get(field.column()).cloned().unwrap_or(Value::Null))
}

#[test]
fn broken_client_gets_a_placeholder() -> Result<()> {
    let mut s = base()?;
    add_sale(&mut s, 7, json!(999), json!(1), json!(1))?;
    assert!(!is_consistent(&s)?);

    let defects = audit(&s)?;
    assert_eq!(
        defects,
        vec![Defect {
            sale_id: 7,
            broken_field: RefField::Client,
            broken_value: json!(999),
        }]
    );

    let rep = repair(&mut s, &defects, &RepairPolicy::default())?;
    assert_eq!(rep.resolved, 1);
    assert_eq!(rep.placeholders_created, 1);
    assert_eq!(rep.placeholders_reused, 0);
    assert!(rep.unresolved.is_empty());
    assert_eq!(rep.remaining, Some(0));
    rep.ensure_complete()?;

    let placeholder = s
        .find_by(Table::Clients, "client_id", &json!("PLACEHOLDER_999"))?
        .expect("placeholder client");
    assert_eq!(placeholder.get("full_name"), Some(&json!("Client 999 (Historical)")));
    assert_eq!(placeholder.get("phone"), Some(&Value::Null));
    assert_eq!(
        sale_ref(&s, 7, RefField::Client)?,
        json!(row_id(&placeholder).expect("id"))
    );

    assert!(audit(&s)?.is_empty());
    Ok(())
}

#[test]
fn report_serializes_like_the_operation_contract() -> Result<()> {
    let mut s = base()?;
    add_sale(&mut s, 7, json!(999), json!(1), json!(1))?;
    let defects = audit(&s)?;
    let v = serde_json::to_value(&defects)?;
    assert_eq!(v, json!([{"saleId": 7, "brokenField": "client", "brokenValue": 999}]));

    let rep = repair(&mut s, &defects, &RepairPolicy::default())?;
    let v = serde_json::to_value(&rep)?;
    assert_eq!(v["resolved"], json!(1));
    assert_eq!(v["placeholdersCreated"], json!(1));
    assert_eq!(v["placeholdersReused"], json!(0));
    assert_eq!(v["unresolved"], json!([]));
    Ok(())
}

#[test]
fn repair_is_idempotent() -> Result<()> {
    let mut s = base()?;
    add_sale(&mut s, 1, json!(500), json!(1), json!(1))?;
    add_sale(&mut s, 2, json!(1), json!(1), json!(42))?;
    let policy = RepairPolicy::default();

    let defects = audit(&s)?;
    assert_eq!(defects.len(), 2);
    let first = repair(&mut s, &defects, &policy)?;
    assert_eq!(first.resolved, 2);
    let clients_after_first = s.count(Table::Clients)?;
    let sales_after_first = s.read_all(Table::Sales)?;

    // fresh audit: nothing left to do
    let fresh_defects = audit(&s)?;
    let second = repair(&mut s, &fresh_defects, &policy)?;
    assert_eq!(second.resolved, 0);
    assert_eq!(second.placeholders_created, 0);

    // replaying the stale defect list changes nothing either
    let replay = repair(&mut s, &defects, &policy)?;
    assert_eq!(replay.resolved, 0);
    assert_eq!(replay.placeholders_created, 0);
    assert_eq!(replay.already_consistent, 2);
    assert!(replay.unresolved.is_empty());

    assert_eq!(s.count(Table::Clients)?, clients_after_first);
    assert_eq!(s.read_all(Table::Sales)?, sales_after_first);
    Ok(())
}

#[test]
fn one_placeholder_per_broken_client_value() -> Result<()> {
    let mut s = base()?;
    add_sale(&mut s, 1, json!(999), json!(1), json!(1))?;
    add_sale(&mut s, 2, json!(999), json!(1), json!(2))?;
    add_sale(&mut s, 3, json!(888), json!(1), json!(2))?;
    let policy = RepairPolicy::default();

    let fresh_defects = audit(&s)?;
    let rep = repair(&mut s, &fresh_defects, &policy)?;
    assert_eq!(rep.resolved, 3);
    assert_eq!(rep.placeholders_created, 2);
    assert_eq!(rep.placeholders_reused, 1);
    assert_eq!(s.count(Table::Clients)?, 3);
    assert_eq!(
        sale_ref(&s, 1, RefField::Client)?,
        sale_ref(&s, 2, RefField::Client)?
    );
    assert_ne!(
        sale_ref(&s, 1, RefField::Client)?,
        sale_ref(&s, 3, RefField::Client)?
    );

    // a later run finds the placeholder already in the store
    add_sale(&mut s, 4, json!(999), json!(1), json!(1))?;
    let fresh_defects = audit(&s)?;
    let rep = repair(&mut s, &fresh_defects, &policy)?;
    assert_eq!(rep.placeholders_created, 0);
    assert_eq!(rep.placeholders_reused, 1);
    assert_eq!(
        sale_ref(&s, 4, RefField::Client)?,
        sale_ref(&s, 1, RefField::Client)?
    );
    Ok(())
}

#[test]
fn new_placeholder_does_not_mask_a_later_broken_id() -> Result<()> {
    let mut s = base()?;
    // the placeholder for 999 will be client #2, the id sale 2 points at
    add_sale(&mut s, 1, json!(999), json!(1), json!(1))?;
    add_sale(&mut s, 2, json!(2), json!(1), json!(1))?;
    let defects = audit(&s)?;
    assert_eq!(defects.len(), 2);

    let rep = repair(&mut s, &defects, &RepairPolicy::default())?;
    assert_eq!(rep.resolved, 2);
    assert_eq!(rep.placeholders_created, 2);
    assert_eq!(rep.already_consistent, 0);
    assert_eq!(rep.remaining, Some(0));

    let p999 = s
        .find_by(Table::Clients, "client_id", &json!("PLACEHOLDER_999"))?
        .expect("placeholder for 999");
    let p2 = s
        .find_by(Table::Clients, "client_id", &json!("PLACEHOLDER_2"))?
        .expect("placeholder for 2");
    assert_eq!(row_id(&p999), Some(2));
    assert_eq!(sale_ref(&s, 1, RefField::Client)?, json!(row_id(&p999).expect("id")));
    assert_eq!(sale_ref(&s, 2, RefField::Client)?, json!(row_id(&p2).expect("id")));

    // a second pass has nothing left to do
    let again = repair(&mut s, &defects, &RepairPolicy::default())?;
    assert_eq!(again.already_consistent, 2);
    assert_eq!(again.placeholders_created, 0);
    Ok(())
}

#[test]
fn broken_pack_goes_to_first_pack() -> Result<()> {
    let mut s = base()?;
    add_sale(&mut s, 1, json!(1), json!(1), json!(77))?;
    add_sale(&mut s, 2, json!(1), json!(1), json!(78))?;

    let fresh_defects = audit(&s)?;
    let rep = repair(&mut s, &fresh_defects, &RepairPolicy::default())?;
    assert_eq!(rep.resolved, 2);
    assert_eq!(rep.placeholders_created, 0);
    assert_eq!(s.count(Table::Packs)?, 2);
    assert_eq!(sale_ref(&s, 1, RefField::Pack)?, json!(1));
    assert_eq!(sale_ref(&s, 2, RefField::Pack)?, json!(1));
    Ok(())
}

#[test]
fn no_pack_to_fall_back_to_is_unresolvable() -> Result<()> {
    let mut s = SqliteStore::open_in_memory(StoreOptions::default())?;
    s.init_schema()?;
    s.insert(Table::Representatives, &row(json!({"code": "R01"})))?;
    s.insert(Table::Clients, &row(json!({"client_id": "C-001"})))?;
    add_sale(&mut s, 1, json!(1), json!(1), json!(5))?;

    let fresh_defects = audit(&s)?;
    let rep = repair(&mut s, &fresh_defects, &RepairPolicy::default())?;
    assert_eq!(rep.resolved, 0);
    assert_eq!(rep.unresolved.len(), 1);
    assert_eq!(rep.unresolved[0].kind, FailureKind::UnresolvableDefect);
    assert_eq!(rep.remaining, Some(1));
    assert_eq!(sale_ref(&s, 1, RefField::Pack)?, json!(5));
    Ok(())
}

#[test]
fn sales_are_never_deleted() -> Result<()> {
    let mut s = base()?;
    // every kind of breakage, some on the same sale
    add_sale(&mut s, 1, json!(999), json!(1), json!(1))?;
    add_sale(&mut s, 2, json!(1), json!(31), json!(1))?;
    add_sale(&mut s, 3, json!(444), json!(32), json!(90))?;
    add_sale(&mut s, 4, Value::Null, json!(1), json!(1))?;
    add_sale(&mut s, 5, json!(1), json!(1), json!(1))?;

    let defects = audit(&s)?;
    let fields: Vec<(i64, RefField)> = defects.iter().map(|d| (d.sale_id, d.broken_field)).collect();
    assert_eq!(
        fields,
        [
            (1, RefField::Client),
            (2, RefField::Representative),
            (3, RefField::Client),
            (3, RefField::Representative),
            (3, RefField::Pack),
            (4, RefField::Client),
        ]
    );

    let rep = repair(&mut s, &defects, &RepairPolicy::default())?;
    assert_eq!(rep.resolved, 3);
    assert_eq!(rep.unresolved.len(), 3);
    assert_eq!(rep.remaining, Some(3));

    // each sale either has no broken reference left or shows up as unresolved
    let left = audit(&s)?;
    for id in 1..=5 {
        assert!(s.read_by_id(Table::Sales, id)?.is_some(), "sale {id} must survive");
        for d in left.iter().filter(|d| d.sale_id == id) {
            assert!(
                rep.unresolved.iter().any(|u| u.defect.sale_id == id
                    && u.defect.broken_field == d.broken_field),
                "{d} neither fixed nor reported"
            );
        }
    }

    let kinds: Vec<(i64, RefField, FailureKind)> = rep
        .unresolved
        .iter()
        .map(|u| (u.defect.sale_id, u.defect.broken_field, u.kind))
        .collect();
    assert_eq!(
        kinds,
        [
            (2, RefField::Representative, FailureKind::UnresolvableDefect),
            (3, RefField::Representative, FailureKind::UnresolvableDefect),
            (4, RefField::Client, FailureKind::UnresolvableDefect),
        ]
    );

    let err = rep.ensure_complete().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<VaultError>(),
        Some(VaultError::PartialFailure { operation: "repair", failed: 3, total: 6 })
    ));
    Ok(())
}

#[test]
fn fallback_representative_when_configured() -> Result<()> {
    let mut s = base()?;
    add_sale(&mut s, 1, json!(1), json!(31), json!(1))?;

    let missing = RepairPolicy {
        fallback_representative: Some(404),
        ..RepairPolicy::default()
    };
    let fresh_defects = audit(&s)?;
    let rep = repair(&mut s, &fresh_defects, &missing)?;
    assert_eq!(rep.unresolved.len(), 1);
    assert_eq!(rep.unresolved[0].kind, FailureKind::NotFound);

    let policy = RepairPolicy {
        fallback_representative: Some(1),
        ..RepairPolicy::default()
    };
    let fresh_defects = audit(&s)?;
    let rep = repair(&mut s, &fresh_defects, &policy)?;
    assert_eq!(rep.resolved, 1);
    assert_eq!(rep.remaining, Some(0));
    assert_eq!(sale_ref(&s, 1, RefField::Representative)?, json!(1));
    Ok(())
}

#[test]
fn vanished_sale_is_not_found() -> Result<()> {
    let mut s = base()?;
    let ghost = Defect {
        sale_id: 12345,
        broken_field: RefField::Client,
        broken_value: json!(3),
    };
    let rep = repair(&mut s, &[ghost], &RepairPolicy::default())?;
    assert_eq!(rep.unresolved.len(), 1);
    assert_eq!(rep.unresolved[0].kind, FailureKind::NotFound);
    assert_eq!(s.count(Table::Clients)?, 1, "no placeholder for a missing sale");
    Ok(())
}

#[test]
fn custom_prefix_is_honoured() -> Result<()> {
    let mut s = base()?;
    add_sale(&mut s, 1, json!("X-77"), json!(1), json!(1))?;
    let policy = RepairPolicy {
        placeholder_prefix: "HIST-".to_string(),
        ..RepairPolicy::default()
    };
    let fresh_defects = audit(&s)?;
    repair(&mut s, &fresh_defects, &policy)?;
    let c = s
        .find_by(Table::Clients, "client_id", &json!("HIST-X-77"))?
        .expect("placeholder");
    assert_eq!(c.get("full_name"), Some(&json!("Client X-77 (Historical)")));
    Ok(())
}

#[test]
fn dry_run_plans_without_writing() -> Result<()> {
    let mut s = base()?;
    add_sale(&mut s, 1, json!(999), json!(31), json!(77))?;
    let before = s.read_all(Table::Sales)?;

    let defects = audit(&s)?;
    let fixes = plan(&s, &defects, &RepairPolicy::default())?;
    let strategies: Vec<Strategy> = fixes.iter().map(|f| f.strategy).collect();
    assert_eq!(
        strategies,
        [Strategy::Placeholder, Strategy::Unmapped, Strategy::FirstPack]
    );
    assert!(fixes[0].action.contains("PLACEHOLDER_999"), "{}", fixes[0].action);
    assert!(fixes[2].action.contains("#1"), "{}", fixes[2].action);

    assert_eq!(s.read_all(Table::Sales)?, before);
    assert_eq!(s.count(Table::Clients)?, 1);
    Ok(())
}
