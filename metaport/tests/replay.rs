use std::sync::Arc;

use metaport::testing::{LegacyFixture, TableFixture, column_titled, table_named};
use metaport::{DrainMode, Migrator};
use metaport_db::models::{ColumnOptions, EntityKind};
use metaport_db::{JsonDirSource, MemoryStore};
use serde_json::json;

fn write_collection(dir: &std::path::Path, name: &str, rows: serde_json::Value) {
    std::fs::write(dir.join(format!("{name}.json")), rows.to_string()).unwrap();
}

#[tokio::test]
async fn test_replay_from_exported_collections() {
    let dir = tempfile::tempdir().unwrap();
    write_collection(
        dir.path(),
        "nc_projects",
        json!([{
            "id": "p1",
            "title": "shop",
            "config": "{\"prefix\": \"nc_\", \"envs\": {\"_noco\": {\"db\": [{\"client\": \"sqlite3\"}]}}}"
        }]),
    );
    write_collection(
        dir.path(),
        "nc_models",
        json!([{
            "project_id": "p1",
            "title": "notes",
            "alias": "Notes",
            "type": "table",
            "meta": "{\"columns\": [{\"cn\": \"body\", \"_cn\": \"Body\", \"uidt\": \"LongText\"}], \"v\": [\"garbage\"]}",
            "query_params": "not json"
        }]),
    );

    let store = Arc::new(MemoryStore::new());
    let report = Migrator::builder(Arc::new(JsonDirSource::new(dir.path())), store.clone())
        .build()
        .run()
        .await
        .unwrap();

    assert!(report.is_clean(), "{:?}", report.failures);
    assert_eq!(report.tenants, 1);
    let notes = table_named(&store, "notes").unwrap();
    assert!(column_titled(&store, &notes.id, "Body").is_some());
    assert_eq!(store.count(EntityKind::View), 1);
    assert_eq!(store.count(EntityKind::User), 0);
}

#[tokio::test]
async fn test_concurrent_drain_matches_sequential() {
    let fixture = LegacyFixture::new().project("p1", "crm").table(
        "p1",
        TableFixture::new("customers", "Customers")
            .column("id", "Id", "ID")
            .column("name", "Name", "SingleLineText")
            .virtual_column(json!({
                "_cn": "Orders",
                "hm": {"tn": "orders", "cn": "customer_id", "rtn": "customers", "rcn": "id"}
            }))
            .virtual_column(json!({
                "_cn": "Order Totals",
                "lk": {"type": "hm", "tn": "orders", "cn": "customer_id", "rtn": "customers", "rcn": "id",
                       "ltn": "orders", "lcn": "total"}
            }))
            .virtual_column(json!({"_cn": "Shout", "formula": {"value": "UPPER(Name)"}})),
    );
    let fixture = fixture.table(
        "p1",
        TableFixture::new("orders", "Orders")
            .column("id", "Id", "ID")
            .column("customer_id", "CustomerId", "Number")
            .column("total", "Total", "Decimal"),
    );

    let store = Arc::new(MemoryStore::new());
    let report = Migrator::builder(Arc::new(fixture.source()), store.clone())
        .drain_mode(DrainMode::Concurrent(4))
        .build()
        .run()
        .await
        .unwrap();

    assert!(report.is_clean(), "{:?}", report.failures);
    let customers = table_named(&store, "customers").unwrap();
    let name = column_titled(&store, &customers.id, "Name").unwrap();
    match column_titled(&store, &customers.id, "Shout").unwrap().options {
        ColumnOptions::Formula(options) => {
            assert_eq!(options.formula, Some(format!("UPPER({{{}}})", name.id)));
        }
        other => panic!("expected formula options, got {other:?}"),
    }
    assert!(matches!(
        column_titled(&store, &customers.id, "Order Totals").unwrap().options,
        ColumnOptions::Lookup(_)
    ));
    assert_eq!(store.count(EntityKind::View), 2);
}
