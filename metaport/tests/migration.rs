use metaport::INVALID_FORMULA;
use metaport::testing::{
    LegacyFixture, TableFixture, column_titled, columns_of, table_named, view_columns, view_titled,
};
use metaport_db::models::{
    ColumnOptions, ComparisonOp, EntityKind, Filter, FormOptions, LogicalOp, RelationType,
    RoleVisibility, Sort, SortDirection, Tenant, TenantUser, View, ViewOptions, uidt,
};
use serde_json::json;

fn orders_and_items() -> LegacyFixture {
    LegacyFixture::new()
        .project("p1", "shop")
        .table(
            "p1",
            TableFixture::new("orders", "Orders")
                .column("id", "Id", "ID")
                .column("title", "Title", "SingleLineText")
                .has_many("items", "order_id", "id")
                .virtual_column(json!({
                    "_cn": "Items",
                    "hm": {"tn": "items", "cn": "order_id", "rtn": "orders", "rcn": "id"}
                })),
        )
        .table(
            "p1",
            TableFixture::new("items", "Items")
                .column("id", "Id", "ID")
                .column("order_id", "OrderId", "Number")
                .belongs_to("order_id", "orders", "id"),
        )
}

#[tokio::test]
async fn test_end_to_end_single_tenant() {
    let (store, report) = orders_and_items()
        .relation("p1", "items", "order_id", "orders", "id", "real")
        .view(
            "p1",
            "orders",
            "Order Form",
            "form",
            json!({
                "extraViewParams": {"formParams": {
                    "name": "New order",
                    "description": "Fill in the order",
                    "submit": {"message": "Thanks!"},
                    "fields": {"Items": {"required": true, "help": "pick one", "label": "Lines"}}
                }}
            }),
        )
        .migrate()
        .await
        .unwrap();

    assert!(report.is_clean(), "{:?}", report.failures);
    assert_eq!(report.tenants, 1);

    let orders = table_named(&store, "orders").unwrap();
    assert_eq!(orders.title, "Orders");
    let items = table_named(&store, "items").unwrap();

    let title = column_titled(&store, &orders.id, "Title").unwrap();
    assert_eq!(title.column_name.as_deref(), Some("title"));
    assert_eq!(title.options, ColumnOptions::Plain);

    let fk = column_titled(&store, &items.id, "OrderId").unwrap();
    assert_eq!(fk.uidt, uidt::FOREIGN_KEY);
    assert!(fk.system);

    let relation_column = column_titled(&store, &orders.id, "Items").unwrap();
    let relation = relation_column.relation().unwrap();
    assert_eq!(relation.relation_type, RelationType::HasMany);
    assert_eq!(relation.child_column_id, fk.id);
    assert_eq!(relation.related_table_id, items.id);
    assert!(!relation.is_virtual);
    assert!(!relation_column.system);

    // the declared has-many is not synthesized a second time
    assert!(columns_of(&store, &orders.id).iter().all(|c| !c.system));

    let form = view_titled(&store, &orders.id, "Order Form").unwrap();
    match &form.options {
        ViewOptions::Form(FormOptions {
            heading,
            subheading,
            success_msg,
            ..
        }) => {
            assert_eq!(heading.as_deref(), Some("New order"));
            assert_eq!(subheading.as_deref(), Some("Fill in the order"));
            assert_eq!(success_msg.as_deref(), Some("Thanks!"));
        }
        other => panic!("expected a form view, got {other:?}"),
    }
    let override_column = view_columns(&store, &form.id)
        .into_iter()
        .find(|vc| vc.column_id == relation_column.id)
        .unwrap();
    assert_eq!(override_column.required, Some(true));
    assert_eq!(override_column.help.as_deref(), Some("pick one"));
    assert_eq!(override_column.label.as_deref(), Some("Lines"));

    assert!(view_titled(&store, &orders.id, "Orders").is_some());
    assert!(view_titled(&store, &items.id, "Items").is_some());
}

#[tokio::test]
async fn test_implicit_has_many_becomes_system_column() {
    let (store, report) = LegacyFixture::new()
        .project("p1", "shop")
        .table(
            "p1",
            TableFixture::new("orders", "Orders")
                .column("id", "Id", "ID")
                .has_many("items", "order_id", "id"),
        )
        .table(
            "p1",
            TableFixture::new("items", "Items")
                .column("id", "Id", "ID")
                .column("order_id", "OrderId", "Number"),
        )
        .migrate()
        .await
        .unwrap();

    assert!(report.is_clean(), "{:?}", report.failures);
    let orders = table_named(&store, "orders").unwrap();
    let synthesized = column_titled(&store, &orders.id, "itemsList").unwrap();
    assert!(synthesized.system);
    assert_eq!(synthesized.uidt, uidt::LINK_TO_ANOTHER_RECORD);
}

#[tokio::test]
async fn test_virtual_flag_follows_relation_definitions() {
    let (store, _) = orders_and_items()
        .relation("p1", "items", "order_id", "orders", "id", "virtual")
        .migrate()
        .await
        .unwrap();
    let orders = table_named(&store, "orders").unwrap();
    let relation = column_titled(&store, &orders.id, "Items").unwrap();
    assert!(relation.relation().unwrap().is_virtual);

    let (store, _) = orders_and_items().migrate().await.unwrap();
    let orders = table_named(&store, "orders").unwrap();
    let relation = column_titled(&store, &orders.id, "Items").unwrap();
    assert!(!relation.relation().unwrap().is_virtual);
}

#[tokio::test]
async fn test_lookup_resolves_forward_reference() {
    let (store, report) = LegacyFixture::new()
        .project("p1", "crm")
        .table(
            "p1",
            TableFixture::new("customers", "Customers")
                .column("id", "Id", "ID")
                .column("name", "Name", "SingleLineText")
                .virtual_column(json!({
                    "_cn": "Order Totals",
                    "lk": {"type": "hm", "tn": "orders", "cn": "customer_id", "rtn": "customers", "rcn": "id",
                           "ltn": "orders", "lcn": "total"}
                }))
                .virtual_column(json!({
                    "_cn": "Orders",
                    "hm": {"tn": "orders", "cn": "customer_id", "rtn": "customers", "rcn": "id"}
                })),
        )
        .table(
            "p1",
            TableFixture::new("orders", "Orders")
                .column("id", "Id", "ID")
                .column("customer_id", "CustomerId", "Number")
                .column("total", "Total", "Decimal"),
        )
        .migrate()
        .await
        .unwrap();

    assert!(report.is_clean(), "{:?}", report.failures);
    let customers = table_named(&store, "customers").unwrap();
    let orders = table_named(&store, "orders").unwrap();
    let relation = column_titled(&store, &customers.id, "Orders").unwrap();
    let total = column_titled(&store, &orders.id, "Total").unwrap();
    let lookup = column_titled(&store, &customers.id, "Order Totals").unwrap();
    assert_eq!(lookup.uidt, uidt::LOOKUP);
    match lookup.options {
        ColumnOptions::Lookup(options) => {
            assert_eq!(options.relation_column_id, relation.id);
            assert_eq!(options.lookup_column_id, total.id);
        }
        other => panic!("expected lookup options, got {other:?}"),
    }
}

#[tokio::test]
async fn test_lookup_binds_to_matching_endpoints_not_swapped_ones() {
    let (store, report) = LegacyFixture::new()
        .project("p1", "org")
        .table(
            "p1",
            TableFixture::new("people", "People")
                .column("id", "Id", "ID")
                .column("manager_id", "ManagerId", "Number")
                .column("name", "Name", "SingleLineText")
                .virtual_column(json!({
                    "_cn": "Swapped",
                    "hm": {"tn": "people", "cn": "id", "rtn": "people", "rcn": "manager_id"}
                }))
                .virtual_column(json!({
                    "_cn": "Reports",
                    "hm": {"tn": "people", "cn": "manager_id", "rtn": "people", "rcn": "id"}
                }))
                .virtual_column(json!({
                    "_cn": "Report Names",
                    "lk": {"type": "hm", "tn": "people", "cn": "manager_id", "rtn": "people", "rcn": "id",
                           "ltn": "people", "lcn": "name"}
                }))
                .virtual_column(json!({
                    "_cn": "Report Count",
                    "rl": {"type": "hm", "tn": "people", "cn": "manager_id", "rtn": "people", "rcn": "id",
                           "rltn": "people", "rlcn": "id", "fn": "count"}
                })),
        )
        .migrate()
        .await
        .unwrap();

    assert!(report.is_clean(), "{:?}", report.failures);
    let people = table_named(&store, "people").unwrap();
    let reports = column_titled(&store, &people.id, "Reports").unwrap();
    let swapped = column_titled(&store, &people.id, "Swapped").unwrap();
    assert_ne!(reports.id, swapped.id);

    match column_titled(&store, &people.id, "Report Names").unwrap().options {
        ColumnOptions::Lookup(options) => assert_eq!(options.relation_column_id, reports.id),
        other => panic!("expected lookup options, got {other:?}"),
    }
    match column_titled(&store, &people.id, "Report Count").unwrap().options {
        ColumnOptions::Rollup(options) => {
            assert_eq!(options.relation_column_id, reports.id);
            assert_eq!(options.rollup_function.as_deref(), Some("count"));
        }
        other => panic!("expected rollup options, got {other:?}"),
    }
}

#[tokio::test]
async fn test_lookup_without_relation_is_reported() {
    let (store, report) = LegacyFixture::new()
        .project("p1", "crm")
        .table(
            "p1",
            TableFixture::new("customers", "Customers")
                .column("id", "Id", "ID")
                .virtual_column(json!({
                    "_cn": "Dangling",
                    "lk": {"type": "hm", "tn": "customers", "cn": "id", "rtn": "customers", "rcn": "id",
                           "ltn": "customers", "lcn": "id"}
                })),
        )
        .migrate()
        .await
        .unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].code, "relation_not_found");
    assert_eq!(report.failures[0].phase.as_deref(), Some("computed-columns"));
    let customers = table_named(&store, "customers").unwrap();
    assert!(column_titled(&store, &customers.id, "Dangling").is_none());
}

#[tokio::test]
async fn test_formula_columns_never_fail() {
    let (store, report) = LegacyFixture::new()
        .project("p1", "shop")
        .table(
            "p1",
            TableFixture::new("products", "Products")
                .column("id", "Id", "ID")
                .column("price", "Price", "Decimal")
                .virtual_column(json!({"_cn": "Double", "formula": {"value": "Price * 2"}}))
                .virtual_column(json!({"_cn": "Broken", "formula": {"value": "Missing * 2"}}))
                .virtual_column(json!({"_cn": "Flagged", "formula": {"value": "Price +", "error": ["Unexpected end"]}})),
        )
        .migrate()
        .await
        .unwrap();

    assert!(report.is_clean(), "{:?}", report.failures);
    let products = table_named(&store, "products").unwrap();
    let price = column_titled(&store, &products.id, "Price").unwrap();

    let formula = |title: &str| match column_titled(&store, &products.id, title).unwrap().options {
        ColumnOptions::Formula(options) => options,
        other => panic!("expected formula options, got {other:?}"),
    };

    let double = formula("Double");
    assert_eq!(double.formula, Some(format!("{{{}}} * 2", price.id)));
    assert!(double.error.is_none());

    let broken = formula("Broken");
    assert!(broken.formula.is_none());
    assert_eq!(broken.error.as_deref(), Some(INVALID_FORMULA));
    assert_eq!(broken.formula_raw, "Missing * 2");

    let flagged = formula("Flagged");
    assert_eq!(flagged.error.as_deref(), Some("Unexpected end"));
    assert_eq!(flagged.formula_raw, "Price +");
}

#[tokio::test]
async fn test_view_column_order_and_visibility() {
    let (store, report) = LegacyFixture::new()
        .project("p1", "abc")
        .table(
            "p1",
            TableFixture::new("letters", "Letters")
                .column("a", "a", "SingleLineText")
                .column("b", "b", "SingleLineText")
                .column("c", "c", "SingleLineText")
                .view_order(2)
                .query_params(json!({
                    "fieldsOrder": ["b", "a"],
                    "showFields": {"a": true, "b": false},
                    "columnsWidth": {"a": "200px"},
                    "viewStatus": {"type": "locked"}
                })),
        )
        .view("p1", "letters", "Picked", "grid", json!({"showFields": {"b": false}}))
        .migrate()
        .await
        .unwrap();

    assert!(report.is_clean(), "{:?}", report.failures);
    let letters = table_named(&store, "letters").unwrap();
    let columns = columns_of(&store, &letters.id);
    let alias_of = |id: &str| columns.iter().find(|c| c.id == id).unwrap().title.clone();

    let default_view = view_titled(&store, &letters.id, "Letters").unwrap();
    assert_eq!(default_view.order, Some(2));
    assert_eq!(default_view.lock_type, "locked");
    let vcs = view_columns(&store, &default_view.id);
    let order: Vec<String> = vcs.iter().map(|vc| alias_of(&vc.column_id)).collect();
    assert_eq!(order, vec!["b", "a", "c"]);
    let shown: Vec<bool> = vcs.iter().map(|vc| vc.show).collect();
    assert_eq!(shown, vec![false, true, false]);
    assert_eq!(vcs[1].width.as_deref(), Some("200px"));

    let picked = view_titled(&store, &letters.id, "Picked").unwrap();
    assert_eq!(picked.lock_type, "collaborative");
    let shown: Vec<(String, bool)> = view_columns(&store, &picked.id)
        .iter()
        .map(|vc| (alias_of(&vc.column_id), vc.show))
        .collect();
    assert_eq!(
        shown,
        vec![("a".to_string(), true), ("b".to_string(), false), ("c".to_string(), true)]
    );
}

#[tokio::test]
async fn test_view_sorts_and_filters() {
    let (store, report) = LegacyFixture::new()
        .project("p1", "shop")
        .table(
            "p1",
            TableFixture::new("orders", "Orders")
                .column("id", "Id", "ID")
                .column("title", "Title", "SingleLineText")
                .query_params(json!({
                    "sortList": [{"field": "Title", "order": "-"}, {"field": "gone", "order": ""}],
                    "filters": [
                        {"field": "Title", "op": "is not equal", "value": "x", "logicOp": "and"},
                        {"field": "title", "op": "is like", "value": "%a%", "logicOp": "or"},
                        {"field": "gone", "op": "sounds like", "value": "y", "logicOp": "and"}
                    ]
                })),
        )
        .migrate()
        .await
        .unwrap();

    assert!(report.is_clean(), "{:?}", report.failures);
    let orders = table_named(&store, "orders").unwrap();
    let title = column_titled(&store, &orders.id, "Title").unwrap();
    let view = view_titled(&store, &orders.id, "Orders").unwrap();

    let sorts: Vec<Sort> = store.all_entities().unwrap();
    assert_eq!(sorts.len(), 2);
    assert!(sorts.iter().all(|s| s.view_id == view.id));
    assert_eq!(sorts[0].column_id.as_deref(), Some(title.id.as_str()));
    assert_eq!(sorts[0].direction, SortDirection::Desc);
    assert!(sorts[1].column_id.is_none());
    assert_eq!(sorts[1].direction, SortDirection::Asc);

    let filters: Vec<Filter> = store.all_entities().unwrap();
    assert_eq!(filters.len(), 3);
    assert_eq!(filters[0].comparison_op, Some(ComparisonOp::Neq));
    assert_eq!(filters[0].logical_op, Some(LogicalOp::And));
    assert_eq!(filters[0].column_id.as_deref(), Some(title.id.as_str()));
    assert_eq!(filters[1].comparison_op, Some(ComparisonOp::Like));
    assert_eq!(filters[1].column_id.as_deref(), Some(title.id.as_str()));
    assert!(filters[2].comparison_op.is_none());
    assert!(filters[2].column_id.is_none());
    assert!(filters.iter().all(|f| f.view_id.as_deref() == Some(view.id.as_str())));
}

#[tokio::test]
async fn test_unsupported_view_type_is_reported() {
    let (store, report) = orders_and_items()
        .view("p1", "orders", "Board", "kanban", json!({}))
        .view("p1", "missing_table", "Lost", "grid", json!({}))
        .migrate()
        .await
        .unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].code, "unsupported_view_type");
    assert!(report.skipped.iter().any(|s| s.reason.contains("Lost")));
    let orders = table_named(&store, "orders").unwrap();
    assert!(view_titled(&store, &orders.id, "Board").is_none());
    assert!(view_titled(&store, &orders.id, "Orders").is_some());
}

#[tokio::test]
async fn test_orphan_memberships_are_skipped() {
    let (store, report) = LegacyFixture::new()
        .project("p1", "shop")
        .user("u1", "a@example.com")
        .member("p1", "u1", "owner")
        .member("p1", "u404", "editor")
        .member("p404", "u1", "editor")
        .migrate()
        .await
        .unwrap();

    assert!(report.is_clean());
    let memberships: Vec<TenantUser> = store.all_entities().unwrap();
    assert_eq!(memberships.len(), 1);
    assert_eq!(memberships[0].user_id, "u1");
    assert_eq!(memberships[0].tenant_id, "p1");
    let skipped = report
        .skipped
        .iter()
        .filter(|s| s.collection == "nc_projects_users")
        .count();
    assert_eq!(skipped, 2);
}

#[tokio::test]
async fn test_tables_resolve_by_name_and_alias() {
    let (store, report) = orders_and_items()
        .row(
            "nc_disabled_models_for_role",
            json!({"project_id": "p1", "title": "orders", "role": "viewer", "disabled": 1}),
        )
        .row(
            "nc_shared_views",
            json!({"project_id": "p1", "model_name": "Items", "view_type": "table", "view_id": "share-1", "password": "pw"}),
        )
        .row(
            "nc_hooks",
            json!({"project_id": "p1", "tn": "orders", "title": "notify", "event": "after", "operation": "insert",
                   "active": 1, "condition": "[{\"field\": \"title\", \"op\": \"is equal\", \"value\": \"x\"}]"}),
        )
        .row(
            "nc_audit",
            json!({"project_id": "p1", "model_name": "Orders", "op_type": "DATA", "description": "insert"}),
        )
        .row(
            "nc_audit",
            json!({"project_id": "p1", "model_name": "nowhere", "op_type": "DATA"}),
        )
        .migrate()
        .await
        .unwrap();

    assert!(report.is_clean(), "{:?}", report.failures);
    let orders = table_named(&store, "orders").unwrap();
    let items = table_named(&store, "items").unwrap();

    let rules: Vec<RoleVisibility> = store.all_entities().unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].view_id, view_titled(&store, &orders.id, "Orders").unwrap().id);
    assert!(rules[0].disabled);

    let shared = view_titled(&store, &items.id, "Items").unwrap();
    assert_eq!(shared.uuid.as_deref(), Some("share-1"));
    assert_eq!(shared.password.as_deref(), Some("pw"));

    let hooks = store.all(EntityKind::Hook);
    assert_eq!(hooks.len(), 1);
    assert_eq!(hooks[0]["table_id"], json!(orders.id));
    assert_eq!(hooks[0]["condition"], json!(true));
    let filters: Vec<Filter> = store.all_entities().unwrap();
    let hook_filter = filters.iter().find(|f| f.hook_id.is_some()).unwrap();
    assert_eq!(hook_filter.comparison_op, Some(ComparisonOp::Eq));
    assert_eq!(
        hook_filter.column_id.as_deref(),
        Some(column_titled(&store, &orders.id, "Title").unwrap().id.as_str())
    );

    let audits = store.all(EntityKind::Audit);
    assert_eq!(audits.len(), 2);
    assert_eq!(audits[0]["table_id"], json!(orders.id));
    assert!(audits[1]["table_id"].is_null());
}

#[tokio::test]
async fn test_tenant_and_shared_base() {
    let (store, report) = LegacyFixture::new()
        .project("p1", "shop")
        .row(
            "nc_shared_bases",
            json!({"project_id": "p1", "shared_base_id": "base-uuid", "password": "s3cret", "roles": "viewer"}),
        )
        .row("nc_shared_bases", json!({"project_id": "p9", "shared_base_id": "x"}))
        .row("nc_plugins", json!({"title": "Slack", "active": 0, "version": "0.1"}))
        .migrate()
        .await
        .unwrap();

    assert!(report.is_clean());
    let tenant: Tenant = store.get("p1").unwrap();
    assert_eq!(tenant.title.as_deref(), Some("shop"));
    assert_eq!(tenant.prefix.as_deref(), Some("nc_"));
    assert!(tenant.is_meta);
    assert_eq!(tenant.uuid.as_deref(), Some("base-uuid"));
    assert_eq!(tenant.roles.as_deref(), Some("viewer"));

    let bases = store.all(EntityKind::Base);
    assert_eq!(bases.len(), 1);
    assert_eq!(bases[0]["client"], "pg");
    assert_eq!(bases[0]["inflection_table"], "camelize");

    let plugins = store.all(EntityKind::Plugin);
    assert_eq!(plugins.len(), 1);
    assert_eq!(plugins[0]["active"], json!(false));
    assert!(report.skipped.iter().any(|s| s.collection == "nc_shared_bases"));
}

#[tokio::test]
async fn test_models_of_unknown_tenants_are_skipped() {
    let (store, report) = LegacyFixture::new()
        .table("ghost", TableFixture::new("orders", "Orders").column("id", "Id", "ID"))
        .migrate()
        .await
        .unwrap();
    assert!(table_named(&store, "orders").is_none());
    assert!(report.skipped.iter().any(|s| s.collection == "nc_models"));
}

#[tokio::test]
async fn test_audit_resolves_table_by_legacy_model_id() {
    let (store, report) = LegacyFixture::new()
        .project("p1", "shop")
        .table(
            "p1",
            TableFixture::new("orders", "Orders")
                .legacy_id("42")
                .column("id", "Id", "ID"),
        )
        .row(
            "nc_audit",
            json!({"project_id": "p1", "model_name": "renamed_since", "model_id": "42", "op_type": "DATA"}),
        )
        .row(
            "nc_audit",
            json!({"project_id": "p1", "model_id": "42", "op_type": "DATA"}),
        )
        .migrate()
        .await
        .unwrap();

    assert!(report.is_clean(), "{:?}", report.failures);
    let orders = table_named(&store, "orders").unwrap();
    let audits = store.all(EntityKind::Audit);
    assert_eq!(audits.len(), 2);
    assert_eq!(audits[0]["table_id"], json!(orders.id));
    assert_eq!(audits[0]["row_id"], "42");
    // no model name, no table
    assert!(audits[1]["table_id"].is_null());
}

#[tokio::test]
async fn test_unknown_relation_token_is_reported() {
    let (store, report) = orders_and_items()
        .table(
            "p1",
            TableFixture::new("notes", "Notes")
                .column("id", "Id", "ID")
                .virtual_column(json!({
                    "_cn": "Shouty Lookup",
                    "lk": {"type": "HM", "tn": "items", "cn": "order_id", "rtn": "orders", "rcn": "id",
                           "ltn": "items", "lcn": "id"}
                }))
                .virtual_column(json!({
                    "_cn": "Odd Rollup",
                    "rl": {"type": "oo", "tn": "items", "cn": "order_id", "rtn": "orders", "rcn": "id",
                           "rltn": "items", "rlcn": "id", "fn": "count"}
                }))
                .virtual_column(json!("garbage")),
        )
        .migrate()
        .await
        .unwrap();

    assert_eq!(report.failures.len(), 2, "{:?}", report.failures);
    assert!(report.failures.iter().all(|f| f.code == "relation_not_found"));
    assert!(
        report
            .failures
            .iter()
            .all(|f| f.phase.as_deref() == Some("computed-columns"))
    );
    assert!(
        report
            .skipped
            .iter()
            .any(|s| s.collection == "nc_models" && s.reason.contains("undecodable virtual column"))
    );
    let notes = table_named(&store, "notes").unwrap();
    assert!(column_titled(&store, &notes.id, "Shouty Lookup").is_none());
    assert!(column_titled(&store, &notes.id, "Odd Rollup").is_none());
}

#[tokio::test]
async fn test_declared_view_keeps_legacy_timestamps() {
    let (store, report) = orders_and_items()
        .row(
            "nc_models",
            json!({
                "project_id": "p1",
                "title": "Recent",
                "alias": "Recent",
                "type": "vtable",
                "parent_model_title": "orders",
                "show_as": "grid",
                "query_params": "{}",
                "created_at": "2021-09-01 10:11:12",
                "updated_at": "2021-09-02 08:00:00"
            }),
        )
        .migrate()
        .await
        .unwrap();

    assert!(report.is_clean(), "{:?}", report.failures);
    let orders = table_named(&store, "orders").unwrap();
    let recent = view_titled(&store, &orders.id, "Recent").unwrap();
    assert!(recent.stamps.created_at.is_some());
    assert!(recent.stamps.updated_at.is_some());
    assert!(recent.stamps.created_at < recent.stamps.updated_at);
    let default_view = view_titled(&store, &orders.id, "Orders").unwrap();
    assert!(default_view.stamps.created_at.is_none());
}

fn films_and_actors() -> LegacyFixture {
    LegacyFixture::new()
        .project("p1", "movies")
        .table(
            "p1",
            TableFixture::new("films", "Films")
                .column("id", "Id", "ID")
                .column("title", "Title", "SingleLineText")
                .column("poster", "Poster", "Attachment")
                .virtual_column(json!({
                    "_cn": "Actor Names",
                    "lk": {"type": "mm", "tn": "films", "cn": "id", "rtn": "actors", "rcn": "id",
                           "vtn": "films_actors", "vcn": "film_id", "vrcn": "actor_id",
                           "ltn": "actors", "lcn": "name"}
                }))
                .virtual_column(json!({
                    "_cn": "Actors",
                    "mm": {"tn": "films", "cn": "id", "rtn": "actors", "rcn": "id",
                           "vtn": "films_actors", "vcn": "film_id", "vrcn": "actor_id"}
                })),
        )
        .table(
            "p1",
            TableFixture::new("actors", "Actors")
                .column("id", "Id", "ID")
                .column("name", "Name", "SingleLineText"),
        )
        .table(
            "p1",
            TableFixture::new("films_actors", "FilmsActors")
                .column("film_id", "FilmId", "Number")
                .column("actor_id", "ActorId", "Number"),
        )
}

#[tokio::test]
async fn test_many_to_many_relation_and_lookup() {
    let (store, report) = films_and_actors()
        .relation("p1", "films_actors", "film_id", "films", "id", "virtual")
        .migrate()
        .await
        .unwrap();

    assert!(report.is_clean(), "{:?}", report.failures);
    let films = table_named(&store, "films").unwrap();
    let actors = table_named(&store, "actors").unwrap();
    let junction = table_named(&store, "films_actors").unwrap();

    let relation_column = column_titled(&store, &films.id, "Actors").unwrap();
    let relation = relation_column.relation().unwrap();
    assert_eq!(relation.relation_type, RelationType::ManyToMany);
    assert_eq!(relation.related_table_id, actors.id);
    assert_eq!(relation.child_column_id, column_titled(&store, &films.id, "Id").unwrap().id);
    assert_eq!(relation.parent_column_id, column_titled(&store, &actors.id, "Id").unwrap().id);
    let link = relation.junction.as_ref().unwrap();
    assert_eq!(link.table_id, junction.id);
    assert_eq!(link.child_column_id, column_titled(&store, &junction.id, "FilmId").unwrap().id);
    assert_eq!(link.parent_column_id, column_titled(&store, &junction.id, "ActorId").unwrap().id);
    assert!(relation.is_virtual);

    match column_titled(&store, &films.id, "Actor Names").unwrap().options {
        ColumnOptions::Lookup(options) => {
            assert_eq!(options.relation_column_id, relation_column.id);
            assert_eq!(
                options.lookup_column_id,
                column_titled(&store, &actors.id, "Name").unwrap().id
            );
        }
        other => panic!("expected lookup options, got {other:?}"),
    }
}

#[tokio::test]
async fn test_gallery_view_cover_and_form_help_limit() {
    let long_help = "h".repeat(300);
    let (store, report) = films_and_actors()
        .view("p1", "films", "Posters", "gallery", json!({"coverImageField": "Poster"}))
        .view("p1", "films", "Bare Gallery", "gallery", json!({"coverImageField": "Nope"}))
        .view(
            "p1",
            "films",
            "Suggest",
            "form",
            json!({"extraViewParams": {"formParams": {"fields": {"Title": {"help": long_help}}}}}),
        )
        .migrate()
        .await
        .unwrap();

    assert!(report.is_clean(), "{:?}", report.failures);
    let films = table_named(&store, "films").unwrap();
    let poster = column_titled(&store, &films.id, "Poster").unwrap();
    let title = column_titled(&store, &films.id, "Title").unwrap();

    let gallery = view_titled(&store, &films.id, "Posters").unwrap();
    assert_eq!(
        gallery.options,
        ViewOptions::Gallery {
            cover_image_column_id: Some(poster.id.clone())
        }
    );
    let bare = view_titled(&store, &films.id, "Bare Gallery").unwrap();
    assert_eq!(
        bare.options,
        ViewOptions::Gallery {
            cover_image_column_id: None
        }
    );

    let form = view_titled(&store, &films.id, "Suggest").unwrap();
    let help = view_columns(&store, &form.id)
        .into_iter()
        .find(|vc| vc.column_id == title.id)
        .and_then(|vc| vc.help)
        .unwrap();
    assert_eq!(help.chars().count(), 254);
}

#[tokio::test]
async fn test_declared_view_titled_like_table_keeps_default_view_settings() {
    let (store, report) = LegacyFixture::new()
        .project("p1", "shop")
        .table(
            "p1",
            TableFixture::new("orders", "Orders")
                .column("id", "Id", "ID")
                .column("title", "Title", "SingleLineText")
                .query_params(json!({"sortList": [{"field": "Title", "order": "-"}]})),
        )
        .view(
            "p1",
            "orders",
            "Orders",
            "grid",
            json!({"filters": [{"field": "Title", "op": "is equal", "value": "x"}]}),
        )
        .migrate()
        .await
        .unwrap();

    assert!(report.is_clean(), "{:?}", report.failures);
    let orders = table_named(&store, "orders").unwrap();
    let views: Vec<View> = store.all_entities().unwrap();
    let same_title: Vec<&View> = views
        .iter()
        .filter(|v| v.table_id == orders.id && v.title == "Orders")
        .collect();
    assert_eq!(same_title.len(), 2);
    let (default_view, declared) = (same_title[0], same_title[1]);

    let sorts: Vec<Sort> = store.all_entities().unwrap();
    assert_eq!(sorts.len(), 1);
    assert_eq!(sorts[0].view_id, default_view.id);
    assert_eq!(sorts[0].direction, SortDirection::Desc);

    let filters: Vec<Filter> = store.all_entities().unwrap();
    assert_eq!(filters.len(), 1);
    assert_eq!(filters[0].view_id.as_deref(), Some(declared.id.as_str()));
}
