//! Catalog surface tests: product listing filters/sorting, single product
//! view, categories, tenants.

use axum::http::StatusCode;

mod common;
use common::*;

#[tokio::test]
async fn test_list_products_empty_catalog() {
    let state = create_test_app_state();
    let app = test_app(state);

    let response = get(app, "/products", None).await;
    assert_status(&response, StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["total"], 0);
    assert_eq!(json["items"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_list_products_filters_by_tenant() {
    let state = create_test_app_state();
    {
        let conn = state.db.get().unwrap();
        let acme = create_test_tenant(&conn, "acme", true);
        let globex = create_test_tenant(&conn, "globex", true);
        create_test_product(&conn, &acme.id, "A1", 1000);
        create_test_product(&conn, &acme.id, "A2", 2000);
        create_test_product(&conn, &globex.id, "G1", 3000);
    }
    let app = test_app(state);

    let response = get(app, "/products?tenant=acme", None).await;
    let json = body_json(response).await;

    assert_eq!(json["total"], 2);
    for item in json["items"].as_array().unwrap() {
        assert_eq!(item["tenant"]["slug"], "acme");
    }
}

#[tokio::test]
async fn test_list_products_price_range() {
    let state = create_test_app_state();
    {
        let conn = state.db.get().unwrap();
        let tenant = create_test_tenant(&conn, "acme", true);
        create_test_product(&conn, &tenant.id, "Cheap", 500);
        create_test_product(&conn, &tenant.id, "Mid", 1500);
        create_test_product(&conn, &tenant.id, "Expensive", 5000);
    }
    let app = test_app(state);

    let response = get(app, "/products?min_price=1000&max_price=2000", None).await;
    let json = body_json(response).await;

    assert_eq!(json["total"], 1);
    assert_eq!(json["items"][0]["name"], "Mid");
}

#[tokio::test]
async fn test_list_products_category_includes_subcategories() {
    let state = create_test_app_state();
    {
        let conn = state.db.get().unwrap();
        let tenant = create_test_tenant(&conn, "acme", true);
        let software = create_test_category(&conn, "software", None);
        let devtools = create_test_category(&conn, "developer-tools", Some(&software.id));
        let design = create_test_category(&conn, "design", None);

        for (name, category) in [
            ("Editor", &devtools),
            ("Compiler", &software),
            ("Icons", &design),
        ] {
            queries::create_product(
                &conn,
                &tenant.id,
                &CreateProduct {
                    name: name.to_string(),
                    description: None,
                    price_cents: 1000,
                    currency: None,
                    category_id: Some(category.id.clone()),
                    refund_policy: None,
                },
            )
            .unwrap();
        }
    }
    let app = test_app(state);

    // "software" matches products in software AND its subcategory.
    let response = get(app.clone(), "/products?category=software", None).await;
    let json = body_json(response).await;
    assert_eq!(json["total"], 2);

    // A subcategory slug matches only itself.
    let response = get(app, "/products?category=developer-tools", None).await;
    let json = body_json(response).await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["items"][0]["name"], "Editor");
}

#[tokio::test]
async fn test_list_products_sort_by_price() {
    let state = create_test_app_state();
    {
        let conn = state.db.get().unwrap();
        let tenant = create_test_tenant(&conn, "acme", true);
        create_test_product(&conn, &tenant.id, "Mid", 1500);
        create_test_product(&conn, &tenant.id, "Cheap", 500);
        create_test_product(&conn, &tenant.id, "Expensive", 5000);
    }
    let app = test_app(state);

    let response = get(app, "/products?sort=price_asc", None).await;
    let json = body_json(response).await;

    let names: Vec<&str> = json["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Cheap", "Mid", "Expensive"]);
}

#[tokio::test]
async fn test_list_products_pagination() {
    let state = create_test_app_state();
    {
        let conn = state.db.get().unwrap();
        let tenant = create_test_tenant(&conn, "acme", true);
        for i in 0..5i64 {
            create_test_product(&conn, &tenant.id, &format!("P{}", i), 1000 + i);
        }
    }
    let app = test_app(state);

    let response = get(app, "/products?limit=2&offset=2&sort=price_asc", None).await;
    let json = body_json(response).await;

    assert_eq!(json["total"], 5);
    assert_eq!(json["limit"], 2);
    assert_eq!(json["offset"], 2);
    let items = json["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["name"], "P2");
}

#[tokio::test]
async fn test_get_product_not_found() {
    let state = create_test_app_state();
    let app = test_app(state);

    let response = get(app, "/products/bz_prod_00000000000000000000000000000099", None).await;
    assert_status(&response, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_product_is_purchased_reflects_ledger() {
    let state = create_test_app_state();
    let token;
    let product_id;
    {
        let conn = state.db.get().unwrap();
        let (user, t) = create_test_user(&conn, "buyer@example.com");
        token = t;
        let tenant = create_test_tenant(&conn, "acme", true);
        let product = create_test_product(&conn, &tenant.id, "Widget", 1000);
        product_id = product.id.clone();
        create_test_order(&conn, &user.id, &product, "pay_owned");
    }
    let app = test_app(state);
    let uri = format!("/products/{}", product_id);

    // Anonymous: never purchased.
    let response = get(app.clone(), &uri, None).await;
    let json = body_json(response).await;
    assert_eq!(json["is_purchased"], false);

    // The owner sees it.
    let response = get(app, &uri, Some(&token)).await;
    let json = body_json(response).await;
    assert_eq!(json["is_purchased"], true);
}

// ============ Categories & tenants ============

#[tokio::test]
async fn test_categories_tree() {
    let state = create_test_app_state();
    {
        let conn = state.db.get().unwrap();
        let software = create_test_category(&conn, "software", None);
        create_test_category(&conn, "developer-tools", Some(&software.id));
        create_test_category(&conn, "design", None);
    }
    let app = test_app(state);

    let response = get(app, "/categories", None).await;
    assert_status(&response, StatusCode::OK);

    let json = body_json(response).await;
    let roots = json.as_array().unwrap();
    assert_eq!(roots.len(), 2);

    let software = roots
        .iter()
        .find(|root| root["slug"] == "software")
        .expect("software root present");
    assert_eq!(software["subcategories"].as_array().unwrap().len(), 1);
    assert_eq!(software["subcategories"][0]["slug"], "developer-tools");
}

#[tokio::test]
async fn test_get_tenant_public_card() {
    let state = create_test_app_state();
    {
        let conn = state.db.get().unwrap();
        create_test_tenant(&conn, "acme", true);
    }
    let app = test_app(state);

    let response = get(app.clone(), "/tenants/acme", None).await;
    assert_status(&response, StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["slug"], "acme");
    // Payout details must not leak through the public card.
    assert!(json.get("payout_account_id").is_none());

    let response = get(app, "/tenants/missing", None).await;
    assert_status(&response, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health() {
    let state = create_test_app_state();
    let app = test_app(state);

    let response = get(app, "/health", None).await;
    assert_status(&response, StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
}
