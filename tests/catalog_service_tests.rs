use std::sync::Arc;

use mockito::{Matcher, Server};
use serde_json::json;

use bnd_storefront::models::product::{CatalogFilter, PLACEHOLDER_IMAGE};
use bnd_storefront::services::{CatalogService, HttpInventorySource};

async fn catalog_for(server: &Server) -> CatalogService {
    let source = HttpInventorySource::new(&format!("{}/exec", server.url()))
        .expect("Failed to build inventory source");
    CatalogService::new(Arc::new(source))
}

#[tokio::test]
async fn test_refresh_loads_inventory() {
    let mut server = Server::new_async().await;

    let _m = server
        .mock("GET", "/exec")
        .match_query(Matcher::UrlEncoded("action".into(), "getInventory".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!([
                { "id": 1, "Name": "Lemon Haze", "Category": "Buds", "Subcategory": "Golden",
                  "Type": "Sativa", "Price_5g": "1000", "Badge": "hit" },
                { "id": 7, "Name": "Gelato", "Category": "Buds", "Subcategory": "Premium",
                  "Type": "Hybrid", "Stock": 0 },
                { "Name": "Grinder", "Category": "Accessories", "Price": 450,
                  "Image": "grinder.png" }
            ])
            .to_string(),
        )
        .create_async()
        .await;

    let mut catalog = catalog_for(&server).await;
    assert_eq!(catalog.refresh().await, 2);

    let haze = catalog.find("1").expect("Lemon Haze should be listed");
    assert_eq!(haze.subcategory, "Golden");
    assert_eq!(haze.tier_prices.get("5g"), Some(&1000));

    let grinder = catalog.find("row-2").expect("row index stands in for a missing id");
    assert_eq!(grinder.name, "Grinder");
    assert_eq!(grinder.price, 450);
    assert_eq!(grinder.image, "/images/grinder.png");
    assert_ne!(grinder.image, PLACEHOLDER_IMAGE);

    assert_eq!(catalog.categories(), vec!["Buds", "Accessories"]);
    let sativa = catalog.filter(&CatalogFilter::new().with_category("Buds").with_strain_type("Sativa"));
    assert_eq!(sativa.len(), 1);
}

#[tokio::test]
async fn test_server_error_gives_empty_catalog() {
    let mut server = Server::new_async().await;

    let _m = server
        .mock("GET", "/exec")
        .match_query(Matcher::Any)
        .with_status(500)
        .with_body("Internal Server Error")
        .create_async()
        .await;

    let mut catalog = catalog_for(&server).await;
    assert_eq!(catalog.refresh().await, 0);
    assert!(catalog.products().is_empty());
    assert!(catalog.categories().is_empty());
}

#[tokio::test]
async fn test_non_array_body_gives_empty_catalog() {
    let mut server = Server::new_async().await;

    let _m = server
        .mock("GET", "/exec")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "error": "sheet not found" }).to_string())
        .create_async()
        .await;

    let mut catalog = catalog_for(&server).await;
    assert_eq!(catalog.refresh().await, 0);
}
