// src/main.rs

use axum::{
    Json, Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use utoipa::OpenApi;

use bakehouse_backend::config::AppState;
use bakehouse_backend::docs::ApiDoc;
use bakehouse_backend::handlers;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .compact()
        .init();

    // If configuration fails the application must not start.
    let app_state = AppState::new()
        .await
        .expect("failed to initialize application state");

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("failed to run database migrations");

    tracing::info!("database migrations applied");

    let warehouse_routes = Router::new()
        .route(
            "/items",
            post(handlers::warehouse::create_item).get(handlers::warehouse::list_items),
        )
        .route("/items/{id}", get(handlers::warehouse::get_item))
        .route("/items/{id}/adjust", post(handlers::warehouse::adjust_stock))
        .route(
            "/items/{id}/movements",
            get(handlers::warehouse::list_item_movements),
        )
        .route(
            "/items/{id}/reconcile",
            get(handlers::warehouse::reconcile_item),
        )
        .route(
            "/price-repair",
            get(handlers::warehouse::diagnose_prices).post(handlers::warehouse::repair_prices),
        );

    let purchase_routes = Router::new()
        .route("/", post(handlers::purchases::create_purchase))
        .route("/{id}/complete", post(handlers::purchases::complete_purchase));

    let order_routes = Router::new()
        .route("/", post(handlers::orders::create_order))
        .route("/{id}/can-complete", post(handlers::orders::can_complete_order))
        .route("/{id}/complete", post(handlers::orders::complete_order));

    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route(
            "/api/docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .nest("/api/warehouse", warehouse_routes)
        .nest("/api/purchases", purchase_routes)
        .nest("/api/orders", order_routes)
        .with_state(app_state);

    let addr = "0.0.0.0:3000";
    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind TCP listener");
    tracing::info!("server listening on {}", listener.local_addr().unwrap());
    axum::serve(listener, app).await.expect("axum server error");
}
