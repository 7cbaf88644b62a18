pub mod application;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;

use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::cart_service::CartService;
use application::checkout_service::CheckoutService;
use application::order_service::OrderService;
use domain::ports::PaymentGateway;
use infrastructure::store::DieselStore;

pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) {
    let mut conn = pool.get().expect("Failed to get DB connection for migrations");
    conn.run_pending_migrations(MIGRATIONS)
        .expect("Failed to run database migrations");
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::cart::get_cart,
        handlers::cart::add_item,
        handlers::cart::update_item,
        handlers::cart::remove_item,
        handlers::cart::clear_cart,
        handlers::checkout::checkout,
        handlers::orders::list_orders,
        handlers::orders::get_order,
        handlers::orders::cancel_order,
        handlers::orders::refund_order,
        handlers::orders::mark_delivered,
        handlers::payments::pay,
        handlers::payments::confirm_payment,
        handlers::payments::fail_payment,
        handlers::payments::retry_payment,
    ),
    components(schemas(
        handlers::cart::AddItemRequest,
        handlers::cart::UpdateItemRequest,
        handlers::cart::CartLineResponse,
        handlers::cart::CartResponse,
        handlers::checkout::CheckoutRequest,
        handlers::orders::ShippingAddressResponse,
        handlers::orders::OrderLineResponse,
        handlers::orders::OrderResponse,
        handlers::orders::ListOrdersParams,
        handlers::orders::ListOrdersResponse,
    ))
)]
struct ApiDoc;

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    pool: DbPool,
    gateway: Arc<dyn PaymentGateway>,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let store = DieselStore::new(pool);
    let carts = web::Data::new(CartService::new(store.clone()));
    let checkout = web::Data::new(CheckoutService::new(store.clone()));
    let orders = web::Data::new(OrderService::new(store));
    let gateway = web::Data::from(gateway);

    Ok(HttpServer::new(move || {
        App::new()
            .app_data(carts.clone())
            .app_data(checkout.clone())
            .app_data(orders.clone())
            .app_data(gateway.clone())
            .wrap(Logger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", ApiDoc::openapi()),
            )
            .service(
                web::scope("/cart")
                    .route("", web::get().to(handlers::cart::get_cart))
                    .route("", web::delete().to(handlers::cart::clear_cart))
                    .route("/items", web::post().to(handlers::cart::add_item))
                    .route("/items/{line_id}", web::put().to(handlers::cart::update_item))
                    .route(
                        "/items/{line_id}",
                        web::delete().to(handlers::cart::remove_item),
                    ),
            )
            .route("/checkout", web::post().to(handlers::checkout::checkout))
            .service(
                web::scope("/orders")
                    .route("", web::get().to(handlers::orders::list_orders))
                    .route("/{id}", web::get().to(handlers::orders::get_order))
                    .route("/{id}/cancel", web::post().to(handlers::orders::cancel_order))
                    .route("/{id}/refund", web::post().to(handlers::orders::refund_order))
                    .route(
                        "/{id}/delivered",
                        web::post().to(handlers::orders::mark_delivered),
                    )
                    .route("/{id}/pay", web::post().to(handlers::payments::pay)),
            )
            .service(
                web::scope("/payments")
                    .route(
                        "/{order_id}/confirm",
                        web::post().to(handlers::payments::confirm_payment),
                    )
                    .route(
                        "/{order_id}/fail",
                        web::post().to(handlers::payments::fail_payment),
                    )
                    .route(
                        "/{order_id}/retry",
                        web::post().to(handlers::payments::retry_payment),
                    ),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}
