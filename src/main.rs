use std::env;
use std::sync::Arc;

use dotenvy::dotenv;
use storefront_service::infrastructure::payment::SandboxPaymentGateway;
use storefront_service::{build_server, create_pool, run_migrations};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .expect("PORT must be a valid number");
    // Sandbox gateway approves by default; set PAYMENT_SANDBOX_OUTCOME=decline
    // to exercise the failure path locally.
    let gateway = match env::var("PAYMENT_SANDBOX_OUTCOME").as_deref() {
        Ok("decline") => SandboxPaymentGateway::declining(),
        _ => SandboxPaymentGateway::approving(),
    };

    let pool = create_pool(&database_url);
    run_migrations(&pool);

    log::info!("Starting server at http://{}:{}", host, port);

    build_server(pool, Arc::new(gateway), &host, port)?.await
}
