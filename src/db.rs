use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

/// Build the r2d2 pool the whole service shares. Sizing comes from
/// DATABASE_POOL_SIZE when set; r2d2's default of 10 applies otherwise.
pub fn create_pool(database_url: &str) -> DbPool {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let mut builder = Pool::builder();
    if let Some(size) = std::env::var("DATABASE_POOL_SIZE")
        .ok()
        .and_then(|value| value.parse().ok())
    {
        builder = builder.max_size(size);
    }
    builder
        .build(manager)
        .expect("Failed to create database connection pool")
}
