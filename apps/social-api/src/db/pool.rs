use diesel_async::pooled_connection::deadpool::Pool;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::AsyncPgConnection;

pub type DbPool = Pool<AsyncPgConnection>;

/// Maximum number of pooled Postgres connections.
const MAX_POOL_SIZE: usize = 20;

/// Create a Diesel async connection pool.
///
/// Connections are opened lazily, so an unreachable database surfaces as a
/// store error on first use rather than here.
pub fn connect(database_url: &str) -> Result<DbPool, String> {
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
    let pool = Pool::builder(manager)
        .max_size(MAX_POOL_SIZE)
        .build()
        .map_err(|e| format!("failed to build connection pool: {e}"))?;

    tracing::info!(max_size = MAX_POOL_SIZE, "database pool created");

    Ok(pool)
}
