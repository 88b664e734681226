pub mod error;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod schema;
pub mod store;

use std::sync::Arc;

use diesel_async::pooled_connection::deadpool;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::AsyncPgConnection;
pub use error::DatabaseError;
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::Store;
use tracing::info;

pub type Pool = deadpool::Pool<AsyncPgConnection>;

pub const MEMORY_URL: &str = "memory://";

pub fn get_database_connection(database_url: &str) -> Result<Pool, DatabaseError> {
    let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
    Ok(deadpool::Pool::builder(config).build()?)
}

/// `memory://` keeps everything in process, `postgres://` and `postgresql://`
/// go through a connection pool.
pub fn open_store(database_url: &str) -> Result<Arc<dyn Store>, DatabaseError> {
    if database_url == MEMORY_URL {
        info!("using in-memory store");
        return Ok(Arc::new(MemoryStore::new()));
    }
    if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        info!("using postgres store");
        return Ok(Arc::new(PgStore::new(get_database_connection(database_url)?)));
    }
    Err(DatabaseError::UnsupportedUrl(database_url.to_owned()))
}
