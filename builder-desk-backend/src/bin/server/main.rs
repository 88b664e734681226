mod error;
mod router;
mod serve;

use builder_desk_backend::{Desk, DeskSettings};
use builder_desk_config::get_config;
use builder_desk_database::open_store;
use builder_desk_telemetry::setup_telemetry;

use crate::error::AppError;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    setup_telemetry()?;
    let config = get_config()?;
    let store = open_store(&config.database_url)?;
    let desk = Desk::new(store, DeskSettings::from_config(&config));
    serve::run_server(config.listen, desk).await
}
