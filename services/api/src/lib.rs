mod cli;
mod infra;
mod offline;
mod routes;
mod server;

use bullpen::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
