use ordercheck_core::{AppError, AppResult};
use tracing_subscriber::EnvFilter;

pub fn init(level: &str, format: &str) -> AppResult<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    let result = match format {
        "json" => builder.json().try_init(),
        _ => builder.try_init(),
    };
    result.map_err(|e| AppError::internal(format!("failed to initialise logging: {e}")))
}
