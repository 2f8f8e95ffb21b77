use color_eyre::Result;
use eyre::WrapErr as _;
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
    Layer,
};

pub fn init_errors() -> Result<()> {
    color_eyre::install()?;
    #[cfg(debug_assertions)]
    better_panic::install();
    Ok(())
}

/// `RUST_LOG` wins over `verbose`.
pub fn init_logging(verbose: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_filter(filter))
        .with(tracing_error::ErrorLayer::default())
        .try_init()
        .wrap_err("Failed to initialize tracing subscriber")
}
