use clap::Parser;
use color_eyre::Result;
use compat_mode_simulator::{
    init_errors,
    init_logging,
    Args,
    Config,
    Simulation,
};
use tracing::{
    info,
    warn,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_errors()?;
    let args = Args::parse();
    let json = args.json;
    let config = Config::new(args)?;
    init_logging(config.verbose)?;

    let mut simulation = Simulation::new(config)?;
    let interrupted = tokio::select! {
        result = simulation.run() => {
            result?;
            false
        }
        _ = tokio::signal::ctrl_c() => true,
    };
    if interrupted {
        info!("interrupted, stopping simulation");
    }

    let summary = simulation.summary();

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{summary}");
    }
    if !summary.converged {
        warn!("participants did not converge on a single profile");
    }

    Ok(())
}
