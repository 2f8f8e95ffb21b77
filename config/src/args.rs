use clap::Parser;

/// Simulates participants of a hyper.video session converging on the network compatibility mode.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version = version(), about, long_about = None)]
pub struct Args {
    /// Optional session URL to override the stored configuration.
    #[clap(long, value_name = "URL")]
    pub url: Option<String>,

    /// Optional authentication token (jwt) handed to every simulated participant.
    #[clap(long, value_name = "JWT")]
    pub token: Option<String>,

    /// Delay between two scenario steps.
    #[clap(long = "step-delay", value_name = "MILLISECONDS")]
    pub step_delay_ms: Option<u64>,

    /// Print the final summary as JSON.
    #[clap(long, action)]
    pub json: bool,

    /// Enables debug logging.
    #[clap(long = "verbose", action)]
    pub verbose: bool,
}

mod config_ext {
    use super::*;
    use config::{
        Map,
        Source,
        Value,
    };
    use std::collections::HashMap;

    impl Source for Args {
        fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
            Box::new((*self).clone())
        }

        fn collect(&self) -> Result<Map<String, Value>, config::ConfigError> {
            let mut cache = HashMap::<String, Value>::new();
            if let Some(url) = &self.url {
                cache.insert("url".to_string(), url.clone().into());
            }
            if let Some(token) = &self.token {
                cache.insert("token".to_string(), token.clone().into());
            }
            if let Some(step_delay_ms) = self.step_delay_ms {
                cache.insert("step_delay_ms".to_string(), step_delay_ms.into());
            }
            if self.verbose {
                cache.insert("verbose".to_string(), true.into());
            }
            Ok(cache)
        }
    }
}

pub fn version() -> String {
    let author = clap::crate_authors!();
    let version = clap::crate_version!();
    let config_dir_path = crate::get_config_dir().display().to_string();
    let data_dir_path = crate::get_data_dir().display().to_string();

    format!(
        "\
{version}

Authors: {author}

Config directory: {config_dir_path}
Data directory: {data_dir_path}"
    )
}
