#[macro_use]
extern crate tracing;

mod app_config;
mod args;
mod boot_params;
mod participant_config;
mod profile;

use app_config::AppConfig;
pub use app_config::{
    get_config_dir,
    get_data_dir,
};
pub use args::Args;
pub use boot_params::BootParams;
use color_eyre::Result;
use eyre::OptionExt as _;
pub use participant_config::{
    ParticipantConfig,
    ParticipantRole,
    ScenarioStep,
};
pub use profile::{
    QualityPreset,
    SessionConfigProfile,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    path::Path,
    time::Duration,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(flatten, skip_serializing)]
    app_config: AppConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<url::Url>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default)]
    pub step_delay_ms: u64,
    /// Start the session with the lobby enabled.
    #[serde(default)]
    pub lobby_enabled: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub participants: Vec<ParticipantConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scenario: Vec<ScenarioStep>,
    #[serde(default)]
    pub verbose: bool,
}

const DEFAULT_CONFIG: &str = include_str!("default-config.yaml");

impl Default for Config {
    fn default() -> Self {
        serde_yml::from_str(DEFAULT_CONFIG).expect("Failed to parse default config")
    }
}

impl Config {
    pub fn new(args: Args) -> Result<Self, config::ConfigError> {
        let data_dir = get_data_dir();
        let config_dir = get_config_dir();
        let mut builder = config::Config::builder()
            .set_default("data_dir", data_dir.to_string_lossy().to_string())?
            .set_default("config_dir", config_dir.to_string_lossy().to_string())?;

        builder = builder.add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Yaml));

        let config_files = [("config.yaml", config::FileFormat::Yaml)];

        for (file, format) in &config_files {
            let source = config::File::from(config_dir.join(file))
                .format(*format)
                .required(false);
            builder = builder.add_source(source);
        }

        builder = builder.add_source(args);

        let cfg: Self = builder.build()?.try_deserialize()?;

        Ok(cfg)
    }

    pub fn data_dir(&self) -> &Path {
        &self.app_config.data_dir
    }

    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    pub fn participant(&self, username: &str) -> Option<&ParticipantConfig> {
        self.participants.iter().find(|p| p.username == username)
    }

    /// Boot parameters of a participant's first load.
    pub fn boot_params_for(&self, username: &str) -> Result<BootParams> {
        let participant = self
            .participant(username)
            .ok_or_else(|| eyre::eyre!("no participant named {username:?}"))?;
        let url = self.url.as_ref().ok_or_eyre("No session URL provided in the config")?;
        Ok(BootParams::new(url, self.token.clone()).with_initiator(participant.initiator))
    }

    /// Checks that the scenario only refers to configured participants.
    #[instrument(level = "debug", skip(self))]
    pub fn validate(&self) -> Result<()> {
        if self.url.is_none() {
            eyre::bail!("config.url must be set");
        }
        for step in &self.scenario {
            if self.participant(step.participant()).is_none() {
                eyre::bail!("scenario step {step:?} refers to an unknown participant");
            }
        }
        debug!(
            participants = self.participants.len(),
            steps = self.scenario.len(),
            "configuration is valid"
        );
        Ok(())
    }
}
