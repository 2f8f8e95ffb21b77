mod client;
mod conference;
mod navigator;

pub use client::{
    MediaPipeline,
    SimulatedClient,
};
pub use conference::{
    Conference,
    ConferenceHandle,
};
use compat_mode_config::{
    Config,
    ParticipantRole,
    ScenarioStep,
    SessionConfigProfile,
};
use eyre::{
    bail,
    Context as _,
    Result,
};
pub use navigator::Navigator;
use serde::Serialize;
use std::{
    collections::BTreeMap,
    fmt,
    path::PathBuf,
};

/// Delivery rounds after which a step that keeps producing commands or navigations is considered stuck.
const MAX_SETTLE_ROUNDS: usize = 16;

/// Runs the configured scenario against an in-process conference.
pub struct Simulation {
    config: Config,
    conference: Conference,
    clients: BTreeMap<String, SimulatedClient>,
    data_dir: PathBuf,
}

impl Simulation {
    /// Client storage lives below the configured data dir and is wiped on start.
    pub fn new(config: Config) -> Result<Self> {
        let data_dir = config.data_dir().join("clients");
        Self::with_data_dir(config, data_dir)
    }

    pub fn with_data_dir(config: Config, data_dir: impl Into<PathBuf>) -> Result<Self> {
        config.validate()?;
        let data_dir = data_dir.into();
        if data_dir.exists() {
            std::fs::remove_dir_all(&data_dir)
                .wrap_err_with(|| format!("Failed to clear client storage at {}", data_dir.display()))?;
        }
        let conference = Conference::new(config.lobby_enabled);

        Ok(Self {
            config,
            conference,
            clients: BTreeMap::new(),
            data_dir,
        })
    }

    pub fn client(&self, username: &str) -> Option<&SimulatedClient> {
        self.clients.get(username)
    }

    pub async fn run(&mut self) -> Result<Summary> {
        let steps = self.config.scenario.clone();
        info!(steps = steps.len(), participants = self.config.participants.len(), "starting simulation");

        for (index, step) in steps.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.config.step_delay()).await;
            }
            self.step(step)?;
        }

        let summary = self.summary();
        for client in &summary.clients {
            info!(username = %client.username, profile = %client.profile, loads = client.loads, "client state");
        }
        info!(converged = summary.converged, "simulation finished");
        Ok(summary)
    }

    /// Applies one scenario step and waits until the session is quiet again.
    pub fn step(&mut self, step: &ScenarioStep) -> Result<()> {
        self.apply(step)?;
        self.settle()
    }

    #[instrument(level = "info", skip(self))]
    fn apply(&mut self, step: &ScenarioStep) -> Result<()> {
        match step {
            ScenarioStep::Join { participant } => {
                if self.clients.contains_key(participant) {
                    warn!("{participant} already joined");
                    return Ok(());
                }
                let Some(config) = self.config.participant(participant).cloned() else {
                    bail!("unknown participant {participant:?}");
                };
                let boot = self.config.boot_params_for(participant)?;
                let client = SimulatedClient::boot(&self.conference, config, boot, &self.data_dir);
                self.clients.insert(participant.clone(), client);
            }

            ScenarioStep::Leave { participant } => match self.clients.remove(participant) {
                Some(client) => client.leave(),
                None => warn!("{participant} is not in the session"),
            },

            ScenarioStep::Toggle { participant, enabled } => {
                let Some(client) = self.clients.get(participant) else {
                    warn!("{participant} is not in the session");
                    return Ok(());
                };
                if !client.controller().can_toggle() {
                    warn!("{participant} is not offered the network compatibility toggle");
                    return Ok(());
                }
                client.controller().set_mode(*enabled);
            }
        }
        Ok(())
    }

    /// Delivers commands and follows navigations until nothing is left to do.
    fn settle(&mut self) -> Result<()> {
        for round in 1..=MAX_SETTLE_ROUNDS {
            let delivered = self.conference.deliver_pending();
            let reloaded = self.follow_navigations()?;
            trace!(round, delivered, reloaded, "settle round");
            if reloaded == 0 && !self.conference.has_pending() {
                return Ok(());
            }
        }
        bail!("session did not settle within {MAX_SETTLE_ROUNDS} rounds")
    }

    fn follow_navigations(&mut self) -> Result<usize> {
        let navigating = self
            .clients
            .iter()
            .filter_map(|(username, client)| client.take_navigation().map(|url| (username.clone(), url)))
            .collect::<Vec<_>>();

        for (username, url) in &navigating {
            let Some(client) = self.clients.remove(username) else {
                continue;
            };
            let client = client.reload(&self.conference, url)?;
            self.clients.insert(username.clone(), client);
        }

        Ok(navigating.len())
    }

    pub fn summary(&self) -> Summary {
        let clients = self
            .clients
            .values()
            .map(|client| ClientSummary {
                username: client.config().username.clone(),
                role: client.config().role,
                profile: client.controller().loaded_profile(),
                persisted_mode: client.controller().persisted_mode(),
                preferred_quality: client.media().preferred_quality(),
                max_receiver_quality: client.media().max_receiver_quality(),
                loads: client.loads(),
            })
            .collect::<Vec<_>>();

        let converged = clients.windows(2).all(|pair| pair[0].profile == pair[1].profile);

        Summary {
            clients,
            converged,
            lobby_enabled: self.conference.members_only(),
        }
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        self.conference.close();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientSummary {
    pub username: String,
    pub role: ParticipantRole,
    pub profile: SessionConfigProfile,
    pub persisted_mode: Option<bool>,
    pub preferred_quality: Option<u32>,
    pub max_receiver_quality: Option<u32>,
    pub loads: u32,
}

/// State of every client still in the session once the scenario ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub clients: Vec<ClientSummary>,
    /// All clients run the same profile.
    pub converged: bool,
    pub lobby_enabled: bool,
}

impl Summary {
    pub fn profile(&self) -> Option<SessionConfigProfile> {
        self.converged.then(|| self.clients.first().map(|c| c.profile)).flatten()
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn or_dash<T: fmt::Display>(value: Option<T>) -> String {
            value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
        }

        for client in &self.clients {
            writeln!(
                f,
                "{:<12} {:<11} {:<13} quality={}/{} persisted={} loads={}",
                client.username,
                client.role,
                client.profile,
                or_dash(client.preferred_quality),
                or_dash(client.max_receiver_quality),
                or_dash(client.persisted_mode),
                client.loads,
            )?;
        }
        match self.profile() {
            Some(profile) => write!(f, "converged on {profile}")?,
            None if self.clients.is_empty() => write!(f, "no clients left in the session")?,
            None => write!(f, "NOT converged")?,
        }
        if self.lobby_enabled {
            write!(f, " (lobby enabled)")?;
        }
        Ok(())
    }
}
