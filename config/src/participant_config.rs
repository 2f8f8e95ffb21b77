use serde::{
    Deserialize,
    Serialize,
};
use strum::{
    Display,
    EnumString,
};

#[derive(Debug, Default, Clone, Copy, Display, EnumString, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ParticipantRole {
    Moderator,
    #[default]
    Participant,
}

/// A participant the simulator boots into the session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantConfig {
    pub username: String,
    #[serde(default)]
    pub role: ParticipantRole,
    /// Boot the first load as the session initiator.
    #[serde(default)]
    pub initiator: bool,
}

impl ParticipantConfig {
    pub fn new(username: impl ToString, role: ParticipantRole) -> Self {
        Self {
            username: username.to_string(),
            role,
            initiator: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ScenarioStep {
    Join { participant: String },
    Leave { participant: String },
    Toggle { participant: String, enabled: bool },
}

impl ScenarioStep {
    pub fn participant(&self) -> &str {
        match self {
            Self::Join { participant } | Self::Leave { participant } | Self::Toggle { participant, .. } => participant,
        }
    }
}
