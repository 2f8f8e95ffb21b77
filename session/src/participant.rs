use compat_mode_config::ParticipantRole;
use derive_more::{
    Deref,
    Display,
};
use serde::{
    Deserialize,
    Serialize,
};

/// Endpoint id of a session member as the transport reports it.
#[derive(Debug, Clone, Display, Deref, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(id: impl ToString) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for ParticipantId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub is_local: bool,
    pub role: ParticipantRole,
}

impl Participant {
    pub fn is_moderator(&self) -> bool {
        self.role == ParticipantRole::Moderator
    }
}

/// The session members as currently known to the local client.
pub trait ParticipantRoster {
    fn participant(&self, id: &ParticipantId) -> Option<Participant>;

    fn participants(&self) -> Vec<Participant>;

    fn local_participant(&self) -> Option<Participant> {
        self.participants().into_iter().find(|p| p.is_local)
    }
}

/// Decides who holds write authority over the session-wide mode.
pub trait Authority {
    fn is_authorized(&self, participant: &Participant) -> bool;
}

/// Only moderators may change the mode for everyone.
#[derive(Debug, Default, Clone, Copy)]
pub struct ModeratorAuthority;

impl Authority for ModeratorAuthority {
    fn is_authorized(&self, participant: &Participant) -> bool {
        participant.is_moderator()
    }
}
