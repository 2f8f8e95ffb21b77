//! Keeps every participant of a session on the same configuration profile.
//!
//! A moderator switches the session between the standard and the compatibility profile through the
//! [`ModeController`]. The mode is broadcast to all participants, whose [`CommandAuthorityGate`] restarts them into
//! the requested profile. Profiles are fixed per load, so a restart is the only way to change one.

#[macro_use]
extern crate tracing;

mod command;
mod controller;
mod gate;
mod participant;
mod quality;
mod restart;
mod store;
#[cfg(test)]
mod testing;
mod transport;

pub use command::{
    CommandError,
    CommandPayload,
    ModeChangeCommand,
    NETWORK_COMPAT_COMMAND,
};
pub use controller::{
    ModeController,
    SessionHandles,
};
pub use gate::{
    CommandAuthorityGate,
    DiscardReason,
    GateDecision,
};
pub use participant::{
    Authority,
    ModeratorAuthority,
    Participant,
    ParticipantId,
    ParticipantRoster,
};
pub use quality::{
    apply_preset,
    QualityPipeline,
};
pub use restart::{
    RestartRequest,
    Restarter,
};
pub use store::{
    FileModeStore,
    MemoryModeStore,
    ModeStore,
    PersistedModeFlag,
    MODE_NAMESPACE,
};
pub use transport::{
    CommandHandler,
    SessionTransport,
};
