use crate::{
    command::{
        CommandPayload,
        ModeChangeCommand,
    },
    participant::{
        Authority,
        ParticipantId,
        ParticipantRoster,
    },
    restart::{
        RestartRequest,
        Restarter,
    },
};
use compat_mode_config::{
    BootParams,
    SessionConfigProfile,
};
use std::rc::Rc;
use strum::Display;

/// Why an inbound command was not acted upon. None of these is an error of the local client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum DiscardReason {
    /// Commands have to be attributable.
    MissingSender,
    /// The sender is not (or no longer) a member of the session.
    UnknownSender,
    /// The transport reflected our own broadcast.
    SelfEcho,
    Unauthorized,
    MalformedAttributes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Discarded(DiscardReason),
    /// The client already runs the requested profile.
    Unchanged,
    Restarting(SessionConfigProfile),
}

/// Validates inbound mode commands and restarts the client when an authorized peer requests a profile other than the
/// loaded one.
pub struct CommandAuthorityGate {
    boot: BootParams,
    roster: Rc<dyn ParticipantRoster>,
    restarter: Rc<dyn Restarter>,
    authority: Rc<dyn Authority>,
}

impl CommandAuthorityGate {
    pub fn new(
        boot: BootParams,
        roster: Rc<dyn ParticipantRoster>,
        restarter: Rc<dyn Restarter>,
        authority: Rc<dyn Authority>,
    ) -> Self {
        Self {
            boot,
            roster,
            restarter,
            authority,
        }
    }

    #[instrument(level = "trace", skip(self, payload), fields(loaded = %self.boot.profile))]
    pub fn handle(&self, payload: &CommandPayload, sender: Option<&ParticipantId>) -> GateDecision {
        let Some(sender) = sender else {
            trace!("discarding unattributed network compat command");
            return GateDecision::Discarded(DiscardReason::MissingSender);
        };

        let Some(participant) = self.roster.participant(sender) else {
            debug!(%sender, "discarding network compat command of unknown participant");
            return GateDecision::Discarded(DiscardReason::UnknownSender);
        };

        if participant.is_local {
            return GateDecision::Discarded(DiscardReason::SelfEcho);
        }

        if !self.authority.is_authorized(&participant) {
            warn!(%sender, role = %participant.role, "Received network compat command not from moderator");
            return GateDecision::Discarded(DiscardReason::Unauthorized);
        }

        let command = match ModeChangeCommand::try_from(payload) {
            Ok(command) => command,
            Err(err) => {
                warn!(%sender, "Discarding network compat command: {err}");
                return GateDecision::Discarded(DiscardReason::MalformedAttributes);
            }
        };

        let target = SessionConfigProfile::from_compat_enabled(command.on);
        if target == self.boot.profile {
            debug!(%sender, profile = %target, "already running the requested profile");
            return GateDecision::Unchanged;
        }

        info!(%sender, from = %self.boot.profile, to = %target, "following moderator into another profile");
        self.restarter
            .restart(RestartRequest::following_moderator(&self.boot, target));
        GateDecision::Restarting(target)
    }
}
