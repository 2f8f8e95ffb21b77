use crate::{
    command::{
        CommandPayload,
        ModeChangeCommand,
        NETWORK_COMPAT_COMMAND,
    },
    gate::{
        CommandAuthorityGate,
        GateDecision,
    },
    participant::{
        Authority,
        ModeratorAuthority,
        ParticipantId,
        ParticipantRoster,
    },
    quality::{
        apply_preset,
        QualityPipeline,
    },
    restart::{
        RestartRequest,
        Restarter,
    },
    store::ModeStore,
    transport::SessionTransport,
};
use compat_mode_config::{
    BootParams,
    SessionConfigProfile,
};
use std::{
    cell::Cell,
    rc::Rc,
};

/// The external collaborators a client hands to the core.
#[derive(Clone)]
pub struct SessionHandles {
    pub transport: Rc<dyn SessionTransport>,
    pub roster: Rc<dyn ParticipantRoster>,
    pub quality: Rc<dyn QualityPipeline>,
    pub restarter: Rc<dyn Restarter>,
}

/// Entry point for changing the session's mode.
///
/// Everything runs synchronously on the caller's thread. Broadcasting and restarting are handed to the collaborators
/// without waiting for either.
pub struct ModeController {
    boot: BootParams,
    store: Rc<dyn ModeStore>,
    handles: SessionHandles,
    authority: Rc<dyn Authority>,
    joined: Cell<bool>,
    /// Set once this load switched the mode itself.
    mode_overridden: Cell<bool>,
}

impl ModeController {
    pub fn new(boot: BootParams, store: Rc<dyn ModeStore>, handles: SessionHandles) -> Self {
        Self {
            boot,
            store,
            handles,
            authority: Rc::new(ModeratorAuthority),
            joined: Cell::new(false),
            mode_overridden: Cell::new(false),
        }
    }

    pub fn with_authority(mut self, authority: Rc<dyn Authority>) -> Self {
        self.authority = authority;
        self
    }

    pub fn boot_params(&self) -> &BootParams {
        &self.boot
    }

    pub fn loaded_profile(&self) -> SessionConfigProfile {
        self.boot.profile
    }

    /// What a toggle shows as its state.
    pub fn is_compatibility_loaded(&self) -> bool {
        self.boot.profile.is_compatibility()
    }

    pub fn persisted_mode(&self) -> Option<bool> {
        self.store.get()
    }

    /// Whether the local participant is offered the toggle: always once this load switched the mode, otherwise only
    /// to the single moderator of the session.
    pub fn can_toggle(&self) -> bool {
        if self.mode_overridden.get() {
            return true;
        }
        let roster = &self.handles.roster;
        let local_is_authorized = roster
            .local_participant()
            .is_some_and(|p| self.authority.is_authorized(&p));
        let other_authorized = roster
            .participants()
            .iter()
            .any(|p| !p.is_local && self.authority.is_authorized(p));
        local_is_authorized && !other_authorized
    }

    /// Switches the session into compatibility mode (`true`) or back to standard.
    ///
    /// Persists the flag, applies the quality preset, opens the lobby and broadcasts the mode. When the loaded profile
    /// differs from the requested one the client restarts as initiator afterwards.
    #[instrument(level = "debug", skip(self), fields(loaded = %self.boot.profile))]
    pub fn set_mode(&self, enabled: bool) {
        let target = SessionConfigProfile::from_compat_enabled(enabled);
        self.mode_overridden.set(true);

        if let Err(err) = self.store.set(enabled) {
            error!("Failed to persist network compat mode: {err:?}");
        }
        apply_preset(&*self.handles.quality, target.quality_preset());
        self.announce(enabled);

        if target != self.boot.profile {
            info!(from = %self.boot.profile, to = %target, "restarting into the requested profile");
            self.handles
                .restarter
                .restart(RestartRequest::initiated_locally(&self.boot, target));
        }
    }

    /// Runs when the client joins the session. Applies the preset of the loaded profile, re-announces the persisted
    /// mode if this client is the initiator, then starts listening for mode commands.
    ///
    /// Only the first call has an effect. Returns the re-announced mode.
    #[instrument(level = "debug", skip(self), fields(loaded = %self.boot.profile, initiator = self.boot.initiator))]
    pub fn on_join(&self) -> Option<bool> {
        if self.joined.replace(true) {
            debug!("already joined, nothing to do");
            return None;
        }

        apply_preset(&*self.handles.quality, self.boot.profile.quality_preset());

        // TODO: a second participant that also boots as initiator with a stale flag can announce a conflicting mode.
        // Needs an ordering key on the command before it can be resolved.
        let announced = match (self.boot.initiator, self.store.get()) {
            (true, Some(enabled)) => {
                info!(enabled, "re-announcing persisted network compat mode");
                self.announce(enabled);
                Some(enabled)
            }
            _ => None,
        };

        let gate = self.command_gate();
        self.handles.transport.add_command_listener(
            NETWORK_COMPAT_COMMAND,
            Box::new(move |payload: &CommandPayload, sender: Option<&ParticipantId>| {
                match gate.handle(payload, sender) {
                    GateDecision::Discarded(reason) => trace!(%reason, "discarded network compat command"),
                    decision => trace!(?decision, "handled network compat command"),
                }
            }),
        );

        announced
    }

    pub fn command_gate(&self) -> CommandAuthorityGate {
        CommandAuthorityGate::new(
            self.boot.clone(),
            self.handles.roster.clone(),
            self.handles.restarter.clone(),
            self.authority.clone(),
        )
    }

    fn announce(&self, enabled: bool) {
        let transport = &self.handles.transport;
        // Participants still in the old profile must not end up in the lobby while the session switches.
        if transport.members_only_enabled() {
            debug!("disabling lobby before announcing the mode");
            transport.disable_lobby();
        }
        transport.send_command(NETWORK_COMPAT_COMMAND, ModeChangeCommand::new(enabled).into_payload());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        store::{
            FileModeStore,
            MemoryModeStore,
        },
        testing::{
            participant,
            Effect,
            FakeSession,
        },
    };
    use compat_mode_config::ParticipantRole::{
        Moderator,
        Participant,
    };
    use pretty_assertions::assert_eq;
    use temp_dir::TempDir;
    use url::Url;

    fn boot(profile: SessionConfigProfile) -> BootParams {
        let url = Url::parse("https://meet.hyper.video/planning").unwrap();
        BootParams::new(&url, Some("jwt".to_string())).with_profile(profile)
    }

    fn moderator_session() -> Rc<FakeSession> {
        FakeSession::new([participant("me", true, Moderator), participant("peer", false, Participant)])
    }

    fn command_sent(on: bool) -> Effect {
        Effect::CommandSent(
            NETWORK_COMPAT_COMMAND.to_string(),
            ModeChangeCommand::new(on).into_payload(),
        )
    }

    #[test]
    fn enabling_with_lobby_orders_effects() {
        let session = moderator_session();
        session.enable_lobby();
        let store = Rc::new(MemoryModeStore::default());
        let controller = ModeController::new(boot(SessionConfigProfile::Standard), store.clone(), session.handles());

        controller.set_mode(true);

        let restart = RestartRequest::initiated_locally(controller.boot_params(), SessionConfigProfile::Compatibility);
        assert_eq!(
            session.effects(),
            vec![
                Effect::PreferredQuality(360),
                Effect::MaxReceiverQuality(360),
                Effect::LobbyDisabled,
                command_sent(true),
                Effect::Restart(restart),
            ]
        );
        assert_eq!(store.get(), Some(true));
        assert!(!session.lobby_enabled());
    }

    #[test]
    fn restart_target_carries_initiator_marker() {
        let session = moderator_session();
        let controller = ModeController::new(
            boot(SessionConfigProfile::Standard),
            Rc::new(MemoryModeStore::default()),
            session.handles(),
        );

        controller.set_mode(true);

        let restarts = session.restarts();
        assert_eq!(restarts.len(), 1);
        assert_eq!(
            restarts[0].target_url().as_str(),
            "https://meet.hyper.video/planning?token=jwt#mode=compatibility&config.prejoinPageEnabled=false&initiator=true"
        );
    }

    #[test]
    fn matching_profile_does_not_restart() {
        let session = moderator_session();
        let store = Rc::new(MemoryModeStore::default());
        let controller = ModeController::new(
            boot(SessionConfigProfile::Compatibility),
            store.clone(),
            session.handles(),
        );

        controller.set_mode(true);

        assert_eq!(
            session.effects(),
            vec![
                Effect::PreferredQuality(360),
                Effect::MaxReceiverQuality(360),
                command_sent(true)
            ]
        );
        assert_eq!(store.get(), Some(true));
    }

    #[test]
    fn disabling_applies_standard_preset() {
        let session = moderator_session();
        let controller = ModeController::new(
            boot(SessionConfigProfile::Compatibility),
            Rc::new(MemoryModeStore::with_flag(true)),
            session.handles(),
        );

        controller.set_mode(false);

        let effects = session.effects();
        assert_eq!(effects[0], Effect::PreferredQuality(720));
        assert_eq!(effects[1], Effect::MaxReceiverQuality(720));
        assert_eq!(effects[2], command_sent(false));
        assert_eq!(session.restarts()[0].profile(), SessionConfigProfile::Standard);
        assert_eq!(controller.persisted_mode(), Some(false));
    }

    #[test]
    fn flag_survives_restart_into_compatibility() {
        let dir = TempDir::new().unwrap();
        let session = moderator_session();
        let controller = ModeController::new(
            boot(SessionConfigProfile::Standard),
            Rc::new(FileModeStore::load_from_data_dir(dir.path())),
            session.handles(),
        );

        controller.set_mode(true);

        let restart = session.restarts().pop().unwrap();
        let rebooted = BootParams::from_url(&restart.target_url()).unwrap();
        let after_restart = FileModeStore::load_from_data_dir(dir.path());
        let restarted = ModeController::new(rebooted, Rc::new(after_restart), moderator_session().handles());

        assert_eq!(restarted.loaded_profile(), SessionConfigProfile::Compatibility);
        assert!(restarted.is_compatibility_loaded());
        assert_eq!(restarted.persisted_mode(), Some(true));
    }

    #[test]
    fn initiator_reannounces_once() {
        let session = moderator_session();
        session.enable_lobby();
        let controller = ModeController::new(
            boot(SessionConfigProfile::Compatibility).with_initiator(true),
            Rc::new(MemoryModeStore::with_flag(true)),
            session.handles(),
        );

        assert_eq!(controller.on_join(), Some(true));
        assert_eq!(controller.on_join(), None);

        assert_eq!(
            session.effects(),
            vec![
                Effect::PreferredQuality(360),
                Effect::MaxReceiverQuality(360),
                Effect::LobbyDisabled,
                command_sent(true),
            ]
        );
        assert_eq!(session.listener_count(), 1);

        // Later commands do not trigger another announcement.
        session.clear_effects();
        session.deliver(
            NETWORK_COMPAT_COMMAND,
            &ModeChangeCommand::new(true).into_payload(),
            Some(&"me".into()),
        );
        session.deliver(
            NETWORK_COMPAT_COMMAND,
            &ModeChangeCommand::new(true).into_payload(),
            Some(&"peer".into()),
        );
        assert!(session.sent().is_empty());
        assert!(session.effects().is_empty());
    }

    #[test]
    fn no_announcement_without_flag_or_initiator() {
        let session = moderator_session();
        let initiator_without_flag = ModeController::new(
            boot(SessionConfigProfile::Standard).with_initiator(true),
            Rc::new(MemoryModeStore::default()),
            session.handles(),
        );
        assert_eq!(initiator_without_flag.on_join(), None);

        let follower_with_flag = ModeController::new(
            boot(SessionConfigProfile::Standard),
            Rc::new(MemoryModeStore::with_flag(true)),
            session.handles(),
        );
        assert_eq!(follower_with_flag.on_join(), None);

        assert!(session.sent().is_empty());
        assert_eq!(
            session.effects(),
            vec![
                Effect::PreferredQuality(720),
                Effect::MaxReceiverQuality(720),
                Effect::PreferredQuality(720),
                Effect::MaxReceiverQuality(720),
            ]
        );
    }

    #[test]
    fn joined_client_follows_moderator() {
        let session = FakeSession::new([participant("me", true, Participant), participant("mod", false, Moderator)]);
        let store = Rc::new(MemoryModeStore::default());
        let controller = ModeController::new(boot(SessionConfigProfile::Standard), store.clone(), session.handles());
        controller.on_join();
        session.clear_effects();

        let mut stringified = CommandPayload::default();
        stringified.attributes.insert("on".to_string(), serde_json::json!("true"));
        session.deliver(NETWORK_COMPAT_COMMAND, &stringified, Some(&"mod".into()));
        session.deliver("some-other-command", &stringified, Some(&"mod".into()));

        let restarts = session.restarts();
        assert_eq!(restarts.len(), 1);
        assert_eq!(restarts[0].profile(), SessionConfigProfile::Compatibility);
        assert_eq!(store.get(), None);
    }

    #[test]
    fn toggle_offered_to_single_moderator() {
        let store: Rc<dyn ModeStore> = Rc::new(MemoryModeStore::default());
        let controller = |session: &Rc<FakeSession>| {
            ModeController::new(boot(SessionConfigProfile::Standard), store.clone(), session.handles())
        };

        let alone = moderator_session();
        assert!(controller(&alone).can_toggle());

        let shared = moderator_session();
        shared.add_participant(participant("other-mod", false, Moderator));
        assert!(!controller(&shared).can_toggle());

        let not_moderator = FakeSession::new([participant("me", true, Participant)]);
        assert!(!controller(&not_moderator).can_toggle());
    }

    #[test]
    fn toggle_stays_offered_after_switching() {
        let session = moderator_session();
        session.add_participant(participant("other-mod", false, Moderator));
        let controller = ModeController::new(
            boot(SessionConfigProfile::Compatibility),
            Rc::new(MemoryModeStore::default()),
            session.handles(),
        );
        assert!(!controller.can_toggle());

        controller.set_mode(true);

        assert!(controller.can_toggle());
    }

    struct AnyoneAuthority;

    impl Authority for AnyoneAuthority {
        fn is_authorized(&self, _participant: &crate::Participant) -> bool {
            true
        }
    }

    #[test]
    fn custom_authority_decides_who_is_followed() {
        let session = FakeSession::new([participant("me", true, Participant), participant("peer", false, Participant)]);
        let controller = ModeController::new(
            boot(SessionConfigProfile::Standard),
            Rc::new(MemoryModeStore::default()),
            session.handles(),
        )
        .with_authority(Rc::new(AnyoneAuthority));
        assert!(!controller.can_toggle());

        controller.on_join();
        session.deliver(
            NETWORK_COMPAT_COMMAND,
            &ModeChangeCommand::new(true).into_payload(),
            Some(&"peer".into()),
        );

        assert_eq!(session.restarts().len(), 1);
        assert_eq!(session.restarts()[0].profile(), SessionConfigProfile::Compatibility);
    }
}
