use crate::{
    CommandHandler,
    CommandPayload,
    Participant,
    ParticipantId,
    ParticipantRoster,
    QualityPipeline,
    RestartRequest,
    Restarter,
    SessionHandles,
    SessionTransport,
};
use compat_mode_config::ParticipantRole;
use std::{
    cell::{
        Cell,
        RefCell,
    },
    rc::Rc,
};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Effect {
    PreferredQuality(u32),
    MaxReceiverQuality(u32),
    LobbyDisabled,
    CommandSent(String, CommandPayload),
    Restart(RestartRequest),
}

/// Plays every collaborator of the core at once and records what the core asked of it, in order.
#[derive(Default)]
pub(crate) struct FakeSession {
    effects: RefCell<Vec<Effect>>,
    members_only: Cell<bool>,
    listeners: RefCell<Vec<(String, CommandHandler)>>,
    participants: RefCell<Vec<Participant>>,
}

pub(crate) fn participant(id: &str, is_local: bool, role: ParticipantRole) -> Participant {
    Participant {
        id: id.into(),
        is_local,
        role,
    }
}

impl FakeSession {
    pub(crate) fn new(participants: impl IntoIterator<Item = Participant>) -> Rc<Self> {
        let session = Self::default();
        session.participants.borrow_mut().extend(participants);
        Rc::new(session)
    }

    pub(crate) fn handles(self: &Rc<Self>) -> SessionHandles {
        SessionHandles {
            transport: self.clone(),
            roster: self.clone(),
            quality: self.clone(),
            restarter: self.clone(),
        }
    }

    pub(crate) fn enable_lobby(&self) {
        self.members_only.set(true);
    }

    pub(crate) fn lobby_enabled(&self) -> bool {
        self.members_only.get()
    }

    pub(crate) fn add_participant(&self, participant: Participant) {
        self.participants.borrow_mut().push(participant);
    }

    pub(crate) fn effects(&self) -> Vec<Effect> {
        self.effects.borrow().clone()
    }

    pub(crate) fn clear_effects(&self) {
        self.effects.borrow_mut().clear();
    }

    pub(crate) fn restarts(&self) -> Vec<RestartRequest> {
        self.effects
            .borrow()
            .iter()
            .filter_map(|effect| match effect {
                Effect::Restart(request) => Some(request.clone()),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn sent(&self) -> Vec<CommandPayload> {
        self.effects
            .borrow()
            .iter()
            .filter_map(|effect| match effect {
                Effect::CommandSent(_, payload) => Some(payload.clone()),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Hands a command to every listener registered for `name`.
    pub(crate) fn deliver(&self, name: &str, payload: &CommandPayload, sender: Option<&ParticipantId>) {
        for (listener_name, handler) in self.listeners.borrow().iter() {
            if listener_name == name {
                handler(payload, sender);
            }
        }
    }
}

impl SessionTransport for FakeSession {
    fn send_command(&self, name: &str, payload: CommandPayload) {
        self.effects
            .borrow_mut()
            .push(Effect::CommandSent(name.to_string(), payload));
    }

    fn add_command_listener(&self, name: &str, handler: CommandHandler) {
        self.listeners.borrow_mut().push((name.to_string(), handler));
    }

    fn members_only_enabled(&self) -> bool {
        self.members_only.get()
    }

    fn disable_lobby(&self) {
        self.members_only.set(false);
        self.effects.borrow_mut().push(Effect::LobbyDisabled);
    }
}

impl ParticipantRoster for FakeSession {
    fn participant(&self, id: &ParticipantId) -> Option<Participant> {
        self.participants.borrow().iter().find(|p| &p.id == id).cloned()
    }

    fn participants(&self) -> Vec<Participant> {
        self.participants.borrow().clone()
    }
}

impl QualityPipeline for FakeSession {
    fn apply_preferred_quality(&self, value: u32) {
        self.effects.borrow_mut().push(Effect::PreferredQuality(value));
    }

    fn apply_max_receiver_quality(&self, value: u32) {
        self.effects.borrow_mut().push(Effect::MaxReceiverQuality(value));
    }
}

impl Restarter for FakeSession {
    fn restart(&self, request: RestartRequest) {
        self.effects.borrow_mut().push(Effect::Restart(request));
    }
}
