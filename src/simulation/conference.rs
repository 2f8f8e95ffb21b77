use compat_mode_config::ParticipantRole;
use compat_mode_session::{
    CommandHandler,
    CommandPayload,
    Participant,
    ParticipantId,
    ParticipantRoster,
    SessionTransport,
};
use serde_json::Value;
use std::{
    cell::RefCell,
    collections::{
        BTreeMap,
        VecDeque,
    },
    rc::Rc,
};

struct Member {
    id: ParticipantId,
    role: ParticipantRole,
    listeners: Vec<(String, Rc<CommandHandler>)>,
    /// Last command per name. Stays attached to the member until it leaves.
    presence: BTreeMap<String, CommandPayload>,
}

struct Envelope {
    name: String,
    payload: CommandPayload,
    sender: ParticipantId,
    /// Replays go to a single member, broadcasts to everyone including the sender.
    recipient: Option<ParticipantId>,
}

#[derive(Default)]
struct ConferenceState {
    members: Vec<Member>,
    members_only: bool,
    in_flight: VecDeque<Envelope>,
    endpoints: usize,
}

/// In-process conference all simulated clients join.
///
/// Commands become part of the sender's presence: they are queued for every member and replayed to members that start
/// listening later. Delivery happens in send order when [`Conference::deliver_pending`] is called.
#[derive(Clone, Default)]
pub struct Conference {
    state: Rc<RefCell<ConferenceState>>,
}

impl Conference {
    pub fn new(members_only: bool) -> Self {
        let conference = Self::default();
        conference.state.borrow_mut().members_only = members_only;
        conference
    }

    /// Adds a member with a fresh endpoint id.
    pub fn join(&self, username: &str, role: ParticipantRole) -> ConferenceHandle {
        let mut state = self.state.borrow_mut();
        state.endpoints += 1;
        let id = ParticipantId::new(format!("{username}-{:04x}", state.endpoints));
        state.members.push(Member {
            id: id.clone(),
            role,
            listeners: Vec::new(),
            presence: BTreeMap::new(),
        });
        debug!(%id, %role, "joined conference");

        ConferenceHandle {
            conference: self.clone(),
            local: id,
        }
    }

    pub fn members_only(&self) -> bool {
        self.state.borrow().members_only
    }

    pub fn member_count(&self) -> usize {
        self.state.borrow().members.len()
    }

    /// Ends the conference for everyone still in it, dropping their listeners and undelivered commands.
    pub fn close(&self) {
        let mut state = self.state.borrow_mut();
        state.members.clear();
        state.in_flight.clear();
    }

    pub fn has_pending(&self) -> bool {
        !self.state.borrow().in_flight.is_empty()
    }

    /// Delivers queued commands, including the ones queued while delivering. Returns the number of handler
    /// invocations.
    pub fn deliver_pending(&self) -> usize {
        let mut delivered = 0;
        loop {
            let Some(envelope) = self.state.borrow_mut().in_flight.pop_front() else {
                break;
            };
            for handler in self.handlers_for(&envelope) {
                handler(&envelope.payload, Some(&envelope.sender));
                delivered += 1;
            }
        }
        delivered
    }

    fn handlers_for(&self, envelope: &Envelope) -> Vec<Rc<CommandHandler>> {
        let state = self.state.borrow();
        state
            .members
            .iter()
            .filter(|member| envelope.recipient.as_ref().map_or(true, |id| id == &member.id))
            .flat_map(|member| {
                member
                    .listeners
                    .iter()
                    .filter(|(name, _)| name == &envelope.name)
                    .map(|(_, handler)| handler.clone())
            })
            .collect()
    }
}

/// One client's view of the conference.
#[derive(Clone)]
pub struct ConferenceHandle {
    conference: Conference,
    local: ParticipantId,
}

impl ConferenceHandle {
    pub fn local_id(&self) -> &ParticipantId {
        &self.local
    }

    pub fn leave(&self) {
        let mut state = self.conference.state.borrow_mut();
        state.members.retain(|member| member.id != self.local);
        debug!(id = %self.local, "left conference");
    }

    fn as_participant(&self, member: &Member) -> Participant {
        Participant {
            id: member.id.clone(),
            is_local: member.id == self.local,
            role: member.role,
        }
    }
}

/// Attribute values travel as strings.
fn stringify(payload: CommandPayload) -> CommandPayload {
    let attributes = payload
        .attributes
        .into_iter()
        .map(|(key, value)| match value {
            Value::String(value) => (key, Value::String(value)),
            other => (key, Value::String(other.to_string())),
        })
        .collect();
    CommandPayload { attributes }
}

impl SessionTransport for ConferenceHandle {
    fn send_command(&self, name: &str, payload: CommandPayload) {
        let payload = stringify(payload);
        let mut state = self.conference.state.borrow_mut();
        let Some(member) = state.members.iter_mut().find(|member| member.id == self.local) else {
            warn!(id = %self.local, name, "dropping command of a client that left the conference");
            return;
        };
        member.presence.insert(name.to_string(), payload.clone());
        state.in_flight.push_back(Envelope {
            name: name.to_string(),
            payload,
            sender: self.local.clone(),
            recipient: None,
        });
    }

    fn add_command_listener(&self, name: &str, handler: CommandHandler) {
        let mut state = self.conference.state.borrow_mut();
        let replays = state
            .members
            .iter()
            .filter(|member| member.id != self.local)
            .filter_map(|member| {
                member.presence.get(name).map(|payload| Envelope {
                    name: name.to_string(),
                    payload: payload.clone(),
                    sender: member.id.clone(),
                    recipient: Some(self.local.clone()),
                })
            })
            .collect::<Vec<_>>();
        state.in_flight.extend(replays);

        if let Some(member) = state.members.iter_mut().find(|member| member.id == self.local) {
            member.listeners.push((name.to_string(), Rc::new(handler)));
        }
    }

    fn members_only_enabled(&self) -> bool {
        self.conference.members_only()
    }

    fn disable_lobby(&self) {
        self.conference.state.borrow_mut().members_only = false;
        info!(by = %self.local, "lobby disabled");
    }
}

impl ParticipantRoster for ConferenceHandle {
    fn participant(&self, id: &ParticipantId) -> Option<Participant> {
        let state = self.conference.state.borrow();
        state
            .members
            .iter()
            .find(|member| &member.id == id)
            .map(|member| self.as_participant(member))
    }

    fn participants(&self) -> Vec<Participant> {
        let state = self.conference.state.borrow();
        state.members.iter().map(|member| self.as_participant(member)).collect()
    }
}
