use crate::{
    command::CommandPayload,
    participant::ParticipantId,
};

/// Invoked for every delivered command with its payload and the sender, if the transport could attribute it.
pub type CommandHandler = Box<dyn Fn(&CommandPayload, Option<&ParticipantId>)>;

/// The session's broadcast primitive and lobby controls. Delivery is best-effort and the sender observes its own
/// commands as well.
pub trait SessionTransport {
    fn send_command(&self, name: &str, payload: CommandPayload);

    fn add_command_listener(&self, name: &str, handler: CommandHandler);

    /// Whether the session only admits members (lobby enabled).
    fn members_only_enabled(&self) -> bool;

    fn disable_lobby(&self);
}
