use serde::{
    Deserialize,
    Serialize,
};
use serde_json::Value;
use std::collections::BTreeMap;

/// Name under which the mode is broadcast to the session.
pub const NETWORK_COMPAT_COMMAND: &str = "network-compatibility";

const ON_ATTRIBUTE: &str = "on";

/// What a command carries over the transport. Transports are free to stringify attribute values on the way.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandPayload {
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error("the command carries no `on` attribute")]
    MissingMode,
    #[error("the `on` attribute is not a boolean: {0}")]
    InvalidMode(Value),
}

/// Broadcast that tells every participant which mode the session runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeChangeCommand {
    pub on: bool,
}

impl ModeChangeCommand {
    pub fn new(on: bool) -> Self {
        Self { on }
    }

    pub fn into_payload(self) -> CommandPayload {
        CommandPayload {
            attributes: BTreeMap::from([(ON_ATTRIBUTE.to_string(), Value::Bool(self.on))]),
        }
    }
}

impl TryFrom<&CommandPayload> for ModeChangeCommand {
    type Error = CommandError;

    fn try_from(payload: &CommandPayload) -> Result<Self, Self::Error> {
        let on = match payload.attributes.get(ON_ATTRIBUTE) {
            None | Some(Value::Null) => return Err(CommandError::MissingMode),
            Some(Value::Bool(on)) => *on,
            Some(Value::String(on)) if on == "true" => true,
            Some(Value::String(on)) if on == "false" => false,
            Some(other) => return Err(CommandError::InvalidMode(other.clone())),
        };
        Ok(Self { on })
    }
}
