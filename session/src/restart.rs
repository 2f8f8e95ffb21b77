use compat_mode_config::{
    BootParams,
    SessionConfigProfile,
};
use url::Url;

/// Parameters of a restart-reconfiguration: the boot parameters the client has to be loaded with next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartRequest {
    boot: BootParams,
}

impl RestartRequest {
    /// The client that changed the mode comes back as initiator so that it re-announces the mode after joining.
    pub fn initiated_locally(current: &BootParams, target: SessionConfigProfile) -> Self {
        Self::new(current, target, true)
    }

    /// A client following a moderator's command.
    pub fn following_moderator(current: &BootParams, target: SessionConfigProfile) -> Self {
        Self::new(current, target, false)
    }

    fn new(current: &BootParams, target: SessionConfigProfile, initiator: bool) -> Self {
        let boot = BootParams::new(&current.session_url, current.token.clone())
            .with_profile(target)
            .with_initiator(initiator)
            .with_prejoin_enabled(false);
        Self { boot }
    }

    pub fn profile(&self) -> SessionConfigProfile {
        self.boot.profile
    }

    pub fn token(&self) -> Option<&str> {
        self.boot.token.as_deref()
    }

    pub fn is_initiator(&self) -> bool {
        self.boot.initiator
    }

    pub fn boot_params(&self) -> &BootParams {
        &self.boot
    }

    /// Where the client navigates to.
    pub fn target_url(&self) -> Url {
        self.boot.to_url()
    }
}

/// Reloads the client under different boot parameters. Fire-and-forget and irrevocable: nothing is awaited and
/// nothing is rolled back.
pub trait Restarter {
    fn restart(&self, request: RestartRequest);
}
