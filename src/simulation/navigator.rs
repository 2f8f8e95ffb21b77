use compat_mode_session::{
    RestartRequest,
    Restarter,
};
use std::cell::RefCell;
use url::Url;

/// Stands in for the browser's location of one client. A restart only records where the client navigates to, the
/// simulation performs the reload once the current delivery round is over.
#[derive(Debug, Default)]
pub struct Navigator {
    username: String,
    target: RefCell<Option<Url>>,
}

impl Navigator {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            target: RefCell::default(),
        }
    }

    /// The pending navigation, if any.
    pub fn take_target(&self) -> Option<Url> {
        self.target.borrow_mut().take()
    }
}

impl Restarter for Navigator {
    fn restart(&self, request: RestartRequest) {
        let url = request.target_url();
        info!(username = %self.username, profile = %request.profile(), %url, "navigating");
        // A navigation replaces the document, so a later one overrides an earlier one.
        if let Some(previous) = self.target.borrow_mut().replace(url) {
            debug!(username = %self.username, %previous, "superseded pending navigation");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compat_mode_config::{
        BootParams,
        SessionConfigProfile,
    };
    use pretty_assertions::assert_eq;

    #[test]
    fn last_navigation_wins() {
        let url = Url::parse("https://meet.hyper.video/planning").unwrap();
        let boot = BootParams::new(&url, None);
        let navigator = Navigator::new("alice");

        navigator.restart(RestartRequest::following_moderator(&boot, SessionConfigProfile::Compatibility));
        navigator.restart(RestartRequest::following_moderator(&boot, SessionConfigProfile::Standard));

        let target = navigator.take_target().unwrap();
        assert_eq!(
            BootParams::from_url(&target).unwrap().profile,
            SessionConfigProfile::Standard
        );
        assert_eq!(navigator.take_target(), None);
    }
}
