use crate::SessionConfigProfile;
use eyre::{
    bail,
    Context as _,
    Result,
};
use url::{
    form_urlencoded,
    Url,
};

const TOKEN_QUERY_KEY: &str = "token";
const MODE_KEY: &str = "mode";
const PREJOIN_KEY: &str = "config.prejoinPageEnabled";
const INITIATOR_KEY: &str = "initiator";

/// The parameters a client is loaded with. A restart-reconfiguration is nothing else than loading the client again with
/// different boot parameters, so these round-trip through the navigation URL:
///
/// `https://<origin>/<session>?token=<jwt>#mode=compatibility&config.prejoinPageEnabled=false&initiator=true`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootParams {
    /// Origin and path of the session, without query or fragment.
    pub session_url: Url,
    pub token: Option<String>,
    pub profile: SessionConfigProfile,
    /// Set when this client announced the mode before restarting and has to re-announce it after joining again.
    pub initiator: bool,
    pub prejoin_enabled: bool,
}

impl BootParams {
    pub fn new(session_url: &Url, token: Option<String>) -> Self {
        Self {
            session_url: session_identity(session_url),
            token,
            profile: SessionConfigProfile::Standard,
            initiator: false,
            prejoin_enabled: true,
        }
    }

    pub fn with_profile(mut self, profile: SessionConfigProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_initiator(mut self, initiator: bool) -> Self {
        self.initiator = initiator;
        self
    }

    pub fn with_prejoin_enabled(mut self, prejoin_enabled: bool) -> Self {
        self.prejoin_enabled = prejoin_enabled;
        self
    }

    /// Reads the boot parameters back from a navigation target.
    pub fn from_url(url: &Url) -> Result<Self> {
        if url.cannot_be_a_base() {
            bail!("{url} cannot identify a session");
        }

        let token = url
            .query_pairs()
            .find(|(key, _)| key == TOKEN_QUERY_KEY)
            .map(|(_, value)| value.into_owned())
            .filter(|token| !token.is_empty());

        let mut params = Self::new(url, token);

        let fragment = url.fragment().unwrap_or_default();
        for (key, value) in form_urlencoded::parse(fragment.as_bytes()) {
            match key.as_ref() {
                MODE_KEY => {
                    params.profile = value
                        .parse()
                        .wrap_err_with(|| format!("unknown session profile {value:?}"))?;
                }
                PREJOIN_KEY => params.prejoin_enabled = parse_flag(&key, &value)?,
                INITIATOR_KEY => params.initiator = parse_flag(&key, &value)?,
                _ => trace!(%key, "ignoring unknown boot parameter"),
            }
        }

        Ok(params)
    }

    pub fn to_url(&self) -> Url {
        let mut url = self.session_url.clone();
        if let Some(token) = &self.token {
            url.query_pairs_mut().append_pair(TOKEN_QUERY_KEY, token);
        }

        let mut fragment = form_urlencoded::Serializer::new(String::new());
        if self.profile.is_compatibility() {
            fragment.append_pair(MODE_KEY, &self.profile.to_string());
        }
        if !self.prejoin_enabled {
            fragment.append_pair(PREJOIN_KEY, "false");
        }
        if self.initiator {
            fragment.append_pair(INITIATOR_KEY, "true");
        }
        let fragment = fragment.finish();
        if !fragment.is_empty() {
            url.set_fragment(Some(&fragment));
        }

        url
    }
}

/// A bare key counts as set.
fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value {
        "" | "true" => Ok(true),
        "false" => Ok(false),
        other => bail!("boot parameter {key} expects true or false, got {other:?}"),
    }
}

/// Origin and path identify the session. Anything else belongs to the previous load.
fn session_identity(url: &Url) -> Url {
    let mut url = url.clone();
    url.set_query(None);
    url.set_fragment(None);
    url
}
