use super::{
    conference::{
        Conference,
        ConferenceHandle,
    },
    navigator::Navigator,
};
use compat_mode_config::{
    BootParams,
    ParticipantConfig,
};
use compat_mode_session::{
    FileModeStore,
    ModeController,
    QualityPipeline,
    SessionHandles,
};
use std::{
    cell::Cell,
    path::{
        Path,
        PathBuf,
    },
    rc::Rc,
};
use url::Url;

/// Receive side video constraints of a client.
#[derive(Debug, Default)]
pub struct MediaPipeline {
    preferred: Cell<Option<u32>>,
    max_receiver: Cell<Option<u32>>,
}

impl MediaPipeline {
    pub fn preferred_quality(&self) -> Option<u32> {
        self.preferred.get()
    }

    pub fn max_receiver_quality(&self) -> Option<u32> {
        self.max_receiver.get()
    }
}

impl QualityPipeline for MediaPipeline {
    fn apply_preferred_quality(&self, value: u32) {
        self.preferred.set(Some(value));
    }

    fn apply_max_receiver_quality(&self, value: u32) {
        self.max_receiver.set(Some(value));
    }
}

/// One participant's client: a single load of the app with its own conference membership, media pipeline and mode
/// controller. Reloading replaces all of these but keeps the participant's storage directory.
pub struct SimulatedClient {
    config: ParticipantConfig,
    storage_dir: PathBuf,
    handle: Rc<ConferenceHandle>,
    navigator: Rc<Navigator>,
    media: Rc<MediaPipeline>,
    controller: ModeController,
    loads: u32,
}

impl SimulatedClient {
    #[instrument(level = "debug", skip_all, fields(username = %config.username, profile = %boot.profile))]
    pub fn boot(conference: &Conference, config: ParticipantConfig, boot: BootParams, data_dir: &Path) -> Self {
        let storage_dir = data_dir.join(&config.username);
        Self::load(conference, config, boot, storage_dir, 1)
    }

    fn load(
        conference: &Conference,
        config: ParticipantConfig,
        boot: BootParams,
        storage_dir: PathBuf,
        loads: u32,
    ) -> Self {
        let store = Rc::new(FileModeStore::load_from_data_dir(&storage_dir));
        let handle = Rc::new(conference.join(&config.username, config.role));
        let navigator = Rc::new(Navigator::new(config.username.clone()));
        let media = Rc::new(MediaPipeline::default());

        let handles = SessionHandles {
            transport: handle.clone(),
            roster: handle.clone(),
            quality: media.clone(),
            restarter: navigator.clone(),
        };
        let controller = ModeController::new(boot, store, handles);
        controller.on_join();

        Self {
            config,
            storage_dir,
            handle,
            navigator,
            media,
            controller,
            loads,
        }
    }

    /// Navigates to `url`: leaves the conference and loads the client again from the boot parameters in the URL.
    pub fn reload(self, conference: &Conference, url: &Url) -> eyre::Result<Self> {
        let boot = BootParams::from_url(url)?;
        debug!(username = %self.config.username, %url, "reloading client");
        self.handle.leave();
        Ok(Self::load(conference, self.config, boot, self.storage_dir, self.loads + 1))
    }

    pub fn leave(self) {
        self.handle.leave();
    }

    pub fn take_navigation(&self) -> Option<Url> {
        self.navigator.take_target()
    }

    pub fn config(&self) -> &ParticipantConfig {
        &self.config
    }

    pub fn controller(&self) -> &ModeController {
        &self.controller
    }

    pub fn media(&self) -> &MediaPipeline {
        &self.media
    }

    pub fn loads(&self) -> u32 {
        self.loads
    }
}
