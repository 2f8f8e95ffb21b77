use eyre::{
    OptionExt as _,
    Result,
};
use serde::{
    Deserialize,
    Serialize,
};
use serde_json::Value;
use std::{
    cell::Cell,
    collections::BTreeMap,
    path::{
        Path,
        PathBuf,
    },
};

/// Namespace the mode flag is persisted under.
pub const MODE_NAMESPACE: &str = "network-compatibility";

/// Last known desired mode of the session, surviving restarts.
///
/// Only the mode controller writes it. `None` means the mode was never explicitly set.
pub trait ModeStore {
    fn get(&self) -> Option<bool>;

    /// Last writer wins.
    fn set(&self, enabled: bool) -> Result<()>;
}

/// Volatile store, does not survive a restart.
#[derive(Debug, Default)]
pub struct MemoryModeStore {
    enabled: Cell<Option<bool>>,
}

impl MemoryModeStore {
    pub fn with_flag(enabled: bool) -> Self {
        Self {
            enabled: Cell::new(Some(enabled)),
        }
    }
}

impl ModeStore for MemoryModeStore {
    fn get(&self) -> Option<bool> {
        self.enabled.get()
    }

    fn set(&self, enabled: bool) -> Result<()> {
        self.enabled.set(Some(enabled));
        Ok(())
    }
}

// -=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedModeFlag {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compat_enabled: Option<bool>,
}

/// Persisted feature state, one entry per namespace. Entries of other namespaces are carried through untouched.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct PersistedState {
    #[serde(flatten)]
    features: BTreeMap<String, Value>,
}

impl PersistedState {
    fn load(file: &Path) -> Self {
        file.exists()
            .then(|| {
                std::fs::File::open(file)
                    .ok()
                    .and_then(|f| serde_json::from_reader(f).ok())
            })
            .flatten()
            .inspect(|_| {
                debug!(?file, "loaded persisted mode state");
            })
            .unwrap_or_else(|| {
                debug!(?file, "no persisted mode state found");
                Self::default()
            })
    }

    fn save(&self, file: &Path) -> Result<()> {
        let dir = file.parent().ok_or_eyre("failed to get parent directory")?;
        std::fs::create_dir_all(dir)?;
        let f = std::fs::File::create(file)?;
        serde_json::to_writer_pretty(&f, self)?;
        debug!(?file, "saved persisted mode state");
        Ok(())
    }

    fn flag(&self) -> Option<bool> {
        let entry = self.features.get(MODE_NAMESPACE)?;
        match PersistedModeFlag::deserialize(entry) {
            Ok(flag) => flag.compat_enabled,
            Err(err) => {
                debug!("ignoring malformed {MODE_NAMESPACE} entry: {err}");
                None
            }
        }
    }

    fn set_flag(&mut self, flag: PersistedModeFlag) -> Result<()> {
        self.features
            .insert(MODE_NAMESPACE.to_string(), serde_json::to_value(flag)?);
        Ok(())
    }
}

/// Store backed by a JSON file, the equivalent of the browser's local storage scope of one client.
#[derive(Debug)]
pub struct FileModeStore {
    file: PathBuf,
    enabled: Cell<Option<bool>>,
}

impl FileModeStore {
    const MODE_STATE_FILE: &'static str = "mode_state.json";

    pub fn load(file: impl Into<PathBuf>) -> Self {
        let file = file.into();
        let enabled = PersistedState::load(&file).flag();
        Self {
            file,
            enabled: Cell::new(enabled),
        }
    }

    pub fn load_from_data_dir(data_dir: impl AsRef<Path>) -> Self {
        Self::load(data_dir.as_ref().join(Self::MODE_STATE_FILE))
    }

    pub fn file(&self) -> &Path {
        &self.file
    }
}

impl ModeStore for FileModeStore {
    fn get(&self) -> Option<bool> {
        self.enabled.get()
    }

    fn set(&self, enabled: bool) -> Result<()> {
        // Other namespaces in the same file are kept.
        let mut state = PersistedState::load(&self.file);
        state.set_flag(PersistedModeFlag {
            compat_enabled: Some(enabled),
        })?;
        state.save(&self.file)?;
        self.enabled.set(Some(enabled));
        Ok(())
    }
}
