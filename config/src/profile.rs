use serde::{
    Deserialize,
    Serialize,
};
use strum::{
    Display,
    EnumIter,
    EnumString,
};

/// The configuration bundle a client was booted with. Fixed for the lifetime of a loaded client, only a restart with
/// different boot parameters changes it.
#[derive(Debug, Default, Clone, Copy, Display, EnumIter, EnumString, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SessionConfigProfile {
    #[default]
    Standard,
    Compatibility,
}

impl SessionConfigProfile {
    pub fn from_compat_enabled(enabled: bool) -> Self {
        if enabled {
            Self::Compatibility
        } else {
            Self::Standard
        }
    }

    pub fn is_compatibility(&self) -> bool {
        matches!(self, Self::Compatibility)
    }

    pub fn quality_preset(&self) -> QualityPreset {
        match self {
            Self::Standard => QualityPreset::STANDARD,
            Self::Compatibility => QualityPreset::COMPATIBILITY,
        }
    }
}

/// Video quality bounds (vertical resolution) that belong to a profile.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct QualityPreset {
    /// Upper bound for the local outgoing video.
    pub preferred: u32,
    /// Upper bound for video received from remote participants.
    pub max_receiver: u32,
}

impl QualityPreset {
    pub const STANDARD: Self = Self {
        preferred: 720,
        max_receiver: 720,
    };
    pub const COMPATIBILITY: Self = Self {
        preferred: 360,
        max_receiver: 360,
    };
}
