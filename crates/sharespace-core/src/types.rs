use serde::{Deserialize, Serialize};

// MARK: - Resolution

/// Render resolution requested from the remote host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const HD: Self = Self { width: 1280, height: 720 };
    pub const FHD: Self = Self { width: 1920, height: 1080 };
    pub const QHD: Self = Self { width: 2560, height: 1440 };
    pub const UHD: Self = Self { width: 3840, height: 2160 };

    /// Presets offered by the command example, with their button labels.
    pub const PRESETS: [(&'static str, Self); 4] = [
        ("720p", Self::HD),
        ("1080p", Self::FHD),
        ("1440p", Self::QHD),
        ("4k", Self::UHD),
    ];
}

impl Default for Resolution {
    fn default() -> Self {
        Self::FHD
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}×{}", self.width, self.height)
    }
}

// MARK: - MotionSource

/// Where the currently loaded motion file came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MotionSource {
    /// A recording shipped with the showcase, addressed by file name.
    Bundled(String),
    /// A file the user picked from the local disk.
    Uploaded(String),
}

impl MotionSource {
    pub fn file_name(&self) -> &str {
        match self {
            Self::Bundled(name) | Self::Uploaded(name) => name,
        }
    }
}

impl std::fmt::Display for MotionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bundled(name) => write!(f, "Remote file: {name}"),
            Self::Uploaded(name) => write!(f, "Uploaded file: {name}"),
        }
    }
}
