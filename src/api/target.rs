//! Logical backend targets and base-address resolution.

use crate::config::BackendsConfig;

/// Symbolic backend selector carried by each request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Target {
    /// Primary application backend.
    #[default]
    Api,
    /// File service backend.
    Files,
}

impl Target {
    /// Parse a request tag. Unknown or absent tags select the primary backend.
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag.map(|t| t.trim().to_ascii_lowercase()).as_deref() {
            Some("files") => Self::Files,
            _ => Self::Api,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Files => "files",
        }
    }

    pub(crate) fn base_url(self, backends: &BackendsConfig) -> &str {
        match self {
            Self::Api => &backends.api_url,
            Self::Files => &backends.files_url,
        }
    }
}
