//! Server configuration, read from the editor's initialization options.

use serde::Deserialize;

use crate::syntax::FormatConfig;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Merge lint warnings into published diagnostics
    pub lint: bool,
    pub format: FormatConfig,
}

impl Config {
    /// Parse initialization options. Missing or malformed options give the
    /// defaults.
    pub fn from_options(options: Option<serde_json::Value>) -> Self {
        let Some(options) = options else {
            return Self::default();
        };
        match serde_json::from_value(options) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring malformed initialization options");
                Self::default()
            }
        }
    }
}
