//! Build events for progress reporting and `--json` output.
//!
//! Each event serializes to one JSON object with a `reason` tag:
//!
//! - `artifact-started`: the builder picked up an artifact
//! - `artifact-finished`: an artifact is available in the store
//! - `platform-finished`: all requested artifacts of a platform are done
//!
//! New fields may be added; existing ones are not renamed.

use std::path::PathBuf;

use serde::Serialize;

use crate::core::platform::Platform;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum BuildEvent {
    ArtifactStarted {
        platform: Platform,
        artifact: String,
    },

    ArtifactFinished {
        platform: Platform,
        artifact: String,
        root: PathBuf,
        content_hash: String,
        /// Reused from the store without running the backend
        fresh: bool,
    },

    PlatformFinished {
        platform: Platform,
        success: bool,
        artifacts: usize,
    },
}

impl BuildEvent {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_reason_tag() {
        let event = BuildEvent::ArtifactFinished {
            platform: "x86_64-linux".parse().unwrap(),
            artifact: "shellac".into(),
            root: PathBuf::from("/store/x86_64-linux/abc-shellac"),
            content_hash: "abc".into(),
            fresh: true,
        };
        let json = event.to_json();
        assert_eq!(json["reason"], "artifact-finished");
        assert_eq!(json["platform"], "x86_64-linux");
        assert_eq!(json["fresh"], true);
    }
}
