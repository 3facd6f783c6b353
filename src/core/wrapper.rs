//! Composed wrappers: the runnable result of environment composition.

use std::collections::BTreeMap;
use std::env::JoinPathsError;
use std::ffi::{OsStr, OsString};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::profile::ExecutionProfile;
use crate::util::fs::absolutize;

/// The single service-discovery assignment of a wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Discovery {
    pub name: String,
    pub value: PathBuf,
}

/// Search path entries, an optional discovery variable and the command to
/// run.
///
/// Wrappers are produced by [`crate::compose::compose`] and never change
/// afterwards; [`ComposedWrapper::rooted_at`] returns a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComposedWrapper {
    profile: ExecutionProfile,
    search_path: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    discovery: Option<Discovery>,
    command: String,
}

impl ComposedWrapper {
    pub(crate) fn new(
        profile: ExecutionProfile,
        search_path: Vec<PathBuf>,
        discovery: Option<Discovery>,
        command: String,
    ) -> Self {
        ComposedWrapper {
            profile,
            search_path,
            discovery,
            command,
        }
    }

    pub fn profile(&self) -> ExecutionProfile {
        self.profile
    }

    /// Entries to prepend to `PATH`, highest priority first.
    pub fn search_path(&self) -> &[PathBuf] {
        &self.search_path
    }

    pub fn discovery(&self) -> Option<&Discovery> {
        self.discovery.as_ref()
    }

    /// Name of the executable to run, looked up through the search path.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Variables the wrapper assigns, apart from `PATH`.
    pub fn variables(&self) -> BTreeMap<&str, &Path> {
        self.discovery
            .iter()
            .map(|d| (d.name.as_str(), d.value.as_path()))
            .collect()
    }

    /// The `PATH` value for the child: wrapper entries first, then whatever
    /// the caller already had. Empty entries are dropped, since they would
    /// mean the current directory.
    pub fn search_path_value(&self, existing: Option<&OsStr>) -> Result<OsString, JoinPathsError> {
        let mut entries = self.search_path.clone();
        if let Some(existing) = existing {
            entries.extend(std::env::split_paths(existing).filter(|p| !p.as_os_str().is_empty()));
        }
        std::env::join_paths(entries)
    }

    /// Resolve relative template paths against `root`.
    pub fn rooted_at(&self, root: &Path) -> ComposedWrapper {
        ComposedWrapper {
            profile: self.profile,
            search_path: self
                .search_path
                .iter()
                .map(|p| absolutize(root, p))
                .collect(),
            discovery: self.discovery.as_ref().map(|d| Discovery {
                name: d.name.clone(),
                value: absolutize(root, &d.value),
            }),
            command: self.command.clone(),
        }
    }

    /// Render the wrapper as a POSIX shell script.
    pub fn render_script(&self) -> String {
        let mut script = String::new();
        let _ = writeln!(script, "#!/bin/sh");
        let _ = writeln!(script, "# profile: {}", self.profile);

        if !self.search_path.is_empty() {
            let joined = self
                .search_path
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join(":");
            let _ = writeln!(script, "export PATH={}\"${{PATH:+:$PATH}}\"", shell_quote(&joined));
        }

        if let Some(discovery) = &self.discovery {
            let _ = writeln!(
                script,
                "export {}={}",
                discovery.name,
                shell_quote(&discovery.value.to_string_lossy())
            );
        }

        let _ = writeln!(script, "exec {} \"$@\"", shell_quote(&self.command));
        script
    }
}

/// Single-quote a string for `sh`.
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_wrapper(with_companion: bool) -> ComposedWrapper {
        let mut search_path = Vec::new();
        let mut discovery = None;
        if with_companion {
            search_path.push(PathBuf::from("../shellac-server/target/debug"));
            discovery = Some(Discovery {
                name: "COMPLETION_DIR".into(),
                value: PathBuf::from("../shellac-server/completion"),
            });
        }
        search_path.push(PathBuf::from("./target/debug"));
        ComposedWrapper::new(
            ExecutionProfile::LocalDebug,
            search_path,
            discovery,
            "ion".into(),
        )
    }

    #[test]
    fn test_variables_absent_without_companion() {
        let wrapper = local_wrapper(false);
        assert!(wrapper.variables().is_empty());
        assert!(wrapper.discovery().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_search_path_value_prepends() {
        let wrapper = local_wrapper(true);
        let value = wrapper
            .search_path_value(Some(OsStr::new("/usr/bin:/bin")))
            .unwrap();
        assert_eq!(
            value,
            OsString::from("../shellac-server/target/debug:./target/debug:/usr/bin:/bin")
        );

        let bare = wrapper.search_path_value(None).unwrap();
        assert_eq!(
            bare,
            OsString::from("../shellac-server/target/debug:./target/debug")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_search_path_value_skips_empty_entries() {
        let wrapper = local_wrapper(false);
        assert_eq!(
            wrapper.search_path_value(Some(OsStr::new(""))).unwrap(),
            OsString::from("./target/debug")
        );
        assert_eq!(
            wrapper.search_path_value(Some(OsStr::new("/usr/bin::/bin:"))).unwrap(),
            OsString::from("./target/debug:/usr/bin:/bin")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_rooted_at_resolves_templates() {
        let wrapper = local_wrapper(true).rooted_at(Path::new("/home/dev/ion"));
        assert_eq!(
            wrapper.search_path(),
            &[
                PathBuf::from("/home/dev/shellac-server/target/debug"),
                PathBuf::from("/home/dev/ion/target/debug"),
            ]
        );
        assert_eq!(
            wrapper.discovery().unwrap().value,
            PathBuf::from("/home/dev/shellac-server/completion")
        );
        assert_eq!(wrapper.command(), "ion");
    }

    #[test]
    fn test_render_script() {
        let script = local_wrapper(true).render_script();
        assert!(script.starts_with("#!/bin/sh\n"));
        assert!(script.contains(
            "export PATH='../shellac-server/target/debug:./target/debug'\"${PATH:+:$PATH}\"\n"
        ));
        assert!(script.contains("export COMPLETION_DIR='../shellac-server/completion'\n"));
        assert!(script.ends_with("exec 'ion' \"$@\"\n"));

        let without = local_wrapper(false).render_script();
        assert!(!without.contains("COMPLETION_DIR"));
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn test_json_omits_missing_discovery() {
        let json = serde_json::to_value(local_wrapper(false)).unwrap();
        assert!(json.get("discovery").is_none());
        assert_eq!(json["command"], "ion");
        assert_eq!(json["profile"], "local-debug");
    }
}
