//! Operator command registry.
//!
//! A [`RegistryBuilder`] collects commands from the manifest (or the
//! defaults when the manifest declares none) and freezes them into a
//! [`CommandRegistry`]. The registry is read-only from then on.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use anyhow::{bail, Result};

use crate::core::command::Command;
use crate::core::manifest::Manifest;
use crate::core::profile::ExecutionProfile;

/// Literal command behind the default `fmt` entry.
pub const DEFAULT_FMT: &str = "cargo fmt --all -- --check";

/// Commands registered when the manifest declares none.
pub fn default_commands(manifest: &Manifest) -> Vec<Command> {
    vec![
        Command::shell("fmt", "Check formatting", DEFAULT_FMT),
        Command::wrapper(
            "run-debug",
            format!(
                "Run {} against local debug builds",
                manifest.bin_name(&manifest.compose.primary)
            ),
            ExecutionProfile::LocalDebug,
        ),
    ]
}

/// Collects commands before freezing them.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    commands: BTreeMap<String, Command>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        RegistryBuilder::default()
    }

    /// Register the manifest's commands, or the defaults if it has none.
    pub fn from_manifest(manifest: &Manifest) -> Result<Self> {
        let commands = if manifest.commands.is_empty() {
            default_commands(manifest)
        } else {
            manifest.commands.clone()
        };

        let mut builder = RegistryBuilder::new();
        for command in commands {
            builder.register(command)?;
        }
        Ok(builder)
    }

    pub fn register(&mut self, command: Command) -> Result<&mut Self> {
        if self.commands.contains_key(&command.name) {
            bail!("command `{}` is registered twice", command.name);
        }
        self.commands.insert(command.name.clone(), command);
        Ok(self)
    }

    pub fn build(self) -> CommandRegistry {
        CommandRegistry {
            commands: self.commands,
        }
    }
}

/// Frozen set of named commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRegistry {
    commands: BTreeMap<String, Command>,
}

impl CommandRegistry {
    pub fn get(&self, name: &str) -> Option<&Command> {
        self.commands.get(name)
    }

    /// Commands in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.values()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Aligned `name  help` listing shown by `berth cmd` and `berth shell`.
    pub fn render_menu(&self) -> String {
        let width = self.iter().map(|c| c.name.len()).max().unwrap_or(0);
        let mut out = String::new();
        for command in self.iter() {
            let help = if command.help.is_empty() {
                command.invocation.to_string()
            } else {
                command.help.clone()
            };
            let _ = writeln!(out, "    {:<width$}  {}", command.name, help, width = width);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::core::command::Invocation;

    fn manifest(commands: &str) -> Manifest {
        let content = format!(
            "[project]\nname = \"ion\"\n[inputs]\nion-shell = \"./.\"\n[artifacts.ion]\ninput = \"ion-shell\"\n{}",
            commands
        );
        Manifest::parse(&content, Path::new("/work/ion/Berth.toml")).unwrap()
    }

    #[test]
    fn test_defaults_when_manifest_has_none() {
        let registry = RegistryBuilder::from_manifest(&manifest("")).unwrap().build();
        assert_eq!(registry.len(), 2);

        let fmt = registry.get("fmt").unwrap();
        assert_eq!(fmt.invocation, Invocation::Shell(DEFAULT_FMT.to_string()));

        let run_debug = registry.get("run-debug").unwrap();
        assert_eq!(
            run_debug.invocation,
            Invocation::Wrapper(ExecutionProfile::LocalDebug)
        );
    }

    #[test]
    fn test_manifest_commands_replace_defaults() {
        let registry = RegistryBuilder::from_manifest(&manifest(
            "[commands.lint]\nhelp = \"Run clippy\"\nrun = \"cargo clippy\"\n\
             [commands.try-release]\nwrapper = \"local-release\"\n",
        ))
        .unwrap()
        .build();

        assert_eq!(registry.len(), 2);
        assert!(registry.get("fmt").is_none());
        assert_eq!(
            registry.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            vec!["lint", "try-release"]
        );
        assert_eq!(
            registry.get("try-release").unwrap().invocation,
            Invocation::Wrapper(ExecutionProfile::LocalRelease)
        );
    }

    #[test]
    fn test_duplicate_registration() {
        let mut builder = RegistryBuilder::new();
        builder.register(Command::shell("fmt", "", "cargo fmt")).unwrap();
        assert!(builder.register(Command::shell("fmt", "", "rustfmt")).is_err());
    }

    #[test]
    fn test_menu_alignment() {
        let registry = RegistryBuilder::from_manifest(&manifest("")).unwrap().build();
        let menu = registry.render_menu();
        assert!(menu.contains("    fmt        Check formatting\n"));
        assert!(menu.contains("    run-debug  Run ion against local debug builds\n"));
    }
}
