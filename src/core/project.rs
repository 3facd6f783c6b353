//! A loaded project: manifest, root directory and lockfile.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::core::artifact::ArtifactSpec;
use crate::core::input::{InputReference, ResolvedInputs};
use crate::core::manifest::Manifest;
use crate::core::platform::Platform;
use crate::resolver::{Lockfile, ResolutionError};
use crate::util::context::LOCKFILE_NAME;

/// A berth project rooted at the directory holding `Berth.toml`.
#[derive(Debug)]
pub struct Project {
    root: PathBuf,
    manifest_path: PathBuf,
    manifest: Manifest,
    lock: Option<Lockfile>,
}

impl Project {
    /// Load the manifest and, if present, the lockfile next to it.
    pub fn load(manifest_path: &Path) -> Result<Self> {
        let manifest = Manifest::load(manifest_path)?;
        let root = manifest.manifest_dir.clone();

        let lock_path = root.join(LOCKFILE_NAME);
        let lock = if lock_path.exists() {
            let lock = Lockfile::load(&lock_path)?;
            if !lock.is_compatible() {
                bail!(
                    "lockfile version {} is not compatible with this version of berth",
                    lock.version
                );
            }
            Some(lock)
        } else {
            None
        };

        Ok(Project {
            root,
            manifest_path: manifest_path.to_path_buf(),
            manifest,
            lock,
        })
    }

    /// Build a project from an already parsed manifest.
    pub fn from_manifest(manifest: Manifest, manifest_path: PathBuf) -> Self {
        Project {
            root: manifest.manifest_dir.clone(),
            manifest_path,
            manifest,
            lock: None,
        }
    }

    /// Forget the loaded lockfile, so git inputs resolve to their refs' tips.
    pub fn without_lock(mut self) -> Self {
        self.lock = None;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn lock(&self) -> Option<&Lockfile> {
        self.lock.as_ref()
    }

    pub fn lockfile_path(&self) -> PathBuf {
        self.root.join(LOCKFILE_NAME)
    }

    /// The input references for one platform.
    ///
    /// Per-platform overrides replace the base input, locked revisions pin
    /// unpinned git inputs, and command-line overrides replace both. Two
    /// command-line overrides for the same name are left for the resolver
    /// to reject.
    pub fn references(
        &self,
        platform: &Platform,
        overrides: &[InputReference],
    ) -> Result<Vec<InputReference>, ResolutionError> {
        for reference in overrides {
            if !self.manifest.inputs.contains_key(&reference.name) {
                return Err(ResolutionError::UnknownInput {
                    name: reference.name.clone(),
                });
            }
        }
        let overridden: BTreeSet<&str> = overrides.iter().map(|r| r.name.as_str()).collect();

        let mut inputs = self.manifest.inputs.clone();
        if let Some(platform_inputs) = self.manifest.platforms.overrides_for(platform) {
            for (name, reference) in platform_inputs {
                inputs.insert(name.clone(), reference.clone());
            }
        }

        let mut refs = Vec::with_capacity(inputs.len() + overrides.len());
        for (name, mut reference) in inputs {
            if overridden.contains(name.as_str()) {
                continue;
            }
            if reference.pin.is_none() && reference.locator.is_git() {
                if let Some(rev) = self.lock.as_ref().and_then(|l| l.pin_for(&reference, platform)) {
                    tracing::debug!("input `{}` locked at {}", name, rev);
                    reference.pin = Some(rev.to_string());
                }
            }
            refs.push(reference);
        }
        refs.extend(overrides.iter().cloned());
        Ok(refs)
    }

    /// Artifact names in manifest order.
    pub fn artifact_names(&self) -> impl Iterator<Item = &str> {
        self.manifest.artifacts.keys().map(String::as_str)
    }

    /// The build spec of an artifact, against resolved inputs.
    pub fn artifact_spec(&self, name: &str, inputs: &ResolvedInputs) -> Result<ArtifactSpec> {
        let decl = self
            .manifest
            .artifact(name)
            .with_context(|| format!("no artifact named `{}` in {}", name, self.manifest_path.display()))?;

        let input = inputs
            .get(&decl.input)
            .with_context(|| format!("input `{}` of artifact `{}` was not resolved", decl.input, name))?;

        let source = match &decl.subdir {
            Some(subdir) => input.path.join(subdir),
            None => input.path.clone(),
        };

        let mut spec = ArtifactSpec::new(name, source)
            .with_bin(self.manifest.bin_name(name))
            .with_tools(decl.tools.iter().cloned())
            .with_data(decl.data.iter().cloned());
        if let Some(hash) = &decl.hash {
            spec = spec.with_hash(hash.clone());
        }
        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::input::{Locator, ResolvedInput};

    const MANIFEST: &str = r#"
[project]
name = "ion"

[inputs]
ion-shell = "./."
shellac-server = "github:acme/shellac-server/main"

[artifacts.ion]
input = "ion-shell"

[artifacts.shellac]
input = "shellac-server"
bin = "shellac"
data = ["completion"]
subdir = "server"

[compose]
primary = "ion"
companion = "shellac"

[platforms]
supported = ["x86_64-linux", "aarch64-linux"]

[platforms.aarch64-linux.inputs]
shellac-server = "../shellac-arm"
"#;

    fn project() -> Project {
        let path = PathBuf::from("/work/ion/Berth.toml");
        let manifest = Manifest::parse(MANIFEST, &path).unwrap();
        Project::from_manifest(manifest, path)
    }

    fn by_name<'a>(refs: &'a [InputReference], name: &str) -> Vec<&'a InputReference> {
        refs.iter().filter(|r| r.name == name).collect()
    }

    #[test]
    fn test_platform_overrides() {
        let project = project();
        let linux: Platform = "x86_64-linux".parse().unwrap();
        let arm: Platform = "aarch64-linux".parse().unwrap();

        let linux_refs = project.references(&linux, &[]).unwrap();
        assert!(by_name(&linux_refs, "shellac-server")[0].locator.is_git());

        let arm_refs = project.references(&arm, &[]).unwrap();
        assert_eq!(
            by_name(&arm_refs, "shellac-server")[0].locator,
            Locator::Path(PathBuf::from("../shellac-arm"))
        );
        assert_eq!(arm_refs.len(), 2);
    }

    #[test]
    fn test_lock_pins_git_inputs() {
        let linux: Platform = "x86_64-linux".parse().unwrap();
        let mut lock = Lockfile::new();
        let base = project().manifest().inputs["shellac-server"].clone();
        lock.record(
            &ResolvedInput {
                reference: base,
                path: PathBuf::from("/cache"),
                revision: Some("1111111111111111111111111111111111111111".into()),
            },
            None,
        );
        let mut project = project();
        project.lock = Some(lock);

        let refs = project.references(&linux, &[]).unwrap();
        assert_eq!(
            by_name(&refs, "shellac-server")[0].pin.as_deref(),
            Some("1111111111111111111111111111111111111111")
        );
        assert!(by_name(&refs, "ion-shell")[0].pin.is_none());
    }

    #[test]
    fn test_cli_override_replaces_input() {
        let project = project();
        let linux: Platform = "x86_64-linux".parse().unwrap();
        let local = InputReference::parse("shellac-server@../shellac-server").unwrap();

        let refs = project.references(&linux, &[local.clone()]).unwrap();
        assert_eq!(by_name(&refs, "shellac-server"), vec![&local]);

        let other = InputReference::parse("shellac-server@../elsewhere").unwrap();
        let refs = project.references(&linux, &[local, other]).unwrap();
        assert_eq!(by_name(&refs, "shellac-server").len(), 2);

        let unknown = InputReference::parse("nope@./.").unwrap();
        assert!(matches!(
            project.references(&linux, &[unknown]),
            Err(ResolutionError::UnknownInput { .. })
        ));
    }

    #[test]
    fn test_artifact_spec_from_inputs() {
        let project = project();
        let mut inputs = ResolvedInputs::new();
        inputs.insert(ResolvedInput {
            reference: InputReference::parse("shellac-server@../shellac-server").unwrap(),
            path: PathBuf::from("/work/shellac-server"),
            revision: None,
        });

        let spec = project.artifact_spec("shellac", &inputs).unwrap();
        assert_eq!(spec.source, PathBuf::from("/work/shellac-server/server"));
        assert_eq!(spec.bin, "shellac");
        assert_eq!(spec.data, vec!["completion"]);
        assert_eq!(spec.tools, vec!["cargo", "rustc"]);

        assert!(project.artifact_spec("ion", &inputs).is_err());
        assert!(project.artifact_spec("missing", &inputs).is_err());
    }
}
