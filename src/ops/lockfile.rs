//! Lockfile operations.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

use crate::core::manifest::Manifest;
use crate::core::platform::Platform;
use crate::core::project::Project;
use crate::ops::evaluate::EvalContext;
use crate::resolver::encode::Lockfile;

/// Compute a hash of the manifest's resolution-affecting fields.
///
/// Only inputs and per-platform input overrides take part, so edits to
/// commands or artifacts do not invalidate the lock.
pub fn compute_manifest_hash(manifest: &Manifest) -> Result<String> {
    let mut normalized = serde_json::Map::new();

    let inputs: serde_json::Map<_, _> = manifest
        .inputs
        .iter()
        .map(|(name, reference)| (name.clone(), serde_json::Value::from(reference.to_string())))
        .collect();
    normalized.insert("inputs".to_string(), inputs.into());

    let mut overrides = serde_json::Map::new();
    for (platform, table) in &manifest.platforms.input_overrides {
        let table: serde_json::Map<_, _> = table
            .iter()
            .map(|(name, reference)| (name.clone(), serde_json::Value::from(reference.to_string())))
            .collect();
        overrides.insert(platform.to_string(), table.into());
    }
    if !overrides.is_empty() {
        normalized.insert("platform_inputs".to_string(), overrides.into());
    }

    let bytes = serde_json::to_vec(&serde_json::Value::Object(normalized))
        .context("failed to serialize normalized manifest")?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Check if the lockfile needs updating.
///
/// True when there is no lockfile, when it carries no manifest hash, or
/// when the inputs changed since it was written.
pub fn lockfile_needs_update(project: &Project) -> Result<bool> {
    let Some(lock) = project.lock() else {
        return Ok(true);
    };
    let Some(stored) = lock.manifest_hash() else {
        return Ok(true);
    };
    Ok(stored != compute_manifest_hash(project.manifest())?)
}

/// Resolve every platform's inputs and record the git revisions.
///
/// Inputs replaced on the command line are not recorded. Per-platform
/// overrides get entries of their own.
pub fn lock(cx: &EvalContext<'_>, platforms: &[Platform]) -> Result<Lockfile> {
    let manifest = cx.project().manifest();
    let mut lockfile = Lockfile::new().with_manifest_hash(compute_manifest_hash(manifest)?);
    let mut resolver = cx.resolver();

    for platform in platforms {
        let inputs = cx
            .resolve(&mut resolver, platform)
            .with_context(|| format!("while locking inputs for {}", platform))?;
        let platform_inputs = manifest.platforms.overrides_for(platform);

        for input in inputs.iter() {
            let name = input.reference.name.as_str();
            if cx.overrides().iter().any(|r| r.name == name) {
                continue;
            }
            let specific = platform_inputs.is_some_and(|table| table.contains_key(name));
            lockfile.record(input, specific.then_some(platform));
        }
    }

    lockfile.normalize();
    Ok(lockfile)
}

/// Write the lockfile next to the manifest.
pub fn save_lockfile(project: &Project, lockfile: &Lockfile) -> Result<()> {
    lockfile.save(&project.lockfile_path())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use tempfile::TempDir;

    use super::*;
    use crate::test_support::{init_git_repo, load_project, write_file};
    use crate::util::config::Config;
    use crate::util::context::GlobalContext;

    #[test]
    fn test_manifest_hash_ignores_commands() {
        let base = "[project]\nname = \"ion\"\n[inputs]\nion-shell = \"./.\"\n[artifacts.ion]\ninput = \"ion-shell\"\n";
        let path = Path::new("/work/ion/Berth.toml");

        let a = Manifest::parse(base, path).unwrap();
        let b = Manifest::parse(
            &format!("{}[commands.lint]\nrun = \"cargo clippy\"\n", base),
            path,
        )
        .unwrap();
        let c = Manifest::parse(&base.replace("./.", "./shell"), path).unwrap();

        assert_eq!(compute_manifest_hash(&a).unwrap(), compute_manifest_hash(&b).unwrap());
        assert_ne!(compute_manifest_hash(&a).unwrap(), compute_manifest_hash(&c).unwrap());
    }

    #[test]
    fn test_lock_records_git_revisions() {
        let tmp = TempDir::new().unwrap();
        let upstream = tmp.path().join("upstream/shellac-server");
        let (url, rev) = init_git_repo(&upstream);

        let root = tmp.path().join("work/ion");
        write_file(&root.join("src/main.rs"), "fn main() {}");
        let manifest = format!(
            r#"[project]
name = "ion"

[inputs]
ion-shell = "./."
shellac-server = "git+{url}"

[artifacts.ion]
input = "ion-shell"

[artifacts.shellac]
input = "shellac-server"

[compose]
companion = "shellac"

[platforms]
supported = ["x86_64-linux", "aarch64-linux"]
"#
        );
        let project = load_project(&root, &manifest);
        let gctx = GlobalContext::with_cwd(root.clone()).unwrap();
        let cx = EvalContext::new(&project, &gctx, &Config::default(), None)
            .with_cache_dir(tmp.path().join("cache"));

        let platforms: Vec<Platform> = project.manifest().platforms.supported.clone();
        let lockfile = lock(&cx, &platforms).unwrap();

        // Path inputs are not locked; the git input is locked once.
        assert_eq!(lockfile.inputs.len(), 1);
        assert_eq!(lockfile.inputs[0].name, "shellac-server");
        assert_eq!(lockfile.inputs[0].rev, rev);
        assert!(lockfile.inputs[0].platform.is_none());

        save_lockfile(&project, &lockfile).unwrap();
        let reloaded = Project::load(project.manifest_path()).unwrap();
        assert!(!lockfile_needs_update(&reloaded).unwrap());
        assert_eq!(
            reloaded
                .lock()
                .unwrap()
                .pin_for(&project.manifest().inputs["shellac-server"], &platforms[0]),
            Some(rev.as_str())
        );
    }

    #[test]
    fn test_missing_lockfile_needs_update() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("ion");
        write_file(&root.join("src/main.rs"), "");
        let project = load_project(
            &root,
            "[project]\nname = \"ion\"\n[inputs]\nion-shell = \"./.\"\n[artifacts.ion]\ninput = \"ion-shell\"\n",
        );
        assert!(lockfile_needs_update(&project).unwrap());
    }
}
