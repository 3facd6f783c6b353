//! Closure hashing.
//!
//! The closure hash covers everything that decides a build's output: the
//! platform, the backend, the ordered tool list, the artifact's executable
//! and data directories, and every source file by relative path and
//! content.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::builder::backend::BuildRequest;
use crate::builder::errors::BuildError;
use crate::util::hash::Fingerprint;

/// Bumped whenever the hashed layout changes.
const CLOSURE_VERSION: &str = "berth-closure-v1";

/// Top-level directories of a source tree that are never part of its
/// closure. Only matched directly below the root: `src/target/` is source.
const EXCLUDED_DIRS: &[&str] = &["target", ".git", ".berth", ".jj", ".hg"];

/// Source files under `root`, relative, sorted.
///
/// Directories in `skip` (absolute, e.g. a store placed inside the tree)
/// are left out wherever they sit.
pub fn source_files(root: &Path, skip: &[PathBuf]) -> Result<Vec<PathBuf>, walkdir::Error> {
    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_excluded(entry, skip));

    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_dir() {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(root) {
            files.push(relative.to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

fn is_excluded(entry: &walkdir::DirEntry, skip: &[PathBuf]) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    if entry.depth() == 1
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| EXCLUDED_DIRS.contains(&name))
    {
        return true;
    }
    skip.iter().any(|dir| dir == entry.path())
}

/// Compute the closure hash for a build request.
pub fn closure_hash(backend: &str, req: &BuildRequest<'_>) -> Result<String, BuildError> {
    let spec = req.spec;
    let source = &spec.source;

    if !source.is_dir() {
        return Err(BuildError::io(
            &spec.name,
            source,
            "source directory does not exist",
        ));
    }

    let mut fp = Fingerprint::new();
    fp.update_str(CLOSURE_VERSION);
    fp.update_str(backend);
    req.toolset.fingerprint_into(&mut fp, &spec.tools);
    fp.update_str(&spec.bin);
    fp.update_strs(spec.data.iter().map(String::as_str));

    let files = source_files(source, &req.excluded).map_err(|e| BuildError::io(&spec.name, source, e))?;
    fp.update_bytes(&(files.len() as u64).to_le_bytes());

    for relative in &files {
        // Forward slashes keep the hash identical across hosts.
        let key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        fp.update_str(&key);

        let full = source.join(relative);
        let meta = std::fs::symlink_metadata(&full).map_err(|e| BuildError::io(&spec.name, &full, e))?;
        if meta.file_type().is_symlink() {
            let target = std::fs::read_link(&full).map_err(|e| BuildError::io(&spec.name, &full, e))?;
            fp.update_str("symlink");
            fp.update_str(&target.to_string_lossy());
        } else {
            fp.update_str("file");
            fp.update_file(&full)
                .map_err(|e| BuildError::io(&spec.name, &full, format!("{:#}", e)))?;
        }
    }

    let hash = fp.finish();
    tracing::debug!(
        "closure of `{}` for {}: {} file(s), {}",
        spec.name,
        req.platform,
        files.len(),
        hash
    );
    Ok(hash)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::builder::toolset::Toolset;
    use crate::core::artifact::ArtifactSpec;
    use crate::core::platform::Platform;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn hash_of(spec: &ArtifactSpec, platform: &Platform) -> String {
        let toolset = Toolset::new(platform.clone());
        let req = BuildRequest::new(spec, platform, &toolset, PathBuf::from("/unused"));
        closure_hash("test", &req).unwrap()
    }

    #[test]
    fn test_source_files_skip_build_outputs() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "src/main.rs", "fn main() {}");
        write(tmp.path(), "Cargo.toml", "[package]");
        write(tmp.path(), "target/debug/ion", "binary");
        write(tmp.path(), ".git/HEAD", "ref");
        write(tmp.path(), "completion/ion.toml", "x");

        let files = source_files(tmp.path(), &[]).unwrap();
        assert_eq!(
            files,
            vec![
                PathBuf::from("Cargo.toml"),
                PathBuf::from("completion/ion.toml"),
                PathBuf::from("src/main.rs"),
            ]
        );
    }

    #[test]
    fn test_hash_is_stable_and_tracks_content() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "src/main.rs", "fn main() {}");
        let platform: Platform = "x86_64-linux".parse().unwrap();
        let spec = ArtifactSpec::new("ion", tmp.path()).with_tools(["cargo"]);

        let first = hash_of(&spec, &platform);
        assert_eq!(first, hash_of(&spec, &platform));

        // Build outputs do not count.
        write(tmp.path(), "target/debug/ion", "binary");
        assert_eq!(first, hash_of(&spec, &platform));

        write(tmp.path(), "src/main.rs", "fn main() { println!(); }");
        assert_ne!(first, hash_of(&spec, &platform));
    }

    #[test]
    fn test_nested_output_names_are_source() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "src/main.rs", "mod target;");
        write(tmp.path(), "src/target/mod.rs", "pub fn triple() {}");
        let platform: Platform = "x86_64-linux".parse().unwrap();
        let spec = ArtifactSpec::new("ion", tmp.path());

        let before = hash_of(&spec, &platform);
        write(tmp.path(), "src/target/mod.rs", "pub fn triple() -> u8 { 1 }");
        assert_ne!(before, hash_of(&spec, &platform));

        let files = source_files(tmp.path(), &[]).unwrap();
        assert!(files.contains(&PathBuf::from("src/target/mod.rs")));
    }

    #[test]
    fn test_skipped_directories_are_left_out() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "src/main.rs", "fn main() {}");
        write(tmp.path(), "out/x86_64-linux/ion/bin/ion", "binary");
        write(tmp.path(), "cache/deep/store/file", "x");

        let skip = [tmp.path().join("out"), tmp.path().join("cache/deep/store")];
        let files = source_files(tmp.path(), &skip).unwrap();
        assert_eq!(files, vec![PathBuf::from("src/main.rs")]);
    }

    #[test]
    fn test_hash_depends_on_platform_and_tools() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "src/main.rs", "fn main() {}");
        let linux: Platform = "x86_64-linux".parse().unwrap();
        let arm: Platform = "aarch64-linux".parse().unwrap();

        let spec = ArtifactSpec::new("ion", tmp.path()).with_tools(["cargo", "rustc"]);
        let reordered = ArtifactSpec::new("ion", tmp.path()).with_tools(["rustc", "cargo"]);

        assert_ne!(hash_of(&spec, &linux), hash_of(&spec, &arm));
        assert_ne!(hash_of(&spec, &linux), hash_of(&reordered, &linux));
    }

    #[test]
    fn test_missing_source_is_an_error() {
        let platform: Platform = "x86_64-linux".parse().unwrap();
        let spec = ArtifactSpec::new("ion", "/definitely/not/here");
        let toolset = Toolset::new(platform.clone());
        let req = BuildRequest::new(&spec, &platform, &toolset, PathBuf::from("/unused"));
        assert!(matches!(
            closure_hash("test", &req),
            Err(BuildError::Io { .. })
        ));
    }
}
