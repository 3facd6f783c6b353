//! Test fixtures for common test scenarios.

use std::path::{Path, PathBuf};

use git2::{Repository, Signature};
use url::Url;

use crate::core::project::Project;
use crate::util::context::MANIFEST_NAME;

/// The shell-plus-completion-service project used across tests.
///
/// Expects the project at `<dir>/ion` and the companion checkout at
/// `<dir>/shellac-server`.
pub const ION_MANIFEST: &str = r#"[project]
name = "ion"

[inputs]
ion-shell = "./."
shellac-server = "../shellac-server"

[artifacts.ion]
input = "ion-shell"
bin = "ion"

[artifacts.shellac]
input = "shellac-server"
bin = "shellac"
data = ["completion"]

[compose]
primary = "ion"
companion = "shellac"

[platforms]
supported = ["x86_64-linux", "aarch64-linux"]
"#;

/// Write a file, creating parent directories.
pub fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

/// Write `Berth.toml` into `root` and load the project.
pub fn load_project(root: &Path, manifest: &str) -> Project {
    let manifest_path: PathBuf = root.join(MANIFEST_NAME);
    write_file(&manifest_path, manifest);
    Project::load(&manifest_path).unwrap()
}

/// Create a git repository with one commit on `main`.
///
/// Returns its `file://` URL and the commit id.
pub fn init_git_repo(dir: &Path) -> (Url, String) {
    write_file(&dir.join("src/main.rs"), "fn main() {}");
    write_file(&dir.join("completion/ion.toml"), "[ion]");

    let repo = Repository::init(dir).unwrap();
    let sig = Signature::now("berth", "berth@example.com").unwrap();
    let mut index = repo.index().unwrap();
    index
        .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
        .unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let commit = repo
        .commit(Some("refs/heads/main"), &sig, &sig, "initial", &tree, &[])
        .unwrap();
    repo.set_head("refs/heads/main").unwrap();

    (Url::from_directory_path(dir).unwrap(), commit.to_string())
}
