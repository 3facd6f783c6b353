//! Git source - inputs from git repositories.

use std::path::{Path, PathBuf};

use git2::{build::CheckoutBuilder, Commit, Oid, Repository};
use url::Url;

use crate::core::input::GitReference;
use crate::resolver::ResolutionError;
use crate::sources::source::{Snapshot, Source};
use crate::util::hash::sha256_str;

/// A source for git inputs.
pub struct GitSource {
    /// Input name, for error messages
    name: String,

    /// Remote repository URL
    remote: Url,

    /// Git reference (branch, tag, rev)
    reference: GitReference,

    /// Exact commit overriding the reference
    pin: Option<String>,

    /// Local checkout path
    checkout_path: PathBuf,

    /// Never touch the network
    offline: bool,
}

impl GitSource {
    /// Create a new git source.
    pub fn new(
        name: impl Into<String>,
        remote: Url,
        reference: GitReference,
        pin: Option<String>,
        cache_dir: &Path,
    ) -> Self {
        // One checkout per repo + reference + pin
        let dir_name = format!(
            "{}-{}",
            sanitize_url_for_path(&remote),
            &sha256_str(&format!("{:?}{:?}", reference, pin))[..8]
        );

        let checkout_path = cache_dir.join("git").join(dir_name);

        GitSource {
            name: name.into(),
            remote,
            reference,
            pin,
            checkout_path,
            offline: false,
        }
    }

    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    pub fn checkout_path(&self) -> &Path {
        &self.checkout_path
    }

    fn fetch_error(&self, message: impl Into<String>) -> ResolutionError {
        ResolutionError::Fetch {
            name: self.name.clone(),
            url: self.remote.to_string(),
            message: message.into(),
        }
    }

    fn not_found(&self, reason: impl Into<String>) -> ResolutionError {
        ResolutionError::NotFound {
            name: self.name.clone(),
            locator: self.remote.to_string(),
            reason: reason.into(),
        }
    }

    fn clone_repo(&self) -> Result<Repository, ResolutionError> {
        tracing::info!("Cloning {}", self.remote);

        if let Some(parent) = self.checkout_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ResolutionError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        Repository::clone(self.remote.as_str(), &self.checkout_path)
            .map_err(|e| self.fetch_error(format!("clone failed: {}", e.message())))
    }

    fn update(&self, repo: &Repository) -> Result<(), ResolutionError> {
        tracing::info!("Updating {}", self.remote);

        let mut remote = repo
            .find_remote("origin")
            .map_err(|e| self.fetch_error(e.message().to_string()))?;
        remote
            .fetch(
                &[
                    "+refs/heads/*:refs/remotes/origin/*",
                    "+refs/tags/*:refs/tags/*",
                ],
                None,
                None,
            )
            .map_err(|e| self.fetch_error(format!("fetch failed: {}", e.message())))
    }

    /// Peel the pin, or else the reference, to a commit.
    fn find_commit<'r>(&self, repo: &'r Repository) -> Result<Commit<'r>, ResolutionError> {
        if let Some(pin) = &self.pin {
            return peel_rev(repo, pin)
                .ok_or_else(|| self.not_found(format!("pinned revision `{}` does not exist", pin)));
        }

        match &self.reference {
            GitReference::DefaultBranch => {
                let reference = repo
                    .find_reference("refs/remotes/origin/HEAD")
                    .or_else(|_| repo.head())
                    .map_err(|e| self.not_found(format!("no default branch: {}", e.message())))?;
                reference
                    .peel_to_commit()
                    .map_err(|e| self.not_found(e.message().to_string()))
            }
            GitReference::Branch(branch) => [
                format!("refs/remotes/origin/{}", branch),
                format!("refs/heads/{}", branch),
                format!("refs/tags/{}", branch),
            ]
            .iter()
            .find_map(|name| repo.find_reference(name).ok()?.peel_to_commit().ok())
            .ok_or_else(|| self.not_found(format!("branch `{}` does not exist", branch))),
            GitReference::Tag(tag) => repo
                .find_reference(&format!("refs/tags/{}", tag))
                .and_then(|r| r.peel_to_commit())
                .map_err(|_| self.not_found(format!("tag `{}` does not exist", tag))),
            GitReference::Rev(rev) => peel_rev(repo, rev)
                .ok_or_else(|| self.not_found(format!("revision `{}` does not exist", rev))),
        }
    }

    fn checkout(&self, repo: &Repository, commit: &Commit<'_>) -> Result<(), ResolutionError> {
        let mut opts = CheckoutBuilder::new();
        opts.force();
        repo.checkout_tree(commit.as_object(), Some(&mut opts))
            .and_then(|_| repo.set_head_detached(commit.id()))
            .map_err(|e| self.fetch_error(format!("checkout failed: {}", e.message())))
    }
}

impl Source for GitSource {
    fn name(&self) -> &str {
        "git"
    }

    fn is_cached(&self) -> bool {
        self.checkout_path.join(".git").exists()
    }

    fn fetch(&mut self) -> Result<Snapshot, ResolutionError> {
        let repo = if self.is_cached() {
            let repo = Repository::open(&self.checkout_path)
                .map_err(|e| self.fetch_error(format!("corrupt checkout: {}", e.message())))?;
            // A pin already present locally needs no network round trip.
            let pinned_locally = self
                .pin
                .as_deref()
                .is_some_and(|pin| peel_rev(&repo, pin).is_some());
            if !self.offline && !pinned_locally {
                self.update(&repo)?;
            }
            repo
        } else {
            if self.offline {
                return Err(self.fetch_error("not in the local cache and berth is offline"));
            }
            self.clone_repo()?
        };

        let commit = self.find_commit(&repo)?;
        self.checkout(&repo, &commit)?;

        tracing::debug!("input `{}` at {} ({})", self.name, commit.id(), self.remote);

        Ok(Snapshot {
            path: self.checkout_path.clone(),
            revision: Some(commit.id().to_string()),
        })
    }
}

fn peel_rev<'r>(repo: &'r Repository, rev: &str) -> Option<Commit<'r>> {
    if let Ok(oid) = Oid::from_str(rev) {
        if let Ok(commit) = repo.find_commit(oid) {
            return Some(commit);
        }
    }
    repo.revparse_single(rev).ok()?.peel_to_commit().ok()
}

/// Sanitize a URL for use as a directory name.
fn sanitize_url_for_path(url: &Url) -> String {
    let mut name = String::new();

    if let Some(host) = url.host_str() {
        name.push_str(host);
    }

    let path = url.path().trim_matches('/');
    if !path.is_empty() {
        if !name.is_empty() {
            name.push('-');
        }
        name.push_str(&path.replace('/', "-"));
    }

    if name.ends_with(".git") {
        name.truncate(name.len() - 4);
    }

    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Create a repository with one commit on `main` and a `v1` tag, then a
    /// second commit. Returns the repo URL and both commit ids.
    fn fixture_repo(dir: &Path) -> (Url, String, String) {
        let repo = Repository::init(dir).unwrap();
        let sig = git2::Signature::now("berth", "berth@example.com").unwrap();

        let commit_file = |content: &str, parent: Option<Oid>| -> Oid {
            std::fs::write(dir.join("README"), content).unwrap();
            let mut index = repo.index().unwrap();
            index.add_path(Path::new("README")).unwrap();
            index.write().unwrap();
            let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
            let parents: Vec<Commit<'_>> = parent
                .map(|p| vec![repo.find_commit(p).unwrap()])
                .unwrap_or_default();
            let parent_refs: Vec<&Commit<'_>> = parents.iter().collect();
            repo.commit(Some("refs/heads/main"), &sig, &sig, content, &tree, &parent_refs)
                .unwrap()
        };

        let first = commit_file("one", None);
        let first_commit = repo.find_commit(first).unwrap();
        repo.tag_lightweight("v1", first_commit.as_object(), false)
            .unwrap();
        let second = commit_file("two", Some(first));
        repo.set_head("refs/heads/main").unwrap();

        let url = Url::from_directory_path(dir).unwrap();
        (url, first.to_string(), second.to_string())
    }

    #[test]
    fn test_sanitize_url() {
        let url = Url::parse("https://github.com/user/repo.git").unwrap();
        assert_eq!(sanitize_url_for_path(&url), "github.com-user-repo");

        let url2 = Url::parse("https://gitlab.com/org/project").unwrap();
        assert_eq!(sanitize_url_for_path(&url2), "gitlab.com-org-project");
    }

    #[test]
    fn test_fetch_default_branch_and_tag() {
        let tmp = TempDir::new().unwrap();
        let upstream = tmp.path().join("upstream");
        std::fs::create_dir_all(&upstream).unwrap();
        let (url, first, second) = fixture_repo(&upstream);
        let cache = tmp.path().join("cache");

        let mut head = GitSource::new("lib", url.clone(), GitReference::DefaultBranch, None, &cache);
        let snapshot = head.fetch().unwrap();
        assert_eq!(snapshot.revision.as_deref(), Some(second.as_str()));
        assert_eq!(
            std::fs::read_to_string(snapshot.path.join("README")).unwrap(),
            "two"
        );

        let mut tag = GitSource::new("lib", url, GitReference::Tag("v1".into()), None, &cache);
        let snapshot = tag.fetch().unwrap();
        assert_eq!(snapshot.revision.as_deref(), Some(first.as_str()));
        assert_eq!(
            std::fs::read_to_string(snapshot.path.join("README")).unwrap(),
            "one"
        );
    }

    #[test]
    fn test_pin_overrides_branch() {
        let tmp = TempDir::new().unwrap();
        let upstream = tmp.path().join("upstream");
        std::fs::create_dir_all(&upstream).unwrap();
        let (url, first, _) = fixture_repo(&upstream);

        let mut source = GitSource::new(
            "lib",
            url,
            GitReference::Branch("main".into()),
            Some(first.clone()),
            &tmp.path().join("cache"),
        );
        let snapshot = source.fetch().unwrap();
        assert_eq!(snapshot.revision, Some(first));
    }

    #[test]
    fn test_unknown_branch_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let upstream = tmp.path().join("upstream");
        std::fs::create_dir_all(&upstream).unwrap();
        let (url, _, _) = fixture_repo(&upstream);

        let mut source = GitSource::new(
            "lib",
            url,
            GitReference::Branch("nope".into()),
            None,
            &tmp.path().join("cache"),
        );
        assert!(matches!(
            source.fetch(),
            Err(ResolutionError::NotFound { .. })
        ));
    }

    #[test]
    fn test_offline_without_cache_fails() {
        let tmp = TempDir::new().unwrap();
        let url = Url::parse("https://example.invalid/lib.git").unwrap();
        let mut source = GitSource::new(
            "lib",
            url,
            GitReference::DefaultBranch,
            None,
            tmp.path(),
        )
        .offline(true);
        assert!(!source.is_cached());
        assert!(matches!(source.fetch(), Err(ResolutionError::Fetch { .. })));
    }

    #[test]
    fn test_offline_uses_existing_checkout() {
        let tmp = TempDir::new().unwrap();
        let upstream = tmp.path().join("upstream");
        std::fs::create_dir_all(&upstream).unwrap();
        let (url, _, second) = fixture_repo(&upstream);
        let cache = tmp.path().join("cache");

        GitSource::new("lib", url.clone(), GitReference::DefaultBranch, None, &cache)
            .fetch()
            .unwrap();

        let mut offline =
            GitSource::new("lib", url, GitReference::DefaultBranch, None, &cache).offline(true);
        assert!(offline.is_cached());
        assert_eq!(offline.fetch().unwrap().revision, Some(second));
    }
}
