//! Input references - WHERE sources come from.
//!
//! An input is written `name@locator`:
//!
//! - `ion-shell@./.` - a directory relative to the project root
//! - `shellac-server@github:owner/shellac-server/main` - GitHub shorthand
//! - `lib@git+https://example.com/lib.git?tag=v1.0` - any git remote
//!
//! A reference may carry a pin (an exact commit) that overrides whatever
//! the locator's branch currently points at.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::resolver::ResolutionError;

/// Git reference to check out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GitReference {
    /// Default branch (usually main/master)
    #[default]
    DefaultBranch,
    /// Specific branch
    Branch(String),
    /// Specific tag
    Tag(String),
    /// Specific revision (commit hash)
    Rev(String),
}

/// Where an input's source lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Locator {
    /// Local directory, relative paths are taken from the project root.
    Path(PathBuf),
    /// Git repository.
    Git { url: Url, reference: GitReference },
}

impl Locator {
    /// Parse a locator string.
    pub fn parse(s: &str) -> Result<Self, ResolutionError> {
        let invalid = |reason: &str| ResolutionError::InvalidLocator {
            locator: s.to_string(),
            reason: reason.to_string(),
        };

        if s.is_empty() {
            return Err(invalid("locator is empty"));
        }

        if let Some(rest) = s.strip_prefix("github:") {
            let parts: Vec<&str> = rest.split('/').collect();
            let (owner, repo, reference) = match parts.as_slice() {
                [owner, repo] => (*owner, *repo, GitReference::DefaultBranch),
                [owner, repo, reference] => (*owner, *repo, classify_ref(reference)),
                _ => return Err(invalid("expected `github:<owner>/<repo>[/<ref>]`")),
            };
            if owner.is_empty() || repo.is_empty() {
                return Err(invalid("expected `github:<owner>/<repo>[/<ref>]`"));
            }
            let url = Url::parse(&format!("https://github.com/{}/{}", owner, repo))
                .map_err(|e| invalid(&e.to_string()))?;
            return Ok(Locator::Git { url, reference });
        }

        if let Some(rest) = s.strip_prefix("git+") {
            let mut url = Url::parse(rest).map_err(|e| invalid(&e.to_string()))?;
            let reference = match url.query() {
                Some(query) => parse_git_query(query).map_err(|reason| invalid(&reason))?,
                None => GitReference::DefaultBranch,
            };
            url.set_query(None);
            return Ok(Locator::Git { url, reference });
        }

        if let Some(rest) = s.strip_prefix("path:") {
            if rest.is_empty() {
                return Err(invalid("`path:` needs a directory"));
            }
            return Ok(Locator::Path(PathBuf::from(rest)));
        }

        if s.starts_with('.') || Path::new(s).is_absolute() || s.starts_with('/') {
            return Ok(Locator::Path(PathBuf::from(s)));
        }

        Err(invalid(
            "expected a path (`./dir`), `path:<dir>`, `github:<owner>/<repo>[/<ref>]` or `git+<url>`",
        ))
    }

    pub fn is_git(&self) -> bool {
        matches!(self, Locator::Git { .. })
    }
}

/// A bare ref in `github:` shorthand is a commit when it looks like one.
fn classify_ref(reference: &str) -> GitReference {
    if reference.len() == 40 && reference.chars().all(|c| c.is_ascii_hexdigit()) {
        GitReference::Rev(reference.to_string())
    } else {
        GitReference::Branch(reference.to_string())
    }
}

fn parse_git_query(query: &str) -> Result<GitReference, String> {
    for param in query.split('&') {
        if let Some((key, value)) = param.split_once('=') {
            match key {
                "branch" | "ref" => return Ok(GitReference::Branch(value.to_string())),
                "tag" => return Ok(GitReference::Tag(value.to_string())),
                "rev" => return Ok(GitReference::Rev(value.to_string())),
                _ => {}
            }
        }
    }
    Err(format!("unrecognised git query `{}`", query))
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Path(path) => write!(f, "{}", path.display()),
            Locator::Git { url, reference } => {
                write!(f, "git+{}", url)?;
                match reference {
                    GitReference::DefaultBranch => Ok(()),
                    GitReference::Branch(b) => write!(f, "?branch={}", b),
                    GitReference::Tag(t) => write!(f, "?tag={}", t),
                    GitReference::Rev(r) => write!(f, "?rev={}", r),
                }
            }
        }
    }
}

impl FromStr for Locator {
    type Err = ResolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Locator::parse(s)
    }
}

/// A named external source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InputReference {
    pub name: String,
    pub locator: Locator,
    pub pin: Option<String>,
}

impl InputReference {
    pub fn new(name: impl Into<String>, locator: Locator) -> Self {
        InputReference {
            name: name.into(),
            locator,
            pin: None,
        }
    }

    pub fn with_pin(mut self, pin: impl Into<String>) -> Self {
        self.pin = Some(pin.into());
        self
    }

    /// Parse the `name@locator` form.
    pub fn parse(s: &str) -> Result<Self, ResolutionError> {
        let (name, locator) = s
            .split_once('@')
            .ok_or_else(|| ResolutionError::InvalidLocator {
                locator: s.to_string(),
                reason: "expected `<name>@<locator>`".to_string(),
            })?;

        validate_name(name).map_err(|reason| ResolutionError::InvalidLocator {
            locator: s.to_string(),
            reason,
        })?;

        Ok(InputReference::new(name, Locator::parse(locator)?))
    }
}

/// Input names are used in paths and lockfiles.
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("input name is empty".to_string());
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(format!(
            "input name `{}` may only contain letters, digits, `-`, `_` and `.`",
            name
        ));
    }
    Ok(())
}

impl fmt::Display for InputReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.locator)?;
        if let Some(pin) = &self.pin {
            write!(f, " (pinned to {})", pin)?;
        }
        Ok(())
    }
}

impl FromStr for InputReference {
    type Err = ResolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InputReference::parse(s)
    }
}

/// An input resolved to a concrete source snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInput {
    pub reference: InputReference,
    /// Local directory holding the source.
    pub path: PathBuf,
    /// Commit id for git inputs.
    pub revision: Option<String>,
}

/// All inputs for one evaluation, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedInputs {
    inputs: BTreeMap<String, ResolvedInput>,
}

impl ResolvedInputs {
    pub fn new() -> Self {
        ResolvedInputs::default()
    }

    pub fn insert(&mut self, input: ResolvedInput) {
        self.inputs.insert(input.reference.name.clone(), input);
    }

    pub fn get(&self, name: &str) -> Option<&ResolvedInput> {
        self.inputs.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedInput> {
        self.inputs.values()
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}
