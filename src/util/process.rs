//! Subprocess execution utilities.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Output, Stdio};

use anyhow::{bail, Context, Result};

/// Exit code shells use when a command cannot be found.
pub const EXIT_COMMAND_NOT_FOUND: i32 = 127;

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<OsString>,
    env: BTreeMap<OsString, OsString>,
    env_remove: Vec<OsString>,
    cwd: Option<PathBuf>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: BTreeMap::new(),
            env_remove: Vec::new(),
            cwd: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|s| s.as_ref().to_os_string()));
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.env
            .insert(key.as_ref().to_os_string(), value.as_ref().to_os_string());
        self
    }

    /// Remove an environment variable.
    pub fn env_remove(mut self, key: impl AsRef<OsStr>) -> Self {
        self.env_remove.push(key.as_ref().to_os_string());
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// Prepend directories to the child's `PATH`, keeping the caller's value.
    pub fn prepend_path<I, P>(self, dirs: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut entries: Vec<PathBuf> = dirs.into_iter().map(|d| d.as_ref().to_path_buf()).collect();
        if entries.is_empty() {
            return Ok(self);
        }

        let existing = self
            .env
            .get(OsStr::new("PATH"))
            .cloned()
            .or_else(|| std::env::var_os("PATH"));
        if let Some(existing) = existing {
            entries.extend(std::env::split_paths(&existing));
        }

        let joined = std::env::join_paths(entries).context("invalid entry in PATH")?;
        Ok(self.env("PATH", joined))
    }

    /// Get the program path.
    pub fn get_program(&self) -> &Path {
        &self.program
    }

    /// Get the value the child will see for `key`, if overridden.
    pub fn get_env(&self, key: &str) -> Option<&OsStr> {
        self.env.get(OsStr::new(key)).map(|v| v.as_os_str())
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        for key in &self.env_remove {
            cmd.env_remove(key);
        }

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd
    }

    /// Execute the command, capturing stdout and stderr.
    pub fn exec(&self) -> Result<Output> {
        let mut cmd = self.build_command();
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        cmd.output()
            .with_context(|| format!("failed to execute `{}`", self.program.display()))
    }

    /// Execute and require success.
    pub fn exec_and_check(&self) -> Result<Output> {
        let output = self.exec()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "`{}` failed with exit code {:?}\n{}",
                self.display_command(),
                output.status.code(),
                stderr
            );
        }
        Ok(output)
    }

    /// Execute with inherited stdio and return the status.
    pub fn status(&self) -> Result<ExitStatus> {
        let mut cmd = self.build_command();
        let status = cmd
            .status()
            .with_context(|| format!("failed to execute `{}`", self.program.display()))?;
        Ok(status)
    }

    /// Run the command in the foreground and return its exit code verbatim.
    ///
    /// On unix the current process image is replaced, so this only returns
    /// when the program could not be started. A program that cannot be
    /// found yields [`EXIT_COMMAND_NOT_FOUND`], matching what a shell does.
    pub fn exec_replace(&self) -> Result<i32> {
        let mut cmd = self.build_command();

        match replace_process(&mut cmd) {
            Ok(code) => Ok(code),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                eprintln!("berth: {}: command not found", self.program.display());
                Ok(EXIT_COMMAND_NOT_FOUND)
            }
            Err(err) => {
                Err(err).with_context(|| format!("failed to execute `{}`", self.program.display()))
            }
        }
    }

    /// Display the command for error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().map(|a| a.to_string_lossy().into_owned()));
        parts.join(" ")
    }
}

#[cfg(unix)]
fn replace_process(cmd: &mut Command) -> std::io::Result<i32> {
    use std::os::unix::process::CommandExt;

    // `exec` only returns on failure.
    Err(cmd.exec())
}

#[cfg(not(unix))]
fn replace_process(cmd: &mut Command) -> std::io::Result<i32> {
    cmd.status().map(|status| status.code().unwrap_or(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_process_builder() {
        let output = ProcessBuilder::new("echo").arg("hello").exec().unwrap();

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert_eq!(stdout.trim(), "hello");
    }

    #[test]
    fn test_display_command() {
        let pb = ProcessBuilder::new("cargo").args(["install", "--path", "."]);

        assert_eq!(pb.display_command(), "cargo install --path .");
    }

    #[cfg(unix)]
    #[test]
    fn test_prepend_path_keeps_existing() {
        let pb = ProcessBuilder::new("sh")
            .env("PATH", "/usr/bin:/bin")
            .prepend_path(["/opt/tools/bin"])
            .unwrap();

        assert_eq!(
            pb.get_env("PATH").unwrap(),
            OsStr::new("/opt/tools/bin:/usr/bin:/bin")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_exec_and_check_reports_failure() {
        let err = ProcessBuilder::new("sh")
            .args(["-c", "echo broken >&2; exit 3"])
            .exec_and_check()
            .unwrap_err();
        let msg = format!("{:#}", err);
        assert!(msg.contains("Some(3)"));
        assert!(msg.contains("broken"));
    }
}
