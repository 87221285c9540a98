//! Shell command execution.
//!
//! Every subprocess modgate starts (the analyzer, formatters, dependency
//! resolution, commands attached to fix suggestions) goes through the
//! `ProcessExecutor` capability so tests can swap in `MockExecutor`.

mod mock;

pub use mock::{MockExecutor, MockResponse};

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn new(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code: Some(exit_code),
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// stdout and stderr joined, for parsers that accept either stream
    pub fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (false, false) => format!("{}\n{}", self.stdout, self.stderr),
            (false, true) => self.stdout.clone(),
            _ => self.stderr.clone(),
        }
    }
}

/// Runs a shell command string in a directory.
///
/// `Err` means the command could not be launched or supervised (interpreter
/// missing, timeout). A command that ran and exited non-zero is `Ok`.
#[async_trait]
pub trait ProcessExecutor: Send + Sync {
    async fn run(&self, command: &str, working_dir: &Path) -> std::io::Result<CommandOutput>;

    fn description(&self) -> &str {
        "process executor"
    }
}

/// Platform shell wrapper used to interpret command strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shell {
    /// `sh -c <command>`
    Posix,
    /// `cmd /C <command>`
    Cmd,
}

impl Shell {
    /// The shell of the platform we were compiled for
    pub fn native() -> Self {
        if cfg!(windows) { Shell::Cmd } else { Shell::Posix }
    }

    /// Program and flag that precede the command string
    pub fn invocation(&self) -> (&'static str, &'static str) {
        match self {
            Shell::Posix => ("sh", "-c"),
            Shell::Cmd => ("cmd", "/C"),
        }
    }
}

/// Configuration for a shell executor
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Environment variables to set
    pub env: Vec<(String, String)>,
    /// Timeout in milliseconds (default: 300000)
    pub timeout_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            env: Vec::new(),
            timeout_ms: 300_000,
        }
    }
}

impl ExecutorConfig {
    /// Add an environment variable
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Set the timeout in milliseconds
    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }
}

/// Executes commands through the platform shell.
pub struct ShellExecutor {
    shell: Shell,
    config: ExecutorConfig,
}

impl ShellExecutor {
    pub fn new(shell: Shell, config: ExecutorConfig) -> Self {
        Self { shell, config }
    }

    /// Native shell with default settings
    pub fn native() -> Self {
        Self::new(Shell::native(), ExecutorConfig::default())
    }

    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.config.timeout_ms = ms;
        self
    }

    pub fn shell(&self) -> Shell {
        self.shell
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.config.timeout_ms)
    }
}

#[async_trait]
impl ProcessExecutor for ShellExecutor {
    async fn run(&self, command: &str, working_dir: &Path) -> std::io::Result<CommandOutput> {
        let (program, flag) = self.shell.invocation();

        let mut cmd = Command::new(program);
        cmd.arg(flag).arg(command);
        cmd.current_dir(working_dir);

        for (key, value) in &self.config.env {
            cmd.env(key, value);
        }

        cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        log::debug!("Running `{}` in {}", command, working_dir.display());
        let child = cmd.spawn()?;

        let output = match tokio::time::timeout(self.timeout(), child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("Command timed out after {}ms", self.config.timeout_ms),
                ));
            }
        };

        Ok(CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    fn description(&self) -> &str {
        match self.shell {
            Shell::Posix => "posix shell",
            Shell::Cmd => "cmd shell",
        }
    }
}

/// Quote a path for inclusion in a shell command string.
pub fn quote_arg(arg: &str, shell: Shell) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '\\' | '.' | '_' | '-' | ':'));
    if plain {
        return arg.to_string();
    }
    match shell {
        Shell::Posix => format!("'{}'", arg.replace('\'', r"'\''")),
        Shell::Cmd => format!("\"{}\"", arg.replace('"', "\"\"")),
    }
}

/// Command that creates `dir` and any missing parents.
pub fn mkdir_command(dir: &str, shell: Shell) -> String {
    match shell {
        Shell::Posix => format!("mkdir -p {}", quote_arg(dir, shell)),
        // cmd's mkdir creates intermediate directories already
        Shell::Cmd => format!("mkdir {}", quote_arg(&dir.replace('/', "\\"), shell)),
    }
}

/// Fill a command template.
///
/// `{file}` becomes the quoted file path, or `.` when there is none. Each
/// `(key, value)` in `extra` replaces `{key}` verbatim.
pub fn render_command(template: &str, file: Option<&Path>, extra: &[(&str, &str)]) -> String {
    let file_arg = match file {
        Some(path) => quote_arg(&path.to_string_lossy(), Shell::native()),
        None => ".".to_string(),
    };
    let mut command = template.replace("{file}", &file_arg);
    for (key, value) in extra {
        command = command.replace(&format!("{{{}}}", key), value);
    }
    command
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_shell_matches_platform() {
        if cfg!(windows) {
            assert_eq!(Shell::native(), Shell::Cmd);
        } else {
            assert_eq!(Shell::native(), Shell::Posix);
        }
    }

    #[test]
    fn test_mkdir_command_quotes_and_creates_parents() {
        assert_eq!(mkdir_command("lib", Shell::Posix), "mkdir -p lib");
        assert_eq!(mkdir_command("assets/my icons", Shell::Posix), "mkdir -p 'assets/my icons'");
        assert_eq!(mkdir_command("assets/icons", Shell::Cmd), "mkdir assets\\icons");
        assert_eq!(mkdir_command("my dir", Shell::Cmd), "mkdir \"my dir\"");
    }

    #[test]
    fn test_shell_invocation() {
        assert_eq!(Shell::Posix.invocation(), ("sh", "-c"));
        assert_eq!(Shell::Cmd.invocation(), ("cmd", "/C"));
    }

    #[test]
    fn test_executor_config_builder() {
        let config = ExecutorConfig::default().env("FOO", "bar").timeout_ms(5000);
        assert_eq!(config.env, vec![("FOO".to_string(), "bar".to_string())]);
        assert_eq!(config.timeout_ms, 5000);
    }

    #[test]
    fn test_command_output_combined() {
        assert_eq!(CommandOutput::new(0, "out", "").combined(), "out");
        assert_eq!(CommandOutput::new(1, "", "err").combined(), "err");
        assert_eq!(CommandOutput::new(1, "out", "err").combined(), "out\nerr");
    }

    #[test]
    fn test_quote_arg() {
        assert_eq!(quote_arg("lib/src/a.dart", Shell::Posix), "lib/src/a.dart");
        assert_eq!(quote_arg("my file.dart", Shell::Posix), "'my file.dart'");
        assert_eq!(quote_arg("it's.dart", Shell::Posix), r"'it'\''s.dart'");
        assert_eq!(quote_arg("my file.dart", Shell::Cmd), "\"my file.dart\"");
    }

    #[test]
    fn test_render_command() {
        assert_eq!(
            render_command("dart format {file}", Some(Path::new("lib/a.dart")), &[]),
            "dart format lib/a.dart"
        );
        assert_eq!(render_command("dart fix --apply {file}", None, &[]), "dart fix --apply .");
        assert_eq!(
            render_command("dart fix --apply --code={code} {file}", Some(Path::new("lib/a.dart")), &[("code", "unnecessary_new")]),
            "dart fix --apply --code=unnecessary_new lib/a.dart"
        );
        assert_eq!(render_command("dart pub get", Some(Path::new("pubspec.yaml")), &[]), "dart pub get");
    }

    #[cfg(unix)]
    mod posix {
        use super::*;
        use tempfile::tempdir;

        #[tokio::test]
        async fn test_run_success_captures_stdout() {
            let dir = tempdir().unwrap();
            let output = ShellExecutor::native().run("echo hello", dir.path()).await.unwrap();
            assert!(output.success());
            assert_eq!(output.stdout.trim(), "hello");
        }

        #[tokio::test]
        async fn test_run_failure_captures_stderr() {
            let dir = tempdir().unwrap();
            let output = ShellExecutor::native()
                .run("echo broken >&2; exit 3", dir.path())
                .await
                .unwrap();
            assert_eq!(output.exit_code, Some(3));
            assert!(output.stderr.contains("broken"));
        }

        #[tokio::test]
        async fn test_run_uses_working_directory() {
            let dir = tempdir().unwrap();
            std::fs::write(dir.path().join("marker.txt"), "found").unwrap();
            let output = ShellExecutor::native().run("cat marker.txt", dir.path()).await.unwrap();
            assert_eq!(output.stdout, "found");
        }

        #[tokio::test]
        async fn test_run_with_env() {
            let dir = tempdir().unwrap();
            let executor = ShellExecutor::new(Shell::Posix, ExecutorConfig::default().env("MY_VAR", "hello"));
            let output = executor.run("test \"$MY_VAR\" = \"hello\"", dir.path()).await.unwrap();
            assert!(output.success());
        }

        #[tokio::test]
        async fn test_run_timeout_is_error() {
            let dir = tempdir().unwrap();
            let err = ShellExecutor::native()
                .with_timeout_ms(100)
                .run("sleep 10", dir.path())
                .await
                .unwrap_err();
            assert_eq!(err.kind(), std::io::ErrorKind::TimedOut);
            assert!(err.to_string().contains("timed out"));
        }

        #[tokio::test]
        async fn test_missing_working_directory_is_launch_error() {
            let err = ShellExecutor::native()
                .run("true", Path::new("/nonexistent/modgate/dir"))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
        }
    }
}
