//! Scripted executor for tests and dry runs.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{CommandOutput, ProcessExecutor};

/// What a scripted command does.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// The command ran and exited with this output
    Exit(CommandOutput),
    /// The command could not be launched
    LaunchError(String),
}

impl MockResponse {
    pub fn ok() -> Self {
        MockResponse::Exit(CommandOutput::new(0, "", ""))
    }

    pub fn stdout(exit_code: i32, stdout: impl Into<String>) -> Self {
        MockResponse::Exit(CommandOutput::new(exit_code, stdout, ""))
    }

    pub fn fail(exit_code: i32, stderr: impl Into<String>) -> Self {
        MockResponse::Exit(CommandOutput::new(exit_code, "", stderr))
    }

    pub fn launch_error(message: impl Into<String>) -> Self {
        MockResponse::LaunchError(message.into())
    }
}

/// Executor that never spawns anything.
///
/// Responses are chosen in this order: the first rule whose pattern is a
/// substring of the command, then the next queued response, then the default
/// (exit 0). Every call is recorded.
pub struct MockExecutor {
    rules: Vec<(String, MockResponse)>,
    queue: Mutex<VecDeque<MockResponse>>,
    default: MockResponse,
    calls: Mutex<Vec<(String, PathBuf)>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            queue: Mutex::new(VecDeque::new()),
            default: MockResponse::ok(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Respond to any command containing `pattern`
    pub fn on(mut self, pattern: impl Into<String>, response: MockResponse) -> Self {
        self.rules.push((pattern.into(), response));
        self
    }

    /// Queue responses consumed in call order
    pub fn with_sequence(self, responses: impl IntoIterator<Item = MockResponse>) -> Self {
        self.queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend(responses);
        self
    }

    pub fn with_default(mut self, response: MockResponse) -> Self {
        self.default = response;
        self
    }

    /// Commands run so far, in order
    pub fn commands(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(cmd, _)| cmd.clone())
            .collect()
    }

    /// Working directories used so far, in order
    pub fn working_dirs(&self) -> Vec<PathBuf> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, dir)| dir.clone())
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn respond(&self, command: &str) -> MockResponse {
        if let Some((_, response)) = self.rules.iter().find(|(pattern, _)| command.contains(pattern.as_str())) {
            return response.clone();
        }
        self.queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| self.default.clone())
    }
}

impl Default for MockExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessExecutor for MockExecutor {
    async fn run(&self, command: &str, working_dir: &Path) -> std::io::Result<CommandOutput> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((command.to_string(), working_dir.to_path_buf()));

        match self.respond(command) {
            MockResponse::Exit(output) => Ok(output),
            MockResponse::LaunchError(message) => Err(std::io::Error::new(std::io::ErrorKind::NotFound, message)),
        }
    }

    fn description(&self) -> &str {
        "mock executor"
    }
}
