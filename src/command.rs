use std::process::{Command, Stdio};

use log::{debug, warn};

pub const DEFAULT_SEARCH_PATH: &str = "/usr/bin:/usr/sbin";

/// Environment handed to every external tool.
///
/// Tools run with an otherwise empty environment so that the caller's
/// locale or `PATH` cannot change their output format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecPolicy {
    pub search_path: String,
}

impl Default for ExecPolicy {
    fn default() -> Self {
        Self { search_path: DEFAULT_SEARCH_PATH.to_string() }
    }
}

/// Runs an external program and hands back whatever it wrote to stdout.
///
/// A nonzero exit status is not an error: the tools queried here report
/// "nothing to say" that way often enough that the output is all that counts.
pub trait CommandRunner: Send + Sync {
    fn execute(&self, argv: &[&str]) -> String;
}

#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    policy: ExecPolicy,
}

impl SystemRunner {
    pub fn new(policy: ExecPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ExecPolicy {
        &self.policy
    }
}

impl CommandRunner for SystemRunner {
    fn execute(&self, argv: &[&str]) -> String {
        let Some((program, args)) = argv.split_first() else {
            return String::new();
        };

        debug!("exec {}", argv.join(" "));

        let output = Command::new(program)
            .args(args)
            .env_clear()
            .env("PATH", &self.policy.search_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output();

        match output {
            Ok(output) => {
                if !output.status.success() {
                    warn!("{} exited with {}", program, output.status);
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    if !stderr.trim().is_empty() {
                        debug!("{} stderr: {}", program, stderr.trim());
                    }
                }
                String::from_utf8_lossy(&output.stdout).into_owned()
            }
            Err(e) => {
                warn!("cannot run {}: {}", program, e);
                String::new()
            }
        }
    }
}
