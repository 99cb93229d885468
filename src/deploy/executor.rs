//! Privileged command execution
//!
//! Runs external commands as argument vectors, optionally elevated. The
//! vector goes straight to the process-spawn primitive and no shell ever
//! interprets it, so container names, image references and folder names
//! ride as inert arguments.
//!
//! When a command needs elevation the administrator secret is streamed to
//! the elevation wrapper's stdin (`sudo -S`), never placed on the command
//! line or in the environment where process listings would expose it.

use log::debug;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::deploy::results::CommandResult;
use crate::error::DeployError;

/// Elevation wrapper prepended when a secret is supplied. `-S` reads the
/// password from stdin, `-p ''` suppresses the prompt text, `--` stops
/// option parsing before the wrapped command.
const ELEVATION_PREFIX: &[&str] = &["sudo", "-S", "-p", "", "--"];

/// Executes external commands and captures their output.
///
/// Stateless; cheap to clone wherever an orchestrator needs one. Execution
/// is blocking from the caller's perspective (the future resolves when the
/// child exits) and no timeout is imposed, so a hung child blocks the
/// calling operation.
#[derive(Debug, Clone, Default)]
pub struct PrivilegedExecutor;

impl PrivilegedExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Runs `argv` to completion, capturing stdout and stderr separately.
    ///
    /// With `secret` the command runs under the elevation wrapper and the
    /// secret is written to its stdin followed by a newline. A nonzero exit
    /// is reported inside `Ok`; only spawn and pipe failures are `Err`.
    pub async fn run(
        &self,
        argv: &[&str],
        secret: Option<&str>,
    ) -> Result<CommandResult, DeployError> {
        let Some((program, args)) = argv.split_first() else {
            return Err(DeployError::InvalidSpec("empty command vector".into()));
        };
        if program.is_empty() {
            return Err(DeployError::InvalidSpec("empty program name".into()));
        }

        let mut command = match secret {
            Some(_) => {
                let mut command = Command::new(ELEVATION_PREFIX[0]);
                command.args(&ELEVATION_PREFIX[1..]).args(argv);
                command.stdin(Stdio::piped());
                command
            }
            None => {
                let mut command = Command::new(program);
                command.args(args);
                command.stdin(Stdio::null());
                command
            }
        };
        command.stdout(Stdio::piped()).stderr(Stdio::piped());

        debug!("Spawning command: {:?}", argv);

        let mut child = command.spawn()?;

        if let Some(secret) = secret {
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(secret.as_bytes()).await?;
                stdin.write_all(b"\n").await?;
                // Dropping the handle closes the pipe so the wrapper
                // cannot wait for more input.
            }
        }

        let output = child.wait_with_output().await?;

        Ok(CommandResult {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}
