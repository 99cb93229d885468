//! Container orchestration
//!
//! Installs the container runtime and deploys, removes and lists named
//! containers through the runtime CLI. Every command is a fixed argument
//! vector executed by the privileged executor. The runtime itself is the
//! sole source of truth for which containers exist; the orchestrator
//! keeps no bookkeeping of its own.

use log::{error, info, warn};
use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::config::DeployConfig;
use crate::deploy::executor::PrivilegedExecutor;
use crate::deploy::ports::find_free_port;
use crate::deploy::results::{CommandResult, ContainerInfo, StepOutcome};
use crate::error::DeployError;

const RUNTIME_BIN: &str = "docker";

/// Fixed format string for process listings: three space-separated fields,
/// status last so its embedded spaces survive the split.
const PS_FORMAT: &str = "{{.Names}} {{.Image}} {{.Status}}";

/// A bind mount or named volume passed to the runtime as `-v host:container`.
#[derive(Debug, Clone)]
pub struct VolumeMount {
    /// Host path (bind mount, `~` expands against `$HOME`) or bare volume name.
    pub host: String,
    pub container: String,
}

/// A fixed host-port binding in addition to the allocated service port.
#[derive(Debug, Clone)]
pub struct PortBinding {
    pub host: u16,
    pub container: u16,
    pub udp: bool,
}

/// Everything needed to run one container.
///
/// `container_port` is the service port the orchestrator publishes on a
/// freshly allocated host port; `extra_ports` are published verbatim for
/// services that must sit on well-known ports (e.g. DNS on 53).
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub container_port: u16,
    pub volumes: Vec<VolumeMount>,
    pub env: Vec<(String, String)>,
    pub extra_ports: Vec<PortBinding>,
    pub dns: Vec<String>,
    pub add_hosts: Vec<String>,
    pub restart: Option<String>,
}

impl ContainerSpec {
    pub fn new(name: impl Into<String>, image: impl Into<String>, container_port: u16) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            container_port,
            volumes: Vec::new(),
            env: Vec::new(),
            extra_ports: Vec::new(),
            dns: Vec::new(),
            add_hosts: Vec::new(),
            restart: None,
        }
    }

    fn validate(&self) -> Result<(), DeployError> {
        if self.name.trim().is_empty() {
            return Err(DeployError::InvalidSpec("container name is empty".into()));
        }
        if self.name.contains(char::is_whitespace) {
            return Err(DeployError::InvalidSpec(format!(
                "container name contains whitespace: {}",
                self.name
            )));
        }
        if self.image.trim().is_empty() {
            return Err(DeployError::InvalidSpec("image reference is empty".into()));
        }
        Ok(())
    }
}

/// Deploys and tears down containers on the local host.
pub struct ContainerOrchestrator {
    executor: PrivilegedExecutor,
    port_range_start: u16,
    port_range_end: u16,
    reserved_ports: HashSet<u16>,
}

impl ContainerOrchestrator {
    pub fn new(
        executor: PrivilegedExecutor,
        port_range_start: u16,
        port_range_end: u16,
        reserved_ports: HashSet<u16>,
    ) -> Self {
        Self {
            executor,
            port_range_start,
            port_range_end,
            reserved_ports,
        }
    }

    pub fn from_config(config: &DeployConfig) -> Self {
        Self::new(
            PrivilegedExecutor::new(),
            config.port_range_start,
            config.port_range_end,
            config.reserved_set(),
        )
    }

    /// Installs the container engine on an apt-based host.
    ///
    /// Fixed best-effort sequence: index refresh, prerequisites, engine
    /// repository registration, index refresh again, engine install. Each
    /// step runs independently; a failed step is logged and the sequence
    /// continues, since on a partially configured host the remaining steps
    /// often still succeed. The per-step outcomes are returned for display.
    pub async fn install_runtime(&self, secret: &str) -> Vec<StepOutcome> {
        let mut report = Vec::new();

        self.run_step(
            &mut report,
            "refresh package index",
            &["apt-get", "update"],
            Some(secret),
        )
        .await;

        self.run_step(
            &mut report,
            "install prerequisites",
            &[
                "apt-get",
                "install",
                "-y",
                "apt-transport-https",
                "ca-certificates",
                "curl",
                "software-properties-common",
            ],
            Some(secret),
        )
        .await;

        // The repository line needs the distribution codename the original
        // obtained with a shell substitution; probe it as its own command.
        match self.executor.run(&["lsb_release", "-cs"], None).await {
            Ok(probe) if probe.success() && !probe.stdout.trim().is_empty() => {
                let repo_line = format!(
                    "deb [arch=amd64] https://download.docker.com/linux/ubuntu {} stable",
                    probe.stdout.trim()
                );
                self.run_step(
                    &mut report,
                    "register engine repository",
                    &["add-apt-repository", "-y", repo_line.as_str()],
                    Some(secret),
                )
                .await;
            }
            _ => {
                warn!("Could not determine release codename; skipping repository registration");
                report.push(StepOutcome {
                    description: "register engine repository".into(),
                    result: None,
                });
            }
        }

        self.run_step(
            &mut report,
            "refresh package index",
            &["apt-get", "update"],
            Some(secret),
        )
        .await;

        self.run_step(
            &mut report,
            "install container engine",
            &["apt-get", "install", "-y", "docker-ce"],
            Some(secret),
        )
        .await;

        info!(
            "Runtime install finished: {}/{} steps succeeded",
            successful_steps(&report),
            report.len()
        );

        report
    }

    /// Starts the engine service and enables it at boot, best-effort.
    pub async fn start_runtime_service(&self, secret: &str) -> Vec<StepOutcome> {
        let mut report = Vec::new();
        self.run_step(
            &mut report,
            "start engine service",
            &["systemctl", "start", "docker"],
            Some(secret),
        )
        .await;
        self.run_step(
            &mut report,
            "enable engine service at boot",
            &["systemctl", "enable", "docker"],
            Some(secret),
        )
        .await;
        report
    }

    /// Deploys one container and returns the host port its service port was
    /// published on.
    ///
    /// A free host port is leased from the configured scan range, bind-mount
    /// host directories are created, then a single detached `run` command is
    /// issued. Not idempotent: a second deploy with the same name fails at
    /// the runtime level and surfaces as `CommandFailed`, as does losing the
    /// leased port to a concurrent bind.
    pub async fn deploy_container(&self, spec: &ContainerSpec) -> Result<u16, DeployError> {
        spec.validate()?;

        let host_port = find_free_port(
            self.port_range_start,
            self.port_range_end,
            &self.reserved_ports,
        )?;

        let mut argv: Vec<String> = vec![
            RUNTIME_BIN.into(),
            "run".into(),
            "-d".into(),
            "--name".into(),
            spec.name.clone(),
            "-p".into(),
            format!("{}:{}", host_port, spec.container_port),
        ];

        for binding in &spec.extra_ports {
            argv.push("-p".into());
            let proto = if binding.udp { "/udp" } else { "" };
            argv.push(format!("{}:{}{}", binding.host, binding.container, proto));
        }

        for volume in &spec.volumes {
            let host = self.prepare_volume_host(volume)?;
            argv.push("-v".into());
            argv.push(format!("{}:{}", host, volume.container));
        }

        for (key, value) in &spec.env {
            argv.push("-e".into());
            argv.push(format!("{}={}", key, value));
        }

        for server in &spec.dns {
            argv.push(format!("--dns={}", server));
        }

        for host in &spec.add_hosts {
            argv.push(format!("--add-host={}", host));
        }

        if let Some(policy) = &spec.restart {
            argv.push(format!("--restart={}", policy));
        }

        argv.push(spec.image.clone());

        let argv_refs: Vec<&str> = argv.iter().map(String::as_str).collect();
        let result = self.executor.run(&argv_refs, None).await?;

        if !result.success() {
            error!(
                "Deploy of container {} failed with exit code {}: {}",
                spec.name,
                result.exit_code,
                result.stderr.trim()
            );
            return Err(DeployError::CommandFailed {
                exit_code: result.exit_code,
                stderr: result.stderr.trim().to_string(),
            });
        }

        info!(
            "Deployed container {} (image {}) on host port {}",
            spec.name, spec.image, host_port
        );

        Ok(host_port)
    }

    /// Stops and removes a named container.
    ///
    /// The two commands run in sequence and each may fail independently
    /// (stopping an already-stopped container is normal), so failures are
    /// logged and the sequence continues.
    pub async fn remove_container(&self, name: &str) -> Result<Vec<StepOutcome>, DeployError> {
        if name.trim().is_empty() {
            return Err(DeployError::InvalidSpec("container name is empty".into()));
        }

        let mut report = Vec::new();
        self.run_step(
            &mut report,
            "stop container",
            &[RUNTIME_BIN, "stop", name],
            None,
        )
        .await;
        self.run_step(
            &mut report,
            "remove container",
            &[RUNTIME_BIN, "rm", name],
            None,
        )
        .await;

        info!(
            "Removal of container {} finished: {}/{} steps succeeded",
            name,
            successful_steps(&report),
            report.len()
        );
        Ok(report)
    }

    /// Lists running containers as reported by the runtime.
    pub async fn list_running(&self) -> Result<Vec<ContainerInfo>, DeployError> {
        let result = self
            .executor
            .run(&[RUNTIME_BIN, "ps", "--format", PS_FORMAT], None)
            .await?;

        if !result.success() {
            return Err(DeployError::CommandFailed {
                exit_code: result.exit_code,
                stderr: result.stderr.trim().to_string(),
            });
        }

        Ok(parse_container_listing(&result.stdout))
    }

    /// Runs one best-effort step, logging the outcome and recording it.
    async fn run_step(
        &self,
        report: &mut Vec<StepOutcome>,
        description: &str,
        argv: &[&str],
        secret: Option<&str>,
    ) {
        let result = match self.executor.run(argv, secret).await {
            Ok(result) => {
                if result.success() {
                    info!("Step '{}' succeeded", description);
                } else {
                    warn!(
                        "Step '{}' exited with code {}: {}",
                        description,
                        result.exit_code,
                        result.stderr.trim()
                    );
                }
                Some(result)
            }
            Err(e) => {
                error!("Step '{}' could not run: {}", description, e);
                None
            }
        };
        report.push(StepOutcome {
            description: description.to_string(),
            result,
        });
    }

    /// Ensures a bind-mount host directory exists, expanding a leading `~`.
    ///
    /// Bare volume names (no leading `/` or `~`) are managed by the runtime
    /// and passed through untouched.
    fn prepare_volume_host(&self, volume: &VolumeMount) -> Result<String, DeployError> {
        if !volume.host.starts_with('/') && !volume.host.starts_with('~') {
            return Ok(volume.host.clone());
        }

        let expanded = expand_home(&volume.host);
        fs::create_dir_all(&expanded)?;
        info!("Prepared volume directory {}", expanded.display());
        Ok(expanded.to_string_lossy().into_owned())
    }
}

/// Expands a leading `~/` against `$HOME`; returns the path unchanged when
/// there is nothing to expand.
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = env::var_os("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

/// Parses the fixed-format process listing.
///
/// Each line splits into exactly three fields: name, image, and status with
/// its embedded spaces intact. Lines that do not produce three non-empty
/// fields are skipped silently.
fn parse_container_listing(stdout: &str) -> Vec<ContainerInfo> {
    let mut containers = Vec::new();
    for line in stdout.lines() {
        let mut fields = line.splitn(3, ' ');
        if let (Some(name), Some(image), Some(status)) =
            (fields.next(), fields.next(), fields.next())
        {
            let status = status.trim();
            if !name.is_empty() && !image.is_empty() && !status.is_empty() {
                containers.push(ContainerInfo {
                    name: name.to_string(),
                    image: image.to_string(),
                    status: status.to_string(),
                });
            }
        }
    }
    containers
}

/// Summarizes a best-effort sequence for logging: how many steps ran clean.
pub fn successful_steps(report: &[StepOutcome]) -> usize {
    report
        .iter()
        .filter(|step| step.result.as_ref().is_some_and(CommandResult::success))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_listing_three_fields() {
        let output = "pihole pihole/pihole Up 3 days\nollama ollama/ollama Up 2 hours (healthy)\n";
        let containers = parse_container_listing(output);
        assert_eq!(containers.len(), 2);
        assert_eq!(containers[0].name, "pihole");
        assert_eq!(containers[0].image, "pihole/pihole");
        assert_eq!(containers[0].status, "Up 3 days");
        assert_eq!(containers[1].status, "Up 2 hours (healthy)");
    }

    #[test]
    fn test_parse_listing_skips_short_lines() {
        let output = "pihole pihole/pihole\n\nonlyname\nok ghcr.io/img Up 5 minutes\n";
        let containers = parse_container_listing(output);
        assert_eq!(containers.len(), 1);
        assert_eq!(containers[0].name, "ok");
    }

    #[test]
    fn test_parse_listing_preserves_order() {
        let output = "b img2 Up 1 second\na img1 Up 2 seconds\n";
        let names: Vec<String> = parse_container_listing(output)
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn test_spec_validation() {
        assert!(ContainerSpec::new("svc1", "nginx", 80).validate().is_ok());
        assert!(ContainerSpec::new("", "nginx", 80).validate().is_err());
        assert!(ContainerSpec::new("svc1", "", 80).validate().is_err());
        assert!(
            ContainerSpec::new("bad name", "nginx", 80)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_expand_home() {
        unsafe { env::set_var("HOME", "/home/haven") };
        assert_eq!(
            expand_home("~/docker/pihole"),
            PathBuf::from("/home/haven/docker/pihole")
        );
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
        assert_eq!(expand_home("named-volume"), PathBuf::from("named-volume"));
    }
}
