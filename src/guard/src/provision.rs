/*
   Directory uniqueness guard
   Copyright (C) David Mulder <dmulder@samba.org> 2024

   This program is free software; you can redistribute it and/or modify
   it under the terms of the GNU General Public License as published by
   the Free Software Foundation; either version 3 of the License, or
   (at your option) any later version.

   This program is distributed in the hope that it will be useful,
   but WITHOUT ANY WARRANTY; without even the implied warranty of
   MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
   GNU General Public License for more details.

   You should have received a copy of the GNU General Public License
   along with this program.  If not, see <http://www.gnu.org/licenses/>.
*/
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use samguard_common::config::SamGuardConfig;
use samguard_common::secret::read_secret;
use std::ffi::OsString;
use std::fmt;
use std::os::unix::ffi::OsStringExt;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use zeroize::Zeroizing;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningOutcome {
    Succeeded,
    /// The tool ran and reported failure. `None` when it was killed by a
    /// signal rather than exiting.
    Failed(Option<i32>),
    SpawnFailed(String),
    TimedOut,
}

impl fmt::Display for ProvisioningOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvisioningOutcome::Succeeded => f.write_str("succeeded"),
            ProvisioningOutcome::Failed(Some(code)) => write!(f, "failed with status {}", code),
            ProvisioningOutcome::Failed(None) => f.write_str("terminated by signal"),
            ProvisioningOutcome::SpawnFailed(reason) => write!(f, "could not run: {}", reason),
            ProvisioningOutcome::TimedOut => f.write_str("timed out"),
        }
    }
}

#[async_trait]
pub trait Provisioner {
    /// Create the machine account `name` with the given credential blob.
    async fn provision(&self, name: &[u8], credential: &[u8]) -> ProvisioningOutcome;
}

/// Runs the external provisioning tool once per computer account add.
pub struct CommandProvisioner {
    tool: PathBuf,
    host: String,
    operator_identity: String,
    operator_secret_file: PathBuf,
    action: String,
    timeout: Duration,
}

impl CommandProvisioner {
    pub fn new(
        tool: &str,
        host: &str,
        operator_identity: &str,
        operator_secret_file: &str,
        action: &str,
        timeout: Duration,
    ) -> Self {
        CommandProvisioner {
            tool: PathBuf::from(tool),
            host: host.to_string(),
            operator_identity: operator_identity.to_string(),
            operator_secret_file: PathBuf::from(operator_secret_file),
            action: action.to_string(),
            timeout,
        }
    }

    pub fn from_config(config: &SamGuardConfig) -> Self {
        CommandProvisioner::new(
            &config.get_provision_tool(),
            &config.get_provision_host(),
            &config.get_operator_identity(),
            &config.get_operator_secret_file(),
            &config.get_provision_action(),
            config.get_provision_timeout(),
        )
    }

    /// `-s <host> -P <credential> -U <identity> <action> -o name=<name>
    /// -o unicodePwd=<base64>`, one argv entry each.
    fn build_args(&self, operator_credential: &str, name: &[u8], credential: &[u8]) -> Vec<OsString> {
        let mut opt_name = b"name=".to_vec();
        opt_name.extend_from_slice(name);
        let opt_pwd = format!("unicodePwd={}", STANDARD.encode(credential));

        vec![
            OsString::from("-s"),
            OsString::from(&self.host),
            OsString::from("-P"),
            OsString::from(operator_credential),
            OsString::from("-U"),
            OsString::from(&self.operator_identity),
            OsString::from(&self.action),
            OsString::from("-o"),
            OsString::from_vec(opt_name),
            OsString::from("-o"),
            OsString::from(opt_pwd),
        ]
    }
}

// Bound on collecting output once the tool has exited. A background child
// of the tool may keep the pipes open long after it is gone.
const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

async fn read_stream<R: AsyncRead + Unpin>(stream: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        if let Err(e) = stream.read_to_end(&mut buf).await {
            debug!("Failed reading provisioning tool output: {}", e);
        }
    }
    String::from_utf8_lossy(&buf).trim().to_string()
}

#[async_trait]
impl Provisioner for CommandProvisioner {
    async fn provision(&self, name: &[u8], credential: &[u8]) -> ProvisioningOutcome {
        let operator_credential: Zeroizing<String> = match read_secret(&self.operator_secret_file)
        {
            Ok(s) => s,
            Err(e) => {
                error!(
                    "Failed to read operator credential from {}: {}",
                    self.operator_secret_file.display(),
                    e
                );
                return ProvisioningOutcome::SpawnFailed(e.to_string());
            }
        };
        let args = self.build_args(&operator_credential, name, credential);

        info!(
            "Provisioning {} via {} {}",
            String::from_utf8_lossy(name),
            self.tool.display(),
            self.action
        );
        let mut child = match Command::new(&self.tool)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                error!("Failed to execute {}: {}", self.tool.display(), e);
                return ProvisioningOutcome::SpawnFailed(e.to_string());
            }
        };

        // Output is read alongside the wait so a chatty tool cannot block on
        // a full pipe, but only the exit status decides the outcome.
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let mut readers =
            tokio::spawn(async move { tokio::join!(read_stream(stdout), read_stream(stderr)) });

        let outcome = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) if status.success() => ProvisioningOutcome::Succeeded,
            Ok(Ok(status)) => {
                warn!("{} returned {}", self.tool.display(), status);
                ProvisioningOutcome::Failed(status.code())
            }
            Ok(Err(e)) => {
                error!("Failed waiting for {}: {}", self.tool.display(), e);
                let _ = child.kill().await;
                ProvisioningOutcome::SpawnFailed(e.to_string())
            }
            Err(_) => {
                error!(
                    "{} did not finish within {:?}, killing it",
                    self.tool.display(),
                    self.timeout
                );
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill {}: {}", self.tool.display(), e);
                }
                ProvisioningOutcome::TimedOut
            }
        };

        match tokio::time::timeout(OUTPUT_DRAIN_TIMEOUT, &mut readers).await {
            Ok(Ok((out, err))) => {
                if !out.is_empty() {
                    debug!("{}: {}", self.tool.display(), out);
                }
                if !err.is_empty() {
                    debug!("{} (stderr): {}", self.tool.display(), err);
                }
            }
            Ok(Err(e)) => debug!("Output reader for {} failed: {}", self.tool.display(), e),
            Err(_) => {
                debug!(
                    "Output of {} still open after exit, not waiting for it",
                    self.tool.display()
                );
                readers.abort();
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::{Decision, RejectKind};
    use crate::interceptor::{Guard, GuardPolicy};
    use crate::prober::{DirectoryProber, ProbeResult};
    use crate::request::{Operation, WriteRequest};
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    struct NoDirectory;

    #[async_trait]
    impl DirectoryProber for NoDirectory {
        async fn probe(&self, _identifier: &[u8]) -> ProbeResult {
            ProbeResult::NoMatch
        }
    }

    fn write_script(dir: &Path, name: &str, body: &str) -> String {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().to_string()
    }

    fn provisioner(tool: &str, secret: &str, timeout: Duration) -> CommandProvisioner {
        CommandProvisioner::new(
            tool,
            "master.example.com",
            "dc1",
            secret,
            "selectiveudm/create_windows_computer",
            timeout,
        )
    }

    fn computer_add() -> WriteRequest {
        WriteRequest::new(Operation::Add)
            .with_object_class("top")
            .with_object_class("computer")
            .with_attribute("sAMAccountName", b"host1$")
            .with_attribute("unicodePwd", b"\"\0p\0\"\0")
    }

    #[test]
    fn test_build_args() {
        let p = provisioner("/usr/sbin/umc-command", "/etc/machine.secret", Duration::from_secs(1));
        let args = p.build_args("machinepass", b"host1$", b"\"\0p\0\"\0");
        let args: Vec<String> = args
            .into_iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect();
        assert_eq!(
            args,
            vec![
                "-s",
                "master.example.com",
                "-P",
                "machinepass",
                "-U",
                "dc1",
                "selectiveudm/create_windows_computer",
                "-o",
                "name=host1$",
                "-o",
                "unicodePwd=IgBwACIA",
            ]
        );
    }

    #[test]
    fn test_build_args_keeps_metacharacters_literal() {
        let p = provisioner("/usr/sbin/umc-command", "/etc/machine.secret", Duration::from_secs(1));
        let args = p.build_args("pw", b"a; rm -rf / #", b"");
        assert_eq!(args[8], OsString::from("name=a; rm -rf / #"));
        assert_eq!(args[10], OsString::from("unicodePwd="));
        assert_eq!(args.len(), 11);
    }

    // All process based checks share one test so that no other test thread
    // forks while a script is still open for writing.
    #[tokio::test]
    async fn test_provision_with_external_tool() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        let secret = dir.join("machine.secret");
        fs::write(&secret, "machinepass\n").unwrap();
        let secret = secret.to_string_lossy().to_string();
        let args_file = dir.join("args");

        let ok = write_script(
            dir,
            "ok.sh",
            &format!(
                "printf '%s\\n' \"$@\" > {}\necho 'Computer created'",
                args_file.display()
            ),
        );
        let dup = write_script(dir, "dup.sh", "echo 'Object exists' >&2\nexit 17");
        let slow = write_script(dir, "slow.sh", "exec sleep 30");
        let detached = write_script(
            dir,
            "detached.sh",
            "sleep 10 &\necho 'Computer created'\nexit 0",
        );

        // exit 0
        let p = provisioner(&ok, &secret, Duration::from_secs(10));
        assert_eq!(
            p.provision(b"host1$", b"\"\0p\0\"\0").await,
            ProvisioningOutcome::Succeeded
        );
        let recorded = fs::read_to_string(&args_file).unwrap();
        assert_eq!(
            recorded.lines().collect::<Vec<_>>(),
            vec![
                "-s",
                "master.example.com",
                "-P",
                "machinepass",
                "-U",
                "dc1",
                "selectiveudm/create_windows_computer",
                "-o",
                "name=host1$",
                "-o",
                "unicodePwd=IgBwACIA",
            ]
        );

        // non-zero exit
        let p = provisioner(&dup, &secret, Duration::from_secs(10));
        assert_eq!(
            p.provision(b"host1$", b"pw").await,
            ProvisioningOutcome::Failed(Some(17))
        );

        // bounded wait
        let p = provisioner(&slow, &secret, Duration::from_millis(200));
        assert_eq!(
            p.provision(b"host1$", b"pw").await,
            ProvisioningOutcome::TimedOut
        );

        // exit 0 while a background child still holds stdout open
        let p = provisioner(&detached, &secret, Duration::from_secs(10));
        let started = std::time::Instant::now();
        assert_eq!(
            p.provision(b"host1$", b"pw").await,
            ProvisioningOutcome::Succeeded
        );
        assert!(started.elapsed() < Duration::from_secs(8));

        // tool missing
        let missing = dir.join("missing.sh").to_string_lossy().to_string();
        let p = provisioner(&missing, &secret, Duration::from_secs(10));
        assert!(matches!(
            p.provision(b"host1$", b"pw").await,
            ProvisioningOutcome::SpawnFailed(_)
        ));

        // operator secret missing, the tool is never started
        fs::remove_file(&args_file).unwrap();
        let p = provisioner(&ok, "/nonexistent/samguard/machine.secret", Duration::from_secs(10));
        assert!(matches!(
            p.provision(b"host1$", b"pw").await,
            ProvisioningOutcome::SpawnFailed(_)
        ));
        assert!(!args_file.exists());

        // End to end through the interceptor
        let guard = Guard::new(
            NoDirectory,
            provisioner(&ok, &secret, Duration::from_secs(10)),
            GuardPolicy::default(),
        );
        assert_eq!(guard.intercept(&computer_add()).await, Decision::Allow);

        let guard = Guard::new(
            NoDirectory,
            provisioner(&dup, &secret, Duration::from_secs(10)),
            GuardPolicy::default(),
        );
        assert_eq!(
            guard.intercept(&computer_add()).await,
            Decision::Reject(RejectKind::DuplicateIdentifier)
        );

        let guard = Guard::new(
            NoDirectory,
            provisioner(&missing, &secret, Duration::from_secs(10)),
            GuardPolicy::default(),
        );
        assert_eq!(
            guard.intercept(&computer_add()).await,
            Decision::Reject(RejectKind::ServiceUnavailable)
        );
    }
}
