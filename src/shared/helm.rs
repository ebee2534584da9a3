use crate::shared::cancel::CancelToken;
use crate::shared::chart::Chart;
use anyhow::{Context, Result, bail};
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(100);

// Install action against the external package manager CLI. The release
// lifecycle (templating, dependency resolution, resource readiness) is owned
// entirely by that binary; this struct only configures and supervises one run.
pub struct HelmCli {
    pub program: PathBuf,
    pub namespace: String,
    pub release_name: String,
    pub create_namespace: bool,
    pub wait_for_ready: bool,
    pub timeout_mins: u64,
    pub storage_driver: Option<String>,
}

impl HelmCli {
    // Perform the install, blocking until the release is ready, the binary
    // fails, or the token is cancelled. On cancellation the child process is
    // terminated and a cancellation-derived error is surfaced; callers treat
    // it like any other install error.
    pub fn install(&self, token: &CancelToken, chart: &Chart) -> Result<()> {
        let mut cmd = self.install_command(chart);
        let debug = format!("{cmd:?}");
        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning package manager failed: {debug}"))?;

        // Drain stderr from the start: a chatty child that outruns the OS
        // pipe buffer would otherwise block on write and never exit.
        let drain = child.stderr.take().map(|mut pipe| {
            thread::spawn(move || {
                let mut captured = String::new();
                let _ = pipe.read_to_string(&mut captured);
                captured
            })
        });

        let status = loop {
            if token.is_cancelled() {
                let _ = child.kill();
                let _ = child.wait();
                let _ = join_stderr(drain);
                bail!("install of release {} cancelled", self.release_name);
            }
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => thread::sleep(CANCEL_POLL_INTERVAL),
                Err(err) => {
                    // Reap the child before propagating so it is not left
                    // running unsupervised.
                    let _ = child.kill();
                    let _ = child.wait();
                    let _ = join_stderr(drain);
                    return Err(err).context("waiting for package manager failed");
                }
            }
        };

        if status.success() {
            let _ = join_stderr(drain);
            return Ok(());
        }

        let stderr = join_stderr(drain);
        bail!(
            "install of release {} failed with status {}:\n{}",
            self.release_name,
            status,
            stderr.trim()
        );
    }

    // Build the install invocation. Progress output stays on the inherited
    // stdout; stderr is piped and drained so failures can carry the binary's
    // own diagnostics.
    fn install_command(&self, chart: &Chart) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("install")
            .arg(&self.release_name)
            .arg(chart.path())
            .arg("--namespace")
            .arg(&self.namespace);
        if self.create_namespace {
            cmd.arg("--create-namespace");
        }
        if self.wait_for_ready {
            cmd.arg("--wait");
        }
        cmd.arg("--timeout").arg(format!("{}m", self.timeout_mins));
        if let Some(driver) = &self.storage_driver {
            cmd.env("HELM_DRIVER", driver);
        }
        cmd.stdout(Stdio::inherit()).stderr(Stdio::piped());
        cmd
    }
}

// Collect whatever the drain thread captured; empty if stderr was not piped
// or the thread panicked.
fn join_stderr(drain: Option<thread::JoinHandle<String>>) -> String {
    match drain {
        Some(handle) => handle.join().unwrap_or_default(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use std::fs;

    fn chart_fixture() -> (tempfile::TempDir, Chart) {
        let dir = tempfile::tempdir().unwrap_or_else(|err| panic!("tempdir failed: {err}"));
        fs::write(dir.path().join("Chart.yaml"), "name: repro\nversion: 0.1.0\n")
            .unwrap_or_else(|err| panic!("writing manifest failed: {err}"));
        let chart = Chart::load(dir.path())
            .unwrap_or_else(|err| panic!("loading chart failed: {err:#}"));
        (dir, chart)
    }

    fn client() -> HelmCli {
        HelmCli {
            program: PathBuf::from("helm"),
            namespace: "demo".to_string(),
            release_name: "repro".to_string(),
            create_namespace: true,
            wait_for_ready: true,
            timeout_mins: 30,
            storage_driver: None,
        }
    }

    #[test]
    fn install_command_carries_full_policy() {
        let (_dir, chart) = chart_fixture();
        let cmd = client().install_command(&chart);

        let args: Vec<OsString> = cmd.get_args().map(OsString::from).collect();
        assert_eq!(args[0], "install");
        assert_eq!(args[1], "repro");
        assert_eq!(args[2], chart.path().as_os_str());
        assert!(args.contains(&OsString::from("--namespace")));
        assert!(args.contains(&OsString::from("demo")));
        assert!(args.contains(&OsString::from("--create-namespace")));
        assert!(args.contains(&OsString::from("--wait")));
        assert!(args.contains(&OsString::from("--timeout")));
        assert!(args.contains(&OsString::from("30m")));
    }

    #[test]
    fn optional_flags_are_omitted_when_disabled() {
        let (_dir, chart) = chart_fixture();
        let mut quiet = client();
        quiet.create_namespace = false;
        quiet.wait_for_ready = false;

        let cmd = quiet.install_command(&chart);
        let args: Vec<OsString> = cmd.get_args().map(OsString::from).collect();
        assert!(!args.contains(&OsString::from("--create-namespace")));
        assert!(!args.contains(&OsString::from("--wait")));
    }

    #[test]
    fn storage_driver_is_passed_through_environment() {
        let (_dir, chart) = chart_fixture();
        let mut driven = client();
        driven.storage_driver = Some("secret".to_string());

        let cmd = driven.install_command(&chart);
        let has_driver = cmd.get_envs().any(|(key, value)| {
            key == std::ffi::OsStr::new("HELM_DRIVER")
                && value == Some(std::ffi::OsStr::new("secret"))
        });
        assert!(has_driver);
    }

    #[test]
    fn missing_binary_surfaces_spawn_error() {
        let (_dir, chart) = chart_fixture();
        let mut broken = client();
        broken.program = PathBuf::from("definitely-not-a-package-manager");

        let token = CancelToken::new();
        assert!(broken.install(&token, &chart).is_err());
    }

    #[test]
    fn chatty_stderr_does_not_stall_the_install() {
        use std::os::unix::fs::PermissionsExt;
        use std::sync::mpsc;

        let (_dir, chart) = chart_fixture();

        // Stand-in binary that writes well past the OS pipe buffer on stderr
        // before failing; an undrained pipe would block it forever.
        let script_dir = tempfile::tempdir().unwrap_or_else(|err| panic!("tempdir failed: {err}"));
        let script = script_dir.path().join("noisy-install");
        fs::write(
            &script,
            "#!/bin/sh\nhead -c 200000 /dev/zero | tr '\\0' 'x' >&2\nexit 1\n",
        )
        .unwrap_or_else(|err| panic!("writing script failed: {err}"));
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755))
            .unwrap_or_else(|err| panic!("chmod failed: {err}"));

        let mut noisy = client();
        noisy.program = script;

        let (tx, rx) = mpsc::channel();
        let worker = thread::spawn(move || {
            let token = CancelToken::new();
            let _ = tx.send(noisy.install(&token, &chart));
        });

        let result = rx
            .recv_timeout(Duration::from_secs(30))
            .unwrap_or_else(|_| panic!("install stalled on a full stderr pipe"));
        let err = result.err().map(|e| e.to_string()).unwrap_or_default();
        assert!(err.contains("failed with status"), "unexpected error: {err}");
        assert!(err.contains("xxxx"), "stderr not captured: {err}");

        if worker.join().is_err() {
            panic!("install worker panicked");
        }
    }

    #[test]
    fn cancelled_token_stops_a_running_install() {
        let (_dir, chart) = chart_fixture();
        // Stand-in long-running binary; killed by the cancellation path.
        let mut sleeper = client();
        sleeper.program = PathBuf::from("sleep");
        sleeper.release_name = "30".to_string();
        sleeper.create_namespace = false;
        sleeper.wait_for_ready = false;

        let token = CancelToken::new();
        token.cancel();
        let err = sleeper
            .install(&token, &chart)
            .err()
            .map(|e| e.to_string())
            .unwrap_or_default();
        assert!(err.contains("cancelled"), "unexpected error: {err}");
    }
}
