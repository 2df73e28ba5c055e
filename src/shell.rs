// Copyright 2025 The Rooster Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! External collaborators reached through the shell.
//!
//! Backup and deploy are delegated to the kubectl binary; the external test
//! runner is an arbitrary binary resolved on PATH. Every non-zero exit
//! aborts the running action.

use std::process::Stdio;

use tokio::process::Command;
use tracing::info;

use crate::error::{Error, Result};

/// Runs a command through `sh -c`, returning its combined output.
pub async fn shell(command: &str) -> Result<String> {
    let out = Command::new("sh").arg("-c").arg(command).output().await?;
    let mut combined = String::from_utf8_lossy(&out.stdout).to_string();
    combined.push_str(&String::from_utf8_lossy(&out.stderr));
    if !out.status.success() {
        return Err(Error::Shell { command: command.to_string(), output: combined });
    }
    Ok(combined)
}

/// Builds the kubectl command line the way the deployer shells out.
///
/// With no extra arguments the namespace is omitted; a single argument is
/// treated as a file for the subcommand (`kubectl -n <ns> <sub> -f <file>`);
/// otherwise the arguments are appended verbatim.
pub fn kubectl_command(namespace: &str, subcommand: &str, args: &[&str]) -> String {
    match args.len() {
        0 => format!("kubectl {subcommand}"),
        1 => format!("kubectl -n {namespace} {subcommand} -f {}", args[0]),
        _ => format!("kubectl -n {namespace} {subcommand} {}", args.join(" ")),
    }
}

/// Runs a kubectl subcommand, shaped by [`kubectl_command`].
pub async fn kubectl(namespace: &str, subcommand: &str, args: &[&str]) -> Result<String> {
    shell(&kubectl_command(namespace, subcommand, args)).await
}

/// Returns the kubeconfig's current context name, trimmed.
pub async fn current_context() -> Result<String> {
    let output = kubectl("", "config current-context", &[]).await?;
    Ok(output.trim().to_string())
}

/// Runs the external test binary against the given suite.
///
/// Both options empty means the test phase is skipped; one without the
/// other is an error. Output streams through to the operator.
pub async fn run_tests(test_suite: &str, test_binary: &str) -> Result<()> {
    if test_suite.is_empty() && test_binary.is_empty() {
        info!("Skipping test phase. Only basic resource checks will be performed.");
        return Ok(());
    }
    if test_suite.is_empty() {
        return Err(Error::InvalidOptions("test suite not defined".to_string()));
    }
    if test_binary.is_empty() {
        return Err(Error::InvalidOptions("test binary not defined".to_string()));
    }
    info!("Running tests...");
    let status = Command::new(test_binary)
        .args(["-test.v", "-test.run", test_suite])
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await?;
    if !status.success() {
        return Err(Error::TestsFailed(format!(
            "{test_binary} -test.run {test_suite} exited with {status}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kubectl_command_shapes() {
        assert_eq!(kubectl_command("", "config current-context", &[]), "kubectl config current-context");
        assert_eq!(
            kubectl_command("kube-system", "apply", &["/tmp/manifests"]),
            "kubectl -n kube-system apply -f /tmp/manifests"
        );
        assert_eq!(
            kubectl_command("kube-system", "get", &["DaemonSet", "agent", "-oyaml"]),
            "kubectl -n kube-system get DaemonSet agent -oyaml"
        );
    }

    #[tokio::test]
    async fn test_shell_returns_combined_output() {
        let output = shell("echo hello").await.unwrap();
        assert_eq!(output.trim(), "hello");
    }

    #[tokio::test]
    async fn test_shell_surfaces_failures() {
        let err = shell("exit 3").await.unwrap_err();
        assert!(matches!(err, Error::Shell { .. }));
    }

    #[tokio::test]
    async fn test_run_tests_skips_when_unconfigured() {
        assert!(run_tests("", "").await.is_ok());
    }

    #[tokio::test]
    async fn test_run_tests_requires_both_options() {
        assert!(run_tests("TestSuite", "").await.is_err());
        assert!(run_tests("", "checker").await.is_err());
    }
}
