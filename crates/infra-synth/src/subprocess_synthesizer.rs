// Subprocess synthesizer implementation
// Spawns the model runner as an isolated child process per generation call.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use resona_core::error::AppError;
use resona_core::port::{SynthesisError, Synthesizer};

/// Configuration for the external model runner
#[derive(Debug, Clone)]
pub struct SynthRunnerConfig {
    /// Program invoked once per generation (wraps the actual model).
    pub runner: PathBuf,
    /// Trained checkpoint passed via `--checkpoint`.
    pub checkpoint_path: PathBuf,
    /// Model config passed via `--config`.
    pub model_config_path: PathBuf,
}

/// Subprocess synthesizer
///
/// The generation capability is an opaque, slow, resource-exclusive program;
/// running it as a child process keeps its crashes and leaks out of the
/// daemon. The dispatcher enforces exclusivity (pool size) and the deadline;
/// this adapter sets `kill_on_drop` so an aborted call kills the child.
#[derive(Debug)]
pub struct SubprocessSynthesizer {
    config: SynthRunnerConfig,
}

impl SubprocessSynthesizer {
    /// Create a new subprocess synthesizer.
    ///
    /// Fails when the checkpoint or model config is missing - a server that
    /// cannot generate must not start serving.
    pub fn new(config: SynthRunnerConfig) -> Result<Self, AppError> {
        if !config.checkpoint_path.exists() {
            return Err(AppError::Config(format!(
                "checkpoint not found at {}",
                config.checkpoint_path.display()
            )));
        }
        if !config.model_config_path.exists() {
            return Err(AppError::Config(format!(
                "model config not found at {}",
                config.model_config_path.display()
            )));
        }
        info!(
            runner = %config.runner.display(),
            checkpoint = %config.checkpoint_path.display(),
            "Synthesizer initialized"
        );
        Ok(Self { config })
    }
}

#[async_trait]
impl Synthesizer for SubprocessSynthesizer {
    async fn synthesize(&self, prompt: &str, out_path: &Path) -> Result<(), SynthesisError> {
        debug!(runner = %self.config.runner.display(), out = %out_path.display(), "Spawning synthesis runner");

        let child = Command::new(&self.config.runner)
            .arg("--checkpoint")
            .arg(&self.config.checkpoint_path)
            .arg("--config")
            .arg(&self.config.model_config_path)
            .arg("--prompt")
            .arg(prompt)
            .arg("--out")
            .arg(out_path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SynthesisError::SpawnFailed(e.to_string()))?;

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| SynthesisError::IoError(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.trim();
            return Err(SynthesisError::RunnerFailed(format!(
                "runner exited with {}{}{}",
                output.status,
                if detail.is_empty() { "" } else { ": " },
                detail
            )));
        }

        // The contract requires the artifact on disk after success; a runner
        // that exits 0 without writing it is still a failure.
        if !out_path.exists() {
            return Err(SynthesisError::MissingArtifact(
                out_path.display().to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &Path) -> SynthRunnerConfig {
        SynthRunnerConfig {
            runner: PathBuf::from("/bin/true"),
            checkpoint_path: dir.join("trained.ckpt"),
            model_config_path: dir.join("model.yaml"),
        }
    }

    fn write_model_files(dir: &Path) {
        std::fs::write(dir.join("trained.ckpt"), b"ckpt").unwrap();
        std::fs::write(dir.join("model.yaml"), b"seed: 0\n").unwrap();
    }

    #[test]
    fn missing_checkpoint_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("model.yaml"), b"seed: 0\n").unwrap();

        let err = SubprocessSynthesizer::new(config_in(dir.path())).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(err.to_string().contains("checkpoint"));
    }

    #[test]
    fn missing_model_config_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("trained.ckpt"), b"ckpt").unwrap();

        let err = SubprocessSynthesizer::new(config_in(dir.path())).unwrap_err();
        assert!(err.to_string().contains("model config"));
    }

    #[tokio::test]
    async fn unspawnable_runner_reports_spawn_failure() {
        let dir = tempfile::tempdir().unwrap();
        write_model_files(dir.path());
        let mut config = config_in(dir.path());
        config.runner = PathBuf::from("/nonexistent/model-runner");

        let synth = SubprocessSynthesizer::new(config).unwrap();
        let err = synth
            .synthesize("banana chips", &dir.path().join("out.wav"))
            .await
            .unwrap_err();
        assert!(matches!(err, SynthesisError::SpawnFailed(_)));
    }

    #[tokio::test]
    async fn failing_runner_surfaces_stderr() {
        let dir = tempfile::tempdir().unwrap();
        write_model_files(dir.path());
        let mut config = config_in(dir.path());
        // sh ignores our fixed argument list and just fails loudly
        config.runner = write_runner_script(
            dir.path(),
            "#!/bin/sh\necho 'CUDA out of memory' >&2\nexit 1\n",
        );

        let synth = SubprocessSynthesizer::new(config).unwrap();
        let err = synth
            .synthesize("p", &dir.path().join("out.wav"))
            .await
            .unwrap_err();
        match err {
            SynthesisError::RunnerFailed(msg) => assert!(msg.contains("CUDA out of memory")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn clean_exit_without_artifact_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_model_files(dir.path());
        let mut config = config_in(dir.path());
        config.runner = write_runner_script(dir.path(), "#!/bin/sh\nexit 0\n");

        let synth = SubprocessSynthesizer::new(config).unwrap();
        let err = synth
            .synthesize("p", &dir.path().join("out.wav"))
            .await
            .unwrap_err();
        assert!(matches!(err, SynthesisError::MissingArtifact(_)));
    }

    #[tokio::test]
    async fn successful_runner_leaves_artifact_in_place() {
        let dir = tempfile::tempdir().unwrap();
        write_model_files(dir.path());
        let mut config = config_in(dir.path());
        // Scan the argument list for --out and write the artifact there
        config.runner = write_runner_script(
            dir.path(),
            "#!/bin/sh\nwhile [ $# -gt 0 ]; do\n  if [ \"$1\" = \"--out\" ]; then out=\"$2\"; fi\n  shift\ndone\nprintf 'RIFF' > \"$out\"\n",
        );

        let synth = SubprocessSynthesizer::new(config).unwrap();
        let out = dir.path().join("u1.wav");
        synth.synthesize("banana chips", &out).await.unwrap();
        assert!(out.exists());
    }

    fn write_runner_script(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("runner.sh");
        std::fs::write(&path, body).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }
}
