use std::io::{BufRead as _, BufReader, Write as _};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use image::RgbImage;

use crate::config::LpipsConfig;
use crate::foundation::error::{EvalError, EvalResult};

/// Learned perceptual distance between two images whose background is already zeroed.
///
/// Backends are expensive to construct (network weights, device selection), so one instance
/// is created per process and passed by `&mut` into every directory comparison.
pub trait PerceptualMetric {
    fn name(&self) -> &str;

    /// `Ok(None)` means the backend does not produce a value (disabled).
    fn distance(&mut self, reference: &RgbImage, candidate: &RgbImage)
    -> EvalResult<Option<f64>>;
}

/// Backend used when no scorer is configured. LPIPS columns stay NaN.
#[derive(Debug, Default)]
pub struct DisabledPerceptual;

impl PerceptualMetric for DisabledPerceptual {
    fn name(&self) -> &str {
        "disabled"
    }

    fn distance(&mut self, _: &RgbImage, _: &RgbImage) -> EvalResult<Option<f64>> {
        Ok(None)
    }
}

/// Source of the scorer shipped in `scripts/lpips_server.py`, run with `python -c` when no
/// command is configured.
pub const BUNDLED_SCORER: &str = include_str!("../../scripts/lpips_server.py");

/// Long-lived external LPIPS scorer.
///
/// Protocol: after loading its network the scorer prints `ready <device>`. It then answers
/// each `<reference.png>\t<candidate.png>\n` line on stdin with one float, or with
/// `error: <message>` when that pair cannot be scored. The network, version and device
/// preference are passed as arguments; `--device auto` falls back to CPU without a GPU.
pub struct LpipsProcess {
    label: String,
    device: String,
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    scratch: tempfile::TempDir,
    line: String,
}

/// Program and arguments that start the scorer for `cfg`.
pub fn scorer_argv(cfg: &LpipsConfig) -> Vec<String> {
    if cfg.command.is_empty() {
        vec![
            cfg.python.clone(),
            "-c".to_string(),
            BUNDLED_SCORER.to_string(),
        ]
    } else {
        cfg.command.clone()
    }
}

impl LpipsProcess {
    /// Start the scorer and wait until it reports ready.
    pub fn spawn(cfg: &LpipsConfig) -> EvalResult<Self> {
        let argv = scorer_argv(cfg);
        let Some((program, args)) = argv.split_first() else {
            return Err(EvalError::validation("lpips command must not be empty"));
        };

        let scratch = tempfile::Builder::new()
            .prefix("renderqa-lpips-")
            .tempdir()
            .map_err(|e| EvalError::io(format!("create lpips scratch dir: {e}")))?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .args(["--net", cfg.net.as_str()])
            .args(["--version", cfg.version.as_str()])
            .args(["--device", cfg.device.as_str()])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());

        let mut child = cmd.spawn().map_err(|e| {
            EvalError::metric(format!("failed to spawn lpips scorer '{program}': {e}"))
        })?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let (Some(stdin), Some(stdout)) = (stdin, stdout) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(EvalError::metric("failed to open lpips scorer pipes"));
        };

        let mut scorer = Self {
            label: format!("lpips-{}-{}", cfg.net, cfg.version),
            device: String::new(),
            child,
            stdin: Some(stdin),
            stdout: BufReader::new(stdout),
            scratch,
            line: String::new(),
        };
        scorer.await_ready()?;

        tracing::info!(
            program = %program,
            net = %cfg.net,
            version = %cfg.version,
            device = %scorer.device,
            "started lpips scorer"
        );
        Ok(scorer)
    }

    /// Device the scorer reported at startup.
    pub fn device(&self) -> &str {
        &self.device
    }

    fn read_reply(&mut self) -> EvalResult<Option<&str>> {
        self.line.clear();
        let n = self
            .stdout
            .read_line(&mut self.line)
            .map_err(|e| EvalError::metric(format!("read from lpips scorer: {e}")))?;
        Ok((n > 0).then(|| self.line.trim()))
    }

    fn await_ready(&mut self) -> EvalResult<()> {
        let Some(reply) = self.read_reply()? else {
            return Err(EvalError::metric(
                "lpips scorer exited before becoming ready (is the lpips package installed?)",
            ));
        };
        match reply.strip_prefix("ready") {
            Some(device) => {
                self.device = device.trim().to_string();
                Ok(())
            }
            None => Err(EvalError::metric(format!(
                "lpips scorer sent '{reply}' instead of a ready line"
            ))),
        }
    }

    fn stage(&self, name: &str, img: &RgbImage) -> EvalResult<PathBuf> {
        let path = self.scratch.path().join(name);
        img.save(&path)
            .map_err(|e| EvalError::image(format!("write '{}': {e}", path.display())))?;
        Ok(path)
    }
}

impl PerceptualMetric for LpipsProcess {
    fn name(&self) -> &str {
        &self.label
    }

    fn distance(
        &mut self,
        reference: &RgbImage,
        candidate: &RgbImage,
    ) -> EvalResult<Option<f64>> {
        let ref_path = self.stage("reference.png", reference)?;
        let cand_path = self.stage("candidate.png", candidate)?;

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(EvalError::metric("lpips scorer is already closed"));
        };
        writeln!(stdin, "{}\t{}", ref_path.display(), cand_path.display())
            .and_then(|_| stdin.flush())
            .map_err(|e| EvalError::metric(format!("write to lpips scorer: {e}")))?;

        let Some(reply) = self.read_reply()? else {
            return Err(EvalError::metric("lpips scorer exited before answering"));
        };
        if let Some(msg) = reply.strip_prefix("error:") {
            return Err(EvalError::metric(format!("lpips scorer: {}", msg.trim())));
        }
        reply
            .parse::<f64>()
            .map(Some)
            .map_err(|_| EvalError::metric(format!("lpips scorer returned '{reply}'")))
    }
}

impl Drop for LpipsProcess {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if let Err(e) = self.child.wait() {
            tracing::debug!(error = %e, "lpips scorer did not exit cleanly");
        }
    }
}

/// Build the perceptual backend once at startup.
pub fn create_perceptual(cfg: &LpipsConfig) -> EvalResult<Box<dyn PerceptualMetric>> {
    if !cfg.enabled {
        tracing::warn!("lpips disabled; lpips columns will be NaN");
        return Ok(Box::new(DisabledPerceptual));
    }
    Ok(Box::new(LpipsProcess::spawn(cfg)?))
}

#[cfg(test)]
#[path = "../../tests/unit/metrics/perceptual.rs"]
mod tests;
