//! External bi-level-to-vector tracer.

use std::io::{Read, Write};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::config::TraceConfig;
use crate::error::TraceError;

/// Turns a P4 bitmap into vector path markup.
pub trait Tracer: Sync {
    /// Check once that the tracer can run at all.
    fn probe(&self) -> Result<(), TraceError> {
        Ok(())
    }

    /// Trace one P4 bitmap. Empty output is reported as
    /// [`TraceError::MalformedOutput`].
    fn trace(&self, pbm: &[u8]) -> Result<String, TraceError>;
}

/// `autotrace` in centerline mode.
#[derive(Debug, Clone)]
pub struct Autotrace {
    program: String,
    error_threshold: f64,
    filter_iterations: u32,
    timeout: Option<Duration>,
}

impl Autotrace {
    pub fn new(config: &TraceConfig) -> Self {
        Self {
            program: config.tracer_program.clone(),
            error_threshold: config.error_threshold,
            filter_iterations: config.filter_iterations,
            timeout: config.tracer_timeout(),
        }
    }

    /// Build and probe in one step.
    pub fn locate(config: &TraceConfig) -> Result<Self, TraceError> {
        let tracer = Self::new(config);
        tracer.probe()?;
        Ok(tracer)
    }

    /// Arguments for one invocation, input file last.
    pub fn args(&self, input: &str) -> Vec<String> {
        vec![
            "--centerline".to_string(),
            "--input-format=pbm".to_string(),
            "--output-format=svg".to_string(),
            format!("--error-threshold={}", self.error_threshold),
            format!("--filter-iterations={}", self.filter_iterations),
            input.to_string(),
        ]
    }

    fn unavailable(&self, reason: impl std::fmt::Display) -> TraceError {
        TraceError::TracerUnavailable(format!(
            "{}: {} (try installing autotrace, e.g. `apt-get install autotrace`)",
            self.program, reason
        ))
    }
}

impl Tracer for Autotrace {
    fn probe(&self) -> Result<(), TraceError> {
        let output = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .map_err(|e| self.unavailable(e))?;
        if !output.status.success() {
            return Err(self.unavailable(format!("--version exited with {}", output.status)));
        }
        let version = String::from_utf8_lossy(&output.stdout);
        debug!("tracer: {}", version.trim());
        Ok(())
    }

    fn trace(&self, pbm: &[u8]) -> Result<String, TraceError> {
        // Removed on drop, whichever way this function returns.
        let mut input = tempfile::Builder::new()
            .prefix("centerline-")
            .suffix(".pbm")
            .tempfile()?;
        input.write_all(pbm)?;
        input.flush()?;

        let path = input.path().to_string_lossy().into_owned();
        let mut child = Command::new(&self.program)
            .args(self.args(&path))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| self.unavailable(e))?;

        let stdout = wait_for_output(&mut child, self.timeout)?;
        if stdout.trim().is_empty() {
            return Err(TraceError::MalformedOutput("tracer produced no output".to_string()));
        }
        Ok(stdout)
    }
}

/// Collect the child's stdout, killing it once `timeout` has passed.
fn wait_for_output(child: &mut Child, timeout: Option<Duration>) -> Result<String, TraceError> {
    let mut pipe = child
        .stdout
        .take()
        .ok_or_else(|| TraceError::MalformedOutput("tracer stdout not captured".to_string()))?;
    let reader = thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf).map(|_| buf)
    });

    let started = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(e) => {
                reap(child);
                return Err(e.into());
            }
        }
        if timeout.is_some_and(|t| started.elapsed() >= t) {
            warn!("tracer: timed out after {:?}, killing", started.elapsed());
            reap(child);
            return Err(TraceError::MalformedOutput("tracer timed out".to_string()));
        }
        thread::sleep(Duration::from_millis(5));
    };

    let bytes = reader
        .join()
        .map_err(|_| TraceError::MalformedOutput("tracer output reader panicked".to_string()))??;
    if !status.success() {
        debug!("tracer: exited with {}", status);
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Kill and wait, so no zombie is left behind. Either call may fail if the
/// child already exited.
fn reap(child: &mut Child) {
    if let Err(e) = child.kill() {
        debug!("tracer: kill: {}", e);
    }
    if let Err(e) = child.wait() {
        debug!("tracer: wait: {}", e);
    }
}
