use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;
use std::time::{Duration, Instant};

use log::debug;
use smallvec::SmallVec;

use crate::config::RendererConfig;
use crate::error::{DatasetError, Result};
use crate::types::{Position, Viewpoint};

pub const OVERHEAD_FILE: &str = "1_overhead.png";
const SECOND_ANGLE_PREFIX: &str = "2_";
const THIRD_ANGLE_PREFIX: &str = "3_";
const TIMEOUT_LISTING_LIMIT: usize = 20;

/// Render outputs in camera order: overhead, second angle, third angle.
pub type RenderOutputs = SmallVec<[PathBuf; 3]>;

/// Produces the image set for one position.
pub trait Renderer {
    fn render(&mut self, position: &Position, viewpoint: Viewpoint) -> Result<RenderOutputs>;
}

/// Bounded wait with optional geometric backoff between probes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_interval: Duration,
    pub backoff: f64,
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(250),
            max_interval: Duration::from_millis(250),
            backoff: 1.0,
            timeout: Duration::from_secs(120),
        }
    }
}

impl PollPolicy {
    fn next_interval(&self, current: Duration) -> Duration {
        current.mul_f64(self.backoff).min(self.max_interval).max(self.interval)
    }
}

fn has_extension(name: &str, extensions: &[&str]) -> bool {
    let lower = name.to_ascii_lowercase();
    extensions.iter().any(|ext| lower.ends_with(ext))
}

fn is_png(name: &str) -> bool {
    has_extension(name, &[".png"])
}

pub(crate) fn is_image(name: &str) -> bool {
    has_extension(name, &[".png", ".jpg", ".jpeg"])
}

pub(crate) fn file_names(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file()
            && let Some(name) = entry.file_name().to_str()
        {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

/// Removes leftover images so the next poll cannot match a previous render.
pub fn clean_staging(staging: &Path) -> Result<usize> {
    fs::create_dir_all(staging).map_err(|e| DatasetError::io(staging, e))?;

    let mut removed = 0;
    for name in file_names(staging).map_err(|e| DatasetError::io(staging, e))? {
        if is_image(&name) {
            let path = staging.join(&name);
            fs::remove_file(&path).map_err(|e| DatasetError::io(&path, e))?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Returns the complete output set if it is present: the fixed overhead file plus
/// the lexicographically smallest `2_*.png` and `3_*.png`.
pub fn find_outputs(staging: &Path) -> Result<Option<RenderOutputs>> {
    let names = match file_names(staging) {
        Ok(names) => names,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(DatasetError::io(staging, e)),
    };

    if !names.iter().any(|n| n == OVERHEAD_FILE) {
        return Ok(None);
    }

    // `names` is sorted, so the first match per prefix is the smallest.
    let pick = |prefix: &str| {
        names
            .iter()
            .find(|n| n.starts_with(prefix) && is_png(n))
            .cloned()
    };

    match (pick(SECOND_ANGLE_PREFIX), pick(THIRD_ANGLE_PREFIX)) {
        (Some(second), Some(third)) => Ok(Some(SmallVec::from_buf([
            staging.join(OVERHEAD_FILE),
            staging.join(second),
            staging.join(third),
        ]))),
        _ => Ok(None),
    }
}

/// Polls `staging` until the full output set exists or `policy.timeout` elapses.
pub fn wait_for_outputs(staging: &Path, policy: &PollPolicy) -> Result<RenderOutputs> {
    let started = Instant::now();
    let mut interval = policy.interval;

    loop {
        if let Some(outputs) = find_outputs(staging)? {
            debug!(
                "Render outputs ready after {:.2}s",
                started.elapsed().as_secs_f64()
            );
            return Ok(outputs);
        }

        let waited = started.elapsed();
        if waited >= policy.timeout {
            let mut found = file_names(staging).unwrap_or_default();
            found.truncate(TIMEOUT_LISTING_LIMIT);
            return Err(DatasetError::RenderTimeout {
                staging: staging.to_path_buf(),
                waited,
                found,
            });
        }

        thread::sleep(interval.min(policy.timeout - waited));
        interval = policy.next_interval(interval);
    }
}

/// Drives an external renderer (e.g. Blender in background mode) once per position.
pub struct SubprocessRenderer {
    binary: PathBuf,
    scene: PathBuf,
    script: PathBuf,
    staging: PathBuf,
    resolution: u32,
    samples: u32,
    clean_staging: bool,
    poll: PollPolicy,
}

impl SubprocessRenderer {
    pub fn from_config(config: &RendererConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            scene: config.scene.clone(),
            script: config.script.clone(),
            staging: config.staging_dir.clone(),
            resolution: config.resolution,
            samples: config.samples,
            clean_staging: config.clean_staging,
            poll: config.poll_policy(),
        }
    }

    /// `<scene> --background --python <script> -- --fen .. --view .. --resolution .. --samples ..`
    pub fn command_args(&self, position: &Position, viewpoint: Viewpoint) -> Vec<OsString> {
        vec![
            self.scene.clone().into_os_string(),
            "--background".into(),
            "--python".into(),
            self.script.clone().into_os_string(),
            "--".into(),
            "--fen".into(),
            position.as_str().into(),
            "--view".into(),
            viewpoint.as_str().into(),
            "--resolution".into(),
            self.resolution.to_string().into(),
            "--samples".into(),
            self.samples.to_string().into(),
        ]
    }
}

impl Renderer for SubprocessRenderer {
    fn render(&mut self, position: &Position, viewpoint: Viewpoint) -> Result<RenderOutputs> {
        if self.clean_staging {
            let removed = clean_staging(&self.staging)?;
            if removed > 0 {
                debug!("Removed {} stale files from {}", removed, self.staging.display());
            }
        }

        debug!("Rendering {} ({})", position, viewpoint);
        let status = Command::new(&self.binary)
            .args(self.command_args(position, viewpoint))
            .status()
            .map_err(|source| DatasetError::RendererSpawn {
                binary: self.binary.clone(),
                source,
            })?;

        if !status.success() {
            return Err(DatasetError::RendererFailed {
                status,
                fen: position.to_string(),
            });
        }

        wait_for_outputs(&self.staging, &self.poll)
    }
}
