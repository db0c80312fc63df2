use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    process::Stdio,
    sync::Mutex,
};

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::{CodecError, scan::list_sorted};

const RAW_EXTENSION: &str = "h264";

/// External tool that wraps a raw stream into a playable container.
///
/// Invoked as `{command} -fps {rate} -quiet -add {input} {output}`; only the
/// exit status matters. Raw files it fails on are remembered and left alone
/// for the rest of the process lifetime.
#[derive(Debug)]
pub struct CodecTool {
    program: String,
    /// Leading arguments of a wrapped command line such as `nice -n 19 MP4Box`.
    prefix: Vec<String>,
    failed: Mutex<HashSet<PathBuf>>,
}

impl CodecTool {
    /// `command` is split on whitespace: the first word is the program.
    pub fn new(command: &str) -> Self {
        let mut words = command.split_whitespace().map(str::to_string);
        Self {
            program: words.next().unwrap_or_default(),
            prefix: words.collect(),
            failed: Mutex::new(HashSet::new()),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub async fn repackage(
        &self,
        frame_rate: u32,
        input: &Path,
        output: &Path,
    ) -> Result<(), CodecError> {
        let out = Command::new(&self.program)
            .args(&self.prefix)
            .arg("-fps")
            .arg(frame_rate.to_string())
            .arg("-quiet")
            .arg("-add")
            .arg(input)
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| CodecError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            debug!(program = %self.program, stderr = %stderr.trim(), "codec stderr");
            return Err(CodecError::NonZeroExit {
                program: self.program.clone(),
                status: out.status.to_string(),
            });
        }
        Ok(())
    }

    /// Turn every raw `*.h264` in `dir` into `*.mp4`.
    ///
    /// Only call this once the recorder writing into `dir` has exited.
    /// Output goes to `{mp4}.tmp` first and is renamed into place, so the
    /// uploader never sees a half-written container. The raw file is removed
    /// only after the rename. Returns how many files were converted.
    pub async fn prepare_raw_videos(&self, dir: &Path, frame_rate: u32) -> usize {
        let raws = match list_sorted(dir, RAW_EXTENSION).await {
            Ok(raws) => raws,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "failed to list raw videos");
                return 0;
            }
        };

        let mut converted = 0;
        for raw in raws {
            if self.failed.lock().unwrap().contains(&raw) {
                continue;
            }
            let mp4 = raw.with_extension("mp4");
            let tmp = raw.with_extension("mp4.tmp");

            if let Err(e) = self.repackage(frame_rate, &raw, &tmp).await {
                warn!(path = %raw.display(), error = %e, "repackaging failed; raw file retained");
                if let Err(e) = tokio::fs::remove_file(&tmp).await
                    && e.kind() != std::io::ErrorKind::NotFound
                {
                    warn!(path = %tmp.display(), error = %e, "failed to remove partial output");
                }
                self.failed.lock().unwrap().insert(raw);
                continue;
            }
            if let Err(e) = tokio::fs::rename(&tmp, &mp4).await {
                warn!(path = %tmp.display(), error = %e, "failed to move repackaged video into place");
                continue;
            }
            if let Err(e) = tokio::fs::remove_file(&raw).await {
                warn!(path = %raw.display(), error = %e, "failed to remove raw video");
            }
            info!(path = %mp4.display(), "raw video repackaged");
            converted += 1;
        }
        converted
    }
}
