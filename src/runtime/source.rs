use anyhow::{anyhow, Context, Result};
use std::future::Future;
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};

use crate::gesture::HandDetection;

/// Anything that yields hand detections frame by frame: a camera-backed
/// landmark model, or a recording.
pub trait LandmarkSource: Send + 'static {
    /// Prepares the classifier. May fail transiently; the frame loop retries.
    fn initialize(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Detections for the next frame, or `None` once the stream has ended.
    fn detect(&mut self) -> impl Future<Output = Result<Option<Vec<HandDetection>>>> + Send;
}

/// Replays frames recorded as JSON lines, one array of detections per line.
/// Blank lines are skipped.
pub struct ReplaySource {
    path: PathBuf,
    lines: Option<Lines<BufReader<File>>>,
    line_number: usize,
}

impl ReplaySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lines: None,
            line_number: 0,
        }
    }
}

impl LandmarkSource for ReplaySource {
    async fn initialize(&mut self) -> Result<()> {
        let file = File::open(&self.path)
            .await
            .with_context(|| format!("failed to open replay file {}", self.path.display()))?;
        self.lines = Some(BufReader::new(file).lines());
        self.line_number = 0;
        Ok(())
    }

    async fn detect(&mut self) -> Result<Option<Vec<HandDetection>>> {
        let lines = self
            .lines
            .as_mut()
            .ok_or_else(|| anyhow!("replay source used before initialize"))?;

        loop {
            let Some(line) = lines
                .next_line()
                .await
                .with_context(|| format!("failed to read {}", self.path.display()))?
            else {
                return Ok(None);
            };
            self.line_number += 1;
            if line.trim().is_empty() {
                continue;
            }
            let detections = serde_json::from_str(&line).with_context(|| {
                format!("bad frame at {}:{}", self.path.display(), self.line_number)
            })?;
            return Ok(Some(detections));
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    /// In-memory source for loop tests. Fails `initialize` a configurable
    /// number of times first.
    pub struct ScriptedSource {
        pub frames: VecDeque<Vec<HandDetection>>,
        pub init_failures: u32,
        pub init_calls: Arc<AtomicU32>,
    }

    impl ScriptedSource {
        pub fn new(frames: Vec<Vec<HandDetection>>) -> Self {
            Self {
                frames: frames.into(),
                init_failures: 0,
                init_calls: Arc::new(AtomicU32::new(0)),
            }
        }
    }

    impl LandmarkSource for ScriptedSource {
        async fn initialize(&mut self) -> Result<()> {
            let call = self.init_calls.fetch_add(1, Ordering::SeqCst);
            if call < self.init_failures {
                return Err(anyhow!("model not ready (attempt {})", call + 1));
            }
            Ok(())
        }

        async fn detect(&mut self) -> Result<Option<Vec<HandDetection>>> {
            Ok(self.frames.pop_front())
        }
    }
}
