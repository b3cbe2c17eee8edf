//! Per-run logger with file transcript and tracing mirror.
//!
//! The file transcript keeps everything, including every line the external
//! tools print; the console only sees the levels tracing lets through. A
//! tail buffer of recent lines is replayed when a stage fails, so the
//! tool's diagnostics surface without digging for the log file.

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use parking_lot::Mutex;

use super::types::{LogConfig, MessagePrefix};

const TAIL_CAPACITY: usize = 200;

/// Logger owned by a single pipeline run.
pub struct RunLogger {
    run_name: String,
    log_path: PathBuf,
    file: Mutex<BufWriter<File>>,
    tail: Mutex<VecDeque<String>>,
    config: LogConfig,
}

impl RunLogger {
    /// Create a logger writing to a timestamped file under `log_dir`.
    pub fn new(
        run_name: impl Into<String>,
        log_dir: impl AsRef<Path>,
        config: LogConfig,
    ) -> io::Result<Self> {
        let run_name = run_name.into();
        let log_dir = log_dir.as_ref();
        fs::create_dir_all(log_dir)?;

        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let log_path = log_dir.join(format!("{}_{}.log", sanitize_filename(&run_name), stamp));
        let file = BufWriter::new(File::create(&log_path)?);

        Ok(Self {
            run_name,
            log_path,
            file: Mutex::new(file),
            tail: Mutex::new(VecDeque::with_capacity(TAIL_CAPACITY)),
            config,
        })
    }

    pub fn run_name(&self) -> &str {
        &self.run_name
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    fn write_line(&self, line: &str) {
        let stamped = format!("[{}] {}", Local::now().format("%H:%M:%S%.3f"), line);
        {
            let mut file = self.file.lock();
            let _ = writeln!(file, "{}", stamped);
            let _ = file.flush();
        }

        let mut tail = self.tail.lock();
        if tail.len() == TAIL_CAPACITY {
            tail.pop_front();
        }
        tail.push_back(line.to_string());
    }

    pub fn info(&self, message: &str) {
        tracing::info!("{message}");
        self.write_line(message);
    }

    pub fn debug(&self, message: &str) {
        tracing::debug!("{message}");
        self.write_line(&MessagePrefix::Debug.format(message));
    }

    pub fn warn(&self, message: &str) {
        tracing::warn!("{message}");
        self.write_line(&MessagePrefix::Warning.format(message));
    }

    pub fn error(&self, message: &str) {
        tracing::error!("{message}");
        self.write_line(&MessagePrefix::Error.format(message));
    }

    pub fn success(&self, message: &str) {
        tracing::info!("{message}");
        self.write_line(&MessagePrefix::Success.format(message));
    }

    /// Mark the start of a pipeline stage.
    pub fn phase(&self, name: &str) {
        tracing::info!("=== {name} ===");
        self.write_line(&MessagePrefix::Phase.format(name));
    }

    /// Record an external command being executed.
    pub fn command(&self, command: &str) {
        if self.config.echo_commands {
            tracing::debug!("$ {command}");
        }
        self.write_line(&MessagePrefix::Command.format(command));
    }

    /// Record one line of external-tool output, verbatim.
    pub fn output_line(&self, line: &str, is_stderr: bool) {
        tracing::trace!(stderr = is_stderr, "{line}");
        self.write_line(line);
    }

    /// Replay the most recent transcript lines at error level.
    pub fn show_tail(&self, heading: &str) {
        let tail = self.tail.lock();
        let count = self.config.error_tail.min(tail.len());
        if count == 0 {
            return;
        }
        tracing::error!("--- last {count} lines of {heading} ---");
        for line in tail.iter().skip(tail.len() - count) {
            tracing::error!("{line}");
        }
    }
}

/// Make a run name safe for use in a filename.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn writes_transcript_to_file() {
        let dir = TempDir::new().unwrap();
        let logger = RunLogger::new("clip", dir.path(), LogConfig::default()).unwrap();

        logger.info("starting");
        logger.command("ffmpeg -y -i clip.mp4");
        logger.output_line("frame=  10 fps= 30", true);

        let text = fs::read_to_string(logger.log_path()).unwrap();
        assert!(text.contains("starting"));
        assert!(text.contains("$ ffmpeg -y -i clip.mp4"));
        assert!(text.contains("frame=  10 fps= 30"));
    }

    #[test]
    fn tail_is_bounded() {
        let dir = TempDir::new().unwrap();
        let logger = RunLogger::new("clip", dir.path(), LogConfig::default()).unwrap();

        for i in 0..(TAIL_CAPACITY + 50) {
            logger.info(&format!("line {i}"));
        }
        assert_eq!(logger.tail.lock().len(), TAIL_CAPACITY);
    }

    #[test]
    fn filenames_are_sanitized() {
        assert_eq!(sanitize_filename("my clip (1).mp4"), "my_clip__1_.mp4");
        assert_eq!(sanitize_filename("plain-name_0"), "plain-name_0");
    }
}
