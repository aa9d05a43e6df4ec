//! # Telemetry Logger
//!
//! Writes published values as JSON Lines with file rotation.
//!
//! Each record is one line:
//!
//! ```text
//! {"timestamp":"2024-05-01T12:00:00.123+00:00","sensor":"Main A Power","value":185.45}
//! ```
//!
//! Files are named `vue_<YYYYmmdd_HHMMSS>_<n>.jsonl`. `n` keeps counting up
//! across restarts and orders the files for retention.

use chrono::Utc;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::TelemetryConfig;
use crate::error::Result;

const FILE_PREFIX: &str = "vue_";
const FILE_EXTENSION: &str = "jsonl";

/// One telemetry record
#[derive(Debug, Serialize)]
struct TelemetryRecord<'a> {
    timestamp: String,
    sensor: &'a str,
    value: f32,
}

/// Rotating JSONL telemetry writer
#[derive(Debug)]
pub struct TelemetryLogger {
    log_dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    writer: Option<BufWriter<File>>,
    current_path: Option<PathBuf>,
    records_in_file: usize,
    file_index: u64,
}

impl TelemetryLogger {
    /// Creates a logger writing into `log_dir`, creating the directory if needed.
    ///
    /// No file is opened until the first record is written. Numbering
    /// continues after the files an earlier run left in `log_dir`.
    pub fn new<P: AsRef<Path>>(
        log_dir: P,
        max_records_per_file: usize,
        max_files_to_keep: usize,
    ) -> Result<Self> {
        let log_dir = log_dir.as_ref().to_path_buf();
        fs::create_dir_all(&log_dir)?;

        let mut logger = Self {
            log_dir,
            max_records_per_file: max_records_per_file.max(1),
            max_files_to_keep: max_files_to_keep.max(1),
            writer: None,
            current_path: None,
            records_in_file: 0,
            file_index: 0,
        };
        logger.file_index = logger
            .telemetry_files()?
            .iter()
            .filter_map(|path| file_index_of(path))
            .max()
            .unwrap_or(0);

        Ok(logger)
    }

    /// Creates a logger from the `[telemetry]` configuration section.
    pub fn from_config(config: &TelemetryConfig) -> Result<Self> {
        Self::new(
            &config.log_dir,
            config.max_records_per_file,
            config.max_files_to_keep,
        )
    }

    /// Directory telemetry files are written to.
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Appends one record, rotating to a new file when the current one is full.
    pub fn record(&mut self, sensor: &str, value: f32) -> Result<()> {
        if self.writer.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        let record = TelemetryRecord {
            timestamp: Utc::now().to_rfc3339(),
            sensor,
            value,
        };
        let line = serde_json::to_string(&record)?;

        if let Some(writer) = self.writer.as_mut() {
            writeln!(writer, "{}", line)?;
            writer.flush()?;
        }
        self.records_in_file += 1;

        Ok(())
    }

    /// Closes the current file and opens the next one.
    fn rotate(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }

        self.file_index += 1;
        let file_name = format!(
            "{}{}_{:06}.{}",
            FILE_PREFIX,
            Utc::now().format("%Y%m%d_%H%M%S"),
            self.file_index,
            FILE_EXTENSION
        );
        let path = self.log_dir.join(file_name);

        let file = File::create(&path)?;
        info!("Writing telemetry to {}", path.display());

        self.writer = Some(BufWriter::new(file));
        self.current_path = Some(path);
        self.records_in_file = 0;

        self.prune()
    }

    /// Deletes the oldest telemetry files beyond `max_files_to_keep`.
    ///
    /// The file currently written to is never deleted.
    fn prune(&self) -> Result<()> {
        let mut files = self.telemetry_files()?;
        if files.len() <= self.max_files_to_keep {
            return Ok(());
        }

        let excess = files.len() - self.max_files_to_keep;
        files.retain(|path| Some(path) != self.current_path.as_ref());
        files.sort_by_key(|path| (file_index_of(path).unwrap_or(0), path.clone()));

        for path in files.into_iter().take(excess) {
            debug!("Removing old telemetry file {}", path.display());
            fs::remove_file(&path)?;
        }

        Ok(())
    }

    /// Lists telemetry files in the log directory.
    pub fn telemetry_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for entry in fs::read_dir(&self.log_dir)? {
            let path = entry?.path();
            let is_telemetry = path
                .file_name()
                .and_then(|name| name.to_str())
                .map(|name| name.starts_with(FILE_PREFIX))
                .unwrap_or(false)
                && path.extension().and_then(|ext| ext.to_str()) == Some(FILE_EXTENSION);

            if is_telemetry {
                files.push(path);
            }
        }

        Ok(files)
    }
}

/// Sequence number `n` of a `vue_<timestamp>_<n>.jsonl` file
fn file_index_of(path: &Path) -> Option<u64> {
    path.file_stem()?
        .to_str()?
        .rsplit('_')
        .next()?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn read_lines(files: &[PathBuf]) -> Vec<serde_json::Value> {
        files
            .iter()
            .flat_map(|path| {
                fs::read_to_string(path)
                    .unwrap()
                    .lines()
                    .map(|line| serde_json::from_str(line).unwrap())
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    #[test]
    fn test_no_file_until_first_record() {
        let dir = tempdir().unwrap();
        let logger = TelemetryLogger::new(dir.path(), 10, 2).unwrap();
        assert!(logger.telemetry_files().unwrap().is_empty());
    }

    #[test]
    fn test_record_format() {
        let dir = tempdir().unwrap();
        let mut logger = TelemetryLogger::new(dir.path(), 10, 2).unwrap();

        logger.record("Phase A Voltage", 120.5).unwrap();

        let files = logger.telemetry_files().unwrap();
        assert_eq!(files.len(), 1);

        let records = read_lines(&files);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["sensor"], "Phase A Voltage");
        assert_eq!(records[0]["value"].as_f64().unwrap(), 120.5);
        assert!(records[0]["timestamp"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn test_rotation_and_retention() {
        let dir = tempdir().unwrap();
        let mut logger = TelemetryLogger::new(dir.path(), 2, 2).unwrap();

        for i in 0..5 {
            logger.record("power", i as f32).unwrap();
        }

        // 3 files were created (2 + 2 + 1 records), the oldest was pruned
        let mut files = logger.telemetry_files().unwrap();
        files.sort();
        assert_eq!(files.len(), 2);

        let values: Vec<f64> = read_lines(&files)
            .iter()
            .map(|record| record["value"].as_f64().unwrap())
            .collect();
        assert_eq!(values, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_restart_continues_numbering_and_keeps_newest() {
        let dir = tempdir().unwrap();

        let mut first = TelemetryLogger::new(dir.path(), 1, 2).unwrap();
        for _ in 0..3 {
            first.record("old", 1.0).unwrap();
        }
        drop(first);

        let mut second = TelemetryLogger::new(dir.path(), 1, 2).unwrap();
        second.record("new", 2.0).unwrap();
        second.record("new", 3.0).unwrap();

        let files = second.telemetry_files().unwrap();
        assert_eq!(files.len(), 2);

        let mut indices: Vec<u64> = files.iter().filter_map(|p| file_index_of(p)).collect();
        indices.sort();
        assert_eq!(indices, vec![4, 5]);

        let mut values: Vec<f64> = read_lines(&files)
            .iter()
            .map(|record| record["value"].as_f64().unwrap())
            .collect();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(values, vec![2.0, 3.0]);
    }

    #[test]
    fn test_current_file_survives_pruning() {
        let dir = tempdir().unwrap();
        // Leftovers whose names sort after anything written now
        fs::write(dir.path().join("vue_99991231_235959_000001.jsonl"), "").unwrap();
        fs::write(dir.path().join("vue_99991231_235959_000002.jsonl"), "").unwrap();

        let mut logger = TelemetryLogger::new(dir.path(), 10, 1).unwrap();
        logger.record("power", 7.0).unwrap();
        logger.record("power", 8.0).unwrap();

        let files = logger.telemetry_files().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(file_index_of(&files[0]), Some(3));

        let values: Vec<f64> = read_lines(&files)
            .iter()
            .map(|record| record["value"].as_f64().unwrap())
            .collect();
        assert_eq!(values, vec![7.0, 8.0]);
    }

    #[test]
    fn test_file_index_of() {
        assert_eq!(
            file_index_of(Path::new("/tmp/vue_20240501_120000_000042.jsonl")),
            Some(42)
        );
        assert_eq!(file_index_of(Path::new("/tmp/notes.txt")), None);
    }

    #[test]
    fn test_unrelated_files_are_kept() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "keep me").unwrap();

        let mut logger = TelemetryLogger::new(dir.path(), 1, 1).unwrap();
        for i in 0..3 {
            logger.record("current", i as f32).unwrap();
        }

        assert!(dir.path().join("notes.txt").exists());
        assert_eq!(logger.telemetry_files().unwrap().len(), 1);
    }

    #[test]
    fn test_creates_missing_log_dir() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");

        let logger = TelemetryLogger::new(&nested, 10, 2).unwrap();
        assert!(nested.is_dir());
        assert_eq!(logger.log_dir(), nested.as_path());
    }
}
