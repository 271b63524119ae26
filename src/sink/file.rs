//! A single open result file.

use super::SinkConfig;
use crate::error::BridgeError;
use chrono::{DateTime, Local};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Timestamp layout embedded in result file names.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// Give up disambiguating after this many same-second collisions.
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Result file name for `timestamp`.
///
/// `attempt` 0 is the plain `<prefix>-<timestamp>.<extension>`; later attempts
/// insert `-<attempt>` before the extension.
pub fn file_name(config: &SinkConfig, timestamp: &DateTime<Local>, attempt: u32) -> String {
    let stamp = timestamp.format(TIMESTAMP_FORMAT);
    match attempt {
        0 => format!("{}-{}.{}", config.prefix, stamp, config.extension),
        n => format!("{}-{}-{}.{}", config.prefix, stamp, n, config.extension),
    }
}

/// An open result file. Owned exclusively by the sink task.
#[derive(Debug)]
pub struct ResultFile {
    path: PathBuf,
    file: File,
    records: u64,
}

impl ResultFile {
    /// Create a new, empty result file named after `timestamp`.
    ///
    /// Never truncates: an existing file with the same name is left alone and
    /// a suffixed name is used instead.
    pub async fn create(config: &SinkConfig, timestamp: DateTime<Local>) -> Result<Self, BridgeError> {
        tokio::fs::create_dir_all(&config.directory)
            .await
            .map_err(|source| BridgeError::FileCreate {
                path: config.directory.clone(),
                source,
            })?;

        let mut attempt = 0;
        loop {
            let path = config.directory.join(file_name(config, &timestamp, attempt));
            match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => {
                    return Ok(Self {
                        path,
                        file,
                        records: 0,
                    })
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists && attempt < MAX_NAME_ATTEMPTS => {
                    tracing::debug!(path = %path.display(), "result file name taken");
                    attempt += 1;
                }
                Err(source) => return Err(BridgeError::FileCreate { path, source }),
            }
        }
    }

    /// Append one record and push it to the OS.
    pub async fn append(&mut self, payload: &str) -> Result<(), BridgeError> {
        let mut record = String::with_capacity(payload.len() + 1);
        record.push_str(payload);
        record.push('\n');

        write_flushed(&mut self.file, record.as_bytes())
            .await
            .map_err(|source| BridgeError::FileWrite {
                path: self.path.clone(),
                source,
            })?;
        self.records += 1;
        Ok(())
    }

    /// Flush, sync to durable storage and close. Returns the record count.
    pub async fn close(mut self) -> Result<u64, BridgeError> {
        sync_to_disk(&mut self.file)
            .await
            .map_err(|source| BridgeError::FileWrite {
                path: self.path.clone(),
                source,
            })?;
        Ok(self.records)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

async fn write_flushed(file: &mut File, bytes: &[u8]) -> std::io::Result<()> {
    file.write_all(bytes).await?;
    file.flush().await
}

async fn sync_to_disk(file: &mut File) -> std::io::Result<()> {
    file.flush().await?;
    file.sync_all().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn config_in(dir: &Path) -> SinkConfig {
        SinkConfig {
            directory: dir.to_path_buf(),
            ..SinkConfig::default()
        }
    }

    fn new_year() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_file_name_format() {
        let config = SinkConfig::default();
        let ts = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(file_name(&config, &ts, 0), "points-2024-03-09-14-05-07.asdp");
        assert_eq!(file_name(&config, &ts, 2), "points-2024-03-09-14-05-07-2.asdp");
    }

    #[tokio::test]
    async fn test_create_append_close() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        let mut file = ResultFile::create(&config, new_year()).await.unwrap();
        assert_eq!(
            file.path(),
            dir.path().join("points-2024-01-01-00-00-00.asdp")
        );
        file.append("12.34").await.unwrap();
        file.append(" a  b ").await.unwrap();
        let path = file.path().to_path_buf();
        assert_eq!(file.close().await.unwrap(), 2);

        let contents = std::fs::read_to_string(path).unwrap();
        assert_eq!(contents, "12.34\n a  b \n");
    }

    #[tokio::test]
    async fn test_same_second_does_not_truncate() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        let mut first = ResultFile::create(&config, new_year()).await.unwrap();
        first.append("1").await.unwrap();
        let first_path = first.path().to_path_buf();
        first.close().await.unwrap();

        let second = ResultFile::create(&config, new_year()).await.unwrap();
        assert_eq!(
            second.path(),
            dir.path().join("points-2024-01-01-00-00-00-1.asdp")
        );
        second.close().await.unwrap();

        assert_eq!(std::fs::read_to_string(first_path).unwrap(), "1\n");
    }

    #[tokio::test]
    async fn test_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir.path().join("nested").join("scans"));

        let file = ResultFile::create(&config, new_year()).await.unwrap();
        assert!(file.path().starts_with(dir.path().join("nested")));
        file.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_create_failure_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();

        let err = ResultFile::create(&config_in(&blocker), new_year())
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::FileCreate { .. }));
    }
}
