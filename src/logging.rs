use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::LevelFilter;

use crate::error::{Error, Result};
use crate::models::LoggingSettings;

fn level_filter(settings: &LoggingSettings, debug: bool) -> LevelFilter {
    if debug {
        return LevelFilter::Debug;
    }
    settings.level.parse().unwrap_or(LevelFilter::Info)
}

/// Install the global logger. `RUST_LOG` takes precedence over the
/// configured level; `--debug` forces debug output.
pub fn init(settings: &LoggingSettings, debug: bool) -> Result<()> {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level_filter(settings, debug));
    builder.parse_default_env();

    if let Some(path) = &settings.file {
        let file = RotatingFile::open(path, settings.max_size_bytes, settings.backup_count)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
        builder.write_style(env_logger::WriteStyle::Never);
    }

    builder
        .try_init()
        .map_err(|e| Error::Config(format!("failed to initialize logging: {}", e)))
}

/// Append-only log file that moves itself to `FILE.1` (shifting older
/// backups up) before a write would take it past `max_size`.
struct RotatingFile {
    path: PathBuf,
    file: File,
    size: u64,
    max_size: u64,
    backup_count: u32,
}

impl RotatingFile {
    fn open(path: &Path, max_size: u64, backup_count: u32) -> io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let size = file.metadata()?.len();
        Ok(RotatingFile {
            path: path.to_path_buf(),
            file,
            size,
            max_size,
            backup_count,
        })
    }

    fn backup(&self, n: u32) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(format!(".{}", n));
        PathBuf::from(name)
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;

        if self.backup_count == 0 {
            self.file = File::create(&self.path)?;
        } else {
            let _ = fs::remove_file(self.backup(self.backup_count));
            for n in (1..self.backup_count).rev() {
                let from = self.backup(n);
                if from.exists() {
                    fs::rename(&from, self.backup(n + 1))?;
                }
            }
            fs::rename(&self.path, self.backup(1))?;
            self.file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        }

        self.size = 0;
        Ok(())
    }
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.max_size > 0 && self.size > 0 && self.size + buf.len() as u64 > self.max_size {
            self.rotate()?;
        }
        let written = self.file.write(buf)?;
        self.size += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_flag_wins_over_configured_level() {
        let settings = LoggingSettings {
            level: "warn".into(),
            ..Default::default()
        };
        assert_eq!(level_filter(&settings, false), LevelFilter::Warn);
        assert_eq!(level_filter(&settings, true), LevelFilter::Debug);
    }

    #[test]
    fn unknown_level_falls_back_to_info() {
        let settings = LoggingSettings {
            level: "chatty".into(),
            ..Default::default()
        };
        assert_eq!(level_filter(&settings, false), LevelFilter::Info);
    }

    #[test]
    fn log_file_rotates_and_keeps_backups() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("app.log");
        let mut file = RotatingFile::open(&path, 10, 2).unwrap();

        for line in ["first\n", "second\n", "third\n", "fourth\n"] {
            file.write_all(line.as_bytes()).unwrap();
        }
        file.flush().unwrap();

        let read = |p: PathBuf| fs::read_to_string(p).unwrap();
        assert_eq!(read(path.clone()), "fourth\n");
        assert_eq!(read(file.backup(1)), "third\n");
        assert_eq!(read(file.backup(2)), "second\n");
        assert!(!file.backup(3).exists());
    }

    #[test]
    fn existing_size_counts_toward_rotation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "0123456789").unwrap();

        let mut file = RotatingFile::open(&path, 12, 0).unwrap();
        file.write_all(b"abc\n").unwrap();
        file.flush().unwrap();

        // No backups: the file starts over
        assert_eq!(fs::read_to_string(&path).unwrap(), "abc\n");
        assert!(!file.backup(1).exists());
    }

    #[test]
    fn zero_max_size_never_rotates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let mut file = RotatingFile::open(&path, 0, 3).unwrap();
        for _ in 0..100 {
            file.write_all(b"line\n").unwrap();
        }
        file.flush().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap().len(), 500);
        assert!(!file.backup(1).exists());
    }
}
