//! Logger utility for application-wide logging
//!
//! This module provides a custom logger implementation that works alongside
//! the standard log crate, but adds file output capabilities. The same type
//! also writes the plain-text export summaries.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;
use log::{Log, Record, Level, Metadata, LevelFilter};

/// Custom logger implementation
pub struct Logger {
    /// File handle for log output
    file: Mutex<Option<File>>,
    /// Whether records are echoed to stdout
    echo: bool,
}

impl Logger {
    /// Creates a new logger instance
    ///
    /// # Arguments
    ///
    /// * `log_file` - Path to the log file
    ///
    /// # Returns
    ///
    /// A new Logger instance or an error if the file cannot be created
    pub fn new<P: AsRef<Path>>(log_file: P) -> io::Result<Self> {
        let file = File::create(log_file.as_ref())?;
        Ok(Logger {
            file: Mutex::new(Some(file)),
            echo: false,
        })
    }

    /// Opens `log_file` for appending, keeping what is already there
    pub fn append<P: AsRef<Path>>(log_file: P) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(log_file.as_ref())?;
        Ok(Logger {
            file: Mutex::new(Some(file)),
            echo: false,
        })
    }

    /// A logger that discards every message
    pub fn disabled() -> Self {
        Logger {
            file: Mutex::new(None),
            echo: false,
        }
    }

    /// Logs a message to the log file
    ///
    /// # Arguments
    ///
    /// * `message` - The message to log
    pub fn log(&self, message: &str) -> io::Result<()> {
        let mut guard = self.file.lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log file lock poisoned"))?;
        if let Some(file) = guard.as_mut() {
            writeln!(file, "{}", message)?;
            file.flush()?;
        }
        Ok(())
    }

    /// Logs a section title followed by indented `key: value` lines
    pub fn log_section(&self, title: &str, entries: &[(String, String)]) -> io::Result<()> {
        self.log(title)?;
        for (key, value) in entries {
            self.log(&format!("  {}: {}", key, value))?;
        }
        Ok(())
    }

    /// Static method to initialize the global logger
    pub fn init_global_logger<P: AsRef<Path>>(log_file: P, verbose: bool) -> io::Result<()> {
        let mut global_logger = Logger::new(log_file)?;
        global_logger.echo = true;

        if log::set_boxed_logger(Box::new(global_logger)).is_err() {
            eprintln!("Warning: Global logger was already initialized");
        }

        log::set_max_level(if verbose { LevelFilter::Debug } else { LevelFilter::Info });
        Ok(())
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Debug
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let message = format!("[{}] {}", record.level(), record.args());
            let _ = self.log(&message);

            if self.echo {
                println!("{}", message);
            }
        }
    }

    fn flush(&self) {
        // Already flushing in the log method
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_lines_are_written() {
        let path = std::env::temp_dir().join("fishnet_logger_test.log");
        let logger = Logger::new(&path).unwrap();
        logger.log("Export summary").unwrap();
        logger.log_section("Grid", &[("rows".to_string(), "3".to_string())]).unwrap();
        drop(logger);

        let text = std::fs::read_to_string(&path).unwrap();
        std::assert_eq!(text, "Export summary\nGrid\n  rows: 3\n");
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_append_keeps_existing_lines() {
        let path = std::env::temp_dir().join("fishnet_logger_append_test.log");
        Logger::new(&path).unwrap().log("first").unwrap();
        Logger::append(&path).unwrap().log("second").unwrap();
        std::assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
        Logger::disabled().log("dropped").unwrap();
        let _ = std::fs::remove_file(path);
    }
}
