//! The log sink: a plain text file behind the `log` facade, one line per
//! record, flushed line by line. The core only calls the facade macros; the
//! host front-end decides where the sink lives and installs it once.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use log::{LevelFilter, Log, Metadata, Record};

use crate::error::{FsError, Result};

struct FileLog {
    file: Mutex<File>,
}

impl Log for FileLog {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "[{}] {}", record.level(), record.args());
            let _ = file.flush();
        }
    }

    fn flush(&self) {
        if let Ok(mut file) = self.file.lock() {
            let _ = file.flush();
        }
    }
}

/// Opens `path` truncated and installs it as the process-wide sink for all
/// levels. Fails when a logger is already installed.
pub fn init(path: &Path) -> Result<()> {
    let file = File::create(path).map_err(FsError::Io)?;
    log::set_boxed_logger(Box::new(FileLog {
        file: Mutex::new(file),
    }))
    .map_err(|_| FsError::InvalidArgument)?;
    log::set_max_level(LevelFilter::Trace);
    Ok(())
}
