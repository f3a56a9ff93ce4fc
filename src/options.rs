//! Mount options handed to the core by the command-line front-end.

use std::path::PathBuf;

/// Parsed front-end flags. The log sink is mandatory; a missing container
/// path selects the volatile variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountOptions {
    pub container: Option<PathBuf>,
    pub logfile: PathBuf,
}

impl MountOptions {
    /// Accepts `-c FILE`, `-l FILE` and `-o key=value[,key=value]` with the
    /// keys `containerfile` and `logfile`. Anything else is left for the
    /// host mount machinery and ignored here.
    pub fn parse<I>(args: I) -> std::result::Result<Self, String>
    where
        I: IntoIterator<Item = String>,
    {
        let mut container = None;
        let mut logfile = None;

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-c" => {
                    container = Some(args.next().ok_or("option -c needs a file argument")?);
                }
                "-l" => {
                    logfile = Some(args.next().ok_or("option -l needs a file argument")?);
                }
                "-o" => {
                    let opts = args.next().ok_or("option -o needs an argument")?;
                    for pair in opts.split(',') {
                        if let Some(value) = pair.strip_prefix("containerfile=") {
                            container = Some(value.to_string());
                        } else if let Some(value) = pair.strip_prefix("logfile=") {
                            logfile = Some(value.to_string());
                        }
                    }
                }
                _ => {}
            }
        }

        let logfile = logfile.ok_or("no log file given (use -l)")?;
        Ok(Self {
            container: container.map(PathBuf::from),
            logfile: PathBuf::from(logfile),
        })
    }
}
