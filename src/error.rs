use std::fmt;
use std::io;

// POSIX error numbers surfaced at the host boundary.
const ENOENT: i32 = 2;
const EIO: i32 = 5;
const EBADF: i32 = 9;
const ENOTDIR: i32 = 20;
const EINVAL: i32 = 22;
const ENOSPC: i32 = 28;
const EEXIST: i32 = 17;
const ENAMETOOLONG: i32 = 36;

#[derive(Debug)]
pub enum FsError {
    NotFound,
    AlreadyExists,
    NameTooLong,
    NoSpace,
    BadHandle,
    InvalidArgument,
    NotDirectory,
    Corrupted(String),
    Io(io::Error),
}

pub type Result<T> = std::result::Result<T, FsError>;

impl FsError {
    /// Negated POSIX errno for the host adapter to hand back to the kernel.
    pub fn errno(&self) -> i32 {
        match self {
            Self::NotFound => -ENOENT,
            Self::AlreadyExists => -EEXIST,
            Self::NameTooLong => -ENAMETOOLONG,
            Self::NoSpace => -ENOSPC,
            Self::BadHandle => -EBADF,
            Self::InvalidArgument => -EINVAL,
            Self::NotDirectory => -ENOTDIR,
            Self::Corrupted(_) => -EIO,
            Self::Io(e) => -e.raw_os_error().unwrap_or(EIO),
        }
    }
}

impl From<io::Error> for FsError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::NotFound {
            FsError::NotFound
        } else {
            FsError::Io(e)
        }
    }
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "no such file"),
            Self::AlreadyExists => write!(f, "file already exists"),
            Self::NameTooLong => write!(f, "file name too long"),
            Self::NoSpace => write!(f, "no space left in volume"),
            Self::BadHandle => write!(f, "bad file handle"),
            Self::InvalidArgument => write!(f, "invalid argument"),
            Self::NotDirectory => write!(f, "not a directory"),
            Self::Corrupted(reason) => write!(f, "volume corrupted: {}", reason),
            Self::Io(e) => write!(f, "block device I/O error: {}", e),
        }
    }
}

impl std::error::Error for FsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}
