use std::path::{Path, PathBuf};

/// Options handed to every backend constructor.
#[derive(Debug, PartialEq, Clone)]
pub struct ConnectionOptions {
    /// Relative backend locations are resolved against this directory.
    pub working_directory: PathBuf,
}

impl ConnectionOptions {
    pub fn new<P: AsRef<Path>>(working_directory: P) -> Self {
        Self {
            working_directory: working_directory.as_ref().to_path_buf(),
        }
    }

    pub fn resolve_path(&self, location: &str) -> PathBuf {
        let path = Path::new(location);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_directory.join(path)
        }
    }
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            working_directory: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }
}
