//! Toolkit detection
//!
//! Checks whether the CUDA toolkit is installed by probing its well-known
//! installation path. A missing path is the normal CPU-only case; any other
//! failure means the environment is broken and is reported as a
//! [`ProbeError`] instead of being treated as "absent".

use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

/// Default CUDA toolkit installation path
pub const DEFAULT_TOOLKIT_PATH: &str = "/usr/local/cuda";

/// The toolkit path exists (or may exist) but could not be inspected
#[derive(Debug, Error)]
#[error("Failed to probe CUDA toolkit at {path}: {source}")]
pub struct ProbeError {
    /// Path that was probed
    pub path: String,
    /// Underlying filesystem error
    #[source]
    pub source: io::Error,
}

impl ProbeError {
    fn new(path: &Path, source: io::Error) -> Self {
        Self {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Detect whether the CUDA toolkit is installed at `path`
///
/// - path missing -> `Ok(false)`
/// - path present and readable -> `Ok(true)`
/// - anything else (permission denied, symlink loop, ...) -> `Err`
///
/// Call this once per build invocation and pass the result along; see
/// [`TargetSelector::from_mode`](super::TargetSelector::from_mode).
///
/// # Example
///
/// ```rust,no_run
/// use portext::extensions::detect_toolkit;
/// use std::path::Path;
///
/// match detect_toolkit(Path::new("/usr/local/cuda")) {
///     Ok(true) => println!("building CUDA extensions"),
///     Ok(false) => println!("building host-only extensions"),
///     Err(e) => eprintln!("{e}"),
/// }
/// ```
pub fn detect_toolkit(path: &Path) -> Result<bool, ProbeError> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if is_absent(&e) => {
            crate::debug!("No CUDA toolkit at {}", path.display());
            return Ok(false);
        }
        Err(e) => return Err(ProbeError::new(path, e)),
    };

    // An installed toolkit is a directory; make sure we can actually list it
    if metadata.is_dir() {
        fs::read_dir(path).map_err(|e| ProbeError::new(path, e))?;
    }

    crate::debug!("Found CUDA toolkit at {}", path.display());
    Ok(true)
}

/// Detect the toolkit at [`DEFAULT_TOOLKIT_PATH`]
pub fn detect_default_toolkit() -> Result<bool, ProbeError> {
    detect_toolkit(Path::new(DEFAULT_TOOLKIT_PATH))
}

fn is_absent(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}
