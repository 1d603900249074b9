// Output files that only appear once they are complete.
//
// When the output path names the same file as the input, writing straight to
// it would truncate the data still being read. In that case the output goes
// to a uniquely named temporary file next to the destination and replaces it
// only after the pipeline succeeds. Without aliasing the destination is
// written directly and deleted again if the pipeline fails.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::ArchiveError;

const TEMP_PREFIX: &str = ".lz4arc-";
const TEMP_SUFFIX: &str = ".tmp";

// ---------------------------------------------------------------------------
// Path aliasing
// ---------------------------------------------------------------------------

/// How input and output paths are compared when looking for aliasing.
///
/// Paths that exist are canonicalized first under either policy, so
/// `dir/../file` and symlinks resolve to the file they name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasPolicy {
    /// Paths differing only in letter case name the same file.
    /// Default on Windows and macOS.
    CaseInsensitive,
    /// Paths must match exactly. Default elsewhere.
    CaseSensitive,
}

impl Default for AliasPolicy {
    fn default() -> Self {
        if cfg!(any(windows, target_os = "macos")) {
            Self::CaseInsensitive
        } else {
            Self::CaseSensitive
        }
    }
}

/// Whether `a` and `b` name the same file under `policy`.
pub fn is_same_path(a: &Path, b: &Path, policy: AliasPolicy) -> bool {
    let a = normalize(a);
    let b = normalize(b);
    match policy {
        AliasPolicy::CaseSensitive => a == b,
        AliasPolicy::CaseInsensitive => {
            a.to_string_lossy().to_lowercase() == b.to_string_lossy().to_lowercase()
        }
    }
}

fn normalize(path: &Path) -> PathBuf {
    if let Ok(canonical) = fs::canonicalize(path) {
        return canonical;
    }
    // A file that does not exist yet: resolve its directory instead.
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => fs::canonicalize(effective_dir(parent))
            .map(|dir| dir.join(name))
            .unwrap_or_else(|_| path.to_path_buf()),
        _ => path.to_path_buf(),
    }
}

fn effective_dir(parent: &Path) -> &Path {
    if parent.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parent
    }
}

// ---------------------------------------------------------------------------
// SafeOutput
// ---------------------------------------------------------------------------

enum Sink {
    Direct(File),
    Redirected(NamedTempFile),
}

/// An output file that is removed unless [`SafeOutput::commit`] succeeds.
pub struct SafeOutput {
    intended: PathBuf,
    sink: Option<Sink>,
}

impl SafeOutput {
    /// Decide once whether redirection is needed and create the output.
    ///
    /// `input` is the path being read, if any; when it names the same file as
    /// `intended` the output is redirected to a temporary file in the same
    /// directory.
    pub fn prepare(
        input: Option<&Path>,
        intended: &Path,
        policy: AliasPolicy,
    ) -> Result<Self, ArchiveError> {
        let aliased = input.is_some_and(|input| is_same_path(input, intended, policy));
        let open_err = |source| ArchiveError::OpenOutput {
            path: intended.to_path_buf(),
            source,
        };

        let sink = if aliased {
            let dir = effective_dir(intended.parent().unwrap_or_else(|| Path::new("")));
            let temp = tempfile::Builder::new()
                .prefix(TEMP_PREFIX)
                .suffix(TEMP_SUFFIX)
                .tempfile_in(dir)
                .map_err(open_err)?;
            log::debug!(
                "output {} aliases the input, writing to {}",
                intended.display(),
                temp.path().display()
            );
            Sink::Redirected(temp)
        } else {
            Sink::Direct(File::create(intended).map_err(open_err)?)
        };

        Ok(Self {
            intended: intended.to_path_buf(),
            sink: Some(sink),
        })
    }

    /// The file being written.
    pub fn file(&self) -> &File {
        match &self.sink {
            Some(Sink::Direct(file)) => file,
            Some(Sink::Redirected(temp)) => temp.as_file(),
            None => unreachable!("sink is only taken by commit or drop"),
        }
    }

    /// The path actually being written (temporary when redirected).
    pub fn path(&self) -> &Path {
        match &self.sink {
            Some(Sink::Redirected(temp)) => temp.path(),
            _ => &self.intended,
        }
    }

    /// The destination the output ends up at.
    pub fn intended_path(&self) -> &Path {
        &self.intended
    }

    /// Whether writes go to a temporary file.
    pub fn is_redirected(&self) -> bool {
        matches!(self.sink, Some(Sink::Redirected(_)))
    }

    /// Sync the output and move it into place.
    ///
    /// A redirected file atomically replaces whatever is at the destination.
    /// On failure nothing is left behind and the destination is untouched.
    pub fn commit(mut self) -> Result<(), ArchiveError> {
        self.file().sync_all()?;
        if let Some(Sink::Redirected(temp)) = self.sink.take() {
            // Temporary files are created owner-only; keep the replaced
            // file's permissions instead.
            if let Ok(meta) = fs::metadata(&self.intended) {
                if let Err(e) = fs::set_permissions(temp.path(), meta.permissions()) {
                    log::warn!("could not copy permissions to {}: {e}", temp.path().display());
                }
            }
            // Dropping the PersistError drops the temporary file with it.
            temp.persist(&self.intended).map_err(|e| e.error)?;
            log::debug!("replaced {}", self.intended.display());
        }
        Ok(())
    }
}

impl Drop for SafeOutput {
    fn drop(&mut self) {
        match self.sink.take() {
            Some(Sink::Direct(file)) => {
                drop(file);
                if let Err(e) = fs::remove_file(&self.intended) {
                    log::warn!(
                        "could not remove partial output {}: {e}",
                        self.intended.display()
                    );
                }
            }
            Some(Sink::Redirected(temp)) => {
                if let Err(e) = temp.close() {
                    log::warn!("could not remove temporary output: {e}");
                }
            }
            None => {}
        }
    }
}

/// Run `writer_fn` against a safe output for `intended`, committing only if
/// it succeeds.
///
/// On any failure the partially written file is deleted and the error is
/// returned unchanged.
pub fn with_safe_output<T, F>(
    input: Option<&Path>,
    intended: &Path,
    policy: AliasPolicy,
    writer_fn: F,
) -> Result<T, ArchiveError>
where
    F: FnOnce(&File) -> Result<T, ArchiveError>,
{
    let output = SafeOutput::prepare(input, intended, policy)?;
    let value = writer_fn(output.file())?;
    output.commit()?;
    Ok(value)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
