//! UDF registration
//!
//! Finds a built UDF shared library under the project tree and registers it
//! with `create function`, then checks `show functions` lists it.

use crate::topic::validate_identifier;
use harness_core::{HarnessError, Result, SqlSession};
use std::path::{Component, Path, PathBuf};
use tracing::{error, info};
use walkdir::WalkDir;

/// A scalar UDF to register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdfSpec {
    /// Function name
    pub name: String,
    /// Shared library path on the dnode host
    pub library: PathBuf,
    /// SQL output type, e.g. `int`
    pub output_type: String,
    /// Intermediate buffer size in bytes
    pub buf_size: u32,
}

impl UdfSpec {
    /// `create function` statement for this UDF.
    pub fn create_sql(&self) -> Result<String> {
        validate_identifier(&self.name)?;
        let library = self.library.display().to_string();
        if library.contains('\'') {
            return Err(HarnessError::sql(library, "library path contains a quote"));
        }
        Ok(format!(
            "create function {} as '{}' outputtype {} bufSize {}",
            self.name, library, self.output_type, self.buf_size
        ))
    }
}

/// Project root above a test-suite path.
///
/// Truncates at a `community` component when present, otherwise at `tests`.
pub fn project_root(path: &Path) -> Option<PathBuf> {
    let truncate_at = |marker: &str| {
        let components: Vec<Component<'_>> = path.components().collect();
        components
            .iter()
            .position(|c| c.as_os_str() == marker)
            .map(|idx| components[..idx].iter().collect::<PathBuf>())
    };
    truncate_at("community").or_else(|| truncate_at("tests"))
}

/// Whether `path` sits in a `lib` directory somewhere below `root`.
fn in_lib_dir(root: &Path, path: &Path) -> bool {
    path.strip_prefix(root)
        .ok()
        .and_then(Path::parent)
        .map(|dir| dir.components().any(|c| c.as_os_str() == "lib"))
        .unwrap_or(false)
}

/// Locate `lib_name` (e.g. `libudf1.so`) in a `lib` directory under `root`.
///
/// The search is sorted by file name so repeated runs pick the same file.
pub fn locate_udf_library(root: &Path, lib_name: &str) -> Result<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .find(|entry| {
            entry.file_type().is_file()
                && entry.file_name() == lib_name
                && in_lib_dir(root, entry.path())
        })
        .map(|entry| entry.into_path())
        .ok_or_else(|| HarnessError::UdfLibraryNotFound(root.to_path_buf()))
}

/// Register `udf` and verify `show functions` returns `expected_functions` rows.
pub fn create_udf_function(
    session: &mut dyn SqlSession,
    udf: &UdfSpec,
    expected_functions: usize,
) -> Result<()> {
    session.execute(&udf.create_sql()?)?;

    let functions = session.query("show functions")?;
    if functions.row_count() != expected_functions {
        error!(
            target: "harness::udf",
            expected = expected_functions,
            actual = functions.row_count(),
            "create udf functions fail"
        );
        return Err(HarnessError::UdfRegistration {
            expected: expected_functions,
            actual: functions.row_count(),
        });
    }

    info!(target: "harness::udf", name = %udf.name, library = %udf.library.display(), "Registered udf");
    Ok(())
}
