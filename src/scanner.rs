use anyhow::{bail, Result};
use log::{debug, warn};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File scanner for the declaration source locations supplied by the host.
///
/// Each location is either a single `.rs` file or a directory that is walked
/// recursively. Inside directories the `target` directory and hidden
/// directories (those starting with `.`) are skipped.
///
/// # Example
///
/// ```no_run
/// use contract_from_source::scanner::FileScanner;
/// use std::path::PathBuf;
///
/// let scanner = FileScanner::new(vec![PathBuf::from("./src/api")]);
/// let result = scanner.scan().unwrap();
/// println!("Found {} Rust files", result.rust_files.len());
/// ```
pub struct FileScanner {
    sources: Vec<PathBuf>,
}

/// Result of a scan over every source location.
pub struct ScanResult {
    /// Discovered `.rs` files, sorted and deduplicated
    pub rust_files: Vec<PathBuf>,
    /// Warning messages for entries that could not be accessed
    pub warnings: Vec<String>,
}

impl FileScanner {
    pub fn new(sources: Vec<PathBuf>) -> Self {
        Self { sources }
    }

    /// Collects every `.rs` file under the configured locations.
    ///
    /// Inaccessible entries below a location are recorded as warnings and
    /// scanning continues. The file list is sorted so downstream output does
    /// not depend on directory iteration order.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured location does not exist.
    pub fn scan(&self) -> Result<ScanResult> {
        let mut rust_files = Vec::new();
        let mut warnings = Vec::new();

        for source in &self.sources {
            if !source.exists() {
                bail!("Source location does not exist: {}", source.display());
            }

            if source.is_file() {
                if is_rust_file(source) {
                    rust_files.push(source.clone());
                } else {
                    let warning = format!("Ignoring non-Rust source file: {}", source.display());
                    warn!("{}", warning);
                    warnings.push(warning);
                }
                continue;
            }

            debug!("Walking source directory: {}", source.display());
            for entry in WalkDir::new(source).into_iter().filter_entry(|e| {
                if e.path() == source.as_path() {
                    return true;
                }
                let file_name = e.file_name().to_string_lossy();
                !file_name.starts_with('.') && file_name != "target"
            }) {
                match entry {
                    Ok(entry) => {
                        let path = entry.path();
                        if path.is_file() && is_rust_file(path) {
                            rust_files.push(path.to_path_buf());
                        }
                    }
                    Err(e) => {
                        let warning = format!("Failed to access path: {}", e);
                        warn!("{}", warning);
                        warnings.push(warning);
                    }
                }
            }
        }

        rust_files.sort();
        rust_files.dedup();

        Ok(ScanResult {
            rust_files,
            warnings,
        })
    }
}

fn is_rust_file(path: &Path) -> bool {
    path.extension().and_then(|s| s.to_str()) == Some("rs")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_scan_directory_and_single_file() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir(root.join("api")).unwrap();
        fs::write(root.join("api/devices.rs"), "pub struct Device {}").unwrap();
        fs::write(root.join("api/readme.md"), "# README").unwrap();
        fs::write(root.join("shared.rs"), "pub type Id = String;").unwrap();

        let scanner = FileScanner::new(vec![root.join("api"), root.join("shared.rs")]);
        let result = scanner.scan().unwrap();

        assert_eq!(result.rust_files.len(), 2);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_scan_skips_target_and_hidden_directories() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir(root.join("target")).unwrap();
        fs::create_dir(root.join(".git")).unwrap();
        fs::write(root.join("target/build.rs"), "fn main() {}").unwrap();
        fs::write(root.join(".git/config.rs"), "// config").unwrap();
        fs::write(root.join("types.rs"), "pub struct A {}").unwrap();

        let scanner = FileScanner::new(vec![root.to_path_buf()]);
        let result = scanner.scan().unwrap();

        assert_eq!(result.rust_files.len(), 1);
        assert_eq!(
            result.rust_files[0].file_name().unwrap().to_string_lossy(),
            "types.rs"
        );
    }

    #[test]
    fn test_scan_deduplicates_overlapping_locations() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("types.rs"), "pub struct A {}").unwrap();

        let scanner = FileScanner::new(vec![root.to_path_buf(), root.join("types.rs")]);
        let result = scanner.scan().unwrap();

        assert_eq!(result.rust_files.len(), 1);
    }

    #[test]
    fn test_scan_missing_location_fails() {
        let scanner = FileScanner::new(vec![PathBuf::from("/nonexistent/api")]);
        let err = scanner.scan().err().unwrap();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_scan_non_rust_file_warns() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("notes.txt");
        fs::write(&path, "notes").unwrap();

        let result = FileScanner::new(vec![path]).scan().unwrap();
        assert!(result.rust_files.is_empty());
        assert_eq!(result.warnings.len(), 1);
    }
}
