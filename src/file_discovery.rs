use crate::error::{LibraryError, LibraryResult};
use globset::{GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use tokio::fs;

/// File name prefix of library response files
pub const RESP_PREFIX: &str = "RESP";

/// Async discovery of response files under a library subtree
#[derive(Debug, Clone)]
pub struct FileDiscovery {
    /// File name prefixes to include (e.g., ["RESP"])
    prefixes: Vec<String>,
    /// Include patterns set
    include_set: Option<GlobSet>,
    /// Exclude patterns set
    exclude_set: Option<GlobSet>,
    /// Maximum depth for directory traversal (None = unlimited)
    max_depth: Option<usize>,
    /// Follow symbolic links
    follow_symlinks: bool,
}

fn build_glob_set(patterns: &[String], kind: &str) -> LibraryResult<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }

    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = globset::GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| LibraryError::Pattern {
                details: format!("Invalid glob pattern '{}': {}", pattern, e),
            })?;
        builder.add(glob);
    }

    let set = builder.build().map_err(|e| LibraryError::Pattern {
        details: format!("Failed to build {} glob set: {}", kind, e),
    })?;
    Ok(Some(set))
}

impl FileDiscovery {
    pub fn new() -> Self {
        Self {
            prefixes: vec![RESP_PREFIX.to_string()],
            include_set: None,
            exclude_set: None,
            max_depth: None,
            follow_symlinks: false,
        }
    }

    /// Set file name prefixes to discover
    pub fn with_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.prefixes = prefixes;
        self
    }

    pub fn with_include_patterns(mut self, patterns: Vec<String>) -> LibraryResult<Self> {
        self.include_set = build_glob_set(&patterns, "include")?;
        Ok(self)
    }

    pub fn with_exclude_patterns(mut self, patterns: Vec<String>) -> LibraryResult<Self> {
        self.exclude_set = build_glob_set(&patterns, "exclude")?;
        Ok(self)
    }

    /// Set maximum traversal depth
    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Discover files under `path` (a file or a directory), sorted by path
    pub async fn discover_files(&self, path: &Path) -> LibraryResult<Vec<PathBuf>> {
        let metadata = fs::metadata(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LibraryError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                LibraryError::Io(e)
            }
        })?;

        if metadata.is_file() {
            if self.should_process(path) {
                return Ok(vec![path.to_path_buf()]);
            }
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        let mut read_dir = fs::read_dir(path).await?;

        while let Some(entry) = read_dir.next_entry().await? {
            let entry_path = entry.path();

            if entry_path.is_symlink() && !self.follow_symlinks {
                continue;
            }

            // Entries of the root are at depth 0
            if let Err(e) = self
                .discover_files_recursive(&entry_path, 0, &mut files)
                .await
            {
                log::warn!("Error processing {}: {}", entry_path.display(), e);
            }
        }

        files.sort();
        log::debug!("discovered {} files under {}", files.len(), path.display());
        Ok(files)
    }

    fn discover_files_recursive<'a>(
        &'a self,
        path: &'a Path,
        depth: usize,
        files: &'a mut Vec<PathBuf>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = LibraryResult<()>> + 'a>> {
        Box::pin(async move {
            if let Some(max_depth) = self.max_depth
                && depth > max_depth
            {
                return Ok(());
            }

            let metadata = fs::metadata(path).await?;

            if metadata.is_file() {
                if self.should_process(path) {
                    files.push(path.to_path_buf());
                }
            } else if metadata.is_dir() {
                if let Some(max_depth) = self.max_depth
                    && depth >= max_depth
                {
                    return Ok(());
                }

                let mut read_dir = fs::read_dir(path).await?;

                while let Some(entry) = read_dir.next_entry().await? {
                    let entry_path = entry.path();

                    if entry_path.is_symlink() && !self.follow_symlinks {
                        continue;
                    }

                    if let Err(e) = self
                        .discover_files_recursive(&entry_path, depth + 1, files)
                        .await
                    {
                        log::warn!("Error processing {}: {}", entry_path.display(), e);
                    }
                }
            }

            Ok(())
        })
    }

    /// Check the file name prefix, then the exclude and include patterns
    pub fn should_process(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        if !self.prefixes.iter().any(|p| name.starts_with(p.as_str())) {
            return false;
        }

        if let Some(exclude_set) = &self.exclude_set
            && exclude_set.is_match(path)
        {
            return false;
        }

        // If any include pattern is given, at least one must match
        if let Some(include_set) = &self.include_set {
            return include_set.is_match(path);
        }

        true
    }
}

impl Default for FileDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;
    use tokio::fs;

    async fn create_test_library() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir_all(root.join("guralp")).await.unwrap();
        fs::create_dir_all(root.join("streckeisen/sts2")).await.unwrap();

        for (path, text) in [
            ("RESP.XX.NS001..BHZ.CMG3T", "B053F03 x"),
            ("README.txt", "notes"),
            ("guralp/RESP.XX.NS002..BHZ.CMG40T", "B053F03 x"),
            ("guralp/cmg40t.txt", "text"),
            ("streckeisen/sts2/RESP.XX.NS003..BHZ.STS2", "B053F03 x"),
            ("streckeisen/sts2/RESP.XX.NS004..BHZ.STS2", "B053F03 x"),
        ] {
            fs::write(root.join(path), text).await.unwrap();
        }

        temp_dir
    }

    fn names(files: &[PathBuf]) -> HashSet<String> {
        files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_discover_resp_files() {
        let temp_dir = create_test_library().await;
        let files = FileDiscovery::new()
            .discover_files(temp_dir.path())
            .await
            .unwrap();

        assert_eq!(files.len(), 4);
        let mut sorted = files.clone();
        sorted.sort();
        assert_eq!(files, sorted);
        assert!(!names(&files).contains("README.txt"));
    }

    #[tokio::test]
    async fn test_max_depth_limit() {
        let temp_dir = create_test_library().await;
        let files = FileDiscovery::new()
            .with_max_depth(Some(1))
            .discover_files(temp_dir.path())
            .await
            .unwrap();

        let found = names(&files);
        assert_eq!(files.len(), 2);
        assert!(found.contains("RESP.XX.NS001..BHZ.CMG3T"));
        assert!(found.contains("RESP.XX.NS002..BHZ.CMG40T"));
    }

    #[tokio::test]
    async fn test_include_and_exclude_patterns() {
        let temp_dir = create_test_library().await;
        let files = FileDiscovery::new()
            .with_include_patterns(vec!["**/streckeisen/**".to_string()])
            .unwrap()
            .discover_files(temp_dir.path())
            .await
            .unwrap();
        assert_eq!(files.len(), 2);

        let files = FileDiscovery::new()
            .with_exclude_patterns(vec!["**/*.STS2".to_string()])
            .unwrap()
            .discover_files(temp_dir.path())
            .await
            .unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_invalid_pattern() {
        let result = FileDiscovery::new().with_include_patterns(vec!["a[".to_string()]);
        assert!(matches!(result, Err(LibraryError::Pattern { .. })));
    }

    #[test]
    fn test_should_process() {
        let discovery = FileDiscovery::new();
        assert!(discovery.should_process(Path::new("dataloggers/RESP.XX.NR001..HHZ.Q330")));
        assert!(!discovery.should_process(Path::new("dataloggers/q330.txt")));

        let custom = FileDiscovery::new().with_prefixes(vec!["SENS".to_string()]);
        assert!(custom.should_process(Path::new("SENS.1")));
        assert!(!custom.should_process(Path::new("RESP.1")));
    }

    #[tokio::test]
    async fn test_nonexistent_directory() {
        let result = FileDiscovery::new()
            .discover_files(Path::new("/nonexistent/path"))
            .await;
        assert!(matches!(result, Err(LibraryError::NotFound { .. })));
    }
}
