use std::path::Path;

use async_trait::async_trait;
use conduit_common::Result;
use conduit_lang::Language;
use ignore::WalkBuilder;
use tracing::warn;

use crate::traits::{CrawledFile, Crawler};

/// Walks a repository on disk, honoring `.gitignore`/`.ignore` rules the way
/// a developer's own tooling would. Binary files (detected by a null byte in
/// the first kilobyte) are skipped rather than surfaced as parse failures.
pub struct FsCrawler;

impl FsCrawler {
    pub fn new() -> Self {
        FsCrawler
    }
}

impl Default for FsCrawler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Crawler for FsCrawler {
    async fn crawl(&self, root: &Path) -> Result<Vec<CrawledFile>> {
        let mut files = Vec::new();
        for entry in WalkBuilder::new(root).hidden(false).build() {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable directory entry");
                    continue;
                }
            };
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            let path = entry.path();
            let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
                continue;
            };
            let language = Language::from_extension(ext).ok();
            let content = match std::fs::read(path) {
                Ok(c) => c,
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "skipping unreadable file");
                    continue;
                }
            };
            if content[..content.len().min(1024)].contains(&0) {
                continue;
            }
            files.push(CrawledFile {
                content,
                source_uri: path.to_string_lossy().into_owned(),
                language,
                metadata: Default::default(),
            });
        }
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn crawls_python_files_and_skips_binaries() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.py"), b"def f():\n    pass\n").unwrap();
        let mut bin = std::fs::File::create(dir.path().join("b.bin")).unwrap();
        bin.write_all(&[0u8, 1, 2, 3]).unwrap();

        let files = FsCrawler::new().crawl(dir.path()).await.unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].source_uri.ends_with("a.py"));
        assert_eq!(files[0].language, Some(Language::Python));
    }
}
