use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use conduit_common::RepoConfig;
use conduit_collab::Crawler;
use conduit_lang::Language;

use crate::asset::{Asset, AssetKey};
use crate::error::PipelineError;

#[derive(Debug, Clone)]
pub struct ServiceFile {
    pub path: String,
    pub content: String,
    pub language: Language,
}

#[derive(Debug, Clone, Default)]
pub struct RawCodeFilesOutput {
    pub files_by_service: HashMap<String, Vec<ServiceFile>>,
    pub total_files: usize,
}

/// Crawls every configured repository, keeping only files whose extension
/// maps to a recognized language and whose bytes are valid UTF-8 (binary
/// content is dropped by the crawler itself).
pub struct RawCodeFilesAsset {
    crawler: Arc<dyn Crawler>,
}

impl RawCodeFilesAsset {
    pub fn new(crawler: Arc<dyn Crawler>) -> Self {
        RawCodeFilesAsset { crawler }
    }
}

#[async_trait]
impl Asset for RawCodeFilesAsset {
    type Input = Vec<RepoConfig>;
    type Output = RawCodeFilesOutput;

    fn key(&self) -> AssetKey {
        AssetKey::RawCodeFiles
    }

    async fn materialize(&self, repos: Vec<RepoConfig>) -> Result<Self::Output, PipelineError> {
        let mut output = RawCodeFilesOutput::default();
        for repo in repos {
            let crawled = self.crawler.crawl(&repo.path).await?;
            let mut files = Vec::new();
            for file in crawled {
                let Some(language) = file.language else {
                    continue;
                };
                let Ok(content) = String::from_utf8(file.content) else {
                    continue;
                };
                files.push(ServiceFile {
                    path: file.source_uri,
                    content,
                    language,
                });
            }
            output.total_files += files.len();
            output.files_by_service.insert(repo.name, files);
        }
        Ok(output)
    }
}
