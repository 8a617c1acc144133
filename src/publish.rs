//! Publishers for assembled entities.
//!
//! [`DirectoryPublisher`] keeps the latest document per topic as a file, which is the
//! retained-message view a bus subscriber would see. [`StdoutPublisher`] prints one
//! `topic payload` line per message.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::contract::Publisher;
use crate::error::{ScrapeError, ScrapeResult};

pub struct DirectoryPublisher {
    root: PathBuf,
}

impl DirectoryPublisher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<topic segments>.json`. Segments must be plain names.
    pub fn path_for(&self, topic: &str) -> ScrapeResult<PathBuf> {
        let mut path = self.root.clone();
        let segments: Vec<&str> = topic.split('/').collect();
        for segment in &segments {
            if segment.is_empty() || *segment == "." || *segment == ".." || segment.contains('\\') {
                return Err(ScrapeError::Publish(format!("invalid topic {topic:?}")));
            }
        }
        let (last, parents) = segments
            .split_last()
            .ok_or_else(|| ScrapeError::Publish("empty topic".to_string()))?;
        for segment in parents {
            path.push(segment);
        }
        path.push(format!("{last}.json"));
        Ok(path)
    }
}

#[async_trait]
impl Publisher for DirectoryPublisher {
    async fn publish(&self, topic: &str, payload: &str) -> ScrapeResult<()> {
        let path = self.path_for(topic)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ScrapeError::Publish(format!("cannot create {}: {e}", parent.display())))?;
        }
        tokio::fs::write(&path, payload)
            .await
            .map_err(|e| ScrapeError::Publish(format!("cannot write {}: {e}", path.display())))?;
        info!(topic, path = %path.display(), bytes = payload.len(), "Published");
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct StdoutPublisher;

#[async_trait]
impl Publisher for StdoutPublisher {
    async fn publish(&self, topic: &str, payload: &str) -> ScrapeResult<()> {
        let mut stdout = tokio::io::stdout();
        let line = format!("{topic} {payload}\n");
        stdout
            .write_all(line.as_bytes())
            .await
            .map_err(|e| ScrapeError::Publish(e.to_string()))?;
        stdout.flush().await.map_err(|e| ScrapeError::Publish(e.to_string()))?;
        debug!(topic, bytes = payload.len(), "Published to stdout");
        Ok(())
    }
}
