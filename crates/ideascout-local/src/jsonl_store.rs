use ideascout_core::{DocumentStore, Error, ResearchRecord, Result};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Append-only local store: one JSON record per line.
#[derive(Debug, Clone)]
pub struct JsonlStore {
    path: PathBuf,
}

impl JsonlStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl DocumentStore for JsonlStore {
    fn name(&self) -> &'static str {
        "jsonl"
    }

    async fn insert(&self, record: &ResearchRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Store(e.to_string()))?;
        }
        let mut line = serde_json::to_vec(record).map_err(|e| Error::Store(e.to_string()))?;
        line.push(b'\n');

        let mut f = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| Error::Store(e.to_string()))?;
        // A single write keeps concurrent appends from interleaving inside a line.
        f.write_all(&line)
            .await
            .map_err(|e| Error::Store(e.to_string()))?;
        f.flush().await.map_err(|e| Error::Store(e.to_string()))?;
        Ok(())
    }
}
