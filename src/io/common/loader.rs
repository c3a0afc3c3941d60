use std::ops::Range;

use async_trait::async_trait;

use crate::io::FileId;

/// Resolves a file id to its raw bytes. Implementations may fail (missing file, I/O error), which the caller treats
/// as a load failure of the asset that needed the file.
#[async_trait]
pub trait ByteFetcher: Send + Sync {
    async fn fetch(&self, file_id: FileId) -> Result<Vec<u8>, anyhow::Error>;

    /// in case of a whole-file implementation, this needs to load (and copy) the full buffer first.
    async fn fetch_range(&self, file_id: FileId, range: Range<u64>) -> Result<Vec<u8>, anyhow::Error> {
        let data = self.fetch(file_id).await?;
        let start = range.start as usize;
        let end = range.end as usize;

        if start > end || end > data.len() {
            anyhow::bail!(
                "Range {}..{} is outside of file {} ({} bytes)",
                start,
                end,
                file_id,
                data.len()
            );
        }

        Ok(data[start..end].to_vec())
    }
}
