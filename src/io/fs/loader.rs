use std::io::SeekFrom;
use std::ops::Range;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use log::trace;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::io::FileId;
use crate::io::common::loader::ByteFetcher;
use crate::io::file_list::FileList;

/// Reads extracted game files from a data folder, resolving file ids through the listfile.
pub struct FileSystemFetcher {
    data_folder: PathBuf,
    file_list: Arc<FileList>,
}

impl FileSystemFetcher {
    pub fn new(data_folder: impl Into<PathBuf>, file_list: Arc<FileList>) -> Self {
        Self {
            data_folder: data_folder.into(),
            file_list,
        }
    }

    fn resolve(&self, file_id: FileId) -> Result<PathBuf, anyhow::Error> {
        let file_name = self
            .file_list
            .get_filename(file_id)
            .ok_or_else(|| anyhow!("Couldn't find a path for file id {}", file_id))?;

        Ok(self.data_folder.join(file_name))
    }
}

#[async_trait]
impl ByteFetcher for FileSystemFetcher {
    async fn fetch(&self, file_id: FileId) -> Result<Vec<u8>, anyhow::Error> {
        let path = self.resolve(file_id)?;
        let buf = tokio::fs::read(&path)
            .await
            .with_context(|| format!("Reading {}", path.display()))?;

        trace!("Loaded {} ({} bytes)", path.display(), buf.len());
        Ok(buf)
    }

    async fn fetch_range(&self, file_id: FileId, range: Range<u64>) -> Result<Vec<u8>, anyhow::Error> {
        let path = self.resolve(file_id)?;
        let mut file = tokio::fs::File::open(&path)
            .await
            .with_context(|| format!("Opening {}", path.display()))?;

        let length = range
            .end
            .checked_sub(range.start)
            .ok_or_else(|| anyhow!("Invalid range {:?}", range))?;

        file.seek(SeekFrom::Start(range.start)).await?;
        let mut buf = vec![0; length as usize];
        file.read_exact(&mut buf)
            .await
            .with_context(|| format!("Reading {:?} of {}", range, path.display()))?;

        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::io::common::loader::ByteFetcher;
    use crate::io::file_list::FileList;
    use crate::io::fs::loader::FileSystemFetcher;

    #[tokio::test]
    async fn reads_whole_files_and_ranges() -> Result<(), anyhow::Error> {
        let folder = std::env::temp_dir().join(format!("sargerust-fetcher-{}", std::process::id()));
        tokio::fs::create_dir_all(folder.join("world")).await?;
        tokio::fs::write(folder.join("world/test.bin"), b"0123456789").await?;

        let file_list = Arc::new(FileList::parse("42;World\\Test.bin\n"));
        let fetcher = FileSystemFetcher::new(&folder, file_list);

        assert_eq!(fetcher.fetch(42).await?, b"0123456789");
        assert_eq!(fetcher.fetch_range(42, 2..5).await?, b"234");
        assert!(fetcher.fetch(43).await.is_err());
        assert!(fetcher.fetch_range(42, 8..12).await.is_err());

        tokio::fs::remove_dir_all(&folder).await?;
        Ok(())
    }
}
