use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use log::{debug, trace};

use crate::io::FileId;

/// The mapping between file ids and their paths inside of the game data, as found in the community listfile
/// (`id;path` per line). Loaded once before any asset is fetched and read-only afterwards.
#[derive(Debug, Default)]
pub struct FileList {
    files: HashMap<FileId, String>,
    file_ids: HashMap<String, FileId>,
}

impl FileList {
    pub fn parse(content: &str) -> Self {
        let mut file_list = FileList::default();

        for line in content.lines() {
            let Some((id, file_name)) = line.trim_end_matches('\r').split_once(';') else {
                continue;
            };

            let Ok(id) = id.trim().parse::<FileId>() else {
                trace!("Skipping listfile line {}", line);
                continue;
            };

            let file_name = Self::normalize_file_name(file_name);
            file_list.file_ids.insert(file_name.clone(), id);
            file_list.files.insert(id, file_name);
        }

        file_list
    }

    pub async fn load(path: &Path) -> Result<Self, anyhow::Error> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Reading the listfile {}", path.display()))?;

        let file_list = Self::parse(&content);
        debug!("Loaded {} listfile entries", file_list.len());
        Ok(file_list)
    }

    fn normalize_file_name(file_name: &str) -> String {
        file_name.trim().replace('\\', "/").to_lowercase()
    }

    pub fn get_filename(&self, file_id: FileId) -> Option<&str> {
        self.files.get(&file_id).map(String::as_str)
    }

    pub fn get_file_data_id(&self, file_name: &str) -> Option<FileId> {
        self.file_ids.get(&Self::normalize_file_name(file_name)).copied()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::FileList;

    #[test]
    fn paths_are_normalized() {
        let list = FileList::parse("123;World\\Maps\\Azeroth\\Azeroth.wdt\r\n456;world/wmo/dungeon/test.wmo\r\n");

        assert_eq!(list.len(), 2);
        assert_eq!(list.get_filename(123), Some("world/maps/azeroth/azeroth.wdt"));
        assert_eq!(list.get_file_data_id("WORLD\\WMO\\Dungeon\\Test.wmo"), Some(456));
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let list = FileList::parse("not a line\nabc;foo.m2\n\n7;bar.m2");

        assert_eq!(list.len(), 1);
        assert_eq!(list.get_filename(7), Some("bar.m2"));
        assert_eq!(list.get_filename(8), None);
    }
}
