pub mod common;
pub mod file_list;
pub mod fs;

/// The numeric identifier of a game file. Unique within its asset namespace.
pub type FileId = u32;
