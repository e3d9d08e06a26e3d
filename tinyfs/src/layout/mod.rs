//! # 数据结构层
//!
//! 状态核心的被动数据结构：
//! 分配位图 | inode | 目录项

mod bitmap;
pub use bitmap::Bitmap;

mod inode;
pub use inode::{Inode, InodeKind, MAX_FILE_SIZE, MAX_INDIRECT_REFS};

mod dir_entry;
pub use dir_entry::{DirBlock, DirEntry, MAX_DIR_ENTRIES};
