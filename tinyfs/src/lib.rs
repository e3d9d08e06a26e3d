//! # tinyfs
//!
//! 单目录的内存文件系统，微缩版的经典 Unix inode 设计。
//! 扁平命名的文件全部挂在唯一的根目录下，
//! 任意多线程可并发地创建、打开、读写、截断与关闭文件。
//!
//! 整体架构自上而下：

// 操作层：路径解析、打开标志、句柄 I/O 与销毁屏障
mod tfs;
pub use tfs::{OpenFlag, TinyFileSystem};

// 打开文件表层：句柄、游标与追加语义
mod open_file;

// inode 表层：inode 槽位与单根目录逻辑
mod inode_table;

// 数据块仓库层：块域及其分配位图
mod block_store;

// 数据结构层：inode、目录项、位图
mod layout;
pub use layout::{MAX_DIR_ENTRIES, MAX_FILE_SIZE, MAX_INDIRECT_REFS};

// 存储访问延迟模拟
mod delay;

pub mod config;

mod error;
pub use error::{Error, Result};
