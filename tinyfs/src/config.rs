//! Constants used in tinyfs

/// 数据块大小（字节）
pub const BLOCK_SIZE: usize = 1024;
/// 块域的总块数
pub const DATA_BLOCKS: usize = 1024;
/// inode 表的槽位数
pub const INODE_TABLE_SIZE: usize = 64;
/// inode 内嵌的直接引用个数
pub const INODE_DIRECT_REFS: usize = 10;
/// 文件名长度上限（含结尾的 \0）
pub const MAX_FILE_NAME: usize = 40;
/// 打开文件表的槽位数
pub const MAX_OPEN_FILES: usize = 20;
/// 根目录的 inode 编号，建立文件系统时首个创建
pub const ROOT_DIR_INUM: usize = 0;

/// 模拟存储访问延迟的空转次数，0 即关闭。
/// 调大会放大竞态窗口，适合并发压测
pub const DELAY: usize = 0;
