use std::fmt;
use std::io;
use std::sync::PoisonError;

pub type Result<T> = core::result::Result<T, Error>;

/// 所有操作统一的失败类别
#[derive(Debug)]
pub enum Error {
    /// 路径不满足 `/` + 非空名字的文法
    InvalidPath,
    /// 名字为空
    EmptyName,
    /// 句柄越界或已关闭
    InvalidHandle,
    /// inode 编号越界或槽位已被释放
    InvalidInumber,
    /// 数据块编号越界或逻辑块索引超出已分配范围
    InvalidBlock,
    /// 对非目录做目录操作
    NotADirectory,
    /// 目录下没有该名字
    NotFound,
    /// inode 表已满
    InodesExhausted,
    /// 块域已满
    BlocksExhausted,
    /// 打开文件表已满
    OpenFilesExhausted,
    /// 根目录的目录项已满
    DirectoryFull,
    /// 文件已达到容量上限
    FileFull,
    /// 句柄偏移越过了文件末尾，文件被别的句柄截断过
    StaleOffset,
    /// 某个锁原语中过毒：持有者曾在临界区内 panic
    Poisoned,
    /// 宿主机一侧的 I/O 失败
    Host(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPath => write!(f, "invalid path"),
            Self::EmptyName => write!(f, "empty name"),
            Self::InvalidHandle => write!(f, "invalid file handle"),
            Self::InvalidInumber => write!(f, "invalid inumber"),
            Self::InvalidBlock => write!(f, "invalid block index"),
            Self::NotADirectory => write!(f, "not a directory"),
            Self::NotFound => write!(f, "not found"),
            Self::InodesExhausted => write!(f, "inode table is full"),
            Self::BlocksExhausted => write!(f, "no free data block"),
            Self::OpenFilesExhausted => write!(f, "open file table is full"),
            Self::DirectoryFull => write!(f, "directory is full"),
            Self::FileFull => write!(f, "file has reached its size limit"),
            Self::StaleOffset => write!(f, "offset is past end of file"),
            Self::Poisoned => write!(f, "a lock primitive is poisoned"),
            Self::Host(e) => write!(f, "host i/o error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Host(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    #[inline]
    fn from(e: io::Error) -> Self {
        Self::Host(e)
    }
}

impl<T> From<PoisonError<T>> for Error {
    #[inline]
    fn from(_: PoisonError<T>) -> Self {
        Self::Poisoned
    }
}
