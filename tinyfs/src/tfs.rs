//! # 操作层
//!
//! 文件系统的公开表面：路径解析、打开标志与句柄 I/O。
//! 状态核心的三张表在此装配成单一属主值。

use std::fs::File;
use std::io::Write as _;
use std::path::Path;

use enumflags2::{bitflags, BitFlags};
use log::debug;

use crate::block_store::BlockStore;
use crate::config::{BLOCK_SIZE, ROOT_DIR_INUM};
use crate::error::{Error, Result};
use crate::inode_table::InodeTable;
use crate::layout::InodeKind;
use crate::open_file::OpenFileTable;

/// 打开文件时的行为标志
#[allow(clippy::upper_case_acronyms)]
#[bitflags]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenFlag {
    /// 名字不存在则创建普通文件，存在则用现有 inode
    CREATE = 0b001,
    /// 定位到 inode 后清空其内容；
    /// 同一 inode 上其它句柄的游标就此作废
    TRUNC = 0b010,
    /// 每次 I/O 开始时用 inode 的当前大小覆盖句柄偏移
    APPEND = 0b100,
}

/// 内存文件系统：数据块仓库、inode 表与打开文件表的单一属主。
/// 所有操作都可被任意多线程并发调用。
/// 内容只存在于内存，销毁后一切不复存在
pub struct TinyFileSystem {
    blocks: BlockStore,
    inodes: InodeTable,
    open_files: OpenFileTable,
}

impl TinyFileSystem {
    /// 建立空文件系统并创建根目录
    pub fn init() -> Result<Self> {
        let fs = Self {
            blocks: BlockStore::new(),
            inodes: InodeTable::new(),
            open_files: OpenFileTable::new(),
        };

        let root = fs.inodes.create(InodeKind::Directory, &fs.blocks)?;
        if root != ROOT_DIR_INUM {
            return Err(Error::InvalidInumber);
        }

        Ok(fs)
    }

    /// 解析路径并返回其 inode 编号
    pub fn lookup(&self, path: &str) -> Result<usize> {
        let name = path_name(path)?;
        self.inodes.find_in_dir(ROOT_DIR_INUM, name, &self.blocks)
    }

    /// 打开文件并返回句柄。
    /// 注意：CREATE 创建文件之后表满导致打开失败的话，文件保持已创建
    pub fn open(&self, path: &str, flags: BitFlags<OpenFlag>) -> Result<usize> {
        let name = path_name(path)?;

        let inumber = if flags.contains(OpenFlag::CREATE) {
            self.inodes
                .create_in_dir(ROOT_DIR_INUM, InodeKind::File, name, &self.blocks)?
        } else {
            self.inodes.find_in_dir(ROOT_DIR_INUM, name, &self.blocks)?
        };

        if flags.contains(OpenFlag::TRUNC) {
            self.inodes.clear(inumber, &self.blocks)?;
        }

        let handle = self
            .open_files
            .open_entry(inumber, flags.contains(OpenFlag::APPEND))?;
        debug!("open {path:?} flags={flags:?} -> handle {handle}");
        Ok(handle)
    }

    /// 关闭句柄
    pub fn close(&self, handle: usize) -> Result<()> {
        self.open_files.close_entry(handle)
    }

    /// 从句柄读出字节，返回实际读出量；0 即已到文件末尾
    pub fn read(&self, handle: usize, buf: &mut [u8]) -> Result<usize> {
        self.open_files.read(handle, buf, &self.inodes, &self.blocks)
    }

    /// 向句柄写入字节，返回实际写入量
    /// （文件容量不足时会小于请求量，包括 0）
    pub fn write(&self, handle: usize, buf: &[u8]) -> Result<usize> {
        self.open_files.write(handle, buf, &self.inodes, &self.blocks)
    }

    /// 把文件系统内的文件整个拷贝到宿主机路径
    pub fn copy_to_host(&self, path: &str, dest: &Path) -> Result<()> {
        let handle = self.open(path, BitFlags::empty())?;
        let drained = self.drain_to_host(handle, dest);
        self.close(handle)?;
        drained
    }

    fn drain_to_host(&self, handle: usize, dest: &Path) -> Result<()> {
        let mut host = File::create(dest)?;
        let mut buf = [0u8; BLOCK_SIZE];
        loop {
            let read = self.read(handle, &mut buf)?;
            if read == 0 {
                break;
            }
            host.write_all(&buf[..read])?;
        }
        Ok(())
    }

    /// 立刻销毁文件系统，不等未关闭的句柄。
    /// 有锁原语中过毒时报错
    pub fn destroy(self) -> Result<()> {
        self.blocks.destroy()?;
        self.inodes.destroy()?;
        self.open_files.destroy()
    }

    /// 阻塞到所有打开文件关闭后才返回，之后随时可以安全销毁
    pub fn destroy_after_all_closed(&self) -> Result<()> {
        self.open_files.wait_all_closed()
    }
}

/// 路径文法：`/` + 非空名字，名字不含 `/` 与 `\0`。
/// 目录项以 `\0` 结尾存储名字，夹带 `\0` 的名字存得进却查不回；
/// 根目录自身不可作为文件寻址
fn path_name(path: &str) -> Result<&str> {
    let name = path.strip_prefix('/').ok_or(Error::InvalidPath)?;
    if name.is_empty() || name.contains('/') || name.contains('\0') {
        return Err(Error::InvalidPath);
    }
    Ok(name)
}
