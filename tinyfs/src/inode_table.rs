//! # inode 表层
//!
//! inode 槽位数组与单根目录逻辑。
//!
//! 槽位分配位图的状态转换由表级互斥锁保护；
//! 每个槽位各有读写锁，占用后的内容由它保护。
//! 空槽位即 `None`，释放后再访问会以 inode 已不在显形。
//!
//! 锁层级：表级互斥锁先于任何 inode 锁；
//! 只有在表级互斥锁的保护下才允许同时持有多把 inode 锁
//! （`create_in_dir` 持有父目录锁时初始化子 inode）。

use std::sync::{Mutex, RwLock};

use crate::block_store::BlockStore;
use crate::config::INODE_TABLE_SIZE;
use crate::delay;
use crate::error::{Error, Result};
use crate::layout::{Bitmap, DirBlock, Inode, InodeKind};

pub struct InodeTable {
    bitmap: Mutex<Bitmap>,
    slots: Box<[RwLock<Option<Inode>>]>,
}

impl InodeTable {
    pub fn new() -> Self {
        Self {
            bitmap: Mutex::new(Bitmap::new(INODE_TABLE_SIZE)),
            slots: (0..INODE_TABLE_SIZE).map(|_| RwLock::new(None)).collect(),
        }
    }

    /// 新建 inode 并返回其编号。
    /// 目录随手扩展一个内容块并把整块目录项置空
    pub fn create(&self, kind: InodeKind, store: &BlockStore) -> Result<usize> {
        let mut bitmap = self.bitmap.lock()?;
        self.create_locked(&mut bitmap, kind, store)
    }

    /// 表级互斥锁已持有时的新建路径，`bitmap` 即持锁凭证。
    /// 任何子失败都回退槽位
    fn create_locked(
        &self,
        bitmap: &mut Bitmap,
        kind: InodeKind,
        store: &BlockStore,
    ) -> Result<usize> {
        let inumber = bitmap.alloc().ok_or(Error::InodesExhausted)?;

        delay::storage_delay();
        let mut slot = match self.slots[inumber].write() {
            Ok(slot) => slot,
            Err(e) => {
                bitmap.free(inumber);
                return Err(e.into());
            }
        };

        let mut inode = Inode::new(kind);
        if kind == InodeKind::Directory {
            if let Err(e) = Self::init_dir_block(&mut inode, store) {
                let _ = inode.clear(store);
                bitmap.free(inumber);
                return Err(e);
            }
        }

        *slot = Some(inode);
        Ok(inumber)
    }

    /// 新目录的内容块必须显式置空每个目录项，块不会替它清零
    fn init_dir_block(inode: &mut Inode, store: &BlockStore) -> Result<()> {
        let block = inode.extend(store)?;
        store.block(block)?.lock()?.map_mut(|entries: &mut DirBlock| {
            for entry in entries.iter_mut() {
                entry.vacate();
            }
        });
        Ok(())
    }

    /// 删除 inode：释放其全部数据块并归还槽位。
    /// 槽位可能随即被复用
    pub fn delete(&self, inumber: usize, store: &BlockStore) -> Result<()> {
        // 先校验编号，再去碰锁表
        self.check_inumber(inumber)?;

        delay::storage_delay();
        let mut bitmap = self.bitmap.lock()?;
        let mut slot = self.slots[inumber].write()?;

        slot.as_mut().ok_or(Error::InvalidInumber)?.clear(store)?;
        slot.take();
        bitmap.free(inumber);
        Ok(())
    }

    /// 清空 inode 的内容但保留槽位，打开文件时的截断用它
    pub fn clear(&self, inumber: usize, store: &BlockStore) -> Result<()> {
        self.check_inumber(inumber)?;

        let mut slot = self.slots[inumber].write()?;
        slot.as_mut().ok_or(Error::InvalidInumber)?.clear(store)
    }

    /// 在目录下查找名字，返回子 inode 编号
    pub fn find_in_dir(&self, parent: usize, name: &str, store: &BlockStore) -> Result<usize> {
        self.check_inumber(parent)?;

        let slot = self.slots[parent].read()?;
        let dir = slot.as_ref().ok_or(Error::InvalidInumber)?;
        Self::find_in_dir_locked(dir, name, store)
    }

    /// 父目录锁已持有时的查找。线性扫描，首个匹配生效
    fn find_in_dir_locked(dir: &Inode, name: &str, store: &BlockStore) -> Result<usize> {
        delay::storage_delay();
        if !dir.is_dir() {
            return Err(Error::NotADirectory);
        }

        let block = dir.block_at(0, store)?;
        store
            .block(block)?
            .lock()?
            .map(|entries: &DirBlock| {
                entries
                    .iter()
                    .find(|entry| entry.matches(name))
                    .and_then(|entry| entry.inumber())
            })
            .ok_or(Error::NotFound)
    }

    /// 在目录下按名取得或新建子 inode，对名字幂等：
    /// 名字已存在时直接返回现有编号。
    /// 表级互斥锁先于父目录写锁，子 inode 的初始化都在二者之内
    pub fn create_in_dir(
        &self,
        parent: usize,
        kind: InodeKind,
        name: &str,
        store: &BlockStore,
    ) -> Result<usize> {
        self.check_inumber(parent)?;
        if name.is_empty() {
            return Err(Error::EmptyName);
        }

        let mut bitmap = self.bitmap.lock()?;
        let parent_slot = self.slots[parent].write()?;
        let dir = parent_slot.as_ref().ok_or(Error::InvalidInumber)?;

        match Self::find_in_dir_locked(dir, name, store) {
            Ok(existing) => return Ok(existing),
            Err(Error::NotFound) => {}
            Err(e) => return Err(e),
        }

        // 先定位空目录项；目录满时败在创建之前，不会多出孤儿 inode
        let dir_block = dir.block_at(0, store)?;
        let vacant = store
            .block(dir_block)?
            .lock()?
            .map(|entries: &DirBlock| entries.iter().position(|entry| entry.inumber().is_none()))
            .ok_or(Error::DirectoryFull)?;

        let child = self.create_locked(&mut bitmap, kind, store)?;

        // 填写目录项时块锁已松开过，但表级互斥锁始终在手，
        // 而目录项只会被 create_in_dir 填写
        store
            .block(dir_block)?
            .lock()?
            .map_mut(|entries: &mut DirBlock| entries[vacant].fill(name, child));

        Ok(child)
    }

    /// I/O 路径按编号取槽位锁；校验范围并模拟访问延迟
    pub(crate) fn slot(&self, inumber: usize) -> Result<&RwLock<Option<Inode>>> {
        self.check_inumber(inumber)?;
        delay::storage_delay();
        Ok(&self.slots[inumber])
    }

    fn check_inumber(&self, inumber: usize) -> Result<()> {
        if inumber < INODE_TABLE_SIZE {
            Ok(())
        } else {
            Err(Error::InvalidInumber)
        }
    }

    /// 销毁 inode 表。有锁原语中过毒时报错
    pub fn destroy(self) -> Result<()> {
        self.bitmap.into_inner()?;
        for slot in self.slots.into_vec() {
            slot.into_inner()?;
        }
        Ok(())
    }
}
