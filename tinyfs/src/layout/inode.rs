//! # inode
//!
//! 文件数据块的索引编码：
//! - 前 [`INODE_DIRECT_REFS`] 个编号内嵌于 inode（直接引用）
//! - 其余编号连续存放在一个间接引用块里，该块在
//!   越过直接引用的那一刻才被分配，每个 inode 至多一个

use core::mem;

use crate::block_store::{BlockId, BlockStore};
use crate::config::{BLOCK_SIZE, INODE_DIRECT_REFS};
use crate::error::{Error, Result};

/// 间接引用块的编号容量
pub const MAX_INDIRECT_REFS: usize = BLOCK_SIZE / mem::size_of::<BlockId>();
/// 单个文件的字节容量
pub const MAX_FILE_SIZE: usize = BLOCK_SIZE * (INODE_DIRECT_REFS + MAX_INDIRECT_REFS);

/// 间接引用块的类型化视图：整块连续存储数据块编号
pub type IndirectBlock = [BlockId; MAX_INDIRECT_REFS];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InodeKind {
    File,
    Directory,
}

/// 单个文件或目录的元数据：类型、字节大小与有序的数据块编号表。
///
/// 恰有前 block_count 个编号有效，直接引用在先、间接引用随后；
/// size 不超过 block_count 个块的容量；
/// 未越过直接引用时 indirect 必为空
#[derive(Debug)]
pub struct Inode {
    kind: InodeKind,
    size: usize,
    block_count: usize,
    direct: [BlockId; INODE_DIRECT_REFS],
    indirect: Option<BlockId>,
}

impl Inode {
    pub fn new(kind: InodeKind) -> Self {
        Self {
            kind,
            size: 0,
            block_count: 0,
            direct: [0; INODE_DIRECT_REFS],
            indirect: None,
        }
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.kind == InodeKind::Directory
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn block_count(&self) -> usize {
        self.block_count
    }

    /// 写入越过文件末尾后抬高 size，封顶于文件容量
    #[inline]
    pub fn grow_size_to(&mut self, offset: usize) {
        self.size = self.size.max(offset).min(MAX_FILE_SIZE);
    }

    /// 追加分配一个数据块并返回其编号。
    /// 首次越过直接引用时先分配间接引用块；
    /// 间接引用块分配失败的话，回退刚拿到的内容块
    pub fn extend(&mut self, store: &BlockStore) -> Result<BlockId> {
        if self.block_count >= INODE_DIRECT_REFS + MAX_INDIRECT_REFS {
            return Err(Error::FileFull);
        }

        let block = store.alloc()?;

        if self.block_count < INODE_DIRECT_REFS {
            self.direct[self.block_count] = block;
        } else {
            let indirect = match self.indirect {
                Some(indirect) => indirect,
                None => match store.alloc() {
                    Ok(indirect) => {
                        self.indirect = Some(indirect);
                        indirect
                    }
                    Err(e) => {
                        store.free(block)?;
                        return Err(e);
                    }
                },
            };

            let slot = self.block_count - INODE_DIRECT_REFS;
            if let Err(e) = Self::set_indirect_ref(store, indirect, slot, block) {
                store.free(block)?;
                return Err(e);
            }
        }

        self.block_count += 1;
        Ok(block)
    }

    fn set_indirect_ref(
        store: &BlockStore,
        indirect: BlockId,
        slot: usize,
        block: BlockId,
    ) -> Result<()> {
        store
            .block(indirect)?
            .lock()?
            .map_mut(|refs: &mut IndirectBlock| refs[slot] = block);
        Ok(())
    }

    /// 逻辑块索引到数据块编号
    pub fn block_at(&self, index: usize, store: &BlockStore) -> Result<BlockId> {
        if index >= self.block_count {
            return Err(Error::InvalidBlock);
        }

        if index < INODE_DIRECT_REFS {
            Ok(self.direct[index])
        } else {
            let indirect = self.indirect.ok_or(Error::InvalidBlock)?;
            let slot = index - INODE_DIRECT_REFS;
            Ok(store
                .block(indirect)?
                .lock()?
                .map(|refs: &IndirectBlock| refs[slot]))
        }
    }

    /// 释放全部数据块并清零大小。
    /// 先收集待释放的编号（直接引用、间接引用、间接引用块本身），
    /// 再统一归还，持有块锁时不去碰分配器
    pub fn clear(&mut self, store: &BlockStore) -> Result<()> {
        let mut dropped: Vec<BlockId> = Vec::with_capacity(self.block_count + 1);
        dropped.extend_from_slice(&self.direct[..self.block_count.min(INODE_DIRECT_REFS)]);

        if let Some(indirect) = self.indirect.take() {
            let spilled = self.block_count.saturating_sub(INODE_DIRECT_REFS);
            store.block(indirect)?.lock()?.map(|refs: &IndirectBlock| {
                dropped.extend_from_slice(&refs[..spilled]);
            });
            dropped.push(indirect);
        }

        self.size = 0;
        self.block_count = 0;

        for block in dropped {
            store.free(block)?;
        }

        Ok(())
    }
}
