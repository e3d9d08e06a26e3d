//! # 数据块仓库层
//!
//! 定长的块域加一张空闲/占用位图。
//! 位图由分配器互斥锁保护；每个块各有互斥锁保护其内容。
//! 块域在仓库存续期内不会移动，所以取块无须经过分配器锁。
//!
//! 同一片块域混存三种内容：文件字节、目录项、间接引用，
//! 具体解释由引用它的 inode 与位置决定，
//! 类型化视图（[`Block::map`] / [`Block::map_mut`]）负责转换。

use core::mem;
use std::sync::Mutex;

use crate::config::{BLOCK_SIZE, DATA_BLOCKS};
use crate::delay;
use crate::error::{Error, Result};
use crate::layout::Bitmap;

/// 数据块编号
pub type BlockId = u32;

/// 定长字节块，分配与 I/O 分块的单位。
/// 对齐到 8 字节，保证各种类型化视图都落在合法地址上
#[repr(C, align(8))]
pub struct Block {
    bytes: [u8; BLOCK_SIZE],
}

impl Block {
    const fn zeroed() -> Self {
        Self {
            bytes: [0; BLOCK_SIZE],
        }
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// 以类型化视图读取块内容并处理
    #[inline]
    pub fn map<T: Sized, V>(&self, f: impl FnOnce(&T) -> V) -> V {
        f(self.get())
    }

    /// 以类型化视图修改块内容
    #[inline]
    pub fn map_mut<T: Sized, V>(&mut self, f: impl FnOnce(&mut T) -> V) -> V {
        f(self.get_mut())
    }

    fn get<T: Sized>(&self) -> &T {
        Self::assert_fits::<T>();
        let addr = self.bytes.as_ptr().cast();
        unsafe { &*addr }
    }

    fn get_mut<T: Sized>(&mut self) -> &mut T {
        Self::assert_fits::<T>();
        let addr = self.bytes.as_mut_ptr().cast();
        unsafe { &mut *addr }
    }

    /// 视图始于块首，大小与对齐都不得越出块
    fn assert_fits<T: Sized>() {
        assert!(mem::size_of::<T>() <= BLOCK_SIZE);
        assert!(mem::align_of::<T>() <= mem::align_of::<Block>());
    }
}

/// 数据块仓库。每个块同一时刻至多属于一个 inode
pub struct BlockStore {
    bitmap: Mutex<Bitmap>,
    blocks: Box<[Mutex<Block>]>,
}

impl BlockStore {
    pub fn new() -> Self {
        Self {
            bitmap: Mutex::new(Bitmap::new(DATA_BLOCKS)),
            blocks: (0..DATA_BLOCKS).map(|_| Mutex::new(Block::zeroed())).collect(),
        }
    }

    /// 首次适应分配一个块。
    /// 注意块内容不清零，依赖零初始化的调用者（目录创建）必须自己来
    pub fn alloc(&self) -> Result<BlockId> {
        let mut bitmap = self.bitmap.lock()?;
        bitmap
            .alloc()
            .map(|block| block as BlockId)
            .ok_or(Error::BlocksExhausted)
    }

    /// 归还一个块。重复归还是调用方违约
    pub fn free(&self, block: BlockId) -> Result<()> {
        let index = block as usize;
        if index >= DATA_BLOCKS {
            return Err(Error::InvalidBlock);
        }

        self.bitmap.lock()?.free(index);
        Ok(())
    }

    /// 取指定块。返回的引用在仓库存续期内保持有效
    pub fn block(&self, block: BlockId) -> Result<&Mutex<Block>> {
        delay::storage_delay();
        self.blocks.get(block as usize).ok_or(Error::InvalidBlock)
    }

    /// 销毁仓库。有块锁中过毒时报错
    pub fn destroy(self) -> Result<()> {
        self.bitmap.into_inner()?;
        for block in self.blocks.into_vec() {
            block.into_inner()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_free_realloc() {
        let store = BlockStore::new();

        let a = store.alloc().unwrap();
        let b = store.alloc().unwrap();
        assert_ne!(a, b);

        store.free(a).unwrap();
        // 首次适应：刚归还的块马上被复用
        assert_eq!(store.alloc().unwrap(), a);
    }

    #[test]
    fn rejects_out_of_range_blocks() {
        let store = BlockStore::new();
        assert!(matches!(
            store.free(DATA_BLOCKS as BlockId),
            Err(Error::InvalidBlock)
        ));
        assert!(matches!(
            store.block(DATA_BLOCKS as BlockId),
            Err(Error::InvalidBlock)
        ));
    }

    #[test]
    fn block_contents_survive_a_round_trip() {
        let store = BlockStore::new();
        let id = store.alloc().unwrap();

        store.block(id).unwrap().lock().unwrap().bytes_mut()[..4].copy_from_slice(b"abcd");
        let block = store.block(id).unwrap().lock().unwrap();
        assert_eq!(&block.bytes()[..4], b"abcd");
    }

    #[test]
    fn typed_views_see_the_same_bytes() {
        let store = BlockStore::new();
        let id = store.alloc().unwrap();
        let mut block = store.block(id).unwrap().lock().unwrap();

        block.map_mut(|words: &mut [u32; BLOCK_SIZE / 4]| words[0] = 0x2a);
        assert_eq!(block.map(|words: &[u32; BLOCK_SIZE / 4]| words[0]), 0x2a);
    }
}
