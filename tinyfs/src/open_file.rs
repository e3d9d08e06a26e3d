//! # 打开文件表层
//!
//! 定长的打开文件表。句柄即槽位下标。
//!
//! 表级互斥锁保护槽位分配与打开计数；
//! 各表项的互斥锁保护游标与追加标志，I/O 全程持有；
//! 打开计数归零时经由条件变量放行销毁屏障。
//!
//! I/O 路径先取表项锁、再取 inode 锁，与全局锁层级相反。
//! 这不会成环：inode 的建、删、清路径从不触碰表项锁。

use std::sync::{Condvar, Mutex};

use log::debug;

use crate::block_store::BlockStore;
use crate::config::{BLOCK_SIZE, MAX_OPEN_FILES};
use crate::error::{Error, Result};
use crate::inode_table::InodeTable;
use crate::layout::{Bitmap, Inode, MAX_FILE_SIZE};

/// 打开文件的游标：指向的 inode、追加标志与字节偏移
#[derive(Debug)]
struct Cursor {
    inumber: usize,
    append: bool,
    offset: usize,
}

/// 槽位占用与打开计数，二者只在表级互斥锁下同步变化
struct TableState {
    slots: Bitmap,
    open_count: usize,
}

pub struct OpenFileTable {
    state: Mutex<TableState>,
    entries: Box<[Mutex<Option<Cursor>>]>,
    all_closed: Condvar,
}

impl OpenFileTable {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TableState {
                slots: Bitmap::new(MAX_OPEN_FILES),
                open_count: 0,
            }),
            entries: (0..MAX_OPEN_FILES).map(|_| Mutex::new(None)).collect(),
            all_closed: Condvar::new(),
        }
    }

    /// 登记一个打开文件，游标置于文件开头，返回句柄
    pub fn open_entry(&self, inumber: usize, append: bool) -> Result<usize> {
        let mut state = self.state.lock()?;
        let handle = state.slots.alloc().ok_or(Error::OpenFilesExhausted)?;
        state.open_count += 1;

        *self.entries[handle].lock()? = Some(Cursor {
            inumber,
            append,
            offset: 0,
        });
        Ok(handle)
    }

    /// 注销一个打开文件。最后一个关闭者唤醒销毁屏障
    pub fn close_entry(&self, handle: usize) -> Result<()> {
        let mut state = self.state.lock()?;
        if !state.slots.is_taken(handle) {
            return Err(Error::InvalidHandle);
        }

        state.slots.free(handle);
        state.open_count -= 1;
        self.entries[handle].lock()?.take();

        if state.open_count == 0 {
            self.all_closed.notify_all();
        }
        Ok(())
    }

    /// 阻塞到所有打开文件都关闭为止。
    /// 谓词必须循环复查，虚假唤醒不得放行
    pub fn wait_all_closed(&self) -> Result<()> {
        let mut state = self.state.lock()?;
        while state.open_count > 0 {
            state = self.all_closed.wait(state)?;
        }
        Ok(())
    }

    /// 从句柄当前偏移读出至多 `buf.len()` 字节，返回实际读出量。
    /// 0 即已到文件末尾
    pub fn read(
        &self,
        handle: usize,
        buf: &mut [u8],
        inodes: &InodeTable,
        store: &BlockStore,
    ) -> Result<usize> {
        let mut entry = self.entry(handle)?.lock()?;
        let cursor = entry.as_mut().ok_or(Error::InvalidHandle)?;

        let slot = inodes.slot(cursor.inumber)?;
        let guard = slot.read()?;
        let inode = guard.as_ref().ok_or(Error::InvalidInumber)?;

        if cursor.append {
            cursor.offset = inode.size();
        }
        // 文件被别的句柄截断过的话，旧游标就此作废
        if cursor.offset > inode.size() {
            return Err(Error::StaleOffset);
        }

        let to_read = buf.len().min(inode.size() - cursor.offset);
        let mut done = 0;
        while done < to_read {
            let index = cursor.offset / BLOCK_SIZE;
            let within = cursor.offset % BLOCK_SIZE;

            let block = inode.block_at(index, store)?;
            let step = (BLOCK_SIZE - within).min(to_read - done);
            buf[done..done + step].copy_from_slice(
                &store.block(block)?.lock()?.bytes()[within..within + step],
            );

            cursor.offset += step;
            done += step;
        }

        Ok(to_read)
    }

    /// 自句柄当前偏移写入，超出文件容量的部分静默截断，
    /// 返回截断后的写入量。
    /// 追加在拿到 inode 写锁之后才定位到文件末尾，
    /// 不同句柄上的并发追加因此各占互不重叠的区间
    pub fn write(
        &self,
        handle: usize,
        buf: &[u8],
        inodes: &InodeTable,
        store: &BlockStore,
    ) -> Result<usize> {
        let mut entry = self.entry(handle)?.lock()?;
        let cursor = entry.as_mut().ok_or(Error::InvalidHandle)?;

        let slot = inodes.slot(cursor.inumber)?;
        let mut guard = slot.write()?;
        let inode = guard.as_mut().ok_or(Error::InvalidInumber)?;

        if cursor.append {
            cursor.offset = inode.size();
        }
        if cursor.offset > inode.size() {
            return Err(Error::StaleOffset);
        }

        let to_write = buf.len().min(MAX_FILE_SIZE - cursor.offset);
        if to_write < buf.len() {
            debug!("write on handle {handle} clamped to {to_write} bytes");
        }

        let transferred = Self::transfer_in(cursor, inode, &buf[..to_write], store);

        // 中途失败也把已拷入的部分计入大小，不回滚
        inode.grow_size_to(cursor.offset);
        transferred?;

        Ok(to_write)
    }

    /// 按块搬运写入数据，需要时就地扩展 inode
    fn transfer_in(
        cursor: &mut Cursor,
        inode: &mut Inode,
        buf: &[u8],
        store: &BlockStore,
    ) -> Result<()> {
        let mut done = 0;
        while done < buf.len() {
            let index = cursor.offset / BLOCK_SIZE;
            let within = cursor.offset % BLOCK_SIZE;

            if index == inode.block_count() {
                inode.extend(store)?;
            }

            let block = inode.block_at(index, store)?;
            let step = (BLOCK_SIZE - within).min(buf.len() - done);
            store.block(block)?.lock()?.bytes_mut()[within..within + step]
                .copy_from_slice(&buf[done..done + step]);

            cursor.offset += step;
            done += step;
        }
        Ok(())
    }

    fn entry(&self, handle: usize) -> Result<&Mutex<Option<Cursor>>> {
        self.entries.get(handle).ok_or(Error::InvalidHandle)
    }

    /// 销毁打开文件表。有锁原语中过毒时报错
    pub fn destroy(self) -> Result<()> {
        self.state.into_inner()?;
        for entry in self.entries.into_vec() {
            entry.into_inner()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_first_fit_slots() {
        let table = OpenFileTable::new();

        assert_eq!(table.open_entry(1, false).unwrap(), 0);
        assert_eq!(table.open_entry(1, false).unwrap(), 1);

        table.close_entry(0).unwrap();
        assert_eq!(table.open_entry(2, true).unwrap(), 0);
    }

    #[test]
    fn close_rejects_bad_handles() {
        let table = OpenFileTable::new();
        assert!(matches!(table.close_entry(0), Err(Error::InvalidHandle)));
        assert!(matches!(
            table.close_entry(MAX_OPEN_FILES),
            Err(Error::InvalidHandle)
        ));

        let handle = table.open_entry(1, false).unwrap();
        table.close_entry(handle).unwrap();
        assert!(matches!(
            table.close_entry(handle),
            Err(Error::InvalidHandle)
        ));
    }

    #[test]
    fn table_capacity_is_bounded() {
        let table = OpenFileTable::new();
        for _ in 0..MAX_OPEN_FILES {
            table.open_entry(1, false).unwrap();
        }
        assert!(matches!(
            table.open_entry(1, false),
            Err(Error::OpenFilesExhausted)
        ));
    }

    #[test]
    fn barrier_passes_when_nothing_is_open() {
        let table = OpenFileTable::new();
        table.wait_all_closed().unwrap();

        let handle = table.open_entry(1, false).unwrap();
        table.close_entry(handle).unwrap();
        table.wait_all_closed().unwrap();
    }

    #[test]
    fn io_on_a_closed_handle_fails() {
        let table = OpenFileTable::new();
        let inodes = InodeTable::new();
        let store = BlockStore::new();

        let handle = table.open_entry(0, false).unwrap();
        table.close_entry(handle).unwrap();

        let mut buf = [0u8; 4];
        assert!(matches!(
            table.read(handle, &mut buf, &inodes, &store),
            Err(Error::InvalidHandle)
        ));
        assert!(matches!(
            table.write(handle, &buf, &inodes, &store),
            Err(Error::InvalidHandle)
        ));
    }
}
