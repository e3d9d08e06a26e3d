use core::mem;

use crate::config::{BLOCK_SIZE, MAX_FILE_NAME};

/// 单个内容块可容纳的目录项数
pub const MAX_DIR_ENTRIES: usize = BLOCK_SIZE / mem::size_of::<DirEntry>();

/// 目录内容块的类型化视图
pub type DirBlock = [DirEntry; MAX_DIR_ENTRIES];

/// 空槽位记号
const VACANT: i32 = -1;

/// 目录项：定宽文件名 + 子 inode 编号
#[derive(Debug, Clone)]
#[repr(C)]
pub struct DirEntry {
    // 有效部分以 \0 结尾，末字节恒为 \0
    name: [u8; MAX_FILE_NAME],
    inumber: i32,
}

impl DirEntry {
    /// 槽位上的子 inode 编号，空槽位返回空
    #[inline]
    pub fn inumber(&self) -> Option<usize> {
        (self.inumber != VACANT).then_some(self.inumber as usize)
    }

    /// 把槽位标记为空。新目录的整块目录项都要经过此初始化，
    /// 块内容不清零，名字字段可能残留旧数据
    #[inline]
    pub fn vacate(&mut self) {
        self.inumber = VACANT;
    }

    /// 填入一条目录项。名字截断至 MAX_FILE_NAME-1 字节并补 \0
    pub fn fill(&mut self, name: &str, inumber: usize) {
        let bytes = name.as_bytes();
        let len = bytes.len().min(MAX_FILE_NAME - 1);
        self.name[..len].copy_from_slice(&bytes[..len]);
        self.name[len..].fill(0);
        self.inumber = inumber as i32;
    }

    /// 存储名与查询名的前 MAX_FILE_NAME 字节逐字节比较。
    /// 超长的查询名永远不会命中，因为存储名在填入时已被截断
    pub fn matches(&self, name: &str) -> bool {
        if self.inumber == VACANT {
            return false;
        }

        let query = name.as_bytes();
        self.stored_name() == &query[..query.len().min(MAX_FILE_NAME)]
    }

    /// 存储名的有效部分（到首个 \0 为止）
    fn stored_name(&self) -> &[u8] {
        let len = self.name.iter().position(|&c| c == 0).unwrap_or(MAX_FILE_NAME);
        &self.name[..len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> DirEntry {
        DirEntry {
            name: [0xee; MAX_FILE_NAME],
            inumber: 0,
        }
    }

    #[test]
    fn fill_then_match() {
        let mut entry = entry();
        entry.fill("notes", 7);

        assert_eq!(entry.inumber(), Some(7));
        assert!(entry.matches("notes"));
        assert!(!entry.matches("notes2"));
        assert!(!entry.matches("note"));
    }

    #[test]
    fn vacant_entry_matches_nothing() {
        let mut entry = entry();
        entry.vacate();

        assert_eq!(entry.inumber(), None);
        assert!(!entry.matches(""));
        assert!(!entry.matches("anything"));
    }

    #[test]
    fn long_names_are_truncated() {
        let long: String = "x".repeat(MAX_FILE_NAME + 5);
        let mut entry = entry();
        entry.fill(&long, 1);

        // 截断后的存储名只能与等长的查询名匹配
        assert!(entry.matches(&long[..MAX_FILE_NAME - 1]));
        assert!(!entry.matches(&long));
    }

    #[test]
    fn dir_block_fits_in_a_block() {
        assert!(mem::size_of::<DirBlock>() <= BLOCK_SIZE);
        assert!(MAX_DIR_ENTRIES > 0);
    }
}
