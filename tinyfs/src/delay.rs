//! # 存储访问延迟模拟
//!
//! 状态核心的数据逻辑上位于二级存储。访问它们时插入空转延迟，
//! 模拟真实存储的访问耗时，顺带放大加锁不当造成的竞态窗口。

use std::hint;

use crate::config::DELAY;

/// 空转 [`DELAY`] 次。`black_box` 阻止整个循环被优化掉
#[inline]
pub(crate) fn storage_delay() {
    for _ in 0..DELAY {
        hint::black_box(());
    }
}
