// 唯一性注册表 - 记录所有已接受的组合
// 开发心理：check-then-commit必须是单个临界区内的一个操作，
// 否则两个worker可能同时提交同一组合；哈希索引保证查询亚线性

use std::collections::HashSet;
use std::sync::Mutex;

use crate::engine::Combination;

/// 线程安全的组合注册表
#[derive(Debug, Default)]
pub struct UniquenessRegistry {
    inner: Mutex<HashSet<Combination>>,
}

impl UniquenessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 组合是否已被接受
    pub fn is_known(&self, combination: &Combination) -> bool {
        self.inner
            .lock()
            .map(|set| set.contains(combination))
            .unwrap_or(true)
    }

    /// 原子的check-then-commit：首次提交返回true，重复提交返回false
    pub fn try_commit(&self, combination: Combination) -> bool {
        self.inner
            .lock()
            .map(|mut set| set.insert(combination))
            .unwrap_or(false)
    }

    /// 已提交的组合数
    pub fn len(&self) -> usize {
        self.inner.lock().map(|set| set.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
