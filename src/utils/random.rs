/*
* 开发心理过程：
* 1. 封装可重现的随机数生成器，便于测试和复盘
* 2. 基于ChaCha8，主种子派生独立工作流，避免线程间序列重叠
* 3. 提供下标抽取、切片抽取和权重抽取三类常用接口
*/

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// 可重现随机数生成器
#[derive(Debug, Clone)]
pub struct SeededRng {
    rng: ChaCha8Rng,
    seed: u64,
}

impl SeededRng {
    /// 取熵创建
    pub fn new() -> Self {
        Self::with_seed(rand::random::<u64>())
    }

    /// 使用指定种子创建
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// 从主种子派生第stream号独立流
    pub fn derive_stream(master: u64, stream: u64) -> Self {
        // SplitMix64的黄金比例常数打散stream，避免相邻种子相关
        let mixed = master ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15);
        Self::with_seed(mixed)
    }

    /// 获取种子
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// 生成 [0, len) 的下标，len为0时返回None
    pub fn index(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            None
        } else {
            Some(self.rng.gen_range(0..len))
        }
    }

    /// 均匀抽取切片元素
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        self.index(items.len()).map(|i| &items[i])
    }

    /// 按权重抽取下标，权重全为0或为空时返回None
    pub fn pick_weighted(&mut self, weights: &[u32]) -> Option<usize> {
        let total: u64 = weights.iter().map(|w| u64::from(*w)).sum();
        if total == 0 {
            return None;
        }
        let mut roll = self.rng.gen_range(0..total);
        for (i, w) in weights.iter().enumerate() {
            let w = u64::from(*w);
            if roll < w {
                return Some(i);
            }
            roll -= w;
        }
        None
    }
}

impl Default for SeededRng {
    fn default() -> Self {
        Self::new()
    }
}
