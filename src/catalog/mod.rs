/*
 * 资产目录模块
 * 开发心理过程:
 * 1. 建立图层/资产的不可变运行时视图,整次生成共享只读借用
 * 2. amount同时承担抽取权重和硬上限两个语义
 * 3. minted是目录中唯一的可变状态,用原子计数器保证并发安全
 * 4. 空图层在构建期剔除,保持"每层至少一个资产"的不变量
 */

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

pub mod scanner;

pub use scanner::scan_layers;

/// 元数据中的一条特征属性（trait_type/value对）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraitAttribute {
    pub trait_type: String,
    pub value: String,
}

/// 图层内的一个候选资产
#[derive(Debug, Serialize, Deserialize)]
pub struct Asset {
    /// 层内唯一标识（非全局唯一）
    pub id: String,
    /// 展示名，也是特征属性的value
    pub name: String,
    /// 视觉内容的绝对路径
    pub media: PathBuf,
    /// 出现目标：既是权重也是硬上限
    pub amount: u32,
    /// 已铸造数，不变量 minted <= amount
    #[serde(skip)]
    minted: AtomicU32,
}

impl Asset {
    pub fn new(id: impl Into<String>, name: impl Into<String>, media: PathBuf, amount: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            media,
            amount,
            minted: AtomicU32::new(0),
        }
    }

    /// 当前铸造数
    pub fn minted(&self) -> u32 {
        self.minted.load(Ordering::SeqCst)
    }

    /// 是否已达到出现上限
    pub fn is_exhausted(&self) -> bool {
        self.minted() >= self.amount
    }

    /// 原子地尝试铸造一次，达到上限时失败
    pub fn try_mint(&self) -> bool {
        self.minted
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |c| {
                if c < self.amount {
                    Some(c + 1)
                } else {
                    None
                }
            })
            .is_ok()
    }

    /// 回滚一次铸造（仅在本线程刚铸造成功后调用）
    pub fn unmint(&self) {
        let _ = self
            .minted
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |c| c.checked_sub(1));
    }

    /// 该资产对指定图层贡献的特征属性
    pub fn attribute(&self, layer_name: &str) -> TraitAttribute {
        TraitAttribute {
            trait_type: layer_name.to_string(),
            value: self.name.clone(),
        }
    }
}

/// 组合元组的一个轴
#[derive(Debug, Serialize, Deserialize)]
pub struct Layer {
    /// 在组合元组中的位置
    pub index: usize,
    /// 展示名（同时是特征属性的trait_type）
    pub name: String,
    pub assets: Vec<Asset>,
}

impl Layer {
    pub fn new(index: usize, name: impl Into<String>, assets: Vec<Asset>) -> Self {
        Self {
            index,
            name: name.into(),
            assets,
        }
    }

    /// 仍可铸造的资产数
    pub fn eligible_count(&self) -> usize {
        self.assets.iter().filter(|a| !a.is_exhausted()).count()
    }

    /// amount大于0的资产数（组合空间的因子）
    pub fn mintable_variants(&self) -> usize {
        self.assets.iter().filter(|a| a.amount > 0).count()
    }

    /// 本层出现目标之和
    pub fn total_amount(&self) -> u64 {
        self.assets.iter().map(|a| u64::from(a.amount)).sum()
    }

    pub fn find_asset(&self, id: &str) -> Option<&Asset> {
        self.assets.iter().find(|a| a.id == id)
    }
}

/// 一次生成运行的不可变图层视图
#[derive(Debug, Serialize, Deserialize)]
pub struct Catalog {
    pub layers: Vec<Layer>,
}

impl Catalog {
    /// 构建目录：剔除空图层并重排位置索引
    pub fn new(layers: Vec<Layer>) -> Self {
        let mut kept: Vec<Layer> = layers
            .into_iter()
            .filter(|l| !l.assets.is_empty())
            .collect();
        for (i, layer) in kept.iter_mut().enumerate() {
            layer.index = i;
        }
        Self { layers: kept }
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn find_layer(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name == name)
    }

    /// 理论组合空间（各层可铸造变体数之积）
    pub fn combination_space(&self) -> u128 {
        self.layers
            .iter()
            .map(|l| l.mintable_variants() as u128)
            .fold(1u128, |acc, n| acc.saturating_mul(n))
    }
}
