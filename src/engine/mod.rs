/*
 * 特征组合生成引擎
 * 开发心理过程:
 * 1. 这是仓库的算法核心:加权抽取+全局唯一性+规则改写
 * 2. 目录和规则集整次运行只读共享,唯一性注册表和铸造计数是仅有的共享可变状态
 * 3. 错误分级:配置/容量错误在运行前拒绝,生成期错误中止整次运行并保留部分结果
 */

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::catalog::{Asset, Layer, TraitAttribute};

pub mod selector;
pub mod registry;
pub mod rules;
pub mod generator;
pub mod rarity;
pub mod driver;

pub use selector::pick_mintable;
pub use registry::UniquenessRegistry;
pub use rules::{OrderInstruction, ReplaceInstruction, ReplaceOp, ResolvedPicks, Rule, RuleAction, RuleSet};
pub use generator::CombinationGenerator;
pub use rarity::{normalize_scores, RarityRecord};
pub use driver::{validate, ItemSink, PreflightReport, SeriesDriver, SeriesFailure, SeriesOptions, SeriesReport};

#[derive(Debug, Clone, Error)]
pub enum GenerateError {
    #[error("Invalid rule configuration: {0}")]
    Configuration(String),
    #[error("Insufficient capacity: {0}")]
    Capacity(String),
    #[error("Layer '{0}' has no mintable asset left")]
    LayerExhausted(String),
    #[error("Uniqueness retry budget exhausted after {attempts} attempts")]
    GenerationExhausted { attempts: u32 },
    #[error("Worker thread failure: {0}")]
    Worker(String),
}

pub type GenerateResult<T> = std::result::Result<T, GenerateError>;

/// 一次组合:各层选中资产id的有序序列(即"hash")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Combination(pub Vec<String>);

impl Combination {
    pub fn key(&self) -> String {
        self.0.join("|")
    }
}

/// 生成过程中对一层的选择
#[derive(Debug, Clone, Copy)]
pub struct Pick<'a> {
    pub layer: &'a Layer,
    pub asset: &'a Asset,
}

/// 一个成功生成的物品:组合、解析后的媒体序列、属性和原始稀有度
#[derive(Debug, Clone)]
pub struct GeneratedItem {
    pub index: usize,
    pub combination: Combination,
    pub media: Vec<PathBuf>,
    pub attributes: Vec<TraitAttribute>,
    pub rarity_raw: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combination_equality() {
        let a = Combination(vec!["blue".into(), "slim".into()]);
        let b = Combination(vec!["blue".into(), "slim".into()]);
        let c = Combination(vec!["slim".into(), "blue".into()]);

        assert_eq!(a, b);
        // 顺序不同即是不同组合
        assert_ne!(a, c);
        assert_eq!(a.key(), "blue|slim");
    }

    #[test]
    fn test_error_messages() {
        let e = GenerateError::LayerExhausted("background".to_string());
        assert!(e.to_string().contains("background"));

        let e = GenerateError::GenerationExhausted { attempts: 1024 };
        assert!(e.to_string().contains("1024"));

        // 线程创建失败是worker故障，报文不得指向输出sink
        let e = GenerateError::Worker("failed to spawn thread: EAGAIN".to_string());
        assert!(e.to_string().contains("Worker thread failure"));
        assert!(!e.to_string().contains("sink"));
    }
}
