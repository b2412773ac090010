// 生成式NFT组合引擎库入口
// 开发心理：模块化设计，核心生成算法与IO外围分离，便于测试和部署
// 架构：catalog提供不可变资产视图，engine负责组合生成，compose/metadata负责落盘

pub mod core;
pub mod utils;
pub mod catalog;
pub mod engine;
pub mod compose;
pub mod metadata;

pub use crate::core::config::EngineConfig;
pub use crate::core::error::{AppError, Result};
pub use crate::catalog::{Asset, Catalog, Layer, TraitAttribute};
pub use crate::engine::{
    Combination, GenerateError, GeneratedItem, RuleSet, SeriesDriver, SeriesOptions,
    UniquenessRegistry,
};

/// 版本号（来自Cargo.toml）
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_matches_manifest() {
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
        assert!(!VERSION.is_empty());
    }
}
