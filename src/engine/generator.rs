/*
 * 组合生成器 - 为一个物品下标生成一个合法的、解析后的组合
 * 开发心理过程:
 * 1. 按目录顺序逐层抽取,装配候选组合
 * 2. 不允许重复时整体重抽直到组合未知,重抽次数有显式上限
 * 3. 先铸造后提交:铸造用尊重上限的CAS,提交失败或铸造竞争失败都回滚重抽
 * 4. 规则解析和稀有度计算在提交成功之后,不持有任何锁
 */

use log::trace;

use crate::catalog::Catalog;
use crate::engine::{
    pick_mintable, Combination, GenerateError, GenerateResult, GeneratedItem, Pick, RuleSet,
    UniquenessRegistry,
};
use crate::utils::SeededRng;

#[derive(Debug, Clone, Copy)]
pub struct GeneratorOptions {
    /// 系列总数（稀有度概率的分母）
    pub series_count: usize,
    pub allow_duplicates: bool,
    /// 唯一性重抽上限
    pub retry_budget: u32,
}

/// 单个物品的生成器，多个worker各持一份（共享只读目录与注册表）
pub struct CombinationGenerator<'a> {
    catalog: &'a Catalog,
    rules: &'a RuleSet,
    registry: &'a UniquenessRegistry,
    opts: GeneratorOptions,
}

impl<'a> CombinationGenerator<'a> {
    pub fn new(
        catalog: &'a Catalog,
        rules: &'a RuleSet,
        registry: &'a UniquenessRegistry,
        opts: GeneratorOptions,
    ) -> Self {
        Self {
            catalog,
            rules,
            registry,
            opts,
        }
    }

    /// 为指定下标生成一个合法组合
    pub fn generate_one(&self, index: usize, rng: &mut SeededRng) -> GenerateResult<GeneratedItem> {
        let mut attempts: u32 = 0;

        loop {
            if attempts >= self.opts.retry_budget {
                return Err(GenerateError::GenerationExhausted { attempts });
            }
            attempts += 1;

            // 1. 逐层抽取候选
            // 某层瞬时耗尽可能只是别的worker铸造在飞（随后回滚），
            // 按一次失败尝试重抽；真耗尽由预算耗尽兜底
            let mut picks: Vec<Pick<'a>> = Vec::with_capacity(self.catalog.layer_count());
            let mut drained_layer = None;
            for layer in &self.catalog.layers {
                match pick_mintable(layer, rng) {
                    Ok(asset) => picks.push(Pick { layer, asset }),
                    Err(GenerateError::LayerExhausted(name)) => {
                        drained_layer = Some(name);
                        break;
                    }
                    Err(e) => return Err(e),
                }
            }
            if let Some(name) = drained_layer {
                trace!("物品{}第{}次尝试遇到图层'{}'瞬时耗尽", index, attempts, name);
                continue;
            }
            let combination = Combination(picks.iter().map(|p| p.asset.id.clone()).collect());

            // 2. 唯一性预检（便宜的提前退出；真正的判定在try_commit）
            if !self.opts.allow_duplicates && self.registry.is_known(&combination) {
                trace!("物品{}第{}次尝试撞到已知组合", index, attempts);
                continue;
            }

            // 3. 铸造每个选中资产（尊重上限的CAS），竞争失败则回滚重抽
            let mut minted = Vec::with_capacity(picks.len());
            let mut lost_race = false;
            for pick in &picks {
                if pick.asset.try_mint() {
                    minted.push(pick.asset);
                } else {
                    lost_race = true;
                    break;
                }
            }
            if lost_race {
                for asset in minted {
                    asset.unmint();
                }
                continue;
            }

            // 4. 原子提交组合；落败方回滚铸造并重抽
            if !self.opts.allow_duplicates && !self.registry.try_commit(combination.clone()) {
                for asset in minted {
                    asset.unmint();
                }
                continue;
            }

            // 5. 规则解析（提交后、无锁）
            let resolved = self.rules.resolve(&picks);

            // 6. 原始稀有度：各选择出现概率倒数之积（基于解析前的原始选择）
            let series = self.opts.series_count as f64;
            let rarity_raw: f64 = picks
                .iter()
                .map(|p| 1.0 / (f64::from(p.asset.amount) / series))
                .product();

            return Ok(GeneratedItem {
                index,
                combination,
                media: resolved.media,
                attributes: resolved.attributes,
                rarity_raw,
            });
        }
    }
}
