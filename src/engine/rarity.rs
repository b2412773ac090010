// 稀有度记录与归一化
// 开发心理：原始分数是各选择出现概率倒数之积，量纲随层数爆炸，
// 运行结束后线性缩放到0-100便于展示；缩放保序，min映射0，max映射100

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::{Combination, GeneratedItem};

/// 归一化后的展示量程上限
pub const NORMALIZED_MAX: f64 = 100.0;

/// 一个成功生成物品的稀有度记录，归一化后不再变更
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RarityRecord {
    pub index: usize,
    pub score: f64,
    pub combination: Combination,
    pub created_at: DateTime<Utc>,
}

impl RarityRecord {
    pub fn from_item(item: &GeneratedItem) -> Self {
        Self {
            index: item.index,
            score: item.rarity_raw,
            combination: item.combination.clone(),
            created_at: Utc::now(),
        }
    }
}

/// 就地把原始分数线性缩放到 [0, 100]
///
/// 零跨度（全系列同分）的退化情形：全部映射为100。
pub fn normalize_scores(records: &mut [RarityRecord]) {
    let Some(min) = records.iter().map(|r| r.score).reduce(f64::min) else {
        return;
    };
    let max = records.iter().map(|r| r.score).fold(min, f64::max);
    let span = max - min;

    for record in records.iter_mut() {
        record.score = if span > 0.0 {
            (record.score - min) / span * NORMALIZED_MAX
        } else {
            NORMALIZED_MAX
        };
    }
}
