// 抽取器 - 从图层中抽取一个尚未耗尽的资产
// 开发心理：在未耗尽资产间均匀抽取；权重语义是隐式的——
// amount大的资产更晚耗尽，整次运行中被抽中的期望次数与amount成比例

use crate::catalog::{Asset, Layer};
use crate::engine::{GenerateError, GenerateResult};
use crate::utils::SeededRng;

/// 从图层中均匀抽取一个可铸造资产
///
/// 正确的驱动逻辑下本函数不会在耗尽的图层上被调用；
/// `LayerExhausted`意味着别处的逻辑错误，按致命处理。
pub fn pick_mintable<'a>(layer: &'a Layer, rng: &mut SeededRng) -> GenerateResult<&'a Asset> {
    let eligible: Vec<&Asset> = layer.assets.iter().filter(|a| !a.is_exhausted()).collect();

    match rng.index(eligible.len()) {
        Some(i) => Ok(eligible[i]),
        None => Err(GenerateError::LayerExhausted(layer.name.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::path::PathBuf;

    fn asset(id: &str, amount: u32) -> Asset {
        Asset::new(id, id, PathBuf::from(format!("/tmp/{}.png", id)), amount)
    }

    #[test]
    fn test_pick_only_eligible() {
        let layer = Layer::new(0, "bg", vec![asset("a", 0), asset("b", 5)]);
        let mut rng = SeededRng::with_seed(1);

        for _ in 0..50 {
            let picked = pick_mintable(&layer, &mut rng).unwrap();
            assert_eq!(picked.id, "b");
        }
    }

    #[test]
    fn test_pick_exhausted_layer_fails() {
        let layer = Layer::new(0, "bg", vec![asset("a", 1)]);
        assert!(layer.assets[0].try_mint());

        let mut rng = SeededRng::with_seed(1);
        match pick_mintable(&layer, &mut rng) {
            Err(GenerateError::LayerExhausted(name)) => assert_eq!(name, "bg"),
            other => panic!("Expected LayerExhausted, got {:?}", other),
        }
    }

    #[test]
    fn test_pick_reaches_all_eligible() {
        let layer = Layer::new(0, "bg", vec![asset("a", 1), asset("b", 1), asset("c", 1)]);
        let mut rng = SeededRng::with_seed(7);

        let mut seen = HashSet::new();
        for _ in 0..200 {
            seen.insert(pick_mintable(&layer, &mut rng).unwrap().id.clone());
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_exhaustion_shrinks_pool() {
        let layer = Layer::new(0, "bg", vec![asset("a", 1), asset("b", 9)]);
        // 耗尽a后只能抽到b
        assert!(layer.assets[0].try_mint());

        let mut rng = SeededRng::with_seed(11);
        for _ in 0..50 {
            assert_eq!(pick_mintable(&layer, &mut rng).unwrap().id, "b");
        }
    }
}
