/*
 * 元数据模块 - 集合元数据校验与结果落盘
 * 开发心理过程:
 * 1. 集合级元数据(name/symbol/description)在运行前校验,失败即配置错误
 * 2. 每个物品落盘一个 <index>.json,运行结束落盘 rarity.json
 * 3. OutputPipeline把合成与落盘串成driver可用的ItemSink
 */

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::catalog::TraitAttribute;
use crate::compose::Compositor;
use crate::core::config::CollectionConfig;
use crate::core::error::{AppError, Result};
use crate::engine::{GeneratedItem, ItemSink, RarityRecord};

/// 单个物品的对外元数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemMetadata {
    pub name: String,
    pub symbol: String,
    pub description: String,
    pub image: String,
    pub edition: usize,
    pub attributes: Vec<TraitAttribute>,
}

/// 运行前校验集合级元数据字段
pub fn validate_collection(collection: &CollectionConfig) -> Result<()> {
    if collection.name.trim().is_empty() {
        return Err(AppError::ConfigError("collection.name 不能为空".to_string()));
    }
    if collection.symbol.trim().is_empty() {
        return Err(AppError::ConfigError("collection.symbol 不能为空".to_string()));
    }
    if collection.symbol.chars().any(char::is_whitespace) {
        return Err(AppError::ConfigError(
            "collection.symbol 不能包含空白字符".to_string(),
        ));
    }
    if collection.description.trim().is_empty() {
        return Err(AppError::ConfigError(
            "collection.description 不能为空".to_string(),
        ));
    }
    if collection.base_uri.chars().any(char::is_whitespace) {
        return Err(AppError::ConfigError(
            "collection.base_uri 不能包含空白字符".to_string(),
        ));
    }
    Ok(())
}

/// 结果落盘：按物品下标写元数据JSON，最后写稀有度记录
#[derive(Debug, Clone)]
pub struct JsonSink {
    output_dir: PathBuf,
    collection: CollectionConfig,
}

impl JsonSink {
    pub fn new(output_dir: PathBuf, collection: CollectionConfig) -> Result<Self> {
        fs::create_dir_all(&output_dir)?;
        Ok(Self {
            output_dir,
            collection,
        })
    }

    /// 写出 `<index>.json`
    pub fn write_item(&self, item: &GeneratedItem, image_file: &str) -> Result<PathBuf> {
        let image = if self.collection.base_uri.is_empty() {
            image_file.to_string()
        } else {
            format!(
                "{}/{}",
                self.collection.base_uri.trim_end_matches('/'),
                image_file
            )
        };

        let metadata = ItemMetadata {
            name: format!("{} #{}", self.collection.name, item.index),
            symbol: self.collection.symbol.clone(),
            description: self.collection.description.clone(),
            image,
            edition: item.index,
            attributes: item.attributes.clone(),
        };

        let path = self.output_dir.join(format!("{}.json", item.index));
        let content = serde_json::to_string_pretty(&metadata)?;
        fs::write(&path, content)?;
        debug!("物品{}元数据已写出: {:?}", item.index, path);
        Ok(path)
    }

    /// 写出整个系列的稀有度记录
    pub fn write_rarity(&self, records: &[RarityRecord]) -> Result<PathBuf> {
        let path = self.output_dir.join("rarity.json");
        let content = serde_json::to_string_pretty(records)?;
        fs::write(&path, content)?;
        info!("稀有度记录已写出: {} 条", records.len());
        Ok(path)
    }
}

/// 合成+落盘流水线，worker内逐物品调用
pub struct OutputPipeline {
    pub compositor: Compositor,
    pub sink: JsonSink,
}

impl OutputPipeline {
    pub fn new(compositor: Compositor, sink: JsonSink) -> Self {
        Self { compositor, sink }
    }
}

impl ItemSink for OutputPipeline {
    fn accept(&self, item: &GeneratedItem) -> Result<()> {
        let image_path = self.compositor.compose_to_file(item.index, &item.media)?;
        let image_file = image_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| format!("{}.png", item.index));
        self.sink.write_item(item, &image_file)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::OutputConfig;
    use crate::engine::Combination;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    fn collection() -> CollectionConfig {
        CollectionConfig {
            name: "Test Series".to_string(),
            symbol: "TST".to_string(),
            description: "A test collection".to_string(),
            base_uri: String::new(),
        }
    }

    fn item(index: usize, media: Vec<PathBuf>) -> GeneratedItem {
        GeneratedItem {
            index,
            combination: Combination(vec!["blue".to_string()]),
            media,
            attributes: vec![TraitAttribute {
                trait_type: "background".to_string(),
                value: "Blue".to_string(),
            }],
            rarity_raw: 2.0,
        }
    }

    #[test]
    fn test_validate_collection_ok() {
        assert!(validate_collection(&collection()).is_ok());
    }

    #[test]
    fn test_validate_collection_rejects_empty_fields() {
        let mut c = collection();
        c.name = "  ".to_string();
        assert!(validate_collection(&c).is_err());

        let mut c = collection();
        c.symbol = "T ST".to_string();
        assert!(validate_collection(&c).is_err());

        let mut c = collection();
        c.description = String::new();
        assert!(validate_collection(&c).is_err());
    }

    #[test]
    fn test_write_item_metadata() {
        let temp = TempDir::new().unwrap();
        let sink = JsonSink::new(temp.path().to_path_buf(), collection()).unwrap();

        let path = sink.write_item(&item(3, vec![]), "3.png").unwrap();
        assert_eq!(path, temp.path().join("3.json"));

        let content = fs::read_to_string(&path).unwrap();
        let parsed: ItemMetadata = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.name, "Test Series #3");
        assert_eq!(parsed.edition, 3);
        assert_eq!(parsed.image, "3.png");
        assert_eq!(parsed.attributes.len(), 1);
        assert_eq!(parsed.attributes[0].trait_type, "background");
    }

    #[test]
    fn test_write_item_with_base_uri() {
        let temp = TempDir::new().unwrap();
        let mut c = collection();
        c.base_uri = "ipfs://QmHash/".to_string();
        let sink = JsonSink::new(temp.path().to_path_buf(), c).unwrap();

        let path = sink.write_item(&item(0, vec![]), "0.png").unwrap();
        let parsed: ItemMetadata =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.image, "ipfs://QmHash/0.png");
    }

    #[test]
    fn test_write_rarity_records() {
        let temp = TempDir::new().unwrap();
        let sink = JsonSink::new(temp.path().to_path_buf(), collection()).unwrap();

        let records = vec![RarityRecord {
            index: 0,
            score: 100.0,
            combination: Combination(vec!["blue".to_string()]),
            created_at: chrono::Utc::now(),
        }];
        let path = sink.write_rarity(&records).unwrap();

        let parsed: Vec<RarityRecord> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].index, 0);
    }

    #[test]
    fn test_pipeline_composes_and_writes() {
        let temp = TempDir::new().unwrap();
        let media_dir = temp.path().join("media");
        fs::create_dir(&media_dir).unwrap();
        let layer = media_dir.join("blue.png");
        RgbaImage::from_pixel(2, 2, Rgba([0, 0, 255, 255]))
            .save(&layer)
            .unwrap();

        let out_dir = temp.path().join("out");
        let output = OutputConfig {
            image_width: None,
            image_height: None,
            write_rarity: true,
        };
        let pipeline = OutputPipeline::new(
            Compositor::new(&output, &out_dir),
            JsonSink::new(out_dir.clone(), collection()).unwrap(),
        );

        pipeline.accept(&item(5, vec![layer])).unwrap();
        assert!(out_dir.join("5.png").exists());
        assert!(out_dir.join("5.json").exists());
    }
}
