/*
* 开发心理过程：
* 1. 创建引擎配置管理系统，支持TOML和JSON两种配置来源
* 2. 实现配置的加载、保存和验证功能
* 3. 提供类型安全的配置访问接口
* 4. 集成环境变量覆盖，便于容器化部署
* 5. 保留custom字段承载未建模的扩展配置
*/

use serde::{Deserialize, Serialize};
use std::{collections::HashMap, env, fs, path::{Path, PathBuf}};

use crate::core::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub generation: GenerationConfig,
    pub layout: LayoutConfig,
    pub output: OutputConfig,
    pub collection: CollectionConfig,
    #[serde(default)]
    pub custom: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// 本次系列要生成的物品总数
    pub count: usize,
    /// 并发工作线程上限，None表示按CPU核数
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_limit: Option<usize>,
    /// 是否允许重复组合
    pub allow_duplicates: bool,
    /// 唯一性重抽的尝试上限
    pub retry_budget: u32,
    /// 主随机种子，None表示取熵
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// 图层目录根（子目录按 NN_name 排序）
    pub layers_dir: PathBuf,
    /// 规则文件，缺省为 layers_dir 旁的 rules.json
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules_file: Option<PathBuf>,
    /// 输出目录（图像与元数据）
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// 画布宽度，None表示取首个图层图像的尺寸
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_width: Option<u32>,
    /// 画布高度
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_height: Option<u32>,
    /// 是否输出 rarity.json
    pub write_rarity: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    pub name: String,
    pub symbol: String,
    pub description: String,
    /// 元数据中image字段的前缀，空表示使用相对文件名
    #[serde(default)]
    pub base_uri: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            generation: GenerationConfig::default(),
            layout: LayoutConfig::default(),
            output: OutputConfig::default(),
            collection: CollectionConfig::default(),
            custom: HashMap::new(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            count: 100,
            worker_limit: None,
            allow_duplicates: false,
            retry_budget: 1024,
            seed: None,
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            layers_dir: PathBuf::from("layers"),
            rules_file: None,
            output_dir: PathBuf::from("output"),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            image_width: None,
            image_height: None,
            write_rarity: true,
        }
    }
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            name: "Untitled Series".to_string(),
            symbol: "UNT".to_string(),
            description: "Generated collection".to_string(),
            base_uri: String::new(),
        }
    }
}

impl EngineConfig {
    /// 从文件加载配置，按扩展名选择TOML或JSON
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| AppError::ConfigError(format!("读取配置文件失败 {:?}: {}", path, e)))?;

        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            _ => toml::from_str(&content)?,
        };

        Ok(config)
    }

    /// 保存为TOML
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)
            .map_err(|e| AppError::ConfigError(format!("写入配置文件失败 {:?}: {}", path, e)))?;
        Ok(())
    }

    /// 应用 NFTGEN_* 环境变量覆盖
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = env::var("NFTGEN_COUNT") {
            if let Ok(count) = v.parse() {
                self.generation.count = count;
            }
        }
        if let Ok(v) = env::var("NFTGEN_WORKERS") {
            if let Ok(workers) = v.parse() {
                self.generation.worker_limit = Some(workers);
            }
        }
        if let Ok(v) = env::var("NFTGEN_SEED") {
            if let Ok(seed) = v.parse() {
                self.generation.seed = Some(seed);
            }
        }
        if let Ok(v) = env::var("NFTGEN_ALLOW_DUPLICATES") {
            self.generation.allow_duplicates = matches!(v.as_str(), "1" | "true" | "yes");
        }
        if let Ok(v) = env::var("NFTGEN_LAYERS_DIR") {
            self.layout.layers_dir = PathBuf::from(v);
        }
        if let Ok(v) = env::var("NFTGEN_OUTPUT_DIR") {
            self.layout.output_dir = PathBuf::from(v);
        }
    }

    /// 运行前的配置校验
    pub fn validate(&self) -> Result<()> {
        if self.generation.count == 0 {
            return Err(AppError::ConfigError("generation.count 必须大于0".to_string()));
        }
        if self.generation.retry_budget == 0 {
            return Err(AppError::ConfigError(
                "generation.retry_budget 必须大于0".to_string(),
            ));
        }
        if let Some(workers) = self.generation.worker_limit {
            if workers == 0 {
                return Err(AppError::ConfigError(
                    "generation.worker_limit 不能为0".to_string(),
                ));
            }
        }
        if self.layout.layers_dir.as_os_str().is_empty() {
            return Err(AppError::ConfigError("layout.layers_dir 不能为空".to_string()));
        }
        if self.layout.output_dir.as_os_str().is_empty() {
            return Err(AppError::ConfigError("layout.output_dir 不能为空".to_string()));
        }
        Ok(())
    }

    /// 规则文件路径，缺省为 layers_dir 同级的 rules.json
    pub fn rules_file(&self) -> PathBuf {
        self.layout
            .rules_file
            .clone()
            .unwrap_or_else(|| self.layout.layers_dir.join("rules.json"))
    }

    /// 有效工作线程数
    pub fn effective_workers(&self) -> usize {
        self.generation.worker_limit.unwrap_or_else(num_cpus::get).max(1)
    }
}
