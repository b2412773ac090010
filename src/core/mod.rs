// 核心模块 - 错误类型与配置管理
// 开发心理：所有上层模块共享同一套错误与配置语义

pub mod error;
pub mod config;

pub use error::{AppError, ErrorSeverity, Result};
pub use config::{CollectionConfig, EngineConfig, GenerationConfig, LayoutConfig, OutputConfig};
