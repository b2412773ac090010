// 错误处理系统
// 开发心理：统一的错误类型系统，提供清晰的错误信息和严重程度划分
// 使用Rust的Result类型确保错误处理的安全性和一致性

use std::{error::Error as StdError, fmt, io};

use crate::engine::GenerateError;

// 应用主要错误类型
#[derive(Debug, Clone)]
pub enum AppError {
    // 配置相关错误
    ConfigError(String),
    InvalidInput(String),

    // 目录/资产相关错误
    CatalogError(String),
    AssetError(String),

    // 生成相关错误
    CapacityError(String),
    GenerationError(String),

    // IO错误
    FileError(String),
    ParseError(String),
    ImageError(String),

    // 通用错误
    Unknown(String),
}

// 便捷的Result类型别名
pub type Result<T> = std::result::Result<T, AppError>;

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::ConfigError(msg) => write!(f, "配置错误: {}", msg),
            AppError::InvalidInput(msg) => write!(f, "输入无效: {}", msg),

            AppError::CatalogError(msg) => write!(f, "图层目录错误: {}", msg),
            AppError::AssetError(msg) => write!(f, "资产错误: {}", msg),

            AppError::CapacityError(msg) => write!(f, "容量不足: {}", msg),
            AppError::GenerationError(msg) => write!(f, "生成错误: {}", msg),

            AppError::FileError(msg) => write!(f, "文件错误: {}", msg),
            AppError::ParseError(msg) => write!(f, "解析错误: {}", msg),
            AppError::ImageError(msg) => write!(f, "图像错误: {}", msg),

            AppError::Unknown(msg) => write!(f, "未知错误: {}", msg),
        }
    }
}

impl StdError for AppError {}

// 错误转换实现
impl From<io::Error> for AppError {
    fn from(error: io::Error) -> Self {
        AppError::FileError(error.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        AppError::ParseError(error.to_string())
    }
}

impl From<toml::de::Error> for AppError {
    fn from(error: toml::de::Error) -> Self {
        AppError::ConfigError(error.to_string())
    }
}

impl From<toml::ser::Error> for AppError {
    fn from(error: toml::ser::Error) -> Self {
        AppError::ConfigError(error.to_string())
    }
}

impl From<image::ImageError> for AppError {
    fn from(error: image::ImageError) -> Self {
        AppError::ImageError(error.to_string())
    }
}

impl From<GenerateError> for AppError {
    fn from(error: GenerateError) -> Self {
        match error {
            GenerateError::Configuration(msg) => AppError::ConfigError(msg),
            GenerateError::Capacity(msg) => AppError::CapacityError(msg),
            other => AppError::GenerationError(other.to_string()),
        }
    }
}

// 错误创建辅助宏
#[macro_export]
macro_rules! app_error {
    ($variant:ident, $msg:expr) => {
        $crate::core::error::AppError::$variant($msg.to_string())
    };
    ($variant:ident, $fmt:expr, $($arg:tt)*) => {
        $crate::core::error::AppError::$variant(format!($fmt, $($arg)*))
    };
}

impl AppError {
    // 获取错误的严重程度
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            AppError::ConfigError(_) | AppError::CapacityError(_) => ErrorSeverity::Critical,
            AppError::GenerationError(_) | AppError::CatalogError(_) => ErrorSeverity::High,
            AppError::FileError(_) | AppError::ImageError(_) => ErrorSeverity::Medium,
            AppError::InvalidInput(_) => ErrorSeverity::Low,
            _ => ErrorSeverity::Medium,
        }
    }

    // 检查是否为运行前即可拒绝的配置类错误
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            AppError::ConfigError(_) | AppError::CapacityError(_) | AppError::InvalidInput(_)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = AppError::AssetError("missing.png".to_string());
        assert_eq!(error.to_string(), "资产错误: missing.png");
    }

    #[test]
    fn test_error_severity() {
        let error = AppError::CapacityError("sum < count".to_string());
        assert_eq!(error.severity(), ErrorSeverity::Critical);
        assert!(error.is_preflight());
    }

    #[test]
    fn test_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let app_error: AppError = io_error.into();

        match app_error {
            AppError::FileError(_) => {}
            _ => panic!("Expected FileError"),
        }
    }

    #[test]
    fn test_generate_error_conversion() {
        let error: AppError = GenerateError::Capacity("layer 0 sum 8 < 10".to_string()).into();
        match error {
            AppError::CapacityError(msg) => assert!(msg.contains("layer 0")),
            _ => panic!("Expected CapacityError"),
        }
    }

    #[test]
    fn test_app_error_macro() {
        let error = app_error!(InvalidInput, "bad count: {}", 0);
        match error {
            AppError::InvalidInput(msg) => assert_eq!(msg, "bad count: 0"),
            _ => panic!("Expected InvalidInput"),
        }
    }
}
