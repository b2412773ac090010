// 图层目录扫描器 - 把磁盘布局转换成资产目录
// 开发心理：目录名 NN_name 决定图层顺序，文件名 name#amount.png 携带出现目标
// 设计原则：宽容扫描（跳过无关文件并记录日志），但结构性问题立即报错

use log::{debug, info, warn};
use std::fs;
use std::path::Path;

use crate::catalog::{Asset, Catalog, Layer};
use crate::core::error::{AppError, Result};

/// 扫描图层目录树，构建资产目录
///
/// 布局约定：
/// - 子目录按数字前缀排序：`01_background`、`02_body`…，下划线后为图层名
/// - 资产为PNG文件，命名 `<name>#<amount>.png`；缺省amount为1
/// - 隐藏文件与非PNG文件跳过；空图层目录告警后跳过
pub fn scan_layers(root: &Path) -> Result<Catalog> {
    if !root.is_dir() {
        return Err(AppError::CatalogError(format!(
            "图层目录不存在或不是目录: {:?}",
            root
        )));
    }

    let mut dirs: Vec<(u32, String, std::path::PathBuf)> = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let dir_name = entry.file_name().to_string_lossy().to_string();
        if dir_name.starts_with('.') {
            continue;
        }
        let (order, layer_name) = parse_layer_dir_name(&dir_name)?;
        dirs.push((order, layer_name, path));
    }

    if dirs.is_empty() {
        return Err(AppError::CatalogError(format!(
            "图层目录为空: {:?}",
            root
        )));
    }

    dirs.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)));

    // 规则按图层名绑定指令，重名图层会让规则静默命中错误的层
    let mut seen = std::collections::HashSet::new();
    for (_, layer_name, _) in &dirs {
        if !seen.insert(layer_name.as_str()) {
            return Err(AppError::CatalogError(format!(
                "图层名重复: '{}'",
                layer_name
            )));
        }
    }

    let mut layers = Vec::with_capacity(dirs.len());
    for (index, (_, layer_name, dir_path)) in dirs.into_iter().enumerate() {
        let assets = scan_assets(&dir_path)?;
        if assets.is_empty() {
            warn!("图层 '{}' 没有可用资产，已跳过", layer_name);
            continue;
        }
        info!("图层 '{}': {} 个资产", layer_name, assets.len());
        layers.push(Layer::new(index, layer_name, assets));
    }

    let catalog = Catalog::new(layers);
    if catalog.layer_count() == 0 {
        return Err(AppError::CatalogError(
            "没有扫描到任何含资产的图层".to_string(),
        ));
    }

    Ok(catalog)
}

/// 解析图层目录名 `NN_name`
fn parse_layer_dir_name(dir_name: &str) -> Result<(u32, String)> {
    let (prefix, name) = dir_name.split_once('_').ok_or_else(|| {
        AppError::CatalogError(format!(
            "图层目录名缺少顺序前缀（期望 NN_name）: '{}'",
            dir_name
        ))
    })?;

    let order: u32 = prefix.parse().map_err(|_| {
        AppError::CatalogError(format!(
            "图层目录顺序前缀不是数字: '{}'",
            dir_name
        ))
    })?;

    if name.is_empty() {
        return Err(AppError::CatalogError(format!(
            "图层目录名为空: '{}'",
            dir_name
        )));
    }

    Ok((order, name.to_string()))
}

/// 扫描单个图层目录内的资产文件
fn scan_assets(dir: &Path) -> Result<Vec<Asset>> {
    let mut assets: Vec<Asset> = Vec::new();

    let mut entries: Vec<_> = fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().to_string();
        if file_name.starts_with('.') {
            continue;
        }
        let is_png = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("png"))
            .unwrap_or(false);
        if !is_png {
            debug!("跳过非PNG文件: {:?}", path);
            continue;
        }

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&file_name);
        let (name, amount) = parse_asset_stem(stem)?;

        if assets.iter().any(|a| a.id == name) {
            warn!("图层 {:?} 中资产id重复，跳过: '{}'", dir, name);
            continue;
        }

        let media = fs::canonicalize(&path).unwrap_or(path.clone());
        assets.push(Asset::new(name.clone(), name, media, amount));
    }

    Ok(assets)
}

/// 解析资产文件主干 `name#amount`
fn parse_asset_stem(stem: &str) -> Result<(String, u32)> {
    match stem.rsplit_once('#') {
        Some((name, amount_str)) => {
            let amount: u32 = amount_str.parse().map_err(|_| {
                AppError::AssetError(format!("资产amount不是数字: '{}'", stem))
            })?;
            if name.is_empty() {
                return Err(AppError::AssetError(format!("资产名为空: '{}'", stem)));
            }
            Ok((name.to_string(), amount))
        }
        None => Ok((stem.to_string(), 1)),
    }
}
