// 媒体合成器 - 按解析后的顺序把图层PNG叠加成一张成品图
// 开发心理：逐层alpha叠加，画布尺寸优先取配置，否则取首张图层图像的尺寸
// 合成是每物品成本的大头，必须在不持有任何锁的worker上下文中调用

use image::{imageops, RgbaImage};
use log::debug;
use std::path::{Path, PathBuf};

use crate::core::config::OutputConfig;
use crate::core::error::{AppError, Result};

/// 图层叠加合成器
#[derive(Debug, Clone)]
pub struct Compositor {
    width: Option<u32>,
    height: Option<u32>,
    output_dir: PathBuf,
}

impl Compositor {
    pub fn new(output: &OutputConfig, output_dir: &Path) -> Self {
        Self {
            width: output.image_width,
            height: output.image_height,
            output_dir: output_dir.to_path_buf(),
        }
    }

    /// 叠加媒体序列，返回合成后的RGBA画布
    pub fn compose(&self, media: &[PathBuf]) -> Result<RgbaImage> {
        let (width, height) = self.canvas_size(media)?;
        let mut canvas = RgbaImage::new(width, height);

        for path in media {
            let layer = image::open(path)
                .map_err(|e| AppError::ImageError(format!("打开图层失败 {:?}: {}", path, e)))?
                .to_rgba8();
            imageops::overlay(&mut canvas, &layer, 0, 0);
        }

        Ok(canvas)
    }

    /// 合成并保存为 `<index>.png`，返回输出路径
    pub fn compose_to_file(&self, index: usize, media: &[PathBuf]) -> Result<PathBuf> {
        let canvas = self.compose(media)?;
        let path = self.output_dir.join(format!("{}.png", index));
        canvas.save(&path)?;
        debug!("物品{}合成完成: {:?}", index, path);
        Ok(path)
    }

    fn canvas_size(&self, media: &[PathBuf]) -> Result<(u32, u32)> {
        if let (Some(w), Some(h)) = (self.width, self.height) {
            return Ok((w, h));
        }
        let first = media.first().ok_or_else(|| {
            AppError::InvalidInput("没有媒体可合成且未配置画布尺寸".to_string())
        })?;
        let dims = image::image_dimensions(first)
            .map_err(|e| AppError::ImageError(format!("读取图像尺寸失败 {:?}: {}", first, e)))?;
        Ok(dims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use tempfile::TempDir;

    fn write_png(dir: &Path, name: &str, color: [u8; 4], size: u32) -> PathBuf {
        let img = RgbaImage::from_pixel(size, size, Rgba(color));
        let path = dir.join(name);
        img.save(&path).unwrap();
        path
    }

    fn output_config(width: Option<u32>, height: Option<u32>) -> OutputConfig {
        OutputConfig {
            image_width: width,
            image_height: height,
            write_rarity: true,
        }
    }

    #[test]
    fn test_overlay_order_top_wins() {
        let temp = TempDir::new().unwrap();
        let red = write_png(temp.path(), "red.png", [255, 0, 0, 255], 2);
        let blue = write_png(temp.path(), "blue.png", [0, 0, 255, 255], 2);

        let compositor = Compositor::new(&output_config(None, None), temp.path());
        let canvas = compositor.compose(&[red, blue]).unwrap();

        // 不透明的上层覆盖下层
        assert_eq!(canvas.get_pixel(0, 0).0, [0, 0, 255, 255]);
        assert_eq!(canvas.dimensions(), (2, 2));
    }

    #[test]
    fn test_canvas_size_from_config() {
        let temp = TempDir::new().unwrap();
        let red = write_png(temp.path(), "red.png", [255, 0, 0, 255], 2);

        let compositor = Compositor::new(&output_config(Some(4), Some(4)), temp.path());
        let canvas = compositor.compose(&[red]).unwrap();
        assert_eq!(canvas.dimensions(), (4, 4));
    }

    #[test]
    fn test_compose_to_file_names_by_index() {
        let temp = TempDir::new().unwrap();
        let red = write_png(temp.path(), "red.png", [255, 0, 0, 255], 2);

        let compositor = Compositor::new(&output_config(None, None), temp.path());
        let path = compositor.compose_to_file(7, &[red]).unwrap();

        assert_eq!(path, temp.path().join("7.png"));
        assert!(path.exists());
        let loaded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(loaded.get_pixel(1, 1).0, [255, 0, 0, 255]);
    }

    #[test]
    fn test_empty_media_without_size_fails() {
        let temp = TempDir::new().unwrap();
        let compositor = Compositor::new(&output_config(None, None), temp.path());
        assert!(compositor.compose(&[]).is_err());
    }

    #[test]
    fn test_missing_layer_file_fails() {
        let temp = TempDir::new().unwrap();
        let compositor = Compositor::new(&output_config(Some(2), Some(2)), temp.path());
        let missing = temp.path().join("nope.png");
        assert!(compositor.compose(&[missing]).is_err());
    }
}
