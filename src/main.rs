// 生成式NFT组合引擎主程序入口
// 开发心理：简洁的启动流程，专注于配置装配和一次系列运行
// 解析参数→装配配置→扫描图层→预检→生成→落盘稀有度

use log::{error, info, warn};
use std::env;
use std::fs;
use std::path::PathBuf;

use nftgen::compose::Compositor;
use nftgen::engine::{validate, SeriesFailure, SeriesOptions};
use nftgen::metadata::{validate_collection, JsonSink, OutputPipeline};
use nftgen::utils::SeededRng;
use nftgen::{AppError, EngineConfig, Result, RuleSet, SeriesDriver};

fn main() {
    // 初始化日志系统
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("🎨 启动nftgen v{}", nftgen::VERSION);

    if let Err(e) = run() {
        error!("运行失败: {}", e);
        std::process::exit(1);
    }

    info!("正常退出");
}

#[derive(Debug, Default)]
struct CliOptions {
    config: Option<PathBuf>,
    count: Option<usize>,
    workers: Option<usize>,
    seed: Option<u64>,
    layers: Option<PathBuf>,
    output: Option<PathBuf>,
    allow_duplicates: bool,
    dry_run: bool,
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let cli = parse_args(&args)?;

    // 配置优先级：默认值 < 配置文件 < 环境变量 < 命令行
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load_from_file(path)?,
        None => EngineConfig::default(),
    };
    config.apply_env_overrides();
    if let Some(count) = cli.count {
        config.generation.count = count;
    }
    if let Some(workers) = cli.workers {
        config.generation.worker_limit = Some(workers);
    }
    if let Some(seed) = cli.seed {
        config.generation.seed = Some(seed);
    }
    if let Some(layers) = &cli.layers {
        config.layout.layers_dir = layers.clone();
    }
    if let Some(output) = &cli.output {
        config.layout.output_dir = output.clone();
    }
    if cli.allow_duplicates {
        config.generation.allow_duplicates = true;
    }

    config.validate()?;
    validate_collection(&config.collection)?;

    let catalog = nftgen::catalog::scan_layers(&config.layout.layers_dir)?;
    let rules = RuleSet::load_from_file(&config.rules_file(), catalog.layer_count())?;
    info!(
        "目录就绪: {} 个图层, {} 条规则, 组合空间 {}",
        catalog.layer_count(),
        rules.rule_count(),
        catalog.combination_space()
    );

    let opts = SeriesOptions {
        count: config.generation.count,
        worker_limit: config.effective_workers(),
        allow_duplicates: config.generation.allow_duplicates,
        retry_budget: config.generation.retry_budget,
        seed: config
            .generation
            .seed
            .unwrap_or_else(|| SeededRng::new().seed()),
    };

    if cli.dry_run {
        let report = validate(&catalog, opts.count, opts.allow_duplicates);
        for w in &report.warnings {
            warn!("{}", w);
        }
        if let Some(fatal) = report.fatal {
            return Err(AppError::from(fatal));
        }
        info!("✅ 预检通过（dry-run，不生成）");
        return Ok(());
    }

    fs::create_dir_all(&config.layout.output_dir)?;
    let pipeline = OutputPipeline::new(
        Compositor::new(&config.output, &config.layout.output_dir),
        JsonSink::new(config.layout.output_dir.clone(), config.collection.clone())?,
    );

    let driver = SeriesDriver::new(&catalog, &rules, opts);
    match driver.generate(&pipeline) {
        Ok(series) => {
            if config.output.write_rarity {
                pipeline.sink.write_rarity(&series.records)?;
            }
            info!("✅ 系列生成完成: {} 个物品 (seed={})", series.records.len(), opts.seed);
            Ok(())
        }
        Err(failure) => {
            error!("系列生成失败: {}（失败前已产出 {} 个物品）", failure, failure.produced());
            // 部分结果保留上报
            let partial = match &failure {
                SeriesFailure::Generation { partial, .. } | SeriesFailure::Sink { partial, .. } => {
                    partial
                }
            };
            if config.output.write_rarity && !partial.is_empty() {
                if let Err(e) = pipeline.sink.write_rarity(partial) {
                    warn!("部分稀有度记录写出失败: {}", e);
                }
            }
            Err(AppError::GenerationError(failure.to_string()))
        }
    }
}

fn parse_args(args: &[String]) -> Result<CliOptions> {
    let mut options = CliOptions::default();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                options.config = Some(PathBuf::from(expect_value(args, &mut i)?));
            }
            "--count" | "-n" => {
                let v = expect_value(args, &mut i)?;
                options.count = Some(v.parse().map_err(|_| {
                    AppError::InvalidInput(format!("--count 不是数字: '{}'", v))
                })?);
            }
            "--workers" | "-w" => {
                let v = expect_value(args, &mut i)?;
                options.workers = Some(v.parse().map_err(|_| {
                    AppError::InvalidInput(format!("--workers 不是数字: '{}'", v))
                })?);
            }
            "--seed" => {
                let v = expect_value(args, &mut i)?;
                options.seed = Some(v.parse().map_err(|_| {
                    AppError::InvalidInput(format!("--seed 不是数字: '{}'", v))
                })?);
            }
            "--layers" => {
                options.layers = Some(PathBuf::from(expect_value(args, &mut i)?));
            }
            "--output" | "-o" => {
                options.output = Some(PathBuf::from(expect_value(args, &mut i)?));
            }
            "--allow-duplicates" => options.allow_duplicates = true,
            "--dry-run" => options.dry_run = true,
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            other => {
                return Err(AppError::InvalidInput(format!("未知参数: '{}'", other)));
            }
        }
        i += 1;
    }

    Ok(options)
}

fn expect_value<'a>(args: &'a [String], i: &mut usize) -> Result<&'a str> {
    let flag = &args[*i];
    *i += 1;
    args.get(*i)
        .map(|s| s.as_str())
        .ok_or_else(|| AppError::InvalidInput(format!("参数 {} 缺少值", flag)))
}

fn print_help() {
    println!("nftgen v{}", nftgen::VERSION);
    println!();
    println!("使用方法:");
    println!("  {} [选项]", env!("CARGO_BIN_NAME"));
    println!();
    println!("选项:");
    println!("  --config, -c FILE    配置文件（TOML或JSON）");
    println!("  --count, -n N        生成物品总数");
    println!("  --workers, -w N      并发worker数（默认CPU核数）");
    println!("  --seed N             随机种子（缺省取熵）");
    println!("  --layers DIR         图层目录");
    println!("  --output, -o DIR     输出目录");
    println!("  --allow-duplicates   允许重复组合");
    println!("  --dry-run            只做预检，不生成");
    println!("  --help, -h           显示帮助信息");
    println!();
    println!("示例:");
    println!("  {} --layers ./layers --output ./out --count 1000", env!("CARGO_BIN_NAME"));
    println!("  {} -c nftgen.toml --seed 42 --dry-run", env!("CARGO_BIN_NAME"));
}
