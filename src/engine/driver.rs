/*
 * 系列驱动器 - 在有界worker池上运行N次组合生成
 * 开发心理过程:
 * 1. 固定大小的OS线程池,共享原子游标领取下标,完成顺序不保证
 * 2. 运行前预检:组合空间与各层amount总和,不满足在任何生成开始前拒绝
 * 3. 任一worker致命失败置中止标志:在飞物品完成,不再领取新下标
 * 4. 全部完成后统一做稀有度线性归一化;部分结果在失败时原样保留上报
 */

use log::{info, warn};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use thiserror::Error;

use crate::catalog::Catalog;
use crate::core::error::AppError;
use crate::engine::generator::{CombinationGenerator, GeneratorOptions};
use crate::engine::{
    normalize_scores, GenerateError, GeneratedItem, RarityRecord, RuleSet, UniquenessRegistry,
};
use crate::utils::SeededRng;

/// 一次系列运行的参数
#[derive(Debug, Clone, Copy)]
pub struct SeriesOptions {
    pub count: usize,
    pub worker_limit: usize,
    pub allow_duplicates: bool,
    pub retry_budget: u32,
    pub seed: u64,
}

/// 预检报告：警告只收集上报一次，fatal存在时必须拒绝运行
#[derive(Debug)]
pub struct PreflightReport {
    pub warnings: Vec<String>,
    pub fatal: Option<GenerateError>,
}

impl PreflightReport {
    pub fn is_fatal(&self) -> bool {
        self.fatal.is_some()
    }
}

/// 每个生成完成的物品交给的下游（合成+落盘），worker内调用，不持锁
pub trait ItemSink: Sync {
    fn accept(&self, item: &GeneratedItem) -> crate::core::error::Result<()>;
}

/// 完整成功的系列结果
#[derive(Debug)]
pub struct SeriesReport {
    /// 按下标排序、已归一化的稀有度记录
    pub records: Vec<RarityRecord>,
    pub warnings: Vec<String>,
}

/// 系列运行失败：携带失败前已产出的数量与部分结果（未归一化）
#[derive(Debug, Error)]
pub enum SeriesFailure {
    #[error("generation aborted after {produced} items: {source}")]
    Generation {
        #[source]
        source: GenerateError,
        produced: usize,
        partial: Vec<RarityRecord>,
    },
    #[error("output sink failed after {produced} items: {source}")]
    Sink {
        #[source]
        source: AppError,
        produced: usize,
        partial: Vec<RarityRecord>,
    },
}

impl SeriesFailure {
    pub fn produced(&self) -> usize {
        match self {
            SeriesFailure::Generation { produced, .. } | SeriesFailure::Sink { produced, .. } => {
                *produced
            }
        }
    }
}

/// 运行前不变量检查
///
/// - 不允许重复时：组合空间 >= count，否则致命
/// - 每层amount之和 < count 致命；> count 仅告警（概率语义变为近似）
pub fn validate(catalog: &Catalog, count: usize, allow_duplicates: bool) -> PreflightReport {
    let mut warnings = Vec::new();
    let mut fatal = None;

    if catalog.layer_count() == 0 {
        return PreflightReport {
            warnings,
            fatal: Some(GenerateError::Capacity("catalog has no layers".to_string())),
        };
    }

    if !allow_duplicates {
        let space = catalog.combination_space();
        if space < count as u128 {
            fatal = Some(GenerateError::Capacity(format!(
                "combination space {} is smaller than requested count {}",
                space, count
            )));
        }
    }

    for layer in &catalog.layers {
        let sum = layer.total_amount();
        if sum < count as u64 {
            fatal.get_or_insert(GenerateError::Capacity(format!(
                "layer '{}' amounts sum to {} which is less than requested count {}",
                layer.name, sum, count
            )));
        } else if sum > count as u64 {
            warnings.push(format!(
                "layer '{}' amounts sum to {} which exceeds requested count {} (occurrence targets become approximate)",
                layer.name, sum, count
            ));
        }
    }

    PreflightReport { warnings, fatal }
}

enum WorkerMsg {
    Item(RarityRecord),
    GenFailed(GenerateError),
    SinkFailed(AppError),
}

enum PendingFailure {
    Gen(GenerateError),
    Sink(AppError),
}

/// 系列驱动器：目录与规则集整次运行只读共享
pub struct SeriesDriver<'a> {
    catalog: &'a Catalog,
    rules: &'a RuleSet,
    opts: SeriesOptions,
}

impl<'a> SeriesDriver<'a> {
    pub fn new(catalog: &'a Catalog, rules: &'a RuleSet, opts: SeriesOptions) -> Self {
        Self {
            catalog,
            rules,
            opts,
        }
    }

    /// 生成整个系列，每个完成的物品即时交给sink
    pub fn generate<S: ItemSink>(&self, sink: &S) -> Result<SeriesReport, SeriesFailure> {
        let PreflightReport { warnings, fatal } =
            validate(self.catalog, self.opts.count, self.opts.allow_duplicates);
        for w in &warnings {
            warn!("{}", w);
        }
        if let Some(source) = fatal {
            return Err(SeriesFailure::Generation {
                source,
                produced: 0,
                partial: Vec::new(),
            });
        }

        let registry = UniquenessRegistry::new();
        let gen_opts = GeneratorOptions {
            series_count: self.opts.count,
            allow_duplicates: self.opts.allow_duplicates,
            retry_budget: self.opts.retry_budget,
        };
        let cursor = AtomicUsize::new(0);
        let abort = AtomicBool::new(false);
        let workers = self.opts.worker_limit.max(1).min(self.opts.count);

        info!(
            "开始生成系列: count={} workers={} seed={}",
            self.opts.count, workers, self.opts.seed
        );

        let (mut records, failure) = thread::scope(|s| {
            let (tx, rx) = mpsc::channel::<WorkerMsg>();

            for w in 0..workers {
                let worker_tx = tx.clone();
                let mut rng = SeededRng::derive_stream(self.opts.seed, w as u64);
                let generator =
                    CombinationGenerator::new(self.catalog, self.rules, &registry, gen_opts);
                let cursor = &cursor;
                let abort = &abort;
                let count = self.opts.count;

                let spawned = thread::Builder::new()
                    .name(format!("nftgen-worker-{}", w))
                    .spawn_scoped(s, move || loop {
                        if abort.load(Ordering::SeqCst) {
                            break;
                        }
                        let index = cursor.fetch_add(1, Ordering::SeqCst);
                        if index >= count {
                            break;
                        }
                        match generator.generate_one(index, &mut rng) {
                            Ok(item) => {
                                // 合成/落盘可能阻塞在文件IO，此处不持有任何锁
                                if let Err(e) = sink.accept(&item) {
                                    abort.store(true, Ordering::SeqCst);
                                    let _ = worker_tx.send(WorkerMsg::SinkFailed(e));
                                    break;
                                }
                                let _ =
                                    worker_tx.send(WorkerMsg::Item(RarityRecord::from_item(&item)));
                            }
                            Err(e) => {
                                abort.store(true, Ordering::SeqCst);
                                let _ = worker_tx.send(WorkerMsg::GenFailed(e));
                                break;
                            }
                        }
                    });
                if let Err(e) = spawned {
                    abort.store(true, Ordering::SeqCst);
                    let _ = tx.send(WorkerMsg::GenFailed(GenerateError::Worker(format!(
                        "failed to spawn thread: {}",
                        e
                    ))));
                }
            }
            drop(tx);

            let mut records = Vec::with_capacity(self.opts.count);
            let mut failure: Option<PendingFailure> = None;
            for msg in rx {
                match msg {
                    WorkerMsg::Item(record) => records.push(record),
                    WorkerMsg::GenFailed(e) => {
                        failure.get_or_insert(PendingFailure::Gen(e));
                    }
                    WorkerMsg::SinkFailed(e) => {
                        failure.get_or_insert(PendingFailure::Sink(e));
                    }
                }
            }
            (records, failure)
        });

        match failure {
            Some(pending) => {
                let produced = records.len();
                warn!("系列运行中止，已产出 {} 个物品", produced);
                Err(match pending {
                    PendingFailure::Gen(source) => SeriesFailure::Generation {
                        source,
                        produced,
                        partial: records,
                    },
                    PendingFailure::Sink(source) => SeriesFailure::Sink {
                        source,
                        produced,
                        partial: records,
                    },
                })
            }
            None => {
                records.sort_by_key(|r| r.index);
                normalize_scores(&mut records);
                info!("系列生成完成: {} 个物品", records.len());
                Ok(SeriesReport { records, warnings })
            }
        }
    }
}
