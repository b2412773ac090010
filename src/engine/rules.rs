/*
 * 不兼容规则解析器
 * 开发心理过程:
 * 1. 规则是带优先级的模式-动作对,按优先级降序评估,首个完全匹配者生效
 * 2. 动作用带标签的枚举表达(Replace/ChangeOrder),不搞继承体系
 * 3. 同优先级按声明顺序决胜,这是本实现钦定并用测试钉住的行为
 * 4. 矩阵式(Replace)规则的指令数必须等于图层数,不满足是配置错误
 */

use log::debug;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::fs;
use std::path::{Path, PathBuf};

use crate::catalog::TraitAttribute;
use crate::core::error::{AppError, Result};
use crate::engine::{GenerateError, GenerateResult, Pick};

/// Replace规则中单条指令的子动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplaceOp {
    /// 保留原选择
    Keep,
    /// 从输出中整体删除该位置
    Remove,
    /// 用独立的替身媒体替换该位置
    Replace,
}

/// Replace规则的一条指令，绑定到一个图层
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaceInstruction {
    pub layer: String,
    /// None为通配（匹配该层任意资产）
    #[serde(default)]
    pub asset: Option<String>,
    pub op: ReplaceOp,
    /// op为Replace时的替身媒体路径
    #[serde(default)]
    pub substitute: Option<PathBuf>,
}

/// ChangeOrder规则的一条指令
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderInstruction {
    pub layer: String,
    #[serde(default)]
    pub asset: Option<String>,
    /// 目标输出顺序（升序排列）
    pub order: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RuleAction {
    Replace { instructions: Vec<ReplaceInstruction> },
    ChangeOrder { instructions: Vec<OrderInstruction> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default)]
    pub name: String,
    /// 越大越先评估
    pub priority: i32,
    #[serde(flatten)]
    pub action: RuleAction,
}

/// 解析结果：有序媒体序列和保留下来的属性
#[derive(Debug, Clone)]
pub struct ResolvedPicks {
    pub media: Vec<PathBuf>,
    pub attributes: Vec<TraitAttribute>,
    /// 生效规则名（无匹配时为None）
    pub applied: Option<String>,
}

/// 按优先级排序的规则集
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// 校验并按优先级降序排序（稳定排序，同优先级保持声明顺序）
    pub fn new(mut rules: Vec<Rule>, layer_count: usize) -> GenerateResult<Self> {
        for rule in &rules {
            if let RuleAction::Replace { instructions } = &rule.action {
                if !instructions.is_empty() && instructions.len() != layer_count {
                    return Err(GenerateError::Configuration(format!(
                        "rule '{}' has {} instructions, expected {} (one per layer)",
                        rule.name,
                        instructions.len(),
                        layer_count
                    )));
                }
                for instr in instructions {
                    if instr.op == ReplaceOp::Replace && instr.substitute.is_none() {
                        return Err(GenerateError::Configuration(format!(
                            "rule '{}': replace op on layer '{}' needs a substitute path",
                            rule.name, instr.layer
                        )));
                    }
                }
            }
        }

        rules.sort_by_key(|r| Reverse(r.priority));
        Ok(Self { rules })
    }

    /// 从JSON文件加载规则集；文件不存在视为空规则集
    pub fn load_from_file(path: &Path, layer_count: usize) -> Result<Self> {
        if !path.exists() {
            debug!("规则文件不存在，使用空规则集: {:?}", path);
            return Ok(Self::empty());
        }

        let content = fs::read_to_string(path)?;
        let mut rules: Vec<Rule> = serde_json::from_str(&content)?;

        // 替身媒体的相对路径按规则文件所在目录解析
        if let Some(base) = path.parent() {
            for rule in &mut rules {
                if let RuleAction::Replace { instructions } = &mut rule.action {
                    for instr in instructions {
                        if let Some(sub) = &instr.substitute {
                            if sub.is_relative() {
                                instr.substitute = Some(base.join(sub));
                            }
                        }
                    }
                }
            }
        }

        Self::new(rules, layer_count).map_err(AppError::from)
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// 按优先级评估规则，应用首个完全匹配者；无匹配时原样返回
    pub fn resolve(&self, picks: &[Pick<'_>]) -> ResolvedPicks {
        for rule in &self.rules {
            if rule_matches(rule, picks) {
                debug!("规则 '{}' (priority {}) 命中", rule.name, rule.priority);
                return apply_rule(rule, picks);
            }
        }

        ResolvedPicks {
            media: picks.iter().map(|p| p.asset.media.clone()).collect(),
            attributes: picks
                .iter()
                .map(|p| p.asset.attribute(&p.layer.name))
                .collect(),
            applied: None,
        }
    }
}

fn asset_matches(wanted: &Option<String>, pick: &Pick<'_>) -> bool {
    match wanted {
        None => true,
        Some(id) => pick.asset.id == *id,
    }
}

fn find_pick<'a, 'b>(picks: &'a [Pick<'b>], layer: &str) -> Option<&'a Pick<'b>> {
    picks.iter().find(|p| p.layer.name == layer)
}

/// 规则匹配：所有指令都匹配当前选择；空指令表永不匹配
fn rule_matches(rule: &Rule, picks: &[Pick<'_>]) -> bool {
    match &rule.action {
        RuleAction::Replace { instructions } => {
            !instructions.is_empty()
                && instructions.iter().all(|ins| {
                    find_pick(picks, &ins.layer)
                        .map(|p| asset_matches(&ins.asset, p))
                        .unwrap_or(false)
                })
        }
        RuleAction::ChangeOrder { instructions } => {
            !instructions.is_empty()
                && instructions.iter().all(|ins| {
                    find_pick(picks, &ins.layer)
                        .map(|p| asset_matches(&ins.asset, p))
                        .unwrap_or(false)
                })
        }
    }
}

fn apply_rule(rule: &Rule, picks: &[Pick<'_>]) -> ResolvedPicks {
    match &rule.action {
        RuleAction::Replace { instructions } => apply_replace(rule, instructions, picks),
        RuleAction::ChangeOrder { instructions } => apply_change_order(rule, instructions, picks),
    }
}

/// Replace：逐位置决定保留/删除/替换，输出保持输入顺序
fn apply_replace(rule: &Rule, instructions: &[ReplaceInstruction], picks: &[Pick<'_>]) -> ResolvedPicks {
    let mut media = Vec::with_capacity(picks.len());
    let mut attributes = Vec::with_capacity(picks.len());

    for pick in picks {
        let instr = instructions.iter().find(|ins| ins.layer == pick.layer.name);
        match instr.map(|i| i.op) {
            // 指令未覆盖的图层按Keep处理
            Some(ReplaceOp::Keep) | None => {
                media.push(pick.asset.media.clone());
                attributes.push(pick.asset.attribute(&pick.layer.name));
            }
            Some(ReplaceOp::Remove) => {}
            Some(ReplaceOp::Replace) => {
                if let Some(sub) = instr.and_then(|i| i.substitute.clone()) {
                    media.push(sub);
                }
                // 被替换的位置不贡献属性
            }
        }
    }

    ResolvedPicks {
        media,
        attributes,
        applied: Some(rule.name.clone()),
    }
}

/// ChangeOrder：命中的位置按目标顺序升序重排，未命中的位置原地保持相对顺序
fn apply_change_order(rule: &Rule, instructions: &[OrderInstruction], picks: &[Pick<'_>]) -> ResolvedPicks {
    // (原始下标, 目标顺序)，按原始顺序收集
    let mut matched: Vec<(usize, usize)> = Vec::new();
    for (i, pick) in picks.iter().enumerate() {
        if let Some(ins) = instructions
            .iter()
            .find(|ins| ins.layer == pick.layer.name && asset_matches(&ins.asset, pick))
        {
            matched.push((i, ins.order));
        }
    }

    // 命中位置的槽位保持不变，槽位内按目标顺序重排
    let slots: Vec<usize> = matched.iter().map(|(i, _)| *i).collect();
    let mut by_order = matched;
    by_order.sort_by_key(|&(_, ord)| ord);

    let mut perm: Vec<usize> = (0..picks.len()).collect();
    for (k, &(src, _)) in by_order.iter().enumerate() {
        perm[slots[k]] = src;
    }

    ResolvedPicks {
        media: perm.iter().map(|&i| picks[i].asset.media.clone()).collect(),
        attributes: picks
            .iter()
            .map(|p| p.asset.attribute(&p.layer.name))
            .collect(),
        applied: Some(rule.name.clone()),
    }
}
