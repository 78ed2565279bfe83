//! 题目数据模型
//!
//! 题目在每次扫描时从页面 DOM 现场构建，从不持久化；
//! 同一性由指纹字符串决定，而不是结构化相等。

use serde::{Deserialize, Serialize};

/// 从页面采集回来的原始容器数据
///
/// 每个容器对应一个题目区块。选择器回退在 Rust 侧完成，
/// 所以这里为每个选择器族各保留一份候选结果。
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RawContainer {
    /// 容器的完整文本内容（用于生成指纹）
    #[serde(default)]
    pub full_text: String,
    /// 各题干选择器族命中的文本（与选择器族一一对应，未命中为空串）
    #[serde(default)]
    pub titles: Vec<String>,
    /// 各选项选择器族命中的选项文本列表
    #[serde(default)]
    pub option_sets: Vec<Vec<String>>,
    /// 是否已作答（单选/多选已勾选，或文本输入框非空）
    #[serde(default)]
    pub answered: bool,
}

/// 一次采集的完整结果
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct HarvestReport {
    /// 实际命中的容器选择器（三个族中第一个非空的；全部落空为空串）
    #[serde(default)]
    pub selector: String,
    /// 按 DOM 顺序排列的容器列表
    #[serde(default)]
    pub containers: Vec<RawContainer>,
}

/// 提取成功的题目
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HarvestedQuestion {
    /// 指纹（容器文本前 50 个字符，会话内去重用）
    pub fingerprint: String,
    /// 题干文本
    pub question: String,
    /// 选项文本，保持 DOM 顺序
    pub options: Vec<String>,
    /// 容器在本次采集中的序号（点击时定位用）
    pub container_index: usize,
    /// 页面上是否已作答
    pub answered: bool,
}
