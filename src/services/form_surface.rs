//! 表单页面访问 - 业务能力层
//!
//! `FormSurface` 把处理循环需要的全部 DOM 操作收拢成一个能力接口：
//! 采集容器、点击选项、安装/拆除突变观察器。`DomSurface` 是
//! chromiumoxide 实现，测试里用脚本化的假表单替代。
//!
//! 所有 DOM 读写都通过注入 JS 完成；采集只读不写，点击是唯一的写操作。

use anyhow::Result;
use async_trait::async_trait;

use crate::infrastructure::JsExecutor;
use crate::models::HarvestReport;
use crate::services::harvester::{CONTAINER_SELECTORS, OPTION_SELECTORS, TITLE_SELECTORS};

/// 点击结果
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClickOutcome {
    /// 成功点中选项
    Clicked,
    /// 容器里没有文本匹配的选项（记日志，不视为成功）
    NoMatch,
    /// 容器已经不在页面上（点击期间 DOM 变化）
    ContainerGone,
}

/// 表单页面能力接口
#[async_trait]
pub trait FormSurface: Send + Sync {
    /// 采集当前可见的题目容器（纯读取，不改 DOM）
    async fn harvest(&self) -> Result<HarvestReport>;

    /// 在指定容器里点击文本匹配的选项
    ///
    /// `selector` 与 `container_index` 来自同一次采集结果
    async fn select_option(
        &self,
        selector: &str,
        container_index: usize,
        option_text: &str,
    ) -> Result<ClickOutcome>;

    /// 安装 DOM 突变观察器（幂等）
    async fn install_observer(&self) -> Result<()>;

    /// 读取并清除突变标记
    async fn take_mutation_flag(&self) -> Result<bool>;

    /// 拆除突变观察器（幂等）
    async fn detach_observer(&self) -> Result<()>;
}

/// 基于浏览器页面的实现
pub struct DomSurface {
    executor: JsExecutor,
}

impl DomSurface {
    pub fn new(executor: JsExecutor) -> Self {
        Self { executor }
    }

    /// 构建采集脚本
    ///
    /// 容器选择器按优先级尝试，取第一个非空的族；每个容器为每个
    /// 题干/选项选择器族各收集一份候选，回退决策留给 Rust 侧。
    fn build_harvest_script() -> String {
        format!(
            r#"
            (() => {{
                const containerSelectors = {container_selectors};
                const titleSelectors = {title_selectors};
                const optionSelectors = {option_selectors};

                let used = "";
                let nodes = [];
                for (const sel of containerSelectors) {{
                    const found = Array.from(document.querySelectorAll(sel));
                    if (found.length > 0) {{
                        used = sel;
                        nodes = found;
                        break;
                    }}
                }}

                const containers = nodes.map((node) => {{
                    const titles = titleSelectors.map((sel) => {{
                        const el = node.querySelector(sel);
                        return el ? (el.textContent || "") : "";
                    }});
                    const optionSets = optionSelectors.map((sel) =>
                        Array.from(node.querySelectorAll(sel)).map((el) => el.textContent || "")
                    );
                    const checked =
                        node.querySelector('input[type="radio"]:checked, input[type="checkbox"]:checked') !== null;
                    const filled = Array.from(
                        node.querySelectorAll('input[type="text"], textarea')
                    ).some((el) => el.value && el.value.trim() !== "");
                    return {{
                        full_text: node.textContent || "",
                        titles: titles,
                        option_sets: optionSets,
                        answered: checked || filled,
                    }};
                }});

                return {{ selector: used, containers: containers }};
            }})()
            "#,
            container_selectors = serde_json::to_string(&CONTAINER_SELECTORS).unwrap_or_default(),
            title_selectors = serde_json::to_string(&TITLE_SELECTORS).unwrap_or_default(),
            option_selectors = serde_json::to_string(&OPTION_SELECTORS).unwrap_or_default(),
        )
    }

    /// 构建点击脚本
    ///
    /// 与原始页面的交互方式一致：在容器的 label 里做大小写不敏感的
    /// 双向包含匹配，点中 label 内的单选输入
    fn build_click_script(selector: &str, container_index: usize, option_text: &str) -> String {
        format!(
            r#"
            (() => {{
                const nodes = Array.from(document.querySelectorAll({selector}));
                const node = nodes[{index}];
                if (!node) return "gone";

                const target = {target}.trim().toLowerCase();
                const labels = Array.from(node.querySelectorAll("label"));
                for (const label of labels) {{
                    const text = (label.textContent || "").trim();
                    if (!text) continue;
                    const lower = text.toLowerCase();
                    if (lower.includes(target) || target.includes(lower)) {{
                        const input = label.querySelector('input[type="radio"]');
                        if (input) {{
                            input.click();
                            return "clicked";
                        }}
                        label.click();
                        return "clicked";
                    }}
                }}
                return "nomatch";
            }})()
            "#,
            selector = serde_json::to_string(selector).unwrap_or_default(),
            index = container_index,
            target = serde_json::to_string(option_text).unwrap_or_default(),
        )
    }
}

/// 观察器脚本：childList + subtree，页面内 200ms 防抖后置位标记。
/// 不在回调里同步扫描，避免点击引发的 DOM 变化形成反馈循环。
const INSTALL_OBSERVER_SCRIPT: &str = r#"
(() => {
    if (window.__mcqObserver) return "installed";
    window.__mcqMutated = false;
    let timer = null;
    const observer = new MutationObserver(() => {
        if (timer) clearTimeout(timer);
        timer = setTimeout(() => { window.__mcqMutated = true; }, 200);
    });
    const root = document.querySelector("form") || document.body;
    observer.observe(root, { childList: true, subtree: true });
    window.__mcqObserver = observer;
    return "installed";
})()
"#;

const TAKE_MUTATION_FLAG_SCRIPT: &str = r#"
(() => {
    const mutated = window.__mcqMutated === true;
    window.__mcqMutated = false;
    return mutated;
})()
"#;

const DETACH_OBSERVER_SCRIPT: &str = r#"
(() => {
    if (window.__mcqObserver) {
        window.__mcqObserver.disconnect();
        delete window.__mcqObserver;
    }
    window.__mcqMutated = false;
    return "detached";
})()
"#;

#[async_trait]
impl FormSurface for DomSurface {
    async fn harvest(&self) -> Result<HarvestReport> {
        let report: HarvestReport = self.executor.eval_as(Self::build_harvest_script()).await?;
        Ok(report)
    }

    async fn select_option(
        &self,
        selector: &str,
        container_index: usize,
        option_text: &str,
    ) -> Result<ClickOutcome> {
        let script = Self::build_click_script(selector, container_index, option_text);
        let outcome: String = self.executor.eval_as(script).await?;
        Ok(match outcome.as_str() {
            "clicked" => ClickOutcome::Clicked,
            "gone" => ClickOutcome::ContainerGone,
            _ => ClickOutcome::NoMatch,
        })
    }

    async fn install_observer(&self) -> Result<()> {
        let _ = self.executor.eval(INSTALL_OBSERVER_SCRIPT).await?;
        Ok(())
    }

    async fn take_mutation_flag(&self) -> Result<bool> {
        let mutated: bool = self.executor.eval_as(TAKE_MUTATION_FLAG_SCRIPT).await?;
        Ok(mutated)
    }

    async fn detach_observer(&self) -> Result<()> {
        let _ = self.executor.eval(DETACH_OBSERVER_SCRIPT).await?;
        Ok(())
    }
}
