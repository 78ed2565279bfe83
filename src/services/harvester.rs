//! 题目采集服务 - 业务能力层
//!
//! 把标记结构各异的容器数据归一化为 (题干, 选项列表)。
//! 只做纯数据转换，不触碰 DOM（DOM 读取在 `form_surface` 中完成）。
//!
//! 选择器回退规则：每类选择器按固定优先级排列，取第一个产出非空结果的族。

use crate::models::{HarvestReport, HarvestedQuestion, RawContainer};

/// 指纹长度：容器文本的前 50 个字符
///
/// 不保证唯一，长公共前缀的题目可能碰撞，碰撞的题目会被静默跳过
pub const FINGERPRINT_LEN: usize = 50;

/// 容器选择器族（按优先级排列）
pub const CONTAINER_SELECTORS: [&str; 3] = [
    "div[role=\"listitem\"]",
    ".Qr7Oae",
    ".freebirdFormviewerViewNumberedItemContainer",
];

/// 题干选择器族（按优先级排列）
pub const TITLE_SELECTORS: [&str; 3] = [
    "[data-params]",
    ".M7eMe",
    ".freebirdFormviewerComponentsQuestionBaseTitle",
];

/// 选项选择器族（按优先级排列）
pub const OPTION_SELECTORS: [&str; 3] = [
    "label",
    ".aDTYNe",
    ".docssharedWizToggleLabeledLabelText",
];

/// 生成容器指纹
///
/// 取修剪后文本的前 50 个字符（按字符计数，不按字节）
pub fn fingerprint(text: &str) -> String {
    text.trim().chars().take(FINGERPRINT_LEN).collect()
}

/// 从原始容器数据提取题目
///
/// 题干取第一个非空修剪结果；选项取第一个产出非空列表的族，
/// 列表内只保留非空修剪后的字符串，保持 DOM 顺序。
/// 题干或选项为空时返回 None（调用方静默跳过，不算错误）。
pub fn extract_question(raw: &RawContainer, container_index: usize) -> Option<HarvestedQuestion> {
    let question = raw
        .titles
        .iter()
        .map(|t| t.trim())
        .find(|t| !t.is_empty())?
        .to_string();

    let options: Vec<String> = raw
        .option_sets
        .iter()
        .map(|set| {
            set.iter()
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect::<Vec<_>>()
        })
        .find(|set| !set.is_empty())?;

    let fp = fingerprint(&raw.full_text);
    if fp.is_empty() {
        return None;
    }

    Some(HarvestedQuestion {
        fingerprint: fp,
        question,
        options,
        container_index,
        answered: raw.answered,
    })
}

/// 从一次采集结果中提取全部有效题目
///
/// 无法提取的容器（缺题干或缺选项）被静默跳过
pub fn extract_all(report: &HarvestReport) -> Vec<HarvestedQuestion> {
    report
        .containers
        .iter()
        .enumerate()
        .filter_map(|(idx, raw)| extract_question(raw, idx))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(full_text: &str, titles: Vec<&str>, option_sets: Vec<Vec<&str>>) -> RawContainer {
        RawContainer {
            full_text: full_text.to_string(),
            titles: titles.into_iter().map(String::from).collect(),
            option_sets: option_sets
                .into_iter()
                .map(|s| s.into_iter().map(String::from).collect())
                .collect(),
            answered: false,
        }
    }

    #[test]
    fn test_fingerprint_truncates_to_fifty_chars() {
        let long = "a".repeat(120);
        assert_eq!(fingerprint(&long).chars().count(), FINGERPRINT_LEN);
    }

    #[test]
    fn test_fingerprint_trims_whitespace() {
        assert_eq!(fingerprint("  法国的首都是？  "), "法国的首都是？");
    }

    #[test]
    fn test_extract_primary_selectors() {
        let raw = raw(
            "法国的首都是？ 巴黎 伦敦",
            vec!["法国的首都是？", "", ""],
            vec![vec!["巴黎", "伦敦"], vec![], vec![]],
        );
        let q = extract_question(&raw, 0).expect("应当提取成功");
        assert_eq!(q.question, "法国的首都是？");
        assert_eq!(q.options, vec!["巴黎", "伦敦"]);
        assert_eq!(q.container_index, 0);
    }

    #[test]
    fn test_extract_falls_back_to_later_families() {
        // 主选择器未命中，回退到第二族
        let raw = raw(
            "法国的首都是？ 巴黎 伦敦",
            vec!["", "法国的首都是？", ""],
            vec![vec![], vec!["巴黎", "伦敦"], vec![]],
        );
        let q = extract_question(&raw, 2).expect("应当提取成功");
        assert_eq!(q.question, "法国的首都是？");
        assert_eq!(q.options, vec!["巴黎", "伦敦"]);
    }

    #[test]
    fn test_extract_empty_question_is_skipped() {
        // 所有题干选择器都落空：跳过，绝不会进入求解
        let raw = raw("一些文本", vec!["", "  ", ""], vec![vec!["选项A"], vec![], vec![]]);
        assert!(extract_question(&raw, 0).is_none());
    }

    #[test]
    fn test_extract_no_options_is_skipped() {
        let raw = raw("题干文本", vec!["题干文本", "", ""], vec![vec![], vec![], vec![]]);
        assert!(extract_question(&raw, 0).is_none());
    }

    #[test]
    fn test_extract_filters_blank_options_preserves_order() {
        let raw = raw(
            "题干",
            vec!["题干", "", ""],
            vec![vec!["  A  ", "", "B", "   "], vec![], vec![]],
        );
        let q = extract_question(&raw, 0).unwrap();
        assert_eq!(q.options, vec!["A", "B"]);
    }

    #[test]
    fn test_extract_all_keeps_dom_order_and_indices() {
        let report = HarvestReport {
            selector: "div[role=\"listitem\"]".to_string(),
            containers: vec![
                raw("第一题", vec!["第一题", "", ""], vec![vec!["A", "B"], vec![], vec![]]),
                // 中间一个无效容器
                raw("", vec!["", "", ""], vec![vec![], vec![], vec![]]),
                raw("第三题", vec!["第三题", "", ""], vec![vec!["C", "D"], vec![], vec![]]),
            ],
        };
        let questions = extract_all(&report);
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].container_index, 0);
        assert_eq!(questions[1].container_index, 2);
    }
}
