//! 选项匹配服务 - 业务能力层
//!
//! 把模型的自由文本回复归约为原始选项之一。两阶段：
//! 1. 大小写不敏感的双向子串包含，按原始顺序取第一个命中
//! 2. 回退到词级 Jaccard 相似度，取最高分
//!
//! 平局规则：保持最早遇到的选项（默认 `options[0]`），这是刻意保留的
//! 确定性兜底，不是疏漏。

use std::collections::HashSet;

/// 参与相似度计算的最小词长
const MIN_TOKEN_LEN: usize = 2;

/// 把模型回复归约为选项列表中的一员
///
/// 保证返回值一定是 `options` 中的元素（options 非空时），
/// 绝不返回回复原文。
pub fn match_option(response: &str, options: &[String]) -> String {
    let response = response.trim();
    let response_lower = response.to_lowercase();

    // 阶段一：子串包含（双向），按原始顺序第一个命中的选项获胜
    for option in options {
        let option_lower = option.to_lowercase();
        if response_lower.contains(&option_lower) || option_lower.contains(&response_lower) {
            return option.clone();
        }
    }

    // 阶段二：词级 Jaccard 相似度，严格大于才替换（平局保持最早的）
    let response_tokens = tokenize(response);
    let mut best_match = options[0].clone();
    let mut highest_similarity = 0.0_f64;

    for option in options {
        let similarity = jaccard(&response_tokens, &tokenize(option));
        if similarity > highest_similarity {
            highest_similarity = similarity;
            best_match = option.clone();
        }
    }

    best_match
}

/// 分词：小写、按空白切分、剥离两端标点、丢弃过短的词
fn tokenize(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|w| w.chars().count() > MIN_TOKEN_LEN)
        .collect()
}

/// 集合 Jaccard 相似度：交集 / 并集
fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_substring_match_verbose_reply() {
        // 模型回复啰嗦时仍能命中选项
        let options = opts(&["Paris", "London", "Rome"]);
        assert_eq!(match_option("The answer is Paris", &options), "Paris");
    }

    #[test]
    fn test_substring_match_reverse_containment() {
        // 回复是选项的子串也算命中
        let options = opts(&["Paris, France", "London"]);
        assert_eq!(match_option("Paris, Fra", &options), "Paris, France");
    }

    #[test]
    fn test_substring_match_case_insensitive() {
        let options = opts(&["Paris", "London"]);
        assert_eq!(match_option("paris", &options), "Paris");
    }

    #[test]
    fn test_substring_first_option_in_order_wins() {
        // 两个选项都被包含时，按原始顺序取第一个
        let options = opts(&["Rome", "Rome and Paris"]);
        assert_eq!(match_option("Rome and Paris", &options), "Rome");
    }

    #[test]
    fn test_similarity_fallback() {
        // 无子串包含关系，回退到 Jaccard："paris" 词与第一个选项重叠
        let options = opts(&["Paris, France", "London"]);
        assert_eq!(match_option("paris is correct", &options), "Paris, France");
    }

    #[test]
    fn test_similarity_tie_keeps_first_option() {
        // 回复与所有选项都无重叠：平局，保持默认 options[0]
        let options = opts(&["甲", "乙", "丙"]);
        assert_eq!(match_option("completely unrelated reply", &options), "甲");
    }

    #[test]
    fn test_short_tokens_are_ignored(){
        // "is" 之类的短词不参与相似度计算
        let options = opts(&["is correct indeed", "answer paris city"]);
        assert_eq!(match_option("the answer paris", &options), "answer paris city");
    }

    #[test]
    fn test_always_returns_member_of_options() {
        let options = opts(&["Alpha", "Beta"]);
        for reply in ["", "Gamma", "alpha beta", "随便什么回复", "The answer is: Beta!"] {
            let picked = match_option(reply, &options);
            assert!(options.contains(&picked), "回复 {:?} 匹配出了非选项值 {:?}", reply, picked);
        }
    }

    #[test]
    fn test_punctuation_stripped_in_tokens() {
        let tokens = tokenize("Paris, France!");
        assert!(tokens.contains("paris"));
        assert!(tokens.contains("france"));
    }
}
