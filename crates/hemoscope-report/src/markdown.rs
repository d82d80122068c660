//! 模型建议文本的 Markdown 子集解析
//!
//! 支持 `#`/`##` 标题、`-`/`*`/`•` 列表、`1.`/`1)` 编号项、`**粗体**` 和普通段落。

use regex::Regex;
use std::sync::OnceLock;

/// 文本块
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: usize, text: String },
    Bullet(String),
    Numbered { number: String, text: String },
    Paragraph(String),
    Blank,
}

fn bold_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*\*(.*?)\*\*").expect("valid regex"))
}

/// 去掉粗体标记
pub fn strip_bold(text: &str) -> String {
    bold_pattern().replace_all(text, "$1").into_owned()
}

/// 粗体转为 `<strong>`，输入须已转义
pub fn bold_to_html(escaped: &str) -> String {
    bold_pattern()
        .replace_all(escaped, "<strong>$1</strong>")
        .into_owned()
}

/// 按行解析为文本块
pub fn parse_blocks(text: &str) -> Vec<Block> {
    text.lines().map(parse_line).collect()
}

fn parse_line(line: &str) -> Block {
    let stripped = line.trim();
    if stripped.is_empty() {
        return Block::Blank;
    }

    let hashes = stripped.chars().take_while(|c| *c == '#').count();
    if (1..=6).contains(&hashes) && stripped[hashes..].starts_with(' ') {
        return Block::Heading {
            level: hashes,
            text: stripped[hashes..].trim().to_string(),
        };
    }

    for marker in ["- ", "* ", "\u{2022} "] {
        if let Some(rest) = stripped.strip_prefix(marker) {
            return Block::Bullet(rest.trim().to_string());
        }
    }

    let digits = stripped.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 && stripped.len() > digits + 1 {
        let rest = &stripped[digits..];
        if let Some(text) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            return Block::Numbered {
                number: stripped[..digits].to_string(),
                text: text.trim().to_string(),
            };
        }
    }

    Block::Paragraph(stripped.to_string())
}
