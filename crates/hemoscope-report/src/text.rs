//! 文本处理：HTML 转义、PDF 字符集和自动换行

/// HTML 转义
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// 内置 Helvetica 只支持 Latin-1，常见排版符号先替换，其余字符替换为 `?`
pub fn pdf_safe(text: &str) -> String {
    let mut safe = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{2014}' => safe.push_str("--"),
            '\u{2013}' => safe.push('-'),
            '\u{2018}' | '\u{2019}' => safe.push('\''),
            '\u{201c}' | '\u{201d}' => safe.push('"'),
            '\u{2022}' => safe.push('-'),
            '\u{2026}' => safe.push_str("..."),
            '\u{2265}' => safe.push_str(">="),
            '\u{2264}' => safe.push_str("<="),
            '\u{03bc}' | '\u{00b5}' => safe.push('u'),
            '\t' => safe.push(' '),
            c if c.is_control() => {}
            c if (c as u32) <= 0xFF => safe.push(c),
            _ => safe.push('?'),
        }
    }
    safe
}

/// 按字符数自动换行，超长单词单独成行
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let current_len = current.chars().count();
        if current_len + word.chars().count() + 1 > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>O'Neil & Co</b>"), "&lt;b&gt;O&#39;Neil &amp; Co&lt;/b&gt;");
        assert_eq!(escape_html("Jane Doe"), "Jane Doe");
    }

    #[test]
    fn test_pdf_safe() {
        assert_eq!(
            pdf_safe("WBC \u{2265}50,000/\u{03bc}L \u{2014} high"),
            "WBC >=50,000/uL -- high"
        );
        assert_eq!(pdf_safe("José"), "José");
        assert_eq!(pdf_safe("🩸 张"), "? ?");
    }

    #[test]
    fn test_wrap_text() {
        let lines = wrap_text("one two three four five", 10);
        assert_eq!(lines, vec!["one two", "three four", "five"]);
        assert_eq!(wrap_text("", 10), vec![String::new()]);
        assert_eq!(wrap_text("abcdefghijklmnop", 5), vec!["abcdefghijklmnop"]);
    }
}
