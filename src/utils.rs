/// Text processing utility functions / 文本处理工具函数

/// Replace every `\n` and `\r` with a space, then trim / 换行替换为空格并去除首尾空白
pub fn collapse_newlines(text: &str) -> String {
    text.replace(['\n', '\r'], " ").trim().to_string()
}

/// Keep at most `max_chars` characters, appending `...` only when something was cut
/// 按字符截断（非字节），仅在超长时追加省略号
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

/// Length-bounded, single-line excerpt; absent or empty input gives an empty preview
/// 生成预览文本
pub fn preview(text: Option<&str>, max_chars: usize) -> String {
    match text {
        Some(t) if !t.is_empty() => truncate_chars(&collapse_newlines(t), max_chars),
        _ => String::new(),
    }
}
