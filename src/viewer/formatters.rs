//! Output Formatters Implementation
//!
//! 各出力フォーマットの実装を提供するモジュール。

use std::io::Write;

use unicode_width::UnicodeWidthStr;

use super::{TablePreview, EMPTY_STATE_TEXT};
use crate::error::SheetChatError;

/// 罫線付きプレーンテキストのフォーマッター
pub struct TextFormatter;

impl TextFormatter {
    pub fn render<W: Write>(
        &self,
        preview: &TablePreview,
        writer: &mut W,
    ) -> Result<(), SheetChatError> {
        if preview.is_empty() {
            writeln!(writer, "{}", EMPTY_STATE_TEXT)?;
            return Ok(());
        }

        let headers: Vec<String> = preview.headers().iter().map(|h| single_line(h)).collect();
        let rows: Vec<Vec<String>> = preview
            .rows()
            .iter()
            .map(|row| row.iter().map(|cell| single_line(cell)).collect())
            .collect();

        let widths = column_widths(&headers, &rows, 1);
        let border = text_border(&widths);

        writeln!(writer, "{}", border)?;
        write_row(writer, &headers, &widths)?;
        writeln!(writer, "{}", border)?;
        for row in &rows {
            write_row(writer, row, &widths)?;
        }
        writeln!(writer, "{}", border)?;

        if let Some(notice) = preview.truncation_notice() {
            writeln!(writer, "{}", notice)?;
        }

        writer.flush()?;
        Ok(())
    }
}

/// Markdown形式のフォーマッター
pub struct MarkdownFormatter;

impl MarkdownFormatter {
    pub fn render<W: Write>(
        &self,
        preview: &TablePreview,
        writer: &mut W,
    ) -> Result<(), SheetChatError> {
        if preview.is_empty() {
            writeln!(writer, "{}", EMPTY_STATE_TEXT)?;
            return Ok(());
        }

        let headers: Vec<String> = preview.headers().iter().map(|h| escape_markdown(h)).collect();
        let rows: Vec<Vec<String>> = preview
            .rows()
            .iter()
            .map(|row| row.iter().map(|cell| escape_markdown(cell)).collect())
            .collect();

        // 最小幅は3文字（区切り行の最小幅）
        let widths = column_widths(&headers, &rows, 3);

        write_row(writer, &headers, &widths)?;
        let mut separator = String::from("|");
        for &width in &widths {
            separator.push_str(&"-".repeat(width + 2));
            separator.push('|');
        }
        writeln!(writer, "{}", separator)?;
        for row in &rows {
            write_row(writer, row, &widths)?;
        }

        if let Some(notice) = preview.truncation_notice() {
            writeln!(writer)?;
            writeln!(writer, "{}", notice)?;
        }

        writer.flush()?;
        Ok(())
    }
}

/// HTML形式のフォーマッター
pub struct HtmlFormatter;

impl HtmlFormatter {
    pub fn render<W: Write>(
        &self,
        preview: &TablePreview,
        writer: &mut W,
    ) -> Result<(), SheetChatError> {
        if preview.is_empty() {
            writeln!(writer, "<p>{}</p>", EMPTY_STATE_TEXT)?;
            return Ok(());
        }

        writeln!(writer, "<table>")?;
        writeln!(writer, "  <thead>")?;
        writeln!(writer, "    <tr>")?;
        for header in preview.headers() {
            writeln!(writer, "      <th>{}</th>", escape_html(header))?;
        }
        writeln!(writer, "    </tr>")?;
        writeln!(writer, "  </thead>")?;

        writeln!(writer, "  <tbody>")?;
        for row in preview.rows() {
            writeln!(writer, "    <tr>")?;
            for cell in row {
                writeln!(writer, "      <td>{}</td>", escape_html(cell))?;
            }
            writeln!(writer, "    </tr>")?;
        }
        writeln!(writer, "  </tbody>")?;
        writeln!(writer, "</table>")?;

        if let Some(notice) = preview.truncation_notice() {
            writeln!(writer, "<p>{}</p>", notice)?;
        }

        writer.flush()?;
        Ok(())
    }
}

/// 各列の表示幅（全角文字は2、半角文字は1）
fn column_widths(headers: &[String], rows: &[Vec<String>], min_width: usize) -> Vec<usize> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.width().max(min_width)).collect();
    for row in rows {
        for (col_idx, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(col_idx) {
                *width = (*width).max(cell.width());
            }
        }
    }
    widths
}

/// 表示幅に基づいて右側を空白で埋める
fn pad(content: &str, width: usize) -> String {
    let content_width = content.width();
    let mut padded = content.to_string();
    if content_width < width {
        padded.push_str(&" ".repeat(width - content_width));
    }
    padded
}

fn text_border(widths: &[usize]) -> String {
    let mut border = String::from("+");
    for &width in widths {
        border.push_str(&"-".repeat(width + 2));
        border.push('+');
    }
    border
}

/// `| a | b |`形式の1行を出力
fn write_row<W: Write>(
    writer: &mut W,
    cells: &[String],
    widths: &[usize],
) -> Result<(), SheetChatError> {
    write!(writer, "|")?;
    for (cell, &width) in cells.iter().zip(widths) {
        write!(writer, " {} |", pad(cell, width))?;
    }
    writeln!(writer)?;
    Ok(())
}

/// 改行を空白に置き換える
fn single_line(s: &str) -> String {
    s.replace("\r\n", " ").replace(['\n', '\r'], " ")
}

/// Markdown特殊文字をエスケープ
fn escape_markdown(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('|', "\\|")
        .replace("\r\n", "<br>")
        .replace('\n', "<br>")
}

/// HTML特殊文字をエスケープ
fn escape_html(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::PreviewFormat;

    fn sample() -> TablePreview {
        TablePreview::from_content(r#"[{"Name": "Alice", "Age": 30}, {"Name": "Bob"}]"#).unwrap()
    }

    #[test]
    fn test_text_render() {
        let output = sample().render_to_string(PreviewFormat::Text).unwrap();
        let expected = "\
+-------+-----+
| Name  | Age |
+-------+-----+
| Alice | 30  |
| Bob   |     |
+-------+-----+
";
        assert_eq!(output, expected);
    }

    #[test]
    fn test_markdown_render() {
        let output = sample().render_to_string(PreviewFormat::Markdown).unwrap();
        let expected = "\
| Name  | Age |
|-------|-----|
| Alice | 30  |
| Bob   |     |
";
        assert_eq!(output, expected);
    }

    #[test]
    fn test_html_render_escapes() {
        let preview = TablePreview::from_content(r#"[{"<b>": "a & b"}]"#).unwrap();
        let output = preview.render_to_string(PreviewFormat::Html).unwrap();
        assert!(output.contains("<th>&lt;b&gt;</th>"));
        assert!(output.contains("<td>a &amp; b</td>"));
        assert!(output.starts_with("<table>"));
    }

    #[test]
    fn test_wide_characters_are_aligned() {
        let preview = TablePreview::from_content(r#"[{"名前": "山田"}, {"名前": "a"}]"#).unwrap();
        let output = preview.render_to_string(PreviewFormat::Text).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        let expected_width = lines[0].width();
        for line in &lines {
            assert_eq!(line.width(), expected_width, "misaligned line: {}", line);
        }
    }

    #[test]
    fn test_escape_markdown() {
        assert_eq!(escape_markdown("a|b"), "a\\|b");
        assert_eq!(escape_markdown("line1\nline2"), "line1<br>line2");
    }

    #[test]
    fn test_truncation_notice_rendered() {
        let content = format!(
            "[{}]",
            (0..120)
                .map(|i| format!("{{\"n\": {}}}", i))
                .collect::<Vec<_>>()
                .join(",")
        );
        let preview = TablePreview::from_content(&content).unwrap();
        for format in [PreviewFormat::Text, PreviewFormat::Markdown, PreviewFormat::Html] {
            let output = preview.render_to_string(format).unwrap();
            assert!(output.contains("Showing first 100 rows of 120 total rows"));
            assert!(!output.contains("| 100 "));
        }
    }
}
