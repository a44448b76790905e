//! Text formatting helpers for the Markdown report.

use crate::dashboard::charts::ChartPoint;

/// Bar glyph of the text charts.
const BAR: char = '█';

/// Format an amount as Brazilian Real, e.g. `R$ 1.234,56`.
///
/// The symbol is separated by a no-break space, thousands by `.` and the
/// decimals by `,`.
pub fn format_brl(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!(
        "{}R$\u{a0}{},{:02}",
        sign,
        group_thousands(cents / 100),
        cents % 100
    )
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    out
}

/// Integral values without decimals, the rest with two.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

/// Render points as horizontal text bars, the largest `width` glyphs long.
///
/// Output is a fenced code block so the columns stay aligned.
pub fn text_bars(points: &[ChartPoint], width: usize) -> String {
    if points.is_empty() {
        return String::new();
    }

    let label_width = points
        .iter()
        .map(|p| p.label.chars().count())
        .max()
        .unwrap_or(0);
    let max = points.iter().map(|p| p.value).fold(0.0_f64, f64::max);

    let mut block = String::from("```text\n");
    for point in points {
        let len = if max > 0.0 {
            ((point.value.max(0.0) / max) * width as f64).round() as usize
        } else {
            0
        };
        let bar: String = std::iter::repeat(BAR).take(len).collect();
        block.push_str(&format!(
            "{:<label_width$} {:<width$} {}\n",
            point.label,
            bar,
            format_number(point.value),
            label_width = label_width,
            width = width,
        ));
    }
    block.push_str("```\n\n");
    block
}

/// Rows to show and the note for the hidden remainder.
///
/// `max_rows == 0` keeps every row.
pub fn truncate<T>(rows: &[T], max_rows: usize) -> (&[T], Option<String>) {
    if max_rows == 0 || rows.len() <= max_rows {
        return (rows, None);
    }
    let hidden = rows.len() - max_rows;
    (
        &rows[..max_rows],
        Some(format!("*… {} more rows not shown.*\n\n", hidden)),
    )
}

/// Escape characters that would break a Markdown table cell.
pub fn cell(text: &str) -> String {
    text.replace('|', "\\|")
}
