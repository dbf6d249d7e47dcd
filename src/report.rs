use std::fmt::Write as _;

/// Renders rows as an aligned plain-text table. Cells that parse as numbers
/// are right-aligned; everything else is left-aligned.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths = headers
        .iter()
        .map(|h| h.chars().count())
        .collect::<Vec<_>>();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(flatten(cell).chars().count());
        }
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", join_cells(headers.iter().map(|h| h.as_str()), &widths, false));
    let rule = widths.iter().map(|w| "-".repeat((*w).max(1))).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", join_cells(rule.iter().map(|r| r.as_str()), &widths, false));
    for row in rows {
        let cells = row.iter().map(|c| flatten(c)).collect::<Vec<_>>();
        let _ = writeln!(output, "{}", join_cells(cells.iter().map(|c| c.as_str()), &widths, true));
    }
    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

/// Formats a metric for display: whole numbers without decimals, others to
/// four places, missing values blank.
pub fn format_metric(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.4}")
    }
}

fn join_cells<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize], align_numbers: bool) -> String {
    let mut line = cells
        .zip(widths)
        .map(|(cell, width)| {
            if align_numbers && cell.trim().parse::<f64>().is_ok() {
                format!("{cell:>width$}")
            } else {
                format!("{cell:<width$}")
            }
        })
        .collect::<Vec<_>>()
        .join("  ");
    line.truncate(line.trim_end().len());
    line
}

fn flatten(value: &str) -> String {
    value.replace(['\n', '\r', '\t'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_align_right_and_text_left() {
        let headers = vec!["CBSA_Name".to_string(), "avg_jobs".to_string()];
        let rows = vec![
            vec!["Boston".to_string(), "0.25".to_string()],
            vec!["Springfield, MA".to_string(), "12.5".to_string()],
        ];
        let rendered = render_table(&headers, &rows);
        let lines = rendered.lines().collect::<Vec<_>>();
        assert_eq!(
            lines,
            vec![
                "CBSA_Name        avg_jobs",
                "---------------  --------",
                "Boston               0.25",
                "Springfield, MA      12.5",
            ]
        );
    }

    #[test]
    fn control_characters_are_flattened() {
        let rendered = render_table(&["note".to_string()], &[vec!["a\nb\tc".to_string()]]);
        assert_eq!(rendered.lines().nth(2), Some("a b c"));
    }

    #[test]
    fn metric_formatting() {
        assert_eq!(format_metric(3.0), "3");
        assert_eq!(format_metric(0.123456), "0.1235");
        assert_eq!(format_metric(f64::NAN), "");
    }
}
