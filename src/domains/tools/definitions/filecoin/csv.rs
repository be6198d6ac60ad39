//! Column filtering for CSV penalty responses.

/// Split one CSV record on commas outside double quotes.
///
/// Fields keep their original quoting.
fn split_record(line: &str) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (i, c) in line.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(&line[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    fields.push(&line[start..]);
    fields
}

fn header_name(field: &str) -> String {
    field.trim().trim_matches('"').trim().to_lowercase()
}

/// Remove the named columns (case-insensitive) from CSV text.
///
/// Columns are matched against the first line. Blank lines are dropped.
pub fn drop_columns(text: &str, drop: &[String]) -> String {
    if drop.is_empty() {
        return text.to_string();
    }

    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let Some(header) = lines.next() else {
        return String::new();
    };

    let drop: Vec<String> = drop.iter().map(|d| d.trim().to_lowercase()).collect();
    let keep: Vec<bool> = split_record(header)
        .iter()
        .map(|f| !drop.contains(&header_name(f)))
        .collect();

    std::iter::once(header)
        .chain(lines)
        .map(|line| {
            split_record(line.trim_end_matches('\r'))
                .into_iter()
                .enumerate()
                .filter(|(i, _)| keep.get(*i).copied().unwrap_or(true))
                .map(|(_, f)| f)
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
