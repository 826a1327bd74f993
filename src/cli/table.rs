use serde_json::Value;

use terminal_size::{terminal_size, Height, Width};

/// Env override that forces raw JSON output.
pub const ENV_OUTPUT: &str = "PROLENS_OUTPUT";

// Print a list response (cameras, rentals, users) as an ASCII table.
// Returns true if a table was printed, false when the caller should fall back to JSON.
pub fn print_table(val: &Value) -> bool {
    if std::env::var(ENV_OUTPUT).map(|v| v.eq_ignore_ascii_case("json")).unwrap_or(false) {
        return false;
    }
    let termw = get_terminal_width();
    crate::tprintln!("[cli.table] detected terminal width={} columns", termw);
    match render_table(val, termw) {
        Some(lines) => {
            for l in lines {
                println!("{}", l);
            }
            true
        }
        None => false,
    }
}

/// Table lines for `val`, or `None` when it is not a non-empty array.
/// Arrays of objects get one column per key (union, sorted); anything else
/// becomes a single `value` column. Lists wrapped as `{"data": [...]}` are
/// unwrapped first.
pub fn render_table(val: &Value, termw: usize) -> Option<Vec<String>> {
    let arr = match val {
        Value::Array(a) => a,
        Value::Object(m) => m.get("data")?.as_array()?,
        _ => return None,
    };
    if arr.is_empty() {
        return None;
    }

    let (cols, rows) = columns_and_rows(arr);
    let mut widths: Vec<usize> = cols.iter().map(|s| visible_len(s).min(termw)).collect();
    for r in &rows {
        for (i, cell) in r.iter().enumerate().take(cols.len()) {
            let w = visible_len(cell);
            if w > widths[i] {
                widths[i] = w.min(termw);
            }
        }
    }

    let sep = build_separator(&widths);
    let mut out = vec![fit_line(&sep, termw), fit_line(&build_row(&cols, &widths, false), termw), fit_line(&sep, termw)];
    for r in &rows {
        out.push(fit_line(&build_row(r, &widths, true), termw));
    }
    out.push(fit_line(&sep, termw));
    out.push(format!("rows: {}, cols: {}", rows.len(), cols.len()));
    Some(out)
}

fn columns_and_rows(arr: &[Value]) -> (Vec<String>, Vec<Vec<String>>) {
    let mut keys: Vec<String> = Vec::new();
    let mut all_objects = true;
    for el in arr {
        if let Value::Object(map) = el {
            for k in map.keys() {
                if !keys.contains(k) {
                    keys.push(k.clone());
                }
            }
        } else {
            all_objects = false;
        }
    }
    if all_objects && !keys.is_empty() {
        keys.sort();
        let rows = arr
            .iter()
            .map(|el| keys.iter().map(|k| el.get(k).map(to_cell_string).unwrap_or_default()).collect())
            .collect();
        return (keys, rows);
    }
    (vec!["value".to_string()], arr.iter().map(|el| vec![to_cell_string(el)]).collect())
}

fn to_cell_string(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn build_separator(widths: &[usize]) -> String {
    let mut s = String::from("+");
    for w in widths {
        s.push_str(&"-".repeat(*w + 2));
        s.push('+');
    }
    s
}

fn build_row(cells: &[String], widths: &[usize], align_numbers: bool) -> String {
    let mut s = String::from("|");
    for (i, w) in widths.iter().enumerate() {
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        let text = truncate(cell, *w);
        let pad = " ".repeat(w.saturating_sub(visible_len(&text)));
        s.push(' ');
        if align_numbers && is_numeric_like(cell) {
            s.push_str(&pad);
            s.push_str(&text);
        } else {
            s.push_str(&text);
            s.push_str(&pad);
        }
        s.push_str(" |");
    }
    s
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    if max <= 1 {
        return "…".to_string();
    }
    s.chars().take(max - 1).collect::<String>() + "…"
}

fn is_numeric_like(s: &str) -> bool {
    let st = s.trim();
    let mut has_digit = false;
    for ch in st.chars() {
        if ch.is_ascii_digit() {
            has_digit = true;
            continue;
        }
        if ".-+,".contains(ch) {
            continue;
        }
        return false;
    }
    has_digit
}

fn get_terminal_width() -> usize {
    match terminal_size() {
        Some((Width(w), Height(_))) if w > 4 => (w - 4) as usize,
        _ => 80,
    }
}

fn fit_line(s: &str, maxw: usize) -> String { truncate(s, maxw) }

fn visible_len(s: &str) -> usize { s.chars().count() }
