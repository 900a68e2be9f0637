use terminal_size::{terminal_size, Height, Width};

// Render rows as an ASCII table fitted to the terminal.
// Empty listings render as a single "(no rows)" line.
pub fn render_table(cols: &[&str], rows: &[Vec<String>]) -> String {
    render_table_width(cols, rows, get_terminal_width())
}

pub fn render_table_width(cols: &[&str], rows: &[Vec<String>], termw: usize) -> String {
    if rows.is_empty() {
        return "(no rows)".to_string();
    }
    crate::tprintln!("[cli.outputformatter] terminal width={} columns", termw);

    // Each column is capped so one long cell cannot push the rest off screen.
    let cap = (termw / cols.len().max(1)).max(8);
    let mut widths: Vec<usize> = cols.iter().map(|s| visible_len(s).min(cap)).collect();
    for r in rows {
        for (i, cell) in r.iter().enumerate().take(cols.len()) {
            let w = visible_len(cell);
            if w > widths[i] {
                widths[i] = w.min(cap);
            }
        }
    }

    let sep = build_separator(&widths);
    let mut out = Vec::with_capacity(rows.len() + 5);
    out.push(fit_line_to_width(&sep, termw));
    out.push(fit_line_to_width(&build_row_header_colored(cols, &widths), termw));
    out.push(fit_line_to_width(&sep, termw));
    for r in rows {
        out.push(fit_line_to_width(&build_row(r, &widths), termw));
    }
    out.push(fit_line_to_width(&sep, termw));
    out.push(format!("rows: {}", rows.len()));
    out.join("\n")
}

fn build_separator(widths: &[usize]) -> String {
    let mut s = String::from("+");
    for w in widths {
        s.push_str(&"-".repeat(*w + 2));
        s.push('+');
    }
    s
}

fn build_row(cells: &[String], widths: &[usize]) -> String {
    let mut s = String::from("|");
    for (i, w) in widths.iter().enumerate() {
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        let text = truncate(cell, *w);
        let pad = " ".repeat(w.saturating_sub(visible_len(&text)));
        s.push(' ');
        if is_numeric_like(cell) {
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

// Header names in green; padding follows the visible width.
fn build_row_header_colored(cells: &[&str], widths: &[usize]) -> String {
    let mut s = String::from("|");
    for (i, w) in widths.iter().enumerate() {
        let text = truncate(cells.get(i).copied().unwrap_or(""), *w);
        s.push(' ');
        s.push_str(&format!("\x1b[32m{}\x1b[0m", text));
        s.push_str(&" ".repeat(w.saturating_sub(visible_len(&text))));
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

// Right-align ids, counts and rupiah amounts.
fn is_numeric_like(s: &str) -> bool {
    let st = s.trim().trim_start_matches('-').trim_start_matches("Rp").trim();
    !st.is_empty() && st.chars().any(|c| c.is_ascii_digit()) && st.chars().all(|c| c.is_ascii_digit() || ".,".contains(c))
}

fn get_terminal_width() -> usize {
    match terminal_size() {
        Some((Width(w), Height(_))) if w > 20 => (w - 4) as usize,
        _ => 100,
    }
}

fn fit_line_to_width(s: &str, maxw: usize) -> String {
    if visible_len(s) <= maxw {
        return s.to_string();
    }
    let plain = strip_ansi(s);
    let keep = maxw.saturating_sub(3);
    plain.chars().take(keep).collect::<String>() + "..."
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\x1b' {
            if chars.peek() == Some(&'[') {
                chars.next();
                for c in chars.by_ref() {
                    if c.is_ascii_alphabetic() {
                        break;
                    }
                }
            }
            continue;
        }
        out.push(ch);
    }
    out
}

fn visible_len(s: &str) -> usize { strip_ansi(s).chars().count() }
