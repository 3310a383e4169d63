use console::measure_text_width;

/// Terminal columns taken by `s`, ignoring ANSI styling.
pub fn display_width(s: &str) -> usize {
    measure_text_width(s)
}

fn char_width(ch: char) -> usize {
    let mut buf = [0u8; 4];
    measure_text_width(ch.encode_utf8(&mut buf))
}

/// Wrap a single line into pieces no wider than `max_width` columns,
/// preferring to break at spaces.
pub fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    let max_width = max_width.max(1);
    let mut lines = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if display_width(remaining) <= max_width {
            lines.push(remaining.to_string());
            break;
        }

        let mut last_space = None;
        let mut fit_end = 0;
        let mut width = 0;
        for (pos, ch) in remaining.char_indices() {
            let w = char_width(ch);
            if width + w > max_width {
                break;
            }
            if ch == ' ' {
                last_space = Some(pos);
            }
            width += w;
            fit_end = pos + ch.len_utf8();
        }

        match last_space.filter(|&p| p > 0) {
            Some(pos) => {
                lines.push(remaining[..pos].to_string());
                remaining = remaining[pos + 1..].trim_start();
            }
            None => {
                // A single glyph wider than the box still has to move forward.
                let end = if fit_end == 0 {
                    remaining.chars().next().map_or(remaining.len(), char::len_utf8)
                } else {
                    fit_end
                };
                lines.push(remaining[..end].to_string());
                remaining = &remaining[end..];
            }
        }
    }
    lines
}

/// Wrap every line of a multi-line block, keeping blank lines.
pub fn wrap_block(text: &str, max_width: usize) -> Vec<String> {
    let mut out = Vec::new();
    for line in text.lines() {
        if line.is_empty() {
            out.push(String::new());
        } else {
            out.extend(wrap_text(line, max_width));
        }
    }
    out
}
