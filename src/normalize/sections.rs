use super::types::LabeledItem;

/// Split `text` at the first `marker`. The marker itself is dropped.
pub fn split_section<'a>(text: &'a str, marker: &str) -> (&'a str, Option<&'a str>) {
    match text.find(marker) {
        Some(idx) => (&text[..idx], Some(&text[idx + marker.len()..])),
        None => (text, None),
    }
}

/// Text before the earliest of `markers` (all of `text` if none occur).
pub fn head_until<'a>(text: &'a str, markers: &[&str]) -> &'a str {
    let end = markers
        .iter()
        .filter_map(|m| text.find(m))
        .min()
        .unwrap_or(text.len());
    &text[..end]
}

/// Blocks that each start with `marker`. Preamble before the first marker is discarded.
pub fn split_blocks<'a>(text: &'a str, marker: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    text.split(marker).skip(1)
}

/// `key: value` split on the first colon only, both sides trimmed.
pub fn key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, value.trim()))
}

/// Byte offset just past `key:` on the first line that begins with it.
fn value_offset(text: &str, key: &str) -> Option<usize> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let indent = line.len() - line.trim_start().len();
        let body = &line[indent..];
        if body.starts_with(key) && body[key.len()..].starts_with(':') {
            return Some(offset + indent + key.len() + 1);
        }
        offset += line.len();
    }
    None
}

/// Single-line value of the first line beginning with `key:`.
pub fn field_line<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    let rest = &text[value_offset(text, key)?..];
    let value = rest.lines().next().unwrap_or("").trim();
    (!value.is_empty()).then_some(value)
}

/// Value of `key:` running across lines until the end of `text`.
pub fn field_span<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    let value = text[value_offset(text, key)?..].trim();
    (!value.is_empty()).then_some(value)
}

/// One `<label>: <text>` line. Tolerates a list bullet and `**bold**` labels.
pub fn labeled_line(line: &str) -> Option<LabeledItem> {
    let line = line.trim();
    let line = ["- ", "* ", "• "]
        .iter()
        .find_map(|b| line.strip_prefix(b))
        .unwrap_or(line);
    let (label, text) = key_value(line)?;
    let label = label.trim_matches('*').trim();
    let text = text.trim_start_matches('*').trim();
    if label.is_empty() || text.is_empty() {
        return None;
    }
    Some(LabeledItem {
        title: label.to_string(),
        description: text.to_string(),
    })
}

/// Every well-formed `<label>: <text>` line of a region, in order.
pub fn labeled_items(region: &str) -> Vec<LabeledItem> {
    region.lines().filter_map(labeled_line).collect()
}
