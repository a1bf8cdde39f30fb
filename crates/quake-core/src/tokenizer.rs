//! Quote-aware splitting of a single delimited line.

/// Split `line` into raw fields on `delimiter`.
///
/// * A `"` toggles the quoted state and is not copied into the field.
/// * Inside quotes the delimiter is literal, and `""` yields one `"`.
/// * A field that still starts and ends with `"` afterwards (only possible via
///   `""` escapes) loses that outer pair.
/// * The trailing field is always emitted, so `"a,"` gives `["a", ""]` and a
///   line without any delimiter gives one field.
pub fn split_fields(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '"' {
            if in_quotes && chars.peek() == Some(&'"') {
                current.push('"');
                chars.next();
            } else {
                in_quotes = !in_quotes;
            }
        } else if c == delimiter && !in_quotes {
            fields.push(strip_outer_quotes(std::mem::take(&mut current)));
        } else {
            current.push(c);
        }
    }

    fields.push(strip_outer_quotes(current));
    fields
}

fn strip_outer_quotes(value: String) -> String {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        value[1..value.len() - 1].to_string()
    } else {
        value
    }
}
