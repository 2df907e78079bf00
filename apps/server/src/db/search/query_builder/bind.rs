//! Positional bind bookkeeping. Placeholders are `$1`, `$2`, ... in push order.

use super::BindValue;

fn push(bind_params: &mut Vec<BindValue>, value: BindValue) -> usize {
    bind_params.push(value);
    bind_params.len()
}

/// Append a text bind and return its placeholder index.
pub(super) fn push_text(bind_params: &mut Vec<BindValue>, value: String) -> usize {
    push(bind_params, BindValue::Text(value))
}

/// Append a `text[]` bind (a JSON path for `#>`/`#>>`) and return its placeholder index.
pub(super) fn push_text_array(bind_params: &mut Vec<BindValue>, value: Vec<String>) -> usize {
    push(bind_params, BindValue::TextArray(value))
}
