use super::super::bind::{push_text, push_text_array};
use super::super::BindValue;
use crate::db::search::clause::{FullTextClause, PhraseClause, TextOperator};

/// String and number values below the field, one row per value.
const VALUES_BELOW: &str = "jsonb_path_query(a.data #> ${path}, 'strict $.**') AS v(val)";
const INDEXED_VALUE: &str = "jsonb_typeof(v.val) IN ('string', 'number')";

/// Full-text match over every string and number value below the field.
///
/// Terms come out of the tokenizer (alphanumeric only), so they are safe to
/// splice into `to_tsquery` syntax inside a single bound string.
pub(in crate::db::search::query_builder) fn build_full_text_clause(
    clause: &FullTextClause,
    bind_params: &mut Vec<BindValue>,
) -> String {
    let joiner = match clause.operator {
        TextOperator::And => " & ",
        TextOperator::Or => " | ",
    };
    let query = clause
        .terms
        .iter()
        .map(|term| {
            if clause.prefix {
                format!("{term}:*")
            } else {
                term.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(joiner);

    let path_idx = push_text_array(bind_params, clause.field.segments().to_vec());
    let query_idx = push_text(bind_params, query);
    format!(
        "jsonb_to_tsvector('simple', a.data #> ${path_idx}, '[\"string\", \"numeric\"]') @@ to_tsquery('simple', ${query_idx})"
    )
}

/// Ordered phrase match confined to a single indexed value.
///
/// Distance 0 chains terms with `<->`; distance N chains them with `<N>`, so
/// each term must sit exactly N positions after the previous one.
pub(in crate::db::search::query_builder) fn build_phrase_clause(
    clause: &PhraseClause,
    bind_params: &mut Vec<BindValue>,
) -> String {
    let path_idx = push_text_array(bind_params, clause.field.segments().to_vec());
    let values = VALUES_BELOW.replace("{path}", &path_idx.to_string());

    let followed_by = if clause.distance == 0 {
        " <-> ".to_string()
    } else {
        format!(" <{}> ", clause.distance)
    };
    let query_idx = push_text(bind_params, clause.terms.join(followed_by.as_str()));
    format!(
        "EXISTS (SELECT 1 FROM {values} WHERE {INDEXED_VALUE} \
         AND to_tsvector('simple', v.val #>> '{{}}') @@ to_tsquery('simple', ${query_idx}))"
    )
}
