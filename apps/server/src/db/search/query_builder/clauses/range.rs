use chrono::SecondsFormat;

use super::super::bind::{push_text, push_text_array};
use super::super::BindValue;
use crate::db::search::clause::{RangeBound, RangeClause, RangeField};

/// Typed comparison of a record timestamp or a document value.
///
/// Document values are compared inside a `CASE` so the cast only runs once
/// the stored JSON type is known to match the bound; any other type yields
/// `false` instead of a cast error. Strings compare bytewise (`COLLATE "C"`).
pub(in crate::db::search::query_builder) fn build_range_clause(
    clause: &RangeClause,
    bind_params: &mut Vec<BindValue>,
) -> String {
    let op = clause.op.sql_operator();

    let path = match &clause.field {
        RangeField::Created | RangeField::Modified => {
            let column = if clause.field == RangeField::Created {
                "a.created"
            } else {
                "a.modified"
            };
            return match &clause.bound {
                RangeBound::Timestamp(ts) => {
                    let idx = push_text(bind_params, ts.to_rfc3339_opts(SecondsFormat::AutoSi, true));
                    format!("{column} {op} ${idx}::timestamptz")
                }
                // Composer only builds timestamp bounds for system fields.
                _ => "false".to_string(),
            };
        }
        RangeField::Data(path) => path,
    };

    let path_idx = push_text_array(bind_params, path.segments().to_vec());
    let (json_type, stored, bound) = match &clause.bound {
        RangeBound::Number(n) => {
            let idx = push_text(bind_params, n.to_string());
            ("number", format!("(a.data #>> ${path_idx})::numeric"), format!("${idx}::numeric"))
        }
        RangeBound::Text(s) => {
            let idx = push_text(bind_params, s.clone());
            ("string", format!("(a.data #>> ${path_idx}) COLLATE \"C\""), format!("${idx}"))
        }
        RangeBound::Bool(b) => {
            let idx = push_text(bind_params, b.to_string());
            ("boolean", format!("(a.data #>> ${path_idx})::boolean"), format!("${idx}::boolean"))
        }
        RangeBound::Timestamp(_) => return "false".to_string(),
    };

    format!(
        "CASE WHEN jsonb_typeof(a.data #> ${path_idx}) = '{json_type}' THEN {stored} {op} {bound} ELSE false END"
    )
}
