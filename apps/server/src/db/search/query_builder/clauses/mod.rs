mod range;
mod text;

use super::bind::push_text;
use super::BindValue;
use crate::db::search::clause::{Clause, DeletedMode};

/// SQL condition for one clause, `None` when the clause matches everything.
pub(super) fn build_clause(clause: &Clause, bind_params: &mut Vec<BindValue>) -> Option<String> {
    match clause {
        Clause::Collection(c) => {
            let idx = push_text(bind_params, c.slug.clone());
            Some(format!("c.slug = ${idx}"))
        }
        Clause::Contains(c) => {
            let idx = push_text(bind_params, c.pattern.to_string());
            Some(format!("a.data @> ${idx}::jsonb"))
        }
        Clause::Range(r) => Some(range::build_range_clause(r, bind_params)),
        Clause::FullText(f) => Some(text::build_full_text_clause(f, bind_params)),
        Clause::Phrase(p) => Some(text::build_phrase_clause(p, bind_params)),
        Clause::Deleted(DeletedMode::Exclude) => Some("a.deleted = false".to_string()),
        Clause::Deleted(DeletedMode::Only) => Some("a.deleted = true".to_string()),
        Clause::Deleted(DeletedMode::Include) => None,
    }
}
