#[path = "../support/mod.rs"]
mod support;

mod full_text;
