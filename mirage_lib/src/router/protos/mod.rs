// `rules.rs` is generated from rules.proto by build.rs.
#[allow(clippy::all, clippy::pedantic)]
pub mod rules;
