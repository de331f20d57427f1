//! Command implementations.

mod base_path;
mod check;
mod global;
mod modules;

pub use base_path::BasePathCommand;
pub use check::CheckCommand;
pub use global::GlobalCommand;
pub use modules::ModulesCommand;

/// Names in `candidates` sharing a prefix with `name`, for "did you mean"
/// hints.
pub(crate) fn suggest<'a>(name: &str, candidates: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let needle = name.to_lowercase();
    candidates
        .into_iter()
        .filter(|c| {
            let c = c.to_lowercase();
            !needle.is_empty() && (c.starts_with(&needle) || needle.starts_with(&c))
        })
        .map(str::to_string)
        .collect()
}
