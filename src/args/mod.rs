//! CLI argument types and parsing helpers.
mod cli;
pub(crate) mod defaults;
pub(crate) mod parsers;

#[cfg(test)]
pub(crate) mod test_support;
#[cfg(test)]
mod tests;

pub use cli::LoadArgs;
pub use parsers::parse_duration_arg;
