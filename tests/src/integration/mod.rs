//! Cross-crate integration flows.

mod access;
mod flows;

#[cfg(test)]
pub(crate) mod support;
