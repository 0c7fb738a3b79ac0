//! Repository handling
//!
//! Getting a working copy of the repository to convert, and finding the
//! notebooks inside it.

pub mod discover;
pub mod source;

pub use discover::discover_notebooks;
pub use source::{acquire, RepoSource, WorkTree};
