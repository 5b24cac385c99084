//! Migration pipeline stages.
//!
//! Three stages run as tasks on the engine: analysis reads per-file history,
//! the builder groups revisions into changesets, and export writes them out.
//! Each stage hands off to the next by enqueuing its task behind its own
//! work, so the engine's FIFO order is the only sequencing needed.

pub mod analyzer;
pub mod builder;
pub mod exclude;
pub mod export;
pub mod source;

pub use analyzer::RevisionAnalyzer;
pub use builder::ChangesetBuilder;
pub use exclude::ExcludeMatcher;
pub use export::{ChangesetExporter, ChangesetWriter, CommitRecord, JournalWriter};
pub use source::{HistorySource, MANIFEST_FILE, ManifestSource};
