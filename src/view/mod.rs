//! Ordered displayable view of the module registry

mod sync;

pub use sync::{DisplayRow, ViewSynchronizer};

/// Presentation collaborator receiving positional row edits.
///
/// Whatever widget sits behind this is opaque to the core; the synchronizer
/// only guarantees that indices are valid at the moment each call is made.
pub trait RowSink {
    fn insert_row(&mut self, index: usize, row: &DisplayRow);
    fn update_row(&mut self, index: usize, row: &DisplayRow);
    fn remove_row(&mut self, index: usize);
}

/// A sink that discards every edit; for embeddings that poll
/// [`ViewSynchronizer::rows`] instead of mirroring edits
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRowSink;

impl RowSink for NullRowSink {
    fn insert_row(&mut self, _index: usize, _row: &DisplayRow) {}
    fn update_row(&mut self, _index: usize, _row: &DisplayRow) {}
    fn remove_row(&mut self, _index: usize) {}
}
