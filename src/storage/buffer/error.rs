use thiserror::Error;

use crate::common::types::PageId;
use crate::storage::disk::DiskError;

#[derive(Error, Debug)]
pub enum BufferPoolError {
    /// The pool is at capacity and every resident frame is pinned.
    /// Retryable once the caller unfixes other pages.
    #[error("buffer pool is full")]
    BufferFull,

    /// The file layer failed a read or write for the given page.
    #[error("IO error on page {page_id}: {source}")]
    IoError {
        page_id: PageId,
        #[source]
        source: DiskError,
    },

    #[error("disk error: {0}")]
    DiskError(#[from] DiskError),
}
