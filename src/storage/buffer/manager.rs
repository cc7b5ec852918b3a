use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, error, warn};
use parking_lot::Mutex;

use crate::common::types::{PageId, DEFAULT_PAGE_SIZE};
use crate::storage::buffer::error::BufferPoolError;
use crate::storage::buffer::frame::{BufferFrame, ExclusiveGuard, FrameHandle, LatchGuard};
use crate::storage::buffer::replacer::TwoQueueReplacer;
use crate::storage::disk::SegmentManager;

/// Construction parameters for a `BufferPool`.
#[derive(Debug, Clone)]
pub struct BufferPoolConfig {
    /// Size in bytes that all pages will have.
    pub page_size: usize,
    /// Maximum number of pages resident in memory at the same time.
    pub page_count: usize,
    /// Directory holding the segment files.
    pub data_dir: PathBuf,
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            page_count: 1024,
            data_dir: PathBuf::from("data"),
        }
    }
}

/// Everything the pool lock protects: the resident mapping, the two
/// replacement queues, and (through the frame `Arc`s) every frame's pin
/// count and dirty flag.
struct PoolState {
    residents: HashMap<PageId, Arc<BufferFrame>>,
    replacer: TwoQueueReplacer,
}

/// A fixed-capacity cache of disk pages with per-page reader/writer
/// latches and two-queue (FIFO then LRU) replacement.
///
/// Lock ordering: the pool lock is acquired first and always released
/// before a thread blocks on a frame latch or performs disk I/O. Pin
/// counts change only under the pool lock, so a frame pinned for a fixer
/// can never be chosen as a victim while that fixer is still waiting on
/// the latch.
pub struct BufferPool {
    page_size: usize,
    page_count: usize,
    disk: Arc<SegmentManager>,
    state: Mutex<PoolState>,
}

impl BufferPool {
    /// Create a pool holding at most `page_count` pages of `page_size`
    /// bytes, backed by segment files under `data_dir`.
    pub fn new(
        page_size: usize,
        page_count: usize,
        data_dir: impl AsRef<Path>,
    ) -> Result<Self, BufferPoolError> {
        assert!(page_size > 0, "page_size must be non-zero");

        let disk = Arc::new(SegmentManager::new(data_dir)?);
        Ok(Self {
            page_size,
            page_count,
            disk,
            state: Mutex::new(PoolState {
                residents: HashMap::with_capacity(page_count),
                replacer: TwoQueueReplacer::new(page_count),
            }),
        })
    }

    pub fn with_config(config: BufferPoolConfig) -> Result<Self, BufferPoolError> {
        Self::new(config.page_size, config.page_count, config.data_dir)
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Number of pages currently resident.
    pub fn resident_count(&self) -> usize {
        self.state.lock().residents.len()
    }

    /// Resolve a page id to a resident frame and return a handle whose
    /// latch is held in the requested mode, reading the page from disk
    /// on a miss and evicting an unpinned resident when at capacity.
    ///
    /// Fails with `BufferFull` iff the pool is at capacity and every
    /// resident frame is pinned; fails with `IoError` when the file
    /// layer fails a read on admission or every write-back candidate
    /// fails.
    pub fn fix_page(
        &self,
        page_id: PageId,
        exclusive: bool,
    ) -> Result<FrameHandle<'_>, BufferPoolError> {
        let mut last_io_error: Option<BufferPoolError> = None;
        let mut failed_victims: Vec<PageId> = Vec::new();

        let mut state = self.state.lock();
        loop {
            // Hit: pin and promote under the pool lock, latch after.
            if let Some(frame) = state.residents.get(&page_id) {
                let frame = Arc::clone(frame);
                frame.pin();
                state.replacer.touch(page_id);
                drop(state);

                let guard = if exclusive {
                    LatchGuard::Exclusive(frame.latch_exclusive())
                } else {
                    LatchGuard::Shared(frame.latch_shared())
                };
                return Ok(FrameHandle::new(self, frame, guard));
            }

            // Miss with a free slot: admit directly onto the FIFO queue.
            if state.residents.len() < self.page_count {
                let frame = Arc::new(BufferFrame::new(page_id, self.page_size));
                frame.pin();
                state.residents.insert(page_id, Arc::clone(&frame));
                state.replacer.admit(page_id);
                drop(state);

                return self.read_into(frame, exclusive);
            }

            // Miss at capacity: first unpinned resident in scan order,
            // FIFO before LRU, oldest first.
            let victim = state
                .replacer
                .candidates()
                .filter(|id| !failed_victims.contains(id))
                .map(|id| Arc::clone(&state.residents[&id]))
                .find(|frame| frame.pin_count() == 0);

            let victim = match victim {
                Some(victim) => victim,
                None => {
                    drop(state);
                    return Err(last_io_error.unwrap_or(BufferPoolError::BufferFull));
                }
            };

            if !victim.is_dirty() {
                // Clean victim: replace the slot without any I/O.
                let victim_id = victim.page_id();
                state.residents.remove(&victim_id);
                state.replacer.remove(victim_id);
                debug!("evicting clean page {} for page {}", victim_id, page_id);

                let frame = Arc::new(BufferFrame::new(page_id, self.page_size));
                frame.pin();
                state.residents.insert(page_id, Arc::clone(&frame));
                state.replacer.admit(page_id);
                drop(state);

                return self.read_into(frame, exclusive);
            }

            // Dirty victim: write it back without the pool lock, then
            // re-derive the whole decision from scratch. The temporary
            // pin keeps the frame resident across the write; claiming
            // the dirty flag up front means a concurrent re-dirty is
            // never lost.
            victim.pin();
            victim.set_dirty(false);
            drop(state);

            let written = {
                let data = victim.latch_shared();
                victim.write_to_disk(&self.disk, &data)
            };

            state = self.state.lock();
            victim.unpin();
            match written {
                Ok(()) => {
                    debug!("wrote back dirty page {} ahead of eviction", victim.page_id());
                }
                Err(err) => {
                    let victim_id = victim.page_id();
                    warn!("write-back of page {} failed: {}", victim_id, err);
                    victim.set_dirty(true);
                    failed_victims.push(victim_id);
                    last_io_error = Some(BufferPoolError::IoError {
                        page_id: victim_id,
                        source: err,
                    });
                }
            }
        }
    }

    /// Return a handle, releasing its latch and pin. `dirty` is OR-ed
    /// into the frame's dirty flag, so a clean unfix never erases an
    /// earlier dirty mark.
    pub fn unfix_page(&self, mut handle: FrameHandle<'_>, dirty: bool) {
        debug_assert!(handle.same_pool(self), "handle was not issued by this pool");
        if dirty {
            handle.mark_dirty();
        }
        // Dropping the handle releases the latch first, then does the
        // pin and queue bookkeeping under the pool lock.
    }

    /// Page ids on the FIFO queue, oldest first. Snapshot for testing;
    /// not synchronized with concurrent fixers.
    pub fn get_fifo_list(&self) -> Vec<PageId> {
        self.state.lock().replacer.fifo_list()
    }

    /// Page ids on the LRU queue, least recently fixed first. Snapshot
    /// for testing; not synchronized with concurrent fixers.
    pub fn get_lru_list(&self) -> Vec<PageId> {
        self.state.lock().replacer.lru_list()
    }

    /// Write one resident page back to disk if it is dirty. The write
    /// happens under the frame's shared latch with the pool lock
    /// released.
    pub fn flush_page(&self, page_id: PageId) -> Result<(), BufferPoolError> {
        let frame = {
            let state = self.state.lock();
            match state.residents.get(&page_id) {
                Some(frame) if frame.is_dirty() => {
                    let frame = Arc::clone(frame);
                    frame.pin();
                    frame.set_dirty(false);
                    frame
                }
                _ => return Ok(()),
            }
        };

        let written = {
            let data = frame.latch_shared();
            frame.write_to_disk(&self.disk, &data)
        };

        let state = self.state.lock();
        frame.unpin();
        match written {
            Ok(()) => {
                drop(state);
                Ok(())
            }
            Err(err) => {
                frame.set_dirty(true);
                drop(state);
                Err(BufferPoolError::IoError {
                    page_id,
                    source: err,
                })
            }
        }
    }

    /// Write every dirty resident page back to disk. Used for clean
    /// shutdown; `Drop` performs the same sweep best-effort.
    pub fn flush_all_pages(&self) -> Result<(), BufferPoolError> {
        let page_ids: Vec<PageId> = {
            let state = self.state.lock();
            state.residents.keys().copied().collect()
        };

        for page_id in page_ids {
            self.flush_page(page_id)?;
        }

        Ok(())
    }

    /// Latch a freshly admitted frame, read its page from disk, then
    /// hand the latch over in the requested mode. On a read failure the
    /// frame is withdrawn from the pool before the error surfaces, so no
    /// partial contents are observable.
    fn read_into(
        &self,
        frame: Arc<BufferFrame>,
        exclusive: bool,
    ) -> Result<FrameHandle<'_>, BufferPoolError> {
        // The read happens under the exclusive latch: a concurrent fixer
        // of the same page blocks on the latch instead of observing
        // zeroed bytes.
        let mut guard = frame.latch_exclusive();
        if let Err(err) = frame.read_from_disk(&self.disk, &mut guard) {
            // A concurrent fixer may already be pinned and waiting on
            // this latch; leave it fresh-page zeroes, not a torn read.
            guard.fill(0);

            let page_id = frame.page_id();
            let mut state = self.state.lock();
            let resident = state
                .residents
                .get(&page_id)
                .map_or(false, |resident| Arc::ptr_eq(resident, &frame));
            if resident {
                state.residents.remove(&page_id);
                state.replacer.remove(page_id);
            }
            frame.unpin();
            drop(state);
            drop(guard);

            return Err(BufferPoolError::IoError {
                page_id,
                source: err,
            });
        }

        let guard = if exclusive {
            LatchGuard::Exclusive(guard)
        } else {
            LatchGuard::Shared(ExclusiveGuard::downgrade(guard))
        };
        Ok(FrameHandle::new(self, frame, guard))
    }

    /// Latch release and pin/queue bookkeeping shared by `unfix_page`
    /// and handle drop. Runs after the frame latch has been released.
    pub(crate) fn release_frame(&self, frame: &Arc<BufferFrame>, dirty: bool) {
        let mut state = self.state.lock();
        if dirty {
            frame.set_dirty(true);
        }
        frame.unpin();

        // The frame may have been withdrawn after a failed read while
        // this handle was still pinned; only reposition pages the pool
        // still owns.
        let resident = state
            .residents
            .get(&frame.page_id())
            .map_or(false, |resident| Arc::ptr_eq(resident, frame));
        if resident {
            state.replacer.refresh(frame.page_id());
        }
    }
}

impl Drop for BufferPool {
    fn drop(&mut self) {
        // Best-effort write-back of dirty residents. Callers must not
        // hold fixes across shutdown.
        let state = self.state.get_mut();
        for frame in state.residents.values() {
            debug_assert_eq!(
                frame.pin_count(),
                0,
                "page {} still fixed at pool shutdown",
                frame.page_id()
            );

            if !frame.is_dirty() {
                continue;
            }
            let data = frame.latch_shared();
            match frame.write_to_disk(&self.disk, &data) {
                Ok(()) => frame.set_dirty(false),
                Err(err) => {
                    error!("failed to write back page {} at shutdown: {}", frame.page_id(), err);
                }
            }
        }
    }
}
