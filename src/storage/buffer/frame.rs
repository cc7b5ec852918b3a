use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::lock_api::{ArcRwLockReadGuard, ArcRwLockWriteGuard};
use parking_lot::{RawRwLock, RwLock};

use crate::common::types::{page_offset, segment_id, PageId};
use crate::storage::buffer::manager::BufferPool;
use crate::storage::disk::{DiskError, SegmentManager};

pub(crate) type SharedGuard = ArcRwLockReadGuard<RawRwLock, Box<[u8]>>;
pub(crate) type ExclusiveGuard = ArcRwLockWriteGuard<RawRwLock, Box<[u8]>>;

/// One resident page: its identity, pin/dirty bookkeeping, and the byte
/// buffer behind the frame latch.
///
/// `pin_count` and `dirty` are only read and written while the owning
/// pool holds its lock; the atomics let the pool update them through the
/// shared `Arc` without a second lock around the bookkeeping.
pub struct BufferFrame {
    page_id: PageId,
    pin_count: AtomicU32,
    dirty: AtomicBool,
    data: Arc<RwLock<Box<[u8]>>>,
}

impl BufferFrame {
    pub(crate) fn new(page_id: PageId, page_size: usize) -> Self {
        Self {
            page_id,
            pin_count: AtomicU32::new(0),
            dirty: AtomicBool::new(false),
            data: Arc::new(RwLock::new(vec![0u8; page_size].into_boxed_slice())),
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub(crate) fn pin(&self) {
        self.pin_count.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn unpin(&self) {
        let previous = self.pin_count.fetch_sub(1, Ordering::Relaxed);
        debug_assert!(previous > 0, "unpinning a frame with no outstanding fixes");
    }

    pub(crate) fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::Relaxed)
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Relaxed)
    }

    pub(crate) fn set_dirty(&self, dirty: bool) {
        self.dirty.store(dirty, Ordering::Relaxed);
    }

    /// Acquire the frame latch in shared mode. Blocks until granted.
    pub(crate) fn latch_shared(&self) -> SharedGuard {
        self.data.read_arc()
    }

    /// Acquire the frame latch in exclusive mode. Blocks until granted.
    pub(crate) fn latch_exclusive(&self) -> ExclusiveGuard {
        self.data.write_arc()
    }

    /// Read this frame's on-disk page into `buf`. Called with the frame
    /// latch held exclusively and the pool lock released.
    pub(crate) fn read_from_disk(
        &self,
        disk: &SegmentManager,
        buf: &mut [u8],
    ) -> Result<(), DiskError> {
        let segment = disk.segment(segment_id(self.page_id))?;
        segment.read_block(page_offset(self.page_id, buf.len()), buf)
    }

    /// Write `buf` back to this frame's on-disk page. Called with the
    /// frame latch held at least shared and the pool lock released.
    pub(crate) fn write_to_disk(
        &self,
        disk: &SegmentManager,
        buf: &[u8],
    ) -> Result<(), DiskError> {
        let segment = disk.segment(segment_id(self.page_id))?;
        segment.write_block(buf, page_offset(self.page_id, buf.len()))
    }
}

pub(crate) enum LatchGuard {
    Shared(SharedGuard),
    Exclusive(ExclusiveGuard),
}

/// Latched, pinned access to one page. The frame latch is held for as
/// long as the handle lives; returning the handle through
/// `BufferPool::unfix_page` (or simply dropping it) releases the latch
/// and the pin.
///
/// The handle is move-only and bound to the pool's lifetime. While it
/// exists the frame's pin count stays above zero, so the page cannot be
/// evicted underneath it.
pub struct FrameHandle<'pool> {
    pool: &'pool BufferPool,
    frame: Arc<BufferFrame>,
    guard: Option<LatchGuard>,
    dirty: bool,
}

impl<'pool> FrameHandle<'pool> {
    pub(crate) fn new(
        pool: &'pool BufferPool,
        frame: Arc<BufferFrame>,
        guard: LatchGuard,
    ) -> Self {
        Self {
            pool,
            frame,
            guard: Some(guard),
            dirty: false,
        }
    }

    pub fn page_id(&self) -> PageId {
        self.frame.page_id
    }

    pub fn is_exclusive(&self) -> bool {
        matches!(self.guard, Some(LatchGuard::Exclusive(_)))
    }

    /// The page bytes, valid while the latch is held.
    pub fn data(&self) -> &[u8] {
        match self.guard.as_ref().expect("frame latch already released") {
            LatchGuard::Shared(guard) => guard,
            LatchGuard::Exclusive(guard) => guard,
        }
    }

    /// Mutable page bytes.
    ///
    /// # Panics
    ///
    /// Panics if the page was fixed in shared mode.
    pub fn data_mut(&mut self) -> &mut [u8] {
        match self.guard.as_mut().expect("frame latch already released") {
            LatchGuard::Exclusive(guard) => guard,
            LatchGuard::Shared(_) => {
                panic!("mutable access to page {} through a shared fix", self.frame.page_id)
            }
        }
    }

    /// Record that the caller modified the page. Used when the handle is
    /// dropped instead of being returned through `unfix_page`.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn same_pool(&self, pool: &BufferPool) -> bool {
        std::ptr::eq(self.pool, pool)
    }
}

impl Drop for FrameHandle<'_> {
    fn drop(&mut self) {
        // The latch must be released before the pool bookkeeping runs; a
        // thread holding both could deadlock against another fixer.
        self.guard.take();
        self.pool.release_frame(&self.frame, self.dirty);
    }
}
