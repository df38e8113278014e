//! The coordinator: routes requests between bucket caches, page bump
//! allocation, page rotation, and the oversized passthrough.

use core::alloc::Layout;
use core::cell::UnsafeCell;
use core::fmt;
use core::mem;
use core::ptr::NonNull;
use std::alloc::{GlobalAlloc, System};

#[cfg(feature = "logging")]
use tracing::{debug, trace};

use crate::cache::BlockCache;
use crate::config::PoolConfig;
use crate::error::Result;
use crate::page::Page;
use crate::size_class::{CLASS_COUNT, MAX_BLOCK_SIZE, SizeClassTable};
#[cfg(feature = "stats")]
use crate::stats::{LargeStats, PoolReport};
use crate::sync::Section;

/// Natural word alignment; the only alignment the bucket/page system
/// serves.
const WORD_ALIGN: usize = mem::align_of::<usize>();

/// The two active bump pages plus the retirement archive.
///
/// Archived pages are retained for the life of the pool so every block
/// ever issued from them stays valid; there is no compaction.
struct PageSlots {
    page_a: Page,
    page_b: Page,
    archived: Vec<Page>,
}

/// Segregated size-class pool backed by bump pages.
///
/// `allocate` classifies a request into one of [`CLASS_COUNT`] canonical
/// sizes, recycles a cached block when one exists, and otherwise carves
/// the class's canonical size from one of two active pages, rotating a
/// fresh page in when both are exhausted. Requests above
/// [`MAX_BLOCK_SIZE`] bypass all of that and go to the system allocator.
///
/// One instance is meant to serve the host application for its lifetime:
/// own it at the composition root and hand out references. Dropping the
/// pool invalidates every block it has issued.
pub struct BlockPool {
    classes: SizeClassTable,
    caches: [BlockCache; CLASS_COUNT],
    /// Active pages and archive; only touched inside `section`.
    slots: UnsafeCell<PageSlots>,
    /// Coordinates bucket miss, page fallback, and rotation as one span.
    /// Blocking rather than spinning: rotation constructs a whole page.
    section: Section,
    config: PoolConfig,
    #[cfg(feature = "stats")]
    large: LargeStats,
}

// SAFETY: `slots` is only accessed inside `section`; caches and pages
// carry their own sections. With `thread_safe` disabled every section is
// a no-op and the pool is restricted to single-owner use by contract.
unsafe impl Send for BlockPool {}
unsafe impl Sync for BlockPool {}

impl BlockPool {
    /// Builds a pool with the default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(PoolConfig::default())
    }

    /// Builds a pool from `config`, validating it first.
    pub fn with_config(config: PoolConfig) -> Result<Self> {
        config.validate()?;

        let classes = SizeClassTable::new();
        let caches: [BlockCache; CLASS_COUNT] = core::array::from_fn(|class| {
            BlockCache::new(
                classes.class_size(class),
                config.thread_safe,
                config.dealloc_pattern,
            )
        });
        let slots = PageSlots {
            page_a: Page::new(config.page_size, config.thread_safe),
            page_b: Page::new(config.page_size, config.thread_safe),
            archived: Vec::new(),
        };

        #[cfg(feature = "logging")]
        debug!(
            page_size = config.page_size,
            thread_safe = config.thread_safe,
            "block pool ready"
        );

        Ok(Self {
            classes,
            caches,
            slots: UnsafeCell::new(slots),
            section: Section::blocking(config.thread_safe),
            config,
            #[cfg(feature = "stats")]
            large: LargeStats::new(),
        })
    }

    /// Allocates `size` bytes of word-aligned storage.
    ///
    /// Requests up to [`MAX_BLOCK_SIZE`] always succeed: a recycled block
    /// of the right class when one is cached, otherwise the class's
    /// canonical size freshly carved from an active page (rotating in a
    /// new page if both actives are exhausted). Larger requests go
    /// straight to the system allocator and return `None` only when it is
    /// out of memory.
    ///
    /// The storage is uninitialized (debug configurations may fill it with
    /// a pattern). Release it with [`free`](Self::free), passing the same
    /// `size`.
    #[must_use]
    pub fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        if size > MAX_BLOCK_SIZE {
            return self.allocate_large(size);
        }
        let class = self.classes.classify(size);
        self.section.with(|| {
            if let Some(block) = self.caches[class].allocate() {
                return Some(block);
            }
            // SAFETY: inside `section`.
            let slots = unsafe { &mut *self.slots.get() };
            // Always carve the canonical size, never the raw request, so a
            // later free with the original size lands back in this class.
            Some(self.allocate_from_page(slots, self.caches[class].block_size()))
        })
    }

    /// Returns `size` bytes at `ptr` to the pool.
    ///
    /// Oversized blocks go back to the system allocator; everything else
    /// is reclassified by `size` alone (no header is consulted) and
    /// pushed onto its class's free list.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by [`allocate`](Self::allocate) (or
    /// the typed helpers) on this pool with this exact `size`, must not
    /// have been freed already, and no pointers into the block may be used
    /// afterwards. A mismatched size silently corrupts a free list: that
    /// is the fixed-size-class contract, deliberately unchecked in
    /// production.
    pub unsafe fn free(&self, ptr: NonNull<u8>, size: usize) {
        if size > MAX_BLOCK_SIZE {
            if let Ok(layout) = Layout::from_size_align(size, WORD_ALIGN) {
                // SAFETY: allocated by `allocate_large` with this layout.
                unsafe { System.dealloc(ptr.as_ptr(), layout) };
            }
            return;
        }
        let class = self.classes.classify(size);
        // SAFETY: the caller guarantees an exclusively owned block of this
        // class's canonical size.
        unsafe { self.caches[class].free(ptr) };
    }

    /// Class ordinal serving `size` (pure, size-driven).
    pub fn classify(&self, size: usize) -> usize {
        self.classes.classify(size)
    }

    /// Canonical block size of `class`.
    pub fn class_size(&self, class: usize) -> usize {
        self.caches[class].block_size()
    }

    /// The configuration this pool was built with.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Snapshot of pool usage: page and byte totals plus the oversized
    /// accounting. Read-only; never mutates allocator state.
    #[cfg(feature = "stats")]
    pub fn report(&self) -> PoolReport {
        self.section.with(|| {
            // SAFETY: inside `section`.
            let slots = unsafe { &*self.slots.get() };
            let page_count = 2 + slots.archived.len();
            let unused_bytes = slots.page_a.free_size()
                + slots.page_b.free_size()
                + slots.archived.iter().map(Page::free_size).sum::<usize>();
            let (large_count, large_bytes, large_min, large_max) = self.large.snapshot();
            PoolReport {
                page_count,
                page_size: self.config.page_size,
                reserved_bytes: page_count * self.config.page_size,
                unused_bytes,
                large_count,
                large_bytes,
                large_min,
                large_max,
            }
        })
    }

    /// Uninitialized, word-aligned storage sized for one `T`: the first
    /// half of the two-step construction contract. Construct in place,
    /// then hand the pointer back through [`release`](Self::release).
    ///
    /// Returns `None` for types needing more than word alignment (the
    /// pool only serves natural alignment) or when an oversized backing
    /// allocation fails. Zero-sized types get a dangling (valid) pointer.
    pub fn acquire<T>(&self) -> Option<NonNull<T>> {
        if mem::align_of::<T>() > WORD_ALIGN {
            return None;
        }
        let size = mem::size_of::<T>();
        if size == 0 {
            return Some(NonNull::dangling());
        }
        self.allocate(size).map(NonNull::cast)
    }

    /// Releases storage obtained from [`acquire`](Self::acquire): the
    /// second half of the two-step contract. This returns bytes only; the
    /// value must already have been dropped by the caller.
    ///
    /// # Safety
    ///
    /// Same contract as [`free`](Self::free), and `T` must be the exact
    /// type used at `acquire` time.
    pub unsafe fn release<T>(&self, ptr: NonNull<T>) {
        let size = mem::size_of::<T>();
        if size == 0 {
            return;
        }
        // SAFETY: forwarded caller contract; `acquire` sized the block
        // from the same `T`.
        unsafe { self.free(ptr.cast(), size) };
    }

    /// Oversized passthrough: never touches caches or pages.
    fn allocate_large(&self, size: usize) -> Option<NonNull<u8>> {
        let layout = Layout::from_size_align(size, WORD_ALIGN).ok()?;
        #[cfg(feature = "stats")]
        self.large.record(size);
        #[cfg(feature = "logging")]
        trace!(size, "oversized request routed to the system allocator");
        // SAFETY: `layout` has non-zero size and a valid alignment.
        let ptr = unsafe { System.alloc(layout) };
        NonNull::new(ptr)
    }

    /// Carves `block_size` from an active page, rotating when both are
    /// exhausted. Caller holds `section`.
    fn allocate_from_page(&self, slots: &mut PageSlots, block_size: usize) -> NonNull<u8> {
        if let Some(ptr) = slots.page_a.allocate(block_size) {
            return self.scrub_fresh(ptr, block_size);
        }
        if let Some(ptr) = slots.page_b.allocate(block_size) {
            return self.scrub_fresh(ptr, block_size);
        }

        // Retire the more depleted page and keep the fuller one hot:
        // upcoming requests are likelier to fit the page with more room,
        // so the warm page keeps absorbing traffic. Archiving (never
        // freeing) keeps every block issued from the old page valid.
        let victim = if slots.page_a.free_size() >= slots.page_b.free_size() {
            &mut slots.page_b
        } else {
            &mut slots.page_a
        };
        #[cfg(feature = "logging")]
        debug!(
            retired_free = victim.free_size(),
            archived = slots.archived.len() + 1,
            "both active pages exhausted, rotating in a fresh page"
        );
        let retired = mem::replace(
            victim,
            Page::new(self.config.page_size, self.config.thread_safe),
        );
        slots.archived.push(retired);

        let ptr = victim
            .allocate(block_size)
            .expect("fresh page always fits one canonical block");
        self.scrub_fresh(ptr, block_size)
    }

    #[inline]
    fn scrub_fresh(&self, ptr: NonNull<u8>, size: usize) -> NonNull<u8> {
        if let Some(pattern) = self.config.alloc_pattern {
            // SAFETY: `ptr` addresses `size` freshly carved, unaliased
            // bytes.
            unsafe { core::ptr::write_bytes(ptr.as_ptr(), pattern, size) };
        }
        ptr
    }
}

impl fmt::Debug for BlockPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockPool")
            .field("page_size", &self.config.page_size)
            .field("thread_safe", &self.config.thread_safe)
            .finish_non_exhaustive()
    }
}

/// RAII convenience over the two-step acquire/construct/destruct/release
/// contract: dropping the box drops the value, then returns the block to
/// the pool.
pub struct PoolBox<'pool, T> {
    ptr: NonNull<T>,
    pool: &'pool BlockPool,
}

impl<'pool, T> PoolBox<'pool, T> {
    /// Moves `value` into pool storage.
    ///
    /// `None` when the pool cannot place `T` (see
    /// [`BlockPool::acquire`]).
    pub fn new_in(value: T, pool: &'pool BlockPool) -> Option<Self> {
        let ptr = pool.acquire::<T>()?;
        // SAFETY: `acquire` returned storage valid for writes of one `T`.
        unsafe { ptr.as_ptr().write(value) };
        Some(Self { ptr, pool })
    }
}

impl<T> core::ops::Deref for PoolBox<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: initialized in `new_in`, exclusively owned by this box.
        unsafe { self.ptr.as_ref() }
    }
}

impl<T> core::ops::DerefMut for PoolBox<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: initialized in `new_in`, exclusively owned by this box.
        unsafe { self.ptr.as_mut() }
    }
}

impl<T: fmt::Debug> fmt::Debug for PoolBox<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (**self).fmt(f)
    }
}

impl<T> Drop for PoolBox<'_, T> {
    fn drop(&mut self) {
        // SAFETY: constructed in `new_in` and not dropped before; the
        // release mirrors the acquire exactly.
        unsafe {
            core::ptr::drop_in_place(self.ptr.as_ptr());
            self.pool.release(self.ptr);
        }
    }
}
