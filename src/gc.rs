//! Reference-counted object heap with a trial-deletion cycle collector.
//!
//! Every `Gc<T>` handle owns one count on its target. When the count drops to
//! zero the object is reset (releasing its own outgoing links) and returned to
//! the pool. Counting alone cannot reclaim cycles, so [`Heap::collect`] runs a
//! trial deletion over the whole heap:
//!
//! 1. snapshot every live count,
//! 2. subtract every internal edge (objects with host-managed counting are
//!    skipped and never become candidates),
//! 3. walk outward from every object that still has a surviving count and
//!    clear the candidate mark of everything it reaches, including values
//!    held by reachable weak maps under reachable keys,
//! 4. restore the snapshot (always, even when step 3 ran out of memory),
//! 5. reset every object still marked under a re-entrancy guard.
//!
//! No root set is required: anything a non-object holder (the operand stack,
//! the host, a local variable in Rust) keeps a `Gc` to has a count that no
//! internal edge accounts for.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::ptr::NonNull;
use std::rc::{Rc, Weak};

/// Objects per chunk. Chunks never reallocate, so box addresses are stable.
const CHUNK_CAPACITY: usize = 256;

/// Entries per traversal stack chunk.
const MARK_CHUNK_CAPACITY: usize = 1024;

// ============================================================================
// Gc - counted handle
// ============================================================================

/// A counted handle to a heap object.
///
/// Works like `Rc<T>`: cloning increments the count, dropping decrements it
/// and releases the object once nothing holds it.
pub struct Gc<T: Traceable> {
    ptr: NonNull<GcBox<T>>,
    heap: Weak<HeapInner<T>>,
}

impl<T: Traceable> PartialEq for Gc<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr
    }
}

impl<T: Traceable> Eq for Gc<T> {}

impl<T: Traceable> std::hash::Hash for Gc<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.ptr.hash(state);
    }
}

impl<T: Traceable> Gc<T> {
    fn gc_box(&self) -> &GcBox<T> {
        // Safety: boxes live in chunks that are only freed with the heap, and
        // every handle is dropped or detached before the heap goes away.
        unsafe { self.ptr.as_ref() }
    }

    /// Borrow the inner data immutably
    pub fn borrow(&self) -> Ref<'_, T> {
        self.gc_box().data.borrow()
    }

    /// Borrow the inner data mutably
    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.gc_box().data.borrow_mut()
    }

    /// Borrow immutably, failing instead of panicking when mutably borrowed
    pub fn try_borrow(&self) -> Option<Ref<'_, T>> {
        self.gc_box().data.try_borrow().ok()
    }

    /// Borrow mutably, failing instead of panicking when already borrowed
    pub fn try_borrow_mut(&self) -> Option<RefMut<'_, T>> {
        self.gc_box().data.try_borrow_mut().ok()
    }

    /// Stable identity of the slot this object occupies while it is alive
    pub fn id(&self) -> usize {
        self.gc_box().index
    }

    /// Current reference count
    pub fn ref_count(&self) -> usize {
        self.gc_box().ref_count.get()
    }

    /// Check if two handles point to the same object
    pub fn ptr_eq(a: &Gc<T>, b: &Gc<T>) -> bool {
        a.ptr == b.ptr
    }

    /// Uncounted pointer used while tracing.
    pub fn copy_ref(&self) -> GcPtr<T> {
        GcPtr { ptr: self.ptr }
    }

    /// Create a weak reference that does not keep the object alive
    pub fn downgrade(&self) -> WeakGc<T> {
        WeakGc {
            ptr: self.ptr,
            generation: self.gc_box().generation.get(),
            heap: self.heap.clone(),
        }
    }
}

impl<T: Traceable> Clone for Gc<T> {
    fn clone(&self) -> Self {
        if self.heap.strong_count() > 0 {
            let gc_box = self.gc_box();
            if !gc_box.pooled.get() {
                gc_box.ref_count.set(gc_box.ref_count.get() + 1);
            }
        }
        Self {
            ptr: self.ptr,
            heap: self.heap.clone(),
        }
    }
}

impl<T: Traceable> Drop for Gc<T> {
    fn drop(&mut self) {
        // The heap may already be gone during teardown, in which case the box
        // memory is freed and must not be touched.
        let Some(heap) = self.heap.upgrade() else {
            return;
        };

        let gc_box = self.gc_box();
        if gc_box.pooled.get() {
            return;
        }

        let count = gc_box.ref_count.get().saturating_sub(1);
        gc_box.ref_count.set(count);
        if count == 0 {
            heap.release(self.ptr);
        }
    }
}

impl<T: Traceable> std::fmt::Debug for Gc<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gc").field("id", &self.id()).finish()
    }
}

// ============================================================================
// GcPtr - uncounted pointer for tracing
// ============================================================================

/// A raw pointer to a heap object. Copy and no Drop.
pub struct GcPtr<T: Traceable> {
    ptr: NonNull<GcBox<T>>,
}

impl<T: Traceable> Copy for GcPtr<T> {}

impl<T: Traceable> Clone for GcPtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: Traceable> GcPtr<T> {
    fn gc_box(&self) -> &GcBox<T> {
        // Safety: only produced from live handles during a trace.
        unsafe { self.ptr.as_ref() }
    }
}

// ============================================================================
// WeakGc - generation-checked weak reference
// ============================================================================

/// A reference that does not contribute to the count.
///
/// Pooled boxes are reused, so liveness is checked against the generation the
/// box had when the reference was taken.
pub struct WeakGc<T: Traceable> {
    ptr: NonNull<GcBox<T>>,
    generation: u32,
    heap: Weak<HeapInner<T>>,
}

impl<T: Traceable> Clone for WeakGc<T> {
    fn clone(&self) -> Self {
        Self {
            ptr: self.ptr,
            generation: self.generation,
            heap: self.heap.clone(),
        }
    }
}

impl<T: Traceable> WeakGc<T> {
    /// Whether the target is still the object this reference was taken from
    pub fn is_alive(&self) -> bool {
        if self.heap.strong_count() == 0 {
            return false;
        }
        // Safety: the heap is alive, so the chunk holding the box is too.
        let gc_box = unsafe { self.ptr.as_ref() };
        !gc_box.pooled.get() && gc_box.generation.get() == self.generation
    }

    /// Get a counted handle if the target is still alive
    pub fn upgrade(&self) -> Option<Gc<T>> {
        if !self.is_alive() {
            return None;
        }
        // Safety: liveness checked above.
        let gc_box = unsafe { self.ptr.as_ref() };
        gc_box.ref_count.set(gc_box.ref_count.get() + 1);
        Some(Gc {
            ptr: self.ptr,
            heap: self.heap.clone(),
        })
    }

    /// Uncounted pointer to the target, if it is alive
    pub fn as_ptr(&self) -> Option<GcPtr<T>> {
        self.is_alive().then_some(GcPtr { ptr: self.ptr })
    }

    /// Whether this reference points at the given object
    pub fn refers_to(&self, target: &Gc<T>) -> bool {
        self.ptr == target.ptr && self.is_alive()
    }
}

impl<T: Traceable> std::fmt::Debug for WeakGc<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakGc")
            .field("generation", &self.generation)
            .field("alive", &self.is_alive())
            .finish()
    }
}

// ============================================================================
// Traceable / Reset
// ============================================================================

/// Trait for types that can be traced by the collector.
pub trait Traceable: Sized + Reset {
    /// Visit every counted link that keeps its target alive.
    ///
    /// Weak-map values are not reported here, see `trace_ephemerons`.
    fn trace<F: FnMut(GcPtr<Self>)>(&self, visitor: F);

    /// Visit (key, value) pairs of weak-map entries whose key is still alive.
    /// The value is counted by the map but only reachable through the key.
    fn trace_ephemerons<F: FnMut(GcPtr<Self>, GcPtr<Self>)>(&self, _visitor: F) {}

    /// Objects whose lifetime is managed by an external counter are never
    /// candidates for collection.
    fn is_externally_counted(&self) -> bool {
        false
    }

    /// Drop weak-map entries whose key has died.
    fn prune_weak(&mut self) {}
}

/// Trait for types that can be reset to a clean state for pooling.
///
/// Resetting must drop every outgoing `Gc` link.
pub trait Reset {
    fn reset(&mut self);
}

// ============================================================================
// GcBox
// ============================================================================

/// Internal storage for a heap object.
pub struct GcBox<T: Traceable> {
    /// Linear position: chunk_idx * CHUNK_CAPACITY + index_in_chunk
    index: usize,
    /// Bumped every time the box returns to the pool
    generation: Cell<u32>,
    data: RefCell<T>,
    ref_count: Cell<usize>,
    pooled: Cell<bool>,
    /// Candidate mark, only meaningful inside `collect`
    marked: Cell<bool>,
}

impl<T: Traceable> GcBox<T> {
    fn new(index: usize, data: T) -> Self {
        Self {
            index,
            generation: Cell::new(0),
            data: RefCell::new(data),
            ref_count: Cell::new(1),
            pooled: Cell::new(false),
            marked: Cell::new(false),
        }
    }
}

// ============================================================================
// Space - chunked arena
// ============================================================================

struct Space<T: Traceable> {
    chunks: Vec<Vec<GcBox<T>>>,
    free_list: Vec<NonNull<GcBox<T>>>,
}

impl<T: Traceable> Space<T> {
    fn new() -> Self {
        Self {
            chunks: Vec::new(),
            free_list: Vec::new(),
        }
    }

    fn alloc(&mut self, data: T) -> NonNull<GcBox<T>> {
        if let Some(ptr) = self.free_list.pop() {
            // Safety: pooled pointers come from our own chunks.
            let gc_box = unsafe { ptr.as_ref() };
            *gc_box.data.borrow_mut() = data;
            gc_box.ref_count.set(1);
            gc_box.pooled.set(false);
            gc_box.marked.set(false);
            return ptr;
        }

        let need_new_chunk = self
            .chunks
            .last()
            .is_none_or(|chunk| chunk.len() >= CHUNK_CAPACITY);
        if need_new_chunk {
            self.chunks.push(Vec::with_capacity(CHUNK_CAPACITY));
        }

        let chunk_idx = self.chunks.len().saturating_sub(1);
        let chunk = match self.chunks.last_mut() {
            Some(chunk) => chunk,
            None => {
                #[allow(clippy::panic)]
                {
                    panic!("GC internal error: no chunk after creation")
                }
            }
        };
        let index = chunk_idx * CHUNK_CAPACITY + chunk.len();
        chunk.push(GcBox::new(index, data));
        match chunk.last() {
            Some(gc_box) => NonNull::from(gc_box),
            None => {
                #[allow(clippy::panic)]
                {
                    panic!("GC internal error: chunk empty after push")
                }
            }
        }
    }

    fn pool(&mut self, ptr: NonNull<GcBox<T>>) {
        // Safety: ptr comes from our chunks.
        let gc_box = unsafe { ptr.as_ref() };
        if gc_box.pooled.get() {
            return;
        }
        gc_box.pooled.set(true);
        gc_box.marked.set(false);
        gc_box.generation.set(gc_box.generation.get().wrapping_add(1));
        self.free_list.push(ptr);
    }

    fn live_boxes(&self) -> Vec<NonNull<GcBox<T>>> {
        self.chunks
            .iter()
            .flat_map(|chunk| chunk.iter())
            .filter(|gc_box| !gc_box.pooled.get())
            .map(NonNull::from)
            .collect()
    }

    fn stats(&self) -> (usize, usize) {
        let total: usize = self.chunks.iter().map(|c| c.len()).sum();
        (total, self.free_list.len())
    }
}

impl<T: Traceable> Drop for Space<T> {
    fn drop(&mut self) {
        // Handles dropped while the chunks are torn down must not touch them.
        for chunk in &self.chunks {
            for gc_box in chunk {
                gc_box.pooled.set(true);
            }
        }
    }
}

// ============================================================================
// Mark stack - chunked explicit traversal stack
// ============================================================================

/// Failure raised by the collector itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GcError {
    /// The traversal stack could not grow. Counts were restored and nothing
    /// was collected.
    #[error("out of memory while tracing the heap")]
    OutOfMemory,
}

struct MarkStack<T: Traceable> {
    chunks: Vec<Vec<NonNull<GcBox<T>>>>,
    limit: Option<usize>,
}

impl<T: Traceable> MarkStack<T> {
    fn new(limit: Option<usize>) -> Self {
        Self {
            chunks: Vec::new(),
            limit,
        }
    }

    fn push(&mut self, ptr: NonNull<GcBox<T>>) -> Result<(), GcError> {
        let full = self
            .chunks
            .last()
            .is_none_or(|chunk| chunk.len() >= MARK_CHUNK_CAPACITY);
        if full {
            if self.limit.is_some_and(|limit| self.chunks.len() >= limit) {
                return Err(GcError::OutOfMemory);
            }
            let mut chunk = Vec::new();
            chunk
                .try_reserve_exact(MARK_CHUNK_CAPACITY)
                .map_err(|_| GcError::OutOfMemory)?;
            self.chunks.push(chunk);
        }
        match self.chunks.last_mut() {
            Some(chunk) => {
                chunk.push(ptr);
                Ok(())
            }
            None => Err(GcError::OutOfMemory),
        }
    }

    fn pop(&mut self) -> Option<NonNull<GcBox<T>>> {
        loop {
            let chunk = self.chunks.last_mut()?;
            if let Some(ptr) = chunk.pop() {
                return Some(ptr);
            }
            self.chunks.pop();
        }
    }
}

// ============================================================================
// Heap
// ============================================================================

fn box_ref<T: Traceable>(ptr: &NonNull<GcBox<T>>) -> &GcBox<T> {
    // Safety: boxes are not freed while the heap is alive, and nothing is
    // pooled before the unlink phase of a collection.
    unsafe { ptr.as_ref() }
}

struct HeapInner<T: Traceable> {
    space: RefCell<Space<T>>,
    /// Boxes whose count reached zero while they could not be released
    deferred: RefCell<Vec<NonNull<GcBox<T>>>>,
    /// Set while the collector unlinks garbage
    collecting: Cell<bool>,
    /// Set while the release queue is being drained
    releasing: Cell<bool>,
    mark_stack_limit: Cell<Option<usize>>,
    collections: Cell<usize>,
    last_collected: Cell<usize>,
}

impl<T: Traceable> HeapInner<T> {
    /// Queue a box whose count reached zero. The outermost call drains the
    /// queue, so dropping a long chain never nests one release per link.
    fn release(&self, ptr: NonNull<GcBox<T>>) {
        self.deferred.borrow_mut().push(ptr);
        if self.collecting.get() || self.releasing.get() {
            return;
        }
        self.drain_deferred();
    }

    fn drain_deferred(&self) {
        if self.releasing.replace(true) {
            return;
        }
        loop {
            let next = self.deferred.borrow_mut().pop();
            let Some(ptr) = next else {
                break;
            };
            // Safety: deferred pointers come from our chunks.
            let gc_box = unsafe { ptr.as_ref() };
            if gc_box.pooled.get() || gc_box.ref_count.get() != 0 {
                continue;
            }
            // A box still borrowed stays unpooled; the next collection sees a
            // zero count with no surviving holder and reclaims it.
            let Ok(mut data) = gc_box.data.try_borrow_mut() else {
                continue;
            };
            data.reset();
            drop(data);
            if gc_box.ref_count.get() == 0 {
                if let Ok(mut space) = self.space.try_borrow_mut() {
                    space.pool(ptr);
                }
            }
        }
        self.releasing.set(false);
    }
}

/// Statistics about the heap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GcStats {
    /// Total slots ever allocated
    pub total_objects: usize,
    /// Slots available for reuse
    pub pooled_objects: usize,
    /// Objects currently alive
    pub live_objects: usize,
    /// Number of completed collections
    pub collections: usize,
    /// Objects reclaimed by the last collection
    pub last_collected: usize,
}

/// Owner of all heap objects of one engine instance.
pub struct Heap<T: Traceable> {
    inner: Rc<HeapInner<T>>,
}

impl<T: Traceable> Default for Heap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Traceable> Heap<T> {
    /// Create a new heap
    pub fn new() -> Self {
        Self {
            inner: Rc::new(HeapInner {
                space: RefCell::new(Space::new()),
                deferred: RefCell::new(Vec::new()),
                collecting: Cell::new(false),
                releasing: Cell::new(false),
                mark_stack_limit: Cell::new(None),
                collections: Cell::new(0),
                last_collected: Cell::new(0),
            }),
        }
    }

    /// Allocate a new object. The returned handle holds the only count.
    pub fn alloc(&self, data: T) -> Gc<T> {
        self.inner.drain_deferred();
        let ptr = self.inner.space.borrow_mut().alloc(data);
        Gc {
            ptr,
            heap: Rc::downgrade(&self.inner),
        }
    }

    /// Cap the number of traversal stack chunks. Exceeding the cap is
    /// handled exactly like an allocation failure.
    pub fn set_mark_stack_limit(&self, limit: Option<usize>) {
        self.inner.mark_stack_limit.set(limit);
    }

    /// Whether a collection is currently unlinking garbage
    pub fn is_collecting(&self) -> bool {
        self.inner.collecting.get()
    }

    /// Get heap statistics
    pub fn stats(&self) -> GcStats {
        let (total, pooled) = self.inner.space.borrow().stats();
        GcStats {
            total_objects: total,
            pooled_objects: pooled,
            live_objects: total.saturating_sub(pooled),
            collections: self.inner.collections.get(),
            last_collected: self.inner.last_collected.get(),
        }
    }

    /// Run one trial-deletion pass and unlink every object only kept alive
    /// by other candidates. Returns how many objects were unlinked.
    ///
    /// A nested call made while unlinking returns `Ok(0)` immediately.
    pub fn collect(&self) -> Result<usize, GcError> {
        let inner = &*self.inner;
        if inner.collecting.get() {
            return Ok(0);
        }
        inner.drain_deferred();

        let live = inner.space.borrow().live_boxes();

        // Phase 1: snapshot
        let snapshot: Vec<usize> = live.iter().map(|p| box_ref(p).ref_count.get()).collect();
        log::trace!("gc: snapshot of {} objects", live.len());

        // Phase 2: speculative decrement
        let mut weak_holders = Vec::new();
        for ptr in &live {
            let gc_box = box_ref(ptr);
            // An object borrowed by the running code cannot be traced; treat
            // it like a host-held object.
            let Ok(data) = gc_box.data.try_borrow() else {
                gc_box.marked.set(false);
                continue;
            };
            if data.is_externally_counted() {
                gc_box.marked.set(false);
                continue;
            }
            gc_box.marked.set(true);
            let decrement = |child: GcPtr<T>| {
                let child_box = child.gc_box();
                if !child_box.pooled.get() {
                    child_box
                        .ref_count
                        .set(child_box.ref_count.get().saturating_sub(1));
                }
            };
            data.trace(decrement);
            let mut has_entries = false;
            data.trace_ephemerons(|_, value| {
                has_entries = true;
                decrement(value);
            });
            if has_entries {
                weak_holders.push(*ptr);
            }
        }

        // Phase 3: external reachability
        let mut stack = MarkStack::new(inner.mark_stack_limit.get());
        let reachability = Self::unmark_reachable(&live, &weak_holders, &mut stack);

        // Phase 4: restore
        for (ptr, count) in live.iter().zip(snapshot) {
            box_ref(ptr).ref_count.set(count);
        }

        if let Err(err) = reachability {
            for ptr in &live {
                box_ref(ptr).marked.set(false);
            }
            log::debug!("gc: traversal aborted, counts restored");
            return Err(err);
        }

        // Phase 5: unlink
        let garbage: Vec<NonNull<GcBox<T>>> = live
            .iter()
            .copied()
            .filter(|ptr| box_ref(ptr).marked.replace(false))
            .collect();
        log::trace!("gc: {} unreachable objects", garbage.len());

        inner.collecting.set(true);
        for ptr in &garbage {
            if let Ok(mut data) = box_ref(ptr).data.try_borrow_mut() {
                data.reset();
            }
        }
        inner.collecting.set(false);
        inner.drain_deferred();

        // Entries keyed by objects that just died release their values.
        for ptr in &weak_holders {
            let holder = box_ref(ptr);
            if holder.pooled.get() {
                continue;
            }
            if let Ok(mut data) = holder.data.try_borrow_mut() {
                data.prune_weak();
            }
        }
        inner.drain_deferred();

        inner.collections.set(inner.collections.get() + 1);
        inner.last_collected.set(garbage.len());
        log::debug!(
            "gc: collected {} of {} objects",
            garbage.len(),
            live.len()
        );
        Ok(garbage.len())
    }

    fn unmark_reachable(
        live: &[NonNull<GcBox<T>>],
        weak_holders: &[NonNull<GcBox<T>>],
        stack: &mut MarkStack<T>,
    ) -> Result<(), GcError> {
        for ptr in live {
            let gc_box = box_ref(ptr);
            if gc_box.marked.get() && gc_box.ref_count.get() > 0 {
                gc_box.marked.set(false);
                stack.push(*ptr)?;
                Self::drain_stack(stack)?;
            }
        }

        // Weak-map values become reachable once both the map and the key are.
        loop {
            let mut changed = false;
            for ptr in weak_holders {
                let holder = box_ref(ptr);
                if holder.marked.get() {
                    continue;
                }
                let Ok(data) = holder.data.try_borrow() else {
                    continue;
                };
                let mut result = Ok(());
                data.trace_ephemerons(|key, value| {
                    if result.is_err() {
                        return;
                    }
                    let value_box = value.gc_box();
                    if !key.gc_box().marked.get() && value_box.marked.get() {
                        value_box.marked.set(false);
                        changed = true;
                        result = stack.push(value.ptr);
                    }
                });
                drop(data);
                result?;
                Self::drain_stack(stack)?;
            }
            if !changed {
                return Ok(());
            }
        }
    }

    fn drain_stack(stack: &mut MarkStack<T>) -> Result<(), GcError> {
        while let Some(ptr) = stack.pop() {
            let Ok(data) = box_ref(&ptr).data.try_borrow() else {
                continue;
            };
            let mut result = Ok(());
            data.trace(|child| {
                if result.is_err() {
                    return;
                }
                let child_box = child.gc_box();
                if child_box.marked.get() {
                    child_box.marked.set(false);
                    result = stack.push(child.ptr);
                }
            });
            result?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct TestObj {
        value: i32,
        refs: Vec<Gc<TestObj>>,
        weak_entries: Vec<(WeakGc<TestObj>, Gc<TestObj>)>,
        host_counted: bool,
    }

    impl Reset for TestObj {
        fn reset(&mut self) {
            self.value = 0;
            self.refs.clear();
            self.weak_entries.clear();
            self.host_counted = false;
        }
    }

    impl Traceable for TestObj {
        fn trace<F: FnMut(GcPtr<Self>)>(&self, mut visitor: F) {
            for r in &self.refs {
                visitor(r.copy_ref());
            }
        }

        fn trace_ephemerons<F: FnMut(GcPtr<Self>, GcPtr<Self>)>(&self, mut visitor: F) {
            for (key, value) in &self.weak_entries {
                if let Some(key) = key.as_ptr() {
                    visitor(key, value.copy_ref());
                }
            }
        }

        fn is_externally_counted(&self) -> bool {
            self.host_counted
        }

        fn prune_weak(&mut self) {
            self.weak_entries.retain(|(key, _)| key.is_alive());
        }
    }

    fn obj(heap: &Heap<TestObj>, value: i32) -> Gc<TestObj> {
        heap.alloc(TestObj {
            value,
            ..Default::default()
        })
    }

    #[test]
    fn test_refcount_release() {
        let heap: Heap<TestObj> = Heap::new();
        let a = obj(&heap, 1);
        let b = a.clone();
        assert_eq!(a.ref_count(), 2);
        drop(b);
        assert_eq!(a.ref_count(), 1);
        drop(a);
        assert_eq!(heap.stats().live_objects, 0);
    }

    #[test]
    fn test_release_cascades_to_children() {
        let heap: Heap<TestObj> = Heap::new();
        let parent = obj(&heap, 1);
        let child = obj(&heap, 2);
        parent.borrow_mut().refs.push(child.clone());
        drop(child);
        assert_eq!(heap.stats().live_objects, 2);
        drop(parent);
        assert_eq!(heap.stats().live_objects, 0);
    }

    #[test]
    fn test_cycle_is_collected() {
        let heap: Heap<TestObj> = Heap::new();
        let a = obj(&heap, 1);
        let b = obj(&heap, 2);
        a.borrow_mut().refs.push(b.clone());
        b.borrow_mut().refs.push(a.clone());
        drop(a);
        drop(b);
        assert_eq!(heap.stats().live_objects, 2);

        let collected = heap.collect().unwrap();
        assert_eq!(collected, 2);
        assert_eq!(heap.stats().live_objects, 0);
    }

    #[test]
    fn test_externally_held_cycle_survives() {
        let heap: Heap<TestObj> = Heap::new();
        let a = obj(&heap, 1);
        let b = obj(&heap, 2);
        let c = obj(&heap, 3);
        a.borrow_mut().refs.push(b.clone());
        b.borrow_mut().refs.push(a.clone());
        c.borrow_mut().refs.push(a.clone());
        let counts_before = (a.ref_count(), b.ref_count(), c.ref_count());
        let (a_weak, b_weak) = (a.downgrade(), b.downgrade());
        drop(a);
        drop(b);

        assert_eq!(heap.collect().unwrap(), 0);
        assert!(a_weak.is_alive());
        assert!(b_weak.is_alive());
        let a = a_weak.upgrade().unwrap();
        let b = b_weak.upgrade().unwrap();
        // Upgrading added one count each; dropping the originals removed one.
        assert_eq!(a.ref_count(), counts_before.0);
        assert_eq!(b.ref_count(), counts_before.1);
        assert_eq!(c.ref_count(), counts_before.2);
    }

    #[test]
    fn test_self_cycle_is_collected() {
        let heap: Heap<TestObj> = Heap::new();
        let a = obj(&heap, 1);
        a.borrow_mut().refs.push(a.clone());
        drop(a);
        assert_eq!(heap.collect().unwrap(), 1);
        assert_eq!(heap.stats().live_objects, 0);
    }

    #[test]
    fn test_counts_restored_on_traversal_failure() {
        let heap: Heap<TestObj> = Heap::new();
        heap.set_mark_stack_limit(Some(0));
        let root = obj(&heap, 0);
        let a = obj(&heap, 1);
        let b = obj(&heap, 2);
        root.borrow_mut().refs.push(a.clone());
        a.borrow_mut().refs.push(b.clone());
        b.borrow_mut().refs.push(a.clone());
        let before = (root.ref_count(), a.ref_count(), b.ref_count());

        assert_eq!(heap.collect(), Err(GcError::OutOfMemory));
        assert_eq!((root.ref_count(), a.ref_count(), b.ref_count()), before);
        assert_eq!(heap.stats().live_objects, 3);

        heap.set_mark_stack_limit(None);
        assert_eq!(heap.collect().unwrap(), 0);
        assert_eq!((root.ref_count(), a.ref_count(), b.ref_count()), before);
    }

    #[test]
    fn test_host_counted_object_is_never_candidate() {
        let heap: Heap<TestObj> = Heap::new();
        let host = heap.alloc(TestObj {
            host_counted: true,
            ..Default::default()
        });
        let inner = obj(&heap, 7);
        host.borrow_mut().refs.push(inner.clone());
        inner.borrow_mut().refs.push(host.clone());
        let inner_weak = inner.downgrade();
        drop(host);
        drop(inner);

        assert_eq!(heap.collect().unwrap(), 0);
        assert!(inner_weak.is_alive());
    }

    #[test]
    fn test_weak_map_value_reachable_through_key() {
        let heap: Heap<TestObj> = Heap::new();
        let map = obj(&heap, 0);
        let key = obj(&heap, 1);
        let value = obj(&heap, 2);
        // value -> key makes a cycle through the map entry
        value.borrow_mut().refs.push(key.clone());
        map.borrow_mut()
            .weak_entries
            .push((key.downgrade(), value.clone()));
        let value_weak = value.downgrade();
        drop(value);

        assert_eq!(heap.collect().unwrap(), 0);
        assert!(value_weak.is_alive());

        // Once the key is only held through the value, both go away.
        drop(key);
        assert_eq!(heap.collect().unwrap(), 2);
        assert!(!value_weak.is_alive());
        assert_eq!(map.borrow().value, 0);
    }

    #[test]
    fn test_pooled_slot_reuse_invalidates_weak() {
        let heap: Heap<TestObj> = Heap::new();
        let a = obj(&heap, 1);
        let weak = a.downgrade();
        drop(a);
        let b = obj(&heap, 2);
        assert!(!weak.is_alive());
        assert!(weak.upgrade().is_none());
        assert_eq!(b.borrow().value, 2);
        assert_eq!(heap.stats().total_objects, 1);
    }

    #[test]
    fn test_long_chain_survives_collection() {
        let heap: Heap<TestObj> = Heap::new();
        let head = obj(&heap, 0);
        let mut tail = head.clone();
        for i in 1..1000 {
            let next = obj(&heap, i);
            tail.borrow_mut().refs.push(next.clone());
            tail = next;
        }
        drop(tail);
        assert_eq!(heap.collect().unwrap(), 0);
        assert_eq!(heap.stats().live_objects, 1000);
        assert_eq!(heap.stats().collections, 1);
    }

    #[test]
    fn test_dropping_long_chain_does_not_recurse() {
        let heap: Heap<TestObj> = Heap::new();
        let head = obj(&heap, 0);
        let mut tail = head.clone();
        for i in 1..200_000 {
            let next = obj(&heap, i);
            tail.borrow_mut().refs.push(next.clone());
            tail = next;
        }
        drop(tail);
        assert_eq!(heap.stats().live_objects, 200_000);
        drop(head);
        assert_eq!(heap.stats().live_objects, 0);
    }
}
