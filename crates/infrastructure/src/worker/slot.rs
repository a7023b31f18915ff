use std::any::Any;
use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

use super::pool::WorkerQueue;

/// Hands out slot indices, reusing the ones released by dropped slots so the
/// per-thread tables stay as long as the largest number of live slots.
struct IndexAllocator {
    next: usize,
    free: Vec<usize>,
}

static INDICES: Mutex<IndexAllocator> = Mutex::new(IndexAllocator {
    next: 0,
    free: Vec::new(),
});

// Distinguishes successive owners of a reused index.
static NEXT_SLOT_ID: AtomicU64 = AtomicU64::new(0);

fn acquire_index() -> usize {
    let mut indices = INDICES.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    match indices.free.pop() {
        Some(index) => index,
        None => {
            indices.next += 1;
            indices.next - 1
        }
    }
}

fn release_index(index: usize) {
    let mut indices = INDICES.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    indices.free.push(index);
}

type Entry = (u64, Box<dyn Any>);

thread_local! {
    // Slot table of the current thread, indexed by slot index. Each entry is
    // tagged with the id of the slot that wrote it.
    static SLOTS: RefCell<Vec<Option<Entry>>> = const { RefCell::new(Vec::new()) };
}

/// A value that exists once per thread.
///
/// Every thread lazily builds its own value with the slot's initializer on
/// first access. A thread only ever reads and writes its own value, so no
/// locking is involved; cross-thread updates are jobs posted to each worker.
pub struct Slot<T: 'static> {
    inner: Arc<SlotInner<T>>,
}

struct SlotInner<T> {
    index: usize,
    id: u64,
    init: Box<dyn Fn() -> T + Send + Sync>,
    queues: Arc<[WorkerQueue]>,
}

impl<T: 'static> Slot<T> {
    pub(crate) fn new<F>(queues: Arc<[WorkerQueue]>, init: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(SlotInner {
                index: acquire_index(),
                id: NEXT_SLOT_ID.fetch_add(1, Ordering::Relaxed),
                init: Box::new(init),
                queues,
            }),
        }
    }

    pub fn index(&self) -> usize {
        self.inner.index
    }

    /// Runs `f` with the calling thread's value, building it first if needed.
    ///
    /// The value is taken out of the thread's table while `f` runs, so `f` may
    /// use other slots but must not access this one.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let index = self.inner.index;
        let id = self.inner.id;
        let mut value = SLOTS
            .with(|slots| {
                let mut slots = slots.borrow_mut();
                if slots.len() <= index {
                    slots.resize_with(index + 1, || None);
                }
                slots[index].take()
            })
            .filter(|(owner, value)| *owner == id && value.is::<T>())
            .map(|(_, value)| value)
            .unwrap_or_else(|| -> Box<dyn Any> { Box::new((self.inner.init)()) });

        let result = match value.downcast_mut::<T>() {
            Some(typed) => f(typed),
            None => unreachable!("slot {} holds a value of another type", index),
        };

        SLOTS.with(|slots| slots.borrow_mut()[index] = Some((id, value)));
        result
    }

    /// Posts `f` to every worker, where it runs against that worker's value.
    ///
    /// Fire-and-forget: the returned handle can be awaited to learn when every
    /// worker has run (or dropped) the update, or simply be ignored.
    pub fn run_on_all_threads<F>(&self, f: F) -> BroadcastCompletion
    where
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let (tx, rx) = oneshot::channel();
        let barrier = Arc::new(CompletionBarrier(Some(tx)));

        for queue in self.inner.queues.iter() {
            let slot = self.clone();
            let f = Arc::clone(&f);
            let barrier = Arc::clone(&barrier);
            queue.post(Box::new(move || {
                slot.with(|value| f(value));
                drop(barrier);
            }));
        }

        BroadcastCompletion(rx)
    }
}

impl<T: 'static> Clone for Slot<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Drop for SlotInner<T> {
    fn drop(&mut self) {
        let index = self.index;
        let id = self.id;
        for queue in self.queues.iter() {
            queue.post(Box::new(move || {
                SLOTS.with(|slots| {
                    if let Some(entry) = slots.borrow_mut().get_mut(index) {
                        if entry.as_ref().is_some_and(|(owner, _)| *owner == id) {
                            *entry = None;
                        }
                    }
                });
            }));
        }
        release_index(index);
    }
}

/// Resolves once every worker has processed a broadcast.
pub struct BroadcastCompletion(oneshot::Receiver<()>);

impl BroadcastCompletion {
    pub async fn wait(self) {
        let _ = self.0.await;
    }
}

// Fires when the last posted job holding it is dropped.
struct CompletionBarrier(Option<oneshot::Sender<()>>);

impl Drop for CompletionBarrier {
    fn drop(&mut self) {
        if let Some(tx) = self.0.take() {
            let _ = tx.send(());
        }
    }
}
