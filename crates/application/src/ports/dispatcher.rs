use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;
use tokio::runtime::Handle;

thread_local! {
    static CURRENT: RefCell<Option<Dispatcher>> = const { RefCell::new(None) };
}

/// Event loop of a single worker thread.
///
/// Connections created through a dispatcher are driven by its runtime.
#[derive(Clone)]
pub struct Dispatcher {
    name: Arc<str>,
    index: usize,
    handle: Handle,
}

impl Dispatcher {
    pub fn new(name: impl Into<Arc<str>>, index: usize, handle: Handle) -> Self {
        Self {
            name: name.into(),
            index,
            handle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Marks this dispatcher as the one owning the calling thread.
    pub fn install_current(&self) {
        CURRENT.with(|current| *current.borrow_mut() = Some(self.clone()));
    }

    /// The dispatcher owning the calling thread, if it is a worker thread.
    pub fn current() -> Option<Dispatcher> {
        CURRENT.with(|current| current.borrow().clone())
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("name", &self.name)
            .field("index", &self.index)
            .finish()
    }
}
