use std::sync::Arc;
use std::fmt::{Debug, Formatter, Result as FmtResult};

use clone_behavior::MirroredClone as _;
use generic_container::{Container, FragileContainer};

use crate::containers::{FragileRwCell as _, RefcountedFamily, RwCellFamily};


pub(crate) struct InternalCorruptionHandler<Refcounted: RefcountedFamily, RwCell: RwCellFamily> {
    // TODO: use proper error type instead of bool
    error:   Refcounted::Container<RwCell::Cell<bool>>,
    handler: Arc<InnerHandler<Refcounted, RwCell, dyn CorruptionHandler>>,
}

impl<Refcounted: RefcountedFamily, RwCell: RwCellFamily> InternalCorruptionHandler<Refcounted, RwCell> {
    /// Wrap a user-supplied handler, invoked the first time a corruption is observed.
    #[must_use]
    pub fn new<H: CorruptionHandler + 'static>(user_handler: H) -> Self {
        let error = Refcounted::Container::new_container(RwCell::Cell::new_rw_cell(false));
        let handler = Arc::new(InnerHandler { error: error.mirrored_clone(), user_handler });
        Self { error, handler }
    }

    /// A handler that does nothing; used by tests and by callers that have no corruption
    /// reporting of their own.
    #[must_use]
    pub fn test_new() -> Self {
        Self::new(NoopCorruptionHandler)
    }

    /// Record that a corruption was observed and invoke the wrapped handler.
    ///
    /// ## Potential Panics or Deadlocks
    /// See [`CorruptionHandler::corruption`]: do not call methods on the database that owns this
    /// handler from within the wrapped handler's `corruption` implementation.
    pub fn notify(&self) {
        *self.error.write() = true;
        self.handler.user_handler.corruption();
    }

    /// Whether [`Self::notify`] has ever been called on this handler (or a refcounted clone
    /// sharing the same underlying flag).
    #[must_use]
    pub fn has_observed_corruption(&self) -> bool {
        *self.error.read()
    }
}

struct NoopCorruptionHandler;

impl CorruptionHandler for NoopCorruptionHandler {
    fn corruption(&self) {}
}

impl<Refcounted: RefcountedFamily, RwCell: RwCellFamily> Debug
for InternalCorruptionHandler<Refcounted, RwCell>
{
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("InternalCorruptionHandler")
            .field("error",   RwCell::debug(&self.error))
            .field("handler", &self.handler)
            .finish()
    }
}

// TODO: impl TableCorruptionHandler or whatever for this type
struct InnerHandler<Refcounted: RefcountedFamily, RwCell: RwCellFamily, CorruptionHandler: ?Sized> {
    error:        Refcounted::Container<RwCell::Cell<bool>>,
    user_handler: CorruptionHandler,
}

impl<Refcounted: RefcountedFamily, RwCell: RwCellFamily, CorruptionHandler: ?Sized> Debug
for InnerHandler<Refcounted, RwCell, CorruptionHandler>
{
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("InnerHandler")
            .field("error",        RwCell::debug(&self.error))
            .field("user_handler", &"<dyn CorruptionHandler>")
            .finish()
    }
}

pub trait CorruptionHandler {
    // TODO: provide information to corruption handler.
    // TODO: document potential panics or deadlocks on _all_ similar handlers, or just
    // in one centralized place.
    /// ## Potential Panics or Deadlocks
    /// This handler may be called while a lock in the database has been acquired. Do not call
    /// methods on the database from this function.
    fn corruption(&self);
}

impl<C: FragileContainer<dyn CorruptionHandler>> CorruptionHandler for C {
    fn corruption(&self) {
        let handler: &dyn CorruptionHandler = &*self.get_ref();
        handler.corruption();
    }
}
