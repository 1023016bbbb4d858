use std::cell::RefCell;

use crate::{Context, Runtime};

thread_local! {
    /// Contexts created on this thread, keyed by runtime id.
    static CONTEXTS: RefCell<Vec<(u64, Context)>> = const { RefCell::new(Vec::new()) };
}

/// The calling thread's context for `runtime`, created on first use.
///
/// While the thread is being torn down its registry may already be gone; a
/// fresh context is then returned without being remembered.
pub(crate) fn current_context(runtime: &Runtime) -> Context {
    let id = runtime.id();
    let existing = CONTEXTS
        .try_with(|contexts| {
            contexts
                .borrow()
                .iter()
                .find(|(runtime_id, _)| *runtime_id == id)
                .map(|(_, context)| context.clone())
        })
        .ok()
        .flatten();
    if let Some(context) = existing {
        return context;
    }

    let context = Context::new(runtime);
    let registered = CONTEXTS.try_with(|contexts| {
        contexts.borrow_mut().push((id, context.clone()));
    });
    if registered.is_err() {
        tracing::debug!(context = %context.name(), "Thread is exiting, context not registered");
    }
    context
}

/// Forgets the calling thread's context for `runtime`. Returns it if there
/// was one; handles still held elsewhere keep working.
pub(crate) fn release_context(runtime: &Runtime) -> Option<Context> {
    let id = runtime.id();
    CONTEXTS
        .try_with(|contexts| {
            let mut contexts = contexts.borrow_mut();
            let position = contexts.iter().position(|(runtime_id, _)| *runtime_id == id)?;
            Some(contexts.swap_remove(position).1)
        })
        .ok()
        .flatten()
}
