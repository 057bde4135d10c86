// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Dynamic-scoped state bound to a logical execution context, plus the
//! propagation wrapper that carries that state across callback boundaries.
//!
//! Each logical execution context owns an independent slot array; slot
//! state is never shared by reference across contexts. The only way state
//! crosses a context boundary is [`propagate`], which snapshots the slot
//! array at wrap time and installs an independent copy on every invocation
//! of the wrapped function.

use crate::error::{Error, Result};

use core::any::Any;
use core::cell::RefCell;
use core::marker::PhantomData;
use core::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

type SlotValue = Arc<dyn Any + Send + Sync>;
type SlotArray = Vec<Option<SlotValue>>;

// Slot ids are process-wide and append-only; an atomic increment is the
// only synchronization the allocator needs.
static NEXT_SLOT: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    // None means the current thread is outside any logical execution
    // context. The array is created lazily on first entry.
    static DYNAMICS: RefCell<Option<SlotArray>> = const { RefCell::new(None) };
}

fn outside_context_error() -> Error {
    Error::Usage(
        "dynamic context used outside a logical execution context; \
         wrap callbacks with propagate() or run the code inside enter()"
            .into(),
    )
}

/// Whether the caller is running inside a logical execution context.
pub fn in_context() -> bool {
    DYNAMICS.with(|d| d.borrow().is_some())
}

/// Runs `f` inside a logical execution context, establishing a fresh one on
/// the current thread if none is active. Nested calls reuse the ambient
/// context.
pub fn enter<R>(f: impl FnOnce() -> R) -> R {
    let entered = DYNAMICS.with(|d| {
        let mut dynamics = d.borrow_mut();
        if dynamics.is_none() {
            *dynamics = Some(Vec::new());
            true
        } else {
            false
        }
    });
    let _leave = entered.then(|| LeaveGuard);
    f()
}

struct LeaveGuard;

impl Drop for LeaveGuard {
    fn drop(&mut self) {
        DYNAMICS.with(|d| *d.borrow_mut() = None);
    }
}

/// One dynamic-context variable.
///
/// Many independent variables can coexist; each allocates its own slot in
/// the per-context slot array, so they never collide. The strict accessors
/// ([`get`](Self::get), [`with_value`](Self::with_value)) fault when used
/// outside a logical execution context; [`try_get`](Self::try_get) yields
/// `None` instead.
pub struct ContextVar<T> {
    slot: usize,
    marker: PhantomData<fn() -> Arc<T>>,
}

// Clones are handles to the same variable, not new slots.
impl<T> Clone for ContextVar<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot,
            marker: PhantomData,
        }
    }
}

impl<T: Any + Send + Sync> ContextVar<T> {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            slot: NEXT_SLOT.fetch_add(1, Ordering::Relaxed),
            marker: PhantomData,
        }
    }

    /// The current value of this variable, or `None` if no enclosing
    /// `with_value` set one. Faults outside a logical execution context.
    pub fn get(&self) -> Result<Option<Arc<T>>> {
        DYNAMICS.with(|d| match d.borrow().as_ref() {
            None => Err(outside_context_error()),
            Some(slots) => Ok(Self::lookup(slots, self.slot)),
        })
    }

    /// Like [`get`](Self::get), but yields `None` instead of faulting when
    /// called outside a logical execution context. Useful for call sites
    /// that must keep working from plain top-level code.
    pub fn try_get(&self) -> Option<Arc<T>> {
        DYNAMICS.with(|d| {
            d.borrow()
                .as_ref()
                .and_then(|slots| Self::lookup(slots, self.slot))
        })
    }

    /// Sets this variable to `value` for the dynamic extent of `f` and
    /// restores the previous value afterward, even if `f` panics. Pushes
    /// and pops follow strict LIFO discipline per context.
    pub fn with_value<R>(&self, value: impl Into<Arc<T>>, f: impl FnOnce() -> R) -> Result<R> {
        let value: Arc<T> = value.into();
        let value: SlotValue = value;
        let saved = DYNAMICS.with(|d| -> Result<Option<SlotValue>> {
            let mut dynamics = d.borrow_mut();
            let slots = dynamics.as_mut().ok_or_else(outside_context_error)?;
            if slots.len() <= self.slot {
                slots.resize(self.slot + 1, None);
            }
            Ok(slots[self.slot].replace(value))
        })?;
        let _restore = RestoreSlot {
            slot: self.slot,
            saved,
        };
        Ok(f())
    }

    fn lookup(slots: &SlotArray, slot: usize) -> Option<Arc<T>> {
        slots
            .get(slot)
            .cloned()
            .flatten()
            .and_then(|v| v.downcast::<T>().ok())
    }
}

struct RestoreSlot {
    slot: usize,
    saved: Option<SlotValue>,
}

impl Drop for RestoreSlot {
    fn drop(&mut self) {
        let saved = self.saved.take();
        DYNAMICS.with(|d| {
            if let Some(slots) = d.borrow_mut().as_mut() {
                if let Some(entry) = slots.get_mut(self.slot) {
                    *entry = saved;
                }
            }
        });
    }
}

/// What to do with a fault raised by a propagated function.
pub enum OnFault {
    /// Log the fault to stderr, tagged with a description of the callback.
    Report(String),
    /// Invoke a handler with the fault.
    Handler(Arc<dyn Fn(&Error) + Send + Sync>),
}

impl OnFault {
    pub fn handler(f: impl Fn(&Error) + Send + Sync + 'static) -> Self {
        OnFault::Handler(Arc::new(f))
    }

    fn handle(&self, err: &Error) {
        match self {
            OnFault::Report(description) => eprintln!("Exception in {description}: {err}"),
            OnFault::Handler(f) => f(err),
        }
    }
}

impl Default for OnFault {
    fn default() -> Self {
        OnFault::Report("callback of async function".into())
    }
}

impl From<&str> for OnFault {
    fn from(description: &str) -> Self {
        OnFault::Report(description.into())
    }
}

impl From<String> for OnFault {
    fn from(description: String) -> Self {
        OnFault::Report(description)
    }
}

/// Wraps `f` so that it runs with the dynamic-context state captured here,
/// at wrap time, no matter where it is eventually invoked from. Faults if
/// the caller is outside a logical execution context.
///
/// Invoked from inside a context, the wrapped function runs synchronously
/// under the captured state and hands its result back as `Ok(Some(..))`; a
/// fault is delivered to `on_fault` and then re-raised to the caller.
///
/// Invoked from outside any context (for example, from a callback of a
/// foreign library), it spawns a detached thread, runs `f` there inside a
/// new context, and returns `Ok(None)` immediately; the eventual result is
/// discarded and a fault is delivered only to `on_fault`.
pub fn propagate<A, R, F>(
    f: F,
    on_fault: impl Into<OnFault>,
) -> Result<impl Fn(A) -> Result<Option<R>>>
where
    A: Send + 'static,
    R: Send + 'static,
    F: Fn(A) -> Result<R> + Send + Sync + 'static,
{
    let snapshot: SlotArray = DYNAMICS
        .with(|d| d.borrow().clone())
        .ok_or_else(outside_context_error)?;
    let f = Arc::new(f);
    let on_fault = Arc::new(on_fault.into());

    Ok(move |arg: A| {
        // Fresh copy per invocation: concurrent invocations from different
        // contexts must not share a mutable slot array.
        let bound = snapshot.clone();
        if in_context() {
            match install(bound, || f(arg)) {
                Ok(result) => Ok(Some(result)),
                Err(err) => {
                    on_fault.handle(&err);
                    Err(err)
                }
            }
        } else {
            let f = Arc::clone(&f);
            let on_fault = Arc::clone(&on_fault);
            thread::spawn(move || {
                if let Err(err) = install(bound, || f(arg)) {
                    on_fault.handle(&err);
                }
            });
            Ok(None)
        }
    })
}

// Swaps in `slots` as the active slot array for the duration of `f`,
// entering a context if none was active. The previous state comes back on
// drop, unwinds included.
fn install<R>(slots: SlotArray, f: impl FnOnce() -> R) -> R {
    let saved = DYNAMICS.with(|d| d.borrow_mut().replace(slots));
    let _restore = RestoreArray { saved };
    f()
}

struct RestoreArray {
    saved: Option<SlotArray>,
}

impl Drop for RestoreArray {
    fn drop(&mut self) {
        let saved = self.saved.take();
        DYNAMICS.with(|d| *d.borrow_mut() = saved);
    }
}
