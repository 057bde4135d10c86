// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Call auditing: a guarantee that every argument of a guarded call was
//! passed through the matcher before the call returned.

use crate::context::ContextVar;
use crate::error::{Error, Result};
use crate::value::Value;

use std::sync::Arc;

use lazy_static::lazy_static;
use parking_lot::Mutex;

lazy_static! {
    static ref CURRENT_AUDIT: ContextVar<ArgumentAudit> = ContextVar::new();
}

/// Bookkeeping for one audited call: the call's arguments, minus the ones
/// already consumed by a `check`.
pub struct ArgumentAudit {
    description: String,
    remaining: Mutex<Vec<Value>>,
}

impl ArgumentAudit {
    pub fn new(args: &[Value], description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            // Shallow copy; consumption compares against these contents.
            remaining: Mutex::new(args.to_vec()),
        }
    }

    /// Records that `value` was passed to the matcher, consuming at most
    /// one matching argument. An array that did not itself match a whole
    /// argument is additionally unpacked one level and each element
    /// recorded, so that checking a collected argument list counts for the
    /// arguments it contains.
    pub fn record(&self, value: &Value) {
        if self.record_one(value) {
            return;
        }
        if let Value::Array(items) = value {
            for item in items.iter() {
                self.record_one(item);
            }
        }
    }

    fn record_one(&self, value: &Value) -> bool {
        let mut remaining = self.remaining.lock();
        // Value equality stands in for reference identity here: opaque
        // values compare by actual reference and NaN is self-equal, so a
        // NaN argument is still consumable.
        if let Some(i) = remaining.iter().position(|arg| arg == value) {
            remaining.remove(i);
            true
        } else {
            false
        }
    }

    /// Faults unless every argument has been consumed by a `check`.
    pub fn assert_all_checked(&self) -> Result<()> {
        if self.remaining.lock().is_empty() {
            Ok(())
        } else {
            Err(Error::Usage(format!(
                "Did not check() all arguments during {}",
                self.description
            )))
        }
    }
}

/// The audit installed by the innermost enclosing [`audited_call`], if any.
pub(crate) fn current() -> Option<Arc<ArgumentAudit>> {
    CURRENT_AUDIT.try_get()
}

/// Runs `f(args)` and faults unless `check` was called on every element of
/// `args` during the call (directly, or in the first level of an array).
/// The `description` names the call in the failure message. If `f` itself
/// fails, its error propagates and the audit is not consulted.
///
/// Requires an active logical execution context.
pub fn audited_call<R>(
    f: impl FnOnce(&[Value]) -> Result<R>,
    args: &[Value],
    description: &str,
) -> Result<R> {
    let audit = Arc::new(ArgumentAudit::new(args, description));
    let result = CURRENT_AUDIT.with_value(Arc::clone(&audit), || f(args))??;
    audit.assert_all_checked()?;
    Ok(result)
}
