// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Use README.md as crate documentation.
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

mod audit;
mod context;
mod error;
mod matcher;
mod number;
mod pattern;
mod value;

pub use audit::{audited_call, ArgumentAudit};
pub use context::{enter, in_context, propagate, ContextVar, OnFault};
pub use error::{Error, ErrorCode, MatchError, Result, WireError};
pub use matcher::{check, test};
pub use number::Number;
pub use pattern::{Condition, Kind, Pattern};
pub use value::{Opaque, Value};
