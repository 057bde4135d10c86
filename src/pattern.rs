// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::error::Result;
use crate::value::Value;

use core::any::{type_name, Any, TypeId};
use core::fmt;
use std::collections::BTreeMap;
use std::sync::Arc;

/// An arbitrary validation closure. It may fail the match by returning
/// `Ok(false)`, or run the matcher itself and let the failure propagate.
pub type Condition = Arc<dyn Fn(&Value) -> Result<bool> + Send + Sync>;

/// Primitive kinds checked by [`Pattern::TypeOf`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    String,
    Number,
    Boolean,
    Undefined,
}

impl Kind {
    pub fn name(&self) -> &'static str {
        match self {
            Kind::String => "string",
            Kind::Number => "number",
            Kind::Boolean => "boolean",
            Kind::Undefined => "undefined",
        }
    }
}

/// A declarative description of an acceptable value shape.
///
/// Patterns are immutable once constructed; the collection arms share their
/// contents through `Arc`-backed maps and boxes, so a pattern tree can be
/// built once and reused across any number of `check` calls and threads.
#[derive(Clone)]
pub enum Pattern {
    /// Matches every value.
    Any,
    /// Value's primitive kind must equal the expected kind. Opaque values
    /// never match, even when they wrap the corresponding Rust primitive.
    TypeOf(Kind),
    /// Value must be exactly null.
    Null,
    /// Strict equality against a string, number, or boolean literal.
    Literal(Value),
    /// A number representable as a signed 32-bit integer.
    Integer,
    /// An array whose every element matches the inner pattern.
    ArrayOf(Box<Pattern>),
    /// An arbitrary validation closure.
    Where(Condition),
    /// Equivalent to `OneOf(undefined, inner)`.
    Optional(Box<Pattern>),
    /// The first matching choice wins, tried in declaration order.
    OneOf(Vec<Pattern>),
    /// Nominal check: an opaque value whose payload has the given type.
    InstanceOf {
        name: &'static str,
        type_id: TypeId,
    },
    /// An object satisfying the shape; unrecognized keys are ignored.
    ObjectIncluding(BTreeMap<Arc<str>, Pattern>),
    /// An object with any keys, every value matching the inner pattern.
    ObjectWithValues(Box<Pattern>),
    /// A plain data object: every required key present and matching, every
    /// present optional key matching, no unrecognized keys.
    Object(BTreeMap<Arc<str>, Pattern>),
}

impl Pattern {
    pub fn any() -> Pattern {
        Pattern::Any
    }

    pub fn string() -> Pattern {
        Pattern::TypeOf(Kind::String)
    }

    pub fn number() -> Pattern {
        Pattern::TypeOf(Kind::Number)
    }

    pub fn boolean() -> Pattern {
        Pattern::TypeOf(Kind::Boolean)
    }

    pub fn undefined() -> Pattern {
        Pattern::TypeOf(Kind::Undefined)
    }

    pub fn null() -> Pattern {
        Pattern::Null
    }

    /// A literal string, number, or boolean. Goes well with `one_of`.
    pub fn literal(value: impl Into<Value>) -> Pattern {
        Pattern::Literal(value.into())
    }

    /// Matches only signed 32-bit integers.
    pub fn integer() -> Pattern {
        Pattern::Integer
    }

    pub fn array_of(element: Pattern) -> Pattern {
        Pattern::ArrayOf(Box::new(element))
    }

    pub fn condition(f: impl Fn(&Value) -> Result<bool> + Send + Sync + 'static) -> Pattern {
        Pattern::Where(Arc::new(f))
    }

    pub fn optional(inner: Pattern) -> Pattern {
        Pattern::Optional(Box::new(inner))
    }

    /// At least one choice is required; an empty list is reported as a bad
    /// pattern when matched.
    pub fn one_of(choices: impl IntoIterator<Item = Pattern>) -> Pattern {
        Pattern::OneOf(choices.into_iter().collect())
    }

    /// Matches opaque values whose payload is a `T`.
    pub fn instance_of<T: Any + Send + Sync>() -> Pattern {
        Pattern::InstanceOf {
            name: type_name::<T>(),
            type_id: TypeId::of::<T>(),
        }
    }

    pub fn object_including(shape: impl IntoIterator<Item = (&'static str, Pattern)>) -> Pattern {
        Pattern::ObjectIncluding(Self::shape_map(shape))
    }

    pub fn object_with_values(value_pattern: Pattern) -> Pattern {
        Pattern::ObjectWithValues(Box::new(value_pattern))
    }

    /// A plain-object shape. Entries whose pattern is `optional(..)` are
    /// optional keys; every other entry is required.
    pub fn object(shape: impl IntoIterator<Item = (&'static str, Pattern)>) -> Pattern {
        Pattern::Object(Self::shape_map(shape))
    }

    /// The bare "any object" shorthand: an object with no required keys and
    /// unrecognized keys permitted.
    pub fn any_object() -> Pattern {
        Pattern::ObjectIncluding(BTreeMap::new())
    }

    fn shape_map(
        shape: impl IntoIterator<Item = (&'static str, Pattern)>,
    ) -> BTreeMap<Arc<str>, Pattern> {
        shape
            .into_iter()
            .map(|(k, p)| (Arc::<str>::from(k), p))
            .collect()
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Any => f.write_str("Any"),
            Pattern::TypeOf(kind) => write!(f, "TypeOf({})", kind.name()),
            Pattern::Null => f.write_str("Null"),
            Pattern::Literal(v) => write!(f, "Literal({v})"),
            Pattern::Integer => f.write_str("Integer"),
            Pattern::ArrayOf(p) => write!(f, "ArrayOf({p:?})"),
            Pattern::Where(_) => f.write_str("Where(<condition>)"),
            Pattern::Optional(p) => write!(f, "Optional({p:?})"),
            Pattern::OneOf(choices) => f.debug_tuple("OneOf").field(choices).finish(),
            Pattern::InstanceOf { name, .. } => write!(f, "InstanceOf({name})"),
            Pattern::ObjectIncluding(shape) => {
                f.debug_tuple("ObjectIncluding").field(shape).finish()
            }
            Pattern::ObjectWithValues(p) => write!(f, "ObjectWithValues({p:?})"),
            Pattern::Object(shape) => f.debug_tuple("Object").field(shape).finish(),
        }
    }
}
