//! The target data model.
//!
//! A [`Target`] is one of four things: nothing ([`Target::Absent`]), a name to
//! look up in the registry, an ordered sequence of targets, or an action
//! callback. Boolean `true` is also representable ([`Target::Marker`]) because
//! as the first element of a literal sequence it switches that sequence to
//! serial execution; anywhere else it is a no-op.
//!
//! Literal sequences are normalized once, when they are built, into a
//! [`Composite`] with an explicit [`ExecutionMode`]. Nothing downstream looks at
//! the marker again.

use crate::cairn::Cairn;
use crate::error::{Error, Result};
use futures::FutureExt;
use futures::future::BoxFuture;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Future returned by an action.
pub type ActionFuture = BoxFuture<'static, Result<()>>;

type ActionFn = dyn Fn(Cairn, Context) -> ActionFuture + Send + Sync;

/// A unit of buildable work.
#[derive(Clone, Default)]
pub enum Target {
    /// Nothing to do: `null`, `undefined` or `false`.
    #[default]
    Absent,
    /// Boolean `true`.
    Marker,
    /// Reference to a registry entry.
    Name(String),
    /// Ordered sequence of targets.
    Composite(Composite),
    /// Callback performing work directly.
    Action(Action),
}

impl Target {
    /// Build a composite from a literal sequence.
    ///
    /// A leading [`Target::Marker`] selects serial mode and is dropped;
    /// otherwise every element runs in parallel.
    #[must_use]
    pub fn sequence(items: Vec<Self>) -> Self {
        Self::Composite(Composite::from_sequence(items))
    }

    /// Build a serial composite without going through the marker convention.
    #[must_use]
    pub fn serial(elements: Vec<Self>) -> Self {
        Self::Composite(Composite::new(ExecutionMode::Serial, elements))
    }

    /// Build a parallel composite.
    #[must_use]
    pub fn parallel(elements: Vec<Self>) -> Self {
        Self::Composite(Composite::new(ExecutionMode::Parallel, elements))
    }

    /// Wrap an async callback as an action target.
    pub fn action<F, Fut>(f: F) -> Self
    where
        F: Fn(Cairn, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self::Action(Action::new(f))
    }

    /// Reference a registry entry by name.
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Whether running this target is a no-op by construction.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        matches!(self, Self::Absent | Self::Marker)
    }

    /// Short description of the variant, used in logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Marker => "marker",
            Self::Name(_) => "name",
            Self::Composite(_) => "composite",
            Self::Action(_) => "action",
        }
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => f.write_str("Absent"),
            Self::Marker => f.write_str("Marker"),
            Self::Name(name) => f.debug_tuple("Name").field(name).finish(),
            Self::Composite(composite) => composite.fmt(f),
            Self::Action(action) => action.fmt(f),
        }
    }
}

impl From<bool> for Target {
    fn from(value: bool) -> Self {
        if value { Self::Marker } else { Self::Absent }
    }
}

impl From<&str> for Target {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for Target {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<Action> for Target {
    fn from(action: Action) -> Self {
        Self::Action(action)
    }
}

impl From<Composite> for Target {
    fn from(composite: Composite) -> Self {
        Self::Composite(composite)
    }
}

impl From<Vec<Self>> for Target {
    fn from(items: Vec<Self>) -> Self {
        Self::sequence(items)
    }
}

impl<T: Into<Self>> From<Option<T>> for Target {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Absent, Into::into)
    }
}

impl TryFrom<serde_json::Value> for Target {
    type Error = Error;

    fn try_from(value: serde_json::Value) -> Result<Self> {
        use serde_json::Value;
        match value {
            Value::Null => Ok(Self::Absent),
            Value::Bool(flag) => Ok(Self::from(flag)),
            Value::String(name) => Ok(Self::Name(name)),
            Value::Array(items) => items
                .into_iter()
                .map(Self::try_from)
                .collect::<Result<Vec<_>>>()
                .map(Self::sequence),
            Value::Number(_) => Err(unsupported("number")),
            Value::Object(_) => Err(unsupported("object")),
        }
    }
}

fn unsupported(found: &str) -> Error {
    Error::classification(format!("unsupported target type: {found}"))
}

/// Build a literal target sequence.
///
/// A leading `true` makes the sequence serial.
///
/// ```rust
/// use cairn_core::{ExecutionMode, Target, targets};
///
/// let Target::Composite(build) = targets![true, "clean", "compile"] else {
///     unreachable!()
/// };
/// assert_eq!(build.mode(), ExecutionMode::Serial);
/// assert_eq!(build.len(), 2);
/// ```
#[macro_export]
macro_rules! targets {
    ($($item:expr),* $(,)?) => {
        $crate::Target::sequence(::std::vec![$($crate::Target::from($item)),*])
    };
}

/// How the elements of a composite are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// One after another, stopping at the first failure.
    Serial,
    /// All at once, joined before the composite settles.
    Parallel,
}

/// A normalized ordered sequence of targets.
#[derive(Debug, Clone)]
pub struct Composite {
    mode: ExecutionMode,
    elements: Vec<Target>,
}

impl Composite {
    /// Create a composite with an explicit mode.
    #[must_use]
    pub fn new(mode: ExecutionMode, elements: Vec<Target>) -> Self {
        Self { mode, elements }
    }

    /// Normalize a literal sequence, consuming a leading marker.
    #[must_use]
    pub fn from_sequence(mut items: Vec<Target>) -> Self {
        if matches!(items.first(), Some(Target::Marker)) {
            items.remove(0);
            Self::new(ExecutionMode::Serial, items)
        } else {
            Self::new(ExecutionMode::Parallel, items)
        }
    }

    /// Scheduling mode.
    #[must_use]
    pub const fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Elements to run, marker excluded.
    #[must_use]
    pub fn elements(&self) -> &[Target] {
        &self.elements
    }

    /// Number of elements to run.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether there is nothing to run.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Callback target: receives the facade and the execution context.
#[derive(Clone)]
pub struct Action(Arc<ActionFn>);

impl Action {
    /// Wrap an async callback.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Cairn, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self(Arc::new(move |cairn: Cairn, context: Context| -> ActionFuture {
            f(cairn, context).boxed()
        }))
    }

    /// Call the callback. Panics raised before the future is returned propagate.
    pub(crate) fn invoke(&self, cairn: Cairn, context: Context) -> ActionFuture {
        (self.0)(cairn, context)
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Action")
    }
}

/// Opaque value threaded unchanged to every action of one execution.
#[derive(Clone, Default)]
pub struct Context(Option<Arc<dyn Any + Send + Sync>>);

impl Context {
    /// An empty context.
    #[must_use]
    pub const fn none() -> Self {
        Self(None)
    }

    /// Wrap a value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Some(Arc::new(value)))
    }

    /// Wrap an already shared value without copying it.
    #[must_use]
    pub fn from_arc(value: Arc<dyn Any + Send + Sync>) -> Self {
        Self(Some(value))
    }

    /// Borrow the value if it is a `T`.
    #[must_use]
    pub fn get<T: Any>(&self) -> Option<&T> {
        self.0.as_deref().and_then(|value| value.downcast_ref::<T>())
    }

    /// Whether no value was supplied.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        self.0.is_none()
    }

    /// Whether both contexts refer to the same value (or are both empty).
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(_) => f.write_str("Context(..)"),
            None => f.write_str("Context(None)"),
        }
    }
}
