//! Call Key Module
//!
//! Identifies a single logical call: which method, on which receiver, with
//! which arguments. Arguments are compared and hashed by value.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

// == Method Id ==
/// Identity of a method: its declaring type plus its name.
///
/// The owner is the declaring type's full path, so same-named methods on
/// same-named types in different modules are different ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodId {
    owner: &'static str,
    name: &'static str,
}

impl MethodId {
    pub const fn new(owner: &'static str, name: &'static str) -> Self {
        Self { owner, name }
    }

    /// Declaring type path.
    pub fn owner(&self) -> &'static str {
        self.owner
    }

    /// Method name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns `owner::method`, the form used by TTL tables.
    pub fn qualified_name(&self) -> String {
        format!("{}::{}", self.owner, self.name)
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.owner, self.name)
    }
}

/// Builds a [`MethodId`] from a `path::to::Type::method` path.
///
/// The type path is resolved against the calling module: the owner becomes
/// `module_path!()` followed by the written path. Name the type by its path
/// from the calling module, not through a `use` alias.
///
/// ```
/// use memo_cache::method_id;
///
/// let id = method_id!(users::Repo::get);
/// assert_eq!(id.owner(), concat!(module_path!(), "::users::Repo"));
/// assert_eq!(id.name(), "get");
/// ```
#[macro_export]
macro_rules! method_id {
    (@split [$first:ident $(:: $seg:ident)*] $name:ident) => {
        $crate::cache::MethodId::new(
            concat!(module_path!(), "::", stringify!($first) $(, "::", stringify!($seg))*),
            stringify!($name),
        )
    };
    (@split [$($owner:tt)*] $next:ident $($rest:ident)+) => {
        $crate::method_id!(@split [$($owner)* :: $next] $($rest)+)
    };
    ($first:ident $(:: $rest:ident)+) => {
        $crate::method_id!(@split [$first] $($rest)+)
    };
}

// == Receiver Id ==
static NEXT_RECEIVER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of the instance a call targets.
///
/// Ids come from a process-wide counter, so they are never reused even after
/// the instance they were issued to is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReceiverId(u64);

impl ReceiverId {
    /// Issues a new, never-before-seen receiver id.
    pub fn fresh() -> Self {
        Self(NEXT_RECEIVER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Id for calls that have no receiver.
    pub const fn detached() -> Self {
        Self(0)
    }

    pub fn is_detached(&self) -> bool {
        self.0 == 0
    }
}

// == Arg List ==
/// Object-safe view of an argument list with structural equality and hashing.
///
/// Blanket-implemented for every `Hash + Eq + Debug` value, so tuples, vectors,
/// strings and `()` all work as argument lists.
pub trait ArgList: Any + Send + Sync + fmt::Debug {
    fn dyn_eq(&self, other: &dyn ArgList) -> bool;
    fn dyn_hash(&self, state: &mut dyn Hasher);
    fn as_any(&self) -> &dyn Any;
}

impl<T> ArgList for T
where
    T: Hash + Eq + fmt::Debug + Send + Sync + 'static,
{
    fn dyn_eq(&self, other: &dyn ArgList) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .map_or(false, |other| self == other)
    }

    fn dyn_hash(&self, mut state: &mut dyn Hasher) {
        TypeId::of::<T>().hash(&mut state);
        self.hash(&mut state);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// == Call Key ==
/// Composite cache key: method + receiver + arguments.
#[derive(Debug)]
pub struct CallKey {
    method: MethodId,
    receiver: ReceiverId,
    args: Box<dyn ArgList>,
}

impl CallKey {
    pub fn new<A: ArgList>(method: MethodId, receiver: ReceiverId, args: A) -> Self {
        Self {
            method,
            receiver,
            args: Box::new(args),
        }
    }

    pub fn method(&self) -> MethodId {
        self.method
    }

    pub fn receiver(&self) -> ReceiverId {
        self.receiver
    }

    pub fn args(&self) -> &dyn ArgList {
        self.args.as_ref()
    }
}

impl PartialEq for CallKey {
    fn eq(&self, other: &Self) -> bool {
        self.method == other.method
            && self.receiver == other.receiver
            && self.args.dyn_eq(other.args.as_ref())
    }
}

impl Eq for CallKey {}

impl Hash for CallKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.method.hash(state);
        self.receiver.hash(state);
        self.args.dyn_hash(state);
    }
}
