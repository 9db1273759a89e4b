//! Singleton roles and identity handles.
//!
//! A type becomes a singleton by implementing [`Singleton`], normally via the
//! [`singleton!`](crate::singleton!) macro, which pairs it with a `static`
//! [`LazySingletonHolder`]. Callers reach the canonical value through
//! [`Singleton::instance`], which returns an [`Instance`] handle whose
//! equality is identity.

use core::any;
use core::hash::{Hash, Hasher};
use core::ops::Deref;
use core::{fmt, ptr};

use crate::error::Error;
use crate::holder::LazySingletonHolder;

/// A type with exactly one process-wide instance.
pub trait Singleton: Sized + Send + Sync + 'static {
   /// The holder that owns the canonical instance.
   fn holder() -> &'static LazySingletonHolder<Self>;

   /// Returns the canonical instance, constructing it on first access.
   #[inline]
   fn instance() -> Instance<Self> {
      Instance(Self::holder().get())
   }

   /// Panics unless called from the holder's own factory.
   ///
   /// Call this at the top of the type's constructor so that building an
   /// instance behind the accessor's back fails loudly, before or after the
   /// canonical one exists.
   #[inline]
   #[track_caller]
   fn assert_vacant() {
      Self::holder().assert_vacant();
   }
}

/// Handle to the canonical instance of a [`Singleton`].
///
/// Two handles compare equal exactly when they point at the same object.
/// The handle is deliberately not `Clone`; use [`Singleton::instance`] to
/// obtain another one.
pub struct Instance<S: 'static>(&'static S);

impl<S: Singleton> Instance<S> {
   /// Returns the underlying `'static` reference.
   #[inline]
   pub fn get(&self) -> &'static S {
      self.0
   }

   /// Address of the instance.
   #[inline]
   pub fn as_ptr(&self) -> *const S {
      self.0
   }

   /// Returns `true` if both handles refer to the same object.
   #[inline]
   pub fn ptr_eq(a: &Self, b: &Self) -> bool {
      ptr::eq(a.0, b.0)
   }

   /// Duplicating a singleton is never allowed.
   ///
   /// Always returns [`Error::CloneUnsupported`].
   pub fn try_clone(&self) -> Result<S, Error> {
      Err(Error::CloneUnsupported {
         role: any::type_name::<S>(),
      })
   }
}

impl<S: 'static> Deref for Instance<S> {
   type Target = S;

   #[inline]
   fn deref(&self) -> &S {
      self.0
   }
}

impl<S: 'static> PartialEq for Instance<S> {
   #[inline]
   fn eq(&self, other: &Self) -> bool {
      ptr::eq(self.0, other.0)
   }
}

impl<S: 'static> Eq for Instance<S> {}

impl<S: 'static> Hash for Instance<S> {
   fn hash<H: Hasher>(&self, state: &mut H) {
      ptr::hash(self.0, state);
   }
}

impl<S: fmt::Debug + 'static> fmt::Debug for Instance<S> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_tuple("Instance").field(self.0).finish()
   }
}

/// Writes the canonical instance's data.
#[cfg(feature = "serde")]
impl<S: Singleton + serde::Serialize> serde::Serialize for Instance<S> {
   fn serialize<Ser>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error>
   where
      Ser: serde::Serializer,
   {
      serde::Serialize::serialize(self.0, serializer)
   }
}

/// Consumes whatever payload is present and resolves to the canonical
/// instance, so a restored handle never refers to a fresh copy.
#[cfg(feature = "serde")]
impl<'de, S: Singleton> serde::Deserialize<'de> for Instance<S> {
   fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
   where
      D: serde::Deserializer<'de>,
   {
      <serde::de::IgnoredAny as serde::Deserialize>::deserialize(deserializer)?;
      log::debug!(
         "resolved deserialized `{}` to the canonical instance",
         any::type_name::<S>()
      );
      Ok(S::instance())
   }
}

/// Implements [`Singleton`] for one or more types, each backed by its own
/// `static` holder and built by the given factory on first access.
///
/// The factory is any expression coercible to `fn() -> Type`: a path to a
/// function or a non-capturing closure.
///
/// ```rust
/// use lazy_singleton::{singleton, Singleton};
///
/// struct Clock {
///    ticks: u64,
/// }
///
/// impl Clock {
///    fn new() -> Self {
///       Self::assert_vacant();
///       Clock { ticks: 0 }
///    }
/// }
///
/// singleton!(Clock => Clock::new);
///
/// assert!(Clock::instance() == Clock::instance());
/// assert_eq!(Clock::instance().ticks, 0);
/// ```
#[macro_export]
macro_rules! singleton {
   ($($ty:ty => $factory:expr),+ $(,)?) => {
      $(
         impl $crate::Singleton for $ty {
            fn holder() -> &'static $crate::LazySingletonHolder<$ty> {
               static HOLDER: $crate::LazySingletonHolder<$ty> =
                  $crate::LazySingletonHolder::new($factory as fn() -> $ty);
               &HOLDER
            }
         }
      )+
   };
}
