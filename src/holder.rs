//! Lazily constructed, process-wide singleton holder.
//!
//! [`LazySingletonHolder<T, F>`] owns at most one `T`, built by its stored
//! factory on first access and handed out by reference to every later caller
//! on every thread. Reads after publication are a single acquire load; only
//! the first callers ever touch the construction lock.

use core::any;
use core::cell::UnsafeCell;
#[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
use core::future::Future;
use core::sync::atomic::Ordering;
use core::{fmt, mem};

use crate::error::{Error, Result};
use crate::state::{ConstructionGuard, Marker, Phase};

/// Holds the single shared instance of `T`, constructing it on first access.
///
/// The factory is a zero-argument callable. It runs at most once per
/// successful construction: if it fails, panics, or (for the async
/// accessors) is cancelled, the holder returns to the uninitialized state and
/// the next caller runs it again. Once an instance is published it is never
/// replaced, reset, or handed out by value.
///
/// ```rust
/// use lazy_singleton::LazySingletonHolder;
///
/// struct Registry {
///    name: &'static str,
/// }
///
/// fn build() -> Registry {
///    Registry { name: "main" }
/// }
///
/// static REGISTRY: LazySingletonHolder<Registry> = LazySingletonHolder::new(build);
///
/// let a = REGISTRY.get();
/// let b = REGISTRY.get();
/// assert!(core::ptr::eq(a, b));
/// assert_eq!(a.name, "main");
/// ```
///
/// Calling an accessor of the same holder from inside its own factory
/// deadlocks.
pub struct LazySingletonHolder<T, F = fn() -> T> {
   value: UnsafeCell<mem::MaybeUninit<T>>,
   marker: Marker,
   factory: F,
}

/// Holder whose factory reports construction failures through `E`.
pub type TryLazySingletonHolder<T, E> = LazySingletonHolder<T, fn() -> core::result::Result<T, E>>;

impl<T, F> LazySingletonHolder<T, F> {
   /// Creates an uninitialized holder that will build its instance with `factory`.
   #[inline]
   #[must_use]
   pub const fn new(factory: F) -> Self {
      Self {
         value: UnsafeCell::new(mem::MaybeUninit::uninit()),
         marker: Marker::new(),
         factory,
      }
   }

   /// Returns `true` once the instance has been published.
   ///
   /// Never blocks and never constructs.
   #[inline]
   pub fn is_initialized(&self) -> bool {
      self.marker.is_initialized(Ordering::Acquire)
   }

   /// Returns the instance if it has already been published.
   ///
   /// Never blocks and never constructs.
   #[inline]
   pub fn get_if_initialized(&self) -> Option<&T> {
      if self.is_initialized() {
         // SAFETY: the acquire load above synchronizes with the release store
         // that published the slot.
         Some(unsafe { self.get_unchecked() })
      } else {
         None
      }
   }

   /// Checks that the caller is the holder's own construction.
   ///
   /// Constructors of singleton types call this (usually through
   /// [`assert_vacant`](Self::assert_vacant)) so that only the factory run
   /// by an accessor can build the instance. The check passes only while the
   /// holder is constructing; anywhere else it fails, whether or not the
   /// instance exists yet.
   pub fn ensure_vacant(&self) -> Result<()> {
      let role = any::type_name::<T>();
      match self.marker.phase() {
         Phase::Initializing => Ok(()),
         Phase::Initialized => Err(Error::AlreadyConstructed { role }),
         Phase::Uninitialized => Err(Error::OutsideAccessor { role }),
      }
   }

   /// Panics unless called from the holder's own construction.
   ///
   /// # Panics
   ///
   /// With [`Error::AlreadyConstructed`]'s message when the singleton already
   /// exists, or [`Error::OutsideAccessor`]'s when nothing is being
   /// constructed. Either is a programming error, not a recoverable one.
   #[inline]
   #[track_caller]
   pub fn assert_vacant(&self) {
      if let Err(e) = self.ensure_vacant() {
         panic!("{e}");
      }
   }

   /// # Safety
   ///
   /// The instance must have been published and observed with acquire ordering.
   #[inline]
   unsafe fn get_unchecked(&self) -> &T {
      debug_assert!(self.is_initialized(), "read of unpublished singleton");
      // SAFETY: guaranteed by the caller.
      unsafe { (*self.value.get()).assume_init_ref() }
   }

   /// Writes the slot and publishes it.
   ///
   /// # Safety
   ///
   /// The caller must own the construction guard that is passed in.
   #[inline]
   unsafe fn publish(&self, guard: ConstructionGuard<'_>, value: T) {
      // SAFETY: the guard gives exclusive access to the unpublished slot.
      unsafe { (*self.value.get()).write(value) };
      guard.commit();
      log::debug!("singleton `{}` published", any::type_name::<T>());
   }
}

impl<T, F> LazySingletonHolder<T, F>
where
   F: Fn() -> T,
{
   /// Returns the shared instance, constructing it on the first call.
   ///
   /// Concurrent first callers block until exactly one of them has run the
   /// factory; all of them then receive the same reference.
   ///
   /// # Panics
   ///
   /// Propagates a panic from the factory. The holder stays uninitialized
   /// and the next call retries construction.
   #[inline]
   pub fn get(&self) -> &T {
      if let Some(value) = self.get_if_initialized() {
         return value;
      }
      self.initialize();
      // SAFETY: `initialize` only returns once the slot is published.
      unsafe { self.get_unchecked() }
   }

   #[cold]
   fn initialize(&self) {
      let Some(guard) = self.marker.lock() else {
         return; // Published by another thread while we waited.
      };
      log::debug!("constructing singleton `{}`", any::type_name::<T>());
      // A panic here drops the guard, which rolls the marker back.
      let value = (self.factory)();
      // SAFETY: we own `guard`.
      unsafe { self.publish(guard, value) };
   }
}

impl<T, E, F> LazySingletonHolder<T, F>
where
   F: Fn() -> Result<T, E>,
{
   /// Returns the shared instance, constructing it with the fallible factory
   /// on the first call.
   ///
   /// A factory error is returned to this caller only; it is not cached and
   /// the next call runs the factory again.
   pub fn try_get(&self) -> Result<&T, E> {
      if let Some(value) = self.get_if_initialized() {
         return Ok(value);
      }
      self.try_initialize()?;
      // SAFETY: `try_initialize` returned `Ok`, so the slot is published.
      Ok(unsafe { self.get_unchecked() })
   }

   #[cold]
   fn try_initialize(&self) -> Result<(), E> {
      let Some(guard) = self.marker.lock() else {
         return Ok(());
      };
      log::debug!("constructing singleton `{}`", any::type_name::<T>());
      let value = (self.factory)()?;
      // SAFETY: we own `guard`.
      unsafe { self.publish(guard, value) };
      Ok(())
   }
}

#[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
impl<T, F, Fut> LazySingletonHolder<T, F>
where
   F: Fn() -> Fut,
   Fut: Future<Output = T>,
{
   /// Async flavour of [`get`](Self::get) for factories returning a future.
   ///
   /// Dropping the returned future while it is constructing counts as a
   /// failed construction: the holder goes back to uninitialized.
   pub async fn get_async(&self) -> &T {
      if let Some(value) = self.get_if_initialized() {
         return value;
      }
      self.initialize_async().await;
      // SAFETY: `initialize_async` only completes once the slot is published.
      unsafe { self.get_unchecked() }
   }

   #[cold]
   async fn initialize_async(&self) {
      let Some(guard) = self.marker.lock_async().await else {
         return;
      };
      log::debug!("constructing singleton `{}`", any::type_name::<T>());
      let value = (self.factory)().await;
      // SAFETY: we own `guard`.
      unsafe { self.publish(guard, value) };
   }
}

#[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
impl<T, E, F, Fut> LazySingletonHolder<T, F>
where
   F: Fn() -> Fut,
   Fut: Future<Output = Result<T, E>>,
{
   /// Async flavour of [`try_get`](Self::try_get).
   pub async fn try_get_async(&self) -> Result<&T, E> {
      if let Some(value) = self.get_if_initialized() {
         return Ok(value);
      }
      self.try_initialize_async().await?;
      // SAFETY: `try_initialize_async` returned `Ok`, so the slot is published.
      Ok(unsafe { self.get_unchecked() })
   }

   #[cold]
   async fn try_initialize_async(&self) -> Result<(), E> {
      let Some(guard) = self.marker.lock_async().await else {
         return Ok(());
      };
      log::debug!("constructing singleton `{}`", any::type_name::<T>());
      let value = (self.factory)().await?;
      // SAFETY: we own `guard`.
      unsafe { self.publish(guard, value) };
      Ok(())
   }
}

// SAFETY:
// Shared access hands out `&T` to any thread, so `T: Sync`; the instance may
// be built on one thread and dropped on another, so `T: Send`. The factory is
// called through `&F` from whichever thread wins the lock, so `F: Sync`.
unsafe impl<T: Send + Sync, F: Sync> Sync for LazySingletonHolder<T, F> {}
// SAFETY: moving the holder moves the instance and the factory.
unsafe impl<T: Send, F: Send> Send for LazySingletonHolder<T, F> {}

impl<T: fmt::Debug, F> fmt::Debug for LazySingletonHolder<T, F> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let mut d = f.debug_struct("LazySingletonHolder");
      d.field("phase", &self.marker.phase());
      match self.get_if_initialized() {
         Some(v) => d.field("value", v),
         None => d.field("value", &format_args!("<uninit>")),
      };
      d.finish()
   }
}

impl<T, F> Drop for LazySingletonHolder<T, F> {
   #[inline]
   fn drop(&mut self) {
      if self.marker.is_initialized(Ordering::Relaxed) {
         // SAFETY: exclusive access, and the slot was published.
         unsafe { self.value.get_mut().assume_init_drop() };
      }
   }
}
