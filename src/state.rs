//! Construction marker and slow-path lock for singleton holders.
//!
//! The marker is packed into a single `AtomicU8`:
//! - Bit 0: INITIALIZED - the instance slot is written and published
//! - Bit 1: INITIALIZING - a thread holds the construction lock
//! - Bit 2: PARKED - at least one thread sleeps on the marker's address
//! - Bits 3-7: GENERATION - bumped whenever construction ends, so a sleeper
//!   never waits on a value that has already gone away
//!
//! Readers only ever need an acquire load of bit 0. Writers go through
//! [`Marker::lock`] or [`Marker::lock_async`], which hand out a
//! [`ConstructionGuard`]; committing the guard publishes the instance,
//! dropping it rolls the marker back.

use core::mem;
use core::sync::atomic::{AtomicU8, Ordering};

use parking_lot_core::{DEFAULT_PARK_TOKEN, DEFAULT_UNPARK_TOKEN};

/// Lifecycle phase of a holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
   Uninitialized,
   Initializing,
   Initialized,
}

/// Outcome of one attempt to take the construction lock.
enum Attempt<'a> {
   Published,
   Acquired(ConstructionGuard<'a>),
   /// Held elsewhere; carries the state a sleeper should wait on.
   Contended(u8),
}

/// Atomic tri-state marker guarding a singleton slot.
#[repr(transparent)]
pub(crate) struct Marker(AtomicU8);

impl Marker {
   const INITIALIZED: u8 = 1;
   const INITIALIZING: u8 = 2;
   const PARKED: u8 = 4;
   const GENERATION: u8 = 8;
   const FLAGS: u8 = Self::INITIALIZED | Self::INITIALIZING | Self::PARKED;

   /// Yields an async waiter spends before it is allowed to block a worker.
   #[cfg(feature = "async-tokio-mt")]
   const ASYNC_YIELDS: u32 = 512;

   /// Creates an uninitialized marker.
   #[inline]
   pub(crate) const fn new() -> Self {
      Self(AtomicU8::new(0))
   }

   #[inline(always)]
   fn key(&self) -> usize {
      self.0.as_ptr() as usize
   }

   /// Returns `true` once the instance is published.
   ///
   /// Callers that go on to read the slot must pass `Ordering::Acquire`.
   #[inline]
   pub(crate) fn is_initialized(&self, ordering: Ordering) -> bool {
      self.0.load(ordering) & Self::INITIALIZED != 0
   }

   /// Snapshot of the current phase.
   #[inline]
   pub(crate) fn phase(&self) -> Phase {
      match self.0.load(Ordering::Acquire) & (Self::INITIALIZED | Self::INITIALIZING) {
         0 => Phase::Uninitialized,
         Self::INITIALIZING => Phase::Initializing,
         _ => Phase::Initialized,
      }
   }

   /// Ends a construction: publishes the instance when `published`, otherwise
   /// returns to uninitialized. Either way the generation moves on and any
   /// sleepers are woken.
   fn finish(&self, published: bool) {
      let generation = (self.0.load(Ordering::Relaxed) & !Self::FLAGS).wrapping_add(Self::GENERATION);
      let next = generation | if published { Self::INITIALIZED } else { 0 };
      // Release pairs with the acquire loads in readers and in `attempt`.
      let prev = self.0.swap(next, Ordering::Release);
      debug_assert!(prev & Self::INITIALIZING != 0, "construction ended without the lock");
      if prev & Self::PARKED != 0 {
         // SAFETY: sleepers park on the same key.
         unsafe {
            parking_lot_core::unpark_all(self.key(), DEFAULT_UNPARK_TOKEN);
         }
      }
   }

   /// Sleeps until the marker no longer holds `observed`.
   fn sleep(&self, observed: u8) {
      log::trace!("parking on singleton marker (state {observed:#04x})");
      // SAFETY: `validate` runs under the bucket lock, so a `finish` that
      // races with us either changes the state first or sees PARKED.
      unsafe {
         let _ = parking_lot_core::park(
            self.key(),
            || self.0.load(Ordering::Acquire) == observed,
            || {},
            |_, _| {},
            DEFAULT_PARK_TOKEN,
            None,
         );
      }
   }

   /// Second check plus lock acquisition. With `announce`, a contended
   /// attempt also sets PARKED so that `finish` knows to wake someone.
   fn attempt(&self, announce: bool) -> Attempt<'_> {
      let mut current = self.0.load(Ordering::Acquire);
      loop {
         let wanted = if current & Self::INITIALIZED != 0 {
            return Attempt::Published;
         } else if current & Self::INITIALIZING == 0 {
            current | Self::INITIALIZING
         } else if announce && current & Self::PARKED == 0 {
            current | Self::PARKED
         } else {
            return Attempt::Contended(current);
         };

         match self
            .0
            .compare_exchange_weak(current, wanted, Ordering::Acquire, Ordering::Acquire)
         {
            Ok(_) if wanted & Self::INITIALIZING != current & Self::INITIALIZING => {
               return Attempt::Acquired(ConstructionGuard { marker: self });
            }
            Ok(_) => return Attempt::Contended(wanted),
            Err(actual) => {
               current = actual;
               std::hint::spin_loop();
            }
         }
      }
   }

   /// Takes the construction lock, sleeping while another thread holds it.
   ///
   /// Returns `None` if the instance was published before or while waiting.
   pub(crate) fn lock(&self) -> Option<ConstructionGuard<'_>> {
      loop {
         match self.attempt(true) {
            Attempt::Published => return None,
            Attempt::Acquired(guard) => return Some(guard),
            Attempt::Contended(observed) => self.sleep(observed),
         }
      }
   }

   /// Async flavour of [`Marker::lock`].
   ///
   /// Waiters yield to the runtime so the constructing task can make
   /// progress on the same thread. Only on a multi-threaded tokio runtime,
   /// and only after a long wait, does a waiter hand its worker over with
   /// `block_in_place` and sleep like a synchronous caller.
   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   pub(crate) async fn lock_async(&self) -> Option<ConstructionGuard<'_>> {
      let mut yields = 0u32;
      loop {
         match self.attempt(false) {
            Attempt::Published => return None,
            Attempt::Acquired(guard) => return Some(guard),
            Attempt::Contended(_) => {}
         }

         #[cfg(feature = "async-tokio-mt")]
         {
            if yields >= Self::ASYNC_YIELDS && can_block_in_place() {
               return tokio::task::block_in_place(|| self.lock());
            }
         }

         yields = yields.saturating_add(1);
         tokio::task::yield_now().await;
      }
   }
}

/// `block_in_place` panics outside a multi-threaded runtime.
#[cfg(feature = "async-tokio-mt")]
fn can_block_in_place() -> bool {
   use tokio::runtime::{Handle, RuntimeFlavor};

   matches!(
      Handle::try_current().map(|handle| handle.runtime_flavor()),
      Ok(RuntimeFlavor::MultiThread)
   )
}

/// Exclusive right to construct the instance.
///
/// [`commit`](ConstructionGuard::commit) publishes; dropping the guard (error,
/// panic unwind, or a cancelled future) rolls the marker back so another
/// caller can retry.
pub(crate) struct ConstructionGuard<'a> {
   marker: &'a Marker,
}

impl ConstructionGuard<'_> {
   /// Marks the instance as published and wakes sleepers.
   #[inline]
   pub(crate) fn commit(self) {
      self.marker.finish(true);
      mem::forget(self);
   }
}

impl Drop for ConstructionGuard<'_> {
   fn drop(&mut self) {
      log::debug!("singleton construction abandoned, holder reset to uninitialized");
      self.marker.finish(false);
   }
}
