//! Process-wide singletons with lazy, exactly-once, thread-safe construction.
//!
//! The crate is built around one type and a thin layer on top of it:
//!
//! - [`LazySingletonHolder<T>`]: owns at most one `T`, built by a stored factory
//!   on first access and returned by reference to every caller afterwards.
//! - [`Singleton`], [`Instance`] and [`singleton!`]: give a type a canonical
//!   instance reached through an accessor, with identity-based equality,
//!   rejection of duplicates and (with the `serde` feature) deserialization
//!   that resolves back to the canonical instance.
//!
//! The holder uses double-checked locking on an atomic marker. Reading a
//! published instance is a single acquire load with no lock. First callers
//! race for a construction lock; losers park with `parking_lot`'s futex-based
//! primitives and wake up to the published instance. A factory that fails,
//! panics, or is cancelled leaves the holder uninitialized so a later call can
//! retry.
//!
//! # Features
//!
//! - **Lock-free fast path**: reading an initialized instance requires no synchronization.
//! - **Exactly-once construction**: concurrent first callers never build two instances.
//! - **Retryable failures**: errors and panics are not cached.
//! - **Async support**: async accessors with cancellation treated as failure.
//! - **Serialization identity**: a deserialized [`Instance`] is the canonical one.
//!
//! # Examples
//!
//! ## Holder
//!
//! ```rust
//! use lazy_singleton::LazySingletonHolder;
//!
//! fn load() -> String {
//!    "production".to_string()
//! }
//!
//! static CONFIG: LazySingletonHolder<String> = LazySingletonHolder::new(load);
//!
//! assert_eq!(CONFIG.get(), "production");
//! assert!(core::ptr::eq(CONFIG.get(), CONFIG.get()));
//! ```
//!
//! ## Fallible factory
//!
//! ```rust
//! use lazy_singleton::TryLazySingletonHolder;
//!
//! fn connect() -> Result<u16, std::num::ParseIntError> {
//!    "8080".parse()
//! }
//!
//! static PORT: TryLazySingletonHolder<u16, std::num::ParseIntError> =
//!    TryLazySingletonHolder::new(connect);
//!
//! assert_eq!(PORT.try_get(), Ok(&8080));
//! ```

/// Misuse errors.
pub mod error;

/// Singleton holder.
mod holder;

/// Singleton roles and identity handles.
mod singleton;

/// Internal construction marker.
mod state;

pub use error::Error;
pub use holder::{LazySingletonHolder, TryLazySingletonHolder};
pub use singleton::{Instance, Singleton};
