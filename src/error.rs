//! Error types for singleton misuse.
//!
//! Construction failures are not represented here: a fallible factory keeps
//! its own error type, which [`try_get`](crate::LazySingletonHolder::try_get)
//! hands back unchanged.

use thiserror::Error;

/// Misuse of a singleton role.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
   /// A second instance was about to be built while the canonical one
   /// already exists.
   #[error("singleton `{role}` is already constructed; use its accessor instead")]
   AlreadyConstructed {
      /// Type name of the singleton.
      role: &'static str,
   },

   /// An instance was about to be built while the holder was not
   /// constructing, i.e. outside the accessor's factory.
   #[error("singleton `{role}` must be constructed through its accessor")]
   OutsideAccessor {
      /// Type name of the singleton.
      role: &'static str,
   },

   /// Something tried to duplicate the singleton's identity.
   #[error("singleton `{role}` cannot be cloned")]
   CloneUnsupported {
      /// Type name of the singleton.
      role: &'static str,
   },
}

/// Shorthand `Result` type for singleton misuse checks.
pub type Result<T, E = Error> = core::result::Result<T, E>;
