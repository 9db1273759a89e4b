use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use lazy_singleton::{singleton, Error, Instance, Singleton};
use serde::Serialize;

static CONSTRUCTED: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, Serialize)]
struct AppConfig {
   name: String,
   workers: usize,
}

impl AppConfig {
   fn new() -> Self {
      Self::assert_vacant();
      CONSTRUCTED.fetch_add(1, Ordering::SeqCst);
      AppConfig {
         name: String::from("primary"),
         workers: 8,
      }
   }

   fn describe(&self) -> String {
      format!("{} x{}", self.name, self.workers)
   }
}

static LEDGERS_BUILT: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug)]
struct Ledger {
   entries: Vec<u64>,
}

impl Ledger {
   fn new() -> Self {
      Self::assert_vacant();
      LEDGERS_BUILT.fetch_add(1, Ordering::SeqCst);
      Ledger { entries: vec![1, 2, 3] }
   }
}

#[derive(Debug)]
struct Metrics {
   started: bool,
}

singleton! {
   AppConfig => AppConfig::new,
   Ledger => Ledger::new,
   Metrics => || Metrics { started: true },
}

#[test]
fn test_instance_identity() {
   let s1 = AppConfig::instance();
   let s2 = AppConfig::instance();
   assert!(Instance::ptr_eq(&s1, &s2));
   assert_eq!(s1, s2);
   assert_eq!(s1.as_ptr(), s2.get() as *const AppConfig);
   assert_eq!(s1.describe(), "primary x8");
   assert_eq!(CONSTRUCTED.load(Ordering::SeqCst), 1);
}

#[test]
fn test_instance_identity_across_threads() {
   const THREADS: usize = 100;
   let barrier = Arc::new(Barrier::new(THREADS));
   let threads: Vec<_> = (0..THREADS)
      .map(|_| {
         let barrier = Arc::clone(&barrier);
         thread::spawn(move || {
            barrier.wait();
            let config = AppConfig::instance();
            assert_eq!(config.workers, 8);
            config.as_ptr() as usize
         })
      })
      .collect();

   let addrs: HashSet<usize> = threads.into_iter().map(|h| h.join().unwrap()).collect();
   assert_eq!(addrs.len(), 1);
   assert_eq!(CONSTRUCTED.load(Ordering::SeqCst), 1);
}

#[test]
fn test_instances_hash_by_identity() {
   let set: HashSet<Instance<AppConfig>> = (0..4).map(|_| AppConfig::instance()).collect();
   assert_eq!(set.len(), 1);
}

#[test]
fn test_closure_factory() {
   assert!(Metrics::instance().started);
   assert_eq!(Metrics::instance(), Metrics::instance());
}

#[test]
fn test_clone_is_rejected() {
   let config = AppConfig::instance();
   let err = config.try_clone().unwrap_err();
   assert_eq!(
      err,
      Error::CloneUnsupported {
         role: std::any::type_name::<AppConfig>(),
      }
   );
   assert!(err.to_string().contains("cannot be cloned"));
}

#[test]
fn test_ensure_vacant_after_construction() {
   let _ = AppConfig::instance();
   let err = AppConfig::holder().ensure_vacant().unwrap_err();
   assert!(matches!(err, Error::AlreadyConstructed { .. }));
   assert!(err.to_string().contains("AppConfig"));
}

#[test]
#[should_panic(expected = "already constructed")]
fn test_direct_construction_is_fatal() {
   let _ = AppConfig::instance();
   let _second = AppConfig::new();
}

#[test]
fn test_direct_construction_before_first_access_is_rejected() {
   let direct = std::panic::catch_unwind(Ledger::new);
   let message = direct.unwrap_err();
   let message = message
      .downcast_ref::<String>()
      .map(String::as_str)
      .unwrap_or_default();
   assert!(message.contains("through its accessor"));
   assert_eq!(LEDGERS_BUILT.load(Ordering::SeqCst), 0);

   // The accessor still builds the one and only instance.
   let ledger = Ledger::instance();
   assert_eq!(ledger.entries, [1, 2, 3]);
   assert_eq!(LEDGERS_BUILT.load(Ordering::SeqCst), 1);
}

#[test]
fn test_round_trip_resolves_to_canonical_instance() {
   let original = AppConfig::instance();
   let json = serde_json::to_string(&original).unwrap();
   assert_eq!(json, r#"{"name":"primary","workers":8}"#);

   let restored: Instance<AppConfig> = serde_json::from_str(&json).unwrap();
   assert!(Instance::ptr_eq(&original, &restored));
   assert_eq!(CONSTRUCTED.load(Ordering::SeqCst), 1);
}

#[test]
fn test_foreign_payload_resolves_to_canonical_instance() {
   // Whatever was persisted, the restored handle is the live instance.
   let restored: Instance<AppConfig> =
      serde_json::from_str(r#"{"name":"stale","workers":1}"#).unwrap();
   assert_eq!(restored.name, "primary");
   assert_eq!(restored, AppConfig::instance());

   let many: Vec<Instance<AppConfig>> = serde_json::from_str("[null, 3, {}]").unwrap();
   assert!(many.iter().all(|i| *i == AppConfig::instance()));
}

#[test]
fn test_malformed_payload_is_an_error() {
   let result: Result<Instance<AppConfig>, _> = serde_json::from_str(r#"{"name":"#);
   assert!(result.is_err());
}
