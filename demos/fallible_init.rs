use std::sync::atomic::{AtomicBool, Ordering};

use lazy_singleton::TryLazySingletonHolder;

static FAIL: AtomicBool = AtomicBool::new(true);
static MAYBE_DATA: TryLazySingletonHolder<String, &'static str> =
   TryLazySingletonHolder::new(load_data);

fn load_data() -> Result<String, &'static str> {
   let fail = FAIL.load(Ordering::Relaxed);
   println!("Attempting initialization (fail={})...", fail);
   if fail {
      Err("Initialization failed!")
   } else {
      Ok("Successfully initialized".to_string())
   }
}

fn main() {
   env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();

   // First attempt fails
   match MAYBE_DATA.try_get() {
      Ok(_) => panic!("Should have failed"),
      Err(e) => println!("Caught error: {}", e),
   }
   assert!(!MAYBE_DATA.is_initialized()); // Still uninitialized

   // Second attempt succeeds
   FAIL.store(false, Ordering::Relaxed);
   match MAYBE_DATA.try_get() {
      Ok(data) => println!("Got data: {}", data),
      Err(_) => panic!("Should have succeeded"),
   }
   assert!(MAYBE_DATA.is_initialized());

   // Later failures in the factory are never observed
   FAIL.store(true, Ordering::Relaxed);
   match MAYBE_DATA.try_get() {
      Ok(data) => println!("Got data again: {}", data),
      Err(_) => panic!("Should have returned existing data"),
   }
}
