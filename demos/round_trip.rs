use lazy_singleton::{singleton, Instance, Singleton};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct Registry {
   version: u64,
}

impl Registry {
   fn new() -> Self {
      Self::assert_vacant();
      Registry { version: 3 }
   }
}

singleton!(Registry => Registry::new);

fn main() {
   env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();

   let original = Registry::instance();
   let json = serde_json::to_string(&original).unwrap();
   println!("Serialized: {json}");

   let restored: Instance<Registry> = serde_json::from_str(&json).unwrap();
   assert!(Instance::ptr_eq(&original, &restored));
   println!("Restored handle is the canonical instance: {:?}", restored);

   match original.try_clone() {
      Ok(_) => panic!("Cloning a singleton must fail"),
      Err(e) => println!("Clone rejected: {e}"),
   }
}
