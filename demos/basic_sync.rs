use std::sync::atomic::{AtomicUsize, Ordering};

use lazy_singleton::{singleton, Instance, Singleton};

static CONSTRUCTED: AtomicUsize = AtomicUsize::new(0);

struct Service {
   label: String,
}

impl Service {
   fn new() -> Self {
      Self::assert_vacant();
      CONSTRUCTED.fetch_add(1, Ordering::Relaxed);
      log::info!("constructing service");
      // Simulate work
      std::thread::sleep(std::time::Duration::from_millis(50));
      Service {
         label: "ready".to_string(),
      }
   }
}

singleton!(Service => Service::new);

fn main() {
   env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

   let threads: Vec<_> = (0..5)
      .map(|_| {
         std::thread::spawn(|| {
            let service = Service::instance();
            println!("Thread access: {}", service.label);
            service.as_ptr() as usize
         })
      })
      .collect();

   let addrs: Vec<usize> = threads.into_iter().map(|t| t.join().unwrap()).collect();

   let s1 = Service::instance();
   let s2 = Service::instance();
   assert!(Instance::ptr_eq(&s1, &s2));
   assert!(addrs.iter().all(|&a| a == s1.as_ptr() as usize));
   assert_eq!(CONSTRUCTED.load(Ordering::Relaxed), 1); // Constructed only once
   println!("s1 and s2 are same instance");
}
