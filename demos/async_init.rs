use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};

use lazy_singleton::LazySingletonHolder;
use tokio::time::{sleep, Duration};

type Loader = fn() -> Pin<Box<dyn Future<Output = String> + Send>>;

static COUNTER: AtomicUsize = AtomicUsize::new(0);
static ASYNC_DATA: LazySingletonHolder<String, Loader> = LazySingletonHolder::new(load);

fn load() -> Pin<Box<dyn Future<Output = String> + Send>> {
   Box::pin(async {
      // This async block runs only once
      COUNTER.fetch_add(1, Ordering::Relaxed);
      log::info!("Initializing async data...");
      sleep(Duration::from_millis(50)).await;
      "Async expensive data".to_string()
   })
}

#[tokio::main]
async fn main() {
   env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

   let tasks: Vec<_> = (0..5)
      .map(|_| {
         tokio::spawn(async {
            println!("Task access: {}", ASYNC_DATA.get_async().await);
         })
      })
      .collect();

   for t in tasks {
      t.await.unwrap();
   }

   assert_eq!(
      ASYNC_DATA.get_if_initialized(),
      Some(&"Async expensive data".to_string())
   );
   assert_eq!(COUNTER.load(Ordering::Relaxed), 1); // Factory ran only once
   println!("Final async data: {}", ASYNC_DATA.get_async().await);
}
