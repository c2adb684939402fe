//! Async query and mutation handles for the UI.
//!
//! Inspired by TanStack Query. A `Query<T>` runs its fetcher on a tokio task
//! and delivers the result over a channel that the view polls on each tick.
//! A `Mutation<I, T>` does the same for one-shot writes, and reports each
//! outcome exactly once.
//!
//! # Example
//!
//! ```ignore
//! let store = store.clone();
//! let mut query = Query::new(move || {
//!     let store = store.clone();
//!     async move { store.all_products().await.map_err(|e| e.to_string()) }
//! });
//!
//! query.fetch();
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, trigger re-render
//! }
//! ```

use futures::future::BoxFuture;
use std::future::Future;
use tokio::sync::mpsc;

/// The state of a query
#[derive(Debug, Clone)]
pub enum QueryState<T> {
  /// Query has not been started
  Idle,
  /// Query is currently fetching data
  Loading,
  /// Query completed successfully
  Success(T),
  /// Query failed with an error
  Error(String),
}

impl<T> QueryState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  pub fn is_error(&self) -> bool {
    matches!(self, QueryState::Error(_))
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&str> {
    match self {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }
}

/// A factory function that creates futures for fetching data
type FetcherFn<T> = Box<dyn Fn() -> BoxFuture<'static, Result<T, String>> + Send + Sync>;

/// Async query for data fetching with state management.
pub struct Query<T> {
  state: QueryState<T>,
  fetcher: FetcherFn<T>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, String>>>,
}

impl<T: Send + 'static> Query<T> {
  /// Create a new query with the given fetcher function.
  ///
  /// The fetcher is called each time `fetch()` or `refetch()` is invoked.
  pub fn new<F, Fut>(fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    Self {
      state: QueryState::Idle,
      fetcher: Box::new(move || Box::pin(fetcher())),
      receiver: None,
    }
  }

  /// Get the current state of the query.
  pub fn state(&self) -> &QueryState<T> {
    &self.state
  }

  /// Get the data if the query succeeded.
  pub fn data(&self) -> Option<&T> {
    self.state.data()
  }

  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  pub fn is_error(&self) -> bool {
    self.state.is_error()
  }

  pub fn error(&self) -> Option<&str> {
    self.state.error()
  }

  /// Replace the data in place, e.g. after the cache was patched.
  ///
  /// Ignored while a fetch is in flight; its result supersedes this.
  pub fn set_data(&mut self, data: T) {
    if self.receiver.is_none() {
      self.state = QueryState::Success(data);
    }
  }

  /// Start fetching data if not already loading.
  pub fn fetch(&mut self) {
    if self.state.is_loading() {
      return;
    }
    self.start_fetch();
  }

  /// Force a refetch, even if already loading or data exists.
  pub fn refetch(&mut self) {
    // Dropping the receiver discards the pending result
    self.receiver = None;
    self.start_fetch();
  }

  /// Poll for results from a pending fetch.
  ///
  /// Returns `true` if the state changed (data arrived or error occurred).
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    match receiver.try_recv() {
      Ok(Ok(data)) => {
        self.state = QueryState::Success(data);
        self.receiver = None;
        true
      }
      Ok(Err(error)) => {
        self.state = QueryState::Error(error);
        self.receiver = None;
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        self.state = QueryState::Error("Query was cancelled".to_string());
        self.receiver = None;
        true
      }
    }
  }

  fn start_fetch(&mut self) {
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    self.state = QueryState::Loading;

    let future = (self.fetcher)();
    tokio::spawn(async move {
      let result = future.await;
      // Receiver may have been dropped by a refetch
      let _ = tx.send(result);
    });
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("state", &self.state)
      .finish_non_exhaustive()
  }
}

type MutateFn<I, T> = Box<dyn Fn(I) -> BoxFuture<'static, Result<T, String>> + Send + Sync>;

/// Async write with a single in-flight call.
pub struct Mutation<I, T> {
  mutate: MutateFn<I, T>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, String>>>,
}

impl<I: Send + 'static, T: Send + 'static> Mutation<I, T> {
  pub fn new<F, Fut>(mutate: F) -> Self
  where
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    Self {
      mutate: Box::new(move |input| Box::pin(mutate(input))),
      receiver: None,
    }
  }

  pub fn is_pending(&self) -> bool {
    self.receiver.is_some()
  }

  /// Start the mutation. Returns `false` without doing anything if one is
  /// already pending.
  pub fn mutate(&mut self, input: I) -> bool {
    if self.is_pending() {
      return false;
    }

    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);

    let future = (self.mutate)(input);
    tokio::spawn(async move {
      let _ = tx.send(future.await);
    });
    true
  }

  /// Take the outcome of a finished mutation
  pub fn poll(&mut self) -> Option<Result<T, String>> {
    let receiver = self.receiver.as_mut()?;

    let outcome = match receiver.try_recv() {
      Ok(result) => result,
      Err(mpsc::error::TryRecvError::Empty) => return None,
      Err(mpsc::error::TryRecvError::Disconnected) => Err("Mutation was cancelled".to_string()),
    };
    self.receiver = None;
    Some(outcome)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::Arc;
  use std::time::Duration;

  #[tokio::test]
  async fn test_query_success() {
    let mut query = Query::new(|| async { Ok::<_, String>(vec![1, 2, 3]) });

    assert!(matches!(query.state(), QueryState::Idle));

    query.fetch();
    assert!(query.is_loading());

    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(query.poll());
    assert!(matches!(query.state(), QueryState::Success(_)));
    assert_eq!(query.data(), Some(&vec![1, 2, 3]));
  }

  #[tokio::test]
  async fn test_query_error() {
    let mut query: Query<i32> = Query::new(|| async { Err("Something went wrong".to_string()) });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(query.poll());
    assert!(query.is_error());
    assert_eq!(query.error(), Some("Something went wrong"));
  }

  #[tokio::test]
  async fn test_set_data_replaces_success() {
    let mut query = Query::new(|| async { Ok::<_, String>(1) });
    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();

    query.set_data(2);
    assert_eq!(query.data(), Some(&2));
  }

  #[tokio::test]
  async fn test_set_data_ignored_while_loading() {
    let mut query = Query::new(|| async {
      tokio::time::sleep(Duration::from_millis(50)).await;
      Ok::<_, String>(1)
    });
    query.fetch();
    query.set_data(2);
    assert!(query.is_loading());
  }

  #[tokio::test]
  async fn test_refetch_cancels_pending() {
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();

    let mut query = Query::new(move || {
      let counter = counter_clone.clone();
      async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok::<_, String>(counter.fetch_add(1, Ordering::SeqCst))
      }
    });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;

    query.refetch();
    tokio::time::sleep(Duration::from_millis(100)).await;

    query.poll();
    assert_eq!(query.data(), Some(&1));
  }

  #[tokio::test]
  async fn test_mutation_reports_once() {
    let mut mutation = Mutation::new(|n: u32| async move { Ok::<_, String>(n * 2) });

    assert!(mutation.mutate(21));
    assert!(mutation.is_pending());
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(mutation.poll(), Some(Ok(42)));
    assert!(!mutation.is_pending());
    assert_eq!(mutation.poll(), None);
  }

  #[tokio::test]
  async fn test_mutation_rejects_while_pending() {
    let calls = Arc::new(AtomicU32::new(0));
    let calls_clone = calls.clone();
    let mut mutation = Mutation::new(move |_: ()| {
      let calls = calls_clone.clone();
      async move {
        calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        Err::<(), _>("boom".to_string())
      }
    });

    assert!(mutation.mutate(()));
    assert!(!mutation.mutate(()));
    tokio::time::sleep(Duration::from_millis(60)).await;

    assert_eq!(mutation.poll(), Some(Err("boom".to_string())));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }
}
