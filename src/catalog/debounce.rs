//! Tick-driven debounce for the search input.

use std::time::{Duration, Instant};

/// Holds back a value until no newer one has arrived for `delay`.
///
/// Driven by the event loop: `push` on every keystroke, `poll` on every tick.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
  delay: Duration,
  pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
  pub fn new(delay: Duration) -> Self {
    Self {
      delay,
      pending: None,
    }
  }

  /// Replace any pending value and restart the delay from `now`
  pub fn push(&mut self, value: T, now: Instant) {
    self.pending = Some((value, now + self.delay));
  }

  /// Take the pending value if its deadline has passed
  pub fn poll(&mut self, now: Instant) -> Option<T> {
    match &self.pending {
      Some((_, deadline)) if *deadline <= now => self.pending.take().map(|(value, _)| value),
      _ => None,
    }
  }

  /// Drop the pending value without emitting it
  pub fn cancel(&mut self) {
    self.pending = None;
  }

  pub fn is_pending(&self) -> bool {
    self.pending.is_some()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const DELAY: Duration = Duration::from_millis(500);

  #[test]
  fn test_burst_emits_last_value_once() {
    let mut debouncer = Debouncer::new(DELAY);
    let t0 = Instant::now();
    let mut applied = Vec::new();

    // Typing "lap" with 100ms between keystrokes, polled every 50ms
    for (i, value) in ["l", "la", "lap"].into_iter().enumerate() {
      let at = t0 + Duration::from_millis(100 * i as u64);
      debouncer.push(value.to_string(), at);
      for step in 1..=2 {
        if let Some(v) = debouncer.poll(at + Duration::from_millis(50 * step)) {
          applied.push(v);
        }
      }
    }

    let mut tick = t0 + Duration::from_millis(300);
    while tick < t0 + Duration::from_secs(2) {
      if let Some(v) = debouncer.poll(tick) {
        applied.push(v);
      }
      tick += Duration::from_millis(50);
    }

    assert_eq!(applied, vec!["lap".to_string()]);
  }

  #[test]
  fn test_not_emitted_before_delay() {
    let mut debouncer = Debouncer::new(DELAY);
    let t0 = Instant::now();
    debouncer.push(1, t0);
    assert_eq!(debouncer.poll(t0 + Duration::from_millis(499)), None);
    assert_eq!(debouncer.poll(t0 + DELAY), Some(1));
    assert!(!debouncer.is_pending());
  }

  #[test]
  fn test_new_value_restarts_delay() {
    let mut debouncer = Debouncer::new(DELAY);
    let t0 = Instant::now();
    debouncer.push(1, t0);
    debouncer.push(2, t0 + Duration::from_millis(400));
    assert_eq!(debouncer.poll(t0 + Duration::from_millis(600)), None);
    assert_eq!(debouncer.poll(t0 + Duration::from_millis(900)), Some(2));
  }

  #[test]
  fn test_cancel_drops_pending() {
    let mut debouncer = Debouncer::new(DELAY);
    let t0 = Instant::now();
    debouncer.push(1, t0);
    debouncer.cancel();
    assert_eq!(debouncer.poll(t0 + Duration::from_secs(1)), None);
  }
}
