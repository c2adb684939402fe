use ratatui::prelude::Color;

/// Truncate to at most `max_len` characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Price with two decimals
pub fn format_price(price: f64) -> String {
  format!("${:.2}", price)
}

pub fn rating_color(rating: f64) -> Color {
  if rating >= 4.5 {
    Color::Green
  } else if rating >= 3.5 {
    Color::Yellow
  } else {
    Color::Red
  }
}

pub fn stock_color(stock: u32) -> Color {
  match stock {
    0 => Color::Red,
    1..=10 => Color::Yellow,
    _ => Color::White,
  }
}
