use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the footer bar: view breadcrumb on the left, view status on the right
pub fn draw_footer(frame: &mut Frame, area: Rect, breadcrumb: &[String], status: Option<&str>) {
  let mut spans = vec![Span::raw(" ")];

  for (i, part) in breadcrumb.iter().enumerate() {
    if i > 0 {
      spans.push(Span::styled(" > ", Style::default().fg(Color::DarkGray)));
    }

    let style = if i == breadcrumb.len() - 1 {
      Style::default().fg(Color::Cyan).bold()
    } else {
      Style::default().fg(Color::White)
    };

    spans.push(Span::styled(part.clone(), style));
  }

  let background = Style::default().bg(Color::Black);
  frame.render_widget(Paragraph::new(Line::from(spans)).style(background), area);

  if let Some(status) = status {
    let right = Paragraph::new(format!("{} ", status))
      .alignment(Alignment::Right)
      .style(Style::default().fg(Color::Yellow));
    frame.render_widget(right, area);
  }
}
