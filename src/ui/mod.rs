//! Panel composition.
//!
//! `draw` renders the four panels from the cached graphs and the newest
//! sampler snapshots, then any overlay window and the clock. Below the
//! minimum terminal size it renders a resize prompt instead.

pub mod cpu;
pub mod dialogs;
pub mod graph;
pub mod layout;
pub mod mem;
pub mod net;
pub mod process;

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::app::App;

/// Cached per-panel state (pre-rendered graphs).
pub struct Panels {
    pub cpu: cpu::CpuPanel,
    pub net: net::NetPanel,
    pub proc: process::ProcPanel,
}

impl Panels {
    pub fn new() -> Panels {
        Panels {
            cpu: cpu::CpuPanel::new(),
            net: net::NetPanel::new(),
            proc: process::ProcPanel::new(),
        }
    }
}

pub fn draw(f: &mut Frame, app: &App) {
    if let Some(bg) = app.theme.main_bg {
        f.render_widget(
            Block::default().style(Style::default().bg(bg.color())),
            f.area(),
        );
    }

    let size = f.area();
    if !layout::valid(size.width, size.height) {
        resize_prompt(f, app);
        return;
    }

    cpu::draw(f, app);
    mem::draw(f, app);
    net::draw(f, app);
    process::draw(f, app);
    dialogs::draw(f, app);
    draw_clock(f, app);
}

/// Box chrome shared by every panel.
pub fn bordered(title: &str, line: Color, title_color: Color) -> Block<'static> {
    Block::default()
        .title(Span::styled(
            title.to_owned(),
            Style::default().fg(title_color),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(line))
}

/// Blocking prompt shown while the terminal is below 80×25.
fn resize_prompt(f: &mut Frame, app: &App) {
    let area = f.area();
    let theme = &app.theme;
    let current = format!("Current size: {}x{}", area.width, area.height);
    let needed = format!("Needs to be at least: {}x{}", layout::MIN_COLS, layout::MIN_ROWS);
    let y = area.height / 2;
    for (i, (text, color)) in [
        (current, theme.title.color()),
        (needed, theme.hi_fg.color()),
    ]
    .into_iter()
    .enumerate()
    {
        let w = (text.len() as u16).min(area.width);
        let x = (area.width - w) / 2;
        let line_y = y.saturating_sub(1) + i as u16;
        if line_y < area.height {
            f.render_widget(
                Paragraph::new(Line::from(Span::styled(text, Style::default().fg(color)))),
                Rect::new(x, line_y, w, 1),
            );
        }
    }
}

/// Clock centered on the CPU panel's top border.
fn draw_clock(f: &mut Frame, app: &App) {
    if app.clock.is_empty() {
        return;
    }
    let area = f.area();
    let text = format!(" {} ", app.clock);
    let w = text.len() as u16;
    if w + 2 >= area.width {
        return;
    }
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(
            text,
            Style::default().fg(app.theme.title.color()),
        ))),
        Rect::new((area.width - w) / 2, 0, w, 1),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::App;
    use crate::config::Config;
    use crate::theme::Theme;
    use ratatui::{Terminal, backend::TestBackend};

    fn render(width: u16, height: u16) -> ratatui::buffer::Buffer {
        let mut app = App::new(Config::default(), Theme::default(), false);
        app.resize(width, height);
        let backend = TestBackend::new(width, height);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| draw(f, &app)).unwrap();
        terminal.backend().buffer().clone()
    }

    fn text_of(buf: &ratatui::buffer::Buffer) -> String {
        buf.content
            .iter()
            .map(|c| c.symbol().to_string())
            .collect()
    }

    #[test]
    fn panels_render_at_normal_size() {
        let buf = render(120, 40);
        let text = text_of(&buf);
        assert!(text.contains("proc"));
        assert!(text.contains("mem"));
        assert!(text.contains("net"));
        assert!(text.contains("Load AVG:"));
    }

    #[test]
    fn panels_render_at_minimum_size() {
        let buf = render(80, 25);
        let text = text_of(&buf);
        assert!(text.contains("proc"));
    }

    #[test]
    fn small_terminal_shows_resize_prompt() {
        let buf = render(40, 12);
        let text = text_of(&buf);
        assert!(text.contains("Needs to be at least: 80x25"));
        assert!(!text.contains("proc"));
    }
}
