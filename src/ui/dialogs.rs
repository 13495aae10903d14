//! Overlay windows: main menu, help, options editor, signal confirmation.
//!
//! Every overlay is a cleared, centered box on top of the panels; the
//! panels keep refreshing behind it while `background_update` is on.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Clear, Paragraph};

use crate::app::{App, OPTION_KEYS, Overlay};
use crate::ui::bordered;

pub fn draw(f: &mut Frame, app: &App) {
    match &app.overlay {
        Overlay::None => {}
        Overlay::Menu { selected } => menu(f, app, *selected),
        Overlay::Help => help(f, app),
        Overlay::Options { selected, editing } => options(f, app, *selected, *editing),
        Overlay::Confirm {
            pid,
            name,
            sig_name,
            ..
        } => confirm(f, app, *pid, name, sig_name),
    }
}

const MENU_ITEMS: [&str; 3] = ["options", "help", "quit"];

pub fn menu_len() -> usize {
    MENU_ITEMS.len()
}

fn menu(f: &mut Frame, app: &App, selected: usize) {
    let theme = &app.theme;
    let area = centered(f.area(), 24, MENU_ITEMS.len() as u16 + 2);
    f.render_widget(Clear, area);
    let block = bordered(" menu ", theme.div_line.color(), theme.title.color());
    let inner = block.inner(area);
    f.render_widget(block, area);

    let lines: Vec<Line> = MENU_ITEMS
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let style = if i == selected {
                Style::default()
                    .fg(theme.selected_fg.color())
                    .bg(theme.selected_bg.color())
            } else {
                Style::default().fg(theme.main_fg.color())
            };
            Line::from(Span::styled(format!("  {item:<20}"), style))
        })
        .collect();
    f.render_widget(Paragraph::new(lines), inner);
}

fn help(f: &mut Frame, app: &App) {
    let theme = &app.theme;
    let keys: [(&str, &str); 14] = [
        ("↑ ↓", "select process"),
        ("enter", "show detail for selection"),
        ("pgup pgdn", "previous / next page"),
        ("home end", "first / last page"),
        ("← →", "change sort column"),
        ("r", "reverse sort order"),
        ("f / c", "filter input / clear filter"),
        ("t k i", "send TERM / KILL / INT"),
        ("+ - (a s)", "update interval ±100 ms"),
        ("h f1", "this help"),
        ("o f2", "options"),
        ("m esc", "menu"),
        ("q", "quit"),
        ("", ""),
    ];

    let area = centered(f.area(), 44, keys.len() as u16 + 2);
    f.render_widget(Clear, area);
    let block = bordered(" help ", theme.div_line.color(), theme.title.color());
    let inner = block.inner(area);
    f.render_widget(block, area);

    let lines: Vec<Line> = keys
        .iter()
        .map(|(key, what)| {
            Line::from(vec![
                Span::styled(
                    format!(" {key:<11}"),
                    Style::default()
                        .fg(theme.hi_fg.color())
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(*what, Style::default().fg(theme.main_fg.color())),
            ])
        })
        .collect();
    f.render_widget(Paragraph::new(lines), inner);
}

fn options(f: &mut Frame, app: &App, selected: usize, editing: bool) {
    let theme = &app.theme;
    let area = centered(f.area(), 52, OPTION_KEYS.len() as u16 + 3);
    f.render_widget(Clear, area);
    let block = bordered(" options ", theme.div_line.color(), theme.title.color());
    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut lines: Vec<Line> = OPTION_KEYS
        .iter()
        .enumerate()
        .map(|(i, key)| {
            let value = app.option_value(key);
            let (value, value_style) = if i == selected && editing {
                (
                    format!("{value}█"),
                    Style::default().fg(theme.title.color()),
                )
            } else {
                (value, Style::default().fg(theme.main_fg.color()))
            };
            let key_style = if i == selected {
                Style::default()
                    .fg(theme.selected_fg.color())
                    .bg(theme.selected_bg.color())
            } else {
                Style::default().fg(theme.hi_fg.color())
            };
            Line::from(vec![
                Span::styled(format!(" {key:<19}"), key_style),
                Span::styled(format!(" {value:<28}"), value_style),
            ])
        })
        .collect();
    lines.push(Line::from(Span::styled(
        " ←/→ change, enter edits text, esc closes",
        Style::default().fg(theme.inactive_fg.color()),
    )));
    f.render_widget(Paragraph::new(lines), inner);
}

fn confirm(f: &mut Frame, app: &App, pid: u32, name: &str, sig_name: &str) {
    let theme = &app.theme;
    let text = format!("Send {sig_name} to {pid} ({name})?");
    let width = (text.len() as u16 + 6).max(24);
    let area = centered(f.area(), width, 5);
    f.render_widget(Clear, area);
    let block = bordered(" confirm ", theme.proc_box.color(), theme.title.color());
    let inner = block.inner(area);
    f.render_widget(block, area);

    let lines = vec![
        Line::from(Span::styled(
            format!(" {text}"),
            Style::default().fg(theme.main_fg.color()),
        )),
        Line::default(),
        Line::from(vec![
            Span::styled(" y ", Style::default().fg(theme.hi_fg.color())),
            Span::styled("confirm   ", Style::default().fg(theme.inactive_fg.color())),
            Span::styled("n/esc ", Style::default().fg(theme.hi_fg.color())),
            Span::styled("cancel", Style::default().fg(theme.inactive_fg.color())),
        ]),
    ];
    f.render_widget(Paragraph::new(lines), inner);
}

/// Centers a `width`×`height` box in `area`, clamped to fit.
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect::new(
        area.x + (area.width - w) / 2,
        area.y + (area.height - h) / 2,
        w,
        h,
    )
}
