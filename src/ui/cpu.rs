//! CPU panel renderer.
//!
//! Aggregate usage graph on the left, a grid of per-thread meters (with
//! optional temperatures) on the right, load average and uptime along the
//! bottom line.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::app::App;
use crate::fmt;
use crate::sampler::cpu::CpuSampler;
use crate::ui::bordered;
use crate::ui::graph::{Graph, meter, mini_graph};
use crate::ui::layout::PanelLayout;

/// Cached aggregate graph.
pub struct CpuPanel {
    graph: Graph,
}

impl CpuPanel {
    pub fn new() -> CpuPanel {
        CpuPanel {
            graph: Graph::new(10, 1, false, None),
        }
    }

    /// Recreates the graph for a new geometry and refills it from history.
    pub fn rebuild(&mut self, layout: &PanelLayout, cpu: &CpuSampler) {
        let height = layout.cpu.height.saturating_sub(3).max(1) as usize;
        self.graph = Graph::new(layout.cpu_graph_width(), height, false, None);
        self.graph.rebuild(&cpu.history);
    }

    /// Appends the newest aggregate value on a stable frame.
    pub fn update(&mut self, cpu: &CpuSampler) {
        self.graph.append(cpu.usage[0]);
    }
}

pub fn draw(f: &mut Frame, app: &App) {
    let area = app.layout.cpu;
    if area.height < 3 {
        return;
    }
    let theme = &app.theme;

    let mut title = app.cpu.model.clone();
    if !app.cpu.freq.is_empty() {
        title = format!("{title} @ {}", app.cpu.freq);
    }
    let block = bordered(&format!(" {title} "), theme.cpu_box.color(), theme.title.color());
    let inner = block.inner(area);
    f.render_widget(block, area);
    if inner.width == 0 || inner.height == 0 {
        return;
    }

    // Aggregate graph, leaving the last inner line for load and uptime.
    let graph_w = app.layout.cpu_graph_width() as u16;
    let graph_area = Rect {
        x: inner.x,
        y: inner.y,
        width: graph_w.min(inner.width),
        height: inner.height.saturating_sub(1),
    };
    f.render_widget(
        Paragraph::new(app.panels.cpu.graph.lines(&theme.cpu)),
        graph_area,
    );

    draw_meter_grid(f, app, inner, graph_w);
    draw_bottom_line(f, app, inner);
}

/// Per-thread meters in 1..=4 columns right of the graph.
fn draw_meter_grid(f: &mut Frame, app: &App, inner: Rect, graph_w: u16) {
    let theme = &app.theme;
    let capacity = inner.height.saturating_sub(1) as usize;
    if capacity == 0 {
        return;
    }
    let col_w = app.layout.meter_column_width;
    let grid_x = inner.x + graph_w;

    for i in 0..app.cpu.threads {
        let col = (i / capacity) as u16;
        let row = (i % capacity) as u16;
        if col >= app.layout.meter_columns {
            break;
        }
        let x = grid_x + col * col_w;
        if x + col_w > inner.x + inner.width {
            break;
        }
        let pct = app.cpu.usage.get(i + 1).copied().unwrap_or(0);

        let mut spans = vec![Span::styled(
            format!("{:<4}", format!("C{i}")),
            Style::default().fg(theme.main_fg.color()),
        )];
        spans.extend(
            meter(pct, 10, &theme.cpu, theme.inactive_fg.color(), true, false).spans,
        );
        spans.push(Span::styled(
            format!("{pct:>4}%"),
            Style::default().fg(theme.cpu.color(pct as usize)),
        ));

        if app.cpu.check_temp {
            if let Some(ring) = app.cpu.temp_history.get(i + 1) {
                let temp = app.cpu.temps.get(i + 1).copied().unwrap_or(0);
                let norm = (temp.max(0) as usize * 100) / app.cpu.temp_crit.max(1) as usize;
                spans.push(Span::styled(
                    format!(" {}", mini_graph(ring, 5)),
                    Style::default().fg(theme.temp.color(norm)),
                ));
                spans.push(Span::styled(
                    format!("{temp:>4}°C"),
                    Style::default().fg(theme.temp.color(norm)),
                ));
            }
        }

        f.render_widget(
            Paragraph::new(Line::from(spans)),
            Rect::new(x, inner.y + row, col_w.min(inner.width), 1),
        );
    }
}

/// Load average left, package temperature middle, uptime right.
fn draw_bottom_line(f: &mut Frame, app: &App, inner: Rect) {
    let theme = &app.theme;
    let y = inner.y + inner.height - 1;
    let [one, five, fifteen] = app.cpu.load_avg;
    let mut left = format!("Load AVG: {one:.2} {five:.2} {fifteen:.2}");
    if app.cpu.check_temp {
        let pkg = app.cpu.temps[0];
        left.push_str(&format!("  Package: {pkg}°C"));
    }
    let up = format!("up {}", fmt::uptime(app.cpu.uptime_secs));

    f.render_widget(
        Paragraph::new(Line::from(Span::styled(
            left,
            Style::default().fg(theme.main_fg.color()),
        ))),
        Rect::new(inner.x, y, inner.width, 1),
    );
    let up_w = up.len() as u16;
    if inner.width > up_w {
        f.render_widget(
            Paragraph::new(Line::from(Span::styled(
                up,
                Style::default().fg(theme.inactive_fg.color()),
            ))),
            Rect::new(inner.x + inner.width - up_w, y, up_w, 1),
        );
    }
}
