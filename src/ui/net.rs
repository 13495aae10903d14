//! Network panel renderer.
//!
//! Download graph anchored to the bottom half, upload graph hanging
//! inverted in the lower half, with a readout column of speeds, session
//! peaks and totals. Each direction's graph is rebuilt only when its
//! auto-scale changed or the panel resized; otherwise one column is
//! appended per frame.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::app::App;
use crate::fmt;
use crate::sampler::net::NetSampler;
use crate::ui::bordered;
use crate::ui::graph::Graph;
use crate::ui::layout::PanelLayout;

/// Cached down/up graphs.
pub struct NetPanel {
    down: Graph,
    up: Graph,
}

impl NetPanel {
    pub fn new() -> NetPanel {
        NetPanel {
            down: Graph::new(10, 1, false, Some(1)),
            up: Graph::new(10, 1, true, Some(1)),
        }
    }

    /// Recreates both graphs for a new geometry.
    pub fn rebuild(&mut self, layout: &PanelLayout, net: &NetSampler) {
        let inner_h = layout.net.height.saturating_sub(2).max(2) as usize;
        let down_h = inner_h.div_ceil(2);
        let up_h = inner_h - down_h;
        let width = layout.net_graph_width();
        self.down = Graph::new(width, down_h, false, Some(net.rx.graph_max));
        self.down.rebuild(&net.rx.history);
        self.up = Graph::new(width, up_h.max(1), true, Some(net.tx.graph_max));
        self.up.rebuild(&net.tx.history);
    }

    /// Consumes the per-direction rescale flags; rescaled graphs rebuild
    /// against the new max, stable ones append.
    pub fn update(&mut self, net: &mut NetSampler) {
        if net.rx.take_redraw() {
            self.down.set_max(net.rx.graph_max);
            self.down.rebuild(&net.rx.history);
        } else {
            self.down.append(net.rx.speed);
        }
        if net.tx.take_redraw() {
            self.up.set_max(net.tx.graph_max);
            self.up.rebuild(&net.tx.history);
        } else {
            self.up.append(net.tx.speed);
        }
    }
}

pub fn draw(f: &mut Frame, app: &App) {
    let area = app.layout.net;
    if area.height < 3 {
        return;
    }
    let theme = &app.theme;

    let title = if app.net.iface.is_empty() {
        " net ".to_owned()
    } else {
        format!(" net: {} ", app.net.iface)
    };
    let block = bordered(&title, theme.net_box.color(), theme.title.color());
    let inner = block.inner(area);
    f.render_widget(block, area);
    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let value_w = app.layout.net_value_width();
    let graphs = Rect {
        x: inner.x + value_w,
        width: inner.width.saturating_sub(value_w),
        ..inner
    };
    let down_h = (graphs.height as usize).div_ceil(2) as u16;
    f.render_widget(
        Paragraph::new(app.panels.net.down.lines(&theme.download)),
        Rect { height: down_h, ..graphs },
    );
    f.render_widget(
        Paragraph::new(app.panels.net.up.lines(&theme.upload)),
        Rect {
            y: graphs.y + down_h,
            height: graphs.height.saturating_sub(down_h),
            ..graphs
        },
    );

    draw_values(f, app, Rect { width: value_w, ..inner });
}

fn draw_values(f: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let down_color = theme.download.color(100);
    let up_color = theme.upload.color(100);

    let lines = [
        (format!("▼ {}", fmt::human_byte_rate(app.net.rx.speed)), down_color),
        (format!("  ({})", fmt::human_bit_rate(app.net.rx.speed)), down_color),
        (format!("  Top: {}", fmt::human_byte_rate(app.net.rx.peak)), down_color),
        (format!("  Total: {}", fmt::human_bytes(app.net.rx.total)), down_color),
        (format!("▲ {}", fmt::human_byte_rate(app.net.tx.speed)), up_color),
        (format!("  ({})", fmt::human_bit_rate(app.net.tx.speed)), up_color),
        (format!("  Top: {}", fmt::human_byte_rate(app.net.tx.peak)), up_color),
        (format!("  Total: {}", fmt::human_bytes(app.net.tx.total)), up_color),
    ];

    for (i, (text, color)) in lines.into_iter().enumerate() {
        if i as u16 >= area.height {
            break;
        }
        f.render_widget(
            Paragraph::new(Line::from(Span::styled(text, Style::default().fg(color)))),
            Rect::new(area.x, area.y + i as u16, area.width, 1),
        );
    }
}
