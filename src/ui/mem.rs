//! Memory panel renderer.
//!
//! Ramp-colored meters for used/available/cached/free (plus swap when the
//! kernel reports any) in the left column, disk usage rows on the right.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::app::App;
use crate::fmt;
use crate::theme::Ramp;
use crate::ui::bordered;
use crate::ui::graph::meter;

pub fn draw(f: &mut Frame, app: &App) {
    let area = app.layout.mem;
    if area.height < 3 {
        return;
    }
    let theme = &app.theme;

    let block = bordered(" mem ", theme.mem_box.color(), theme.title.color());
    let inner = block.inner(area);
    f.render_widget(block, area);
    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let disk_w = inner.width / 2;
    let meters = Rect {
        width: inner.width - disk_w,
        ..inner
    };
    let disks = Rect {
        x: inner.x + meters.width,
        width: disk_w,
        ..inner
    };

    draw_meters(f, app, meters);
    draw_disks(f, app, disks);
}

fn draw_meters(f: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let mem = &app.mem;
    let mut y = area.y;
    let mut put = |f: &mut Frame, line: Line<'static>| {
        if y < area.y + area.height {
            f.render_widget(Paragraph::new(line), Rect::new(area.x, y, area.width, 1));
            y += 1;
        }
    };

    put(
        f,
        Line::from(Span::styled(
            format!("Total: {:>10}", fmt::human_bytes(mem.total)),
            Style::default().fg(theme.title.color()),
        )),
    );

    let rows: [(&str, u8, u64, &Ramp); 4] = [
        ("Used:", mem.used_percent, mem.used, &theme.used),
        ("Available:", mem.available_percent, mem.available, &theme.available),
        ("Cached:", mem.cached_percent, mem.cached, &theme.cached),
        ("Free:", mem.free_percent, mem.free, &theme.free),
    ];
    for (label, pct, bytes, ramp) in rows {
        put(f, meter_row(app, area, label, pct, bytes, ramp));
    }

    if mem.has_swap {
        put(
            f,
            Line::from(Span::styled(
                format!("Swap:  {:>10}", fmt::human_bytes(mem.swap_total)),
                Style::default().fg(theme.title.color()),
            )),
        );
        put(
            f,
            meter_row(app, area, "Used:", mem.swap_used_percent, mem.swap_used, &theme.used),
        );
        put(
            f,
            meter_row(app, area, "Free:", mem.swap_free_percent, mem.swap_free, &theme.free),
        );
    }
}

/// `label  [meter]  pct%  bytes` with the meter sized to the leftover width.
fn meter_row(
    app: &App,
    area: Rect,
    label: &str,
    pct: u8,
    bytes: u64,
    ramp: &Ramp,
) -> Line<'static> {
    let theme = &app.theme;
    let value = fmt::human_bytes(bytes);
    let fixed = 11 + 5 + value.len() + 2;
    let meter_w = (area.width as usize).saturating_sub(fixed).clamp(4, 40);

    let mut spans = vec![Span::styled(
        format!("{label:<11}"),
        Style::default().fg(theme.main_fg.color()),
    )];
    spans.extend(meter(pct, meter_w, ramp, theme.inactive_fg.color(), true, false).spans);
    spans.push(Span::styled(
        format!("{pct:>4}%"),
        Style::default().fg(ramp.color(pct as usize)),
    ));
    spans.push(Span::styled(
        format!(" {value}"),
        Style::default().fg(theme.main_fg.color()),
    ));
    Line::from(spans)
}

/// Two lines per disk: name with used meter, then totals.
fn draw_disks(f: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    if area.width < 12 {
        return;
    }
    let mut y = area.y;
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(
            "disks",
            Style::default().fg(theme.title.color()),
        ))),
        Rect::new(area.x + 1, y, area.width - 1, 1),
    );
    y += 1;

    for disk in &app.mem.disks {
        if y + 1 >= area.y + area.height {
            break;
        }
        let meter_w = (area.width as usize).saturating_sub(16).clamp(4, 30);
        let mut spans = vec![Span::styled(
            format!(" {:<9.9}", disk.name),
            Style::default().fg(theme.main_fg.color()),
        )];
        spans.extend(
            meter(
                disk.used_percent,
                meter_w,
                &theme.used,
                theme.inactive_fg.color(),
                true,
                false,
            )
            .spans,
        );
        spans.push(Span::styled(
            format!("{:>4}%", disk.used_percent),
            Style::default().fg(theme.used.color(disk.used_percent as usize)),
        ));
        f.render_widget(
            Paragraph::new(Line::from(spans)),
            Rect::new(area.x, y, area.width, 1),
        );

        let totals = format!(
            "  {} used, {} free of {}",
            fmt::human_bytes(disk.used),
            fmt::human_bytes(disk.free),
            fmt::human_bytes(disk.total),
        );
        f.render_widget(
            Paragraph::new(Line::from(Span::styled(
                totals,
                Style::default().fg(theme.inactive_fg.color()),
            ))),
            Rect::new(area.x, y + 1, area.width, 1),
        );
        y += 2;
    }
}
