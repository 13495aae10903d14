//! Process panel renderer.
//!
//! Paginated table with a sort indicator in the header, a foreground
//! gradient that fades away from the selected row, per-PID micro-graphs in
//! the rightmost cells, and the detail pane for the pinned process.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::app::App;
use crate::config::SortField;
use crate::sampler::process::{ProcRow, ProcSampler};
use crate::theme::Rgb;
use crate::ui::bordered;
use crate::ui::graph::{Graph, mini_graph};
use crate::ui::layout::PanelLayout;

/// Cells taken by the micro-graph at the right edge of each row.
const MICRO_CELLS: usize = 5;

/// Cached detail-pane CPU graph.
pub struct ProcPanel {
    detail_graph: Graph,
}

impl ProcPanel {
    pub fn new() -> ProcPanel {
        ProcPanel {
            detail_graph: Graph::new(10, 1, false, None),
        }
    }

    /// Recreates the detail graph after a resize or detail toggle.
    pub fn rebuild(&mut self, layout: &PanelLayout, proc: &ProcSampler) {
        let height = layout
            .detail
            .map(|d| d.height.saturating_sub(2))
            .unwrap_or(1)
            .max(1) as usize;
        self.detail_graph = Graph::new(layout.detail_graph_width(), height, false, None);
        self.detail_graph.rebuild(&proc.detail_cpu);
    }

    /// Appends the newest detail cpu value on a stable frame.
    pub fn update(&mut self, proc: &ProcSampler) {
        if let Some(latest) = proc.detail_cpu.back() {
            self.detail_graph.append(*latest);
        }
    }
}

pub fn draw(f: &mut Frame, app: &App) {
    if let Some(detail) = app.layout.detail {
        draw_detail(f, app, detail);
    }
    draw_table(f, app, app.layout.table);
}

// ── Table ───────────────────────────────────────────────────

/// Column widths; `args` is 0 when the panel is too narrow.
struct Columns {
    pid: usize,
    program: usize,
    args: usize,
    threads: usize,
    user: usize,
    mem: usize,
    cpu: usize,
}

impl Columns {
    fn fit(width: usize) -> Columns {
        let fixed = 7 + 1 + 16 + 1 + 8 + 1 + 9 + 1 + 6 + 1 + 6 + 1 + MICRO_CELLS;
        Columns {
            pid: 7,
            program: 16,
            args: width.saturating_sub(fixed + 1),
            threads: 8,
            user: 9,
            mem: 6,
            cpu: 6,
        }
    }
}

fn draw_table(f: &mut Frame, app: &App, area: Rect) {
    if area.height < 4 {
        return;
    }
    let theme = &app.theme;
    let proc = &app.proc;

    let mut block = bordered(" proc ", theme.proc_box.color(), theme.title.color());
    block = block.title_bottom(
        Line::from(format!(" {}/{} ", proc.page, proc.pages)).right_aligned(),
    );
    block = block.title_bottom(bottom_legend(app));
    let inner = block.inner(area);
    f.render_widget(block, area);
    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let cols = Columns::fit(inner.width as usize);
    draw_header(f, app, inner, &cols);

    let rows = proc.visible_rows();
    let span = rows.len().max(1);
    for (i, row) in rows.iter().enumerate() {
        let y = inner.y + 1 + i as u16;
        if y >= inner.y + inner.height {
            break;
        }
        let selected = proc.selected > 0 && i == proc.selected - 1;
        let dist = if proc.selected > 0 {
            (i as i32 - (proc.selected as i32 - 1)).unsigned_abs() as usize
        } else {
            i
        };
        draw_row(f, app, Rect::new(inner.x, y, inner.width, 1), &cols, row, selected, dist, span);
    }
}

fn draw_header(f: &mut Frame, app: &App, inner: Rect, cols: &Columns) {
    let theme = &app.theme;
    let sort = app.cfg.proc_sorting;
    let arrow = if app.cfg.proc_reversed { "▲" } else { "▼" };
    let label = |field: SortField| -> String {
        // Both cpu sortings land on the same column.
        let active = field == sort
            || (field == SortField::CpuLazy
                && matches!(sort, SortField::CpuLazy | SortField::CpuResponsive));
        if active {
            format!("{arrow}{}", field.header())
        } else {
            field.header().to_owned()
        }
    };

    let mut text = format!(
        "{:>pid$} {:<prog$}",
        label(SortField::Pid),
        label(SortField::Program),
        pid = cols.pid,
        prog = cols.program,
    );
    if cols.args > 0 {
        text.push_str(&format!(
            " {:<args$}",
            label(SortField::Arguments),
            args = cols.args,
        ));
    }
    text.push_str(&format!(
        " {:>thr$} {:<user$} {:>mem$} {:>cpu$}",
        label(SortField::Threads),
        label(SortField::User),
        label(SortField::Memory),
        label(SortField::CpuLazy),
        thr = cols.threads,
        user = cols.user,
        mem = cols.mem,
        cpu = cols.cpu,
    ));

    f.render_widget(
        Paragraph::new(Line::from(Span::styled(
            text,
            Style::default()
                .fg(theme.title.color())
                .add_modifier(Modifier::BOLD),
        ))),
        Rect::new(inner.x, inner.y, inner.width, 1),
    );
}

#[allow(clippy::too_many_arguments)]
fn draw_row(
    f: &mut Frame,
    app: &App,
    area: Rect,
    cols: &Columns,
    row: &ProcRow,
    selected: bool,
    dist: usize,
    span: usize,
) {
    let theme = &app.theme;
    let base = if selected {
        Style::default()
            .fg(theme.selected_fg.color())
            .bg(theme.selected_bg.color())
    } else {
        Style::default().fg(fade(theme.main_fg, dist, span))
    };

    let mut text = format!(
        "{:>pid$} {:<prog$.prog$}",
        row.pid,
        row.name,
        pid = cols.pid,
        prog = cols.program,
    );
    if cols.args > 0 {
        text.push_str(&format!(
            " {:<args$.args$}",
            row.arguments,
            args = cols.args,
        ));
    }
    text.push_str(&format!(
        " {:>thr$} {:<user$.user$} {:>mem$.1}",
        row.threads,
        row.user,
        row.mem_percent,
        thr = cols.threads,
        user = cols.user,
        mem = cols.mem,
    ));

    let mut spans = vec![Span::styled(text, base)];
    // Cpu column colored by its ramp; the selection style wins on the
    // selected row.
    let cpu_style = if selected {
        base
    } else {
        Style::default().fg(
            theme
                .cpu
                .color(((row.cpu_tenths / 10) as usize).min(100)),
        )
    };
    spans.push(Span::styled(
        format!(" {:>cpu$}", row.cpu_string(), cpu = cols.cpu),
        cpu_style,
    ));

    // Micro-graph in the rightmost cells for recently active PIDs.
    let micro = match app.proc.micro_graph(row.pid) {
        Some(ring) => mini_graph(ring, MICRO_CELLS),
        None => " ".repeat(MICRO_CELLS),
    };
    let micro_style = if selected {
        base
    } else {
        Style::default().fg(theme.proc_misc.color())
    };
    spans.push(Span::styled(format!(" {micro}"), micro_style));

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Key legend, with the live filter text while it is being edited.
fn bottom_legend(app: &App) -> Line<'static> {
    let theme = &app.theme;
    if app.proc.filter_editing {
        return Line::from(vec![
            Span::styled(
                " filter: ",
                Style::default().fg(theme.hi_fg.color()),
            ),
            Span::styled(
                format!("{}█ ", app.proc.filter),
                Style::default().fg(theme.title.color()),
            ),
        ]);
    }
    if !app.proc.filter.is_empty() {
        return Line::from(Span::styled(
            format!(" f: {} (c clears) ", app.proc.filter),
            Style::default().fg(theme.hi_fg.color()),
        ));
    }
    Line::from(Span::styled(
        " ↑↓ select  ← → sort  enter detail  f filter  t/k/i signal ",
        Style::default().fg(theme.inactive_fg.color()),
    ))
}

/// Foreground fades linearly with the distance from the selected row.
fn fade(fg: Rgb, dist: usize, span: usize) -> ratatui::style::Color {
    let cut = (dist * 50 / span.max(1)).min(50) as u32;
    let scale = 100 - cut;
    ratatui::style::Color::Rgb(
        (fg.r as u32 * scale / 100) as u8,
        (fg.g as u32 * scale / 100) as u8,
        (fg.b as u32 * scale / 100) as u8,
    )
}

// ── Detail pane ─────────────────────────────────────────────

fn draw_detail(f: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let proc = &app.proc;

    let title = match (&proc.detail, proc.detailed_pid) {
        (Some(d), _) if proc.detailed_killed => format!(" {} ({}) (killed) ", d.name, d.pid),
        (Some(d), _) => format!(" {} ({}) ", d.name, d.pid),
        (None, Some(pid)) => format!(" pid {pid} "),
        (None, None) => " detail ".to_owned(),
    };
    let block = bordered(&title, theme.proc_box.color(), theme.title.color());
    let inner = block.inner(area);
    f.render_widget(block, area);
    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let graph_w = (app.layout.detail_graph_width() as u16).min(inner.width / 2);
    f.render_widget(
        Paragraph::new(app.panels.proc.detail_graph.lines(&theme.cpu)),
        Rect { width: graph_w, ..inner },
    );

    let info = Rect {
        x: inner.x + graph_w + 1,
        width: inner.width.saturating_sub(graph_w + 1),
        ..inner
    };
    let Some(detail) = &proc.detail else {
        return;
    };

    let fg = Style::default().fg(theme.main_fg.color());
    let dim = Style::default().fg(theme.inactive_fg.color());
    let mut lines: Vec<Line> = vec![
        Line::from(vec![
            Span::styled("Status: ", dim),
            Span::styled(detail.status.clone(), fg),
            Span::styled("  Elapsed: ", dim),
            Span::styled(detail.elapsed.clone(), fg),
        ]),
        Line::from(vec![
            Span::styled("Parent: ", dim),
            Span::styled(
                match detail.parent_pid {
                    Some(pp) => format!("{} ({pp})", detail.parent_name),
                    None => "-".to_owned(),
                },
                fg,
            ),
            Span::styled("  User: ", dim),
            Span::styled(detail.user.clone(), fg),
            Span::styled("  Threads: ", dim),
            Span::styled(detail.threads.to_string(), fg),
        ]),
    ];
    for chunk in wrap(&detail.cmdline, info.width as usize, 3) {
        lines.push(Line::from(Span::styled(chunk, dim)));
    }
    while lines.len() < 5 {
        lines.push(Line::default());
    }
    lines.truncate(5);
    lines.push(Line::from(vec![
        Span::styled("Memory: ", dim),
        Span::styled(format!("{:.1}% ", detail.mem_percent), fg),
        Span::styled(
            mini_graph(&proc.detail_mem, (info.width as usize).saturating_sub(24).clamp(5, 20)),
            Style::default().fg(theme.proc_misc.color()),
        ),
        Span::styled(format!(" {}", detail.mem_string), fg),
    ]));

    f.render_widget(Paragraph::new(lines), info);
}

/// Hard-wraps `text` into at most `max_lines` chunks of `width` chars.
fn wrap(text: &str, width: usize, max_lines: usize) -> Vec<String> {
    if width == 0 || text.is_empty() {
        return Vec::new();
    }
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(width)
        .take(max_lines)
        .map(|c| c.iter().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_drop_arguments_when_narrow() {
        let narrow = Columns::fit(60);
        assert_eq!(narrow.args, 0);
        let wide = Columns::fit(120);
        assert!(wide.args > 0);
    }

    #[test]
    fn fade_is_monotonic() {
        let fg = Rgb::new(200, 200, 200);
        let near = fade(fg, 0, 20);
        let far = fade(fg, 20, 20);
        let (ratatui::style::Color::Rgb(r0, ..), ratatui::style::Color::Rgb(r1, ..)) =
            (near, far)
        else {
            panic!("expected rgb colors");
        };
        assert!(r0 > r1);
        assert_eq!(r1, 100);
    }

    #[test]
    fn wrap_caps_lines() {
        let out = wrap("abcdefghij", 4, 3);
        assert_eq!(out, vec!["abcd", "efgh", "ij"]);
        let capped = wrap(&"x".repeat(100), 4, 3);
        assert_eq!(capped.len(), 3);
        assert!(wrap("", 4, 3).is_empty());
    }
}
