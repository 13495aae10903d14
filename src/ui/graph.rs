//! Graph and meter builder.
//!
//! Histories render into pre-built rows of braille glyphs so a stable frame
//! only appends one column per graph instead of rebuilding the whole box.
//! Each character cell resolves a tenth of a row: an 11-symbol alphabet
//! covers the empty cell plus ten fill levels, with a mirrored alphabet for
//! graphs anchored to the top edge (upload).

use std::collections::VecDeque;

use ratatui::style::Style;
use ratatui::text::{Line, Span};

use crate::theme::Ramp;

/// Fill levels 0..=10, growing from the bottom of the cell.
const SYMBOLS: [char; 11] = [' ', '⡀', '⣀', '⣄', '⣤', '⣦', '⣴', '⣶', '⣷', '⣾', '⣿'];

/// Fill levels 0..=10, growing from the top of the cell.
const SYMBOLS_INVERTED: [char; 11] = [' ', '⠈', '⠉', '⠙', '⠛', '⠟', '⠻', '⠿', '⡿', '⢿', '⣿'];

/// Meter cell glyph.
const METER_BLOCK: char = '■';

// ── Graph ───────────────────────────────────────────────────

/// A `width`×`height` braille graph with cached rows.
#[derive(Debug, Clone)]
pub struct Graph {
    width: usize,
    height: usize,
    inverted: bool,
    /// Values are normalized against this before the percent math; `None`
    /// means values already are percentages.
    max: Option<u64>,
    rows: Vec<String>,
}

impl Graph {
    pub fn new(width: usize, height: usize, inverted: bool, max: Option<u64>) -> Graph {
        Graph {
            width: width.max(1),
            height: height.max(1),
            inverted,
            max,
            rows: vec![" ".repeat(width.max(1)); height.max(1)],
        }
    }

    /// Replaces the normalization scale (net rescale) without touching the
    /// cached rows; callers rebuild right after.
    pub fn set_max(&mut self, max: u64) {
        self.max = Some(max);
    }

    /// Rebuilds every row from the newest `width` values of `history`.
    pub fn rebuild<T: Into<u64> + Copy>(&mut self, history: &VecDeque<T>) {
        let take = self.width.min(history.len());
        let newest: Vec<u64> = history
            .iter()
            .skip(history.len() - take)
            .map(|v| (*v).into())
            .collect();

        let mut rows = vec![String::with_capacity(self.width); self.height];
        for row in &mut rows {
            for _ in 0..self.width - take {
                row.push(' ');
            }
        }
        for value in newest {
            let column = self.column(value);
            for (row, glyph) in rows.iter_mut().zip(column) {
                row.push(glyph);
            }
        }
        self.rows = rows;
    }

    /// Drops the oldest column of each row and appends one for `value`.
    /// Equivalent to a rebuild over the suffix history.
    pub fn append<T: Into<u64>>(&mut self, value: T) {
        let column = self.column(value.into());
        for (row, glyph) in self.rows.iter_mut().zip(column) {
            let mut shifted: String = row.chars().skip(1).collect();
            shifted.push(glyph);
            *row = shifted;
        }
    }

    /// Styled lines ready for a `Paragraph`. Rows are colored by the level
    /// band they represent, hot end farthest from the anchor edge.
    pub fn lines(&self, ramp: &Ramp) -> Vec<Line<'static>> {
        self.rows()
            .iter()
            .enumerate()
            .map(|(y, row)| {
                let pct = if self.inverted {
                    (y + 1) * 100 / self.height
                } else {
                    100 - y * 100 / self.height
                };
                Line::from(Span::styled(
                    row.clone(),
                    Style::default().fg(ramp.color(pct)),
                ))
            })
            .collect()
    }

    /// Raw glyph rows, newest column last.
    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    /// Glyphs of one column, top row first.
    fn column(&self, value: u64) -> Vec<char> {
        let pct = match self.max {
            Some(max) if max > 0 => (value * 100 / max).min(100),
            Some(_) => 0,
            None => value.min(100),
        };
        let virt = pct as usize * self.height * 10 / 100;
        (1..=self.height)
            .map(|y| {
                let floor = if self.inverted {
                    (y - 1) * 10
                } else {
                    (self.height - y) * 10
                };
                let level = virt.saturating_sub(floor).min(10);
                if self.inverted {
                    SYMBOLS_INVERTED[level]
                } else {
                    SYMBOLS[level]
                }
            })
            .collect()
    }
}

// ── Mini graph ──────────────────────────────────────────────

/// One-row graph: each value maps to the symbol nearest its tenth.
pub fn mini_graph(history: &VecDeque<u8>, width: usize) -> String {
    let take = width.min(history.len());
    let mut out = String::with_capacity(width);
    for _ in 0..width - take {
        out.push(' ');
    }
    for value in history.iter().skip(history.len() - take) {
        let level = ((*value as usize).min(100) + 5) / 10;
        out.push(SYMBOLS[level.min(10)]);
    }
    out
}

// ── Meter ───────────────────────────────────────────────────

/// A `width`-cell block meter colored from a ramp. Cell `i` lights up iff
/// the value reaches `i·100/width`; `fill_empty` draws the remainder in the
/// inactive color instead of blanks, `invert` draws right to left.
pub fn meter(
    value: u8,
    width: usize,
    ramp: &Ramp,
    inactive: ratatui::style::Color,
    fill_empty: bool,
    invert: bool,
) -> Line<'static> {
    let mut spans = Vec::with_capacity(width);
    for i in 0..width {
        let threshold = i * 100 / width.max(1);
        if (value as usize) >= threshold {
            spans.push(Span::styled(
                METER_BLOCK.to_string(),
                Style::default().fg(ramp.color(threshold)),
            ));
        } else if fill_empty {
            spans.push(Span::styled(
                METER_BLOCK.to_string(),
                Style::default().fg(inactive),
            ));
        } else {
            spans.push(Span::raw(" "));
        }
    }
    if invert {
        spans.reverse();
    }
    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::Theme;

    fn history(values: &[u64]) -> VecDeque<u64> {
        values.iter().copied().collect()
    }

    #[test]
    fn full_and_empty_columns() {
        let mut g = Graph::new(2, 2, false, None);
        g.rebuild(&history(&[0, 100]));
        assert_eq!(g.rows(), &[" ⣿".to_string(), " ⣿".to_string()]);
    }

    #[test]
    fn half_value_fills_bottom_row() {
        let mut g = Graph::new(1, 2, false, None);
        g.rebuild(&history(&[50]));
        // 50% of virtual height 20 is 10: bottom row full, top row empty.
        assert_eq!(g.rows(), &[" ".to_string(), "⣿".to_string()]);
    }

    #[test]
    fn tenth_steps_resolve_within_a_row() {
        let mut g = Graph::new(1, 1, false, None);
        g.rebuild(&history(&[30]));
        assert_eq!(g.rows(), &["⣄".to_string()]);
        g.rebuild(&history(&[100]));
        assert_eq!(g.rows(), &["⣿".to_string()]);
    }

    #[test]
    fn inverted_graph_hangs_from_the_top() {
        let mut g = Graph::new(1, 2, true, None);
        g.rebuild(&history(&[50]));
        assert_eq!(g.rows(), &["⣿".to_string(), " ".to_string()]);
    }

    #[test]
    fn short_history_pads_left() {
        let mut g = Graph::new(4, 1, false, None);
        g.rebuild(&history(&[100]));
        assert_eq!(g.rows(), &["   ⣿".to_string()]);
    }

    #[test]
    fn append_equals_rebuild() {
        let values: Vec<u64> = vec![10, 90, 35, 70, 0, 100, 55, 20, 80, 45];
        for width in [1usize, 3, 7] {
            for height in [1usize, 2, 5] {
                let mut appended = Graph::new(width, height, false, None);
                appended.rebuild(&history(&values));
                appended.append(60u64);

                let mut suffix: Vec<u64> = values.clone();
                suffix.push(60);
                let keep = suffix.len().min(width);
                let suffix: VecDeque<u64> =
                    suffix[suffix.len() - keep..].iter().copied().collect();
                let mut rebuilt = Graph::new(width, height, false, None);
                rebuilt.rebuild(&suffix);

                assert_eq!(appended.rows(), rebuilt.rows(), "w={width} h={height}");
            }
        }
    }

    #[test]
    fn append_equals_rebuild_when_inverted_and_scaled() {
        let values: Vec<u64> = vec![1024, 8192, 51200, 0, 20480];
        let mut appended = Graph::new(3, 2, true, Some(51200));
        appended.rebuild(&history(&values));
        appended.append(4096u64);

        let mut rebuilt = Graph::new(3, 2, true, Some(51200));
        rebuilt.rebuild(&history(&[0, 20480, 4096]));

        assert_eq!(appended.rows(), rebuilt.rows());
    }

    #[test]
    fn normalization_against_explicit_max() {
        let mut g = Graph::new(1, 1, false, Some(2048));
        g.rebuild(&history(&[1024]));
        assert_eq!(g.rows(), &["⣦".to_string()]);
        // Values beyond max clamp to full.
        g.rebuild(&history(&[1_000_000]));
        assert_eq!(g.rows(), &["⣿".to_string()]);
    }

    #[test]
    fn mini_graph_rounds_to_nearest_tenth() {
        let ring: VecDeque<u8> = [0, 34, 35, 100].into_iter().collect();
        let s = mini_graph(&ring, 5);
        let chars: Vec<char> = s.chars().collect();
        assert_eq!(chars.len(), 5);
        assert_eq!(chars[0], ' ');
        assert_eq!(chars[1], SYMBOLS[0]);
        assert_eq!(chars[2], SYMBOLS[3]);
        assert_eq!(chars[3], SYMBOLS[4]);
        assert_eq!(chars[4], SYMBOLS[10]);
    }

    #[test]
    fn meter_fill_counts() {
        let theme = Theme::default();
        let full = meter(100, 10, &theme.cpu, theme.inactive_fg.color(), false, false);
        assert_eq!(full.spans.len(), 10);
        assert!(full.spans.iter().all(|s| s.content == "■"));

        let half = meter(50, 10, &theme.cpu, theme.inactive_fg.color(), false, false);
        let lit = half.spans.iter().filter(|s| s.content == "■").count();
        // Thresholds 0,10,…,50 are reached.
        assert_eq!(lit, 6);

        let empty = meter(0, 10, &theme.cpu, theme.inactive_fg.color(), false, false);
        let lit = empty.spans.iter().filter(|s| s.content == "■").count();
        assert_eq!(lit, 1);
    }

    #[test]
    fn meter_background_fill() {
        let theme = Theme::default();
        let line = meter(30, 10, &theme.used, theme.inactive_fg.color(), true, false);
        assert!(line.spans.iter().all(|s| s.content == "■"));
    }
}
