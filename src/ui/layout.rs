//! Panel geometry.
//!
//! Pure function of terminal size and a couple of flags, so resizing with
//! the same dimensions always lands on identical rectangles. The four
//! panels: CPU across the top, MEM over NET in a left column, PROC filling
//! the right column, with an optional detail strip carved off the top of
//! PROC.

use ratatui::layout::Rect;

pub const MIN_COLS: u16 = 80;
pub const MIN_ROWS: u16 = 25;

/// Lines reserved for the detail pane when a process is pinned.
pub const DETAIL_HEIGHT: u16 = 8;

/// Width of one per-thread meter column, without and with temperatures.
const METER_COL_WIDTH: u16 = 24;
const METER_COL_WIDTH_TEMP: u16 = 37;

/// Width of the readout column in the net panel.
const NET_VALUE_WIDTH: u16 = 20;

/// Vertical shares of the CPU, MEM and NET panels in percent.
const HEIGHT_SHARES: [u32; 3] = [32, 40, 28];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PanelLayout {
    pub cpu: Rect,
    pub mem: Rect,
    pub net: Rect,
    /// Full process panel, detail strip included.
    pub proc: Rect,
    /// Detail strip at the top of the process panel, when pinned.
    pub detail: Option<Rect>,
    /// Process panel minus the detail strip.
    pub table: Rect,
    /// Per-thread meter grid columns (1..=4) and their cell width.
    pub meter_columns: u16,
    pub meter_column_width: u16,
}

/// True when the terminal is big enough to render at all.
pub fn valid(cols: u16, rows: u16) -> bool {
    cols >= MIN_COLS && rows >= MIN_ROWS
}

pub fn compute(
    cols: u16,
    rows: u16,
    threads: usize,
    show_temps: bool,
    detail_open: bool,
) -> PanelLayout {
    let [cpu_h, mem_h, net_h] = split_heights(rows);
    let left_w = (cols as u32 * 45 / 100) as u16;
    let proc_w = cols - left_w;

    let cpu = Rect::new(0, 0, cols, cpu_h);
    let mem = Rect::new(0, cpu_h, left_w, mem_h);
    let net = Rect::new(0, cpu_h + mem_h, left_w, net_h);
    let proc = Rect::new(left_w, cpu_h, proc_w, mem_h + net_h);

    let (detail, table) = if detail_open && proc.height > DETAIL_HEIGHT + 4 {
        let detail = Rect::new(proc.x, proc.y, proc.width, DETAIL_HEIGHT);
        let table = Rect::new(
            proc.x,
            proc.y + DETAIL_HEIGHT,
            proc.width,
            proc.height - DETAIL_HEIGHT,
        );
        (Some(detail), table)
    } else {
        (None, proc)
    };

    let capacity = cpu_h.saturating_sub(3) as usize;
    let meter_columns = if capacity > 0 && threads > capacity * 3 && cols >= 200 {
        4
    } else if capacity > 0 && threads > capacity * 2 && cols >= 150 {
        3
    } else if capacity > 0 && threads > capacity && cols >= 100 {
        2
    } else {
        1
    };
    let meter_column_width = if show_temps {
        METER_COL_WIDTH_TEMP
    } else {
        METER_COL_WIDTH
    };

    PanelLayout {
        cpu,
        mem,
        net,
        proc,
        detail,
        table,
        meter_columns,
        meter_column_width,
    }
}

impl PanelLayout {
    /// Columns available to the aggregate CPU graph, next to the meter grid.
    pub fn cpu_graph_width(&self) -> usize {
        let grid = self.meter_columns * self.meter_column_width;
        self.cpu.width.saturating_sub(2).saturating_sub(grid).max(10) as usize
    }

    /// Columns available to each net graph, next to the readout column.
    pub fn net_graph_width(&self) -> usize {
        self.net
            .width
            .saturating_sub(2)
            .saturating_sub(self.net_value_width())
            .max(10) as usize
    }

    pub fn net_value_width(&self) -> u16 {
        if self.net.width.saturating_sub(2) >= NET_VALUE_WIDTH * 2 {
            NET_VALUE_WIDTH
        } else {
            self.net.width.saturating_sub(2) / 2
        }
    }

    /// Columns of the detail-pane CPU graph: a third of the pane plus two.
    pub fn detail_graph_width(&self) -> usize {
        match self.detail {
            Some(d) => (d.width / 3 + 2) as usize,
            None => 10,
        }
    }

    /// Process rows per table page.
    pub fn table_rows(&self) -> usize {
        self.table.height.saturating_sub(3) as usize
    }
}

/// 32/40/28 vertical split, rounded with largest-remainder carry so the
/// parts always sum to `rows`.
fn split_heights(rows: u16) -> [u16; 3] {
    let rows = rows as u32;
    let mut parts = [0u32; 3];
    let mut rema: Vec<(u32, usize)> = Vec::with_capacity(3);
    for (i, share) in HEIGHT_SHARES.iter().enumerate() {
        parts[i] = rows * share / 100;
        rema.push((rows * share % 100, i));
    }
    let assigned: u32 = parts.iter().sum();
    // Largest remainder first, index order on ties.
    rema.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    for k in 0..(rows - assigned) as usize {
        parts[rema[k % 3].1] += 1;
    }
    [parts[0] as u16, parts[1] as u16, parts[2] as u16]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heights_always_sum_to_rows() {
        for rows in MIN_ROWS..200 {
            let [a, b, c] = split_heights(rows);
            assert_eq!(a + b + c, rows, "rows={rows}");
        }
    }

    #[test]
    fn resize_is_idempotent() {
        let one = compute(120, 40, 8, true, false);
        let two = compute(120, 40, 8, true, false);
        assert_eq!(one, two);
    }

    #[test]
    fn panels_tile_the_terminal() {
        let l = compute(80, 25, 4, false, false);
        assert_eq!(l.cpu.width, 80);
        assert_eq!(l.mem.width + l.proc.width, 80);
        assert_eq!(l.cpu.height + l.mem.height + l.net.height, 25);
        assert_eq!(l.proc.height, l.mem.height + l.net.height);
        assert_eq!(l.net.y, l.mem.y + l.mem.height);
        assert_eq!(l.proc.x, l.mem.width);
    }

    #[test]
    fn minimum_size_gate() {
        assert!(valid(80, 25));
        assert!(!valid(79, 25));
        assert!(!valid(80, 24));
    }

    #[test]
    fn meter_grid_column_thresholds() {
        // 40 rows → cpu height 13, capacity 10.
        assert_eq!(compute(90, 40, 8, false, false).meter_columns, 1);
        assert_eq!(compute(120, 40, 16, false, false).meter_columns, 2);
        assert_eq!(compute(160, 40, 24, false, false).meter_columns, 3);
        assert_eq!(compute(210, 40, 64, false, false).meter_columns, 4);
        // Wide meters when temperatures are shown.
        assert_eq!(compute(210, 40, 64, true, false).meter_column_width, 37);
    }

    #[test]
    fn detail_pane_carves_eight_lines() {
        let without = compute(120, 40, 8, false, false);
        assert!(without.detail.is_none());
        assert_eq!(without.table, without.proc);

        let with = compute(120, 40, 8, false, true);
        let detail = with.detail.unwrap();
        assert_eq!(detail.height, DETAIL_HEIGHT);
        assert_eq!(with.table.height, with.proc.height - DETAIL_HEIGHT);
        assert_eq!(with.table.y, detail.y + detail.height);
        assert_eq!(with.detail_graph_width(), (detail.width / 3 + 2) as usize);
    }

    #[test]
    fn table_rows_reserve_chrome() {
        let l = compute(120, 40, 8, false, false);
        assert_eq!(l.table_rows(), l.table.height as usize - 3);
    }
}
