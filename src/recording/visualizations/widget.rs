//! Terminal rendering of waveform bars.
//!
//! The waveform view lays bars out in abstract units. A terminal cell covers
//! [`CELL_WIDTH`] x [`CELL_HEIGHT`] units, so a view of `w` columns and `h` rows
//! is `w * CELL_WIDTH` units wide and `h * CELL_HEIGHT` units tall.

use ratatui::{buffer::Buffer, layout::Rect, style::Color, widgets::Widget};

use super::waveform::Bar;

/// View units per terminal column.
pub const CELL_WIDTH: f32 = 5.0;
/// View units per terminal row.
pub const CELL_HEIGHT: f32 = 10.0;

/// Size in view units of a terminal area.
pub fn units_for_area(area: Rect) -> (f32, f32) {
    (area.width as f32 * CELL_WIDTH, area.height as f32 * CELL_HEIGHT)
}

/// Draws every bar as a filled block in one color.
pub struct WaveformWidget<'a> {
    bars: &'a [Bar],
    color: Color,
}

impl<'a> WaveformWidget<'a> {
    pub fn new(bars: &'a [Bar]) -> Self {
        Self {
            bars,
            color: Color::Red,
        }
    }
}

impl Widget for WaveformWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        for bar in self.bars {
            if bar.height() <= 0.0 {
                continue;
            }
            let Some((col_start, col_end)) = span(bar.left, bar.right, CELL_WIDTH, area.width)
            else {
                continue;
            };

            // Rows whose vertical center the bar covers; bars thinner than a
            // row still get one line at their middle.
            let rows = match span(bar.top, bar.bottom, CELL_HEIGHT, area.height) {
                Some(rows) => rows,
                None => {
                    let mid = ((bar.top + bar.bottom) / 2.0 / CELL_HEIGHT).floor();
                    if mid < 0.0 || mid >= area.height as f32 {
                        continue;
                    }
                    (mid as u16, mid as u16 + 1)
                }
            };

            for col in col_start..col_end {
                for row in rows.0..rows.1 {
                    if let Some(cell) = buf.cell_mut((area.x + col, area.y + row)) {
                        cell.set_symbol("█").set_fg(self.color);
                    }
                }
            }
        }
    }
}

/// Cells in `0..limit` whose centers fall inside `[start, end)` in units.
fn span(start: f32, end: f32, cell: f32, limit: u16) -> Option<(u16, u16)> {
    let first = ((start / cell) - 0.5).ceil().max(0.0);
    let last = ((end / cell) - 0.5).ceil().min(limit as f32);
    if last <= first {
        return None;
    }
    Some((first as u16, last as u16))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(buf: &Buffer, x: u16, y: u16) -> bool {
        buf[(x, y)].symbol() == "█"
    }

    #[test]
    fn test_span_uses_cell_centers() {
        // units 0..10 cover the centers of columns 0 (2.5) and 1 (7.5)
        assert_eq!(span(0.0, 10.0, 5.0, 80), Some((0, 2)));
        assert_eq!(span(15.0, 25.0, 5.0, 80), Some((3, 5)));
        assert_eq!(span(1.0, 2.0, 5.0, 80), None);
        assert_eq!(span(390.0, 410.0, 5.0, 80), Some((78, 80)));
    }

    #[test]
    fn test_bar_fills_cells() {
        let area = Rect::new(0, 0, 10, 10);
        let mut buf = Buffer::empty(area);
        let bars = [Bar { left: 0.0, top: 20.0, right: 10.0, bottom: 60.0 }];

        WaveformWidget::new(&bars).render(area, &mut buf);

        for y in 2..6 {
            assert!(filled(&buf, 0, y));
            assert!(filled(&buf, 1, y));
            assert!(!filled(&buf, 2, y));
        }
        assert!(!filled(&buf, 0, 1));
        assert!(!filled(&buf, 0, 6));
        assert_eq!(buf[(0, 2)].fg, Color::Red);
    }

    #[test]
    fn test_thin_bar_draws_one_row() {
        let area = Rect::new(0, 0, 10, 10);
        let mut buf = Buffer::empty(area);
        let bars = [Bar { left: 15.0, top: 47.0, right: 25.0, bottom: 50.0 }];

        WaveformWidget::new(&bars).render(area, &mut buf);

        assert!(filled(&buf, 3, 4));
        assert!(filled(&buf, 4, 4));
        let total = (0..10)
            .flat_map(|x| (0..10).map(move |y| (x, y)))
            .filter(|&(x, y)| filled(&buf, x, y))
            .count();
        assert_eq!(total, 2);
    }

    #[test]
    fn test_units_for_area() {
        assert_eq!(units_for_area(Rect::new(3, 4, 60, 20)), (300.0, 200.0));
    }
}
