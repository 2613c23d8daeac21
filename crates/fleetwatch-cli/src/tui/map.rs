//! Fleet map widget: draws markers straight into the frame buffer.

use ratatui::{buffer::Buffer, layout::Rect, style::*, widgets::Widget};

use fleetwatch_core::render::pulse_on;
use fleetwatch_core::{Marker, Treatment, to_cell};

const ARROWS: [char; 8] = ['↑', '↗', '→', '↘', '↓', '↙', '←', '↖'];

/// Glyph pointing along `course_deg` (0 = north, clockwise).
pub fn heading_glyph(course_deg: f64) -> char {
    if !course_deg.is_finite() {
        return '•';
    }
    let sector = ((course_deg.rem_euclid(360.0) + 22.5) / 45.0) as usize % 8;
    ARROWS[sector]
}

/// Glyph and style for one marker on a given frame.
pub fn marker_glyph(marker: &Marker, frame: u64) -> (char, Style) {
    match marker.treatment {
        Treatment::Error => ('✖', Style::default().fg(Color::Red).bold()),
        Treatment::Moving => {
            let glyph = if pulse_on(frame) { '●' } else { '○' };
            (glyph, Style::default().fg(Color::Green).bold())
        }
        Treatment::Normal => (heading_glyph(marker.course_deg), Style::default().fg(Color::Cyan)),
    }
}

pub struct FleetMap<'a> {
    pub markers: &'a [Marker],
    pub selected: Option<&'a str>,
    pub frame: u64,
}

impl Widget for FleetMap<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        // Faint graticule at the quarter lines.
        let grid = Style::default().fg(Color::DarkGray);
        for qy in [25.0, 50.0, 75.0] {
            for qx in [25.0, 50.0, 75.0] {
                if let (Some(cx), Some(cy)) = (to_cell(qx, area.width), to_cell(qy, area.height)) {
                    buf.set_string(area.x + cx, area.y + cy, "·", grid);
                }
            }
        }

        // Selected marker last so it stays on top.
        let mut order: Vec<&Marker> = self.markers.iter().collect();
        order.sort_by_key(|m| Some(m.id.as_str()) == self.selected);

        for marker in order {
            let (Some(cx), Some(cy)) = (
                to_cell(marker.position.x, area.width),
                to_cell(marker.position.y, area.height),
            ) else {
                continue;
            };
            let x = area.x + cx;
            let y = area.y + cy;

            let (glyph, mut style) = marker_glyph(marker, self.frame);
            let selected = Some(marker.id.as_str()) == self.selected;
            if selected {
                style = style.add_modifier(Modifier::REVERSED);
            }
            buf.set_string(x, y, glyph.to_string(), style);

            let label_x = x + 1;
            if label_x < area.right() {
                let room = (area.right() - label_x) as usize;
                let label_style = if selected {
                    Style::default().fg(Color::Yellow).bold()
                } else {
                    Style::default().fg(Color::Gray)
                };
                buf.set_stringn(label_x, y, &marker.id, room, label_style);
            }
        }
    }
}
