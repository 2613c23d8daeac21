//! TUI rendering.
//!
//! ┌──────────────────────────────────────────────────────────┐
//! │  ⚓ fleetwatch  127.0.0.1:8000  RUNNING  x2  #42 ⟳  REC    │
//! ├──────────────────────────────────────┬───────────────────┤
//! │  Map                                 │  Fleet 6/1 error  │
//! │        ↗ 3                           ├───────────────────┤
//! │              ● 4       ✖ 7           │  Units            │
//! │    → 1                               │  ▸ 7  ERROR  62%  │
//! │                   ● 2                ├───────────────────┤
//! │                                      │  Unit 7 details   │
//! │                                      ├───────────────────┤
//! │                                      │  Notices          │
//! ├──────────────────────────────────────┴───────────────────┤
//! │  s start  x stop  1/2/5/0 speed  u upload  r rec  q quit │
//! └──────────────────────────────────────────────────────────┘

use super::app::{App, NoticeKind};
use super::map::{FleetMap, heading_glyph};
use fleetwatch_core::{PlaybackSpeed, PollerPhase, Treatment};
use ratatui::{prelude::*, widgets::*};

pub fn draw(f: &mut Frame, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // title
            Constraint::Min(10),   // main
            Constraint::Length(1), // keys
        ])
        .split(f.area());

    draw_title(f, rows[0], app);
    draw_main(f, rows[1], app);
    draw_keys(f, rows[2], app);
}

fn draw_title(f: &mut Frame, area: Rect, app: &App) {
    let view = app.view();
    let snap = &view.snapshot;
    let spin = if view.phase == PollerPhase::Polling || app.refresh_pending() {
        " ⟳"
    } else {
        ""
    };

    let (state_label, state_style) = if snap.is_active {
        ("RUNNING", Style::default().bold().fg(Color::Green))
    } else {
        ("STOPPED", Style::default().bold().fg(Color::Yellow))
    };

    let mut spans = vec![
        Span::styled(" ⚓ fleetwatch ", Style::default().bold().fg(Color::Cyan)),
        Span::styled(
            format!(" {} ", app.backend_url()),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(format!(" {state_label} "), state_style),
        Span::styled(
            format!(" {} ", PlaybackSpeed::nearest(snap.speed)),
            Style::default().fg(Color::Magenta),
        ),
        Span::styled(
            format!(" #{}  {}ms{spin} ", view.polls, app.poll_interval().as_millis()),
            Style::default().fg(Color::DarkGray),
        ),
    ];

    if let Some((elapsed, records)) = app.recording_status() {
        spans.push(Span::styled(
            format!(" ● REC {}s {records} rec ", elapsed.as_secs()),
            Style::default().bold().fg(Color::Red),
        ));
    }
    if app.pending_commands() > 0 {
        spans.push(Span::styled(" sending… ", Style::default().fg(Color::Yellow)));
    }
    if view.consecutive_failures > 0 {
        spans.push(Span::styled(
            format!(" backend unreachable ({}x) ", view.consecutive_failures),
            Style::default().bold().fg(Color::Red),
        ));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Line::from(spans));

    f.render_widget(block, area);
}

fn draw_main(f: &mut Frame, area: Rect, app: &App) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(area);

    draw_map(f, cols[0], app);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // stats
            Constraint::Min(5),    // units
            Constraint::Length(8), // details
            Constraint::Length(6), // notices
        ])
        .split(cols[1]);

    draw_stats(f, right[0], app);
    draw_units(f, right[1], app);
    draw_details(f, right[2], app);
    draw_notices(f, right[3], app);
}

fn draw_map(f: &mut Frame, area: Rect, app: &App) {
    let view = app.view();
    let b = &view.bounds;
    let title = if view.has_data() {
        format!(
            " Map  lat {:.3}..{:.3}  lon {:.3}..{:.3} ",
            b.min_lat, b.max_lat, b.min_lon, b.max_lon
        )
    } else {
        " Map ".to_string()
    };
    let block = Block::default().borders(Borders::ALL).title(title);
    let inner = block.inner(area);
    f.render_widget(block, area);

    if !view.has_data() {
        let msg = match &view.last_error {
            Some(e) => format!("Waiting for {}: {e}", app.backend_url()),
            None => format!("Waiting for first snapshot from {}…", app.backend_url()),
        };
        let p = Paragraph::new(msg)
            .style(Style::default().fg(Color::DarkGray))
            .wrap(Wrap { trim: true });
        f.render_widget(p, inner);
        return;
    }

    if view.snapshot.units.is_empty() {
        let p = Paragraph::new("No units reported. Press 'u' to upload a fleet log.")
            .style(Style::default().fg(Color::DarkGray));
        f.render_widget(p, inner);
        return;
    }

    let markers = app.frame_markers();
    f.render_widget(
        FleetMap {
            markers: &markers,
            selected: app.selected_id(),
            frame: app.frame(),
        },
        inner,
    );
}

fn draw_stats(f: &mut Frame, area: Rect, app: &App) {
    let view = app.view();
    let stats = view.stats;
    let lines = vec![
        Line::from(vec![
            Span::styled("Total   ", Style::default().bold()),
            Span::raw(stats.total.to_string()),
        ]),
        Line::from(vec![
            Span::styled("Online  ", Style::default().bold()),
            Span::styled(stats.online.to_string(), Style::default().fg(Color::Green)),
        ]),
        Line::from(vec![
            Span::styled("Error   ", Style::default().bold()),
            Span::styled(
                stats.error.to_string(),
                if stats.error > 0 {
                    Style::default().fg(Color::Red).bold()
                } else {
                    Style::default().fg(Color::DarkGray)
                },
            ),
        ]),
    ];
    let block = Block::default().borders(Borders::ALL).title(" Fleet ");
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_units(f: &mut Frame, area: Rect, app: &App) {
    let markers = app.markers();
    let rows: Vec<Row> = markers
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let is_cursor = i == app.cursor();
            let pointer = if is_cursor { "▸" } else { " " };
            let style = if is_cursor {
                Style::default().bg(Color::DarkGray).fg(Color::White)
            } else {
                match m.treatment {
                    Treatment::Error => Style::default().fg(Color::Red),
                    Treatment::Moving => Style::default().fg(Color::Green),
                    Treatment::Normal => Style::default().fg(Color::White),
                }
            };
            Row::new(vec![
                pointer.to_string(),
                m.id.clone(),
                m.treatment.label().to_string(),
                format!("{:.0}%", m.battery),
            ])
            .style(style)
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(2), // pointer
            Constraint::Min(4),    // id
            Constraint::Length(7), // treatment
            Constraint::Length(5), // battery
        ],
    )
    .block(Block::default().borders(Borders::ALL).title(" Units (↑↓) "));

    let mut state = TableState::default().with_selected(Some(app.cursor()));
    f.render_stateful_widget(table, area, &mut state);
}

fn draw_details(f: &mut Frame, area: Rect, app: &App) {
    let Some(unit) = app.selected_unit() else {
        let block = Block::default().borders(Borders::ALL).title(" Unit ");
        f.render_widget(Paragraph::new("No unit selected").block(block), area);
        return;
    };

    let mut lines = vec![
        Line::from(vec![
            Span::styled("Status  ", Style::default().bold()),
            Span::raw(unit.status().label()),
        ]),
        Line::from(format!("Pos     {:.5}, {:.5}", unit.lat, unit.lon)),
        Line::from(format!(
            "Course  {:.0}° {}",
            unit.course_deg,
            heading_glyph(unit.course_deg)
        )),
        Line::from(format!("Battery {:.1}%", unit.battery)),
    ];
    if let Some(knots) = unit.speed_knots {
        lines.push(Line::from(format!("Speed   {knots:.1} kn")));
    }
    if let Some(details) = unit.error_details() {
        lines.push(Line::from(Span::styled(
            details.to_string(),
            Style::default().fg(Color::Red).bold(),
        )));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Unit {} ", unit.id));
    let p = Paragraph::new(lines).wrap(Wrap { trim: true }).block(block);
    f.render_widget(p, area);
}

fn draw_notices(f: &mut Frame, area: Rect, app: &App) {
    let notices = app.notices();
    let lines: Vec<Line> = if notices.is_empty() {
        vec![Line::from(Span::styled(
            "none",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        notices
            .iter()
            .rev()
            .map(|n| {
                let style = match n.kind {
                    NoticeKind::Info => Style::default().fg(Color::Gray),
                    NoticeKind::Error => Style::default().fg(Color::Red),
                    NoticeKind::SimulationEnded => Style::default().fg(Color::Yellow).bold(),
                };
                Line::from(Span::styled(n.text.clone(), style))
            })
            .collect()
    };

    let block = Block::default().borders(Borders::ALL).title(" Notices (d) ");
    let p = Paragraph::new(lines).wrap(Wrap { trim: true }).block(block);
    f.render_widget(p, area);
}

fn draw_keys(f: &mut Frame, area: Rect, app: &App) {
    let upload = match app.upload_path().and_then(|p| p.file_name()) {
        Some(name) => format!("u upload {}", name.to_string_lossy()),
        None => "u upload".to_string(),
    };
    let bar = Paragraph::new(format!(
        " s start  x stop  1/2/5/0/+ speed  {upload}  r record  e export  ↑↓ select  d dismiss  q quit"
    ))
    .style(Style::default().bg(Color::DarkGray).fg(Color::White));
    f.render_widget(bar, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use std::path::PathBuf;
    use std::sync::Arc;

    #[test]
    fn draws_waiting_state_before_first_poll() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let backend = fleetwatch_core::HttpBackend::new(
            fleetwatch_core::WatchConfig::for_backend("http://127.0.0.1:9"),
        )
        .unwrap();
        let app = App::new(
            Arc::new(backend),
            rt.handle().clone(),
            Some(PathBuf::from("fleet.jsonl")),
            PathBuf::from("recordings"),
        );

        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| draw(f, &app)).unwrap();

        let buf = terminal.backend().buffer();
        let text: String = buf.content().iter().map(|c| c.symbol()).collect();
        assert!(text.contains("fleetwatch"));
        assert!(text.contains("STOPPED"));
        assert!(text.contains("No unit selected"));
        assert!(text.contains("u upload fleet.jsonl"));
    }
}
