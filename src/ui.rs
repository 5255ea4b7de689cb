use std::time::Instant;

use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::{
    choropleth::{plasma, NO_DATA},
    map_draw,
    state::AppState,
};

const LEGEND_STEPS: usize = 12;

pub fn draw(f: &mut Frame<'_>, state: &mut AppState<'_>, now: Instant) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(15),
            Constraint::Percentage(65),
            Constraint::Percentage(20),
        ])
        .split(f.area());

    // Left: year selection
    let items: Vec<ListItem> = state
        .year_items
        .iter()
        .map(|y| ListItem::new(y.to_string()))
        .collect();
    let list_block = Block::default().borders(Borders::ALL).title("Year");
    state.list_area = list_block.inner(chunks[0]);
    let list = List::new(items)
        .block(list_block)
        .highlight_symbol(">> ")
        .highlight_style(Style::default().fg(Color::Red));
    f.render_stateful_widget(list, chunks[0], &mut state.list_state);

    // Centre: map
    let title = match &state.map.view().focused_country {
        Some(country) => format!("{} – votes from {}", state.year(), country),
        None => state.year().to_string(),
    };
    state.set_map_area(map_draw::map_block(&title).inner(chunks[1]), now);
    map_draw::render(f, chunks[1], &title, &state.map, now);

    // Right: details, legend, help
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(45),
            Constraint::Length(5),
            Constraint::Min(0),
        ])
        .split(chunks[2]);

    let details: Vec<Line> = match state.map.tooltip() {
        Some(tip) => std::iter::once(Line::styled(tip.title().to_string(), Style::default().fg(Color::Yellow)))
            .chain(tip.lines().into_iter().map(Line::from))
            .collect(),
        None => vec![Line::from("Hover a country or a vote arrow")],
    };
    let details = Paragraph::new(details)
        .block(Block::default().borders(Borders::ALL).title("Details"))
        .wrap(Wrap { trim: true });
    f.render_widget(details, right[0]);

    let max = state.map.color_scale().max;
    let ramp: Vec<Span> = (0..LEGEND_STEPS)
        .map(|i| {
            let c = plasma(i as f64 / (LEGEND_STEPS - 1) as f64);
            Span::styled("█", Style::default().fg(map_draw::color(c)))
        })
        .collect();
    let legend = Paragraph::new(vec![
        Line::from(ramp),
        Line::from(format!("0 … {max:.2} points")),
        Line::from(vec![
            Span::styled("█", Style::default().fg(map_draw::color(NO_DATA))),
            Span::raw(" no data"),
        ]),
    ])
    .block(Block::default().borders(Borders::ALL).title("Legend"));
    f.render_widget(legend, right[1]);

    let help = Paragraph::new(AppState::HELP_TEXT)
        .block(Block::default().borders(Borders::ALL).title("Keys"))
        .wrap(Wrap { trim: true });
    f.render_widget(help, right[2]);
}
