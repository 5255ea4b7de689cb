use std::time::Instant;

use crossterm::event::{KeyCode, MouseButton, MouseEvent, MouseEventKind};
use ratatui::{layout::Rect as TuiRect, widgets::ListState};

use crate::{
    controller::{MapController, MapEvent},
    data::YearFilter,
    projection::Viewport,
};

/// Braille dots per terminal cell.
pub const DOTS_X: f64 = 2.0;
pub const DOTS_Y: f64 = 4.0;

pub struct AppState<'a> {
    pub map: MapController<'a>,
    /// "All years" first, then every contest year.
    pub year_items: Vec<YearFilter>,
    pub selected: usize,
    /// Selection and scroll offset of the year list, kept across frames.
    pub list_state: ListState,
    /// Inner canvas area of the map panel, as last drawn.
    pub map_area: TuiRect,
    /// Inner area of the year list, as last drawn.
    pub list_area: TuiRect,
}

fn inside(area: TuiRect, column: u16, row: u16) -> bool {
    column >= area.x && column < area.x + area.width && row >= area.y && row < area.y + area.height
}

impl<'a> AppState<'a> {
    pub const HELP_TEXT: &'static str = "\
↑/↓ ←/→: change year
a: all years
r: reset
click country: show votes given
click elsewhere / Esc: hide votes
q: quit";

    pub fn new(map: MapController<'a>) -> Self {
        let year_items = std::iter::once(YearFilter::All)
            .chain(map.years().into_iter().map(YearFilter::Year))
            .collect();
        Self {
            map,
            year_items,
            selected: 0,
            list_state: ListState::default().with_selected(Some(0)),
            map_area: TuiRect::default(),
            list_area: TuiRect::default(),
        }
    }

    /// Returns true when the user asked to quit.
    pub fn handle_key(&mut self, key: KeyCode, now: Instant) -> bool {
        use KeyCode::*;
        match key {
            Char('q') => return true,
            Up | Left => {
                if self.selected > 0 {
                    self.select(self.selected - 1, now);
                }
            }
            Down | Right => {
                if self.selected + 1 < self.year_items.len() {
                    self.select(self.selected + 1, now);
                }
            }
            Char('a') | Char('r') => self.select(0, now),
            Esc => self.map.handle(MapEvent::ClickElsewhere, now),
            _ => {}
        }
        false
    }

    pub fn handle_mouse(&mut self, event: MouseEvent, now: Instant) {
        let (column, row) = (event.column, event.row);
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if inside(self.map_area, column, row) {
                    let (x, y) = self.cell_to_viewport(column, row);
                    self.map.pointer_clicked(x, y, now);
                } else if inside(self.list_area, column, row) {
                    let idx = (row - self.list_area.y) as usize + self.list_state.offset();
                    if idx < self.year_items.len() {
                        self.select(idx, now);
                    }
                }
            }
            MouseEventKind::Moved => {
                if inside(self.map_area, column, row) {
                    let (x, y) = self.cell_to_viewport(column, row);
                    self.map.pointer_moved(x, y, now);
                } else if self.map.tooltip().is_some() {
                    self.map.handle(MapEvent::HoverLeave, now);
                }
            }
            _ => {}
        }
    }

    /// Records where the map canvas now sits; a new size refits the layer.
    pub fn set_map_area(&mut self, area: TuiRect, now: Instant) {
        self.map_area = area;
        let viewport = Viewport::new(area.width as f64 * DOTS_X, area.height as f64 * DOTS_Y);
        self.map.handle(MapEvent::Resize(viewport), now);
    }

    fn select(&mut self, idx: usize, now: Instant) {
        self.selected = idx;
        self.list_state.select(Some(idx));
        let year = self.year_items[idx];
        self.map.handle(MapEvent::SelectYear(year), now);
    }

    /// Centre of a terminal cell in viewport dots.
    fn cell_to_viewport(&self, column: u16, row: u16) -> (f64, f64) {
        (
            (column - self.map_area.x) as f64 * DOTS_X + DOTS_X / 2.0,
            (row - self.map_area.y) as f64 * DOTS_Y + DOTS_Y / 2.0,
        )
    }

    pub fn year(&self) -> YearFilter {
        self.year_items[self.selected]
    }
}
