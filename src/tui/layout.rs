use ratatui::layout::{Constraint, Direction, Layout as RatLayout, Rect};

pub struct Layout {
    pub inner_area: Rect, // Area inside the outer border
    pub main_area: Rect,
    pub status_area: Rect,
}

impl Layout {
    /// Minimum terminal dimensions, not counting the outer border.
    /// Height fits one two-row list entry inside its own border plus the status bar.
    pub const MIN_WIDTH: u16 = 36;
    pub const MIN_HEIGHT: u16 = 8;

    pub fn calculate(size: Rect) -> Self {
        let width = size.width.max(Self::MIN_WIDTH + 2);
        let height = size.height.max(Self::MIN_HEIGHT + 2);
        let size = Rect::new(size.x, size.y, width, height);

        let inner_area = Rect::new(
            size.x + 1,
            size.y + 1,
            size.width.saturating_sub(2),
            size.height.saturating_sub(2),
        );

        let vertical = RatLayout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),    // Reminder list
                Constraint::Length(1), // Status bar
            ])
            .split(inner_area);

        Self {
            inner_area,
            main_area: vertical[0],
            status_area: vertical[1],
        }
    }
}
