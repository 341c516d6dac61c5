use ratatui::layout::Rect;

/// Single-line text field with a character-indexed cursor
#[derive(Debug, Clone, Default)]
pub struct Input {
    value: String,
    cursor: usize, // in chars, not bytes
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_string(value: String) -> Self {
        let cursor = value.chars().count();
        Self { value, cursor }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    pub fn insert_char(&mut self, ch: char) {
        let at = self.byte_index(self.cursor);
        self.value.insert(at, ch);
        self.cursor += 1;
    }

    /// Backspace
    pub fn delete_char(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let at = self.byte_index(self.cursor);
        self.value.remove(at);
    }

    /// Delete key
    pub fn delete_forward(&mut self) {
        if self.cursor < self.value.chars().count() {
            let at = self.byte_index(self.cursor);
            self.value.remove(at);
        }
    }

    pub fn move_cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.value.chars().count());
    }

    pub fn move_cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_cursor_end(&mut self) {
        self.cursor = self.value.chars().count();
    }

    /// Visible slice of the value for a field `width` chars wide, plus the
    /// cursor column inside that slice
    pub fn visible(&self, width: usize) -> (String, usize) {
        if width == 0 {
            return (String::new(), 0);
        }
        let start = self.cursor.saturating_sub(width - 1);
        let text: String = self.value.chars().skip(start).take(width).collect();
        (text, self.cursor - start)
    }

    /// Terminal position of the cursor when drawn into `area`
    pub fn cursor_position(&self, area: Rect) -> (u16, u16) {
        let (_, col) = self.visible(area.width as usize);
        (area.x + col as u16, area.y)
    }
}
