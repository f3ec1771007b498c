//! Minimal drawing surface the lobby view projects onto.

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Style {
    Normal,
    /// Visually distinct, used for values next to their labels.
    Highlight,
}

pub trait Surface {
    /// Width and height in cells.
    fn size(&self) -> (usize, usize);

    fn draw_text(&mut self, x: usize, y: usize, style: Style, text: &str);

    fn draw_box(&mut self, x1: usize, y1: usize, x2: usize, y2: usize, style: Style);
}

pub fn text_width(text: &str) -> usize {
    text.chars().count()
}

/// Column at which `width` cells are horizontally centered.
pub fn centered(surface: &dyn Surface, width: usize) -> usize {
    let (screen_width, _) = surface.size();
    screen_width.saturating_sub(width) / 2
}

pub fn draw_centered(surface: &mut dyn Surface, y: usize, style: Style, text: &str) {
    let x = centered(surface, text_width(text));
    surface.draw_text(x, y, style, text);
}

/// Draw `label` followed by a highlighted `value`, centered together as one unit.
pub fn draw_field(surface: &mut dyn Surface, y: usize, label: &str, value: &str) {
    let x = centered(surface, text_width(label) + text_width(value));
    surface.draw_text(x, y, Style::Normal, label);
    surface.draw_text(x + text_width(label), y, Style::Highlight, value);
}

/// A fixed-size character grid, for terminals and logs.
#[derive(Debug, Clone)]
pub struct TextSurface {
    width: usize,
    cells: Vec<Vec<char>>,
}

impl TextSurface {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            cells: vec![vec![' '; width]; height],
        }
    }

    pub fn clear(&mut self) {
        for row in &mut self.cells {
            row.fill(' ');
        }
    }

    fn put(&mut self, x: usize, y: usize, c: char) {
        if let Some(cell) = self.cells.get_mut(y).and_then(|row| row.get_mut(x)) {
            *cell = c;
        }
    }
}

impl Surface for TextSurface {
    fn size(&self) -> (usize, usize) {
        (self.width, self.cells.len())
    }

    fn draw_text(&mut self, x: usize, y: usize, _: Style, text: &str) {
        for (i, c) in text.chars().enumerate() {
            self.put(x + i, y, c);
        }
    }

    fn draw_box(&mut self, x1: usize, y1: usize, x2: usize, y2: usize, _: Style) {
        for x in x1..=x2 {
            self.put(x, y1, '-');
            self.put(x, y2, '-');
        }
        for y in y1..=y2 {
            self.put(x1, y, '|');
            self.put(x2, y, '|');
        }
        for (x, y) in [(x1, y1), (x2, y1), (x1, y2), (x2, y2)] {
            self.put(x, y, '+');
        }
    }
}

impl std::fmt::Display for TextSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in &self.cells {
            let line: String = row.iter().collect();
            writeln!(f, "{}", line.trim_end())?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::{draw_centered, draw_field, Style, Surface, TextSurface};

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Drawn {
        Text {
            x: usize,
            y: usize,
            style: Style,
            text: String,
        },
        Box,
    }

    /// Records every draw call.
    pub struct RecordingSurface {
        pub width: usize,
        pub height: usize,
        pub drawn: Vec<Drawn>,
    }

    impl RecordingSurface {
        pub fn new(width: usize, height: usize) -> Self {
            Self {
                width,
                height,
                drawn: Vec::new(),
            }
        }

        pub fn texts(&self) -> Vec<&str> {
            self.drawn
                .iter()
                .filter_map(|d| match d {
                    Drawn::Text { text, .. } => Some(text.as_str()),
                    Drawn::Box => None,
                })
                .collect()
        }

        pub fn row(&self, row: usize) -> Vec<(usize, Style, &str)> {
            self.drawn
                .iter()
                .filter_map(|d| match d {
                    Drawn::Text { x, y, style, text } if *y == row => {
                        Some((*x, *style, text.as_str()))
                    }
                    _ => None,
                })
                .collect()
        }
    }

    impl Surface for RecordingSurface {
        fn size(&self) -> (usize, usize) {
            (self.width, self.height)
        }

        fn draw_text(&mut self, x: usize, y: usize, style: Style, text: &str) {
            self.drawn.push(Drawn::Text {
                x,
                y,
                style,
                text: text.to_owned(),
            });
        }

        fn draw_box(&mut self, _: usize, _: usize, _: usize, _: usize, _: Style) {
            self.drawn.push(Drawn::Box);
        }
    }

    #[test]
    fn field_is_centered_as_a_unit() {
        let mut s = RecordingSurface::new(40, 10);
        draw_field(&mut s, 3, "Name: ", "lobby");
        // 11 cells wide on a 40 cell screen
        assert_eq!(
            s.row(3),
            vec![(14, Style::Normal, "Name: "), (20, Style::Highlight, "lobby")]
        );
    }

    #[test]
    fn centering_counts_chars_not_bytes() {
        let mut s = RecordingSurface::new(10, 1);
        draw_centered(&mut s, 0, Style::Normal, "ééé");
        assert_eq!(s.row(0), vec![(3, Style::Normal, "ééé")]);
    }

    #[test]
    fn narrow_screen_clamps_to_left_edge() {
        let mut s = RecordingSurface::new(4, 1);
        draw_centered(&mut s, 0, Style::Normal, "too wide to fit");
        assert_eq!(s.row(0)[0].0, 0);
    }

    #[test]
    fn text_surface_clips_and_boxes() {
        let mut s = TextSurface::new(6, 3);
        s.draw_box(0, 0, 5, 2, Style::Normal);
        s.draw_text(1, 1, Style::Highlight, "abcdefgh");
        assert_eq!(s.to_string(), "+----+\n|abcde\n+----+\n");

        s.clear();
        assert_eq!(s.to_string(), "\n\n\n");
    }
}
