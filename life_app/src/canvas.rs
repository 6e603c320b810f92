//! Character canvas the cells draw onto

use std::fmt::Write as _;

/// Grid of glyphs, one per board cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    rows: usize,
    cols: usize,
    glyphs: Vec<char>,
}

impl Canvas {
    /// Create a blank canvas
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            glyphs: vec![' '; rows * cols],
        }
    }

    /// Blank every glyph
    pub fn clear(&mut self) {
        self.glyphs.fill(' ');
    }

    /// Set one glyph; positions outside the canvas are ignored
    pub fn plot(&mut self, row: usize, col: usize, glyph: char) {
        if row < self.rows && col < self.cols {
            self.glyphs[row * self.cols + col] = glyph;
        }
    }

    /// One row as text
    pub fn row_text(&self, row: usize) -> String {
        self.glyphs
            .chunks(self.cols)
            .nth(row)
            .map(|glyphs| glyphs.iter().collect())
            .unwrap_or_default()
    }

    /// Whole canvas framed by a border
    pub fn framed(&self) -> String {
        let rule = format!("+{}+", "-".repeat(self.cols));
        let mut out = String::with_capacity((self.cols + 3) * (self.rows + 2));
        out.push_str(&rule);
        out.push('\n');
        for row in 0..self.rows {
            let _ = writeln!(out, "|{}|", self.row_text(row));
        }
        out.push_str(&rule);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plot_and_clear() {
        let mut canvas = Canvas::new(2, 3);
        canvas.plot(1, 2, '#');
        canvas.plot(5, 5, '#');
        assert_eq!(canvas.row_text(1), "  #");

        canvas.clear();
        assert_eq!(canvas.row_text(1), "   ");
        assert_eq!(canvas.row_text(9), "");
    }

    #[test]
    fn test_framed() {
        let mut canvas = Canvas::new(1, 2);
        canvas.plot(0, 0, '#');
        assert_eq!(canvas.framed(), "+--+\n|# |\n+--+");
    }
}
