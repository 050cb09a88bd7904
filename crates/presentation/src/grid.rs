use askama::Template;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, Table as TextTable};

/// Output medium for a rendered report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Html,
}

/// A titled grid of already-formatted cells, renderable as a text table or an
/// HTML fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Columns whose cells are right-aligned.
    pub numeric_columns: Vec<usize>,
}

/// The HTML fragment of a grid. Cell text is escaped by the template.
#[derive(Template)]
#[template(path = "grid.html")]
struct GridTemplate<'a> {
    title: &'a str,
    headers: Vec<HtmlCell<'a>>,
    rows: Vec<Vec<HtmlCell<'a>>>,
}

struct HtmlCell<'a> {
    text: &'a str,
    align: &'static str,
}

impl Grid {
    pub fn new<S: Into<String>>(title: impl Into<String>, headers: Vec<S>) -> Self {
        Self {
            title: title.into(),
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            numeric_columns: Vec::new(),
        }
    }

    /// Marks columns as numeric so they are right-aligned.
    pub fn numeric(mut self, columns: impl IntoIterator<Item = usize>) -> Self {
        self.numeric_columns.extend(columns);
        self
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn render(&self, format: OutputFormat) -> String {
        match format {
            OutputFormat::Text => self.to_text(),
            OutputFormat::Html => self.to_html(),
        }
    }

    /// The title followed by a box-drawn table.
    pub fn to_text(&self) -> String {
        let mut table = TextTable::new();
        table.load_preset(UTF8_FULL).set_header(self.headers.clone());

        for row in &self.rows {
            let cells: Vec<Cell> = row
                .iter()
                .enumerate()
                .map(|(i, text)| {
                    let cell = Cell::new(text);
                    if self.numeric_columns.contains(&i) {
                        cell.set_alignment(CellAlignment::Right)
                    } else {
                        cell
                    }
                })
                .collect();
            table.add_row(cells);
        }

        if self.title.is_empty() {
            table.to_string()
        } else {
            format!("{}\n{table}", self.title)
        }
    }

    /// A self-contained `<div>` with inline dark-theme styles.
    pub fn to_html(&self) -> String {
        GridTemplate {
            title: &self.title,
            headers: self.html_cells(&self.headers),
            rows: self.rows.iter().map(|row| self.html_cells(row)).collect(),
        }
        .to_string()
    }

    fn html_cells<'a>(&self, texts: &'a [String]) -> Vec<HtmlCell<'a>> {
        texts
            .iter()
            .enumerate()
            .map(|(i, text)| HtmlCell {
                text,
                align: self.alignment(i),
            })
            .collect()
    }

    fn alignment(&self, column: usize) -> &'static str {
        if self.numeric_columns.contains(&column) {
            "right"
        } else {
            "left"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Grid {
        let mut grid = Grid::new("Fees", vec!["Rate", "Revenue"]).numeric([1]);
        grid.push_row(vec!["10%".to_string(), "$300".to_string()]);
        grid
    }

    #[test]
    fn text_rendering_contains_title_headers_and_cells() {
        let text = sample().to_text();
        assert!(text.starts_with("Fees\n"));
        for needle in ["Rate", "Revenue", "10%", "$300"] {
            assert!(text.contains(needle), "missing {needle} in\n{text}");
        }
    }

    #[test]
    fn html_rendering_escapes_cells() {
        let mut grid = sample();
        grid.push_row(vec!["<script>".to_string(), "a & b".to_string()]);
        let html = grid.to_html();

        assert!(html.starts_with("<div"));
        assert!(html.ends_with("</div>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("a &amp; b"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("text-align:right;\">$300</td>"));
    }

    #[test]
    fn html_title_is_escaped_and_omitted_when_empty() {
        let mut grid = Grid::new(r#"Fees "2024" & more"#, vec!["Rate"]);
        grid.push_row(vec!["10%".to_string()]);
        let html = grid.to_html();
        assert!(html.contains("<h3"));
        assert!(!html.contains(r#""2024""#));
        assert!(html.contains("&amp; more"));

        let untitled = Grid::new("", vec!["Rate"]).to_html();
        assert!(!untitled.contains("<h3"));
        assert!(untitled.contains("text-align:left;\">Rate</th>"));
    }
}
