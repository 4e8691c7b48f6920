//! Text rendering of answers and citations for terminal front ends.

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use synthbio_core::{Answer, Citation};

use crate::session::RequestState;

/// Shown in place of an empty citation list.
pub const NO_CITATIONS: &str = "No citations provided.";

/// Display label for a citation: its title, or `Report <id>`.
pub fn citation_label(citation: &Citation) -> String {
    match citation.title.as_deref().map(str::trim) {
        Some(title) if !title.is_empty() => title.to_string(),
        _ => format!("Report {}", citation.id),
    }
}

/// Citation list in the order given. Rank is shown as metadata only.
pub fn render_citations(citations: &[Citation]) -> String {
    if citations.is_empty() {
        return NO_CITATIONS.to_string();
    }
    citations
        .iter()
        .enumerate()
        .map(|(i, c)| match c.rank {
            Some(rank) => format!("{}. {}  (rank {})", i + 1, citation_label(c), format_rank(rank)),
            None => format!("{}. {}", i + 1, citation_label(c)),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_rank(rank: f64) -> String {
    if rank.fract() == 0.0 && rank.abs() < 1e15 {
        format!("{rank:.0}")
    } else {
        format!("{rank}")
    }
}

/// Answer body followed by its citations.
pub fn render_answer(answer: &Answer) -> String {
    format!(
        "{}\n\nCitations\n{}",
        render_markdown(&answer.answer),
        render_citations(&answer.citations)
    )
}

/// Full view for a session state.
pub fn render_state(state: &RequestState) -> String {
    match state {
        RequestState::Idle => String::new(),
        RequestState::Loading { .. } => "Loading...".to_string(),
        RequestState::Success(answer) => render_answer(answer),
        RequestState::Error(message) => format!("Error: {message}"),
    }
}

/// Render Markdown as plain terminal text, including tables.
pub fn render_markdown(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
    let mut renderer = TerminalRenderer::default();
    for event in Parser::new_ext(markdown, options) {
        renderer.event(event);
    }
    renderer.out.trim().to_string()
}

#[derive(Default)]
struct TerminalRenderer {
    out: String,
    lists: Vec<Option<u64>>,
    links: Vec<String>,
    table: Option<TableBuffer>,
}

impl TerminalRenderer {
    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.push(&text),
            Event::Code(code) => {
                self.push("`");
                self.push(&code);
                self.push("`");
            }
            Event::Html(html) | Event::InlineHtml(html) => self.push(&html),
            Event::SoftBreak => self.push(" "),
            Event::HardBreak => self.push("\n"),
            Event::Rule => {
                self.blank_line();
                self.out.push_str("----");
                self.blank_line();
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph | Tag::CodeBlock(_) => {
                if self.lists.is_empty() {
                    self.blank_line();
                }
            }
            Tag::Heading { level, .. } => {
                self.blank_line();
                self.out.push_str(&"#".repeat(level as usize));
                self.out.push(' ');
            }
            Tag::List(start) => {
                if self.lists.is_empty() {
                    self.blank_line();
                } else {
                    self.new_line();
                }
                self.lists.push(start);
            }
            Tag::Item => {
                self.new_line();
                let indent = "  ".repeat(self.lists.len().saturating_sub(1));
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{n}. ");
                        *n += 1;
                        marker
                    }
                    _ => "- ".to_string(),
                };
                self.out.push_str(&indent);
                self.out.push_str(&marker);
            }
            Tag::Link { dest_url, .. } => self.links.push(dest_url.to_string()),
            Tag::Table(_) => {
                self.blank_line();
                self.table = Some(TableBuffer::default());
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::CodeBlock => {
                if self.lists.is_empty() {
                    self.blank_line();
                }
            }
            TagEnd::List(_) => {
                self.lists.pop();
                if self.lists.is_empty() {
                    self.blank_line();
                }
            }
            TagEnd::Item => self.new_line(),
            TagEnd::Link => {
                if let Some(url) = self.links.pop().filter(|u| !u.is_empty()) {
                    self.push(&format!(" ({url})"));
                }
            }
            TagEnd::TableCell => {
                if let Some(table) = self.table.as_mut() {
                    let cell = std::mem::take(&mut table.cell);
                    table.row.push(cell.trim().to_string());
                }
            }
            TagEnd::TableHead => {
                if let Some(table) = self.table.as_mut() {
                    table.finish_row();
                    table.header_rows = table.rows.len();
                }
            }
            TagEnd::TableRow => {
                if let Some(table) = self.table.as_mut() {
                    table.finish_row();
                }
            }
            TagEnd::Table => {
                if let Some(table) = self.table.take() {
                    self.out.push_str(&table.render());
                    self.blank_line();
                }
            }
            _ => {}
        }
    }

    fn push(&mut self, text: &str) {
        match self.table.as_mut() {
            Some(table) => table.cell.push_str(text),
            None => self.out.push_str(text),
        }
    }

    fn new_line(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    fn blank_line(&mut self) {
        if self.out.is_empty() {
            return;
        }
        while !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
    }
}

#[derive(Default)]
struct TableBuffer {
    rows: Vec<Vec<String>>,
    header_rows: usize,
    row: Vec<String>,
    cell: String,
}

impl TableBuffer {
    fn finish_row(&mut self) {
        let row = std::mem::take(&mut self.row);
        self.rows.push(row);
    }

    fn render(&self) -> String {
        let columns = self.rows.iter().map(Vec::len).max().unwrap_or(0);
        let widths: Vec<usize> = (0..columns)
            .map(|col| {
                self.rows
                    .iter()
                    .filter_map(|row| row.get(col))
                    .map(|cell| cell.chars().count())
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut lines = Vec::with_capacity(self.rows.len() + 1);
        for (i, row) in self.rows.iter().enumerate() {
            let cells: Vec<String> = widths
                .iter()
                .enumerate()
                .map(|(col, width)| {
                    let cell = row.get(col).map(String::as_str).unwrap_or("");
                    let pad = width - cell.chars().count();
                    format!("{cell}{}", " ".repeat(pad))
                })
                .collect();
            lines.push(cells.join(" | ").trim_end().to_string());
            if i + 1 == self.header_rows {
                let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
                lines.push(rule.join("-+-"));
            }
        }
        lines.join("\n")
    }
}
