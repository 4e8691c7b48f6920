//! Plain-text rendering of JATS articles.
//!
//! The output keeps what retrieval needs: title, DOI and PMCID lines, the
//! abstracts, then every body section as a `## heading` followed by its
//! paragraphs. Tables are rendered inline where they appear.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::CorpusError;
use crate::xml::{Element, Node};

/// First body row is promoted to a header when every cell is at most this long.
const HEADER_CELL_MAX: usize = 20;

/// How table rows are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TableFormat {
    #[default]
    Markdown,
    Tsv,
    Csv,
}

impl FromStr for TableFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "tsv" => Ok(Self::Tsv),
            "csv" => Ok(Self::Csv),
            other => Err(format!(
                "unknown table format `{other}` (expected markdown|tsv|csv)"
            )),
        }
    }
}

impl fmt::Display for TableFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Markdown => "markdown",
            Self::Tsv => "tsv",
            Self::Csv => "csv",
        })
    }
}

/// Render a parsed article as ingestion text.
pub fn extract_text(article: &Element, format: TableFormat) -> String {
    let mut blocks = Vec::new();

    let title = article
        .find_all("article-title")
        .into_iter()
        .map(|t| clean(&t.text()))
        .fold(String::new(), |best, t| if t.len() > best.len() { t } else { best });
    if !title.is_empty() {
        blocks.push(format!("Title: {title}"));
    }

    if let Some(doi) = article_id(article, &["doi"]) {
        blocks.push(format!("DOI: {doi}"));
    }
    if let Some(pmcid) = article_id(article, &["pmcid", "pmc"]) {
        blocks.push(format!("PMCID: {pmcid}"));
    }

    for (idx, abstract_el) in article.find_all("abstract").into_iter().enumerate() {
        let paras: Vec<String> = abstract_el
            .find_all("p")
            .into_iter()
            .map(|p| clean(&p.text()))
            .collect();
        if paras.is_empty() {
            let raw = abstract_el.text();
            if !raw.trim().is_empty() {
                blocks.push(format!("Abstract {}:\n{}", idx + 1, raw.trim()));
            }
        } else {
            blocks.push(format!("Abstract {}:", idx + 1));
            blocks.extend(paras.into_iter().filter(|p| !p.is_empty()));
        }
    }

    if let Some(body) = article.find("body") {
        for sec in body.children_named("sec") {
            walk_section(sec, format, &mut blocks);
        }
    }

    let joined = blocks.join("\n\n");
    let content = format!("{}\n", joined.trim());
    blank_runs_re().replace_all(&content, "\n\n").into_owned()
}

/// Parse `xml` and render it. See [`extract_text`].
pub fn extract_text_from_str(xml: &str, format: TableFormat) -> Result<String, CorpusError> {
    Ok(extract_text(&Element::parse(xml)?, format))
}

/// Render a `<table-wrap>` or bare `<table>` as one text block.
///
/// Returns `None` when there is no table inside.
pub fn extract_table(el: &Element, format: TableFormat) -> Option<String> {
    let table = if el.name == "table" {
        el
    } else {
        el.find("table")?
    };

    let mut caption = Vec::new();
    if let Some(label) = el.find("label") {
        caption.push(clean(&label.text()));
    }
    if let Some(cap) = el.find("caption") {
        let text = cap.find("title").map(Element::text).unwrap_or_else(|| cap.text());
        caption.push(clean(&text));
    }
    caption.retain(|c| !c.is_empty());

    let mut header = table
        .child("thead")
        .and_then(|thead| thead.child("tr"))
        .map(row_cells)
        .unwrap_or_default();
    let mut rows: Vec<Vec<String>> = table
        .child("tbody")
        .map(|tbody| {
            tbody
                .children_named("tr")
                .map(row_cells)
                .filter(|cells| !cells.is_empty())
                .collect()
        })
        .unwrap_or_default();
    if header.is_empty()
        && rows
            .first()
            .is_some_and(|first| first.iter().all(|c| c.chars().count() <= HEADER_CELL_MAX))
    {
        header = rows.remove(0);
    }

    let mut lines = Vec::new();
    if !caption.is_empty() {
        lines.push(format!("Table: {}", caption.join(" - ")));
    }
    match format {
        TableFormat::Markdown => {
            if !header.is_empty() {
                lines.push(markdown_row(&header));
                lines.push(markdown_row(&vec!["---".to_string(); header.len()]));
            }
            for mut row in rows {
                if row.len() < header.len() {
                    row.resize(header.len(), String::new());
                }
                lines.push(markdown_row(&row));
            }
        }
        TableFormat::Tsv => {
            lines.extend(
                std::iter::once(header)
                    .filter(|h| !h.is_empty())
                    .chain(rows)
                    .map(|r| r.join("\t")),
            );
        }
        TableFormat::Csv => {
            lines.extend(
                std::iter::once(header)
                    .filter(|h| !h.is_empty())
                    .chain(rows)
                    .map(|r| r.iter().map(|c| csv_field(c)).collect::<Vec<_>>().join(",")),
            );
        }
    }
    Some(lines.join("\n"))
}

fn walk_section(sec: &Element, format: TableFormat, blocks: &mut Vec<String>) {
    if let Some(title) = sec.child("title") {
        let title = clean(&title.text());
        if !title.is_empty() {
            blocks.push(format!("## {title}"));
        }
    }
    for child in sec.elements() {
        match child.name.as_str() {
            "p" => {
                let text = clean(&text_without_tables(child));
                if !text.is_empty() {
                    blocks.push(text);
                }
                let mut tables = Vec::new();
                nested_tables(child, &mut tables);
                blocks.extend(tables.into_iter().filter_map(|t| extract_table(t, format)));
            }
            "table-wrap" | "table" => blocks.extend(extract_table(child, format)),
            "sec" => walk_section(child, format, blocks),
            _ => {}
        }
    }
}

fn is_table(el: &Element) -> bool {
    el.name == "table-wrap" || el.name == "table"
}

/// Tables below `el`, outermost only.
fn nested_tables<'a>(el: &'a Element, out: &mut Vec<&'a Element>) {
    for child in el.elements() {
        if is_table(child) {
            out.push(child);
        } else {
            nested_tables(child, out);
        }
    }
}

fn text_without_tables(el: &Element) -> String {
    let mut parts = Vec::new();
    for node in &el.children {
        match node {
            Node::Text(t) => parts.push(t.clone()),
            Node::Element(e) if is_table(e) => {}
            Node::Element(e) => parts.push(text_without_tables(e)),
        }
    }
    parts.concat()
}

fn article_id(article: &Element, kinds: &[&str]) -> Option<String> {
    let ids = article.find_all("article-id");
    kinds.iter().find_map(|kind| {
        ids.iter()
            .filter(|id| id.attr("pub-id-type") == Some(*kind))
            .map(|id| id.text().trim().to_string())
            .find(|id| !id.is_empty())
    })
}

/// Cell texts of a row, without trailing empty cells.
fn row_cells(tr: &Element) -> Vec<String> {
    let mut cells: Vec<String> = tr
        .elements()
        .filter(|c| c.name == "td" || c.name == "th")
        .map(|c| clean(&c.text()))
        .collect();
    while cells.last().is_some_and(|c| c.is_empty()) {
        cells.pop();
    }
    cells
}

fn markdown_row(cells: &[String]) -> String {
    format!("| {} |", cells.join(" | "))
}

fn csv_field(cell: &str) -> String {
    if cell.contains([',', '"']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

/// Collapse whitespace runs to single spaces and trim.
fn clean(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn blank_runs_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").expect("static blank-run regex"))
}
