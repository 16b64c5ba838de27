// src/table/parse.rs

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use tracing::{debug, trace};

use super::RawTable;

static TABLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table").expect("table selector should parse"));

static WHITESPACE_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\r\n]+|\s{2,}").expect("whitespace regex should compile"));

/// Cell texts the table reader treats as missing.
const MISSING_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Upper bound for `colspan`/`rowspan` so a hostile page cannot blow up the grid.
const MAX_SPAN: usize = 1000;

#[derive(Debug, Clone, PartialEq)]
struct Cell {
    text: String,
    header: bool,
}

#[derive(Debug)]
struct SpannedCell {
    cell: Cell,
    colspan: usize,
    rowspan: usize,
}

/// Parse every non-empty `<table>` in `html`, in document order (nested tables included).
pub fn parse_tables(html: &str) -> Vec<RawTable> {
    let doc = Html::parse_document(html);
    let tables: Vec<RawTable> = doc
        .select(&TABLE_SELECTOR)
        .filter(|table| table.text().any(|t| !t.trim().is_empty()))
        .map(parse_table)
        .collect();
    debug!(count = tables.len(), "parsed tables");
    tables
}

fn parse_table(table: ElementRef<'_>) -> RawTable {
    let (head, body) = collect_rows(table);
    let explicit_head = head.len();

    let mut head_grid = expand_spans(head.into_iter().chain(body).collect());
    let body_grid = head_grid.split_off(explicit_head);

    // No <thead>: leading rows made only of <th> cells are the header.
    let mut body_grid = body_grid.into_iter().peekable();
    if head_grid.is_empty() {
        while let Some(row) = body_grid.peek() {
            if row.is_empty() || !row.iter().all(|c| c.header) {
                break;
            }
            head_grid.extend(body_grid.next());
        }
    }
    let body_grid: Vec<Vec<Cell>> = body_grid.collect();

    let width = head_grid
        .iter()
        .chain(body_grid.iter())
        .map(Vec::len)
        .max()
        .unwrap_or(0);

    let columns = dedupe_columns(column_names(&head_grid, width));
    let rows: Vec<Vec<Option<String>>> = body_grid
        .into_iter()
        .map(|row| {
            let mut cells: Vec<Option<String>> = row
                .into_iter()
                .map(|c| Some(c.text).filter(|t| !is_missing(t)))
                .collect();
            cells.resize(width, None);
            cells
        })
        .collect();

    trace!(columns = ?columns, rows = rows.len(), "table");
    RawTable { columns, rows }
}

/// Rows of this table only, split into `<thead>` rows and everything else.
fn collect_rows(table: ElementRef<'_>) -> (Vec<Vec<SpannedCell>>, Vec<Vec<SpannedCell>>) {
    let mut head = Vec::new();
    let mut body = Vec::new();

    for child in table.children().filter_map(ElementRef::wrap) {
        if is_hidden(child) {
            continue;
        }
        match child.value().name() {
            "tr" => push_row(&mut body, child),
            "thead" => rows_of(child).for_each(|tr| push_row(&mut head, tr)),
            "tbody" | "tfoot" => rows_of(child).for_each(|tr| push_row(&mut body, tr)),
            _ => {}
        }
    }

    (head, body)
}

fn rows_of<'a>(section: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    section
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "tr" && !is_hidden(*el))
}

fn push_row(rows: &mut Vec<Vec<SpannedCell>>, tr: ElementRef<'_>) {
    let cells: Vec<SpannedCell> = tr
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|el| matches!(el.value().name(), "td" | "th") && !is_hidden(*el))
        .map(|el| SpannedCell {
            cell: Cell {
                text: cell_text(el),
                header: el.value().name() == "th",
            },
            colspan: span_attr(el, "colspan"),
            rowspan: span_attr(el, "rowspan"),
        })
        .collect();
    if !cells.is_empty() {
        rows.push(cells);
    }
}

fn is_hidden(el: ElementRef<'_>) -> bool {
    el.value()
        .attr("style")
        .map(|style| {
            style
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_ascii_lowercase()
                .contains("display:none")
        })
        .unwrap_or(false)
}

fn span_attr(el: ElementRef<'_>, name: &str) -> usize {
    el.value()
        .attr(name)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(1)
        .min(MAX_SPAN)
}

fn cell_text(el: ElementRef<'_>) -> String {
    normalize_whitespace(&el.text().collect::<String>())
}

fn is_missing(text: &str) -> bool {
    MISSING_MARKERS.contains(&text)
}

fn normalize_whitespace(raw: &str) -> String {
    WHITESPACE_RUNS.replace_all(raw.trim(), " ").into_owned()
}

/// Lay cells out on a grid, repeating `colspan`/`rowspan` cells into every slot they cover.
fn expand_spans(rows: Vec<Vec<SpannedCell>>) -> Vec<Vec<Cell>> {
    // column -> (rows still to fill, cell)
    let mut pending: HashMap<usize, (usize, Cell)> = HashMap::new();
    let mut grid = Vec::with_capacity(rows.len());

    for row in rows {
        let mut out = Vec::new();
        let mut col = 0;

        for spanned in row {
            fill_pending(&mut pending, &mut col, &mut out);
            for _ in 0..spanned.colspan {
                out.push(spanned.cell.clone());
                if spanned.rowspan > 1 {
                    pending.insert(col, (spanned.rowspan - 1, spanned.cell.clone()));
                }
                col += 1;
            }
        }
        fill_pending(&mut pending, &mut col, &mut out);

        // rowspans reaching past the end of a short row go at its end
        let mut trailing: Vec<usize> = pending.keys().copied().filter(|&c| c >= col).collect();
        trailing.sort_unstable();
        for c in trailing {
            if let Some((left, cell)) = pending.remove(&c) {
                out.push(cell.clone());
                if left > 1 {
                    pending.insert(c, (left - 1, cell));
                }
            }
        }

        grid.push(out);
    }

    grid
}

fn fill_pending(
    pending: &mut HashMap<usize, (usize, Cell)>,
    col: &mut usize,
    out: &mut Vec<Cell>,
) {
    while let Some((left, cell)) = pending.remove(col) {
        out.push(cell.clone());
        if left > 1 {
            pending.insert(*col, (left - 1, cell));
        }
        *col += 1;
    }
}

fn column_names(head: &[Vec<Cell>], width: usize) -> Vec<String> {
    (0..width)
        .map(|i| {
            if head.is_empty() {
                return i.to_string();
            }
            let mut parts: Vec<&str> = Vec::new();
            for row in head {
                if let Some(cell) = row.get(i) {
                    if !cell.text.is_empty() && parts.last() != Some(&cell.text.as_str()) {
                        parts.push(&cell.text);
                    }
                }
            }
            if parts.is_empty() {
                format!("Unnamed: {}", i)
            } else {
                parts.join(" ")
            }
        })
        .collect()
}

/// Repeated names become `name`, `name.1`, `name.2`, ...
fn dedupe_columns(names: Vec<String>) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<String> = Vec::with_capacity(names.len());

    for name in names {
        let mut candidate = name.clone();
        while out.contains(&candidate) {
            let n = counts.entry(name.clone()).or_insert(0);
            *n += 1;
            candidate = format!("{}.{}", name, n);
        }
        out.push(candidate);
    }

    out
}
