//! `table`, `csv-table` and `list-table`.

use std::path::PathBuf;

use super::options::{Conversion, OptionValue};
use super::{DirectiveHook, Invocation, OptionSpec, Outcome};
use crate::error::Result;
use crate::nodes::{Kind, NodeId};
use crate::parser::block_parser::BlockParser;
use crate::parser::tables::{Cell, Row, TableData};

const ALIGN_H: &[&str] = &["left", "center", "right"];

pub(super) const TABLE_OPTIONS: OptionSpec = &[
    ("class", Conversion::ClassList),
    ("name", Conversion::Unchanged),
    ("align", Conversion::Choice(ALIGN_H)),
    ("width", Conversion::LengthOrPercentage),
    ("widths", Conversion::Widths),
];

pub(super) const CSV_OPTIONS: OptionSpec = &[
    ("header-rows", Conversion::NonNegativeInt),
    ("stub-columns", Conversion::NonNegativeInt),
    ("header", Conversion::Unchanged),
    ("width", Conversion::LengthOrPercentage),
    ("widths", Conversion::Widths),
    ("file", Conversion::Path),
    ("url", Conversion::Uri),
    ("encoding", Conversion::Required),
    ("class", Conversion::ClassList),
    ("name", Conversion::Unchanged),
    ("align", Conversion::Choice(ALIGN_H)),
    ("delim", Conversion::Character),
    ("keepspace", Conversion::Flag),
    ("quote", Conversion::Character),
    ("escape", Conversion::Character),
];

pub(super) const LIST_TABLE_OPTIONS: OptionSpec = &[
    ("header-rows", Conversion::NonNegativeInt),
    ("stub-columns", Conversion::NonNegativeInt),
    ("width", Conversion::LengthOrPercentage),
    ("widths", Conversion::Widths),
    ("class", Conversion::ClassList),
    ("name", Conversion::Unchanged),
    ("align", Conversion::Choice(ALIGN_H)),
];

/// A `table` directive waiting for its content to be parsed.
#[derive(Debug, Clone)]
pub(crate) struct TableHook {
    inv: Invocation,
    holder: NodeId,
    parent: NodeId,
    title: Option<NodeId>,
    messages: Vec<NodeId>,
}

/// A `list-table` directive waiting for its bullet list to be parsed.
#[derive(Debug, Clone)]
pub(crate) struct ListTableHook {
    inv: Invocation,
    holder: NodeId,
    parent: NodeId,
    title: Option<NodeId>,
    messages: Vec<NodeId>,
}

/// Column widths from `:widths:`, or equal shares of 100.
fn column_widths(inv: &Invocation, n_cols: usize) -> std::result::Result<Vec<usize>, String> {
    if let Some(OptionValue::Ints(widths)) = inv.options.get("widths") {
        if widths.len() != n_cols {
            return Err(format!(
                "\"{}\" widths do not match the number of columns in table ({n_cols}).",
                inv.name
            ));
        }
        return Ok(widths.clone());
    }
    if n_cols == 0 {
        return Err("No table data detected in CSV file.".to_string());
    }
    Ok(vec![100 / n_cols; n_cols])
}

fn check_dimensions(
    inv: &Invocation,
    row_lengths: &[usize],
    header_rows: usize,
    stub_columns: usize,
) -> std::result::Result<(), String> {
    let rows = row_lengths.len();
    if rows < header_rows {
        return Err(format!(
            "{header_rows} header row(s) specified but only {rows} row(s) of data supplied (\"{}\" directive).",
            inv.name
        ));
    }
    if rows == header_rows && header_rows > 0 {
        return Err(format!(
            "Insufficient data supplied ({rows} row(s)); no data remaining for table body, \
             required by \"{}\" directive.",
            inv.name
        ));
    }
    for &len in row_lengths {
        if len < stub_columns {
            return Err(format!(
                "{stub_columns} stub column(s) specified but only {len} columns(s) of data supplied (\"{}\" directive).",
                inv.name
            ));
        }
        if len == stub_columns && stub_columns > 0 {
            return Err(format!(
                "Insufficient data supplied ({len} columns(s)); no data remaining for table body, \
                 required by \"{}\" directive.",
                inv.name
            ));
        }
    }
    Ok(())
}

fn count_option(inv: &Invocation, name: &str) -> usize {
    inv.options.int(name).map_or(0, |n| n.max(0) as usize)
}

/// CSV reading options; `keepspace` off means spaces after a delimiter
/// are dropped.
struct Dialect {
    delimiter: u8,
    quote: u8,
    escape: Option<u8>,
    skip_initial_space: bool,
}

impl Dialect {
    fn from_options(inv: &Invocation) -> std::result::Result<Self, String> {
        let byte = |name: &str, default: u8| -> std::result::Result<u8, String> {
            match inv.options.text(name) {
                Some(text) => match text.as_bytes() {
                    [b] if b.is_ascii() => Ok(*b),
                    _ => Err(format!("\"{name}\" must be a single ASCII character, not {text:?}")),
                },
                None => Ok(default),
            }
        };
        Ok(Self {
            delimiter: byte("delim", b',')?,
            quote: byte("quote", b'"')?,
            escape: inv
                .options
                .text("escape")
                .map(|_| byte("escape", b'\\'))
                .transpose()?,
            skip_initial_space: !inv.options.contains("keepspace"),
        })
    }

    /// Drop spaces at the start of unquoted fields.
    fn strip_initial_space(&self, text: &str) -> String {
        let delimiter = char::from(self.delimiter);
        let quote = char::from(self.quote);
        let mut out = String::with_capacity(text.len());
        let mut in_quotes = false;
        let mut field_start = true;
        for c in text.chars() {
            if field_start && c == ' ' && !in_quotes {
                continue;
            }
            field_start = false;
            if c == quote {
                in_quotes = !in_quotes;
            } else if !in_quotes && (c == delimiter || c == '\n') {
                field_start = true;
            }
            out.push(c);
        }
        out
    }

    fn read(&self, text: &str) -> std::result::Result<Vec<Vec<String>>, String> {
        let text = if self.skip_initial_space {
            self.strip_initial_space(text)
        } else {
            text.to_string()
        };
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .quote(self.quote)
            .escape(self.escape)
            .double_quote(true)
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| e.to_string())?;
            rows.push(record.iter().map(String::from).collect());
        }
        Ok(rows)
    }
}

fn csv_rows(rows: Vec<Vec<String>>, max_cols: usize) -> Vec<Row> {
    rows.into_iter()
        .map(|row| {
            let mut cells: Row = row
                .into_iter()
                .map(|text| {
                    Some(Cell {
                        morerows: 0,
                        morecols: 0,
                        offset: 0,
                        lines: text.lines().map(String::from).collect(),
                    })
                })
                .collect();
            while cells.len() < max_cols {
                cells.push(Some(Cell {
                    morerows: 0,
                    morecols: 0,
                    offset: 0,
                    lines: Vec::new(),
                }));
            }
            cells
        })
        .collect()
}

impl BlockParser<'_> {
    fn table_title(&mut self, inv: &Invocation) -> Result<(Option<NodeId>, Vec<NodeId>)> {
        match inv.argument(0) {
            Some(text) => {
                let (title, messages) = self.directive_title(Kind::Title, text, inv.lineno)?;
                Ok((Some(title), messages))
            }
            None => Ok((None, Vec::new())),
        }
    }

    /// Options shared by all table directives.
    fn decorate_table(&mut self, table: NodeId, inv: &Invocation) -> Result<()> {
        self.add_classes(table, inv.options.classes("class"));
        if let Some(align) = inv.options.text("align") {
            self.doc.set_attr(table, "align", align);
        }
        if let Some(width) = inv.options.text("width") {
            self.doc.set_attr(table, "width", width);
        }
        match inv.options.get("widths") {
            Some(OptionValue::Text(auto)) if auto == "auto" => {
                self.doc.push_attr(table, "classes", "colwidths-auto");
            }
            Some(_) => self.doc.push_attr(table, "classes", "colwidths-given"),
            None => {}
        }
        self.add_name(table, inv)
    }

    fn table_error(&mut self, inv: &Invocation, message: String) -> Result<NodeId> {
        let literal = self.literal(&inv.block_text);
        self.doc.error(message).child(literal).line(inv.lineno).emit()
    }

    pub(super) fn table_directive(&mut self, inv: &Invocation) -> Outcome {
        if inv.content.is_empty() {
            return Err(inv.warning(format!(
                "Content block expected for the \"{}\" directive; none found.",
                inv.name
            )));
        }
        let (title, messages) = self.table_title(inv)?;
        let holder = self.doc.new_element(Kind::Container);
        let parent = self.frame.body_parent();
        self.parse_content_then(
            &inv.content,
            holder,
            DirectiveHook::Table(TableHook {
                inv: inv.clone(),
                holder,
                parent,
                title,
                messages,
            }),
        );
        Ok(Vec::new())
    }

    pub(super) fn csv_table(&mut self, inv: &Invocation) -> Outcome {
        let external = inv.options.contains("file") || inv.options.contains("url");
        if !self.doc.settings.file_insertion_enabled && external {
            return Err(inv.warning(format!(
                "File and URL access deactivated; ignoring \"{}\" directive.",
                inv.name
            )));
        }
        let (title, messages) = self.table_title(inv)?;
        let data = if !inv.content.is_empty() {
            if external {
                return Err(inv.error(format!(
                    "\"{}\" directive may not both specify an external file and have content.",
                    inv.name
                )));
            }
            inv.content_text()
        } else if let Some(file) = inv.options.text("file") {
            if inv.options.contains("url") {
                return Err(inv.error(format!(
                    "The \"file\" and \"url\" options may not be simultaneously specified for \
                     the \"{}\" directive.",
                    inv.name
                )));
            }
            let path = self.resolve_path(file);
            match std::fs::read_to_string(&path) {
                Ok(text) => text,
                Err(err) => {
                    return Err(inv.severe(format!(
                        "Problems with \"{}\" directive path:\n{err}.",
                        inv.name
                    )));
                }
            }
        } else if let Some(url) = inv.options.text("url") {
            return Err(inv.severe(format!(
                "Problems with \"{}\" directive URL \"{url}\":\nURL access is not supported.",
                inv.name
            )));
        } else {
            return Err(inv.warning(format!(
                "The \"{}\" directive requires content; none supplied.",
                inv.name
            )));
        };

        let csv_error = |detail: String| {
            inv.error(format!(
                "Error with CSV data in \"{}\" directive:\n{detail}",
                inv.name
            ))
        };
        let dialect = Dialect::from_options(inv).map_err(csv_error)?;
        let mut head = match inv.options.text("header") {
            Some(header) => dialect.read(header).map_err(csv_error)?,
            None => Vec::new(),
        };
        let rows = dialect.read(&data).map_err(csv_error)?;
        let max_cols = rows
            .iter()
            .chain(head.iter())
            .map(Vec::len)
            .max()
            .unwrap_or(0);
        let header_rows = count_option(inv, "header-rows");
        let stub_columns = count_option(inv, "stub-columns");
        let lengths: Vec<usize> = rows.iter().map(Vec::len).collect();
        check_dimensions(inv, &lengths, header_rows, stub_columns).map_err(|m| inv.error(m))?;
        let colwidths = column_widths(inv, max_cols).map_err(|m| inv.error(m))?;

        let mut rows = rows;
        let body = rows.split_off(header_rows.min(rows.len()));
        head.extend(rows);
        let data = TableData {
            colwidths,
            head: csv_rows(head, max_cols),
            body: csv_rows(body, max_cols),
        };
        let table = self.build_table(data, inv.content_offset(), stub_columns);
        self.decorate_table(table, inv)?;
        if let Some(title) = title {
            self.doc.insert(table, 0, title);
        }
        let mut output = vec![table];
        output.extend(messages);
        Ok(output)
    }

    pub(super) fn list_table(&mut self, inv: &Invocation) -> Outcome {
        if inv.content.is_empty() {
            let msg = self
                .doc
                .error(format!(
                    "The \"{}\" directive is empty; content required.",
                    inv.name
                ))
                .line(inv.lineno)
                .emit()?;
            return Err(super::Failure::Message(msg));
        }
        let (title, messages) = self.table_title(inv)?;
        let holder = self.doc.new_element(Kind::Container);
        let parent = self.frame.body_parent();
        self.parse_content_then(
            &inv.content,
            holder,
            DirectiveHook::ListTable(ListTableHook {
                inv: inv.clone(),
                holder,
                parent,
                title,
                messages,
            }),
        );
        Ok(Vec::new())
    }

    /// Resolve `path` against the directory of the including file or the
    /// document's input directory.
    pub(crate) fn resolve_path(&self, path: &str) -> PathBuf {
        let base = self
            .include_log
            .last()
            .and_then(|p| p.parent().map(PathBuf::from))
            .or_else(|| self.doc.settings.input_dir.clone())
            .unwrap_or_default();
        base.join(path)
    }
}

fn place(parser: &mut BlockParser<'_>, parent: NodeId, nodes: Vec<NodeId>) {
    parser.doc.extend(parent, nodes);
}

pub(super) fn finish_table(parser: &mut BlockParser<'_>, hook: TableHook) -> Result<()> {
    let TableHook {
        inv,
        holder,
        parent,
        title,
        messages,
    } = hook;
    let children = parser.doc.take_children(holder);
    let table = match children.as_slice() {
        [table] if parser.doc.is(*table, Kind::Table) => *table,
        _ => {
            let error = parser.table_error(
                &inv,
                format!(
                    "Error parsing content block for the \"{}\" directive: exactly one table expected.",
                    inv.name
                ),
            )?;
            place(parser, parent, vec![error]);
            return Ok(());
        }
    };
    if let Some(OptionValue::Ints(_)) = inv.options.get("widths")
        && let Some(&tgroup) = parser.doc.children(table).first()
    {
        let cols = parser.doc.get_int(tgroup, "cols").unwrap_or(0) as usize;
        let widths = match column_widths(&inv, cols) {
            Ok(widths) => widths,
            Err(message) => {
                let error = parser.table_error(&inv, message)?;
                place(parser, parent, vec![error]);
                return Ok(());
            }
        };
        let colspecs: Vec<NodeId> = parser
            .doc
            .children(tgroup)
            .iter()
            .copied()
            .filter(|&c| parser.doc.is(c, Kind::Colspec))
            .collect();
        for (colspec, width) in colspecs.into_iter().zip(widths) {
            parser.doc.set_attr(colspec, "colwidth", width);
        }
    }
    parser.decorate_table(table, &inv)?;
    if let Some(title) = title {
        parser.doc.insert(table, 0, title);
    }
    let mut output = vec![table];
    output.extend(messages);
    place(parser, parent, output);
    Ok(())
}

/// Check the two-level bullet list; returns the rows of cells.
fn list_rows(
    parser: &BlockParser<'_>,
    inv: &Invocation,
    children: &[NodeId],
) -> std::result::Result<Vec<Vec<NodeId>>, String> {
    let doc = &*parser.doc;
    let list = match children {
        [list] if doc.is(*list, Kind::BulletList) => *list,
        _ => {
            return Err(format!(
                "Error parsing content block for the \"{}\" directive: exactly one bullet list expected.",
                inv.name
            ));
        }
    };
    let mut rows = Vec::new();
    for (index, &item) in doc.children(list).iter().enumerate() {
        let sublist = match doc.children(item) {
            [sublist] if doc.is(*sublist, Kind::BulletList) => *sublist,
            _ => {
                return Err(format!(
                    "Error parsing content block for the \"{}\" directive: two-level bullet list \
                     expected, but row {} does not contain a second-level bullet list.",
                    inv.name,
                    index + 1
                ));
            }
        };
        let cells = doc.children(sublist).to_vec();
        if let Some(first) = rows.first().map(Vec::len)
            && cells.len() != first
        {
            return Err(format!(
                "Error parsing content block for the \"{}\" directive: uniform two-level bullet \
                 list expected, but row {} does not contain the same number of items as row 1 \
                 ({} vs {first}).",
                inv.name,
                index + 1,
                cells.len()
            ));
        }
        rows.push(cells);
    }
    Ok(rows)
}

pub(super) fn finish_list_table(parser: &mut BlockParser<'_>, hook: ListTableHook) -> Result<()> {
    let ListTableHook {
        inv,
        holder,
        parent,
        title,
        messages,
    } = hook;
    let children = parser.doc.take_children(holder);
    let header_rows = count_option(&inv, "header-rows");
    let mut stub_columns = count_option(&inv, "stub-columns");
    let checked = list_rows(parser, &inv, &children).and_then(|rows| {
        let num_cols = rows.first().map_or(0, Vec::len);
        let widths = column_widths(&inv, num_cols)?;
        let lengths: Vec<usize> = rows.iter().map(Vec::len).collect();
        check_dimensions(&inv, &lengths, header_rows, stub_columns)?;
        Ok((rows, widths))
    });
    let (rows, widths) = match checked {
        Ok(checked) => checked,
        Err(message) => {
            let error = parser.table_error(&inv, message)?;
            place(parser, parent, vec![error]);
            return Ok(());
        }
    };

    let doc = &mut *parser.doc;
    let table = doc.new_element(Kind::Table);
    doc.set_line(table, inv.lineno);
    let tgroup = doc.new_element(Kind::Tgroup);
    doc.set_attr(tgroup, "cols", widths.len());
    doc.append(table, tgroup);
    for width in widths {
        let colspec = doc.new_element(Kind::Colspec);
        doc.set_attr(colspec, "colwidth", width);
        if stub_columns > 0 {
            doc.set_attr(colspec, "stub", 1_i64);
            stub_columns -= 1;
        }
        doc.append(tgroup, colspec);
    }
    let mut row_nodes = Vec::with_capacity(rows.len());
    for cells in rows {
        let row = doc.new_element(Kind::Row);
        for item in cells {
            let content = doc.take_children(item);
            let entry = doc.new_element_with(Kind::Entry, content);
            doc.append(row, entry);
        }
        row_nodes.push(row);
    }
    let body = row_nodes.split_off(header_rows.min(row_nodes.len()));
    if header_rows > 0 {
        let thead = doc.new_element_with(Kind::Thead, row_nodes);
        doc.append(tgroup, thead);
    }
    let tbody = doc.new_element_with(Kind::Tbody, body);
    doc.append(tgroup, tbody);

    parser.decorate_table(table, &inv)?;
    if let Some(title) = title {
        parser.doc.insert(table, 0, title);
    }
    let mut output = vec![table];
    output.extend(messages);
    place(parser, parent, output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dialect() -> Dialect {
        Dialect {
            delimiter: b',',
            quote: b'"',
            escape: None,
            skip_initial_space: true,
        }
    }

    #[test]
    fn reads_quoted_fields_after_spaces() {
        let rows = dialect().read("a, \"b, c\", d\n1, 2, 3").unwrap();
        assert_eq!(rows, [vec!["a", "b, c", "d"], vec!["1", "2", "3"]]);
    }

    #[test]
    fn keepspace_keeps_leading_spaces() {
        let mut d = dialect();
        d.skip_initial_space = false;
        let rows = d.read("a, b").unwrap();
        assert_eq!(rows, [vec!["a", " b"]]);
    }

    #[test]
    fn multi_line_cells() {
        let rows = dialect().read("\"first\nsecond\", x").unwrap();
        assert_eq!(rows[0][0], "first\nsecond");
    }
}
