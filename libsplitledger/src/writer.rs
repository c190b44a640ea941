use crate::money::{observe_style, CommodityStyle, Styles};
use crate::parser::{classify, lines, Line};
use crate::transaction::Transaction;

use chrono::Datelike;
use indexmap::IndexMap;
use tracing::debug;

use std::hash::Hash;
use std::ops::Range;

const DEFAULT_INDENT: &str = "    ";
const DEFAULT_SEPARATOR: usize = 1;

/// Minimum number of spaces between an account and its amount.
const ACCOUNT_GAP: usize = 2;

/// How transactions are written into a particular ledger file.
#[derive(Clone, Debug, PartialEq)]
pub struct Layout {
    pub indent: String,
    /// Blank lines between two transactions.
    pub separator: usize,
    pub newline: &'static str,
    /// Character column amounts start at. `None` aligns them two spaces after
    /// the longest account of the transaction.
    pub amount_column: Option<usize>,
    pub date_sep: char,
    pub styles: Styles,
}

impl Default for Layout {
    fn default() -> Self {
        Layout {
            indent: DEFAULT_INDENT.to_string(),
            separator: DEFAULT_SEPARATOR,
            newline: "\n",
            amount_column: None,
            date_sep: '-',
            styles: Styles::new(),
        }
    }
}

/// Most frequent key, the earliest seen one on ties.
fn most_common<T: Clone + Eq + Hash>(counts: &IndexMap<T, usize>) -> Option<T> {
    let mut best: Option<(&T, usize)> = None;
    for (value, &count) in counts {
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value.clone())
}

fn tally<T: Eq + Hash>(counts: &mut IndexMap<T, usize>, value: T) {
    *counts.entry(value).or_insert(0) += 1;
}

impl Layout {
    /// Learn the conventions of existing ledger content. Anything the content
    /// does not show falls back to [`Layout::default`].
    pub fn detect(content: &str) -> Self {
        let mut indents = IndexMap::new();
        let mut columns = IndexMap::new();
        let mut separators = IndexMap::new();
        let mut date_seps = IndexMap::new();
        let mut styles = Styles::new();
        let (mut crlf, mut lf) = (0usize, 0usize);

        let mut in_block = false;
        // Blank lines seen since the last block ended.
        let mut gap: Option<usize> = None;

        for raw in lines(content) {
            match raw.len - raw.text.len() {
                2 => crlf += 1,
                1 => lf += 1,
                _ => {}
            }

            let line = classify(raw.text);
            match &line {
                Line::Header(_) | Line::Automated => {
                    if let Line::Header(header) = &line {
                        tally(&mut date_seps, header.date_sep);
                    }
                    let blanks = if in_block { Some(0) } else { gap };
                    if let Some(blanks) = blanks {
                        tally(&mut separators, blanks);
                    }
                    in_block = true;
                    gap = None;
                }
                Line::Posting(posting) if in_block => {
                    tally(&mut indents, posting.indent);
                    if let Some(amount) = &posting.amount {
                        observe_style(&mut styles, amount);
                        if let Some(column) = posting.amount_column {
                            tally(&mut columns, column);
                        }
                    }
                }
                _ if in_block && line.is_indented_content() => {}
                Line::Blank => {
                    gap = if in_block { Some(1) } else { gap.map(|n| n + 1) };
                    in_block = false;
                }
                _ => {
                    in_block = false;
                    gap = None;
                }
            }
        }

        let layout = Layout {
            indent: most_common(&indents)
                .unwrap_or(DEFAULT_INDENT)
                .to_string(),
            separator: most_common(&separators).unwrap_or(DEFAULT_SEPARATOR),
            newline: if crlf > lf { "\r\n" } else { "\n" },
            amount_column: most_common(&columns),
            date_sep: most_common(&date_seps).unwrap_or('-'),
            styles,
        };
        debug!(
            indent = ?layout.indent,
            separator = layout.separator,
            amount_column = ?layout.amount_column,
            "layout detected"
        );
        layout
    }

    pub fn style(&self, symbol: &str) -> CommodityStyle {
        self.styles
            .get(symbol)
            .copied()
            .unwrap_or_else(|| CommodityStyle::default_for(symbol))
    }

    /// Serialize a transaction: the header line, then one indented line per
    /// posting, every line terminated.
    pub fn render(&self, transaction: &Transaction) -> String {
        let date = transaction.date();
        let sep = self.date_sep;
        let mut out = format!(
            "{:04}{sep}{:02}{sep}{:02}",
            date.year(),
            date.month(),
            date.day()
        );
        let description = &transaction.header().description;
        if !description.is_empty() {
            out.push(' ');
            out.push_str(description);
        }
        out.push_str(self.newline);

        let indent_width = self.indent.chars().count();
        let widest = transaction
            .postings()
            .iter()
            .map(|posting| posting.account().chars().count())
            .max()
            .unwrap_or(0);
        let column = self
            .amount_column
            .unwrap_or(0)
            .max(indent_width + widest + ACCOUNT_GAP);

        for posting in transaction.postings() {
            out.push_str(&self.indent);
            out.push_str(posting.account());
            if let Some(amount) = posting.amount() {
                let used = indent_width + posting.account().chars().count();
                out.push_str(&" ".repeat(column - used));
                out.push_str(&amount.render(&self.style(amount.currency())));
            }
            out.push_str(self.newline);
        }
        out
    }
}

/// New ledger content with one transaction inserted.
///
/// `content[offset..offset + len]` is the inserted text. Removing it gives
/// back the original content byte for byte.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Insertion {
    pub content: String,
    pub offset: usize,
    pub len: usize,
}

impl Insertion {
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }

    pub fn inserted(&self) -> &str {
        &self.content[self.range()]
    }
}

/// Place `transaction` right before the first transaction dated strictly
/// later, or at the end of `original` when there is none. Unindented comment
/// lines directly above that transaction stay with it.
pub fn insert(original: &str, transaction: &Transaction) -> Insertion {
    let layout = Layout::detect(original);
    let block = layout.render(transaction);

    let raw_lines: Vec<_> = lines(original).collect();
    let later = raw_lines.iter().position(|raw| {
        matches!(classify(raw.text), Line::Header(header) if header.date > transaction.date())
    });
    let later = later.map(|idx| {
        let attached = raw_lines[..idx]
            .iter()
            .rev()
            .take_while(|raw| classify(raw.text) == Line::Comment { indented: false })
            .count();
        raw_lines[idx - attached].offset
    });
    let (offset, text) = match later {
        Some(offset) => (offset, block + &layout.newline.repeat(layout.separator)),
        None => (original.len(), appended(original, &layout, block)),
    };
    debug!(offset, len = text.len(), date = %transaction.date(), "transaction placed");

    let mut content = String::with_capacity(original.len() + text.len());
    content.push_str(&original[..offset]);
    content.push_str(&text);
    content.push_str(&original[offset..]);

    Insertion {
        content,
        offset,
        len: text.len(),
    }
}

fn appended(original: &str, layout: &Layout, block: String) -> String {
    let mut text = String::new();
    if !original.is_empty() && !original.ends_with('\n') {
        text.push_str(layout.newline);
    }
    if !original.trim().is_empty() {
        let trailing_blanks = lines(original).fold(0, |blanks, raw| {
            if raw.text.trim().is_empty() {
                blanks + 1
            } else {
                0
            }
        });
        text.push_str(&layout.newline.repeat(layout.separator.saturating_sub(trailing_blanks)));
    }
    text + &block
}
