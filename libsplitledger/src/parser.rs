use crate::money::ParsedAmount;
use crate::LedgerError;
use anyhow::anyhow;
use chrono::{Local, NaiveDate};
use pest::Parser;
use tracing::trace;

#[derive(Parser)]
#[grammar = "ledger.pest"]
pub struct LedgerParser;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];

/// Parse a transaction date, accepting `today` and `yesterday` as well.
pub fn parse_date(text: &str) -> Result<NaiveDate, LedgerError> {
    let text = text.trim();
    let invalid = || LedgerError::InvalidDate(text.to_string());
    match text {
        "today" => return Ok(Local::now().date_naive()),
        "yesterday" => return Local::now().date_naive().pred_opt().ok_or_else(invalid),
        _ => {}
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .ok_or_else(invalid)
}

/// Strip the double quotes ledger puts around symbols such as `"M&M"`.
pub fn unquote(symbol: &str) -> &str {
    symbol
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(symbol)
}

/// One physical line of a ledger file.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawLine<'c> {
    /// Byte offset of the first byte of the line.
    pub offset: usize,
    /// The line without its terminator.
    pub text: &'c str,
    /// Length in bytes including the terminator.
    pub len: usize,
}

impl RawLine<'_> {
    pub fn end(&self) -> usize {
        self.offset + self.len
    }
}

pub fn lines(content: &str) -> impl Iterator<Item = RawLine<'_>> {
    content.split_inclusive('\n').scan(0usize, |offset, full| {
        let start = *offset;
        *offset += full.len();
        let text = match full.strip_suffix('\n') {
            Some(text) => text.strip_suffix('\r').unwrap_or(text),
            None => full,
        };
        Some(RawLine {
            offset: start,
            text,
            len: full.len(),
        })
    })
}

#[derive(Clone, Debug, PartialEq)]
pub struct HeaderLine<'l> {
    pub date: NaiveDate,
    pub date_sep: char,
    pub description: &'l str,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PostingLine<'l> {
    pub indent: &'l str,
    pub account: &'l str,
    pub amount: Option<ParsedAmount<'l>>,
    /// Character column the amount starts at, unless tabs make it ambiguous.
    pub amount_column: Option<usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Line<'l> {
    Blank,
    Comment { indented: bool },
    Header(HeaderLine<'l>),
    Posting(PostingLine<'l>),
    /// Automated (`=`) and periodic (`~`) entries, which carry postings but no date.
    Automated,
    AccountDirective(&'l str),
    CommodityDirective {
        symbol: &'l str,
        amount: Option<ParsedAmount<'l>>,
    },
    /// Looked like a header or a posting but did not parse.
    Unparsed { indented: bool },
    Other,
}

impl Line<'_> {
    pub fn is_indented_content(&self) -> bool {
        matches!(
            self,
            Line::Posting(_) | Line::Comment { indented: true } | Line::Unparsed { indented: true }
        )
    }
}

/// Classify one line of ledger content. Never fails: anything we cannot make
/// sense of ends up as [`Line::Unparsed`] or [`Line::Other`].
pub fn classify(text: &str) -> Line<'_> {
    if text.trim().is_empty() {
        return Line::Blank;
    }

    if text.starts_with(|c: char| c == ' ' || c == '\t') {
        if text.trim_start().starts_with(';') {
            return Line::Comment { indented: true };
        }
        return parse_posting(text).unwrap_or_else(|err| {
            trace!(%err, line = text, "skipping unparseable posting");
            Line::Unparsed { indented: true }
        });
    }

    let parsed = match text.chars().next() {
        Some(';' | '#' | '%' | '|' | '*') => return Line::Comment { indented: false },
        Some('=' | '~') => return Line::Automated,
        Some(c) if c.is_ascii_digit() => parse_header(text),
        _ if text.starts_with("account") => parse_account_directive(text),
        _ if text.starts_with("commodity") => parse_commodity_directive(text),
        _ => return Line::Other,
    };

    parsed.unwrap_or_else(|err| {
        trace!(%err, line = text, "skipping unparseable line");
        Line::Unparsed { indented: false }
    })
}

fn parse_header(text: &str) -> anyhow::Result<Line<'_>> {
    let header = LedgerParser::parse(Rule::header, text)?
        .next()
        .ok_or(anyhow!("invalid next token, expected header"))?;
    let mut pairs = header.into_inner();
    let date_str = pairs
        .next()
        .ok_or(anyhow!("invalid next token, expected date str"))?
        .as_str();
    let description = pairs
        .find(|pair| pair.as_rule() == Rule::description)
        .map(|pair| pair.as_str().trim_end())
        .unwrap_or("");

    Ok(Line::Header(HeaderLine {
        date: parse_date(date_str)?,
        date_sep: date_str.chars().nth(4).unwrap_or('-'),
        description,
    }))
}

fn parse_posting(text: &str) -> anyhow::Result<Line<'_>> {
    let posting = LedgerParser::parse(Rule::posting, text)?
        .next()
        .ok_or(anyhow!("invalid next token, expected posting"))?;

    let mut line = PostingLine {
        indent: "",
        account: "",
        amount: None,
        amount_column: None,
    };
    for pair in posting.into_inner() {
        match pair.as_rule() {
            Rule::indent => line.indent = pair.as_str(),
            Rule::account => line.account = pair.as_str(),
            Rule::amount => {
                let lead = &text[..pair.as_span().start()];
                line.amount_column = (!lead.contains('\t')).then(|| lead.chars().count());
                line.amount = Some(ParsedAmount::parse(pair)?);
            }
            _ => {}
        }
    }

    Ok(Line::Posting(line))
}

fn parse_account_directive(text: &str) -> anyhow::Result<Line<'_>> {
    let directive = LedgerParser::parse(Rule::account_directive, text)?
        .next()
        .ok_or(anyhow!("invalid next token, expected account directive"))?;
    let account = directive
        .into_inner()
        .find(|pair| pair.as_rule() == Rule::account)
        .ok_or(anyhow!("invalid next token, expected account"))?;
    Ok(Line::AccountDirective(account.as_str()))
}

fn parse_commodity_directive(text: &str) -> anyhow::Result<Line<'_>> {
    let directive = LedgerParser::parse(Rule::commodity_directive, text)?
        .next()
        .ok_or(anyhow!("invalid next token, expected commodity directive"))?;
    let pair = directive
        .into_inner()
        .next()
        .ok_or(anyhow!("invalid next token, expected commodity"))?;

    match pair.as_rule() {
        Rule::amount => {
            let amount = ParsedAmount::parse(pair)?;
            Ok(Line::CommodityDirective {
                symbol: amount.symbol,
                amount: Some(amount),
            })
        }
        Rule::symbol => Ok(Line::CommodityDirective {
            symbol: unquote(pair.as_str()),
            amount: None,
        }),
        _ => Err(anyhow!("unexpected token for commodity: '{}'", pair.as_str())),
    }
}

#[cfg(test)]
mod tests {
    use crate::money::Position;
    use crate::parser::{classify, lines, parse_date, unquote, Line};
    use crate::LedgerError;
    use chrono::NaiveDate;

    use anyhow::{anyhow, Result};

    #[test]
    fn test_parse_date_formats() -> Result<()> {
        let expected = NaiveDate::from_ymd_opt(2020, 1, 10).ok_or(anyhow!("invalid date"))?;
        assert_eq!(parse_date("2020-01-10")?, expected);
        assert_eq!(parse_date("2020/01/10")?, expected);
        assert_eq!(parse_date("2020.1.10")?, expected);
        assert!(matches!(
            parse_date("2020-13-10"),
            Err(LedgerError::InvalidDate(text)) if text == "2020-13-10"
        ));
        assert!(matches!(parse_date("soon"), Err(LedgerError::InvalidDate(_))));
        Ok(())
    }

    #[test]
    fn test_parse_relative_dates() -> Result<()> {
        let today = parse_date("today")?;
        assert_eq!(parse_date("yesterday")?.succ_opt(), Some(today));
        Ok(())
    }

    #[test]
    fn test_lines_offsets() {
        let content = "a\r\nbb\n\nccc";
        let collected: Vec<_> = lines(content).map(|l| (l.offset, l.text, l.len)).collect();
        assert_eq!(
            collected,
            vec![(0, "a", 3), (3, "bb", 3), (6, "", 1), (7, "ccc", 3)]
        );
    }

    #[test]
    fn test_classify_header() -> Result<()> {
        let Line::Header(header) = classify("2021/04/01=2021/04/03 * Gubuk mang Engking  ") else {
            return Err(anyhow!("expected header"));
        };
        assert_eq!(
            header.date,
            NaiveDate::from_ymd_opt(2021, 4, 1).ok_or(anyhow!("invalid date"))?
        );
        assert_eq!(header.date_sep, '/');
        assert_eq!(header.description, "* Gubuk mang Engking");

        assert_eq!(classify("2021-02-30 Not a day"), Line::Unparsed { indented: false });
        Ok(())
    }

    #[test]
    fn test_classify_posting() -> Result<()> {
        let Line::Posting(posting) = classify("    Expenses:Dining     €5.00 ; lunch") else {
            return Err(anyhow!("expected posting"));
        };
        assert_eq!(posting.indent, "    ");
        assert_eq!(posting.account, "Expenses:Dining");
        assert_eq!(posting.amount_column, Some(24));
        let amount = posting.amount.ok_or(anyhow!("expected amount"))?;
        assert_eq!(amount.symbol, "€");
        assert_eq!(amount.style.position, Position::Prefix);

        let Line::Posting(posting) = classify("\t* Assets:Cash\t-50 USD") else {
            return Err(anyhow!("expected posting"));
        };
        assert_eq!(posting.account, "Assets:Cash");
        assert_eq!(posting.amount_column, None);
        let amount = posting.amount.ok_or(anyhow!("expected amount"))?;
        assert!(amount.negative);
        assert_eq!(amount.symbol, "USD");
        assert_eq!(amount.style.position, Position::Suffix);

        let Line::Posting(posting) = classify("    Assets:Checking") else {
            return Err(anyhow!("expected posting"));
        };
        assert_eq!(posting.amount, None);
        Ok(())
    }

    #[test]
    fn test_classify_misc() {
        assert_eq!(classify("   \t"), Line::Blank);
        assert_eq!(classify("; note"), Line::Comment { indented: false });
        assert_eq!(classify("    ; note"), Line::Comment { indented: true });
        assert_eq!(classify("~ Monthly"), Line::Automated);
        assert_eq!(classify("include other.ledger"), Line::Other);
        assert_eq!(
            classify("account Assets:Bank:Jago"),
            Line::AccountDirective("Assets:Bank:Jago")
        );
        assert!(matches!(
            classify("commodity \"M&M\""),
            Line::CommodityDirective { symbol: "M&M", amount: None }
        ));
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("\"M&M\""), "M&M");
        assert_eq!(unquote("EUR"), "EUR");
    }
}
