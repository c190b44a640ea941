use colored::Colorize;
use libsplitledger::{Command, LedgerIndex};
use rustyline::{
    completion::{Completer, Pair},
    highlight::Highlighter,
    hint::{Hinter, HistoryHinter},
    validate::{ValidationContext, ValidationResult, Validator},
    Context, Helper,
};

use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::Rc;

/// What the word under the cursor stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    Verb,
    Account,
    Currency,
    Nothing,
}

/// Find the slot of the word ending at the end of `before`, along with the
/// byte offset the word starts at.
pub fn slot_at(before: &str) -> (usize, Slot) {
    let start = before
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace())
        .map(|(idx, c)| idx + c.len_utf8())
        .unwrap_or(0);
    let mut words = before[..start].split_whitespace();
    let verb = words.next();
    let position = verb.map_or(0, |_| 1 + words.count());
    let word = &before[start..];

    let slot = match (verb, position) {
        (_, 0) => Slot::Verb,
        (Some("a"), 1) | (Some("s"), 1 | 2) | (Some("f"), 1) => Slot::Account,
        (Some("a"), _) | (Some("s"), _) => Slot::Currency,
        _ => Slot::Nothing,
    };
    match slot {
        Slot::Currency if word.starts_with(|c: char| c.is_ascii_digit()) => (start, Slot::Nothing),
        Slot::Currency => (start + word.len() - word.trim_start_matches('-').len(), slot),
        _ => (start, slot),
    }
}

pub struct LedgerHelper {
    index: Rc<RefCell<LedgerIndex>>,
    /// Command completion only makes sense once a header has been entered.
    pub accepting_commands: bool,
    hinter: HistoryHinter,
}

impl LedgerHelper {
    pub fn new(index: Rc<RefCell<LedgerIndex>>) -> Self {
        LedgerHelper {
            index,
            accepting_commands: false,
            hinter: HistoryHinter::new(),
        }
    }

    pub fn candidates(&self, line: &str, pos: usize) -> (usize, Vec<Pair>) {
        let before = &line[..pos];
        let (start, slot) = slot_at(before);
        if !self.accepting_commands {
            return (start, Vec::new());
        }

        let word = &before[start..];
        let index = self.index.borrow();
        let matches: Vec<&str> = match slot {
            Slot::Verb => Command::verbs()
                .iter()
                .copied()
                .filter(|verb| verb.starts_with(word))
                .collect(),
            Slot::Account => index.complete_accounts(word),
            Slot::Currency => index.complete_currencies(word),
            Slot::Nothing => Vec::new(),
        };
        let candidates = matches
            .into_iter()
            .map(|candidate| Pair {
                display: candidate.to_string(),
                replacement: candidate.to_string(),
            })
            .collect();
        (start, candidates)
    }
}

impl Helper for LedgerHelper {}

impl Completer for LedgerHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        Ok(self.candidates(line, pos))
    }
}

/// Suggests the rest of the latest history entry the line is a prefix of.
impl Hinter for LedgerHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, ctx: &Context<'_>) -> Option<String> {
        self.hinter.hint(line, pos, ctx)
    }
}

impl Highlighter for LedgerHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        Cow::Borrowed(line)
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(hint.dimmed().to_string())
    }
}

impl Validator for LedgerHelper {
    fn validate(&self, _ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        Ok(ValidationResult::Valid(None))
    }
}

#[cfg(test)]
mod tests {
    use crate::completion::{slot_at, LedgerHelper, Slot};
    use libsplitledger::LedgerIndex;
    use rustyline::{
        hint::Hinter,
        history::{DefaultHistory, History},
        Context,
    };

    use anyhow::Result;
    use std::cell::RefCell;
    use std::rc::Rc;

    const LEDGER: &str = "\
2020-01-10 Groceries
    Expenses:Food       €5.95
    Expenses:Hygiene    120 CZK
    Assets:Checking
";

    #[test]
    fn test_slots() {
        assert_eq!(slot_at(""), (0, Slot::Verb));
        assert_eq!(slot_at("a Exp"), (2, Slot::Account));
        assert_eq!(slot_at("s Debts:Roomie Ex"), (15, Slot::Account));
        assert_eq!(slot_at("s Debts:Roomie Debts:Me "), (24, Slot::Currency));
        assert_eq!(slot_at("a Expenses:Food -€"), (17, Slot::Currency));
        assert_eq!(slot_at("a Expenses:Food 12"), (16, Slot::Nothing));
        assert_eq!(slot_at("a Expenses:Food 12 CZ"), (19, Slot::Currency));
        assert_eq!(slot_at("f Assets:Cash "), (14, Slot::Nothing));
        assert_eq!(slot_at("x "), (2, Slot::Nothing));
        assert_eq!(slot_at("a\u{a0}Exp"), (3, Slot::Account));
        assert_eq!(slot_at("s\u{3000}A\u{a0}B\u{a0}-€"), (11, Slot::Currency));
    }

    #[test]
    fn test_candidates() {
        let index = Rc::new(RefCell::new(LedgerIndex::scan(LEDGER)));
        let mut helper = LedgerHelper::new(index);

        let (_, candidates) = helper.candidates("a Exp", 5);
        assert!(candidates.is_empty());

        helper.accepting_commands = true;
        let (start, candidates) = helper.candidates("a Exp", 5);
        assert_eq!(start, 2);
        let replacements: Vec<_> = candidates.iter().map(|c| c.replacement.as_str()).collect();
        assert_eq!(replacements, vec!["Expenses:Food", "Expenses:Hygiene"]);

        let (start, candidates) = helper.candidates("a Expenses:Food 12 C", 20);
        assert_eq!(start, 19);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].replacement, "CZK");

        let (_, candidates) = helper.candidates("", 0);
        assert_eq!(candidates.len(), 3);
    }

    #[test]
    fn test_history_hints() -> Result<()> {
        let index = Rc::new(RefCell::new(LedgerIndex::scan(LEDGER)));
        let helper = LedgerHelper::new(index);
        let mut history = DefaultHistory::new();

        assert_eq!(helper.hint("a Ex", 4, &Context::new(&history)), None);

        history.add("a Expenses:Food €5")?;
        history.add("f Assets:Checking")?;
        let ctx = Context::new(&history);
        assert_eq!(helper.hint("a Ex", 4, &ctx), Some("penses:Food €5".to_string()));
        assert_eq!(helper.hint("a Ex", 2, &ctx), None);
        assert_eq!(helper.hint("s ", 2, &ctx), None);
        Ok(())
    }
}
