use crate::completion::LedgerHelper;

use colored::Colorize;
use libsplitledger::{
    store, writer, BuilderState, Command, LedgerError, LedgerIndex, Transaction, TransactionBuilder,
};
use rustyline::{error::ReadlineError, history::DefaultHistory, Cmd, Editor, KeyEvent};
use tracing::{debug, warn};

use std::cell::RefCell;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::rc::Rc;

const DISCARD: &str = "d";

/// One interactive session against a single ledger file.
pub struct Session {
    path: PathBuf,
    dry_run: bool,
    index: Rc<RefCell<LedgerIndex>>,
    builder: TransactionBuilder,
    /// Finished transaction whose save failed.
    pending: Option<Transaction>,
}

impl Session {
    pub fn new(path: PathBuf, index: LedgerIndex, dry_run: bool) -> Self {
        Session {
            path,
            dry_run,
            index: Rc::new(RefCell::new(index)),
            builder: TransactionBuilder::new(),
            pending: None,
        }
    }

    pub fn prompt(&self) -> &'static str {
        if self.pending.is_some() {
            "retry> "
        } else if self.builder.state() == BuilderState::Accumulating {
            "change> "
        } else {
            "header> "
        }
    }

    pub fn accepting_commands(&self) -> bool {
        self.pending.is_none() && self.builder.state() == BuilderState::Accumulating
    }

    pub fn pending(&self) -> Option<&Transaction> {
        self.pending.as_ref()
    }

    pub fn builder(&self) -> &TransactionBuilder {
        &self.builder
    }

    pub fn handle_line(&mut self, line: &str) {
        if self.pending.is_some() {
            match line.trim() {
                "" => self.save_pending(),
                DISCARD => {
                    self.pending = None;
                    println!("{}", "pending transaction discarded".yellow());
                }
                _ => report(&LedgerError::InvalidState(
                    "a transaction is waiting to be saved, press enter to retry or `d' to discard it"
                        .to_string(),
                )),
            }
            return;
        }

        match self.builder.state() {
            BuilderState::Accumulating => self.handle_command(line),
            BuilderState::AwaitingHeader | BuilderState::Finalized => {
                if line.trim().is_empty() {
                    return;
                }
                self.builder.reset();
                if let Err(err) = self.builder.start_header_line(line) {
                    report(&err);
                }
            }
        }
    }

    fn handle_command(&mut self, line: &str) {
        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(err) => return report(&err),
        };
        let accounts = command.accounts();

        match self.builder.apply(command) {
            Ok(finished) => {
                self.note_unknown(&accounts);
                match finished {
                    Some(transaction) => {
                        self.builder.reset();
                        self.pending = Some(transaction);
                        self.save_pending();
                    }
                    None => self.print_totals(),
                }
            }
            Err(err) => report(&err),
        }
    }

    fn note_unknown(&self, accounts: &[&str]) {
        let index = self.index.borrow();
        for account in accounts.iter().filter(|account| !index.has_account(account)) {
            println!(
                "{}",
                format!("note: `{}' is not in the ledger yet", account).yellow()
            );
        }
    }

    fn print_totals(&self) {
        let index = self.index.borrow();
        let totals: Vec<String> = self
            .builder
            .totals()
            .map(|total| match index.style(total.currency()) {
                Some(style) => total.render(style),
                None => total.to_string(),
            })
            .collect();
        if self.builder.imbalance().is_empty() {
            println!("{} {}", "balanced:".green(), totals.join(", "));
        } else {
            println!("{} {}", "totals:".cyan(), totals.join(", "));
        }
    }

    fn save_pending(&mut self) {
        let Some(transaction) = self.pending.take() else {
            return;
        };
        match self.save(&transaction) {
            Ok(()) => self.index.borrow_mut().absorb(&transaction),
            Err(err) => {
                report(&err);
                println!(
                    "{}",
                    "transaction kept, press enter to retry or `d' to discard it".yellow()
                );
                self.pending = Some(transaction);
            }
        }
    }

    /// Insert against the file as it is right now, not as it was at startup.
    fn save(&self, transaction: &Transaction) -> Result<(), LedgerError> {
        let original = store::load(&self.path)?;
        let insertion = writer::insert(&original, transaction);
        print!("{}", writer::Layout::detect(&original).render(transaction));

        if self.dry_run {
            println!("{}", "dry run, ledger left untouched".yellow());
            return Ok(());
        }
        store::replace(&self.path, &insertion.content)?;
        println!(
            "{}",
            format!("saved to {}", self.path.display()).green()
        );
        Ok(())
    }

    /// Ctrl-C: forget the transaction being typed in.
    pub fn abandon(&mut self) {
        if self.builder.state() == BuilderState::Accumulating {
            println!("{}", "transaction abandoned".yellow());
        }
        self.builder.reset();
    }

    fn finish(&self) {
        if self.pending().is_some() {
            warn!("exiting with an unsaved transaction");
            println!("{}", "unsaved transaction discarded".yellow());
        } else if !self.builder().postings().is_empty() {
            println!("{}", "unfinished transaction discarded".yellow());
        }
    }
}

fn report(err: &LedgerError) {
    eprintln!("{} {}", "error:".red().bold(), err);
}

pub fn run_interactive(session: &mut Session, history: Option<&Path>) -> anyhow::Result<()> {
    let mut editor = Editor::<LedgerHelper, DefaultHistory>::new()?;
    editor.set_helper(Some(LedgerHelper::new(Rc::clone(&session.index))));
    editor.bind_sequence(KeyEvent::alt('/'), Cmd::Complete);
    editor.bind_sequence(KeyEvent::alt('n'), Cmd::HistorySearchForward);
    editor.bind_sequence(KeyEvent::alt('p'), Cmd::HistorySearchBackward);

    if let Some(path) = history {
        if let Err(err) = editor.load_history(path) {
            debug!(%err, path = %path.display(), "no history loaded");
        }
    }

    loop {
        if let Some(helper) = editor.helper_mut() {
            helper.accepting_commands = session.accepting_commands();
        }

        match editor.readline(session.prompt()) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    editor.add_history_entry(line.as_str())?;
                }
                session.handle_line(&line);
            }
            Err(ReadlineError::Interrupted) => session.abandon(),
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        }
    }

    if let Some(path) = history {
        if let Err(err) = editor.save_history(path) {
            warn!(%err, path = %path.display(), "could not save history");
        }
    }
    session.finish();
    Ok(())
}

pub fn run_script(session: &mut Session) -> anyhow::Result<()> {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        session.handle_line(&line?);
    }
    session.finish();
    Ok(())
}
