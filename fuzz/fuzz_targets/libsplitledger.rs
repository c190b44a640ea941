#![no_main]

use chrono::NaiveDate;
use libfuzzer_sys::fuzz_target;
use libsplitledger::{insert, Header, LedgerIndex, Money, Posting, Transaction};
use rust_decimal::Decimal;

fuzz_target!(|data: &[u8]| {
    let Ok(content) = std::str::from_utf8(data) else {
        return;
    };
    let index = LedgerIndex::scan(content);
    let _ = index.complete_accounts("");

    let Some(date) = NaiveDate::from_ymd_opt(2020, 1, 15) else {
        return;
    };
    let Ok(transaction) = Transaction::new(
        Header {
            date,
            description: "Dinner".to_string(),
        },
        vec![
            Posting::new("Expenses:Food", Money::new(Decimal::new(1250, 2), "€")),
            Posting::open("Assets:Checking"),
        ],
    ) else {
        return;
    };

    let insertion = insert(content, &transaction);
    let mut restored = insertion.content.clone();
    restored.replace_range(insertion.range(), "");
    assert_eq!(restored, content);
});
