//! Shared fixtures for fund flow tests
//!
//! All tests run against sea-orm's MockDatabase, so every fixture is a fully
//! populated entity model; query results are appended in the exact order the
//! engine issues its queries.

#![allow(dead_code)]

use chrono::NaiveDate;
use rust_decimal::Decimal;

use fundtrace_backend::entities::transactions;

pub const CASE_ID: &str = "d2c8e0aa-3b55-4f7e-8f43-6f1f5f9f0c22";
pub const SEED_TX_ID: &str = "b9f4a6de-6a1c-4d22-9c6f-0d3a5f8e2b11";

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
}

fn base_tx(id: &str, tx_date: NaiveDate) -> transactions::Model {
    transactions::Model {
        id: id.to_string(),
        case_id: CASE_ID.to_string(),
        transaction_date: tx_date,
        deposit_amount: None,
        withdrawal_amount: None,
        memo: None,
        category: None,
        creditor_name: None,
        transaction_nature: None,
        important_transaction: None,
    }
}

pub fn deposit(id: &str, tx_date: NaiveDate, amount: i64) -> transactions::Model {
    transactions::Model {
        deposit_amount: Some(Decimal::from(amount)),
        ..base_tx(id, tx_date)
    }
}

pub fn withdrawal(id: &str, tx_date: NaiveDate, amount: i64) -> transactions::Model {
    transactions::Model {
        withdrawal_amount: Some(Decimal::from(amount)),
        ..base_tx(id, tx_date)
    }
}
