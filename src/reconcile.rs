use std::collections::HashSet;

use chrono::Datelike;
use uuid::Uuid;

use crate::error::LedgerError;
use crate::model::{
    Account, Category, EntryKind, MonthlySummary, ParsedBatch, ParsedTransaction, PaymentMethod,
    Transaction, cents,
};
use crate::store::Dataset;

/// Counts and failure reasons from one reconciliation pass, handed to the
/// audit log. Counted records are transactions and accounts; category and
/// payment-method resolution and summary upserts happen silently, so
/// importing the same workbook twice reports symmetric created/skipped
/// counts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileOutcome {
    pub created: u32,
    pub updated: u32,
    pub skipped: u32,
    pub failed: u32,
    pub errors: Vec<String>,
}

/// Merges parsed canonical records into the owner's dataset.
///
/// References are resolved by case-insensitive name, created on demand.
/// Conflicting transactions follow the overwrite policy; summaries are
/// cache rows and upsert unconditionally. A record that fails resolution is
/// counted and reported, never allowed to abort the batch. The caller is
/// responsible for making the whole pass atomic with respect to other
/// writers of the same owner's data.
pub fn reconcile(
    dataset: &mut Dataset,
    owner: &str,
    batch: &ParsedBatch,
    overwrite: bool,
) -> ReconcileOutcome {
    let mut outcome = ReconcileOutcome::default();

    for category in &batch.categories {
        if category.name.trim().is_empty() {
            outcome.fail("category with an empty name skipped");
            continue;
        }
        resolve_category(dataset, owner, &category.name, category.kind);
    }

    for method in &batch.payment_methods {
        if method.name.trim().is_empty() {
            outcome.fail("payment method with an empty name skipped");
            continue;
        }
        resolve_payment_method(dataset, owner, &method.name);
    }

    let mut touched_months: HashSet<(i32, u32)> = HashSet::new();
    for transaction in &batch.transactions {
        if apply_transaction(dataset, owner, transaction, overwrite, &mut outcome) {
            touched_months.insert((transaction.date.year(), transaction.date.month()));
        }
    }

    for account in &batch.accounts {
        apply_account(dataset, owner, account, overwrite, &mut outcome);
    }

    let mut incoming_months: HashSet<(i32, u32)> = HashSet::new();
    for summary in &batch.summaries {
        incoming_months.insert((summary.year, summary.month));
        upsert_summary(
            dataset,
            owner,
            summary.year,
            summary.month,
            summary.total_income,
            summary.total_expense,
        );
    }

    // Keep the cache honest for months the batch wrote into without
    // supplying its own totals.
    for (year, month) in touched_months {
        if !incoming_months.contains(&(year, month)) {
            recompute_summary(dataset, owner, year, month);
        }
    }

    outcome
}

/// Recomputes one month's cached totals from the stored transactions.
///
/// Called synchronously by the reconciler and by any transaction-mutation
/// path, inside the same atomic unit as the write it follows.
pub fn recompute_summary(dataset: &mut Dataset, owner: &str, year: i32, month: u32) {
    let mut total_income = 0.0;
    let mut total_expense = 0.0;
    for transaction in dataset.transactions_for(owner) {
        if transaction.date.year() != year || transaction.date.month() != month {
            continue;
        }
        match transaction.kind {
            EntryKind::Income => total_income += transaction.amount,
            EntryKind::Expense => total_expense += transaction.amount,
        }
    }
    upsert_summary(dataset, owner, year, month, total_income, total_expense);
}

impl ReconcileOutcome {
    fn fail(&mut self, reason: impl Into<String>) {
        self.failed += 1;
        self.errors
            .push(LedgerError::InvalidRecord(reason.into()).to_string());
    }
}

fn resolve_category(dataset: &mut Dataset, owner: &str, name: &str, kind: EntryKind) -> Uuid {
    if let Some(existing) = dataset.find_category(owner, name, kind) {
        return existing.id;
    }
    let id = Uuid::new_v4();
    dataset.categories.push(Category {
        id,
        owner: owner.to_string(),
        name: name.trim().to_string(),
        kind,
    });
    id
}

fn resolve_payment_method(dataset: &mut Dataset, owner: &str, name: &str) -> Uuid {
    if let Some(existing) = dataset.find_payment_method(owner, name) {
        return existing.id;
    }
    let id = Uuid::new_v4();
    dataset.payment_methods.push(PaymentMethod {
        id,
        owner: owner.to_string(),
        name: name.trim().to_string(),
    });
    id
}

/// Applies one incoming transaction. Returns whether the dataset changed.
///
/// Identity is the `(date, category, payment method, description)` tuple;
/// the amount participates only when deciding whether an exact duplicate
/// can be skipped, so an overwrite import updates a changed amount in place
/// instead of inserting a twin.
fn apply_transaction(
    dataset: &mut Dataset,
    owner: &str,
    incoming: &ParsedTransaction,
    overwrite: bool,
    outcome: &mut ReconcileOutcome,
) -> bool {
    let category_id = match &incoming.category {
        Some(name) if !name.trim().is_empty() => {
            Some(resolve_category(dataset, owner, name, incoming.kind))
        }
        Some(_) => {
            outcome.fail(format!(
                "transaction on {} references a category with an empty name",
                incoming.date
            ));
            return false;
        }
        None => None,
    };
    let payment_method_id = match &incoming.payment_method {
        Some(name) if !name.trim().is_empty() => {
            Some(resolve_payment_method(dataset, owner, name))
        }
        Some(_) => {
            outcome.fail(format!(
                "transaction on {} references a payment method with an empty name",
                incoming.date
            ));
            return false;
        }
        None => None,
    };

    let description = incoming.description.trim();
    let matches_identity = |existing: &Transaction| {
        existing.owner == owner
            && existing.date == incoming.date
            && existing.category_id == category_id
            && existing.payment_method_id == payment_method_id
            && existing.description.trim() == description
    };

    let position = if overwrite {
        dataset.transactions.iter().position(matches_identity)
    } else {
        dataset
            .transactions
            .iter()
            .position(|existing| {
                matches_identity(existing) && cents(existing.amount) == cents(incoming.amount)
            })
    };

    match position {
        Some(index) if overwrite => {
            let existing = &mut dataset.transactions[index];
            let unchanged = cents(existing.amount) == cents(incoming.amount)
                && existing.kind == incoming.kind
                && existing.is_legacy == incoming.is_legacy
                && existing.origin_sheet == incoming.origin_sheet
                && existing.origin_row == incoming.origin_row
                && existing.origin_month == incoming.origin_month;
            if unchanged {
                outcome.skipped += 1;
                false
            } else {
                existing.amount = incoming.amount;
                existing.kind = incoming.kind;
                existing.is_legacy = incoming.is_legacy;
                existing.origin_sheet = incoming.origin_sheet.clone();
                existing.origin_row = incoming.origin_row;
                existing.origin_month = incoming.origin_month;
                outcome.updated += 1;
                true
            }
        }
        Some(_) => {
            outcome.skipped += 1;
            false
        }
        None => {
            dataset.transactions.push(Transaction {
                id: Uuid::new_v4(),
                owner: owner.to_string(),
                date: incoming.date,
                amount: incoming.amount,
                kind: incoming.kind,
                category_id,
                payment_method_id,
                description: description.to_string(),
                is_legacy: incoming.is_legacy,
                origin_sheet: incoming.origin_sheet.clone(),
                origin_row: incoming.origin_row,
                origin_month: incoming.origin_month,
            });
            outcome.created += 1;
            true
        }
    }
}

fn apply_account(
    dataset: &mut Dataset,
    owner: &str,
    incoming: &crate::model::ParsedAccount,
    overwrite: bool,
    outcome: &mut ReconcileOutcome,
) {
    let description = incoming.description.trim();
    if description.is_empty() {
        outcome.fail("account with an empty description skipped");
        return;
    }

    let matches_identity = |existing: &Account| {
        existing.owner == owner
            && existing.description.trim() == description
            && existing.due_date == incoming.due_date
    };

    let position = if overwrite {
        dataset.accounts.iter().position(matches_identity)
    } else {
        dataset.accounts.iter().position(|existing| {
            matches_identity(existing) && cents(existing.amount) == cents(incoming.amount)
        })
    };

    match position {
        Some(index) if overwrite => {
            let existing = &mut dataset.accounts[index];
            let unchanged = cents(existing.amount) == cents(incoming.amount)
                && existing.paid == incoming.paid
                && existing.paid_date == incoming.paid_date;
            if unchanged {
                outcome.skipped += 1;
            } else {
                existing.amount = incoming.amount;
                existing.paid = incoming.paid;
                existing.paid_date = incoming.paid_date;
                outcome.updated += 1;
            }
        }
        Some(_) => {
            outcome.skipped += 1;
        }
        None => {
            dataset.accounts.push(Account {
                id: Uuid::new_v4(),
                owner: owner.to_string(),
                description: description.to_string(),
                amount: incoming.amount,
                due_date: incoming.due_date,
                paid: incoming.paid,
                paid_date: incoming.paid_date,
            });
            outcome.created += 1;
        }
    }
}

fn upsert_summary(
    dataset: &mut Dataset,
    owner: &str,
    year: i32,
    month: u32,
    total_income: f64,
    total_expense: f64,
) {
    let existing = dataset
        .summaries
        .iter_mut()
        .find(|summary| summary.owner == owner && summary.year == year && summary.month == month);
    match existing {
        Some(summary) => {
            summary.total_income = total_income;
            summary.total_expense = total_expense;
        }
        None => {
            dataset.summaries.push(MonthlySummary {
                owner: owner.to_string(),
                year,
                month,
                total_income,
                total_expense,
            });
        }
    }
}
