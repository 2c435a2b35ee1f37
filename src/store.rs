use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::model::{
    Account, Category, EntryKind, ImportLogEntry, MonthlySummary, PaymentMethod, Transaction,
    UserConfig,
};

/// The full financial state the engine reads and writes. Rows for every
/// owner live side by side; every query filters by owner, and the engine
/// never reads or writes across owners.
///
/// Persistence is a single JSON document. Per-owner write serialization is
/// the caller's concern; the dataset itself is synchronous and
/// single-writer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub categories: Vec<Category>,
    pub payment_methods: Vec<PaymentMethod>,
    pub accounts: Vec<Account>,
    pub transactions: Vec<Transaction>,
    pub summaries: Vec<MonthlySummary>,
    pub configs: Vec<UserConfig>,
    pub import_logs: Vec<ImportLogEntry>,
}

impl Dataset {
    /// Loads the dataset from a JSON file. A missing file is an empty
    /// dataset, not an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// Saves the dataset to a JSON file, writing to a temporary sibling and
    /// renaming so a crash cannot leave a half-written store behind.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let temp_path = path.with_extension("json.tmp");
        {
            let file = File::create(&temp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, self)?;
            writer.flush()?;
        }
        fs::rename(&temp_path, path)?;
        Ok(())
    }

    /// Case-insensitive category lookup within one owner's set. Identity is
    /// `(owner, name, kind)`.
    pub fn find_category(&self, owner: &str, name: &str, kind: EntryKind) -> Option<&Category> {
        let needle = name.trim().to_lowercase();
        self.categories.iter().find(|category| {
            category.owner == owner
                && category.kind == kind
                && category.name.trim().to_lowercase() == needle
        })
    }

    /// Case-insensitive payment-method lookup within one owner's set.
    pub fn find_payment_method(&self, owner: &str, name: &str) -> Option<&PaymentMethod> {
        let needle = name.trim().to_lowercase();
        self.payment_methods.iter().find(|method| {
            method.owner == owner && method.name.trim().to_lowercase() == needle
        })
    }

    pub fn category_by_id(&self, id: Uuid) -> Option<&Category> {
        self.categories.iter().find(|category| category.id == id)
    }

    pub fn payment_method_by_id(&self, id: Uuid) -> Option<&PaymentMethod> {
        self.payment_methods.iter().find(|method| method.id == id)
    }

    pub fn config(&self, owner: &str) -> Option<&UserConfig> {
        self.configs.iter().find(|config| config.owner == owner)
    }

    /// Returns the owner's config, creating the default row on first use.
    pub fn config_mut(&mut self, owner: &str) -> &mut UserConfig {
        let position = self.configs.iter().position(|config| config.owner == owner);
        let index = match position {
            Some(index) => index,
            None => {
                self.configs.push(UserConfig::new(owner));
                self.configs.len() - 1
            }
        };
        &mut self.configs[index]
    }

    pub fn transactions_for<'a>(
        &'a self,
        owner: &'a str,
    ) -> impl Iterator<Item = &'a Transaction> {
        self.transactions
            .iter()
            .filter(move |transaction| transaction.owner == owner)
    }

    /// The audit surface: one entry per import attempt, newest first.
    pub fn import_history(&self, owner: &str) -> Vec<&ImportLogEntry> {
        let mut entries: Vec<&ImportLogEntry> = self
            .import_logs
            .iter()
            .filter(|entry| entry.owner == owner)
            .collect();
        entries.sort_by(|lhs, rhs| rhs.timestamp.cmp(&lhs.timestamp));
        entries
    }
}
