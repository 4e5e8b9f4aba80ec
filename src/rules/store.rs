use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tokio::sync::Mutex;

use crate::error::RuleSetError;

use super::snapshot::RuleSnapshot;
use super::types::{NewRule, Rule};

/// File-backed rule set.
///
/// Readers take an immutable, pre-compiled [`RuleSnapshot`]; edits are
/// serialized, written to disk, and then published as a fresh snapshot so a
/// scan in flight never observes a half-applied change.
pub struct RuleStore {
    path: PathBuf,
    current: RwLock<Arc<RuleSnapshot>>,
    write_lock: Mutex<()>,
}

impl RuleStore {
    /// Load the rule file at `path`, optionally creating an empty one.
    ///
    /// Runs once at startup, before any request is served, so it uses blocking I/O.
    pub fn open(path: impl Into<PathBuf>, create_if_missing: bool) -> Result<Self, RuleSetError> {
        let path = path.into();

        if !path.exists() && create_if_missing {
            let json = encode_rules(&path, &[])?;
            std::fs::write(&path, json).map_err(io_error(&path))?;
            tracing::info!(path = %path.display(), "Created empty rule file");
        }

        let content = std::fs::read_to_string(&path).map_err(io_error(&path))?;
        let rules = parse_rules(&path, &content)?;
        let snapshot = RuleSnapshot::new(rules);
        tracing::info!(
            rules = snapshot.len(),
            enabled = snapshot.iter().filter(|r| r.enabled).count(),
            patterns = snapshot.pattern_count(),
            "Loaded rule set"
        );

        Ok(Self {
            path,
            current: RwLock::new(Arc::new(snapshot)),
            write_lock: Mutex::new(()),
        })
    }

    /// Build a store around an in-memory rule set, persisted to `path` on edit.
    pub fn from_rules(path: impl Into<PathBuf>, rules: Vec<Rule>) -> Result<Self, RuleSetError> {
        validate_set(&rules)?;
        Ok(Self {
            path: path.into(),
            current: RwLock::new(Arc::new(RuleSnapshot::new(rules))),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The current rule set. Cheap; clones an `Arc`.
    pub fn snapshot(&self) -> Arc<RuleSnapshot> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// All rules, including disabled ones, in file order.
    pub fn list(&self) -> Vec<Rule> {
        self.snapshot().rules().to_vec()
    }

    pub fn active_count(&self) -> usize {
        self.snapshot().iter().filter(|r| r.enabled).count()
    }

    /// Append a rule with the next free id.
    pub async fn add(&self, new_rule: NewRule) -> Result<Rule, RuleSetError> {
        let _guard = self.write_lock.lock().await;
        let mut rules = self.list();

        let next_id = rules.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let rule = new_rule.into_rule(next_id);
        rule.validate()?;

        rules.push(rule.clone());
        self.commit(rules).await?;

        tracing::info!(id = rule.id, category = %rule.category, weight = rule.weight, "Rule added");
        Ok(rule)
    }

    /// Flip a rule's enabled flag. Returns the new value.
    pub async fn toggle(&self, id: i64) -> Result<bool, RuleSetError> {
        let _guard = self.write_lock.lock().await;
        let mut rules = self.list();

        let rule = rules
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(RuleSetError::NotFound(id))?;
        rule.enabled = !rule.enabled;
        let enabled = rule.enabled;

        self.commit(rules).await?;
        tracing::info!(id, enabled, "Rule toggled");
        Ok(enabled)
    }

    pub async fn delete(&self, id: i64) -> Result<(), RuleSetError> {
        let _guard = self.write_lock.lock().await;
        let rules = self.list();

        let remaining: Vec<Rule> = rules.iter().filter(|r| r.id != id).cloned().collect();
        if remaining.len() == rules.len() {
            return Err(RuleSetError::NotFound(id));
        }

        self.commit(remaining).await?;
        tracing::info!(id, "Rule deleted");
        Ok(())
    }

    /// Re-read the rule file, replacing the in-memory set.
    pub async fn reload(&self) -> Result<usize, RuleSetError> {
        let _guard = self.write_lock.lock().await;
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(io_error(&self.path))?;
        let rules = parse_rules(&self.path, &content)?;
        let count = rules.len();
        self.publish(rules);
        tracing::info!(rules = count, "Rule set reloaded");
        Ok(count)
    }

    async fn commit(&self, rules: Vec<Rule>) -> Result<(), RuleSetError> {
        validate_set(&rules)?;
        write_rules(&self.path, &rules).await?;
        self.publish(rules);
        Ok(())
    }

    fn publish(&self, rules: Vec<Rule>) {
        let snapshot = Arc::new(RuleSnapshot::new(rules));
        match self.current.write() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => *poisoned.into_inner() = snapshot,
        }
    }
}

fn validate_set(rules: &[Rule]) -> Result<(), RuleSetError> {
    let mut seen = HashSet::with_capacity(rules.len());
    for rule in rules {
        if !seen.insert(rule.id) {
            return Err(RuleSetError::DuplicateId(rule.id));
        }
        rule.validate()?;
    }
    Ok(())
}

fn io_error(path: &Path) -> impl Fn(std::io::Error) -> RuleSetError + '_ {
    move |source| RuleSetError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn parse_rules(path: &Path, content: &str) -> Result<Vec<Rule>, RuleSetError> {
    let rules: Vec<Rule> = serde_json::from_str(content).map_err(|source| RuleSetError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    validate_set(&rules)?;
    Ok(rules)
}

fn encode_rules(path: &Path, rules: &[Rule]) -> Result<String, RuleSetError> {
    serde_json::to_string_pretty(rules).map_err(|source| RuleSetError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// Write via a sibling temp file and rename, so readers never see a partial file.
async fn write_rules(path: &Path, rules: &[Rule]) -> Result<(), RuleSetError> {
    let json = encode_rules(path, rules)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json).await.map_err(io_error(&tmp))?;
    tokio::fs::rename(&tmp, path).await.map_err(io_error(path))?;
    Ok(())
}
