//! Keyed bindings that variables resolve against.
use std::sync::Arc;

use itertools::Itertools;
use regex_lite::Regex;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::{resolvable::Resolvable, shunting_yard::error::ResolveError, value::Value};

/// Marks a key pattern that matches any run of characters.
pub const WILDCARD: char = '*';

type Bindings = FxHashMap<SmolStr, Resolvable>;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchMatch {
    pub key: SmolStr,
    pub value: Value,
}

pub trait DataContext: Send + Sync {
    fn lookup(&self, key: &str) -> Option<Resolvable>;

    fn keys(&self) -> Vec<SmolStr>;

    fn as_data_context(&self) -> &dyn DataContext;

    fn contains(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    /// Resolves the binding for `key`; unbound keys read as `None`.
    fn get(&self, key: &str) -> Result<Value, ResolveError> {
        match self.lookup(key) {
            Some(resolvable) => resolvable.resolve(self.as_data_context()),
            None => Ok(Value::None),
        }
    }

    /// Resolves every binding whose key matches `pattern`, ordered by key.
    ///
    /// `*` matches any run of characters; a pattern without one looks up a
    /// single key.
    fn search(&self, pattern: &str) -> Result<Vec<SearchMatch>, ResolveError> {
        if !pattern.contains(WILDCARD) {
            return match self.lookup(pattern) {
                Some(resolvable) => Ok(vec![SearchMatch {
                    key: pattern.into(),
                    value: resolvable.resolve(self.as_data_context())?,
                }]),
                None => Ok(Vec::new()),
            };
        }

        let regex = wildcard_regex(pattern)?;
        self.keys()
            .into_iter()
            .filter(|key| regex.is_match(key))
            .sorted()
            .map(|key| self.get(&key).map(|value| SearchMatch { key, value }))
            .collect()
    }
}

fn wildcard_regex(pattern: &str) -> Result<Regex, ResolveError> {
    let body = pattern
        .split(WILDCARD)
        .map(regex_lite::escape)
        .join(".*");

    Regex::new(&format!("^{}$", body)).map_err(|_| ResolveError::InvalidPattern {
        pattern: pattern.to_string(),
    })
}

/// A context with no bindings.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyDataContext;

impl DataContext for EmptyDataContext {
    fn lookup(&self, _key: &str) -> Option<Resolvable> {
        None
    }

    fn keys(&self) -> Vec<SmolStr> {
        Vec::new()
    }

    fn as_data_context(&self) -> &dyn DataContext {
        self
    }
}

fn rename(bindings: &mut Bindings, from: &str, to: &str) -> bool {
    match bindings.remove(from) {
        Some(resolvable) => {
            bindings.insert(to.into(), resolvable);
            true
        }
        None => false,
    }
}

/// Appends to the list bound at `key`. An unbound key starts a new list and a
/// scalar binding becomes the first element.
fn push(bindings: &mut Bindings, key: &str, item: Resolvable) {
    let items = match bindings.remove(key) {
        Some(Resolvable::List(mut items)) => {
            items.push(item);
            items
        }
        Some(existing) => vec![existing, item],
        None => vec![item],
    };
    bindings.insert(key.into(), Resolvable::List(items));
}

#[derive(Debug, Clone, Default)]
pub struct MutableDataContext {
    bindings: Bindings,
}

impl MutableDataContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `key`, returning the previous binding.
    pub fn set(&mut self, key: impl Into<SmolStr>, value: impl Into<Resolvable>) -> Option<Resolvable> {
        self.bindings.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Resolvable> {
        self.bindings.remove(key)
    }

    /// Moves the binding at `from` to `to`, replacing whatever `to` held.
    /// Returns `false` if `from` was unbound.
    pub fn rename(&mut self, from: &str, to: &str) -> bool {
        rename(&mut self.bindings, from, to)
    }

    pub fn push(&mut self, key: &str, value: impl Into<Resolvable>) {
        push(&mut self.bindings, key, value.into());
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl DataContext for MutableDataContext {
    fn lookup(&self, key: &str) -> Option<Resolvable> {
        self.bindings.get(key).cloned()
    }

    fn keys(&self) -> Vec<SmolStr> {
        self.bindings.keys().cloned().collect()
    }

    fn as_data_context(&self) -> &dyn DataContext {
        self
    }
}

impl<K: Into<SmolStr>, V: Into<Resolvable>> FromIterator<(K, V)> for MutableDataContext {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            bindings: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

impl<K: Into<SmolStr>, V: Into<Resolvable>, const N: usize> From<[(K, V); N]>
    for MutableDataContext
{
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

/// An immutable context; every update returns a new context and leaves the
/// original untouched.
#[derive(Debug, Clone, Default)]
pub struct PersistentDataContext {
    bindings: Arc<Bindings>,
}

impl PersistentDataContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn updated(&self, update: impl FnOnce(&mut Bindings)) -> Self {
        let mut bindings = Arc::clone(&self.bindings);
        update(Arc::make_mut(&mut bindings));
        Self { bindings }
    }

    pub fn with(&self, key: impl Into<SmolStr>, value: impl Into<Resolvable>) -> Self {
        let (key, value) = (key.into(), value.into());
        self.updated(|bindings| {
            bindings.insert(key, value);
        })
    }

    pub fn without(&self, key: &str) -> Self {
        self.updated(|bindings| {
            bindings.remove(key);
        })
    }

    pub fn renamed(&self, from: &str, to: &str) -> Self {
        self.updated(|bindings| {
            rename(bindings, from, to);
        })
    }

    pub fn pushed(&self, key: &str, value: impl Into<Resolvable>) -> Self {
        let value = value.into();
        self.updated(|bindings| push(bindings, key, value))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl DataContext for PersistentDataContext {
    fn lookup(&self, key: &str) -> Option<Resolvable> {
        self.bindings.get(key).cloned()
    }

    fn keys(&self) -> Vec<SmolStr> {
        self.bindings.keys().cloned().collect()
    }

    fn as_data_context(&self) -> &dyn DataContext {
        self
    }
}

impl From<MutableDataContext> for PersistentDataContext {
    fn from(context: MutableDataContext) -> Self {
        Self {
            bindings: Arc::new(context.bindings),
        }
    }
}

impl<K: Into<SmolStr>, V: Into<Resolvable>> FromIterator<(K, V)> for PersistentDataContext {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        MutableDataContext::from_iter(iter).into()
    }
}
