use crate::error::{DbResultError, Result};
use crate::types::SqlValue;

/// A set of parameter values to bind into a statement's placeholders.
///
/// Every parameter carries one value per execution; all parameters have the
/// same number of values (the batch size). A set is either entirely
/// positional or entirely named.
#[derive(Debug, Clone, PartialEq)]
pub enum BindingSet {
    /// One value column per placeholder, in placeholder order.
    Positional(Vec<Vec<SqlValue>>),
    /// One value column per named placeholder.
    Named(Vec<(String, Vec<SqlValue>)>),
}

impl BindingSet {
    pub fn builder() -> BindingSetBuilder {
        BindingSetBuilder::new()
    }

    /// A positional set with a batch size of one.
    pub fn single(values: impl IntoIterator<Item = SqlValue>) -> Self {
        BindingSet::Positional(values.into_iter().map(|v| vec![v]).collect())
    }

    /// Number of parameters in the set.
    pub fn len(&self) -> usize {
        match self {
            BindingSet::Positional(params) => params.len(),
            BindingSet::Named(params) => params.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of executions the set describes.
    pub fn batch_size(&self) -> usize {
        let first = match self {
            BindingSet::Positional(params) => params.first(),
            BindingSet::Named(params) => params.first().map(|(_, values)| values),
        };
        first.map_or(0, Vec::len)
    }

    pub fn is_named(&self) -> bool {
        matches!(self, BindingSet::Named(_))
    }

    /// Names of a named set in declaration order; empty for positional sets.
    pub fn names(&self) -> Vec<&str> {
        match self {
            BindingSet::Positional(_) => Vec::new(),
            BindingSet::Named(params) => params.iter().map(|(n, _)| n.as_str()).collect(),
        }
    }

    /// Values of the `index`-th execution, in parameter order.
    pub fn row(&self, index: usize) -> Option<Vec<SqlValue>> {
        let row: Option<Vec<SqlValue>> = match self {
            BindingSet::Positional(params) => params.iter().map(|v| v.get(index).cloned()).collect(),
            BindingSet::Named(params) => params.iter().map(|(_, v)| v.get(index).cloned()).collect(),
        };
        row.filter(|values| !values.is_empty())
    }

    /// True when every parameter has the same number of values.
    pub fn has_uniform_batch(&self) -> bool {
        let size = self.batch_size();
        match self {
            BindingSet::Positional(params) => params.iter().all(|v| v.len() == size),
            BindingSet::Named(params) => params.iter().all(|(_, v)| v.len() == size),
        }
    }

    /// Iterates over the executions described by the set.
    pub fn rows(&self) -> impl Iterator<Item = Vec<SqlValue>> + '_ {
        (0..self.batch_size()).filter_map(move |i| self.row(i))
    }
}

enum Param {
    Positional(Vec<SqlValue>),
    Named(String, Vec<SqlValue>),
}

/// Builder for a `BindingSet`.
/// `build()` rejects mixed named/positional parameters and unequal lengths.
#[derive(Default)]
pub struct BindingSetBuilder {
    params: Vec<Param>,
}

impl BindingSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the next positional parameter with one value per execution.
    pub fn positional<V: Into<SqlValue>>(mut self, values: impl IntoIterator<Item = V>) -> Self {
        self.params
            .push(Param::Positional(values.into_iter().map(Into::into).collect()));
        self
    }

    /// Adds a named parameter with one value per execution.
    pub fn named<V: Into<SqlValue>>(
        mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.params.push(Param::Named(
            name.into(),
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn build(self) -> Result<BindingSet> {
        let named = self
            .params
            .iter()
            .filter(|p| matches!(p, Param::Named(..)))
            .count();
        if named != 0 && named != self.params.len() {
            return Err(DbResultError::MalformedBindingSet(
                "cannot mix named and positional parameters".to_string(),
            ));
        }

        let lengths: Vec<usize> = self
            .params
            .iter()
            .map(|p| match p {
                Param::Positional(values) | Param::Named(_, values) => values.len(),
            })
            .collect();
        if let Some(&first) = lengths.first() {
            if lengths.iter().any(|&len| len != first) {
                return Err(DbResultError::MalformedBindingSet(format!(
                    "all parameters must have the same number of values, got {:?}",
                    lengths
                )));
            }
        }

        if named == 0 {
            let params = self
                .params
                .into_iter()
                .filter_map(|p| match p {
                    Param::Positional(values) => Some(values),
                    Param::Named(..) => None,
                })
                .collect();
            return Ok(BindingSet::Positional(params));
        }

        let mut params: Vec<(String, Vec<SqlValue>)> = Vec::with_capacity(named);
        for param in self.params {
            if let Param::Named(name, values) = param {
                if params.iter().any(|(existing, _)| *existing == name) {
                    return Err(DbResultError::MalformedBindingSet(format!(
                        "parameter `{}` bound twice",
                        name
                    )));
                }
                params.push((name, values));
            }
        }
        Ok(BindingSet::Named(params))
    }
}
