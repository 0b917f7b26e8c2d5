//! Metric Catalog Types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// A key/value qualifier on a metric series
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

impl Dimension {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Full identity of a metric series.
///
/// Dimensions keep the order the backend reported them in, so they can be
/// sent back unchanged, but equality and hashing ignore that order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricIdentity {
    namespace: String,
    name: String,
    dimensions: Vec<Dimension>,
}

impl MetricIdentity {
    /// Create an identity. Returns `None` when namespace or name is empty.
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        dimensions: Vec<Dimension>,
    ) -> Option<Self> {
        let namespace = namespace.into();
        let name = name.into();
        if namespace.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self {
            namespace,
            name,
            dimensions,
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dimensions in backend order
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    fn sorted_dimensions(&self) -> Vec<&Dimension> {
        let mut dims: Vec<_> = self.dimensions.iter().collect();
        dims.sort();
        dims
    }
}

impl PartialEq for MetricIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.namespace == other.namespace
            && self.name == other.name
            && self.dimensions.len() == other.dimensions.len()
            && self.sorted_dimensions() == other.sorted_dimensions()
    }
}

impl Eq for MetricIdentity {}

impl Hash for MetricIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.namespace.hash(state);
        self.name.hash(state);
        self.sorted_dimensions().hash(state);
    }
}

impl fmt::Display for MetricIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)?;
        if !self.dimensions.is_empty() {
            write!(f, "{{")?;
            for (i, dim) in self.dimensions.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{}={}", dim.name, dim.value)?;
            }
            write!(f, "}}")?;
        }
        Ok(())
    }
}

/// Dimension as reported by the backend, before validation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDimension {
    pub name: Option<String>,
    pub value: Option<String>,
}

/// Catalog entry as reported by the backend, before validation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub namespace: Option<String>,
    pub name: Option<String>,
    pub dimensions: Vec<RawDimension>,
}

/// A catalog entry that cannot form a metric identity
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MalformedRecord {
    #[error("Metric record has no namespace")]
    MissingNamespace,
    #[error("Metric record has no name")]
    MissingName,
    #[error("Metric record has a dimension without {0}")]
    IncompleteDimension(&'static str),
}

impl MetricRecord {
    /// Build a well-formed record
    pub fn new(namespace: &str, name: &str, dimensions: &[(&str, &str)]) -> Self {
        Self {
            namespace: Some(namespace.to_string()),
            name: Some(name.to_string()),
            dimensions: dimensions
                .iter()
                .map(|(k, v)| RawDimension {
                    name: Some(k.to_string()),
                    value: Some(v.to_string()),
                })
                .collect(),
        }
    }

    /// Validate the record into an identity
    pub fn into_identity(self) -> Result<MetricIdentity, MalformedRecord> {
        let namespace = self
            .namespace
            .filter(|ns| !ns.is_empty())
            .ok_or(MalformedRecord::MissingNamespace)?;
        let name = self
            .name
            .filter(|n| !n.is_empty())
            .ok_or(MalformedRecord::MissingName)?;

        let dimensions = self
            .dimensions
            .into_iter()
            .map(|raw| {
                let key = raw.name.ok_or(MalformedRecord::IncompleteDimension("name"))?;
                let value = raw.value.ok_or(MalformedRecord::IncompleteDimension("value"))?;
                Ok(Dimension::new(key, value))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(MetricIdentity {
            namespace,
            name,
            dimensions,
        })
    }
}

/// Request for one page of the metric catalog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListMetricsRequest {
    /// Continuation token from the previous page
    pub next_token: Option<String>,
    /// Restrict the catalog to one namespace
    pub namespace: Option<String>,
}

/// One page of the metric catalog
#[derive(Debug, Clone, Default)]
pub struct MetricPage {
    pub records: Vec<MetricRecord>,
    pub next_token: Option<String>,
}

impl MetricPage {
    /// Continuation token, if another page follows
    pub fn continuation(&self) -> Option<&str> {
        self.next_token.as_deref().filter(|t| !t.is_empty())
    }
}
