//! Schema registry: column declarations plus header normalization.
//!
//! Design goals:
//! - **Explicit state**: the registry is a constructed object handed to the
//!   loaders, never a global
//! - **Pure normalization**: `normalize` is lookup only, no side effects
//! - **Strict reconciliation**: after normalization a header must map 1:1
//!   onto the declared columns; anything else is a mismatch for that file

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use crate::error::Error;

/// Semantic type of one declared column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// float64 feature value.
    Float,
    /// The single categorical ground-truth column.
    Label,
}

/// One (name, type, nullability) declaration.
///
/// Names must already be canonical (see [`canonicalize`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
    /// Nullable columns may be empty without raising a diagnostic.
    pub nullable: bool,
}

impl ColumnSpec {
    pub fn float(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ColumnKind::Float,
            nullable: false,
        }
    }

    pub fn nullable_float(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ColumnKind::Float,
            nullable: true,
        }
    }

    pub fn label(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ColumnKind::Label,
            nullable: false,
        }
    }
}

/// Canonical form of a raw column name.
///
/// Strips UTF-8 BOMs and surrounding whitespace, lower-cases, and collapses
/// interior whitespace runs to single spaces. Spreadsheet-era exports pad
/// header cells unpredictably; the collapsed form is the stable identity.
pub fn canonicalize(name: &str) -> String {
    let cleaned = name.replace('\u{feff}', "");
    let mut out = String::with_capacity(cleaned.len());
    for (i, word) in cleaned.split_whitespace().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&word.to_lowercase());
    }
    out
}

/// Where one raw header cell routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingTarget {
    /// Index into the record's feature vector.
    Feature { index: usize, nullable: bool },
    /// The ground-truth label cell.
    Label,
    /// Dropped without diagnostic (duplicate or declared ignorable).
    Ignored,
}

/// One raw header cell resolved against the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnBinding {
    pub raw: String,
    /// Canonical column name; `None` when the cell is dropped.
    pub canonical: Option<String>,
    pub target: BindingTarget,
}

/// Routing of one raw header onto the canonical schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMapping {
    bindings: Vec<ColumnBinding>,
}

impl HeaderMapping {
    /// Bindings in raw header order.
    pub fn bindings(&self) -> &[ColumnBinding] {
        &self.bindings
    }

    /// Raw name → canonical name for every bound column.
    pub fn canonical_map(&self) -> BTreeMap<String, String> {
        self.bindings
            .iter()
            .filter_map(|b| b.canonical.clone().map(|c| (b.raw.clone(), c)))
            .collect()
    }
}

/// Ordered column declarations plus the permitted label vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDefinition {
    columns: Vec<ColumnSpec>,
    labels: BTreeSet<String>,
    /// Canonicalized raw variant → canonical column name.
    aliases: BTreeMap<String, String>,
    /// Canonicalized names that may appear in headers and are dropped.
    ignorable: BTreeSet<String>,
    /// Canonical feature name → slot in the record's feature vector.
    feature_index: HashMap<String, usize>,
    label_column: String,
}

impl SchemaDefinition {
    /// Validate and index the declarations.
    ///
    /// Requires exactly one `Label` column, unique canonical names, and a
    /// non-empty label vocabulary.
    pub fn new<I, L>(columns: Vec<ColumnSpec>, labels: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        let mut seen = BTreeSet::new();
        for col in &columns {
            if col.name != canonicalize(&col.name) {
                return Err(Error::Configuration(format!(
                    "column `{}` is not in canonical form",
                    col.name
                )));
            }
            if !seen.insert(col.name.clone()) {
                return Err(Error::Configuration(format!(
                    "duplicate column `{}` in schema",
                    col.name
                )));
            }
        }

        let mut label_columns = columns.iter().filter(|c| c.kind == ColumnKind::Label);
        let label_column = match (label_columns.next(), label_columns.next()) {
            (Some(col), None) => col.name.clone(),
            (None, _) => {
                return Err(Error::Configuration(
                    "schema declares no label column".to_string(),
                ));
            }
            (Some(_), Some(_)) => {
                return Err(Error::Configuration(
                    "schema declares more than one label column".to_string(),
                ));
            }
        };

        let mut feature_index = HashMap::new();
        let mut next = 0usize;
        for col in &columns {
            if col.kind == ColumnKind::Float {
                feature_index.insert(col.name.clone(), next);
                next += 1;
            }
        }

        let labels: BTreeSet<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(Error::Configuration(
                "permitted label set is empty".to_string(),
            ));
        }

        Ok(Self {
            columns,
            labels,
            aliases: BTreeMap::new(),
            ignorable: BTreeSet::new(),
            feature_index,
            label_column,
        })
    }

    /// Map a known raw header variant onto a declared column.
    pub fn add_alias(&mut self, raw: &str, canonical: &str) -> Result<(), Error> {
        let target = canonicalize(canonical);
        if self.column(&target).is_none() {
            return Err(Error::Configuration(format!(
                "alias target `{target}` is not a declared column"
            )));
        }
        self.aliases.insert(canonicalize(raw), target);
        Ok(())
    }

    /// Declare a column name that may appear in headers and is dropped.
    pub fn mark_ignorable(&mut self, name: &str) {
        self.ignorable.insert(canonicalize(name));
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Canonical feature names, in feature-vector order.
    pub fn feature_names(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter(|c| c.kind == ColumnKind::Float)
            .map(|c| c.name.as_str())
    }

    pub fn feature_count(&self) -> usize {
        self.feature_index.len()
    }

    /// Slot of a canonical feature name in the record's feature vector.
    pub fn feature_index(&self, name: &str) -> Option<usize> {
        self.feature_index.get(name).copied()
    }

    pub fn label_column(&self) -> &str {
        &self.label_column
    }

    pub fn labels(&self) -> &BTreeSet<String> {
        &self.labels
    }

    pub fn permits_label(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Reconcile one raw header against the declarations.
    ///
    /// Duplicate canonical columns bind first-wins; later occurrences are
    /// ignored without diagnostic (a known artifact of concatenated capture
    /// exports). Unknown columns and absent declared columns are mismatches.
    pub fn reconcile_header(&self, raw_header: &[&str]) -> Result<HeaderMapping, Error> {
        let mut bindings = Vec::with_capacity(raw_header.len());
        let mut bound: BTreeSet<String> = BTreeSet::new();

        for raw in raw_header {
            let mut canon = canonicalize(raw);
            if let Some(target) = self.aliases.get(&canon) {
                canon = target.clone();
            }

            if bound.contains(&canon) {
                bindings.push(ColumnBinding {
                    raw: (*raw).to_string(),
                    canonical: None,
                    target: BindingTarget::Ignored,
                });
                continue;
            }

            let binding = if canon == self.label_column {
                bound.insert(canon.clone());
                ColumnBinding {
                    raw: (*raw).to_string(),
                    canonical: Some(canon),
                    target: BindingTarget::Label,
                }
            } else if let Some(index) = self.feature_index(&canon) {
                let nullable = self.column(&canon).is_some_and(|c| c.nullable);
                bound.insert(canon.clone());
                ColumnBinding {
                    raw: (*raw).to_string(),
                    canonical: Some(canon),
                    target: BindingTarget::Feature { index, nullable },
                }
            } else if self.ignorable.contains(&canon) {
                ColumnBinding {
                    raw: (*raw).to_string(),
                    canonical: None,
                    target: BindingTarget::Ignored,
                }
            } else {
                return Err(Error::SchemaMismatch {
                    column: raw.trim().to_string(),
                    reason: "no canonical match and not declared ignorable".to_string(),
                });
            };
            bindings.push(binding);
        }

        for col in &self.columns {
            if !bound.contains(&col.name) {
                return Err(Error::SchemaMismatch {
                    column: col.name.clone(),
                    reason: "declared column missing from header".to_string(),
                });
            }
        }

        Ok(HeaderMapping { bindings })
    }
}

/// Holder of the single canonical schema.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schema: Option<Arc<SchemaDefinition>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience: a registry with `schema` already registered.
    pub fn with_schema(schema: SchemaDefinition) -> Self {
        Self {
            schema: Some(Arc::new(schema)),
        }
    }

    /// Store the canonical schema.
    ///
    /// Re-registering an identical definition is a no-op; a conflicting one
    /// is a configuration error.
    pub fn register(&mut self, schema: SchemaDefinition) -> Result<(), Error> {
        match &self.schema {
            None => {
                self.schema = Some(Arc::new(schema));
                Ok(())
            }
            Some(existing) if **existing == schema => Ok(()),
            Some(_) => Err(Error::Configuration(
                "a conflicting schema is already registered".to_string(),
            )),
        }
    }

    /// The registered schema, or a configuration error when absent.
    pub fn schema(&self) -> Result<&SchemaDefinition, Error> {
        self.schema
            .as_deref()
            .ok_or_else(|| Error::Configuration("no schema registered".to_string()))
    }

    /// Shared handle to the registered schema (stored on the dataset).
    pub fn shared_schema(&self) -> Result<Arc<SchemaDefinition>, Error> {
        self.schema
            .clone()
            .ok_or_else(|| Error::Configuration("no schema registered".to_string()))
    }

    /// Reconcile one raw header against the registered schema.
    pub fn normalize(&self, raw_header: &[&str]) -> Result<HeaderMapping, Error> {
        self.schema()?.reconcile_header(raw_header)
    }
}
