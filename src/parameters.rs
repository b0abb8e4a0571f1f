// 🏛️ Parameter Layer - Immutable, unit-tagged configuration
//
// A ParameterSet is the static description of an entity ("what was built").
// It never changes after construction; a different design is a different set.
// Sets are produced by a builder that starts from the schema defaults.

use crate::error::ParameterError;
use crate::schema::ParameterSchema;
use crate::units::{Dimension, Quantity, Unit};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;

// ============================================================================
// VALIDATION RULES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValidationRule {
    Required,
    Positive,
    NonNegative,
    Integer,
    /// Inclusive bounds, expressed in SI
    Range { min: f64, max: f64 },
}

// ============================================================================
// PARAMETER DEFINITION
// ============================================================================

/// ParameterDefinition - what a named parameter means and how it is checked
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterDefinition {
    /// Name as used in parameter files (e.g. "AnchorRadius")
    pub name: String,

    /// Physical dimension every value must have
    pub dimension: Dimension,

    pub description: String,

    /// Value used when the builder gets no override
    pub default: Option<Quantity>,

    pub rules: Vec<ValidationRule>,
}

impl ParameterDefinition {
    pub fn new(name: impl Into<String>, dimension: Dimension) -> Self {
        ParameterDefinition {
            name: name.into(),
            dimension,
            description: String::new(),
            default: None,
            rules: Vec::new(),
        }
    }

    /// Builder: add description
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Builder: set default value
    pub fn with_default(mut self, value: f64, unit: Unit) -> Self {
        self.default = Some(Quantity::new(value, unit));
        self
    }

    /// Builder: add validation rule
    pub fn with_validation(mut self, rule: ValidationRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn is_required(&self) -> bool {
        self.rules.contains(&ValidationRule::Required)
    }
}

// ============================================================================
// PARAMETER SET
// ============================================================================

/// ParameterSet - immutable mapping from parameter name to quantity
///
/// Tagged with the entity kind it configures. There are no setters: build a
/// new set with `ParameterSetBuilder` to describe a different design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    kind: String,
    values: BTreeMap<String, Quantity>,
}

impl ParameterSet {
    pub(crate) fn from_values(kind: impl Into<String>, values: BTreeMap<String, Quantity>) -> Self {
        ParameterSet {
            kind: kind.into(),
            values,
        }
    }

    /// Entity kind this set configures (e.g. "mooring_system")
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn get(&self, name: &str) -> Option<&Quantity> {
        self.values.get(name)
    }

    pub fn require(&self, name: &str) -> Result<&Quantity, ParameterError> {
        self.values
            .get(name)
            .ok_or_else(|| ParameterError::Missing(name.to_string()))
    }

    /// Value in SI units
    pub fn si(&self, name: &str) -> Result<f64, ParameterError> {
        self.require(name).map(Quantity::si)
    }

    /// Value converted to `unit`
    pub fn value_in(&self, name: &str, unit: Unit) -> Result<f64, ParameterError> {
        let quantity = self.require(name)?;
        quantity
            .in_unit(unit)
            .ok_or_else(|| ParameterError::DimensionMismatch {
                name: name.to_string(),
                expected: unit.dimension(),
                found: quantity.dimension(),
            })
    }

    /// Integer-valued parameter (validated by the `Integer` rule)
    pub fn count(&self, name: &str) -> Result<usize, ParameterError> {
        let value = self.si(name)?;
        Ok(value.round().max(0.0) as usize)
    }

    pub fn names(&self) -> Vec<&str> {
        self.values.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Quantity)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// SHA-256 over the canonical listing of kind and values
    ///
    /// Two sets with the same kind and the same values (in the same units)
    /// always share a fingerprint.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.kind.as_bytes());
        hasher.update(b"|");
        for (name, quantity) in &self.values {
            hasher.update(format!("{}={} {};", name, quantity.value, quantity.unit.symbol()));
        }
        format!("{:x}", hasher.finalize())
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// Builds a validated ParameterSet from schema defaults plus overrides
pub struct ParameterSetBuilder<'a> {
    schema: &'a ParameterSchema,
    values: BTreeMap<String, Quantity>,
    problems: Vec<ParameterError>,
}

impl<'a> ParameterSetBuilder<'a> {
    /// Start from the schema defaults
    pub fn new(schema: &'a ParameterSchema) -> Self {
        let values = schema
            .definitions()
            .iter()
            .filter_map(|def| def.default.map(|q| (def.name.clone(), q)))
            .collect();

        ParameterSetBuilder {
            schema,
            values,
            problems: Vec::new(),
        }
    }

    /// Start from an existing set (e.g. to derive a variant of a design)
    pub fn from_set(schema: &'a ParameterSchema, base: &ParameterSet) -> Self {
        let mut builder = ParameterSetBuilder::new(schema);
        for (name, quantity) in base.iter() {
            builder = builder.set(name, *quantity);
        }
        builder
    }

    /// Override one value; unknown names and wrong dimensions surface on build()
    pub fn set(mut self, name: &str, quantity: Quantity) -> Self {
        match self.schema.definition(name) {
            None => self.problems.push(ParameterError::Unknown {
                kind: self.schema.kind().to_string(),
                name: name.to_string(),
            }),
            Some(def) if def.dimension != quantity.dimension() => {
                self.problems.push(ParameterError::DimensionMismatch {
                    name: name.to_string(),
                    expected: def.dimension,
                    found: quantity.dimension(),
                })
            }
            Some(_) => {
                self.values.insert(name.to_string(), quantity);
            }
        }
        self
    }

    /// Apply a batch of overrides (e.g. rows from a parameter CSV)
    pub fn apply<I>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (String, Quantity)>,
    {
        for (name, quantity) in overrides {
            self = self.set(&name, quantity);
        }
        self
    }

    pub fn build(mut self) -> Result<ParameterSet, ParameterError> {
        if !self.problems.is_empty() {
            return Err(self.problems.remove(0));
        }

        let set = ParameterSet::from_values(self.schema.kind(), self.values);
        self.schema.ensure_valid(&set)?;
        Ok(set)
    }
}

// ============================================================================
// CSV LOADER
// ============================================================================

#[derive(Debug, Deserialize)]
struct ParameterRow {
    #[serde(rename = "Name")]
    name: String,

    #[serde(rename = "Value")]
    value: f64,

    #[serde(rename = "Unit", default)]
    unit: String,
}

/// Read `Name,Value,Unit` rows as builder overrides
pub fn load_parameter_csv(csv_path: &Path) -> Result<Vec<(String, Quantity)>> {
    let mut rdr = csv::Reader::from_path(csv_path)
        .with_context(|| format!("Failed to open parameter file {}", csv_path.display()))?;

    let mut overrides = Vec::new();

    for result in rdr.deserialize() {
        let row: ParameterRow = result.context("Failed to deserialize parameter row")?;
        let unit = Unit::from_symbol(&row.unit)
            .ok_or_else(|| anyhow!("Unknown unit '{}' for parameter '{}'", row.unit, row.name))?;
        overrides.push((row.name.trim().to_string(), Quantity::new(row.value, unit)));
    }

    Ok(overrides)
}

// ============================================================================
// TESTS
// ============================================================================
