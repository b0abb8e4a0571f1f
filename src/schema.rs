// 📐 Shape Layer - Parameter schemas
// Validates parameter sets against the definitions declared per entity kind

use crate::entities::{mooring, naval, site, structure};
use crate::error::ParameterError;
use crate::parameters::{ParameterDefinition, ParameterSet, ParameterSetBuilder, ValidationRule};
use serde::Serialize;
use std::collections::HashMap;

// ============================================================================
// VALIDATION RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub context: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.context, self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), Vec<ValidationError>>;

// ============================================================================
// PARAMETER SCHEMA
// ============================================================================

/// The declared parameters of one entity kind
#[derive(Debug, Clone, Serialize)]
pub struct ParameterSchema {
    kind: String,
    definitions: Vec<ParameterDefinition>,
}

impl ParameterSchema {
    pub fn new(kind: impl Into<String>) -> Self {
        ParameterSchema {
            kind: kind.into(),
            definitions: Vec::new(),
        }
    }

    /// Builder: declare a parameter
    pub fn with(mut self, definition: ParameterDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn definitions(&self) -> &[ParameterDefinition] {
        &self.definitions
    }

    pub fn definition(&self, name: &str) -> Option<&ParameterDefinition> {
        self.definitions.iter().find(|def| def.name == name)
    }

    pub fn builder(&self) -> ParameterSetBuilder<'_> {
        ParameterSetBuilder::new(self)
    }

    /// Parameter set made of the declared defaults only
    pub fn defaults(&self) -> Result<ParameterSet, ParameterError> {
        self.builder().build()
    }

    /// Check a set against every declaration, collecting all problems
    pub fn validate(&self, set: &ParameterSet) -> ValidationResult {
        let mut errors = Vec::new();
        let context = self.kind.as_str();

        if set.kind() != self.kind {
            errors.push(error(
                "kind",
                format!("Parameter set is for '{}'", set.kind()),
                context,
            ));
        }

        for def in &self.definitions {
            let quantity = match set.get(&def.name) {
                Some(q) => q,
                None => {
                    if def.is_required() {
                        errors.push(error(&def.name, "Required parameter is missing", context));
                    }
                    continue;
                }
            };

            if quantity.dimension() != def.dimension {
                errors.push(error(
                    &def.name,
                    format!("Expected {}, got {}", def.dimension, quantity.dimension()),
                    context,
                ));
                continue;
            }

            let value = quantity.si();
            if !value.is_finite() {
                errors.push(error(&def.name, "Must be a finite number", context));
                continue;
            }

            for rule in &def.rules {
                match rule {
                    ValidationRule::Required => {}
                    ValidationRule::Positive if value <= 0.0 => {
                        errors.push(error(&def.name, format!("Must be positive, got {}", quantity), context));
                    }
                    ValidationRule::NonNegative if value < 0.0 => {
                        errors.push(error(&def.name, format!("Must not be negative, got {}", quantity), context));
                    }
                    ValidationRule::Integer if (value - value.round()).abs() > 1e-9 => {
                        errors.push(error(&def.name, format!("Must be a whole number, got {}", quantity), context));
                    }
                    ValidationRule::Range { min, max } if value < *min || value > *max => {
                        errors.push(error(
                            &def.name,
                            format!("Must be between {} and {} (SI), got {}", min, max, quantity),
                            context,
                        ));
                    }
                    _ => {}
                }
            }
        }

        for (name, _) in set.iter() {
            if self.definition(name).is_none() {
                errors.push(error(name, "Not declared by schema", context));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// `validate` folded into a ParameterError
    pub fn ensure_valid(&self, set: &ParameterSet) -> Result<(), ParameterError> {
        self.validate(set).map_err(|errors| ParameterError::Invalid {
            kind: self.kind.clone(),
            errors,
        })
    }
}

fn error(field: &str, message: impl Into<String>, context: &str) -> ValidationError {
    ValidationError {
        field: field.to_string(),
        message: message.into(),
        context: context.to_string(),
    }
}

// ============================================================================
// SCHEMA REGISTRY
// ============================================================================

/// SchemaRegistry - catalog of parameter schemas by entity kind
pub struct SchemaRegistry {
    schemas: HashMap<String, ParameterSchema>,
}

impl SchemaRegistry {
    /// Registry with the schemas of every built-in entity kind
    pub fn new() -> Self {
        let mut registry = SchemaRegistry {
            schemas: HashMap::new(),
        };

        registry.register(site::schema());
        registry.register(mooring::schema());
        registry.register(structure::schema());
        registry.register(naval::schema());
        registry
    }

    pub fn register(&mut self, schema: ParameterSchema) {
        self.schemas.insert(schema.kind().to_string(), schema);
    }

    pub fn get(&self, kind: &str) -> Option<&ParameterSchema> {
        self.schemas.get(kind)
    }

    pub fn require(&self, kind: &str) -> Result<&ParameterSchema, ParameterError> {
        self.get(kind)
            .ok_or_else(|| ParameterError::UnknownKind(kind.to_string()))
    }

    /// Registered kinds, sorted
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    pub fn count(&self) -> usize {
        self.schemas.len()
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::ParameterDefinition;
    use crate::units::{Dimension, Quantity, Unit};
    use std::collections::BTreeMap;

    fn tank_schema() -> ParameterSchema {
        ParameterSchema::new("tank")
            .with(
                ParameterDefinition::new("Volume", Dimension::Dimensionless)
                    .with_validation(ValidationRule::Required)
                    .with_validation(ValidationRule::Positive),
            )
            .with(
                ParameterDefinition::new("FillRatio", Dimension::Dimensionless)
                    .with_default(50.0, Unit::Percent)
                    .with_validation(ValidationRule::Range { min: 0.0, max: 1.0 }),
            )
    }

    #[test]
    fn test_missing_required_parameter() {
        let schema = tank_schema();
        let result = schema.defaults();

        match result {
            Err(ParameterError::Invalid { errors, .. }) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "Volume");
                assert_eq!(errors[0].context, "tank");
            }
            other => panic!("expected missing Volume, got {:?}", other),
        }
    }

    #[test]
    fn test_all_errors_reported_at_once() {
        let schema = tank_schema();
        let mut values = BTreeMap::new();
        values.insert("Volume".to_string(), Quantity::dimensionless(-1.0));
        values.insert("FillRatio".to_string(), Quantity::new(150.0, Unit::Percent));
        values.insert("Colour".to_string(), Quantity::dimensionless(3.0));
        let set = ParameterSet::from_values("tank", values);

        let errors = schema.validate(&set).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();

        assert_eq!(errors.len(), 3);
        assert!(fields.contains(&"Volume"));
        assert!(fields.contains(&"FillRatio"));
        assert!(fields.contains(&"Colour"));
    }

    #[test]
    fn test_wrong_kind_rejected() {
        let schema = tank_schema();
        let mut values = BTreeMap::new();
        values.insert("Volume".to_string(), Quantity::dimensionless(10.0));
        let set = ParameterSet::from_values("hull", values);

        let errors = schema.validate(&set).unwrap_err();
        assert_eq!(errors[0].field, "kind");
    }

    #[test]
    fn test_registry_has_builtin_kinds() {
        let registry = SchemaRegistry::new();

        assert_eq!(registry.count(), 4);
        assert_eq!(registry.kinds(), vec!["mooring_system", "naval", "site", "structure"]);
        assert!(registry.require("ballast_tank").is_err());
    }

    #[test]
    fn test_builtin_defaults_are_valid() {
        let registry = SchemaRegistry::new();

        for kind in registry.kinds() {
            let schema = registry.get(kind).unwrap();
            assert!(schema.defaults().is_ok(), "defaults for {} should validate", kind);
        }
    }
}
