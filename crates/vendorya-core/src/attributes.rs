//! # Custom Attribute Validation
//!
//! A variant's custom fields are a map `definition key → value`, checked
//! against the store's active [`AttributeDefinition`]s before anything is
//! written.

use std::collections::BTreeMap;

use crate::catalog::{AttributeDefinition, AttributeInputType};
use crate::error::{CoreError, CoreResult};

/// A value that passed validation, ready to upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedAttribute {
    pub definition_id: String,
    pub value: String,
}

/// Checks every entry of `values` against `definitions`.
///
/// Fails on the first unknown key, SELECT value outside the options, or
/// NUMBER value that does not parse.
pub fn validate_attributes(
    definitions: &[AttributeDefinition],
    values: &BTreeMap<String, String>,
) -> CoreResult<Vec<ValidatedAttribute>> {
    let mut out = Vec::with_capacity(values.len());

    for (key, value) in values {
        let def = definitions
            .iter()
            .find(|d| !d.is_deleted && &d.key == key)
            .ok_or_else(|| CoreError::InvalidAttribute {
                key: key.clone(),
                reason: "no such attribute for this store".to_string(),
            })?;

        let value = value.trim();
        match def.input_type {
            AttributeInputType::Text => {}
            AttributeInputType::Select => {
                let options = def.option_list();
                if !options.iter().any(|o| o == value) {
                    return Err(CoreError::InvalidAttribute {
                        key: key.clone(),
                        reason: format!("must be one of {:?}", options),
                    });
                }
            }
            AttributeInputType::Number => {
                if value.parse::<f64>().map(|n| !n.is_finite()).unwrap_or(true) {
                    return Err(CoreError::InvalidAttribute {
                        key: key.clone(),
                        reason: "must be a number".to_string(),
                    });
                }
            }
        }

        out.push(ValidatedAttribute {
            definition_id: def.id.clone(),
            value: value.to_string(),
        });
    }

    Ok(out)
}
