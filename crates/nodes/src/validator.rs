//! Form input validation.

use std::sync::OnceLock;

use regex::Regex;

use crate::value::{Variable, Variables};
use crate::NodeError;

/// Checks submitted form values against a form node's declared fields.
pub trait InputValidator: Send + Sync {
    /// Validate `values` against `declared_fields`.
    ///
    /// Every problem is collected into a single [`NodeError::InvalidForm`].
    fn validate_form_data(
        &self,
        values: &Variables,
        declared_fields: &[String],
    ) -> Result<(), NodeError>;
}

/// Required-field checks plus light rules for well-known field names.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultInputValidator;

impl DefaultInputValidator {
    pub fn new() -> Self {
        Self
    }
}

impl InputValidator for DefaultInputValidator {
    fn validate_form_data(
        &self,
        values: &Variables,
        declared_fields: &[String],
    ) -> Result<(), NodeError> {
        let mut problems = Vec::new();

        for field in declared_fields {
            let value = match values.get(field) {
                Some(v) if !is_empty(v) => v,
                _ => {
                    problems.push(format!("field '{field}' is required"));
                    continue;
                }
            };

            if let Err(reason) = check_known_field(field, value) {
                problems.push(format!("field '{field}': {reason}"));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(NodeError::InvalidForm(problems))
        }
    }
}

/// Blank strings are empty; numbers (including zero) and booleans never are.
fn is_empty(value: &Variable) -> bool {
    match value {
        Variable::String(s) => s.trim().is_empty(),
        Variable::Number(_) | Variable::Bool(_) => false,
    }
}

fn check_known_field(field: &str, value: &Variable) -> Result<(), &'static str> {
    match field {
        "email" => {
            let s = value.as_str().ok_or("must be a string")?;
            if !is_valid_email(s) {
                return Err("must be a valid email address");
            }
        }
        "name" => {
            let s = value.as_str().ok_or("must be a string")?;
            if s.trim().is_empty() {
                return Err("cannot be empty");
            }
        }
        _ => {}
    }
    Ok(())
}

/// Syntactic address check. Accepts a bare `local@domain` or the
/// `Display Name <local@domain>` form.
pub fn is_valid_email(input: &str) -> bool {
    static ADDRESS: OnceLock<Regex> = OnceLock::new();
    let re = ADDRESS.get_or_init(|| {
        let addr = r"[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)*";
        Regex::new(&format!(r"^(?:{addr}|[^<>@]*<{addr}>)$")).expect("email pattern is valid")
    });
    re.is_match(input.trim())
}
