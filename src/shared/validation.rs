//! Validation Utilities

use validator::{ValidationErrors, ValidationErrorsKind};

use super::error::{AppError, FieldError};

/// Flatten validator errors (including nested structs and lists) into
/// field-level violations. Every violation is kept, not only the first.
pub fn collect_field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out = Vec::new();
    collect_into(errors, None, &mut out);
    out.sort_by(|a, b| a.field.cmp(&b.field));
    out
}

fn collect_into(errors: &ValidationErrors, prefix: Option<&str>, out: &mut Vec<FieldError>) {
    for (field, kind) in errors.errors() {
        let field = camel_case(field);
        let path = match prefix {
            Some(p) => format!("{}.{}", p, field),
            None => field,
        };
        match kind {
            ValidationErrorsKind::Field(errs) => {
                out.extend(errs.iter().map(|e| FieldError {
                    field: path.clone(),
                    message: e
                        .message
                        .clone()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                }));
            }
            ValidationErrorsKind::Struct(inner) => collect_into(inner, Some(&path), out),
            ValidationErrorsKind::List(items) => {
                for (idx, inner) in items {
                    collect_into(inner, Some(&format!("{}[{}]", path, idx)), out);
                }
            }
        }
    }
}

/// Request fields are camelCase on the wire.
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Convert validation errors to AppError
pub fn validation_error(errors: ValidationErrors) -> AppError {
    AppError::Validation(collect_field_errors(&errors))
}
