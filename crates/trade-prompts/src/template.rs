// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! A compiled-capable prompt template and its `{{var}}` substitution.

use std::collections::HashMap;

use crate::error::PromptError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub name: String,
    pub version: Option<String>,
    pub label: String,
    pub body: String,
}

impl Template {
    pub fn new(name: impl Into<String>, label: impl Into<String>, body: impl Into<String>) -> Self {
        Self { name: name.into(), version: None, label: label.into(), body: body.into() }
    }
}

/// Names of every `{{key}}` placeholder in `body`, in first-appearance order, deduplicated.
fn placeholders(body: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut rest = body;
    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        if let Some(end) = after.find("}}") {
            let key = after[..end].trim().to_string();
            if !key.is_empty() && !found.contains(&key) {
                found.push(key);
            }
            rest = &after[end + 2..];
        } else {
            break;
        }
    }
    found
}

/// Substitute every `{{key}}` placeholder in `template.body` with `vars[key]`.
/// A placeholder with no matching entry in `vars` fails the whole compile.
pub fn compile(template: &Template, vars: &HashMap<String, String>) -> Result<String, PromptError> {
    let required = placeholders(&template.body);
    let missing: Vec<String> = required.iter().filter(|k| !vars.contains_key(*k)).cloned().collect();
    if !missing.is_empty() {
        return Err(PromptError::ConfigError { template: template.name.clone(), missing });
    }

    let mut result = template.body.clone();
    for key in &required {
        result = result.replace(&format!("{{{{{}}}}}", key), &vars[key]);
    }
    Ok(result)
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn substitutes_all_placeholders() {
        let t = Template::new("writing_assistant_v1", "latest", "Content: {{document_content}}");
        let out = compile(&t, &vars(&[("document_content", "hello")])).unwrap();
        assert_eq!(out, "Content: hello");
    }

    #[test]
    fn multiple_placeholders() {
        let t = Template::new(
            "document_assistant_v1",
            "latest",
            "{{document_id}}/{{document_name}}.{{document_type}}",
        );
        let out = compile(
            &t,
            &vars(&[("document_id", "d1"), ("document_name", "offer"), ("document_type", "pdf")]),
        )
        .unwrap();
        assert_eq!(out, "d1/offer.pdf");
    }

    #[test]
    fn missing_variable_is_config_error() {
        let t = Template::new("writing_assistant_v1", "latest", "Content: {{document_content}}");
        let err = compile(&t, &HashMap::new()).unwrap_err();
        match err {
            PromptError::ConfigError { missing, .. } => assert_eq!(missing, vec!["document_content".to_string()]),
            _ => panic!("expected ConfigError"),
        }
    }

    #[test]
    fn no_placeholders_with_no_vars() {
        let t = Template::new("trade_assistant_v1", "latest", "You are a trade assistant.");
        let out = compile(&t, &HashMap::new()).unwrap();
        assert_eq!(out, "You are a trade assistant.");
    }

    #[test]
    fn repeated_placeholder_substituted_everywhere() {
        let t = Template::new("x", "latest", "{{name}} and {{name}} again");
        let out = compile(&t, &vars(&[("name", "Kim")])).unwrap();
        assert_eq!(out, "Kim and Kim again");
    }
}
