//! Request templating: placeholder substitution and response extraction.
//!
//! A request body template may carry `{{name}}` placeholders that are
//! resolved from the [`VariableStore`] immediately before a request is
//! sent. After a validated response is received, named properties are
//! extracted from the raw body with a tag-delimited pattern
//! `<ns:name>value</ns:name>` (any namespace prefix) and written back into
//! the store under `"<testCaseName>.<name>"`.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::TemplateError;
use crate::vars::VariableStore;

/// Placeholders are matched as minimal bracketed spans so that two tokens
/// on one line never collapse into a single greedy match.
static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{(.+?)\}\}").expect("placeholder pattern is valid"));

/// Resolve `{{name}}` placeholders in a request body template.
///
/// For each placeholder occurrence found in the template, the first
/// remaining occurrence of that exact token is replaced with the store
/// value when a non-empty value exists. Placeholders with no stored value
/// are left verbatim. Substituted values are not re-scanned, so there is
/// no recursive substitution.
pub fn substitute(template: &str, store: &VariableStore) -> String {
    let mut resolved = template.to_string();
    for token in PLACEHOLDER.find_iter(template) {
        let token = token.as_str();
        let name = &token[2..token.len() - 2];
        if let Some(value) = store.get(name)
            && !value.is_empty()
        {
            resolved = resolved.replacen(token, &value, 1);
        }
    }
    resolved
}

/// Extract named response properties from a raw body into the store.
///
/// Each property is stored under `"<test>.<property>"`. Properties that
/// already hold a non-empty value are skipped, so a second extraction of
/// the same property never overwrites the first. A property whose tag is
/// absent from the body is a typed [`TemplateError::ExtractionMissing`]
/// failure; the caller must mark the test case as failed.
pub fn extract(
    test: &str,
    body: &str,
    properties: &[String],
    store: &VariableStore,
) -> Result<(), TemplateError> {
    for property in properties {
        let key = VariableStore::scoped_key(test, property);
        if store.is_populated(&key) {
            continue;
        }

        let escaped = regex::escape(property);
        let pattern = format!("<[^:>]+:{escaped}>(.*?)</[^:>]+:{escaped}>");
        let tag = Regex::new(&pattern).map_err(|source| TemplateError::InvalidPattern {
            property: property.clone(),
            source,
        })?;

        let value = tag
            .captures(body)
            .and_then(|captures| captures.get(1))
            .map(|capture| capture.as_str().to_string())
            .ok_or_else(|| TemplateError::ExtractionMissing {
                test: test.to_string(),
                property: property.clone(),
            })?;

        store.insert_if_absent(key, value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitute_resolves_known_placeholder() {
        let store = VariableStore::new();
        store.insert("order.id", "42");
        assert_eq!(substitute("<id>{{order.id}}</id>", &store), "<id>42</id>");
    }

    #[test]
    fn substitute_leaves_unknown_placeholder_verbatim() {
        let store = VariableStore::new();
        let template = "<id>{{order.id}}</id>";
        assert_eq!(substitute(template, &store), template);
    }

    #[test]
    fn substitute_leaves_empty_value_placeholder_verbatim() {
        let store = VariableStore::new();
        store.insert("order.id", "");
        let template = "<id>{{order.id}}</id>";
        assert_eq!(substitute(template, &store), template);
    }

    #[test]
    fn substitute_replaces_every_occurrence_of_repeated_token() {
        let store = VariableStore::new();
        store.insert("token", "X");
        assert_eq!(substitute("{{token}}-{{token}}", &store), "X-X");
    }

    #[test]
    fn substitute_matches_minimal_spans_not_greedy() {
        let store = VariableStore::new();
        store.insert("a", "1");
        store.insert("b", "2");
        assert_eq!(substitute("{{a}} and {{b}}", &store), "1 and 2");
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let store = VariableStore::new();
        store.insert("outer", "{{inner}}");
        store.insert("inner", "nope");
        assert_eq!(substitute("{{outer}}", &store), "{{inner}}");
    }

    #[test]
    fn extract_stores_first_tag_value_under_scoped_key() {
        let store = VariableStore::new();
        let body = "<soap:Envelope><ns:orderId>42</ns:orderId></soap:Envelope>";
        extract("caseA", body, &["orderId".to_string()], &store).unwrap();
        assert_eq!(store.get("caseA.orderId").as_deref(), Some("42"));
    }

    #[test]
    fn extract_ignores_namespace_prefix() {
        let store = VariableStore::new();
        let body = "<whatever:token>abc</whatever:token>";
        extract("caseA", body, &["token".to_string()], &store).unwrap();
        assert_eq!(store.get("caseA.token").as_deref(), Some("abc"));
    }

    #[test]
    fn extract_missing_tag_is_an_error_not_a_panic() {
        let store = VariableStore::new();
        let err = extract("caseA", "<ns:other>1</ns:other>", &["orderId".to_string()], &store)
            .unwrap_err();
        match err {
            TemplateError::ExtractionMissing { test, property } => {
                assert_eq!(test, "caseA");
                assert_eq!(property, "orderId");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn extract_is_idempotent_for_populated_properties() {
        let store = VariableStore::new();
        let first = "<ns:orderId>42</ns:orderId>";
        let second = "<ns:orderId>99</ns:orderId>";
        extract("caseA", first, &["orderId".to_string()], &store).unwrap();
        extract("caseA", second, &["orderId".to_string()], &store).unwrap();
        assert_eq!(store.get("caseA.orderId").as_deref(), Some("42"));
    }

    #[test]
    fn extraction_feeds_later_substitution() {
        let store = VariableStore::new();
        let body = "<ns:orderId>42</ns:orderId>";
        extract("A", body, &["orderId".to_string()], &store).unwrap();
        let payload = substitute("<lookup>{{A.orderId}}</lookup>", &store);
        assert_eq!(payload, "<lookup>42</lookup>");
    }
}
