//! Scenario data model
//!
//! A scenario is an ordered list of HTTP steps plus assertions. Step path
//! and body templates may reference values extracted from earlier steps
//! with `${step.field}` placeholders; the runner resolves them in a single
//! forward pass. Scenarios are defined in code (the built-in catalog) or
//! loaded from YAML files.

pub mod catalog;
pub mod runner;

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::Deserialize;

use crate::common::{Error, Result};

/// An ordered group of steps and checks expressing one end-to-end behavior
#[derive(Debug, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub steps: Vec<Step>,
    /// Assertions over extracted values, evaluated after all steps ran
    #[serde(default)]
    pub checks: Vec<Check>,
}

/// One planned HTTP request/response interaction
#[derive(Debug, Deserialize)]
pub struct Step {
    /// Name other steps use to reference this step's extracted values
    pub key: String,
    pub method: String,
    /// Path template, appended to the base URL
    pub path: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Body template; presence implies Content-Type: application/json
    #[serde(default)]
    pub body: Option<String>,
    /// Fields to pull out of the response body on a 2xx status
    #[serde(default)]
    pub extract: Vec<String>,
    #[serde(default)]
    pub expect: Option<Expect>,
}

/// Expected outcome of a step
///
/// Every populated field yields one PASS/FAIL verdict in the report.
#[derive(Debug, Default, Deserialize)]
pub struct Expect {
    /// Exact status code
    #[serde(default)]
    pub status: Option<u16>,
    /// true: any 2xx; false: anything outside 2xx
    #[serde(default)]
    pub success: Option<bool>,
    /// Substrings the body must contain
    #[serde(default)]
    pub body_contains: Vec<String>,
}

impl Expect {
    fn is_empty(&self) -> bool {
        self.status.is_none() && self.success.is_none() && self.body_contains.is_empty()
    }
}

/// Scenario-level assertion: the referenced values are pairwise distinct
#[derive(Debug, Deserialize)]
pub struct Check {
    /// References of the form `step.field`
    pub distinct: Vec<String>,
}

impl Scenario {
    /// Parse a scenario from YAML text
    pub fn from_yaml(text: &str) -> Result<Self> {
        let scenario: Scenario =
            serde_yaml::from_str(text).map_err(|e| Error::ScenarioParse(e.to_string()))?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Load a scenario from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, &e))?;
        Self::from_yaml(&content)
    }

    /// Check structural invariants: unique step keys, known methods, and
    /// templates that only reference earlier steps.
    pub fn validate(&self) -> Result<()> {
        if self.steps.is_empty() {
            return Err(Error::ScenarioInvalid(format!(
                "scenario '{}' has no steps",
                self.name
            )));
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for step in &self.steps {
            if step.key.is_empty() {
                return Err(Error::ScenarioInvalid(format!(
                    "scenario '{}' has a step with an empty key",
                    self.name
                )));
            }
            if !seen.insert(step.key.as_str()) {
                return Err(Error::ScenarioInvalid(format!(
                    "duplicate step key '{}' in scenario '{}'",
                    step.key, self.name
                )));
            }

            reqwest::Method::from_bytes(step.method.as_bytes()).map_err(|_| {
                Error::ScenarioInvalid(format!(
                    "step '{}' has invalid method '{}'",
                    step.key, step.method
                ))
            })?;

            for reference in step.references() {
                let producer = reference.split('.').next().unwrap_or("");
                if !seen.contains(producer) || producer == step.key {
                    return Err(Error::ScenarioInvalid(format!(
                        "step '{}' references '${{{}}}' but no earlier step is named '{}'",
                        step.key, reference, producer
                    )));
                }
            }
        }

        for check in &self.checks {
            if check.distinct.len() < 2 {
                return Err(Error::ScenarioInvalid(format!(
                    "distinct check in scenario '{}' needs at least two references",
                    self.name
                )));
            }
        }

        Ok(())
    }
}

impl Step {
    pub fn get(key: &str, path: &str) -> Self {
        Self::request(key, "GET", path, None)
    }

    pub fn post(key: &str, path: &str, body: &str) -> Self {
        Self::request(key, "POST", path, Some(body.to_string()))
    }

    pub fn post_empty(key: &str, path: &str) -> Self {
        Self::request(key, "POST", path, None)
    }

    fn request(key: &str, method: &str, path: &str, body: Option<String>) -> Self {
        Self {
            key: key.to_string(),
            method: method.to_string(),
            path: path.to_string(),
            headers: BTreeMap::new(),
            body,
            extract: Vec::new(),
            expect: None,
        }
    }

    /// Record fields to extract from the response
    pub fn extracts(mut self, fields: &[&str]) -> Self {
        self.extract = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn expect_status(mut self, status: u16) -> Self {
        self.expect.get_or_insert_with(Expect::default).status = Some(status);
        self
    }

    pub fn expect_success(mut self) -> Self {
        self.expect.get_or_insert_with(Expect::default).success = Some(true);
        self
    }

    pub fn expect_contains(mut self, needle: &str) -> Self {
        self.expect
            .get_or_insert_with(Expect::default)
            .body_contains
            .push(needle.to_string());
        self
    }

    /// All `${step.field}` references in this step's templates
    pub fn references(&self) -> Vec<String> {
        let mut refs = references_in(&self.path);
        if let Some(body) = &self.body {
            refs.extend(references_in(body));
        }
        refs
    }

    /// Expectations to evaluate; None when none were declared
    pub fn expectations(&self) -> Option<&Expect> {
        self.expect.as_ref().filter(|e| !e.is_empty())
    }
}

/// Values extracted from earlier steps, keyed by `step.field`
#[derive(Debug, Default)]
pub struct ValueStore {
    values: BTreeMap<String, String>,
}

impl ValueStore {
    pub fn record(&mut self, step: &str, field: &str, value: String) {
        self.values.insert(format!("{step}.{field}"), value);
    }

    pub fn get(&self, reference: &str) -> Option<&str> {
        self.values.get(reference).map(String::as_str)
    }
}

/// Substitute `${step.field}` placeholders in a template
///
/// Returns the rendered string, or the list of unresolved references so
/// the runner can name them in its skip diagnostic.
pub fn render(template: &str, values: &ValueStore) -> std::result::Result<String, Vec<String>> {
    let mut out = String::with_capacity(template.len());
    let mut missing = Vec::new();
    let mut rest = template;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let reference = &after[..end];
                match values.get(reference) {
                    Some(value) => out.push_str(value),
                    None => missing.push(reference.to_string()),
                }
                rest = &after[end + 1..];
            }
            None => {
                // Unterminated placeholder; emit literally
                out.push_str(rest);
                rest = "";
            }
        }
    }
    out.push_str(rest);

    if missing.is_empty() {
        Ok(out)
    } else {
        Err(missing)
    }
}

fn references_in(template: &str) -> Vec<String> {
    let mut refs = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                refs.push(after[..end].to_string());
                rest = &after[end + 1..];
            }
            None => break,
        }
    }
    refs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ValueStore {
        let mut values = ValueStore::default();
        values.record("create", "id", "42".to_string());
        values.record("create", "slug", "test-product".to_string());
        values
    }

    #[test]
    fn render_substitutes_references() {
        let rendered = render("/products/${create.id}", &store()).unwrap();
        assert_eq!(rendered, "/products/42");
    }

    #[test]
    fn render_handles_multiple_references() {
        let rendered =
            render("{\"id\":${create.id},\"slug\":\"${create.slug}\"}", &store()).unwrap();
        assert_eq!(rendered, "{\"id\":42,\"slug\":\"test-product\"}");
    }

    #[test]
    fn render_reports_missing_references() {
        let missing = render("/orders/${order.id}/x/${create.id}", &store()).unwrap_err();
        assert_eq!(missing, vec!["order.id".to_string()]);
    }

    #[test]
    fn render_leaves_plain_text_alone() {
        let rendered = render("/products", &store()).unwrap();
        assert_eq!(rendered, "/products");
    }

    #[test]
    fn step_collects_references_from_path_and_body() {
        let step = Step::post("fetch", "/orders/${order.id}", "{\"userId\":${user.id}}");
        assert_eq!(step.references(), vec!["order.id", "user.id"]);
    }

    #[test]
    fn validate_rejects_forward_reference() {
        let scenario = Scenario {
            name: "bad".to_string(),
            description: None,
            steps: vec![
                Step::get("fetch", "/products/${create.id}"),
                Step::post("create", "/products", "{}"),
            ],
            checks: vec![],
        };
        assert!(matches!(scenario.validate(), Err(Error::ScenarioInvalid(_))));
    }

    #[test]
    fn validate_rejects_duplicate_keys() {
        let scenario = Scenario {
            name: "bad".to_string(),
            description: None,
            steps: vec![Step::get("a", "/x"), Step::get("a", "/y")],
            checks: vec![],
        };
        assert!(matches!(scenario.validate(), Err(Error::ScenarioInvalid(_))));
    }

    #[test]
    fn yaml_scenario_round_trip() {
        let text = r#"
name: smoke
description: create then fetch
steps:
  - key: create
    method: POST
    path: /products
    body: '{"name":"Yellow Onion","price":1.99,"quantity":100}'
    extract: [id]
    expect:
      status: 201
  - key: fetch
    method: GET
    path: /products/${create.id}
    expect:
      success: true
      body_contains: ["Yellow Onion"]
"#;
        let scenario = Scenario::from_yaml(text).unwrap();
        assert_eq!(scenario.name, "smoke");
        assert_eq!(scenario.steps.len(), 2);
        assert_eq!(scenario.steps[0].extract, vec!["id"]);
        assert_eq!(
            scenario.steps[1].expect.as_ref().unwrap().body_contains,
            vec!["Yellow Onion"]
        );
    }
}
