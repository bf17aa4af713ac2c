//! Scenario execution
//!
//! A single forward pass over the steps. Each step renders its templates
//! from values recorded by earlier steps, executes, and has its
//! expectations evaluated. Values are recorded only from 2xx responses,
//! which is the whole gating rule: a failed or refused create records
//! nothing, so every step referencing it comes up short on rendering and
//! is skipped, transitively. Nothing aborts the run; every step and
//! assertion ends up in the report.

use std::fmt;

use reqwest::Method;
use tracing::{debug, info, warn};

use crate::common::Extractor;
use crate::extract::{extract, Extracted};
use crate::http::{HttpExchange, HttpExecutor};

use super::{render, Check, Expect, Scenario, Step, ValueStore};

/// Lifecycle state of one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    NotStarted,
    /// A response was received (any status)
    Ok,
    /// Transport-level failure
    Failed,
    /// A referenced value was unavailable
    Skipped,
}

/// Outcome of one expectation or check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail,
    /// The owning step never produced a response to judge
    Skipped,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => write!(f, "PASS"),
            Verdict::Fail => write!(f, "FAIL"),
            Verdict::Skipped => write!(f, "SKIPPED"),
        }
    }
}

/// Per-step entry in the report
#[derive(Debug)]
pub struct StepReport {
    pub key: String,
    pub state: StepState,
    pub status: Option<u16>,
    /// Response body, when a response was received
    pub body: Option<String>,
    /// Diagnostic: transport error, missing references, extraction misses
    pub note: Option<String>,
}

/// One evaluated expectation or check
#[derive(Debug)]
pub struct AssertionVerdict {
    /// Key of the owning step, or the scenario name for checks
    pub subject: String,
    pub what: String,
    pub verdict: Verdict,
    pub detail: Option<String>,
}

/// Final result of running a scenario
#[derive(Debug)]
pub struct ScenarioReport {
    pub name: String,
    pub steps: Vec<StepReport>,
    pub assertions: Vec<AssertionVerdict>,
}

impl ScenarioReport {
    /// True iff every step received a response and every verdict passed
    pub fn passed(&self) -> bool {
        self.steps.iter().all(|s| s.state == StepState::Ok)
            && self.assertions.iter().all(|a| a.verdict == Verdict::Pass)
    }
}

/// Executes scenarios sequentially against one base URL
pub struct Runner {
    executor: HttpExecutor,
    extractor: Extractor,
}

impl Runner {
    pub fn new(executor: HttpExecutor, extractor: Extractor) -> Self {
        Self { executor, extractor }
    }

    pub fn base_url(&self) -> &str {
        self.executor.base_url()
    }

    /// Run every step of a scenario top to bottom and report
    pub async fn run(&self, scenario: &Scenario) -> ScenarioReport {
        info!(scenario = %scenario.name, base_url = %self.executor.base_url(), "running scenario");

        let mut values = ValueStore::default();
        let mut steps: Vec<StepReport> = scenario
            .steps
            .iter()
            .map(|s| StepReport {
                key: s.key.clone(),
                state: StepState::NotStarted,
                status: None,
                body: None,
                note: None,
            })
            .collect();
        let mut assertions = Vec::new();

        for (index, step) in scenario.steps.iter().enumerate() {
            let report = &mut steps[index];

            let (path, body) = match rendered_request(step, &values) {
                Ok(parts) => parts,
                Err(missing) => {
                    let note = format!("missing {}", format_refs(&missing));
                    warn!(step = %step.key, %note, "skipping step");
                    report.state = StepState::Skipped;
                    report.note = Some(note);
                    push_skipped_expectations(&mut assertions, step);
                    continue;
                }
            };

            // Validated when the scenario was built
            let method = Method::from_bytes(step.method.as_bytes()).unwrap_or(Method::GET);
            let headers: Vec<(String, String)> = step
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();

            let exchange = match self
                .executor
                .execute(method, &path, &headers, body.as_deref())
                .await
            {
                Ok(exchange) => exchange,
                Err(error) => {
                    warn!(step = %step.key, %error, "transport failure");
                    report.state = StepState::Failed;
                    report.note = Some(error.to_string());
                    push_skipped_expectations(&mut assertions, step);
                    continue;
                }
            };

            info!(
                step = %step.key,
                method = %step.method,
                path = %path,
                status = exchange.status,
                "step executed"
            );
            debug!(step = %step.key, body = %exchange.body, "response body");

            report.state = StepState::Ok;
            report.status = Some(exchange.status);
            report.body = Some(exchange.body.clone());

            if exchange.is_success() {
                let misses = self.record_extractions(step, &exchange, &mut values);
                if !misses.is_empty() {
                    report.note = Some(format!("not found in response: {}", misses.join(", ")));
                }
            } else if !step.extract.is_empty() {
                report.note = Some(format!(
                    "status {} recorded no values; dependents will skip",
                    exchange.status
                ));
            }

            if let Some(expect) = step.expectations() {
                evaluate_expectations(&mut assertions, step, expect, &exchange);
            }
        }

        for check in &scenario.checks {
            assertions.push(evaluate_check(&scenario.name, check, &values));
        }

        ScenarioReport {
            name: scenario.name.clone(),
            steps,
            assertions,
        }
    }

    /// Pull declared fields out of a successful response; returns misses
    fn record_extractions(
        &self,
        step: &Step,
        exchange: &HttpExchange,
        values: &mut ValueStore,
    ) -> Vec<String> {
        let mut misses = Vec::new();
        for field in &step.extract {
            match extract(self.extractor, &exchange.body, field) {
                Extracted::Value(value) => {
                    debug!(step = %step.key, %field, %value, "extracted");
                    values.record(&step.key, field, value);
                }
                Extracted::NotFound => {
                    warn!(step = %step.key, %field, "field not found in response");
                    misses.push(field.clone());
                }
            }
        }
        misses
    }
}

fn rendered_request(
    step: &Step,
    values: &ValueStore,
) -> std::result::Result<(String, Option<String>), Vec<String>> {
    let path = render(&step.path, values);
    let body = match &step.body {
        Some(template) => Some(render(template, values)),
        None => None,
    };

    match (path, body) {
        (Ok(path), None) => Ok((path, None)),
        (Ok(path), Some(Ok(body))) => Ok((path, Some(body))),
        (Ok(_), Some(Err(missing))) => Err(missing),
        (Err(mut missing), body) => {
            if let Some(Err(more)) = body {
                missing.extend(more);
            }
            Err(missing)
        }
    }
}

fn evaluate_expectations(
    assertions: &mut Vec<AssertionVerdict>,
    step: &Step,
    expect: &Expect,
    exchange: &HttpExchange,
) {
    if let Some(expected) = expect.status {
        let verdict = if exchange.status == expected {
            Verdict::Pass
        } else {
            Verdict::Fail
        };
        assertions.push(AssertionVerdict {
            subject: step.key.clone(),
            what: format!("status {expected}"),
            verdict,
            detail: (verdict == Verdict::Fail).then(|| {
                format!("got {}: {}", exchange.status, snippet(&exchange.body))
            }),
        });
    }

    if let Some(expected) = expect.success {
        let verdict = if exchange.is_success() == expected {
            Verdict::Pass
        } else {
            Verdict::Fail
        };
        let what = if expected { "2xx status" } else { "non-2xx status" };
        assertions.push(AssertionVerdict {
            subject: step.key.clone(),
            what: what.to_string(),
            verdict,
            detail: (verdict == Verdict::Fail).then(|| format!("got {}", exchange.status)),
        });
    }

    for needle in &expect.body_contains {
        let verdict = if exchange.body.contains(needle) {
            Verdict::Pass
        } else {
            Verdict::Fail
        };
        assertions.push(AssertionVerdict {
            subject: step.key.clone(),
            what: format!("body contains '{needle}'"),
            verdict,
            detail: (verdict == Verdict::Fail).then(|| format!("body: {}", snippet(&exchange.body))),
        });
    }
}

/// Expectations of a step that never produced a response
fn push_skipped_expectations(assertions: &mut Vec<AssertionVerdict>, step: &Step) {
    let Some(expect) = step.expectations() else {
        return;
    };

    let mut whats = Vec::new();
    if let Some(status) = expect.status {
        whats.push(format!("status {status}"));
    }
    if let Some(success) = expect.success {
        whats.push(if success { "2xx status" } else { "non-2xx status" }.to_string());
    }
    for needle in &expect.body_contains {
        whats.push(format!("body contains '{needle}'"));
    }

    for what in whats {
        assertions.push(AssertionVerdict {
            subject: step.key.clone(),
            what,
            verdict: Verdict::Skipped,
            detail: Some("step did not execute".to_string()),
        });
    }
}

fn evaluate_check(scenario: &str, check: &Check, values: &ValueStore) -> AssertionVerdict {
    let what = format!("distinct {}", check.distinct.join(" / "));

    let mut resolved = Vec::with_capacity(check.distinct.len());
    for reference in &check.distinct {
        match values.get(reference) {
            Some(value) => resolved.push((reference.as_str(), value)),
            None => {
                return AssertionVerdict {
                    subject: scenario.to_string(),
                    what,
                    verdict: Verdict::Skipped,
                    detail: Some(format!("'{reference}' was never extracted")),
                };
            }
        }
    }

    for (i, (ref_a, a)) in resolved.iter().enumerate() {
        for (ref_b, b) in &resolved[i + 1..] {
            if a == b {
                return AssertionVerdict {
                    subject: scenario.to_string(),
                    what,
                    verdict: Verdict::Fail,
                    detail: Some(format!("{ref_a} and {ref_b} are both '{a}'")),
                };
            }
        }
    }

    AssertionVerdict {
        subject: scenario.to_string(),
        what,
        verdict: Verdict::Pass,
        detail: None,
    }
}

fn format_refs(refs: &[String]) -> String {
    refs.iter()
        .map(|r| format!("${{{r}}}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn snippet(body: &str) -> String {
    const LIMIT: usize = 200;
    if body.len() > LIMIT {
        let mut end = LIMIT;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exchange(status: u16, body: &str) -> HttpExchange {
        HttpExchange {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn status_expectation_passes_and_fails() {
        let step = Step::post("create", "/products", "{}").expect_status(201);
        let expect = step.expectations().unwrap();

        let mut assertions = Vec::new();
        evaluate_expectations(&mut assertions, &step, expect, &exchange(201, "{}"));
        evaluate_expectations(&mut assertions, &step, expect, &exchange(500, "boom"));

        assert_eq!(assertions[0].verdict, Verdict::Pass);
        assert_eq!(assertions[1].verdict, Verdict::Fail);
        assert!(assertions[1].detail.as_ref().unwrap().contains("500"));
    }

    #[test]
    fn body_contains_expectation() {
        let step = Step::get("fetch", "/products/1").expect_contains("Yellow Onion");
        let expect = step.expectations().unwrap();

        let mut assertions = Vec::new();
        evaluate_expectations(
            &mut assertions,
            &step,
            expect,
            &exchange(200, r#"{"id":1,"name":"Yellow Onion"}"#),
        );
        evaluate_expectations(&mut assertions, &step, expect, &exchange(200, "{}"));

        assert_eq!(assertions[0].verdict, Verdict::Pass);
        assert_eq!(assertions[1].verdict, Verdict::Fail);
    }

    #[test]
    fn distinct_check_detects_collision() {
        let mut values = ValueStore::default();
        values.record("a", "slug", "test-product".to_string());
        values.record("b", "slug", "test-product-2".to_string());
        values.record("c", "slug", "test-product".to_string());

        let check = Check {
            distinct: vec!["a.slug".into(), "b.slug".into(), "c.slug".into()],
        };
        let verdict = evaluate_check("slugs", &check, &values);
        assert_eq!(verdict.verdict, Verdict::Fail);
        assert!(verdict.detail.unwrap().contains("a.slug"));
    }

    #[test]
    fn distinct_check_skips_on_missing_reference() {
        let mut values = ValueStore::default();
        values.record("a", "slug", "x".to_string());

        let check = Check {
            distinct: vec!["a.slug".into(), "b.slug".into()],
        };
        assert_eq!(
            evaluate_check("slugs", &check, &values).verdict,
            Verdict::Skipped
        );
    }

    #[test]
    fn distinct_check_passes_when_all_differ() {
        let mut values = ValueStore::default();
        values.record("a", "slug", "x".to_string());
        values.record("b", "slug", "x-2".to_string());

        let check = Check {
            distinct: vec!["a.slug".into(), "b.slug".into()],
        };
        assert_eq!(
            evaluate_check("slugs", &check, &values).verdict,
            Verdict::Pass
        );
    }

    #[test]
    fn skipped_step_reports_skipped_verdicts() {
        let step = Step::get("fetch", "/products/${create.id}")
            .expect_status(200)
            .expect_contains("Onion");

        let mut assertions = Vec::new();
        push_skipped_expectations(&mut assertions, &step);

        assert_eq!(assertions.len(), 2);
        assert!(assertions.iter().all(|a| a.verdict == Verdict::Skipped));
    }

    #[test]
    fn rendered_request_collects_missing_from_path_and_body() {
        let step = Step::post("pay", "/orders/${order.id}/pay", r#"{"userId":${user.id}}"#);
        let missing = rendered_request(&step, &ValueStore::default()).unwrap_err();
        assert_eq!(missing, vec!["order.id".to_string(), "user.id".to_string()]);
    }
}
