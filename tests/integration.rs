//! End-to-end integration tests
//!
//! Each test starts a fresh in-process mock store on an ephemeral port and
//! drives real scenarios through the runner against it: the full built-in
//! catalog, dependency gating on failed creates, transport failures, and
//! a scenario loaded from a YAML fixture.

use std::net::{SocketAddr, TcpListener};
use std::path::PathBuf;
use std::time::Duration;

use storecheck::http::HttpExecutor;
use storecheck::mock::{self, MockStore};
use storecheck::scenario::{catalog, Scenario, Step};
use storecheck::{Extractor, Runner, StepState, Verdict};

async fn mock_runner() -> (MockStore, Runner) {
    let store = mock::start(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .expect("failed to start mock store");
    let executor = HttpExecutor::new(&store.base_url(), Duration::from_secs(5))
        .expect("failed to build executor");
    (store, Runner::new(executor, Extractor::Scan))
}

fn scenario(name: &str, steps: Vec<Step>) -> Scenario {
    let scenario = Scenario {
        name: name.to_string(),
        description: None,
        steps,
        checks: Vec::new(),
    };
    scenario.validate().expect("test scenario must validate");
    scenario
}

#[tokio::test]
async fn all_builtin_scenarios_pass_against_mock_store() {
    for scenario in catalog::all(2) {
        // Fresh store per scenario: each is expected to pass standalone
        let (_store, runner) = mock_runner().await;
        let report = runner.run(&scenario).await;
        assert!(
            report.passed(),
            "scenario '{}' failed: {:#?}",
            scenario.name,
            report
        );
    }
}

#[tokio::test]
async fn create_then_fetch_threads_extracted_id() {
    let (_store, runner) = mock_runner().await;

    let plan = scenario(
        "create-fetch",
        vec![
            Step::post(
                "create",
                "/products",
                r#"{"name": "Shallot", "price": 2.99, "quantity": 40}"#,
            )
            .extracts(&["id"])
            .expect_status(201),
            Step::get("fetch", "/products/${create.id}")
                .expect_success()
                .expect_contains("Shallot"),
        ],
    );

    let report = runner.run(&plan).await;
    assert!(report.passed(), "{report:#?}");
    assert_eq!(report.steps[1].state, StepState::Ok);
    // Seeded catalog holds ids 1 and 2, so the new product is id 3
    assert!(report.steps[1].body.as_ref().unwrap().contains("\"id\":3"));
}

#[tokio::test]
async fn rejected_create_skips_dependent_fetch() {
    let (_store, runner) = mock_runner().await;

    // Body is missing required fields, so the create is rejected with 400
    let plan = scenario(
        "bad-create",
        vec![
            Step::post("create", "/products", "{}")
                .extracts(&["id"])
                .expect_status(201),
            Step::get("fetch", "/products/${create.id}").expect_success(),
        ],
    );

    let report = runner.run(&plan).await;
    assert!(!report.passed());
    assert_eq!(report.steps[0].state, StepState::Ok);
    assert_eq!(report.steps[0].status, Some(400));
    assert_eq!(report.steps[1].state, StepState::Skipped);

    // The create's status expectation fails; the fetch's is skipped
    assert_eq!(report.assertions[0].verdict, Verdict::Fail);
    assert_eq!(report.assertions[1].verdict, Verdict::Skipped);
}

#[tokio::test]
async fn duplicate_sku_yields_conflict_and_run_completes() {
    let (_store, runner) = mock_runner().await;
    let plan = catalog::find("product-duplicate-sku", 2).unwrap();

    let report = runner.run(&plan).await;
    assert!(report.passed(), "{report:#?}");
    assert_eq!(report.steps[1].status, Some(409));
    assert!(report.steps[1].body.as_ref().unwrap().contains("Product Already Exists"));
}

#[tokio::test]
async fn same_name_products_get_distinct_slugs() {
    let (_store, runner) = mock_runner().await;
    let plan = catalog::find("slug-generation", 2).unwrap();

    let report = runner.run(&plan).await;
    assert!(report.passed(), "{report:#?}");

    let distinct = report
        .assertions
        .iter()
        .find(|a| a.what.starts_with("distinct"))
        .expect("distinct check reported");
    assert_eq!(distinct.verdict, Verdict::Pass);
}

#[tokio::test]
async fn cart_reflects_items_then_empties_after_checkout() {
    let (_store, runner) = mock_runner().await;
    let plan = catalog::find("cart-checkout", 2).unwrap();

    let report = runner.run(&plan).await;
    assert!(report.passed(), "{report:#?}");

    let before = report.steps.iter().find(|s| s.key == "before").unwrap();
    let body = before.body.as_ref().unwrap();
    assert!(body.contains("\"productId\":1"));
    assert!(body.contains("\"productId\":2"));

    let after = report.steps.iter().find(|s| s.key == "after").unwrap();
    assert!(after.body.as_ref().unwrap().contains("\"items\":[]"));
}

#[tokio::test]
async fn webhook_for_unknown_order_is_rejected() {
    let (_store, runner) = mock_runner().await;

    let plan = scenario(
        "stale-webhook",
        vec![Step::post(
            "completed",
            "/api/payments/webhook",
            r#"{"id": "evt_1", "type": "checkout.session.completed", "data": {"object": {"id": "cs_1", "metadata": {"orderId": "9999"}}}}"#,
        )
        .expect_status(400)],
    );

    let report = runner.run(&plan).await;
    assert!(report.passed(), "{report:#?}");
}

#[tokio::test]
async fn unhandled_webhook_event_is_acknowledged() {
    let (_store, runner) = mock_runner().await;

    let plan = scenario(
        "odd-webhook",
        vec![Step::post(
            "event",
            "/api/payments/webhook",
            r#"{"id": "evt_2", "type": "invoice.paid", "data": {"object": {"id": "in_1"}}}"#,
        )
        .expect_status(200)
        .expect_contains("ignored")],
    );

    let report = runner.run(&plan).await;
    assert!(report.passed(), "{report:#?}");
}

#[tokio::test]
async fn transport_failure_fails_step_and_skips_dependents() {
    // Bind and immediately drop a listener to get a port nothing serves
    let closed_port = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind probe port");
        listener.local_addr().unwrap().port()
    };

    let executor = HttpExecutor::new(
        &format!("http://127.0.0.1:{closed_port}"),
        Duration::from_secs(2),
    )
    .unwrap();
    let runner = Runner::new(executor, Extractor::Scan);

    let plan = scenario(
        "unreachable",
        vec![
            Step::post("create", "/products", r#"{"name": "X", "price": 1.0, "quantity": 1}"#)
                .extracts(&["id"])
                .expect_status(201),
            Step::get("fetch", "/products/${create.id}").expect_success(),
        ],
    );

    let report = runner.run(&plan).await;
    assert!(!report.passed());
    assert_eq!(report.steps[0].state, StepState::Failed);
    assert_eq!(report.steps[1].state, StepState::Skipped);
    assert!(report.assertions.iter().all(|a| a.verdict == Verdict::Skipped));
}

#[tokio::test]
async fn structured_extraction_runs_the_same_plan() {
    let (store, _) = mock_runner().await;
    let executor = HttpExecutor::new(&store.base_url(), Duration::from_secs(5)).unwrap();
    let runner = Runner::new(executor, Extractor::Structured);

    let report = runner.run(&catalog::find("product-demo", 2).unwrap()).await;
    assert!(report.passed(), "{report:#?}");
}

#[tokio::test]
async fn yaml_scenario_file_runs() {
    let (_store, runner) = mock_runner().await;

    let fixture = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("smoke.yaml");
    let plan = Scenario::load(&fixture).expect("fixture parses");

    let report = runner.run(&plan).await;
    assert!(report.passed(), "{report:#?}");
}
