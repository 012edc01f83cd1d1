use std::{
    io::Write,
    time::{Duration, Instant},
};

use assert_cmd::Command;
use httpmock::{Method::POST, MockServer};
use predicates::prelude::*;
use serde_json::Value;
use swarm::PKG_VERSION;

fn swarm() -> Command {
    Command::cargo_bin("swarm").unwrap()
}

fn run_against(endpoint: &str) -> Command {
    let mut cmd = swarm();
    cmd.args([
        "run",
        "--endpoint",
        endpoint,
        "--vus",
        "2",
        "--duration",
        "1s",
        "--pause",
        "50ms",
        "--format",
        "json",
    ]);
    cmd
}

fn summary(stdout: &[u8]) -> Value {
    serde_json::from_slice(stdout).expect("summary is JSON")
}

#[test]
fn it_prints_its_version() {
    swarm()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(PKG_VERSION));
}

#[test]
fn it_prints_the_default_scenario() {
    swarm()
        .arg("scenario")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("[[step]]")
                .and(predicate::str::contains(r#"name = "themes""#))
                .and(predicate::str::contains(r#"name = "addTheme""#))
                .and(predicate::str::contains(r#"pause = "1s""#)),
        );
}

#[test]
fn a_healthy_endpoint_passes_every_check() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .header("content-type", "application/json")
            .header("accept", "application/json");
        then.status(200).body(r#"{"data":{}}"#);
    });

    let output = run_against(&server.base_url()).assert().success();
    let summary = summary(&output.get_output().stdout);

    assert!(mock.calls() > 0);
    assert_eq!(summary["vus"], 2);
    assert_eq!(summary["transport_errors"], 0);
    assert!(summary["iterations"].as_u64().unwrap() > 0);
    let checks = summary["checks"].as_array().unwrap();
    let names: Vec<_> = checks.iter().map(|check| check["name"].clone()).collect();
    assert_eq!(names, vec!["themes status was 200", "addTheme status was 200"]);
    assert!(checks.iter().all(|check| check["fails"] == 0));
}

#[test]
fn a_failing_mutation_fails_its_check_and_the_run() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).body_includes("addTheme");
        then.status(500).body("boom");
    });
    server.mock(|when, then| {
        when.method(POST).body_includes("themes(onlyHighlight");
        then.status(200).body(r#"{"data":{"themes":[]}}"#);
    });

    let output = run_against(&server.base_url()).assert().code(1);
    let summary = summary(&output.get_output().stdout);

    let checks = summary["checks"].as_array().unwrap();
    let add_theme = checks
        .iter()
        .find(|check| check["name"] == "addTheme status was 200")
        .unwrap();
    assert_eq!(add_theme["passes"], 0);
    assert!(add_theme["fails"].as_u64().unwrap() > 0);
    let themes = checks
        .iter()
        .find(|check| check["name"] == "themes status was 200")
        .unwrap();
    assert_eq!(themes["fails"], 0);
    // failed checks do not stop iterations from completing
    assert!(summary["iterations"].as_u64().unwrap() > 0);
}

#[test]
fn an_unreachable_endpoint_fails_every_check() {
    let output = run_against("http://127.0.0.1:9/").assert().code(1);
    let summary = summary(&output.get_output().stdout);

    let transport_errors = summary["transport_errors"].as_u64().unwrap();
    assert!(transport_errors > 0);
    assert_eq!(summary["requests"], transport_errors);
    assert_eq!(summary["responses"], 0);
    let checks = summary["checks"].as_array().unwrap();
    let names: Vec<_> = checks.iter().map(|check| check["name"].clone()).collect();
    assert_eq!(names, vec!["themes status was 200", "addTheme status was 200"]);
    assert!(checks
        .iter()
        .all(|check| check["passes"] == 0 && check["fails"].as_u64().unwrap() > 0));
}

#[test]
fn a_hung_endpoint_cannot_stretch_the_run_past_its_graceful_stop() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST);
        then.status(200).delay(Duration::from_secs(30));
    });

    let endpoint = server.base_url();
    let started = Instant::now();
    let output = swarm()
        .args([
            "run",
            "--endpoint",
            endpoint.as_str(),
            "--vus",
            "2",
            "--duration",
            "500ms",
            "--graceful-stop",
            "500ms",
            "--format",
            "json",
        ])
        .timeout(Duration::from_secs(20))
        .assert()
        .success();
    let summary = summary(&output.get_output().stdout);

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(summary["iterations"], 0);
    assert_eq!(summary["interrupted_iterations"], 2);
    assert_eq!(summary["responses"], 0);
}

#[test]
fn it_runs_a_scenario_file() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .json_body(serde_json::json!({ "query": "{ __typename }" }));
        then.status(200).body(r#"{"data":{"__typename":"Query"}}"#);
    });
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[[step]]\nname = \"ping\"\nquery = \"{{ __typename }}\"").unwrap();

    let output = run_against(&server.base_url())
        .arg("--scenario")
        .arg(file.path())
        .assert()
        .success();
    let summary = summary(&output.get_output().stdout);

    assert!(mock.calls() > 0);
    assert_eq!(summary["checks"][0]["name"], "ping status was 200");
}

#[test]
fn it_rejects_an_empty_scenario_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "pause = \"1s\"").unwrap();

    swarm()
        .arg("run")
        .arg("--scenario")
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid scenario"));
}

#[test]
fn it_rejects_zero_virtual_users() {
    swarm()
        .args(["run", "--vus", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--vus"));
}
