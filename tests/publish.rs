//! Publishing against a mock HTTP server

use release_pipeline::core::{Properties, ReleaseError, ReleaseLevel};
use release_pipeline::publish::{
    CredentialProvider, KeyedCredentials, MarketplaceSink, MavenRepositorySink, PublishError, PublishGate,
    PublishOutcome, PublishRequest, PublishSink, PublishTarget, Publisher,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// base64 of `deployer:s3cret`
const DEPLOYER_BASIC: &str = "Basic ZGVwbG95ZXI6czNjcmV0";

const ARTIFACT_PATH: &str = "/releases/io/github/nucleus/nucleus/1.2.3/nucleus-1.2.3.tar.gz";
const POM_PATH: &str = "/releases/io/github/nucleus/nucleus/1.2.3/nucleus-1.2.3.pom";

fn request(version: &str, level: ReleaseLevel) -> PublishRequest {
    PublishRequest::new(
        version,
        level,
        "Nucleus 1.2.3\n\nFixes & features\n",
        format!("nucleus-{}.tar.gz", version),
        vec![7u8; 64],
    )
}

fn maven_sink(url: &str) -> MavenRepositorySink {
    MavenRepositorySink::new(format!("{}/releases", url), "io.github.nucleus", "nucleus").unwrap()
}

fn maven_target(sink: MavenRepositorySink, properties: Properties, env: Properties) -> PublishTarget {
    let configured: Arc<dyn CredentialProvider> = Arc::new(KeyedCredentials::new(
        "property",
        Arc::new(properties),
        Some("maven_user".to_string()),
        "maven_key",
    ));
    let environment: Arc<dyn CredentialProvider> = Arc::new(KeyedCredentials::new(
        "env",
        Arc::new(env),
        Some("MAVEN_USER".to_string()),
        "MAVEN_KEY",
    ));
    PublishTarget::new("maven", Arc::new(sink))
        .with_gate(PublishGate::excluding_versions("SNAPSHOT"))
        .with_credentials(configured)
        .with_credentials(environment)
}

fn deployer_properties() -> Properties {
    [("maven_user", "deployer"), ("maven_key", "s3cret")].into_iter().collect()
}

fn authorization(request: &Request) -> Option<&str> {
    request.headers.get("authorization").and_then(|v| v.to_str().ok())
}

async fn mount_put(server: &MockServer, at: &str, status: u16, times: u64) {
    Mock::given(method("PUT"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(status))
        .expect(times)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_maven_upload_puts_artifact_then_pom() {
    let server = MockServer::start().await;
    mount_put(&server, ARTIFACT_PATH, 201, 1).await;
    mount_put(&server, POM_PATH, 201, 1).await;
    let target = maven_target(maven_sink(&server.uri()), deployer_properties(), Properties::new());

    let outcome = Publisher::new().publish_one(&request("1.2.3", ReleaseLevel::Release), &target).await;

    assert_eq!(
        outcome,
        PublishOutcome::Published {
            acknowledgement: format!("{}{}", server.uri(), ARTIFACT_PATH)
        }
    );

    let received = server.received_requests().await.unwrap();
    let paths: Vec<(&str, &str)> = received.iter().map(|r| (r.method.as_str(), r.url.path())).collect();
    assert_eq!(paths, vec![("PUT", ARTIFACT_PATH), ("PUT", POM_PATH)]);
    assert!(received.iter().all(|r| authorization(r) == Some(DEPLOYER_BASIC)));
    assert_eq!(received[0].body, vec![7u8; 64]);

    let pom = String::from_utf8(received[1].body.clone()).unwrap();
    assert!(pom.contains("<artifactId>nucleus</artifactId>"));
    assert!(pom.contains("<version>1.2.3</version>"));
    assert!(pom.contains("<description>Nucleus 1.2.3</description>"));
}

#[tokio::test]
async fn test_maven_rejection_stops_before_pom() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(ARTIFACT_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("{\"error\":\"bad credentials\"}"))
        .expect(1)
        .mount(&server)
        .await;
    mount_put(&server, POM_PATH, 201, 0).await;
    let credential = KeyedCredentials::new(
        "property",
        Arc::new(deployer_properties()),
        Some("maven_user".to_string()),
        "maven_key",
    )
    .lookup()
    .unwrap();

    let err = maven_sink(&server.uri())
        .publish(&request("1.2.3", ReleaseLevel::Release), &credential)
        .await
        .unwrap_err();
    match err {
        PublishError::Rejected { status, body } => {
            assert_eq!(status, 401);
            assert!(body.contains("bad credentials"));
        }
        other => panic!("expected a rejection, got {:?}", other),
    }
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_credentials_fall_back_to_environment() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(header("authorization", DEPLOYER_BASIC))
        .respond_with(ResponseTemplate::new(201))
        .expect(2)
        .mount(&server)
        .await;
    let properties: Properties = [("maven_user", "someone"), ("maven_key", "  ")].into_iter().collect();
    let env: Properties = [("MAVEN_USER", "deployer"), ("MAVEN_KEY", "s3cret")].into_iter().collect();
    let target = maven_target(maven_sink(&server.uri()), properties, env);

    let outcome = Publisher::new().publish_one(&request("1.2.3", ReleaseLevel::Release), &target).await;

    assert!(matches!(outcome, PublishOutcome::Published { .. }), "{:?}", outcome);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_gate_and_missing_credentials_never_contact_the_remote() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;
    let publisher = Publisher::new();

    let gated = maven_target(maven_sink(&server.uri()), deployer_properties(), Properties::new());
    let outcome = publisher
        .publish_one(&request("1.2.3-SNAPSHOT", ReleaseLevel::Snapshot), &gated)
        .await;
    assert!(matches!(outcome, PublishOutcome::Skipped { ref reason } if reason.contains("SNAPSHOT")));

    let unauthenticated = maven_target(maven_sink(&server.uri()), Properties::new(), Properties::new());
    let outcome = publisher
        .publish_one(&request("1.2.3", ReleaseLevel::Release), &unauthenticated)
        .await;
    assert_eq!(outcome, PublishOutcome::CredentialMissing);
    assert!(matches!(
        outcome.into_result("maven"),
        Err(ReleaseError::CredentialMissing { ref target }) if target == "maven"
    ));

    let outcome = Publisher::disabled()
        .publish_one(&request("1.2.3", ReleaseLevel::Release), &gated)
        .await;
    assert!(matches!(outcome, PublishOutcome::Skipped { .. }));

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unresponsive_remote_times_out_as_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(201).set_delay(Duration::from_secs(30)))
        .mount(&server)
        .await;
    let sink = maven_sink(&server.uri()).with_timeout(1).unwrap();
    let target = maven_target(sink, deployer_properties(), Properties::new());

    let started = Instant::now();
    let outcome = Publisher::new().publish_one(&request("1.2.3", ReleaseLevel::Release), &target).await;

    assert!(started.elapsed() < Duration::from_secs(10), "took {:?}", started.elapsed());
    match outcome.clone() {
        PublishOutcome::Failed { cause } => assert!(cause.starts_with("maven: "), "{}", cause),
        other => panic!("expected a failure, got {:?}", other),
    }
    assert!(matches!(outcome.into_result("maven"), Err(ReleaseError::PublishFailed { .. })));
    // the POM is never attempted once the artifact upload times out
    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].url.path(), ARTIFACT_PATH);
}

#[tokio::test]
async fn test_marketplace_authentication_rejection_fails_the_target() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/authenticate"))
        .respond_with(ResponseTemplate::new(401).set_body_string("{\"error\":\"invalid api key\"}"))
        .expect(1)
        .mount(&server)
        .await;
    let sink = Arc::new(MarketplaceSink::new(server.uri(), "nucleus").unwrap());
    let keys: Arc<dyn CredentialProvider> = Arc::new(KeyedCredentials::new(
        "property",
        Arc::new([("ore_apikey", "wrong-key")].into_iter().collect()),
        None,
        "ore_apikey",
    ));
    let target = PublishTarget::new("ore", sink).with_credentials(keys);

    let outcome = Publisher::new().publish_one(&request("1.2.3", ReleaseLevel::Release), &target).await;

    match outcome.clone() {
        PublishOutcome::Failed { cause } => assert!(cause.contains("401"), "{}", cause),
        other => panic!("expected a failure, got {:?}", other),
    }
    assert!(matches!(outcome.into_result("ore"), Err(ReleaseError::PublishFailed { .. })));

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(authorization(&received[0]), Some("OreApi apikey=\"wrong-key\""));
}
