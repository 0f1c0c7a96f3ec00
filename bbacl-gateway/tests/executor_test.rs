//! Executor policy tests against a recording gateway

use async_trait::async_trait;
use bbacl_gateway::{
    add_default_reviewers, execute, GatewayError, PermissionGateway, RemoteError,
};
use bbacl_model::{diff, Operation, PermissionGrant, PermissionLevel, ReviewerAccount};
use std::collections::HashSet;
use std::sync::Mutex;

/// Gateway double that records every mutating call and fails on chosen ids
#[derive(Default)]
struct RecordingGateway {
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl RecordingGateway {
    fn failing_on(ids: &[&str]) -> Self {
        Self {
            failing: ids.iter().map(|s| s.to_string()).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, id: &str) -> Result<(), GatewayError> {
        self.calls.lock().unwrap().push(id.to_string());
        if self.failing.contains(id) {
            Err(GatewayError::Http {
                status: 500,
                reason: "Internal Server Error".into(),
                error: RemoteError::from_body("boom"),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PermissionGateway for RecordingGateway {
    async fn fetch_group_grants(&self, _: &str, _: &str) -> Result<Vec<PermissionGrant>, GatewayError> {
        Ok(Vec::new())
    }

    async fn fetch_user_grants(&self, _: &str, _: &str) -> Result<Vec<PermissionGrant>, GatewayError> {
        Ok(Vec::new())
    }

    async fn apply(&self, _: &str, _: &str, operation: &Operation) -> Result<(), GatewayError> {
        if operation.is_noop() {
            return Err(GatewayError::NoOp {
                object_id: operation.object_id().to_string(),
            });
        }
        self.record(operation.object_id())
    }

    async fn list_default_reviewers(&self, _: &str, _: &str) -> Result<Vec<ReviewerAccount>, GatewayError> {
        Ok(Vec::new())
    }

    async fn add_default_reviewer(&self, _: &str, _: &str, reviewer: &str) -> Result<(), GatewayError> {
        self.record(reviewer)
    }

    async fn remove_default_reviewer(&self, _: &str, _: &str, reviewer: &str) -> Result<(), GatewayError> {
        self.record(reviewer)
    }
}

fn grant(id: &str) -> PermissionGrant {
    PermissionGrant::user(id, id, PermissionLevel::Write)
}

#[tokio::test]
async fn test_execute_stops_at_first_failure() {
    let gateway = RecordingGateway::failing_on(&["op2"]);
    let operations = vec![
        Operation::add(&grant("op1")),
        Operation::add(&grant("op2")),
        Operation::add(&grant("op3")),
    ];

    let err = execute(&gateway, "ws", "repo", &operations)
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert_eq!(gateway.calls(), vec!["op1", "op2"]);
}

#[tokio::test]
async fn test_execute_skips_noops() {
    let gateway = RecordingGateway::default();
    let source = vec![grant("{a}"), grant("{b}")];
    let target = vec![grant("{a}")];

    let applied = execute(&gateway, "ws", "repo", &diff(&source, &target))
        .await
        .unwrap();

    assert_eq!(applied, 1);
    assert_eq!(gateway.calls(), vec!["{b}"]);
}

#[tokio::test]
async fn test_execute_through_trait_object() {
    let gateway: Box<dyn PermissionGateway> = Box::new(RecordingGateway::default());
    let operations = vec![Operation::remove(&grant("{x}"))];

    let applied = execute(gateway.as_ref(), "ws", "repo", &operations)
        .await
        .unwrap();

    assert_eq!(applied, 1);
}

#[tokio::test]
async fn test_reviewer_fan_out_attempts_every_item() {
    let gateway = RecordingGateway::failing_on(&["bob"]);
    let reviewers = vec!["alice".to_string(), "bob".to_string(), "carol".to_string()];

    let report = add_default_reviewers(&gateway, "ws", "repo", &reviewers).await;

    let mut calls = gateway.calls();
    calls.sort();
    assert_eq!(calls, vec!["alice", "bob", "carol"]);

    assert_eq!(report.succeeded().count(), 2);
    let err = report.into_result().unwrap_err();
    match err {
        GatewayError::Batch(report) => {
            let failed: Vec<_> = report.failures().map(|(item, _)| item.to_string()).collect();
            assert_eq!(failed, vec!["bob"]);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}
