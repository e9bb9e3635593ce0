use tokenscope::api::dto::AuditResultDto;
use tokenscope::application::{AuditRequest, AuditUsecase};
use tokenscope::domain::integrity::BrokenReason;
use tokenscope::domain::outcome::AuditOutcome;
use tokenscope::domain::usage::UsagePolicy;
use tokenscope::domain::walker::ScanMode;
use tokenscope::infrastructure::Snapshot;

// Every binding channel on one selected subtree, each pointing at a variable
// that fails a different rule.
const SELECTION: &str = r#"{
    "page": {
        "id": "0:1",
        "name": "Components",
        "children": [
            {"id": "1:1", "name": "Button", "type": "COMPONENT",
             "boundVariables": {
                "itemSpacing": {"type": "VARIABLE_ALIAS", "id": "OK"},
                "paddingLeft": {"type": "VARIABLE_ALIAS", "id": "GONE"}
             },
             "fills": [{"type": "SOLID", "boundVariables": {"color": {"type": "VARIABLE_ALIAS", "id": "STALE"}}}],
             "strokes": [{"type": "SOLID", "boundVariables": {"color": {"type": "VARIABLE_ALIAS", "id": "ORPHAN"}}}],
             "children": [
                {"id": "1:2", "name": "Label", "type": "TEXT",
                 "boundVariables": {
                    "fontSize": [{"type": "VARIABLE_ALIAS", "id": "LIB"}, null, {"type": "VARIABLE_ALIAS", "id": "ALIAS"}],
                    "fontFamily": {"type": "VARIABLE_ALIAS", "id": "OFFLINE"},
                    "letterSpacing": {"type": "VARIABLE_ALIAS"}
                 }},
                {"id": "1:3", "name": "Icon", "type": "VECTOR",
                 "fills": [{"type": "SOLID", "boundVariables": {"color": {"type": "VARIABLE_ALIAS", "id": "OK"}}}]}
             ]},
            {"id": "2:1", "name": "Unselected", "type": "FRAME",
             "fills": [{"type": "SOLID", "boundVariables": {"color": {"type": "VARIABLE_ALIAS", "id": "GONE"}}}]}
        ]
    },
    "selection": ["1:1"],
    "collections": [
        {"id": "C", "name": "Tokens"},
        {"id": "R", "name": "Brand library", "remote": true, "unavailable": true}
    ],
    "variables": [
        {"id": "OK", "name": "layout/gap/small", "variableCollectionId": "C",
         "valuesByMode": {"light": 8, "dark": {"type": "VARIABLE_ALIAS", "id": "OK2"}}},
        {"id": "OK2", "name": "layout/gap/medium", "variableCollectionId": "C",
         "valuesByMode": {"light": {"type": "VARIABLE_ALIAS", "id": "OK"}}},
        {"id": "STALE", "name": "color/bg/rest", "variableCollectionId": "C", "deleted": true},
        {"id": "ORPHAN", "name": "color/border/rest", "variableCollectionId": "X"},
        {"id": "LIB", "name": "typography/font-size/medium", "variableCollectionId": "C", "remote": true},
        {"id": "ALIAS", "name": "typography/line-height/medium", "variableCollectionId": "C",
         "valuesByMode": {"light": 20, "dark": {"type": "VARIABLE_ALIAS", "id": "MISSING"}}},
        {"id": "OFFLINE", "name": "typography/font-family/base", "variableCollectionId": "R",
         "remote": true, "key": "lib-key"}
    ]
}"#;

async fn check(snapshot: &Snapshot) -> AuditOutcome {
    let store = snapshot.memory_store();
    let policy = UsagePolicy::default();
    let usecase = AuditUsecase {
        document: &snapshot.document,
        store: &store,
        policy: &policy,
        scan_mode: ScanMode::Cooperative,
    };
    usecase.run(&AuditRequest::CheckBrokenVariables).await.unwrap()
}

#[tokio::test]
async fn test_each_rule_classifies_its_binding() {
    let snapshot = Snapshot::parse(SELECTION).unwrap();
    let report = match check(&snapshot).await {
        AuditOutcome::Integrity(report) => report,
        other => panic!("unexpected outcome: {:?}", other),
    };

    // OK appears twice but is resolved once; the id-less reference is dropped.
    assert_eq!(report.checked, 7);

    let reasons: Vec<(&str, &str)> = report
        .broken
        .iter()
        .map(|b| (b.record.variable_id.as_str(), b.reason.code()))
        .collect();
    assert_eq!(
        reasons,
        vec![
            ("GONE", "not-found"),
            ("STALE", "local-deleted"),
            ("ORPHAN", "collection-deleted"),
            ("LIB", "library-disabled"),
            ("ALIAS", "broken-alias"),
            ("OFFLINE", "collection-unavailable"),
        ]
    );

    let alias = report.broken.iter().find(|b| b.record.variable_id == "ALIAS").unwrap();
    assert_eq!(
        alias.reason,
        BrokenReason::BrokenAlias {
            mode_id: "dark".to_string(),
            target_id: "MISSING".to_string(),
        }
    );
    assert_eq!(alias.record.property, "fontSize");
    assert_eq!(alias.record.node_name, "Label");
}

#[tokio::test]
async fn test_summary_groups_by_node_and_property() {
    let snapshot = Snapshot::parse(SELECTION).unwrap();
    let outcome = check(&snapshot).await;
    let dto = AuditResultDto::from(&outcome);

    assert_eq!(dto.status, "ok");
    assert_eq!(dto.message, "🔴 Broken variables: 6 broken variables");

    let summary = dto.broken_summary.unwrap();
    let nodes: Vec<&str> = summary.keys().map(String::as_str).collect();
    assert_eq!(nodes, vec!["Button", "Label"]);
    assert_eq!(summary["Button"]["paddingLeft"], 1);
    assert_eq!(summary["Button"]["fills.color"], 1);
    assert_eq!(summary["Button"]["strokes.color"], 1);
    assert_eq!(summary["Label"]["fontSize"], 2);
    assert_eq!(summary["Label"]["fontFamily"], 1);
}

#[tokio::test]
async fn test_healthy_selection() {
    let mut snapshot = Snapshot::parse(SELECTION).unwrap();
    snapshot.document.select(vec!["1:3".to_string()]);

    let outcome = check(&snapshot).await;
    let dto = AuditResultDto::from(&outcome);
    assert_eq!(dto.message, "✅ No broken variables found");
    assert_eq!(dto.broken_bindings, Some(vec![]));
}

#[tokio::test]
async fn test_empty_selection() {
    let mut snapshot = Snapshot::parse(SELECTION).unwrap();
    snapshot.document.select(vec![]);

    let dto = AuditResultDto::from(&check(&snapshot).await);
    assert_eq!(dto.status, "nothing-selected");
    assert!(dto.broken_bindings.is_none());
}

#[tokio::test]
async fn test_resolution_fault_is_classified() {
    let snapshot = Snapshot::parse(SELECTION).unwrap();
    let store = snapshot.memory_store();
    store.mark_faulty("OK");

    let policy = UsagePolicy::default();
    let usecase = AuditUsecase {
        document: &snapshot.document,
        store: &store,
        policy: &policy,
        scan_mode: ScanMode::Cooperative,
    };

    match usecase.run(&AuditRequest::CheckBrokenVariables).await.unwrap() {
        AuditOutcome::Integrity(report) => {
            let faulted: Vec<&str> = report
                .broken
                .iter()
                .filter(|b| b.reason.code() == "resolution-error")
                .map(|b| b.record.variable_id.as_str())
                .collect();
            // both bindings of OK carry the same classification
            assert_eq!(faulted, vec!["OK", "OK"]);
            assert_eq!(report.broken.len(), 8);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}
