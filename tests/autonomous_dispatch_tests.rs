/// Autonomous dispatch tests
///
/// End-to-end behaviour of the dispatcher against catalog and link doubles.
/// Run with: cargo test --test autonomous_dispatch_tests


use autonomous_dispatch::catalog::CatalogClass;
use autonomous_dispatch::dispatch::TargetState;
use autonomous_dispatch::{
    AutonomousDispatcher, BoundArgument, BufferLedger, DispatchError, InMemoryCatalog,
    RoutineDescriptor, RuntimeSettings, SessionContext, SourceLocation, TypeId, Value,
    mark_autonomous,
};
use dispatch_support::{FakeCatalog, RecordingLink};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

const DIRECTIVES: &str =
    "SET ivorysql.compatible_mode = oracle; SET plisql.inside_autonomous_transaction = true; ";

fn marked(id: autonomous_dispatch::RoutineId) -> RoutineDescriptor {
    let mut desc = RoutineDescriptor::new(id);
    mark_autonomous(Some(&mut desc), SourceLocation::new(2, 5)).unwrap();
    desc.finish_definition();
    desc
}

#[tokio::test]
async fn test_end_to_end_statement() {
    let catalog = Arc::new(FakeCatalog::with_remote_link());
    let id = catalog.add_routine(500, Some("s"), "p", vec![TypeId::INT4, TypeId::TEXT]);
    let link = Arc::new(RecordingLink::acking());
    let dispatcher = AutonomousDispatcher::new(
        catalog.clone(),
        link.clone(),
        Arc::new(RuntimeSettings::new().port(5432)),
    );

    let args = [
        BoundArgument::new(TypeId::INT4, 5i32),
        BoundArgument::new(TypeId::TEXT, "it's"),
    ];
    let result = dispatcher
        .dispatch(&SessionContext::client("app"), &marked(id), &args)
        .await
        .unwrap();
    assert_eq!(result, Value::Null);

    let calls = link.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].statement, format!("{}CALL s.p(5, 'it''s');", DIRECTIVES));
    assert_eq!(calls[0].connection_descriptor, "dbname='app' port=5432");
    assert_eq!(calls[0].target.name, "dblink_exec");

    let parsed = Parser::parse_sql(&PostgreSqlDialect {}, &calls[0].statement).unwrap();
    assert_eq!(parsed.len(), 3);
}

#[tokio::test]
async fn test_missing_entry_point_leaves_no_buffers() {
    let catalog = Arc::new(FakeCatalog::new());
    let id = catalog.add_routine(501, Some("s"), "p", vec![]);
    let link = Arc::new(RecordingLink::acking());
    let ledger = Arc::new(BufferLedger::new());
    let dispatcher =
        AutonomousDispatcher::new(catalog.clone(), link.clone(), Arc::new(RuntimeSettings::new()))
            .with_buffer_ledger(ledger.clone());

    let err = dispatcher
        .dispatch(&SessionContext::client("app"), &marked(id), &[])
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::RemoteLinkUnavailable { ref hint, .. }
        if hint.contains("CREATE EXTENSION dblink")));
    assert_eq!(ledger.live(), 0);
    assert!(link.calls().is_empty());
    assert_eq!(catalog.routine_lookups.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_remote_failure_propagates_unchanged() {
    let catalog = Arc::new(FakeCatalog::with_remote_link());
    let id = catalog.add_routine(502, Some("s"), "p", vec![TypeId::TEXT]);
    let link = Arc::new(RecordingLink::failing(
        "autonomous transaction failed",
        "relation \"audit_log\" does not exist",
    ));
    let ledger = Arc::new(BufferLedger::new());
    let dispatcher =
        AutonomousDispatcher::new(catalog, link.clone(), Arc::new(RuntimeSettings::new()))
            .with_buffer_ledger(ledger.clone());

    let err = dispatcher
        .dispatch(
            &SessionContext::client("app"),
            &marked(id),
            &[BoundArgument::new(TypeId::TEXT, "x")],
        )
        .await
        .unwrap_err();

    match err {
        DispatchError::RemoteExecution { message, detail } => {
            assert_eq!(message, "autonomous transaction failed");
            assert_eq!(detail, "relation \"audit_log\" does not exist");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(link.calls().len(), 1);
    assert_eq!(ledger.acquired(), 1);
    assert_eq!(ledger.live(), 0);
}

#[tokio::test]
async fn test_success_releases_buffers() {
    let catalog = Arc::new(FakeCatalog::with_remote_link());
    let id = catalog.add_routine(503, Some("s"), "p", vec![]);
    let ledger = Arc::new(BufferLedger::new());
    let dispatcher = AutonomousDispatcher::new(
        catalog,
        Arc::new(RecordingLink::acking()),
        Arc::new(RuntimeSettings::new()),
    )
    .with_buffer_ledger(ledger.clone());

    for _ in 0..3 {
        assert_ok!(dispatcher.dispatch(&SessionContext::client("app"), &marked(id), &[]).await);
    }
    assert_eq!(ledger.acquired(), 3);
    assert_eq!(ledger.live(), 0);
}

#[tokio::test]
async fn test_cache_requeried_after_notification() {
    let catalog = Arc::new(FakeCatalog::with_remote_link());
    let id = catalog.add_routine(504, Some("s"), "p", vec![]);
    let dispatcher = AutonomousDispatcher::new(
        catalog.clone(),
        Arc::new(RecordingLink::acking()),
        Arc::new(RuntimeSettings::new()),
    );
    let session = SessionContext::client("app");
    let desc = marked(id);

    dispatcher.dispatch(&session, &desc, &[]).await.unwrap();
    dispatcher.dispatch(&session, &desc, &[]).await.unwrap();
    assert_eq!(catalog.entry_point_lookups(), 1);
    assert_eq!(dispatcher.target().state(), TargetState::Resolved);

    // entry point unchanged, notification alone must force a new lookup
    catalog.notify(CatalogClass::Routine);
    assert_eq!(dispatcher.target().state(), TargetState::Unresolved);
    dispatcher.dispatch(&session, &desc, &[]).await.unwrap();
    assert_eq!(catalog.entry_point_lookups(), 2);

    // other catalog classes leave the cache alone
    catalog.notify(CatalogClass::Namespace);
    dispatcher.dispatch(&session, &desc, &[]).await.unwrap();
    assert_eq!(catalog.entry_point_lookups(), 2);
}

#[tokio::test]
async fn test_extension_removed_between_calls() {
    let catalog = Arc::new(FakeCatalog::with_remote_link());
    let id = catalog.add_routine(505, Some("s"), "p", vec![]);
    let dispatcher = AutonomousDispatcher::new(
        catalog.clone(),
        Arc::new(RecordingLink::acking()),
        Arc::new(RuntimeSettings::new()),
    );
    let session = SessionContext::client("app");
    let desc = marked(id);

    assert_ok!(dispatcher.dispatch(&session, &desc, &[]).await);

    catalog.set_entry_point(None);
    catalog.notify(CatalogClass::Routine);
    let err = assert_err!(dispatcher.dispatch(&session, &desc, &[]).await);
    assert!(matches!(err, DispatchError::RemoteLinkUnavailable { .. }));
}

#[tokio::test]
async fn test_missing_routine_is_not_found() {
    let catalog = Arc::new(FakeCatalog::with_remote_link());
    let ledger = Arc::new(BufferLedger::new());
    let dispatcher = AutonomousDispatcher::new(
        catalog,
        Arc::new(RecordingLink::acking()),
        Arc::new(RuntimeSettings::new()),
    )
    .with_buffer_ledger(ledger.clone());

    let err = dispatcher
        .dispatch(
            &SessionContext::client("app"),
            &marked(autonomous_dispatch::RoutineId(777)),
            &[],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::NotFound(_)));
    assert_eq!(ledger.live(), 0);
}

#[tokio::test]
async fn test_background_session_rejected() {
    let catalog = Arc::new(FakeCatalog::with_remote_link());
    let id = catalog.add_routine(506, Some("s"), "p", vec![]);
    let link = Arc::new(RecordingLink::acking());
    let ledger = Arc::new(BufferLedger::new());
    let dispatcher =
        AutonomousDispatcher::new(catalog, link.clone(), Arc::new(RuntimeSettings::new()))
            .with_buffer_ledger(ledger.clone());

    for session in [SessionContext::background(), SessionContext::client_without_database()] {
        let err = dispatcher.dispatch(&session, &marked(id), &[]).await.unwrap_err();
        assert!(matches!(err, DispatchError::Context { .. }));
    }
    assert!(link.calls().is_empty());
    assert_eq!(ledger.live(), 0);
}

#[tokio::test]
async fn test_nulls_booleans_and_fallback_schema() {
    let catalog = Arc::new(FakeCatalog::with_remote_link());
    let id = catalog.add_routine(
        507,
        None,
        "Record Event",
        vec![TypeId::BOOL, TypeId::BOOL, TypeId::TEXT, TypeId::INT8],
    );
    let link = Arc::new(RecordingLink::acking());
    let mut config = HashMap::new();
    config.insert("listen_addresses".to_string(), "localhost".to_string());
    let dispatcher = AutonomousDispatcher::new(catalog, link.clone(), Arc::new(config));

    let args = [
        BoundArgument::new(TypeId::BOOL, true),
        BoundArgument::new(TypeId::BOOL, false),
        BoundArgument::null(TypeId::TEXT),
        BoundArgument::null(TypeId::INT8),
    ];
    dispatcher
        .dispatch(&SessionContext::client("o'neil db"), &marked(id), &args)
        .await
        .unwrap();

    let call = &link.calls()[0];
    assert_eq!(
        call.statement,
        format!("{}CALL public.\"Record Event\"(true, false, NULL, NULL);", DIRECTIVES)
    );
    assert_eq!(call.connection_descriptor, "dbname='o\\'neil db' host=localhost");
}

#[tokio::test]
async fn test_hostile_text_stays_inside_literal() {
    let catalog = Arc::new(FakeCatalog::with_remote_link());
    let id = catalog.add_routine(508, Some("public"), "note", vec![TypeId::TEXT]);
    let link = Arc::new(RecordingLink::acking());
    let dispatcher =
        AutonomousDispatcher::new(catalog, link.clone(), Arc::new(RuntimeSettings::new()));

    let payload = "x'); DROP TABLE accounts; --\\";
    dispatcher
        .dispatch(
            &SessionContext::client("app"),
            &marked(id),
            &[BoundArgument::new(TypeId::TEXT, payload)],
        )
        .await
        .unwrap();

    let statement = &link.calls()[0].statement;
    assert_eq!(
        statement,
        &format!("{}CALL public.note(E'x''); DROP TABLE accounts; --\\\\');", DIRECTIVES)
    );
    let parsed = Parser::parse_sql(&PostgreSqlDialect {}, statement).unwrap();
    assert_eq!(parsed.len(), 3);
}

#[tokio::test]
async fn test_in_memory_catalog_reinstall() {
    let catalog = Arc::new(InMemoryCatalog::new());
    catalog.install_dblink().unwrap();
    let id = catalog.create_routine("public", "audit", vec![TypeId::TEXT]).unwrap();
    let link = Arc::new(RecordingLink::acking());
    let dispatcher =
        AutonomousDispatcher::new(catalog.clone(), link.clone(), Arc::new(RuntimeSettings::new()));
    let session = SessionContext::client("app");
    let desc = marked(id);
    let args = [BoundArgument::new(TypeId::TEXT, "a")];

    dispatcher.dispatch(&session, &desc, &args).await.unwrap();
    let first_target = link.calls()[0].target.clone();

    catalog.drop_extension("dblink").unwrap();
    assert!(!dispatcher.remote_link_available().unwrap());
    assert!(matches!(
        dispatcher.dispatch(&session, &desc, &args).await,
        Err(DispatchError::RemoteLinkUnavailable { .. })
    ));

    catalog.install_dblink().unwrap();
    dispatcher.dispatch(&session, &desc, &args).await.unwrap();
    let calls = link.calls();
    assert_eq!(calls.len(), 2);
    assert_ne!(calls[1].target.routine, first_target.routine);
}
