use std::sync::atomic::Ordering;

use shardline::{
    error::{DatabaseErrorCode, ExecutionError},
    ErrorCategory, KeyspaceBuilder, KeyspaceError, SessionConfig,
};
use utils::{mock_session, mock_session_with, set_keyspace, void, Request, Reply};

mod utils;

fn ddl(request: Request) -> Vec<Reply> {
    let statement = request.statement();
    let reply = match statement.text() {
        "USE \"ks\"" => request.result(set_keyspace("ks")),
        "USE \"missing\"" => request.error(0x2200, "Keyspace 'missing' does not exist"),
        "DROP KEYSPACE \"missing\"" => request.error(0x2300, "Cannot drop non existing keyspace"),
        "DROP KEYSPACE IF EXISTS \"missing\"" | "DROP KEYSPACE \"ks\"" => request.result(void()),
        text if text.starts_with("CREATE KEYSPACE \"existing\"") => {
            request.error(0x2400, "Keyspace existing already exists")
        }
        text if text.starts_with("CREATE KEYSPACE \"broken\"") => {
            request.error(0x2000, "line 1:0 no viable alternative")
        }
        text if text.starts_with("CREATE KEYSPACE") => request.result(void()),
        text => panic!("unexpected statement {text}"),
    };
    vec![reply]
}

#[tokio::test]
async fn create_keyspace() -> anyhow::Result<()> {
    let (session, _) = mock_session(ddl).await;
    session
        .create_keyspace(&KeyspaceBuilder::new("fresh").if_not_exists())
        .await?;
    let error = session
        .create_keyspace(&KeyspaceBuilder::new("existing").simple_strategy(3))
        .await
        .unwrap_err();
    assert_eq!(error.category(), ErrorCategory::AlreadyExists);
    match error {
        KeyspaceError::AlreadyExists { keyspace, source } => {
            assert_eq!(keyspace, "existing");
            assert_eq!(source.code, Ok(DatabaseErrorCode::AlreadyExists));
        }
        other => panic!("unexpected {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn other_database_errors_are_kept() -> anyhow::Result<()> {
    let (session, _) = mock_session(ddl).await;
    let error = session
        .create_keyspace(&KeyspaceBuilder::new("broken"))
        .await
        .unwrap_err();
    assert_eq!(error.category(), ErrorCategory::Database);
    match error {
        KeyspaceError::Other(ExecutionError::Database(source)) => {
            assert_eq!(source.code, Ok(DatabaseErrorCode::SyntaxError));
            assert_eq!(source.message, "line 1:0 no viable alternative");
        }
        other => panic!("unexpected {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn drop_keyspace() -> anyhow::Result<()> {
    let (session, _) = mock_session(ddl).await;
    session.drop_keyspace("ks", false).await?;
    session.drop_keyspace("missing", true).await?;
    let error = session.drop_keyspace("missing", false).await.unwrap_err();
    assert_eq!(error.category(), ErrorCategory::DoesNotExist);
    assert!(matches!(error, KeyspaceError::DoesNotExist { keyspace, .. } if keyspace == "missing"));
    Ok(())
}

#[tokio::test]
async fn use_keyspace() -> anyhow::Result<()> {
    let (session, _) = mock_session(ddl).await;
    assert_eq!(session.keyspace(), None);
    session.use_keyspace("ks").await?;
    assert_eq!(session.keyspace().as_deref(), Some("ks"));
    let error = session.use_keyspace("missing").await.unwrap_err();
    assert!(matches!(error, KeyspaceError::DoesNotExist { .. }));
    // the failed USE doesn't change the keyspace
    assert_eq!(session.keyspace().as_deref(), Some("ks"));
    Ok(())
}

#[tokio::test]
async fn invalid_keyspace_is_not_sent() -> anyhow::Result<()> {
    let (session, requests) = mock_session(ddl).await;
    let error = session.use_keyspace("not a keyspace").await.unwrap_err();
    assert_eq!(error.category(), ErrorCategory::ApiMisuse);
    let error = session
        .create_keyspace(&KeyspaceBuilder::new("k".repeat(49)))
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        KeyspaceError::Other(ExecutionError::InvalidKeyspace(_))
    ));
    assert_eq!(requests.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn keyspace_used_at_startup() -> anyhow::Result<()> {
    let config = SessionConfig::new().use_keyspace("ks");
    let (session, requests) = mock_session_with(config, &[], ddl).await;
    assert_eq!(session.keyspace().as_deref(), Some("ks"));
    assert_eq!(requests.load(Ordering::SeqCst), 1);
    Ok(())
}
