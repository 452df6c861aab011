//! End-to-end user store behavior against in-memory SQLite.
//!
//! This suite covers:
//! - Listing, counting, and point lookups over configured templates
//! - Pagination windows tiling the unpaginated result set
//! - Search term preconditions
//! - Credential verification under both hash schemes
//! - Fail-soft behavior when the connection source is unavailable
//! - The unsupported password-update path

#![cfg(feature = "sqlite")]

use dbuserstore::store::SqliteExecutor;
use dbuserstore::{
    Dialect, DigestAlgorithm, HashScheme, QueryConfig, QueryExecutor, StoreConfig, UserStore,
    UserStoreError,
};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

/// SHA-256 of the UTF-8 bytes of "secret".
const SECRET_SHA256: &str = "2bb80d537b1da3e38bd30361aa855686bde0eacd7162fef6a25fe97bf527a25b";

fn query_config() -> QueryConfig {
    QueryConfig {
        list_all: "SELECT id, username, email FROM users ORDER BY id".to_string(),
        count: "SELECT COUNT(*) FROM users".to_string(),
        find_by_id: "SELECT id, username, email FROM users WHERE id = ?".to_string(),
        find_by_username: "SELECT id, username, email FROM users WHERE username = ?".to_string(),
        search: "SELECT id, username, email FROM users WHERE username LIKE '%' || ? || '%' ORDER BY id"
            .to_string(),
        find_password_hash: "SELECT password_hash FROM users WHERE username = ?".to_string(),
    }
}

fn digest_config() -> StoreConfig {
    StoreConfig::new(
        Dialect::SQLite,
        HashScheme::Digest(DigestAlgorithm::Sha256),
        query_config(),
    )
}

async fn seeded_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    sqlx::query(
        "CREATE TABLE users (
            id INTEGER PRIMARY KEY,
            username TEXT NOT NULL,
            email TEXT,
            password_hash TEXT
        )",
    )
    .execute(&pool)
    .await
    .unwrap();

    let bcrypt_hash = bcrypt::hash("hunter2", 4).unwrap();
    let rows: [(i64, &str, Option<&str>, Option<&str>); 5] = [
        (1, "alice", Some("alice@example.com"), Some(SECRET_SHA256)),
        (2, "bob", Some("bob@example.com"), Some(bcrypt_hash.as_str())),
        (3, "carol", None, None),
        (4, "dave", Some("dave@example.com"), Some(SECRET_SHA256)),
        (5, "malory", Some("malory@example.com"), None),
    ];
    for (id, username, email, password_hash) in rows {
        sqlx::query("INSERT INTO users (id, username, email, password_hash) VALUES (?, ?, ?, ?)")
            .bind(id)
            .bind(username)
            .bind(email)
            .bind(password_hash)
            .execute(&pool)
            .await
            .unwrap();
    }

    pool
}

async fn seeded_store() -> UserStore {
    let pool = seeded_pool().await;
    UserStore::with_executor(Box::new(SqliteExecutor::with_pool(pool)), digest_config()).unwrap()
}

#[tokio::test]
async fn test_list_all_users() {
    let store = seeded_store().await;
    let users = store.list_all_users().await;

    assert_eq!(users.len(), 5);
    assert_eq!(users[0].get("username").map(String::as_str), Some("alice"));
    assert_eq!(users[4].get("username").map(String::as_str), Some("malory"));
}

#[tokio::test]
async fn test_rows_use_reported_column_labels() {
    let store = seeded_store().await;
    let users = store.list_all_users().await;

    let alice = &users[0];
    assert_eq!(alice.get("id").map(String::as_str), Some("1"));
    assert_eq!(
        alice.get("email").map(String::as_str),
        Some("alice@example.com")
    );
    // Only the selected columns appear.
    assert!(!alice.contains_key("password_hash"));
}

#[tokio::test]
async fn test_null_columns_are_absent() {
    let store = seeded_store().await;
    let carol = store.find_user_by_username("carol").await.unwrap();

    assert_eq!(carol.get("username").map(String::as_str), Some("carol"));
    assert!(!carol.contains_key("email"));
}

#[tokio::test]
async fn test_count_users() {
    let store = seeded_store().await;
    assert_eq!(store.count_users().await, 5);
}

#[tokio::test]
async fn test_find_user_by_id() {
    let store = seeded_store().await;

    let user = store.find_user_by_id("3").await.unwrap();
    assert_eq!(user.get("username").map(String::as_str), Some("carol"));

    assert!(store.find_user_by_id("99").await.is_none());
}

#[tokio::test]
async fn test_find_user_by_username_absent_is_none() {
    let store = seeded_store().await;

    assert!(store.find_user_by_username("alice").await.is_some());
    assert!(store.find_user_by_username("nobody").await.is_none());
}

#[tokio::test]
async fn test_search_users() {
    let store = seeded_store().await;

    let hits = store.search_users("al").await;
    let usernames: Vec<&str> = hits
        .iter()
        .filter_map(|row| row.get("username").map(String::as_str))
        .collect();
    assert_eq!(usernames, vec!["alice", "malory"]);

    assert!(store.search_users("zzz").await.is_empty());
}

#[tokio::test]
async fn test_search_rejects_short_terms() {
    let store = seeded_store().await;

    // "a" matches three usernames, so an empty result proves the query
    // never ran.
    assert!(store.search_users("a").await.is_empty());
    assert!(store.search_users("").await.is_empty());
}

#[tokio::test]
async fn test_paged_windows_tile_the_full_listing() {
    let store = seeded_store().await;
    let all = store.list_all_users().await;

    let mut tiled = Vec::new();
    let limit = 2;
    let mut offset = 0;
    loop {
        let page = store.list_users_paged(offset, limit).await;
        assert!(page.len() as u64 <= limit);
        if page.is_empty() {
            break;
        }
        offset += page.len() as u64;
        tiled.extend(page);
    }

    assert_eq!(tiled, all);
}

#[tokio::test]
async fn test_paged_window_shapes() {
    let store = seeded_store().await;

    assert_eq!(store.list_users_paged(0, 3).await.len(), 3);
    // Window extends past the end of the result set.
    assert_eq!(store.list_users_paged(4, 10).await.len(), 1);
    // Window entirely past the end.
    assert!(store.list_users_paged(10, 5).await.is_empty());
    // Malformed window is rejected, not an error.
    assert!(store.list_users_paged(0, 0).await.is_empty());
}

#[tokio::test]
async fn test_verify_credentials_digest_scheme() {
    let store = seeded_store().await;

    assert!(store.verify_credentials("alice", "secret").await);
    assert!(!store.verify_credentials("alice", "Secret").await);
    assert!(!store.verify_credentials("alice", "").await);
}

#[tokio::test]
async fn test_verify_credentials_is_deterministic() {
    let store = seeded_store().await;

    for _ in 0..3 {
        assert!(store.verify_credentials("alice", "secret").await);
        assert!(!store.verify_credentials("alice", "wrong").await);
    }
}

#[tokio::test]
async fn test_verify_credentials_adaptive_scheme() {
    let pool = seeded_pool().await;
    let config = StoreConfig::new(Dialect::SQLite, HashScheme::AdaptiveSalted, query_config());
    let store =
        UserStore::with_executor(Box::new(SqliteExecutor::with_pool(pool)), config).unwrap();

    assert!(store.verify_credentials("bob", "hunter2").await);
    assert!(!store.verify_credentials("bob", "hunter3").await);
}

#[tokio::test]
async fn test_verify_credentials_absent_hash_rejects() {
    let store = seeded_store().await;

    // carol has a NULL hash, malory's row stores no hash either.
    assert!(!store.verify_credentials("carol", "anything").await);
    assert!(!store.verify_credentials("malory", "anything").await);
    // Unknown user.
    assert!(!store.verify_credentials("nobody", "secret").await);
}

#[tokio::test]
async fn test_update_credentials_always_fails() {
    let store = seeded_store().await;

    let err = store.update_credentials("alice", "newpass").await.unwrap_err();
    assert!(matches!(err, UserStoreError::NotImplemented { .. }));

    // The stored hash is untouched.
    assert!(store.verify_credentials("alice", "secret").await);
}

#[tokio::test]
async fn test_unavailable_source_is_empty_not_fatal() {
    let pool = seeded_pool().await;
    let store = UserStore::with_executor(
        Box::new(SqliteExecutor::with_pool(pool.clone())),
        digest_config(),
    )
    .unwrap();
    pool.close().await;

    assert_eq!(store.count_users().await, 0);
    assert!(store.list_all_users().await.is_empty());
    assert!(store.list_users_paged(0, 10).await.is_empty());
    assert!(store.find_user_by_id("1").await.is_none());
    assert!(store.find_user_by_username("alice").await.is_none());
    assert!(store.search_users("al").await.is_empty());
    assert!(!store.verify_credentials("alice", "secret").await);
    assert!(store.test_connection().await.is_err());
}

#[tokio::test]
async fn test_scalar_on_empty_result_is_contract_violation() {
    let pool = seeded_pool().await;
    let executor = SqliteExecutor::with_pool(pool);

    let err = executor
        .fetch_int("SELECT id FROM users WHERE 1 = 0", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, UserStoreError::Contract { .. }));

    let err = executor
        .fetch_string("SELECT username FROM users WHERE 1 = 0", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, UserStoreError::Contract { .. }));
}

#[tokio::test]
async fn test_count_with_empty_scalar_template_fail_softs_to_zero() {
    let pool = seeded_pool().await;
    let mut config = digest_config();
    config.queries.count = "SELECT id FROM users WHERE 1 = 0".to_string();
    let store = UserStore::with_executor(Box::new(SqliteExecutor::with_pool(pool)), config).unwrap();

    assert_eq!(store.count_users().await, 0);
}

#[tokio::test]
async fn test_scalar_transformers() {
    let pool = seeded_pool().await;
    let executor = SqliteExecutor::with_pool(pool);

    let count = executor
        .fetch_int("SELECT COUNT(*) FROM users", &[])
        .await
        .unwrap();
    assert_eq!(count, 5);

    let has_email = executor
        .fetch_bool(
            "SELECT email IS NOT NULL FROM users WHERE username = ?",
            &["alice"],
        )
        .await
        .unwrap();
    assert!(has_email);

    let username = executor
        .fetch_string("SELECT username FROM users WHERE id = ?", &["2"])
        .await
        .unwrap();
    assert_eq!(username, "bob");

    // Optional reads treat zero rows as absence.
    let absent = executor
        .fetch_optional_string(
            "SELECT password_hash FROM users WHERE username = ?",
            &["nobody"],
        )
        .await
        .unwrap();
    assert!(absent.is_none());
}

#[tokio::test]
async fn test_execution_failure_fail_softs_to_empty() {
    let pool = seeded_pool().await;
    let mut config = digest_config();
    // Bad template: references a table that does not exist.
    config.queries.list_all = "SELECT * FROM missing_table".to_string();
    let store = UserStore::with_executor(Box::new(SqliteExecutor::with_pool(pool)), config).unwrap();

    assert!(store.list_all_users().await.is_empty());
}

#[tokio::test]
async fn test_connect_factory_rejects_unbundled_dialects() {
    let mut config = digest_config();
    config.dialect = Dialect::SqlServer;
    let err = UserStore::connect("mssql://sa@localhost/master", config)
        .await
        .unwrap_err();
    assert!(matches!(err, UserStoreError::Unsupported { .. }));

    let mut config = digest_config();
    config.dialect = Dialect::Oracle;
    let err = UserStore::connect("oracle://scott@localhost/orcl", config)
        .await
        .unwrap_err();
    assert!(matches!(err, UserStoreError::Unsupported { .. }));
}

#[tokio::test]
async fn test_connect_factory_opens_sqlite_file() {
    let path = std::env::temp_dir().join(format!("dbuserstore_test_{}.db", std::process::id()));
    let url = format!("sqlite://{}?mode=rwc", path.display());

    // Seed a database file the store can open read-only.
    {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(&url)
            .await
            .unwrap();
        sqlx::query("CREATE TABLE IF NOT EXISTS users (id INTEGER PRIMARY KEY, username TEXT NOT NULL, email TEXT, password_hash TEXT)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("DELETE FROM users").execute(&pool).await.unwrap();
        sqlx::query("INSERT INTO users (id, username) VALUES (1, 'alice')")
            .execute(&pool)
            .await
            .unwrap();
        pool.close().await;
    }

    let store = UserStore::connect(&path.display().to_string(), digest_config())
        .await
        .unwrap();
    assert_eq!(store.dialect(), Dialect::SQLite);
    assert!(store.test_connection().await.is_ok());
    assert_eq!(store.count_users().await, 1);

    let _ = std::fs::remove_file(&path);
}
