mod common;

use common::MemoryDb;
use pgmap::{Entity, OrmError, PlaceholderStyle, Row, Session, Value};

#[derive(Debug, Clone, Default, PartialEq, Entity)]
#[orm(table = "users")]
struct User {
    #[orm(id)]
    id: Option<String>,
    #[orm(column = "user_name")]
    name: String,
    age: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Entity)]
#[orm(table = "orders")]
struct Order {
    #[orm(id, generator = "database")]
    id: Option<i64>,
    item: String,
    quantity: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Entity)]
struct Country {
    #[orm(id, generator = "assigned")]
    code: String,
    name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Entity)]
#[orm(table = "audit_log")]
struct AuditEntry {
    actor: String,
    action: String,
}

fn alice() -> User {
    User {
        id: None,
        name: "alice".into(),
        age: 30,
    }
}

#[tokio::test]
async fn insert_then_select_by_id_round_trips() {
    let db = MemoryDb::new();
    let session = Session::new(&db);

    let mut user = alice();
    assert_eq!(session.insert(&mut user).await.unwrap(), 1);

    let id = user.id.clone().expect("key is written back into the entity");
    assert_eq!(id.len(), 32);
    assert!(id.chars().all(|c| c.is_ascii_hexdigit()));

    let found: Option<User> = session.select_by_id::<User>(id.as_str()).await.unwrap();
    assert_eq!(found, Some(user));
}

#[tokio::test]
async fn insert_keeps_supplied_key() {
    let db = MemoryDb::new();
    let session = Session::new(&db);

    let mut user = User {
        id: Some("fixed-key".into()),
        ..alice()
    };
    session.insert(&mut user).await.unwrap();

    assert_eq!(user.id.as_deref(), Some("fixed-key"));
    let (sql, params) = db.statements().remove(0);
    assert_eq!(sql, "INSERT INTO users (id, user_name, age) VALUES ($1, $2, $3)");
    assert_eq!(params[0], Value::Text("fixed-key".into()));
}

#[tokio::test]
async fn each_insert_generates_a_distinct_key() {
    let db = MemoryDb::new();
    let session = Session::new(&db);

    let mut a = alice();
    let mut b = alice();
    session.insert(&mut a).await.unwrap();
    session.insert(&mut b).await.unwrap();

    assert_ne!(a.id, b.id);
    assert_eq!(session.select_all::<User>().await.unwrap().len(), 2);
}

#[tokio::test]
async fn database_generated_key_is_read_back() {
    let db = MemoryDb::new();
    let session = Session::new(&db);

    let mut first = Order {
        id: None,
        item: "widget".into(),
        quantity: 3,
    };
    let mut second = Order {
        id: None,
        item: "gadget".into(),
        quantity: 1,
    };
    session.insert(&mut first).await.unwrap();
    session.insert(&mut second).await.unwrap();

    assert_eq!(first.id, Some(1));
    assert_eq!(second.id, Some(2));
    assert_eq!(
        db.statements()[0].0,
        "INSERT INTO orders (item, quantity) VALUES ($1, $2) RETURNING id"
    );

    let loaded = session.select_by_id::<Order>(2_i64).await.unwrap();
    assert_eq!(loaded, Some(second));
}

#[tokio::test]
async fn missing_generated_key_is_an_error() {
    let db = MemoryDb::new();
    db.drop_returned_keys(true);
    let session = Session::new(&db);

    let mut order = Order {
        id: None,
        item: "widget".into(),
        quantity: 3,
    };
    let err = session.insert(&mut order).await.unwrap_err();

    match err {
        OrmError::Decode { column, message } => {
            assert_eq!(column, "id");
            assert!(message.contains("no generated key"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(order.id, None);
    assert_eq!(db.released(), 1);
}

#[tokio::test]
async fn assigned_key_must_be_set_before_insert() {
    let db = MemoryDb::new();
    let session = Session::new(&db);

    let mut country = Country {
        code: String::new(),
        name: "Norway".into(),
    };
    let err = session.insert(&mut country).await.unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));
    assert_eq!(db.acquired(), 0);

    country.code = "NO".into();
    session.insert(&mut country).await.unwrap();
    assert_eq!(
        session.select_by_id::<Country>("NO").await.unwrap(),
        Some(country)
    );
}

#[tokio::test]
async fn update_changes_only_the_keyed_row() {
    let db = MemoryDb::new();
    let session = Session::new(&db);

    let mut user = alice();
    let mut other = User {
        name: "bob".into(),
        ..alice()
    };
    session.insert(&mut user).await.unwrap();
    session.insert(&mut other).await.unwrap();

    user.name = "alicia".into();
    user.age = 31;
    assert_eq!(session.update(&user).await.unwrap(), 1);

    let id = user.id.clone();
    assert_eq!(
        db.last_sql().as_deref(),
        Some("UPDATE users SET user_name = $1, age = $2 WHERE id = $3")
    );
    assert_eq!(session.select_by_id::<User>(id).await.unwrap(), Some(user));
    assert_eq!(
        session.select_by_id::<User>(other.id.clone()).await.unwrap(),
        Some(other)
    );
}

#[tokio::test]
async fn update_of_missing_row_affects_nothing() {
    let db = MemoryDb::new();
    let session = Session::new(&db);

    let ghost = User {
        id: Some("nobody".into()),
        ..alice()
    };
    assert_eq!(session.update(&ghost).await.unwrap(), 0);
}

#[tokio::test]
async fn delete_then_select_finds_nothing() {
    let db = MemoryDb::new();
    let session = Session::new(&db);

    let mut user = alice();
    session.insert(&mut user).await.unwrap();
    let id = user.id.clone();

    assert_eq!(session.delete_by_id::<User>(id.clone()).await.unwrap(), 1);
    assert_eq!(session.select_by_id::<User>(id.clone()).await.unwrap(), None);
    assert_eq!(session.delete_by_id::<User>(id).await.unwrap(), 0);
}

#[tokio::test]
async fn type_without_primary_key_fails_before_any_sql() {
    let db = MemoryDb::new();
    let session = Session::new(&db);

    let entry = AuditEntry {
        actor: "alice".into(),
        action: "login".into(),
    };

    let err = session.update(&entry).await.unwrap_err();
    assert!(err.is_missing_primary_key());
    assert!(err.to_string().contains("audit_log"));

    let err = session.delete_by_id::<AuditEntry>(1).await.unwrap_err();
    assert!(err.is_missing_primary_key());

    let err = session.select_by_id::<AuditEntry>(1).await.unwrap_err();
    assert!(err.is_missing_primary_key());

    assert!(db.statements().is_empty());
    assert_eq!(db.acquired(), 0);
}

#[tokio::test]
async fn type_without_primary_key_can_still_insert_and_select() {
    let db = MemoryDb::new();
    let session = Session::new(&db);

    let mut entry = AuditEntry {
        actor: "alice".into(),
        action: "login".into(),
    };
    session.insert(&mut entry).await.unwrap();

    assert_eq!(
        db.statements()[0].0,
        "INSERT INTO audit_log (actor, action) VALUES ($1, $2)"
    );
    assert_eq!(session.select_all::<AuditEntry>().await.unwrap(), vec![entry]);
}

#[tokio::test]
async fn select_by_sql_ignores_unmapped_columns() {
    let db = MemoryDb::new();
    db.seed(
        "users",
        Row::new()
            .with("id", "u1")
            .with("user_name", "carol")
            .with("age", 44)
            .with("last_login", "yesterday")
            .with("score", 99_i64),
    );
    db.seed(
        "users",
        Row::new()
            .with("id", "u2")
            .with("user_name", "dave")
            .with("age", 17),
    );
    let session = Session::new(&db);

    let adults: Vec<User> = session
        .select_by_sql("SELECT * FROM users WHERE age >= $1", &[Value::I32(18)])
        .await
        .unwrap();

    assert_eq!(
        adults,
        vec![User {
            id: Some("u1".into()),
            name: "carol".into(),
            age: 44,
        }]
    );
}

#[tokio::test]
async fn select_by_sql_passes_sql_through_unchanged() {
    let db = MemoryDb::new();
    let session = Session::new(&db);

    let sql = "SELECT * FROM users WHERE user_name = $1";
    let hostile = "x'; DROP TABLE users; --";
    let found: Vec<User> = session
        .select_by_sql(sql, &[Value::from(hostile)])
        .await
        .unwrap();

    assert!(found.is_empty());
    let (logged, params) = db.statements().remove(0);
    assert_eq!(logged, sql);
    assert_eq!(params, vec![Value::Text(hostile.into())]);
}

#[tokio::test]
async fn mismatched_column_keeps_default_value() {
    let db = MemoryDb::new();
    db.seed(
        "users",
        Row::new()
            .with("id", "u1")
            .with("user_name", "erin")
            .with("age", "not a number"),
    );
    let session = Session::new(&db);

    let users = session.select_all::<User>().await.unwrap();
    assert_eq!(users[0].name, "erin");
    assert_eq!(users[0].age, 0);
}

#[tokio::test]
async fn question_mark_placeholders() {
    let db = MemoryDb::new();
    let session = Session::new(&db).placeholder_style(PlaceholderStyle::Question);

    let mut user = alice();
    session.insert(&mut user).await.unwrap();
    user.age = 50;
    session.update(&user).await.unwrap();

    let sql: Vec<String> = db.statements().into_iter().map(|(sql, _)| sql).collect();
    assert_eq!(
        sql,
        vec![
            "INSERT INTO users (id, user_name, age) VALUES (?, ?, ?)".to_string(),
            "UPDATE users SET user_name = ?, age = ? WHERE id = ?".to_string(),
        ]
    );
    assert_eq!(
        session.select_by_id::<User>(user.id.clone()).await.unwrap(),
        Some(user)
    );
}

#[tokio::test]
async fn every_operation_releases_its_connection() {
    let db = MemoryDb::new();
    let session = Session::new(&db);

    let mut user = alice();
    session.insert(&mut user).await.unwrap();
    session.update(&user).await.unwrap();
    session.select_all::<User>().await.unwrap();
    session.select_by_id::<User>(user.id.clone()).await.unwrap();
    session.delete_by_id::<User>(user.id.clone()).await.unwrap();

    assert_eq!(db.acquired(), 5);
    assert_eq!(db.released(), 5);
}

#[tokio::test]
async fn failed_statement_still_releases_connection() {
    let db = MemoryDb::new();
    let session = Session::new(&db);
    db.fail_statements(true);

    let mut user = alice();
    assert!(session.insert(&mut user).await.is_err());
    assert!(session.select_all::<User>().await.is_err());

    assert_eq!(db.acquired(), 2);
    assert_eq!(db.released(), 2);
}

#[tokio::test]
async fn acquire_failure_is_reported() {
    let db = MemoryDb::new();
    let session = Session::new(&db);
    db.refuse_connections(true);

    let err = session.select_all::<User>().await.unwrap_err();
    assert!(matches!(err, OrmError::Connection(_)));
    assert!(db.statements().is_empty());
}

#[tokio::test]
async fn sessions_share_descriptors_through_the_cache() {
    let db = MemoryDb::new();
    let first = Session::new(&db);
    let second = Session::with_cache(&db, first.cache().clone());

    first.select_all::<User>().await.unwrap();
    assert!(second.cache().contains::<User>());
    assert!(!second.cache().contains::<Order>());
    assert_eq!(
        User::declaration().table,
        Some("users"),
        "derive records the table override"
    );
}
