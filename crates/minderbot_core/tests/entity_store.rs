use minderbot_core::db::open_db_in_memory;
use minderbot_core::model::feedback::Feedback;
use minderbot_core::model::suggestion::{Interval, Suggestion};
use minderbot_core::model::tag::Tag;
use minderbot_core::model::user::User;
use minderbot_core::{EntityStore, PageQuery, RepoError, SqliteEntityStore};

#[test]
fn tag_reference_list_round_trips_order_duplicates_and_dangling_ids() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteEntityStore::try_new(&conn).unwrap();

    let tag = Tag {
        id: "car".to_string(),
        suggestions: vec!["oil".into(), "ghost".into(), "oil".into()],
        count: 7,
        created: None,
    };
    store.put_tag(&tag).unwrap();

    assert_eq!(store.get_tag("car").unwrap(), Some(tag));
    assert_eq!(store.get_tag("boat").unwrap(), None);
}

#[test]
fn suggestion_round_trips_interval_and_references() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteEntityStore::try_new(&conn).unwrap();

    let mut suggestion = Suggestion::new("change-oil", "Change the oil", 1_000);
    suggestion.tags = vec!["car".into(), "missing".into()];
    suggestion.author = Some("gone".into());
    suggestion.interval = Interval {
        months: Some(6),
        miles: Some(5000),
        ..Interval::default()
    };
    store.put_suggestion(&suggestion).unwrap();

    let loaded = store.get_suggestion("change-oil").unwrap().unwrap();
    assert_eq!(loaded, suggestion);
    assert_eq!(loaded.interval.describe(), "6 months or 5000 miles");

    suggestion.tags = vec!["home".into()];
    store.put_suggestion(&suggestion).unwrap();
    assert_eq!(
        store.get_suggestion("change-oil").unwrap().unwrap().tags,
        vec!["home".to_string()]
    );
}

#[test]
fn delete_is_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteEntityStore::try_new(&conn).unwrap();

    let mut tag = Tag::new("a");
    tag.suggestions = vec!["a-b".into()];
    tag.recount();
    store.put_tag(&tag).unwrap();

    store.delete_tag("a").unwrap();
    store.delete_tag("a").unwrap();
    store.delete_suggestion("never-existed").unwrap();
    assert_eq!(store.get_tag("a").unwrap(), None);
}

#[test]
fn listings_are_keyset_paged_by_id() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteEntityStore::try_new(&conn).unwrap();
    for id in ["c", "a", "e", "b", "d"] {
        store
            .put_user(&User {
                id: id.to_string(),
                email: format!("{id}@example.com"),
                is_staff: false,
            })
            .unwrap();
    }

    let first = store.list_user_ids(&PageQuery::first(2)).unwrap();
    assert_eq!(first, vec!["a", "b"]);

    let second = store
        .list_user_ids(&PageQuery {
            after: Some("b".to_string()),
            limit: 2,
        })
        .unwrap();
    assert_eq!(second, vec!["c", "d"]);

    let last = store
        .list_user_ids(&PageQuery {
            after: Some("d".to_string()),
            limit: 2,
        })
        .unwrap();
    assert_eq!(last, vec!["e"]);
}

#[test]
fn writes_validate_but_reads_accept_inconsistent_rows() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteEntityStore::try_new(&conn).unwrap();

    let err = store
        .put_suggestion(&Suggestion::new("Not A Slug", "title", 0))
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));

    let err = store.put_tag(&Tag::new("two words")).unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));

    conn.execute_batch(
        "INSERT INTO suggestions (id, title, created) VALUES ('Bad Id', '', 5);
         INSERT INTO tags (id, count, created) VALUES ('x', -3, NULL);",
    )
    .unwrap();
    assert_eq!(store.get_suggestion("Bad Id").unwrap().unwrap().title, "");
    assert_eq!(store.get_tag("x").unwrap().unwrap().count, -3);
}

#[test]
fn feedback_round_trips_optional_submitter() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteEntityStore::try_new(&conn).unwrap();

    let feedback = Feedback {
        id: "f1".to_string(),
        message: "Great site".to_string(),
        page: "/".to_string(),
        submitter: Some("phantom".to_string()),
        submitted: 42,
    };
    store.put_feedback(&feedback).unwrap();

    assert_eq!(store.get_feedback("f1").unwrap(), Some(feedback.clone()));
    assert_eq!(
        store.list_feedback(&PageQuery::first(10)).unwrap(),
        vec![feedback]
    );
}

#[test]
fn atomic_batch_rolls_back_on_error() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteEntityStore::try_new(&conn).unwrap();

    let result: Result<(), RepoError> = store.atomic(|store| {
        let mut tag = Tag::new("a");
        tag.suggestions = vec!["a-b".into()];
        tag.recount();
        store.put_tag(&tag)?;
        store.put_tag(&Tag::new("not valid"))
    });
    assert!(result.is_err());
    assert_eq!(store.get_tag("a").unwrap(), None);

    store
        .atomic(|store| {
            let mut tag = Tag::new("a");
            tag.suggestions = vec!["a-b".into()];
            tag.recount();
            store.put_tag(&tag)
        })
        .unwrap();
    assert!(store.get_tag("a").unwrap().is_some());
}

#[test]
fn try_new_requires_migrated_schema() {
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    let err = SqliteEntityStore::try_new(&conn).err().unwrap();
    assert!(matches!(err, RepoError::MissingRequiredTable("users")));
}
