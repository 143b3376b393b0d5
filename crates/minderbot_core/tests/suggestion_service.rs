use minderbot_core::consistency::engine::evaluate;
use minderbot_core::db::open_db_in_memory;
use minderbot_core::model::suggestion::Suggestion;
use minderbot_core::model::user::User;
use minderbot_core::{
    EntityStore, Snapshot, SqliteEntityStore, SuggestionService, SuggestionServiceError,
};

fn assert_consistent(store: &SqliteEntityStore<'_>) {
    let problems = evaluate(&Snapshot::load(store, 2).unwrap());
    let messages: Vec<String> = problems
        .iter()
        .flat_map(|(_, records)| records.iter().map(ToString::to_string))
        .collect();
    assert!(messages.is_empty(), "unexpected problems: {messages:?}");
}

fn seed_user(store: &SqliteEntityStore<'_>, id: &str) {
    store
        .put_user(&User {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            is_staff: false,
        })
        .unwrap();
}

fn tagged(id: &str, tags: &[&str], created: i64) -> Suggestion {
    let mut suggestion = Suggestion::new(id, id.replace('-', " "), created);
    suggestion.tags = tags.iter().map(|tag| tag.to_string()).collect();
    suggestion
}

#[test]
fn create_maintains_both_reference_sides() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteEntityStore::try_new(&conn).unwrap();
    let service = SuggestionService::new(SqliteEntityStore::try_new(&conn).unwrap());

    service.create(tagged("oil-change", &["car", " car", "engine"], 200)).unwrap();
    service.create(tagged("tire-rotation", &["car"], 100)).unwrap();

    let car = store.get_tag("car").unwrap().unwrap();
    assert_eq!(car.suggestions, vec!["oil-change", "tire-rotation"]);
    assert_eq!(car.count, 2);
    assert_eq!(car.created, Some(100));
    assert_eq!(
        store.get_suggestion("oil-change").unwrap().unwrap().tags,
        vec!["car", "engine"]
    );
    assert_consistent(&store);
}

#[test]
fn create_rejects_duplicates_and_unknown_users() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteEntityStore::try_new(&conn).unwrap();
    let service = SuggestionService::new(SqliteEntityStore::try_new(&conn).unwrap());

    service.create(tagged("oil-change", &["car"], 1)).unwrap();
    let err = service.create(tagged("oil-change", &["boat"], 1)).unwrap_err();
    assert!(matches!(err, SuggestionServiceError::AlreadyExists(_)));

    let mut authored = tagged("wax-car", &["car"], 1);
    authored.author = Some("nobody".to_string());
    let err = service.create(authored).unwrap_err();
    assert!(matches!(err, SuggestionServiceError::UnknownUser(ref id) if id == "nobody"));

    assert_eq!(store.get_tag("boat").unwrap(), None);
    assert_eq!(store.get_tag("car").unwrap().unwrap().count, 1);
    assert_consistent(&store);
}

#[test]
fn set_tags_detaches_and_attaches() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteEntityStore::try_new(&conn).unwrap();
    let service = SuggestionService::new(SqliteEntityStore::try_new(&conn).unwrap());
    service.create(tagged("oil-change", &["car", "engine"], 5)).unwrap();

    let updated = service
        .set_tags("oil-change", &["car".to_string(), "garage".to_string()])
        .unwrap();

    assert_eq!(updated.tags, vec!["car", "garage"]);
    assert_eq!(store.get_tag("engine").unwrap(), None);
    assert_eq!(
        store.get_tag("garage").unwrap().unwrap().suggestions,
        vec!["oil-change"]
    );
    assert_consistent(&store);

    let err = service.set_tags("missing", &[]).unwrap_err();
    assert!(matches!(err, SuggestionServiceError::NotFound(_)));
}

#[test]
fn personalize_and_delete_keep_store_consistent() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteEntityStore::try_new(&conn).unwrap();
    seed_user(&store, "joe");
    let service = SuggestionService::new(SqliteEntityStore::try_new(&conn).unwrap());
    service.create(tagged("smoke-alarm", &["home", "safety"], 10)).unwrap();

    let reminder = service.personalize("smoke-alarm", "joe", 50).unwrap();
    assert_eq!(reminder.owner.as_deref(), Some("joe"));
    assert_eq!(store.get_tag("home").unwrap().unwrap().count, 2);
    assert_consistent(&store);

    let err = service.personalize("smoke-alarm", "ghost", 60).unwrap_err();
    assert!(matches!(err, SuggestionServiceError::UnknownUser(_)));

    service.delete("smoke-alarm").unwrap();
    let home = store.get_tag("home").unwrap().unwrap();
    assert_eq!(home.suggestions, vec![reminder.id.clone()]);
    assert_eq!(home.count, 1);
    assert_consistent(&store);

    service.delete(&reminder.id).unwrap();
    assert_eq!(store.get_tag("home").unwrap(), None);
    assert_eq!(store.get_tag("safety").unwrap(), None);
    assert_consistent(&store);

    let err = service.delete(&reminder.id).unwrap_err();
    assert!(matches!(err, SuggestionServiceError::NotFound(_)));
}
