use entityspace::{
    config::SessionConfig,
    core::{
        model::{EntityDef, Schema, SchemaBuilder},
        obs::{MetricsEvent, MetricsSink},
        query::Query,
        value::{Key, Record, Value},
    },
    error::{ErrorKind, ErrorOrigin, QueryErrorKind, StoreErrorKind},
    loader::{LoadError, Loader},
    session::Session,
};
use serde_json::json;
use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

///
/// ScriptedLoader
/// Serves canned JSON payloads per entity and records every call.
///

#[derive(Default)]
struct ScriptedLoader {
    payloads: BTreeMap<String, serde_json::Value>,
    calls: Vec<String>,
    offline: bool,
}

impl ScriptedLoader {
    fn with(mut self, entity: &str, payload: serde_json::Value) -> Self {
        self.payloads.insert(entity.to_string(), payload);
        self
    }

    fn records(&mut self, query: &Query) -> Result<Vec<Record>, LoadError> {
        self.calls.push(query.to_string());
        if self.offline {
            return Err(LoadError::failed(query, "offline"));
        }

        let payload = self
            .payloads
            .get(query.entity_name())
            .cloned()
            .unwrap_or_else(|| json!([]));

        serde_json::from_value(payload).map_err(|e| LoadError::failed(query, e.to_string()))
    }
}

impl Loader for ScriptedLoader {
    fn load_all(&mut self, query: &Query) -> Result<Vec<Record>, LoadError> {
        self.records(query)
    }

    fn load_one(&mut self, query: &Query, key: &Key) -> Result<Option<Record>, LoadError> {
        Ok(self
            .records(query)?
            .into_iter()
            .find(|r| r.key("id").as_ref() == Some(key)))
    }

    fn load_by_index(
        &mut self,
        query: &Query,
        index: &str,
        value: &Key,
    ) -> Result<Vec<Record>, LoadError> {
        Ok(self
            .records(query)?
            .into_iter()
            .filter(|r| r.key(index).as_ref() == Some(value))
            .collect())
    }
}

#[derive(Default)]
struct Recorder(Mutex<Vec<String>>);

impl MetricsSink for Recorder {
    fn record(&self, event: MetricsEvent<'_>) {
        self.0.lock().unwrap().push(format!("{event:?}"));
    }
}

fn schema() -> Arc<Schema> {
    let mut b = SchemaBuilder::new();

    let artist = b.entity(EntityDef::new("Artist", "id").primitive("name")).unwrap();
    let album = b.entity(EntityDef::new("Album", "id").indexed("name")).unwrap();
    let song = b.entity(EntityDef::new("Song", "id").primitive("name")).unwrap();

    b.reference(album, "artist", "artistId", artist).unwrap();
    b.reference(song, "album", "albumId", album).unwrap();
    b.collection(artist, "albums", album, "artist").unwrap();
    b.collection(album, "songs", song, "album").unwrap();

    Arc::new(b.build().unwrap())
}

fn loader() -> ScriptedLoader {
    ScriptedLoader::default()
        .with(
            "Artist",
            json!([
                {
                    "id": 1,
                    "name": "Miles",
                    "albums": [{
                        "id": 10,
                        "name": "Kind of Blue",
                        "artistId": 1,
                        "songs": [
                            { "id": 100, "name": "So What", "albumId": 10 },
                            { "id": 101, "name": "Freddie Freeloader", "albumId": 10 }
                        ]
                    }]
                },
                { "id": 2, "name": "Coltrane", "albums": [] }
            ]),
        )
        .with(
            "Album",
            json!([
                { "id": 10, "name": "Kind of Blue", "artistId": 1 },
                { "id": 11, "name": "Sketches of Spain", "artistId": 1 },
                { "id": 20, "name": "Blue Train", "artistId": 2 }
            ]),
        )
}

fn session() -> Session<ScriptedLoader> {
    Session::new(schema(), loader()).unwrap()
}

fn keys(rows: &BTreeMap<Key, Record>) -> Vec<Key> {
    rows.keys().cloned().collect()
}

//
// HIT / MISS
//

#[test]
fn first_query_loads_and_covered_queries_hit() {
    let mut s = session();

    let artists = s.all("Artist", "albums/songs").unwrap();
    assert_eq!(keys(&artists), [Key::Int(1), Key::Int(2)]);
    assert_eq!(s.loader().calls, ["Artist/albums/songs"]);

    // narrower expansion, same selection
    let artists = s.all("Artist", "albums").unwrap();
    assert_eq!(artists.len(), 2);

    // all covers by-key
    let miles = s.get("Artist", 1, "albums/songs").unwrap().unwrap();
    let albums = miles["albums"].as_list().unwrap();
    let songs = albums[0].as_record().unwrap()["songs"].as_list().unwrap();
    assert_eq!(songs.len(), 2);

    assert_eq!(s.loader().calls.len(), 1);
}

#[test]
fn text_and_integer_keys_load_separately() {
    let loader = ScriptedLoader::default().with(
        "Artist",
        json!([
            { "id": 1, "name": "by number" },
            { "id": "1", "name": "by text" },
            { "id": "1,2", "name": "joined" }
        ]),
    );
    let mut s = Session::new(schema(), loader).unwrap();

    let int = s.get("Artist", 1, "").unwrap().unwrap();
    let text = s.get("Artist", "1", "").unwrap().unwrap();
    assert_eq!(int["name"], Value::from("by number"));
    assert_eq!(text["name"], Value::from("by text"));

    let joined = s.get("Artist", "1,2", "").unwrap().unwrap();
    assert_eq!(joined["name"], Value::from("joined"));

    assert_eq!(
        s.loader().calls,
        ["Artist(1)", "Artist(\"1\")", "Artist(\"1,2\")"]
    );
}

#[test]
fn one_key_get_many_loads_like_get() {
    let mut s = session();

    let rows = s.get_many("Artist", [2], "").unwrap();
    assert_eq!(keys(&rows), [Key::Int(2)]);
    assert!(s.get("Artist", 2, "").unwrap().is_some());

    assert_eq!(s.loader().calls, ["Artist(2)"]);
}

#[test]
fn wider_expansion_misses() {
    let mut s = session();

    s.all("Artist", "albums").unwrap();
    s.all("Artist", "albums/songs").unwrap();

    assert_eq!(s.loader().calls, ["Artist/albums", "Artist/albums/songs"]);
}

#[test]
fn answers_come_from_the_workspace() {
    let mut s = session();

    let coltrane = s.get("Artist", 2, "albums").unwrap().unwrap();
    assert_eq!(coltrane["albums"], Value::List(Vec::new()));
    assert_eq!(coltrane["name"], Value::from("Coltrane"));

    // a key the loader does not know is simply absent
    assert!(s.get("Artist", 3, "").unwrap().is_none());
    assert_eq!(s.workspace().len(s.workspace().schema().id_of("Album").unwrap()).unwrap(), 0);
}

#[test]
fn find_where_picks_the_selector_by_filter_count() {
    let mut s = session();

    let rows = s
        .find_where("Album", [("artistId", 1)], "")
        .unwrap();
    assert_eq!(keys(&rows), [Key::Int(10), Key::Int(11)]);
    assert_eq!(s.loader().calls, ["Album(artistId:1)"]);

    let all = s
        .find_where("Album", Vec::<(&str, i64)>::new(), "")
        .unwrap();
    assert_eq!(all.len(), 3);

    // all now covers every index lookup
    let rows = s
        .find_where("Album", [("NAME", Key::from("Blue Train"))], "")
        .unwrap();
    assert_eq!(keys(&rows), [Key::Int(20)]);
    assert_eq!(s.loader().calls.len(), 2);
}

#[test]
fn forget_and_clear_force_a_reload() {
    let mut s = session();
    s.all("Artist", "").unwrap();

    let schema = Arc::clone(s.workspace().schema());
    let artist = schema.entity_by_name("Artist").unwrap();
    let query = Query::all(artist, Vec::new()).unwrap();
    assert!(s.is_cached(&query));

    assert!(s.forget(&query));
    assert!(!s.forget(&query));
    assert!(!s.is_cached(&query));

    s.all("Artist", "").unwrap();
    assert_eq!(s.loader().calls.len(), 2);

    s.clear_executed();
    assert_eq!(s.executed().count(), 0);
    s.all("Artist", "").unwrap();
    assert_eq!(s.loader().calls.len(), 3);
}

//
// ERRORS
//

#[test]
fn unsupported_loads_are_reported_and_not_remembered() {
    let mut s = session();

    let err = s.get_many("Artist", [1, 2], "").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Load);
    assert_eq!(err.origin, ErrorOrigin::Loader);
    assert_eq!(
        err.message,
        "loading multiple entities by their primary keys of Artist is not supported"
    );
    assert_eq!(s.executed().count(), 0);

    let err = s
        .find_where("Album", [("artistId", Key::Int(1)), ("name", Key::from("x"))], "")
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Load);
}

#[test]
fn failed_loads_propagate() {
    let mut s = Session::new(
        schema(),
        ScriptedLoader {
            offline: true,
            ..loader()
        },
    )
    .unwrap();

    let err = s.all("Artist", "").unwrap_err();
    assert_eq!(err.to_string(), "loading 'Artist' failed: offline");
    assert_eq!(s.executed().count(), 0);
}

#[test]
fn bad_requests_are_rejected_before_loading() {
    let mut s = session();

    let err = s.all("Artist", "albums/bogus").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Query(QueryErrorKind::Invalid));
    assert_eq!(err.origin, ErrorOrigin::Expansion);

    let err = s.all("Planet", "").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Store(StoreErrorKind::NotFound));

    let err = s.find_where("Album", [("title", 1)], "").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Query(QueryErrorKind::Invalid));
    assert_eq!(err.origin, ErrorOrigin::Query);

    assert!(s.loader().calls.is_empty());
}

#[test]
fn expansion_depth_follows_config() {
    let config = SessionConfig::from_toml_str("[core]\nmax_expansion_depth = 1").unwrap();
    let mut s = Session::with_config(schema(), loader(), config).unwrap();

    assert!(s.all("Artist", "albums").is_ok());
    let err = s.all("Artist", "albums/songs").unwrap_err();
    assert_eq!(err.origin, ErrorOrigin::Expansion);
}

//
// MERGE FAILURES
//

fn broken_loader() -> ScriptedLoader {
    ScriptedLoader::default().with(
        "Artist",
        json!([
            { "id": 1, "name": "Miles", "albums": "not a list" },
            { "id": 2, "name": "Coltrane" }
        ]),
    )
}

#[test]
fn malformed_items_are_skipped() {
    let recorder = Arc::new(Recorder::default());
    let mut s = Session::new(schema(), broken_loader())
        .unwrap()
        .metrics_sink(recorder.clone());

    let rows = s.all("Artist", "albums").unwrap();

    // the root row of the broken item lands before its albums are rejected
    assert_eq!(keys(&rows), [Key::Int(1), Key::Int(2)]);

    let events = recorder.0.lock().unwrap().clone();
    assert!(events.contains(&"SessionMiss { entity: \"Artist\" }".to_string()));
    assert!(events.contains(&"MergeFailure { entity: \"Artist\" }".to_string()));
}

#[test]
fn strict_merge_aborts_on_the_first_bad_item() {
    let config = SessionConfig {
        strict_merge: true,
        ..SessionConfig::default()
    };
    let mut s = Session::with_config(schema(), broken_loader(), config).unwrap();

    let err = s.all("Artist", "albums").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Query(QueryErrorKind::Invalid));
    assert_eq!(err.origin, ErrorOrigin::Workspace);
    assert_eq!(s.executed().count(), 0);
}

//
// METRICS + DEBUG
//

#[test]
fn hits_and_misses_reach_the_session_sink() {
    let recorder = Arc::new(Recorder::default());
    let mut s = session().debug().metrics_sink(recorder.clone());
    assert!(s.config().debug);

    s.all("Album", "").unwrap();
    s.get("Album", 10, "").unwrap();

    let events = recorder.0.lock().unwrap().clone();
    let misses = events.iter().filter(|e| e.starts_with("SessionMiss")).count();
    let hits = events.iter().filter(|e| e.starts_with("SessionHit")).count();

    assert_eq!((misses, hits), (1, 1));
    assert_eq!(
        events.iter().filter(|e| e.starts_with("RowUpserted")).count(),
        3
    );
}
