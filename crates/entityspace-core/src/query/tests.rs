use crate::{
    error::{ErrorClass, ErrorOrigin, InternalError},
    expansion::{Expansion, parse},
    model::{EntityId, EntityModel},
    query::{Query, QueryError, QuerySelector},
    test_fixtures::{Catalog, catalog},
    value::Key,
};
use proptest::prelude::*;
use std::collections::BTreeMap;

fn model(c: &Catalog, id: EntityId) -> &EntityModel {
    c.schema.entity(id).unwrap()
}

fn exps(c: &Catalog, owner: EntityId, text: &str) -> Vec<Expansion> {
    parse(&c.schema, owner, text).unwrap()
}

fn all(c: &Catalog, text: &str) -> Query {
    Query::all(model(c, c.artist), exps(c, c.artist, text)).unwrap()
}

fn assert_strict_superset(a: &Query, b: &Query) {
    assert!(a.is_superset_of(b), "{a} ⊇ {b}");
    assert!(!b.is_superset_of(a), "{b} ⊉ {a}");
    assert!(!a.is_subset_of(b));
    assert!(b.is_subset_of(a));
}

//
// SUPERSET
//

#[test]
fn expanded_all_is_superset_of_plain_all() {
    let c = catalog();

    assert_strict_superset(&all(&c, "albums/{songs,tags}"), &all(&c, ""));
    assert_strict_superset(&all(&c, "albums/{songs,tags}"), &all(&c, "albums"));
    assert_strict_superset(&all(&c, "albums/{songs,tags}"), &all(&c, "albums/songs"));
}

#[test]
fn equal_queries_are_mutual_supersets() {
    let c = catalog();
    let a = all(&c, "albums/{songs,tags}");
    let b = all(&c, "albums/{tags,songs}");

    assert_eq!(a, b);
    assert!(a.is_superset_of(&b) && b.is_superset_of(&a));
    assert!(a.is_subset_of(&b) && b.is_subset_of(&a));
}

#[test]
fn all_is_superset_of_by_key() {
    let c = catalog();
    let a = all(&c, "albums/{songs,tags}");
    let b = Query::by_key(model(&c, c.artist), 1, exps(&c, c.artist, "albums/{songs,tags}")).unwrap();

    assert_strict_superset(&a, &b);
}

#[test]
fn all_is_superset_of_by_index() {
    let c = catalog();
    let album = model(&c, c.album);
    let a = Query::all(album, exps(&c, c.album, "songs,tags")).unwrap();
    let b = Query::by_index(album, "artistId", 1, exps(&c, c.album, "songs,tags")).unwrap();

    assert_strict_superset(&a, &b);
}

#[test]
fn key_sets_compare_by_containment() {
    let c = catalog();
    let artist = model(&c, c.artist);
    let many = Query::by_keys(artist, [1, 2, 3], vec![]).unwrap();
    let few = Query::by_keys(artist, [3, 1], vec![]).unwrap();
    let one = Query::by_key(artist, 2, vec![]).unwrap();
    let other = Query::by_key(artist, 9, vec![]).unwrap();

    assert_strict_superset(&many, &few);
    assert_strict_superset(&many, &one);
    assert!(!many.is_superset_of(&other));
    assert!(!few.is_superset_of(&one));
}

#[test]
fn index_pairs_compare_by_containment() {
    let c = catalog();
    let album = model(&c, c.album);
    let both = Query::by_indexes(album, [("artistId", Key::from(1)), ("name", Key::from("x"))], vec![])
        .unwrap();
    let one = Query::by_index(album, "artistId", 1, vec![]).unwrap();
    let other_value = Query::by_index(album, "artistId", 2, vec![]).unwrap();

    assert_strict_superset(&both, &one);
    assert!(!both.is_superset_of(&other_value));
    assert!(!one.is_superset_of(&other_value));
}

#[test]
fn selector_kinds_do_not_mix() {
    let c = catalog();
    let album = model(&c, c.album);
    let by_key = Query::by_key(album, 1, vec![]).unwrap();
    let by_index = Query::by_index(album, "id", 1, vec![]).unwrap();

    assert!(!by_key.is_superset_of(&by_index));
    assert!(!by_index.is_superset_of(&by_key));
    assert!(!by_key.is_superset_of(&Query::all(album, vec![]).unwrap()));
}

#[test]
fn different_entity_types_are_unrelated() {
    let c = catalog();
    let artists = Query::all(model(&c, c.artist), vec![]).unwrap();
    let albums = Query::all(model(&c, c.album), vec![]).unwrap();

    assert!(!artists.is_superset_of(&albums));
    assert!(!albums.is_superset_of(&artists));
}

#[test]
fn narrower_expansions_block_superset() {
    let c = catalog();
    let artist = model(&c, c.artist);
    let a = Query::by_keys(artist, [1, 2], exps(&c, c.artist, "albums")).unwrap();
    let b = Query::by_key(artist, 1, exps(&c, c.artist, "albums/songs")).unwrap();

    assert!(!a.is_superset_of(&b));
}

//
// DISPLAY
//

#[test]
fn canonical_strings() {
    let c = catalog();
    let artist = model(&c, c.artist);
    let album = model(&c, c.album);
    let e = || exps(&c, c.artist, "albums/{songs,tags}");

    assert_eq!(all(&c, "albums/{songs,tags}").to_string(), "Artist/albums/{songs,tags}");
    assert_eq!(all(&c, "").to_string(), "Artist");
    assert_eq!(
        Query::by_key(artist, 64, e()).unwrap().to_string(),
        "Artist(64)/albums/{songs,tags}"
    );
    assert_eq!(
        Query::by_keys(artist, [64, 1337, 42, 23], e()).unwrap().to_string(),
        "Artist(23,42,64,1337)/albums/{songs,tags}"
    );
    assert_eq!(
        Query::by_index(album, "ARTISTID", 7, exps(&c, c.album, "songs,tags"))
            .unwrap()
            .to_string(),
        "Album(artistId:7)/{songs,tags}"
    );
    assert_eq!(
        Query::by_indexes(album, [("name", Key::from("b")), ("artistId", Key::from(1))], vec![])
            .unwrap()
            .to_string(),
        "Album(artistId:1,name:\"b\")"
    );
}

#[test]
fn text_keys_render_quoted() {
    let c = catalog();
    let q = Query::by_key(model(&c, c.artist), "abc", vec![]).unwrap();

    assert_eq!(q.to_string(), "Artist(\"abc\")");
    assert_eq!(q.selector(), &QuerySelector::ByKey(Key::from("abc")));

    let q = Query::by_key(model(&c, c.artist), r#"a",b\"#, vec![]).unwrap();
    assert_eq!(q.to_string(), r#"Artist("a\",b\\")"#);
}

#[test]
fn text_and_integer_keys_are_different_queries() {
    let c = catalog();
    let artist = model(&c, c.artist);
    let album = model(&c, c.album);

    let int = Query::by_key(artist, 1, vec![]).unwrap();
    let text = Query::by_key(artist, "1", vec![]).unwrap();
    assert_ne!(int, text);
    assert_ne!(int.canonical(), text.canonical());

    let two = Query::by_keys(artist, [1, 2], vec![]).unwrap();
    let joined = Query::by_key(artist, "1,2", vec![]).unwrap();
    assert_ne!(two, joined);

    let flag = Query::by_index(album, "name", true, vec![]).unwrap();
    let word = Query::by_index(album, "name", "true", vec![]).unwrap();
    assert_ne!(flag, word);

    let pairs = Query::by_indexes(album, [("artistId", Key::from(1)), ("name", Key::from("x"))], vec![])
        .unwrap();
    let smuggled = Query::by_index(album, "artistId", r#"1,name:"x""#, vec![]).unwrap();
    assert_ne!(pairs, smuggled);
}

#[test]
fn single_key_and_single_pair_collapse() {
    let c = catalog();
    let artist = model(&c, c.artist);
    let album = model(&c, c.album);

    let one = Query::by_keys(artist, [5], vec![]).unwrap();
    assert_eq!(one.selector(), &QuerySelector::ByKey(Key::from(5)));
    assert_eq!(one, Query::by_key(artist, 5, vec![]).unwrap());

    let pair = Query::by_indexes(album, [("ARTISTID", 3)], vec![]).unwrap();
    assert_eq!(pair, Query::by_index(album, "artistId", 3, vec![]).unwrap());
    assert!(matches!(pair.selector(), QuerySelector::ByIndex { index, .. } if index == "artistId"));
}

#[test]
fn index_pairs_render_sorted_by_text() {
    let selector = QuerySelector::ByIndexes(BTreeMap::from([
        ("name".to_string(), Key::from("x")),
        ("name2".to_string(), Key::from("y")),
    ]));

    // ':' sorts after '2'
    assert_eq!(selector.to_string(), r#"name2:"y",name:"x""#);
}

#[test]
fn odd_index_names_are_quoted() {
    let selector = QuerySelector::ByIndex {
        index: "a:b".to_string(),
        value: Key::from(1),
    };

    assert_eq!(selector.to_string(), r#""a:b":1"#);
}

//
// CONSTRUCTION
//

#[test]
fn empty_by_indexes_fails() {
    let c = catalog();
    let err = Query::by_indexes(model(&c, c.album), Vec::<(&str, Key)>::new(), vec![]).unwrap_err();

    assert_eq!(err, QueryError::EmptyIndexes { entity: "Album".into() });
}

#[test]
fn unknown_index_field_fails() {
    let c = catalog();
    let err = Query::by_index(model(&c, c.album), "songs", 1, vec![]).unwrap_err();

    assert!(matches!(err, QueryError::UnknownIndexField { ref field, .. } if field == "songs"));

    let internal: InternalError = err.into();
    assert_eq!(internal.class, ErrorClass::Invalid);
    assert_eq!(internal.origin, ErrorOrigin::Query);
}

#[test]
fn repeated_index_fails() {
    let c = catalog();
    let err = Query::by_indexes(
        model(&c, c.album),
        [("artistId", Key::from(1)), ("ARTISTID", Key::from(2))],
        vec![],
    )
    .unwrap_err();

    assert!(matches!(err, QueryError::DuplicateIndex { .. }));
}

#[test]
fn expansions_must_start_at_entity() {
    let c = catalog();
    let err = Query::all(model(&c, c.artist), exps(&c, c.album, "songs")).unwrap_err();

    assert!(matches!(err, QueryError::ForeignExpansion { expansion, .. } if expansion == "songs"));
}

//
// EXTRACT
//

#[test]
fn extract_simple() {
    let c = catalog();
    let q = all(&c, "albums/{songs,tags}");

    let (q, extracted) = q.extract(&[c.nav(c.album, "songs")]);
    assert_eq!(q.to_string(), "Artist/albums/tags");
    assert_eq!(extracted[0].path().unwrap().to_string(), "albums");
    assert_eq!(extracted[0].extracted().to_string(), "songs");

    let (q, extracted) = q.extract(&[c.nav(c.album, "tags")]);
    assert_eq!(q.to_string(), "Artist/albums");
    assert_eq!(extracted[0].path().unwrap().to_string(), "albums");
    assert_eq!(extracted[0].extracted().to_string(), "tags");
}

#[test]
fn extract_complex() {
    let c = catalog();
    let q = all(&c, "albums/{songs/album/artist,tags}");

    let (q, extracted) = q.extract(&[c.nav(c.album, "artist")]);
    assert_eq!(q.to_string(), "Artist/albums/{songs/album,tags}");
    assert_eq!(extracted[0].path().unwrap().to_string(), "albums/songs/album");
    assert_eq!(extracted[0].extracted().to_string(), "artist");

    let (q, extracted) = q.extract(&[c.nav(c.song, "album")]);
    assert_eq!(q.to_string(), "Artist/albums/{songs,tags}");
    assert_eq!(extracted[0].path().unwrap().to_string(), "albums/songs");
    assert_eq!(extracted[0].extracted().to_string(), "album");
}

#[test]
fn extract_whole_subtree() {
    let c = catalog();
    let q = all(&c, "albums/{songs/album/artist,tags}");

    let (q, _) = q.extract(&[c.nav(c.album, "artist")]);
    let (q, extracted) = q.extract(&[c.nav(c.album, "songs")]);

    assert_eq!(q.to_string(), "Artist/albums/tags");
    assert_eq!(extracted[0].path().unwrap().to_string(), "albums");
    assert_eq!(extracted[0].extracted().to_string(), "songs/album");
}

#[test]
fn extract_at_root_keeps_selector() {
    let c = catalog();
    let q = Query::by_key(model(&c, c.artist), 5, exps(&c, c.artist, "albums/songs")).unwrap();

    let (reduced, extracted) = q.extract(&[c.nav(c.artist, "albums")]);

    assert_eq!(reduced.to_string(), "Artist(5)");
    assert!(extracted[0].path().is_none());
    assert!(q.is_superset_of(&reduced));
}

//
// IDENTITY
//

fn arb_key() -> impl Strategy<Value = Key> {
    prop_oneof![
        any::<bool>().prop_map(Key::from),
        (-2i64..3).prop_map(Key::from),
        (0u64..2).prop_map(|n| Key::from(u64::MAX - n)),
        r#"[0-2tf,:"()\\]{0,3}"#.prop_map(Key::from),
    ]
}

fn arb_selection() -> impl Strategy<Value = (u8, Vec<Key>)> {
    (0u8..4, prop::collection::vec(arb_key(), 1..4))
}

fn build(c: &Catalog, (kind, keys): &(u8, Vec<Key>)) -> Query {
    let album = model(c, c.album);
    let fields = ["artistId", "name"];

    match *kind {
        0 => Query::by_key(album, keys[0].clone(), vec![]),
        1 => Query::by_keys(album, keys.clone(), vec![]),
        2 => Query::by_index(album, fields[keys.len() % 2], keys[0].clone(), vec![]),
        _ => Query::by_indexes(album, fields.into_iter().zip(keys.iter().cloned()), vec![]),
    }
    .unwrap()
}

proptest! {
    #[test]
    fn queries_are_equal_iff_selectors_are(a in arb_selection(), b in arb_selection()) {
        let c = catalog();
        let (qa, qb) = (build(&c, &a), build(&c, &b));

        prop_assert_eq!(qa == qb, qa.selector() == qb.selector(), "{} vs {}", qa, qb);
    }

    #[test]
    fn distinct_keys_never_share_a_canonical_form(a in arb_key(), b in arb_key()) {
        prop_assert_eq!(a.canonical() == b.canonical(), a == b);
    }
}
