use crate::{
    model::{EntityDef, EntityId, NavigationModel, Schema, SchemaBuilder},
    value::Record,
};
use std::sync::Arc;

///
/// Catalog
///
/// Music catalog used across unit tests:
///
/// Artist ─< Album ─< Song ─< SongTag >─ Tag >─ TagType
///             └───< AlbumTag >─ Tag
///

pub struct Catalog {
    pub schema: Arc<Schema>,
    pub artist: EntityId,
    pub album: EntityId,
    pub album_tag: EntityId,
    pub song: EntityId,
    pub song_tag: EntityId,
    pub tag: EntityId,
    pub tag_type: EntityId,
}

impl Catalog {
    /// Navigation property `name` declared on `entity`.
    pub fn nav(&self, entity: EntityId, name: &str) -> Arc<NavigationModel> {
        let model = self.schema.entity(entity).expect("fixture entity");
        Arc::clone(model.navigation(name).expect("fixture navigation"))
    }
}

pub fn catalog() -> Catalog {
    let mut b = SchemaBuilder::new();

    let artist = b.entity(EntityDef::new("Artist", "id").primitive("name")).unwrap();
    let album = b.entity(EntityDef::new("Album", "id").indexed("name")).unwrap();
    let album_tag = b.entity(EntityDef::new("AlbumTag", "id")).unwrap();
    let song = b.entity(EntityDef::new("Song", "id").primitive("name")).unwrap();
    let song_tag = b.entity(EntityDef::new("SongTag", "id")).unwrap();
    let tag = b.entity(EntityDef::new("Tag", "id")).unwrap();
    let tag_type = b.entity(EntityDef::new("TagType", "id").primitive("name")).unwrap();

    b.reference(album, "artist", "artistId", artist).unwrap();
    b.reference(album_tag, "album", "albumId", album).unwrap();
    b.reference(album_tag, "tag", "tagId", tag).unwrap();
    b.reference(song, "album", "albumId", album).unwrap();
    b.reference(song_tag, "song", "songId", song).unwrap();
    b.reference(song_tag, "tag", "tagId", tag).unwrap();
    b.reference(tag, "tagType", "tagTypeId", tag_type).unwrap();

    b.collection(artist, "albums", album, "artist").unwrap();
    b.collection(album, "songs", song, "album").unwrap();
    b.collection(album, "tags", album_tag, "album").unwrap();
    b.collection(song, "tags", song_tag, "song").unwrap();

    Catalog {
        schema: Arc::new(b.build().expect("catalog schema should build")),
        artist,
        album,
        album_tag,
        song,
        song_tag,
        tag,
        tag_type,
    }
}

/// Artist payload with `albums` songs nested inline, keys assigned in
/// sequence starting at `album_id` / `song_id`.
pub fn artist_graph(
    artist_id: i64,
    albums: usize,
    songs_per_album: usize,
    album_id: &mut i64,
    song_id: &mut i64,
) -> Record {
    let mut album_records = Vec::with_capacity(albums);

    for _ in 0..albums {
        let id = *album_id;
        *album_id += 1;

        let mut songs = Vec::with_capacity(songs_per_album);
        for _ in 0..songs_per_album {
            let sid = *song_id;
            *song_id += 1;
            songs.push(
                Record::new()
                    .with("id", sid)
                    .with("name", format!("song {sid}"))
                    .with("albumId", id),
            );
        }

        album_records.push(
            Record::new()
                .with("id", id)
                .with("name", format!("album {id}"))
                .with("artistId", artist_id)
                .with("songs", songs),
        );
    }

    Record::new()
        .with("id", artist_id)
        .with("name", format!("artist {artist_id}"))
        .with("albums", album_records)
}
