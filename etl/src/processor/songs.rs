use super::{Extractor, TableWriteSummary, TableWriter, keep_first_by, load_json};
use crate::schema::{OutputTable, SourceSchema, get_source_schema};
use crate::session::EtlSession;
use crate::utils::paths::{LakePaths, SONG_DATA_PATTERN};
use async_trait::async_trait;
use common::Result;
use datafusion::prelude::*;
use tracing::info;

/// Builds the songs and artists dimensions from the song catalog.
pub struct SongCatalogProcessor {
    session: EtlSession,
}

impl SongCatalogProcessor {
    pub fn new(session: &EtlSession) -> Self {
        Self {
            session: session.clone(),
        }
    }

    /// Reads the song catalog under `input_root`.
    pub async fn load_songs(session: &EtlSession, paths: &LakePaths) -> Result<DataFrame> {
        let input = session.resolve(paths.input_root())?;
        load_json(
            session.context(),
            &input,
            SONG_DATA_PATTERN,
            get_source_schema(SourceSchema::Songs),
        )
        .await
    }
}

/// `{song_id, title, artist_id, year, duration}`
pub fn songs_table(songs: &DataFrame) -> Result<DataFrame> {
    let df = songs.clone().select(vec![
        col("song_id"),
        col("title"),
        col("artist_id"),
        col("year"),
        col("duration"),
    ])?;
    Ok(df)
}

/// `{artist_id, name, location, latitude, longitude}`, one row per artist.
/// When several songs name the same artist, the song with the smallest
/// `song_id` supplies the attributes.
pub async fn artists_table(ctx: &SessionContext, songs: &DataFrame) -> Result<DataFrame> {
    let with_id = songs
        .clone()
        .filter(col("artist_id").is_not_null().and(col("artist_id").not_eq(lit(""))))?;

    let df = keep_first_by(ctx, with_id, "artist_id", "\"song_id\" ASC NULLS LAST")
        .await?
        .select(vec![
            col("artist_id"),
            col("artist_name").alias("name"),
            col("artist_location").alias("location"),
            col("artist_latitude").alias("latitude"),
            col("artist_longitude").alias("longitude"),
        ])?;
    Ok(df)
}

#[async_trait]
impl Extractor for SongCatalogProcessor {
    fn name(&self) -> &'static str {
        "song_catalog"
    }

    async fn run(&self, paths: &LakePaths) -> Result<Vec<TableWriteSummary>> {
        info!(source = %paths.song_data_path(), "Processing song data");

        let songs = Self::load_songs(&self.session, paths).await?;
        let writer = TableWriter::new(
            self.session.context().clone(),
            self.session.resolve(paths.output_root())?,
            self.session.compression(),
        );

        let songs_summary = writer
            .write(OutputTable::Songs, songs_table(&songs)?)
            .await?;
        let artists_summary = writer
            .write(
                OutputTable::Artists,
                artists_table(self.session.context(), &songs).await?,
            )
            .await?;

        Ok(vec![songs_summary, artists_summary])
    }
}
