use super::songs::SongCatalogProcessor;
use super::{Extractor, TableWriteSummary, TableWriter, keep_first_by, load_json, number_rows, udf};
use crate::schema::{OutputTable, SourceSchema, get_source_schema};
use crate::session::EtlSession;
use crate::utils::paths::{LOG_DATA_PATTERN, LakePaths};
use async_trait::async_trait;
use common::Result;
use datafusion::common::JoinType;
use datafusion::prelude::*;
use tracing::info;

pub const NEXT_SONG_PAGE: &str = "NextSong";

/// Builds the users and time dimensions and the songplays fact from the
/// activity logs.
pub struct ActivityLogProcessor {
    session: EtlSession,
}

impl ActivityLogProcessor {
    pub fn new(session: &EtlSession) -> Self {
        Self {
            session: session.clone(),
        }
    }

    /// Reads the activity logs and keeps only song plays, with `start_time`
    /// derived from `ts`.
    pub async fn load_plays(session: &EtlSession, paths: &LakePaths) -> Result<DataFrame> {
        let input = session.resolve(paths.input_root())?;
        let events = load_json(
            session.context(),
            &input,
            LOG_DATA_PATTERN,
            get_source_schema(SourceSchema::Logs),
        )
        .await?;

        song_plays(events)
    }
}

pub fn song_plays(events: DataFrame) -> Result<DataFrame> {
    let df = events
        .filter(col("page").eq(lit(NEXT_SONG_PAGE)))?
        .with_column(
            "start_time",
            udf::epoch_millis_to_timestamp().call(vec![col("ts")]),
        )?;
    Ok(df)
}

/// One row per user. The most recent event decides the attributes, so a
/// free to paid upgrade shows up as `paid`.
pub async fn users_table(ctx: &SessionContext, plays: &DataFrame) -> Result<DataFrame> {
    let with_id = plays
        .clone()
        .filter(col("userId").is_not_null().and(col("userId").not_eq(lit(""))))?;

    let df = keep_first_by(ctx, with_id, "userId", "\"ts\" DESC NULLS LAST")
        .await?
        .select(vec![
            col("userId").alias("user_id"),
            col("firstName").alias("first_name"),
            col("lastName").alias("last_name"),
            col("gender"),
            col("level"),
        ])?;
    Ok(df)
}

/// Distinct play instants broken down into calendar fields.
pub fn time_table(plays: &DataFrame) -> Result<DataFrame> {
    let start_time = || vec![col("start_time")];

    let df = plays
        .clone()
        .filter(col("start_time").is_not_null())?
        .select(vec![
            col("start_time"),
            udf::hour_of_day().call(start_time()).alias("hour"),
            udf::day_of_month().call(start_time()).alias("day"),
            udf::iso_week().call(start_time()).alias("week"),
            udf::month_of_year().call(start_time()).alias("month"),
            udf::calendar_year().call(start_time()).alias("year"),
            udf::iso_weekday().call(start_time()).alias("weekday"),
        ])?
        .distinct()?;
    Ok(df)
}

/// Joins plays to the catalog by artist name and numbers the result.
pub async fn songplays_table(
    ctx: &SessionContext,
    plays: &DataFrame,
    songs: &DataFrame,
) -> Result<DataFrame> {
    let catalog = songs
        .clone()
        .select(vec![col("song_id"), col("artist_id"), col("artist_name")])?;

    let joined = plays
        .clone()
        .join(catalog, JoinType::Inner, &["artist"], &["artist_name"], None)?;

    let numbered = number_rows(
        ctx,
        joined,
        "\"start_time\", \"userId\", \"sessionId\", \"song_id\"",
        "songplay_id",
    )
    .await?;

    let df = numbered.select(vec![
        col("songplay_id"),
        col("start_time"),
        col("userId").alias("user_id"),
        col("level"),
        col("song_id"),
        col("artist_id"),
        col("sessionId").alias("session_id"),
        col("location"),
        col("userAgent").alias("user_agent"),
        udf::calendar_year().call(vec![col("start_time")]).alias("year"),
        udf::month_of_year().call(vec![col("start_time")]).alias("month"),
    ])?;
    Ok(df)
}

#[async_trait]
impl Extractor for ActivityLogProcessor {
    fn name(&self) -> &'static str {
        "activity_log"
    }

    async fn run(&self, paths: &LakePaths) -> Result<Vec<TableWriteSummary>> {
        info!(source = %paths.log_data_path(), "Processing log data");

        let ctx = self.session.context();
        let plays = Self::load_plays(&self.session, paths).await?;
        let writer = TableWriter::new(
            ctx.clone(),
            self.session.resolve(paths.output_root())?,
            self.session.compression(),
        );

        let users = writer
            .write(OutputTable::Users, users_table(ctx, &plays).await?)
            .await?;
        let time = writer
            .write(OutputTable::Time, time_table(&plays)?)
            .await?;

        info!(source = %paths.song_data_path(), "Reading song data for songplays");
        let songs = SongCatalogProcessor::load_songs(&self.session, paths).await?;
        let songplays = writer
            .write(
                OutputTable::Songplays,
                songplays_table(ctx, &plays, &songs).await?,
            )
            .await?;

        Ok(vec![users, time, songplays])
    }
}
