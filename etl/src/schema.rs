use arrow::datatypes::{DataType, Field, Schema};
use lazy_static::lazy_static;

// Raw source schemas
pub fn song_record_schema() -> Schema {
    Schema::new(vec![
        Field::new("num_songs", DataType::Int64, true),
        Field::new("artist_id", DataType::Utf8, true),
        Field::new("artist_latitude", DataType::Float64, true),
        Field::new("artist_longitude", DataType::Float64, true),
        Field::new("artist_location", DataType::Utf8, true),
        Field::new("artist_name", DataType::Utf8, true),
        Field::new("song_id", DataType::Utf8, true),
        Field::new("title", DataType::Utf8, true),
        Field::new("duration", DataType::Float64, true),
        Field::new("year", DataType::Int64, true),
    ])
}

pub fn log_event_schema() -> Schema {
    Schema::new(vec![
        Field::new("artist", DataType::Utf8, true),
        Field::new("auth", DataType::Utf8, true),
        Field::new("firstName", DataType::Utf8, true),
        Field::new("gender", DataType::Utf8, true),
        Field::new("itemInSession", DataType::Int64, true),
        Field::new("lastName", DataType::Utf8, true),
        Field::new("length", DataType::Float64, true),
        Field::new("level", DataType::Utf8, true),
        Field::new("location", DataType::Utf8, true),
        Field::new("method", DataType::Utf8, true),
        Field::new("page", DataType::Utf8, true),
        Field::new("registration", DataType::Float64, true),
        Field::new("sessionId", DataType::Int64, true),
        Field::new("song", DataType::Utf8, true),
        Field::new("status", DataType::Int64, true),
        Field::new("ts", DataType::Int64, true),
        Field::new("userAgent", DataType::Utf8, true),
        Field::new("userId", DataType::Utf8, true),
    ])
}

pub enum SourceSchema {
    Songs,
    Logs,
}

pub fn get_source_schema(source: SourceSchema) -> &'static Schema {
    match source {
        SourceSchema::Songs => &SONG_RECORD_SCHEMA,
        SourceSchema::Logs => &LOG_EVENT_SCHEMA,
    }
}

// Lazy-loaded static schemas
lazy_static! {
    static ref SONG_RECORD_SCHEMA: Schema = song_record_schema();
    static ref LOG_EVENT_SCHEMA: Schema = log_event_schema();
}

/// The analytical tables this job produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputTable {
    Songs,
    Artists,
    Users,
    Time,
    Songplays,
}

impl OutputTable {
    pub fn name(&self) -> &'static str {
        match self {
            OutputTable::Songs => "songs_table",
            OutputTable::Artists => "artists_table",
            OutputTable::Users => "users_table",
            OutputTable::Time => "time_table",
            OutputTable::Songplays => "songplays_table",
        }
    }

    /// Hive partition columns, outermost first.
    pub fn partition_columns(&self) -> &'static [&'static str] {
        match self {
            OutputTable::Songs => &["year", "artist_id"],
            OutputTable::Time | OutputTable::Songplays => &["year", "month"],
            OutputTable::Artists | OutputTable::Users => &[],
        }
    }

    /// Column layout of the table, partition columns included.
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            OutputTable::Songs => &["song_id", "title", "artist_id", "year", "duration"],
            OutputTable::Artists => &["artist_id", "name", "location", "latitude", "longitude"],
            OutputTable::Users => &["user_id", "first_name", "last_name", "gender", "level"],
            OutputTable::Time => &["start_time", "hour", "day", "week", "month", "year", "weekday"],
            OutputTable::Songplays => &[
                "songplay_id",
                "start_time",
                "user_id",
                "level",
                "song_id",
                "artist_id",
                "session_id",
                "location",
                "user_agent",
                "year",
                "month",
            ],
        }
    }
}

impl std::fmt::Display for OutputTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
