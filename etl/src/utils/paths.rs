pub const SONG_DATA_PATTERN: &str = "song_data/*/*/*";
pub const LOG_DATA_PATTERN: &str = "log_data/*/*/";

/// Input and output roots of one run, shared by every extractor.
#[derive(Debug, Clone)]
pub struct LakePaths {
    input_root: String,
    output_root: String,
}

impl LakePaths {
    pub fn new(input_root: &str, output_root: &str) -> Self {
        Self {
            input_root: input_root.trim_end_matches('/').to_string(),
            output_root: output_root.trim_end_matches('/').to_string(),
        }
    }

    pub fn input_root(&self) -> &str {
        &self.input_root
    }

    pub fn output_root(&self) -> &str {
        &self.output_root
    }

    pub fn song_data_path(&self) -> String {
        format!("{}/{}", self.input_root, SONG_DATA_PATTERN)
    }

    pub fn log_data_path(&self) -> String {
        format!("{}/{}", self.input_root, LOG_DATA_PATTERN)
    }
}
