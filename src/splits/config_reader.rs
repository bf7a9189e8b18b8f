use crate::splits::*;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

/// The optional JSON configuration file.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct SplitsConfig {
    #[serde(rename = "inputFile")]
    pub input_file: Option<String>,
    #[serde(rename = "typeOfTimeDataToParse")]
    pub type_of_time_data_to_parse: Option<String>,
    #[serde(rename = "outputFile")]
    pub output_file: Option<String>,
    #[serde(rename = "headerLines")]
    pub header_lines: Option<usize>,
    #[serde(rename = "failOnMismatch")]
    pub fail_on_mismatch: Option<bool>,
}

/// Paths in the configuration file are relative to the directory of that file.
fn resolve(root: &Path, path: &str) -> String {
    if path == "stdout" || Path::new(path).is_absolute() {
        path.to_string()
    } else {
        root.join(path).display().to_string()
    }
}

pub fn read_config(path: &str) -> SplitsResult<SplitsConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let mut config: SplitsConfig =
        serde_json::from_str(&contents).context(ParsingJsonSnafu { path })?;
    debug!("read_config: {:?}", config);

    let root = Path::new(path).parent().context(MissingParentDirSnafu { path })?;
    config.input_file = config.input_file.map(|p| resolve(root, &p));
    config.output_file = config.output_file.map(|p| resolve(root, &p));
    Ok(config)
}

pub fn read_summary(path: &str) -> SplitsResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(&contents).context(ParsingJsonSnafu { path })?;
    Ok(js)
}
