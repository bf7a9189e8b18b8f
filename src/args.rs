use clap::Parser;

/// Split time analysis of orienteering races exported from WinSplits Online.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON configuration file. Relative paths in this file are read from
    /// the directory of the file.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) The text export of WinSplits Online. Setting this option overrides the input
    /// file that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (relative or actual, default relative) Whether the export holds the times behind the
    /// fastest athlete or the elapsed times.
    #[clap(short, long, value_parser)]
    pub time_data: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the analysis will be written in JSON format to
    /// the given location. Setting this option overrides the path that may be specified with the
    /// --config option.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference file containing the analysis in JSON format. If provided, winsplits
    /// will check that its output matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// If passed as an argument, rows that do not have the expected shape make the analysis fail.
    #[clap(long, takes_value = false)]
    pub fail_on_mismatch: bool,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
