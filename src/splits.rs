use log::{debug, info, warn};

use orienteering_splits::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::Path;

use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::splits::config_reader::*;
use crate::splits::io_text::read_export;
use crate::splits::json_output::dataset_to_json;

pub mod config_reader;
pub mod io_text;
pub mod json_output;

#[derive(Debug, Snafu)]
pub enum SplitsError {
    #[snafu(display("Error opening export {path}"))]
    OpeningInput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error opening JSON file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON file {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error serializing the analysis"))]
    SerializingJson { source: serde_json::Error },
    #[snafu(display("Error writing {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Cannot find the directory of {path}"))]
    MissingParentDir { path: String },
    #[snafu(display("No export given: use --input or inputFile in the configuration file"))]
    MissingInput {},
    #[snafu(display("Unknown type of time data {value:?}, expected RELATIVE or ACTUAL"))]
    UnknownTimeData { value: String },
    #[snafu(display("Failed to analyze {path}"))]
    Analysis {
        source: AnalysisError,
        path: String,
    },
    #[snafu(display("{count} rows do not have the expected shape, starting with: {first}"))]
    Mismatches { count: usize, first: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

type SplitsResult<T> = Result<T, SplitsError>;

/// The settings of one run, after merging the command line and the configuration file.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Settings {
    pub input: String,
    pub config: AnalysisConfig,
    pub out: Option<String>,
    pub reference: Option<String>,
    pub fail_on_mismatch: bool,
}

/// Command line arguments take precedence over the configuration file.
pub fn settings(args: &Args) -> SplitsResult<Settings> {
    let file_config = match &args.config {
        Some(path) => read_config(path)?,
        None => SplitsConfig::default(),
    };

    let input = args
        .input
        .clone()
        .or(file_config.input_file)
        .context(MissingInputSnafu {})?;

    let time_data = args
        .time_data
        .clone()
        .or(file_config.type_of_time_data_to_parse);
    let time_data_type = match time_data.as_deref() {
        None => AnalysisConfig::DEFAULT.time_data_type,
        Some(s) => TimeDataType::parse(s).context(UnknownTimeDataSnafu { value: s })?,
    };

    let res = Settings {
        input,
        config: AnalysisConfig {
            time_data_type,
            header_lines: file_config
                .header_lines
                .unwrap_or(AnalysisConfig::DEFAULT.header_lines),
        },
        out: args.out.clone().or(file_config.output_file),
        reference: args.reference.clone(),
        fail_on_mismatch: args.fail_on_mismatch || file_config.fail_on_mismatch.unwrap_or(false),
    };
    info!("settings: {:?}", res);
    Ok(res)
}

/// Reads and analyzes the export, and returns the JSON document.
pub fn analyze(settings: &Settings) -> SplitsResult<JSValue> {
    let raw = read_export(&settings.input)?;
    let dataset = run_analysis(&raw, &settings.config).context(AnalysisSnafu {
        path: settings.input.clone(),
    })?;

    for m in dataset.mismatches.iter() {
        warn!("{}: {}", settings.input, m);
    }
    if settings.fail_on_mismatch {
        if let Some(first) = dataset.mismatches.first() {
            return MismatchesSnafu {
                count: dataset.mismatches.len(),
                first: first.to_string(),
            }
            .fail();
        }
    }

    debug!(
        "analyze: best split times: {:?}",
        dataset.best.split.times
    );
    Ok(dataset_to_json(&dataset))
}

fn write_output(pretty_js: &str, out: &Option<String>) -> SplitsResult<()> {
    match out.as_deref() {
        None | Some("") | Some("stdout") => {
            println!("{}", pretty_js);
        }
        Some(path) => {
            info!("Writing the analysis to {:?}", path);
            fs::write(path, pretty_js).context(WritingOutputSnafu { path })?;
        }
    }
    Ok(())
}

fn check_reference(pretty_js: &str, reference_path: &str) -> SplitsResult<()> {
    let reference = read_summary(reference_path)?;
    let pretty_js_reference =
        serde_json::to_string_pretty(&reference).context(SerializingJsonSnafu {})?;
    if pretty_js_reference != pretty_js {
        warn!("Found differences with the reference {}", reference_path);
        print_diff(pretty_js_reference.as_str(), pretty_js, "\n");
        whatever!("Difference detected between the analysis and the reference analysis")
    }
    Ok(())
}

pub fn run(args: &Args) -> SplitsResult<()> {
    let settings = settings(args)?;
    let js = analyze(&settings)?;
    let pretty_js = serde_json::to_string_pretty(&js).context(SerializingJsonSnafu {})?;
    write_output(&pretty_js, &settings.out)?;

    if let Some(reference_path) = &settings.reference {
        check_reference(&pretty_js, reference_path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn testdata(name: &str) -> String {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("testdata")
            .join(name)
            .display()
            .to_string()
    }

    fn args(input: Option<&str>) -> Args {
        let _ = env_logger::builder().is_test(true).try_init();
        Args {
            config: None,
            input: input.map(testdata),
            time_data: None,
            out: None,
            reference: None,
            fail_on_mismatch: false,
            verbose: false,
        }
    }

    fn out_path(name: &str) -> String {
        std::env::temp_dir()
            .join(format!("winsplits_{}_{}.json", name, std::process::id()))
            .display()
            .to_string()
    }

    #[test]
    fn relative_export_matches_reference() {
        let out = out_path("relative");
        let res = run(&Args {
            time_data: Some("relative".to_string()),
            out: Some(out.clone()),
            reference: Some(testdata("h21_relative_expected.json")),
            ..args(Some("h21_relative.txt"))
        });
        assert!(res.is_ok(), "{:?}", res);
        let written: JSValue = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(written["numberOfParticipants"], 2);
        fs::remove_file(out).unwrap();
    }

    #[test]
    fn latin1_actual_export_from_config() {
        let settings = settings(&Args {
            config: Some(testdata("h21_actual_config.json")),
            ..args(None)
        })
        .unwrap();
        assert_eq!(settings.input, testdata("h21_actual.txt"));
        assert_eq!(settings.config.time_data_type, TimeDataType::Actual);
        assert!(settings.fail_on_mismatch);
        assert_eq!(settings.out, Some("stdout".to_string()));

        let js = analyze(&settings).unwrap();
        assert_eq!(js["results"][0]["club"], "OK Linné");
        assert_eq!(js["results"][1]["club"], "IFK Lidingö");
        assert_eq!(
            js["results"][1]["split"]["relativeTimesInSeconds"],
            serde_json::json!([60, 96])
        );
        assert_eq!(
            js["results"][1]["leg"]["relativeTimesMinimized"],
            serde_json::json!(["+1:00", "+36"])
        );
    }

    #[test]
    fn both_exports_agree() {
        let relative = analyze(&settings(&args(Some("h21_relative.txt"))).unwrap()).unwrap();
        let actual = analyze(
            &settings(&Args {
                time_data: Some("ACTUAL".to_string()),
                ..args(Some("h21_actual.txt"))
            })
            .unwrap(),
        )
        .unwrap();
        for key in ["aggregated", "secondBest", "numberOfControls", "controlLabels"] {
            assert_eq!(relative[key], actual[key], "{}", key);
        }
        assert_eq!(relative["best"]["leg"]["timesInSeconds"], actual["best"]["leg"]["timesInSeconds"]);
        for i in 0..2 {
            for metric in ["leg", "split"] {
                for series in ["actualTimesInSeconds", "relativeTimesInSeconds", "timesPercentages"] {
                    assert_eq!(
                        relative["results"][i][metric][series],
                        actual["results"][i][metric][series]
                    );
                }
            }
            assert_eq!(relative["results"][i]["chart"], actual["results"][i]["chart"]);
        }
    }

    #[test]
    fn reference_difference_is_an_error() {
        let res = run(&Args {
            time_data: Some("actual".to_string()),
            out: Some(out_path("difference")),
            reference: Some(testdata("h21_relative_expected.json")),
            ..args(Some("h21_actual.txt"))
        });
        assert!(matches!(res, Err(SplitsError::Whatever { .. })), "{:?}", res);
        let _ = fs::remove_file(out_path("difference"));
    }

    #[test]
    fn mismatches_fail_on_request() {
        let lenient = analyze(&settings(&args(Some("h21_mismatch.txt"))).unwrap()).unwrap();
        assert_eq!(lenient["mismatches"].as_array().unwrap().len(), 1);
        assert_eq!(lenient["results"][1]["name"], "Bo Ek");

        let strict = analyze(
            &settings(&Args {
                fail_on_mismatch: true,
                ..args(Some("h21_mismatch.txt"))
            })
            .unwrap(),
        );
        assert!(
            matches!(strict, Err(SplitsError::Mismatches { count: 1, .. })),
            "{:?}",
            strict
        );
    }

    #[test]
    fn malformed_export() {
        let res = analyze(&settings(&args(Some("h21_malformed.txt"))).unwrap());
        match res {
            Err(SplitsError::Analysis {
                source: AnalysisError::MalformedTime { lineno, text },
                ..
            }) => {
                assert_eq!(lineno, 5);
                assert_eq!(text, "1.x0");
            }
            x => panic!("unexpected result {:?}", x),
        }
    }

    #[test]
    fn configuration_errors() {
        assert!(matches!(
            settings(&args(None)),
            Err(SplitsError::MissingInput {})
        ));
        assert!(matches!(
            settings(&Args {
                time_data: Some("both".to_string()),
                ..args(Some("h21_relative.txt"))
            }),
            Err(SplitsError::UnknownTimeData { .. })
        ));
        assert!(matches!(
            analyze(&settings(&args(Some("no_such_export.txt"))).unwrap()),
            Err(SplitsError::OpeningInput { .. })
        ));
    }
}
