// Rendering of the analysis as the JSON document read by the charting pages.

use orienteering_splits::time_codec::format_time;
use orienteering_splits::*;

use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;

fn time_js(t: TimeValue) -> JSValue {
    match t {
        TimeValue::Seconds(s) => json!(s),
        TimeValue::Missing => JSValue::Null,
    }
}

fn times_js(ts: &[TimeValue]) -> Vec<JSValue> {
    ts.iter().map(|t| time_js(*t)).collect()
}

fn place_js(p: Place) -> JSValue {
    match p.rank() {
        Some(r) => json!(r),
        None => JSValue::Null,
    }
}

fn relative_display_js(d: &RelativeDisplay) -> JSValue {
    match d {
        RelativeDisplay::Unavailable => JSValue::Null,
        RelativeDisplay::Behind(s) | RelativeDisplay::AheadOfRunnerUp(s) => json!(s),
        RelativeDisplay::Level => json!(0),
    }
}

fn mistake_js(m: Option<Mistake>) -> JSValue {
    match m {
        Some(Mistake::NoMistake) => json!("none"),
        Some(Mistake::Minor) => json!("minor"),
        Some(Mistake::Major) => json!("major"),
        None => JSValue::Null,
    }
}

fn total_time_js(t: TotalTime) -> JSValue {
    match t.status() {
        Some(status) => json!(status),
        None => json!(format_time(t.seconds(), MinimumUnit::Seconds, false)),
    }
}

fn diff_total_time_js(t: TotalTime) -> JSValue {
    match (t.status(), t.seconds()) {
        (Some(status), _) => json!(status),
        (None, TimeValue::Missing) => json!(""),
        (None, diff) => json!(format!(
            "+{}",
            format_time(diff, MinimumUnit::Minutes, false)
        )),
    }
}

fn control_id_js(c: ControlId) -> JSValue {
    match c {
        ControlId::Control(n) => json!(n),
        ControlId::Finish => json!("Finish"),
    }
}

fn record_js(r: &PerformanceRecord) -> JSValue {
    json!({
        "originalTime": r.original_time,
        "relativeTime": r.relative_time,
        "relativeTimeInSeconds": time_js(r.relative_time_in_seconds),
        "relativeTimeMinimized": relative_display_js(&r.relative_time_minimized),
        "actualTime": r.actual_time,
        "actualTimeInSeconds": time_js(r.actual_time_in_seconds),
        "actualTimeMinimized": r.actual_time_minimized,
        "percentageOfBest": r.percentage_of_best,
        "place": place_js(r.place),
    })
}

fn series_js(s: &Series) -> JSValue {
    json!({
        "relativeTimes": s.relative_times,
        "relativeTimesInSeconds": times_js(&s.relative_times_in_seconds),
        "relativeTimesMinimized": s.relative_times_minimized.iter().map(relative_display_js).collect::<Vec<JSValue>>(),
        "places": s.places.iter().map(|p| place_js(*p)).collect::<Vec<JSValue>>(),
        "timesPercentages": s.times_percentages,
        "actualTimes": s.actual_times,
        "actualTimesInSeconds": times_js(&s.actual_times_in_seconds),
        "actualTimesMinimized": s.actual_times_minimized,
    })
}

fn within_percent_key(bucket: usize) -> String {
    format!("legWithin{}Percent", PERCENTAGE_BOUNDS[bucket + 1])
}

fn stats_js(s: &AthleteStats) -> JSValue {
    let mut m: JSMap<String, JSValue> = JSMap::new();
    m.insert("legFirstPlace".to_string(), json!(s.leg_first_place));
    m.insert("legSecondPlace".to_string(), json!(s.leg_second_place));
    m.insert("legThirdPlace".to_string(), json!(s.leg_third_place));
    m.insert("leg4_6Place".to_string(), json!(s.leg_4_6_place));
    m.insert("leg7_12Place".to_string(), json!(s.leg_7_12_place));
    m.insert(
        "legMistakes".to_string(),
        JSValue::Array(s.leg_mistakes.iter().map(|m| mistake_js(*m)).collect()),
    );
    m.insert("legNoMistake".to_string(), json!(s.leg_no_mistake));
    m.insert("legMinorMistake".to_string(), json!(s.leg_minor_mistake));
    m.insert("legMajorMistake".to_string(), json!(s.leg_major_mistake));
    for (bucket, count) in s.leg_within_percent.iter().enumerate() {
        m.insert(within_percent_key(bucket), json!(count));
    }
    m.insert("legAbove128Percent".to_string(), json!(s.leg_above_128_percent));
    m.insert(
        "averagePercentageLoss".to_string(),
        json!(s.average_percentage_loss),
    );
    m.insert(
        "medianPercentageLoss".to_string(),
        json!(s.median_percentage_loss),
    );
    JSValue::Object(m)
}

fn athlete_js(a: &Athlete) -> JSValue {
    let controls: Vec<JSValue> = a
        .controls
        .iter()
        .map(|c| {
            json!({
                "control": control_id_js(c.control),
                "leg": record_js(&c.leg),
                "split": record_js(&c.split),
            })
        })
        .collect();
    let chart: Vec<JSValue> = a
        .chart
        .iter()
        .map(|p| json!({"time": p.time, "label": p.label}))
        .collect();
    json!({
        "position": place_js(a.position),
        "name": a.name,
        "club": a.club,
        "totalTime": total_time_js(a.total_time),
        "totalTimeInSeconds": time_js(a.total_time.seconds()),
        "diffTotalTime": diff_total_time_js(a.diff_total_time),
        "controls": controls,
        "leg": series_js(&a.leg),
        "split": series_js(&a.split),
        "chart": chart,
        "additionals": stats_js(&a.stats),
    })
}

fn best_times_js(b: &BestTimes) -> JSValue {
    json!({
        "timesOriginal": b.times_original,
        "times": b.times,
        "timesInSeconds": times_js(&b.times_in_seconds),
    })
}

fn aggregated_js(agg: &Aggregated) -> JSValue {
    let mut mistake: JSMap<String, JSValue> = JSMap::new();
    mistake.insert("legNoMistakes".to_string(), json!(agg.mistake.leg_no_mistakes));
    mistake.insert(
        "legMinorMistakes".to_string(),
        json!(agg.mistake.leg_minor_mistakes),
    );
    mistake.insert(
        "legMajorMistakes".to_string(),
        json!(agg.mistake.leg_major_mistakes),
    );
    for (bucket, counts) in agg.mistake.leg_within_percent.iter().enumerate() {
        mistake.insert(within_percent_key(bucket), json!(counts));
    }
    mistake.insert(
        "legAbove128Percent".to_string(),
        json!(agg.mistake.leg_above_128_percent),
    );
    json!({
        "names": agg.names,
        "place": {
            "legFirstPlaces": agg.place.leg_first_places,
            "legSecondPlaces": agg.place.leg_second_places,
            "legThirdPlaces": agg.place.leg_third_places,
            "leg4_6Places": agg.place.leg_4_6_places,
            "leg7_12Places": agg.place.leg_7_12_places,
        },
        "mistake": mistake,
        "averagePercentageLoss": agg.average_percentage_loss,
        "medianPercentageLoss": agg.median_percentage_loss,
    })
}

pub fn dataset_to_json(dataset: &Dataset) -> JSValue {
    json!({
        "typeOfTimeDataToParse": dataset.time_data_type.to_string(),
        "numberOfParticipants": dataset.number_of_participants,
        "numberOfControls": dataset.number_of_controls,
        "controlLabels": dataset.control_labels,
        "best": {
            "leg": best_times_js(&dataset.best.leg),
            "split": best_times_js(&dataset.best.split),
            "optimalTotalTimeInSeconds": time_js(dataset.best.optimal_total_time_in_seconds),
            "optimalTotalTime": dataset.best.optimal_total_time,
        },
        "secondBest": {
            "leg": {"relativeTimesInSeconds": dataset.second_best.leg},
            "split": {"relativeTimesInSeconds": dataset.second_best.split},
        },
        "results": dataset.results.iter().map(athlete_js).collect::<Vec<JSValue>>(),
        "aggregated": aggregated_js(&dataset.aggregated),
        "mismatches": dataset.mismatches.iter().map(|m| m.to_string()).collect::<Vec<String>>(),
    })
}
