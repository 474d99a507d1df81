use bidsphysio::doctest_utils::{eyelink_recording_json, write_eyelink_recording};
use bidsphysio::eyelink::{EyelinkMessage, EyelinkSample};
use bidsphysio::{
    convert_eyelink, edf2bids, edfevents2bids, BidsPhysioReader, ConversionOptions, Diagnostics,
    EyelinkRecording, PhysioError, Warning,
};
use std::fs;

// 加载示例记录的辅助函数
fn sample_recording() -> EyelinkRecording {
    serde_json::from_str(&eyelink_recording_json()).unwrap()
}

fn both_eyes_recording(input: f64) -> EyelinkRecording {
    let samples = (0..6)
        .map(|i| EyelinkSample {
            time: 2000.0 + 2.0 * i as f64,
            gx_left: 100.0 + i as f64,
            gy_left: 200.0,
            pa_left: 800.0,
            gx_right: 110.0 + i as f64,
            gy_right: 210.0,
            pa_right: 810.0,
            input,
        })
        .collect();
    EyelinkRecording {
        samples,
        events: Vec::new(),
        messages: vec![
            EyelinkMessage { time: 0.0, text: "RECCFG CR 500 2 1 LR".into() },
            EyelinkMessage { time: 0.0, text: "ELCL_PROC CENTROID (3)".into() },
            EyelinkMessage { time: 0.0, text: "THRESHOLDS L 90 220 R 95 225".into() },
            EyelinkMessage { time: 1999.0, text: "!MODE RECORD CR 500 2 1 LR".into() },
            EyelinkMessage { time: 2004.0, text: "block start".into() },
        ],
    }
}

#[test]
fn test_edf2bids_columns_and_attributes() {
    let recording = sample_recording();
    let mut diagnostics = Diagnostics::new();
    let physio = edf2bids(&recording, Some("eyetracker.json"), false, &mut diagnostics).unwrap();
    assert!(diagnostics.is_empty());

    assert_eq!(
        physio.labels(),
        vec![
            "eye_timestamp",
            "eye1_x_coordinate",
            "eye1_y_coordinate",
            "eye1_pupil_size",
            "trigger",
            "fixation",
            "saccade",
            "blink",
        ]
    );

    let keys: Vec<&String> = physio.attributes().keys().collect();
    assert_eq!(
        keys,
        [
            "RecordedEye",
            "EyeTrackingMethod",
            "PupilFitMethod",
            "CRThreshold",
            "PThreshold",
            "MetadataJson",
            "CalibrationCount",
            "CalibrationType",
            "CalibrationPosition",
            "AverageCalibrationError",
            "MaximalCalibrationError",
            "RecordingStartTimestamp",
            "RecordingStopTimestamp",
            "EDFHeader",
        ]
    );
    assert_eq!(physio.attribute("RecordedEye").unwrap(), "Right");
    assert_eq!(physio.attribute("EyeTrackingMethod").unwrap(), "P-CR");
    assert_eq!(physio.attribute("PupilFitMethod").unwrap(), "ellipse");
    assert_eq!(physio.attribute("CRThreshold").unwrap(), "255");
    assert_eq!(physio.attribute("PThreshold").unwrap(), "102");
    assert_eq!(physio.attribute("MetadataJson").unwrap(), "eyetracker.json");
    assert_eq!(physio.attribute("CalibrationCount").unwrap(), 1);
    assert_eq!(physio.attribute("CalibrationType").unwrap(), "HV9");
    assert_eq!(physio.attribute("AverageCalibrationError").unwrap(), "0.35");
    assert_eq!(physio.attribute("MaximalCalibrationError").unwrap(), "0.78");
    assert_eq!(physio.attribute("RecordingStartTimestamp").unwrap(), 1000.0);
    assert_eq!(physio.attribute("RecordingStopTimestamp").unwrap(), 1009.0);
    assert_eq!(physio.attribute("EDFHeader").unwrap().as_array().unwrap().len(), 6);
}

#[test]
fn test_edf2bids_alignment_and_gap_filling() {
    let recording = sample_recording();
    let physio = edf2bids(&recording, None, false, &mut Diagnostics::new()).unwrap();

    // 1005 和 1006 ms 的缺失样本以 NaN 填充
    for signal in &physio.signals {
        assert_eq!(signal.samples_count(), 10);
        assert_eq!(signal.neural_start_time, Some(0.002));
        assert_eq!(signal.t_start(), -0.002);
    }

    let fixation = &physio.signal("fixation").unwrap().signal;
    assert_eq!(fixation[..5], [1.0, 1.0, 0.0, 0.0, 0.0]);
    assert!(fixation[5].is_nan() && fixation[6].is_nan());

    let saccade = &physio.signal("saccade").unwrap().signal;
    assert_eq!(saccade[..5], [0.0, 0.0, 1.0, 1.0, 0.0]);

    let blink = &physio.signal("blink").unwrap().signal;
    assert_eq!(blink[..5], [0.0, 0.0, 0.0, 1.0, 0.0]);

    let trigger = &physio.signal("trigger").unwrap().signal;
    assert_eq!(trigger[2], 1.0);
    assert_eq!(trigger[8], 1.0);
    assert_eq!(physio.get_trigger_timing().unwrap(), vec![0.002, 0.008]);
}

#[test]
fn test_skip_eye_events() {
    let recording = sample_recording();
    let physio = edf2bids(&recording, None, true, &mut Diagnostics::new()).unwrap();
    assert_eq!(
        physio.labels(),
        vec!["eye_timestamp", "eye1_x_coordinate", "eye1_y_coordinate", "eye1_pupil_size", "trigger"]
    );
}

#[test]
fn test_both_eyes_without_trigger() {
    let recording = both_eyes_recording(0.0);
    let mut diagnostics = Diagnostics::new();
    let physio = edf2bids(&recording, None, true, &mut diagnostics).unwrap();

    // 常数 0 的 input 通道被丢弃
    assert_eq!(
        physio.labels(),
        vec![
            "eye_timestamp",
            "eye1_x_coordinate",
            "eye1_y_coordinate",
            "eye2_x_coordinate",
            "eye2_y_coordinate",
            "eye1_pupil_size",
            "eye2_pupil_size",
        ]
    );
    assert_eq!(physio.signal("eye1_x_coordinate").unwrap().signal[0], 100.0);
    assert_eq!(physio.signal("eye2_x_coordinate").unwrap().signal[0], 110.0);
    assert_eq!(physio.attribute("RecordedEye").unwrap(), "Both");
    assert_eq!(physio.attribute("PupilFitMethod").unwrap(), "center-of-mass");
    assert_eq!(physio.attribute("CalibrationCount").unwrap(), 0);
    assert!(physio.attribute("CalibrationType").is_none());
    assert!(diagnostics.contains(&Warning::NoTriggerChannel));

    let mut diagnostics = Diagnostics::new();
    let events = edfevents2bids(&recording, &mut diagnostics);
    assert!(diagnostics.contains(&Warning::ConstantTriggerChannel));
    assert_eq!(events.events()[0].onset, 0.004);
}

#[test]
fn test_missing_reccfg_is_format_error() {
    let mut recording = both_eyes_recording(0.0);
    recording.messages.remove(0);
    let err = edf2bids(&recording, None, false, &mut Diagnostics::new()).unwrap_err();
    assert!(matches!(err, PhysioError::Format(_)));
}

#[test]
fn test_task_events() {
    let recording = sample_recording();
    let mut diagnostics = Diagnostics::new();
    let events = edfevents2bids(&recording, &mut diagnostics);
    assert!(diagnostics.is_empty());

    let events = events.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].trial_type, "TRIALID 1");
    assert_eq!(events[0].sample, 1001);
    assert!((events[0].onset + 0.001).abs() < 1e-12);
    assert_eq!(events[1].trial_type, "stimulus on");
    assert!((events[1].onset - 0.005).abs() < 1e-12);
    assert!(events.iter().all(|e| e.duration == 0.0));
}

#[test]
fn test_convert_eyelink() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("recording.json");
    write_eyelink_recording(&input).unwrap();
    let prefix = dir.path().join("sub-01/func/sub-01_task-rest");

    let options = ConversionOptions::default()
        .with_metadata_path("eyetracker.json")
        .with_compress_events(true);
    let output = convert_eyelink(&input, &prefix, &options).unwrap();
    assert!(output.diagnostics.is_empty());

    let names: Vec<String> = output
        .written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec![
            "sub-01_task-rest_physio.json",
            "sub-01_task-rest_physio.tsv.gz",
            "sub-01_task-rest_eventlist_raw.tsv.gz",
            "sub-01_task-rest_eventlist_raw.json",
        ]
    );

    let reader = BidsPhysioReader::open(&output.written[0]).unwrap();
    assert_eq!(reader.sidecar().sampling_frequency, 1000.0);
    assert_eq!(reader.sidecar().start_time, -0.002);
    assert_eq!(reader.sidecar().columns.last().unwrap(), "trigger");
    assert_eq!(reader.sidecar().extra["RecordedEye"], "Right");
    assert_eq!(reader.rows().len(), 10);

    let trigger = reader.column("trigger").unwrap();
    let fired: Vec<usize> = trigger
        .iter()
        .enumerate()
        .filter(|(_, &v)| v == 1.0)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(fired, vec![2, 8]);
}

#[test]
fn test_convert_eyelink_missing_input() {
    let dir = tempfile::tempdir().unwrap();
    let prefix = dir.path().join("out/sub-01");
    let err = convert_eyelink(dir.path().join("nope.json"), &prefix, &ConversionOptions::default()).unwrap_err();
    assert!(matches!(err, PhysioError::FileNotFound(_)));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn test_plain_events_table() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("recording.json");
    write_eyelink_recording(&input).unwrap();
    let prefix = dir.path().join("sub-02");

    let output = convert_eyelink(&input, &prefix, &ConversionOptions::default()).unwrap();
    let table = output.written.iter().find(|p| p.extension().unwrap() == "tsv").unwrap();
    let text = fs::read_to_string(table).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "onset\tduration\ttrial_type\tsample");
    assert_eq!(lines[1], "-0.001\t0\tTRIALID 1\t1001");
    assert!(lines[2].ends_with("\t0\tstimulus on\t1007"));
}

#[test]
fn test_failed_events_write_leaves_no_physio_files() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("recording.json");
    write_eyelink_recording(&input).unwrap();
    let out = dir.path().join("out");
    // 事件表路径被目录占用，写入必然失败
    fs::create_dir_all(out.join("sub-03_eventlist_raw.tsv")).unwrap();

    let err = convert_eyelink(&input, out.join("sub-03"), &ConversionOptions::default()).unwrap_err();
    assert!(matches!(err, PhysioError::Io(_)));
    assert!(!out.join("sub-03_physio.json").exists());
    assert!(!out.join("sub-03_physio.tsv.gz").exists());
}

#[test]
fn test_column_units_exported() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("recording.json");
    write_eyelink_recording(&input).unwrap();

    let output = convert_eyelink(&input, dir.path().join("sub-04"), &ConversionOptions::default()).unwrap();
    let physio = BidsPhysioReader::open(&output.written[0]).unwrap().into_physio_data();
    assert_eq!(physio.signal("eye_timestamp").unwrap().units, "ms");
    assert_eq!(physio.signal("eye1_x_coordinate").unwrap().units, "pixel");
    assert_eq!(physio.signal("eye1_pupil_size").unwrap().units, "arbitrary");
    assert_eq!(physio.signal("trigger").unwrap().units, "");
    assert!(physio.attribute("eye_timestamp").is_none());
}
