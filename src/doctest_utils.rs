// Internal utilities for documentation tests
// Sample PMU logs and eye-tracker recordings shared by doctests and integration tests

use std::fs;
use std::path::Path;

use crate::Result;

/// 与采样日志一致的页脚
fn footer(mdh: [i64; 2], mpcu: [i64; 2]) -> String {
    format!(
        "ECG  Freq Per: 0 0\n\
         PULS Freq Per: 74 811\n\
         RESP Freq Per: 0 0\n\
         EXT  Freq Per: 0 0\n\
         ECG  Min Max Avg StdDiff: 0 0 0 0\n\
         PULS Min Max Avg StdDiff: 355 1226 827 2\n\
         RESP Min Max Avg StdDiff: 0 0 0 0\n\
         EXT  Min Max Avg StdDiff: 0 0 0 0\n\
         NrTrig NrMP NrArr AcqWin: 0 0 0 0\n\
         LogStartMDHTime:  {}\n\
         LogStopMDHTime:   {}\n\
         LogStartMPCUTime: {}\n\
         LogStopMPCUTime:  {}\n\
         6003\n",
        mdh[0], mdh[1], mpcu[0], mpcu[1]
    )
}

/// VE11C pulse log: 400 Hz, 10 samples, one trigger before the third sample
pub fn ve11c_puls_log() -> String {
    format!(
        "1 8 20 2 5002 LOGVERSION 102 6002 5002 Logging PULS signal: reduction factor = 1, \
         PULS_SAMPLES_PER_SECOND = 400; PULS_SAMPLE_INTERVAL = 2500 6002 \
         1733 1725 5000 1721 1718 1712 1709 6000 1705 1701 1699 1697 5003\n{}",
        footer([39008572, 39008594], [39009937, 39009959])
    )
}

/// VBX respiration log: 50 Hz, 7 samples, one trigger before the fourth sample
pub fn vbx_resp_log() -> String {
    format!(
        "1 2 40 280 5002 Logging RESP signal: reduction factor = 1, \
         RESP_SAMPLES_PER_SECOND = 50; RESP_SAMPLE_INTERVAL = 20000 6002 \
         2048 2050 2061 5000 2070 2079 2081 2075 5003\n{}",
        footer([39008572, 39008692], [39009937, 39010057])
    )
}

/// VB15A pulse log: 20 ms interval (50 Hz), 5 samples
pub fn vb15a_puls_log() -> String {
    format!(
        "1 3 20 280 1733 1725 5000 1721 1718 6000 1712 5003\n{}",
        footer([47029710, 47029790], [0, 0])
    )
}

pub fn write_ve11c_puls_log<P: AsRef<Path>>(path: P) -> Result<()> {
    fs::write(path, ve11c_puls_log())?;
    Ok(())
}

pub fn write_vbx_resp_log<P: AsRef<Path>>(path: P) -> Result<()> {
    fs::write(path, vbx_resp_log())?;
    Ok(())
}

pub fn write_vb15a_puls_log<P: AsRef<Path>>(path: P) -> Result<()> {
    fs::write(path, vb15a_puls_log())?;
    Ok(())
}

/// Right-eye recording at 1000 Hz with a dropout and a trigger at t = 1002 ms
///
/// Eight samples (1000-1004, 1007-1009), one fixation, one saccade with a
/// blink, and two task messages.
pub fn eyelink_recording_json() -> String {
    let samples: Vec<String> = [1000, 1001, 1002, 1003, 1004, 1007, 1008, 1009]
        .iter()
        .map(|&t| {
            let gx = if t == 1003 { 100000000.0 } else { 400.0 + (t - 1000) as f64 };
            let input = if t == 1002 || t == 1008 { 255 } else { 0 };
            format!(
                r#"{{"time": {}, "gx_left": null, "gy_left": null, "pa_left": null, "gx_right": {}, "gy_right": 300.0, "pa_right": 900.0, "input": {}}}"#,
                t, gx, input
            )
        })
        .collect();

    format!(
        r#"{{
    "samples": [{}],
    "events": [
        {{"type": "fixation", "start": 1000, "end": 1002, "blink": false}},
        {{"type": "saccade", "start": 1002, "end": 1004, "blink": true}}
    ],
    "messages": [
        {{"time": 0, "text": "** DATE: Tue Sep  1 10:00:00 2020"}},
        {{"time": 0, "text": "RECCFG CR 1000 2 1 R"}},
        {{"time": 0, "text": "ELCL_PROC ELLIPSE (5)"}},
        {{"time": 0, "text": "THRESHOLDS R 102 255"}},
        {{"time": 0, "text": ">>>>>>> CALIBRATION (HV9,P-CR) FOR RIGHT: <<<<<<<<<"}},
        {{"time": 0, "text": "!CAL VALIDATION HV9 R RIGHT GOOD ERROR 0.35 avg. 0.78 max OFFSET 0.12 deg."}},
        {{"time": 999, "text": "!MODE RECORD CR 1000 2 1 R"}},
        {{"time": 1001, "text": "TRIALID 1"}},
        {{"time": 1007, "text": "stimulus on"}}
    ]
}}"#,
        samples.join(", ")
    )
}

pub fn write_eyelink_recording<P: AsRef<Path>>(path: P) -> Result<()> {
    fs::write(path, eyelink_recording_json())?;
    Ok(())
}
