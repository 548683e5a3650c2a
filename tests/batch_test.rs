//! Integration tests for batch runs over group directories

use diction_series::batch::{discover_sessions, BatchRunner};
use diction_series::core::{AnalysisOptions, OverlapPolicy, ParticipantFilter, SessionAnalyzer};
use diction_series::io::{
    dictionary_from_reader, read_session_bounds, DictionaryColumns, OutputFormat,
};
use diction_series::lexicon::Lexicon;
use diction_series::report::create_shared_log;
use std::path::Path;

const DICTIONARY: &str = "words,diction_code\nhello,POS\nbad,NEG_X\nart*,CRE\n";

fn analyzer(policy: OverlapPolicy, participants: &str) -> SessionAnalyzer {
    let entries = dictionary_from_reader(
        DICTIONARY.as_bytes(),
        &DictionaryColumns::default(),
        Path::new("dict.csv"),
    )
    .expect("dictionary parses");
    let lexicon = Lexicon::build(entries).expect("dictionary is valid");
    SessionAnalyzer::new(
        lexicon,
        AnalysisOptions {
            policy,
            participants: ParticipantFilter::from_csv(participants),
            ..Default::default()
        },
    )
    .expect("options are valid")
}

fn write_transcript(dir: &Path, prefix: &str, content: &str) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(
        dir.join(format!("{prefix}_word_level_transcriptions.csv")),
        content,
    )
    .unwrap();
}

#[test]
fn test_batch_writes_tables_and_isolates_failures() {
    let root = tempfile::tempdir().unwrap();
    let transcripts = root.path().join("transcripts");
    let output = root.path().join("results");

    write_transcript(
        &transcripts.join("group 1"),
        "s1",
        "start,end,text,speaker\n0,5,\"Hello there, great artwork!\",A\n",
    );
    // No text column: this session fails on its own
    write_transcript(&transcripts.join("group 1"), "s2", "start,end,speaker\n0,5,A\n");

    let log = create_shared_log();
    let jobs = discover_sessions(&transcripts, &output, 2, &log).unwrap();
    assert_eq!(jobs.len(), 2);

    let runner = BatchRunner::new(
        analyzer(OverlapPolicy::Unbounded, ""),
        Default::default(),
        OutputFormat::Csv,
        2,
        log.clone(),
    );
    let summary = runner.run(jobs);

    assert_eq!(summary.completed.len(), 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.cancelled, 0);

    let stats = log.stats();
    assert_eq!(stats.sessions_processed, 1);
    assert_eq!(stats.sessions_failed, 1);
    assert_eq!(stats.groups_skipped, 1);
    assert_eq!(log.failures()[0].session, "group_1/s2");

    let group_dir = output.join("group_1");
    let group = std::fs::read_to_string(group_dir.join("s1_group_text_analysis.csv")).unwrap();
    assert_eq!(
        group,
        "speaker,window_start,window_end,CRE,POS\nA,0.0,30.0,1,1\n"
    );

    let speaker = std::fs::read_to_string(
        group_dir
            .join("s1_speaker_time_series")
            .join("A_time_series.csv"),
    )
    .unwrap();
    assert_eq!(speaker, group);

    let summary_json: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(group_dir.join("s1_category_summary.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(summary_json["window_count"], 1);
    assert_eq!(summary_json["group"][0]["category"], "CRE");
    assert_eq!(summary_json["group"][0]["total"], 1);
}

#[test]
fn test_bounded_batch_missing_cutoffs_fail_only_that_session() {
    let root = tempfile::tempdir().unwrap();
    let transcripts = root.path().join("transcripts");
    let output = root.path().join("results");

    let transcript = "start,end,text,speaker\n101,105,hello,A\n102,104,hello,device\n";
    write_transcript(&transcripts.join("group 1"), "s1", transcript);
    write_transcript(&transcripts.join("group 1"), "s2", transcript);

    let cutoffs = root.path().join("cutoffs.csv");
    std::fs::write(&cutoffs, "session,start,end\ngroup_1/s1,100,130\n").unwrap();
    let bounds = read_session_bounds(&cutoffs).unwrap();

    let log = create_shared_log();
    let jobs = discover_sessions(&transcripts, &output, 1, &log).unwrap();
    let runner = BatchRunner::new(
        analyzer(OverlapPolicy::Bounded, "A"),
        bounds,
        OutputFormat::Jsonl,
        1,
        log.clone(),
    );
    let summary = runner.run(jobs);

    assert_eq!(summary.completed.len(), 1);
    assert_eq!(summary.failed, 1);
    assert!(log.failures()[0].error.contains("session bounds are required"));

    let group = std::fs::read_to_string(
        output
            .join("group_1")
            .join("s1_group_text_analysis.jsonl"),
    )
    .unwrap();
    let rows: Vec<serde_json::Value> = group
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();

    // Windows [100,130) and [115,145); both utterances end in the first only.
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["speaker"], "A");
    assert_eq!(rows[0]["POS"], 1);
    assert_eq!(rows[1]["speaker"], "no_speaker");
    assert_eq!(rows[1]["POS"], 0);
}

#[test]
fn test_stop_flag_cancels_dispatch() {
    let root = tempfile::tempdir().unwrap();
    let transcripts = root.path().join("transcripts");
    write_transcript(
        &transcripts.join("group 1"),
        "s1",
        "start,end,text,speaker\n0,5,hello,A\n",
    );

    let log = create_shared_log();
    let jobs = discover_sessions(&transcripts, &root.path().join("out"), 1, &log).unwrap();
    let runner = BatchRunner::new(
        analyzer(OverlapPolicy::Unbounded, ""),
        Default::default(),
        OutputFormat::Csv,
        1,
        log.clone(),
    );
    runner
        .stop_flag()
        .store(true, std::sync::atomic::Ordering::SeqCst);

    let summary = runner.run(jobs);
    assert_eq!(summary.cancelled, 1);
    assert!(summary.completed.is_empty());
    assert_eq!(log.stats().sessions_processed, 0);
}

#[test]
fn test_runaway_session_fails_without_stopping_batch() {
    let root = tempfile::tempdir().unwrap();
    let transcripts = root.path().join("transcripts");
    write_transcript(
        &transcripts.join("group 1"),
        "s1",
        "start,end,text,speaker\n0,5,hello,A\n",
    );
    write_transcript(
        &transcripts.join("group 1"),
        "s2",
        "start,end,text,speaker\n0,1e12,hello,A\n",
    );

    let log = create_shared_log();
    let jobs = discover_sessions(&transcripts, &root.path().join("out"), 1, &log).unwrap();
    let runner = BatchRunner::new(
        analyzer(OverlapPolicy::Unbounded, ""),
        Default::default(),
        OutputFormat::Csv,
        2,
        log.clone(),
    );
    let summary = runner.run(jobs);

    assert_eq!(summary.completed.len(), 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(log.failures()[0].session, "group_1/s2");
    assert!(log.failures()[0].error.contains("windows"));
}
