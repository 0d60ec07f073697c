use std::ffi::OsStr;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tubecompare::compare::compare_sets;
use tubecompare::config::{CompareOptions, ReadOptions};
use tubecompare::dataset::{write_comparison_flag, write_summary_json, write_tube_csv, ResultSet};
use tubecompare::report::{BatchOutcome, ErrorDisplay, ErrorStep, Validity};
use tubecompare::TubeError;

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("tubecompare_{}_{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

const REFERENCE: &str = "\
# reference run
time; a ; \"b\"; c
0;0;1;0
1;1;1;2
2;0;1;x
3;1;1;5
";

const TEST: &str = "\
time;a;b
0;0;1
1;1.5;1
2;0;1
3;1;1
";

#[test]
fn reads_header_comments_and_ragged_columns() {
    let dir = scratch("read");
    let path = dir.join("ref.csv");
    fs::write(&path, REFERENCE).unwrap();

    let set = ResultSet::read(&path, &ReadOptions::default()).unwrap();
    assert_eq!(set.time_name(), "time");
    assert_eq!(set.rows(), 4);
    assert_eq!(set.names().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    let c = set.curve("c").unwrap();
    assert_eq!(c.x(), &[0.0, 1.0]);
    assert_eq!(c.y(), &[0.0, 2.0]);
    assert!(set.curve("missing").is_none());

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn decimal_comma_is_normalized() {
    let dir = scratch("comma");
    let path = dir.join("ref.csv");
    fs::write(&path, "t;v\n0;0,5\n1;1,25\n").unwrap();
    let options = ReadOptions { delimiter: ';', decimal_separator: ',' };
    let set = ResultSet::read(&path, &options).unwrap();
    assert_eq!(set.curve("v").unwrap().y(), &[0.5, 1.25]);
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn rejects_duplicate_names_and_short_files() {
    let dir = scratch("reject");
    let dup = dir.join("dup.csv");
    fs::write(&dup, "t;v;v\n0;1;2\n1;1;2\n").unwrap();
    assert!(matches!(ResultSet::read(&dup, &ReadOptions::default()), Err(TubeError::DataImport(_))));

    let short = dir.join("short.csv");
    fs::write(&short, "t;v\n0;1\n").unwrap();
    assert!(matches!(ResultSet::read(&short, &ReadOptions::default()), Err(TubeError::DataImport(_))));
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn batch_writes_tubes_summary_and_flag() {
    let dir = scratch("batch");
    fs::write(dir.join("ref.csv"), REFERENCE).unwrap();
    fs::write(dir.join("test.csv"), TEST).unwrap();
    let read = ReadOptions::default();
    let reference = ResultSet::read(dir.join("ref.csv"), &read).unwrap();
    let test = ResultSet::read(dir.join("test.csv"), &read).unwrap();

    let batch = compare_sets(&reference, Some(&test), &CompareOptions::default(), None).unwrap();
    // c is not in the test file
    assert_eq!(batch.reports.len(), 2);
    assert_eq!(batch.reports[0].result_name, "a");
    assert_eq!(batch.reports[0].validity, Validity::Invalid);
    assert_eq!(batch.reports[1].validity, Validity::Valid);
    assert_eq!(batch.success_rate(), Some(0.5));
    assert_eq!(batch.outcome(), BatchOutcome::Failed);

    let tube = write_tube_csv(&dir, &batch.reports[0], ErrorDisplay::Flag).unwrap();
    let s = fs::read_to_string(tube).unwrap();
    assert_eq!(s.lines().next(), Some("series,x,y"));
    assert!(s.lines().any(|l| l.starts_with("Lower,")));
    assert!(s.lines().any(|l| l == "Errors,1.0,1.0"));

    let summary = fs::read_to_string(write_summary_json(&dir, &batch).unwrap()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&summary).unwrap();
    assert_eq!(json["invalid"], 1);
    assert_eq!(json["outcome"], "failed");

    let flag = write_comparison_flag(&dir, &batch, "test.csv", 0.002).unwrap();
    assert!(flag.ends_with("compare_failed.log"));
    let log = fs::read_to_string(flag).unwrap();
    assert!(log.contains(". Biggest error: a=>"));

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn batch_without_test_data_keeps_tubes() {
    let dir = scratch("tubes_only");
    fs::write(dir.join("ref.csv"), REFERENCE).unwrap();
    let reference = ResultSet::read(dir.join("ref.csv"), &ReadOptions::default()).unwrap();
    let batch = compare_sets(&reference, None, &CompareOptions::default(), Some("b")).unwrap();
    assert_eq!(batch.reports.len(), 1);
    assert_eq!(batch.reports[0].error_step, ErrorStep::Validation);
    assert!(batch.reports[0].upper.is_valid());
    assert_eq!(batch.outcome(), BatchOutcome::NoTestData);
    assert!(compare_sets(&reference, None, &CompareOptions::default(), Some("zz")).is_err());
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn batch_without_shared_variables_compares_nothing() {
    let dir = scratch("disjoint");
    fs::write(dir.join("ref.csv"), REFERENCE).unwrap();
    fs::write(dir.join("other.csv"), "time;zzz\n0;1\n1;2\n").unwrap();
    let read = ReadOptions::default();
    let reference = ResultSet::read(dir.join("ref.csv"), &read).unwrap();
    let other = ResultSet::read(dir.join("other.csv"), &read).unwrap();

    let batch = compare_sets(&reference, Some(&other), &CompareOptions::default(), None).unwrap();
    assert!(batch.reports.is_empty());
    assert_eq!(batch.success_rate(), None);
    assert_eq!(batch.outcome(), BatchOutcome::NoTestData);
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn binary_exit_codes_follow_outcome() {
    let dir = scratch("bin");
    let reference = dir.join("ref.csv");
    let test = dir.join("test.csv");
    fs::write(&reference, REFERENCE).unwrap();
    fs::write(&test, TEST).unwrap();
    let other = dir.join("other.csv");
    fs::write(&other, "time;zzz\n0;1\n1;2\n").unwrap();
    let out = dir.join("out");
    let run = |args: &[&OsStr]| {
        Command::new(env!("CARGO_BIN_EXE_tubecompare"))
            .args(args)
            .arg("--out-dir")
            .arg(&out)
            .args(["--no-draw", "-q"])
            .status()
            .expect("run tubecompare")
            .code()
    };

    assert_eq!(run(&[reference.as_os_str(), reference.as_os_str()]), Some(0));
    assert_eq!(run(&[reference.as_os_str(), test.as_os_str()]), Some(1));
    assert_eq!(run(&[reference.as_os_str()]), Some(2));
    assert_eq!(run(&[reference.as_os_str(), other.as_os_str()]), Some(2));
    // bad options and unreadable files are told apart from Invalid variables
    let tolerance = [reference.as_os_str(), test.as_os_str(), OsStr::new("--tolerance"), OsStr::new("1.5")];
    assert_eq!(run(&tolerance), Some(3));
    let missing = dir.join("none.json");
    assert_eq!(run(&[reference.as_os_str(), OsStr::new("--config"), missing.as_os_str()]), Some(3));
    assert!(out.join("summary.json").is_file());
    assert!(out.join("a.csv").is_file());

    let _ = fs::remove_dir_all(dir);
}
