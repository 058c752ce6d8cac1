use super::*;
use log::{Level, Metadata, Record};
use serial_test::serial;

#[test]
#[serial]
fn get_level_from_env_parses_cases() {
    let cases: &[(Option<&str>, Level)] = &[
        (None, Level::Info),
        (Some("debug"), Level::Debug),
        (Some("DEBUG"), Level::Debug),
        (Some("info"), Level::Info),
        (Some("warn"), Level::Warn),
        (Some("WARN"), Level::Warn),
        (Some("error"), Level::Error),
        (Some("trace"), Level::Trace),
        (Some("garbage"), Level::Info),
        (Some("off"), Level::Info),
    ];

    for (value, expected) in cases {
        match value {
            Some(v) => unsafe { std::env::set_var(PROGRAM_LOG_LEVEL, v) },
            None => unsafe { std::env::remove_var(PROGRAM_LOG_LEVEL) },
        }

        let lvl = get_level_from_env();
        assert_eq!(
            lvl, *expected,
            "env {:?} should yield level {:?}, got {:?}",
            value, expected, lvl
        );
    }

    unsafe { std::env::remove_var(PROGRAM_LOG_LEVEL) };
}

#[test]
fn enabled_respects_level_threshold() {
    let levels = [
        Level::Error,
        Level::Warn,
        Level::Info,
        Level::Debug,
        Level::Trace,
    ];

    for logger_level in levels {
        let logger = Logger {
            level: logger_level,
            target: LogTarget::Stderr,
        };

        for record_level in levels {
            let meta = Metadata::builder()
                .level(record_level)
                .target("test_target")
                .build();

            let expected = record_level <= logger_level;
            assert_eq!(
                logger.enabled(&meta),
                expected,
                "logger level {:?}, record level {:?}",
                logger_level,
                record_level
            );
        }
    }
}

#[test]
fn file_logger_appends_one_line_per_record() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("nested").join("worker.log");

    let file = open_log_file(&path).expect("open log file");
    let logger = Logger {
        level: Level::Info,
        target: LogTarget::File(Mutex::new(file)),
    };

    let cases = [
        (Level::Info, "starting receiver"),
        (Level::Debug, "filtered out"),
        (Level::Error, "receive failed"),
    ];

    for (lvl, msg) in &cases {
        let args = format_args!("{msg}");
        let record = Record::builder()
            .level(*lvl)
            .target("session")
            .args(args)
            .build();
        logger.log(&record);
    }
    logger.flush();

    let contents = fs::read_to_string(&path).expect("read log file");
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2, "debug record must be filtered: {contents}");
    assert!(lines[0].ends_with("INFO [session] starting receiver"));
    assert!(lines[1].ends_with("ERROR [session] receive failed"));
}

#[test]
fn file_logger_is_shared_across_threads() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("worker.log");

    let logger = Logger {
        level: Level::Info,
        target: LogTarget::File(Mutex::new(open_log_file(&path).expect("open"))),
    };

    std::thread::scope(|s| {
        for t in 0..4 {
            let logger = &logger;
            s.spawn(move || {
                for i in 0..25 {
                    let args = format_args!("thread {t} line {i}");
                    let record = Record::builder()
                        .level(Level::Info)
                        .target("t")
                        .args(args)
                        .build();
                    logger.log(&record);
                }
            });
        }
    });
    logger.flush();

    let contents = fs::read_to_string(&path).expect("read log file");
    assert_eq!(contents.lines().count(), 100);
    assert!(contents.lines().all(|l| l.contains("INFO [t] thread ")));
}
