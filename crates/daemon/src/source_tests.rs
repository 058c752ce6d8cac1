use super::*;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Instant,
};

use logmirror_core::{ReceiveSession, SessionReport};
use logmirror_protocol::codec::read_message;
use logmirror_runtime::{WorkerConfig, bootstrap::ensure_message_log};
use serial_test::serial;

fn publish(stream: &mut UnixStream, payloads: &[&str]) {
    for (id, p) in payloads.iter().enumerate() {
        let req = PublishRequest {
            id: id as u64,
            data: p.as_bytes().to_vec(),
        };
        write_message(stream, &req).expect("send request");
    }
}

fn read_replies(stream: &mut UnixStream, n: usize) -> HashMap<u64, Delivery> {
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("set timeout");
    (0..n)
        .map(|_| {
            let reply: PublishReply = read_message(stream).expect("read reply");
            (reply.id, reply.delivery)
        })
        .collect()
}

fn open_fds() -> usize {
    fs::read_dir("/proc/self/fd").expect("list fds").count()
}

fn wait_for_socket(path: &Path) -> UnixStream {
    let start = Instant::now();
    loop {
        match UnixStream::connect(path) {
            Ok(s) => return s,
            Err(_) if start.elapsed() < Duration::from_secs(5) => {
                thread::sleep(Duration::from_millis(10));
            }
            Err(e) => panic!("connect to {}: {e}", path.display()),
        }
    }
}

#[test]
#[serial]
fn bind_replaces_stale_socket_and_removes_it_on_drop() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("run").join("publish.sock");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, b"stale").unwrap();

    let source = SocketSource::bind("events", &path).expect("bind");
    assert_eq!(source.subscription(), "events");
    assert_eq!(source.path(), path.as_path());
    assert!(path.exists());

    drop(source);
    assert!(!path.exists());
}

#[test]
#[serial]
fn bind_failure_is_reported_as_unavailable() {
    let dir = tempfile::tempdir().expect("create temp dir");
    // A regular file where a directory is needed.
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, b"").unwrap();

    let err = SocketSource::bind("events", &blocker.join("publish.sock"))
        .err()
        .expect("bind must fail");
    assert!(matches!(err, SourceError::Unavailable(_)), "{err:?}");
}

#[test]
#[serial]
fn messages_are_delivered_and_settlements_replied() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("publish.sock");
    let source = SocketSource::bind("events", &path).expect("bind");

    let seen = Mutex::new(Vec::new());
    let ctx = ReceiveContext::with_timeout(Duration::from_secs(10));

    thread::scope(|s| {
        let ctx_ref = &ctx;
        let seen_ref = &seen;
        let source_ref = &source;
        let receiver = s.spawn(move || {
            source_ref.receive(ctx_ref, &|msg: Message| {
                let text = String::from_utf8(msg.data().to_vec()).unwrap();
                seen_ref.lock().unwrap().push(text.clone());
                if text == "reject-me" { msg.nack() } else { msg.ack() }
            })
        });

        let mut client = wait_for_socket(&path);
        publish(&mut client, &["a", "reject-me", "c"]);
        let replies = read_replies(&mut client, 3);

        assert_eq!(replies[&0], Delivery::Ack);
        assert_eq!(replies[&1], Delivery::Nack);
        assert_eq!(replies[&2], Delivery::Ack);

        ctx.cancel();
        receiver
            .join()
            .expect("receiver thread")
            .expect("receive should end cleanly");
    });

    assert_eq!(seen.into_inner().unwrap(), vec!["a", "reject-me", "c"]);
}

#[test]
#[serial]
fn session_over_socket_writes_log_and_rejects_leftovers() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let json = format!(
        r#"{{"subscription": "events", "worker": {{"message_log_path": {:?}, "batch_size": 2}}}}"#,
        dir.path().join("messages")
    );
    let config = WorkerConfig::from_json(&json).expect("config");
    ensure_message_log(&config).expect("bootstrap");

    let path = dir.path().join("publish.sock");
    let source = Arc::new(SocketSource::bind("events", &path).expect("bind"));
    let ctx = ReceiveContext::with_timeout(Duration::from_secs(10));

    let mut client = wait_for_socket(&path);

    let report: SessionReport = thread::scope(|s| {
        let session = ReceiveSession::open(&config).expect("open session");
        let source = Arc::clone(&source);
        let ctx_ref = &ctx;
        let handle = s.spawn(move || session.run(source.as_ref(), ctx_ref));

        // Three messages with threshold 2 flush together; the fourth waits.
        publish(&mut client, &["one", "two", "three", "four"]);
        let acked = read_replies(&mut client, 3);
        assert!(acked.values().all(|d| *d == Delivery::Ack), "{acked:?}");
        assert!(!acked.contains_key(&3));

        ctx.cancel();
        handle.join().expect("session thread").expect("session")
    });

    assert_eq!(report.acked, 3);
    assert_eq!(report.abandoned, 1);

    let leftover = read_replies(&mut client, 1);
    assert_eq!(leftover.get(&3), Some(&Delivery::Nack));

    assert_eq!(
        fs::read_to_string(config.sink_path()).unwrap(),
        "one\ntwo\nthree\n"
    );
}

#[test]
#[serial]
fn closed_publishers_release_their_descriptors() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("publish.sock");
    let source = SocketSource::bind("events", &path).expect("bind");
    let ctx = ReceiveContext::with_timeout(Duration::from_secs(30));

    let publish_once = |payload: &str| {
        let mut client = wait_for_socket(&path);
        publish(&mut client, &[payload]);
        let replies = read_replies(&mut client, 1);
        assert_eq!(replies.get(&0), Some(&Delivery::Ack));
    };

    thread::scope(|s| {
        let ctx_ref = &ctx;
        let source_ref = &source;
        let receiver = s.spawn(move || source_ref.receive(ctx_ref, &|msg: Message| msg.ack()));

        publish_once("warm-up");
        thread::sleep(Duration::from_millis(200));
        let before = open_fds();

        for i in 0..100 {
            publish_once(&format!("m{i}"));
        }

        // Readers and reply writers wind down shortly after each hang-up.
        let start = Instant::now();
        let mut after = open_fds();
        while after > before + 10 && start.elapsed() < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(50));
            after = open_fds();
        }
        assert!(
            after <= before + 10,
            "descriptors grew from {before} to {after}"
        );

        ctx.cancel();
        receiver
            .join()
            .expect("receiver thread")
            .expect("receive should end cleanly");
    });
}
