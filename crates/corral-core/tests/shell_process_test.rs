//! End-to-end tests driving real `sh -c` children through a pool.
#![cfg(unix)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use corral_core::{ChannelSink, ManagedProcess, OutputSink, OutputStream, Pool, ProcessId};
use corral_test_utils::{RecordingSink, ShellProcess, handle, init_tracing};

#[tokio::test]
async fn join_waits_for_real_children() {
    init_tracing();
    let quick = ShellProcess::new("quick", "exit 0");
    let slow = ShellProcess::new("slow", "sleep 0.3");

    let mut pool = Pool::bounded(2);
    pool.manage([handle(&quick), handle(&slow)]).unwrap();

    let started = Instant::now();
    pool.start(None).await.unwrap();
    assert!(pool.has_alive().await);

    tokio::time::timeout(Duration::from_secs(10), pool.join())
        .await
        .expect("children should exit");
    assert!(started.elapsed() >= Duration::from_millis(250));
    assert!(!pool.has_alive().await);
}

#[tokio::test]
async fn output_reaches_the_default_sink() {
    init_tracing();
    let sink = Arc::new(RecordingSink::new());
    let talker = ShellProcess::new("talker", "echo hello; echo oops >&2");

    let mut pool = Pool::unbounded().with_default_sink(sink.clone());
    pool.manage([handle(&talker)]).unwrap();
    pool.start(None).await.unwrap();
    pool.join().await;

    // Output is forwarded by background readers; give them a moment to drain.
    let id = ProcessId::from("talker");
    let deadline = Instant::now() + Duration::from_secs(5);
    while sink.chunks().len() < 2 && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(sink.text_for(&id, OutputStream::Stdout), "hello\n");
    assert_eq!(sink.text_for(&id, OutputStream::Stderr), "oops\n");
}

#[tokio::test]
async fn channel_sink_streams_output_while_polling() {
    let (sink, mut rx) = ChannelSink::new();
    let sink: Arc<dyn OutputSink> = Arc::new(sink);
    let counter = ShellProcess::new("counter", "for i in 1 2 3; do echo $i; done");

    let mut pool = Pool::unbounded();
    pool.manage([handle(&counter)]).unwrap();
    pool.start(Some(sink)).await.unwrap();

    let mut lines = Vec::new();
    while lines.len() < 3 {
        let (id, chunk) = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("output should arrive")
            .expect("channel open");
        assert_eq!(id.as_str(), "counter");
        lines.push(chunk.text());
    }
    assert_eq!(lines, vec!["1\n", "2\n", "3\n"]);
    pool.join().await;
}

#[tokio::test]
async fn abandon_terminates_long_running_children() {
    init_tracing();
    let sleeper = ShellProcess::new("sleeper", "sleep 30");
    let mut pool = Pool::unbounded();
    pool.manage([handle(&sleeper)]).unwrap();
    pool.start(None).await.unwrap();
    assert!(pool.has_alive().await);

    let started = Instant::now();
    pool.abandon().await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(pool.is_empty());

    // The caller's own handle sees the child gone.
    assert!(!sleeper.is_alive().await);
    // Killing again is a no-op.
    sleeper.kill().await.unwrap();
}

#[tokio::test]
async fn killed_child_never_writes_its_marker() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("done");
    let script = format!("sleep 5 && touch {}", marker.display());
    let delayed = ShellProcess::new("delayed", script);

    let mut pool = Pool::unbounded();
    pool.manage([handle(&delayed)]).unwrap();
    pool.start(None).await.unwrap();
    pool.abandon().await.unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!marker.exists());
}

#[tokio::test]
async fn abandon_reaches_commands_the_shell_started() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("background");
    let script = format!("(sleep 0.5; touch {}) & wait", marker.display());
    let parent = ShellProcess::new("parent", script);
    assert_eq!(parent.pid().await, None);

    let mut pool = Pool::unbounded();
    pool.manage([handle(&parent)]).unwrap();
    pool.start(None).await.unwrap();
    assert!(parent.pid().await.is_some());

    pool.abandon().await.unwrap();
    assert_eq!(parent.pid().await, None, "child is reaped by kill");

    // The backgrounded subshell would have written the marker by now.
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(!marker.exists());
}

#[tokio::test]
async fn join_within_then_abandon_on_deadline() {
    let sleeper = ShellProcess::new("sleeper", "sleep 30");
    let mut pool = Pool::unbounded();
    pool.manage([handle(&sleeper)]).unwrap();
    pool.start(None).await.unwrap();

    assert!(pool.join_within(Duration::from_millis(100)).await.is_err());
    pool.abandon().await.unwrap();
    assert!(!pool.has_alive().await);
}
