//! Whole-session behaviour: window views, retry and shutdown.

#![cfg(unix)]

mod common;

use common::{PROMPT, READY_SCRIPT, Session, occupy_port_from, settings, sh_profile};
use kirlian_core::{FailureCategory, FailureReason, SessionPhase};
use kirlian_runtime::{BACKEND_PIDFILE, PidFiles};
use kirlian_shell::{ShellEvent, SurfaceCall};

#[tokio::test]
async fn occupied_port_session_goes_live_on_next_port() {
    let (_occupied, taken) = occupy_port_from(8501);
    let pid_dir = tempfile::tempdir().unwrap();
    let files = PidFiles::new(pid_dir.path());

    let session = Session::spawn(&settings(taken), sh_profile(READY_SCRIPT), Some(files.clone()));

    let live = session
        .calls
        .wait_for(PROMPT, |c| matches!(c, SurfaceCall::Live(_)))
        .await
        .expect("window never went live");
    let SurfaceCall::Live(url) = live else {
        unreachable!()
    };
    let port: u16 = url
        .strip_prefix("http://localhost:")
        .and_then(|p| p.parse().ok())
        .unwrap();
    assert!(port > taken, "allocator returned occupied port {taken}");

    // Loading was shown first and nothing went live before readiness.
    let calls = session.calls.snapshot();
    assert_eq!(calls.first(), Some(&SurfaceCall::Loading));
    assert_eq!(session.calls.live_urls().len(), 1);

    let recorded = files.read(BACKEND_PIDFILE).unwrap();
    assert_eq!(recorded.port, port);

    session.send(ShellEvent::WindowClosed).await;
    let summary = session.finish().await;

    assert_eq!(summary.phase, SessionPhase::Terminated);
    assert_eq!(summary.final_port, Some(port));
    assert_eq!(summary.spawns, 1);
    assert_eq!(summary.stop_calls, 1);
    assert!(!summary.last_start_failed());
    assert!(files.list().unwrap().is_empty());
}

#[tokio::test]
async fn close_and_quit_together_stop_once() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("signals.log");
    let script = format!(
        "trap 'echo term >> \"{}\"; exit 0' TERM; \
         echo \"Listening on localhost:$KIRLIAN_SERVER_PORT\"; \
         while :; do sleep 0.05; done",
        marker.display()
    );
    let port = common::free_port_from(21_000);
    let session = Session::spawn(&settings(port), sh_profile(&script), None);

    session
        .calls
        .wait_for(PROMPT, |c| matches!(c, SurfaceCall::Live(_)))
        .await
        .expect("window never went live");

    session.send(ShellEvent::WindowClosed).await;
    // The loop may already be gone; a lost quit is fine.
    let _ = session.events.send(ShellEvent::QuitRequested).await;
    let summary = session.finish().await;

    assert_eq!(summary.stop_calls, 1);
    let log = std::fs::read_to_string(&marker).unwrap();
    assert_eq!(log.lines().filter(|l| *l == "term").count(), 1);
}

#[tokio::test]
async fn failed_start_shows_error_then_retry_goes_live() {
    let dir = tempfile::tempdir().unwrap();
    let flag = dir.path().join("second-attempt");
    let script = format!(
        "if [ -f \"{flag}\" ]; then {READY_SCRIPT}; else touch \"{flag}\"; \
         echo 'Traceback (most recent call last):'; exit 1; fi",
        flag = flag.display()
    );
    let port = common::free_port_from(21_100);
    let session = Session::spawn(&settings(port), sh_profile(&script), None);

    let error = session
        .calls
        .wait_for(PROMPT, |c| matches!(c, SurfaceCall::Error(_)))
        .await
        .expect("no error page");
    let SurfaceCall::Error(page) = error else {
        unreachable!()
    };
    assert!(page.cause.contains("exit code 1"));
    assert!(page.diagnostics.iter().any(|l| l.contains("Traceback")));
    assert!(session.calls.live_urls().is_empty());

    session.send(ShellEvent::Retry).await;
    session
        .calls
        .wait_for(PROMPT, |c| matches!(c, SurfaceCall::Live(_)))
        .await
        .expect("retry never went live");

    session.send(ShellEvent::QuitRequested).await;
    let summary = session.finish().await;
    assert_eq!(summary.spawns, 2);
    assert_eq!(summary.stop_calls, 2);
    assert!(!summary.last_start_failed());
}

#[tokio::test]
async fn retry_while_live_keeps_the_backend() {
    let port = common::free_port_from(21_400);
    let session = Session::spawn(&settings(port), sh_profile(READY_SCRIPT), None);
    let calls = session.calls.clone();

    calls
        .wait_for(PROMPT, |c| matches!(c, SurfaceCall::Live(_)))
        .await
        .expect("window never went live");

    // Events are handled in order, so the retry is seen before the quit.
    session.send(ShellEvent::Retry).await;
    session.send(ShellEvent::QuitRequested).await;
    let summary = session.finish().await;

    assert_eq!(summary.spawns, 1);
    assert_eq!(summary.stop_calls, 1);
    assert_eq!(calls.live_urls().len(), 1);
    assert!(calls.errors().is_empty());
}

#[tokio::test]
async fn missing_dependency_is_categorised_and_reported_on_exit() {
    let script = "echo \"ModuleNotFoundError: No module named 'streamlit'\" >&2; exit 1";
    let session = Session::spawn(&settings(common::free_port_from(21_200)), sh_profile(script), None);

    let error = session
        .calls
        .wait_for(PROMPT, |c| matches!(c, SurfaceCall::Error(_)))
        .await
        .expect("no error page");
    let SurfaceCall::Error(page) = error else {
        unreachable!()
    };
    assert_eq!(page.category, FailureCategory::MissingDependency);
    assert!(page.hints.iter().any(|h| h.contains("requirements")));

    session.send(ShellEvent::WindowClosed).await;
    let summary = session.finish().await;
    assert!(summary.last_start_failed());
    assert!(matches!(
        summary.last_failure,
        Some(FailureReason::FatalChildOutput { .. })
    ));
}

#[tokio::test]
async fn missing_entry_point_fails_before_spawning() {
    let dir = tempfile::tempdir().unwrap();
    let profile = kirlian_core::LaunchProfile::streamlit("/bin/sh", "main.py")
        .with_working_dir(dir.path());
    let session = Session::spawn(&settings(common::free_port_from(21_300)), profile, None);

    let error = session
        .calls
        .wait_for(PROMPT, |c| matches!(c, SurfaceCall::Error(_)))
        .await
        .expect("no error page");
    let SurfaceCall::Error(page) = error else {
        unreachable!()
    };
    assert_eq!(page.category, FailureCategory::MissingFiles);

    drop(session.events);
    let summary = tokio::time::timeout(PROMPT, session.task)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(summary.spawns, 0);
    assert_eq!(summary.phase, SessionPhase::Terminated);
}
