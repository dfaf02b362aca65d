/*!
 * Process Exit Tests
 *
 * Exiting the last runnable thread ends the whole process, so each scenario
 * re-runs this test binary as a child and checks what the child printed.
 */

use pretty_assertions::assert_eq;
use std::process::{Command, Output};
use uthreads::uprintln;

/// Set in the child to select the scenario instead of spawning again
const SCENARIO_ENV: &str = "UTHREADS_EXIT_SCENARIO";

fn run_scenario(test: &str) -> Output {
    let exe = std::env::current_exe().expect("test binary path");
    Command::new(exe)
        .args([test, "--exact", "--nocapture", "--test-threads=1"])
        .env(SCENARIO_ENV, test)
        .output()
        .expect("spawn child test process")
}

fn in_child(test: &str) -> bool {
    std::env::var(SCENARIO_ENV).map_or(false, |name| name == test)
}

/// Lines the scenario printed, without the harness chatter
///
/// The harness prints the test name without a newline before running it, so
/// the first scenario line may share a line with it.
fn scenario_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter_map(|line| line.find("thread ").map(|at| line[at..].to_owned()))
        .collect()
}

#[test]
fn test_last_thread_exit_ends_process() {
    const NAME: &str = "test_last_thread_exit_ends_process";
    if in_child(NAME) {
        uthreads::init().unwrap();
        for _ in 0..3 {
            uthreads::create(|| {
                for _ in 0..3 {
                    uthreads::yield_now().ok();
                }
                uprintln!("thread {} done", uthreads::current_id());
            })
            .unwrap();
        }
        uprintln!("thread 0 exiting");
        uthreads::exit();
    }

    let output = run_scenario(NAME);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        scenario_lines(&output),
        vec!["thread 0 exiting", "thread 1 done", "thread 2 done", "thread 3 done"]
    );
    // The harness never got to report a result
    assert!(!String::from_utf8_lossy(&output.stdout).contains("test result"));
}

#[test]
fn test_sole_thread_exit_ends_process() {
    const NAME: &str = "test_sole_thread_exit_ends_process";
    if in_child(NAME) {
        uthreads::init().unwrap();
        let tid = uthreads::create(|| unreachable!("killed before it ran")).unwrap();
        uthreads::kill(tid).unwrap();
        uprintln!("thread 0 exiting with {} killed", tid);
        uthreads::exit();
    }

    let output = run_scenario(NAME);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(scenario_lines(&output), vec!["thread 0 exiting with 1 killed"]);
    assert!(!String::from_utf8_lossy(&output.stderr).contains("panicked"));
}
