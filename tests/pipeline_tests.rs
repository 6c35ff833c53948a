//! Pipeline semantics: parsed `|` chains across virtual and external
//! stages, pipefail, stderr attribution, and the programmatic pipe.

use command_stream::{Engine, RunOptions, StdinMode};

fn quiet() -> RunOptions {
    RunOptions::captured()
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn test_echo_wc_pipeline() {
    let engine = Engine::new();
    let result = engine
        .shell_with("echo a | wc -l", quiet())
        .wait()
        .await
        .unwrap();
    assert_eq!(result.stdout.trim(), "1");
    assert_eq!(result.code, 0);
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn test_three_stage_pipeline() {
    let engine = Engine::new();
    let result = engine
        .shell_with("seq 1 5 | grep 3 | wc -l", quiet())
        .wait()
        .await
        .unwrap();
    assert_eq!(result.stdout.trim(), "1");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pipefail_semantics() {
    let engine = Engine::new();

    let result = engine
        .shell_with("false | true", quiet())
        .wait()
        .await
        .unwrap();
    assert_eq!(result.code, 0);

    engine.set_option("pipefail").unwrap();
    let result = engine
        .shell_with("false | true", quiet())
        .wait()
        .await
        .unwrap();
    assert_eq!(result.code, 1);

    engine.unset_option("pipefail").unwrap();
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn test_cat_grep_with_bytes_stdin() {
    let engine = Engine::new();
    let options = quiet().with_stdin(StdinMode::Bytes(b"x\ny\n".to_vec()));
    let result = engine
        .shell_with("cat | grep x", options)
        .wait()
        .await
        .unwrap();
    assert_eq!(result.stdout, "x\n");
    assert_eq!(result.code, 0);
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn test_virtual_stream_into_external_stage() {
    let engine = Engine::new();
    let result = engine
        .shell_with("seq 1 3 | grep 2", quiet())
        .wait()
        .await
        .unwrap();
    assert_eq!(result.stdout, "2\n");
    assert_eq!(result.code, 0);
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn test_all_external_native_chain() {
    let engine = Engine::new();
    engine.registry().disable();
    let result = engine
        .shell_with("printf 'a\\nb\\nc\\n' | wc -l", quiet())
        .wait()
        .await
        .unwrap();
    engine.registry().enable();
    assert_eq!(result.stdout.trim(), "3");
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn test_intermediate_stderr_in_final_result() {
    let engine = Engine::new();
    engine.registry().disable();
    // The first stage writes to stderr; it must surface in the result even
    // though only the last stage's streams are live.
    let result = engine
        .shell_with("ls /nonexistent-cs-test | wc -l", quiet())
        .wait()
        .await
        .unwrap();
    engine.registry().enable();
    assert_eq!(result.stdout.trim(), "0");
    assert!(!result.stderr.is_empty());
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn test_subshell_stage_in_pipeline() {
    let engine = Engine::new();
    let result = engine
        .shell_with("(echo a && echo b) | wc -l", quiet())
        .wait()
        .await
        .unwrap();
    assert_eq!(result.stdout.trim(), "2");
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn test_programmatic_pipe() {
    let engine = Engine::new();
    let source = engine.shell_with("printf 'a\\nb\\nc\\n'", quiet());
    let dest = engine.shell_with("wc -l", quiet());
    let result = source.pipe(&dest).wait().await.unwrap();
    assert_eq!(result.stdout.trim(), "3");
    assert_eq!(result.code, 0);
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn test_programmatic_pipe_concatenates_stderr() {
    let engine = Engine::new();
    engine.registry().disable();
    let source = engine.shell_with("sh -c 'echo first >&2; echo payload'", quiet());
    let dest = engine.shell_with("sh -c 'cat >/dev/null; echo second >&2'", quiet());
    let result = source.pipe(&dest).wait().await.unwrap();
    engine.registry().enable();

    let first = result.stderr.find("first").expect("source stderr present");
    let second = result.stderr.find("second").expect("dest stderr present");
    assert!(first < second);
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn test_pipefail_uses_first_failing_stage() {
    let engine = Engine::new();
    engine.set_option("pipefail").unwrap();
    engine.registry().disable();
    let result = engine
        .shell_with("sh -c 'exit 3' | sh -c 'cat; exit 0'", quiet())
        .wait()
        .await
        .unwrap();
    engine.registry().enable();
    engine.unset_option("pipefail").unwrap();
    assert_eq!(result.code, 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_without_pipefail_last_stage_wins() {
    let engine = Engine::new();
    let result = engine
        .shell_with("true | false", quiet())
        .wait()
        .await
        .unwrap();
    assert_eq!(result.code, 1);
}
