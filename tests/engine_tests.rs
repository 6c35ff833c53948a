//! End-to-end engine tests: command strings through parse, dispatch, and
//! the runner lifecycle. Host mirroring is disabled so test output stays
//! clean; capture carries the assertions.

use command_stream::{Engine, RunOptions, RunnerEvent, StdinMode, StreamKind};

fn quiet() -> RunOptions {
    RunOptions::captured()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_echo_simple() {
    let engine = Engine::new();
    let result = engine
        .shell_with("echo 'hello world'", quiet())
        .wait()
        .await
        .unwrap();
    assert_eq!(result.code, 0);
    assert_eq!(result.stdout, "hello world\n");
    assert_eq!(result.stderr, "");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ls_nonexistent_fails() {
    let engine = Engine::new();
    let result = engine
        .shell_with("ls /nonexistent", quiet())
        .wait()
        .await
        .unwrap();
    assert_ne!(result.code, 0);
    assert!(!result.stderr.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sequence_short_circuit() {
    let engine = Engine::new();

    let result = engine
        .shell_with("false && echo x", quiet())
        .wait()
        .await
        .unwrap();
    assert!(!result.stdout.contains('x'));
    assert_ne!(result.code, 0);

    let result = engine
        .shell_with("false || echo x", quiet())
        .wait()
        .await
        .unwrap();
    assert_eq!(result.stdout, "x\n");
    assert_eq!(result.code, 0);

    let result = engine
        .shell_with("false && echo x || echo y", quiet())
        .wait()
        .await
        .unwrap();
    assert_eq!(result.stdout, "y\n");
    assert_eq!(result.code, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_semicolon_runs_both() {
    let engine = Engine::new();
    let result = engine
        .shell_with("false ; echo after", quiet())
        .wait()
        .await
        .unwrap();
    assert_eq!(result.stdout, "after\n");
    assert_eq!(result.code, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sequence_outputs_concatenated() {
    let engine = Engine::new();
    let result = engine
        .shell_with("echo one ; echo two && echo three", quiet())
        .wait()
        .await
        .unwrap();
    assert_eq!(result.stdout, "one\ntwo\nthree\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_virtual_seq() {
    let engine = Engine::new();
    let result = engine.shell_with("seq 1 3", quiet()).wait().await.unwrap();
    assert_eq!(result.stdout, "1\n2\n3\n");
    assert_eq!(result.code, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_exit_builtin_code() {
    let engine = Engine::new();
    let result = engine.shell_with("exit 42", quiet()).wait().await.unwrap();
    assert_eq!(result.code, 42);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_await_twice_same_result() {
    let engine = Engine::new();
    let runner = engine.shell_with("echo once", quiet());
    let first = runner.wait().await.unwrap();
    let second = runner.wait().await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_event_order_end_then_exit() {
    let engine = Engine::new();
    let runner = engine.shell_with("echo hi", quiet());
    let mut events = runner.events();

    let mut saw = Vec::new();
    while let Some(event) = events.next().await {
        match event {
            RunnerEvent::Chunk(chunk) => {
                assert_eq!(chunk.kind, StreamKind::Stdout);
                saw.push("chunk");
            }
            RunnerEvent::End(result) => {
                assert_eq!(result.stdout, "hi\n");
                saw.push("end");
            }
            RunnerEvent::Exit(code) => {
                assert_eq!(code, 0);
                saw.push("exit");
            }
        }
    }
    assert_eq!(saw, vec!["chunk", "end", "exit"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_late_observer_sees_no_events() {
    let engine = Engine::new();
    let runner = engine.shell_with("echo hi", quiet());
    runner.wait().await.unwrap();
    let mut events = runner.events();
    assert!(events.next().await.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_chunk_iteration_collects_stdout() {
    let engine = Engine::new();
    let runner = engine.shell_with("seq 1 3", quiet());
    let mut chunks = runner.chunks();
    let mut collected = Vec::new();
    while let Some(chunk) = chunks.next().await {
        if chunk.kind == StreamKind::Stdout {
            collected.extend_from_slice(&chunk.bytes);
        }
    }
    assert_eq!(String::from_utf8_lossy(&collected), "1\n2\n3\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_errexit_raises_typed_failure() {
    let engine = Engine::new();
    engine.set_option("e").unwrap();
    let err = engine
        .shell_with("false", quiet())
        .wait()
        .await
        .expect_err("errexit should surface non-zero exit");
    let result = err.result().expect("failure carries the result");
    assert_eq!(result.code, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_errexit_snapshot_not_retroactive() {
    let engine = Engine::new();
    let runner = engine.shell_with("false", quiet());
    let result = runner.wait().await.unwrap();
    assert_eq!(result.code, 1);

    // Enabled after the runner started; the stored result is unchanged.
    engine.set_option("errexit").unwrap();
    assert_eq!(runner.wait().await.unwrap().code, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_stdin_bytes_captured() {
    let engine = Engine::new();
    let options = quiet().with_stdin(StdinMode::Bytes(b"x\ny\n".to_vec()));
    let result = engine.shell_with("cat", options).wait().await.unwrap();
    assert_eq!(result.stdout, "x\ny\n");
    assert_eq!(result.stdin, "x\ny\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_registry_disable_falls_through() {
    let engine = Engine::new();
    engine.registry().disable();
    // `true` resolves externally now; exit code still 0 on unix hosts.
    #[cfg(unix)]
    {
        let result = engine.shell_with("true", quiet()).wait().await.unwrap();
        assert_eq!(result.code, 0);
    }
    engine.registry().enable();
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn test_real_shell_delegation_expansion() {
    let engine = Engine::new();
    let mut env = std::collections::HashMap::new();
    env.insert("CS_TEST_VALUE".to_string(), "expanded".to_string());
    let options = quiet().with_env(env);
    let result = engine
        .shell_with("echo $CS_TEST_VALUE", options)
        .wait()
        .await
        .unwrap();
    assert_eq!(result.stdout.trim(), "expanded");
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn test_exec_mode_bypasses_shell() {
    let engine = Engine::new();
    // With exec mode `$HOME` is an argument, not an expansion.
    let result = engine
        .exec_with("echo", ["$HOME"], quiet())
        .wait()
        .await
        .unwrap();
    assert_eq!(result.stdout, "$HOME\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_spawn_failure_is_result_code_one() {
    let engine = Engine::new();
    let result = engine
        .exec_with("definitely-not-a-binary-xyz", Vec::<String>::new(), quiet())
        .wait()
        .await
        .unwrap();
    assert_eq!(result.code, 1);
    assert!(!result.stderr.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_subshell_scopes_cwd() {
    let engine = Engine::new();
    let before = std::env::current_dir().unwrap();
    let result = engine
        .shell_with("(cd /tmp && pwd)", quiet())
        .wait()
        .await
        .unwrap();
    assert_eq!(result.code, 0);
    assert!(result.stdout.contains("/tmp"));
    assert_eq!(std::env::current_dir().unwrap(), before);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_redirect_out_and_in() {
    let engine = Engine::new();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.txt");
    let path_str = path.to_string_lossy().into_owned();

    let result = engine
        .shell_with(format!("echo data > {}", path_str), quiet())
        .wait()
        .await
        .unwrap();
    assert_eq!(result.code, 0);
    // Redirected output lands in the file, not the capture.
    assert_eq!(result.stdout, "");
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "data\n");

    let result = engine
        .shell_with(format!("cat < {}", path_str), quiet())
        .wait()
        .await
        .unwrap();
    assert_eq!(result.stdout, "data\n");

    let result = engine
        .shell_with(format!("echo more >> {}", path_str), quiet())
        .wait()
        .await
        .unwrap();
    assert_eq!(result.code, 0);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "data\nmore\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_stdin_pipe_manual_writes() {
    let engine = Engine::new();
    engine.registry().disable();
    #[cfg(unix)]
    {
        let options = quiet().with_stdin(StdinMode::Pipe);
        let runner = engine.shell_with("wc -l", options);
        let writer = runner.stdin_writer().await.expect("stdin writer");
        assert!(writer.write(b"a\n").await);
        assert!(writer.write(b"b\n").await);
        writer.close();
        let result = runner.wait().await.unwrap();
        assert_eq!(result.stdout.trim(), "2");
        assert_eq!(result.stdin, "a\nb\n");
    }
    engine.registry().enable();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_interpolated_value_single_token() {
    let engine = Engine::new();
    let injection = "hello; rm -rf /";
    let runner = engine.shell_with(
        command_stream::interpolate(&["echo ", ""], &[injection.into()]),
        quiet(),
    );
    let result = runner.wait().await.unwrap();
    assert_eq!(result.stdout, format!("{}\n", injection));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_active_runner_set_empties() {
    let engine = Engine::new();
    engine.set_exit_on_sigint(false);
    let result = engine.shell_with("echo tracked", quiet()).wait().await.unwrap();
    assert_eq!(result.code, 0);
    assert_eq!(engine.active_runners(), 0);
}
