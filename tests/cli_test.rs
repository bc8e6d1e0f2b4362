use assert_cmd::Command;
use predicates::prelude::*;

fn tubescribe(workdir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("tubescribe").unwrap();
    cmd.current_dir(workdir)
        .env_remove("PORT")
        .env_remove("RUST_LOG")
        .env("XDG_CONFIG_HOME", workdir)
        .env("HOME", workdir);
    cmd
}

#[test]
fn test_help_lists_commands() {
    let dir = tempfile::tempdir().unwrap();

    tubescribe(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("transcribe"))
        .stdout(predicate::str::contains("check"));
}

#[test]
fn test_transcribe_requires_api_key() {
    let dir = tempfile::tempdir().unwrap();

    tubescribe(dir.path())
        .env_remove("ASSEMBLYAI_API_KEY")
        .args(["-q", "transcribe", "https://youtu.be/dQw4w9WgXcQ"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ASSEMBLYAI_API_KEY is not set"));
}

#[test]
fn test_transcribe_rejects_non_youtube_url() {
    let dir = tempfile::tempdir().unwrap();

    tubescribe(dir.path())
        .env("ASSEMBLYAI_API_KEY", "test-key")
        .args(["-q", "transcribe", "not-a-url"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid YouTube URL"));
}

#[test]
fn test_invalid_port_env_is_config_error() {
    let dir = tempfile::tempdir().unwrap();

    tubescribe(dir.path())
        .env("PORT", "not-a-port")
        .args(["config", "--show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("PORT is not a valid port"));
}

#[test]
fn test_config_show_never_prints_key() {
    let dir = tempfile::tempdir().unwrap();

    tubescribe(dir.path())
        .env("ASSEMBLYAI_API_KEY", "super-secret-key")
        .args(["config", "--show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Current Configuration"))
        .stdout(predicate::str::contains("super-secret-key").not());
}

#[test]
fn test_config_init_writes_defaults() {
    let dir = tempfile::tempdir().unwrap();

    tubescribe(dir.path())
        .args(["config", "--init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Default configuration written to"));
}
