use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const UNSET_KEY_VAR: &str = "SCOUT_TEST_KEY_NEVER_SET";

fn scout_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("scout");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let config_dir = tmp.path().join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[server]
bind = "127.0.0.1:7340"

[exa]
base_url = "http://127.0.0.1:9"
api_key_env = "{}"
timeout_secs = 5

[search]
num_results = 5

[research]
poll_interval_secs = 1
max_attempts = 3
"#,
        UNSET_KEY_VAR
    );

    let config_path = config_dir.join("scout.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_scout(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = scout_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove(UNSET_KEY_VAR)
        .env_remove("EXA_API_KEY")
        .env("RUST_LOG", "warn")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run scout binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_config_prints_effective_sections() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_scout(&config_path, &["config"]);
    assert!(success, "config failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("[server]"));
    assert!(stdout.contains("[exa]"));
    assert!(stdout.contains("[research]"));
    assert!(stdout.contains("max_attempts = 3"));
    assert!(stdout.contains("127.0.0.1:7340"));
    assert!(stdout.contains(&format!("# credential ({}): missing", UNSET_KEY_VAR)));
}

#[test]
fn test_answer_without_credential_fails() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_scout(&config_path, &["answer", "what is rust?"]);
    assert!(!success);
    assert!(
        stderr.contains("Exa API key not configured"),
        "stderr={}",
        stderr
    );
}

#[test]
fn test_research_without_credential_fails() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_scout(&config_path, &["research", "summarize X"]);
    assert!(!success);
    assert!(stderr.contains("Exa API key not configured"));
}

#[test]
fn test_blank_query_rejected_before_credential_check() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_scout(&config_path, &["answer", "   "]);
    assert!(!success);
    assert!(stderr.contains("Query is required"), "stderr={}", stderr);
    assert!(!stderr.contains("Exa API key not configured"));
}

#[test]
fn test_search_num_results_out_of_range() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) =
        run_scout(&config_path, &["search", "rust", "--num-results", "0"]);
    assert!(!success);
    assert!(stderr.contains("numResults must be between 1 and 100"));
}

#[test]
fn test_invalid_config_rejected() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("bad.toml");
    fs::write(&config_path, "[research]\nmax_attempts = 0\n").unwrap();

    let (_, stderr, success) = run_scout(&config_path, &["config"]);
    assert!(!success);
    assert!(stderr.contains("research.max_attempts"), "stderr={}", stderr);
}

#[test]
fn test_env_base_url_override_is_validated() {
    let (_tmp, config_path) = setup_test_env();

    let output = Command::new(scout_binary())
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .arg("config")
        .env_remove(UNSET_KEY_VAR)
        .env("EXA_API_BASE", "not a url")
        .output()
        .unwrap();
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(
        stderr.contains("exa.base_url is not a valid URL: not a url"),
        "stderr={}",
        stderr
    );
}

#[test]
fn test_missing_config_file_fails() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("nope.toml");

    let (_, stderr, success) = run_scout(&config_path, &["config"]);
    assert!(!success);
    assert!(stderr.contains("Error:"));
}

#[test]
fn test_chat_reports_missing_credential_and_exits_on_eof() {
    use std::io::Write;
    use std::process::Stdio;

    let (_tmp, config_path) = setup_test_env();

    let mut child = Command::new(scout_binary())
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(["chat", "--mode", "search"])
        .env_remove(UNSET_KEY_VAR)
        .env_remove("EXA_API_KEY")
        .env("RUST_LOG", "warn")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    {
        let mut stdin = child.stdin.take().unwrap();
        stdin.write_all(b"rust web frameworks\n").unwrap();
    }

    let output = child.wait_with_output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "stdout={}", stdout);
    assert!(stdout.contains("Mode: search"));
    assert!(stdout.contains("Exa API key not configured"), "stdout={}", stdout);
}
