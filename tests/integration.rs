use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn casefile_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("casefile");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::create_dir_all(root.join("data")).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/casefile.sqlite"

[chunking]
chunk_size = 500
overlap = 100

[server]
bind = "127.0.0.1:7341"

[ingest]
upload_dir = "{}/uploads"
"#,
        root.display(),
        root.display()
    );

    let config_path = config_dir.join("casefile.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_casefile(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = casefile_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run casefile binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_casefile(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data").join("casefile.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_casefile(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_casefile(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_ingest_errors_when_embeddings_disabled() {
    let (tmp, config_path) = setup_test_env();
    let pdf = tmp.path().join("brief.pdf");
    fs::write(&pdf, b"%PDF-1.4\n").unwrap();

    run_casefile(&config_path, &["init"]);
    let (_, stderr, success) = run_casefile(&config_path, &["ingest", pdf.to_str().unwrap()]);
    assert!(!success, "ingest should fail when embeddings disabled");
    assert!(
        stderr.contains("embeddings"),
        "Should mention embeddings, got: {}",
        stderr
    );
}

#[test]
fn test_query_errors_when_embeddings_disabled() {
    let (_tmp, config_path) = setup_test_env();

    run_casefile(&config_path, &["init"]);
    let (_, stderr, success) = run_casefile(&config_path, &["query", "filing deadline"]);
    assert!(!success, "query should fail when embeddings disabled");
    assert!(
        stderr.contains("embeddings"),
        "Should mention embeddings, got: {}",
        stderr
    );
}

#[test]
fn test_timeline_empty_store() {
    let (_tmp, config_path) = setup_test_env();

    run_casefile(&config_path, &["init"]);
    let (stdout, stderr, success) = run_casefile(&config_path, &["timeline"]);
    assert!(success, "timeline failed: {}", stderr);
    assert!(stdout.contains("No dated events"));
}

#[test]
fn test_graph_empty_store() {
    let (_tmp, config_path) = setup_test_env();

    run_casefile(&config_path, &["init"]);
    let (stdout, _, success) = run_casefile(&config_path, &["graph"]);
    assert!(success);
    assert!(stdout.contains("[]"), "Empty graph should print []: {}", stdout);
}

#[test]
fn test_consolidate_empty_store() {
    let (_tmp, config_path) = setup_test_env();

    run_casefile(&config_path, &["init"]);
    let (stdout, _, success) = run_casefile(&config_path, &["consolidate"]);
    assert!(success);
    assert!(stdout.contains("Consolidated 0 groups"));

    let (help, _, success) = run_casefile(&config_path, &["consolidate", "--help"]);
    assert!(success);
    assert!(help.contains("0.75"), "default threshold in help: {}", help);
}

#[test]
fn test_stats_empty_store() {
    let (_tmp, config_path) = setup_test_env();

    run_casefile(&config_path, &["init"]);
    let (stdout, _, success) = run_casefile(&config_path, &["stats"]);
    assert!(success);
    assert!(stdout.contains("0 chunks"));
}

#[test]
fn test_job_missing_id_errors() {
    let (_tmp, config_path) = setup_test_env();

    run_casefile(&config_path, &["init"]);
    let (_, stderr, success) = run_casefile(&config_path, &["job", "nonexistent-id"]);
    assert!(!success, "job with missing id should fail");
    assert!(
        stderr.contains("no job"),
        "Should report missing job, got: {}",
        stderr
    );
}

#[test]
fn test_invalid_overlap_rejected() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("casefile.toml");
    fs::write(
        &config_path,
        format!(
            r#"[db]
path = "{}/casefile.sqlite"

[chunking]
chunk_size = 100
overlap = 100

[server]
bind = "127.0.0.1:7342"
"#,
            tmp.path().display()
        ),
    )
    .unwrap();

    let (_, stderr, success) = run_casefile(&config_path, &["init"]);
    assert!(!success, "overlap >= chunk_size must be rejected");
    assert!(
        stderr.contains("overlap"),
        "Should mention overlap, got: {}",
        stderr
    );
}

#[test]
fn test_unknown_provider_rejected() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("casefile.toml");
    fs::write(
        &config_path,
        format!(
            r#"[db]
path = "{}/casefile.sqlite"

[embedding]
provider = "cohere"
model = "embed-english"
dims = 1024

[server]
bind = "127.0.0.1:7343"
"#,
            tmp.path().display()
        ),
    )
    .unwrap();

    let (_, stderr, success) = run_casefile(&config_path, &["init"]);
    assert!(!success);
    assert!(
        stderr.contains("Unknown embedding provider"),
        "Should reject provider, got: {}",
        stderr
    );
}

#[test]
fn test_missing_config_errors() {
    let (_, stderr, success) = run_casefile(Path::new("/nonexistent/casefile.toml"), &["init"]);
    assert!(!success);
    assert!(
        stderr.contains("Failed to read config"),
        "Should report unreadable config, got: {}",
        stderr
    );
}
