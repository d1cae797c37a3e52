use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn doclens_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("doclens");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    fs::write(
        root.join("notes.md"),
        "Deployment notes.\n\nKubernetes and Docker are mentioned here.",
    )
    .unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/doclens.sqlite"

[ai]
provider = "disabled"
embedding = "local"

[server]
bind = "127.0.0.1:0"
"#,
        root.display()
    );

    let config_path = config_dir.join("doclens.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_doclens(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = doclens_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run doclens binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn add_doc(config_path: &Path, title: &str, content: &str, tags: &[&str]) -> serde_json::Value {
    let mut args = vec!["add", "--title", title, "--content", content, "--json"];
    for tag in tags {
        args.push("--tag");
        args.push(tag);
    }
    let (stdout, stderr, success) = run_doclens(config_path, &args);
    assert!(success, "add failed: {}", stderr);
    serde_json::from_str(&stdout).unwrap()
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_doclens(&config_path, &["init"]);
    assert!(success, "init failed: {}", stderr);
    assert!(stdout.contains("Database initialized successfully"));
    assert!(tmp.path().join("data/doclens.sqlite").exists());

    // Idempotent.
    let (_, stderr, success) = run_doclens(&config_path, &["init"]);
    assert!(success, "second init failed: {}", stderr);
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_doclens(&tmp.path().join("nope.toml"), &["init"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}

#[test]
fn test_add_without_provider_still_embeds_locally() {
    let (_tmp, config_path) = setup_test_env();
    run_doclens(&config_path, &["init"]);

    let doc = add_doc(&config_path, "Alpha", "Rust ownership and borrowing", &["lang", "lang"]);
    assert_eq!(doc["title"], "Alpha");
    assert_eq!(doc["owner"], "cli");
    assert_eq!(doc["tags"], serde_json::json!(["lang"]));
    assert!(doc.get("summary").is_none());
    assert_eq!(doc["embedding"].as_array().unwrap().len(), 64);
    assert!(doc["createdAt"].is_string());

    let id = doc["id"].as_str().unwrap();
    let (stdout, _, success) = run_doclens(&config_path, &["get", id]);
    assert!(success);
    assert!(stdout.contains("Rust ownership and borrowing"));
    assert!(stdout.contains("embedding:  64 dims"));
}

#[test]
fn test_add_from_file_and_list() {
    let (tmp, config_path) = setup_test_env();
    run_doclens(&config_path, &["init"]);

    let notes = tmp.path().join("notes.md");
    let (_, stderr, success) = run_doclens(
        &config_path,
        &[
            "add",
            "--title",
            "Ops",
            "--content-file",
            notes.to_str().unwrap(),
            "--tag",
            "ops",
        ],
    );
    assert!(success, "add failed: {}", stderr);
    add_doc(&config_path, "Cooking", "Pasta recipes", &["food"]);

    let (stdout, _, success) = run_doclens(&config_path, &["list", "--json"]);
    assert!(success);
    let docs: Vec<serde_json::Value> = serde_json::from_str(&stdout).unwrap();
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0]["title"], "Cooking");

    let (stdout, _, _) = run_doclens(&config_path, &["list", "--tag", "ops", "--json"]);
    let docs: Vec<serde_json::Value> = serde_json::from_str(&stdout).unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0]["title"], "Ops");

    let (stdout, _, _) = run_doclens(&config_path, &["list", "--text", "KUBERNETES"]);
    assert!(stdout.contains("Ops"));
    assert!(!stdout.contains("Cooking"));
}

#[test]
fn test_add_requires_content() {
    let (_tmp, config_path) = setup_test_env();
    run_doclens(&config_path, &["init"]);

    let (_, stderr, success) = run_doclens(&config_path, &["add", "--title", "T"]);
    assert!(!success);
    assert!(stderr.contains("--content"));

    let (_, stderr, success) =
        run_doclens(&config_path, &["add", "--title", " ", "--content", "x"]);
    assert!(!success);
    assert!(stderr.contains("title is required"));
}

#[test]
fn test_search_modes() {
    let (_tmp, config_path) = setup_test_env();
    run_doclens(&config_path, &["init"]);
    add_doc(&config_path, "Rust", "Rust ownership and borrowing", &[]);
    add_doc(&config_path, "Python", "Python machine learning", &["ml"]);

    let (stdout, _, success) = run_doclens(&config_path, &["search", "ownership", "--json"]);
    assert!(success);
    let resp: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(resp["mode"], "text");
    assert_eq!(resp["results"].as_array().unwrap().len(), 1);
    assert_eq!(resp["results"][0]["title"], "Rust");

    let (stdout, _, success) = run_doclens(
        &config_path,
        &["search", "Rust ownership", "--mode", "semantic", "--top-k", "1", "--json"],
    );
    assert!(success);
    let resp: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(resp["mode"], "semantic");
    let results = resp["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0]["relevance"].is_number());
    assert!(resp["fallbackTextMatches"].is_array());

    let (_, stderr, success) = run_doclens(&config_path, &["search", "x", "--mode", "fuzzy"]);
    assert!(!success);
    assert!(stderr.contains("unknown search mode"));
}

#[test]
fn test_ask_without_provider() {
    let (_tmp, config_path) = setup_test_env();
    run_doclens(&config_path, &["init"]);
    add_doc(&config_path, "Guide", "The answer is 42.", &[]);

    let (stdout, _, success) = run_doclens(&config_path, &["ask", "What is the answer?"]);
    assert!(success);
    assert_eq!(stdout.trim(), "Unable to answer.");
}

#[test]
fn test_delete_requires_owner() {
    let (_tmp, config_path) = setup_test_env();
    run_doclens(&config_path, &["init"]);
    let doc = add_doc(&config_path, "Mine", "body", &[]);
    let id = doc["id"].as_str().unwrap();

    let (_, stderr, success) = run_doclens(&config_path, &["delete", id, "--user", "mallory"]);
    assert!(!success);
    assert!(stderr.contains("not allowed"));

    let (stdout, _, success) = run_doclens(&config_path, &["delete", id]);
    assert!(success);
    assert!(stdout.contains("Deleted document"));

    let (_, stderr, success) = run_doclens(&config_path, &["get", id]);
    assert!(!success);
    assert!(stderr.contains("not found"));
}
