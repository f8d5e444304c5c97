use assert_cmd::Command;

fn cli() -> Command {
    let mut cmd = Command::cargo_bin("atlas-cli").unwrap();
    cmd.env("ATLAS_CONFIG_DIR", env!("CARGO_MANIFEST_DIR"))
        .env_remove("ATLAS_ENV")
        .env_remove("RUST_LOG");
    cmd
}

fn stdout(cmd: &mut Command) -> String {
    let output = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(output).unwrap()
}

#[test]
fn config_prints_defaults_without_secrets() {
    let rendered = stdout(cli().arg("config"));
    let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();

    assert_eq!(value["environment"], "local");
    assert_eq!(value["api"]["default_version"], "1.0");
    assert_eq!(value["api"]["max_page_size"], 100);
    assert!(value["auth"].get("jwt_secret").is_none());
    assert!(value["database"].get("fixture_password").is_none());
}

#[test]
fn config_honors_environment_overrides() {
    let rendered = stdout(
        cli()
            .arg("config")
            .env("ATLAS_SERVER__PORT", "9191")
            .env("ATLAS_CACHE__TTL_SECS", "60"),
    );
    let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();

    assert_eq!(value["server"]["port"], 9191);
    assert_eq!(value["cache"]["ttl_secs"], 60);
}

#[test]
fn hash_password_prints_argon2id_phc_string() {
    let hash = stdout(cli().args(["hash-password", "pass1234"]));
    assert!(hash.trim().starts_with("$argon2id$"));
}

#[test]
fn unknown_environment_fails() {
    cli().arg("config").env("ATLAS_ENV", "qa").assert().failure();
}
