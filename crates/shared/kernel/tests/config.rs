use feq_domain::config::ApiConfig;
use feq_kernel::config::load_config;
use std::io::Write;

#[test]
fn explicit_file_overrides_defaults() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        r#"
[server]
port = 8080

[exam]
question_count = 25

[certificates]
secret = "hmac-key"
"#
    )
    .unwrap();

    let cfg: ApiConfig = load_config(Some(file.path())).unwrap();
    assert_eq!(cfg.server.port, 8080);
    assert_eq!(cfg.exam.question_count, 25);
    assert_eq!(cfg.exam.time_limit_minutes, 60);
    assert_eq!(cfg.certificates.secret.expose(), "hmac-key");
    assert_eq!(cfg.certificates.validity_days, 1095);
}

#[test]
fn explicit_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.toml");
    assert!(load_config::<ApiConfig>(Some(missing)).is_err());
}
