use feq_logger::{Logger, Rotation};
use std::fs;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn json_file_layer_writes_lines() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempdir()?;
    let dir = tmp.path().join("logs");

    let logger = Logger::builder()
        .service("file-logging")
        .console(false)
        .directives("info")
        .directory(&dir)
        .rotation(Rotation::NEVER)
        .json(true)
        .init()?;
    assert!(logger.writes_files());

    tracing::info!(order = "cs_test_1", "order recorded");
    std::thread::sleep(Duration::from_millis(30));
    drop(logger);

    let file = fs::read_dir(&dir)?
        .flatten()
        .map(|entry| entry.path())
        .find(|path| path.extension().and_then(|ext| ext.to_str()) == Some("log"))
        .expect("log file should exist");
    let contents = fs::read_to_string(file)?;
    assert!(contents.contains("\"order\":\"cs_test_1\""), "{contents}");

    Ok(())
}
