use std::process::Command;

fn firewatch() -> Command {
    Command::new(env!("CARGO_BIN_EXE_firewatch"))
}

#[test]
fn test_missing_directory_is_reported_before_model_load() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let output = firewatch()
        .arg(dir.path().join("no_such_dir"))
        .arg("--model")
        .arg(dir.path().join("no_such_model.onnx"))
        .output()?;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Directory not found"), "{}", stderr);
    assert!(!stderr.contains("no_such_model.onnx"), "{}", stderr);
    Ok(())
}
