/*!
 * Tests for resuming an interrupted translation from the output file
 */

use anyhow::Result;
use linechunk::gateway::mock::MockGateway;
use linechunk::pipeline::{resolve_checkpoint, CancellationFlag, ProgressCallback};

use crate::common;

#[tokio::test]
async fn test_resume_afterCancellation_shouldMatchUninterruptedRun() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_records_file(temp_dir.path(), "input.txt", 20)?;
    let reference = temp_dir.path().join("reference.txt");
    let resumed = temp_dir.path().join("resumed.txt");

    let gateway = MockGateway::uppercase().with_max_input_size(60);
    common::mock_pipeline(&gateway).translate_file(&input, &reference, None).await?;

    // Stop right after the first flushed chunk
    let cancel = CancellationFlag::new();
    let trigger = cancel.clone();
    let on_progress = move |percent: f64| {
        if percent > 0.0 {
            trigger.cancel();
        }
    };
    let callback: &ProgressCallback = &on_progress;
    let mut pipeline = common::mock_pipeline(&gateway).with_cancellation(cancel);
    let first = pipeline.translate_file(&input, &resumed, Some(callback)).await?;

    assert!(first.cancelled);
    assert_eq!(first.chunks_written, 1);
    assert_eq!(first.records_written, 2);
    assert_eq!(resolve_checkpoint(&resumed)?.records, 2);

    let second = common::mock_pipeline(&gateway).translate_file(&input, &resumed, None).await?;
    assert!(!second.cancelled);
    assert_eq!(second.resumed_from, 2);
    assert_eq!(second.records_written, 18);
    assert_eq!(second.total_records(), 20);

    assert_eq!(std::fs::read_to_string(&resumed)?, std::fs::read_to_string(&reference)?);
    Ok(())
}

#[tokio::test]
async fn test_resume_withExistingOutput_shouldSkipTranslatedLines() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_records_file(temp_dir.path(), "input.txt", 3)?;
    let output = common::create_test_file(
        temp_dir.path(),
        "output.txt",
        "id1|phrase number 1|already done\n",
    )?;

    let gateway = MockGateway::uppercase();
    let summary = common::mock_pipeline(&gateway).translate_file(&input, &output, None).await?;

    assert_eq!(summary.resumed_from, 1);
    assert_eq!(gateway.requests(), vec!["phrase number 2-+ +-phrase number 3-+ +-".to_string()]);
    assert_eq!(
        common::read_lines(&output)?,
        vec![
            "id1|phrase number 1|already done",
            "id2|phrase number 2|PHRASE NUMBER 2",
            "id3|phrase number 3|PHRASE NUMBER 3",
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_resume_withCompleteOutput_shouldNotCallGateway() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_records_file(temp_dir.path(), "input.txt", 4)?;
    let output = temp_dir.path().join("output.txt");

    let gateway = MockGateway::uppercase();
    common::mock_pipeline(&gateway).translate_file(&input, &output, None).await?;
    let before = std::fs::read_to_string(&output)?;
    let requests = gateway.request_count();

    let summary = common::mock_pipeline(&gateway).translate_file(&input, &output, None).await?;

    assert_eq!(summary.records_written, 0);
    assert_eq!(summary.resumed_from, 4);
    assert_eq!(gateway.request_count(), requests);
    assert_eq!(std::fs::read_to_string(&output)?, before);
    Ok(())
}

#[tokio::test]
async fn test_resume_withTornTail_shouldRewriteIncompleteLine() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_records_file(temp_dir.path(), "input.txt", 3)?;
    let output = common::create_test_file(
        temp_dir.path(),
        "output.txt",
        "id1|phrase number 1|PHRASE NUMBER 1\nid2|phrase num",
    )?;

    let summary = common::mock_pipeline(&MockGateway::uppercase())
        .translate_file(&input, &output, None)
        .await?;

    assert_eq!(summary.resumed_from, 1);
    assert_eq!(
        std::fs::read_to_string(&output)?,
        "id1|phrase number 1|PHRASE NUMBER 1\nid2|phrase number 2|PHRASE NUMBER 2\nid3|phrase number 3|PHRASE NUMBER 3\n"
    );
    Ok(())
}

#[tokio::test]
async fn test_resume_withOutputInNewDirectory_shouldCreateIt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_records_file(temp_dir.path(), "input.txt", 2)?;
    let output = temp_dir.path().join("translated").join("output.txt");

    common::mock_pipeline(&MockGateway::uppercase())
        .translate_file(&input, &output, None)
        .await?;

    assert_eq!(common::read_lines(&output)?.len(), 2);
    Ok(())
}
