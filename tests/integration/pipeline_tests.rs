/*!
 * End-to-end tests for file translation through the pipeline
 */

use anyhow::Result;
use std::sync::{Arc, Mutex};
use linechunk::errors::{PipelineError, RecordError};
use linechunk::gateway::mock::MockGateway;
use linechunk::gateway::BackendSelector;
use linechunk::pipeline::{resolve_checkpoint, FilePipeline, ProgressCallback};

use crate::common;

#[tokio::test]
async fn test_translate_file_withTwoRecords_shouldWriteBothInOneFlush() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "input.txt", "id1|Hello world|\nid2|Good morning|\n")?;
    let output = temp_dir.path().join("output.txt");

    let gateway = MockGateway::uppercase();
    let summary = common::mock_pipeline(&gateway).translate_file(&input, &output, None).await?;

    assert_eq!(
        std::fs::read_to_string(&output)?,
        "id1|Hello world|HELLO WORLD\nid2|Good morning|GOOD MORNING\n"
    );
    assert_eq!(gateway.request_count(), 1);
    assert_eq!(gateway.requests()[0], "Hello world-+ +-Good morning-+ +-");
    assert_eq!(summary.chunks_written, 1);
    assert_eq!(summary.records_written, 2);
    assert_eq!(summary.resumed_from, 0);
    assert!(!summary.cancelled);
    Ok(())
}

#[tokio::test]
async fn test_translate_file_withSmallBound_shouldKeepEveryRequestBelowIt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_records_file(temp_dir.path(), "input.txt", 20)?;
    let output = temp_dir.path().join("output.txt");

    let gateway = MockGateway::uppercase().with_max_input_size(60);
    let summary = common::mock_pipeline(&gateway).translate_file(&input, &output, None).await?;

    assert_eq!(summary.chunks_written, 10);
    assert_eq!(gateway.request_count(), 10);
    for request in gateway.requests() {
        assert!(request.chars().count() < 60, "request too large: {request:?}");
    }
    assert_eq!(common::read_lines(&output)?.len(), 20);
    Ok(())
}

#[tokio::test]
async fn test_translate_file_withManyChunks_shouldPreserveOrder() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_records_file(temp_dir.path(), "input.txt", 57)?;
    let output = temp_dir.path().join("output.txt");

    let gateway = MockGateway::uppercase().with_max_input_size(100);
    common::mock_pipeline(&gateway).translate_file(&input, &output, None).await?;

    let input_ids = common::identifiers(&common::read_lines(&input)?);
    let output_lines = common::read_lines(&output)?;
    assert_eq!(common::identifiers(&output_lines), input_ids);
    assert_eq!(output_lines[56], "id57|phrase number 57|PHRASE NUMBER 57");
    Ok(())
}

#[tokio::test]
async fn test_translate_file_withSlashInText_shouldEscapeOnlyInFlight() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "input.txt", "id1|and/or|\n")?;
    let output = temp_dir.path().join("output.txt");

    let gateway = MockGateway::uppercase();
    common::mock_pipeline(&gateway).translate_file(&input, &output, None).await?;

    assert_eq!(gateway.requests()[0], "and_S_or-+ +-");
    assert_eq!(std::fs::read_to_string(&output)?, "id1|and/or|AND/OR\n");
    Ok(())
}

#[tokio::test]
async fn test_translate_file_withCrlfInput_shouldWriteLfOutput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "input.txt", "id1|one|\r\nid2|two|")?;
    let output = temp_dir.path().join("output.txt");

    common::mock_pipeline(&MockGateway::uppercase()).translate_file(&input, &output, None).await?;

    assert_eq!(std::fs::read_to_string(&output)?, "id1|one|ONE\nid2|two|TWO\n");
    Ok(())
}

#[tokio::test]
async fn test_translate_file_withMalformedRecord_shouldWriteNothingForItsChunk() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "input.txt", "id1|ok|\nid2|a|b|c\nid3|ok|\n")?;
    let output = temp_dir.path().join("output.txt");

    let gateway = MockGateway::uppercase();
    let err = common::mock_pipeline(&gateway)
        .translate_file(&input, &output, None)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::MalformedRecord(RecordError::FieldCount { line: 2, .. })));
    assert_eq!(err.start_record(), Some(2));
    assert_eq!(gateway.request_count(), 0);
    assert_eq!(resolve_checkpoint(&output)?.records, 0);
    Ok(())
}

#[tokio::test]
async fn test_translate_file_withMalformedRecordAfterFlush_shouldKeepFlushedChunks() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    // 22 + 18 characters with overhead; the second record does not fit under 30
    let input = common::create_test_file(
        temp_dir.path(),
        "input.txt",
        "id1|first phrase here|\nid2|second phrase|\nid3|x|y|z\n",
    )?;
    let output = temp_dir.path().join("output.txt");

    let gateway = MockGateway::uppercase().with_max_input_size(30);
    let err = common::mock_pipeline(&gateway)
        .translate_file(&input, &output, None)
        .await
        .unwrap_err();

    assert_eq!(err.start_record(), Some(3));
    assert_eq!(common::read_lines(&output)?, vec!["id1|first phrase here|FIRST PHRASE HERE"]);
    Ok(())
}

#[tokio::test]
async fn test_translate_file_withOversizedRecord_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "input.txt", "id1|this text is far too long|\n")?;
    let output = temp_dir.path().join("output.txt");

    let gateway = MockGateway::uppercase().with_max_input_size(20);
    let err = common::mock_pipeline(&gateway)
        .translate_file(&input, &output, None)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::RecordTooLarge { line: 1, max: 20, .. }));
    assert_eq!(gateway.request_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_translate_file_withProgressCallback_shouldReportEveryFlush() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_records_file(temp_dir.path(), "input.txt", 20)?;
    let output = temp_dir.path().join("output.txt");

    let values = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&values);
    let on_progress = move |percent: f64| sink.lock().unwrap().push(percent);
    let callback: &ProgressCallback = &on_progress;

    let gateway = MockGateway::uppercase().with_max_input_size(60);
    common::mock_pipeline(&gateway).translate_file(&input, &output, Some(callback)).await?;

    let values = values.lock().unwrap().clone();
    assert_eq!(values.len(), 11);
    assert_eq!(values[0], 0.0);
    assert_eq!(values[1], 10.0);
    assert_eq!(values[10], 100.0);
    assert!(values.windows(2).all(|w| w[0] <= w[1]));
    Ok(())
}

#[tokio::test]
async fn test_translate_file_withEmptyInput_shouldCreateEmptyOutput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "input.txt", "")?;
    let output = temp_dir.path().join("output.txt");

    let gateway = MockGateway::uppercase();
    let summary = common::mock_pipeline(&gateway).translate_file(&input, &output, None).await?;

    assert_eq!(summary.records_written, 0);
    assert_eq!(gateway.request_count(), 0);
    assert_eq!(std::fs::read_to_string(&output)?, "");
    Ok(())
}

#[tokio::test]
async fn test_translate_file_withMissingInput_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let output = temp_dir.path().join("output.txt");

    let result = common::mock_pipeline(&MockGateway::uppercase())
        .translate_file(temp_dir.path().join("absent.txt"), &output, None)
        .await;

    assert!(matches!(result, Err(PipelineError::Io(_))));
    Ok(())
}

#[tokio::test]
async fn test_translate_file_withDelimiterInTranslation_shouldKeepFieldCount() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "input.txt", "id1|a or b|\nid2|yes|\n")?;
    let output = temp_dir.path().join("output.txt");

    let mut config = common::test_config();
    config.records.delimiter_replacement = "¦".to_string();
    let gateway = MockGateway::uppercase().with_custom_response(|text| text.replace(" or ", " | "));
    common::config_pipeline(&config, &gateway)
        .translate_file(&input, &output, None)
        .await?;

    assert_eq!(std::fs::read_to_string(&output)?, "id1|a or b|a ¦ b\nid2|yes|yes\n");
    assert_eq!(resolve_checkpoint(&output)?.records, 2);
    Ok(())
}

#[test]
fn test_new_withSourceFieldOutOfRange_shouldFail() {
    let mut config = common::test_config();
    config.records.source_field = 7;
    let selector = BackendSelector::single(Arc::new(MockGateway::uppercase()));

    let err = FilePipeline::new(&config, selector).unwrap_err();
    assert!(err.to_string().contains("must be below field count"));
}
