/*!
 * Tests for error types and conversions
 */

use linechunk::errors::{AppError, GatewayError, PipelineError, RecordError, SeparatorCollision};

#[test]
fn test_gatewayError_apiError_shouldDisplayStatusAndMessage() {
    let error = GatewayError::ApiError {
        status_code: 503,
        message: "Service Temporarily Unavailable".to_string(),
    };
    let display = format!("{}", error);
    assert!(display.contains("503"));
    assert!(display.contains("Service Temporarily Unavailable"));
}

#[test]
fn test_gatewayError_isTransient_shouldSeparateServerAndClientErrors() {
    assert!(GatewayError::ConnectionError("reset".to_string()).is_transient());
    assert!(GatewayError::ApiError { status_code: 502, message: String::new() }.is_transient());
    assert!(!GatewayError::ApiError { status_code: 400, message: String::new() }.is_transient());
    assert!(!GatewayError::AuthenticationError("bad key".to_string()).is_transient());
    assert!(!GatewayError::ParseError("html".to_string()).is_transient());
}

#[test]
fn test_gatewayError_isRateLimited_shouldMatchStatusAndMessage() {
    assert!(GatewayError::RateLimitExceeded("slow".to_string()).is_rate_limited());
    assert!(GatewayError::ApiError { status_code: 429, message: String::new() }.is_rate_limited());
    assert!(
        GatewayError::ApiError { status_code: 500, message: "Too many requests".to_string() }.is_rate_limited()
    );
    assert!(!GatewayError::ApiError { status_code: 500, message: "boom".to_string() }.is_rate_limited());
    assert!(!GatewayError::RequestFailed("Too many requests".to_string()).is_rate_limited());
}

#[test]
fn test_recordError_fieldCount_shouldNameLine() {
    let error = RecordError::FieldCount { line: 12, expected: 3, found: 5 };
    let display = format!("{}", error);
    assert!(display.contains("line 12"));
    assert!(display.contains("expected 3"));
    assert!(display.contains("found 5"));
}

#[test]
fn test_pipelineError_fromRecordError_shouldBeMalformedRecord() {
    let error: PipelineError = RecordError::Encoding { line: 4 }.into();
    assert!(matches!(error, PipelineError::MalformedRecord(_)));
    assert_eq!(error.start_record(), Some(4));
    assert!(format!("{}", error).contains("invalid UTF-8"));
}

#[test]
fn test_pipelineError_startRecord_shouldNameFailingChunk() {
    let gateway = PipelineError::Gateway {
        start_record: 41,
        source: GatewayError::ConnectionError("down".to_string()),
    };
    assert_eq!(gateway.start_record(), Some(41));
    assert!(format!("{}", gateway).contains("record 41"));

    let exhausted = PipelineError::SeparatorsExhausted {
        start_record: 7,
        attempts: 8,
        last: SeparatorCollision {
            separator: "; ;".to_string(),
            expected: 2,
            found: 3,
        },
    };
    assert_eq!(exhausted.start_record(), Some(7));
    let display = format!("{}", exhausted);
    assert!(display.contains("all 8 separators"));
    assert!(display.contains("'; ;'"));

    let io: PipelineError = std::io::Error::other("disk full").into();
    assert_eq!(io.start_record(), None);
}

#[test]
fn test_appError_fromPipelineError_shouldWrap() {
    let error: AppError = PipelineError::RecordTooLarge { line: 3, size: 2000, max: 1500 }.into();
    let display = format!("{}", error);
    assert!(display.starts_with("Pipeline error"));
    assert!(display.contains("limit 1500"));
}

#[test]
fn test_appError_config_shouldNameTheProblem() {
    let error = AppError::Config("Source language is required".to_string());
    assert_eq!(error.to_string(), "Configuration error: Source language is required");
}
