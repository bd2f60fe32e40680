/*!
 * Tests for file utility functions
 */

use anyhow::Result;
use std::path::PathBuf;
use linechunk::file_utils::FileManager;

use crate::common;

#[test]
fn test_file_exists_withExistingFile_shouldReturnTrue() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let file_path = common::create_test_file(temp_dir.path(), "input.txt", "id|text|\n")?;

    assert!(FileManager::file_exists(&file_path));
    assert!(!FileManager::dir_exists(&file_path));
    Ok(())
}

#[test]
fn test_file_exists_withNonExistentFile_shouldReturnFalse() {
    assert!(!FileManager::file_exists("/definitely/not/here.txt"));
}

#[test]
fn test_generate_output_path_withValidInputs_shouldCreateCorrectPath() {
    let output = FileManager::generate_output_path("/data/phrases.txt", "ru");
    assert_eq!(output, PathBuf::from("/data/phrases.ru.txt"));
}

#[test]
fn test_generate_output_path_withoutExtension_shouldAppendLanguage() {
    let output = FileManager::generate_output_path("phrases", "de");
    assert_eq!(output, PathBuf::from("phrases.de"));
}

#[test]
fn test_ensure_parent_dir_withNestedPath_shouldCreateDirectories() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let file_path = temp_dir.path().join("a").join("b").join("out.txt");

    FileManager::ensure_parent_dir(&file_path)?;
    assert!(FileManager::dir_exists(temp_dir.path().join("a").join("b")));
    Ok(())
}

#[test]
fn test_count_lines_withUnterminatedLastLine_shouldCountIt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let terminated = common::create_test_file(temp_dir.path(), "a.txt", "1|a|\n2|b|\n")?;
    let unterminated = common::create_test_file(temp_dir.path(), "b.txt", "1|a|\n2|b|")?;
    let empty = common::create_test_file(temp_dir.path(), "c.txt", "")?;

    assert_eq!(FileManager::count_lines(&terminated)?, 2);
    assert_eq!(FileManager::count_lines(&unterminated)?, 2);
    assert_eq!(FileManager::count_lines(&empty)?, 0);
    Ok(())
}

#[test]
fn test_count_lines_withMissingFile_shouldFail() {
    assert!(FileManager::count_lines("/definitely/not/here.txt").is_err());
}
