//! Assertion helpers for tests.

use std::path::Path;

use mapframe::services::{unpack_smrf, SmrfHeader};
use pretty_assertions::assert_eq;

/// Read and decode an SMRF file
pub fn read_smrf(path: &Path) -> (SmrfHeader, Vec<u8>) {
    let bytes = std::fs::read(path)
        .unwrap_or_else(|e| panic!("Expected SMRF file at {}: {e}", path.display()));
    unpack_smrf(&bytes).unwrap_or_else(|e| panic!("Invalid SMRF {}: {e}", path.display()))
}

/// Read a JSON frame as rows of indices
pub fn read_json_frame(path: &Path) -> Vec<Vec<u16>> {
    let text = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Expected JSON file at {}: {e}", path.display()));
    serde_json::from_str(&text).unwrap_or_else(|e| panic!("Invalid JSON frame: {e}"))
}

/// Assert the header describes a `width` x `height` canvas
pub fn assert_canvas(header: &SmrfHeader, width: u16, height: u16) {
    assert_eq!(
        (header.width, header.height, header.cols, header.rows),
        (width, height, (width / 128) as u8, (height / 128) as u8),
        "Unexpected canvas in header {header}"
    );
}

/// Assert every payload byte is `index`
pub fn assert_uniform(payload: &[u8], index: u16) {
    let stray = payload.iter().position(|&b| b as u16 != index);
    assert_eq!(
        stray, None,
        "Expected every pixel to be index {index}, found {:?}",
        stray.map(|i| payload[i])
    );
}
