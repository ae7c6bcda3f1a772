use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

pub const POSTS_FILE: &str = "agit_posts.ndjson";
pub const ACTIONS_FILE: &str = "qc_weekly_actions.ndjson";
pub const UNDERPERFORMING_FILE: &str = "underperforming_weekly.ndjson";
pub const EDUCATION_FILE: &str = "education_records.ndjson";

pub fn stream_path(out_dir: &Path, file_name: &str) -> PathBuf {
    out_dir.join(file_name)
}

/// One compact JSON object per line. Non-ASCII text is written as-is.
pub fn write_ndjson<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    for record in records {
        serde_json::to_writer(&mut writer, record)
            .with_context(|| format!("serialize record for {}", path.display()))?;
        writer.write_all(b"\n")?;
    }

    writer.flush()?;
    info!(path = %path.display(), count = records.len(), "ndjson written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[derive(Serialize)]
    struct Row {
        center: &'static str,
        count: u32,
    }

    #[test]
    fn writes_one_object_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = stream_path(&dir.path().join("out"), UNDERPERFORMING_FILE);
        let rows = [
            Row { center: "용산", count: 2 },
            Row { center: "광주", count: 0 },
        ];

        write_ndjson(&path, &rows).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("용산"));
        let second: Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["center"], "광주");
        assert_eq!(second["count"], 0);
    }

    #[test]
    fn empty_stream_still_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = stream_path(dir.path(), POSTS_FILE);
        write_ndjson::<Row>(&path, &[]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }
}
