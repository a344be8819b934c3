//! Optional debug dumps of raw feed payloads

use crate::FeedSource;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// `<dir>/<feed>_disasters.json`
pub fn dump_path(dir: &Path, feed: FeedSource) -> PathBuf {
    dir.join(format!("{}_disasters.json", feed.slug()))
}

/// Write the raw records a feed returned. Failures are logged and ignored.
pub fn write_raw(dir: Option<&Path>, feed: FeedSource, records: &[serde_json::Value]) {
    let Some(dir) = dir else {
        return;
    };

    let path = dump_path(dir, feed);
    let result = fs::create_dir_all(dir)
        .and_then(|_| File::create(&path))
        .and_then(|file| {
            serde_json::to_writer_pretty(BufWriter::new(file), records).map_err(std::io::Error::from)
        });

    match result {
        Ok(()) => debug!(feed = %feed, path = %path.display(), count = records.len(), "Dumped raw feed records"),
        Err(e) => warn!(feed = %feed, path = %path.display(), "Could not dump raw feed records: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_write_raw_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![json!({"title": "Flood"})];

        write_raw(Some(dir.path()), FeedSource::NasaEonet, &records);

        let path = dir.path().join("nasa_eonet_disasters.json");
        let written: Vec<serde_json::Value> =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written, records);
    }

    #[test]
    fn test_write_raw_without_dir_is_noop() {
        write_raw(None, FeedSource::ReliefWeb, &[json!({})]);
    }
}
