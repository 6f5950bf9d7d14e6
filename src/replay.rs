//! Replay source for pre-recorded point clouds.
//!
//! The replay file is line-oriented text: one point per line, four
//! whitespace-separated integers `x y z reflectivity` (millimetres and a
//! 0-255 intensity). Trailing columns beyond the first four are ignored;
//! header lines, comments or otherwise malformed lines are skipped with a
//! debug log so real capture exports can be fed in unmodified.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use crate::protocol::data::RawPoint;

pub struct ReplaySource {
    lines: Lines<BufReader<File>>,
    line_no: usize,
}

impl ReplaySource {
    /// Open a replay file. Failure here is fatal at startup.
    pub fn open(path: &Path) -> Result<Self, std::io::Error> {
        let file = File::open(path)?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
            line_no: 0,
        })
    }

    /// Next replayable point, or `None` once the file is exhausted.
    pub fn next_point(&mut self) -> Option<RawPoint> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => {
                    log::warn!("Replay read error, ending stream: {e}");
                    return None;
                }
            };
            self.line_no += 1;
            match parse_line(&line) {
                Some(point) => return Some(point),
                None => {
                    if !line.trim().is_empty() {
                        log::debug!("Skipping malformed replay line {}: {line:?}", self.line_no);
                    }
                }
            }
        }
    }
}

fn parse_line(line: &str) -> Option<RawPoint> {
    let mut fields = line.split_whitespace();
    let x_mm: i64 = fields.next()?.parse().ok()?;
    let y_mm: i64 = fields.next()?.parse().ok()?;
    let z_mm: i64 = fields.next()?.parse().ok()?;
    let reflectivity: i64 = fields.next()?.parse().ok()?;
    // Capture exports may carry extra columns (tag etc.); only the first
    // four matter.
    Some(RawPoint {
        x_mm,
        y_mm,
        z_mm,
        reflectivity: reflectivity.clamp(0, 255) as u8,
        tag: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn source_from(content: &str) -> ReplaySource {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        ReplaySource::open(file.path()).unwrap()
    }

    #[test]
    fn test_reads_points_in_order() {
        let mut source = source_from("1 2 3 4\n-5 6 -7 8\n");
        assert_eq!(
            source.next_point().unwrap(),
            RawPoint {
                x_mm: 1,
                y_mm: 2,
                z_mm: 3,
                reflectivity: 4,
                tag: 0
            }
        );
        assert_eq!(source.next_point().unwrap().x_mm, -5);
        assert_eq!(source.next_point(), None);
        assert_eq!(source.next_point(), None);
    }

    #[test]
    fn test_skips_header_and_malformed_lines() {
        let mut source = source_from("x y z refl\n\n1 2 3 4\n1 2 3\nfoo bar baz qux\n9 9 9 9\n");
        assert_eq!(source.next_point().unwrap().x_mm, 1);
        assert_eq!(source.next_point().unwrap().x_mm, 9);
        assert_eq!(source.next_point(), None);
    }

    #[test]
    fn test_extra_columns_ignored() {
        let mut source = source_from("1 2 3 4 0\n5 6 7 8 0\n");
        assert_eq!(
            source.next_point().unwrap(),
            RawPoint {
                x_mm: 1,
                y_mm: 2,
                z_mm: 3,
                reflectivity: 4,
                tag: 0
            }
        );
        assert_eq!(source.next_point().unwrap().x_mm, 5);
        assert_eq!(source.next_point(), None);
    }

    #[test]
    fn test_reflectivity_clamped() {
        let mut source = source_from("0 0 0 999\n0 0 0 -5\n");
        assert_eq!(source.next_point().unwrap().reflectivity, 255);
        assert_eq!(source.next_point().unwrap().reflectivity, 0);
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(ReplaySource::open(Path::new("/nonexistent/replay.txt")).is_err());
    }
}
