//! Concat-demuxer manifest for the still images.
//!
//! Each segment becomes a `file` line followed by a `duration` line. The
//! demuxer ignores the duration of the last entry, so the final image is
//! listed once more on its own with no duration line.

use std::path::Path;

use crate::timeline::TimelineSegment;

/// Quote a path for a `file` directive: `'` becomes `'\''`.
fn quote_path(path: &Path) -> String {
    let raw = path.to_string_lossy();
    format!("'{}'", raw.replace('\'', r"'\''"))
}

/// Render the manifest text for `segments`, in order.
pub fn render_manifest(segments: &[TimelineSegment]) -> String {
    let mut manifest = String::new();

    for segment in segments {
        manifest.push_str(&format!("file {}\n", quote_path(&segment.image_path)));
        manifest.push_str(&format!("duration {}\n", segment.duration_seconds));
    }

    if let Some(last) = segments.last() {
        manifest.push_str(&format!("file {}\n", quote_path(&last.image_path)));
    }

    manifest
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn segment(path: &str, duration: f64) -> TimelineSegment {
        TimelineSegment {
            image_path: PathBuf::from(path),
            duration_seconds: duration,
        }
    }

    #[test]
    fn test_empty_manifest() {
        assert_eq!(render_manifest(&[]), "");
    }

    #[test]
    fn test_two_segments() {
        let manifest = render_manifest(&[
            segment("/scratch/image_000.png", 15.0),
            segment("/scratch/image_001.png", 15.0),
        ]);
        assert_eq!(
            manifest,
            "file '/scratch/image_000.png'\n\
             duration 15\n\
             file '/scratch/image_001.png'\n\
             duration 15\n\
             file '/scratch/image_001.png'\n"
        );
    }

    #[test]
    fn test_one_duration_line_per_segment() {
        let segments: Vec<_> = (0..5)
            .map(|i| segment(&format!("/s/{}.png", i), 6.0))
            .collect();
        let manifest = render_manifest(&segments);
        let durations = manifest.lines().filter(|l| l.starts_with("duration ")).count();
        let files = manifest.lines().filter(|l| l.starts_with("file ")).count();
        assert_eq!(durations, 5);
        assert_eq!(files, 6);
        assert!(manifest.lines().last().unwrap().starts_with("file "));
    }

    #[test]
    fn test_fractional_durations_are_not_rounded() {
        let manifest = render_manifest(&[segment("/a.png", 30.0 / 7.0)]);
        assert!(manifest.contains(&format!("duration {}\n", 30.0 / 7.0)));
        assert!(manifest.contains("duration 4.2857142857"));
    }

    #[test]
    fn test_single_quotes_are_escaped() {
        let manifest = render_manifest(&[segment("/tmp/fox's den.png", 1.0)]);
        assert!(manifest.starts_with(r"file '/tmp/fox'\''s den.png'"));
    }
}
