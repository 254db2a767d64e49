//! Renditions: the concrete encoded variants of a source video, and the
//! pure selection helpers the format dialog is built on.

use std::cmp::Ordering;
use std::collections::HashMap;

/// One encoded variant of a source video.
///
/// Produced by extraction, consumed by the format dialog and the fetcher.
/// Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendition {
    /// Direct media URL for this variant
    pub source_url: String,
    /// Container/extension, e.g. "mp4", "webm", "m4a"
    pub container: String,
    /// Quality label, e.g. "1080p", "720p60", "audio"
    pub quality_label: String,
    pub has_audio: bool,
    pub has_video: bool,
    /// Reported bitrate in kbit/s, when known
    pub bitrate: Option<f64>,
}

impl Rendition {
    pub fn is_audio_only(&self) -> bool {
        self.has_audio && !self.has_video
    }

    /// Numeric rank of the quality label: leading digits, 0 when absent.
    /// "1080p" → 1080, "720p60" → 720, "audio" → 0.
    pub fn quality_rank(&self) -> u32 {
        let digits: String = self.quality_label.chars().take_while(|c| c.is_ascii_digit()).collect();
        digits.parse().unwrap_or(0)
    }
}

/// The single best audio-only rendition (highest bitrate), if any exists.
pub fn best_audio(renditions: &[Rendition]) -> Option<Rendition> {
    renditions
        .iter()
        .filter(|r| r.is_audio_only())
        .max_by(|a, b| compare_bitrate(a, b))
        .cloned()
}

/// Video candidates for the quality menu: keep renditions carrying a video
/// track, deduplicate by quality label (preferring the variant that already
/// includes an audio track, which avoids the merge step) and sort descending
/// by numeric quality.
///
/// Idempotent: running it on its own output yields the same list.
pub fn video_candidates(renditions: &[Rendition]) -> Vec<Rendition> {
    let mut by_label: HashMap<&str, &Rendition> = HashMap::new();

    for candidate in renditions.iter().filter(|r| r.has_video) {
        match by_label.get(candidate.quality_label.as_str()) {
            None => {
                by_label.insert(&candidate.quality_label, candidate);
            }
            Some(existing) => {
                let replace = match (existing.has_audio, candidate.has_audio) {
                    (false, true) => true,
                    (true, false) => false,
                    _ => compare_bitrate(candidate, existing) == Ordering::Greater,
                };
                if replace {
                    by_label.insert(&candidate.quality_label, candidate);
                }
            }
        }
    }

    let mut candidates: Vec<Rendition> = by_label.into_values().cloned().collect();
    candidates.sort_by(|a, b| {
        b.quality_rank()
            .cmp(&a.quality_rank())
            .then_with(|| a.quality_label.cmp(&b.quality_label))
    });
    candidates
}

fn compare_bitrate(a: &Rendition, b: &Rendition) -> Ordering {
    a.bitrate
        .unwrap_or(0.0)
        .partial_cmp(&b.bitrate.unwrap_or(0.0))
        .unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendition(label: &str, has_audio: bool, has_video: bool, bitrate: Option<f64>) -> Rendition {
        Rendition {
            source_url: format!("https://cdn.example/{}-{}", label, has_audio),
            container: if has_video { "mp4".into() } else { "m4a".into() },
            quality_label: label.to_string(),
            has_audio,
            has_video,
            bitrate,
        }
    }

    #[test]
    fn test_quality_rank_parses_leading_digits() {
        assert_eq!(rendition("1080p", true, true, None).quality_rank(), 1080);
        assert_eq!(rendition("720p60", false, true, None).quality_rank(), 720);
        assert_eq!(rendition("audio", true, false, None).quality_rank(), 0);
    }

    #[test]
    fn test_best_audio_picks_highest_bitrate_audio_only() {
        let renditions = vec![
            rendition("audio", true, false, Some(64.0)),
            rendition("audio", true, false, Some(128.0)),
            rendition("1080p", true, true, Some(4000.0)), // not audio-only
        ];
        let best = best_audio(&renditions).unwrap();
        assert_eq!(best.bitrate, Some(128.0));
        assert!(best.is_audio_only());
    }

    #[test]
    fn test_best_audio_none_when_no_audio_only_rendition() {
        let renditions = vec![rendition("720p", true, true, Some(2000.0))];
        assert!(best_audio(&renditions).is_none());
    }

    #[test]
    fn test_video_candidates_prefers_variant_with_audio() {
        let renditions = vec![
            rendition("720p", false, true, Some(2500.0)),
            rendition("720p", true, true, Some(2000.0)),
        ];
        let candidates = video_candidates(&renditions);
        assert_eq!(candidates.len(), 1);
        // The muxed variant wins even at a lower bitrate: no merge needed.
        assert!(candidates[0].has_audio);
    }

    #[test]
    fn test_video_candidates_sorted_descending() {
        let renditions = vec![
            rendition("360p", true, true, None),
            rendition("1080p", false, true, None),
            rendition("720p", true, true, None),
        ];
        let labels: Vec<_> = video_candidates(&renditions)
            .into_iter()
            .map(|r| r.quality_label)
            .collect();
        assert_eq!(labels, vec!["1080p", "720p", "360p"]);
    }

    #[test]
    fn test_video_candidates_excludes_audio_only() {
        let renditions = vec![
            rendition("audio", true, false, Some(128.0)),
            rendition("480p", true, true, None),
        ];
        let candidates = video_candidates(&renditions);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].quality_label, "480p");
    }

    #[test]
    fn test_video_candidates_is_idempotent() {
        let renditions = vec![
            rendition("1080p", false, true, Some(4500.0)),
            rendition("1080p", true, true, Some(4000.0)),
            rendition("720p", false, true, Some(2500.0)),
            rendition("360p", true, true, Some(800.0)),
            rendition("audio", true, false, Some(128.0)),
        ];
        let once = video_candidates(&renditions);
        let twice = video_candidates(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_video_candidates_bitrate_tiebreak_within_same_audio_presence() {
        let renditions = vec![
            rendition("720p", false, true, Some(1800.0)),
            rendition("720p", false, true, Some(2600.0)),
        ];
        let candidates = video_candidates(&renditions);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].bitrate, Some(2600.0));
    }
}
