//! Metadata sanitization policy.
//!
//! Turns the track list of a container into the set of name overrides to
//! apply, and computes the cleaned file name. Nothing here touches the
//! filesystem or spawns a process.

use std::ffi::{OsStr, OsString};
use std::path::Path;
use regex::Regex;
use serde::{Deserialize, Serialize};
use crate::config::CleanerConfig;

/// `www.<label>[-.<label>]*.<tld>` plus any trailing separator
const SITE_PATTERN: &str = r"(?i)\bwww\.[a-z0-9]+(?:[-.][a-z0-9]+)*\.[a-z]{2,}\b\s*-?\s*";

/// Kind of an elementary stream inside a container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TrackKind {
    Video,
    Audio,
    Subtitles,
    Other(String),
}

impl From<String> for TrackKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "video" => TrackKind::Video,
            "audio" => TrackKind::Audio,
            "subtitles" => TrackKind::Subtitles,
            _ => TrackKind::Other(kind),
        }
    }
}

impl From<TrackKind> for String {
    fn from(kind: TrackKind) -> Self {
        match kind {
            TrackKind::Video => "video".to_string(),
            TrackKind::Audio => "audio".to_string(),
            TrackKind::Subtitles => "subtitles".to_string(),
            TrackKind::Other(other) => other,
        }
    }
}

/// One track as reported by a single inspection of a single file.
///
/// `id` is only meaningful for that inspection; a rewrite may renumber tracks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackMetadata {
    pub id: u32,
    pub kind: TrackKind,
    pub name: Option<String>,
}

/// Replace the name of one track. An empty `name` clears it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackDirective {
    pub track_id: u32,
    pub name: String,
}

impl TrackDirective {
    pub fn clear(track_id: u32) -> Self {
        Self {
            track_id,
            name: String::new(),
        }
    }

    pub fn is_clear(&self) -> bool {
        self.name.is_empty()
    }
}

/// Everything needed to rewrite one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizationPlan {
    /// Ordered like the inspected tracks; tracks without a directive are copied through
    pub directives: Vec<TrackDirective>,
    /// New global title. Always empty.
    pub title: String,
    /// Cleaned file name, extension included
    pub file_name: OsString,
}

/// Owns the compiled site pattern and the naming toggles
#[derive(Debug, Clone)]
pub struct Sanitizer {
    site_pattern: Regex,
    remove_site_prefix: bool,
    add_clean_suffix: bool,
    clean_marker: String,
}

impl Sanitizer {
    pub fn new(
        remove_site_prefix: bool,
        add_clean_suffix: bool,
        clean_marker: impl Into<String>,
    ) -> Self {
        Self {
            site_pattern: Regex::new(SITE_PATTERN).expect("site pattern is a valid regex"),
            remove_site_prefix,
            add_clean_suffix,
            clean_marker: clean_marker.into(),
        }
    }

    pub fn from_config(cfg: &CleanerConfig) -> Self {
        Self::new(cfg.remove_site_prefix, cfg.add_clean_suffix, cfg.clean_marker.clone())
    }

    /// Remove every site advertisement from `text` and trim the result
    pub fn strip_site(&self, text: &str) -> String {
        self.site_pattern.replace_all(text, "").trim().to_string()
    }

    pub fn has_site(&self, text: &str) -> bool {
        self.site_pattern.is_match(text)
    }

    /// Compute the cleaned file name for `file_name`
    pub fn clean_filename(&self, file_name: &str) -> String {
        let (stem, ext) = split_extension(file_name);

        let mut stem = if self.remove_site_prefix {
            self.strip_site(stem)
        } else {
            stem.to_string()
        };

        if self.add_clean_suffix && !self.clean_marker.is_empty() && !self.has_marker(&stem) {
            stem = if stem.is_empty() {
                self.clean_marker.clone()
            } else {
                format!("{} {}", stem, self.clean_marker)
            };
        }

        format!("{}{}", stem, ext)
    }

    /// Like [`Sanitizer::clean_filename`], but keeps names that are not valid
    /// UTF-8 byte for byte. Such names only get the marker appended.
    pub fn clean_os_filename(&self, file_name: &OsStr) -> OsString {
        if let Some(name) = file_name.to_str() {
            return OsString::from(self.clean_filename(name));
        }

        let path = Path::new(file_name);
        let stem = path.file_stem().unwrap_or(file_name);
        if !self.add_clean_suffix
            || self.clean_marker.is_empty()
            || self.has_marker(&stem.to_string_lossy())
        {
            return file_name.to_os_string();
        }

        let mut cleaned = stem.to_os_string();
        cleaned.push(" ");
        cleaned.push(&self.clean_marker);
        if let Some(ext) = path.extension() {
            cleaned.push(".");
            cleaned.push(ext);
        }
        cleaned
    }

    fn has_marker(&self, stem: &str) -> bool {
        stem.to_lowercase()
            .ends_with(&format!(" {}", self.clean_marker.to_lowercase()))
            || stem.eq_ignore_ascii_case(&self.clean_marker)
    }

    /// Build the rewrite plan for one file
    pub fn plan(
        &self,
        file_name: impl AsRef<OsStr>,
        tracks: &[TrackMetadata],
    ) -> SanitizationPlan {
        let directives = tracks
            .iter()
            .filter_map(|track| self.directive_for(track))
            .collect();

        SanitizationPlan {
            directives,
            title: String::new(),
            file_name: self.clean_os_filename(file_name.as_ref()),
        }
    }

    fn directive_for(&self, track: &TrackMetadata) -> Option<TrackDirective> {
        let name = track.name.as_deref().filter(|n| !n.is_empty());

        match (&track.kind, name) {
            (TrackKind::Video, Some(_)) => Some(TrackDirective::clear(track.id)),
            (TrackKind::Subtitles, _) => Some(TrackDirective::clear(track.id)),
            (TrackKind::Audio, Some(name)) => {
                // Keep legitimate labels such as language or commentary names
                if !self.has_site(name) {
                    return None;
                }
                let stripped = self.strip_site(name);
                (stripped != name).then_some(TrackDirective {
                    track_id: track.id,
                    name: stripped,
                })
            }
            _ => None,
        }
    }
}

/// Split `name` into stem and extension (with dot). Leading dots do not start an extension.
fn split_extension(name: &str) -> (&str, &str) {
    let ext_start = Path::new(name)
        .extension()
        .map(|ext| name.len() - ext.len() - 1);

    match ext_start {
        Some(idx) => name.split_at(idx),
        None => (name, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sanitizer() -> Sanitizer {
        Sanitizer::new(true, true, "clean")
    }

    fn track(id: u32, kind: TrackKind, name: Option<&str>) -> TrackMetadata {
        TrackMetadata {
            id,
            kind,
            name: name.map(str::to_string),
        }
    }

    #[test]
    fn test_clean_filename_strips_site_and_appends_marker() {
        let s = sanitizer();
        assert_eq!(s.clean_filename("www.example.com - Movie.mkv"), "Movie clean.mkv");
        assert_eq!(
            s.clean_filename("WWW.Some-Site.co.uk Movie (2020).mkv"),
            "Movie (2020) clean.mkv"
        );
        assert_eq!(s.clean_filename("Movie.mkv"), "Movie clean.mkv");
    }

    #[test]
    fn test_clean_filename_toggles() {
        let strip_only = Sanitizer::new(true, false, "clean");
        assert_eq!(strip_only.clean_filename("www.example.com - Movie.mkv"), "Movie.mkv");

        let marker_only = Sanitizer::new(false, true, "clean");
        assert_eq!(
            marker_only.clean_filename("www.example.com - Movie.mkv"),
            "www.example.com - Movie clean.mkv"
        );

        let neither = Sanitizer::new(false, false, "clean");
        assert_eq!(
            neither.clean_filename("www.example.com - Movie.mkv"),
            "www.example.com - Movie.mkv"
        );
    }

    #[test]
    fn test_marker_not_appended_twice() {
        let s = sanitizer();
        assert_eq!(s.clean_filename("Movie clean.mkv"), "Movie clean.mkv");
        assert_eq!(s.clean_filename("Movie CLEAN.mkv"), "Movie CLEAN.mkv");
        assert_eq!(s.clean_filename("Unclean.mkv"), "Unclean clean.mkv");
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_name_keeps_its_bytes() {
        use std::os::unix::ffi::{OsStrExt, OsStringExt};

        let s = sanitizer();
        let name = OsStr::from_bytes(b"www.example.com - caf\xe9.mkv");
        assert_eq!(
            s.clean_os_filename(name).into_vec(),
            b"www.example.com - caf\xe9 clean.mkv".to_vec()
        );

        let marked = OsStr::from_bytes(b"caf\xe9 clean.mkv");
        assert_eq!(s.clean_os_filename(marked), marked);

        let neither = Sanitizer::new(true, false, "clean");
        assert_eq!(neither.clean_os_filename(name), name);
    }

    #[test]
    fn test_site_needs_two_letter_tld() {
        let s = sanitizer();
        assert_eq!(s.strip_site("www.example.c Movie"), "www.example.c Movie");
        assert_eq!(s.strip_site("wwwexample.com Movie"), "wwwexample.com Movie");
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("a.b.mkv"), ("a.b", ".mkv"));
        assert_eq!(split_extension("noext"), ("noext", ""));
        assert_eq!(split_extension(".hidden"), (".hidden", ""));
    }

    #[test]
    fn test_track_directives() {
        let s = sanitizer();
        let tracks = vec![
            track(0, TrackKind::Video, Some("Movie")),
            track(1, TrackKind::Audio, Some("www.example.com - English")),
            track(2, TrackKind::Audio, Some("Director's Commentary")),
            track(3, TrackKind::Subtitles, None),
            track(4, TrackKind::Subtitles, Some("English (forced)")),
            track(5, TrackKind::Video, None),
            track(6, TrackKind::Other("buttons".to_string()), Some("www.example.com")),
        ];

        let plan = s.plan("www.example.com - Movie.mkv", &tracks);
        assert_eq!(
            plan.directives,
            vec![
                TrackDirective::clear(0),
                TrackDirective { track_id: 1, name: "English".to_string() },
                TrackDirective::clear(3),
                TrackDirective::clear(4),
            ]
        );
        assert_eq!(plan.title, "");
        assert_eq!(plan.file_name, "Movie clean.mkv");
    }

    #[test]
    fn test_audio_name_that_is_only_a_site_is_cleared() {
        let s = sanitizer();
        let plan = s.plan("a.mkv", &[track(1, TrackKind::Audio, Some("www.example.com"))]);
        assert_eq!(plan.directives, vec![TrackDirective::clear(1)]);
        assert!(plan.directives[0].is_clear());
    }

    #[test]
    fn test_track_kind_round_trips_unknown_names() {
        let kind: TrackKind = serde_json::from_str("\"buttons\"").unwrap();
        assert_eq!(kind, TrackKind::Other("buttons".to_string()));
        let kind: TrackKind = serde_json::from_str("\"subtitles\"").unwrap();
        assert_eq!(kind, TrackKind::Subtitles);
    }

    fn track_kind() -> impl Strategy<Value = TrackKind> {
        prop_oneof![
            Just(TrackKind::Video),
            Just(TrackKind::Audio),
            Just(TrackKind::Subtitles),
            Just(TrackKind::Other("buttons".to_string())),
        ]
    }

    fn track_name() -> impl Strategy<Value = Option<String>> {
        prop_oneof![
            Just(None),
            Just(Some(String::new())),
            "[A-Za-z ()']{1,20}".prop_map(Some),
            ("[a-z]{2,8}", "[a-z]{2,4}", "[A-Za-z ]{0,12}")
                .prop_map(|(label, tld, rest)| Some(format!("www.{}.{} - {}", label, tld, rest))),
        ]
    }

    fn tracks() -> impl Strategy<Value = Vec<TrackMetadata>> {
        prop::collection::vec((track_kind(), track_name()), 0..8).prop_map(|entries| {
            entries
                .into_iter()
                .enumerate()
                .map(|(id, (kind, name))| TrackMetadata { id: id as u32, kind, name })
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Same input always yields the same plan
        #[test]
        fn test_plan_is_deterministic(tracks in tracks(), name in "[A-Za-z0-9 .-]{1,30}\\.mkv") {
            let s = sanitizer();
            prop_assert_eq!(s.plan(&name, &tracks), s.plan(&name, &tracks));
            prop_assert_eq!(s.plan(&name, &tracks), sanitizer().plan(&name, &tracks));
        }

        /// Cleaning an already cleaned name changes nothing
        #[test]
        fn test_clean_filename_is_idempotent(
            label in "[a-z0-9]{1,10}",
            tld in "[a-z]{2,4}",
            separator in prop_oneof![Just(" - "), Just(" "), Just("-"), Just(" -")],
            title in "[A-Z][a-z]{1,10}( [A-Za-z0-9]{1,8}){0,3}",
            remove in prop::bool::ANY,
            append in prop::bool::ANY,
        ) {
            let s = Sanitizer::new(remove, append, "clean");
            let name = format!("www.{}.{}{}{}.mkv", label, tld, separator, title);
            let once = s.clean_filename(&name);
            prop_assert_eq!(s.clean_filename(&once), once);
        }

        /// Audio names without a site are never touched
        #[test]
        fn test_plain_audio_names_left_alone(name in "[A-Za-z0-9 ()']{1,30}") {
            let s = sanitizer();
            let plan = s.plan("a.mkv", &[track(7, TrackKind::Audio, Some(&name))]);
            prop_assert!(plan.directives.is_empty());
        }

        /// Subtitles are always cleared
        #[test]
        fn test_subtitles_always_cleared(name in track_name(), id in 0u32..64) {
            let s = sanitizer();
            let plan = s.plan("a.mkv", &[TrackMetadata { id, kind: TrackKind::Subtitles, name }]);
            prop_assert_eq!(plan.directives, vec![TrackDirective::clear(id)]);
        }

        /// The global title is always cleared
        #[test]
        fn test_title_always_cleared(tracks in tracks()) {
            prop_assert_eq!(sanitizer().plan("a.mkv", &tracks).title, "");
        }
    }
}
