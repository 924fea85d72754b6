//! Scan engine behavior with rigged extractor registries: ranking, failure
//! isolation, the concurrency cap, and progress accounting.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use file_search::extract::Extractor;
use file_search::models::{Section, SectionKind};
use file_search::progress::{NoProgress, ProgressEvent, ScanProgress};
use file_search::registry::ExtractorRegistry;
use file_search::scan::{ScanOptions, Scanner};
use tempfile::TempDir;

/// One paragraph per line; panics on any file named `file07.txt`.
struct RiggedExtractor;

impl Extractor for RiggedExtractor {
    fn type_name(&self) -> &str {
        "Rigged"
    }

    fn extensions(&self) -> &[&str] {
        &[".txt"]
    }

    fn extract(&self, path: &Path, _max_sections: usize) -> Vec<Section> {
        if path.file_name().and_then(|n| n.to_str()) == Some("file07.txt") {
            panic!("rigged extractor failure");
        }
        let text = fs::read_to_string(path).unwrap_or_default();
        text.lines()
            .enumerate()
            .map(|(i, line)| Section::new((i + 1) as u32, SectionKind::Paragraph, line))
            .collect()
    }
}

/// Sleeps while tracking how many extractions run at once.
struct SlowExtractor {
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl Extractor for SlowExtractor {
    fn type_name(&self) -> &str {
        "Slow"
    }

    fn extensions(&self) -> &[&str] {
        &[".txt"]
    }

    fn extract(&self, _path: &Path, _max_sections: usize) -> Vec<Section> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(25));
        self.active.fetch_sub(1, Ordering::SeqCst);
        vec![Section::new(1, SectionKind::Paragraph, "needle")]
    }
}

#[derive(Default)]
struct Recorder(Mutex<Vec<ProgressEvent>>);

impl ScanProgress for Recorder {
    fn report(&self, event: ProgressEvent) {
        self.0.lock().unwrap().push(event);
    }
}

fn scanner_with(extractor: Box<dyn Extractor>, options: ScanOptions) -> Scanner {
    let mut registry = ExtractorRegistry::new();
    registry.register(extractor);
    Scanner::new(Arc::new(registry), options)
}

fn builtin_scanner() -> Scanner {
    Scanner::new(
        Arc::new(ExtractorRegistry::with_builtins()),
        ScanOptions::default(),
    )
}

/// `file00.txt` .. `file{n-1}.txt`, file i containing "needle" i % 4 times.
fn numbered_files(dir: &Path, n: usize) {
    for i in 0..n {
        let body = vec!["needle here"; i % 4].join("\n");
        fs::write(dir.join(format!("file{:02}.txt", i)), format!("header\n{}", body)).unwrap();
    }
}

#[tokio::test]
async fn panicking_file_is_dropped_and_others_survive() {
    let tmp = TempDir::new().unwrap();
    numbered_files(tmp.path(), 20);
    // file07 would have had 3 matches.
    let scanner = scanner_with(Box::new(RiggedExtractor), ScanOptions::default());

    let results = scanner
        .scan(tmp.path(), "needle", None, &NoProgress)
        .await
        .unwrap();

    let names: BTreeSet<String> = results.iter().map(|r| r.filename.clone()).collect();
    assert!(!names.contains("file07.txt"));
    let expected: BTreeSet<String> = (0..20)
        .filter(|i| i % 4 != 0 && *i != 7)
        .map(|i| format!("file{:02}.txt", i))
        .collect();
    assert_eq!(names, expected);
}

#[tokio::test]
async fn results_ranked_and_counts_consistent() {
    let tmp = TempDir::new().unwrap();
    numbered_files(tmp.path(), 12);
    let scanner = scanner_with(Box::new(RiggedExtractor), ScanOptions::default());
    let results = scanner
        .scan(tmp.path(), "needle", None, &NoProgress)
        .await
        .unwrap();

    assert!(!results.is_empty());
    for pair in results.windows(2) {
        assert!(pair[0].match_count >= pair[1].match_count);
    }
    for r in &results {
        assert!(!r.content_matches.is_empty());
        let sum: usize = r.content_matches.iter().map(|m| m.match_count).sum();
        assert_eq!(r.match_count, sum);
        assert_eq!(r.detected_type, "Rigged");
    }
    assert_eq!(results[0].match_count, 3);
}

#[tokio::test]
async fn scanning_twice_gives_same_hits() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("a.md"), "Rust rust RUST").unwrap();
    fs::write(tmp.path().join("b.txt"), "trust the rusty rust").unwrap();
    fs::create_dir(tmp.path().join("sub")).unwrap();
    fs::write(tmp.path().join("sub/c.log"), "no match").unwrap();

    let scanner = builtin_scanner();
    let first = scanner.scan(tmp.path(), "rust", None, &NoProgress).await.unwrap();
    let second = scanner.scan(tmp.path(), "rust", None, &NoProgress).await.unwrap();

    let pairs = |rs: &[file_search::models::SearchResult]| -> BTreeSet<(String, usize)> {
        rs.iter().map(|r| (r.filename.clone(), r.match_count)).collect()
    };
    assert_eq!(pairs(&first), pairs(&second));
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].filename, "a.md");
    assert_eq!(first[0].match_count, 3);
    assert_eq!(first[1].match_count, 1);
}

#[tokio::test]
async fn empty_directory_returns_no_results() {
    let tmp = TempDir::new().unwrap();
    let results = builtin_scanner()
        .scan(tmp.path(), "anything", None, &NoProgress)
        .await
        .unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn missing_root_returns_no_results() {
    let results = builtin_scanner()
        .scan(Path::new("/no/such/scan/root"), "x", None, &NoProgress)
        .await
        .unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn concurrency_never_exceeds_cap() {
    let tmp = TempDir::new().unwrap();
    for i in 0..12 {
        fs::write(tmp.path().join(format!("s{:02}.txt", i)), "x").unwrap();
    }
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let extractor = SlowExtractor {
        active: active.clone(),
        peak: peak.clone(),
    };
    let options = ScanOptions {
        max_concurrency: 3,
        ..ScanOptions::default()
    };
    let scanner = scanner_with(Box::new(extractor), options);

    let results = scanner
        .scan(tmp.path(), "needle", None, &NoProgress)
        .await
        .unwrap();
    assert_eq!(results.len(), 12);
    let peak = peak.load(Ordering::SeqCst);
    assert!(peak >= 1 && peak <= 3, "peak concurrency was {}", peak);
    assert_eq!(active.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn progress_counts_every_file_once_in_order() {
    let tmp = TempDir::new().unwrap();
    numbered_files(tmp.path(), 20);
    let scanner = scanner_with(Box::new(RiggedExtractor), ScanOptions::default());
    let recorder = Recorder::default();

    scanner
        .scan(tmp.path(), "needle", None, &recorder)
        .await
        .unwrap();

    let events = recorder.0.lock().unwrap();
    let counts: Vec<(u64, u64)> = events
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::Files { processed, total } => Some((*processed, *total)),
            _ => None,
        })
        .collect();
    let expected: Vec<(u64, u64)> = (1..=20).map(|n| (n, 20)).collect();
    assert_eq!(counts, expected);

    let notices: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::Notice { message, .. } => Some(message.as_str()),
            _ => None,
        })
        .collect();
    assert!(notices.iter().any(|m| m.starts_with("Processed 5/20")));
    assert!(notices.iter().any(|m| m.starts_with("Processed 20/20")));
    // 14 matching files: one partial summary at the 10th hit.
    assert_eq!(
        notices.iter().filter(|m| m.starts_with("Top results so far")).count(),
        1
    );
    assert!(notices.iter().any(|m| m.contains("file07.txt")));
}

#[tokio::test]
async fn section_cap_limits_matches() {
    let tmp = TempDir::new().unwrap();
    let body: Vec<String> = (0..200).map(|i| format!("line {} alpha", i)).collect();
    fs::write(tmp.path().join("long.txt"), body.join("\n")).unwrap();

    let options = ScanOptions {
        max_sections: 3,
        ..ScanOptions::default()
    };
    let scanner = Scanner::new(Arc::new(ExtractorRegistry::with_builtins()), options);
    let results = scanner
        .scan(tmp.path(), "alpha", None, &NoProgress)
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    let r = &results[0];
    assert_eq!(r.content_matches.len(), 3);
    // 3 chunks of 66 lines each; the last two lines are left out.
    assert_eq!(r.match_count, 198);
}

#[tokio::test]
async fn type_filter_restricts_scan() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("a.md"), "kiosk").unwrap();
    fs::write(tmp.path().join("b.pdf"), "not really a pdf, kiosk").unwrap();
    let results = builtin_scanner()
        .scan(tmp.path(), "kiosk", Some("text"), &NoProgress)
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].filename, "a.md");
}
