use super::*;
use crate::indexer::{AstParser, SourceLanguage};
use crate::llm::Prompt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Echoes the first line of the snippet; fails for sources containing "boom"
struct ScriptedGenerator {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedGenerator {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &Prompt) -> Result<String, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if prompt.user.contains("boom") {
            return Err(CollaboratorError::Llm("scripted failure".to_string()));
        }
        let first_line = prompt
            .user
            .lines()
            .find(|l| l.starts_with("def ") || l.starts_with("class "))
            .unwrap_or("?");
        Ok(format!("Summary of {}", first_line))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

struct SlowGenerator;

#[async_trait::async_trait]
impl TextGenerator for SlowGenerator {
    async fn generate(&self, _prompt: &Prompt) -> Result<String, CollaboratorError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok("too late".to_string())
    }

    fn model_name(&self) -> &str {
        "slow"
    }
}

fn config(max_concurrent: usize, rpm: u32) -> SummarizerConfig {
    SummarizerConfig {
        max_concurrent,
        requests_per_minute: rpm,
    }
}

fn task(name: &str, source: &str) -> SummaryTask {
    SummaryTask {
        kind: UnitKind::Function,
        file_path: "a.py".to_string(),
        class_name: None,
        name: name.to_string(),
        source: source.to_string(),
        class_docstring: None,
    }
}

fn change(kind: UnitKind, class: Option<&str>, name: &str, change_type: ChangeKind) -> ChangeRecord {
    ChangeRecord {
        file_path: "a.py".to_string(),
        item_type: kind,
        item_name: name.to_string(),
        class_name: class.map(str::to_string),
        change_type,
    }
}

fn parsed(source: &str) -> BTreeMap<String, ParsedFile> {
    let mut parser = AstParser::new(SourceLanguage::Python).unwrap();
    let file = parser.parse_source("a.py", source).unwrap();
    [("a.py".to_string(), file)].into()
}

const SOURCE: &str = r#"def foo():
    return 1

class Widget:
    """Draws things."""

    def render(self):
        return 2
"#;

// ===== Task planning =====

#[test]
fn test_plan_tasks_skips_removed_and_unknown() {
    let changes = vec![
        change(UnitKind::Function, None, "foo", ChangeKind::Modified),
        change(UnitKind::Function, None, "gone", ChangeKind::Removed),
        change(UnitKind::Function, None, "ghost", ChangeKind::Added),
        change(UnitKind::Method, Some("Widget"), "render", ChangeKind::Added),
    ];

    let tasks = plan_tasks(&changes, &parsed(SOURCE));
    let ids: Vec<String> = tasks.iter().map(|t| t.unit_id().to_string()).collect();
    assert_eq!(ids, vec!["a.py::foo", "a.py::Widget::render"]);

    assert_eq!(tasks[0].source, "def foo():\n    return 1\n");
    assert_eq!(tasks[1].class_docstring.as_deref(), Some("Draws things."));
    assert!(tasks[1].source.starts_with("    def render(self):"));
}

#[test]
fn test_plan_tasks_uses_whole_class_source() {
    let changes = vec![change(UnitKind::Class, None, "Widget", ChangeKind::Added)];
    let tasks = plan_tasks(&changes, &parsed(SOURCE));

    assert_eq!(tasks.len(), 1);
    assert!(tasks[0].source.contains("def render"));
    assert_eq!(tasks[0].class_docstring, None);
}

// ===== Rate limiting =====

#[test]
fn test_rate_limiter_interval() {
    assert_eq!(RateLimiter::per_minute(0).interval(), None);
    assert_eq!(
        RateLimiter::per_minute(60).interval(),
        Some(Duration::from_secs(1))
    );
    assert_eq!(
        RateLimiter::per_minute(600).interval(),
        Some(Duration::from_millis(100))
    );
}

#[tokio::test]
async fn test_rate_limiter_spaces_calls() {
    let limiter = RateLimiter::per_minute(1200); // 50ms
    let start = std::time::Instant::now();
    for _ in 0..3 {
        limiter.acquire().await;
    }
    assert!(start.elapsed() >= Duration::from_millis(100));
}

#[tokio::test]
async fn test_unlimited_rate_limiter_does_not_wait() {
    let limiter = RateLimiter::per_minute(0);
    let start = std::time::Instant::now();
    for _ in 0..100 {
        limiter.acquire().await;
    }
    assert!(start.elapsed() < Duration::from_millis(50));
}

// ===== Summarization =====

#[tokio::test]
async fn test_failures_become_sentinel() {
    let generator = Arc::new(ScriptedGenerator::new());
    let summarizer = Summarizer::new(generator.clone(), &config(2, 0), &LlmConfig::default());

    let batch = summarizer
        .summarize_all(vec![
            task("ok", "def ok():\n    pass\n"),
            task("bad", "def bad():\n    boom()\n"),
        ])
        .await;

    assert_eq!(batch.records.len(), 2);
    assert_eq!(batch.generated(), 1);
    assert_eq!(batch.failures.len(), 1);
    assert_eq!(batch.failures[0].0, "a.py::bad");

    // sorted by id
    assert_eq!(batch.records[0].name, "bad");
    assert_eq!(batch.records[0].summary, SUMMARY_UNAVAILABLE);
    assert_eq!(batch.records[1].summary, "Summary of def ok():");
}

#[tokio::test]
async fn test_concurrency_is_bounded() {
    let generator = Arc::new(ScriptedGenerator::new());
    let summarizer = Summarizer::new(generator.clone(), &config(3, 0), &LlmConfig::default());

    let tasks: Vec<SummaryTask> = (0..10)
        .map(|i| task(&format!("f{}", i), &format!("def f{}():\n    pass\n", i)))
        .collect();
    let batch = summarizer.summarize_all(tasks).await;

    assert_eq!(batch.records.len(), 10);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 10);
    assert!(generator.max_in_flight.load(Ordering::SeqCst) <= 3);
}

#[tokio::test]
async fn test_timeout_is_a_failure() {
    let llm = LlmConfig {
        timeout_secs: 1,
        ..Default::default()
    };
    let summarizer = Summarizer::new(Arc::new(SlowGenerator), &config(1, 0), &llm);

    let (summary, failure) = summarizer.summarize(&task("f", "def f():\n    pass\n")).await;
    assert_eq!(summary, SUMMARY_UNAVAILABLE);
    assert!(failure.unwrap().contains("timed out"));
}

#[tokio::test]
async fn test_empty_batch() {
    let summarizer = Summarizer::new(
        Arc::new(ScriptedGenerator::new()),
        &config(4, 50),
        &LlmConfig::default(),
    );
    let batch = summarizer.summarize_all(Vec::new()).await;
    assert!(batch.records.is_empty());
    assert_eq!(batch.generated(), 0);
}
