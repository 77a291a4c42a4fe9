/// Benchmarks for parsing, fingerprinting and change detection
use code_insight::changes::{DetectOptions, detect_changes};
use code_insight::indexer::{FileWalker, fingerprint, parse_files};
use code_insight::snapshot::Snapshot;
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use tempfile::TempDir;

/// Helper to create test files
fn create_test_files(dir: &TempDir, count: usize, revision: usize) -> anyhow::Result<()> {
    let src_dir = dir.path().join("pkg");
    std::fs::create_dir_all(&src_dir)?;

    for i in 0..count {
        // Every tenth module changes one method body between revisions
        let factor = if i % 10 == 0 { revision + 2 } else { 2 };
        let content = format!(
            r#"
def function_{i}(x):
    return x * {i}


class Data{i}:
    """Holds value number {i}."""

    def __init__(self, value):
        self.value = value
        self.name = "data_" + str(value)

    def process(self):
        return self.value * {factor}

    @property
    def label(self):
        return self.name.upper()
"#
        );
        std::fs::write(src_dir.join(format!("module_{}.py", i)), content)?;
    }

    Ok(())
}

fn snapshot_of(dir: &TempDir) -> Snapshot {
    let files = FileWalker::new(dir.path(), 1_048_576).walk().unwrap();
    let mut snapshot = Snapshot::default();
    for parse in parse_files(files) {
        if let Ok(parsed) = parse.result {
            snapshot.insert(parse.file.relative_path, fingerprint(&parsed));
        }
    }
    snapshot
}

fn benchmark_parse_and_fingerprint(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_and_fingerprint");

    for file_count in [10, 50, 100].iter() {
        let codebase_dir = TempDir::new().unwrap();
        create_test_files(&codebase_dir, *file_count, 0).unwrap();

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_files", file_count)),
            file_count,
            |b, _| b.iter(|| snapshot_of(black_box(&codebase_dir))),
        );
    }

    group.finish();
}

fn benchmark_detect_changes(c: &mut Criterion) {
    let mut group = c.benchmark_group("detect_changes");

    for file_count in [100, 500].iter() {
        let before_dir = TempDir::new().unwrap();
        let after_dir = TempDir::new().unwrap();
        create_test_files(&before_dir, *file_count, 0).unwrap();
        create_test_files(&after_dir, *file_count, 1).unwrap();

        let before = snapshot_of(&before_dir);
        let after = snapshot_of(&after_dir);

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_files", file_count)),
            file_count,
            |b, _| {
                b.iter(|| {
                    detect_changes(
                        black_box(&before),
                        black_box(&after),
                        DetectOptions::default(),
                    )
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_parse_and_fingerprint, benchmark_detect_changes);
criterion_main!(benches);
