use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

// Writes a model of `size` tristates, nested ten levels deep,
// each depending on the one declared before it.
fn synthetic_model(base: &Path, size: usize) -> std::io::Result<()> {
    let mut dimacs = String::new();
    let mut rsf = String::new();
    for i in 0..size {
        let _ = writeln!(dimacs, "c {} SYM{i}", 2 * i + 1);
        let _ = writeln!(dimacs, "c {} SYM{i}_MODULE", 2 * i + 2);
        let _ = writeln!(rsf, "Item\tSYM{i}\ttristate");
    }
    let _ = writeln!(dimacs, "p cnf {} 0", 2 * size);
    rsf.push_str(".\n<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<submenu>\n");
    for i in 0..size {
        if i % 10 == 0 && i > 0 {
            rsf.push_str("</submenu>\n".repeat(9).as_str());
        }
        if i % 10 != 0 {
            rsf.push_str("<submenu>\n");
        }
        let _ = write!(
            rsf,
            "<menu flags=\"0\"><symbol type=\"tristate\" flags=\"0\" id=\"{i}\"><name>SYM{i}</name>"
        );
        if i > 0 {
            let _ = write!(rsf, "<property type=\"depends\">S@{}</property>", i - 1);
        }
        rsf.push_str("</symbol></menu>\n");
    }
    rsf.push_str("</submenu>\n".repeat((size + 9) % 10).as_str());
    rsf.push_str("</submenu>\n");
    fs::write(base.with_extension("dimacs"), dimacs)?;
    fs::write(base.with_extension("rsf"), rsf)
}

fn convert_benchmark(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let mut group = c.benchmark_group("convert");
    for size in [100, 1_000, 10_000] {
        let base = dir.path().join(format!("model{size}"));
        synthetic_model(&base, size).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(size), &base, |b, base| {
            b.iter(|| kconvert_fmt::convert(base).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, convert_benchmark);
criterion_main!(benches);
