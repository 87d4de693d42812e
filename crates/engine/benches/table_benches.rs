use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use xmldb_engine::{Builder, EventParser, Expr, Flwor, FtExpr, NodeTable, Options, QueryContext, XmlParser};

fn create_document(sections: usize) -> String {
    let mut xml = String::from("<lib>");
    for i in 0..sections {
        xml.push_str(&format!("<section id='s{i}'>"));
        for j in 0..20 {
            xml.push_str(&format!("<p n='{j}'>paragraph {j} of section {i} about the quick brown fox</p>"));
        }
        xml.push_str("</section>");
    }
    xml.push_str("</lib>");
    xml
}

fn parse(xml: &str) -> NodeTable {
    Builder::build(Options::default(), &mut XmlParser::from_str(xml)).unwrap()
}

fn benchmark_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    for sections in [10, 100] {
        let xml = create_document(sections);
        group.bench_with_input(BenchmarkId::new("xml", sections), &xml, |b, xml| {
            b.iter(|| black_box(parse(black_box(xml))));
        });
        let table = parse(&xml);
        let events = table.events();
        group.bench_with_input(BenchmarkId::new("events", sections), &events, |b, events| {
            b.iter(|| {
                let mut events: EventParser = events.clone();
                black_box(Builder::build(Options::default(), &mut events).unwrap())
            });
        });
    }
    group.finish();
}

fn benchmark_updates(c: &mut Criterion) {
    let table = parse(&create_document(100));
    let fragment = Builder::build_fragment(Options::default(), &mut XmlParser::from_str("<p>new</p>")).unwrap();
    let mut group = c.benchmark_group("updates");

    // in front of the first and the last <p>; early positions shift the
    // whole tail of the table
    for (label, pre) in [("front", 4), ("back", table.len() - 3)] {
        group.bench_function(BenchmarkId::new("insert_delete", label), |b| {
            let mut table = table.clone();
            let parent = table.parent(pre);
            b.iter(|| {
                let n = table.insert(pre, parent, &fragment).unwrap();
                table.delete(pre).unwrap();
                black_box(n)
            });
        });
    }
    group.finish();
}

fn benchmark_queries(c: &mut Criterion) {
    let table = parse(&create_document(100));
    let mut group = c.benchmark_group("queries");

    let descendants = Expr::Root.descendant("p");
    group.bench_function("descendant_p", |b| {
        b.iter(|| {
            let mut ctx = QueryContext::new(&table);
            black_box(ctx.evaluate(&descendants).unwrap().len())
        });
    });

    let flwor = Flwor::new(Expr::var("s"))
        .for_at("p", None, Some("s"), Expr::Root.descendant("p").filter(Expr::Context.contains_text(FtExpr::words("fox"))))
        .build();
    group.bench_function("fulltext_flwor", |b| {
        b.iter(|| {
            let mut ctx = QueryContext::new(&table);
            black_box(ctx.evaluate(&flwor).unwrap().len())
        });
    });
    group.finish();
}

criterion_group!(benches, benchmark_build, benchmark_updates, benchmark_queries);
criterion_main!(benches);
