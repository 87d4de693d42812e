use proptest::prelude::*;
use rstest::rstest;
use xmldb_engine::error::ErrorCode;
use xmldb_engine::{BuildEvent, Builder, EventParser, NodeKind, NodeTable, Options, TextKind};

fn build(events: EventParser) -> NodeTable {
    let mut parser = events;
    Builder::build(Options::default(), &mut parser).unwrap()
}

#[rstest]
fn sizes_are_patched_on_close() {
    let table = build(
        EventParser::new()
            .doc("doc.xml")
            .open("a")
            .attr("id", "1")
            .open("b")
            .text("X")
            .close()
            .open("c")
            .close()
            .comment("note")
            .pi("go", "now")
            .close(),
    );
    let kinds: Vec<NodeKind> = (0..table.len()).map(|p| table.kind(p)).collect();
    assert_eq!(
        kinds,
        vec![
            NodeKind::Document,
            NodeKind::Element,
            NodeKind::Attribute,
            NodeKind::Element,
            NodeKind::Text,
            NodeKind::Element,
            NodeKind::Comment,
            NodeKind::ProcessingInstruction,
        ]
    );
    assert_eq!(table.size(0), 8);
    assert_eq!(table.size(1), 7);
    assert_eq!(table.attr_size(1), 2);
    assert_eq!(table.size(3), 2);
    assert_eq!(table.text(0), "doc.xml");
    assert_eq!(table.node_name(7), Some("go"));
    assert_eq!(table.text(7), "now");
    table.check().unwrap();
}

#[rstest]
fn wrong_attribute_count_is_patched() {
    let mut builder = Builder::new(Options::default());
    builder.event(BuildEvent::Doc { value: String::new() }).unwrap();
    let a = builder.intern_name("a");
    let x = builder.intern_name("x");
    // announces two attributes but sends one
    builder.event(BuildEvent::ElementOpen { name: a, uri: 0, attrs: 2, has_ns: false }).unwrap();
    builder.event(BuildEvent::Attribute { name: x, value: "1".into(), uri: 0 }).unwrap();
    builder.event(BuildEvent::ElementClose).unwrap();
    let table = builder.finish().unwrap();
    assert_eq!(table.attr_size(1), 2);
    assert_eq!(table.size(1), 2);
    table.check().unwrap();
}

#[rstest]
#[case::attribute_after_child(EventParser::new().doc("").open("a").open("b").close().attr("x", "1").close())]
#[case::unclosed(EventParser::new().doc("").open("a"))]
#[case::stray_close(EventParser::new().doc("").close())]
#[case::missing_document(EventParser::new().open("a").close())]
fn malformed_streams_fail(#[case] mut events: EventParser) {
    let err = Builder::build(Options::default(), &mut events).unwrap_err();
    assert_eq!(err.code, ErrorCode::XDB0004);
}

#[rstest]
fn fragments_have_several_roots() {
    let mut events = EventParser::new().open("a").close().text("t").open("b").attr("k", "v").close();
    let table = Builder::build_fragment(Options::default(), &mut events).unwrap();
    assert!(table.is_fragment());
    assert_eq!(table.roots().collect::<Vec<_>>(), vec![0, 1, 2]);
    assert_eq!(table.dist(2), 0);
    assert_eq!(table.parent(3), Some(2));
    table.check().unwrap();
}

#[rstest]
fn namespace_events_attach_to_the_next_element() {
    let table = build(EventParser::new().doc("").namespace("p", "urn:p").open_ns("p:a", "urn:p").close());
    let decls = table.namespaces_of(1);
    assert_eq!(decls.len(), 1);
    assert_eq!(table.names().get(decls[0].prefix), Some("p"));
    assert_eq!(table.uris().get(decls[0].uri), Some("urn:p"));
    assert_eq!(table.uri(1), Some("urn:p"));
}

#[rstest]
fn text_kinds_map_to_node_kinds() {
    let mut events = EventParser::new().doc("");
    events.push(BuildEvent::Text { value: "c".into(), kind: TextKind::Comment });
    let table = build(events);
    assert_eq!(table.kind(1), NodeKind::Comment);
}

#[derive(Debug, Clone)]
enum Shape {
    Elem(String, Vec<(String, String)>, Vec<Shape>),
    Text(String),
    Comment(String),
}

fn arb_shape() -> impl Strategy<Value = Shape> {
    let leaf = prop_oneof![
        "[a-z]{1,6}".prop_map(Shape::Text),
        "[a-z ]{0,6}".prop_map(Shape::Comment),
        "[a-c]".prop_map(|n| Shape::Elem(n, Vec::new(), Vec::new())),
    ];
    leaf.prop_recursive(4, 32, 4, |inner| {
        ("[a-c]", prop::collection::vec(("[x-z]", "[0-9]{0,3}"), 0..3), prop::collection::vec(inner, 0..4)).prop_map(
            |(name, mut attrs, children)| {
                attrs.sort();
                attrs.dedup_by(|a, b| a.0 == b.0);
                Shape::Elem(name, attrs, children)
            },
        )
    })
}

fn emit(events: EventParser, shape: &Shape) -> EventParser {
    match shape {
        Shape::Text(t) => events.text(t),
        Shape::Comment(c) => events.comment(c),
        Shape::Elem(name, attrs, children) => {
            let mut events = events.open(name);
            for (k, v) in attrs {
                events = events.attr(k, v);
            }
            for child in children {
                events = emit(events, child);
            }
            events.close()
        }
    }
}

proptest! {
    #[rstest]
    fn event_stream_roundtrip(shape in arb_shape()) {
        let events = emit(EventParser::new().doc("r"), &shape);
        let recorded = events.events().len();
        let table = build(events);
        prop_assert!(table.check().is_ok());

        let replayed = table.events();
        prop_assert_eq!(replayed.events().len(), recorded);
        let rebuilt = build(replayed);
        prop_assert_eq!(rebuilt.len(), table.len());
        for pre in 0..table.len() {
            prop_assert_eq!(rebuilt.kind(pre), table.kind(pre));
            prop_assert_eq!(rebuilt.size(pre), table.size(pre));
            prop_assert_eq!(rebuilt.dist(pre), table.dist(pre));
            prop_assert_eq!(rebuilt.node_name(pre), table.node_name(pre));
            prop_assert_eq!(rebuilt.text(pre), table.text(pre));
        }
    }
}
