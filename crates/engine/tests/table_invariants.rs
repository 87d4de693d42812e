use proptest::prelude::*;
use rstest::{fixture, rstest};
use xmldb_engine::error::ErrorCode;
use xmldb_engine::{Builder, NodeKind, NodeTable, Options, XmlParser};

fn parse(xml: &str) -> NodeTable {
    Builder::build(Options::default(), &mut XmlParser::from_str(xml)).unwrap()
}

fn fragment(xml: &str) -> NodeTable {
    Builder::build_fragment(Options::default(), &mut XmlParser::from_str(xml)).unwrap()
}

/// Sizes recomputed bottom-up from the parent distances alone.
fn recomputed_sizes(table: &NodeTable) -> Vec<usize> {
    let mut sizes = vec![1; table.len()];
    for pre in (0..table.len()).rev() {
        if let Some(parent) = table.parent(pre) {
            sizes[parent] += sizes[pre];
        }
    }
    sizes
}

#[fixture]
fn abc() -> NodeTable {
    parse("<a><b>X</b><c/></a>")
}

#[rstest]
fn sizes_of_small_document(abc: NodeTable) {
    assert_eq!(abc.len(), 5);
    assert_eq!(abc.size(0), 5);
    assert_eq!(abc.size(1), 4);
    assert_eq!(abc.size(2), 2);
    assert_eq!(abc.size(3), 1);
    assert_eq!(abc.size(4), 1);
    assert_eq!(abc.kind(3), NodeKind::Text);
    assert_eq!(abc.parent(4), Some(1));
    abc.check().unwrap();
}

#[rstest]
fn delete_shrinks_ancestors(mut abc: NodeTable) {
    let removed = abc.delete(2).unwrap();
    assert_eq!(removed, 2);
    assert_eq!(abc.len(), 3);
    assert_eq!(abc.size(1), 2);
    assert_eq!(abc.size(0), 3);
    assert_eq!(abc.node_name(2), Some("c"));
    assert_eq!(abc.parent(2), Some(1));
    abc.check().unwrap();
}

#[rstest]
fn insert_renumbers_following_nodes(mut abc: NodeTable) {
    let frag = fragment("<x><y/></x>");
    abc.insert(2, Some(1), &frag).unwrap();
    assert_eq!(abc.len(), 7);
    assert_eq!(abc.size(1), 6);
    assert_eq!(abc.node_name(2), Some("x"));
    assert_eq!(abc.parent(3), Some(2));
    // b moved behind the inserted subtree and still points at a
    assert_eq!(abc.node_name(4), Some("b"));
    assert_eq!(abc.parent(4), Some(1));
    assert_eq!(abc.parent(5), Some(4));
    assert_eq!(abc.parent(6), Some(1));
    abc.check().unwrap();
}

#[rstest]
fn replace_is_one_splice(mut abc: NodeTable) {
    let delta = abc.replace(2, &fragment("<z>1</z><z>2</z>")).unwrap();
    assert_eq!(delta, 2);
    assert_eq!(abc.size(1), 6);
    assert_eq!(abc.string_value(1), "12");
    abc.check().unwrap();
}

#[rstest]
fn out_of_range_positions_fail(mut abc: NodeTable) {
    assert_eq!(abc.delete(17).unwrap_err().code, ErrorCode::XDB0001);
    assert_eq!(abc.insert(42, Some(1), &fragment("<q/>")).unwrap_err().code, ErrorCode::XDB0001);
    // inside b's subtree, not a child boundary of a
    assert_eq!(abc.insert(3, Some(1), &fragment("<q/>")).unwrap_err().code, ErrorCode::XDB0001);
    assert_eq!(abc.len(), 5);
}

#[rstest]
fn document_node_cannot_be_deleted(mut abc: NodeTable) {
    assert_eq!(abc.delete(0).unwrap_err().code, ErrorCode::XUTY0008);
}

#[rstest]
fn capacity_is_checked_before_splicing() {
    let mut table = Builder::build(Options::default().with_max_nodes(5), &mut XmlParser::from_str("<a><b>X</b><c/></a>"))
        .unwrap();
    let err = table.insert(4, Some(1), &fragment("<q/>")).unwrap_err();
    assert_eq!(err.code, ErrorCode::XDB0002);
    assert_eq!(table.len(), 5);
    table.check().unwrap();
}

#[rstest]
fn attributes_follow_their_element() {
    let mut table = parse(r#"<a id="1" class="x"><b/></a>"#);
    assert_eq!(table.attr_size(1), 3);
    assert_eq!(table.attributes(1), 2..4);
    assert_eq!(table.children(1).collect::<Vec<_>>(), vec![4]);

    let attrs = fragment("<t lang='en'/>");
    let lang = attrs.extract(&[1]).unwrap();
    table.insert_attr(4, 1, &lang).unwrap();
    assert_eq!(table.attr_size(1), 4);
    assert_eq!(table.kind(4), NodeKind::Attribute);
    assert_eq!(table.text(4), "en");
    assert_eq!(table.node_name(5), Some("b"));
    table.check().unwrap();

    table.delete(2).unwrap();
    assert_eq!(table.attr_size(1), 3);
    table.check().unwrap();
}

#[rstest]
fn long_content_goes_to_the_text_store() {
    let long = "a fairly long text value that does not fit inline";
    let mut table = parse(&format!("<a>{long}</a>"));
    assert_eq!(table.text(2), long);
    assert_eq!(table.text_store().len(), long.len());
    table.update_text(2, "short").unwrap();
    assert_eq!(table.text(2), "short");
    assert_eq!(table.text_store().garbage(), long.len());
}

#[rstest]
fn namespace_bindings_are_reference_counted() {
    let mut table = parse(r#"<r><p:a xmlns:p="urn:p"/><p:b xmlns:p="urn:p"/></r>"#);
    let decl = table.namespaces_of(2)[0];
    assert_eq!(table.namespace_pool().references(decl), 2);
    assert_eq!(table.uri(2), Some("urn:p"));
    table.delete(2).unwrap();
    assert_eq!(table.namespace_pool().references(decl), 1);
    table.delete(2).unwrap();
    assert!(!table.has_namespaces());
}

#[rstest]
fn merge_texts_requires_sibling_texts() {
    let mut table = parse("<a><b/></a>");
    table.insert_node(3, Some(1), NodeKind::Text, 0, 0, "x").unwrap();
    table.insert_node(4, Some(1), NodeKind::Text, 0, 0, "y").unwrap();
    assert!(!table.merge_texts(2, 3).unwrap());
    assert!(table.merge_texts(3, 4).unwrap());
    assert_eq!(table.text(3), "xy");
    assert_eq!(table.size(1), 3);
    table.check().unwrap();
}

#[rstest]
fn rename_changes_name_and_namespace(mut abc: NodeTable) {
    abc.rename(2, "p:bee", Some("urn:bee")).unwrap();
    assert_eq!(abc.node_name(2), Some("p:bee"));
    assert_eq!(abc.local_name(2), Some("bee"));
    assert_eq!(abc.uri(2), Some("urn:bee"));
    assert_eq!(abc.rename(3, "t", None).unwrap_err().code, ErrorCode::XUTY0008);
}

#[derive(Debug, Clone)]
enum Op {
    Insert { parent: usize, slot: usize, shape: usize },
    Delete { node: usize },
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (any::<usize>(), any::<usize>(), 0usize..4).prop_map(|(parent, slot, shape)| Op::Insert { parent, slot, shape }),
        any::<usize>().prop_map(|node| Op::Delete { node }),
    ]
}

const SHAPES: [&str; 4] = ["<x/>", "text", "<x a='1'><y>t</y></x>", "<x/><y><z/></y>"];

fn run(table: &mut NodeTable, op: &Op, shapes: &[NodeTable]) {
    match *op {
        Op::Insert { parent, slot, shape } => {
            let parents: Vec<usize> = (0..table.len()).filter(|&p| !table.kind(p).is_leaf()).collect();
            let parent = parents[parent % parents.len()];
            let mut bounds: Vec<usize> = table.children(parent).collect();
            bounds.push(parent + table.size(parent));
            let at = bounds[slot % bounds.len()];
            table.insert(at, Some(parent), &shapes[shape]).unwrap();
        }
        Op::Delete { node } => {
            if table.len() > 1 {
                table.delete(1 + node % (table.len() - 1)).unwrap();
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]
    #[rstest]
    fn sizes_survive_random_updates(ops in prop::collection::vec(arb_op(), 1..40)) {
        let shapes: Vec<NodeTable> = SHAPES.iter().map(|s| fragment(s)).collect();
        let mut table = parse("<root><a>1</a><b c='d'><e/></b></root>");
        for op in &ops {
            run(&mut table, op, &shapes);
            let expected = recomputed_sizes(&table);
            let actual: Vec<usize> = (0..table.len()).map(|p| table.size(p)).collect();
            prop_assert_eq!(actual, expected);
            prop_assert!(table.check().is_ok(), "{:?}", table.check());
        }
    }
}
