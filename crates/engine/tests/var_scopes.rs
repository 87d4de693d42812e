use rstest::rstest;
use string_cache::DefaultAtom;
use xmldb_engine::error::ErrorCode;
use xmldb_engine::{Builder, Expr, Flwor, Item, NodeTable, Options, QueryContext, VarStack, XmlParser};

fn table() -> NodeTable {
    Builder::build(Options::default(), &mut XmlParser::from_str("<r/>")).unwrap()
}

// for $a in 1 to 2 return for $b in 3 to 4 return for $c in 5 to 6 return ($a, $b, $c)
fn three_levels() -> Expr {
    let inner = Flwor::new(Expr::Concat(vec![Expr::var("a"), Expr::var("b"), Expr::var("c")]))
        .for_in("c", Expr::range(5, 6))
        .build();
    let middle = Flwor::new(inner).for_in("b", Expr::range(3, 4)).build();
    Flwor::new(middle).for_in("a", Expr::range(1, 2)).build()
}

#[rstest]
fn nested_scopes_see_outer_bindings() {
    let table = table();
    let expr = three_levels();
    let mut ctx = QueryContext::new(&table);
    let out: Vec<i64> = ctx.evaluate(&expr).unwrap().iter().filter_map(Item::as_integer).collect();
    assert_eq!(out.len(), 24);
    assert_eq!(&out[..6], &[1, 3, 5, 1, 3, 6]);
    assert_eq!(&out[18..], &[2, 4, 5, 2, 4, 6]);
    assert_eq!(ctx.vars().size(), 0);
}

#[rstest]
fn bindings_are_removed_on_reset() {
    let table = table();
    let expr = three_levels();
    let mut ctx = QueryContext::new(&table);
    let mut iter = ctx.iter(&expr).unwrap();
    assert!(iter.next(&mut ctx).unwrap().is_some());
    let names: Vec<&str> = ctx.vars().bindings().iter().map(|b| b.name.as_ref()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);

    iter.reset(&mut ctx);
    assert_eq!(ctx.vars().size(), 0);
    assert!(ctx.vars().lookup(&DefaultAtom::from("a")).is_none());
}

#[rstest]
fn innermost_binding_shadows() {
    let mut vars = VarStack::new();
    let outer = vars.mark();
    vars.push("x".into(), vec![Item::integer(1)]);
    let inner = vars.mark();
    let slot = vars.push("x".into(), vec![Item::integer(2)]);
    assert_eq!(vars.lookup(&"x".into()), Some(&vec![Item::integer(2)]));
    vars.set(slot, vec![Item::integer(3)]);
    assert_eq!(vars.get(slot), &vec![Item::integer(3)]);
    vars.restore(inner);
    assert_eq!(vars.lookup(&"x".into()), Some(&vec![Item::integer(1)]));
    vars.restore(outer);
    assert_eq!(vars.size(), 0);
}

// for $x in (for $<inner> in 1 to 2 return 7) return $<ret>
fn for_over_flwor(inner: &str, ret: &str) -> Expr {
    let source = Flwor::new(Expr::value(vec![Item::integer(7)])).for_in(inner, Expr::range(1, 2)).build();
    Flwor::new(Expr::var(ret)).for_in("x", source).build()
}

#[rstest]
fn source_bindings_are_invisible_to_the_return_clause() {
    let table = table();
    let mut ctx = QueryContext::new(&table);
    let err = ctx.evaluate(&for_over_flwor("y", "y")).unwrap_err();
    assert_eq!(err.code, ErrorCode::XPST0008);
}

#[rstest]
fn source_bindings_do_not_shadow_the_loop_variable() {
    let table = table();
    let mut ctx = QueryContext::new(&table);
    let out = ctx.evaluate(&for_over_flwor("x", "x")).unwrap();
    assert_eq!(out, vec![Item::integer(7), Item::integer(7)]);
    assert_eq!(ctx.vars().size(), 0);
}

#[rstest]
fn source_bindings_are_invisible_to_predicates() {
    // (for $y in 1 to 2 return $y)[$y]
    let table = table();
    let source = Flwor::new(Expr::var("y")).for_in("y", Expr::range(1, 2)).build();
    let mut ctx = QueryContext::new(&table);
    let err = ctx.evaluate(&source.filter(Expr::var("y"))).unwrap_err();
    assert_eq!(err.code, ErrorCode::XPST0008);
}

#[rstest]
fn outer_bindings_stay_visible_to_the_source() {
    // for $a in 1 to 2 return for $x in (for $y in 1 to 2 return $a) return $x
    let table = table();
    let source = Flwor::new(Expr::var("a")).for_in("y", Expr::range(1, 2)).build();
    let inner = Flwor::new(Expr::var("x")).for_in("x", source).build();
    let expr = Flwor::new(inner).for_in("a", Expr::range(1, 2)).build();
    let mut ctx = QueryContext::new(&table);
    let out: Vec<i64> = ctx.evaluate(&expr).unwrap().iter().filter_map(Item::as_integer).collect();
    assert_eq!(out, vec![1, 1, 2, 2]);
    assert_eq!(ctx.vars().size(), 0);
}
