use rstest::{fixture, rstest};
use xmldb_engine::error::ErrorCode;
use xmldb_engine::ft::scoring;
use xmldb_engine::{
    Builder, Expr, Flwor, FtCase, FtExpr, FtMode, FtOptions, FtPositions, Item, NodeTable, Options, Parser,
    QueryContext, XmlParser,
};

#[fixture]
fn table() -> NodeTable {
    let mut builder = Builder::new(Options::default()).with_doc_name("books.xml");
    XmlParser::from_str("<lib><p>the quick fox</p><p>a slow fox jumps over the fox</p><p>Café au lait</p></lib>")
        .parse(&mut builder)
        .unwrap();
    builder.finish().unwrap()
}

fn strings(texts: &[&str]) -> Expr {
    Expr::value(texts.iter().map(|t| Item::string(*t)).collect())
}

fn contains(table: &NodeTable, input: Expr, query: FtExpr) -> Item {
    let mut ctx = QueryContext::new(table);
    let result = ctx.evaluate(&input.contains_text(query)).unwrap();
    assert_eq!(result.len(), 1);
    result.into_iter().next().unwrap()
}

fn is_true(item: &Item) -> bool {
    xmldb_engine::xdm::ebv(std::slice::from_ref(item)).unwrap()
}

#[rstest]
fn single_hit_in_three_words_scores_one_half(table: NodeTable) {
    let item = contains(&table, strings(&["a b c"]), FtExpr::words("a"));
    assert!(is_true(&item));
    assert!((item.score() - 0.5).abs() < 1e-12);
}

#[rstest]
fn item_scores_are_combined(table: NodeTable) {
    let item = contains(&table, strings(&["a b c", "zzz", "a x"]), FtExpr::words("a"));
    let expected = scoring::combine(scoring::word(1, 3), scoring::word(1, 2));
    assert!((item.score() - expected).abs() < 1e-12);
    assert!(is_true(&item));
}

#[rstest]
fn combinators() {
    assert!((scoring::combine(0.5, 0.8) - 0.4).abs() < 1e-12);
    assert_eq!(scoring::normalize(0.0), 1.0);
    assert_eq!(scoring::normalize(0.3), 0.3);
    assert!((scoring::not(0.25) - 0.75).abs() < 1e-12);
}

#[rstest]
fn no_match_is_false_with_zero_score(table: NodeTable) {
    let item = contains(&table, strings(&["a b c"]), FtExpr::words("q"));
    assert!(!is_true(&item));
    assert_eq!(item.score(), 0.0);
}

#[rstest]
fn negation_matches_with_full_score(table: NodeTable) {
    let item = contains(&table, strings(&["a b c"]), FtExpr::words("q").negate());
    assert!(is_true(&item));
    assert_eq!(item.score(), 1.0);
    let item = contains(&table, strings(&["a b c"]), FtExpr::words("a").negate());
    assert!(!is_true(&item));
}

#[rstest]
#[case::any(FtMode::Any, &["fox jumps", "cat"], true)]
#[case::all(FtMode::All, &["fox jumps", "cat"], false)]
#[case::all_present(FtMode::All, &["fox", "slow"], true)]
#[case::phrase(FtMode::Phrase, &["slow", "fox"], true)]
#[case::phrase_order(FtMode::Phrase, &["fox", "slow"], false)]
#[case::any_word(FtMode::AnyWord, &["cat fox"], true)]
#[case::all_words(FtMode::AllWords, &["cat fox"], false)]
#[case::all_words_present(FtMode::AllWords, &["over jumps"], true)]
fn match_modes(table: NodeTable, #[case] mode: FtMode, #[case] query: &[&str], #[case] expected: bool) {
    let item = contains(&table, strings(&["a slow fox jumps over the fox"]), FtExpr::words_mode(query, mode));
    assert_eq!(is_true(&item), expected);
}

#[rstest]
fn and_or_follow_their_operands(table: NodeTable) {
    let text = || strings(&["a slow fox"]);
    assert!(is_true(&contains(&table, text(), FtExpr::words("slow").and(FtExpr::words("fox")))));
    assert!(!is_true(&contains(&table, text(), FtExpr::words("slow").and(FtExpr::words("cat")))));
    let or = contains(&table, text(), FtExpr::words("cat").or(FtExpr::words("fox")));
    assert!(is_true(&or));
    assert!((or.score() - scoring::word(1, 3)).abs() < 1e-12);
}

#[rstest]
#[case::insensitive(FtCase::Insensitive, "Fox", "fox", true)]
#[case::sensitive(FtCase::Sensitive, "Fox", "fox", false)]
#[case::upper(FtCase::Upper, "FOX", "fox", true)]
#[case::upper_mismatch(FtCase::Upper, "fox", "fox", false)]
#[case::lower(FtCase::Lower, "fox", "FOX", true)]
fn case_modes(table: NodeTable, #[case] case: FtCase, #[case] text: &str, #[case] query: &str, #[case] expected: bool) {
    let mut ctx = QueryContext::builder(&table).ft_options(FtOptions::default().with_case(case)).build();
    let expr = strings(&[text]).contains_text(FtExpr::words(query));
    let result = ctx.evaluate(&expr).unwrap();
    assert_eq!(is_true(&result[0]), expected);
}

#[rstest]
#[case::insensitive(false, true)]
#[case::sensitive(true, false)]
fn diacritics(table: NodeTable, #[case] sensitive: bool, #[case] expected: bool) {
    let options = FtOptions::default().with_diacritics_sensitive(sensitive);
    let mut ctx = QueryContext::builder(&table).ft_options(options).build();
    let expr = Expr::Root.descendant("p").contains_text(FtExpr::words("cafe"));
    let result = ctx.evaluate(&expr).unwrap();
    assert_eq!(is_true(&result[0]), expected);
}

#[rstest]
fn sink_receives_spans_of_matching_nodes(table: NodeTable) {
    let mut positions = FtPositions::new();
    {
        let mut ctx = QueryContext::builder(&table).sink(&mut positions).build();
        let expr = Expr::Root.descendant("p").contains_text(FtExpr::words("fox"));
        let result = ctx.evaluate(&expr).unwrap();
        assert!(is_true(&result[0]));
    }
    assert_eq!(positions.len(), 2);
    // <p>the quick fox</p> is pre 2, its text pre 3
    let first = positions.get("books.xml", 2).unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!((first[0].first, first[0].last), (2, 2));
    assert_eq!((first[0].start, first[0].end), (10, 13));
    let second = positions.hits()[1].spans.clone();
    assert_eq!(second.iter().map(|s| s.first).collect::<Vec<_>>(), vec![2, 6]);
}

#[rstest]
fn atomic_matches_are_not_recorded(table: NodeTable) {
    let mut positions = FtPositions::new();
    {
        let mut ctx = QueryContext::builder(&table).sink(&mut positions).build();
        ctx.evaluate(&strings(&["fox"]).contains_text(FtExpr::words("fox"))).unwrap();
    }
    assert!(positions.is_empty());
}

#[rstest]
fn scores_flow_into_for_clauses(table: NodeTable) {
    // for $p score $s in //p[. contains text "fox"] return $s
    let hits = Expr::Root.descendant("p").filter(Expr::Context.contains_text(FtExpr::words("fox")));
    let expr = Flwor::new(Expr::var("s")).for_at("p", None, Some("s"), hits).build();
    let mut ctx = QueryContext::new(&table);
    let scores: Vec<f64> = ctx
        .evaluate(&expr)
        .unwrap()
        .iter()
        .map(|i| i.string_value(&table).parse().unwrap())
        .collect();
    assert_eq!(scores.len(), 2);
    assert!((scores[0] - scoring::word(1, 3)).abs() < 1e-12);
    assert!((scores[1] - scoring::word(2, 7)).abs() < 1e-12);
}

#[rstest]
fn lexer_returns_to_the_pool_on_error(table: NodeTable) {
    let mut ctx = QueryContext::new(&table);
    let err = ctx.evaluate(&strings(&["a"]).contains_text(FtExpr::And(Vec::new()))).unwrap_err();
    assert_eq!(err.code, ErrorCode::FTDY0020);
    assert_eq!(ctx.idle_lexers(), 1);

    ctx.evaluate(&strings(&["a"]).contains_text(FtExpr::words("a"))).unwrap();
    assert_eq!(ctx.idle_lexers(), 1);
}

#[rstest]
fn query_words_do_not_see_input_bindings(table: NodeTable) {
    // (for $y in 1 to 2 return "fox") contains text { $y }
    let input = Flwor::new(strings(&["fox"])).for_in("y", Expr::range(1, 2)).build();
    let query = FtExpr::Words { query: Box::new(Expr::var("y")), mode: FtMode::Any };
    let mut ctx = QueryContext::new(&table);
    let err = ctx.evaluate(&input.contains_text(query)).unwrap_err();
    assert_eq!(err.code, ErrorCode::XPST0008);
    assert_eq!(ctx.idle_lexers(), 1);
}
