use stratus::error::StratusError;
use stratus::store::{LiteralTag, Triple, TripleStore};

#[test]
fn adding_a_duplicate_statement_is_a_no_op() {
    let mut store = TripleStore::new();
    store.add([Triple::text("inst_1", "cloud:name", "redis")]);
    store.add([Triple::text("inst_1", "cloud:name", "redis")]);
    assert_eq!(store.len(), 1);
    assert!(store.has_triple(&Triple::text("inst_1", "cloud:name", "redis")));
    assert!(!store.has_triple(&Triple::text("inst_1", "cloud:name", "mongo")));
}

#[test]
fn triples_for_subject_in_insertion_order() {
    let mut store = TripleStore::new();
    store.add([
        Triple::node("inst_1", "rdf:type", "cloud-owl:Instance"),
        Triple::text("inst_2", "cloud:name", "other"),
        Triple::text("inst_1", "cloud:name", "redis"),
    ]);
    let triples = store.triples_for_subject("inst_1");
    assert_eq!(triples.len(), 2);
    assert_eq!(triples[0].predicate(), "rdf:type");
    assert_eq!(triples[1].predicate(), "cloud:name");
    assert!(store.triples_for_subject("none").is_empty());
}

#[test]
fn marshal_is_sorted_and_stable() {
    let mut store = TripleStore::new();
    store.add([
        Triple::text("inst_1", "cloud:name", "redis"),
        Triple::node("inst_1", "rdf:type", "cloud-owl:Instance"),
    ]);
    let expected = "/node<inst_1>\t\"cloud:name\"@[]\t\"redis\"^^type:text\n\
                    /node<inst_1>\t\"rdf:type\"@[]\t/node<cloud-owl:Instance>";
    assert_eq!(store.marshal(), expected);
}

#[test]
fn unmarshal_round_trips_and_tolerates_whitespace() {
    let text = "\n  /node<inst_1>  \"rdf:type\"@[] /node<cloud-owl:Instance>  \n\
                \t/node<inst_1>\t\"cloud:name\"@[]\t\"redis\"^^type:text\n\n\
                /node<inst_1> \"cloud:size\"@[] \"2\"^^type:int\n";
    let store = TripleStore::unmarshal(text).unwrap();
    assert_eq!(store.len(), 3);
    assert!(store.has_triple(&Triple::node("inst_1", "rdf:type", "cloud-owl:Instance")));
    assert!(store.has_triple(&Triple::literal("inst_1", "cloud:size", "2", LiteralTag::Int)));

    let again = TripleStore::unmarshal(&store.marshal()).unwrap();
    assert_eq!(again.marshal(), store.marshal());
}

#[test]
fn malformed_line_names_its_number() {
    let text = "/node<inst_1> \"rdf:type\"@[] /node<cloud-owl:Instance>\n\
                this is no statement\n";
    match TripleStore::unmarshal(text) {
        Err(StratusError::Parse { line, message }) => {
            assert_eq!(line, 2);
            assert!(message.contains("this is no statement"), "message: {}", message);
        }
        other => panic!("expected a parse error, got {:?}", other),
    }
}

#[test]
fn unknown_literal_tag_is_rejected() {
    let text = "/node<inst_1> \"cloud:name\"@[] \"redis\"^^type:blob";
    match TripleStore::unmarshal(text) {
        Err(StratusError::Parse { line, message }) => {
            assert_eq!(line, 1);
            assert!(message.contains("blob"), "message: {}", message);
        }
        other => panic!("expected a parse error, got {:?}", other),
    }
}
