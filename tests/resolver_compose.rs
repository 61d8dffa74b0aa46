use stratus::graph::Graph;
use stratus::resolver::{And, ByProperty, ByPropertyMatch, ByType, Resolver};

fn seeded() -> Graph {
    Graph::unmarshal(
        "/node<inst_1>  \"rdf:type\"@[] /node<cloud-owl:Instance>\n\
         /node<inst_1>  \"cloud:id\"@[] \"inst_1\"^^type:text\n\
         /node<inst_1>  \"cloud:name\"@[] \"redis\"^^type:text\n\
         /node<inst_2>  \"rdf:type\"@[] /node<cloud-owl:Instance>\n\
         /node<inst_2>  \"cloud:id\"@[] \"inst_2\"^^type:text\n\
         /node<sub_1>  \"rdf:type\"@[] /node<cloud-owl:Subnet>\n\
         /node<sub_1>  \"cloud:name\"@[] \"redis\"^^type:text",
    )
    .unwrap()
}

#[test]
fn and_composes_type_and_property() {
    let graph = seeded();
    let resolver = And::new(vec![
        Box::new(ByType::new("instance")),
        Box::new(ByProperty::new("Name", "redis")),
    ]);
    let resources = graph.resolve_resources(&resolver).unwrap();
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0].id(), "inst_1");
}

#[test]
fn no_match_is_zero_results_not_an_error() {
    let graph = seeded();
    let resolver = And::new(vec![
        Box::new(ByType::new("subnet")),
        Box::new(ByProperty::new("ID", "inst_2")),
    ]);
    let resources = graph.resolve_resources(&resolver).unwrap();
    assert!(resources.is_empty());
}

#[test]
fn by_property_match_is_a_substring_check() {
    let graph = seeded();
    let resolver = ByPropertyMatch::new("Name", "RED");
    let mut resources = graph.resolve_resources(&resolver).unwrap();
    stratus::resource::sort_by_id(&mut resources);
    let ids: Vec<&str> = resources.iter().map(|r| r.id()).collect();
    assert_eq!(ids, vec!["inst_1", "sub_1"]);
}

#[test]
fn empty_and_is_vacuously_true() {
    let graph = seeded();
    let resolver = And::new(Vec::new());
    // every resource matches, including the region root
    let resources = graph.resolve_resources(&resolver).unwrap();
    assert_eq!(resources.len(), 4);
    assert!(resolver.matches(&stratus::resource::Resource::new("x", "y")));
}
