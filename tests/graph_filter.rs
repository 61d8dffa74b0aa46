use stratus::graph::{property_contains_filter, FilterFn, Graph};
use stratus::resource::Resource;
use stratus::schema::PropertyValue;
use stratus::store::{Triple, PARENT_OF};

fn seeded() -> Graph {
    Graph::unmarshal(
        "/node<inst_1>  \"rdf:type\"@[] /node<cloud-owl:Instance>\n\
         /node<inst_1>  \"cloud:id\"@[] \"inst_1\"^^type:text\n\
         /node<inst_2>  \"rdf:type\"@[] /node<cloud-owl:Instance>\n\
         /node<inst_2>  \"cloud:id\"@[] \"inst_2\"^^type:text\n\
         /node<inst_2>  \"cloud:name\"@[] \"redis\"^^type:text\n\
         /node<sub_1>  \"rdf:type\"@[] /node<cloud-owl:Subnet>\n\
         /node<sub_1>  \"cloud:id\"@[] \"sub_1\"^^type:text",
    )
    .unwrap()
}

#[test]
fn filter_on_kind_alone() {
    let graph = seeded();
    let filtered = graph.filter(&["subnet"], &[]).unwrap();
    assert_eq!(filtered.get_all_resources(&["subnet"]).unwrap().len(), 1);
    assert_eq!(filtered.get_all_resources(&["instance"]).unwrap().len(), 0);
}

#[test]
fn filter_on_kind_and_predicate() {
    let graph = seeded();
    let by_id: FilterFn = Box::new(|r: &Resource| {
        r.properties.get("ID") == Some(&PropertyValue::Text("inst_1".to_owned()))
    });
    let filtered = graph.filter(&["instance"], &[by_id]).unwrap();
    let instances = filtered.get_all_resources(&["instance"]).unwrap();
    assert_eq!(instances.len(), 1);
    assert_eq!(instances[0].id(), "inst_1");
    assert!(filtered.get_all_resources(&["subnet"]).unwrap().is_empty());
}

#[test]
fn every_predicate_must_hold() {
    let graph = seeded();
    let by_id: FilterFn = Box::new(|r: &Resource| {
        r.properties.get("ID") == Some(&PropertyValue::Text("inst_2".to_owned()))
    });
    let by_name: FilterFn = Box::new(|r: &Resource| {
        r.properties.get("Name") == Some(&PropertyValue::Text("redis".to_owned()))
    });
    let filtered = graph.filter(&["instance"], &[by_id, by_name]).unwrap();
    let instances = filtered.get_all_resources(&["instance"]).unwrap();
    assert_eq!(instances.len(), 1);
    assert_eq!(instances[0].id(), "inst_2");
}

#[test]
fn property_contains_is_case_insensitive() {
    let graph = seeded();
    let filtered = graph
        .filter(
            &["instance"],
            &[
                property_contains_filter("ID", "inst"),
                property_contains_filter("Name", "Redis"),
            ],
        )
        .unwrap();
    let instances = filtered.get_all_resources(&["instance"]).unwrap();
    assert_eq!(instances.len(), 1);
    assert_eq!(instances[0].id(), "inst_2");
}

#[test]
fn relations_to_excluded_resources_are_dropped() {
    let mut graph = seeded();
    let sub = Resource::new("sub_1", "subnet");
    let inst_1 = Resource::new("inst_1", "instance");
    let inst_2 = Resource::new("inst_2", "instance");
    graph.add_parent_relation(&sub, &inst_1);
    graph.add_parent_relation(&inst_1, &inst_2); // retained on both ends

    let filtered = graph.filter(&["instance"], &[]).unwrap();
    assert!(
        !filtered
            .store()
            .has_triple(&Triple::node("sub_1", PARENT_OF, "inst_1")),
        "relation pointing from an excluded subnet must be dropped"
    );
    assert!(filtered
        .store()
        .has_triple(&Triple::node("inst_1", PARENT_OF, "inst_2")));
}
