use stratus::resource::{same, sort_by_id, Properties, Resource};

#[test]
fn same_compares_id_and_kind_only() {
    let i1 = Resource::new("inst_1", "instance");
    let i1_named = Resource::new("inst_1", "instance").with_property("Name", "redis");
    let i2 = Resource::new("inst_2", "instance");
    let s1 = Resource::new("inst_1", "subnet");

    assert!(i1.same(&i1));
    assert!(i1.same(&i1_named), "properties must not affect identity");
    assert!(!i1.same(&i2));
    assert!(!i1.same(&s1), "same id under another kind is a different resource");
}

#[test]
fn same_tolerates_absent_resources() {
    let r = Resource::new("inst_1", "instance");
    assert!(same(None, None));
    assert!(!same(Some(&r), None));
    assert!(!same(None, Some(&r)));
    assert!(same(Some(&r), Some(&r)));
}

#[test]
fn display_prefers_name() {
    let plain = Resource::new("inst_1", "instance");
    assert_eq!(plain.to_string(), "inst_1[instance]");

    let named = Resource::new("inst_1", "instance").with_property("Name", "to-display");
    assert_eq!(named.to_string(), "@to-display[instance]");

    let empty_name = Resource::new("inst_1", "instance").with_property("Name", "");
    assert_eq!(empty_name.to_string(), "inst_1[instance]");

    let none = Resource::new("", "");
    assert_eq!(none.to_string(), "[none]");
}

#[test]
fn subtract_keeps_absent_or_different_pairs() {
    let mut a = Properties::new();
    a.insert("one", 1i64);
    a.insert("two", 2i64);
    a.insert("three", "3");
    a.insert("four", 4i64);

    let mut b = Properties::new();
    b.insert("zero", 0i64);
    b.insert("two", 2i64);
    b.insert("three", "3");
    b.insert("four", "4");
    b.insert("five", "5");

    let mut expected = Properties::new();
    expected.insert("one", 1i64);
    expected.insert("four", 4i64);
    assert_eq!(a.subtract(&b), expected);

    let mut expected = Properties::new();
    expected.insert("zero", 0i64);
    expected.insert("four", "4");
    expected.insert("five", "5");
    assert_eq!(b.subtract(&a), expected);
}

#[test]
fn sorting_by_id() {
    let mut resources = vec![
        Resource::new("b", "instance"),
        Resource::new("c", "instance"),
        Resource::new("a", "instance"),
    ];
    sort_by_id(&mut resources);
    let ids: Vec<&str> = resources.iter().map(|r| r.id()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
}
