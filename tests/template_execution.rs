use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;

use stratus::driver::{DriverFn, DriverRegistry, Wait};
use stratus::error::StratusError;
use stratus::graph::{Graph, GraphLookup};
use stratus::printer::Printer;
use stratus::runner::Runner;
use stratus::script::{Action, CmdStatus, ParamValue, Params, Template};
use stratus::validation::{ParamIsSetValidator, UniqueNameValidator};

fn ok_driver(result: &str) -> DriverFn {
    let result = result.to_owned();
    Box::new(move |_params: &Params| Ok(Value::String(result.clone())))
}

fn noop_dry_run() -> DriverFn {
    Box::new(|_params: &Params| Ok(Value::Null))
}

fn require_param(param: &'static str, what: &'static str) -> DriverFn {
    Box::new(move |params: &Params| {
        if params.contains_key(param) {
            Ok(Value::Null)
        } else {
            Err(StratusError::DryRun(format!(
                "{}: missing required param '{}'",
                what, param
            )))
        }
    })
}

// ------------- Parsing -------------

#[test]
fn scripts_parse_into_ordered_command_nodes() {
    let template = Template::parse(
        "# build a box\n\
         \n\
         create instance name=redis subnet=@prod count=2 comment=\"with spaces\"\n\
         delete subnet id=sub_1\n",
    )
    .unwrap();
    assert_eq!(template.commands.len(), 2);

    let create = &template.commands[0];
    assert_eq!(create.action, Action::Create);
    assert_eq!(create.entity, "instance");
    assert_eq!(create.params.get("name"), Some(&ParamValue::Str("redis".to_owned())));
    assert_eq!(create.params.get("subnet"), Some(&ParamValue::Alias("prod".to_owned())));
    assert_eq!(create.params.get("count"), Some(&ParamValue::Int(2)));
    assert_eq!(
        create.params.get("comment"),
        Some(&ParamValue::Str("with spaces".to_owned()))
    );
    assert_eq!(create.status, CmdStatus::Parsed);

    let delete = &template.commands[1];
    assert_eq!(delete.action, Action::Delete);
    assert_eq!(delete.line, "delete subnet id=sub_1");
}

#[test]
fn unknown_actions_fail_with_their_line() {
    match Template::parse("create instance name=x\nexplode instance id=y") {
        Err(StratusError::Parse { line, message }) => {
            assert_eq!(line, 2);
            assert!(message.contains("explode"), "message: {}", message);
        }
        other => panic!("expected a parse error, got {:?}", other),
    }
}

// ------------- Validation -------------

#[test]
fn unique_name_validator_rejects_taken_names() {
    let graph = Graph::unmarshal(
        "/node<inst_1> \"rdf:type\"@[] /node<cloud-owl:Instance>\n\
         /node<inst_1> \"cloud:name\"@[] \"instance1_name\"^^type:text\n\
         /node<inst_2> \"rdf:type\"@[] /node<cloud-owl:Instance>\n\
         /node<inst_2> \"cloud:name\"@[] \"instance2_name\"^^type:text",
    )
    .unwrap();
    let template = Template::parse("create instance name=instance1_name").unwrap();

    let lookup = |_kind: &str| -> Option<&Graph> { Some(&graph) };
    let rule = UniqueNameValidator { lookup: &lookup };
    let errs = template.validate(&[&rule]);
    assert_eq!(errs.len(), 1);
    assert_eq!(
        errs[0].to_string(),
        "Validation error: create instance: name 'instance1_name' already exists"
    );

    let fresh = Template::parse("create instance name=fresh_name").unwrap();
    assert!(fresh.validate(&[&rule]).is_empty());
}

#[test]
fn param_is_set_validator_requires_the_parameter() {
    let template = Template::parse("create instance count=1").unwrap();
    let rule = ParamIsSetValidator {
        entity: "instance".to_owned(),
        action: Action::Create,
        param: "name".to_owned(),
        warning: "missing name param to create instance".to_owned(),
    };
    let errs = template.validate(&[&rule]);
    assert_eq!(errs.len(), 1);
    assert!(errs[0].to_string().contains("missing name param"));
}

#[test]
fn failing_validators_block_execution_entirely() {
    let mut template = Template::parse("create instance count=1").unwrap();
    let mut registry = DriverRegistry::new();
    registry
        .register("instance", Action::Create, noop_dry_run(), ok_driver("inst-1"))
        .unwrap();
    let rule = ParamIsSetValidator {
        entity: "instance".to_owned(),
        action: Action::Create,
        param: "name".to_owned(),
        warning: "missing name param to create instance".to_owned(),
    };
    let mut runner = Runner::new(&registry, None);
    match runner.run_validated(&mut template, &[&rule]) {
        Err(StratusError::Validation(msg)) => assert!(msg.contains("missing name param")),
        other => panic!("expected a validation error, got {:?}", other),
    }
    assert_eq!(template.commands[0].status, CmdStatus::Parsed);
}

// ------------- Dry run -------------

#[test]
fn dry_run_synthesizes_chainable_fake_ids() {
    let captured = Arc::new(Mutex::new(Vec::<Params>::new()));
    let cap = Arc::clone(&captured);
    let tag_dry_run: DriverFn = Box::new(move |params: &Params| {
        cap.lock().unwrap().push(params.clone());
        Ok(Value::Null)
    });

    let mut registry = DriverRegistry::new();
    registry
        .register(
            "instance",
            Action::Create,
            require_param("name", "create instance"),
            ok_driver("inst-42"),
        )
        .unwrap();
    registry
        .register("tag", Action::Create, tag_dry_run, ok_driver("tag-1"))
        .unwrap();

    let mut template =
        Template::parse("create instance name=redis\ncreate tag resource=$instance key=env").unwrap();
    let mut runner = Runner::new(&registry, None);
    runner.dry_run(&mut template).unwrap();

    assert_eq!(template.commands[0].status, CmdStatus::DryRunChecked);
    assert_eq!(template.commands[1].status, CmdStatus::DryRunChecked);

    let seen = captured.lock().unwrap();
    assert_eq!(seen.len(), 1);
    match seen[0].get("resource") {
        Some(ParamValue::Str(id)) => {
            assert!(id.starts_with("fake-instance-"), "chained id: {}", id)
        }
        other => panic!("expected a resolved reference, got {:?}", other),
    }
}

#[test]
fn a_failed_dry_run_only_sinks_its_own_command() {
    let mut registry = DriverRegistry::new();
    registry
        .register(
            "instance",
            Action::Create,
            require_param("name", "create instance"),
            ok_driver("inst-1"),
        )
        .unwrap();

    let mut template =
        Template::parse("create instance count=1\ncreate instance name=ok").unwrap();
    let mut runner = Runner::new(&registry, None);
    runner.run(&mut template).unwrap();

    assert_eq!(template.commands[0].status, CmdStatus::ExecutedKo);
    assert!(template.commands[0]
        .err
        .as_ref()
        .unwrap()
        .to_string()
        .contains("missing required param"));
    assert_eq!(template.commands[1].status, CmdStatus::ExecutedOk);
    assert_eq!(
        template.commands[1].result,
        Some(Value::String("inst-1".to_owned()))
    );
}

#[test]
fn chaining_on_a_failed_create_is_an_unresolved_reference() {
    let mut registry = DriverRegistry::new();
    registry
        .register(
            "instance",
            Action::Create,
            require_param("name", "create instance"),
            ok_driver("inst-1"),
        )
        .unwrap();
    registry
        .register("tag", Action::Create, noop_dry_run(), ok_driver("tag-1"))
        .unwrap();

    let mut template =
        Template::parse("create instance count=1\ncreate tag resource=$instance").unwrap();
    let mut runner = Runner::new(&registry, None);
    runner.dry_run(&mut template).unwrap();

    assert_eq!(template.commands[0].status, CmdStatus::ExecutedKo);
    assert_eq!(template.commands[1].status, CmdStatus::ExecutedKo);
    assert!(matches!(
        template.commands[1].err,
        Some(StratusError::UnresolvedReference { .. })
    ));
}

// ------------- Execution -------------

#[test]
fn execution_continues_past_a_failing_command() {
    let failing_run: DriverFn =
        Box::new(|_params: &Params| Err(StratusError::Execution("remote call exploded".to_owned())));
    let mut registry = DriverRegistry::new();
    registry
        .register("subnet", Action::Delete, noop_dry_run(), failing_run)
        .unwrap();
    registry
        .register("instance", Action::Create, noop_dry_run(), ok_driver("inst-7"))
        .unwrap();

    let mut template =
        Template::parse("delete subnet id=sub_1\ncreate instance name=redis").unwrap();
    let mut runner = Runner::new(&registry, None);
    runner.run(&mut template).unwrap();

    assert_eq!(template.commands[0].status, CmdStatus::ExecutedKo);
    assert_eq!(template.commands[1].status, CmdStatus::ExecutedOk);

    let report = Printer::new().print_report(&template);
    let lines: Vec<&str> = report.lines().collect();
    assert!(lines[0].starts_with("Date: "));
    assert!(
        lines[0].contains("RevertID: <not revertible>"),
        "deletes cannot be undone: {}",
        lines[0]
    );
    assert!(lines[1].starts_with("KO\t"));
    assert!(lines[1].ends_with("delete subnet id=sub_1"));
    assert!(lines[2].starts_with("OK\t"));
    assert!(lines[2].contains("inst-7"));
    assert!(lines[2].ends_with("create instance name=redis"));
}

#[test]
fn detailed_reports_indent_error_text() {
    let failing_run: DriverFn = Box::new(|_params: &Params| {
        Err(StratusError::Execution("first line\nsecond line".to_owned()))
    });
    let mut registry = DriverRegistry::new();
    registry
        .register("instance", Action::Start, noop_dry_run(), failing_run)
        .unwrap();

    let mut template = Template::parse("start instance id=inst_1").unwrap();
    let mut runner = Runner::new(&registry, None);
    runner.run(&mut template).unwrap();

    let report = Printer::with_errors().print_report(&template);
    assert!(report.contains("\t\tExecution error: first line\n"));
    assert!(report.contains("\t\tsecond line\n"));
}

#[test]
fn aliases_resolve_against_the_live_graph_before_dispatch() {
    let graph = Graph::unmarshal(
        "/node<sub_1> \"rdf:type\"@[] /node<cloud-owl:Subnet>\n\
         /node<sub_1> \"cloud:name\"@[] \"prod-subnet\"^^type:text",
    )
    .unwrap();

    let captured = Arc::new(Mutex::new(Vec::<Params>::new()));
    let cap = Arc::clone(&captured);
    let create_run: DriverFn = Box::new(move |params: &Params| {
        cap.lock().unwrap().push(params.clone());
        Ok(Value::String("inst-9".to_owned()))
    });
    let mut registry = DriverRegistry::new();
    registry
        .register("instance", Action::Create, noop_dry_run(), create_run)
        .unwrap();

    let mut template = Template::parse("create instance name=web subnet=@prod-subnet").unwrap();
    let lookup = |_kind: &str| -> Option<&Graph> { Some(&graph) };
    let lookup_ref: GraphLookup = &lookup;
    let mut runner = Runner::new(&registry, Some(lookup_ref));
    runner.run(&mut template).unwrap();

    assert_eq!(template.commands[0].status, CmdStatus::ExecutedOk);
    let seen = captured.lock().unwrap();
    assert_eq!(
        seen[0].get("subnet"),
        Some(&ParamValue::Str("sub_1".to_owned()))
    );
}

#[test]
fn a_missing_driver_is_a_configuration_error_up_front() {
    let registry = DriverRegistry::new();
    let mut template = Template::parse("create instance name=redis").unwrap();
    let mut runner = Runner::new(&registry, None);
    match runner.dry_run(&mut template) {
        Err(StratusError::Registry(msg)) => {
            assert!(msg.contains("create instance"), "message: {}", msg)
        }
        other => panic!("expected a registry error, got {:?}", other),
    }
    assert_eq!(template.commands[0].status, CmdStatus::Parsed);
}

// ------------- Revert -------------

#[test]
fn executed_templates_revert_in_reverse_order() {
    let mut registry = DriverRegistry::new();
    registry
        .register("instance", Action::Create, noop_dry_run(), ok_driver("inst-42"))
        .unwrap();
    registry
        .register("tag", Action::Create, noop_dry_run(), ok_driver("tag-1"))
        .unwrap();

    let mut template =
        Template::parse("create instance name=redis\ncreate tag resource=$instance").unwrap();
    let mut runner = Runner::new(&registry, None);
    runner.run(&mut template).unwrap();

    assert!(template.is_revertible());
    let report = Printer::new().print_report(&template);
    assert!(report.contains(&format!("RevertID: {}", template.id)));

    let revert = template.revert().unwrap();
    assert_eq!(revert.commands.len(), 2);
    assert_eq!(revert.commands[0].line, "delete tag id=tag-1");
    assert_eq!(revert.commands[1].line, "delete instance id=inst-42");
}

#[test]
fn irreversible_actions_make_a_template_not_revertible() {
    let template = Template::parse("update instance id=inst_1").unwrap();
    assert!(!template.is_revertible());
    let report = Printer::new().print_report(&template);
    assert!(report.contains("RevertID: <not revertible>"));
    assert!(matches!(
        template.revert(),
        Err(StratusError::Execution(_))
    ));
}

// ------------- Blocking checks -------------

#[test]
fn wait_distinguishes_timeouts_from_broken_probes() {
    let wait = Wait::new(Duration::from_millis(1), Duration::from_millis(50));
    let mut calls = 0;
    wait.until(|| {
        calls += 1;
        Ok(calls >= 3)
    })
    .unwrap();
    assert_eq!(calls, 3);

    let hurried = Wait::new(Duration::from_millis(1), Duration::from_millis(5));
    match hurried.until(|| Ok(false)) {
        Err(StratusError::Timeout { .. }) => {}
        other => panic!("expected a timeout, got {:?}", other),
    }

    match hurried.until(|| Err(StratusError::Execution("the check itself broke".to_owned()))) {
        Err(StratusError::Execution(msg)) => assert!(msg.contains("check itself broke")),
        other => panic!("expected an execution error, got {:?}", other),
    }
}
