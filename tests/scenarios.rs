//! End-to-end checks over the scenarios in `demos/` and hand-built modules

use std::path::PathBuf;

use behavior_lock::behavior::{BehavioralType, TypeDecl};
use behavior_lock::checker::extract::render_trace;
use behavior_lock::parser::{load_path, Document};
use behavior_lock::process::{Action, Contract, Value};
use behavior_lock::report::RECURSION;
use behavior_lock::{CheckError, CheckerConfig, DefinitionError, DivergentExtraction, Module, Verdict};

fn demo(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos").join(name)
}

fn load(name: &str) -> (Module, CheckerConfig) {
    let document = load_path(&demo(name)).unwrap();
    let config = document.config();
    (document.into_module().unwrap(), config)
}

fn bank_type() -> TypeDecl {
    TypeDecl::new(
        "BankType",
        BehavioralType::fix(
            "X",
            BehavioralType::after("withdraw", BehavioralType::after("updateAck", BehavioralType::var("X"))),
        ),
    )
}

#[test]
fn test_cell_passes() {
    let (module, config) = load("cell.json");
    let outcome = module.check("Cell", &config).unwrap();
    assert_eq!(outcome.verdict, Verdict::Pass);
    assert_eq!(outcome.traces, 3);

    let traces = module.extract_traces("Cell", &config).unwrap();
    let rendered: Vec<_> = traces.iter().map(|t| render_trace(t)).collect();
    assert_eq!(
        rendered,
        vec![
            "get? -> rtn? -> k! -> recurse Cell(get, set, rtn)",
            "get? -> rtn? -> recurse Cell(get, set, rtn) -> k!",
            "set? -> recurse Cell(get, set, rtn)",
        ]
    );
}

#[test]
fn test_unacknowledged_bank_fails() {
    let (module, config) = load("token_bank.md");
    assert_eq!(config.max_unfold_depth, 16);

    let outcome = module.check("TokenBank", &config).unwrap();
    let Verdict::Fail(diagnostic) = outcome.verdict else {
        panic!("expected a type mismatch");
    };
    assert_eq!(diagnostic.behavior, "BankType");
    assert_eq!(diagnostic.observed, "recurse TokenBank(balance, withdraw, updateAck)");
    assert_eq!(diagnostic.trace[diagnostic.position], diagnostic.observed);
    assert_eq!(diagnostic.trace[0], "withdraw?");
    assert!(!diagnostic.trace.iter().any(|e| e.starts_with("updateAck")));
    assert!(diagnostic.expected.contains("updateAck"));
    assert!(!diagnostic.expected.contains(RECURSION));
    assert_eq!(diagnostic.state, vec!["updateAck.X"]);
}

#[test]
fn test_unacknowledged_bank_witness_on_type_channels() {
    let (module, config) = load("token_bank.md");
    let outcome = module.check("TokenBank", &config).unwrap();
    let Verdict::Fail(diagnostic) = outcome.verdict else {
        panic!("expected a type mismatch");
    };
    let alphabet = bank_type().body.channels();
    let observable: Vec<&str> = diagnostic.trace[..=diagnostic.position]
        .iter()
        .map(String::as_str)
        .filter(|e| e.starts_with("recurse ") || alphabet.contains(e.trim_end_matches(['?', '!'])))
        .collect();
    assert_eq!(observable, vec!["withdraw?", "recurse TokenBank(balance, withdraw, updateAck)"]);
}

#[test]
fn test_acknowledged_bank_passes() {
    let (module, config) = load("token_bank.md");
    let outcome = module.check("AckedTokenBank", &config).unwrap();
    assert!(outcome.passed());
    assert_eq!(outcome.traces, 3);
}

#[test]
fn test_fresh_acknowledgement_channel_passes() {
    // The acknowledgement channel is created per request and handed out
    // with the balance, so its events stay observable.
    let bank = Contract::new(
        "FreshAckBank",
        &["balance", "withdraw"],
        Action::receive(
            "withdraw",
            &["amount"],
            Action::fresh(
                &["updateAck"],
                Action::par(vec![
                    Action::send("balance", vec![Value::Name("updateAck".into())]),
                    Action::receive("updateAck", &[], Action::recurse("FreshAckBank", &["balance", "withdraw"])),
                ]),
            ),
        ),
    )
    .with_behavior("BankType");
    let module = Module::new(vec![bank], vec![bank_type()]).unwrap();
    assert!(module.check("FreshAckBank", &CheckerConfig::default()).unwrap().passed());
}

#[test]
fn test_hidden_acknowledgement_channel_fails() {
    // Without extrusion the acknowledgement is private and invisible, so the
    // recursion appears unacknowledged.
    let bank = Contract::new(
        "PrivateAckBank",
        &["balance", "withdraw"],
        Action::receive(
            "withdraw",
            &["amount"],
            Action::fresh(
                &["updateAck"],
                Action::par(vec![
                    Action::send("balance", vec![Value::Int(0)]),
                    Action::send("updateAck", vec![]),
                    Action::receive("updateAck", &[], Action::recurse("PrivateAckBank", &["balance", "withdraw"])),
                ]),
            ),
        ),
    )
    .with_behavior("BankType");
    let module = Module::new(vec![bank], vec![bank_type()]).unwrap();
    let outcome = module.check("PrivateAckBank", &CheckerConfig::default()).unwrap();
    assert!(!outcome.passed());
}

#[test]
fn test_unguarded_type_is_definition_error() {
    let contract = Contract::new("Idle", &["a"], Action::receive("a", &[], Action::Nil)).with_behavior("Loose");
    let loose = TypeDecl::new(
        "Loose",
        BehavioralType::fix(
            "X",
            BehavioralType::choice(vec![
                BehavioralType::var("X"),
                BehavioralType::after("a", BehavioralType::var("X")),
            ]),
        ),
    );
    let module = Module::new(vec![contract], vec![loose]).unwrap();
    assert_eq!(
        module.check("Idle", &CheckerConfig::default()),
        Err(CheckError::Definition(DefinitionError::UnguardedRecursion {
            ty: "Loose".into(),
            var: "X".into(),
        }))
    );
}

#[test]
fn test_deep_call_chain_is_inconclusive() {
    let depth = 70;
    let mut contracts: Vec<Contract> = (0..depth)
        .map(|i| Contract::new(&format!("Step{}", i), &["a"], Action::recurse(&format!("Step{}", i + 1), &["a"])))
        .collect();
    contracts.push(Contract::new(&format!("Step{}", depth), &["a"], Action::send("a", vec![])));
    contracts[0].behavior = Some("Any".into());

    let any = TypeDecl::new("Any", BehavioralType::fix("X", BehavioralType::after("a", BehavioralType::var("X"))));
    let module = Module::new(contracts, vec![any]).unwrap();

    let result = module.check("Step0", &CheckerConfig::default());
    assert!(matches!(
        result,
        Err(CheckError::Divergent(DivergentExtraction::DepthExceeded { limit: 64, .. }))
    ));

    let roomy = CheckerConfig::default().with_overrides(Some(depth + 1), None);
    assert!(module.check("Step0", &roomy).unwrap().passed());
}

#[test]
fn test_checks_are_independent() {
    let (module, config) = load("token_bank.md");
    let results = module.check_all(&config);
    let verdicts: Vec<_> = results
        .iter()
        .map(|(name, r)| (name.as_str(), r.as_ref().map(|o| o.passed()).unwrap_or(false)))
        .collect();
    assert_eq!(verdicts, vec![("TokenBank", false), ("AckedTokenBank", true)]);
}

#[test]
fn test_document_fields() {
    let text = std::fs::read_to_string(demo("cell.json")).unwrap();
    let document = Document::from_json("cell.json", &text).unwrap();
    assert_eq!(document.contracts[0].params, vec!["get", "set", "rtn"]);
    assert_eq!(document.types[0].body.to_string(), "rec X.((get.rtn.X) + (set.X))");
}
