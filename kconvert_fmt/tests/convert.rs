use kconvert_fmt::kconvert_core::*;
use kconvert_fmt::*;
use std::collections::BTreeSet;
use std::path::Path;

fn set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|name| name.to_string()).collect()
}

fn convert_case(case: &str) -> Result<VariabilityModel, ConvertError> {
    convert(&Path::new("./tests").join(case).join("model"))
}

fn check_invariants(model: &VariabilityModel) {
    for symbol in model.symbols() {
        assert!(symbol.name().starts_with(NAME_PREFIX));
        assert!(!symbol.used_in_constraints().contains(symbol.name()));
        for used in symbol.used_in_constraints() {
            let used = model.symbol(used).expect("used symbol exists");
            assert!(used.used_in_constraints_of_others().contains(symbol.name()));
        }
        for user in symbol.used_in_constraints_of_others() {
            let user = model.symbol(user).expect("using symbol exists");
            assert!(user.used_in_constraints().contains(symbol.name()));
        }
        if let Some(parent) = symbol.parent() {
            assert!(model.children(parent).any(|child| child == symbol));
            assert_eq!(
                model.nesting_depth(symbol.name()),
                model.nesting_depth(parent).map(|depth| depth + 1)
            );
        }
    }
}

#[test]
fn scenario() -> anyhow::Result<()> {
    let model = convert_case("test_scenario")?;
    check_invariants(&model);
    assert_eq!(model.len(), 2);
    let alpha = model.symbol("CONFIG_ALPHA").expect("CONFIG_ALPHA");
    assert_eq!(alpha.kind(), &SymbolKind::Tristate { module_number: 2 });
    assert_eq!(alpha.dimacs_number(), 1);
    let gamma = model.symbol("CONFIG_GAMMA").expect("CONFIG_GAMMA");
    assert_eq!(gamma.kind(), &SymbolKind::Bool);
    assert_eq!(gamma.dimacs_number(), 3);

    let descriptor = model.descriptor();
    assert_eq!(descriptor.variable_type(), VariableType::Boolean);
    assert_eq!(descriptor.constraint_file_type(), ConstraintFileType::Dimacs);
    assert!(descriptor.has_attribute(Attribute::ConstraintUsage));
    assert!(descriptor.has_attribute(Attribute::Hierarchical));
    assert_eq!(
        std::fs::read(model.constraint_file())?,
        std::fs::read("./tests/test_scenario/model.dimacs")?
    );
    Ok(())
}

#[test]
fn tristates() -> anyhow::Result<()> {
    let model = convert_case("test_tristate")?;
    check_invariants(&model);
    assert_eq!(model.len(), 4);
    assert_eq!(
        model.symbol("CONFIG_BETA").map(Symbol::kind),
        Some(&SymbolKind::Tristate { module_number: 2 })
    );
    // Boolean whose name ends in `_MODULE`.
    let delta = model.symbol("CONFIG_DELTA_MODULE").expect("CONFIG_DELTA_MODULE");
    assert_eq!(delta.kind(), &SymbolKind::Bool);
    assert_eq!(delta.dimacs_number(), 3);
    assert!(!model.contains("CONFIG_DELTA"));
    // Never declared by the tree.
    let modules = model.symbol("CONFIG_MODULES").expect("CONFIG_MODULES");
    assert_eq!(modules.kind(), &SymbolKind::Bool);
    assert_eq!(modules.dimacs_number(), 4);
    assert_eq!(modules.parent(), None);

    let mapping = model.dimacs_mapping();
    let expected = [
        "CONFIG_BETA",
        "CONFIG_BETA_MODULE",
        "CONFIG_DELTA_MODULE",
        "CONFIG_MODULES",
        "CONFIG_ALPHA",
        "CONFIG_ALPHA_MODULE",
    ];
    assert_eq!(mapping.len(), expected.len());
    for (number, name) in (1u32..).zip(expected) {
        assert_eq!(mapping[&number], name);
    }
    assert_eq!(
        delta.used_in_constraints_of_others(),
        &set(&["CONFIG_ALPHA"])
    );
    Ok(())
}

#[test]
fn values() -> anyhow::Result<()> {
    let model = convert_case("test_values")?;
    check_invariants(&model);
    assert_eq!(model.len(), 3);
    let cflags = model
        .symbol("CONFIG_ARCH_HWEIGHT_CFLAGS")
        .expect("CONFIG_ARCH_HWEIGHT_CFLAGS");
    assert_eq!(cflags.kind(), &SymbolKind::Other("string".to_string()));
    assert_eq!(cflags.dimacs_number(), 0);
    let cpus = model.symbol("CONFIG_NR_CPUS").expect("CONFIG_NR_CPUS");
    assert_eq!(cpus.kind().type_name(), "int");
    assert_eq!(cpus.dimacs_number(), 0);
    assert_eq!(
        cpus.used_in_constraints(),
        &set(&["CONFIG_ARCH_HWEIGHT_CFLAGS", "CONFIG_X86"])
    );
    assert_eq!(model.dimacs_mapping().len(), 1);
    Ok(())
}

#[test]
fn hierarchy() -> anyhow::Result<()> {
    let model = convert_case("test_hierarchy")?;
    check_invariants(&model);
    assert_eq!(model.len(), 8);
    let parent = |name| model.parent(name).map(Symbol::name);
    assert_eq!(parent("CONFIG_A"), None);
    assert_eq!(parent("CONFIG_B"), Some("CONFIG_A"));
    assert_eq!(parent("CONFIG_C"), Some("CONFIG_A"));
    assert_eq!(parent("CONFIG_D"), Some("CONFIG_C"));
    assert_eq!(parent("CONFIG_E"), None);
    assert_eq!(parent("CONFIG_CHOICE_1"), None);
    assert_eq!(parent("CONFIG_F"), Some("CONFIG_CHOICE_1"));
    assert_eq!(parent("CONFIG_G"), Some("CONFIG_CHOICE_1"));
    assert_eq!(model.nesting_depth("CONFIG_D"), Some(2));
    assert_eq!(
        model
            .children("CONFIG_A")
            .map(Symbol::name)
            .collect::<Vec<_>>(),
        ["CONFIG_B", "CONFIG_C"]
    );

    let choice = model.symbol("CONFIG_CHOICE_1").expect("CONFIG_CHOICE_1");
    assert_eq!(choice.dimacs_number(), 6);
    assert!(choice.used_in_constraints().is_empty());
    assert_eq!(
        choice.used_in_constraints_of_others(),
        &set(&["CONFIG_F", "CONFIG_G"])
    );
    let a = model.symbol("CONFIG_A").expect("CONFIG_A");
    assert_eq!(
        a.used_in_constraints_of_others(),
        &set(&["CONFIG_B", "CONFIG_C", "CONFIG_D"])
    );
    Ok(())
}

#[test]
fn missing_comment() {
    let err = convert_case("test_missing_comment").expect_err("malformed header");
    assert!(matches!(
        err,
        ConvertError::Format(FormatError::Dimacs(DimacsError::MissingComment(3)))
    ));
}

#[test]
fn missing_name() {
    let err = convert_case("test_missing_name").expect_err("malformed tree");
    assert!(matches!(
        err,
        ConvertError::Format(FormatError::Rsf {
            error: RsfError::MissingName(_),
            ..
        })
    ));
}

#[test]
fn missing_in_tree() {
    let err = convert_case("test_missing_in_tree").expect_err("inconsistent files");
    assert!(matches!(
        err,
        ConvertError::Format(FormatError::MissingInTree(name)) if name == "CONFIG_B"
    ));
}

#[test]
fn unresolved_id() {
    let err = convert_case("test_unresolved_id").expect_err("inconsistent files");
    assert!(matches!(
        err,
        ConvertError::Format(FormatError::UnresolvedId(id)) if id == "S@42"
    ));
}

#[test]
fn missing_rsf() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let base = dir.path().join("model");
    std::fs::copy(
        "./tests/test_scenario/model.dimacs",
        dir.path().join("model.dimacs"),
    )?;
    let err = convert(&base).expect_err("no RSF file");
    assert!(matches!(err, ConvertError::Io { path, .. } if path.ends_with("model.rsf")));
    Ok(())
}
