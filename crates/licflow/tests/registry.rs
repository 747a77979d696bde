use std::sync::Arc;

use glam::Vec2;
use licflow::programs::GlslType;
use licflow::{
    PipelineSettings, ProgramError, ProgramName, ProgramRegistry, ShaderValidator,
    UniformBindings, UniformValue, ValidatedProgram,
};

fn registry() -> ProgramRegistry<ValidatedProgram> {
    ProgramRegistry::new(&PipelineSettings::with_resolution(64, 32))
}

#[test]
fn every_program_parses_validates_and_links() {
    let registry = registry();
    let programs = registry.load_all(&ShaderValidator).unwrap();
    let names: Vec<_> = programs.iter().map(|program| program.name).collect();
    assert_eq!(names, ProgramName::ALL);
    for program in &programs {
        assert!(program
            .vertex
            .entry_points
            .iter()
            .any(|entry| entry.name == "main"));
        assert!(program
            .fragment
            .entry_points
            .iter()
            .any(|entry| entry.name == "main"));
    }
}

#[test]
fn loading_by_name_is_memoized() {
    let registry = registry();
    let first = registry.load("orthogonalLic", &ShaderValidator).unwrap();
    let again = registry.load("orthogonalLic", &ShaderValidator).unwrap();
    assert!(Arc::ptr_eq(&first, &again));
    assert!(registry.is_compiled(ProgramName::OrthogonalLic));
    assert!(!registry.is_compiled(ProgramName::Globe));
}

#[test]
fn unknown_names_are_rejected_before_compiling() {
    let registry = registry();
    for name in ["", "Globe", "lic", "noise_transport"] {
        let err = registry.load(name, &ShaderValidator).unwrap_err();
        assert!(matches!(err, ProgramError::UnknownProgram(ref got) if got == name));
        assert!(!err.is_build_failure());
    }
    assert!(ProgramName::ALL
        .into_iter()
        .all(|name| !registry.is_compiled(name)));
}

#[test]
fn declared_contracts_match_the_pass_wiring() {
    let registry = registry();
    let table = registry.table();
    let samplers = |name: ProgramName| -> Vec<&'static str> {
        table.get(name).samplers().map(|decl| decl.name).collect()
    };
    assert_eq!(samplers(ProgramName::NoiseTransport), ["field", "noise"]);
    assert_eq!(samplers(ProgramName::OrthogonalLic), ["oceanCurrent", "transportedNoise"]);
    assert_eq!(samplers(ProgramName::Advection), ["oceanCurrent", "previousTexture"]);
    assert_eq!(samplers(ProgramName::Blend), ["orthogonalLIC", "advected", "oceanCurrent"]);
    assert_eq!(
        samplers(ProgramName::Globe),
        ["texture", "oceanCurrent", "earthTexture"]
    );

    let offset = table
        .get(ProgramName::NoiseTransport)
        .uniform("randomOffset")
        .unwrap();
    assert_eq!(offset.ty, GlslType::Vec2);
}

#[test]
fn unbound_uniforms_fall_back_to_declared_defaults() {
    let registry = registry();
    let globe = registry.table().get(ProgramName::Globe);

    let resolved = UniformBindings::new().resolve(globe);
    assert_eq!(resolved.get("mask"), Some(&UniformValue::Int(1)));
    assert_eq!(resolved.get("m"), Some(&UniformValue::Float(10.0)));
    assert_eq!(resolved.get("n"), Some(&UniformValue::Float(3.0)));

    let mut bindings = UniformBindings::new();
    bindings
        .set("mask", UniformValue::Int(0))
        .set("m", UniformValue::Int(4));
    let resolved = bindings.resolve(globe);
    assert_eq!(resolved.get("mask"), Some(&UniformValue::Int(0)));
    // Wrong type is ignored in favour of the default.
    assert_eq!(resolved.get("m"), Some(&UniformValue::Float(10.0)));
}

#[test]
fn random_offset_reaches_noise_transport_only() {
    let registry = registry();
    let mut bindings = UniformBindings::new();
    bindings.set_random_offset(Vec2::new(0.25, 0.75));

    let transport = bindings.resolve(registry.table().get(ProgramName::NoiseTransport));
    assert_eq!(
        transport.get("randomOffset"),
        Some(&UniformValue::Vec2([0.25, 0.75]))
    );
    let blend = bindings.resolve(registry.table().get(ProgramName::Blend));
    assert!(blend.get("randomOffset").is_none());
}
